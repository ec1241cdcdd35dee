//! Idempotency key derivation.
//!
//! The key is the only deduplication handle downstream consumers get, and it
//! doubles as the stream partition key. It is a fixed-format composite of the
//! station identity and nothing else:
//!
//! ```text
//! district_<district_id>_station_<station_id>
//! ```
//!
//! Changing this format re-keys every station and breaks deduplication
//! against anything already on the stream.

/// Derives the idempotency key for a station.
///
/// ```rust
/// use ingest::derive_key;
///
/// assert_eq!(derive_key(5, 12), "district_5_station_12");
/// assert_eq!(derive_key(5, 12), derive_key(5, 12));
/// ```
pub fn derive_key(district_id: i64, station_id: i64) -> String {
    format!("district_{district_id}_station_{station_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_has_fixed_format() {
        assert_eq!(derive_key(1, 1), "district_1_station_1");
        assert_eq!(derive_key(0, 42), "district_0_station_42");
        assert_eq!(
            derive_key(i64::MAX, i64::MIN),
            format!("district_{}_station_{}", i64::MAX, i64::MIN)
        );
    }

    #[test]
    fn key_is_deterministic() {
        for (d, s) in [(1, 2), (77, 3), (-4, 9)] {
            assert_eq!(derive_key(d, s).as_bytes(), derive_key(d, s).as_bytes());
        }
    }

    #[test]
    fn district_and_station_are_not_interchangeable() {
        assert_ne!(derive_key(1, 2), derive_key(2, 1));
        assert_ne!(derive_key(1, 23), derive_key(12, 3));
    }
}
