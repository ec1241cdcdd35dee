use ingest::{ingest, IngestConfig, RawStationResult};

const SUBMISSION: &str = r#"{
    "idempotency_key": "client-chosen-key",
    "district_id": 5,
    "polling_station_id": 12,
    "voters_count": 105,
    "valid_ballots": 100,
    "invalid_ballots": 3,
    "no_votes": 2,
    "candidate_votes": [
        { "candidate_id": 1, "votes": 60 },
        { "candidate_id": 2, "votes": 40 }
    ]
}"#;

fn main() {
    let raw: RawStationResult = match serde_json::from_str(SUBMISSION) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("malformed submission: {err}");
            return;
        }
    };

    match ingest(raw.clone(), &IngestConfig::default()) {
        Ok(payload) => println!("{payload:#?}"),
        Err(err) => eprintln!("ingest failed: {err}"),
    }

    let forged = RawStationResult {
        voters_count: 104,
        ..raw
    };
    if let Err(err) = ingest(forged, &IngestConfig::default()) {
        println!("rejected ({}): {err}", err.kind());
    }
}
