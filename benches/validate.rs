use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tally::{IngestConfig, RawCandidateVote, RawStationResult, ingest, validate};

/// A consistent station with `candidates` entries sharing the valid ballots.
fn station(candidates: i64) -> RawStationResult {
    let per_candidate = 37;
    let valid = per_candidate * candidates;
    RawStationResult {
        idempotency_key: None,
        district_id: 5,
        station_id: 12,
        voters_count: valid + 9,
        valid_ballots: valid,
        invalid_ballots: 6,
        no_votes: 3,
        candidate_votes: (1..=candidates)
            .map(|candidate_id| RawCandidateVote {
                candidate_id,
                votes: per_candidate,
            })
            .collect(),
    }
}

/// Benchmark the consistency checks alone across ballot sizes
fn bench_validate_candidates(c: &mut Criterion) {
    let config = IngestConfig::default();
    let mut group = c.benchmark_group("validate_candidates");

    for candidates in [2, 10, 50, 200] {
        let record = station(candidates);
        group.throughput(Throughput::Elements(candidates as u64));
        group.bench_function(format!("candidates_{candidates}"), |b| {
            b.iter(|| validate(black_box(&record), black_box(&config)).expect("valid station"));
        });
    }

    group.finish();
}

/// Benchmark full ingest (checks + key derivation + canonical record)
fn bench_ingest(c: &mut Criterion) {
    let config = IngestConfig::default();
    let record = station(10);

    c.bench_function("ingest_station", |b| {
        b.iter(|| {
            let _ = ingest(black_box(record.clone()), black_box(&config))
                .expect("ingest should succeed");
        });
    });

    let rejected = RawStationResult {
        voters_count: 1,
        ..station(10)
    };
    c.bench_function("ingest_rejected_station", |b| {
        b.iter(|| {
            let _ = ingest(black_box(rejected.clone()), black_box(&config));
        });
    });
}

criterion_group!(benches, bench_validate_candidates, bench_ingest);
criterion_main!(benches);
