use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;

use robolog::aggregate::Aggregator;
use robolog::record::RawRecord;
use robolog::verify;

fn generate(seed: u64, n: usize) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let robot = format!("R{}", rng.gen_range(1..=4));
            let code = format!("E{}", rng.gen_range(1..=6));
            let day = rng.gen_range(1..=28);
            let month = rng.gen_range(1..=3);
            let mut value = json!({
                "robotId": robot,
                "errorCode": code,
                "lastModifiedDate": {"$date": format!("2024-{:02}-{:02}T10:00:00Z", month, day)},
            });
            // A few defects so skipping is part of the property too.
            if rng.gen_ratio(1, 20) {
                value.as_object_mut().unwrap().remove("robotId");
            }
            RawRecord::new(value)
        })
        .collect()
}

#[test]
fn merge_is_additive_across_batches() {
    for seed in 0..8u64 {
        let records = generate(seed, 300);
        let mut rng = StdRng::seed_from_u64(seed ^ 0xA5A5);
        let cut = rng.gen_range(0..=records.len());
        let (a, b) = records.split_at(cut);

        let mut split = Aggregator::new();
        let ra = split.merge(a.to_vec());
        let rb = split.merge(b.to_vec());

        let mut whole = Aggregator::new();
        let rw = whole.merge(records.clone());

        assert_eq!(split.index(), whole.index(), "seed {}", seed);
        assert_eq!(split.robots(), whole.robots(), "seed {}", seed);
        assert_eq!(ra.accepted + rb.accepted, rw.accepted);
        assert_eq!(ra.skipped + rb.skipped, rw.skipped);
    }
}

#[test]
fn merge_order_does_not_change_counts() {
    let records = generate(11, 400);
    let mut shuffled = records.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(99));

    let mut a = Aggregator::new();
    a.merge(records);
    let mut b = Aggregator::new();
    b.merge(shuffled);

    // Histogram equality ignores insertion order; robot order may differ.
    assert_eq!(a.index(), b.index());
    assert_eq!(a.robots().len(), b.robots().len());
    for robot in a.robots().iter() {
        assert!(b.robots().contains(robot));
    }
}

#[test]
fn consistency_holds_after_many_batches() {
    let mut agg = Aggregator::new();
    let mut rng = StdRng::seed_from_u64(5);
    let mut expected = 0u64;
    for batch in 0..20u64 {
        let n = rng.gen_range(0..50);
        let report = agg.merge(generate(batch, n));
        expected += report.accepted as u64;
        verify::assert_all(agg.index(), agg.robots()).unwrap();
    }
    assert_eq!(agg.index().record_count(), expected);
}
