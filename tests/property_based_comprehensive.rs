//! Property-based tests for the comparison engine
//!
//! Core properties:
//! 1. Pass rate is the floor of the exact rate formula
//! 2. A snapshot compared with itself passes every dimension at 100
//! 3. Response order in either file never changes the report
//! 4. Regression counts never exceed the number of compared test cases

use proptest::prelude::*;
use routegate::dataset::Dataset;
use routegate::regression::{compare, pass_rate, CompareConfig, Dimension};
use serde_json::{json, Value};

/// One generated test case: duration in seconds (None = failed routing),
/// WALK time, bus legs and walked distance
type Case = (Option<u32>, u32, usize, u32);

fn response(n: usize, case: &Case) -> Value {
    let (duration, walk_time, buses, distance) = *case;
    let itins = match duration {
        None => json!([]),
        Some(seconds) => {
            let mut modes = vec!["WALK".to_string()];
            let mut times = vec![walk_time.max(1)];
            for _ in 0..buses {
                modes.push("BUS".to_string());
                times.push(300);
            }
            let trips = vec!["trip"; buses];
            json!([{
                "duration": format!("{} s", seconds),
                "leg_modes": modes,
                "leg_times": times,
                "n_legs": 1 + buses,
                "trips": trips,
                "walk_distance": f64::from(distance),
            }])
        }
    };
    json!({
        "id_tuple": ["Origin", "Destination", n],
        "itins": itins,
        "debug": {"totalTime": 100 + n, "timedOut": n % 7 == 0},
        "avg_time": "25.5"
    })
}

fn dataset(origin: &str, responses: Vec<Value>) -> Dataset {
    Dataset::from_value(origin, json!({ "responses": responses })).unwrap()
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (
        prop::option::weighted(0.85, 1u32..7_200),
        1u32..1_800,
        0usize..4,
        0u32..3_000,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_pass_rate_formula(count in 1usize..500, a in 0usize..500, b in 0usize..500) {
        let rate = pass_rate(count, a, b);
        let exact = 100.0 * (count as f64 + a as f64 - b as f64) / count as f64;

        // Property: the rate is the floor of the exact value
        prop_assert!(rate as f64 <= exact);
        prop_assert!((rate + 1) as f64 > exact);
    }

    #[test]
    fn prop_pass_rate_without_regressions_is_hundred(count in 1usize..10_000) {
        prop_assert_eq!(pass_rate(count, 0, 0), 100);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_self_comparison_passes(cases in prop::collection::vec(case_strategy(), 1..30)) {
        let responses: Vec<Value> = cases.iter().enumerate().map(|(n, c)| response(n, c)).collect();
        let a = dataset("a.json", responses.clone());
        let b = dataset("b.json", responses);

        let config = CompareConfig { limit: 100, ..CompareConfig::all_dimensions() };
        let report = compare(&a, &b, &config).unwrap();

        prop_assert_eq!(report.count, cases.len());
        prop_assert!(report.passed());
        prop_assert!(report.diagnostics.is_empty());
        for summary in &report.dimensions {
            prop_assert_eq!(summary.rate, 100);
        }
    }

    #[test]
    fn prop_response_order_is_irrelevant(
        pairs in prop::collection::vec((case_strategy(), case_strategy()), 1..30),
        seed in any::<u64>(),
    ) {
        let a_responses: Vec<Value> = pairs.iter().enumerate().map(|(n, (c, _))| response(n, c)).collect();
        let b_responses: Vec<Value> = pairs.iter().enumerate().map(|(n, (_, c))| response(n, c)).collect();
        let config = CompareConfig::all_dimensions();

        let forward = compare(
            &dataset("a.json", a_responses.clone()),
            &dataset("b.json", b_responses.clone()),
            &config,
        ).unwrap();

        // Deterministic permutation of both files
        let shift = (seed % pairs.len() as u64) as usize;
        let mut a_shuffled = a_responses;
        a_shuffled.reverse();
        let mut b_shuffled = b_responses;
        b_shuffled.rotate_left(shift);

        let shuffled = compare(
            &dataset("a.json", a_shuffled),
            &dataset("b.json", b_shuffled),
            &config,
        ).unwrap();

        prop_assert_eq!(forward, shuffled);
    }

    #[test]
    fn prop_regressions_bounded_by_count(
        pairs in prop::collection::vec((case_strategy(), case_strategy()), 1..30),
        threshold in 0.0f64..600.0,
    ) {
        let a: Vec<Value> = pairs.iter().enumerate().map(|(n, (c, _))| response(n, c)).collect();
        let b: Vec<Value> = pairs.iter().enumerate().map(|(n, (_, c))| response(n, c)).collect();
        let config = CompareConfig { duration_threshold: threshold, ..CompareConfig::default() };

        let report = compare(&dataset("a.json", a), &dataset("b.json", b), &config).unwrap();
        let duration = report.dimension(Dimension::Duration).unwrap();

        // Property: each test case is attributed to at most one side
        let total = duration.counters.total_a() + duration.counters.total_b();
        prop_assert!(total <= report.count);
        prop_assert!(duration.rate >= 0 && duration.rate <= 200);
        prop_assert_eq!(duration.passed, duration.rate >= 95);
    }
}
