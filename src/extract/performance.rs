// Server performance extraction
//
// Every response is expected to carry the server's debug timing, so unlike
// the itinerary dimensions there is no empty sentinel: a missing `debug`
// block is malformed input once the performance dimensions are enabled.

use crate::dataset::{Dataset, ResponseRecord, TestCaseId};
use crate::error::CompareError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Only this many leading characters of `avg_time` are significant
const AVG_TIME_PREFIX: usize = 5;

/// Server timing of one test case
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServerTiming {
    pub total_time: f64,
    pub avg_time: f64,
    pub timed_out: bool,
}

/// Parse the average request time; `None` (or an absent key) means 0
pub fn parse_avg_time(raw: Option<&str>) -> Option<f64> {
    match raw {
        None => Some(0.0),
        Some(text) => text
            .chars()
            .take(AVG_TIME_PREFIX)
            .collect::<String>()
            .trim()
            .parse()
            .ok(),
    }
}

fn timing(
    dataset: &Dataset,
    id: &TestCaseId,
    record: &ResponseRecord,
) -> Result<ServerTiming, CompareError> {
    let missing = |field: &str| {
        CompareError::malformed(
            dataset.origin(),
            format!("test case {}: response lacks `{}`", id, field),
        )
    };

    let debug = record.debug.as_ref().ok_or_else(|| missing("debug"))?;
    let total_time = debug.total_time.ok_or_else(|| missing("debug.totalTime"))?;
    let timed_out = debug.timed_out.ok_or_else(|| missing("debug.timedOut"))?;
    let avg_time = parse_avg_time(record.avg_time.as_deref()).ok_or_else(|| {
        CompareError::malformed(
            dataset.origin(),
            format!(
                "test case {}: unparseable avg_time {:?}",
                id,
                record.avg_time.as_deref().unwrap_or_default()
            ),
        )
    })?;

    Ok(ServerTiming {
        total_time,
        avg_time,
        timed_out,
    })
}

/// Extract server timing for every test case
pub fn server_timings(
    dataset: &Dataset,
) -> Result<BTreeMap<TestCaseId, ServerTiming>, CompareError> {
    dataset
        .iter()
        .map(|(id, record)| -> Result<_, CompareError> {
            Ok((id.clone(), timing(dataset, id, record)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::IdComponent;

    fn case(n: i64) -> TestCaseId {
        TestCaseId::new(vec![IdComponent::from("P"), n.into()])
    }

    #[test]
    fn test_parse_avg_time_truncates() {
        assert_eq!(parse_avg_time(Some("12.345678 ms")), Some(12.34));
        assert_eq!(parse_avg_time(Some("7")), Some(7.0));
        // The unit ends up inside the 5-character prefix
        assert_eq!(parse_avg_time(Some("3 ms")), None);
        assert_eq!(parse_avg_time(None), Some(0.0));
        assert_eq!(parse_avg_time(Some("slow!")), None);
    }

    #[test]
    fn test_server_timings() {
        let ds = Dataset::from_json_str(
            "perf.json",
            r#"{"responses": [
                {"id_tuple": ["P", 1], "debug": {"totalTime": 250, "timedOut": false}, "avg_time": "41.99999"},
                {"id_tuple": ["P", 2], "debug": {"totalTime": 9000, "timedOut": true}, "avg_time": null},
                {"id_tuple": ["P", 3], "debug": {"totalTime": 10, "timedOut": false}}
            ]}"#,
        )
        .unwrap();

        let timings = server_timings(&ds).unwrap();
        assert_eq!(
            timings[&case(1)],
            ServerTiming {
                total_time: 250.0,
                avg_time: 41.99,
                timed_out: false,
            }
        );
        assert!(timings[&case(2)].timed_out);
        assert_eq!(timings[&case(2)].avg_time, 0.0);
        assert_eq!(timings[&case(3)].avg_time, 0.0);
    }

    #[test]
    fn test_missing_debug_is_malformed() {
        let ds = Dataset::from_json_str("perf.json", r#"{"responses": [{"id_tuple": ["P", 1]}]}"#)
            .unwrap();
        let err = server_timings(&ds).unwrap_err();
        assert!(err.to_string().contains("`debug`"));
    }

    #[test]
    fn test_missing_timed_out_is_malformed() {
        let ds = Dataset::from_json_str(
            "perf.json",
            r#"{"responses": [{"id_tuple": ["P", 1], "debug": {"totalTime": 1}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            server_timings(&ds),
            Err(CompareError::MalformedInput { .. })
        ));
    }
}
