//! Response dataset loading
//!
//! A benchmark snapshot is a JSON document shaped `{"responses": [...]}`
//! where every response carries an identifier tuple plus the routing
//! engine's answer for that test route. Loading turns the array into a
//! keyed mapping so two snapshots can be matched test case by test case,
//! independent of the order the responses appear in.
//!
//! Identifier collisions are resolved last-write-wins. Callers that need
//! stricter semantics should run their own duplicate detection over the
//! raw document before loading.

use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Accepted spellings of the identifier field, in lookup order
const ID_FIELDS: [&str; 3] = ["id_tuple", "idTuple", "id"];

/// One scalar of a test case identifier tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum IdComponent {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl IdComponent {
    fn rank(&self) -> u8 {
        match self {
            IdComponent::Null => 0,
            IdComponent::Bool(_) => 1,
            IdComponent::Number(_) => 2,
            IdComponent::Text(_) => 3,
        }
    }

    fn from_scalar(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IdComponent::Null),
            Value::Bool(b) => Some(IdComponent::Bool(*b)),
            Value::Number(n) => Some(IdComponent::Number(n.clone())),
            Value::String(s) => Some(IdComponent::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Numbers order by value; `1` and `1.0` are distinct components and fall
/// back to their text form
fn cmp_numbers(a: &Number, b: &Number) -> Ordering {
    let by_value = match (integer(a), integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
    };
    by_value.then_with(|| a.to_string().cmp(&b.to_string()))
}

// Gives datasets a stable iteration order: kind first, then value.
impl Ord for IdComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IdComponent::Bool(a), IdComponent::Bool(b)) => a.cmp(b),
            (IdComponent::Number(a), IdComponent::Number(b)) => cmp_numbers(a, b),
            (IdComponent::Text(a), IdComponent::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IdComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IdComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdComponent::Null => write!(f, "null"),
            IdComponent::Bool(b) => write!(f, "{}", b),
            IdComponent::Number(n) => write!(f, "{}", n),
            IdComponent::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for IdComponent {
    fn from(value: &str) -> Self {
        IdComponent::Text(value.to_string())
    }
}

impl From<i64> for IdComponent {
    fn from(value: i64) -> Self {
        IdComponent::Number(value.into())
    }
}

/// Identifier of one test route, shared by both snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestCaseId(Vec<IdComponent>);

impl TestCaseId {
    pub fn new(components: Vec<IdComponent>) -> Self {
        Self(components)
    }

    /// Build an identifier from its JSON form
    ///
    /// Arrays of scalars become tuples, a bare scalar becomes a one-element
    /// tuple. Nested arrays or objects are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(IdComponent::from_scalar)
                .collect::<Option<Vec<_>>>()
                .map(Self),
            Value::Object(_) => None,
            scalar => IdComponent::from_scalar(scalar).map(|c| Self(vec![c])),
        }
    }

    pub fn components(&self) -> &[IdComponent] {
        &self.0
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", component)?;
        }
        write!(f, ")")
    }
}

/// Server-side timing attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(default, rename = "totalTime", alias = "total_time")]
    pub total_time: Option<f64>,

    #[serde(default, rename = "timedOut", alias = "timed_out")]
    pub timed_out: Option<bool>,
}

/// One candidate route returned for a test case
///
/// Every field is optional at load time; the extractor that needs a field
/// reports it as malformed input when it is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    /// Travel time as `"<number> <unit...>"`, unit ignored
    #[serde(default)]
    pub duration: Option<String>,

    /// Transport mode per leg (WALK, BICYCLE, CAR, BUS, ...)
    #[serde(default, alias = "legModes")]
    pub leg_modes: Option<Vec<String>>,

    /// Duration per leg, positionally aligned with `leg_modes`
    #[serde(default, alias = "legTimes")]
    pub leg_times: Option<Vec<f64>>,

    #[serde(default, alias = "nLegs")]
    pub n_legs: Option<usize>,

    #[serde(default)]
    pub trips: Option<Vec<Value>>,

    /// Walking distance; combined walk + bicycle distance when the
    /// itinerary contains a BICYCLE leg
    #[serde(default, alias = "walkDistance")]
    pub walk_distance: Option<f64>,
}

/// Raw routing answer for a single test case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    #[serde(default, alias = "itineraries")]
    pub itins: Option<Vec<Itinerary>>,

    #[serde(default, alias = "debugInfo")]
    pub debug: Option<DebugInfo>,

    #[serde(default, alias = "avgTime", alias = "averageTime")]
    pub avg_time: Option<String>,
}

impl ResponseRecord {
    /// First itinerary, if the response has any
    pub fn first_itinerary(&self) -> Option<&Itinerary> {
        self.itins.as_deref().and_then(<[Itinerary]>::first)
    }

    /// All itineraries; empty when the list is missing
    pub fn itineraries(&self) -> &[Itinerary] {
        self.itins.as_deref().unwrap_or(&[])
    }
}

/// Mapping from test case identifier to its response, for one snapshot
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    origin: String,
    records: BTreeMap<TestCaseId, ResponseRecord>,
}

impl Dataset {
    /// Load a snapshot from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompareError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|source| CompareError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&path_ref.display().to_string(), &contents)
    }

    /// Parse a snapshot from JSON text; `origin` names it in errors and reports
    pub fn from_json_str(origin: &str, json: &str) -> Result<Self, CompareError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CompareError::malformed(origin, format!("invalid JSON: {}", e)))?;
        Self::from_value(origin, value)
    }

    /// Build a snapshot from an already parsed JSON document
    pub fn from_value(origin: &str, document: Value) -> Result<Self, CompareError> {
        let Value::Object(mut top) = document else {
            return Err(CompareError::malformed(
                origin,
                "top-level document is not a JSON object",
            ));
        };
        let Some(Value::Array(responses)) = top.remove("responses") else {
            return Err(CompareError::malformed(
                origin,
                "document lacks a `responses` array",
            ));
        };

        let mut records = BTreeMap::new();
        for (index, response) in responses.into_iter().enumerate() {
            let Value::Object(fields) = response else {
                return Err(CompareError::malformed(
                    origin,
                    format!("response #{} is not a JSON object", index),
                ));
            };
            let (id, record) = parse_response(origin, index, fields)?;
            if records.insert(id.clone(), record).is_some() {
                tracing::debug!(
                    "{}: duplicate test case {} at response #{}, keeping the later one",
                    origin,
                    id,
                    index
                );
            }
        }

        tracing::debug!("{}: loaded {} test cases", origin, records.len());
        Ok(Self {
            origin: origin.to_string(),
            records,
        })
    }

    /// Name of the file (or other source) this snapshot came from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &TestCaseId) -> Option<&ResponseRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &TestCaseId) -> bool {
        self.records.contains_key(id)
    }

    /// Test cases in stable identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&TestCaseId, &ResponseRecord)> {
        self.records.iter()
    }
}

fn parse_response(
    origin: &str,
    index: usize,
    mut fields: Map<String, Value>,
) -> Result<(TestCaseId, ResponseRecord), CompareError> {
    let raw_id = ID_FIELDS
        .iter()
        .find_map(|name| fields.remove(*name))
        .ok_or_else(|| {
            CompareError::malformed(
                origin,
                format!("response #{} lacks an `id_tuple` identifier", index),
            )
        })?;
    let id = TestCaseId::from_value(&raw_id).ok_or_else(|| {
        CompareError::malformed(
            origin,
            format!(
                "response #{} identifier {} is not a tuple of scalars",
                index, raw_id
            ),
        )
    })?;

    let record: ResponseRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| CompareError::malformed(origin, format!("test case {}: {}", id, e)))?;
    Ok((id, record))
}
