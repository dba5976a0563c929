//! Raw upstream records.
//!
//! The MGNREGA resource returns loosely-shaped JSON objects whose field set
//! drifts between fiscal years, so a record is kept as an opaque map and only
//! the handful of fields the pipeline reads get typed accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names that identify a record's district, in probe order.
const DISTRICT_FIELDS: [&str; 2] = ["district_name", "district"];

/// Field names that carry the reporting month, in probe order.
const MONTH_FIELDS: [&str; 2] = ["month", "Month"];

/// One raw observation from the upstream dataset.
///
/// Serializes exactly as it arrived; callers treat it as opaque except for
/// the accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    /// Look up a string field, returning the first non-empty trimmed match.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// District identifier, or `None` when the record carries none.
    pub fn district_name(&self) -> Option<&str> {
        self.first_str(&DISTRICT_FIELDS)
    }

    /// Free-text reporting month (e.g. "Jan", "January").
    pub fn month(&self) -> Option<&str> {
        self.first_str(&MONTH_FIELDS)
    }

    /// Read a numeric field, probing `keys` in order.
    ///
    /// Upstream sends numbers as JSON numbers or as strings depending on the
    /// fiscal year; anything missing or unparseable counts as zero.
    pub fn numeric(&self, keys: &[&str]) -> f64 {
        for key in keys {
            match self.0.get(*key) {
                Some(Value::Number(n)) => return n.as_f64().unwrap_or(0.0),
                Some(Value::String(s)) => return s.trim().parse::<f64>().unwrap_or(0.0),
                Some(_) | None => continue,
            }
        }
        0.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
