//! Daily snapshot points.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Aggregated per-status totals for one calendar date.
///
/// A placeholder point (a date after the evaluation instant) carries the date
/// only, so consumers can draw a continuous axis without invented values.
///
/// Serializes as a flat map: a `date` key plus one key per status name.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPoint {
    date: NaiveDate,
    values: Option<BTreeMap<String, f64>>,
}

impl SnapshotPoint {
    /// A point with values.
    #[must_use]
    pub const fn new(date: NaiveDate, values: BTreeMap<String, f64>) -> Self {
        Self {
            date,
            values: Some(values),
        }
    }

    /// A date-only point.
    #[must_use]
    pub const fn placeholder(date: NaiveDate) -> Self {
        Self { date, values: None }
    }

    /// Builds a point from `(status, value)` pairs.
    pub fn from_pairs<I, S>(date: NaiveDate, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(
            date,
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    /// Date of the point.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// True for date-only points.
    pub const fn is_placeholder(&self) -> bool {
        self.values.is_none()
    }

    /// Per-status values; `None` for placeholders.
    pub const fn values(&self) -> Option<&BTreeMap<String, f64>> {
        self.values.as_ref()
    }

    /// Value of one status, if present.
    pub fn value(&self, status: &str) -> Option<f64> {
        self.values.as_ref().and_then(|v| v.get(status).copied())
    }

    /// Sum of the listed statuses; missing statuses contribute 0.
    pub fn sum_of<S: AsRef<str>>(&self, statuses: &[S]) -> f64 {
        statuses
            .iter()
            .filter_map(|s| self.value(s.as_ref()))
            .sum()
    }

    /// Sum of every status bucket.
    pub fn total(&self) -> f64 {
        self.values.as_ref().map_or(0.0, |v| v.values().sum())
    }
}

impl Serialize for SnapshotPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + self.values.as_ref().map_or(0, BTreeMap::len);
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("date", &self.date)?;
        if let Some(values) = &self.values {
            for (status, value) in values {
                map.serialize_entry(status, value)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawPoint {
    date: NaiveDate,
    #[serde(flatten)]
    values: BTreeMap<String, f64>,
}

impl<'de> Deserialize<'de> for SnapshotPoint {
    /// A point without any status key reads back as a placeholder.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPoint::deserialize(deserializer)?;
        if raw.values.is_empty() {
            Ok(Self::placeholder(raw.date))
        } else {
            Ok(Self::new(raw.date, raw.values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_sums() {
        let p = SnapshotPoint::from_pairs(d(2), [("Done", 3.0), ("Todo", 4.5), ("Review", 1.0)]);
        assert!((p.sum_of(&["Done", "Review", "Missing"]) - 4.0).abs() < 1e-9);
        assert!((p.total() - 8.5).abs() < 1e-9);
        assert_eq!(p.value("Missing"), None);
    }

    #[test]
    fn test_placeholder_has_no_values() {
        let p = SnapshotPoint::placeholder(d(3));
        assert!(p.is_placeholder());
        assert_eq!(p.value("Done"), None);
        assert!(p.total().abs() < f64::EPSILON);
    }

    #[test]
    fn test_serializes_flat() {
        let p = SnapshotPoint::from_pairs(d(2), [("Done", 1.0), ("To Do", 2.0)]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "date": "2024-01-02", "Done": 1.0, "To Do": 2.0 })
        );

        let placeholder = serde_json::to_value(SnapshotPoint::placeholder(d(5))).unwrap();
        assert_eq!(placeholder, serde_json::json!({ "date": "2024-01-05" }));
    }

    #[test]
    fn test_deserializes_flat() {
        let p: SnapshotPoint =
            serde_json::from_str(r#"{ "date": "2024-01-02", "Done": 5, "Todo": 10 }"#).unwrap();
        assert_eq!(p.value("Done"), Some(5.0));
        assert_eq!(p.value("Todo"), Some(10.0));

        let placeholder: SnapshotPoint = serde_json::from_str(r#"{ "date": "2024-01-09" }"#).unwrap();
        assert!(placeholder.is_placeholder());
    }
}
