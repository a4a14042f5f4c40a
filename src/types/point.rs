use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use crate::error::PointError;
use crate::types::value::{Tick, Value};

/// Free-form, JSON-encodable metadata attached to points and nodes.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Builds a [`Meta`] map from `key => value` pairs.
#[macro_export]
macro_rules! meta {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut meta = $crate::types::point::Meta::new();
        $(meta.insert($key.to_string(), ::serde_json::json!($value));)*
        meta
    }};
}

/// A single observation or derived value together with its provenance.
///
/// Points are replaced wholesale, never mutated in place once handed out.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Point {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_points: Vec<Point>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Meta,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<PointError>,
}

impl Point {
    pub fn new(value: impl Into<Value>, time: DateTime<Utc>) -> Self {
        Point {
            value: Some(value.into()),
            time: Some(time),
            ..Default::default()
        }
    }

    pub fn from_error(error: PointError) -> Self {
        Point {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta.extend(meta);
        self
    }

    pub fn with_sub_points(mut self, sub_points: Vec<Point>) -> Self {
        self.sub_points = sub_points;
        self
    }

    pub fn with_error(mut self, error: PointError) -> Self {
        self.error = Some(error);
        self
    }

    /// Checks the validity invariant: no error, a value that validates
    /// itself, and a time.
    pub fn validate(&self) -> std::result::Result<(), PointError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let value = self.value.as_ref().ok_or(PointError::MissingValue)?;
        value.validate()?;
        if self.time.is_none() {
            return Err(PointError::MissingTime);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn tick(&self) -> Option<&Tick> {
        self.value.as_ref().and_then(Value::as_tick)
    }

    /// Age relative to `now`; `None` when the time is unset.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.time.map(|time| now - time)
    }

    pub fn print(&self) -> String {
        match (&self.value, &self.error) {
            (_, Some(err)) => format!("error: {err}"),
            (Some(value), None) => value.print(),
            (None, None) => "<unset>".to_string(),
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn serialize_error<S: Serializer>(error: &Option<PointError>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(err) => s.serialize_str(&err.to_string()),
        None => s.serialize_none(),
    }
}
