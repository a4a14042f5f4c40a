use thiserror::Error;
use crate::types::value::Pair;

#[derive(Error, Debug)]
pub enum Error {
    // Graph Construction Errors
    #[error("{node} node expects {expected} child node(s), got {got}")]
    Arity {
        node: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{node} node slot '{slot}' is already set")]
    AlreadySet {
        node: &'static str,
        slot: &'static str,
    },

    #[error("{node} node is missing a required child: {slot}")]
    MissingNode {
        node: &'static str,
        slot: &'static str,
    },

    #[error("Origin node cannot have children")]
    LeafNode,

    #[error("Unknown origin: {0}")]
    UnknownOrigin(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Cache Slot Errors
    #[error("Refusing to store invalid data point: {0}")]
    InvalidDataPoint(PointError),

    #[error("Refusing to replace a data point with an older one")]
    OlderDataPoint,

    #[error("Refusing to store a data point dated {ahead_secs}s in the future")]
    FutureDataPoint {
        ahead_secs: i64,
    },

    // Fetch Errors
    #[error("Origin {origin} failed to fetch data points: {reason}")]
    FetchFailed {
        origin: String,
        reason: String,
    },

    #[error("Panic while fetching data points from the origin {0}")]
    OriginPanicked(String),

    #[error("Update cancelled")]
    Cancelled,

    // Rendering Errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Evaluation failure carried inside a data point.
///
/// Unlike [`Error`] this never crosses a node boundary as control flow: every
/// evaluation returns a point and the failure travels with it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointError {
    #[error("data point is not set")]
    NotSet,

    #[error("data point is expired: age {age_secs}s exceeds {expiry_secs}s")]
    Expired {
        age_secs: i64,
        expiry_secs: u64,
    },

    #[error("data point has no value")]
    MissingValue,

    #[error("data point has no time")]
    MissingTime,

    #[error("invalid {role} data point: {source}")]
    InvalidChild {
        role: String,
        source: Box<PointError>,
    },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("unexpected value type in {role} data point: expected {expected}, got {got}")]
    UnexpectedValue {
        role: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("deviation {deviation} exceeds threshold {threshold}")]
    DeviationExceeded {
        deviation: f64,
        threshold: f64,
    },

    #[error("not enough valid data points: got {got}, need {need}")]
    NotEnoughValues {
        got: usize,
        need: usize,
    },

    #[error("pair mismatch: expected {expected}, got {got}")]
    PairMismatch {
        expected: Pair,
        got: Pair,
    },

    #[error("unable to calculate cross rate: pairs {a} and {b} share no asset")]
    NoCommonAsset {
        a: Pair,
        b: Pair,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("node is not fully configured")]
    Incomplete,

    #[error("{0}")]
    Fetch(String),
}

impl PointError {
    /// Wraps a child's failure with the role the child plays in its parent.
    pub fn child(role: impl Into<String>, source: PointError) -> Self {
        PointError::InvalidChild {
            role: role.into(),
            source: Box::new(source),
        }
    }
}
