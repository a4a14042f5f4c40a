use std::collections::HashMap;
use std::fmt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::types::point::Point;
use crate::types::value::Pair;

/// Key an origin answers for. Most price origins are asked about a pair,
/// anything else is passed through verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Query {
    Pair(Pair),
    Raw(String),
}

impl Query {
    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            Query::Pair(pair) => Some(pair),
            Query::Raw(_) => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Pair(pair) => write!(f, "{pair}"),
            Query::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        match s.parse::<Pair>() {
            Ok(pair) => Query::Pair(pair),
            Err(_) => Query::Raw(s),
        }
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Query::from(s.to_string())
    }
}

impl From<Pair> for Query {
    fn from(pair: Pair) -> Self {
        Query::Pair(pair)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> String {
        query.to_string()
    }
}

/// External data source answering batched queries.
///
/// Implementations return as many results as they can; a query missing from
/// the returned map is treated as not yet available, and a per-query failure
/// can be reported as a point carrying
/// [`PointError::Fetch`](crate::error::PointError::Fetch). Within one update
/// pass an origin is called at most once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Origin: Send + Sync {
    async fn fetch_data_points(&self, queries: &[Query]) -> Result<HashMap<Query, Point>>;
}
