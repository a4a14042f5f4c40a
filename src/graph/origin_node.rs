use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use chrono::{DateTime, TimeDelta, Utc};
use crate::error::{Error, PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::interfaces::origin::Query;
use crate::types::point::{Meta, Point};

/// How far ahead of the local clock a point may be stamped.
pub const MAX_CLOCK_SKEW: TimeDelta = TimeDelta::seconds(5);

/// Leaf node caching the last point fetched for one origin/query pair.
///
/// The cached point is served while it is younger than the expiry threshold.
/// Once it is older than the freshness threshold the updater refetches it.
#[derive(Debug)]
pub struct OriginNode {
    origin: String,
    query: Query,
    freshness_threshold: Duration,
    expiry_threshold: Duration,
    point: RwLock<Option<Point>>,
}

impl OriginNode {
    pub fn new(
        origin: impl Into<String>,
        query: Query,
        freshness_threshold: Duration,
        expiry_threshold: Duration,
    ) -> Result<Self> {
        if freshness_threshold.is_zero() {
            return Err(Error::ConfigError("freshness threshold must be positive".to_string()));
        }
        if expiry_threshold < freshness_threshold {
            return Err(Error::ConfigError(format!(
                "expiry threshold ({:?}) must not be shorter than freshness threshold ({:?})",
                expiry_threshold, freshness_threshold
            )));
        }
        Ok(OriginNode {
            origin: origin.into(),
            query,
            freshness_threshold,
            expiry_threshold,
            point: RwLock::new(None),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The cached point as stored, without expiry handling.
    pub fn point(&self) -> Option<Point> {
        self.point.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stores a point, rejecting invalid points, points older than the one
    /// already cached and points dated too far in the future.
    pub fn set_point(&self, point: Point) -> Result<()> {
        let now = Utc::now();
        let mut slot = self.point.write().unwrap_or_else(PoisonError::into_inner);
        Self::check_replacement(slot.as_ref(), &point, now)?;
        *slot = Some(point);
        Ok(())
    }

    /// Stores a fetched point unless the cached one is still fresh.
    ///
    /// Returns whether the slot was replaced.
    pub fn refresh(&self, point: Point, now: DateTime<Utc>) -> Result<bool> {
        let mut slot = self.point.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            if current.is_valid() && self.is_fresh_point(current, now) {
                return Ok(false);
            }
        }
        Self::check_replacement(slot.as_ref(), &point, now)?;
        *slot = Some(point);
        Ok(true)
    }

    fn check_replacement(current: Option<&Point>, point: &Point, now: DateTime<Utc>) -> Result<()> {
        point.validate().map_err(Error::InvalidDataPoint)?;
        if let Some(ahead) = point.time.map(|time| time - now) {
            if ahead > MAX_CLOCK_SKEW {
                return Err(Error::FutureDataPoint { ahead_secs: ahead.num_seconds() });
            }
        }
        if let Some(current) = current {
            let current_usable = Self::age(current, now).is_some();
            if current.is_valid() && current_usable && current.time > point.time {
                return Err(Error::OlderDataPoint);
            }
        }
        Ok(())
    }

    /// Age of a point. Timestamps within [`MAX_CLOCK_SKEW`] of now count as
    /// brand new; anything further ahead has no usable age.
    fn age(point: &Point, now: DateTime<Utc>) -> Option<Duration> {
        let age = point.age(now)?;
        if -age > MAX_CLOCK_SKEW {
            return None;
        }
        Some(age.to_std().unwrap_or_default())
    }

    fn is_fresh_point(&self, point: &Point, now: DateTime<Utc>) -> bool {
        Self::age(point, now).is_some_and(|age| age < self.freshness_threshold)
    }

    fn is_expired_point(&self, point: &Point, now: DateTime<Utc>) -> bool {
        Self::age(point, now).is_none_or(|age| age >= self.expiry_threshold)
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let slot = self.point.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_some_and(|point| self.is_fresh_point(point, now))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let slot = self.point.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_none_or(|point| self.is_expired_point(point, now))
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the updater should fetch this node again.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let slot = self.point.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(point) => !point.is_valid() || !self.is_fresh_point(point, now),
            None => true,
        }
    }

    pub fn evaluate_at(&self, now: DateTime<Utc>) -> Point {
        let slot = self.point.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            None => Point::from_error(PointError::NotSet).with_meta(self.meta()),
            Some(point) if self.is_expired_point(point, now) => {
                let age_secs = point.age(now).map(|age| age.num_seconds()).unwrap_or_default();
                point.clone().with_meta(self.meta()).with_error(PointError::Expired {
                    age_secs,
                    expiry_secs: self.expiry_threshold.as_secs(),
                })
            }
            Some(point) => point.clone().with_meta(self.meta()),
        }
    }
}

impl GraphNode for OriginNode {
    fn add_nodes(&mut self, _nodes: Vec<Node>) -> Result<()> {
        Err(Error::LeafNode)
    }

    fn children(&self) -> Vec<&Node> {
        Vec::new()
    }

    fn meta(&self) -> Meta {
        crate::meta! {
            "type" => "origin",
            "origin" => self.origin,
            "query" => self.query.to_string(),
            "freshness_threshold" => self.freshness_threshold.as_secs(),
            "expiry_threshold" => self.expiry_threshold.as_secs(),
        }
    }

    fn evaluate(&self) -> Point {
        self.evaluate_at(Utc::now())
    }
}
