use std::collections::BTreeMap;
use async_trait::async_trait;
use crate::error::Result;
use crate::graph::Model;
use crate::types::point::Point;

/// Read access to the configured models.
///
/// Reads refresh the underlying origins first, bounded by the provider's
/// timeout, and then return whatever is currently cached or derivable.
/// A model that cannot be resolved still yields a point, carrying the error.
#[async_trait]
pub trait Provider: Send + Sync {
    fn model_names(&self) -> Vec<String>;

    async fn data_point(&self, model: &str) -> Result<Point>;

    async fn data_points(&self, models: &[String]) -> Result<BTreeMap<String, Point>>;

    fn model(&self, name: &str) -> Result<Model>;

    fn models(&self, names: &[String]) -> Result<BTreeMap<String, Model>>;
}
