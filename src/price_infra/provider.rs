use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::config::{AppConfig, OriginConfig};
use crate::config::graph::GraphBuilder;
use crate::error::{Error, Result};
use crate::graph::{GraphNode, Model, Node};
use crate::interfaces::origin::Origin;
use crate::interfaces::provider::Provider;
use crate::price_infra::origins::StaticOrigin;
use crate::price_infra::updater::Updater;
use crate::types::point::Point;

/// Serves models backed by data point graphs.
pub struct GraphProvider {
    models: BTreeMap<String, Node>,
    updater: Updater,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl GraphProvider {
    pub fn new(models: BTreeMap<String, Node>, updater: Updater) -> Self {
        GraphProvider {
            models,
            updater,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bounds how long a read waits for origins before serving the cache.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut origins: HashMap<String, Arc<dyn Origin>> = HashMap::new();
        for origin in &config.origins {
            let instance: Arc<dyn Origin> = match origin {
                OriginConfig::Static { name, prices } => {
                    Arc::new(StaticOrigin::new(name.clone(), prices.clone()))
                }
            };
            if origins.insert(origin.name().to_string(), instance).is_some() {
                return Err(Error::ConfigError(format!("duplicate origin: {}", origin.name())));
            }
        }

        let names: HashSet<String> = origins.keys().cloned().collect();
        let models = GraphBuilder::new(&names).build_models(&config.models)?;

        let mut updater = Updater::new(origins);
        if let Some(max_concurrency) = config.updater.max_concurrency {
            updater = updater.with_max_concurrency(max_concurrency);
        }

        info!("Loaded {} models from {} origins", models.len(), names.len());
        let mut provider = GraphProvider::new(models, updater);
        provider.timeout = config.updater.timeout();
        Ok(provider)
    }

    fn resolve<'a>(&'a self, names: &'a [String]) -> Result<Vec<(&'a String, &'a Node)>> {
        names
            .iter()
            .map(|name| {
                self.models
                    .get(name)
                    .map(|node| (name, node))
                    .ok_or_else(|| Error::UnknownModel(name.clone()))
            })
            .collect()
    }

    /// Refreshes the origins behind `nodes`, giving up after the timeout.
    pub async fn refresh(&self, nodes: &[&Node]) {
        let cancel = self.cancel.child_token();
        match self.timeout {
            Some(timeout) => {
                let update = self.updater.update(&cancel, nodes);
                if tokio::time::timeout(timeout, update).await.is_err() {
                    cancel.cancel();
                    warn!("Update did not finish within {:?}, serving cached data points", timeout);
                }
            }
            None => self.updater.update(&cancel, nodes).await,
        }
    }

    pub async fn refresh_all(&self) {
        let nodes: Vec<&Node> = self.models.values().collect();
        self.refresh(&nodes).await;
    }

    /// Keeps every model refreshed in the background until [`shutdown`] is
    /// called.
    ///
    /// [`shutdown`]: GraphProvider::shutdown
    pub fn spawn_updater(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        let period = interval.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Background updater started, interval {:?}", period);
            loop {
                tokio::select! {
                    _ = provider.cancel.cancelled() => break,
                    _ = ticker.tick() => provider.refresh_all().await,
                }
            }
            info!("Background updater stopped");
        })
    }

    /// Evaluates models from the leaf caches as they are, without fetching.
    pub fn cached_points(&self, names: &[String]) -> Result<BTreeMap<String, Point>> {
        Ok(self
            .resolve(names)?
            .into_iter()
            .map(|(name, node)| (name.clone(), node.evaluate()))
            .collect())
    }

    /// Stops the background updater and cancels in-flight fetches.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Provider for GraphProvider {
    fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    async fn data_point(&self, model: &str) -> Result<Point> {
        let node = self
            .models
            .get(model)
            .ok_or_else(|| Error::UnknownModel(model.to_string()))?;
        self.refresh(&[node]).await;
        Ok(node.evaluate())
    }

    async fn data_points(&self, models: &[String]) -> Result<BTreeMap<String, Point>> {
        let resolved = self.resolve(models)?;
        let nodes: Vec<&Node> = resolved.iter().map(|(_, node)| *node).collect();
        self.refresh(&nodes).await;
        Ok(resolved
            .into_iter()
            .map(|(name, node)| (name.clone(), node.evaluate()))
            .collect())
    }

    fn model(&self, name: &str) -> Result<Model> {
        self.models
            .get(name)
            .map(Node::describe)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    fn models(&self, names: &[String]) -> Result<BTreeMap<String, Model>> {
        Ok(self
            .resolve(names)?
            .into_iter()
            .map(|(name, node)| (name.clone(), node.describe()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticPriceConfig;
    use crate::error::PointError;
    use crate::graph::{OriginNode, TickMedianNode};
    use crate::interfaces::origin::Query;
    use crate::types::value::Pair;

    struct SlowOrigin;

    #[async_trait]
    impl Origin for SlowOrigin {
        async fn fetch_data_points(&self, _queries: &[Query]) -> Result<HashMap<Query, Point>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(HashMap::new())
        }
    }

    fn origin_node(origin: &str, query: &str) -> Node {
        OriginNode::new(origin, Query::from(query), Duration::from_secs(60), Duration::from_secs(120))
            .unwrap()
            .into()
    }

    fn provider() -> GraphProvider {
        let fixed = StaticOrigin::new(
            "fixed",
            vec![
                StaticPriceConfig { query: Query::from("ETH/USD"), price: 2000.0, volume24h: None },
                StaticPriceConfig { query: Query::from("BTC/USD"), price: 30000.0, volume24h: None },
            ],
        );
        let mut origins: HashMap<String, Arc<dyn Origin>> = HashMap::new();
        origins.insert("fixed".to_string(), Arc::new(fixed));
        origins.insert("slow".to_string(), Arc::new(SlowOrigin));

        let mut median = TickMedianNode::new(Pair::new("ETH", "USD"), 1);
        median
            .add_nodes(vec![origin_node("fixed", "ETH/USD"), origin_node("fixed", "ETH/USD")])
            .unwrap();

        let mut models = BTreeMap::new();
        models.insert("ETH/USD".to_string(), Node::from(median));
        models.insert("BTC/USD".to_string(), origin_node("fixed", "BTC/USD"));
        models.insert("SLOW/USD".to_string(), origin_node("slow", "SLOW/USD"));

        GraphProvider::new(models, Updater::new(origins)).with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_model_names() {
        assert_eq!(provider().model_names(), vec!["BTC/USD", "ETH/USD", "SLOW/USD"]);
    }

    #[tokio::test]
    async fn test_data_point_refreshes_before_reading() {
        let point = provider().data_point("ETH/USD").await.unwrap();
        assert!(point.is_valid());
        assert_eq!(point.tick().unwrap().price, 2000.0);
        assert_eq!(point.sub_points.len(), 2);
    }

    #[tokio::test]
    async fn test_data_points_report_failures_inline() {
        let names = vec!["BTC/USD".to_string(), "SLOW/USD".to_string()];
        let points = provider().data_points(&names).await.unwrap();

        assert_eq!(points.len(), 2);
        assert!(points["BTC/USD"].is_valid());
        assert_eq!(points["SLOW/USD"].validate(), Err(PointError::NotSet));
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let provider = provider();
        assert!(matches!(provider.data_point("XYZ/USD").await, Err(Error::UnknownModel(_))));
        let names = vec!["ETH/USD".to_string(), "XYZ/USD".to_string()];
        assert!(matches!(provider.data_points(&names).await, Err(Error::UnknownModel(_))));
        assert!(provider.model("XYZ/USD").is_err());
    }

    #[tokio::test]
    async fn test_models_describe_structure() {
        let provider = provider();
        let model = provider.model("ETH/USD").unwrap();
        assert_eq!(model.meta["type"], "median");
        assert_eq!(model.models.len(), 2);

        let models = provider.models(&provider.model_names()).unwrap();
        assert_eq!(models.len(), 3);
        assert_eq!(models["BTC/USD"].meta["origin"], "fixed");
    }

    #[tokio::test]
    async fn test_background_updater_refreshes_models() {
        let provider = Arc::new(provider());
        let handle = provider.spawn_updater(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let names = vec!["BTC/USD".to_string(), "ETH/USD".to_string()];
        let points = provider.cached_points(&names).unwrap();
        assert!(points["BTC/USD"].is_valid());
        assert!(points["ETH/USD"].is_valid());
        provider.shutdown();
        handle.await.unwrap();
    }
}
