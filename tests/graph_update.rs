use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use pricegraph::config::AppConfig;
use pricegraph::error::{Error, PointError, Result};
use pricegraph::graph::{GraphNode, Node, OriginNode, TickIndirectNode, TickMedianNode};
use pricegraph::interfaces::origin::{Origin, Query};
use pricegraph::interfaces::provider::Provider;
use pricegraph::price_infra::{GraphProvider, Updater};
use pricegraph::types::point::Point;
use pricegraph::types::value::{Pair, Tick};

#[derive(Clone, Copy)]
enum Behaviour {
    Answer,
    Fail,
    Panic,
}

/// Answers every pair query with a fixed price after an optional delay.
struct ScriptedOrigin {
    price: f64,
    delay: Duration,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedOrigin {
    fn new(price: f64) -> Self {
        ScriptedOrigin {
            price,
            delay: Duration::ZERO,
            behaviour: Behaviour::Answer,
            calls: AtomicUsize::new(0),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn behaving(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Origin for ScriptedOrigin {
    async fn fetch_data_points(&self, queries: &[Query]) -> Result<HashMap<Query, Point>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behaviour {
            Behaviour::Answer => Ok(queries
                .iter()
                .filter_map(|query| {
                    let pair = query.as_pair()?.clone();
                    Some((query.clone(), Point::new(Tick::new(pair, self.price, None), Utc::now())))
                })
                .collect()),
            Behaviour::Fail => Err(Error::FetchFailed {
                origin: "scripted".to_string(),
                reason: "connection refused".to_string(),
            }),
            Behaviour::Panic => panic!("origin blew up"),
        }
    }
}

fn leaf(origin: &str, query: &str) -> Node {
    OriginNode::new(origin, Query::from(query), Duration::from_secs(60), Duration::from_secs(120))
        .unwrap()
        .into()
}

fn registry(origins: Vec<(&str, Arc<ScriptedOrigin>)>) -> HashMap<String, Arc<dyn Origin>> {
    origins
        .into_iter()
        .map(|(name, origin)| (name.to_string(), origin as Arc<dyn Origin>))
        .collect()
}

#[tokio::test]
async fn test_default_config_resolves_every_model() {
    let config = AppConfig::from_toml(include_str!("../config/default.toml")).unwrap();
    let provider = GraphProvider::from_config(&config).unwrap();

    let names = provider.model_names();
    let points = provider.data_points(&names).await.unwrap();
    assert_eq!(points.len(), 4);
    for (name, point) in &points {
        assert!(point.is_valid(), "{} failed: {:?}", name, point.error);
        assert_eq!(point.meta["model"], name.as_str());
    }

    // median of 2000, 2004 and 0.0667 * 30000
    let eth = points["ETH/USD"].tick().unwrap();
    assert!((eth.price - 2001.0).abs() < 1e-9);
    assert_eq!(eth.pair, Pair::new("ETH", "USD"));

    let eur = points["EUR/USD"].tick().unwrap();
    assert_eq!(eur.pair, Pair::new("EUR", "USD"));
    assert!((eur.price - 1.0 / 0.92).abs() < 1e-9);

    let eth_eur = points["ETH/EUR"].tick().unwrap();
    assert_eq!(eth_eur.pair, Pair::new("ETH", "EUR"));
    assert!((eth_eur.price - 1840.0).abs() < 1e-9);

    assert!(points["ETH/USD:guarded"].meta.contains_key("deviation"));
}

#[tokio::test]
async fn test_one_panicking_origin_does_not_affect_the_others() {
    let good = Arc::new(ScriptedOrigin::new(100.0));
    let bad = Arc::new(ScriptedOrigin::new(0.0).behaving(Behaviour::Panic));
    let failing = Arc::new(ScriptedOrigin::new(0.0).behaving(Behaviour::Fail));
    let updater = Updater::new(registry(vec![
        ("good", good.clone()),
        ("bad", bad.clone()),
        ("failing", failing.clone()),
    ]));

    let mut median = TickMedianNode::new(Pair::new("ETH", "USD"), 1);
    median
        .add_nodes(vec![
            leaf("good", "ETH/USD"),
            leaf("bad", "ETH/USD"),
            leaf("failing", "ETH/USD"),
        ])
        .unwrap();
    let root = Node::from(median);

    updater.update(&CancellationToken::new(), &[&root]).await;

    let point = root.evaluate();
    assert!(point.is_valid());
    assert_eq!(point.tick().unwrap().price, 100.0);
    assert!(point.sub_points[0].is_valid());
    assert_eq!(point.sub_points[1].validate(), Err(PointError::NotSet));
    assert_eq!(point.sub_points[2].validate(), Err(PointError::NotSet));
    assert_eq!((good.calls(), bad.calls(), failing.calls()), (1, 1, 1));
}

#[tokio::test]
async fn test_fresh_points_survive_concurrent_updates() {
    let origin = Arc::new(ScriptedOrigin::new(999.0).delayed(Duration::from_millis(20)));
    let updater = Updater::new(registry(vec![("slow", origin.clone())]));

    let fresh = OriginNode::new("slow", Query::from("ETH/USD"), Duration::from_secs(60), Duration::from_secs(120))
        .unwrap();
    let cached = Point::new(Tick::new(Pair::new("ETH", "USD"), 2000.0, None), Utc::now());
    fresh.set_point(cached.clone()).unwrap();
    let fresh = Node::from(fresh);
    let empty = leaf("slow", "BTC/USD");

    let cancel = CancellationToken::new();
    let roots = [&fresh, &empty];
    tokio::join!(updater.update(&cancel, &roots), updater.update(&cancel, &roots));

    let point = fresh.evaluate();
    assert_eq!(point.tick().unwrap().price, 2000.0);
    assert_eq!(point.time, cached.time);
    assert_eq!(empty.evaluate().tick().unwrap().price, 999.0);
}

#[tokio::test]
async fn test_provenance_is_kept_through_the_tree() {
    let a = Arc::new(ScriptedOrigin::new(0.05));
    let b = Arc::new(ScriptedOrigin::new(40000.0));
    let updater = Updater::new(registry(vec![("a", a), ("b", b)]));

    let mut indirect = TickIndirectNode::new();
    indirect.add_nodes(vec![leaf("a", "ETH/BTC"), leaf("b", "BTC/USD")]).unwrap();
    let root = Node::from(indirect);

    updater.update(&CancellationToken::new(), &[&root]).await;
    let point = root.evaluate();

    assert!(point.is_valid());
    assert_eq!(point.meta["type"], "indirect");
    assert_eq!(point.tick().unwrap().pair, Pair::new("ETH", "USD"));
    let origins: Vec<_> = point.sub_points.iter().map(|p| p.meta["origin"].clone()).collect();
    assert_eq!(origins, vec!["a", "b"]);
    assert_eq!(point.sub_points[0].meta["query"], "ETH/BTC");
    assert_eq!(point.sub_points[1].meta["query"], "BTC/USD");
}

#[tokio::test]
async fn test_models_render_without_values() {
    let config = AppConfig::from_toml(include_str!("../config/default.toml")).unwrap();
    let provider = GraphProvider::from_config(&config).unwrap();
    let models = provider.models(&["EUR/USD".to_string()]).unwrap();

    let rendered = pricegraph::trace::render_all(&models, &Default::default());
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "Model: EUR/USD");
    assert_eq!(lines[1], "alias(model: EUR/USD)");
    assert_eq!(lines[2], "└── invert");
    assert_eq!(
        lines[3],
        "    └── origin(expiry_threshold: 120, freshness_threshold: 60, origin: exchange_a, query: USD/EUR)"
    );
}

fn behaviour(code: u8) -> Behaviour {
    match code {
        0 => Behaviour::Fail,
        1 => Behaviour::Panic,
        _ => Behaviour::Answer,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_every_answered_leaf_is_filled_regardless_of_timing(
        scripts in prop::collection::vec((0u64..15, 0u8..5), 1..5),
        queries in 1usize..6,
    ) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let origins: Vec<(String, Behaviour, Arc<ScriptedOrigin>)> = scripts
            .iter()
            .enumerate()
            .map(|(i, (delay, code))| {
                let behaviour = behaviour(*code);
                let origin = ScriptedOrigin::new(i as f64 + 1.0)
                    .delayed(Duration::from_millis(*delay))
                    .behaving(behaviour);
                (format!("origin-{}", i), behaviour, Arc::new(origin))
            })
            .collect();
        let updater = Updater::new(
            origins
                .iter()
                .map(|(name, _, origin)| (name.clone(), origin.clone() as Arc<dyn Origin>))
                .collect(),
        );

        let nodes: Vec<(Behaviour, Node)> = origins
            .iter()
            .flat_map(|(name, behaviour, _)| {
                (0..queries).map(move |q| (*behaviour, leaf(name, &format!("A{}/USD", q))))
            })
            .collect();
        let refs: Vec<&Node> = nodes.iter().map(|(_, node)| node).collect();

        runtime.block_on(updater.update(&CancellationToken::new(), &refs));

        for (behaviour, node) in &nodes {
            let point = node.evaluate();
            match behaviour {
                Behaviour::Answer => prop_assert!(point.is_valid()),
                Behaviour::Fail | Behaviour::Panic => {
                    prop_assert_eq!(point.validate(), Err(PointError::NotSet));
                }
            }
        }
        for (_, _, origin) in &origins {
            prop_assert_eq!(origin.calls(), 1);
        }
    }
}
