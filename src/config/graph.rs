use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::graph::{
    DevCircuitBreakerNode, GraphNode, Node, OriginNode, TickIndirectNode, TickInvertNode,
    TickMedianNode, WrapperNode,
};
use crate::interfaces::origin::Query;
use crate::types::point::Meta;
use crate::types::value::Pair;

fn default_freshness_threshold() -> u64 {
    60
}

fn default_expiry_threshold() -> u64 {
    120
}

fn default_min_values() -> usize {
    1
}

/// A named graph root.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelConfig {
    pub name: String,
    pub node: NodeConfig,
}

/// Declarative description of a node and its children.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Origin {
        origin: String,
        query: Query,
        #[serde(default = "default_freshness_threshold")]
        freshness_threshold_secs: u64,
        #[serde(default = "default_expiry_threshold")]
        expiry_threshold_secs: u64,
    },
    Alias {
        #[serde(default)]
        meta: Meta,
        node: Box<NodeConfig>,
    },
    Invert {
        node: Box<NodeConfig>,
    },
    DevCircuitBreaker {
        value: Box<NodeConfig>,
        reference: Box<NodeConfig>,
        threshold: Box<NodeConfig>,
    },
    Median {
        pair: Pair,
        #[serde(default = "default_min_values")]
        min_values: usize,
        nodes: Vec<NodeConfig>,
    },
    Indirect {
        nodes: Vec<NodeConfig>,
    },
}

/// Builds nodes from configuration, checking origin names against the
/// registered origins.
pub struct GraphBuilder<'a> {
    origins: &'a HashSet<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(origins: &'a HashSet<String>) -> Self {
        GraphBuilder { origins }
    }

    /// Builds every model, each wrapped so its points carry the model name.
    pub fn build_models(&self, models: &[ModelConfig]) -> Result<BTreeMap<String, Node>> {
        let mut built = BTreeMap::new();
        for model in models {
            let mut root = WrapperNode::new(crate::meta! { "model" => model.name });
            root.add_nodes(vec![self.build(&model.node)?])?;
            if built.insert(model.name.clone(), Node::from(root)).is_some() {
                return Err(Error::ConfigError(format!("duplicate model: {}", model.name)));
            }
        }
        Ok(built)
    }

    pub fn build(&self, config: &NodeConfig) -> Result<Node> {
        let node: Node = match config {
            NodeConfig::Origin {
                origin,
                query,
                freshness_threshold_secs,
                expiry_threshold_secs,
            } => {
                if !self.origins.contains(origin) {
                    return Err(Error::UnknownOrigin(origin.clone()));
                }
                OriginNode::new(
                    origin.clone(),
                    query.clone(),
                    Duration::from_secs(*freshness_threshold_secs),
                    Duration::from_secs(*expiry_threshold_secs),
                )?
                .into()
            }
            NodeConfig::Alias { meta, node } => {
                let mut wrapper = WrapperNode::new(meta.clone());
                wrapper.add_nodes(vec![self.build(node)?])?;
                wrapper.into()
            }
            NodeConfig::Invert { node } => {
                let mut invert = TickInvertNode::new();
                invert.add_nodes(vec![self.build(node)?])?;
                invert.into()
            }
            NodeConfig::DevCircuitBreaker { value, reference, threshold } => {
                let mut breaker = DevCircuitBreakerNode::new();
                breaker.add_nodes(vec![
                    self.build(value)?,
                    self.build(reference)?,
                    self.build(threshold)?,
                ])?;
                breaker.into()
            }
            NodeConfig::Median { pair, min_values, nodes } => {
                if nodes.is_empty() {
                    return Err(Error::MissingNode { node: "median", slot: "nodes" });
                }
                let mut median = TickMedianNode::new(pair.clone(), *min_values);
                median.add_nodes(self.build_all(nodes)?)?;
                median.into()
            }
            NodeConfig::Indirect { nodes } => {
                if nodes.is_empty() {
                    return Err(Error::MissingNode { node: "indirect", slot: "nodes" });
                }
                let mut indirect = TickIndirectNode::new();
                indirect.add_nodes(self.build_all(nodes)?)?;
                indirect.into()
            }
        };
        Ok(node)
    }

    fn build_all(&self, nodes: &[NodeConfig]) -> Result<Vec<Node>> {
        nodes.iter().map(|node| self.build(node)).collect()
    }
}
