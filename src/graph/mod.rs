//! Data point computation graph.
//!
//! Leaves ([`OriginNode`]) hold the last point fetched from an origin; every
//! other node derives its point from its children on each evaluation. Nothing
//! above the leaves is cached, so an evaluation always reflects the current
//! state of the leaf caches.

pub mod origin_node;
pub mod wrapper;
pub mod tick_invert;
pub mod dev_circuit_breaker;
pub mod tick_median;
pub mod tick_indirect;
pub mod model;

use std::sync::Arc;
use crate::error::Result;
use crate::types::point::{Meta, Point};

pub use dev_circuit_breaker::DevCircuitBreakerNode;
pub use model::Model;
pub use origin_node::OriginNode;
pub use tick_indirect::TickIndirectNode;
pub use tick_invert::TickInvertNode;
pub use tick_median::TickMedianNode;
pub use wrapper::WrapperNode;

/// Operations every node supports.
pub trait GraphNode {
    /// Attaches child nodes. Variants with fixed slots reject counts they
    /// cannot hold, so malformed graphs fail while they are being built.
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()>;

    /// Immediate children; empty until the node is fully configured.
    fn children(&self) -> Vec<&Node>;

    /// Static description of the node kind and its parameters.
    fn meta(&self) -> Meta;

    /// Computes the node's current point. Never panics: failures are
    /// reported through the returned point's error.
    fn evaluate(&self) -> Point;
}

#[derive(Clone, Debug)]
pub enum Node {
    Origin(Arc<OriginNode>),
    Wrapper(WrapperNode),
    TickInvert(TickInvertNode),
    DevCircuitBreaker(DevCircuitBreakerNode),
    TickMedian(TickMedianNode),
    TickIndirect(TickIndirectNode),
}

impl Node {
    fn inner(&self) -> &dyn GraphNode {
        match self {
            Node::Origin(node) => &**node,
            Node::Wrapper(node) => node,
            Node::TickInvert(node) => node,
            Node::DevCircuitBreaker(node) => node,
            Node::TickMedian(node) => node,
            Node::TickIndirect(node) => node,
        }
    }

    fn inner_mut(&mut self) -> Option<&mut dyn GraphNode> {
        match self {
            Node::Origin(_) => None,
            Node::Wrapper(node) => Some(node),
            Node::TickInvert(node) => Some(node),
            Node::DevCircuitBreaker(node) => Some(node),
            Node::TickMedian(node) => Some(node),
            Node::TickIndirect(node) => Some(node),
        }
    }

    /// Every origin leaf reachable from this node, depth first.
    pub fn origin_nodes(&self) -> Vec<Arc<OriginNode>> {
        let mut found = Vec::new();
        self.collect_origin_nodes(&mut found);
        found
    }

    fn collect_origin_nodes(&self, found: &mut Vec<Arc<OriginNode>>) {
        match self {
            Node::Origin(node) => found.push(Arc::clone(node)),
            _ => {
                for child in self.children() {
                    child.collect_origin_nodes(found);
                }
            }
        }
    }

    /// Metadata-only description of the subtree.
    pub fn describe(&self) -> Model {
        Model {
            meta: self.meta(),
            models: self.children().into_iter().map(Node::describe).collect(),
        }
    }
}

impl GraphNode for Node {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        match self.inner_mut() {
            Some(node) => node.add_nodes(nodes),
            None => Err(crate::error::Error::LeafNode),
        }
    }

    fn children(&self) -> Vec<&Node> {
        self.inner().children()
    }

    fn meta(&self) -> Meta {
        self.inner().meta()
    }

    fn evaluate(&self) -> Point {
        self.inner().evaluate()
    }
}

impl From<OriginNode> for Node {
    fn from(node: OriginNode) -> Self {
        Node::Origin(Arc::new(node))
    }
}

impl From<WrapperNode> for Node {
    fn from(node: WrapperNode) -> Self {
        Node::Wrapper(node)
    }
}

impl From<TickInvertNode> for Node {
    fn from(node: TickInvertNode) -> Self {
        Node::TickInvert(node)
    }
}

impl From<DevCircuitBreakerNode> for Node {
    fn from(node: DevCircuitBreakerNode) -> Self {
        Node::DevCircuitBreaker(node)
    }
}

impl From<TickMedianNode> for Node {
    fn from(node: TickMedianNode) -> Self {
        Node::TickMedian(node)
    }
}

impl From<TickIndirectNode> for Node {
    fn from(node: TickIndirectNode) -> Self {
        Node::TickIndirect(node)
    }
}
