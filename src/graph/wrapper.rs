use crate::error::{Error, PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::types::point::{Meta, Point};

/// Relabels a single child with extra metadata.
///
/// The child's value, time, error and provenance pass through untouched.
#[derive(Clone, Debug)]
pub struct WrapperNode {
    meta: Meta,
    node: Option<Box<Node>>,
}

impl WrapperNode {
    pub fn new(meta: Meta) -> Self {
        WrapperNode { meta, node: None }
    }
}

impl GraphNode for WrapperNode {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        if nodes.len() > 1 {
            return Err(Error::Arity {
                node: "alias",
                expected: 1,
                got: nodes.len(),
            });
        }
        if let Some(node) = nodes.into_iter().next() {
            if self.node.is_some() {
                return Err(Error::AlreadySet { node: "alias", slot: "node" });
            }
            self.node = Some(Box::new(node));
        }
        Ok(())
    }

    fn children(&self) -> Vec<&Node> {
        self.node.as_deref().into_iter().collect()
    }

    fn meta(&self) -> Meta {
        let mut meta = crate::meta! { "type" => "alias" };
        meta.extend(self.meta.clone());
        meta
    }

    /// Only the configured meta is merged, so the child's `type` survives.
    fn evaluate(&self) -> Point {
        match &self.node {
            Some(node) => node.evaluate().with_meta(self.meta.clone()),
            None => Point::from_error(PointError::Incomplete).with_meta(self.meta()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testutil::{empty_leaf, leaf};
    use crate::meta;

    #[test]
    fn test_wrapper_adds_meta_without_touching_value() {
        let child = leaf("ETH/USD", 42.0);
        let direct = child.evaluate();

        let mut wrapper = WrapperNode::new(meta! { "model" => "ETH/USD", "origin" => "override" });
        wrapper.add_nodes(vec![child]).unwrap();
        let point = wrapper.evaluate();

        assert_eq!(point.value, direct.value);
        assert_eq!(point.time, direct.time);
        assert_eq!(point.meta["model"], "ETH/USD");
        assert_eq!(point.meta["origin"], "override");
        assert_eq!(point.meta["type"], "origin");
        assert_eq!(wrapper.meta()["type"], "alias");
        assert_eq!(wrapper.meta()["model"], "ETH/USD");
    }

    #[test]
    fn test_wrapper_keeps_child_error() {
        let mut wrapper = WrapperNode::new(meta! { "model" => "ETH/USD" });
        wrapper.add_nodes(vec![empty_leaf("ETH/USD")]).unwrap();
        assert_eq!(wrapper.evaluate().validate(), Err(PointError::NotSet));
    }

    #[test]
    fn test_wrapper_arity() {
        let mut wrapper = WrapperNode::new(Meta::new());
        let err = wrapper
            .add_nodes(vec![leaf("ETH/USD", 1.0), leaf("ETH/USD", 1.0)])
            .unwrap_err();
        assert!(matches!(err, Error::Arity { expected: 1, got: 2, .. }));

        wrapper.add_nodes(vec![leaf("ETH/USD", 1.0)]).unwrap();
        let err = wrapper.add_nodes(vec![leaf("ETH/USD", 1.0)]).unwrap_err();
        assert!(matches!(err, Error::AlreadySet { .. }));
    }

    #[test]
    fn test_unconfigured_wrapper() {
        let wrapper = WrapperNode::new(Meta::new());
        assert!(wrapper.children().is_empty());
        assert_eq!(wrapper.evaluate().validate(), Err(PointError::Incomplete));
    }
}
