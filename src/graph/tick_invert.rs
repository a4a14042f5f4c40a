use crate::error::{Error, PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::types::point::{Meta, Point};

/// Inverts the tick of its only child: `A/B` becomes `B/A`.
#[derive(Clone, Debug, Default)]
pub struct TickInvertNode {
    node: Option<Box<Node>>,
}

impl TickInvertNode {
    pub fn new() -> Self {
        TickInvertNode { node: None }
    }
}

impl GraphNode for TickInvertNode {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        if nodes.len() > 1 {
            return Err(Error::Arity {
                node: "invert",
                expected: 1,
                got: nodes.len(),
            });
        }
        if let Some(node) = nodes.into_iter().next() {
            if self.node.is_some() {
                return Err(Error::AlreadySet { node: "invert", slot: "node" });
            }
            self.node = Some(Box::new(node));
        }
        Ok(())
    }

    fn children(&self) -> Vec<&Node> {
        self.node.as_deref().into_iter().collect()
    }

    fn meta(&self) -> Meta {
        crate::meta! { "type" => "invert" }
    }

    fn evaluate(&self) -> Point {
        let Some(node) = &self.node else {
            return Point::from_error(PointError::Incomplete).with_meta(self.meta());
        };
        let child = node.evaluate();
        let mut point = Point {
            time: child.time,
            meta: self.meta(),
            ..Default::default()
        };

        match (child.validate(), child.value.as_ref()) {
            (Err(err), _) => point.error = Some(PointError::child("inverted", err)),
            (Ok(()), Some(value)) => match value.as_tick() {
                Some(tick) => point.value = Some(tick.invert().into()),
                None => {
                    point.error = Some(PointError::UnexpectedValue {
                        role: "inverted".to_string(),
                        expected: "tick",
                        got: value.kind(),
                    })
                }
            },
            (Ok(()), None) => point.error = Some(PointError::MissingValue),
        }

        point.sub_points = vec![child];
        point
    }
}
