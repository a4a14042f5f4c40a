use crate::error::{Error, PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::types::point::{Meta, Point};

const NODE: &str = "dev_circuit_breaker";

/// Invalidates the `value` child once it deviates from the `reference` child
/// by more than `threshold`.
///
/// Children are assigned by the order they are added: value, reference,
/// threshold. The relative deviation is `|1 - reference / value|` and the
/// breaker trips only when it is strictly above the threshold.
#[derive(Clone, Debug, Default)]
pub struct DevCircuitBreakerNode {
    value: Option<Box<Node>>,
    reference: Option<Box<Node>>,
    threshold: Option<Box<Node>>,
}

impl DevCircuitBreakerNode {
    pub fn new() -> Self {
        DevCircuitBreakerNode::default()
    }

    fn slots(&self) -> [(&'static str, &Option<Box<Node>>); 3] {
        [
            ("value", &self.value),
            ("reference", &self.reference),
            ("threshold", &self.threshold),
        ]
    }
}

/// Extracts the numeric reading of a child, wrapping failures with its role.
fn numeric(role: &str, point: &Point) -> std::result::Result<f64, PointError> {
    point.validate().map_err(|err| PointError::child(role, err))?;
    let value = point.value.as_ref().ok_or(PointError::MissingValue)?;
    value.as_f64().ok_or_else(|| PointError::UnexpectedValue {
        role: role.to_string(),
        expected: "number",
        got: value.kind(),
    })
}

impl GraphNode for DevCircuitBreakerNode {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        if nodes.len() > 3 {
            return Err(Error::Arity {
                node: NODE,
                expected: 3,
                got: nodes.len(),
            });
        }
        let free = self.slots().iter().filter(|(_, slot)| slot.is_none()).count();
        if nodes.len() > free {
            let slot = self
                .slots()
                .iter()
                .find(|(_, slot)| slot.is_some())
                .map_or("value", |(name, _)| *name);
            return Err(Error::AlreadySet { node: NODE, slot });
        }
        let mut nodes = nodes.into_iter();
        for slot in [&mut self.value, &mut self.reference, &mut self.threshold] {
            if slot.is_none() {
                *slot = nodes.next().map(Box::new);
            }
        }
        Ok(())
    }

    fn children(&self) -> Vec<&Node> {
        match (&self.value, &self.reference, &self.threshold) {
            (Some(value), Some(reference), Some(threshold)) => {
                vec![&**value, &**reference, &**threshold]
            }
            _ => Vec::new(),
        }
    }

    fn meta(&self) -> Meta {
        crate::meta! { "type" => NODE }
    }

    fn evaluate(&self) -> Point {
        let (Some(value_node), Some(reference_node), Some(threshold_node)) =
            (&self.value, &self.reference, &self.threshold)
        else {
            let missing = if self.value.is_none() {
                "value"
            } else if self.reference.is_none() {
                "reference"
            } else {
                "threshold"
            };
            return Point::from_error(PointError::Incomplete)
                .with_meta(self.meta())
                .with_meta(crate::meta! { "missing" => missing });
        };

        let value_point = value_node.evaluate();
        let reference_point = reference_node.evaluate();
        let threshold_point = threshold_node.evaluate();

        let mut point = Point {
            value: value_point.value.clone(),
            time: value_point.time,
            meta: self.meta(),
            ..Default::default()
        };

        let readings = numeric("value", &value_point).and_then(|value| {
            let reference = numeric("reference", &reference_point)?;
            let threshold = numeric("threshold", &threshold_point)?;
            Ok((value, reference, threshold))
        });

        match readings {
            Err(err) => point.error = Some(err),
            Ok((value, _, _)) if value == 0.0 => point.error = Some(PointError::DivisionByZero),
            Ok((value, reference, threshold)) => {
                let deviation = (1.0 - reference / value).abs();
                point.meta.extend(crate::meta! {
                    "deviation" => deviation,
                    "threshold" => threshold,
                });
                if deviation > threshold {
                    point.error = Some(PointError::DeviationExceeded { deviation, threshold });
                }
            }
        }

        point.sub_points = vec![value_point, reference_point];
        point
    }
}
