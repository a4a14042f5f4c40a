use crate::error::{PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::types::point::{Meta, Point};
use crate::types::value::{Pair, Tick};

/// Derives a price through intermediate pairs, e.g. `BTC/ETH` from
/// `BTC/USD` and `ETH/USD`.
///
/// Children are folded left to right. Every child must be valid.
#[derive(Clone, Debug, Default)]
pub struct TickIndirectNode {
    nodes: Vec<Node>,
}

impl TickIndirectNode {
    pub fn new() -> Self {
        TickIndirectNode { nodes: Vec::new() }
    }

    fn aggregate(&self, points: &[Point]) -> std::result::Result<Point, PointError> {
        let mut result: Option<Tick> = None;
        let mut oldest = None;

        for (i, point) in points.iter().enumerate() {
            let role = format!("leg {}", i + 1);
            point.validate().map_err(|err| PointError::child(role.as_str(), err))?;
            let Some(tick) = point.tick() else {
                return Err(PointError::UnexpectedValue {
                    role,
                    expected: "tick",
                    got: point.value.as_ref().map_or("none", |value| value.kind()),
                });
            };
            result = Some(match result {
                None => tick.clone(),
                Some(acc) => cross_rate(&acc, tick)?,
            });
            oldest = match (oldest, point.time) {
                (Some(current), Some(time)) if current <= time => Some(current),
                (_, time) => time,
            };
        }

        let tick = result.ok_or(PointError::Incomplete)?;
        Ok(Point {
            value: Some(tick.into()),
            time: oldest,
            ..Default::default()
        })
    }
}

/// Combines two ticks sharing an asset into a tick for the remaining two.
pub fn cross_rate(a: &Tick, b: &Tick) -> std::result::Result<Tick, PointError> {
    let divide = |num: f64, den: f64| {
        if den == 0.0 {
            Err(PointError::DivisionByZero)
        } else {
            Ok(num / den)
        }
    };

    let (pair, price) = if a.pair.quote == b.pair.base {
        // A/B * B/C = A/C
        (Pair::new(&a.pair.base, &b.pair.quote), a.price * b.price)
    } else if a.pair.quote == b.pair.quote {
        // A/B / C/B = A/C
        (Pair::new(&a.pair.base, &b.pair.base), divide(a.price, b.price)?)
    } else if a.pair.base == b.pair.base {
        // B/C / B/A = A/C
        (Pair::new(&a.pair.quote, &b.pair.quote), divide(b.price, a.price)?)
    } else if a.pair.base == b.pair.quote {
        // B/A * C/B = C/A
        (Pair::new(&b.pair.base, &a.pair.quote), a.price * b.price)
    } else {
        return Err(PointError::NoCommonAsset {
            a: a.pair.clone(),
            b: b.pair.clone(),
        });
    };

    Ok(Tick::new(pair, price, None))
}

impl GraphNode for TickIndirectNode {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        self.nodes.extend(nodes);
        Ok(())
    }

    fn children(&self) -> Vec<&Node> {
        self.nodes.iter().collect()
    }

    fn meta(&self) -> Meta {
        crate::meta! { "type" => "indirect" }
    }

    fn evaluate(&self) -> Point {
        let points: Vec<Point> = self.nodes.iter().map(GraphNode::evaluate).collect();
        let point = match self.aggregate(&points) {
            Ok(point) => point,
            Err(err) => Point::from_error(err),
        };
        point.with_meta(self.meta()).with_sub_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testutil::{empty_leaf, leaf};

    fn tick(pair: &str, price: f64) -> Tick {
        Tick::new(pair.parse().unwrap(), price, None)
    }

    fn assert_tick(actual: Tick, pair: &str, price: f64) {
        assert_eq!(actual.pair.to_string(), pair);
        assert!((actual.price - price).abs() < 1e-9, "{} != {}", actual.price, price);
    }

    #[test]
    fn test_cross_rate_cases() {
        assert_tick(cross_rate(&tick("A/B", 2.0), &tick("B/C", 3.0)).unwrap(), "A/C", 6.0);
        assert_tick(cross_rate(&tick("A/B", 6.0), &tick("C/B", 3.0)).unwrap(), "A/C", 2.0);
        assert_tick(cross_rate(&tick("B/A", 2.0), &tick("B/C", 6.0)).unwrap(), "A/C", 3.0);
        assert_tick(cross_rate(&tick("B/A", 2.0), &tick("C/B", 3.0)).unwrap(), "C/A", 6.0);
    }

    #[test]
    fn test_cross_rate_errors() {
        assert!(matches!(
            cross_rate(&tick("A/B", 1.0), &tick("C/D", 1.0)),
            Err(PointError::NoCommonAsset { .. })
        ));
        assert_eq!(
            cross_rate(&tick("A/B", 1.0), &tick("C/B", 0.0)).unwrap_err(),
            PointError::DivisionByZero
        );
    }

    #[test]
    fn test_indirect_price() {
        let mut node = TickIndirectNode::new();
        node.add_nodes(vec![leaf("BTC/USD", 30000.0), leaf("ETH/USD", 2000.0)])
            .unwrap();

        let point = node.evaluate();
        assert!(point.is_valid());
        assert_tick(point.tick().cloned().unwrap(), "BTC/ETH", 15.0);
        assert_eq!(point.sub_points.len(), 2);
        assert_eq!(point.meta["type"], "indirect");
    }

    #[test]
    fn test_any_invalid_leg_invalidates() {
        let mut node = TickIndirectNode::new();
        node.add_nodes(vec![leaf("BTC/USD", 30000.0), empty_leaf("ETH/USD")])
            .unwrap();

        let point = node.evaluate();
        assert_eq!(
            point.validate().unwrap_err().to_string(),
            "invalid leg 2 data point: data point is not set"
        );
        assert_eq!(point.sub_points.len(), 2);
    }

    #[test]
    fn test_empty_indirect_is_incomplete() {
        assert_eq!(
            TickIndirectNode::new().evaluate().validate(),
            Err(PointError::Incomplete)
        );
    }
}
