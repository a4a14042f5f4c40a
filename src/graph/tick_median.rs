use crate::error::{PointError, Result};
use crate::graph::{GraphNode, Node};
use crate::types::point::{Meta, Point};
use crate::types::value::{Pair, Tick};

/// Median price over any number of tick children.
///
/// Invalid children are left out as long as at least `min_values` valid ones
/// remain. A valid child quoting a different pair invalidates the result.
/// Volumes of the used children are summed and the result carries the
/// oldest of their times.
#[derive(Clone, Debug)]
pub struct TickMedianNode {
    pair: Pair,
    min_values: usize,
    nodes: Vec<Node>,
}

impl TickMedianNode {
    pub fn new(pair: Pair, min_values: usize) -> Self {
        TickMedianNode {
            pair,
            min_values: min_values.max(1),
            nodes: Vec::new(),
        }
    }

    fn aggregate(&self, points: &[Point]) -> std::result::Result<Point, PointError> {
        let mut ticks: Vec<&Tick> = Vec::with_capacity(points.len());
        let mut oldest = None;

        for point in points.iter().filter(|point| point.is_valid()) {
            let Some(tick) = point.tick() else {
                return Err(PointError::UnexpectedValue {
                    role: "median".to_string(),
                    expected: "tick",
                    got: point.value.as_ref().map_or("none", |value| value.kind()),
                });
            };
            if tick.pair != self.pair {
                return Err(PointError::PairMismatch {
                    expected: self.pair.clone(),
                    got: tick.pair.clone(),
                });
            }
            ticks.push(tick);
            oldest = match (oldest, point.time) {
                (Some(current), Some(time)) if current <= time => Some(current),
                (_, time) => time,
            };
        }

        if ticks.len() < self.min_values {
            return Err(PointError::NotEnoughValues {
                got: ticks.len(),
                need: self.min_values,
            });
        }

        let prices: Vec<f64> = ticks.iter().map(|tick| tick.price).collect();
        let volumes: Vec<f64> = ticks.iter().filter_map(|tick| tick.volume24h).collect();
        let volume24h = if volumes.is_empty() {
            None
        } else {
            Some(volumes.iter().sum())
        };

        let tick = Tick::new(self.pair.clone(), median(prices), volume24h);
        Ok(Point {
            value: Some(tick.into()),
            time: oldest,
            ..Default::default()
        })
    }
}

/// Median of a non-empty set; the mean of the two middle values for even sizes.
pub fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.is_empty() {
        f64::NAN
    } else if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl GraphNode for TickMedianNode {
    fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        self.nodes.extend(nodes);
        Ok(())
    }

    fn children(&self) -> Vec<&Node> {
        self.nodes.iter().collect()
    }

    fn meta(&self) -> Meta {
        crate::meta! {
            "type" => "median",
            "pair" => self.pair.to_string(),
            "min_values" => self.min_values,
        }
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
