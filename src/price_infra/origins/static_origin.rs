use std::collections::HashMap;
use async_trait::async_trait;
use chrono::Utc;
use crate::config::StaticPriceConfig;
use crate::error::Result;
use crate::interfaces::origin::{Origin, Query};
use crate::types::point::Point;
use crate::types::value::{Tick, Value};

/// Origin answering from a fixed table, stamped with the time of the fetch.
///
/// Pair queries produce ticks, any other query a plain number.
pub struct StaticOrigin {
    name: String,
    prices: HashMap<Query, StaticPriceConfig>,
}

impl StaticOrigin {
    pub fn new(name: impl Into<String>, prices: impl IntoIterator<Item = StaticPriceConfig>) -> Self {
        StaticOrigin {
            name: name.into(),
            prices: prices.into_iter().map(|p| (p.query.clone(), p)).collect(),
        }
    }

    fn value(query: &Query, price: &StaticPriceConfig) -> Value {
        match query {
            Query::Pair(pair) => Tick::new(pair.clone(), price.price, price.volume24h).into(),
            Query::Raw(_) => Value::Number(price.price),
        }
    }
}

#[async_trait]
impl Origin for StaticOrigin {
    async fn fetch_data_points(&self, queries: &[Query]) -> Result<HashMap<Query, Point>> {
        let now = Utc::now();
        let points = queries
            .iter()
            .filter_map(|query| {
                let price = self.prices.get(query)?;
                let point = Point::new(Self::value(query, price), now);
                Some((query.clone(), point))
            })
            .collect();
        tracing::debug!("Static origin {} answered {} queries", self.name, queries.len());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(query: &str, price: f64) -> StaticPriceConfig {
        StaticPriceConfig {
            query: Query::from(query),
            price,
            volume24h: None,
        }
    }

    #[tokio::test]
    async fn test_answers_known_queries_only() {
        let origin = StaticOrigin::new("fixed", vec![price("ETH/USD", 2000.0), price("spread", 0.05)]);
        let queries = vec![Query::from("ETH/USD"), Query::from("spread"), Query::from("BTC/USD")];

        let points = origin.fetch_data_points(&queries).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[&queries[0]].tick().unwrap().price, 2000.0);
        assert_eq!(points[&queries[1]].value, Some(Value::Number(0.05)));
        assert!(points[&queries[0]].is_valid());
    }
}
