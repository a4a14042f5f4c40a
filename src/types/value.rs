use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::PointError;

/// Asset pair, written as `BASE/QUOTE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Pair {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    pub fn invert(&self) -> Self {
        Pair {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() || self.quote.is_empty()
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('/') => {
                Ok(Pair::new(base.trim(), quote.trim()))
            }
            _ => Err(format!("invalid pair: {s}")),
        }
    }
}

impl TryFrom<String> for Pair {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> String {
        pair.to_string()
    }
}

/// Priced pair observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub pair: Pair,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume24h: Option<f64>,
}

impl Tick {
    pub fn new(pair: Pair, price: f64, volume24h: Option<f64>) -> Self {
        Tick { pair, price, volume24h }
    }

    /// Flips the pair orientation.
    ///
    /// A zero price is carried over unchanged rather than becoming infinite;
    /// volume is rescaled into the new base asset.
    pub fn invert(&self) -> Tick {
        let price = if self.price != 0.0 { 1.0 / self.price } else { self.price };
        let volume24h = match self.volume24h {
            Some(volume) if price != 0.0 => Some(volume / price),
            other => other,
        };
        Tick {
            pair: self.pair.invert(),
            price,
            volume24h,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), PointError> {
        if self.pair.is_empty() {
            return Err(PointError::InvalidValue("pair is not set".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(PointError::InvalidValue(format!("price {} is not a valid price", self.price)));
        }
        if let Some(volume) = self.volume24h {
            if !volume.is_finite() || volume < 0.0 {
                return Err(PointError::InvalidValue(format!("volume {volume} is not a valid volume")));
            }
        }
        Ok(())
    }

    pub fn print(&self) -> String {
        match self.volume24h {
            Some(volume) => format!("{} {} (volume24h: {})", self.pair, self.price, volume),
            None => format!("{} {}", self.pair, self.price),
        }
    }
}

/// Payload of a data point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Tick(Tick),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Tick(_) => "tick",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            Value::Tick(tick) => Some(tick),
            _ => None,
        }
    }

    /// Numeric view used by aggregators: a tick's price or a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Tick(tick) => Some(tick.price),
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), PointError> {
        match self {
            Value::Tick(tick) => tick.validate(),
            Value::Number(n) if !n.is_finite() => {
                Err(PointError::InvalidValue(format!("{n} is not a finite number")))
            }
            Value::Number(_) | Value::Text(_) => Ok(()),
        }
    }

    pub fn print(&self) -> String {
        match self {
            Value::Tick(tick) => tick.print(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<Tick> for Value {
    fn from(tick: Tick) -> Self {
        Value::Tick(tick)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}
