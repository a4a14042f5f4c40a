pub mod types;
pub mod error;
pub mod config;
pub mod graph;
pub mod interfaces;
pub mod observability;
pub mod price_infra;
pub mod trace;
