use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Update pass metrics
    pub static ref UPDATE_PASSES: Counter = Counter::new(
        "update_passes_total",
        "Total number of update passes"
    ).expect("valid metric");

    pub static ref UPDATE_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "update_latency_seconds",
            "Duration of a full update pass"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0])
    ).expect("valid metric");

    // Origin metrics
    pub static ref ORIGIN_FETCHES: IntCounterVec = IntCounterVec::new(
        Opts::new("origin_fetches_total", "Total number of origin fetch calls"),
        &["origin"]
    ).expect("valid metric");

    pub static ref ORIGIN_FETCH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("origin_fetch_failures_total", "Total number of failed origin fetch calls"),
        &["origin"]
    ).expect("valid metric");

    pub static ref ORIGIN_PANICS: IntCounterVec = IntCounterVec::new(
        Opts::new("origin_panics_total", "Total number of panics inside origin fetch calls"),
        &["origin"]
    ).expect("valid metric");

    // Cache metrics
    pub static ref POINTS_UPDATED: Counter = Counter::new(
        "points_updated_total",
        "Total number of data points written into origin nodes"
    ).expect("valid metric");

    pub static ref POINTS_REJECTED: Counter = Counter::new(
        "points_rejected_total",
        "Total number of fetched data points refused by origin nodes"
    ).expect("valid metric");

    pub static ref POINTS_MISSING: Counter = Counter::new(
        "points_missing_total",
        "Total number of queries an origin returned no data point for"
    ).expect("valid metric");
}

pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(UPDATE_PASSES.clone()),
        Box::new(UPDATE_LATENCY.clone()),
        Box::new(ORIGIN_FETCHES.clone()),
        Box::new(ORIGIN_FETCH_FAILURES.clone()),
        Box::new(ORIGIN_PANICS.clone()),
        Box::new(POINTS_UPDATED.clone()),
        Box::new(POINTS_REJECTED.clone()),
        Box::new(POINTS_MISSING.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
}
