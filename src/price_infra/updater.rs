use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use crate::error::{Error, Result};
use crate::graph::{Node, OriginNode};
use crate::interfaces::origin::{Origin, Query};
use crate::observability::metrics::{
    ORIGIN_FETCHES, ORIGIN_FETCH_FAILURES, ORIGIN_PANICS, POINTS_MISSING, POINTS_REJECTED,
    POINTS_UPDATED, UPDATE_LATENCY, UPDATE_PASSES,
};
use crate::observability::tracing::{trace_origin_fetch, trace_update_pass};

/// Queries pending for a single origin, in discovery order, together with
/// the leaves waiting on each of them.
#[derive(Default)]
struct Batch {
    queries: Vec<Query>,
    nodes: HashMap<Query, Vec<Arc<OriginNode>>>,
}

impl Batch {
    fn push(&mut self, node: Arc<OriginNode>) {
        let query = node.query().clone();
        let waiting = self.nodes.entry(query.clone()).or_default();
        if waiting.is_empty() {
            self.queries.push(query);
        }
        waiting.push(node);
    }
}

/// Refreshes origin leaves of a graph.
///
/// Each pass fetches every stale or missing leaf, one concurrent task per
/// origin, with the queries for the same origin batched into one call. A
/// failing or panicking origin only affects its own leaves.
pub struct Updater {
    origins: HashMap<String, Arc<dyn Origin>>,
    limiter: Option<Arc<Semaphore>>,
}

impl Updater {
    pub fn new(origins: HashMap<String, Arc<dyn Origin>>) -> Self {
        Updater {
            origins,
            limiter: None,
        }
    }

    /// Caps how many origins are fetched at the same time.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(max_concurrency.max(1))));
        self
    }

    /// Runs one refresh pass and waits for every origin task to finish.
    ///
    /// Results are only visible through the leaves: evaluate the graph
    /// afterwards and validate the points to find leaves that could not be
    /// refreshed. Cancelling `cancel` makes pending fetches return early and
    /// leaves their nodes as they were.
    pub async fn update(&self, cancel: &CancellationToken, nodes: &[&Node]) {
        let batches = self.pending_batches(nodes);
        if batches.is_empty() {
            debug!("All origin nodes are fresh, nothing to update");
            return;
        }

        let span = trace_update_pass(nodes.len(), batches.len());
        let timer = UPDATE_LATENCY.start_timer();
        UPDATE_PASSES.inc();

        async {
            let mut fetched = Vec::with_capacity(batches.len());
            let mut handles = Vec::with_capacity(batches.len());

            for (name, batch) in batches {
                let Some(origin) = self.origins.get(&name) else {
                    warn!(
                        "Unknown origin {}, {} queries left unrefreshed",
                        name,
                        batch.queries.len()
                    );
                    continue;
                };
                let span = trace_origin_fetch(&name, batch.queries.len());
                let queries = query_list(&batch.queries);
                let task = fetch_batch(
                    name.clone(),
                    Arc::clone(origin),
                    batch,
                    cancel.clone(),
                    self.limiter.clone(),
                );
                handles.push(tokio::spawn(task.instrument(span)));
                fetched.push((name, queries));
            }

            for ((name, queries), joined) in fetched.into_iter().zip(join_all(handles).await) {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(Error::Cancelled)) => {
                        info!(queries = %queries, "Fetching data points from the origin {} was cancelled", name);
                    }
                    Ok(Err(e)) => {
                        ORIGIN_FETCH_FAILURES.with_label_values(&[name.as_str()]).inc();
                        warn!(queries = %queries, "Unable to fetch data points from the origin {}: {}", name, e);
                    }
                    Err(e) if e.is_panic() => {
                        ORIGIN_PANICS.with_label_values(&[name.as_str()]).inc();
                        let message = panic_message(e.into_panic());
                        error!(
                            origin = %name,
                            queries = %queries,
                            "{}: {}",
                            Error::OriginPanicked(name.clone()),
                            message
                        );
                    }
                    Err(e) => {
                        warn!(queries = %queries, "Fetch task for the origin {} did not complete: {}", name, e);
                    }
                }
            }
        }
        .instrument(span)
        .await;

        timer.observe_duration();
    }

    /// Groups every leaf that needs a refresh by origin name.
    fn pending_batches(&self, nodes: &[&Node]) -> BTreeMap<String, Batch> {
        let now = Utc::now();
        let mut batches: BTreeMap<String, Batch> = BTreeMap::new();
        for node in nodes {
            for leaf in node.origin_nodes() {
                if leaf.needs_refresh(now) {
                    batches.entry(leaf.origin().to_string()).or_default().push(leaf);
                }
            }
        }
        batches
    }
}

async fn fetch_batch(
    name: String,
    origin: Arc<dyn Origin>,
    batch: Batch,
    cancel: CancellationToken,
    limiter: Option<Arc<Semaphore>>,
) -> Result<()> {
    let _permit = match limiter {
        Some(limiter) => Some(tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = limiter.acquire_owned() => permit.map_err(|_| Error::Cancelled)?,
        }),
        None => None,
    };

    ORIGIN_FETCHES.with_label_values(&[name.as_str()]).inc();
    let mut points = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = origin.fetch_data_points(&batch.queries) => result?,
    };

    let now = Utc::now();
    for query in &batch.queries {
        let waiting = batch.nodes.get(query).map(Vec::as_slice).unwrap_or_default();
        let Some(point) = points.remove(query) else {
            POINTS_MISSING.inc();
            warn!(origin = %name, query = %query, "Origin returned no data point for the query");
            continue;
        };
        for node in waiting {
            match node.refresh(point.clone(), now) {
                Ok(true) => POINTS_UPDATED.inc(),
                Ok(false) => {
                    debug!(origin = %name, query = %query, "Cached data point is still fresh, keeping it");
                }
                Err(e) => {
                    POINTS_REJECTED.inc();
                    warn!(origin = %name, query = %query, "Data point rejected: {}", e);
                }
            }
        }
    }
    Ok(())
}

fn query_list(queries: &[Query]) -> String {
    queries.iter().map(Query::to_string).collect::<Vec<_>>().join(", ")
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
