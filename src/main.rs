use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::{bail, Context};
use pricegraph::config::AppConfig;
use pricegraph::interfaces::provider::Provider;
use pricegraph::observability::metrics::register_metrics;
use pricegraph::observability::tracing::init_tracing;
use pricegraph::price_infra::GraphProvider;
use pricegraph::types::point::Point;
use pricegraph::trace::{render_all, to_json, TraceOptions};
use tracing::info;

const USAGE: &str = "usage: pricegraph [--json] [--models] [--watch] [env] [model...]";

struct Args {
    env: String,
    models: Vec<String>,
    json: bool,
    structure: bool,
    watch: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        env: "development".to_string(),
        models: Vec::new(),
        json: false,
        structure: false,
        watch: false,
    };
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => args.json = true,
            "--models" => args.structure = true,
            "--watch" => args.watch = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown flag {}\n{}", flag, USAGE),
            _ => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    if let Some(env) = positional.next() {
        args.env = env;
    }
    args.models = positional.collect();
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config = AppConfig::load(&args.env).context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    register_metrics();

    let provider = GraphProvider::from_config(&config).context("failed to build models")?;
    let names = if args.models.is_empty() {
        provider.model_names()
    } else {
        args.models.clone()
    };
    info!("Resolving {} models for env {}", names.len(), args.env);

    let options = TraceOptions::from(&config.trace);
    if args.watch && !args.structure {
        return watch(provider, &names, config.updater.interval(), args.json, &options).await;
    }

    let output = if args.structure {
        let models = provider.models(&names)?;
        if args.json { to_json(&models)? } else { render_all(&models, &options) }
    } else {
        let points = provider.data_points(&names).await?;
        render_points(&points, args.json, &options)?
    };
    print!("{}", output);

    provider.shutdown();
    Ok(())
}

fn render_points(points: &BTreeMap<String, Point>, json: bool, options: &TraceOptions) -> anyhow::Result<String> {
    Ok(if json { to_json(points)? } else { render_all(points, options) })
}

/// Refreshes in the background and prints the cached models every interval
/// until ctrl-c.
async fn watch(
    provider: GraphProvider,
    names: &[String],
    interval: std::time::Duration,
    json: bool,
    options: &TraceOptions,
) -> anyhow::Result<()> {
    let provider = Arc::new(provider);
    provider.refresh_all().await;
    let updater = provider.spawn_updater(interval);

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let points = provider.cached_points(names)?;
                print!("{}", render_points(&points, json, options)?);
            }
        }
    }

    info!("Shutting down");
    provider.shutdown();
    updater.await?;
    Ok(())
}
