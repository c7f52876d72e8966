//! Samples per-container usage from the local container runtime and publishes it as metrics.

use std::sync::Arc;

use anyhow::Context;
use stats_publisher::{
    config::{Backend, Config},
    cycle::{run_periodic, Cycle},
    exporter::{CloudWatchBackend, HttpExporter, MetricBackend},
    publisher::MetricPublisher,
    record::DimensionExpander,
    sampler::DockerStats,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG takes precedence, fallback to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        region = %config.region,
        namespace = %config.namespace,
        stack = %config.stack_name,
        interval = %humantime::format_duration(config.interval),
        backend = ?config.backend,
        endpoint = ?config.endpoint,
        disabled = config.disabled,
        "starting stats publisher"
    );

    let backend: Arc<dyn MetricBackend> = match config.backend {
        Backend::CloudWatch => Arc::new(
            CloudWatchBackend::load(config.region.clone(), config.endpoint.clone()).await,
        ),
        Backend::Http => Arc::new(HttpExporter::new(
            config.http_endpoint().to_string(),
            config.region.clone(),
        )),
    };
    let publisher =
        MetricPublisher::new(backend, config.namespace.clone()).disabled(config.disabled);
    let cycle = Arc::new(Cycle::new(
        DockerStats::new(config.docker.clone()),
        DimensionExpander::for_stack(config.stack_name.clone()),
        publisher,
    ));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutting down");
    };
    run_periodic(cycle, config.interval, shutdown).await;
    Ok(())
}
