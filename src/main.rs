// ╔══════════════════════════════════════════════════════════════════╗
// ║                                                                  ║
// ║   ██╗    ██╗██╗██╗     ██████╗  ██████╗ ██╗   ██╗ █████╗ ██████╗  ║
// ║   ██║    ██║██║██║     ██╔══██╗██╔════╝ ██║   ██║██╔══██╗██╔══██╗ ║
// ║   ██║ █╗ ██║██║██║     ██║  ██║██║  ███╗██║   ██║███████║██████╔╝ ║
// ║   ██║███╗██║██║██║     ██║  ██║██║   ██║██║   ██║██╔══██║██╔══██╗ ║
// ║   ╚███╔███╔╝██║███████╗██████╔╝╚██████╔╝╚██████╔╝██║  ██║██║  ██║ ║
// ║    ╚══╝╚══╝ ╚═╝╚══════╝╚═════╝  ╚═════╝  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝ ║
// ║                                                                  ║
// ║   Continuous marketplace surveillance for wildlife- and          ║
// ║   human-trafficking-adjacent listings across eleven consumer     ║
// ║   marketplaces. Deterministic scoring, persistent dedup, and a   ║
// ║   session report on every exit.                                 ║
// ║                                                                  ║
// ╚══════════════════════════════════════════════════════════════════╝

mod adapters;
mod circuit_breaker;
mod config;
mod corpus;
mod cursor;
mod dedup;
mod errors;
mod metrics;
mod models;
mod scheduler;
mod scorer;
mod sink;
mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::corpus::KeywordCorpus;
use crate::cursor::CursorStore;
use crate::dedup::DedupEngine;
use crate::metrics::MetricsCollector;
use crate::scheduler::Scheduler;
use crate::sink::Sink;
use crate::supervisor::Supervisor;

fn print_banner() {
    println!(
        r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║                    W I L D G U A R D                             ║
    ║                                                                  ║
    ║   Marketplaces: eBay, Craigslist, OLX, Marktplaats,               ║
    ║                 MercadoLibre, AliExpress, Taobao, Mercari,        ║
    ║                 Gumtree, Avito, Facebook Marketplace              ║
    ║   Scoring:   Deterministic, weighted indicator tables             ║
    ║   Dedup:     URL normalization + title-hash set, watermarked      ║
    ║   Resilience: Per-platform circuit breakers, bounded retries      ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#
    );
}

fn run_tag() -> String {
    format!("WG-{}", uuid::Uuid::new_v4().simple())
}

#[tokio::main(flavor = "multi_thread", worker_threads = 8)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    print_banner();
    info!("wildguard initializing");

    let config = Arc::new(Config::from_env()?);
    info!(database_url = %config.database_url, "configuration loaded");

    let corpus = Arc::new(KeywordCorpus::load(&config.keyword_corpus_path)?);
    info!(terms = corpus.size(), "keyword corpus loaded");

    let cursor = Arc::new(CursorStore::load(&config.cursor_state_path));
    let dedup = Arc::new(DedupEngine::load(
        config.dedup_high_watermark,
        config.dedup_low_watermark,
        &config.dedup_snapshot_path,
    ));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(180))
        .build()?;

    let sink = Arc::new(Sink::new(client.clone(), config.database_url.clone(), config.database_api_key.clone()));
    let metrics = Arc::new(MetricsCollector::new());

    let registry = adapters::build_registry(&config, client);
    info!(platforms = registry.len(), "adapter registry built");

    let scheduler = Scheduler::new(config.clone(), corpus, cursor, registry);
    let supervisor = Supervisor::new(config.clone(), run_tag(), scheduler, dedup.clone(), sink, metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut metrics_shutdown = shutdown_rx.clone();
    let metrics_for_server = metrics.clone();
    let metrics_port = config.metrics_port;
    let metrics_handle = tokio::spawn(async move {
        metrics::run_metrics_server(metrics_for_server, metrics_port, &mut metrics_shutdown).await;
    });

    let mut supervisor_shutdown = shutdown_rx.clone();
    let supervisor_handle = tokio::spawn(async move { supervisor.run(&mut supervisor_shutdown).await });

    info!("all systems online — press Ctrl+C for graceful shutdown");

    match signal::ctrl_c().await {
        Ok(()) => warn!("shutdown signal received"),
        Err(e) => error!(error = %e, "signal listener error"),
    }
    let _ = shutdown_tx.send(true);

    let report = match tokio::time::timeout(Duration::from_secs(30), supervisor_handle).await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            error!(error = %e, "supervisor task panicked");
            None
        }
        Err(_) => {
            warn!("supervisor did not finish its current cycle within the shutdown grace period");
            None
        }
    };

    let _ = tokio::time::timeout(Duration::from_secs(5), metrics_handle).await;

    if let Some(report) = report {
        info!(
            cycles = report.cycles_completed,
            scanned = report.total_scanned,
            accepted = report.total_accepted,
            duplicates = report.total_duplicates,
            acceptance_rate = report.acceptance_rate,
            projected_daily = report.projected_daily_detections,
            "session report"
        );
    }

    info!("wildguard: offline");
    Ok(())
}
