use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use taxmail::config::AppConfig;
use taxmail::pipeline::{spawn_ingest_worker, EmailProcessor};
use taxmail::store::{EmailStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    eprintln!("📬 Taxmail v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Heuristic window: {} days (overlap ≥ {})",
        config.threading.window_days, config.threading.min_participant_overlap
    );
    eprintln!("   Ingest tick: every {}s", config.ingest_interval_secs);
    eprintln!("   Feed: newline-delimited payload JSON on stdin\n");

    let store: Arc<dyn EmailStore> =
        Arc::new(MemoryStore::with_config(config.threading.clone()));
    let processor = Arc::new(EmailProcessor::new(
        Arc::clone(&store),
        config.threading.clone(),
    ));

    let (worker, shutdown) = spawn_ingest_worker(
        Arc::clone(&store),
        processor,
        config.retry.clone(),
        config.ingest_interval_secs,
    );

    // Manual-sync feed: one provider payload per line. Webhook delivery
    // enqueues through the same store interface.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<serde_json::Value>(line) {
                        Ok(payload) => {
                            let event_id = store.enqueue_event(payload).await?;
                            tracing::debug!(event_id = %event_id, "event queued from stdin");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping malformed input line");
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("stdin closed, continuing until Ctrl-C");
                    tokio::signal::ctrl_c().await?;
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("shutting down");
    shutdown.store(true, Ordering::Relaxed);
    worker.await.ok();

    Ok(())
}
