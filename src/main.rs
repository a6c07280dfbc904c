use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentinel::config::Config;
use sentinel::coordinator::{AlertSink, EarlyAlert, EarlySignalCoordinator, MemorySeenOracle};
use sentinel::curve::{CurveProgressResolver, PumpPortalFeed};
use sentinel::transport::{decode_envelope, AlertBus, SignalBus, SignalSender};
use sentinel::SignalAggregator;

const CONFIG_PATH: &str = "sentinel.toml";

struct ServiceOrchestrator {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl ServiceOrchestrator {
    fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    #[instrument(skip(self, config))]
    async fn start_all_services(&mut self, config: Config) -> Result<()> {
        info!("🚀 Starting all Sentinel services");

        let aggregator = Arc::new(SignalAggregator::new());
        let resolver = Arc::new(CurveProgressResolver::from_config(config.resolver.clone())?);
        let alert_bus = AlertBus::new(config.transport.alert_buffer);
        let seen = Arc::new(MemorySeenOracle::new());

        // Alert printer subscribes before the coordinator can publish
        let printer_rx = alert_bus.subscribe();
        let printer_seen = seen.clone();
        let printer_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "alert printer",
            tokio::spawn(print_alerts(printer_rx, printer_seen, printer_shutdown)),
        ));

        // Signal ingestion
        let (signal_bus, sender) =
            SignalBus::new(config.transport.signal_buffer, aggregator.clone());
        let ingest_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "signal ingestion",
            tokio::spawn(async move {
                signal_bus.run(ingest_shutdown).await;
                Ok::<(), anyhow::Error>(())
            }),
        ));

        let stdin_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(("stdin reader", tokio::spawn(read_stdin_signals(sender, stdin_shutdown))));

        let mut coordinator = EarlySignalCoordinator::new(
            config.coordinator.clone(),
            config.aggregator.clone(),
            aggregator,
            resolver.clone(),
            Arc::new(alert_bus) as Arc<dyn AlertSink>,
        )
        .with_seen_oracle(seen);

        // Live feed
        if config.feed.enabled {
            let (feed, handle) = PumpPortalFeed::new(config.feed.clone(), resolver);
            coordinator = coordinator.with_feed(handle);
            let feed_shutdown = self.shutdown_tx.subscribe();
            self.tasks.push(("live feed", tokio::spawn(feed.run(feed_shutdown))));
        } else {
            warn!("Live feed disabled, curve data comes from pull tiers only");
        }

        // Coordinator
        let coordinator_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "coordinator",
            tokio::spawn(coordinator.run(coordinator_shutdown)),
        ));

        info!("✅ All {} services started successfully", self.tasks.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn shutdown_all(&mut self) -> Result<()> {
        info!("🛑 Shutting down all services");

        let _ = self.shutdown_tx.send(());
        debug!("Shutdown signal sent to all services");

        for (name, task) in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => info!("✅ {} shut down cleanly", name),
                Ok(Err(e)) => warn!("⚠️  {} error during shutdown: {}", name, e),
                Err(e) => error!("❌ {} task failed: {}", name, e),
            }
        }

        info!("✅ All services shut down successfully");
        Ok(())
    }
}

/// Reads JSON-lines signal envelopes from stdin until EOF or shutdown
async fn read_stdin_signals(sender: SignalSender, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("⌨️  Reading JSON-lines signals from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match decode_envelope(&line) {
                    Ok(envelope) => sender.publish(envelope).await?,
                    Err(e) => warn!(error = %e, "Skipping malformed signal line"),
                },
                None => {
                    info!("stdin closed, no more watcher input");
                    return Ok(());
                }
            },
            _ = shutdown.recv() => return Ok(()),
        }
    }
}

async fn print_alerts(
    mut alerts: broadcast::Receiver<EarlyAlert>,
    seen: Arc<MemorySeenOracle>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            alert = alerts.recv() => match alert {
                Ok(alert) => {
                    print_alert(&alert);
                    seen.mark_seen(&alert.token);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Alert printer lagged, {} alerts missed", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
            _ = shutdown.recv() => return Ok(()),
        }
    }
}

fn print_alert(alert: &EarlyAlert) {
    let data = &alert.signal_data;

    println!("\n{} {}", "🚨".bright_red(), "ULTRA EARLY SIGNAL".bright_red().bold());
    println!("{}", "=".repeat(70).red());
    println!("{} {}", "🪙 Mint:".bright_white(), alert.token.blue().underline());

    let score = format!("{}", alert.early_score);
    let score = if alert.early_score >= 110 { score.green() } else { score.yellow() };
    println!("{} {}", "🎯 Conviction:".bright_white(), score.bold());
    println!(
        "{} {:.1}% (${:.0} mcap, via {})",
        "📈 Curve:".bright_white(),
        alert.curve_completion,
        alert.curve.market_cap_usd,
        alert.curve.provenance.as_str()
    );
    println!(
        "{} {} smart money, {} KOL, {} telegram, {} twitter ({} total)",
        "📡 Signals:".bright_white(),
        data.smart_money.len(),
        data.kols.len(),
        data.telegram.len(),
        data.twitter.len(),
        data.signal_count
    );

    for buy in data.smart_money.iter().chain(&data.kols) {
        println!(
            "   {} {} ({:.0}% WR)",
            "🐋".dimmed(),
            buy.name.cyan(),
            buy.win_rate
        );
    }

    for reason in &alert.reasons {
        println!("   {}", reason);
    }

    println!(
        "   {} {}",
        "🔗".dimmed(),
        format!("https://pump.fun/{}", alert.token).blue().underline()
    );
    println!(
        "{} {}",
        "⏰ Detected:".bright_white(),
        alert.detected_at.format("%H:%M:%S UTC").to_string().cyan()
    );
    println!("{}", "=".repeat(70).red());
}

fn init_tracing() -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "sentinel.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Keep the file writer alive for the whole process
    std::mem::forget(guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    info!("🛰️  Sentinel - Early Signal Engine");
    info!("==================================");

    let config = Config::load(Some(CONFIG_PATH))?;

    let mut orchestrator = ServiceOrchestrator::new();

    match orchestrator.start_all_services(config).await {
        Ok(()) => {
            info!("🎯 Sentinel is aggregating signals");
            info!("Press Ctrl+C to shutdown all services");
        }
        Err(e) => {
            error!("Failed to start services: {}", e);
            return Err(e);
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    orchestrator.shutdown_all().await?;

    info!("👋 Sentinel shutdown complete");

    // A pending stdin read parks a blocking thread the runtime would wait on
    std::process::exit(0);
}
