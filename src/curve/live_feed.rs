/// PumpPortal WebSocket listener feeding the resolver's live tier

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashSet;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::resolver::{CurveProgressResolver, LiveCurveUpdate};
use crate::config::FeedConfig;
use crate::core::SentinelError;

/// Create and trade events share enough fields for curve tracking
#[derive(Debug, Clone, Deserialize)]
struct PumpPortalEvent {
    mint: String,
    #[serde(alias = "txType", alias = "tx_type")]
    tx_type: Option<String>,
    #[serde(alias = "marketCapSol", alias = "market_cap_sol")]
    market_cap_sol: Option<f64>,
    #[serde(alias = "vSolInBondingCurve", alias = "v_sol_in_bonding_curve")]
    v_sol_in_bonding_curve: Option<f64>,
    #[serde(alias = "solAmount", alias = "sol_amount")]
    sol_amount: Option<f64>,
}

/// Converts one feed frame into a live-tier update. Subscription acks and
/// frames without a market cap yield `None`.
pub fn parse_feed_message(text: &str, sol_usd_rate: f64) -> Option<LiveCurveUpdate> {
    if text.contains("Successfully subscribed") {
        return None;
    }

    let event: PumpPortalEvent = serde_json::from_str(text).ok()?;
    let market_cap_sol = event.market_cap_sol.filter(|m| m.is_finite() && *m >= 0.0)?;
    if event.mint.is_empty() {
        return None;
    }

    debug!(
        mint = %event.mint,
        tx_type = event.tx_type.as_deref().unwrap_or("unknown"),
        market_cap_sol,
        "Feed event"
    );

    Some(LiveCurveUpdate {
        token: event.mint,
        market_cap_usd: market_cap_sol * sol_usd_rate,
        sol_amount: event
            .v_sol_in_bonding_curve
            .or(event.sol_amount)
            .unwrap_or(0.0),
        observed_at: Instant::now(),
    })
}

/// Subscription changes forwarded to the live connection
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchCommand {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
}

/// Lets other components ask the feed to track trades for specific mints
#[derive(Debug, Clone)]
pub struct FeedHandle {
    watched: Arc<DashSet<String>>,
    max_watched: usize,
    tx: mpsc::UnboundedSender<WatchCommand>,
}

impl FeedHandle {
    /// Returns how many of the tokens were not already watched. Tokens past
    /// `max_watched` are dropped until earlier ones are unwatched.
    pub fn watch_tokens<I, S>(&self, tokens: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fresh = Vec::new();
        let mut refused = 0usize;
        for token in tokens.into_iter().map(|t| t.as_ref().to_string()) {
            if token.is_empty() || self.watched.contains(&token) {
                continue;
            }
            if self.watched.len() >= self.max_watched {
                refused += 1;
                continue;
            }
            if self.watched.insert(token.clone()) {
                fresh.push(token);
            }
        }

        if refused > 0 {
            warn!(
                refused,
                max = self.max_watched,
                "Watch set full, not subscribing to more trades"
            );
        }

        let count = fresh.len();
        if count > 0 && self.tx.send(WatchCommand::Subscribe(fresh)).is_err() {
            debug!("Feed listener gone, watch request kept for next start");
        }
        count
    }

    /// Returns how many of the tokens were being watched
    pub fn unwatch_tokens<I, S>(&self, tokens: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dropped: Vec<String> = tokens
            .into_iter()
            .filter_map(|t| self.watched.remove(t.as_ref()))
            .collect();

        let count = dropped.len();
        if count > 0 && self.tx.send(WatchCommand::Unsubscribe(dropped)).is_err() {
            debug!("Feed listener gone, unwatch applied to the set only");
        }
        count
    }

    pub fn watched_tokens(&self) -> Vec<String> {
        self.watched.iter().map(|t| t.key().clone()).collect()
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }
}

enum SessionEnd {
    Shutdown,
    Disconnected,
}

pub struct PumpPortalFeed {
    config: FeedConfig,
    resolver: Arc<CurveProgressResolver>,
    watched: Arc<DashSet<String>>,
    watch_rx: mpsc::UnboundedReceiver<WatchCommand>,
}

impl PumpPortalFeed {
    pub fn new(config: FeedConfig, resolver: Arc<CurveProgressResolver>) -> (Self, FeedHandle) {
        let (tx, watch_rx) = mpsc::unbounded_channel();
        let watched = Arc::new(DashSet::new());

        let handle = FeedHandle {
            watched: watched.clone(),
            max_watched: config.max_watched.max(1),
            tx,
        };

        (
            Self {
                config,
                resolver,
                watched,
                watch_rx,
            },
            handle,
        )
    }

    /// Runs until shutdown, reconnecting after every failure
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(url = %self.config.url, "📡 Starting PumpPortal live feed");

        loop {
            match self.connect_and_stream(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("🛑 Live feed shut down");
                    return Ok(());
                }
                Ok(SessionEnd::Disconnected) => warn!("Live feed disconnected"),
                Err(e) => error!(error = %e, "Live feed connection failed"),
            }

            let delay = self.config.reconnect_delay();
            info!("🔄 Reconnecting live feed in {:?}", delay);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.recv() => {
                    info!("🛑 Live feed shut down during reconnect wait");
                    return Ok(());
                }
            }
        }
    }

    async fn connect_and_stream(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<SessionEnd> {
        let url = Url::parse(&self.config.url).context("Failed to parse feed URL")?;

        let (ws_stream, _response) = timeout(self.config.receive_timeout(), connect_async(url.as_str()))
            .await
            .context("Connection timeout")??;
        info!("✅ Connected to PumpPortal");

        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(json_method("subscribeNewToken", None)))
            .await?;

        let watched: Vec<String> = self.watched.iter().map(|t| t.key().clone()).collect();
        if !watched.is_empty() {
            write
                .send(Message::Text(json_method("subscribeTokenTrade", Some(&watched))))
                .await?;
            info!("Re-subscribed to trades for {} watched tokens", watched.len());
        }

        let sol_usd_rate = self.resolver.config().sol_usd_rate;
        let receive_timeout = self.config.receive_timeout();

        loop {
            tokio::select! {
                frame = timeout(receive_timeout, read.next()) => {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(_) => {
                            return Err(SentinelError::Feed(format!(
                                "no message within {:?}",
                                receive_timeout
                            ))
                            .into());
                        }
                    };

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(update) = parse_feed_message(&text, sol_usd_rate) {
                                self.resolver.ingest_live_update(update);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "Feed sent close frame");
                            return Ok(SessionEnd::Disconnected);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(SessionEnd::Disconnected),
                    }
                }
                Some(command) = self.watch_rx.recv() => {
                    let text = match &command {
                        WatchCommand::Subscribe(keys) => {
                            debug!("Subscribing to trades for {} tokens", keys.len());
                            json_method("subscribeTokenTrade", Some(keys))
                        }
                        WatchCommand::Unsubscribe(keys) => {
                            debug!("Unsubscribing from trades for {} tokens", keys.len());
                            json_method("unsubscribeTokenTrade", Some(keys))
                        }
                    };
                    write.send(Message::Text(text)).await?;
                }
                _ = shutdown.recv() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}

fn json_method(method: &str, keys: Option<&[String]>) -> String {
    match keys {
        Some(keys) => serde_json::json!({ "method": method, "keys": keys }),
        None => serde_json::json!({ "method": method }),
    }
    .to_string()
}
