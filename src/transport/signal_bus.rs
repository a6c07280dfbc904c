use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::aggregator::SignalAggregator;
use crate::core::{SentinelError, SignalEnvelope, SignalEvent};

/// Decodes one JSON line produced by a source watcher
pub fn decode_envelope(line: &str) -> Result<SignalEnvelope, SentinelError> {
    let envelope: SignalEnvelope = serde_json::from_str(line.trim())?;
    if envelope.token.trim().is_empty() {
        return Err(SentinelError::EmptyToken);
    }
    envelope.signal.validate()?;
    Ok(envelope)
}

/// Cloneable producer side handed to source watchers
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<SignalEnvelope>,
}

impl SignalSender {
    #[instrument(skip(self, envelope), fields(token = %envelope.token))]
    pub async fn publish(&self, envelope: SignalEnvelope) -> Result<(), SentinelError> {
        let kind = envelope.signal.kind();
        match self.tx.send(envelope).await {
            Ok(()) => {
                debug!(kind = kind.as_str(), "Published signal to signal bus");
                Ok(())
            }
            Err(e) => {
                warn!(kind = kind.as_str(), "Failed to publish signal to signal bus");
                Err(SentinelError::ChannelClosed(e.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Drains watcher messages into the aggregator
pub struct SignalBus {
    rx: mpsc::Receiver<SignalEnvelope>,
    aggregator: Arc<SignalAggregator>,
    stats: IngestStats,
}

impl SignalBus {
    pub fn new(capacity: usize, aggregator: Arc<SignalAggregator>) -> (Self, SignalSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        debug!("SignalBus initialized with capacity: {}", capacity);
        (
            Self {
                rx,
                aggregator,
                stats: IngestStats::default(),
            },
            SignalSender { tx },
        )
    }

    /// Records one envelope; invalid ones are counted and dropped
    pub fn ingest(&mut self, envelope: SignalEnvelope) {
        let token = envelope.token.clone();
        match self
            .aggregator
            .record(SignalEvent::new(envelope.token, envelope.signal))
        {
            Ok(()) => self.stats.accepted += 1,
            Err(e) => {
                warn!(token = %token, error = %e, "Rejected signal");
                self.stats.rejected += 1;
            }
        }
    }

    /// Runs until shutdown or until every sender is dropped
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> IngestStats {
        info!("📥 Signal ingestion started");

        loop {
            tokio::select! {
                envelope = self.rx.recv() => match envelope {
                    Some(envelope) => self.ingest(envelope),
                    None => {
                        info!("All signal producers closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("🛑 Signal ingestion shutting down");
                    break;
                }
            }
        }

        info!(
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            "Signal ingestion stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SignalPayload, SocialCall, WalletTier};
    use std::time::Duration;

    #[test]
    fn test_decode_smart_money_line() {
        let line = r#"{"token":"mintA","signal":{"kind":"smart_money","wallet":"9xQe","name":"Cented","tier":"elite","win_rate":71.5}}"#;
        let envelope = decode_envelope(line).unwrap();
        assert_eq!(envelope.token, "mintA");
        match envelope.signal {
            SignalPayload::SmartMoney(buy) => {
                assert_eq!(buy.tier, WalletTier::Elite);
                assert_eq!(buy.amount, 0.0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_tier_falls_back() {
        let line = r#"{"token":"mintA","signal":{"kind":"smart_money","wallet":"9xQe","name":"n","tier":"legendary"}}"#;
        match decode_envelope(line).unwrap().signal {
            SignalPayload::SmartMoney(buy) => assert_eq!(buy.tier, WalletTier::Other),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_lines() {
        assert!(matches!(
            decode_envelope(r#"{"token":"","signal":{"kind":"telegram_call","caller":"x"}}"#),
            Err(SentinelError::EmptyToken)
        ));
        assert!(matches!(
            decode_envelope(r#"{"token":"m","signal":{"kind":"twitter_call","caller":" "}}"#),
            Err(SentinelError::InvalidPayload(_))
        ));
        assert!(matches!(
            decode_envelope(r#"{"token":"m","signal":{"kind":"carrier_pigeon"}}"#),
            Err(SentinelError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_bus_feeds_aggregator() {
        let aggregator = Arc::new(SignalAggregator::new());
        let (bus, sender) = SignalBus::new(8, aggregator.clone());
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(bus.run(shutdown_rx));

        let call = |caller: &str| SocialCall {
            caller: caller.to_string(),
            channel: None,
            followers: Some(12_000),
            message: String::new(),
        };
        sender
            .publish(SignalEnvelope {
                token: "mintA".to_string(),
                signal: SignalPayload::TelegramCall(call("a")),
            })
            .await
            .unwrap();
        sender
            .publish(SignalEnvelope {
                token: "mintA".to_string(),
                signal: SignalPayload::TwitterCall(call("b")),
            })
            .await
            .unwrap();
        sender
            .publish(SignalEnvelope {
                token: " ".to_string(),
                signal: SignalPayload::TwitterCall(call("c")),
            })
            .await
            .unwrap();
        drop(sender);

        let stats = task.await.unwrap();
        assert_eq!(stats, IngestStats { accepted: 2, rejected: 1 });

        let hot = aggregator.get_hot_tokens(2, Duration::from_secs(300));
        assert_eq!(hot["mintA"].social_count(), 2);
    }

    #[tokio::test]
    async fn test_publish_after_bus_stopped_fails() {
        let aggregator = Arc::new(SignalAggregator::new());
        let (bus, sender) = SignalBus::new(1, aggregator);
        drop(bus);

        let result = sender
            .publish(SignalEnvelope {
                token: "mintA".to_string(),
                signal: SignalPayload::TelegramCall(SocialCall {
                    caller: "a".to_string(),
                    channel: None,
                    followers: None,
                    message: String::new(),
                }),
            })
            .await;
        assert!(matches!(result, Err(SentinelError::ChannelClosed(_))));
    }
}
