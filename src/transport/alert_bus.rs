use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::coordinator::{AlertSink, EarlyAlert};
use crate::core::SentinelError;

/// Broadcast fan-out of coordinator alerts
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<EarlyAlert>,
}

impl AlertBus {
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        debug!("AlertBus initialized with capacity: {}", capacity);
        Self { tx }
    }

    #[instrument(skip(self, alert), fields(token = %alert.token))]
    pub fn publish(&self, alert: EarlyAlert) -> Result<usize, SentinelError> {
        let score = alert.early_score;
        let curve = alert.curve_completion;
        match self.tx.send(alert) {
            Ok(subscriber_count) => {
                info!(
                    early_score = score,
                    curve_completion = curve,
                    subscriber_count = subscriber_count,
                    "Published alert"
                );
                Ok(subscriber_count)
            }
            Err(_) => {
                warn!(early_score = score, "Failed to publish alert, no subscribers");
                Err(SentinelError::ChannelClosed("alert bus has no subscribers".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    pub fn subscribe(&self) -> broadcast::Receiver<EarlyAlert> {
        let receiver = self.tx.subscribe();
        debug!("New subscriber added to alert bus");
        receiver
    }
}

#[async_trait]
impl AlertSink for AlertBus {
    async fn deliver(&self, alert: EarlyAlert) -> Result<()> {
        self.publish(alert)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::HotToken;
    use crate::core::{CurveProvenance, CurveSnapshot};
    use chrono::Utc;
    use tokio::time::Instant;

    fn alert(token: &str) -> EarlyAlert {
        let now = Instant::now();
        EarlyAlert {
            token: token.to_string(),
            signal_type: "ultra_early".to_string(),
            early_score: 110,
            curve_completion: 12.5,
            signal_data: HotToken {
                token: token.to_string(),
                smart_money: vec![],
                kols: vec![],
                telegram: vec![],
                twitter: vec![],
                signal_count: 2,
                first_seen: now,
                last_updated: now,
            },
            curve: CurveSnapshot {
                token: token.to_string(),
                completion_percent: 12.5,
                market_cap_usd: 8_625.0,
                sol_raised: 40.0,
                holder_count: 0,
                volume_24h: 0.0,
                provenance: CurveProvenance::Cache,
                fetched_at: now,
            },
            reasons: vec!["reason".to_string()],
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_alerts() {
        let bus = AlertBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.deliver(alert("mintA")).await.unwrap();

        assert_eq!(first.recv().await.unwrap().token, "mintA");
        assert_eq!(second.recv().await.unwrap().early_score, 110);
    }

    #[tokio::test]
    async fn test_delivery_without_subscribers_fails() {
        let bus = AlertBus::new(4);
        assert!(bus.deliver(alert("mintA")).await.is_err());
        assert!(matches!(
            bus.publish(alert("mintB")),
            Err(SentinelError::ChannelClosed(_))
        ));
    }
}
