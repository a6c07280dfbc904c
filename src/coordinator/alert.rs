/// Outbound alert contract of the coordinator

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::aggregator::HotToken;
use crate::core::CurveSnapshot;

#[derive(Debug, Clone)]
pub struct EarlyAlert {
    pub token: String,
    /// Always `ultra_early`
    pub signal_type: String,
    pub early_score: u32,
    pub curve_completion: f64,
    pub signal_data: HotToken,
    pub curve: CurveSnapshot,
    pub reasons: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Receives alerts; formatting and delivery are entirely the sink's concern
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: EarlyAlert) -> Result<()>;
}
