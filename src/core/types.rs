/// Shared domain types for signal aggregation and curve resolution

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::error::SentinelError;

/// Independent signal sources feeding the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    SmartMoney,
    TelegramCall,
    TwitterCall,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::SmartMoney => "smart_money",
            SignalKind::TelegramCall => "telegram_call",
            SignalKind::TwitterCall => "twitter_call",
        }
    }
}

/// Curated wallet tier. `Elite` and `High` wallets count as smart money,
/// everything else is grouped with the KOL wallets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletTier {
    Elite,
    High,
    Top,
    Mid,
    #[serde(other)]
    Other,
}

impl WalletTier {
    pub fn is_smart_money(&self) -> bool {
        matches!(self, WalletTier::Elite | WalletTier::High)
    }
}

impl Default for WalletTier {
    fn default() -> Self {
        WalletTier::High
    }
}

/// A tracked wallet buying a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartMoneyBuy {
    pub wallet: String,
    pub name: String,
    #[serde(default)]
    pub tier: WalletTier,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub pnl_30d: f64,
    #[serde(default)]
    pub amount: f64,
}

/// A token call posted on a social platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialCall {
    pub caller: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub message: String,
}

/// Source-specific payload, one variant per signal kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalPayload {
    SmartMoney(SmartMoneyBuy),
    TelegramCall(SocialCall),
    TwitterCall(SocialCall),
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::SmartMoney(_) => SignalKind::SmartMoney,
            SignalPayload::TelegramCall(_) => SignalKind::TelegramCall,
            SignalPayload::TwitterCall(_) => SignalKind::TwitterCall,
        }
    }

    /// Rejects payloads missing the fields downstream consumers rely on
    pub fn validate(&self) -> Result<(), SentinelError> {
        match self {
            SignalPayload::SmartMoney(buy) => {
                if buy.wallet.trim().is_empty() {
                    return Err(SentinelError::InvalidPayload(
                        "smart money buy without wallet address".to_string(),
                    ));
                }
            }
            SignalPayload::TelegramCall(call) | SignalPayload::TwitterCall(call) => {
                if call.caller.trim().is_empty() {
                    return Err(SentinelError::InvalidPayload(format!(
                        "{} without caller",
                        self.kind().as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Message delivered by a source watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub token: String,
    pub signal: SignalPayload,
}

/// One observation from one source, immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub token: String,
    pub payload: SignalPayload,
    pub observed_at: Instant,
}

impl SignalEvent {
    pub fn new(token: impl Into<String>, payload: SignalPayload) -> Self {
        Self::observed(token, payload, Instant::now())
    }

    pub fn observed(token: impl Into<String>, payload: SignalPayload, observed_at: Instant) -> Self {
        Self {
            token: token.into(),
            payload,
            observed_at,
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.payload.kind()
    }
}

/// Which data tier produced a curve snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveProvenance {
    WebsocketLive,
    Cache,
    PumpfunApi,
    HeliusFallback,
}

impl CurveProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveProvenance::WebsocketLive => "websocket_live",
            CurveProvenance::Cache => "cache",
            CurveProvenance::PumpfunApi => "pumpfun_api",
            CurveProvenance::HeliusFallback => "helius_fallback",
        }
    }
}

/// Best-known bonding curve state for a token
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSnapshot {
    pub token: String,
    /// Always within [0, 100]
    pub completion_percent: f64,
    pub market_cap_usd: f64,
    pub sol_raised: f64,
    /// 0 when unknown
    pub holder_count: u64,
    /// 0 when unknown
    pub volume_24h: f64,
    pub provenance: CurveProvenance,
    pub fetched_at: Instant,
}

/// Scorer output: total plus one rationale line per applied tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvictionResult {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl ConvictionResult {
    pub fn add(&mut self, points: u32, reason: String) {
        self.score += points;
        self.reasons.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_tier_grouping() {
        assert!(WalletTier::Elite.is_smart_money());
        assert!(WalletTier::High.is_smart_money());
        assert!(!WalletTier::Top.is_smart_money());
        assert!(!WalletTier::Other.is_smart_money());
    }

    #[test]
    fn test_envelope_from_json() {
        let raw = r#"{
            "token": "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr",
            "signal": {"kind": "smart_money", "wallet": "CyaE1Vxv", "name": "CENTED", "tier": "top"}
        }"#;
        let envelope: SignalEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.signal.kind(), SignalKind::SmartMoney);
        match envelope.signal {
            SignalPayload::SmartMoney(buy) => {
                assert_eq!(buy.name, "CENTED");
                assert_eq!(buy.tier, WalletTier::Top);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tier_falls_back_to_other() {
        let raw = r#"{"kind": "smart_money", "wallet": "abc", "name": "x", "tier": "legendary"}"#;
        let payload: SignalPayload = serde_json::from_str(raw).unwrap();
        match payload {
            SignalPayload::SmartMoney(buy) => assert_eq!(buy.tier, WalletTier::Other),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_payload_validation() {
        let call = SignalPayload::TelegramCall(SocialCall {
            caller: "  ".to_string(),
            channel: None,
            followers: None,
            message: String::new(),
        });
        assert!(matches!(call.validate(), Err(SentinelError::InvalidPayload(_))));

        let buy = SignalPayload::SmartMoney(SmartMoneyBuy {
            wallet: "wallet".to_string(),
            name: "alpha".to_string(),
            tier: WalletTier::Elite,
            win_rate: 0.7,
            pnl_30d: 0.0,
            amount: 1.0,
        });
        assert!(buy.validate().is_ok());
    }
}
