/// Pull-based curve data sources used behind the live and cache tiers

use anyhow::Result;
use async_trait::async_trait;

use crate::core::CurveProvenance;

/// Raw market data returned by a pull source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveQuote {
    pub market_cap_usd: f64,
    pub sol_raised: Option<f64>,
    pub holder_count: Option<u64>,
    pub volume_24h: Option<f64>,
    /// Source reports the curve as completed
    pub graduated: bool,
}

/// A network source the resolver can query by mint.
///
/// Errors are never surfaced past the resolver; they only mean "absent".
#[async_trait]
pub trait CurveQuoteSource: Send + Sync {
    fn provenance(&self) -> CurveProvenance;

    async fn fetch_quote(&self, mint: &str) -> Result<CurveQuote>;
}
