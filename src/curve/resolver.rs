/// Multi-tier bonding curve progress resolver
///
/// Resolution order: live push feed -> short-term cache -> primary pull API ->
/// fallback pull API. Every tier is best-effort; a miss is a normal outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::helius_client::HeliusFallbackClient;
use super::pumpfun_client::PumpFunClient;
use super::source::{CurveQuote, CurveQuoteSource};
use crate::config::ResolverConfig;
use crate::core::{completion_percent, CurveProvenance, CurveSnapshot};

/// One update pushed by the real-time feed
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCurveUpdate {
    pub token: String,
    pub market_cap_usd: f64,
    pub sol_amount: f64,
    pub observed_at: Instant,
}

/// Owns both the live-tier map and the short-term cache. The feed listener
/// writes only through [`CurveProgressResolver::ingest_live_update`].
pub struct CurveProgressResolver {
    config: ResolverConfig,
    live: DashMap<String, LiveCurveUpdate>,
    cache: DashMap<String, (CurveSnapshot, Instant)>,
    primary: Option<Arc<dyn CurveQuoteSource>>,
    fallback: Option<Arc<dyn CurveQuoteSource>>,
}

impl CurveProgressResolver {
    pub fn new(
        config: ResolverConfig,
        primary: Option<Arc<dyn CurveQuoteSource>>,
        fallback: Option<Arc<dyn CurveQuoteSource>>,
    ) -> Self {
        Self {
            config,
            live: DashMap::new(),
            cache: DashMap::new(),
            primary,
            fallback,
        }
    }

    /// Wires the pump.fun primary tier and, when configured, the Helius fallback
    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        let primary: Arc<dyn CurveQuoteSource> = Arc::new(PumpFunClient::new(
            config.pumpfun_api_url.clone(),
            config.request_timeout(),
        )?);

        let fallback = match &config.helius_rpc_url {
            Some(url) => Some(Arc::new(HeliusFallbackClient::new(url.clone(), config.request_timeout())?)
                as Arc<dyn CurveQuoteSource>),
            None => {
                info!("Helius fallback tier disabled (no RPC URL configured)");
                None
            }
        };

        Ok(Self::new(config, Some(primary), fallback))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Records a feed update, ignoring anything older than what is stored
    pub fn ingest_live_update(&self, update: LiveCurveUpdate) {
        if update.token.is_empty() || update.market_cap_usd.is_nan() {
            return;
        }

        self.live
            .entry(update.token.clone())
            .and_modify(|current| {
                if update.observed_at >= current.observed_at {
                    *current = update.clone();
                }
            })
            .or_insert(update);
    }

    pub async fn get_curve_progress(&self, token: &str) -> Option<CurveSnapshot> {
        let now = Instant::now();

        if let Some(snapshot) = self.live_snapshot(token, now, self.config.live_max_age()) {
            debug!(token, pct = snapshot.completion_percent, "Curve resolved from live feed");
            self.store(snapshot.clone(), now);
            return Some(snapshot);
        }

        if let Some(snapshot) = self.cached_snapshot(token, now) {
            debug!(token, "Curve resolved from cache");
            return Some(snapshot);
        }

        for source in [&self.primary, &self.fallback].into_iter().flatten() {
            match source.fetch_quote(token).await {
                Ok(quote) => {
                    let snapshot = self.snapshot_from_quote(token, &quote, source.provenance());
                    debug!(
                        token,
                        source = source.provenance().as_str(),
                        pct = snapshot.completion_percent,
                        "Curve resolved from pull tier"
                    );
                    self.store(snapshot.clone(), Instant::now());
                    return Some(snapshot);
                }
                Err(e) => {
                    debug!(token, source = source.provenance().as_str(), error = %e, "Curve tier miss");
                }
            }
        }

        debug!(token, "No curve data available from any tier");
        None
    }

    /// Non-network scan of the live tier by recency and completion bounds
    pub fn get_cached_tokens_by_curve_range(
        &self,
        min_pct: f64,
        max_pct: f64,
        max_age: Duration,
    ) -> Vec<CurveSnapshot> {
        let now = Instant::now();
        let tokens: Vec<String> = self.live.iter().map(|e| e.key().clone()).collect();

        tokens
            .iter()
            .filter_map(|token| self.live_snapshot(token, now, max_age))
            .filter(|s| s.completion_percent >= min_pct && s.completion_percent <= max_pct)
            .collect()
    }

    /// Drops expired cache entries and live entries well past usefulness
    pub fn prune_stale(&self, live_horizon: Duration) -> usize {
        let now = Instant::now();
        let ttl = self.config.cache_ttl();
        let before = self.live.len() + self.cache.len();

        self.cache
            .retain(|_, (_, cached_at)| now.saturating_duration_since(*cached_at) < ttl);
        self.live
            .retain(|_, u| now.saturating_duration_since(u.observed_at) < live_horizon);

        let removed = before.saturating_sub(self.live.len() + self.cache.len());
        if removed > 0 {
            debug!("Pruned {} stale curve entries", removed);
        }
        removed
    }

    pub fn live_entries(&self) -> usize {
        self.live.len()
    }

    fn live_snapshot(&self, token: &str, now: Instant, max_age: Duration) -> Option<CurveSnapshot> {
        let update = self.live.get(token)?;
        if now.saturating_duration_since(update.observed_at) >= max_age {
            return None;
        }

        Some(CurveSnapshot {
            token: token.to_string(),
            completion_percent: completion_percent(
                update.market_cap_usd,
                self.config.graduation_mcap_usd,
            ),
            market_cap_usd: update.market_cap_usd,
            sol_raised: update.sol_amount,
            holder_count: 0,
            volume_24h: 0.0,
            provenance: CurveProvenance::WebsocketLive,
            fetched_at: update.observed_at,
        })
    }

    fn cached_snapshot(&self, token: &str, now: Instant) -> Option<CurveSnapshot> {
        let entry = self.cache.get(token)?;
        let (snapshot, cached_at) = entry.value();
        if now.saturating_duration_since(*cached_at) >= self.config.cache_ttl() {
            return None;
        }

        let mut snapshot = snapshot.clone();
        snapshot.provenance = CurveProvenance::Cache;
        Some(snapshot)
    }

    fn snapshot_from_quote(
        &self,
        token: &str,
        quote: &CurveQuote,
        provenance: CurveProvenance,
    ) -> CurveSnapshot {
        let completion = if quote.graduated {
            100.0
        } else {
            completion_percent(quote.market_cap_usd, self.config.graduation_mcap_usd)
        };

        if quote.market_cap_usd > self.config.graduation_mcap_usd && !quote.graduated {
            warn!(token, mcap = quote.market_cap_usd, "Market cap above graduation threshold");
        }

        CurveSnapshot {
            token: token.to_string(),
            completion_percent: completion,
            market_cap_usd: quote.market_cap_usd,
            sol_raised: quote
                .sol_raised
                .unwrap_or(quote.market_cap_usd / self.config.sol_usd_rate),
            holder_count: quote.holder_count.unwrap_or(0),
            volume_24h: quote.volume_24h.unwrap_or(0.0),
            provenance,
            fetched_at: Instant::now(),
        }
    }

    fn store(&self, snapshot: CurveSnapshot, at: Instant) {
        self.cache.insert(snapshot.token.clone(), (snapshot, at));
    }
}
