/// pump.fun frontend API client, primary pull tier for curve progress

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::source::{CurveQuote, CurveQuoteSource};
use crate::core::{CurveProvenance, LAMPORTS_PER_SOL};

/// Subset of the `/coins/{mint}` payload the resolver needs
#[derive(Debug, Clone, Deserialize)]
pub struct PumpFunCoin {
    pub mint: Option<String>,
    pub symbol: Option<String>,
    pub usd_market_cap: f64,
    /// Lamports
    pub virtual_sol_reserves: Option<u64>,
    /// Lamports
    pub real_sol_reserves: Option<u64>,
    #[serde(default)]
    pub complete: bool,
    pub raydium_pool: Option<String>,
}

pub struct PumpFunClient {
    client: Client,
    base_url: String,
}

impl PumpFunClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create pump.fun HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_coin(&self, mint: &str) -> Result<PumpFunCoin> {
        let url = format!("{}/coins/{}", self.base_url, mint);
        debug!("🌐 Fetching curve data from pump.fun: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("pump.fun API error: {}", response.status()));
        }

        let text = response.text().await?;
        let coin: PumpFunCoin = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse pump.fun response: {}", e))?;

        if !coin.usd_market_cap.is_finite() || coin.usd_market_cap < 0.0 {
            return Err(anyhow!("pump.fun returned invalid market cap for {}", mint));
        }

        Ok(coin)
    }
}

#[async_trait]
impl CurveQuoteSource for PumpFunClient {
    fn provenance(&self) -> CurveProvenance {
        CurveProvenance::PumpfunApi
    }

    async fn fetch_quote(&self, mint: &str) -> Result<CurveQuote> {
        let coin = self.get_coin(mint).await?;

        let sol_raised = coin
            .real_sol_reserves
            .or(coin.virtual_sol_reserves)
            .map(|lamports| lamports as f64 / LAMPORTS_PER_SOL);

        Ok(CurveQuote {
            market_cap_usd: coin.usd_market_cap,
            sol_raised,
            holder_count: None,
            volume_24h: None,
            graduated: coin.complete || coin.raydium_pool.is_some(),
        })
    }
}
