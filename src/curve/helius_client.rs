/// Helius DAS fallback tier: derives market cap from `getAsset` price info

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::source::{CurveQuote, CurveQuoteSource};
use crate::core::CurveProvenance;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Asset>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Asset {
    token_info: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    supply: Option<f64>,
    decimals: Option<u32>,
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    price_per_token: f64,
}

pub struct HeliusFallbackClient {
    client: Client,
    rpc_url: String,
}

impl HeliusFallbackClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create Helius HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    async fn get_asset(&self, mint: &str) -> Result<Asset> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": "sentinel",
            "method": "getAsset",
            "params": { "id": mint, "displayOptions": { "showFungible": true } }
        });

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Helius RPC error: {}", response.status()));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Helius response: {}", e))?;

        if let Some(err) = body.error {
            return Err(anyhow!("Helius getAsset failed ({}): {}", err.code, err.message));
        }

        body.result.ok_or_else(|| anyhow!("Helius returned no asset for {}", mint))
    }
}

#[async_trait]
impl CurveQuoteSource for HeliusFallbackClient {
    fn provenance(&self) -> CurveProvenance {
        CurveProvenance::HeliusFallback
    }

    async fn fetch_quote(&self, mint: &str) -> Result<CurveQuote> {
        let asset = self.get_asset(mint).await?;

        let info = asset
            .token_info
            .ok_or_else(|| anyhow!("Asset {} is not a fungible token", mint))?;
        let price = info
            .price_info
            .ok_or_else(|| anyhow!("No price info for {}", mint))?
            .price_per_token;
        let supply = info.supply.ok_or_else(|| anyhow!("No supply for {}", mint))?;
        let decimals = info.decimals.unwrap_or(6);

        let market_cap_usd = price * supply / 10f64.powi(decimals as i32);
        debug!(mint, market_cap_usd, "Helius fallback quote");

        Ok(CurveQuote {
            market_cap_usd,
            ..CurveQuote::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_market_cap_from_price_and_supply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "method": "getAsset",
                "params": { "id": "mintA" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "sentinel",
                "result": {
                    "token_info": {
                        "supply": 1_000_000_000_000_000u64,
                        "decimals": 6,
                        "price_info": { "price_per_token": 0.00002, "currency": "USDC" }
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = HeliusFallbackClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let quote = client.fetch_quote("mintA").await.unwrap();
        assert!((quote.market_cap_usd - 20_000.0).abs() < 1e-6);
        assert_eq!(quote.holder_count, None);
    }

    #[tokio::test]
    async fn test_missing_price_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "result": { "token_info": { "supply": 1000.0, "decimals": 6 } }
            })))
            .mount(&server)
            .await;

        let client = HeliusFallbackClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert!(client.fetch_quote("mintA").await.is_err());
    }

    #[tokio::test]
    async fn test_rpc_error_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "error": { "code": -32000, "message": "asset not found" }
            })))
            .mount(&server)
            .await;

        let client = HeliusFallbackClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = client.fetch_quote("mintA").await.unwrap_err();
        assert!(err.to_string().contains("asset not found"));
    }
}
