use std::{collections::HashMap, future::Future};

use anyhow::Result;
use reqwest::{
    Client, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

pub const DEFAULT_BASE_API: &str = "https://api.coingecko.com/api/v3";

/// Anything that can quote USD prices for a set of asset ids.
pub trait PriceSource: Send + Sync + 'static {
    fn fetch_usd(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<PriceResponse, FetchError>> + Send;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("price request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("price service answered {0}")]
    Status(StatusCode),

    #[error("malformed price response ({source}): {body}")]
    Decode {
        body: String,
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: String,
}

impl PriceClient {
    pub fn new(base_api: String, api_key: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert("x-cg-demo-api-key", HeaderValue::from_str(&key)?);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self::with_client(client, base_api))
    }

    pub fn with_client(client: Client, base_api: String) -> Self {
        Self { client, base_api }
    }

    pub async fn fetch_simple_price(&self, ids: &[String]) -> Result<PriceResponse, FetchError> {
        let url = format!("{}/simple/price", self.base_api.trim_end_matches('/'));

        let res = self
            .client
            .get(url)
            .query(&[("ids", ids.join(",").as_str()), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }

        let body = res.text().await?;
        PriceResponse::parse(&body)
    }
}

impl PriceSource for PriceClient {
    async fn fetch_usd(&self, ids: &[String]) -> Result<PriceResponse, FetchError> {
        self.fetch_simple_price(ids).await
    }
}

//
// Match CoinGecko /simple/price JSON: {"bitcoin": {"usd": 65000}, ...}
// https://docs.coingecko.com/reference/simple-price
//
// Entries stay raw so a single odd entry only blanks its own card.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct PriceResponse(HashMap<String, Value>);

impl PriceResponse {
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        serde_json::from_str(body).map_err(|source| FetchError::Decode {
            body: body.to_string(),
            source,
        })
    }

    /// USD quote for `id`, if the entry is an object with a numeric `usd`.
    pub fn usd(&self, id: &str) -> Option<f64> {
        self.0
            .get(id)
            .and_then(|quote| quote.get("usd"))
            .and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<f64>)> for PriceResponse {
    fn from_iter<I: IntoIterator<Item = (K, Option<f64>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, usd)| {
                    let quote = match usd {
                        Some(usd) => json!({ "usd": usd }),
                        None => json!({}),
                    };
                    (id.into(), quote)
                })
                .collect(),
        )
    }
}
