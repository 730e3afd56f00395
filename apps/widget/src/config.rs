use std::{env::var, path::PathBuf};

use anyhow::{Result, anyhow};
use ticker::DEFAULT_BASE_API;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub api_key: Option<String>,
    pub page_path: PathBuf,
    pub output_path: PathBuf,
    pub version: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_base: get("COINGECKO_API_URL").unwrap_or_else(|| DEFAULT_BASE_API.to_string()),
            api_key: get("COINGECKO_API_KEY"),
            page_path: get("WIDGET_PAGE_PATH")
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("WIDGET_PAGE_PATH environment variable not set"))?,
            output_path: get("WIDGET_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("prices.html")),
            version: get("APP_VERSION").unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}
