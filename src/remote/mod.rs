//! Hosted fuzzy-search RPC client
//!
//! The backend exposes a stored-procedure-style endpoint
//! `search_transactions_fuzzy` over HTTP; this module holds the wire types,
//! the [`RemoteSearch`] seam the remote tool depends on, and the reqwest
//! implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Named parameters of the `search_transactions_fuzzy` procedure
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FuzzySearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_accounts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_min_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_max_amount: Option<f64>,
    pub p_limit: i64,
    pub p_offset: i64,
}

/// One matched row returned by the procedure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRow {
    pub date: String,
    pub primary_category: String,
    #[serde(default)]
    pub secondary_category: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub matched_field: Option<String>,
}

/// Seam for the remote search call, so the tool is testable without a network
#[async_trait]
pub trait RemoteSearch: Send + Sync {
    async fn search(&self, params: &FuzzySearchParams) -> Result<Vec<RemoteRow>>;
}

/// HTTP client for the hosted RPC endpoint
pub struct FuzzySearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FuzzySearchClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl RemoteSearch for FuzzySearchClient {
    async fn search(&self, params: &FuzzySearchParams) -> Result<Vec<RemoteRow>> {
        let url = format!("{}/rest/v1/rpc/search_transactions_fuzzy", self.base_url);

        tracing::debug!(target: "remote", limit = params.p_limit, "calling fuzzy search RPC");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(params)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("remote search failed ({}): {}", status, body);
        }

        response
            .json::<Vec<RemoteRow>>()
            .await
            .context("failed to parse remote search response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_serialize_with_p_names_and_skip_absent() {
        let params = FuzzySearchParams {
            p_keyword: Some("外卖".to_string()),
            p_limit: 50,
            ..Default::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["p_keyword"], "外卖");
        assert_eq!(json["p_limit"], 50);
        assert_eq!(json["p_offset"], 0);
        assert!(json.get("p_categories").is_none());
        assert!(json.get("p_start_date").is_none());
    }

    #[test]
    fn test_row_deserializes_sparse_payload() {
        let raw = r#"{
            "date": "2024-08-05",
            "primary_category": "餐饮",
            "amount": 55.5,
            "type": "expense",
            "matched_field": "note"
        }"#;
        let row: RemoteRow = serde_json::from_str(raw).unwrap();
        assert_eq!(row.kind, "expense");
        assert_eq!(row.matched_field.as_deref(), Some("note"));
        assert!(row.tags.is_empty());
    }
}
