//! Remote fuzzy search with pre-flight validation
//!
//! Every argument is validated locally before the RPC is issued; a failed
//! validation short-circuits with an error and no network round trip. The
//! date check is format-only (`^\d{4}-\d{2}-\d{2}$`): calendar-invalid
//! strings like `2024-13-01` pass and simply match nothing downstream.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use super::Tool;
use crate::remote::{FuzzySearchParams, RemoteSearch};
use crate::store::TxnKind;

static DATE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;
const MAX_KEYWORD_CHARS: usize = 200;

/// Fuzzy keyword search against the hosted transaction backend
pub struct RemoteSearchTool {
    client: Arc<dyn RemoteSearch>,
}

impl RemoteSearchTool {
    pub fn new(client: Arc<dyn RemoteSearch>) -> Self {
        Self { client }
    }

    /// Validate and convert tool arguments into RPC parameters
    pub(crate) fn build_params(args: &Value) -> Result<FuzzySearchParams> {
        let keyword = args
            .get("keyword")
            .and_then(Value::as_str)
            .map(|k| k.trim().chars().take(MAX_KEYWORD_CHARS).collect::<String>())
            .filter(|k| !k.is_empty());

        let p_type = match args.get("type").and_then(Value::as_str) {
            Some(t) => {
                let kind: TxnKind = t
                    .parse()
                    .map_err(|_| anyhow::anyhow!("type must be one of income, expense, transfer"))?;
                Some(kind.as_str().to_string())
            }
            None => None,
        };

        let start_date = validate_date(args, "start_date")?;
        let end_date = validate_date(args, "end_date")?;

        let limit = args
            .get("limit")
            .and_then(Value::as_i64)
            .map_or(DEFAULT_LIMIT, |n| n.clamp(1, MAX_LIMIT));

        Ok(FuzzySearchParams {
            p_keyword: keyword,
            p_categories: string_list(args, "categories"),
            p_type,
            p_accounts: string_list(args, "accounts"),
            p_tags: string_list(args, "tags"),
            p_start_date: start_date,
            p_end_date: end_date,
            p_min_amount: args.get("min_amount").and_then(Value::as_f64),
            p_max_amount: args.get("max_amount").and_then(Value::as_f64),
            p_limit: limit,
            p_offset: 0,
        })
    }
}

fn validate_date(args: &Value, field: &str) -> Result<Option<String>> {
    match args.get(field).and_then(Value::as_str) {
        Some(date) => {
            if !DATE_FORMAT.is_match(date) {
                anyhow::bail!("invalid {}: expected YYYY-MM-DD, got {:?}", field, date);
            }
            Ok(Some(date.to_string()))
        }
        None => Ok(None),
    }
}

fn string_list(args: &Value, field: &str) -> Option<Vec<String>> {
    let values: Vec<String> = args
        .get(field)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(String::from)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[async_trait]
impl Tool for RemoteSearchTool {
    fn name(&self) -> &str {
        "search_transactions_remote"
    }

    fn description(&self) -> &str {
        "Fuzzy-search the full transaction history on the server by free-text \
         keyword, with optional category/account/tag, type, date-range, and \
         amount-range filters."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Free-text keyword matched against note, category, and tags"
                },
                "categories": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Primary categories to include"
                },
                "type": {
                    "type": "string",
                    "enum": ["income", "expense", "transfer"]
                },
                "accounts": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "tags": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "start_date": {
                    "type": "string",
                    "description": "Inclusive start date, YYYY-MM-DD"
                },
                "end_date": {
                    "type": "string",
                    "description": "Inclusive end date, YYYY-MM-DD"
                },
                "min_amount": {"type": "number"},
                "max_amount": {"type": "number"},
                "limit": {
                    "type": "integer",
                    "description": "Maximum rows to return, 1-500 (default 50)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let params = Self::build_params(&args)?;
        let rows = self.client.search(&params).await?;

        let total: f64 = rows.iter().map(|r| r.amount).sum();
        Ok(json!({
            "total": total,
            "count": rows.len(),
            "transactions": rows,
        }))
    }
}
