//! Local transaction search over the in-memory cache

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::store::TransactionStore;

/// Filtered search over the full in-memory transaction array
///
/// Filters are applied as a sequential chain; the result carries the sum and
/// count over every match, while the listed transactions are truncated to
/// the limit.
pub struct SearchTransactionsTool {
    store: Arc<TransactionStore>,
}

impl SearchTransactionsTool {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self { store }
    }

    const DEFAULT_LIMIT: usize = 10;
}

#[async_trait]
impl Tool for SearchTransactionsTool {
    fn name(&self) -> &str {
        "search_transactions"
    }

    fn description(&self) -> &str {
        "Search cached transactions by category, date range, and amount \
         range. Returns the matched total and up to `limit` entries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Primary category to match exactly"
                },
                "start_date": {
                    "type": "string",
                    "description": "Inclusive start date, YYYY-MM-DD"
                },
                "end_date": {
                    "type": "string",
                    "description": "Inclusive end date, YYYY-MM-DD"
                },
                "min_amount": {
                    "type": "number",
                    "description": "Minimum amount, inclusive"
                },
                "max_amount": {
                    "type": "number",
                    "description": "Maximum amount, inclusive"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of entries to return (default 10)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let category = args.get("category").and_then(Value::as_str);
        let start_date = args.get("start_date").and_then(Value::as_str);
        let end_date = args.get("end_date").and_then(Value::as_str);
        let min_amount = args.get("min_amount").and_then(Value::as_f64);
        let max_amount = args.get("max_amount").and_then(Value::as_f64);
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(Self::DEFAULT_LIMIT);

        // Date bounds compare lexicographically; YYYY-MM-DD strings order
        // the same as calendar dates.
        let matches: Vec<_> = self
            .store
            .all()
            .iter()
            .filter(|t| category.is_none_or(|c| t.primary_category == c))
            .filter(|t| start_date.is_none_or(|d| t.date.as_str() >= d))
            .filter(|t| end_date.is_none_or(|d| t.date.as_str() <= d))
            .filter(|t| min_amount.is_none_or(|a| t.amount >= a))
            .filter(|t| max_amount.is_none_or(|a| t.amount <= a))
            .collect();

        let total: f64 = matches.iter().map(|t| t.amount).sum();
        let count = matches.len();
        let transactions: Vec<Value> = matches
            .into_iter()
            .take(limit)
            .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
            .collect();

        Ok(json!({
            "total": total,
            "count": count,
            "transactions": transactions,
        }))
    }
}
