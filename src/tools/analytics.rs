//! Aggregate analytics tools over the transaction cache

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::store::{TransactionStore, TxnKind};

/// Overall income/expense/balance plus savings rate for the selected year
pub struct FinancialHealthTool {
    store: Arc<TransactionStore>,
}

impl FinancialHealthTool {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FinancialHealthTool {
    fn name(&self) -> &str {
        "get_financial_health"
    }

    fn description(&self) -> &str {
        "Get the overall financial health for the currently selected year: \
         total income, total expense, balance, and savings rate."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let totals = self.store.totals();
        // Guard the division: zero income reports a 0.0% savings rate
        // regardless of expenses.
        let savings_rate = if totals.income == 0.0 {
            "0.0%".to_string()
        } else {
            format!(
                "{:.1}%",
                (totals.income - totals.expense) / totals.income * 100.0
            )
        };

        Ok(json!({
            "year": self.store.selected_year(),
            "total_income": totals.income,
            "total_expense": totals.expense,
            "balance": totals.balance,
            "savings_rate": savings_rate,
        }))
    }
}

/// Per-calendar-month income/expense sums for one year
pub struct MonthlySummaryTool {
    store: Arc<TransactionStore>,
}

impl MonthlySummaryTool {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MonthlySummaryTool {
    fn name(&self) -> &str {
        "get_monthly_summary"
    }

    fn description(&self) -> &str {
        "Get month-by-month income and expense totals for a year. \
         Months with no activity are omitted."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "year": {
                    "type": "integer",
                    "description": "Year to summarize; defaults to the currently selected year"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let year = args
            .get("year")
            .and_then(Value::as_i64)
            .map(|y| y as i32)
            .unwrap_or_else(|| self.store.selected_year());

        let Some(transactions) = self.store.for_year(year) else {
            anyhow::bail!("no transaction data for year {}", year);
        };

        let mut income = [0.0f64; 12];
        let mut expense = [0.0f64; 12];
        for txn in transactions {
            let Some(month) = txn.month().filter(|m| (1..=12).contains(m)) else {
                continue;
            };
            let slot = (month - 1) as usize;
            match txn.kind {
                TxnKind::Income => income[slot] += txn.amount,
                TxnKind::Expense => expense[slot] += txn.amount,
                TxnKind::Transfer => {}
            }
        }

        let months: Vec<Value> = (0..12)
            .filter(|&m| income[m] != 0.0 || expense[m] != 0.0)
            .map(|m| {
                json!({
                    "month": m + 1,
                    "income": income[m],
                    "expense": expense[m],
                })
            })
            .collect();

        Ok(json!({ "year": year, "months": months }))
    }
}

/// Top spending/earning categories with share-of-total percentages
pub struct CategoryAnalysisTool {
    store: Arc<TransactionStore>,
}

impl CategoryAnalysisTool {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self { store }
    }

    const DEFAULT_TOP_N: usize = 5;
}

#[async_trait]
impl Tool for CategoryAnalysisTool {
    fn name(&self) -> &str {
        "get_category_analysis"
    }

    fn description(&self) -> &str {
        "Break down the selected year's income or expenses by primary \
         category, with each category's share of the total."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["type"],
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["income", "expense"],
                    "description": "Which side of the ledger to analyze"
                },
                "top_n": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "How many categories to return (default 5)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let kind_str = args
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("missing required parameter: type"))?;
        let kind: TxnKind = kind_str.parse()?;
        if kind == TxnKind::Transfer {
            anyhow::bail!("type must be income or expense");
        }

        let top_n = args
            .get("top_n")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(Self::DEFAULT_TOP_N);

        let transactions = self
            .store
            .for_year(self.store.selected_year())
            .unwrap_or_default();

        let mut sums: HashMap<&str, f64> = HashMap::new();
        let mut total = 0.0f64;
        for txn in transactions {
            if txn.kind != kind {
                continue;
            }
            *sums.entry(txn.primary_category.as_str()).or_default() += txn.amount;
            total += txn.amount;
        }

        let mut ranked: Vec<(&str, f64)> = sums.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_n);

        let categories: Vec<Value> = ranked
            .into_iter()
            .map(|(category, amount)| {
                // Zero total reports "0%" everywhere instead of dividing.
                let percentage = if total == 0.0 {
                    "0%".to_string()
                } else {
                    format!("{:.1}%", amount / total * 100.0)
                };
                json!({
                    "category": category,
                    "amount": amount,
                    "percentage": percentage,
                })
            })
            .collect();

        Ok(json!({
            "year": self.store.selected_year(),
            "type": kind.as_str(),
            "total": total,
            "categories": categories,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Transaction;

    fn txn(date: &str, amount: f64, kind: TxnKind, category: &str) -> Transaction {
        Transaction {
            date: date.to_string(),
            amount,
            kind,
            primary_category: category.to_string(),
            secondary_category: String::new(),
            account: String::new(),
            currency: "CNY".to_string(),
            tags: Vec::new(),
            note: String::new(),
        }
    }

    fn store(transactions: Vec<Transaction>) -> Arc<TransactionStore> {
        Arc::new(TransactionStore::new(transactions, 2024))
    }

    #[tokio::test]
    async fn test_financial_health_savings_rate() {
        let tool = FinancialHealthTool::new(store(vec![
            txn("2024-01-01", 10000.0, TxnKind::Income, "工资"),
            txn("2024-02-01", 6400.0, TxnKind::Expense, "餐饮"),
        ]));
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["total_income"], 10000.0);
        assert_eq!(result["savings_rate"], "36.0%");
    }

    #[tokio::test]
    async fn test_financial_health_zero_income_guards_division() {
        let tool = FinancialHealthTool::new(store(vec![txn(
            "2024-02-01",
            6400.0,
            TxnKind::Expense,
            "餐饮",
        )]));
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["savings_rate"], "0.0%");
        assert_eq!(result["balance"], -6400.0);
    }

    #[tokio::test]
    async fn test_monthly_summary_omits_quiet_months() {
        let tool = MonthlySummaryTool::new(store(vec![
            txn("2024-01-10", 100.0, TxnKind::Income, "工资"),
            txn("2024-03-05", 40.0, TxnKind::Expense, "交通"),
        ]));
        let result = tool.execute(json!({})).await.unwrap();
        let months = result["months"].as_array().unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0]["month"], 1);
        assert_eq!(months[1]["month"], 3);
        assert_eq!(months[1]["expense"], 40.0);
    }

    #[tokio::test]
    async fn test_monthly_summary_unknown_year_errors() {
        let tool = MonthlySummaryTool::new(store(vec![txn(
            "2024-01-10",
            100.0,
            TxnKind::Income,
            "工资",
        )]));
        let err = tool.execute(json!({"year": 2019})).await.unwrap_err();
        assert!(err.to_string().contains("2019"));
    }

    #[tokio::test]
    async fn test_category_percentages_sum_to_hundred() {
        let tool = CategoryAnalysisTool::new(store(vec![
            txn("2024-01-01", 500.0, TxnKind::Expense, "餐饮"),
            txn("2024-01-02", 300.0, TxnKind::Expense, "交通"),
            txn("2024-01-03", 200.0, TxnKind::Expense, "娱乐"),
        ]));
        let result = tool.execute(json!({"type": "expense"})).await.unwrap();
        let categories = result["categories"].as_array().unwrap();
        let sum: f64 = categories
            .iter()
            .map(|c| {
                c["percentage"]
                    .as_str()
                    .unwrap()
                    .trim_end_matches('%')
                    .parse::<f64>()
                    .unwrap()
            })
            .sum();
        assert!((sum - 100.0).abs() < 0.5);
        // Descending by share.
        assert_eq!(categories[0]["category"], "餐饮");
        assert_eq!(categories[0]["percentage"], "50.0%");
    }

    #[tokio::test]
    async fn test_category_zero_total_reports_flat_zero() {
        let tool = CategoryAnalysisTool::new(store(vec![txn(
            "2024-01-01",
            500.0,
            TxnKind::Expense,
            "餐饮",
        )]));
        let result = tool.execute(json!({"type": "income"})).await.unwrap();
        assert_eq!(result["total"], 0.0);
        for category in result["categories"].as_array().unwrap() {
            assert_eq!(category["percentage"], "0%");
        }
    }

    #[tokio::test]
    async fn test_category_top_n_truncates() {
        let transactions = (0..8)
            .map(|i| {
                txn(
                    "2024-01-01",
                    100.0 + i as f64,
                    TxnKind::Expense,
                    &format!("cat{}", i),
                )
            })
            .collect();
        let tool = CategoryAnalysisTool::new(store(transactions));

        let result = tool.execute(json!({"type": "expense"})).await.unwrap();
        assert_eq!(result["categories"].as_array().unwrap().len(), 5);

        let result = tool
            .execute(json!({"type": "expense", "top_n": 2}))
            .await
            .unwrap();
        assert_eq!(result["categories"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_category_rejects_transfer_and_garbage() {
        let tool = CategoryAnalysisTool::new(store(vec![]));
        assert!(tool.execute(json!({"type": "transfer"})).await.is_err());
        assert!(tool.execute(json!({"type": "deposit"})).await.is_err());
        assert!(tool.execute(json!({})).await.is_err());
    }
}
