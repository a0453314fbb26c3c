//! In-memory transaction cache consumed by the chat tools
//!
//! The cache is owned and filled by an external data-loading layer (here, a
//! JSON file feed); the chat core only ever reads it. Dates are kept as
//! `YYYY-MM-DD` strings and compared lexicographically, which for this
//! format orders the same as calendar order.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Income,
    Expense,
    Transfer,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::Income => "income",
            TxnKind::Expense => "expense",
            TxnKind::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TxnKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(TxnKind::Income),
            "expense" => Ok(TxnKind::Expense),
            "transfer" => Ok(TxnKind::Transfer),
            other => anyhow::bail!("invalid transaction type: {}", other),
        }
    }
}

/// One ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub primary_category: String,
    #[serde(default)]
    pub secondary_category: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl Transaction {
    pub fn year(&self) -> Option<i32> {
        self.date.get(..4)?.parse().ok()
    }

    pub fn month(&self) -> Option<u32> {
        self.date.get(5..7)?.parse().ok()
    }
}

/// Pre-aggregated totals for the selected year
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Read-only transaction cache with per-year buckets and selected-year totals
#[derive(Debug)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
    by_year: BTreeMap<i32, Vec<usize>>,
    selected_year: i32,
    totals: Totals,
}

impl TransactionStore {
    pub fn new(transactions: Vec<Transaction>, selected_year: i32) -> Self {
        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (idx, txn) in transactions.iter().enumerate() {
            if let Some(year) = txn.year() {
                by_year.entry(year).or_default().push(idx);
            }
        }

        let totals = Self::compute_totals(&transactions, &by_year, selected_year);

        Self {
            transactions,
            by_year,
            selected_year,
            totals,
        }
    }

    /// Load from a JSON array of transactions
    pub fn load_json(path: impl AsRef<Path>, selected_year: i32) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let transactions: Vec<Transaction> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::info!(
            count = transactions.len(),
            year = selected_year,
            "loaded transaction cache"
        );
        Ok(Self::new(transactions, selected_year))
    }

    fn compute_totals(
        transactions: &[Transaction],
        by_year: &BTreeMap<i32, Vec<usize>>,
        year: i32,
    ) -> Totals {
        let mut totals = Totals::default();
        if let Some(indices) = by_year.get(&year) {
            for &idx in indices {
                match transactions[idx].kind {
                    TxnKind::Income => totals.income += transactions[idx].amount,
                    TxnKind::Expense => totals.expense += transactions[idx].amount,
                    TxnKind::Transfer => {}
                }
            }
        }
        totals.balance = totals.income - totals.expense;
        totals
    }

    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn selected_year(&self) -> i32 {
        self.selected_year
    }

    pub fn available_years(&self) -> Vec<i32> {
        self.by_year.keys().copied().collect()
    }

    /// Transactions bucketed under `year`, or None if the year is absent
    pub fn for_year(&self, year: i32) -> Option<Vec<&Transaction>> {
        self.by_year
            .get(&year)
            .map(|indices| indices.iter().map(|&i| &self.transactions[i]).collect())
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }
}
