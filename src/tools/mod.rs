//! Chat-assistant tools over the transaction cache
//!
//! The registry advertises tool schemas to the model in round 1 and resolves
//! the model's calls in round 2. The executor never propagates a failure
//! outward: every error becomes an `{"error": …}` JSON payload fed back to
//! the model as the tool's result, letting the model decide how to respond.

mod analytics;
mod remote_search;
mod search;

pub use analytics::{CategoryAnalysisTool, FinancialHealthTool, MonthlySummaryTool};
pub use remote_search::RemoteSearchTool;
pub use search::SearchTransactionsTool;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{ToolCall, ToolDefinition};
use crate::remote::RemoteSearch;
use crate::store::TransactionStore;

/// Trait for chat tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as advertised to the model
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON schema for the parameters; must describe every parameter the
    /// handler reads, since schema and handler are not validated against
    /// each other at runtime
    fn parameters(&self) -> Value;

    /// Execute with parsed arguments; errors are converted to `{"error": …}`
    /// payloads by the registry
    async fn execute(&self, args: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// The closed set of tool names; dispatch is exhaustive over this enum so a
/// registry/executor mismatch cannot compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    FinancialHealth,
    MonthlySummary,
    CategoryAnalysis,
    SearchTransactions,
    SearchTransactionsRemote,
}

impl ToolName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get_financial_health" => Some(Self::FinancialHealth),
            "get_monthly_summary" => Some(Self::MonthlySummary),
            "get_category_analysis" => Some(Self::CategoryAnalysis),
            "search_transactions" => Some(Self::SearchTransactions),
            "search_transactions_remote" => Some(Self::SearchTransactionsRemote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinancialHealth => "get_financial_health",
            Self::MonthlySummary => "get_monthly_summary",
            Self::CategoryAnalysis => "get_category_analysis",
            Self::SearchTransactions => "search_transactions",
            Self::SearchTransactionsRemote => "search_transactions_remote",
        }
    }
}

/// Registry of the tools advertised to the model
pub struct ToolRegistry {
    health: FinancialHealthTool,
    monthly: MonthlySummaryTool,
    category: CategoryAnalysisTool,
    search: SearchTransactionsTool,
    remote: Option<RemoteSearchTool>,
}

impl ToolRegistry {
    pub fn new(store: Arc<TransactionStore>) -> Self {
        Self {
            health: FinancialHealthTool::new(store.clone()),
            monthly: MonthlySummaryTool::new(store.clone()),
            category: CategoryAnalysisTool::new(store.clone()),
            search: SearchTransactionsTool::new(store),
            remote: None,
        }
    }

    /// Enable the remote fuzzy-search tool backed by `client`
    pub fn with_remote(mut self, client: Arc<dyn RemoteSearch>) -> Self {
        self.remote = Some(RemoteSearchTool::new(client));
        self
    }

    /// Schema list sent with the round-1 request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = vec![
            self.health.definition(),
            self.monthly.definition(),
            self.category.definition(),
            self.search.definition(),
        ];
        if let Some(remote) = &self.remote {
            defs.push(remote.definition());
        }
        defs
    }

    /// Resolve one model-issued call into a JSON string result
    ///
    /// Never fails outward: unknown names, unparseable arguments, handler
    /// errors, and a disabled remote tool all come back as `{"error": …}`.
    pub async fn execute_call(&self, call: &ToolCall) -> String {
        let result = self.try_execute(call).await;
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                json!({"error": e.to_string()})
            }
        };
        value.to_string()
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<Value> {
        let Some(name) = ToolName::parse(&call.name) else {
            anyhow::bail!("unknown tool: {}", call.name);
        };

        // Tool-calling turns for no-parameter tools may stream an empty
        // argument string; treat it as an empty object.
        let args: Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| anyhow::anyhow!("invalid tool arguments: {}", e))?
        };

        match name {
            ToolName::FinancialHealth => self.health.execute(args).await,
            ToolName::MonthlySummary => self.monthly.execute(args).await,
            ToolName::CategoryAnalysis => self.category.execute(args).await,
            ToolName::SearchTransactions => self.search.execute(args).await,
            ToolName::SearchTransactionsRemote => match &self.remote {
                Some(remote) => remote.execute(args).await,
                None => anyhow::bail!("remote search is not configured"),
            },
        }
    }
}
