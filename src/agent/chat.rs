//! Two-round chat orchestration
//!
//! Each user turn performs at most two request/response rounds against the
//! chat-completions endpoint: round 1 offers the tool registry and collects
//! either a plain answer or accumulated tool calls; if calls were issued,
//! they are executed sequentially and round 2 streams the final answer over
//! the tool results with no tools offered, which caps tool use at one
//! round per turn.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::llm::{ApiMessage, ChatApi, ChatMessage, Role, StreamEvent};
use crate::tools::ToolRegistry;

const SYSTEM_PROMPT: &str = "You are a personal finance assistant embedded in a family \
finance tracker. You answer questions about the user's income, expenses, budgets, and \
savings using the provided tools; query the data before answering and quote concrete \
numbers from tool results rather than guessing. Amounts are in the ledger's currency. \
Reply in the language the user writes in.";

/// Drives the two-round tool-calling protocol and owns the conversation
pub struct ChatAgent {
    client: Arc<dyn ChatApi>,
    registry: ToolRegistry,
    history: Vec<ChatMessage>,
    in_flight: bool,
}

impl ChatAgent {
    pub fn new(client: Arc<dyn ChatApi>, registry: ToolRegistry) -> Self {
        Self {
            client,
            registry,
            history: Vec::new(),
            in_flight: false,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Submit one user message and stream the assistant's answer
    ///
    /// Returns the final assistant message. On error the conversation keeps
    /// whatever partial state existed: the user message and any partially
    /// streamed placeholder stay in place.
    pub async fn send(
        &mut self,
        user_text: impl Into<String>,
        on_event: &(dyn Fn(StreamEvent) + Send + Sync),
    ) -> Result<&ChatMessage> {
        // Single-submission guard; the UI disables its submit control off
        // the same state.
        if self.in_flight {
            anyhow::bail!("a request is already in flight");
        }
        self.in_flight = true;
        let result = self.run_turn(user_text.into(), on_event).await;
        self.in_flight = false;
        result?;

        Ok(self.history.last().expect("turn pushed a message"))
    }

    async fn run_turn(
        &mut self,
        user_text: String,
        on_event: &(dyn Fn(StreamEvent) + Send + Sync),
    ) -> Result<()> {
        self.history.push(ChatMessage::user(&user_text));

        // Round-1 request: system prompt, prior turns replayed as
        // role+content only (tool-call metadata dropped), then the new
        // user message.
        let base: Vec<ApiMessage> = std::iter::once(ApiMessage::text(Role::System, SYSTEM_PROMPT))
            .chain(
                self.history
                    .iter()
                    .filter(|m| matches!(m.role, Role::User | Role::Assistant))
                    .filter(|m| !m.content.is_empty())
                    .map(|m| ApiMessage::text(m.role, &m.content)),
            )
            .collect();

        let definitions = self.registry.definitions();
        let placeholder = self.history.len();
        self.history.push(ChatMessage::assistant(""));

        let round1 = self
            .stream_into(placeholder, &base, Some(&definitions), on_event)
            .await?;

        if round1.tool_calls.is_empty() {
            return Ok(());
        }

        // A tool-calling turn typically carries no user-visible text, so the
        // placeholder is discarded rather than kept as a message.
        self.history.remove(placeholder);

        tracing::info!(calls = round1.tool_calls.len(), "executing tool calls");
        let mut tool_messages = Vec::with_capacity(round1.tool_calls.len());
        for call in &round1.tool_calls {
            tracing::debug!(tool = %call.name, id = %call.id, "running tool");
            let result = self.registry.execute_call(call).await;
            tool_messages.push(ApiMessage::tool_result(&call.id, result));
        }

        // Round-2 request: base history, the assistant's tool-call message
        // replayed verbatim, then one tool result per call in call order.
        // No tools are offered, so the model must answer.
        let mut round2_messages = base;
        round2_messages.push(ApiMessage::assistant_with_calls(
            round1.content,
            &round1.tool_calls,
        ));
        round2_messages.extend(tool_messages);

        let answer = self.history.len();
        self.history.push(ChatMessage::assistant(""));
        let round2 = self
            .stream_into(answer, &round2_messages, None, on_event)
            .await?;

        if !round2.tool_calls.is_empty() {
            tracing::warn!(
                calls = round2.tool_calls.len(),
                "model issued tool calls in the final round; ignoring"
            );
        }

        // Keep the calls on the answer so the UI can show what was queried.
        self.history[answer].tool_calls = round1.tool_calls;

        Ok(())
    }

    /// Stream one round into `self.history[index]`, keeping partial content
    /// on failure
    async fn stream_into(
        &mut self,
        index: usize,
        messages: &[ApiMessage],
        tools: Option<&[crate::llm::ToolDefinition]>,
        on_event: &(dyn Fn(StreamEvent) + Send + Sync),
    ) -> Result<crate::llm::RoundOutcome> {
        let partial = Arc::new(Mutex::new(String::new()));
        let forward = {
            let partial = partial.clone();
            move |event: StreamEvent| {
                if let StreamEvent::TextDelta(delta) = &event {
                    partial.lock().unwrap().push_str(delta);
                }
                on_event(event);
            }
        };

        let outcome = self.client.stream_chat(messages, tools, &forward).await;
        self.history[index].content = partial.lock().unwrap().clone();

        outcome
    }
}
