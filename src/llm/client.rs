//! OpenAI-compatible chat-completions client
//!
//! One endpoint, two uses per user turn: round 1 with the tool registry and
//! `tool_choice: "auto"`, round 2 with tool results and no tools. Responses
//! always stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;

use super::streaming::{SseDecoder, ToolCallAssembler};
use super::{
    ApiMessage, ApiRequest, ApiTool, LlmError, RoundOutcome, StreamChunk, StreamEvent,
    ToolDefinition,
};

/// The seam the orchestrator drives; lets tests substitute a scripted backend
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one streaming round; `on_event` fires per delta in arrival order
    async fn stream_chat(
        &self,
        messages: &[ApiMessage],
        tools: Option<&[ToolDefinition]>,
        on_event: &(dyn Fn(StreamEvent) + Send + Sync),
    ) -> Result<RoundOutcome>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<usize>,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(
        &self,
        messages: &[ApiMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> ApiRequest {
        let mut request = ApiRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: None,
            tool_choice: None,
            stream: true,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        if let Some(tools) = tools {
            if !tools.is_empty() {
                request.tools = Some(tools.iter().map(ApiTool::from).collect());
                request.tool_choice = Some("auto".to_string());
            }
        }

        request
    }
}

#[async_trait]
impl ChatApi for ChatCompletionsClient {
    async fn stream_chat(
        &self,
        messages: &[ApiMessage],
        tools: Option<&[ToolDefinition]>,
        on_event: &(dyn Fn(StreamEvent) + Send + Sync),
    ) -> Result<RoundOutcome> {
        let request = self.build_request(messages, tools);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            target: "llm",
            model = %self.model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, body).into());
        }

        let mut decoder = SseDecoder::new();
        let mut assembler = ToolCallAssembler::new();
        let mut content = String::new();

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            // A transport-level read failure is terminal for the turn.
            let chunk = chunk
                .map_err(|e| LlmError::Network(format!("error reading stream: {}", e)))?;
            for payload in decoder.push(&chunk) {
                process_payload(&payload, &mut content, &mut assembler, on_event);
            }
        }
        for payload in decoder.finish() {
            process_payload(&payload, &mut content, &mut assembler, on_event);
        }

        on_event(StreamEvent::Done);
        Ok(RoundOutcome {
            content,
            tool_calls: assembler.finish(),
        })
    }
}

/// Handle one `data:` payload: `[DONE]`, a delta frame, or garbage
///
/// Malformed frames are skipped rather than aborting the stream, but leave
/// a diagnostic so the failure is auditable.
fn process_payload(
    payload: &str,
    content: &mut String,
    assembler: &mut ToolCallAssembler,
    on_event: &(dyn Fn(StreamEvent) + Send + Sync),
) {
    if payload == "[DONE]" {
        return;
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(target: "llm", error = %e, frame = payload, "skipping malformed stream frame");
            return;
        }
    };

    let Some(choice) = chunk.choices.first() else {
        return;
    };

    if let Some(delta) = &choice.delta.content {
        if !delta.is_empty() {
            content.push_str(delta);
            on_event(StreamEvent::TextDelta(delta.clone()));
        }
    }

    if let Some(fragments) = &choice.delta.tool_calls {
        for fragment in fragments {
            if let Some(event) = assembler.apply(fragment) {
                on_event(event);
            }
        }
    }
}
