use std::sync::Arc;

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, GenerationEvent, GenerationResult, TextGenerator};
use crate::config::GeneratorConfig;

const DONE_MARKER: &str = "[DONE]";

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    config: Arc<GeneratorConfig>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded line of the server-sent event body.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// Text delta carried by a `data:` line.
    Delta(String),
    /// End-of-stream marker.
    Done,
    /// Comments, blank lines, other fields and deltas without content.
    Skip,
}

fn parse_sse_line(line: &str) -> GenerationResult<SseLine> {
    let Some(payload) = line.trim_end_matches('\r').strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Ok(SseLine::Done);
    }
    if payload.is_empty() {
        return Ok(SseLine::Skip);
    }

    let chunk: ChatChunk =
        serde_json::from_str(payload).map_err(|source| GenerationError::Decode { source })?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(SseLine::Skip, SseLine::Delta))
}

impl OpenAiGenerator {
    /// Build a generator from configuration.
    ///
    /// A missing API key is not an error here; the backend refuses the calls instead.
    pub fn new(config: GeneratorConfig) -> GenerationResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| GenerationError::ClientBuilder { source })?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn request(&self, messages: Vec<ChatMessage<'_>>, stream: bool) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: stream.then_some(self.config.max_tokens),
            stream,
        };

        let builder = self.client.post(url).json(&body);
        match self.config.api_key.as_deref() {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

async fn check_status(response: reqwest::Response) -> GenerationResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Status { status, body })
}

impl TextGenerator for OpenAiGenerator {
    fn stream(&self, input: String) -> BoxStream<'static, GenerationResult<GenerationEvent>> {
        let generator = self.clone();
        async_stream::try_stream! {
            let messages = vec![
                ChatMessage { role: "system", content: &generator.config.system_prompt },
                ChatMessage { role: "user", content: &input },
            ];
            let response = generator
                .request(messages, true)
                .send()
                .await
                .map_err(|source| GenerationError::Transport { source })?;
            let mut body = check_status(response).await?.bytes_stream();

            let mut pending: Vec<u8> = Vec::new();
            let mut text = String::new();
            'read: while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|source| GenerationError::Transport { source })?;
                pending.extend_from_slice(&chunk);

                while let Some(newline) = pending.iter().position(|byte| *byte == b'\n') {
                    let line: Vec<u8> = pending.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line[..line.len() - 1]);
                    match parse_sse_line(&line)? {
                        SseLine::Delta(fragment) => {
                            text.push_str(&fragment);
                            yield GenerationEvent::Fragment(fragment);
                        }
                        SseLine::Done => break 'read,
                        SseLine::Skip => {}
                    }
                }
            }

            debug!(chars = text.len(), "generation stream finished");
            yield GenerationEvent::Completed(text);
        }
        .boxed()
    }

    fn complete(&self, prompt: String) -> BoxFuture<'static, GenerationResult<String>> {
        let generator = self.clone();
        Box::pin(async move {
            let messages = vec![ChatMessage {
                role: "user",
                content: &prompt,
            }];
            let response = generator
                .request(messages, false)
                .send()
                .await
                .map_err(|source| GenerationError::Transport { source })?;
            let bytes = check_status(response)
                .await?
                .bytes()
                .await
                .map_err(|source| GenerationError::Transport { source })?;

            let payload: ChatResponse = serde_json::from_slice(&bytes)
                .map_err(|source| GenerationError::Decode { source })?;
            payload
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or(GenerationError::Empty)
        })
    }
}
