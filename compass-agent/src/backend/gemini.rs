//! Gemini REST backend.
//!
//! Talks to the `generativelanguage` v1beta API:
//! - `models/{model}:generateContent` for complete responses
//! - `models/{model}:streamGenerateContent?alt=sse` for streamed replies

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::*;
use crate::stream::{FragmentSender, FragmentStream};

/// Public endpoint of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    /// Whole-request limit for `generateContent`. Streams only bound the
    /// connect phase, since a long reply keeps the body open.
    timeout: Option<Duration>,
}

impl GeminiBackend {
    /// Create a backend against `base_url` with the given API key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, BackendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BackendError::Unavailable("No API key configured".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    /// Create a backend for the public Gemini API.
    pub fn public(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::new(DEFAULT_BASE_URL, api_key, None)
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn stream_url(&self, model: &str) -> String {
        format!("{}/models/{}:streamGenerateContent", self.base_url, model)
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
        sse: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let mut request = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body);
        if sse {
            request = request.query(&[("alt", "sse")]);
        } else if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let retry_after_ms = retry_after_ms(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(map_error_status(status, retry_after_ms, &body))
    }
}

/// `Retry-After` in whole seconds, as milliseconds.
fn retry_after_ms(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

/// Map a non-success HTTP response to a backend error.
fn map_error_status(status: StatusCode, retry_after_ms: Option<u64>, body: &str) -> BackendError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let provider_status = envelope.as_ref().and_then(|e| e.error.status.as_deref());

    if status == StatusCode::TOO_MANY_REQUESTS || provider_status == Some("RESOURCE_EXHAUSTED") {
        warn!(%status, ?retry_after_ms, "Gemini rate limit hit");
        return BackendError::RateLimited { retry_after_ms };
    }

    let message = envelope
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.to_string());
    BackendError::RequestFailed(format!("HTTP {}: {}", status, message))
}

/// Gemini `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// Gemini `generateContent` response (also one SSE event).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl From<&ContentRequest> for GenerateContentRequest {
    fn from(request: &ContentRequest) -> Self {
        use base64::Engine;
        let encode = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);

        let contents = request
            .contents
            .iter()
            .map(|content| WireContent {
                role: Some(content.role.as_str().to_string()),
                parts: content
                    .parts
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => WirePart {
                            text: Some(text.clone()),
                            ..Default::default()
                        },
                        Part::Image(image) => WirePart {
                            inline_data: Some(WireBlob {
                                mime_type: image.mime_type.clone(),
                                data: encode(&image.bytes),
                            }),
                            ..Default::default()
                        },
                    })
                    .collect(),
            })
            .collect();

        let system_instruction = request.system_instruction.as_ref().map(|text| WireContent {
            role: None,
            parts: vec![WirePart {
                text: Some(text.clone()),
                ..Default::default()
            }],
        });

        let mut config = GenerationConfig::default();
        match &request.output {
            OutputMode::Text => {}
            OutputMode::Json { schema } => {
                config.response_mime_type = Some("application/json".to_string());
                config.response_schema = schema.clone();
            }
            OutputMode::Audio { voice } => {
                config.response_modalities = Some(vec!["AUDIO".to_string()]);
                config.speech_config = Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.clone(),
                        },
                    },
                });
            }
            OutputMode::Image { aspect_ratio } => {
                config.response_modalities = Some(vec!["IMAGE".to_string()]);
                config.image_config = aspect_ratio.as_ref().map(|ratio| ImageConfig {
                    aspect_ratio: ratio.clone(),
                });
            }
        }
        config.thinking_config = request
            .thinking_budget
            .map(|thinking_budget| ThinkingConfig { thinking_budget });

        let has_config = !matches!(request.output, OutputMode::Text)
            || config.thinking_config.is_some();

        Self {
            contents,
            system_instruction,
            generation_config: has_config.then_some(config),
        }
    }
}

impl GenerateContentResponse {
    /// Flatten the first candidate into a backend response.
    fn into_content_response(self) -> Result<ContentResponse, BackendError> {
        if self.candidates.is_empty() {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(BackendError::ContentBlocked { reason });
            }
        }

        let usage = self
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let mut response = ContentResponse {
            usage,
            ..Default::default()
        };

        if let Some(candidate) = self.candidates.into_iter().next() {
            response.finish_reason = FinishReason::from_provider(candidate.finish_reason.as_deref());
            for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                if part.thought == Some(true) {
                    continue;
                }
                if let Some(text) = part.text {
                    response.text.push_str(&text);
                }
                if let Some(blob) = part.inline_data {
                    response.inline_data.push(InlinePayload {
                        mime_type: blob.mime_type,
                        data: blob.data,
                    });
                }
            }
        }

        Ok(response)
    }
}

/// Line buffer for a server-sent event body.
#[derive(Debug, Default)]
struct SseBuffer {
    buffer: String,
}

impl SseBuffer {
    /// Append raw bytes and return the `data:` payloads of every completed line.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim().to_string();
            self.buffer.drain(..=newline_pos);

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    events.push(data.to_string());
                }
            }
        }
        events
    }

    /// Whatever is left once the body ends without a trailing newline.
    fn finish(self) -> Option<String> {
        self.buffer
            .trim()
            .strip_prefix("data:")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    }
}

/// Forward one SSE event. Returns `false` once the consumer has gone away
/// or the event was unusable.
async fn forward_event(
    data: &str,
    sender: &FragmentSender,
    finish_reason: &mut FinishReason,
) -> Result<bool, BackendError> {
    let event: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| BackendError::ParseError(format!("Invalid stream event: {e}")))?;
    let chunk = event.into_content_response()?;
    *finish_reason = chunk.finish_reason;

    if chunk.text.is_empty() {
        return Ok(true);
    }
    Ok(sender.send(chunk.text).await.is_ok())
}

async fn pump_sse(response: reqwest::Response, sender: FragmentSender, model: String) {
    let mut body = response.bytes_stream();
    let mut buffer = SseBuffer::default();
    let mut finish_reason = FinishReason::Stop;

    while let Some(next) = body.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = sender.fail(BackendError::NetworkError(e.to_string())).await;
                return;
            }
        };

        for data in buffer.push(&bytes) {
            match forward_event(&data, &sender, &mut finish_reason).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(model = %model, "Stream consumer went away, stopping");
                    return;
                }
                Err(e) => {
                    let _ = sender.fail(e).await;
                    return;
                }
            }
        }
    }

    if let Some(data) = buffer.finish() {
        match forward_event(&data, &sender, &mut finish_reason).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                let _ = sender.fail(e).await;
                return;
            }
        }
    }

    debug!(model = %model, ?finish_reason, "Stream completed");
    let _ = sender.finish("", finish_reason).await;
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn id(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: ContentRequest) -> Result<ContentResponse, BackendError> {
        let body = GenerateContentRequest::from(&request);
        debug!(model = %request.model, turns = request.contents.len(), "generateContent");

        let response = self.post(self.generate_url(&request.model), &body, false).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))?;

        let content = parsed.into_content_response()?;
        info!(
            model = %request.model,
            tokens = content.usage.total(),
            finish_reason = ?content.finish_reason,
            "Gemini generation complete"
        );
        Ok(content)
    }

    async fn generate_stream(
        &self,
        request: ContentRequest,
    ) -> Result<FragmentStream, BackendError> {
        let body = GenerateContentRequest::from(&request);
        debug!(model = %request.model, turns = request.contents.len(), "streamGenerateContent");

        let response = self.post(self.stream_url(&request.model), &body, true).await?;
        let (sender, stream) = FragmentStream::channel(32);
        tokio::spawn(pump_sse(response, sender, request.model));
        Ok(stream)
    }
}
