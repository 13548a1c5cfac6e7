use std::collections::VecDeque;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::sse::SseDecoder;
use crate::explain::{FragmentSource, FragmentStream};
use crate::fragment::{Fragment, ImageData};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-preview-image-generation";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    /// Send `prompt` as a fresh single-turn conversation and stream the reply
    pub async fn stream_fragments(&self, prompt: &str) -> Result<FragmentStream> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        };

        info!(model = %self.model, "opening generation stream");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, compact_json(&text)));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(fragment_stream(body))
    }
}

#[async_trait]
impl FragmentSource for GeminiClient {
    async fn stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.stream_fragments(prompt).await
    }
}

/// Re-serialize a JSON body onto one line, leaving anything else as is
fn compact_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| text.trim().to_string())
}

struct BodyState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Fragment>,
    done: bool,
}

fn fragment_stream(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> FragmentStream {
    let state = BodyState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.done {
                return None;
            }

            let payloads = match state.body.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(anyhow!(e).context("Gemini stream interrupted")), state));
                }
                None => {
                    state.done = true;
                    state.decoder.finish().into_iter().collect()
                }
            };

            for payload in payloads {
                match parse_event(&payload) {
                    Ok(fragments) => state.pending.extend(fragments),
                    Err(e) => {
                        state.done = true;
                        state.pending.clear();
                        return Some((Err(e), state));
                    }
                }
            }
        }
    })
    .boxed()
}

/// Map one streamed `GenerateContentResponse` to fragments, in part order
fn parse_event(payload: &str) -> Result<Vec<Fragment>> {
    let response: GeminiResponse = serde_json::from_str(payload)
        .with_context(|| format!("Unexpected stream payload: {}", payload))?;

    if let Some(error) = response.error {
        return Err(anyhow!("{}", serde_json::json!({ "error": error })));
    }

    let mut fragments = Vec::new();
    for candidate in response.candidates {
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            if let Some(fragment) = part_to_fragment(part) {
                fragments.push(fragment);
            }
        }
    }
    Ok(fragments)
}

/// Parts without usable text or image data are skipped, never fatal
fn part_to_fragment(part: GeminiPart) -> Option<Fragment> {
    if let Some(text) = part.text.filter(|t| !t.is_empty()) {
        return Some(Fragment::Text(text));
    }

    match part.inline_data {
        Some(inline) if inline.mime_type.starts_with("image/") => {
            match STANDARD.decode(inline.data.as_bytes()) {
                Ok(bytes) => Some(Fragment::Image(ImageData::new(bytes, inline.mime_type))),
                Err(e) => {
                    warn!(mime_type = %inline.mime_type, "skipping undecodable image data: {}", e);
                    None
                }
            }
        }
        Some(inline) => {
            debug!(mime_type = %inline.mime_type, "ignoring non-image inline data");
            None
        }
        None => {
            debug!("no data in part");
            None
        }
    }
}
