// src/services/gemini/mod.rs
mod sse;
mod wire;

use crate::config::{Config, bare_model_name};
use crate::errors::TryOnError;
use crate::models::{GenerationRequest, ModelInfo};
use crate::services::generation_client::{ChunkStream, GenerationBackend, StreamChunk};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use log::{info, trace};
use reqwest::Client;
use std::collections::VecDeque;
use std::fmt;

use sse::SseDecoder;
use wire::*;

pub const TEMPERATURE: f32 = 0.7;
const GENERATE_METHOD: &str = "generateContent";

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: bare_model_name(&config.model).to_string(),
            api_base: config.api_base.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, TryOnError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent",
            self.api_base, self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| TryOnError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TryOnError::Upstream(format!(
                "Gemini error {}: {}",
                status, error_text
            )));
        }

        Ok(sse_chunks(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, TryOnError> {
        let url = format!("{}/models", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key);
            if let Some(token) = &page_token {
                call = call.query(&[("pageToken", token)]);
            }

            let response = call
                .send()
                .await
                .map_err(|e| TryOnError::Upstream(format!("Model listing failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(TryOnError::Upstream(format!(
                    "Gemini error {}: {}",
                    status, error_text
                )));
            }

            let page: ListModelsResponse = response.json().await.map_err(|e| {
                TryOnError::Serialization(format!("Failed to parse model listing: {}", e))
            })?;

            models.extend(generation_models(page.models));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Found {} models supporting {}", models.len(), GENERATE_METHOD);
        Ok(models)
    }
}

fn request_body(request: &GenerationRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user".to_string(),
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: request.mime_type().to_string(),
                        data: general_purpose::STANDARD.encode(request.image_bytes()),
                    },
                },
                RequestPart::Text {
                    text: request.prompt().to_string(),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            temperature: TEMPERATURE,
        },
    }
}

fn generation_models(entries: Vec<ModelEntry>) -> impl Iterator<Item = ModelInfo> {
    entries
        .into_iter()
        .filter(|m| m.supported_generation_methods.iter().any(|s| s == GENERATE_METHOD))
        .map(|m| ModelInfo {
            name: m.name,
            display_name: m.display_name,
            supported_methods: m.supported_generation_methods,
        })
}

/// Turns a raw SSE body into decoded generation chunks.
pub fn sse_chunks<S, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    struct State<S> {
        body: std::pin::Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        finished: bool,
    }

    let state = State {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((parse_chunk(&payload), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.push(&bytes);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let err = TryOnError::Upstream(format!("Gemini stream interrupted: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    let rest = state.decoder.finish();
                    state.pending.extend(rest);
                }
            }
        }
    })
    .boxed()
}

pub fn parse_chunk(payload: &str) -> Result<StreamChunk, TryOnError> {
    let chunk: GenerateContentChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            trace!("Unparsable stream chunk: {}", e);
            return Ok(StreamChunk::Malformed);
        }
    };

    if let Some(api_error) = chunk.error {
        return Err(TryOnError::Upstream(format!(
            "Gemini error {} {}: {}",
            api_error.code.map(|c| c.to_string()).unwrap_or_default(),
            api_error.status.unwrap_or_default(),
            api_error.message.unwrap_or_default()
        )));
    }

    let parts = chunk
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .filter(|parts| !parts.is_empty());
    let Some(mut parts) = parts else {
        return Ok(StreamChunk::Malformed);
    };

    if let Some(inline) = parts[0].inline_data.take().filter(|d| !d.data.is_empty()) {
        let data = general_purpose::STANDARD.decode(&inline.data).map_err(|e| {
            TryOnError::Upstream(format!("Gemini sent undecodable image data: {}", e))
        })?;
        return Ok(StreamChunk::Image {
            data,
            mime_type: inline.mime_type,
        });
    }

    let text: String = parts
        .iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text.as_deref())
        .collect();
    Ok(StreamChunk::Text(text))
}
