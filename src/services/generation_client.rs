// src/services/generation_client.rs
use crate::errors::TryOnError;
use crate::models::{GeneratedImage, GenerationOutput, GenerationRequest, ModelInfo};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use log::{error, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;

/// One decoded unit of a streamed generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Image { data: Vec<u8>, mime_type: String },
    Text(String),
    /// Chunk without the candidate/content/parts structure.
    Malformed,
}

pub type ChunkStream = BoxStream<'static, Result<StreamChunk, TryOnError>>;

/// Remote multimodal model that streams image and text chunks back.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, TryOnError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, TryOnError>;
}

// Matched case-insensitively against the error message. This is only as
// reliable as the upstream wording.
const THROTTLING_MARKERS: [&str; 4] = ["rate limit", "429", "quota", "resource exhausted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Throttling,
    Transient,
}

impl FailureKind {
    pub fn classify(err: &TryOnError) -> Self {
        let message = err.to_string().to_lowercase();
        if THROTTLING_MARKERS.iter().any(|m| message.contains(m)) {
            FailureKind::Throttling
        } else {
            FailureKind::Transient
        }
    }
}

#[derive(Debug)]
pub enum RetryDecision {
    Retry { kind: FailureKind, delay: Duration },
    Fail(TryOnError),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    throttle_step: Duration,
    transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts, at least one.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries: max_retries.max(1),
            throttle_step: Duration::from_secs(5),
            transient_delay: Duration::from_secs(2),
        }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// `attempt` is zero-based.
    pub fn decide(&self, attempt: usize, err: TryOnError) -> RetryDecision {
        let kind = FailureKind::classify(&err);
        let attempts_remain = attempt + 1 < self.max_retries;

        match (kind, attempts_remain) {
            (FailureKind::Throttling, true) => RetryDecision::Retry {
                kind,
                delay: self.throttle_step * (attempt as u32 + 1),
            },
            (FailureKind::Throttling, false) => RetryDecision::Fail(TryOnError::RateLimitExceeded {
                cause: err.to_string(),
            }),
            (FailureKind::Transient, true) => RetryDecision::Retry {
                kind,
                delay: self.transient_delay,
            },
            (FailureKind::Transient, false) => RetryDecision::Fail(err),
        }
    }
}

pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, TryOnError> {
        self.backend.list_models().await
    }

    /// Runs the streaming call, restarting it from scratch on failure
    /// according to the retry policy.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, TryOnError> {
        let max_retries = self.policy.max_retries();

        for attempt in 0..max_retries {
            info!(
                "Generating virtual try-on image (attempt {}/{})",
                attempt + 1,
                max_retries
            );

            let err = match self.run_attempt(request).await {
                Ok(output) => {
                    info!(
                        "Generation finished: {} image(s), {} chars of text",
                        output.images.len(),
                        output.text.len()
                    );
                    return Ok(output);
                }
                Err(err) => err,
            };

            match self.policy.decide(attempt, err) {
                RetryDecision::Retry { kind, delay } => {
                    warn!(
                        "{:?} failure on attempt {}/{}, retrying in {}s",
                        kind,
                        attempt + 1,
                        max_retries,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Fail(err) => {
                    error!("Generation failed after {} attempt(s): {}", attempt + 1, err);
                    return Err(err);
                }
            }
        }

        unreachable!("generation retry loop should always return a result or an error")
    }

    async fn run_attempt(&self, request: &GenerationRequest) -> Result<GenerationOutput, TryOnError> {
        let mut stream = self.backend.stream_generate(request).await?;
        let mut output = GenerationOutput::default();

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Image { data, mime_type } => {
                    info!("Received image data: {} bytes, mime: {}", data.len(), mime_type);
                    output.images.push(GeneratedImage { data, mime_type });
                }
                StreamChunk::Text(text) => output.text.push_str(&text),
                StreamChunk::Malformed => trace!("Skipping chunk without candidate content"),
            }
        }

        Ok(output)
    }
}
