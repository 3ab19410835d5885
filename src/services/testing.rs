// src/services/testing.rs
// Scripted backend used by unit and handler tests.
use crate::errors::TryOnError;
use crate::models::{GenerationRequest, ModelInfo};
use crate::services::generation_client::{ChunkStream, GenerationBackend, StreamChunk};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

pub enum Attempt {
    Fail(TryOnError),
    Stream(Vec<Result<StreamChunk, TryOnError>>),
}

impl Attempt {
    pub fn chunks(chunks: Vec<StreamChunk>) -> Self {
        Attempt::Stream(chunks.into_iter().map(Ok).collect())
    }
}

pub struct ScriptedBackend {
    script: Mutex<VecDeque<Attempt>>,
    call_times: Mutex<Vec<Instant>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            call_times: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_times.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn stream_generate(&self, request: &GenerationRequest) -> Result<ChunkStream, TryOnError> {
        self.call_times.lock().unwrap().push(Instant::now());
        self.prompts.lock().unwrap().push(request.prompt().to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Attempt::Fail(err)) => Err(err),
            Some(Attempt::Stream(items)) => Ok(stream::iter(items).boxed()),
            None => Err(TryOnError::Upstream("script exhausted".to_string())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, TryOnError> {
        Ok(vec![ModelInfo {
            name: "models/scripted".to_string(),
            display_name: "Scripted".to_string(),
            supported_methods: vec!["generateContent".to_string()],
        }])
    }
}
