// src/services/mod.rs
pub mod gemini;
pub mod generation_client;
pub mod image_processor;
pub mod prompt_builder;
pub mod session_store;

#[cfg(test)]
pub mod testing;

pub use gemini::GeminiBackend;
pub use generation_client::{GenerationClient, RetryPolicy};
pub use image_processor::ImageProcessor;
pub use session_store::SessionRegistry;
