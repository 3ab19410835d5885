// src/models.rs
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::TryOnError;

pub const PNG_MIME: &str = "image/png";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StylePreference {
    #[default]
    Casual,
    Formal,
    #[serde(rename = "Business Casual")]
    BusinessCasual,
    Sporty,
    Elegant,
    Trendy,
    Classic,
}

impl StylePreference {
    pub const ALL: [StylePreference; 7] = [
        StylePreference::Casual,
        StylePreference::Formal,
        StylePreference::BusinessCasual,
        StylePreference::Sporty,
        StylePreference::Elegant,
        StylePreference::Trendy,
        StylePreference::Classic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StylePreference::Casual => "Casual",
            StylePreference::Formal => "Formal",
            StylePreference::BusinessCasual => "Business Casual",
            StylePreference::Sporty => "Sporty",
            StylePreference::Elegant => "Elegant",
            StylePreference::Trendy => "Trendy",
            StylePreference::Classic => "Classic",
        }
    }
}

impl fmt::Display for StylePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StylePreference {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        Self::ALL
            .into_iter()
            .find(|style| style.as_str().to_lowercase() == wanted)
            .ok_or_else(|| TryOnError::Validation(format!("Unknown style preference: {}", s)))
    }
}

/// Payload submitted to the generation service. Built once, never modified.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    image_bytes: Vec<u8>,
    mime_type: String,
    prompt: String,
}

impl GenerationRequest {
    pub fn new(image_bytes: Vec<u8>, mime_type: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_bytes,
            mime_type: mime_type.into(),
            prompt: prompt.into(),
        }
    }

    pub fn png(image_bytes: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self::new(image_bytes, PNG_MIME, prompt)
    }

    pub fn image_bytes(&self) -> &[u8] {
        &self.image_bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn into_image_bytes(self) -> Vec<u8> {
        self.image_bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// What one successful streaming call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    pub text: String,
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub style: StylePreference,
    pub text: String,
    pub images: Vec<GeneratedImage>,
    pub original_png: Vec<u8>,
}

impl GenerationResult {
    pub fn new(style: StylePreference, output: GenerationOutput, original_png: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            style,
            text: output.text,
            images: output.images,
            original_png,
        }
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            id: self.id,
            timestamp: self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            style: self.style,
            image_count: self.images.len(),
            has_text: !self.text.is_empty(),
        }
    }

    /// The extension follows the image's own MIME type so the saved file
    /// matches the bytes served with it.
    pub fn download_filename(&self, index: usize) -> String {
        let extension = self
            .images
            .get(index)
            .map_or("png", |image| file_extension(&image.mime_type));
        format!(
            "virtual_tryon_{}_{}.{}",
            self.timestamp.format("%Y%m%d_%H%M%S"),
            index + 1,
            extension
        )
    }
}

fn file_extension(mime_type: &str) -> &'static str {
    let known = mime_guess::get_mime_extensions_str(mime_type).unwrap_or_default();
    let subtype = mime_type.split('/').nth(1).unwrap_or_default();
    known
        .iter()
        .find(|ext| **ext == subtype)
        .or(known.first())
        .copied()
        .unwrap_or("png")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
    pub supported_methods: Vec<String>,
}

// HTTP response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: Uuid,
    pub timestamp: String,
    pub style: StylePreference,
    pub image_count: usize,
    pub has_text: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    pub index: usize,
    pub mime_type: String,
    pub size: usize,
    pub filename: String,
    pub dimensions: Option<(u32, u32)>,
    pub data_base64: Option<String>,
    pub display_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnResponse {
    pub session_id: Uuid,
    pub result: ResultSummary,
    pub text: String,
    pub images: Vec<ImagePayload>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub total: usize,
    pub entries: Vec<ResultSummary>,
}
