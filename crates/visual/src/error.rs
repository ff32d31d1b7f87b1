//! Error types for visual layout testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisualError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Failed to capture {url}: {reason}")]
    Capture { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Some visual mistakes! Found {found} mistaken blocks")]
    VisualMistakes { found: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type VisualResult<T> = Result<T, VisualError>;
