//! Content transformations
//!
//! Stateless helpers that turn fetched course files into output artifacts:
//! - asset discovery in the manifest
//! - JavaScript pretty-printing
//! - embedded image extraction from slide data
//!
//! Jobs use them through the [`ContentTransformer`] trait so another
//! implementation can be swapped in.

mod beautify;
mod discover;
mod images;
mod render;

pub use beautify::beautify;
pub use discover::{
    fallback_json_references, find_json_references, find_script_references, is_script_reference,
};
pub use images::extract_images;
pub use render::{flat_script_file_name, pretty_json, safe_file_name, script_file_name};

use thiserror::Error;

/// Default minimum decoded size for an image to be kept
pub const DEFAULT_MIN_IMAGE_BYTES: usize = 100;

/// Errors raised by content transformations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("JavaScript formatting failed: {0}")]
    Beautify(String),

    #[error("Image cache is malformed: {0}")]
    ImageCache(String),
}

/// An image decoded from a slide data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Transformations applied to fetched course content
pub trait ContentTransformer: Send + Sync {
    /// Slide data files referenced by the manifest
    fn discover_json_files(&self, manifest: &str) -> Vec<String>;

    /// JavaScript files referenced by the manifest
    fn discover_script_files(&self, manifest: &str) -> Vec<String>;

    /// Formats a script; returns the input text if it cannot be formatted
    fn beautify_javascript(&self, source: &[u8]) -> String;

    /// Decodes the images embedded in a slide data file
    fn extract_images(&self, json: &str) -> Result<Vec<ExtractedImage>, TransformError>;
}

/// The stock transformer
#[derive(Debug, Clone)]
pub struct DefaultTransformer {
    min_image_bytes: usize,
}

impl DefaultTransformer {
    pub fn new(min_image_bytes: usize) -> Self {
        Self { min_image_bytes }
    }
}

impl Default for DefaultTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_IMAGE_BYTES)
    }
}

impl ContentTransformer for DefaultTransformer {
    fn discover_json_files(&self, manifest: &str) -> Vec<String> {
        find_json_references(manifest)
    }

    fn discover_script_files(&self, manifest: &str) -> Vec<String> {
        find_script_references(manifest)
    }

    fn beautify_javascript(&self, source: &[u8]) -> String {
        let text = String::from_utf8_lossy(source);
        match beautify(&text) {
            Ok(pretty) => pretty,
            Err(e) => {
                tracing::warn!("Keeping script unformatted: {}", e);
                text.into_owned()
            }
        }
    }

    fn extract_images(&self, json: &str) -> Result<Vec<ExtractedImage>, TransformError> {
        extract_images(json, self.min_image_bytes)
    }
}
