//! Embedded image extraction
//!
//! Slide data files carry their images as a JavaScript assignment of the form
//! `cp.imagesJSONCache<N>={"<name>":"<base64>", ...};`. Each entry is decoded and
//! kept when it is larger than the configured minimum size.

use crate::transform::{ExtractedImage, TransformError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

/// Image names that carry no data
const PLACEHOLDER_NAME: &str = "___";

fn cache_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)cp\.imagesJSONCache\d+\s*=\s*(\{.*?\});")
            .expect("valid image cache regex")
    })
}

/// Turns an image key into a flat `.png` file name
fn image_file_name(name: &str) -> String {
    let mut file_name = name.trim().replace(['/', '\\'], "_");
    if !file_name.to_ascii_lowercase().ends_with(".png") {
        file_name.push_str(".png");
    }
    file_name
}

/// Extracts the images embedded in a slide data file
///
/// Returns an empty list when the content holds no image cache. Images are
/// returned sorted by file name; entries with empty names or data, entries that
/// fail to decode, and images of `min_bytes` bytes or fewer are skipped.
///
/// # Errors
///
/// Returns `TransformError::ImageCache` when an image cache is present but is
/// not a valid JSON object.
pub fn extract_images(content: &str, min_bytes: usize) -> Result<Vec<ExtractedImage>, TransformError> {
    let Some(captures) = cache_pattern().captures(content) else {
        return Ok(Vec::new());
    };

    let raw = &captures[1];
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| TransformError::ImageCache(format!("invalid image cache JSON: {}", e)))?;

    let mut images = Vec::new();
    for (name, value) in entries {
        let name = name.trim();
        if name.is_empty() || name == PLACEHOLDER_NAME {
            continue;
        }

        let Some(encoded) = value.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            tracing::debug!("Skipping image {}: empty data", name);
            continue;
        };

        // Some caches carry data URIs instead of bare base64
        let encoded = encoded
            .split_once(";base64,")
            .map_or(encoded, |(_, data)| data);
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

        let bytes = match STANDARD.decode(compact.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping image {}: {}", name, e);
                continue;
            }
        };

        if bytes.len() <= min_bytes {
            tracing::debug!("Skipping image {}: too small ({} bytes)", name, bytes.len());
            continue;
        }

        images.push(ExtractedImage {
            file_name: image_file_name(name),
            bytes,
        });
    }

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}
