//! File naming and text rendering helpers for course artifacts

/// Flattens an asset reference into a file name without extension
///
/// `dr/img1.json` becomes `dr_img1`; query strings and fragments are dropped.
pub fn safe_file_name(reference: &str) -> String {
    let path = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(reference)
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/');

    let flat = path.replace(['/', '\\'], "_");
    let stem = match flat.rfind('.') {
        Some(dot) if dot > 0 => &flat[..dot],
        _ => flat.as_str(),
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "asset".to_string()
    } else {
        cleaned
    }
}

/// The last path segment of a reference, used to name downloaded scripts
pub fn script_file_name(reference: &str) -> String {
    let path = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(reference);

    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("script.js")
        .to_string()
}

/// The whole reference flattened into one file name, keeping its extension
///
/// Used when two scripts share a last path segment: `b/util.js` becomes
/// `b_util.js`.
pub fn flat_script_file_name(reference: &str) -> String {
    let base = script_file_name(reference);
    let extension = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[dot..],
        _ => "",
    };
    format!("{}{}", safe_file_name(reference), extension)
}

/// Pretty-prints JSON text with two-space indentation
///
/// Text that is not valid JSON is returned unchanged.
pub fn pretty_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text.trim())
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| text.to_string())
}
