//! Asset discovery in course manifests
//!
//! The manifest (as rendered by the conversion API) is searched for two kinds of
//! references: slide data files under `dr/` and JavaScript files. References are
//! deduplicated and returned sorted so discovery is deterministic.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn json_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)dr/img\w*\.json").expect("valid JSON reference regex"))
}

fn script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)[A-Za-z0-9_][A-Za-z0-9_./:-]*\.js\b"#).expect("valid script reference regex")
    })
}

/// Finds `dr/img*.json` references in manifest text
///
/// # Examples
///
/// ```
/// use course_harvest::transform::find_json_references;
///
/// let refs = find_json_references("<file href=\"dr/img2.json\"/> dr/img1.json dr/img2.json");
/// assert_eq!(refs, vec!["dr/img1.json", "dr/img2.json"]);
/// ```
pub fn find_json_references(manifest: &str) -> Vec<String> {
    json_pattern()
        .find_iter(manifest)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Finds JavaScript references in manifest text
///
/// Both `href`/`src` attributes of the markup and bare paths in the text
/// content are considered.
pub fn find_script_references(manifest: &str) -> Vec<String> {
    let mut found: BTreeSet<String> = BTreeSet::new();

    let document = Html::parse_document(manifest);
    if let Ok(selector) = Selector::parse("[href], [src]") {
        for element in document.select(&selector) {
            for attr in ["href", "src"] {
                if let Some(value) = element.value().attr(attr) {
                    let value = value.trim();
                    if is_script_reference(value) {
                        found.insert(value.to_string());
                    }
                }
            }
        }
    }

    // Attribute values are not part of the text nodes, so nothing is seen twice
    let text: String = document.root_element().text().collect();
    for m in script_pattern().find_iter(&text) {
        if is_script_reference(m.as_str()) {
            found.insert(m.as_str().to_string());
        }
    }

    found.into_iter().collect()
}

/// Returns true if the reference points at a JavaScript file
pub fn is_script_reference(reference: &str) -> bool {
    let path = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(reference);
    path.to_ascii_lowercase().ends_with(".js")
}

/// Default list used when a manifest lists no JSON files
///
/// `dr/img1.json` through `dr/img{count}.json`, then the metadata files.
pub fn fallback_json_references(count: u32) -> Vec<String> {
    let mut refs: Vec<String> = (1..=count).map(|i| format!("dr/img{}.json", i)).collect();
    refs.push("dr/imgmd.json".to_string());
    refs.push("dr/metadata.json".to_string());
    refs
}
