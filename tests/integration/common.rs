//! Shared fixtures

use async_trait::async_trait;
use course_harvest::fetch::{ContentFetcher, ConvertedDocument, FetchError, FetchMode, FetchedContent};
use course_harvest::input::{Course, Credential, CredentialPool};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// Manifest listing one slide data file
pub const SIMPLE_MANIFEST: &str = r#"<manifest><file href="dr/img1.json"/></manifest>"#;

/// One recorded fetch
#[derive(Debug, Clone)]
pub struct FetchCall {
    pub url: Url,
    pub token: String,
    pub mode: FetchMode,
    pub started: Instant,
    pub finished: Instant,
}

impl FetchCall {
    /// The course slug of the fetched URL (the segment after `/lessons/`)
    pub fn slug(&self) -> String {
        let segments: Vec<&str> = self.url.path_segments().map(|s| s.collect()).unwrap_or_default();
        segments
            .iter()
            .position(|s| *s == "lessons")
            .and_then(|i| segments.get(i + 1))
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

/// In-process fetcher serving canned responses by path suffix
pub struct MockFetcher {
    manifest: String,
    converted: HashMap<String, ConvertedDocument>,
    raw: HashMap<String, Vec<u8>>,
    failing_slugs: HashSet<String>,
    rate_limited_slugs: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    pub fn new(manifest: &str) -> Self {
        Self {
            manifest: manifest.to_string(),
            converted: HashMap::new(),
            raw: HashMap::new(),
            failing_slugs: HashSet::new(),
            rate_limited_slugs: HashSet::new(),
            delay: Duration::from_millis(5),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_markdown(mut self, suffix: &str, markdown: &str) -> Self {
        self.converted.insert(
            suffix.to_string(),
            ConvertedDocument {
                markdown: Some(markdown.to_string()),
                html: Some(format!("<pre>{}</pre>", markdown)),
                metadata: None,
            },
        );
        self
    }

    pub fn with_raw(mut self, suffix: &str, bytes: &[u8]) -> Self {
        self.raw.insert(suffix.to_string(), bytes.to_vec());
        self
    }

    /// Manifest fetches for this slug fail with HTTP 500
    pub fn failing(mut self, slug: &str) -> Self {
        self.failing_slugs.insert(slug.to_string());
        self
    }

    /// Manifest fetches for this slug are rate limited
    pub fn rate_limited(mut self, slug: &str) -> Self {
        self.rate_limited_slugs.insert(slug.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, url: &Url, mode: FetchMode) -> Result<FetchedContent, FetchError> {
        let path = url.path();
        let slug = path.split('/').rev().nth(1).unwrap_or_default();

        if path.ends_with("imsmanifest.xml") {
            if self.rate_limited_slugs.contains(slug) {
                return Err(FetchError::RateLimited {
                    url: url.to_string(),
                    retry_after_secs: Some(60),
                });
            }
            if self.failing_slugs.contains(slug) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status_code: 500,
                });
            }
            return Ok(FetchedContent::Converted(ConvertedDocument {
                markdown: Some(self.manifest.clone()),
                html: None,
                metadata: None,
            }));
        }

        let found = match mode {
            FetchMode::Converted => self
                .converted
                .iter()
                .find(|(suffix, _)| path.ends_with(suffix.as_str()))
                .map(|(_, doc)| FetchedContent::Converted(doc.clone())),
            FetchMode::Raw => self
                .raw
                .iter()
                .find(|(suffix, _)| path.ends_with(suffix.as_str()))
                .map(|(_, bytes)| FetchedContent::Raw(bytes.clone())),
        };

        found.ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status_code: 404,
        })
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &Url,
        credential: &Credential,
        mode: FetchMode,
    ) -> Result<FetchedContent, FetchError> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        let response = self.respond(url, mode);

        self.calls.lock().unwrap().push(FetchCall {
            url: url.clone(),
            token: credential.expose().to_string(),
            mode,
            started,
            finished: Instant::now(),
        });

        response
    }
}

/// Courses `L1..=Ln` with manifests under `/lessons/MOD-<i>/`
pub fn courses(count: usize) -> Vec<Course> {
    (1..=count)
        .map(|i| {
            let url = Url::parse(&format!(
                "https://cdn.example.com/lessons/MOD-{}/imsmanifest.xml",
                i
            ))
            .unwrap();
            Course::new("C1", "Safety", format!("L{}", i), format!("Lesson {}", i), url)
        })
        .collect()
}

/// A pool of `size` distinct tokens
pub fn pool(size: usize) -> CredentialPool {
    CredentialPool::new((0..size).map(|i| format!("fc-{}-{}", i, "k".repeat(24)))).unwrap()
}
