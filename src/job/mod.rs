//! Per-course scrape jobs
//!
//! A [`JobUnit`] binds one course to one credential and carries it through the
//! whole pipeline:
//! 1. Create the course directories
//! 2. Fetch and save the manifest (a failure here fails the job)
//! 3. Discover slide data and script references, falling back to a default list
//! 4. Fetch every asset: scripts raw and beautified, everything else converted
//! 5. Decode the images embedded in slide data
//!
//! Individual asset failures are tolerated and counted. A rate-limit response
//! on any fetch fails the job, as does a local write failure. The pipeline runs
//! under a per-job timeout, and whatever happens the job ends in a
//! [`JobResult`].

mod layout;
mod result;

pub use layout::{write_artifact, CourseLayout, IMAGES_DIR, JSON_DIR};
pub use result::{truncate_detail, ErrorKind, JobResult, JobStatus, MAX_ERROR_DETAIL_CHARS};

use crate::fetch::{ContentFetcher, ConvertedDocument, FetchError, FetchMode, FetchedContent};
use crate::input::{Course, Credential};
use crate::transform::{
    fallback_json_references, flat_script_file_name, is_script_reference, pretty_json,
    safe_file_name, script_file_name, ContentTransformer,
};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// File stem of the saved manifest renders
const MANIFEST_STEM: &str = "imsmanifest";

/// Settings shared by every job of a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub output_root: PathBuf,
    pub job_timeout: Duration,
    /// Assets fetched for every course in addition to the discovered ones
    pub extra_assets: Vec<String>,
    /// Number of `dr/img<N>.json` guesses when the manifest lists none
    pub fallback_json_count: u32,
}

/// Collaborators and settings handed to each job
#[derive(Clone)]
pub struct JobContext {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub transformer: Arc<dyn ContentTransformer>,
    pub settings: Arc<JobSettings>,
}

/// Work done so far, kept when the job fails or times out
#[derive(Debug, Default)]
struct JobProgress {
    artifacts: Vec<PathBuf>,
    failed_assets: usize,
    script_names: HashSet<String>,
}

impl JobProgress {
    /// Claims an output name for a script, falling back to the flattened
    /// reference when another script already took its last path segment
    fn claim_script_name(&mut self, asset: &str) -> String {
        let name = script_file_name(asset);
        if self.script_names.insert(name.clone()) {
            return name;
        }
        let flat = flat_script_file_name(asset);
        self.script_names.insert(flat.clone());
        flat
    }
}

/// One course bound to one credential
pub struct JobUnit {
    course: Course,
    credential: Credential,
    batch_index: usize,
    credential_index: usize,
    context: JobContext,
}

impl JobUnit {
    pub fn new(
        course: Course,
        credential: Credential,
        batch_index: usize,
        credential_index: usize,
        context: JobContext,
    ) -> Self {
        Self {
            course,
            credential,
            batch_index,
            credential_index,
            context,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Runs the job to completion
    ///
    /// Never fails: errors and timeouts are recorded in the returned result.
    pub async fn run(self) -> JobResult {
        let started = Instant::now();
        let timeout = self.context.settings.job_timeout;
        let mut progress = JobProgress::default();

        tracing::info!(
            "[batch {} worker {}] Starting lesson {} ({}) with {}",
            self.batch_index + 1,
            self.credential_index,
            self.course.lesson_id,
            self.course.slug,
            self.credential
        );

        let error = match tokio::time::timeout(timeout, self.execute(&mut progress)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(HarvestError::Timeout {
                lesson_id: self.course.lesson_id.clone(),
                seconds: timeout.as_secs(),
            }),
        };

        let duration = started.elapsed();

        match &error {
            None => tracing::info!(
                "[batch {} worker {}] Finished lesson {} in {:.1}s ({} artifacts, {} failed assets)",
                self.batch_index + 1,
                self.credential_index,
                self.course.lesson_id,
                duration.as_secs_f64(),
                progress.artifacts.len(),
                progress.failed_assets
            ),
            Some(e) => tracing::error!(
                "[batch {} worker {}] Lesson {} failed after {:.1}s: {}",
                self.batch_index + 1,
                self.credential_index,
                self.course.lesson_id,
                duration.as_secs_f64(),
                e
            ),
        }

        JobResult {
            course_id: self.course.course_id.clone(),
            lesson_id: self.course.lesson_id.clone(),
            slug: self.course.slug.clone(),
            status: if error.is_none() {
                JobStatus::Success
            } else {
                JobStatus::Failure
            },
            error_kind: error.as_ref().map(HarvestError::kind),
            error_detail: error.as_ref().map(|e| truncate_detail(&e.to_string())),
            duration,
            batch_index: self.batch_index,
            credential_index: self.credential_index,
            credential_label: self.credential.masked(),
            artifact_paths: progress.artifacts,
            failed_assets: progress.failed_assets,
        }
    }

    async fn execute(&self, progress: &mut JobProgress) -> Result<(), HarvestError> {
        let layout = CourseLayout::new(&self.context.settings.output_root, &self.course.slug);
        layout.create().await?;

        let manifest = self.fetch_converted(&self.course.manifest_url).await?;
        write_document(&layout.root, MANIFEST_STEM, &manifest, progress).await?;
        if let Some(metadata) = &manifest.metadata {
            let rendered =
                serde_json::to_string_pretty(metadata).unwrap_or_else(|_| metadata.to_string());
            let path = layout.root.join(format!("{}.metadata.json", MANIFEST_STEM));
            progress.artifacts.push(write_artifact(path, rendered).await?);
        }

        let assets = self.plan_assets(&manifest.combined_text());
        tracing::debug!("Lesson {}: {} assets to fetch", self.course.lesson_id, assets.len());

        let mut slide_data = Vec::new();
        for asset in &assets {
            let url = match self.course.manifest_url.join(asset) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Lesson {}: bad asset reference {}: {}", self.course.lesson_id, asset, e);
                    progress.failed_assets += 1;
                    continue;
                }
            };

            match self.fetch_asset(asset, &url, &layout, progress).await {
                Ok(Some(text)) => slide_data.push(text),
                Ok(None) => {}
                Err(HarvestError::Fetch(e)) if !e.is_rate_limited() => {
                    tracing::warn!("Lesson {}: skipping {}: {}", self.course.lesson_id, asset, e);
                    progress.failed_assets += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for text in &slide_data {
            for image in self.context.transformer.extract_images(text)? {
                let path = layout.images_dir.join(&image.file_name);
                progress.artifacts.push(write_artifact(path, &image.bytes).await?);
            }
        }

        Ok(())
    }

    /// Ordered, deduplicated list of asset references for a manifest
    fn plan_assets(&self, manifest_text: &str) -> Vec<String> {
        let settings = &self.context.settings;
        let transformer = &self.context.transformer;

        let mut json_refs = transformer.discover_json_files(manifest_text);
        if json_refs.is_empty() {
            tracing::info!(
                "Lesson {}: manifest lists no slide data, trying {} default files",
                self.course.lesson_id,
                settings.fallback_json_count
            );
            json_refs = fallback_json_references(settings.fallback_json_count);
        }
        let script_refs = transformer.discover_script_files(manifest_text);

        let mut seen = HashSet::new();
        json_refs
            .into_iter()
            .chain(script_refs)
            .chain(settings.extra_assets.iter().cloned())
            .filter(|asset| seen.insert(asset.clone()))
            .collect()
    }

    /// Fetches and saves one asset, returning slide data text for image extraction
    async fn fetch_asset(
        &self,
        asset: &str,
        url: &Url,
        layout: &CourseLayout,
        progress: &mut JobProgress,
    ) -> Result<Option<String>, HarvestError> {
        if is_script_reference(asset) {
            let bytes = match self
                .context
                .fetcher
                .fetch(url, &self.credential, FetchMode::Raw)
                .await?
            {
                FetchedContent::Raw(bytes) => bytes,
                FetchedContent::Converted(_) => {
                    return Err(FetchError::UnexpectedContent {
                        url: url.to_string(),
                        expected: FetchMode::Raw,
                    }
                    .into())
                }
            };

            let formatted = self.context.transformer.beautify_javascript(&bytes);
            let path = layout.root.join(progress.claim_script_name(asset));
            progress.artifacts.push(write_artifact(path, formatted).await?);
            return Ok(None);
        }

        let document = self.fetch_converted(url).await?;
        if document.is_empty() {
            return Err(FetchError::Rejected {
                url: url.to_string(),
                message: "empty conversion".to_string(),
            }
            .into());
        }

        let is_json = is_json_reference(asset);
        let dir = if is_json { &layout.json_dir } else { &layout.root };
        let stem = safe_file_name(asset);
        write_document(dir, &stem, &document, progress).await?;

        if !is_json {
            return Ok(None);
        }

        match document.primary_text() {
            Some(text) => {
                let path = dir.join(format!("{}.json", stem));
                progress.artifacts.push(write_artifact(path, pretty_json(text)).await?);
                Ok(Some(text.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn fetch_converted(&self, url: &Url) -> Result<ConvertedDocument, FetchError> {
        match self
            .context
            .fetcher
            .fetch(url, &self.credential, FetchMode::Converted)
            .await?
        {
            FetchedContent::Converted(document) => Ok(document),
            FetchedContent::Raw(_) => Err(FetchError::UnexpectedContent {
                url: url.to_string(),
                expected: FetchMode::Converted,
            }),
        }
    }
}

/// Writes the Markdown and HTML renders that are present
async fn write_document(
    dir: &Path,
    stem: &str,
    document: &ConvertedDocument,
    progress: &mut JobProgress,
) -> Result<(), HarvestError> {
    if let Some(markdown) = &document.markdown {
        let path = dir.join(format!("{}.md", stem));
        progress.artifacts.push(write_artifact(path, markdown).await?);
    }
    if let Some(html) = &document.html {
        let path = dir.join(format!("{}.html", stem));
        progress.artifacts.push(write_artifact(path, html).await?);
    }
    Ok(())
}

fn is_json_reference(asset: &str) -> bool {
    asset
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(asset)
        .to_ascii_lowercase()
        .ends_with(".json")
}
