//! Course list loading
//!
//! The course list is a CSV export with one lesson per row. Each row becomes an
//! immutable [`Course`] with a slug that names its output directory.

use crate::ConfigError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use url::Url;

/// Manifest file name that terminates every course URL
const MANIFEST_FILE: &str = "imsmanifest.xml";

/// Slug used when a URL has no usable path segment
const FALLBACK_SLUG: &str = "course_content";

/// One row of the course list CSV
#[derive(Debug, Deserialize)]
struct CourseRow {
    #[serde(rename = "courseid", default)]
    course_id: String,
    #[serde(rename = "coursename", default)]
    course_name: String,
    #[serde(rename = "lessonID")]
    lesson_id: String,
    #[serde(rename = "lessonname", default)]
    lesson_name: String,
    #[serde(rename = "link")]
    manifest_url: String,
}

/// A course lesson to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub lesson_id: String,
    pub lesson_name: String,
    pub manifest_url: Url,
    /// Output directory name, unique within a course list
    pub slug: String,
}

impl Course {
    /// Creates a course, deriving its slug from the manifest URL
    pub fn new(
        course_id: impl Into<String>,
        course_name: impl Into<String>,
        lesson_id: impl Into<String>,
        lesson_name: impl Into<String>,
        manifest_url: Url,
    ) -> Self {
        let slug = course_slug(&manifest_url);
        Self {
            course_id: course_id.into(),
            course_name: course_name.into(),
            lesson_id: lesson_id.into(),
            lesson_name: lesson_name.into(),
            manifest_url,
            slug,
        }
    }
}

/// Derives the output directory name from a manifest URL
///
/// Uses the path segment right before `imsmanifest.xml`, falling back to the
/// second-to-last segment and finally to a fixed name.
///
/// # Examples
///
/// ```
/// use course_harvest::input::course_slug;
/// use url::Url;
///
/// let url = Url::parse("https://cdn.example.com/lessons/MOD-1042/imsmanifest.xml").unwrap();
/// assert_eq!(course_slug(&url), "MOD-1042");
/// ```
pub fn course_slug(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let candidate = match segments.iter().position(|seg| *seg == MANIFEST_FILE) {
        Some(pos) if pos > 0 => Some(segments[pos - 1]),
        _ if segments.len() >= 2 => Some(segments[segments.len() - 2]),
        _ => None,
    };

    candidate
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Parses a course list from CSV data
///
/// Rows are returned in file order. Slugs that collide with an earlier row get
/// the lesson id appended so no two jobs ever share an output directory.
pub fn parse_courses<R: Read>(reader: R) -> Result<Vec<Course>, ConfigError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut courses = Vec::new();
    for (index, row) in csv_reader.deserialize::<CourseRow>().enumerate() {
        // Header is row 1
        let row_number = index + 2;
        let row = row?;

        if row.lesson_id.is_empty() {
            return Err(ConfigError::MalformedCourse {
                row: row_number,
                message: "missing lessonID".to_string(),
            });
        }

        let manifest_url =
            Url::parse(&row.manifest_url).map_err(|e| ConfigError::MalformedCourse {
                row: row_number,
                message: format!("invalid link '{}': {}", row.manifest_url, e),
            })?;

        courses.push(Course::new(
            row.course_id,
            row.course_name,
            row.lesson_id,
            row.lesson_name,
            manifest_url,
        ));
    }

    assign_unique_slugs(&mut courses);
    Ok(courses)
}

/// Loads a course list CSV from disk
pub fn load_courses(path: &Path) -> Result<Vec<Course>, ConfigError> {
    let file = std::fs::File::open(path)?;
    parse_courses(file)
}

fn assign_unique_slugs(courses: &mut [Course]) {
    let mut taken: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();

    for course in courses.iter_mut() {
        if taken.insert(course.slug.clone()) {
            continue;
        }

        let mut candidate = format!("{}_{}", course.slug, sanitize_segment(&course.lesson_id));
        while !taken.insert(candidate.clone()) {
            let counter = repeats.entry(candidate.clone()).or_insert(1);
            *counter += 1;
            candidate = format!("{}_{}", candidate, counter);
        }

        tracing::debug!(
            "Slug '{}' already used; lesson {} writes to '{}'",
            course.slug,
            course.lesson_id,
            candidate
        );
        course.slug = candidate;
    }
}

/// Parses a lesson filter: one lesson id per line, blanks and `#` comments skipped
pub fn parse_lesson_filter(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Loads a lesson filter file from disk
pub fn load_lesson_filter(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_lesson_filter(&content))
}

/// Keeps only the courses whose lesson id is in `lesson_ids`
///
/// Course list order is preserved. Returns the kept courses and the lesson ids
/// that matched no course.
pub fn apply_lesson_filter(
    courses: Vec<Course>,
    lesson_ids: &[String],
) -> (Vec<Course>, Vec<String>) {
    let wanted: HashSet<&str> = lesson_ids.iter().map(String::as_str).collect();

    let kept: Vec<Course> = courses
        .into_iter()
        .filter(|course| wanted.contains(course.lesson_id.as_str()))
        .collect();

    let found: HashSet<&str> = kept.iter().map(|c| c.lesson_id.as_str()).collect();
    let missing = lesson_ids
        .iter()
        .filter(|id| !found.contains(id.as_str()))
        .cloned()
        .collect();

    (kept, missing)
}

/// Truncates the course list to its first `limit` entries
pub fn apply_limit(mut courses: Vec<Course>, limit: Option<usize>) -> Vec<Course> {
    if let Some(limit) = limit {
        courses.truncate(limit);
    }
    courses
}
