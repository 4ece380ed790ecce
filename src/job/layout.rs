use std::io;
use std::path::{Path, PathBuf};

/// Subdirectory for slide data files
pub const JSON_DIR: &str = "JSON";

/// Subdirectory for decoded images
pub const IMAGES_DIR: &str = "extracted_images";

/// Output directories of one course
///
/// Every job owns its layout exclusively; slugs are unique within a run.
#[derive(Debug, Clone)]
pub struct CourseLayout {
    pub root: PathBuf,
    pub json_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl CourseLayout {
    pub fn new(output_root: &Path, slug: &str) -> Self {
        let root = output_root.join(slug);
        Self {
            json_dir: root.join(JSON_DIR),
            images_dir: root.join(IMAGES_DIR),
            root,
        }
    }

    /// Creates all directories of the layout
    pub async fn create(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.json_dir).await?;
        tokio::fs::create_dir_all(&self.images_dir).await?;
        Ok(())
    }
}

/// Writes a file and returns its path
pub async fn write_artifact(path: PathBuf, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}
