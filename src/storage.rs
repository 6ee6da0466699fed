// On-disk layout for images, annotations and diagnostics
//
//   <root>/content/<category>/<category>_00000.jpg
//   <root>/annotation/<category>/<category>_00000.json
//   <root>/bad_links

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Category;
use crate::constants::{
    ANNOTATION_EXTENSION, ANNOTATION_FOLDER, BAD_LINKS_FILENAME, CONTENT_FOLDER, IMAGE_EXTENSION,
    INDEX_WIDTH, TEMP_FILE_PREFIX,
};
use crate::error::{MoodBenchError, Result};

#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_root(&self) -> PathBuf {
        self.root.join(CONTENT_FOLDER)
    }

    pub fn annotation_root(&self) -> PathBuf {
        self.root.join(ANNOTATION_FOLDER)
    }

    pub fn content_dir(&self, category: &Category) -> PathBuf {
        self.content_root().join(category.as_str())
    }

    pub fn annotation_dir(&self, category: &Category) -> PathBuf {
        self.annotation_root().join(category.as_str())
    }

    pub fn bad_links_path(&self) -> PathBuf {
        self.root.join(BAD_LINKS_FILENAME)
    }

    /// Path of the stored image with the given sequence index.
    pub fn image_path(&self, category: &Category, index: usize) -> PathBuf {
        self.content_dir(category).join(format!(
            "{}.{}",
            stem_for(category, index),
            IMAGE_EXTENSION
        ))
    }

    /// Mirror a stored image path into the annotation tree.
    ///
    /// The category is the image's parent directory name; the file keeps its
    /// stem and takes the annotation extension.
    pub fn annotation_path_for(&self, image_path: &Path) -> Result<PathBuf> {
        let category = image_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .ok_or_else(|| MoodBenchError::InvalidPath(image_path.display().to_string()))?;
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| MoodBenchError::InvalidPath(image_path.display().to_string()))?;

        Ok(self
            .annotation_root()
            .join(category)
            .join(format!("{}.{}", stem, ANNOTATION_EXTENSION)))
    }

    /// Create content/ and annotation/ directories for every category.
    pub fn ensure_category_dirs(&self, categories: &[Category]) -> Result<()> {
        for category in categories {
            fs::create_dir_all(self.content_dir(category))?;
            fs::create_dir_all(self.annotation_dir(category))?;
        }
        Ok(())
    }

    /// Remove every stored image and annotation from a previous run.
    pub fn reset(&self) -> Result<()> {
        for dir in [self.content_root(), self.annotation_root()] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// List stored images for the given categories, sorted by path.
    ///
    /// Temp files left by an interrupted write are ignored.
    pub fn list_stored_images(&self, categories: &[Category]) -> Result<Vec<PathBuf>> {
        let mut images = Vec::new();

        for category in categories {
            let dir = self.content_dir(category);
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| MoodBenchError::Io(e.into()))?;
                let path = entry.path();
                if path.is_file() && is_stored_image(path) {
                    images.push(path.to_path_buf());
                }
            }
        }

        images.sort();
        Ok(images)
    }
}

/// `{category}_{index:05}`
pub fn stem_for(category: &Category, index: usize) -> String {
    format!("{}_{:0width$}", category, index, width = INDEX_WIDTH)
}

fn is_stored_image(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    if name.starts_with(TEMP_FILE_PREFIX) {
        return false;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(IMAGE_EXTENSION))
        .unwrap_or(false)
}
