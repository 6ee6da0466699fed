// Experiment configuration
//
// Every run is driven by one ExperimentConfig. Defaults come from constants.rs,
// a JSON file can override any subset of fields, and CLI flags override both.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{MoodBenchError, Result};

static CATEGORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());

/// One emotion label. Used as a directory name, so it is validated up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn parse(name: &str) -> Result<Self> {
        if !CATEGORY_NAME.is_match(name) {
            return Err(MoodBenchError::InvalidCategory(name.to_string()));
        }
        Ok(Category(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = MoodBenchError;

    fn try_from(value: String) -> Result<Self> {
        Category::parse(&value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

/// Which fields an annotation record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationVariant {
    /// height, weight, brightness
    Basic,
    /// basic plus contrast and saturation
    Extended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub categories: Vec<Category>,
    pub images_per_category: usize,
    pub parallelism_levels: Vec<usize>,
    /// CSV results file
    pub output_path: PathBuf,
    /// Optional JSON report with per-category detail
    pub report_path: Option<PathBuf>,
    /// Directory holding content/, annotation/ and bad_links
    pub storage_root: PathBuf,
    pub search_url_template: String,
    pub image_host_prefix: String,
    pub content_class_marker: String,
    pub scroll_pause_ms: u64,
    pub max_scroll_cycles: usize,
    pub fetch_timeout_secs: u64,
    pub min_image_side: u32,
    pub max_image_side: u32,
    pub reset_between_runs: bool,
    pub annotation_variant: AnnotationVariant,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| Category(name.to_string()))
                .collect(),
            images_per_category: DEFAULT_IMAGES_PER_CATEGORY,
            parallelism_levels: DEFAULT_PARALLELISM_LEVELS.to_vec(),
            output_path: PathBuf::from(PERFORMANCE_LOG),
            report_path: None,
            storage_root: PathBuf::from("."),
            search_url_template: SEARCH_URL_TEMPLATE.to_string(),
            image_host_prefix: IMAGE_HOST_PREFIX.to_string(),
            content_class_marker: CONTENT_CLASS_MARKER.to_string(),
            scroll_pause_ms: SCROLL_PAUSE_MS,
            max_scroll_cycles: MAX_SCROLL_CYCLES,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            min_image_side: MIN_IMAGE_SIDE,
            max_image_side: MAX_IMAGE_SIDE,
            reset_between_runs: true,
            annotation_variant: AnnotationVariant::Extended,
        }
    }
}

impl ExperimentConfig {
    /// Load a config file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ExperimentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(MoodBenchError::InvalidConfig("no categories configured".to_string()));
        }
        if self.images_per_category == 0 {
            return Err(MoodBenchError::InvalidConfig("images_per_category must be > 0".to_string()));
        }
        if self.parallelism_levels.is_empty() {
            return Err(MoodBenchError::InvalidConfig("no parallelism levels configured".to_string()));
        }
        if self.parallelism_levels.contains(&0) {
            return Err(MoodBenchError::InvalidConfig("parallelism levels must be > 0".to_string()));
        }
        if self.max_scroll_cycles == 0 {
            return Err(MoodBenchError::InvalidConfig("max_scroll_cycles must be > 0".to_string()));
        }
        if self.min_image_side > self.max_image_side {
            return Err(MoodBenchError::InvalidConfig(format!(
                "min_image_side {} exceeds max_image_side {}",
                self.min_image_side, self.max_image_side
            )));
        }
        if !self.search_url_template.contains(CATEGORY_PLACEHOLDER) {
            return Err(MoodBenchError::InvalidConfig(format!(
                "search_url_template must contain {}",
                CATEGORY_PLACEHOLDER
            )));
        }
        Ok(())
    }

    /// Length of one harvest pause, i.e. one wait unit.
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn size_window(&self) -> SizeWindow {
        SizeWindow {
            min: self.min_image_side,
            max: self.max_image_side,
        }
    }
}

/// Inclusive bounds on both image sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeWindow {
    pub min: u32,
    pub max: u32,
}

impl SizeWindow {
    pub fn contains(&self, width: u32, height: u32) -> bool {
        (self.min..=self.max).contains(&width) && (self.min..=self.max).contains(&height)
    }
}

/// Parse a comma separated category list (CLI helper).
pub fn parse_categories(list: &str) -> Result<Vec<Category>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Category::parse)
        .collect()
}
