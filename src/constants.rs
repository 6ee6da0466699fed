// Moodbench Constants
// Defaults for ExperimentConfig. The folder and file names are part of the
// on-disk layout and must stay stable for existing datasets.

// Categories (emotion labels)
pub const DEFAULT_CATEGORIES: [&str; 6] = ["happiness", "sadness", "disgust", "fear", "surprise", "anger"];
pub const DEFAULT_IMAGES_PER_CATEGORY: usize = 10;
pub const DEFAULT_PARALLELISM_LEVELS: [usize; 2] = [6, 9];

// Search page
pub const SEARCH_URL_TEMPLATE: &str = "https://www.pinterest.com/search/pins/?q={category}_vibe";
pub const CATEGORY_PLACEHOLDER: &str = "{category}";
pub const IMAGE_HOST_PREFIX: &str = "https://i.pinimg.com";
pub const CONTENT_CLASS_MARKER: &str = "hCL kVc L4E MIw";

// Harvest loop
pub const SCROLL_PAUSE_MS: u64 = 5000;
pub const MAX_SCROLL_CYCLES: usize = 200;
pub const IMAGE_TAG: &str = "img";
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";
pub const PAGE_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

// Fetch
pub const FETCH_TIMEOUT_SECS: u64 = 20;
/// Largest response body read for one image
pub const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;
pub const MIN_IMAGE_SIDE: u32 = 144;
pub const MAX_IMAGE_SIDE: u32 = 1440;

// Browser launch flags
pub const BROWSER_ARGS: [&str; 1] = ["--disable-dev-shm-usage"];

// Paths
pub const CONTENT_FOLDER: &str = "content";
pub const ANNOTATION_FOLDER: &str = "annotation";
pub const BAD_LINKS_FILENAME: &str = "bad_links";
pub const IMAGE_EXTENSION: &str = "jpg";
pub const ANNOTATION_EXTENSION: &str = "json";
pub const TEMP_FILE_PREFIX: &str = ".tmp_";
pub const INDEX_WIDTH: usize = 5;

// Results
pub const PERFORMANCE_LOG: &str = "performance_log.csv";
pub const RESULTS_HEADER: [&str; 2] = ["Process_Count", "Duration_sec"];

// Annotation values are rounded to this many decimals
pub const STAT_DECIMALS: i32 = 2;
