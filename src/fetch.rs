// Image fetch-and-filter
//
// Downloads one candidate URL, checks that it decodes and fits the size
// window, and stores it as RGB JPEG under the caller-supplied index. Nothing
// here raises to the worker: every failure becomes a Rejected outcome and a
// bad_links record.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;

use crate::config::{Category, SizeWindow};
use crate::constants::{MAX_IMAGE_BYTES, TEMP_FILE_PREFIX};
use crate::diagnostics::BadLinkLog;
use crate::error::{MoodBenchError, Result};
use crate::storage::StorageLayout;

/// HTTP collaborator: one blocking GET returning the body.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::from_builder(reqwest::blocking::Client::builder().timeout(timeout))
    }

    fn from_builder(builder: reqwest::blocking::ClientBuilder) -> Result<Self> {
        Ok(Self {
            client: builder.build()?,
            max_bytes: MAX_IMAGE_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, url: &str) -> MoodBenchError {
        MoodBenchError::ResponseTooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        }
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MoodBenchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large(url));
        }

        // Servers may omit or understate Content-Length
        let mut bytes = Vec::new();
        response.take(self.max_bytes + 1).read_to_end(&mut bytes)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(self.too_large(url));
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    Network { message: String },
    Decode { message: String },
    OutOfWindow { width: u32, height: u32 },
    Storage { message: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Network { message } => write!(f, "network: {}", message),
            RejectReason::Decode { message } => write!(f, "decode: {}", message),
            RejectReason::OutOfWindow { width, height } => {
                write!(f, "size {}x{} outside accepted window", width, height)
            }
            RejectReason::Storage { message } => write!(f, "storage: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Accepted(PathBuf),
    Rejected(RejectReason),
}

impl FetchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FetchOutcome::Accepted(_))
    }
}

/// Everything fetch-and-store needs besides the URL and its index.
pub struct FetchContext<'a> {
    pub fetcher: &'a dyn ImageFetcher,
    pub layout: &'a StorageLayout,
    pub window: SizeWindow,
    pub bad_links: &'a BadLinkLog,
}

/// Fetch one URL and store it as `{category}_{index:05}.jpg` if accepted.
pub fn fetch_and_store(
    ctx: &FetchContext<'_>,
    url: &str,
    category: &Category,
    index: usize,
) -> FetchOutcome {
    let outcome = match ctx.fetcher.fetch(url) {
        Ok(bytes) => store_image(&bytes, &ctx.layout.image_path(category, index), ctx.window),
        Err(e) => FetchOutcome::Rejected(RejectReason::Network {
            message: e.to_string(),
        }),
    };

    if let FetchOutcome::Rejected(reason) = &outcome {
        log::debug!("[{}] Rejected {}: {}", category, url, reason);
        ctx.bad_links.record_or_warn(url, &reason.to_string());
    }

    outcome
}

/// Decode, size-check and write an image. No file is left behind on rejection.
pub fn store_image(bytes: &[u8], dest: &Path, window: SizeWindow) -> FetchOutcome {
    let image = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            return FetchOutcome::Rejected(RejectReason::Decode {
                message: e.to_string(),
            })
        }
    };

    let (width, height) = image.dimensions();
    if !window.contains(width, height) {
        return FetchOutcome::Rejected(RejectReason::OutOfWindow { width, height });
    }

    match write_jpeg(&image, dest) {
        Ok(()) => FetchOutcome::Accepted(dest.to_path_buf()),
        Err(e) => FetchOutcome::Rejected(RejectReason::Storage {
            message: e.to_string(),
        }),
    }
}

/// Write through a temp file in the same directory, then rename.
fn write_jpeg(image: &DynamicImage, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| MoodBenchError::InvalidPath(dest.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MoodBenchError::InvalidPath(dest.display().to_string()))?;
    let tmp_path = parent.join(format!("{}{}", TEMP_FILE_PREFIX, file_name));

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    if let Err(e) = rgb.save_with_format(&tmp_path, ImageFormat::Jpeg) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    fs::rename(&tmp_path, dest)?;
    Ok(())
}
