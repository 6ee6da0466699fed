// Bad-link diagnostics
//
// Every rejected URL is appended as two lines: the URL, then the reason.
// Workers share the file; each record goes out in a single write so records
// from different workers do not interleave mid-line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct BadLinkLog {
    path: PathBuf,
}

impl BadLinkLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, url: &str, reason: &str) -> Result<()> {
        let entry = format!("{}\n{}\n", url, reason.replace('\n', " "));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        Ok(())
    }

    /// Best effort variant used on the fetch path.
    pub fn record_or_warn(&self, url: &str, reason: &str) {
        if let Err(e) = self.record(url, reason) {
            log::warn!("Could not write bad link {} to {}: {}", url, self.path.display(), e);
        }
    }
}
