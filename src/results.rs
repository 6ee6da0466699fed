// Results logger: the CSV sample table plus an optional JSON report.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::constants::RESULTS_HEADER;
use crate::error::Result;
use crate::experiment::{LevelReport, Sample};

/// Write all samples at once, replacing any previous file.
pub fn write_samples(path: &Path, samples: &[Sample]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    out.push_str(&RESULTS_HEADER.join(","));
    out.push('\n');
    for sample in samples {
        // Debug keeps the trailing ".0" on whole seconds
        out.push_str(&format!("{},{:?}\n", sample.process_count, sample.duration_sec));
    }

    let mut file = fs::File::create(path)?;
    file.write_all(out.as_bytes())?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SweepReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    levels: &'a [LevelReport],
}

pub fn write_report(path: &Path, levels: &[LevelReport]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let report = SweepReport {
        generated_at: chrono::Utc::now(),
        levels,
    };
    fs::write(path, serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
