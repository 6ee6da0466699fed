// Parallel experiment harness
//
// For each parallelism level, strictly in order:
//   1. optionally clear the previous level's images and annotations
//   2. scrape every category on a pool of `level` workers (timed)
//   3. subtract the slowest category's artificial pauses
//   4. annotate every stored image on a second pool of `level` workers (timed)
//   5. record (level, scrape + annotate seconds)

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::annotate::annotate_image;
use crate::browser::{ContentMatcher, SessionFactory};
use crate::config::ExperimentConfig;
use crate::diagnostics::BadLinkLog;
use crate::error::Result;
use crate::fetch::{FetchContext, ImageFetcher};
use crate::harvest::HarvestSettings;
use crate::pool::WorkerPool;
use crate::storage::StorageLayout;
use crate::worker::{CategoryReport, CategoryWorker};

/// One row of the results file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub process_count: usize,
    pub duration_sec: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationSummary {
    pub images: usize,
    pub annotated: usize,
    pub failed: usize,
}

/// Everything measured for one parallelism level.
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    pub process_count: usize,
    pub started_at: DateTime<Utc>,
    pub scrape_elapsed_sec: f64,
    pub max_wait_units: u32,
    pub scrape_sec: f64,
    pub annotate_sec: f64,
    pub categories: Vec<CategoryReport>,
    pub annotation: AnnotationSummary,
    pub sample: Sample,
}

/// Scrape time with the slowest category's pauses removed.
///
/// Pauses overlap across parallel workers, so only the maximum count is
/// subtracted, never the sum.
pub fn net_scrape_duration(elapsed: Duration, wait_units: &[u32], unit: Duration) -> Duration {
    let max_units = wait_units.iter().copied().max().unwrap_or(0);
    elapsed.saturating_sub(unit * max_units)
}

pub fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

pub struct Harness<'a> {
    config: &'a ExperimentConfig,
    sessions: &'a dyn SessionFactory,
    fetcher: &'a dyn ImageFetcher,
    matcher: &'a dyn ContentMatcher,
    layout: StorageLayout,
    bad_links: BadLinkLog,
    harvest: HarvestSettings,
}

impl<'a> Harness<'a> {
    pub fn new(
        config: &'a ExperimentConfig,
        sessions: &'a dyn SessionFactory,
        fetcher: &'a dyn ImageFetcher,
        matcher: &'a dyn ContentMatcher,
    ) -> Self {
        let layout = StorageLayout::new(&config.storage_root);
        let bad_links = BadLinkLog::new(layout.bad_links_path());
        Self {
            config,
            sessions,
            fetcher,
            matcher,
            layout,
            bad_links,
            harvest: HarvestSettings::from_config(config),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Run every level in order and return one sample per level.
    pub fn run_sweep(&self, levels: &[usize]) -> Result<Vec<Sample>> {
        Ok(self
            .run_sweep_detailed(levels)?
            .into_iter()
            .map(|r| r.sample)
            .collect())
    }

    pub fn run_sweep_detailed(&self, levels: &[usize]) -> Result<Vec<LevelReport>> {
        let mut reports = Vec::with_capacity(levels.len());
        for &level in levels {
            reports.push(self.run_level(level)?);
        }
        Ok(reports)
    }

    pub fn run_level(&self, process_count: usize) -> Result<LevelReport> {
        log::info!("Starting run with {} workers", process_count);
        let started_at = Utc::now();

        if self.config.reset_between_runs {
            self.layout.reset()?;
        }
        self.layout.ensure_category_dirs(&self.config.categories)?;

        // Scrape phase
        let scrape_pool = WorkerPool::new(process_count, "scrape")?;
        let worker = CategoryWorker {
            sessions: self.sessions,
            matcher: self.matcher,
            harvest: &self.harvest,
            fetch: FetchContext {
                fetcher: self.fetcher,
                layout: &self.layout,
                window: self.config.size_window(),
                bad_links: &self.bad_links,
            },
            images_per_category: self.config.images_per_category,
        };

        let scrape_start = Instant::now();
        let categories = scrape_pool.map(&self.config.categories, |c| worker.run_category(c));
        let scrape_elapsed = scrape_start.elapsed();

        let wait_units: Vec<u32> = categories.iter().map(|r| r.wait_units).collect();
        let scrape = net_scrape_duration(scrape_elapsed, &wait_units, self.harvest.pause);

        // Annotation phase, strictly after every image of this level is stored
        let images = self.layout.list_stored_images(&self.config.categories)?;
        let annotate_pool = WorkerPool::new(process_count, "annotate")?;
        let annotate_start = Instant::now();
        let annotation = self.annotate_all(&annotate_pool, &images);
        let annotate = annotate_start.elapsed();

        let sample = Sample {
            process_count,
            duration_sec: round_secs((scrape + annotate).as_secs_f64()),
        };
        log::info!(
            "Run with {} workers: {:.2}s (scrape {:.2}s net, annotate {:.2}s)",
            process_count,
            sample.duration_sec,
            scrape.as_secs_f64(),
            annotate.as_secs_f64()
        );

        Ok(LevelReport {
            process_count,
            started_at,
            scrape_elapsed_sec: round_secs(scrape_elapsed.as_secs_f64()),
            max_wait_units: wait_units.iter().copied().max().unwrap_or(0),
            scrape_sec: round_secs(scrape.as_secs_f64()),
            annotate_sec: round_secs(annotate.as_secs_f64()),
            categories,
            annotation,
            sample,
        })
    }

    /// Annotate every image on the pool. Failures are logged per item and
    /// counted; they never stop the other items.
    pub fn annotate_all(&self, pool: &WorkerPool, images: &[PathBuf]) -> AnnotationSummary {
        let variant = self.config.annotation_variant;
        let results = pool.map(images, |path| annotate_image(&self.layout, path, variant));

        let mut summary = AnnotationSummary {
            images: images.len(),
            ..Default::default()
        };
        for (path, result) in images.iter().zip(results) {
            match result {
                Ok(_) => summary.annotated += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::error!("Failed to annotate {}: {}", path.display(), e);
                }
            }
        }
        summary
    }
}
