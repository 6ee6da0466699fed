// Moodbench CLI binary

use std::path::PathBuf;
use clap::{Parser, Subcommand};
use anyhow::Result;

use moodbench_lib::annotate::annotate_image;
use moodbench_lib::browser::{ChromeSessionFactory, FingerprintMatcher, SessionGuard, SessionFactory};
use moodbench_lib::config::{parse_categories, AnnotationVariant, Category, ExperimentConfig};
use moodbench_lib::experiment::Harness;
use moodbench_lib::fetch::HttpFetcher;
use moodbench_lib::harvest::{harvest, HarvestSettings};
use moodbench_lib::pool::WorkerPool;
use moodbench_lib::results;
use moodbench_lib::storage::StorageLayout;

#[derive(Parser)]
#[command(name = "moodbench")]
#[command(about = "Moodbench - scrape, annotate and benchmark emotion image searches", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (defaults apply to missing fields)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full parallelism sweep and write the results CSV
    Run {
        #[command(flatten)]
        overrides: Overrides,
        /// Parallelism levels to sweep, comma separated
        #[arg(long, value_delimiter = ',')]
        levels: Option<Vec<usize>>,
        /// Results CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write a JSON report with per-category detail
        #[arg(long)]
        report: Option<PathBuf>,
        /// Keep images and annotations from the previous level
        #[arg(long)]
        keep_previous: bool,
    },

    /// Harvest links for one category and print them (no downloads)
    Harvest {
        category: String,
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Annotate images already in the store
    Annotate {
        #[command(flatten)]
        overrides: Overrides,
        /// Number of annotation workers
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Categories, comma separated
    #[arg(long)]
    categories: Option<String>,
    /// Target images per category
    #[arg(long)]
    images: Option<usize>,
    /// Storage root holding content/ and annotation/
    #[arg(long)]
    root: Option<PathBuf>,
    /// Pause after each scroll, in milliseconds
    #[arg(long)]
    pause_ms: Option<u64>,
    /// Write only height, weight and brightness
    #[arg(long)]
    basic_stats: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let base = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };

    match cli.command {
        Commands::Run { overrides, levels, output, report, keep_previous } => {
            let mut config = apply_overrides(base, &overrides)?;
            if let Some(levels) = levels {
                config.parallelism_levels = levels;
            }
            if let Some(output) = output {
                config.output_path = output;
            }
            if report.is_some() {
                config.report_path = report;
            }
            if keep_previous {
                config.reset_between_runs = false;
            }
            config.validate()?;
            cmd_run(&config)
        }
        Commands::Harvest { category, overrides } => {
            let config = apply_overrides(base, &overrides)?;
            config.validate()?;
            cmd_harvest(&config, &Category::parse(&category)?)
        }
        Commands::Annotate { overrides, workers } => {
            let config = apply_overrides(base, &overrides)?;
            config.validate()?;
            cmd_annotate(&config, workers)
        }
        Commands::Config { overrides } => {
            let config = apply_overrides(base, &overrides)?;
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn apply_overrides(mut config: ExperimentConfig, overrides: &Overrides) -> Result<ExperimentConfig> {
    if let Some(ref list) = overrides.categories {
        config.categories = parse_categories(list)?;
    }
    if let Some(images) = overrides.images {
        config.images_per_category = images;
    }
    if let Some(ref root) = overrides.root {
        config.storage_root = root.clone();
    }
    if let Some(pause_ms) = overrides.pause_ms {
        config.scroll_pause_ms = pause_ms;
    }
    if overrides.basic_stats {
        config.annotation_variant = AnnotationVariant::Basic;
    }
    Ok(config)
}

fn matcher_for(config: &ExperimentConfig) -> FingerprintMatcher {
    FingerprintMatcher::new(&config.image_host_prefix, &config.content_class_marker)
}

fn cmd_run(config: &ExperimentConfig) -> Result<()> {
    let sessions = ChromeSessionFactory::default();
    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    let matcher = matcher_for(config);
    let harness = Harness::new(config, &sessions, &fetcher, &matcher);

    println!(
        "Sweeping {:?} workers over {} categories ({} images each)",
        config.parallelism_levels,
        config.categories.len(),
        config.images_per_category
    );

    let reports = harness.run_sweep_detailed(&config.parallelism_levels)?;

    for report in &reports {
        println!();
        println!("{} workers: {:.2} sec", report.process_count, report.sample.duration_sec);
        println!("{:>12}  {:>6}  {:>6}  {:>8}  {:>5}", "Category", "Links", "Saved", "Rejected", "Waits");
        println!("{}", "-".repeat(46));
        for cat in &report.categories {
            println!(
                "{:>12}  {:>6}  {:>6}  {:>8}  {:>5}",
                cat.category.as_str(),
                cat.urls_found,
                cat.stored,
                cat.rejected,
                cat.wait_units
            );
            if let Some(ref error) = cat.error {
                println!("{:>12}  {}", "", error);
            }
        }
        println!(
            "  Scrape: {:.2}s raw, {:.2}s net of {} waits | Annotate: {:.2}s ({} ok, {} failed)",
            report.scrape_elapsed_sec,
            report.scrape_sec,
            report.max_wait_units,
            report.annotate_sec,
            report.annotation.annotated,
            report.annotation.failed
        );
    }

    let samples: Vec<_> = reports.iter().map(|r| r.sample).collect();
    results::write_samples(&config.output_path, &samples)?;
    if let Some(ref path) = config.report_path {
        results::write_report(path, &reports)?;
        println!("Report written to {}", path.display());
    }

    println!();
    println!("Results saved to {}", config.output_path.display());
    Ok(())
}

fn cmd_harvest(config: &ExperimentConfig, category: &Category) -> Result<()> {
    let sessions = ChromeSessionFactory::default();
    let matcher = matcher_for(config);
    let settings = HarvestSettings::from_config(config);

    let session = sessions.open_session(category)?;
    let mut guard = SessionGuard::new(session, category.as_str());
    let outcome = harvest(guard.session(), &matcher, &settings, category, config.images_per_category)?;
    drop(guard);

    for url in &outcome.urls {
        println!("{}", url);
    }
    eprintln!(
        "{} links after {} cycles ({:?})",
        outcome.urls.len(),
        outcome.cycles,
        outcome.stop
    );
    Ok(())
}

fn cmd_annotate(config: &ExperimentConfig, workers: usize) -> Result<()> {
    let layout = StorageLayout::new(&config.storage_root);
    let images = layout.list_stored_images(&config.categories)?;
    if images.is_empty() {
        println!("No stored images under {}", layout.content_root().display());
        return Ok(());
    }

    let pool = WorkerPool::new(workers, "annotate")?;
    let variant = config.annotation_variant;
    let start = std::time::Instant::now();
    let outcomes = pool.map(&images, |path| annotate_image(&layout, path, variant));
    let elapsed = start.elapsed();

    let mut failed = 0;
    for (path, outcome) in images.iter().zip(&outcomes) {
        if let Err(e) = outcome {
            failed += 1;
            log::error!("Failed to annotate {}: {}", path.display(), e);
        }
    }

    println!(
        "Annotated {} of {} images with {} workers in {:.2}s",
        images.len() - failed,
        images.len(),
        pool.degree(),
        elapsed.as_secs_f64()
    );
    Ok(())
}
