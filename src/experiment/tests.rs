// Harness scenarios driven by scripted browser pages and canned HTTP.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::annotate::read_annotation;
use crate::browser::FingerprintMatcher;
use crate::config::{AnnotationVariant, Category};
use crate::testing::{content_image, content_url, ScriptedFactory, ScriptedPage, StaticFetcher, HOST, MARKER};

fn test_config(root: &Path, categories: &[&str], images: usize) -> ExperimentConfig {
    ExperimentConfig {
        categories: categories.iter().map(|c| Category::parse(c).unwrap()).collect(),
        images_per_category: images,
        parallelism_levels: vec![1, 2],
        storage_root: root.to_path_buf(),
        output_path: root.join("performance_log.csv"),
        search_url_template: "https://gallery.test/search?q={category}_vibe".to_string(),
        image_host_prefix: HOST.to_string(),
        content_class_marker: MARKER.to_string(),
        scroll_pause_ms: 0,
        max_scroll_cycles: 20,
        ..Default::default()
    }
}

/// Category pages whose content URLs are offset so categories never share links.
fn page_for(offset: usize, count: usize) -> ScriptedPage {
    ScriptedPage::new(vec![
        (offset..offset + count / 2).map(content_image).collect(),
        (offset + count / 2..offset + count).map(content_image).collect(),
    ])
}

fn fetcher_for(ranges: &[(usize, usize)]) -> StaticFetcher {
    let mut fetcher = StaticFetcher::new();
    for &(offset, count) in ranges {
        for i in offset..offset + count {
            fetcher = fetcher.with_image(&content_url(i), 160 + i as u32 % 7, 150);
        }
    }
    fetcher
}

// ---------------------------------------------------------------
// Duration accounting
// ---------------------------------------------------------------

#[test]
fn test_net_duration_subtracts_max_wait() {
    let net = net_scrape_duration(Duration::from_secs(40), &[3, 5, 2], Duration::from_secs(1));
    assert_eq!(net, Duration::from_secs(35));
}

#[test]
fn test_net_duration_scales_with_pause_length() {
    let net = net_scrape_duration(Duration::from_secs(60), &[3, 5, 2], Duration::from_secs(5));
    assert_eq!(net, Duration::from_secs(35));
}

#[test]
fn test_net_duration_never_negative() {
    let net = net_scrape_duration(Duration::from_secs(2), &[10], Duration::from_secs(1));
    assert_eq!(net, Duration::ZERO);
    let none = net_scrape_duration(Duration::from_secs(2), &[], Duration::from_secs(1));
    assert_eq!(none, Duration::from_secs(2));
}

#[test]
fn test_round_secs() {
    assert_eq!(round_secs(1.234), 1.23);
    assert_eq!(round_secs(1.235001), 1.24);
    assert_eq!(round_secs(0.0), 0.0);
}

// ---------------------------------------------------------------
// End to end
// ---------------------------------------------------------------

#[test]
fn test_sweep_survives_failed_session() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &["fear", "anger"], 3);
    // Only "fear" has a page; opening a session for "anger" fails
    let factory = ScriptedFactory::new().with_page("fear", page_for(0, 6));
    let fetcher = fetcher_for(&[(0, 6)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    let reports = harness.run_sweep_detailed(&[2]).unwrap();
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    let fear = report.categories.iter().find(|r| r.category.as_str() == "fear").unwrap();
    let anger = report.categories.iter().find(|r| r.category.as_str() == "anger").unwrap();

    assert_eq!(fear.stored, 3);
    assert!(fear.wait_units > 0);
    assert_eq!(anger.stored, 0);
    assert_eq!(anger.wait_units, 0);
    assert!(anger.error.is_some());
    assert_eq!(report.max_wait_units, fear.wait_units);

    assert_eq!(report.annotation.images, 3);
    assert_eq!(report.annotation.annotated, 3);
    assert_eq!(report.annotation.failed, 0);
    assert_eq!(report.sample.process_count, 2);
    assert!(report.sample.duration_sec >= 0.0);
}

#[test]
fn test_every_stored_image_is_annotated() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &["fear", "anger"], 4);
    let factory = ScriptedFactory::new()
        .with_page("fear", page_for(0, 4))
        .with_page("anger", page_for(100, 4));
    let fetcher = fetcher_for(&[(0, 4), (100, 4)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    harness.run_level(2).unwrap();

    let images = harness.layout().list_stored_images(&config.categories).unwrap();
    assert_eq!(images.len(), 8);
    for image in &images {
        let record = read_annotation(&harness.layout().annotation_path_for(image).unwrap()).unwrap();
        assert_eq!(record.height, 150);
        assert!((0.0..=1.0).contains(&record.brightness));
        assert!(record.contrast.unwrap() >= 0.0);
        assert!(record.saturation.unwrap() >= 0.0);
    }
}

#[test]
fn test_sweep_returns_samples_in_level_order() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &["fear"], 2);
    let factory = ScriptedFactory::new().with_page("fear", page_for(0, 2));
    let fetcher = fetcher_for(&[(0, 2)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    let samples = harness.run_sweep(&[3, 1, 2]).unwrap();

    let levels: Vec<usize> = samples.iter().map(|s| s.process_count).collect();
    assert_eq!(levels, vec![3, 1, 2]);
    // One browser session per category per level, each released
    assert_eq!(factory.opened(), 3);
    assert_eq!(factory.quits(), 3);
}

#[test]
fn test_reset_keeps_levels_independent() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &["fear"], 2);
    let factory = ScriptedFactory::new().with_page("fear", page_for(0, 2));
    let fetcher = fetcher_for(&[(0, 2)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    // Leftover from an earlier run that must not survive the reset
    let fear = Category::parse("fear").unwrap();
    let stale = harness.layout().image_path(&fear, 9);
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"stale").unwrap();

    let reports = harness.run_sweep_detailed(&[1, 2]).unwrap();

    for report in &reports {
        assert_eq!(report.annotation.images, 2);
        assert_eq!(report.annotation.failed, 0);
    }
    assert!(!stale.exists());
}

#[test]
fn test_without_reset_annotation_failures_are_counted() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path(), &["fear"], 1);
    config.reset_between_runs = false;
    config.annotation_variant = AnnotationVariant::Basic;
    let factory = ScriptedFactory::new().with_page("fear", page_for(0, 2));
    let fetcher = fetcher_for(&[(0, 2)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    let fear = Category::parse("fear").unwrap();
    let corrupt = harness.layout().image_path(&fear, 7);
    std::fs::create_dir_all(corrupt.parent().unwrap()).unwrap();
    std::fs::write(&corrupt, b"not an image").unwrap();

    let report = harness.run_level(1).unwrap();

    assert_eq!(report.annotation.images, 2);
    assert_eq!(report.annotation.annotated, 1);
    assert_eq!(report.annotation.failed, 1);
    let good = harness.layout().image_path(&fear, 0);
    let record = read_annotation(&harness.layout().annotation_path_for(&good).unwrap()).unwrap();
    assert_eq!(record.contrast, None);
}

#[test]
fn test_stored_count_never_exceeds_target() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), &["fear"], 3);
    let factory = ScriptedFactory::new().with_page("fear", page_for(0, 10));
    let fetcher = fetcher_for(&[(0, 10)]);
    let matcher = FingerprintMatcher::new(HOST, MARKER);
    let harness = Harness::new(&config, &factory, &fetcher, &matcher);

    let report = harness.run_level(1).unwrap();

    assert_eq!(report.categories[0].urls_found, 3);
    assert_eq!(report.categories[0].stored, 3);
    assert_eq!(fetcher.requests().len(), 3);
}
