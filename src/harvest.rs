// Scroll-and-collect URL harvester
//
// Drives an infinite-scroll search page: scroll to the bottom, wait for the
// page to render, collect matching image URLs, repeat. Stops when the target
// is reached, when a scroll no longer changes the page height, or after
// `max_cycles` scrolls.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::browser::{BrowserSession, ContentMatcher, ElementId, ImageCandidate};
use crate::config::{Category, ExperimentConfig};
use crate::constants::{CATEGORY_PLACEHOLDER, IMAGE_TAG, PAGE_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT};
use crate::error::{MoodBenchError, Result};

/// Harvest parameters that do not change between categories.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub search_url_template: String,
    pub pause: Duration,
    pub max_cycles: usize,
}

impl HarvestSettings {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            search_url_template: config.search_url_template.clone(),
            pause: config.scroll_pause(),
            max_cycles: config.max_scroll_cycles,
        }
    }

    pub fn search_url(&self, category: &Category) -> String {
        self.search_url_template
            .replace(CATEGORY_PLACEHOLDER, category.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestOutcome {
    /// Unique URLs in discovery order, at most the target count
    pub urls: Vec<String>,
    /// Number of fixed pauses taken
    pub wait_units: u32,
    pub cycles: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    TargetReached,
    Stagnated,
    CycleLimit,
}

/// A harvest that stopped on a session error. `partial` still carries the
/// pauses and cycles taken before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct HarvestFailure {
    pub partial: HarvestOutcome,
    pub error: MoodBenchError,
}

/// Collect up to `target_count` content image URLs for one category.
///
/// Navigation, scroll and height queries are session errors and end the
/// harvest. Failing to read a single element skips it; failing to enumerate
/// elements is logged and retried on the next cycle without a height check.
pub fn harvest(
    session: &mut dyn BrowserSession,
    matcher: &dyn ContentMatcher,
    settings: &HarvestSettings,
    category: &Category,
    target_count: usize,
) -> std::result::Result<HarvestOutcome, HarvestFailure> {
    let mut outcome = HarvestOutcome::default();
    match run_cycles(session, matcher, settings, category, target_count, &mut outcome) {
        Ok(()) => {
            outcome.urls.truncate(target_count);
            log::info!("[{}] Found {} links", category, outcome.urls.len());
            Ok(outcome)
        }
        Err(error) => Err(HarvestFailure {
            partial: outcome,
            error,
        }),
    }
}

fn run_cycles(
    session: &mut dyn BrowserSession,
    matcher: &dyn ContentMatcher,
    settings: &HarvestSettings,
    category: &Category,
    target_count: usize,
    outcome: &mut HarvestOutcome,
) -> Result<()> {
    session.navigate(&settings.search_url(category))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut last_height = page_height(session)?;

    while outcome.urls.len() < target_count {
        if outcome.cycles >= settings.max_cycles {
            log::warn!(
                "[{}] Stopping after {} scroll cycles with {} links",
                category,
                outcome.cycles,
                outcome.urls.len()
            );
            outcome.stop = StopReason::CycleLimit;
            break;
        }
        outcome.cycles += 1;

        session.execute_script(SCROLL_TO_BOTTOM_SCRIPT)?;
        if !settings.pause.is_zero() {
            thread::sleep(settings.pause);
        }
        outcome.wait_units += 1;

        match collect_cycle(session, matcher, target_count, &mut seen, &mut outcome.urls) {
            Ok(added) => {
                log::debug!("[{}] cycle {}: +{} links", category, outcome.cycles, added);
            }
            Err(e) => {
                // Nothing was read this cycle, so the height says nothing either
                log::warn!("[{}] Failed to enumerate images: {}", category, e);
                continue;
            }
        }

        if outcome.urls.len() >= target_count {
            outcome.stop = StopReason::TargetReached;
            break;
        }

        let new_height = page_height(session)?;
        if new_height == last_height {
            outcome.stop = StopReason::Stagnated;
            break;
        }
        last_height = new_height;
    }

    Ok(())
}

/// One enumeration pass. Returns how many new URLs were added.
fn collect_cycle(
    session: &mut dyn BrowserSession,
    matcher: &dyn ContentMatcher,
    target_count: usize,
    seen: &mut HashSet<String>,
    urls: &mut Vec<String>,
) -> Result<usize> {
    let elements = session.find_elements_by_tag(IMAGE_TAG)?;
    let mut added = 0;

    for element in elements {
        let candidate = match read_candidate(session, element) {
            Ok(c) => c,
            Err(_) => continue,
        };

        if matcher.looks_like_content(&candidate) {
            if let Some(src) = candidate.src {
                if seen.insert(src.clone()) {
                    urls.push(src);
                    added += 1;
                }
            }
        }

        if urls.len() >= target_count {
            break;
        }
    }

    Ok(added)
}

fn read_candidate(session: &mut dyn BrowserSession, element: ElementId) -> Result<ImageCandidate> {
    let class = session.attribute(element, "class")?;
    let src = session.attribute(element, "src")?;
    Ok(ImageCandidate { src, class })
}

fn page_height(session: &mut dyn BrowserSession) -> Result<i64> {
    let value = session.execute_script(PAGE_HEIGHT_SCRIPT)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|h| h as i64))
        .ok_or_else(|| MoodBenchError::Session(format!("unexpected page height: {}", value)))
}
