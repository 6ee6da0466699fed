// Category worker: one category end to end.
//
// open session -> harvest -> release session -> fetch and store each URL.
// A session that cannot be opened or a harvest that fails abandons the
// category with zero images; it never fails the sweep. Pauses taken before a
// harvest failure are still reported.

use serde::Serialize;

use crate::browser::{ContentMatcher, SessionFactory, SessionGuard};
use crate::config::Category;
use crate::fetch::{fetch_and_store, FetchContext, FetchOutcome};
use crate::harvest::{harvest, HarvestSettings};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub urls_found: usize,
    pub stored: usize,
    pub rejected: usize,
    pub wait_units: u32,
    pub cycles: usize,
    /// Set when the category was abandoned before fetching
    pub error: Option<String>,
}

impl CategoryReport {
    fn new(category: &Category) -> Self {
        Self {
            category: category.clone(),
            urls_found: 0,
            stored: 0,
            rejected: 0,
            wait_units: 0,
            cycles: 0,
            error: None,
        }
    }
}

pub struct CategoryWorker<'a> {
    pub sessions: &'a dyn SessionFactory,
    pub matcher: &'a dyn ContentMatcher,
    pub harvest: &'a HarvestSettings,
    pub fetch: FetchContext<'a>,
    pub images_per_category: usize,
}

impl CategoryWorker<'_> {
    pub fn run_category(&self, category: &Category) -> CategoryReport {
        let mut report = CategoryReport::new(category);

        let urls = match self.collect_urls(category, &mut report) {
            Some(urls) => urls,
            None => {
                if let Some(ref message) = report.error {
                    log::error!("[{}] {}", category, message);
                }
                return report;
            }
        };

        // Index only advances on acceptance, so stored names stay dense
        let mut next_index = 0;
        for url in &urls {
            match fetch_and_store(&self.fetch, url, category, next_index) {
                FetchOutcome::Accepted(_) => {
                    next_index += 1;
                    report.stored += 1;
                }
                FetchOutcome::Rejected(_) => report.rejected += 1,
            }
        }

        log::info!(
            "[{}] Saved {} of {} images ({} rejected)",
            category,
            report.stored,
            report.urls_found,
            report.rejected
        );
        report
    }

    /// Harvest inside a session scope. The guard quits the browser on every
    /// path out of this function, including unwinding. Fills in the harvest
    /// counters of `report` and returns the URLs, or records the error.
    fn collect_urls(&self, category: &Category, report: &mut CategoryReport) -> Option<Vec<String>> {
        let session = match self.sessions.open_session(category) {
            Ok(session) => session,
            Err(e) => {
                report.error = Some(format!("Browser session failed: {}", e));
                return None;
            }
        };
        let mut guard = SessionGuard::new(session, category.as_str());

        match harvest(
            guard.session(),
            self.matcher,
            self.harvest,
            category,
            self.images_per_category,
        ) {
            Ok(outcome) => {
                report.wait_units = outcome.wait_units;
                report.cycles = outcome.cycles;
                report.urls_found = outcome.urls.len();
                Some(outcome.urls)
            }
            Err(failure) => {
                report.wait_units = failure.partial.wait_units;
                report.cycles = failure.partial.cycles;
                report.error = Some(format!("Harvest failed: {}", failure.error));
                None
            }
        }
    }
}
