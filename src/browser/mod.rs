// Browser session collaborator
//
// The harvester only needs a handful of operations from a browser, so they
// live behind a trait. `chrome` provides the headless Chrome implementation;
// tests drive the harvester with scripted sessions.

pub mod chrome;

use crate::config::Category;
use crate::error::Result;

pub use chrome::ChromeSessionFactory;

/// Handle to an element from the most recent `find_elements_by_tag` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementId(pub usize);

pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Run a script in the page and return its value (`Null` when it has none).
    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Snapshot all elements with the given tag. Earlier ids become invalid.
    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementId>>;

    fn attribute(&mut self, element: ElementId, name: &str) -> Result<Option<String>>;

    /// Close the session. Called exactly once by `SessionGuard`.
    fn quit(&mut self) -> Result<()>;
}

/// Opens one browser session per category worker.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self, category: &Category) -> Result<Box<dyn BrowserSession>>;
}

/// Quits the wrapped session when dropped, on every exit path.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    label: String,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>, label: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            label: label.into(),
        }
    }

    pub fn session(&mut self) -> &mut dyn BrowserSession {
        // Only `drop` takes the session out
        self.session
            .as_deref_mut()
            .expect("session already released")
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.quit() {
                log::warn!("[{}] Failed to close browser session: {}", self.label, e);
            }
        }
    }
}

/// What the harvester knows about one rendered image element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCandidate {
    pub src: Option<String>,
    pub class: Option<String>,
}

/// Decides whether an image element is real content rather than an avatar,
/// placeholder or ad.
pub trait ContentMatcher: Send + Sync {
    fn looks_like_content(&self, candidate: &ImageCandidate) -> bool;
}

/// Site fingerprint: URL host prefix plus an exact class attribute.
#[derive(Debug, Clone)]
pub struct FingerprintMatcher {
    pub host_prefix: String,
    pub class_marker: String,
}

impl FingerprintMatcher {
    pub fn new(host_prefix: impl Into<String>, class_marker: impl Into<String>) -> Self {
        Self {
            host_prefix: host_prefix.into(),
            class_marker: class_marker.into(),
        }
    }
}

impl ContentMatcher for FingerprintMatcher {
    fn looks_like_content(&self, candidate: &ImageCandidate) -> bool {
        let Some(src) = candidate.src.as_deref() else {
            return false;
        };
        src.starts_with(&self.host_prefix)
            && candidate.class.as_deref() == Some(self.class_marker.as_str())
    }
}
