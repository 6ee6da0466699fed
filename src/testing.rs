// Test doubles: scripted browser pages and canned HTTP responses.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::browser::{BrowserSession, ElementId, SessionFactory};
use crate::config::Category;
use crate::constants::{PAGE_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT};
use crate::error::{MoodBenchError, Result};
use crate::fetch::ImageFetcher;

pub const HOST: &str = "https://img.test";
pub const MARKER: &str = "pin-image";

/// Height added to the page by each revealed batch.
const BATCH_HEIGHT: i64 = 1000;

#[derive(Debug, Clone)]
pub struct ScriptedImage {
    pub src: String,
    pub class: String,
    pub broken: bool,
}

impl ScriptedImage {
    /// Attribute reads on this element fail.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

pub fn content_url(i: usize) -> String {
    format!("{}/pins/{}.jpg", HOST, i)
}

pub fn content_image(i: usize) -> ScriptedImage {
    ScriptedImage {
        src: content_url(i),
        class: MARKER.to_string(),
        broken: false,
    }
}

/// An avatar-style image that the fingerprint matcher must ignore.
pub fn other_image(i: usize) -> ScriptedImage {
    ScriptedImage {
        src: format!("{}/avatars/{}.jpg", HOST, i),
        class: "avatar".to_string(),
        broken: false,
    }
}

type BatchFn = Arc<dyn Fn(usize) -> Vec<ScriptedImage> + Send + Sync>;

/// An infinite-scroll page: batch 0 is rendered on load, each scroll reveals
/// the next batch until they run out.
#[derive(Clone)]
pub struct ScriptedPage {
    batches: BatchFn,
    batch_count: Option<usize>,
}

impl ScriptedPage {
    pub fn new(batches: Vec<Vec<ScriptedImage>>) -> Self {
        let count = batches.len().max(1);
        let batches = Arc::new(batches);
        Self {
            batches: Arc::new(move |i| batches.get(i).cloned().unwrap_or_default()),
            batch_count: Some(count),
        }
    }

    /// A page that keeps growing on every scroll.
    pub fn endless(batch: impl Fn(usize) -> Vec<ScriptedImage> + Send + Sync + 'static) -> Self {
        Self {
            batches: Arc::new(batch),
            batch_count: None,
        }
    }
}

pub struct ScriptedSession {
    page: ScriptedPage,
    revealed: usize,
    rendered: Vec<ScriptedImage>,
    visited: Vec<String>,
    enumerations: usize,
    fail_enumeration: HashSet<usize>,
    fail_navigation: bool,
    height_reads: usize,
    fail_height_from: Option<usize>,
    quits: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page,
            revealed: 0,
            rendered: Vec::new(),
            visited: Vec::new(),
            enumerations: 0,
            fail_enumeration: HashSet::new(),
            fail_navigation: false,
            height_reads: 0,
            fail_height_from: None,
            quits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the given enumeration calls (1-based).
    pub fn fail_enumeration_on(mut self, calls: &[usize]) -> Self {
        self.fail_enumeration.extend(calls.iter().copied());
        self
    }

    pub fn fail_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Height queries fail from the given call onwards (1-based), like a
    /// tab that crashed mid-harvest.
    pub fn fail_height_from(mut self, call: usize) -> Self {
        self.fail_height_from = Some(call);
        self
    }

    pub(crate) fn with_quit_counter(mut self, quits: Arc<AtomicUsize>) -> Self {
        self.quits = quits;
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.clone()
    }

    fn reveal_next(&mut self) {
        if let Some(count) = self.page.batch_count {
            if self.revealed >= count {
                return;
            }
        }
        let batch = (self.page.batches)(self.revealed);
        self.rendered.extend(batch);
        self.revealed += 1;
    }
}

impl BrowserSession for ScriptedSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        if self.fail_navigation {
            return Err(MoodBenchError::Session(format!("cannot reach {}", url)));
        }
        self.visited.push(url.to_string());
        self.revealed = 0;
        self.rendered.clear();
        self.reveal_next();
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value> {
        if script == SCROLL_TO_BOTTOM_SCRIPT {
            self.reveal_next();
            Ok(serde_json::Value::Null)
        } else if script == PAGE_HEIGHT_SCRIPT {
            self.height_reads += 1;
            if self.fail_height_from.is_some_and(|from| self.height_reads >= from) {
                return Err(MoodBenchError::Session("tab crashed".to_string()));
            }
            Ok(serde_json::json!(self.revealed as i64 * BATCH_HEIGHT))
        } else {
            Ok(serde_json::Value::Null)
        }
    }

    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementId>> {
        self.enumerations += 1;
        if self.fail_enumeration.contains(&self.enumerations) {
            return Err(MoodBenchError::Session("element query detached".to_string()));
        }
        if tag != "img" {
            return Ok(Vec::new());
        }
        Ok((0..self.rendered.len()).map(ElementId).collect())
    }

    fn attribute(&mut self, element: ElementId, name: &str) -> Result<Option<String>> {
        let image = self
            .rendered
            .get(element.0)
            .ok_or_else(|| MoodBenchError::Session("stale element".to_string()))?;
        if image.broken {
            return Err(MoodBenchError::Session("stale element".to_string()));
        }
        Ok(match name {
            "src" => Some(image.src.clone()),
            "class" => Some(image.class.clone()),
            _ => None,
        })
    }

    fn quit(&mut self) -> Result<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out scripted sessions per category; categories without a page fail
/// to open, like a browser that cannot start.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pages: HashMap<String, ScriptedPage>,
    opened: Arc<AtomicUsize>,
    quits: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, category: &str, page: ScriptedPage) -> Self {
        self.pages.insert(category.to_string(), page);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl SessionFactory for ScriptedFactory {
    fn open_session(&self, category: &Category) -> Result<Box<dyn BrowserSession>> {
        let page = self
            .pages
            .get(category.as_str())
            .cloned()
            .ok_or_else(|| MoodBenchError::Browser("chrome failed to launch".to_string()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(
            ScriptedSession::new(page).with_quit_counter(Arc::clone(&self.quits)),
        ))
    }
}

/// Canned HTTP responses keyed by URL. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, std::result::Result<Vec<u8>, String>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, width: u32, height: u32) -> Self {
        self.responses.insert(url.to_string(), Ok(png_bytes(width, height)));
        self
    }

    pub fn with_bytes(mut self, url: &str, bytes: &[u8]) -> Self {
        self.responses.insert(url.to_string(), Ok(bytes.to_vec()));
        self
    }

    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ImageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(message)) => Err(MoodBenchError::Other(message.clone())),
            None => Err(MoodBenchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// PNG-encoded gradient of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
