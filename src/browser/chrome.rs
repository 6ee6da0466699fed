// Headless Chrome sessions via chromiumoxide.
//
// chromiumoxide is async; harvest workers are plain threads. Each session owns
// a single-threaded tokio runtime and blocks on it for every call, so the CDP
// handler task only makes progress while a call is in flight.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use super::{BrowserSession, ElementId, SessionFactory};
use crate::config::Category;
use crate::constants::BROWSER_ARGS;
use crate::error::{MoodBenchError, Result};

/// Launch options for the Chrome process.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub sandbox: bool,
    pub extra_args: Vec<String>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            extra_args: BROWSER_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromeSessionFactory {
    options: ChromeOptions,
}

impl ChromeSessionFactory {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();
        if !self.options.headless {
            builder = builder.with_head();
        }
        if !self.options.sandbox {
            builder = builder.no_sandbox();
        }
        for arg in &self.options.extra_args {
            builder = builder.arg(arg.as_str());
        }
        builder.build().map_err(MoodBenchError::Browser)
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn open_session(&self, category: &Category) -> Result<Box<dyn BrowserSession>> {
        let config = self.browser_config()?;
        let session = ChromeSession::launch(config)?;
        log::debug!("[{}] Browser session started", category);
        Ok(Box::new(session))
    }
}

pub struct ChromeSession {
    runtime: Runtime,
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    elements: Vec<Element>,
}

impl ChromeSession {
    pub fn launch(config: BrowserConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (browser, handler) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(config).await?;
            let handle = tokio::spawn(async move {
                pump_events(&mut handler).await;
            });
            Ok::<_, MoodBenchError>((browser, handle))
        })?;

        Ok(Self {
            runtime,
            browser,
            handler,
            page: None,
            elements: Vec::new(),
        })
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| MoodBenchError::Session("no page open; navigate first".to_string()))
    }
}

/// Drive CDP events until the connection closes. Errors on single events
/// (undecodable messages and the like) are logged and skipped; page calls wait
/// on this loop, so it must outlive them. Returns the number of skipped errors.
async fn pump_events<S, E>(events: &mut S) -> usize
where
    S: Stream<Item = std::result::Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    let mut errors = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            errors += 1;
            log::debug!("Browser event error: {}", e);
        }
    }
    errors
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let page = match self.page.take() {
            Some(page) => {
                self.runtime.block_on(page.goto(url))?;
                page
            }
            None => self.runtime.block_on(self.browser.new_page(url))?,
        };
        self.runtime.block_on(page.wait_for_navigation())?;
        self.page = Some(page);
        self.elements.clear();
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value> {
        let page = self.page()?;
        let result = self.runtime.block_on(page.evaluate(script.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    fn find_elements_by_tag(&mut self, tag: &str) -> Result<Vec<ElementId>> {
        let page = self.page()?;
        let elements = self.runtime.block_on(page.find_elements(tag))?;
        let ids = (0..elements.len()).map(ElementId).collect();
        self.elements = elements;
        Ok(ids)
    }

    fn attribute(&mut self, element: ElementId, name: &str) -> Result<Option<String>> {
        let el = self
            .elements
            .get(element.0)
            .ok_or_else(|| MoodBenchError::Session(format!("stale element {}", element.0)))?;
        Ok(self.runtime.block_on(el.attribute(name))?)
    }

    fn quit(&mut self) -> Result<()> {
        self.elements.clear();
        self.page = None;
        let browser = &mut self.browser;
        let closed = self.runtime.block_on(async move {
            browser.close().await?;
            browser.wait().await?;
            Ok::<_, MoodBenchError>(())
        });
        self.handler.abort();
        closed
    }
}
