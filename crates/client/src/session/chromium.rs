//! Headless Chrome/Chromium sessions via chromiumoxide.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use offerscout_core::AppConfig;
use tokio::task::JoinHandle;
use url::Url;

use super::stealth::stealth_script;
use super::wait::wait_until;
use super::{BrowserSession, ReadyState, SessionError, SessionLauncher};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `-1` until the document is complete, then the number of loaded resources.
const RESOURCE_COUNT_JS: &str =
    "document.readyState === 'complete' ? performance.getEntriesByType('resource').length : -1";

/// Browser fingerprint and process settings.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: (u32, u32),
    pub chrome_executable: Option<PathBuf>,
    pub launch_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            viewport: (config.viewport_width, config.viewport_height),
            chrome_executable: config.chrome_executable.clone(),
            launch_timeout: config.navigation_timeout(),
        }
    }
}

/// Launches one headless browser process per session.
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, SessionError> {
        let (width, height) = self.options.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport { width, height, ..Viewport::default() })
            .launch_timeout(self.options.launch_timeout)
            .arg(format!("--user-agent={}", self.options.user_agent))
            .arg(format!("--lang={}", self.options.accept_language.split(',').next().unwrap_or("en-US")))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox");
        if let Some(path) = &self.options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(SessionError::BrowserLaunch)
    }

    async fn prepare_page(&self, page: &Page) -> Result<(), SessionError> {
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script(
            &self.options.accept_language,
        )))
        .await
        .map_err(|e| SessionError::BrowserLaunch(format!("stealth script: {e}")))?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.options.user_agent.clone())
            .accept_language(self.options.accept_language.clone())
            .build()
            .map_err(SessionError::BrowserLaunch)?;
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| SessionError::BrowserLaunch(format!("user agent override: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| SessionError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(SessionError::BrowserLaunch(e.to_string()));
            }
        };

        let mut session = ChromiumSession { browser: Some(browser), page: Some(page.clone()), handler };
        if let Err(e) = self.prepare_page(&page).await {
            let _ = session.close().await;
            return Err(e);
        }

        tracing::debug!("browser session launched");
        Ok(Box::new(session))
    }
}

/// One browser process with a single tab.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    async fn wait_network_idle(page: &Page, timeout: Duration) -> bool {
        let last = Arc::new(AtomicI64::new(-1));
        wait_until(timeout, IDLE_POLL_INTERVAL, || {
            let page = page.clone();
            let last = last.clone();
            async move {
                let count = match page.evaluate(RESOURCE_COUNT_JS).await {
                    Ok(result) => result.into_value::<i64>().unwrap_or(-1),
                    Err(_) => -1,
                };
                let previous = last.swap(count, Ordering::SeqCst);
                count >= 0 && count == previous
            }
        })
        .await
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url, ready: ReadyState, timeout: Duration) -> Result<(), SessionError> {
        let page = self.page()?.clone();
        let started = tokio::time::Instant::now();
        let timeout_ms = timeout.as_millis() as u64;

        match tokio::time::timeout(timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(SessionError::Navigation(format!("{url}: {e}"))),
            Err(_) => return Err(SessionError::Timeout(timeout_ms)),
        }

        if ready == ReadyState::NetworkIdle {
            let remaining = timeout.saturating_sub(started.elapsed());
            if !Self::wait_network_idle(&page, remaining).await {
                return Err(SessionError::Navigation(format!("{url}: network never settled within {timeout_ms}ms")));
            }
        }

        tracing::debug!(%url, ?ready, elapsed_ms = started.elapsed().as_millis() as u64, "page ready");
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool, SessionError> {
        let page = self.page()?.clone();
        Ok(wait_until(timeout, POLL_INTERVAL, || {
            let page = page.clone();
            let selector = selector.to_string();
            async move { page.find_element(selector).await.is_ok() }
        })
        .await)
    }

    async fn click(&mut self, selector: &str) -> Result<bool, SessionError> {
        let Ok(element) = self.page()?.find_element(selector).await else {
            return Ok(false);
        };
        element
            .click()
            .await
            .map(|_| true)
            .map_err(|e| SessionError::Navigation(format!("click {selector}: {e}")))
    }

    async fn html(&mut self) -> Result<String, SessionError> {
        self.page()?
            .content()
            .await
            .map_err(|e| SessionError::ContentRetrieval(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let mut failure = None;
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            failure = Some(format!("page close: {e}"));
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                failure.get_or_insert(format!("browser close: {e}"));
            }
            if let Err(e) = browser.wait().await {
                failure.get_or_insert(format!("browser wait: {e}"));
            }
        }
        self.handler.abort();
        match failure {
            Some(msg) => Err(SessionError::Teardown(msg)),
            None => Ok(()),
        }
    }
}
