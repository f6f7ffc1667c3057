//! Scoped browser sessions.
//!
//! A [`SessionDriver`] launches one [`BrowserSession`] per invocation, hands it
//! to the caller's work and tears it down on every exit path: normal return,
//! error, session-budget timeout, and cancellation (the future being dropped).
//! Teardown failures are logged and never replace the work's own result.

#[cfg(feature = "render")]
pub mod chromium;
pub mod stealth;
pub mod wait;

#[cfg(feature = "render")]
pub use chromium::{ChromiumLauncher, LaunchOptions};
pub use wait::wait_until;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use offerscout_core::Error;
use thiserror::Error as ThisError;
use tokio::time::{Instant, timeout_at};
use url::Url;

/// Browser-level failures.
#[derive(Debug, ThisError)]
pub enum SessionError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Page did not become ready in time.
    #[error("navigation timeout after {0}ms")]
    Timeout(u64),

    /// Failed to read page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Closing the tab or browser process failed.
    #[error("browser teardown failed: {0}")]
    Teardown(String),

    /// Session used after teardown.
    #[error("browser session closed")]
    Closed,

    /// No browser backend compiled in.
    #[error("browser rendering disabled")]
    Disabled,
}

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::BrowserLaunch(msg) => Error::BrowserLaunch(msg),
            SessionError::Navigation(msg) => Error::Navigation(msg),
            SessionError::Timeout(ms) => Error::Navigation(format!("page not ready after {ms}ms")),
            SessionError::ContentRetrieval(msg) => Error::ExtractFailed(msg),
            SessionError::Teardown(msg) => Error::SessionTeardown(msg),
            SessionError::Closed => Error::Navigation("browser session closed".into()),
            SessionError::Disabled => Error::RenderDisabled,
        }
    }
}

/// Content-ready condition a navigation waits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyState {
    /// Document load event fired.
    #[default]
    Loaded,
    /// Loaded, then no new network resources across consecutive polls. For
    /// marketplaces whose scripts keep fetching listings after load.
    NetworkIdle,
}

/// One live browser tab.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for `ready`, bounded by `timeout`.
    async fn navigate(&mut self, url: &Url, ready: ReadyState, timeout: Duration) -> Result<(), SessionError>;

    /// Whether an element matching `selector` appeared within `timeout`.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool, SessionError>;

    /// Click the first element matching `selector`. `false` when absent.
    async fn click(&mut self, selector: &str) -> Result<bool, SessionError>;

    /// Serialized DOM of the current page.
    async fn html(&mut self) -> Result<String, SessionError>;

    /// Tear down the tab and its browser. Must be idempotent.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Factory for browser sessions.
#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}

/// Launcher used when rendering is compiled out.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLauncher;

#[async_trait::async_trait]
impl SessionLauncher for UnavailableLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        Err(SessionError::Disabled)
    }
}

/// Holds a session until it is released, closing it from `Drop` when the
/// owning future is abandoned before release.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self { session: Some(session) }
    }

    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => tracing::debug!("browser session closed"),
                Err(e) => tracing::warn!("browser session teardown failed: {e}"),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!("browser session drop cleanup failed: {e}");
                    } else {
                        tracing::debug!("browser session closed on drop");
                    }
                });
            }
            Err(_) => tracing::warn!("no runtime to close abandoned browser session"),
        }
    }
}

/// Scoped acquisition of browser sessions.
#[derive(Clone)]
pub struct SessionDriver {
    launcher: Arc<dyn SessionLauncher>,
    budget: Duration,
}

impl SessionDriver {
    /// `budget` bounds the whole session, from launch to the end of `work`.
    pub fn new(launcher: Arc<dyn SessionLauncher>, budget: Duration) -> Self {
        Self { launcher, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Launch a session, run `work` on it and release it.
    ///
    /// The session is closed before this returns on success, error and
    /// timeout. When the returned future is dropped mid-work the session is
    /// closed on a spawned task.
    pub async fn with_session<T, F>(&self, work: F) -> Result<T, Error>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut dyn BrowserSession) -> BoxFuture<'s, Result<T, Error>> + Send,
    {
        let budget_ms = self.budget.as_millis() as u64;
        let deadline = Instant::now() + self.budget;
        let launched = timeout_at(deadline, self.launcher.launch())
            .await
            .map_err(|_| Error::Timeout(format!("browser launch exceeded {budget_ms}ms session budget")))??;

        let mut guard = SessionGuard::new(launched);
        let outcome = match guard.session.as_deref_mut() {
            Some(session) => timeout_at(deadline, work(session)).await,
            None => Ok(Err(SessionError::Closed.into())),
        };
        guard.release().await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("browser session exceeded {budget_ms}ms budget"))),
        }
    }
}

/// Best-effort click on a cookie-consent control. Absence is the common case;
/// failures are logged and swallowed.
pub async fn dismiss_consent(session: &mut dyn BrowserSession, selector: &str) {
    match session.click(selector).await {
        Ok(true) => tracing::debug!(selector, "consent dialog dismissed"),
        Ok(false) => tracing::debug!(selector, "no consent dialog"),
        Err(e) => tracing::warn!(selector, "consent dismissal failed: {e}"),
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FakeLauncher;
    use super::*;

    const URL: &str = "https://market.example/search?q=etb";

    fn driver(launcher: FakeLauncher, budget: Duration) -> (SessionDriver, Arc<testing::Counters>) {
        let counters = launcher.counters.clone();
        (SessionDriver::new(Arc::new(launcher), budget), counters)
    }

    fn fixture() -> FakeLauncher {
        FakeLauncher::new([(URL.to_string(), "<html><body><p>ok</p></body></html>".to_string())])
    }

    #[tokio::test]
    async fn test_released_after_success() {
        let (driver, counters) = driver(fixture(), Duration::from_secs(5));
        let html = driver
            .with_session(|session| {
                Box::pin(async move {
                    session.navigate(&Url::parse(URL).unwrap(), ReadyState::Loaded, Duration::from_secs(1)).await?;
                    Ok(session.html().await?)
                })
            })
            .await
            .unwrap();
        assert!(html.contains("<p>ok</p>"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_released_after_error() {
        let (driver, counters) = driver(fixture(), Duration::from_secs(5));
        let err = driver
            .with_session(|session| {
                Box::pin(async move {
                    let url = Url::parse("https://market.example/missing").unwrap();
                    session.navigate(&url, ReadyState::Loaded, Duration::from_secs(1)).await?;
                    Ok(())
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_after_budget_timeout() {
        let mut launcher = fixture();
        launcher.hang_navigation = true;
        let (driver, counters) = driver(launcher, Duration::from_millis(200));
        let err = driver
            .with_session(|session| {
                Box::pin(async move {
                    session.navigate(&Url::parse(URL).unwrap(), ReadyState::Loaded, Duration::from_secs(1)).await?;
                    Ok(())
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_and_work_share_one_budget() {
        let mut launcher = fixture();
        launcher.launch_delay = Duration::from_millis(150);
        let (driver, counters) = driver(launcher, Duration::from_millis(200));
        let err = driver
            .with_session(|_session| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_session_error_mapping() {
        assert!(matches!(Error::from(SessionError::Timeout(500)), Error::Navigation(_)));
        assert!(matches!(Error::from(SessionError::Teardown("gone".into())), Error::SessionTeardown(_)));
        assert!(matches!(Error::from(SessionError::Disabled), Error::RenderDisabled));
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_mask_result() {
        let mut launcher = fixture();
        launcher.fail_close = true;
        let (driver, counters) = driver(launcher, Duration::from_secs(5));
        let value = driver.with_session(|_session| Box::pin(async { Ok(7) })).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_released_when_abandoned() {
        let mut launcher = fixture();
        launcher.hang_navigation = true;
        let (driver, counters) = driver(launcher, Duration::from_secs(60));
        let pending = driver.with_session(|session| {
            Box::pin(async move {
                session.navigate(&Url::parse(URL).unwrap(), ReadyState::Loaded, Duration::from_secs(1)).await?;
                Ok(())
            })
        });
        let abandoned = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(abandoned.is_err());
        for _ in 0..50 {
            if counters.closed.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consent_is_best_effort() {
        let html = r#"<html><body><button id="accept">OK</button></body></html>"#;
        let launcher = FakeLauncher::new([(URL.to_string(), html.to_string())]);
        let (driver, counters) = driver(launcher, Duration::from_secs(5));
        driver
            .with_session(|session| {
                Box::pin(async move {
                    session.navigate(&Url::parse(URL).unwrap(), ReadyState::Loaded, Duration::from_secs(1)).await?;
                    dismiss_consent(session, "#accept").await;
                    dismiss_consent(session, "#absent").await;
                    Ok(())
                })
            })
            .await
            .unwrap();
        assert_eq!(counters.clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_launcher() {
        let driver = SessionDriver::new(Arc::new(UnavailableLauncher), Duration::from_secs(1));
        let err = driver.with_session(|_session| Box::pin(async { Ok(()) })).await.unwrap_err();
        assert!(matches!(err, Error::RenderDisabled));
    }
}
