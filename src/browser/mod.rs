//! Browser bridge: runs one automation step against a remote browser.
//!
//! Each call connects to the session's DevTools endpoint, performs exactly
//! one [`BrowserStep`] and tears the connection down again. The work happens
//! on a dedicated OS thread with its own single-threaded tokio runtime, so it
//! never borrows the caller's executor. The caller waits at most
//! [`BRIDGE_TIMEOUT`]; a worker that overruns is abandoned, not killed.

pub mod cdp;
pub mod steps;

pub use steps::{BrowserStep, BrowserStepOutput};

use crate::sandbox::SimpleResult;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on connect + step + teardown.
pub const BRIDGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens automation sessions on a remote browser.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Attach to the browser at `endpoint`, reusing its first page when one
    /// exists.
    async fn connect(&self, endpoint: &str) -> anyhow::Result<Box<dyn BrowserSession>>;
}

/// One attached page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> anyhow::Result<()>;
    async fn title(&self) -> anyhow::Result<String>;
    async fn url(&self) -> anyhow::Result<String>;
    async fn content(&self) -> anyhow::Result<String>;

    /// Evaluate a script in the page. `undefined` comes back as `Null`.
    async fn evaluate(&self, script: &str) -> anyhow::Result<Value>;

    /// PNG bytes of the viewport, or the whole page when `full_page`.
    async fn screenshot(&self, full_page: bool) -> anyhow::Result<Vec<u8>>;

    /// Detach from the browser. The remote browser itself stays up.
    async fn close(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct BrowserBridge {
    driver: Arc<dyn BrowserDriver>,
    timeout: Duration,
}

impl BrowserBridge {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            timeout: BRIDGE_TIMEOUT,
        }
    }

    /// Bridge backed by the Chrome DevTools Protocol driver.
    pub fn cdp() -> Self {
        Self::new(Arc::new(cdp::CdpDriver))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `step` against `endpoint`, blocking the calling thread until the
    /// step finishes or the timeout expires.
    pub fn run_blocking(&self, endpoint: &str, step: BrowserStep) -> SimpleResult<BrowserStepOutput> {
        let action = step.name();
        tracing::info!(action, "running browser step");

        let (tx, rx) = mpsc::channel();
        let driver = Arc::clone(&self.driver);
        let endpoint = endpoint.to_string();

        let spawned = std::thread::Builder::new()
            .name("browser-bridge".into())
            .spawn(move || {
                let result = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt.block_on(drive(driver.as_ref(), &endpoint, &step)),
                    Err(e) => Err(anyhow::anyhow!("failed to start browser runtime: {e}")),
                };
                // The receiver is gone once the caller timed out.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            tracing::error!(action, error = %e, "failed to spawn browser worker");
            return SimpleResult::fail(format!("Browser operation failed: {e}"));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => SimpleResult::ok(output),
            Ok(Err(e)) => {
                tracing::error!(action, error = %format!("{e:#}"), "browser step failed");
                SimpleResult::fail(format!("{e:#}"))
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(action, timeout_secs = self.timeout.as_secs_f64(), "browser step timed out");
                SimpleResult::fail(format!(
                    "Browser operation timed out after {} seconds",
                    self.timeout.as_secs_f64()
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                SimpleResult::fail("Browser worker exited without a result")
            }
        }
    }

    /// Async entry point: parks [`Self::run_blocking`] on the blocking pool.
    pub async fn run(&self, endpoint: &str, step: BrowserStep) -> SimpleResult<BrowserStepOutput> {
        let bridge = self.clone();
        let endpoint = endpoint.to_string();
        match tokio::task::spawn_blocking(move || bridge.run_blocking(&endpoint, step)).await {
            Ok(result) => result,
            Err(e) => SimpleResult::fail(format!("Browser operation failed: {e}")),
        }
    }
}

/// Connect, run one step, tear down. Teardown errors are logged and dropped.
async fn drive(
    driver: &dyn BrowserDriver,
    endpoint: &str,
    step: &BrowserStep,
) -> anyhow::Result<BrowserStepOutput> {
    let session = driver
        .connect(endpoint)
        .await
        .context("Failed to connect to browser")?;

    let result = steps::execute(session.as_ref(), step).await;

    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "browser teardown failed");
    }
    result
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory driver.

    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct FakePage {
        pub scripts: Mutex<Vec<String>>,
        pub visited: Mutex<Vec<String>>,
        pub closed: AtomicBool,
        /// Selectors present in the page.
        pub present: Mutex<Vec<String>>,
        pub elements: Mutex<Value>,
        /// Make `close` report an error.
        pub fail_close: AtomicBool,
    }

    impl FakePage {
        pub fn with_selectors(selectors: &[&str]) -> Arc<Self> {
            let page = Self::default();
            *page.present.lock() = selectors.iter().map(|s| s.to_string()).collect();
            Arc::new(page)
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn has(&self, script: &str) -> bool {
            self.present
                .lock()
                .iter()
                .any(|s| script.contains(&serde_json::to_string(s).unwrap_or_default()))
        }
    }

    pub struct FakeDriver {
        pub page: Arc<FakePage>,
        /// Never finish connecting.
        pub hang: bool,
    }

    impl FakeDriver {
        pub fn new(page: Arc<FakePage>) -> Self {
            Self { page, hang: false }
        }

        pub fn hanging() -> Self {
            Self {
                page: Arc::new(FakePage::default()),
                hang: true,
            }
        }
    }

    struct FakeSession(Arc<FakePage>);

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn connect(&self, endpoint: &str) -> anyhow::Result<Box<dyn BrowserSession>> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            anyhow::ensure!(endpoint.starts_with("ws://"), "bad endpoint: {endpoint}");
            Ok(Box::new(FakeSession(Arc::clone(&self.page))))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn goto(&self, url: &str) -> anyhow::Result<()> {
            self.0.visited.lock().push(url.to_string());
            Ok(())
        }

        async fn title(&self) -> anyhow::Result<String> {
            Ok("Example Domain".into())
        }

        async fn url(&self) -> anyhow::Result<String> {
            Ok(self
                .0
                .visited
                .lock()
                .last()
                .cloned()
                .unwrap_or_else(|| "about:blank".into()))
        }

        async fn content(&self) -> anyhow::Result<String> {
            Ok("<html><body>héllo</body></html>".into())
        }

        async fn evaluate(&self, script: &str) -> anyhow::Result<Value> {
            self.0.scripts.lock().push(script.to_string());
            if script.contains("querySelectorAll") {
                return Ok(self.0.elements.lock().clone());
            }
            if script.contains("querySelector(") {
                return Ok(json!(self.0.has(script)));
            }
            Ok(Value::Null)
        }

        async fn screenshot(&self, full_page: bool) -> anyhow::Result<Vec<u8>> {
            Ok(if full_page { vec![0x89, b'P', b'N', b'G', 1, 2] } else { vec![0x89, b'P'] })
        }

        async fn close(&self) -> anyhow::Result<()> {
            self.0.closed.store(true, Ordering::SeqCst);
            anyhow::ensure!(!self.0.fail_close.load(Ordering::SeqCst), "target already detached");
            Ok(())
        }
    }
}
