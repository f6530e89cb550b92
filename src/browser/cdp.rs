//! Chrome DevTools Protocol driver.

use super::{BrowserDriver, BrowserSession};
use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Attaches to an already-running browser over its DevTools WebSocket.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpDriver;

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn connect(&self, endpoint: &str) -> anyhow::Result<Box<dyn BrowserSession>> {
        tracing::debug!(endpoint, "connecting to remote browser");
        let (mut browser, mut handler) = Browser::connect(endpoint)
            .await
            .with_context(|| format!("failed to connect to browser at {endpoint}"))?;

        let events = tokio::spawn(async move {
            while handler.next().await.is_some() {}
            tracing::debug!("browser event handler exited (connection closed)");
        });

        match first_page(&mut browser).await {
            Ok(page) => Ok(Box::new(CdpSession {
                _browser: browser,
                page,
                events,
            })),
            Err(e) => {
                events.abort();
                Err(e)
            }
        }
    }
}

/// Reuse the first open page; open a blank one when there is none.
async fn first_page(browser: &mut Browser) -> anyhow::Result<Page> {
    if let Err(e) = browser.fetch_targets().await {
        tracing::debug!(error = %e, "failed to fetch existing targets");
    }
    let pages = browser.pages().await.context("failed to list pages")?;
    if let Some(page) = pages.into_iter().next() {
        tracing::debug!("reusing existing page");
        return Ok(page);
    }
    browser
        .new_page("about:blank")
        .await
        .context("failed to open a page")
}

struct CdpSession {
    _browser: Browser,
    page: Page,
    events: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn title(&self) -> anyhow::Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn url(&self) -> anyhow::Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> anyhow::Result<String> {
        Ok(self.page.content().await?)
    }

    async fn evaluate(&self, script: &str) -> anyhow::Result<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self, full_page: bool) -> anyhow::Result<Vec<u8>> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(full_page)
                    .build(),
            )
            .await?;
        Ok(bytes)
    }

    /// Dropping the handler closes the WebSocket; the remote browser keeps
    /// running for the next call.
    async fn close(&self) -> anyhow::Result<()> {
        self.events.abort();
        Ok(())
    }
}
