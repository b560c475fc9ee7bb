//! Browser capability used by the re-extraction pass.
//!
//! The pipeline depends only on [`Renderer`] and [`BrowserSession`], so
//! tests can substitute a scripted session and never spawn a browser.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Creates isolated browser sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start a fresh session. The caller must `close` it.
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One isolated page in a headless browser.
///
/// Scripts passed to [`BrowserSession::evaluate_js`] are function
/// declarations; values reach them as typed call arguments, never as text
/// spliced into the script.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and wait for the load to commit.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Wait until the first element matching `selector` is rendered.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;
    /// Pause inside the session.
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
    /// Call `function` with `args` in the page and return its JSON result.
    async fn evaluate_js(
        &self,
        function: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value>;
    /// Inner HTML of the first element matching `selector`.
    async fn inner_html(&self, selector: &str) -> Result<String>;
    /// Rendered text of the first element matching `selector`.
    async fn text(&self, selector: &str) -> Result<String>;
    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<()>;
    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;
    /// Tear the session down.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A renderer used when Chromium is unavailable.
///
/// Static extraction still works; the browser pass reports
/// `browser_render_failed` and the static result is kept.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        Err(anyhow::anyhow!("browser not available (static-only mode)"))
    }
}
