//! Chromium-based browser sessions using chromiumoxide.
//!
//! Every session launches its own headless browser with a throwaway
//! profile directory, so concurrent requests share no browser state.

use super::{BrowserSession, Renderer};
use crate::config::BrowserConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::cdp::js_protocol::runtime::{CallArgument, CallFunctionOnParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

const VISIBLE_JS: &str = r#"function(selector) {
    const el = document.querySelector(selector);
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 || rect.height > 0;
}"#;

const INNER_HTML_JS: &str = r#"function(selector) {
    const el = document.querySelector(selector);
    return el ? el.innerHTML : null;
}"#;

const TEXT_JS: &str = r#"function(selector) {
    const el = document.querySelector(selector);
    return el ? (el.innerText || el.textContent || '') : null;
}"#;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. PRICESCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("PRICESCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.pricescout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".pricescout/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricescout/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".pricescout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".pricescout/chromium/chrome-linux64/chrome"),
                home.join(".pricescout/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Launches one headless Chromium per session.
pub struct ChromiumRenderer {
    executable: PathBuf,
    navigate_timeout: Duration,
}

impl ChromiumRenderer {
    /// Resolve the executable; fails if Chromium cannot be found.
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let executable = config
            .chromium_path
            .as_ref()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .or_else(find_chromium)
            .context("Chromium not found. Set PRICESCOUT_CHROMIUM_PATH or install Chrome.")?;
        Ok(Self {
            executable,
            navigate_timeout: Duration::from_millis(config.navigate_timeout_ms),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        let profile_dir =
            std::env::temp_dir().join(format!("pricescout-{}", uuid::Uuid::new_v4()));

        let config = LaunchConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(&profile_dir)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .arg("--hide-scrollbars")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let session = ChromiumSession::detached(browser, handler_task, profile_dir);
                let _ = Box::new(session).close().await;
                bail!("failed to create page: {e}");
            }
        };

        tracing::debug!("launched browser session ({})", profile_dir.display());
        Ok(Box::new(ChromiumSession {
            browser,
            page: Some(page),
            handler_task,
            profile_dir,
            navigate_timeout: self.navigate_timeout,
        }))
    }
}

/// A single browser with one page.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
    navigate_timeout: Duration,
}

impl ChromiumSession {
    fn detached(browser: Browser, handler_task: JoinHandle<()>, profile_dir: PathBuf) -> Self {
        Self {
            browser,
            page: None,
            handler_task,
            profile_dir,
            navigate_timeout: Duration::ZERO,
        }
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("session has no page")
    }

    async fn call(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        let arguments: Vec<CallArgument> = args
            .into_iter()
            .map(|v| CallArgument::builder().value(v).build())
            .collect();
        let params = CallFunctionOnParams::builder()
            .function_declaration(function)
            .arguments(arguments)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid function call: {e}"))?;

        let result = self
            .page()?
            .evaluate_function(params)
            .await
            .context("JS execution failed")?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn call_string(&self, function: &str, selector: &str) -> Result<String> {
        match self.call(function, vec![Value::from(selector)]).await? {
            Value::String(s) => Ok(s),
            _ => bail!("no element matches {selector}"),
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(self.navigate_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {
                if let Err(e) = page.wait_for_navigation().await {
                    tracing::debug!("wait for navigation to {url} failed: {e}");
                }
                Ok(())
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!(
                "navigation timed out after {}ms",
                self.navigate_timeout.as_millis()
            ),
        }
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.call(VISIBLE_JS, vec![Value::from(selector)]).await? == Value::Bool(true) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("{selector} not visible after {}ms", timeout.as_millis());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn evaluate_js(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        self.call(function, args).await
    }

    async fn inner_html(&self, selector: &str) -> Result<String> {
        self.call_string(INNER_HTML_JS, selector).await
    }

    async fn text(&self, selector: &str) -> Result<String> {
        self.call_string(TEXT_JS, selector).await
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches {selector}"))?;
        element.click().await.context("click failed")?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page()?
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default())
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!("failed to remove {}: {e}", self.profile_dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_session_round_trip() {
        let renderer = ChromiumRenderer::new(&BrowserConfig::default())
            .expect("chromium not found");
        let mut session = renderer
            .new_session()
            .await
            .expect("failed to create session");

        session
            .navigate("data:text/html,<button id='m'>Monthly</button><p>Pro $10/mo</p>")
            .await
            .expect("navigation failed");
        session
            .wait_visible("body", Duration::from_secs(5))
            .await
            .expect("body not visible");

        let text = session.text("body").await.expect("text failed");
        assert!(text.contains("Pro $10/mo"));

        let echoed = session
            .evaluate_js("function(a, b) { return a + b; }", vec![Value::from(2), Value::from(3)])
            .await
            .expect("JS execution failed");
        assert_eq!(echoed, Value::from(5));

        session.click("#m").await.expect("click failed");
        session.close().await.expect("close failed");
    }
}
