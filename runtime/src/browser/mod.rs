//! Browser-assisted capture of billing-toggle states.
//!
//! `Loaded -> (TabsLocated | NoTabsFound) -> {Monthly, Yearly}Captured`.
//! The whole pass runs under one deadline. Captures land in a struct owned
//! outside the timed future, so a timeout keeps whatever was captured and
//! the session is closed on every path.

pub mod tabs;
pub mod verify;

use crate::acquisition::page_text::extract_page_text;
use crate::acquisition::structured::{extract_embedded_data, render_embedded, EmbeddedBlock};
use crate::config::{ContentConfig, PricingConfig};
use crate::error::{PricingError, PricingResult};
use crate::model::BillingPeriod;
use crate::renderer::{BrowserSession, Renderer};
use std::time::Duration;
use verify::{capture_state, click_with_verification, CapturedState};

/// Page states gathered by one browser pass.
#[derive(Debug, Clone, Default)]
pub struct BrowserCapture {
    pub default: Option<CapturedState>,
    pub monthly: Option<CapturedState>,
    pub yearly: Option<CapturedState>,
    pub warnings: Vec<String>,
}

impl BrowserCapture {
    fn state_mut(&mut self, period: BillingPeriod) -> &mut Option<CapturedState> {
        match period {
            BillingPeriod::Monthly => &mut self.monthly,
            _ => &mut self.yearly,
        }
    }

    /// Text of the most recent capture, used as the pre-click baseline.
    fn latest_text(&self) -> &str {
        self.yearly
            .as_ref()
            .or(self.monthly.as_ref())
            .or(self.default.as_ref())
            .map(|s| s.text.as_str())
            .unwrap_or("")
    }

    /// Labelled extraction input plus the warnings accrued by the pass.
    pub fn into_content(mut self, config: &ContentConfig) -> (String, Vec<String>) {
        let mut content = String::new();

        if let Some(state) = self.monthly.as_ref().filter(|s| !s.text.is_empty()) {
            content.push_str("=== MONTHLY BILLING STATE (after clicking monthly tab) ===\n");
            content.push_str(&state.text);
            content.push_str("\n\n");
        }
        if let Some(state) = self.yearly.as_ref().filter(|s| !s.text.is_empty()) {
            content.push_str("=== YEARLY/ANNUAL BILLING STATE (after clicking yearly tab) ===\n");
            content.push_str(&state.text);
            content.push_str("\n\n");
        }
        if self.monthly.is_none() && self.yearly.is_none() {
            content.push_str("=== DEFAULT STATE (no tabs clicked) ===\n");
            if let Some(state) = &self.default {
                content.push_str(&state.text);
            }
            self.warnings.push("no_toggle_clicked".to_string());
        }

        let mut blocks: Vec<EmbeddedBlock> = Vec::new();
        for state in [&self.default, &self.yearly, &self.monthly]
            .into_iter()
            .flatten()
        {
            let scripts = extract_page_text(&state.html).scripts;
            for block in extract_embedded_data(&scripts, config) {
                if !blocks.contains(&block) {
                    blocks.push(block);
                }
            }
        }
        if !blocks.is_empty() {
            content.push_str("\n\n--- SCRIPT DATA ---\n");
            content.push_str(&render_embedded(&blocks));
        }

        (content, self.warnings)
    }
}

/// Drives one request-scoped browser session.
pub struct BrowserPass<'a> {
    renderer: &'a dyn Renderer,
    config: &'a PricingConfig,
}

impl<'a> BrowserPass<'a> {
    pub fn new(renderer: &'a dyn Renderer, config: &'a PricingConfig) -> Self {
        Self { renderer, config }
    }

    /// Load `url`, click through the billing tabs, and return what was captured.
    ///
    /// Fails only when not even the default state could be captured.
    pub async fn capture(&self, url: &str) -> PricingResult<BrowserCapture> {
        let mut session = self
            .renderer
            .new_session()
            .await
            .map_err(|e| PricingError::BrowserRenderFailed(e.to_string()))?;

        let mut capture = BrowserCapture::default();
        let deadline = Duration::from_millis(self.config.browser.session_timeout_ms);
        let outcome =
            tokio::time::timeout(deadline, self.drive(session.as_mut(), url, &mut capture)).await;

        if let Err(e) = session.close().await {
            tracing::warn!("failed to close browser session: {e}");
        }

        match outcome {
            Ok(Ok(())) => Ok(capture),
            Ok(Err(e)) => Err(PricingError::BrowserRenderFailed(e.to_string())),
            Err(_) if capture.default.is_some() => {
                tracing::warn!("browser pass timed out; keeping partial capture");
                capture.warnings.push("browser_timeout".to_string());
                Ok(capture)
            }
            Err(_) => Err(PricingError::BrowserRenderFailed(format!(
                "timed out after {}ms",
                deadline.as_millis()
            ))),
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        capture: &mut BrowserCapture,
    ) -> anyhow::Result<()> {
        let browser = &self.config.browser;

        tracing::info!("loading {url} in browser");
        session.navigate(url).await?;
        session
            .wait_visible("body", Duration::from_millis(browser.wait_visible_ms))
            .await?;
        session
            .sleep(Duration::from_millis(browser.load_settle_ms))
            .await;
        let default = capture_state(&*session).await?;
        tracing::debug!("default state captured ({} chars)", default.text.len());
        capture.default = Some(default);

        let raw = match tabs::locate_tabs(&*session, &self.config.tabs).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("tab enumeration failed: {e}");
                Vec::new()
            }
        };
        let selected = tabs::select_tabs(&raw, &self.config.tabs);

        for period in [BillingPeriod::Monthly, BillingPeriod::Yearly] {
            let Some(tab) = selected.get(period) else {
                capture.warnings.push(format!("{period}_toggle_not_found"));
                continue;
            };
            tracing::info!("clicking {period} tab {:?} (score {})", tab.text, tab.score);

            let previous = capture.latest_text().to_string();
            match click_with_verification(
                session,
                &tab.selector,
                period,
                &previous,
                browser,
                &self.config.verify,
            )
            .await
            {
                Some(state) => *capture.state_mut(period) = Some(state),
                None => capture.warnings.push(format!("{period}_toggle_failed")),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(text: &str) -> Option<CapturedState> {
        Some(CapturedState {
            html: format!("<body>{text}</body>"),
            text: text.to_string(),
        })
    }

    #[test]
    fn test_content_sections_for_both_states() {
        let capture = BrowserCapture {
            default: state("default view"),
            monthly: state("Pro $12 billed monthly"),
            yearly: state("Pro $120 billed annually"),
            warnings: vec![],
        };
        let (content, warnings) = capture.into_content(&ContentConfig::default());
        assert!(content.starts_with("=== MONTHLY BILLING STATE"));
        assert!(content.contains("=== YEARLY/ANNUAL BILLING STATE"));
        assert!(!content.contains("DEFAULT STATE"));
        assert!(!content.contains("default view"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_default_section_when_nothing_clicked() {
        let capture = BrowserCapture {
            default: state("Pro $12/mo"),
            warnings: vec!["monthly_toggle_failed".into()],
            ..Default::default()
        };
        let (content, warnings) = capture.into_content(&ContentConfig::default());
        assert!(content.starts_with("=== DEFAULT STATE (no tabs clicked) ===\nPro $12/mo"));
        assert_eq!(warnings, vec!["monthly_toggle_failed", "no_toggle_clicked"]);
    }

    #[test]
    fn test_script_data_deduplicated_across_states() {
        let html = r#"<script id="__NEXT_DATA__">{"price": 10}</script>"#;
        let s = CapturedState {
            html: html.into(),
            text: "Pro".into(),
        };
        let capture = BrowserCapture {
            default: Some(s.clone()),
            yearly: Some(s),
            ..Default::default()
        };
        let (content, _) = capture.into_content(&ContentConfig::default());
        assert_eq!(content.matches("NEXT_DATA:").count(), 1);
        assert!(content.contains("--- SCRIPT DATA ---"));
    }

    #[test]
    fn test_latest_text_prefers_newest_capture() {
        let mut capture = BrowserCapture {
            default: state("default"),
            ..Default::default()
        };
        assert_eq!(capture.latest_text(), "default");
        capture.monthly = state("monthly");
        assert_eq!(capture.latest_text(), "monthly");
    }
}
