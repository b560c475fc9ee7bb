//! The browser pass driven against a scripted session.

mod common;

use common::*;
use pricescout_runtime::browser::BrowserPass;
use pricescout_runtime::config::ContentConfig;
use pricescout_runtime::error::PricingError;
use pricescout_runtime::renderer::NoopRenderer;
use std::collections::HashMap;

const URL: &str = "https://acme.test/pricing";

#[tokio::test]
async fn test_timeout_keeps_default_capture() {
    let script = PageScript {
        url: URL.to_string(),
        initial: PageState::text("Starter $10 per month"),
        tabs: monthly_yearly_tabs(),
        hang_on_click: true,
        ..Default::default()
    };
    let renderer = ScriptedRenderer::new(script);
    let mut config = test_config();
    config.browser.session_timeout_ms = 200;

    let capture = BrowserPass::new(&renderer, &config)
        .capture(URL)
        .await
        .unwrap();

    assert!(capture.default.is_some());
    assert!(capture.monthly.is_none());
    assert_eq!(capture.warnings, vec!["browser_timeout"]);
    assert_eq!(renderer.closed(), 1);

    let (content, warnings) = capture.into_content(&ContentConfig::default());
    assert!(content.contains("=== DEFAULT STATE (no tabs clicked) ===\nStarter $10 per month"));
    assert_eq!(warnings, vec!["browser_timeout", "no_toggle_clicked"]);
}

#[tokio::test]
async fn test_url_switch_verifies_click() {
    // Same text before and after, but the page URL names the period.
    let script = PageScript {
        url: "https://acme.test/pricing?billing=yearly".to_string(),
        initial: PageState::text("Starter 10. Pro 20."),
        tabs: monthly_yearly_tabs(),
        ..Default::default()
    };
    let renderer = ScriptedRenderer::new(script);
    let config = test_config();

    let capture = BrowserPass::new(&renderer, &config)
        .capture(URL)
        .await
        .unwrap();

    assert!(capture.monthly.is_none());
    assert!(capture.yearly.is_some());
    assert_eq!(capture.warnings, vec!["monthly_toggle_failed"]);
}

#[tokio::test]
async fn test_large_text_change_verifies_click() {
    let words = |prefix: &str| {
        (0..40)
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let script = PageScript {
        url: URL.to_string(),
        initial: PageState::text(&words("m")),
        tabs: monthly_yearly_tabs(),
        on_click: HashMap::from([(
            "[data-pricescout-tab=\"1\"]".to_string(),
            PageState::text(&words("y")),
        )]),
        ..Default::default()
    };
    let renderer = ScriptedRenderer::new(script);
    let config = test_config();

    let capture = BrowserPass::new(&renderer, &config)
        .capture(URL)
        .await
        .unwrap();

    assert_eq!(capture.yearly.map(|s| s.text), Some(words("y")));
    assert_eq!(capture.warnings, vec!["monthly_toggle_failed"]);
}

#[tokio::test]
async fn test_session_failure_is_render_error() {
    let config = test_config();
    let err = BrowserPass::new(&NoopRenderer, &config)
        .capture(URL)
        .await
        .unwrap_err();
    assert!(matches!(err, PricingError::BrowserRenderFailed(_)));
    assert_eq!(err.warning_code(), Some("browser_render_failed"));
}
