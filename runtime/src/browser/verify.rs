//! Click-and-verify for billing tabs.
//!
//! A click counts only if one of these layered checks passes:
//! text changed enough, the new text carries a billing phrase for the
//! clicked side, a selected ARIA tab names that side, or the URL does.

use crate::config::{BrowserConfig, VerifyConfig};
use crate::model::BillingPeriod;
use crate::renderer::BrowserSession;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Argument: `"monthly"` or `"yearly"`. True if a selected ARIA tab's text
/// names that side.
pub const ARIA_SELECTED_JS: &str = r#"function(period) {
    const tabs = document.querySelectorAll('[role="tab"][aria-selected="true"]');
    for (const tab of tabs) {
        const text = (tab.textContent || '').toLowerCase();
        if (period === 'monthly' && (text.includes('month') || text.includes('/mo'))) return true;
        if (period === 'yearly' && (text.includes('year') || text.includes('annual'))) return true;
    }
    return false;
}"#;

/// Markup and rendered text of one page state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedState {
    pub html: String,
    pub text: String,
}

/// Jaccard similarity of the lowercase word sets. Two empty texts are identical.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let words_a: HashSet<&str> = lower_a.split_whitespace().collect();
    let words_b: HashSet<&str> = lower_b.split_whitespace().collect();

    match (words_a.is_empty(), words_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let shared = words_a.intersection(&words_b).count();
    let union = words_a.len() + words_b.len() - shared;
    shared as f64 / union as f64
}

fn indicators<'a>(period: BillingPeriod, config: &'a VerifyConfig) -> &'a [String] {
    match period {
        BillingPeriod::Monthly => &config.monthly_indicators,
        BillingPeriod::Yearly => &config.yearly_indicators,
        BillingPeriod::Unknown => &[],
    }
}

/// Did the page actually switch to `period`?
pub async fn verify_state_change(
    session: &dyn BrowserSession,
    new_text: &str,
    previous_text: &str,
    period: BillingPeriod,
    config: &VerifyConfig,
) -> bool {
    if new_text != previous_text && new_text.chars().count() > config.min_diff_text_chars {
        let similarity = text_similarity(previous_text, new_text);
        tracing::debug!("{period} click: text similarity {similarity:.3}");
        if similarity < config.similarity_threshold {
            return true;
        }
    }

    let lower = new_text.to_lowercase();
    if indicators(period, config)
        .iter()
        .any(|ind| lower.contains(ind.as_str()))
    {
        tracing::debug!("{period} click: billing phrase present");
        return true;
    }

    match session
        .evaluate_js(ARIA_SELECTED_JS, vec![Value::from(period.as_str())])
        .await
    {
        Ok(Value::Bool(true)) => {
            tracing::debug!("{period} click: selected ARIA tab matches");
            return true;
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("aria check failed: {e}"),
    }

    match session.current_url().await {
        Ok(url) if url.to_lowercase().contains(period.as_str()) => {
            tracing::debug!("{period} click: URL carries billing type");
            true
        }
        _ => false,
    }
}

/// Click `selector` up to `max_click_attempts` times until the state change
/// verifies. Returns the captured state, or `None` if every attempt failed.
pub async fn click_with_verification(
    session: &mut dyn BrowserSession,
    selector: &str,
    period: BillingPeriod,
    previous_text: &str,
    browser: &BrowserConfig,
    verify: &VerifyConfig,
) -> Option<CapturedState> {
    let settle = Duration::from_millis(browser.click_settle_ms);

    for attempt in 1..=verify.max_click_attempts {
        if let Err(e) = session.click(selector).await {
            tracing::debug!("{period} click attempt {attempt} failed: {e}");
            continue;
        }
        session.sleep(settle).await;

        let captured = match capture_state(&*session).await {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!("capture after {period} click failed: {e}");
                continue;
            }
        };

        if verify_state_change(&*session, &captured.text, previous_text, period, verify).await {
            tracing::info!("{period} tab verified on attempt {attempt}");
            return Some(captured);
        }
        tracing::debug!("{period} click attempt {attempt} changed nothing");
    }

    tracing::warn!("{period} tab could not be verified after {} attempts", verify.max_click_attempts);
    None
}

/// Current `<html>` markup and `<body>` text.
pub async fn capture_state(session: &dyn BrowserSession) -> anyhow::Result<CapturedState> {
    Ok(CapturedState {
        html: session.inner_html("html").await?,
        text: session.text("body").await?,
    })
}
