//! Billing-tab location and scoring.
//!
//! Candidates are enumerated in the page in priority order (ARIA tabs,
//! tablist children, buttons, labels). Each element is tagged with a
//! `data-pricescout-tab` index so it can be clicked by a stable selector.

use crate::config::TabScoringConfig;
use crate::model::BillingPeriod;
use crate::renderer::BrowserSession;
use serde::Deserialize;
use serde_json::Value;

/// Enumerates candidates. Argument: lowercase hint substrings for
/// buttons/labels. Returns `[{selector, text, ariaSelected, kind}]`.
pub const LOCATE_TABS_JS: &str = r#"function(hints) {
    const out = [];
    let next = 0;
    const matches = (el) => {
        const t = (el.textContent || '').toLowerCase();
        return hints.some((h) => t.includes(h));
    };
    const add = (el, kind) => {
        if (el.hasAttribute('data-pricescout-tab')) return;
        const id = String(next++);
        el.setAttribute('data-pricescout-tab', id);
        out.push({
            selector: '[data-pricescout-tab="' + id + '"]',
            text: (el.textContent || '').trim(),
            ariaSelected: el.getAttribute('aria-selected'),
            kind: kind,
        });
    };
    document.querySelectorAll('[role="tab"]').forEach((el) => add(el, 'role-tab'));
    document.querySelectorAll('[role="tablist"] > *').forEach((el) => add(el, 'tablist-child'));
    document.querySelectorAll('button').forEach((el) => { if (matches(el)) add(el, 'button'); });
    document.querySelectorAll('label').forEach((el) => { if (matches(el)) add(el, 'label'); });
    return out;
}"#;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabKind {
    RoleTab,
    TablistChild,
    Button,
    Label,
}

/// A candidate as reported by the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTab {
    pub selector: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "ariaSelected")]
    pub aria_selected: Option<String>,
    pub kind: TabKind,
}

/// A scored candidate. At most one of `is_monthly`/`is_yearly` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabCandidate {
    pub selector: String,
    pub text: String,
    pub score: i32,
    pub is_monthly: bool,
    pub is_yearly: bool,
}

/// Best candidate per side, chosen independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedTabs {
    pub monthly: Option<TabCandidate>,
    pub yearly: Option<TabCandidate>,
}

impl SelectedTabs {
    pub fn get(&self, period: BillingPeriod) -> Option<&TabCandidate> {
        match period {
            BillingPeriod::Monthly => self.monthly.as_ref(),
            BillingPeriod::Yearly => self.yearly.as_ref(),
            BillingPeriod::Unknown => None,
        }
    }
}

/// `keyword_hit` per keyword contained in the text, plus `exact_match_bonus`
/// when the whole text is that keyword.
pub fn score_text(text: &str, keywords: &[String], config: &TabScoringConfig) -> i32 {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    keywords
        .iter()
        .filter(|kw| normalized.contains(kw.as_str()))
        .map(|kw| {
            if normalized == *kw {
                config.keyword_hit + config.exact_match_bonus
            } else {
                config.keyword_hit
            }
        })
        .sum()
}

/// Score one candidate for both sides and resolve ambiguity.
///
/// ARIA bonuses only lift a side the text already matches. When both sides
/// match, the lower one is dropped; a tie goes to yearly.
pub fn score_tab(tab: &RawTab, config: &TabScoringConfig) -> TabCandidate {
    let bonus = if tab.kind == TabKind::RoleTab {
        config.aria_tab_bonus
    } else {
        0
    } + if tab.aria_selected.is_some() {
        config.aria_selected_bonus
    } else {
        0
    };

    let lift = |raw: i32| if raw > 0 { raw + bonus } else { 0 };
    let mut monthly = lift(score_text(&tab.text, &config.monthly_keywords, config));
    let mut yearly = lift(score_text(&tab.text, &config.yearly_keywords, config));

    if monthly > 0 && yearly > 0 {
        if monthly > yearly {
            yearly = 0;
        } else {
            monthly = 0;
        }
    }

    TabCandidate {
        selector: tab.selector.clone(),
        text: tab.text.clone(),
        score: monthly.max(yearly),
        is_monthly: monthly > 0,
        is_yearly: yearly > 0,
    }
}

/// Highest-scoring candidate per side; the earliest wins ties.
pub fn select_tabs(tabs: &[RawTab], config: &TabScoringConfig) -> SelectedTabs {
    let mut selected = SelectedTabs::default();
    for candidate in tabs.iter().map(|t| score_tab(t, config)) {
        tracing::debug!(
            "tab candidate {:?} score={} monthly={} yearly={}",
            candidate.text,
            candidate.score,
            candidate.is_monthly,
            candidate.is_yearly
        );
        let slot = if candidate.is_monthly {
            &mut selected.monthly
        } else if candidate.is_yearly {
            &mut selected.yearly
        } else {
            continue;
        };
        if slot.as_ref().map_or(true, |best| candidate.score > best.score) {
            *slot = Some(candidate);
        }
    }
    selected
}

/// Enumerate candidates in the live page.
pub async fn locate_tabs(
    session: &dyn BrowserSession,
    config: &TabScoringConfig,
) -> anyhow::Result<Vec<RawTab>> {
    let hints = Value::from(config.candidate_hints.clone());
    let raw = session.evaluate_js(LOCATE_TABS_JS, vec![hints]).await?;
    Ok(serde_json::from_value(raw)?)
}
