//! Static billing-toggle heuristic.
//!
//! Deliberately permissive: a missed toggle silently drops a whole billing
//! period, while a false positive only costs a browser pass.

use crate::config::ToggleConfig;

/// What the detector saw on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleSignal {
    /// Distinct indicator phrases present.
    pub indicator_hits: usize,
    /// Whether a tab/switch marker appears in the markup.
    pub structural: bool,
    /// Final decision.
    pub detected: bool,
}

/// Decide whether a page probably has a monthly/yearly switch.
pub fn detect_toggle(visible_text: &str, raw_html: &str, config: &ToggleConfig) -> ToggleSignal {
    let haystack = format!("{visible_text} {raw_html}").to_lowercase();

    let indicator_hits = config
        .indicators
        .iter()
        .filter(|ind| haystack.contains(ind.as_str()))
        .count();
    let structural = config
        .structural_markers
        .iter()
        .any(|marker| raw_html.contains(marker.as_str()));

    let detected = indicator_hits >= config.min_indicators
        || (indicator_hits >= config.min_indicators_with_tabs && structural);

    tracing::debug!(indicator_hits, structural, detected, "toggle detection");
    ToggleSignal {
        indicator_hits,
        structural,
        detected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ToggleConfig {
        ToggleConfig::default()
    }

    #[test]
    fn test_two_indicators_detect() {
        let s = detect_toggle("Pay monthly or pay annually and save 20%", "", &cfg());
        assert!(s.detected);
        assert!(s.indicator_hits >= 2);
    }

    #[test]
    fn test_single_indicator_with_tablist() {
        let html = r#"<div role="tablist"><button role="tab">Plans</button></div>"#;
        let s = detect_toggle("Starter $9/mo", html, &cfg());
        assert_eq!(s.indicator_hits, 1);
        assert!(s.structural);
        assert!(s.detected);
    }

    #[test]
    fn test_single_indicator_alone_is_not_enough() {
        let s = detect_toggle("Starter $9/mo", "<div>Starter</div>", &cfg());
        assert_eq!(s.indicator_hits, 1);
        assert!(!s.structural);
        assert!(!s.detected);
    }

    #[test]
    fn test_plain_page() {
        let s = detect_toggle("About our company", "<p>About our company</p>", &cfg());
        assert_eq!(s.indicator_hits, 0);
        assert!(!s.detected);
    }

    #[test]
    fn test_case_insensitive_indicators() {
        assert!(detect_toggle("BILLED ANNUALLY, Pay Monthly", "", &cfg()).detected);
    }
}
