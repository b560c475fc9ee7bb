//! Embedded structured data from client-side injection patterns.
//!
//! Many pricing pages are rendered by a JS framework whose initial state is
//! serialized into the page. Three shapes are recognised:
//!
//! 1. `<script id="__NEXT_DATA__">` (Next.js initial props)
//! 2. `<script type="application/ld+json">` (linked data, often `Offer`s)
//! 3. `window.__NUXT__ = ...` (Nuxt global state)
//!
//! Each payload is size-capped and only kept if it mentions pricing.

use super::page_text::{clip, ScriptBlock};
use crate::config::ContentConfig;
use regex::Regex;
use std::sync::OnceLock;

/// Which injection pattern produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    NextData,
    LdJson,
    Nuxt,
}

impl EmbeddedKind {
    fn label(&self) -> &'static str {
        match self {
            EmbeddedKind::NextData => "NEXT_DATA",
            EmbeddedKind::LdJson => "LD+JSON",
            EmbeddedKind::Nuxt => "NUXT_DATA",
        }
    }
}

/// A pricing-relevant embedded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    pub kind: EmbeddedKind,
    pub payload: String,
}

fn nuxt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"window\.__NUXT__\s*=\s*([\s\S]+?);?\s*$").expect("nuxt regex is valid")
    })
}

/// Pick out pricing-relevant payloads from a page's inline scripts.
pub fn extract_embedded_data(scripts: &[ScriptBlock], config: &ContentConfig) -> Vec<EmbeddedBlock> {
    let mut blocks = Vec::new();

    for script in scripts {
        let body = script.body.trim();
        if body.is_empty() {
            continue;
        }

        let candidate = if script.id.as_deref() == Some("__NEXT_DATA__") {
            Some((EmbeddedKind::NextData, body, config.embedded_raw_cap))
        } else if script
            .script_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("application/ld+json"))
            .unwrap_or(false)
        {
            Some((EmbeddedKind::LdJson, body, config.ld_json_cap))
        } else {
            nuxt_regex()
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| (EmbeddedKind::Nuxt, m.as_str(), config.embedded_raw_cap))
        };

        let Some((kind, payload, raw_cap)) = candidate else {
            continue;
        };
        if payload.chars().count() > raw_cap {
            tracing::debug!("skipping oversized {} payload", kind.label());
            continue;
        }
        if let Some(filtered) = prefilter(payload, config) {
            blocks.push(EmbeddedBlock {
                kind,
                payload: filtered,
            });
        }
    }

    blocks
}

/// Keep a payload only if it mentions pricing, truncated to the filtered cap.
fn prefilter(payload: &str, config: &ContentConfig) -> Option<String> {
    let lower = payload.to_lowercase();
    let mentions_pricing = config
        .embedded_keywords
        .iter()
        .any(|kw| lower.contains(kw.as_str()));
    if !mentions_pricing {
        return None;
    }

    Some(match clip(payload, config.embedded_filtered_cap) {
        Some(head) => format!("{head}...[truncated]"),
        None => payload.to_string(),
    })
}

/// Render blocks as labelled lines for the extraction input.
pub fn render_embedded(blocks: &[EmbeddedBlock]) -> String {
    blocks
        .iter()
        .map(|b| format!("{}: {}", b.kind.label(), b.payload))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::page_text::extract_page_text;

    fn scripts(html: &str) -> Vec<ScriptBlock> {
        extract_page_text(html).scripts
    }

    #[test]
    fn test_next_data_with_pricing_kept() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">
            {"props":{"plans":[{"name":"Pro","price":12}]}}</script>"#;
        let blocks = extract_embedded_data(&scripts(html), &ContentConfig::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, EmbeddedKind::NextData);
        assert!(render_embedded(&blocks).starts_with("NEXT_DATA: "));
    }

    #[test]
    fn test_payload_without_keywords_dropped() {
        let html = r#"<script type="application/ld+json">{"@type":"Organization","name":"Acme"}</script>"#;
        assert!(extract_embedded_data(&scripts(html), &ContentConfig::default()).is_empty());
    }

    #[test]
    fn test_nuxt_assignment() {
        let html = r#"<script>window.__NUXT__ = {"state":{"billing":"monthly"}};</script>"#;
        let blocks = extract_embedded_data(&scripts(html), &ContentConfig::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, EmbeddedKind::Nuxt);
        assert_eq!(blocks[0].payload, r#"{"state":{"billing":"monthly"}}"#);
    }

    #[test]
    fn test_filtered_cap_truncates() {
        let big = format!(r#"{{"price": "{}"}}"#, "x".repeat(8_000));
        let html = format!(r#"<script id="__NEXT_DATA__">{big}</script>"#);
        let blocks = extract_embedded_data(&scripts(&html), &ContentConfig::default());
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].payload.ends_with("...[truncated]"));
        assert!(blocks[0].payload.len() < 5_100);
    }

    #[test]
    fn test_raw_cap_skips_payload() {
        let huge = format!(r#"{{"price": "{}"}}"#, "x".repeat(60_000));
        let html = format!(r#"<script id="__NEXT_DATA__">{huge}</script>"#);
        assert!(extract_embedded_data(&scripts(&html), &ContentConfig::default()).is_empty());
    }

    #[test]
    fn test_unrelated_inline_script_ignored() {
        let html = r#"<script>console.log("monthly price");</script>"#;
        assert!(extract_embedded_data(&scripts(html), &ContentConfig::default()).is_empty());
    }
}
