//! Visible text, hidden text, and script payloads from one markup walk.
//!
//! Hidden text matters for pricing pages: the inactive side of a
//! monthly/yearly switch is usually still in the DOM, just concealed or
//! parked in an unselected `role="tabpanel"`.

use scraper::{Html, Node};

/// Tags whose content is never page text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "head", "meta", "link"];

/// Text views derived from a single document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    /// Text a visitor sees in the default state.
    pub visible: String,
    /// Text under concealed elements or alternate tab panels.
    pub hidden: String,
    /// Inline `<script>` bodies, in document order.
    pub scripts: Vec<ScriptBlock>,
}

/// An inline script element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptBlock {
    pub id: Option<String>,
    pub script_type: Option<String>,
    pub body: String,
}

/// Walk the document once and split its text into visible and hidden views.
pub fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    let mut visible: Vec<&str> = Vec::new();
    let mut hidden: Vec<&str> = Vec::new();
    let mut scripts = Vec::new();

    // (node, concealed, alternate). Iterative so deeply nested markup
    // cannot exhaust the stack.
    let mut stack = vec![(document.tree.root(), false, false)];

    while let Some((node, concealed, alternate)) = stack.pop() {
        let (concealed, alternate) = match node.value() {
            Node::Element(el) => {
                let name = el.name();
                if name == "script" {
                    scripts.push(ScriptBlock {
                        id: el.attr("id").map(str::to_string),
                        script_type: el.attr("type").map(str::to_string),
                        body: node
                            .children()
                            .filter_map(|c| c.value().as_text().map(|t| String::from(&**t)))
                            .collect(),
                    });
                    continue;
                }
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                (
                    concealed || is_concealed(el),
                    alternate || is_alternate_state(el),
                )
            }
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    if concealed {
                        hidden.push(t);
                    } else {
                        visible.push(t);
                        if alternate {
                            hidden.push(t);
                        }
                    }
                }
                continue;
            }
            _ => (concealed, alternate),
        };

        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, concealed, alternate));
        }
    }

    PageText {
        visible: collapse_whitespace(&visible.join(" ")),
        hidden: collapse_whitespace(&hidden.join(" ")),
        scripts,
    }
}

/// `aria-hidden="true"`, `hidden`, or inline `display:none`.
fn is_concealed(el: &scraper::node::Element) -> bool {
    if el.attr("aria-hidden") == Some("true") || el.attr("hidden").is_some() {
        return true;
    }
    el.attr("style")
        .map(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none")
        })
        .unwrap_or(false)
}

/// Tab panels and inactive state containers that may hold the other billing view.
fn is_alternate_state(el: &scraper::node::Element) -> bool {
    el.attr("role") == Some("tabpanel")
        || matches!(el.attr("data-state"), Some("inactive") | Some("hidden"))
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `s` to at most `max_chars` characters. Returns `None` if nothing was cut.
pub fn clip(s: &str, max_chars: usize) -> Option<&str> {
    s.char_indices().nth(max_chars).map(|(idx, _)| &s[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
        <html><head><title>Pricing</title><style>.x{}</style></head>
        <body>
          <h1>Simple pricing</h1>
          <div role="tablist"><button role="tab" aria-selected="true">Monthly</button></div>
          <div role="tabpanel"><p>Pro $12 per month</p></div>
          <div hidden><p>Pro $120 per year</p></div>
          <div style="display: none">Team $200 billed annually</div>
          <span aria-hidden="true">decorative</span>
          <noscript>enable js</noscript>
          <script id="__NEXT_DATA__" type="application/json">{"plans":[]}</script>
        </body></html>"#;

    #[test]
    fn test_visible_excludes_concealed() {
        let t = extract_page_text(PAGE);
        assert!(t.visible.contains("Simple pricing"));
        assert!(t.visible.contains("Pro $12 per month"));
        assert!(!t.visible.contains("$120"));
        assert!(!t.visible.contains("Team $200"));
        assert!(!t.visible.contains("decorative"));
        assert!(!t.visible.contains("enable js"));
        assert!(!t.visible.contains("Pricing"), "head content is skipped");
    }

    #[test]
    fn test_hidden_collects_concealed_and_tabpanels() {
        let t = extract_page_text(PAGE);
        assert!(t.hidden.contains("Pro $120 per year"));
        assert!(t.hidden.contains("Team $200 billed annually"));
        assert!(t.hidden.contains("Pro $12 per month"));
        assert!(!t.hidden.contains("Simple pricing"));
    }

    #[test]
    fn test_scripts_captured_not_rendered() {
        let t = extract_page_text(PAGE);
        assert_eq!(t.scripts.len(), 1);
        assert_eq!(t.scripts[0].id.as_deref(), Some("__NEXT_DATA__"));
        assert_eq!(t.scripts[0].body, r#"{"plans":[]}"#);
        assert!(!t.visible.contains("plans"));
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let html = format!("{}deep{}", "<div>".repeat(5000), "</div>".repeat(5000));
        assert_eq!(extract_page_text(&html).visible, "deep");
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("héllo", 2), Some("hé"));
        assert_eq!(clip("abc", 3), None);
    }
}
