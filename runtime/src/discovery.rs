//! Pricing-page discovery from a site root.
//!
//! Two sources, merged and deduplicated:
//! 1. Well-known paths probed with HEAD; earlier paths score higher.
//! 2. Homepage anchors whose URL or text mentions a pricing keyword, at a
//!    flat lower score.
//!
//! A failed homepage fetch only drops the second source.

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::page_text::collapse_whitespace;
use crate::acquisition::url_guard::validate_url;
use crate::config::DiscoveryConfig;
use scraper::{Html, Selector};
use url::Url;

/// A scored candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub score: i32,
}

/// An anchor found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL, fragment removed.
    pub url: String,
    pub text: String,
}

/// Probe and scan `site`, returning candidates best first.
pub async fn discover_candidates(
    http: &HttpClient,
    site: &Url,
    config: &DiscoveryConfig,
    allow_private: bool,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for (idx, path) in config.common_paths.iter().enumerate() {
        let Ok(probe) = site.join(path) else {
            continue;
        };
        if http.exists(probe.as_str()).await {
            let score = config.path_probe_base - config.path_probe_decay * idx as i32;
            tracing::debug!("path probe hit {probe} (score {score})");
            push_unique(&mut candidates, probe.to_string(), score);
        }
    }

    match http.fetch_page(site.as_str()).await {
        Ok(page) => {
            let base = Url::parse(&page.final_url).unwrap_or_else(|_| site.clone());
            for link in extract_links(&page.html, &base) {
                if !is_pricing_link(&link, &config.link_keywords) {
                    continue;
                }
                if validate_url(&link.url, allow_private).is_err() {
                    continue;
                }
                if !same_site(site, &link.url) {
                    continue;
                }
                push_unique(&mut candidates, link.url, config.link_score);
            }
        }
        Err(e) => tracing::warn!("homepage fetch failed for {site}: {e}"),
    }

    rank(candidates, config.max_candidates)
}

/// Stable sort by descending score, then cap.
pub fn rank(mut candidates: Vec<Candidate>, max: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates.truncate(max);
    candidates
}

fn push_unique(candidates: &mut Vec<Candidate>, url: String, score: i32) {
    if !candidates.iter().any(|c| c.url == url) {
        candidates.push(Candidate { url, score });
    }
}

/// All `<a href>` targets resolved against `base`.
pub fn extract_links(html: &str, base: &Url) -> Vec<PageLink> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("anchor selector is valid");

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') {
                return None;
            }
            let mut resolved = base.join(href).ok()?;
            resolved.set_fragment(None);
            Some(PageLink {
                url: resolved.to_string(),
                text: collapse_whitespace(&el.text().collect::<String>()),
            })
        })
        .collect()
}

/// Keywords are matched against the path, query and anchor text. The host
/// is left out so a site named "proton" or "planetscale" does not turn every
/// link into a candidate.
fn is_pricing_link(link: &PageLink, keywords: &[String]) -> bool {
    let Ok(url) = Url::parse(&link.url) else {
        return false;
    };
    let haystack = format!(
        "{}?{} {}",
        url.path(),
        url.query().unwrap_or(""),
        link.text
    )
    .to_lowercase();
    keywords.iter().any(|kw| haystack.contains(kw.as_str()))
}

/// Same host, or a subdomain of the site's registrable-looking host.
fn same_site(site: &Url, candidate: &str) -> bool {
    let (Some(site_host), Ok(candidate)) = (site.host_str(), Url::parse(candidate)) else {
        return false;
    };
    let Some(host) = candidate.host_str() else {
        return false;
    };
    let root = site_host.trim_start_matches("www.");
    host == site_host || host == root || host.ends_with(&format!(".{root}"))
}
