//! `pricescout discover <url>`: propose pricing-page URLs for a site.

use crate::cli::{output, setup};
use anyhow::{bail, Result};
use std::path::Path;

pub async fn run(config_path: Option<&Path>, website_url: &str) -> Result<()> {
    let config = setup::load_config(config_path, true)?;
    let service = setup::build_service(config)?;

    let resp = service.discover_pricing_page(website_url).await;
    output::print_json(&resp);

    if let Some(err) = resp.error {
        bail!("discovery failed: {err}");
    }
    if resp.pricing_candidates.is_empty() && !output::is_quiet() {
        eprintln!("  No pricing page candidates found for {website_url}.");
    }
    Ok(())
}
