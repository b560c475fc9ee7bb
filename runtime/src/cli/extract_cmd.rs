//! `pricescout extract <url>`: extract plans from one pricing page.

use crate::cli::{output, setup};
use anyhow::{bail, Result};
use std::path::Path;

pub async fn run(config_path: Option<&Path>, pricing_url: &str, no_browser: bool) -> Result<()> {
    let config = setup::load_config(config_path, no_browser)?;
    if config.llm.api_key.is_none() {
        bail!("no LLM API key configured; set OPENAI_API_KEY or llm.api_key in the config file");
    }
    let service = setup::build_service(config)?;

    let resp = service.extract_pricing(pricing_url).await;
    output::print_json(&resp);

    if let Some(err) = &resp.error {
        bail!("extraction failed: {err}");
    }
    if !output::is_quiet() {
        eprintln!(
            "  {} plans, periods [{}], render_used={}, {} warnings",
            resp.plans.len(),
            resp.detected_periods
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            resp.render_used,
            resp.warnings.len(),
        );
    }
    Ok(())
}
