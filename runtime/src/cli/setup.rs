//! Process-level wiring: logging, configuration, and the browser backend.

use crate::config::PricingConfig;
use crate::pipeline::PricingService;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{NoopRenderer, Renderer};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Logs go to stderr so stdout stays JSON.
pub fn init_tracing(verbose: bool, json_logs: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pricescout_runtime={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) is harmless.
    let _ = if json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Load configuration, optionally forcing the browser pass off.
pub fn load_config(path: Option<&Path>, no_browser: bool) -> Result<Arc<PricingConfig>> {
    let mut config = PricingConfig::load(path).context("failed to load configuration")?;
    if no_browser {
        config.browser.enabled = false;
    }
    Ok(Arc::new(config))
}

/// Chromium when enabled and installed, otherwise the no-op renderer.
pub fn build_renderer(config: &PricingConfig) -> Arc<dyn Renderer> {
    if !config.browser.enabled {
        return Arc::new(NoopRenderer);
    }
    match ChromiumRenderer::new(&config.browser) {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            tracing::warn!("browser pass unavailable: {e:#}");
            Arc::new(NoopRenderer)
        }
    }
}

/// A ready-to-use service backed by the configured LLM and browser.
pub fn build_service(config: Arc<PricingConfig>) -> Result<PricingService> {
    let renderer = build_renderer(&config);
    PricingService::with_openai(config, renderer).context("failed to build pricing service")
}
