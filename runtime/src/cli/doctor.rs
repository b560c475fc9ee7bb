//! `pricescout doctor`: environment readiness check.

use crate::cli::setup;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Report configuration, LLM key, Chromium, and plan-store status.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("PriceScout Doctor");
    println!("=================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let config = match setup::load_config(config_path, false) {
        Ok(config) => {
            println!("[OK] Configuration loaded");
            Some(config)
        }
        Err(e) => {
            println!("[!!] Configuration error: {e:#}");
            None
        }
    };

    let llm_ready = match &config {
        Some(c) if c.llm.api_key.is_some() => {
            println!("[OK] LLM endpoint: {} (model {})", c.llm.api_base, c.llm.model);
            true
        }
        Some(_) => {
            println!("[!!] No LLM API key. Set OPENAI_API_KEY.");
            false
        }
        None => false,
    };

    let configured = config
        .as_ref()
        .and_then(|c| c.browser.chromium_path.as_ref())
        .map(PathBuf::from);
    match configured.or_else(find_chromium) {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Browser pass will be skipped."),
    }
    if matches!(&config, Some(c) if !c.browser.enabled) {
        println!("[--] Browser pass disabled by configuration");
    }

    let store_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".pricescout");
    if store_dir.exists() {
        println!("[OK] Plan store directory: {}", store_dir.display());
    } else {
        println!("[??] Plan store directory not created yet: {}", store_dir.display());
    }

    println!();
    if config.is_some() && llm_ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
