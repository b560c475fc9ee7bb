//! Runtime configuration.
//!
//! Every threshold, keyword list and scoring constant the pipeline uses lives
//! here so heuristics can be recalibrated without touching control flow.
//!
//! Resolution order:
//! 1. Built-in defaults
//! 2. JSON file from `--config` or `PRICESCOUT_CONFIG` (partial files are fine)
//! 3. Environment overrides (`OPENAI_API_KEY`, `PRICESCOUT_LLM_BASE_URL`,
//!    `PRICESCOUT_LLM_MODEL`, `PRICESCOUT_CHROMIUM_PATH`, `PRICESCOUT_NO_BROWSER`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Top-level configuration, injected as `Arc<PricingConfig>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub http: HttpConfig,
    pub security: SecurityConfig,
    pub content: ContentConfig,
    pub discovery: DiscoveryConfig,
    pub toggle: ToggleConfig,
    pub tabs: TabScoringConfig,
    pub verify: VerifyConfig,
    pub browser: BrowserConfig,
    pub llm: LlmConfig,
}

/// Static fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub head_timeout_ms: u64,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            head_timeout_ms: 10_000,
            max_body_bytes: 5 * 1024 * 1024,
            max_redirects: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// SSRF guard switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Skip loopback/private/DNS checks. Only for local test harnesses.
    pub allow_private_networks: bool,
}

/// Limits on the text handed to the extraction capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub min_content_chars: usize,
    pub max_llm_chars: usize,
    pub embedded_raw_cap: usize,
    pub embedded_filtered_cap: usize,
    pub ld_json_cap: usize,
    pub embedded_keywords: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 100,
            max_llm_chars: 25_000,
            embedded_raw_cap: 50_000,
            embedded_filtered_cap: 5_000,
            ld_json_cap: 10_000,
            embedded_keywords: strings(&[
                "price",
                "plan",
                "subscription",
                "monthly",
                "yearly",
                "annual",
                "billing",
            ]),
        }
    }
}

/// Pricing-page discovery table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub common_paths: Vec<String>,
    pub link_keywords: Vec<String>,
    pub path_probe_base: i32,
    pub path_probe_decay: i32,
    pub link_score: i32,
    pub max_candidates: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            common_paths: strings(&[
                "/pricing",
                "/plans",
                "/billing",
                "/upgrade",
                "/subscribe",
                "/pro",
                "/premium",
            ]),
            link_keywords: strings(&[
                "pricing",
                "price",
                "plan",
                "plans",
                "billing",
                "upgrade",
                "subscribe",
                "signup",
                "membership",
                "pro",
                "premium",
                "enterprise",
            ]),
            path_probe_base: 100,
            path_probe_decay: 10,
            link_score: 50,
            max_candidates: 5,
        }
    }
}

/// Static billing-toggle heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleConfig {
    pub indicators: Vec<String>,
    pub structural_markers: Vec<String>,
    pub min_indicators: usize,
    pub min_indicators_with_tabs: usize,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            indicators: strings(&[
                "pay monthly",
                "pay annually",
                "monthly",
                "yearly",
                "annual",
                "billed monthly",
                "billed annually",
                "billed yearly",
                "save",
                "per month",
                "per year",
                "/mo",
                "/yr",
                "switch to annual",
                "switch to monthly",
            ]),
            structural_markers: strings(&[r#"role="tablist""#, r#"role="tab""#, "toggle", "switch"]),
            min_indicators: 2,
            min_indicators_with_tabs: 1,
        }
    }
}

/// Browser tab scoring weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabScoringConfig {
    pub monthly_keywords: Vec<String>,
    pub yearly_keywords: Vec<String>,
    /// Substrings that make a `<button>`/`<label>` a candidate at all.
    pub candidate_hints: Vec<String>,
    pub keyword_hit: i32,
    pub exact_match_bonus: i32,
    pub aria_tab_bonus: i32,
    pub aria_selected_bonus: i32,
}

impl Default for TabScoringConfig {
    fn default() -> Self {
        Self {
            monthly_keywords: strings(&[
                "monthly",
                "month",
                "/mo",
                "per month",
                "mo",
                "pay monthly",
                "billed monthly",
            ]),
            yearly_keywords: strings(&[
                "yearly",
                "annual",
                "annually",
                "year",
                "/yr",
                "per year",
                "pay annually",
                "billed annually",
                "save",
                "pay yearly",
            ]),
            candidate_hints: strings(&["month", "year", "annual", "/mo", "/yr", "save"]),
            keyword_hit: 10,
            exact_match_bonus: 20,
            aria_tab_bonus: 5,
            aria_selected_bonus: 3,
        }
    }
}

/// Click verification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub similarity_threshold: f64,
    pub min_diff_text_chars: usize,
    pub monthly_indicators: Vec<String>,
    pub yearly_indicators: Vec<String>,
    pub max_click_attempts: u32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            min_diff_text_chars: 100,
            monthly_indicators: strings(&["billed monthly", "/mo", "per month", "monthly billing"]),
            yearly_indicators: strings(&[
                "billed annually",
                "billed yearly",
                "/yr",
                "per year",
                "save",
                "annually",
            ]),
            max_click_attempts: 2,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,
    pub chromium_path: Option<String>,
    pub session_timeout_ms: u64,
    pub navigate_timeout_ms: u64,
    pub wait_visible_ms: u64,
    pub load_settle_ms: u64,
    pub click_settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chromium_path: None,
            session_timeout_ms: 60_000,
            navigate_timeout_ms: 30_000,
            wait_visible_ms: 10_000,
            load_settle_ms: 3_000,
            click_settle_ms: 1_500,
        }
    }
}

/// OpenAI-compatible extraction endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 4000,
            timeout_ms: 90_000,
        }
    }
}

impl PricingConfig {
    /// Load configuration: defaults, then an optional JSON file, then env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("PRICESCOUT_CONFIG").ok();
        let path = path.map(Path::to_path_buf).or_else(|| env_path.map(Into::into));

        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("failed to read config: {}", p.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config file: {}", p.display()))?
            }
            None => PricingConfig::default(),
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        fn non_empty(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(base) = non_empty("PRICESCOUT_LLM_BASE_URL") {
            self.llm.api_base = base;
        }
        if let Some(model) = non_empty("PRICESCOUT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(path) = non_empty("PRICESCOUT_CHROMIUM_PATH") {
            self.browser.chromium_path = Some(path);
        }
        if non_empty("PRICESCOUT_NO_BROWSER").is_some() {
            self.browser.enabled = false;
        }
    }
}
