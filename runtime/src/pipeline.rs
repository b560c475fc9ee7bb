//! Discovery and extraction orchestration.
//!
//! Extraction runs in three stages: static parse, toggle heuristic, and a
//! browser pass that only replaces the static result when it recovers
//! strictly more plans or billing periods. Validation and fetch failures are
//! reported in the response `error` field; warnings only ever accumulate.

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::structured::{extract_embedded_data, render_embedded};
use crate::acquisition::url_guard::{ensure_public_host, normalize_url, validate_url};
use crate::browser::BrowserPass;
use crate::config::PricingConfig;
use crate::discovery::discover_candidates;
use crate::error::{PricingError, PricingResult};
use crate::extraction::dedup::deduplicate;
use crate::extraction::sanitize::sanitize_plans;
use crate::extraction::{OpenAiExtractor, PlanExtractor};
use crate::model::{detected_periods, ExtractedPlan, PricingDiscoverResponse, PricingExtractResponse};
use crate::renderer::Renderer;
use crate::toggle::detect_toggle;
use std::sync::Arc;
use url::Url;

/// Plans and warnings from one extraction pass.
type PassResult = PricingResult<(Vec<ExtractedPlan>, Vec<String>)>;

/// Shared, stateless pipeline entry point. Cheap to clone.
#[derive(Clone)]
pub struct PricingService {
    http: HttpClient,
    extractor: Arc<dyn PlanExtractor>,
    renderer: Arc<dyn Renderer>,
    config: Arc<PricingConfig>,
}

impl PricingService {
    pub fn new(
        config: Arc<PricingConfig>,
        extractor: Arc<dyn PlanExtractor>,
        renderer: Arc<dyn Renderer>,
    ) -> anyhow::Result<Self> {
        let http = HttpClient::new(&config.http, config.security.allow_private_networks)?;
        Ok(Self {
            http,
            extractor,
            renderer,
            config,
        })
    }

    /// Service backed by the OpenAI-compatible extractor from `config.llm`.
    pub fn with_openai(config: Arc<PricingConfig>, renderer: Arc<dyn Renderer>) -> anyhow::Result<Self> {
        let extractor = Arc::new(OpenAiExtractor::new(
            &config.llm,
            config.content.max_llm_chars,
        )?);
        Self::new(config, extractor, renderer)
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Propose pricing-page URLs for a site, best first.
    pub async fn discover_pricing_page(&self, website_url: &str) -> PricingDiscoverResponse {
        let site = match self.checked_url(website_url).await {
            Ok(url) => url,
            Err(e) => {
                return PricingDiscoverResponse {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        let candidates = discover_candidates(
            &self.http,
            &site,
            &self.config.discovery,
            self.allow_private(),
        )
        .await;
        let pricing_candidates: Vec<String> = candidates.into_iter().map(|c| c.url).collect();
        tracing::info!("discovered {} pricing candidates for {site}", pricing_candidates.len());

        PricingDiscoverResponse {
            selected_pricing_url: pricing_candidates.first().cloned(),
            pricing_candidates,
            error: None,
        }
    }

    /// Extract plans from a pricing page.
    pub async fn extract_pricing(&self, pricing_url: &str) -> PricingExtractResponse {
        let url = match self.checked_url(pricing_url).await {
            Ok(url) => url,
            Err(e) => return PricingExtractResponse::failed(pricing_url, e.to_string(), Vec::new()),
        };
        let source_url = url.to_string();

        // Stage 1: static parse.
        let page = match self.http.fetch_page(&source_url).await {
            Ok(page) => page,
            Err(e) => {
                return PricingExtractResponse::failed(
                    &source_url,
                    format!("failed to fetch page: {e}"),
                    Vec::new(),
                )
            }
        };

        let visible = page.visible_text();
        let chars = visible.chars().count();
        if chars < self.config.content.min_content_chars {
            let err = PricingError::ContentTooShort {
                chars,
                min: self.config.content.min_content_chars,
            };
            let warnings = err.warning_code().map(str::to_string).into_iter().collect();
            return PricingExtractResponse::failed(&source_url, err.to_string(), warnings);
        }

        let mut content = visible.to_string();
        if !page.text.hidden.is_empty() {
            content.push_str("\n\n--- HIDDEN CONTENT (may contain alternate billing) ---\n");
            content.push_str(&page.text.hidden);
        }
        let embedded = extract_embedded_data(&page.text.scripts, &self.config.content);
        if !embedded.is_empty() {
            content.push_str("\n\n--- SCRIPT DATA ---\n");
            content.push_str(&render_embedded(&embedded));
        }

        // Stage 2: toggle heuristic.
        let toggle = detect_toggle(visible, &page.html, &self.config.toggle);

        let (mut plans, mut warnings) = match self.run_pass(&content, &source_url).await {
            Ok(pass) => pass,
            Err(e) => {
                let warnings = e.warning_code().map(str::to_string).into_iter().collect();
                return PricingExtractResponse::failed(&source_url, e.to_string(), warnings);
            }
        };
        let mut periods = detected_periods(&plans);

        let mut needs_render = toggle.detected && periods.len() <= 1;
        let mut render_used = false;
        if needs_render {
            warnings.push("toggle_detected_single_period".to_string());
        }

        // Stage 3: browser pass.
        if needs_render && self.config.browser.enabled {
            tracing::info!("toggle suspected on {source_url}; starting browser pass");
            render_used = true;
            match self.browser_pass(&source_url, &mut warnings).await {
                Ok(browser_plans) => {
                    let browser_periods = detected_periods(&browser_plans);
                    if browser_plans.len() > plans.len() || browser_periods.len() > periods.len() {
                        tracing::info!(
                            "browser pass adopted: {} plans, {} periods",
                            browser_plans.len(),
                            browser_periods.len()
                        );
                        plans = browser_plans;
                        periods = browser_periods;
                        needs_render = false;
                    } else {
                        warnings.push("browser_result_not_better".to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!("browser pass failed for {source_url}: {e}");
                    warnings.push("browser_render_failed".to_string());
                    if let Some(code) = e.warning_code().filter(|c| *c != "browser_render_failed") {
                        warnings.push(code.to_string());
                    }
                }
            }
        }

        PricingExtractResponse {
            plans,
            source_url,
            detected_periods: periods,
            needs_render,
            render_used,
            warnings,
            error: None,
        }
    }

    /// Capture the page states and extract from them. Capture warnings land
    /// in `warnings` before extraction runs, so they survive its failure.
    async fn browser_pass(
        &self,
        url: &str,
        warnings: &mut Vec<String>,
    ) -> PricingResult<Vec<ExtractedPlan>> {
        let capture = BrowserPass::new(self.renderer.as_ref(), &self.config)
            .capture(url)
            .await?;
        let (content, capture_warnings) = capture.into_content(&self.config.content);
        warnings.extend(capture_warnings);
        let (plans, pass_warnings) = self.run_pass(&content, url).await?;
        warnings.extend(pass_warnings);
        Ok(plans)
    }

    /// One extraction call followed by sanitation and dedup.
    async fn run_pass(&self, content: &str, source_url: &str) -> PassResult {
        let output = self.extractor.extract(content, source_url).await?;
        let mut warnings = output.warnings;
        let mut plans = output.plans;
        sanitize_plans(&mut plans, &mut warnings);
        Ok((deduplicate(plans), warnings))
    }

    async fn checked_url(&self, raw: &str) -> PricingResult<Url> {
        let normalized = normalize_url(raw)?;
        let url = validate_url(&normalized, self.allow_private())?;
        ensure_public_host(&url, self.allow_private()).await?;
        Ok(url)
    }

    fn allow_private(&self) -> bool {
        self.config.security.allow_private_networks
    }
}
