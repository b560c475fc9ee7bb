//! Shared fixtures for the integration tests: a permissive config, mock
//! pages, a canned plan extractor, and a scripted browser.

#![allow(dead_code)]

use async_trait::async_trait;
use pricescout_runtime::browser::tabs::LOCATE_TABS_JS;
use pricescout_runtime::browser::verify::ARIA_SELECTED_JS;
use pricescout_runtime::config::PricingConfig;
use pricescout_runtime::error::PricingResult;
use pricescout_runtime::extraction::{ExtractionOutput, PlanExtractor};
use pricescout_runtime::model::{BillingPeriod, Evidence, ExtractedPlan};
use pricescout_runtime::renderer::{BrowserSession, Renderer};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Defaults with private networks allowed so wiremock on 127.0.0.1 is reachable.
pub fn test_config() -> PricingConfig {
    let mut config = PricingConfig::default();
    config.security.allow_private_networks = true;
    config.http.timeout_ms = 5_000;
    config.http.head_timeout_ms = 2_000;
    config
}

/// Serve `html` for GET `url_path`.
pub async fn mount_page(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Answer HEAD `url_path` with 200.
pub async fn mount_head(server: &MockServer, url_path: &str) {
    Mock::given(method("HEAD"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// A pricing page with a monthly/yearly tablist, long enough to pass the
/// minimal-content gate.
pub fn toggle_page() -> String {
    r#"<html><body>
        <h1>Simple pricing for growing teams</h1>
        <div role="tablist">
            <button role="tab" aria-selected="true">Pay monthly</button>
            <button role="tab">Pay annually (save 20%)</button>
        </div>
        <div class="plan"><h2>Starter</h2><p>$10 per month, billed monthly</p>
            <ul><li>3 projects</li><li>Email support</li></ul></div>
        <div class="plan"><h2>Pro</h2><p>$20 per month, billed monthly</p>
            <ul><li>Unlimited projects</li><li>Priority support</li></ul></div>
    </body></html>"#
        .to_string()
}

pub fn plan(name: &str, period: BillingPeriod, amount: f64, evidence: &str) -> ExtractedPlan {
    let (price_string, frequency) = match period {
        BillingPeriod::Yearly => (format!("${amount}/year"), "per_year"),
        _ => (format!("${amount}/month"), "per_month"),
    };
    ExtractedPlan {
        name: name.to_string(),
        price_amount: Some(amount),
        price_string: price_string.clone(),
        currency: "USD".to_string(),
        price_frequency: frequency.to_string(),
        billing_period: period,
        annual_billed_amount: (period == BillingPeriod::Yearly).then_some(amount),
        evidence: Evidence {
            name_snippet: name.to_string(),
            price_snippet: price_string,
            billing_evidence: evidence.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn monthly_plans() -> Vec<ExtractedPlan> {
    vec![
        plan("Starter", BillingPeriod::Monthly, 10.0, "billed monthly"),
        plan("Pro", BillingPeriod::Monthly, 20.0, "billed monthly"),
    ]
}

pub fn yearly_plans() -> Vec<ExtractedPlan> {
    vec![
        plan("Starter", BillingPeriod::Yearly, 96.0, "billed annually"),
        plan("Pro", BillingPeriod::Yearly, 192.0, "billed annually"),
    ]
}

/// Returns monthly plans, plus yearly plans once the input carries a
/// captured yearly state. Records every input it sees.
#[derive(Default)]
pub struct CannedExtractor {
    pub inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl PlanExtractor for CannedExtractor {
    async fn extract(&self, content: &str, _source_url: &str) -> PricingResult<ExtractionOutput> {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(content.to_string());
        }
        let mut plans = monthly_plans();
        if content.contains("=== YEARLY/ANNUAL BILLING STATE") {
            plans.extend(yearly_plans());
        }
        Ok(ExtractionOutput {
            plans,
            ..Default::default()
        })
    }
}

/// One rendered page state.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub html: String,
    pub text: String,
}

impl PageState {
    pub fn text(text: &str) -> Self {
        Self {
            html: format!("<html><body>{text}</body></html>"),
            text: text.to_string(),
        }
    }
}

/// What a scripted session shows and how it reacts to clicks.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub url: String,
    pub initial: PageState,
    /// Value returned for the tab enumeration script.
    pub tabs: Value,
    /// State shown after clicking a selector. Unlisted selectors change nothing.
    pub on_click: HashMap<String, PageState>,
    /// Clicks never complete.
    pub hang_on_click: bool,
}

/// Observations shared between a renderer and its sessions.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub clicks: Vec<String>,
    pub closed: usize,
}

pub struct ScriptedRenderer {
    pub script: PageScript,
    pub log: Arc<Mutex<SessionLog>>,
}

impl ScriptedRenderer {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            log: Arc::default(),
        }
    }

    pub fn clicks(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clicks.clone()).unwrap_or_default()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().map(|l| l.closed).unwrap_or_default()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_session(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        Ok(Box::new(ScriptedSession {
            current: self.script.initial.clone(),
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

pub struct ScriptedSession {
    script: PageScript,
    current: PageState,
    log: Arc<Mutex<SessionLog>>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, _url: &str) -> anyhow::Result<()> {
        self.current = self.script.initial.clone();
        Ok(())
    }

    async fn wait_visible(&self, _selector: &str, _timeout: Duration) -> anyhow::Result<()> {
        Ok(())
    }

    async fn sleep(&self, _duration: Duration) {}

    async fn evaluate_js(&self, function: &str, _args: Vec<Value>) -> anyhow::Result<Value> {
        if function == LOCATE_TABS_JS {
            Ok(self.script.tabs.clone())
        } else if function == ARIA_SELECTED_JS {
            Ok(Value::Bool(false))
        } else {
            Ok(Value::Null)
        }
    }

    async fn inner_html(&self, _selector: &str) -> anyhow::Result<String> {
        Ok(self.current.html.clone())
    }

    async fn text(&self, _selector: &str) -> anyhow::Result<String> {
        Ok(self.current.text.clone())
    }

    async fn click(&mut self, selector: &str) -> anyhow::Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.clicks.push(selector.to_string());
        }
        if self.script.hang_on_click {
            std::future::pending::<()>().await;
        }
        if let Some(state) = self.script.on_click.get(selector) {
            self.current = state.clone();
        }
        Ok(())
    }

    async fn current_url(&self) -> anyhow::Result<String> {
        Ok(self.script.url.clone())
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.closed += 1;
        }
        Ok(())
    }
}

/// Tab list for a page with "Monthly" (selected) and "Yearly" role tabs.
pub fn monthly_yearly_tabs() -> Value {
    json!([
        {
            "selector": "[data-pricescout-tab=\"0\"]",
            "text": "Monthly",
            "ariaSelected": "true",
            "kind": "role-tab"
        },
        {
            "selector": "[data-pricescout-tab=\"1\"]",
            "text": "Yearly",
            "ariaSelected": "false",
            "kind": "role-tab"
        }
    ])
}
