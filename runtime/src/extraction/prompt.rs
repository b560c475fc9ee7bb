//! Prompt/response contract for the plan-extraction capability.

use crate::acquisition::page_text::clip;
use crate::error::{PricingError, PricingResult};
use crate::model::ExtractedPlan;
use serde::Deserialize;

/// Fixed extraction instructions.
pub const SYSTEM_PROMPT: &str = r#"You extract subscription pricing plans from website content.

RULES:
1. Extract only what the content states explicitly.
2. When a field has no support in the content, use null. Never guess.
3. Every extracted value needs a verbatim evidence snippet.
4. When the billing period has no explicit indicator, set billing_period to "unknown" and add a warning.

BILLING PERIODS:
- Monthly plan: charged every month. Indicators: "billed monthly", "/mo", "per month", "monthly billing".
- Yearly plan: charged once a year. Indicators: "billed annually", "billed yearly", "/yr", "per year", "annual billing".
- Monthly equivalent (yearly plans only): "$10/mo billed annually" is a YEARLY plan with
  monthly_equivalent_amount = 10 and annual_billed_amount = 120. It is never a monthly plan.

Respond with JSON only, in exactly this shape:
{
  "plans": [
    {
      "name": "Plan Name",
      "price_amount": 19.00,
      "price_string": "$19/mo",
      "currency": "USD",
      "price_frequency": "per_month",
      "billing_period": "monthly",
      "monthly_equivalent_amount": null,
      "annual_billed_amount": null,
      "included_units": [
        {"name": "credits", "amount": 7500, "unit": "per seat per month", "raw_text": "7,500 credits/seat/month"}
      ],
      "features": ["Feature 1", "Feature 2"],
      "evidence": {
        "name_snippet": "text where the plan name appears",
        "price_snippet": "text showing the price and billing period",
        "units_snippet": "text showing included units",
        "billing_evidence": "text proving the billing period, e.g. 'billed monthly'"
      }
    }
  ],
  "detected_billing_options": ["monthly", "yearly"],
  "warnings": []
}

EXAMPLES:
- "Pro Plan $12/mo billed monthly" -> billing_period "monthly", price_amount 12, billing_evidence "billed monthly"
- "Pro Plan $10/mo billed annually" -> billing_period "yearly", price_amount 10, price_frequency "per_month", monthly_equivalent_amount 10, annual_billed_amount 120, billing_evidence "billed annually"
- "Pro Plan $120/year" -> billing_period "yearly", price_amount 120, price_frequency "per_year", billing_evidence "$120/year"
- "Pro Plan $12/mo" with no billing indicator -> billing_period "unknown", warning "billing_period_unverified_Pro_Plan"

ALSO:
- Emit separate entries for the monthly and yearly versions of the same plan.
- Content may contain labelled sections for different billing states. Extract plans from every section.
- Currency symbols: $ = USD, € = EUR, £ = GBP.
- When features are not visible, return an empty array and add the warning "features_not_visible".
- When pricing requires login or contacting sales, add the warning "pricing_gated".
- Always include billing_evidence."#;

/// Parsed capability response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractionOutput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plans: Vec<ExtractedPlan>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub detected_billing_options: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

/// Cap content at `max_chars`, marking the cut.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match clip(content, max_chars) {
        Some(head) => format!("{head}\n...[truncated]"),
        None => content.to_string(),
    }
}

/// User message for one extraction call.
pub fn build_user_prompt(source_url: &str, content: &str, max_chars: usize) -> String {
    format!(
        "Extract pricing information from this page. Pay special attention to billing period evidence.\n\n\
         Source URL: {source_url}\n\n\
         Page Content:\n{}",
        truncate_content(content, max_chars)
    )
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a capability response. No partial results on failure.
pub fn parse_extraction(raw: &str) -> PricingResult<ExtractionOutput> {
    let body = strip_code_fences(raw);
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("unparseable extraction response: {e}");
        PricingError::ExtractionParse(e.to_string())
    })
}
