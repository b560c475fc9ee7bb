//! Data model shared by every pipeline stage.
//!
//! Plans come back from an LLM, so deserialization is lenient: numbers may
//! arrive as strings, text fields may be `null`, and billing periods may use
//! synonyms ("annual", "month"). Serialization is strict and stable.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How often a plan is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
    #[default]
    Unknown,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Yearly => "yearly",
            BillingPeriod::Unknown => "unknown",
        }
    }

    /// Parse a billing period, accepting the synonyms LLMs tend to produce.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" | "per_month" | "per month" | "mo" => BillingPeriod::Monthly,
            "yearly" | "year" | "annual" | "annually" | "per_year" | "per year" | "yr" => {
                BillingPeriod::Yearly
            }
            _ => BillingPeriod::Unknown,
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for BillingPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BillingPeriod {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.map(|s| BillingPeriod::parse(&s)).unwrap_or_default())
    }
}

/// A quantity bundled with a plan ("7,500 credits/seat/month").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncludedUnit {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub raw_text: String,
}

/// Verbatim source text justifying each extracted field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name_snippet: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub price_snippet: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub units_snippet: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub billing_evidence: String,
}

/// One plan as recovered from a pricing page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedPlan {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// The figure as quoted on the page. A "$10/mo billed annually" plan
    /// keeps 10 here; `billing_period` says how often it is charged.
    #[serde(default, deserialize_with = "lenient::number")]
    pub price_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub price_string: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub currency: String,
    /// Period covered by `price_amount` ("per_month", "per_year").
    #[serde(default, deserialize_with = "lenient::string")]
    pub price_frequency: String,
    #[serde(default)]
    pub billing_period: BillingPeriod,
    #[serde(default, deserialize_with = "lenient::number")]
    pub monthly_equivalent_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub annual_billed_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub included_units: Vec<IncludedUnit>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "lenient::evidence")]
    pub evidence: Evidence,
}

/// Distinct billing periods actually observed among `plans` (unknown excluded).
pub fn detected_periods(plans: &[ExtractedPlan]) -> Vec<BillingPeriod> {
    plans
        .iter()
        .map(|p| p.billing_period)
        .filter(|p| *p != BillingPeriod::Unknown)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Result of `discover_pricing_page`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingDiscoverResponse {
    pub pricing_candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_pricing_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `extract_pricing`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingExtractResponse {
    pub plans: Vec<ExtractedPlan>,
    pub source_url: String,
    pub detected_periods: Vec<BillingPeriod>,
    pub needs_render: bool,
    pub render_used: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PricingExtractResponse {
    /// A response carrying only an error and whatever warnings accrued.
    pub fn failed(source_url: &str, error: String, warnings: Vec<String>) -> Self {
        Self {
            source_url: source_url.to_string(),
            warnings,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Lenient field deserializers for LLM output.
mod lenient {
    use super::Evidence;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                cleaned.parse().ok()
            }
            _ => None,
        })
    }

    pub fn seq<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }

    pub fn evidence<'de, D: Deserializer<'de>>(d: D) -> Result<Evidence, D::Error> {
        Ok(Option::<Evidence>::deserialize(d)?.unwrap_or_default())
    }
}
