//! Canonical-key deduplication of extracted plans.
//!
//! Key = `normalized name | billing period | price key`. The monthly
//! equivalent is left out so rounding differences do not split a plan.

use crate::model::ExtractedPlan;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn price_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d,]+\.?\d*").expect("price token regex is valid"))
}

/// Lowercase, collapse whitespace, drop a trailing " plan" then " tier".
pub fn normalize_name(name: &str) -> String {
    let collapsed = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let without_plan = collapsed.strip_suffix(" plan").unwrap_or(&collapsed);
    without_plan
        .strip_suffix(" tier")
        .unwrap_or(without_plan)
        .to_string()
}

fn price_key(plan: &ExtractedPlan) -> String {
    if let Some(amount) = plan.price_amount {
        return format!("{amount:.2}");
    }
    price_token()
        .find(&plan.price_string)
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_default()
}

/// Identity of a plan across extraction passes.
pub fn canonical_key(plan: &ExtractedPlan) -> String {
    format!(
        "{}|{}|{}",
        normalize_name(&plan.name),
        plan.billing_period,
        price_key(plan)
    )
}

/// Fold `incoming` into `existing`, keeping the richer data.
pub fn merge_plans(mut existing: ExtractedPlan, incoming: ExtractedPlan) -> ExtractedPlan {
    if incoming.features.len() > existing.features.len() {
        existing.features = incoming.features;
    }
    if incoming.included_units.len() > existing.included_units.len() {
        existing.included_units = incoming.included_units;
    }
    if incoming.evidence.price_snippet.len() > existing.evidence.price_snippet.len() {
        existing.evidence = incoming.evidence;
    }
    if existing.monthly_equivalent_amount.is_none() {
        existing.monthly_equivalent_amount = incoming.monthly_equivalent_amount;
    }
    if existing.annual_billed_amount.is_none() {
        existing.annual_billed_amount = incoming.annual_billed_amount;
    }
    existing
}

/// Merge records that share a canonical key, sorted by (name, period).
pub fn deduplicate(plans: Vec<ExtractedPlan>) -> Vec<ExtractedPlan> {
    let before = plans.len();
    let mut by_key: BTreeMap<String, ExtractedPlan> = BTreeMap::new();

    for plan in plans {
        let key = canonical_key(&plan);
        let merged = match by_key.remove(&key) {
            Some(existing) => merge_plans(existing, plan),
            None => plan,
        };
        by_key.insert(key, merged);
    }

    let mut out: Vec<ExtractedPlan> = by_key.into_values().collect();
    out.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.billing_period.cmp(&b.billing_period))
    });

    tracing::debug!("deduplicated {before} plans to {}", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingPeriod, Evidence, IncludedUnit};

    fn plan(name: &str, period: BillingPeriod, price: Option<f64>) -> ExtractedPlan {
        ExtractedPlan {
            name: name.into(),
            billing_period: period,
            price_amount: price,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Pro   Plan "), "pro");
        assert_eq!(normalize_name("Business Tier"), "business");
        assert_eq!(normalize_name("Enterprise"), "enterprise");
    }

    #[test]
    fn test_key_ignores_monthly_equivalent() {
        let a = ExtractedPlan {
            monthly_equivalent_amount: Some(8.33),
            ..plan("Pro", BillingPeriod::Yearly, Some(100.0))
        };
        let b = ExtractedPlan {
            monthly_equivalent_amount: Some(8.34),
            ..plan("Pro plan", BillingPeriod::Yearly, Some(100.0))
        };
        assert_eq!(canonical_key(&a), canonical_key(&b));
        assert_eq!(canonical_key(&a), "pro|yearly|100.00");
    }

    #[test]
    fn test_key_falls_back_to_price_string() {
        let p = ExtractedPlan {
            price_string: "$1,299.50 per year".into(),
            ..plan("Scale", BillingPeriod::Yearly, None)
        };
        assert_eq!(canonical_key(&p), "scale|yearly|1299.50");
    }

    #[test]
    fn test_merge_keeps_richer_fields() {
        let a = ExtractedPlan {
            features: vec!["SSO".into()],
            evidence: Evidence {
                price_snippet: "$10".into(),
                ..Default::default()
            },
            ..plan("Pro", BillingPeriod::Yearly, Some(120.0))
        };
        let b = ExtractedPlan {
            features: vec!["API".into(), "Audit log".into()],
            included_units: vec![IncludedUnit {
                name: "seats".into(),
                amount: Some(5.0),
                ..Default::default()
            }],
            monthly_equivalent_amount: Some(10.0),
            evidence: Evidence {
                price_snippet: "$10/mo billed annually".into(),
                ..Default::default()
            },
            ..plan("Pro", BillingPeriod::Yearly, Some(120.0))
        };

        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].features.len(), 2);
        assert_eq!(merged[0].included_units.len(), 1);
        assert_eq!(merged[0].monthly_equivalent_amount, Some(10.0));
        assert_eq!(merged[0].evidence.price_snippet, "$10/mo billed annually");
    }

    #[test]
    fn test_periods_are_not_merged() {
        let out = deduplicate(vec![
            plan("Pro", BillingPeriod::Yearly, Some(120.0)),
            plan("Pro", BillingPeriod::Monthly, Some(12.0)),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].billing_period, BillingPeriod::Monthly);
        assert_eq!(out[1].billing_period, BillingPeriod::Yearly);
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let input = vec![
            plan("Team", BillingPeriod::Monthly, Some(30.0)),
            plan("Pro", BillingPeriod::Unknown, None),
            plan("pro plan", BillingPeriod::Unknown, None),
            plan("Pro", BillingPeriod::Yearly, Some(120.0)),
            plan("Pro", BillingPeriod::Yearly, Some(99.0)),
            ExtractedPlan {
                features: vec!["x".into()],
                ..plan("Team", BillingPeriod::Monthly, Some(30.0))
            },
        ];
        let once = deduplicate(input);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 4);
    }
}
