//! Billing-period consistency rules applied to every extraction result.
//!
//! The prompt asks for these already; enforcing them here keeps the output
//! consistent when the model drifts.

use crate::model::{BillingPeriod, ExtractedPlan};

/// Fix up billing fields in place and append any warnings they imply.
///
/// Re-tagging a monthly figure as yearly leaves `price_amount` and
/// `price_frequency` describing the quoted per-month figure; the derived
/// amounts carry the yearly view.
pub fn sanitize_plans(plans: &mut [ExtractedPlan], warnings: &mut Vec<String>) {
    for plan in plans.iter_mut() {
        if plan.billing_period == BillingPeriod::Monthly && says_billed_annually(plan) {
            tracing::debug!("re-tagging '{}' as yearly from billing evidence", plan.name);
            plan.billing_period = BillingPeriod::Yearly;
            if plan.monthly_equivalent_amount.is_none() {
                plan.monthly_equivalent_amount = plan.price_amount;
            }
            if plan.price_frequency.is_empty() {
                plan.price_frequency = "per_month".to_string();
            }
        }

        match plan.billing_period {
            BillingPeriod::Yearly => {
                if let (Some(per_month), None) =
                    (plan.monthly_equivalent_amount, plan.annual_billed_amount)
                {
                    plan.annual_billed_amount = Some(round_cents(per_month * 12.0));
                }
            }
            BillingPeriod::Unknown => {
                plan.monthly_equivalent_amount = None;
                let code = unverified_warning(&plan.name);
                if !warnings.contains(&code) {
                    warnings.push(code);
                }
            }
            BillingPeriod::Monthly => {}
        }
    }
}

fn says_billed_annually(plan: &ExtractedPlan) -> bool {
    let evidence = plan.evidence.billing_evidence.to_lowercase();
    evidence.contains("billed annually") || evidence.contains("billed yearly")
}

/// `billing_period_unverified_<Name_With_Underscores>`.
pub fn unverified_warning(name: &str) -> String {
    let slug = name.split_whitespace().collect::<Vec<_>>().join("_");
    let slug = if slug.is_empty() { "Unnamed".to_string() } else { slug };
    format!("billing_period_unverified_{slug}")
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Evidence;

    fn plan(name: &str, period: BillingPeriod) -> ExtractedPlan {
        ExtractedPlan {
            name: name.into(),
            billing_period: period,
            ..Default::default()
        }
    }

    #[test]
    fn test_monthly_figure_billed_annually_becomes_yearly() {
        let mut plans = vec![ExtractedPlan {
            price_amount: Some(10.0),
            price_string: "$10/mo".into(),
            evidence: Evidence {
                billing_evidence: "billed annually".into(),
                ..Default::default()
            },
            ..plan("Pro Plan", BillingPeriod::Monthly)
        }];
        let mut warnings = Vec::new();
        sanitize_plans(&mut plans, &mut warnings);

        assert_eq!(plans[0].billing_period, BillingPeriod::Yearly);
        assert_eq!(plans[0].monthly_equivalent_amount, Some(10.0));
        assert_eq!(plans[0].annual_billed_amount, Some(120.0));
        assert!(warnings.is_empty());

        // The quoted figure and its period are untouched.
        assert_eq!(plans[0].price_amount, Some(10.0));
        assert_eq!(plans[0].price_frequency, "per_month");
    }

    #[test]
    fn test_retagged_plan_keeps_quoted_frequency() {
        let mut plans = vec![ExtractedPlan {
            price_amount: Some(8.0),
            price_frequency: "per_user_per_month".into(),
            evidence: Evidence {
                billing_evidence: "Billed yearly".into(),
                ..Default::default()
            },
            ..plan("Team", BillingPeriod::Monthly)
        }];
        sanitize_plans(&mut plans, &mut Vec::new());

        assert_eq!(plans[0].billing_period, BillingPeriod::Yearly);
        assert_eq!(plans[0].price_frequency, "per_user_per_month");
        assert_eq!(plans[0].annual_billed_amount, Some(96.0));
    }

    #[test]
    fn test_yearly_keeps_explicit_annual_amount() {
        let mut plans = vec![ExtractedPlan {
            monthly_equivalent_amount: Some(8.25),
            annual_billed_amount: Some(99.0),
            ..plan("Team", BillingPeriod::Yearly)
        }];
        sanitize_plans(&mut plans, &mut Vec::new());
        assert_eq!(plans[0].annual_billed_amount, Some(99.0));
    }

    #[test]
    fn test_unknown_drops_monthly_equivalent_and_warns_once() {
        let mut plans = vec![ExtractedPlan {
            price_amount: Some(12.0),
            monthly_equivalent_amount: Some(12.0),
            ..plan("Pro Plan", BillingPeriod::Unknown)
        }];
        let mut warnings = vec!["billing_period_unverified_Pro_Plan".to_string()];
        sanitize_plans(&mut plans, &mut warnings);

        assert_eq!(plans[0].monthly_equivalent_amount, None);
        assert_eq!(warnings, vec!["billing_period_unverified_Pro_Plan"]);
    }

    #[test]
    fn test_unknown_without_llm_warning_gets_one() {
        let mut plans = vec![plan("Starter", BillingPeriod::Unknown)];
        let mut warnings = Vec::new();
        sanitize_plans(&mut plans, &mut warnings);
        assert_eq!(warnings, vec!["billing_period_unverified_Starter"]);
    }

    #[test]
    fn test_unverified_warning_slug() {
        assert_eq!(
            unverified_warning("  Pro   Plan "),
            "billing_period_unverified_Pro_Plan"
        );
        assert_eq!(unverified_warning(""), "billing_period_unverified_Unnamed");
    }
}
