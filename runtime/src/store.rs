//! Saved-plan persistence using SQLite.
//!
//! Saving replaces a user's previous set in one transaction. Nested plan
//! fields (units, features, evidence) are stored as JSON text.

use crate::model::{BillingPeriod, Evidence, ExtractedPlan};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A persisted plan with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub user_id: String,
    pub website_url: String,
    pub source_url: String,
    pub extracted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub plan: ExtractedPlan,
}

/// Result of a save. Failures are reported in `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A user's saved plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedPlansResponse {
    pub plans: Vec<SavedPlan>,
    pub count: usize,
}

/// Persistence boundary for extracted plans.
pub trait PlanStore: Send + Sync {
    /// Replace `user_id`'s saved plans. Returns the number stored.
    fn save_plans(
        &self,
        user_id: &str,
        website_url: &str,
        source_url: &str,
        plans: &[ExtractedPlan],
    ) -> Result<usize>;

    /// All plans saved by `user_id`, in save order.
    fn get_saved_plans(&self, user_id: &str) -> Result<Vec<SavedPlan>>;
}

/// Run a save and fold any failure into the response.
pub fn save_response(
    store: &dyn PlanStore,
    user_id: &str,
    website_url: &str,
    source_url: &str,
    plans: &[ExtractedPlan],
) -> SaveResponse {
    match store.save_plans(user_id, website_url, source_url, plans) {
        Ok(saved_count) => SaveResponse {
            saved_count,
            error: None,
        },
        Err(e) => {
            tracing::warn!("failed to save plans for {user_id}: {e:#}");
            SaveResponse {
                saved_count: 0,
                error: Some(format!("failed to save plans: {e}")),
            }
        }
    }
}

/// SQLite-backed [`PlanStore`].
pub struct SqlitePlanStore {
    db: Mutex<Connection>,
}

impl SqlitePlanStore {
    /// Open or create a plan database.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path)
            .with_context(|| format!("failed to open plan store: {}", path.display()))?;

        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS saved_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                website_url TEXT NOT NULL,
                source_url TEXT NOT NULL,
                extracted_at TEXT NOT NULL,
                plan_name TEXT NOT NULL,
                price_amount REAL,
                price_string TEXT NOT NULL,
                currency TEXT NOT NULL,
                price_frequency TEXT NOT NULL,
                billing_period TEXT NOT NULL,
                monthly_equivalent_amount REAL,
                annual_billed_amount REAL,
                included_units TEXT NOT NULL,
                features TEXT NOT NULL,
                evidence TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_saved_plans_user ON saved_plans(user_id);",
        )
        .context("failed to create saved_plans table")?;

        Ok(Self { db: Mutex::new(db) })
    }

    /// Open the default store at ~/.pricescout/plans.db.
    pub fn default_store() -> Result<Self> {
        let path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".pricescout")
            .join("plans.db");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open(&path)
    }
}

impl PlanStore for SqlitePlanStore {
    fn save_plans(
        &self,
        user_id: &str,
        website_url: &str,
        source_url: &str,
        plans: &[ExtractedPlan],
    ) -> Result<usize> {
        if user_id.trim().is_empty() {
            bail!("invalid user ID");
        }
        let extracted_at = Utc::now().to_rfc3339();

        let mut db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("plan store lock poisoned"))?;
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM saved_plans WHERE user_id = ?1",
            rusqlite::params![user_id],
        )?;

        for plan in plans {
            tx.execute(
                "INSERT INTO saved_plans (
                    user_id, website_url, source_url, extracted_at, plan_name,
                    price_amount, price_string, currency, price_frequency, billing_period,
                    monthly_equivalent_amount, annual_billed_amount,
                    included_units, features, evidence
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                rusqlite::params![
                    user_id,
                    website_url,
                    source_url,
                    extracted_at,
                    plan.name,
                    plan.price_amount,
                    plan.price_string,
                    plan.currency,
                    plan.price_frequency,
                    plan.billing_period.as_str(),
                    plan.monthly_equivalent_amount,
                    plan.annual_billed_amount,
                    serde_json::to_string(&plan.included_units)?,
                    serde_json::to_string(&plan.features)?,
                    serde_json::to_string(&plan.evidence)?,
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!("saved {} plans for {user_id}", plans.len());
        Ok(plans.len())
    }

    fn get_saved_plans(&self, user_id: &str) -> Result<Vec<SavedPlan>> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("plan store lock poisoned"))?;
        let mut stmt = db.prepare(
            "SELECT user_id, website_url, source_url, extracted_at, plan_name,
                    price_amount, price_string, currency, price_frequency, billing_period,
                    monthly_equivalent_amount, annual_billed_amount,
                    included_units, features, evidence
             FROM saved_plans WHERE user_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok(RawRow {
                    user_id: row.get(0)?,
                    website_url: row.get(1)?,
                    source_url: row.get(2)?,
                    extracted_at: row.get(3)?,
                    name: row.get(4)?,
                    price_amount: row.get(5)?,
                    price_string: row.get(6)?,
                    currency: row.get(7)?,
                    price_frequency: row.get(8)?,
                    billing_period: row.get(9)?,
                    monthly_equivalent_amount: row.get(10)?,
                    annual_billed_amount: row.get(11)?,
                    included_units: row.get(12)?,
                    features: row.get(13)?,
                    evidence: row.get(14)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRow::into_saved).collect()
    }
}

struct RawRow {
    user_id: String,
    website_url: String,
    source_url: String,
    extracted_at: String,
    name: String,
    price_amount: Option<f64>,
    price_string: String,
    currency: String,
    price_frequency: String,
    billing_period: String,
    monthly_equivalent_amount: Option<f64>,
    annual_billed_amount: Option<f64>,
    included_units: String,
    features: String,
    evidence: String,
}

impl RawRow {
    fn into_saved(self) -> Result<SavedPlan> {
        let extracted_at = DateTime::parse_from_rfc3339(&self.extracted_at)
            .with_context(|| format!("bad timestamp in plan store: {}", self.extracted_at))?
            .with_timezone(&Utc);
        let evidence: Evidence = serde_json::from_str(&self.evidence)?;
        Ok(SavedPlan {
            user_id: self.user_id,
            website_url: self.website_url,
            source_url: self.source_url,
            extracted_at,
            plan: ExtractedPlan {
                name: self.name,
                price_amount: self.price_amount,
                price_string: self.price_string,
                currency: self.currency,
                price_frequency: self.price_frequency,
                billing_period: BillingPeriod::parse(&self.billing_period),
                monthly_equivalent_amount: self.monthly_equivalent_amount,
                annual_billed_amount: self.annual_billed_amount,
                included_units: serde_json::from_str(&self.included_units)?,
                features: serde_json::from_str(&self.features)?,
                evidence,
            },
        })
    }
}
