//! `pricescout serve`: run the REST API.

use crate::cli::setup;
use crate::rest::{self, AppState};
use crate::store::SqlitePlanStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(config_path: Option<&Path>, port: u16, db: Option<PathBuf>) -> Result<()> {
    let config = setup::load_config(config_path, false)?;
    let service = setup::build_service(config)?;

    let store = match db {
        Some(path) => SqlitePlanStore::open(&path)?,
        None => SqlitePlanStore::default_store().context("failed to open default plan store")?,
    };

    let state = AppState {
        service,
        store: Arc::new(store),
    };
    rest::start(port, state).await
}
