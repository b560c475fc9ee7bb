// Copyright 2026 PriceScout Contributors
// SPDX-License-Identifier: Apache-2.0

//! PriceScout runtime library: competitor pricing-page discovery and
//! structured plan extraction.
//!
//! [`pipeline::PricingService`] is the entry point: it validates and fetches
//! a page, runs LLM extraction, and falls back to a headless-browser pass
//! when a monthly/yearly toggle hides half of the plans.

pub mod acquisition;
pub mod browser;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod rest;
pub mod store;
pub mod toggle;
