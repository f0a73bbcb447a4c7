// src/lib.rs

//! Production and income reconciliation for the KS Rubber molding workshop:
//! die catalog, daily production entry, monthly calendar and income coverage,
//! all backed by the KS Rubber REST API.

pub mod calendar;
pub mod config;
pub mod confirm;
pub mod coverage;
pub mod dashboard;
pub mod die_catalog;
pub mod ksrubber_client;
pub mod ksrubber_data;
pub mod leave_marking;
pub mod month_summary;
pub mod production_flow;
pub mod settings;

pub use config::KsRubberConfig;
pub use ksrubber_client::{ApiError, ClientConfig, KsRubberClient, ProductionApi};

#[cfg(test)]
mod test_support;

mod dashboard_tests;
mod ksrubber_client_tests;
