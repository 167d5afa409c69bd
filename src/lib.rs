//! Placement eligibility reports over a student records database.
//!
//! [`query`] turns [`models::EligibilityCriteria`] into a parameterized statement,
//! [`runner::ReportRunner`] executes it through a [`db::DataStore`], and
//! [`export`] / [`report`] turn the resulting table into CSV, JSON, terminal or
//! Markdown output.

pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod export;
pub mod insights;
pub mod logging;
pub mod models;
pub mod query;
pub mod report;
pub mod runner;
