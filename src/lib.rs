//! Land listing counts per county, read off a property search site.
//!
//! The search page is driven through [`session::UiSession`]. For every region
//! the [`workflow::RegionWorkflow`] forces the filters into a known state with
//! read-verify-toggle clicks, waits for the results refresh each change
//! triggers, and reads the result count. [`orchestrator::Orchestrator`] runs
//! it across all regions and hands the table to a [`report::ReportSink`].

pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod navigator;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod workflow;

pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
pub use orchestrator::{Orchestrator, RunSummary};
