//! Compliance reporting for fleet partners: drivers, vehicles, infractions,
//! SCP sanction points and work-time analysis.
//!
//! The aggregation modules (`duration`, `dates`, `enrich`, `metrics`,
//! `timesheet`, `paginate`) are pure functions over record slices. `db` loads
//! those slices from Postgres into a [`snapshot::Snapshot`] and writes
//! documents back.

pub mod config;
pub mod dates;
pub mod db;
pub mod duration;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod paginate;
pub mod report;
pub mod snapshot;
pub mod timesheet;
