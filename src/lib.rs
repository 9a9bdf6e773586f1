//! Grade-range validation, percentage-to-grade resolution and CGPA
//! aggregation, with a line-delimited JSON sidecar around them.

pub mod backup;
pub mod config;
pub mod db;
pub mod grading;
pub mod ipc;
pub mod logging;
pub mod presets;
pub mod report;
pub mod store;
