// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod publish;
pub mod report;
pub mod runner;
pub mod store;

pub use crate::config::AppConfig;
pub use crate::error::{FetchError, RenderError, StoreError};
pub use crate::history::History;
pub use crate::report::{Report, ReportKind, ReportOutcome};
pub use crate::store::{Observation, Schema, TimeSeriesAppendStore, Value};
