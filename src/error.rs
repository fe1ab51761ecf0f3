// src/error.rs
//! Typed error kinds for the store, fetchers and chart rendering.
//!
//! Pipelines wrap these in `anyhow` with context; callers that need to branch
//! (e.g. "is this a malformed history?") match on the variants directly.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Existing file does not match the report schema. Nothing was written.
    #[error("malformed history {path}: {reason}")]
    MalformedHistory { path: PathBuf, reason: String },

    /// Writing the merged table failed. The previous file is intact.
    #[error("persisting history to {path} failed")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading history {path} failed")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied observation does not fit the schema.
    #[error("observation #{index} does not match schema: {reason}")]
    InvalidObservation { index: usize, reason: String },

    #[error("key column `{0}` is not part of the schema")]
    UnknownKeyColumn(String),

    #[error("key must name at least one column")]
    EmptyKey,
}

impl StoreError {
    pub(crate) fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        StoreError::MalformedHistory {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("response is missing `{0}`")]
    MissingField(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("nothing to plot: {0}")]
    EmptyHistory(String),

    #[error("chart backend error: {0}")]
    Backend(String),

    #[error("chart output {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
