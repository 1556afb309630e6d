//! Errors raised by the content pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no post found for slug `{0}`")]
    NotFound(String),

    #[error("failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
}
