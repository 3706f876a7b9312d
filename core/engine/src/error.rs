//! FILENAME: core/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValueError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record must be a JSON object, found {0}")]
    NotAnObject(String),

    #[error("Dataset must be a JSON array of objects, found {0}")]
    NotAnArray(String),
}
