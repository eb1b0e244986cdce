use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a conversion run.
///
/// Every variant is fatal: the pipeline stops at the first error and reports
/// it verbatim, naming the stage and the offending file where applicable.
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required input: {0}")]
    InputValidation(&'static str),

    #[error("malformed annotation file {path}: {reason}")]
    MalformedAnnotation { path: PathBuf, reason: String },

    #[error("invalid label map {path}: {reason}")]
    LabelMap { path: PathBuf, reason: String },

    #[error("class '{class}' not present in label map {label_map}")]
    UnknownClass { class: String, label_map: PathBuf },

    #[error("image file not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("could not read image dimensions from {path}: {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    #[error("failed to write record file: {0}")]
    Record(#[from] tfrecord::Error),

    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
