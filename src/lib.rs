//! Pascal VOC to TFRecord converter
//!
//! This library converts a directory of Pascal VOC XML annotations plus their
//! referenced images into a single TFRecord file of object-detection training
//! records, with an optional CSV export of every bounding box.

pub mod config;
pub mod error;
pub mod example;
pub mod group;
pub mod label_map;
pub mod pipeline;
pub mod proto;
pub mod types;
pub mod utils;
pub mod voc;
pub mod writer;

// Re-export commonly used types and functions
pub use config::{Args, RunConfig};
pub use error::{Error, Result};
pub use example::{build_example, encode_example};
pub use group::group_by_filename;
pub use label_map::LabelMap;
pub use pipeline::{generate, CancelToken};
pub use types::{AnnotationRow, ImageGroup, RunSummary};
pub use voc::{parse_annotation_dir, parse_annotation_file};
pub use writer::{csv_sibling_path, write_csv, RecordFileWriter};
