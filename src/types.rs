use std::path::PathBuf;

use serde::Serialize;

/// One annotated object, flattened out of its annotation file.
///
/// Coordinates are in pixel space, with `0 <= xmin < xmax <= width` and
/// `0 <= ymin < ymax <= height` (checked at parse time). Field order matches
/// the CSV export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub class: String,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

/// All annotation rows referencing one image file, in input row order.
#[derive(Debug, Clone)]
pub struct ImageGroup {
    pub filename: String,
    pub rows: Vec<AnnotationRow>,
}

/// Terminal outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub record_path: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub records_written: usize,
    pub objects_written: usize,
}
