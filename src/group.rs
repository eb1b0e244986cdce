use indexmap::IndexMap;

use crate::types::{AnnotationRow, ImageGroup};

/// Partition annotation rows by source image filename.
///
/// Grouping is stable: groups appear in order of each filename's first
/// occurrence, and rows keep their input order within a group. Every row
/// lands in exactly one group.
pub fn group_by_filename(rows: &[AnnotationRow]) -> Vec<ImageGroup> {
    let mut groups: IndexMap<String, Vec<AnnotationRow>> = IndexMap::new();
    for row in rows {
        groups
            .entry(row.filename.clone())
            .or_default()
            .push(row.clone());
    }
    groups
        .into_iter()
        .map(|(filename, rows)| ImageGroup { filename, rows })
        .collect()
}
