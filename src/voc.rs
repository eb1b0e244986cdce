use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::AnnotationRow;

// Pascal VOC annotation schema. Extra elements (pose, truncated, segmented,
// ...) are ignored by serde.
#[derive(Debug, Deserialize)]
struct VocAnnotation {
    filename: String,
    size: VocSize,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

#[derive(Debug, Deserialize)]
struct VocSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct VocObject {
    name: String,
    bndbox: VocBndBox,
}

#[derive(Debug, Deserialize)]
struct VocBndBox {
    xmin: i64,
    ymin: i64,
    xmax: i64,
    ymax: i64,
}

/// Parse every `*.xml` file directly inside `xml_dir` into a flat sequence of
/// annotation rows, one per annotated object.
///
/// Directory listing order is OS-defined, so files are sorted
/// lexicographically by path before parsing; row order is file order, then
/// object order within each file. Any malformed file aborts the whole run.
pub fn parse_annotation_dir(xml_dir: &Path) -> Result<Vec<AnnotationRow>> {
    let pattern = format!("{}/*.xml", xml_dir.display());
    let mut xml_files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| Error::MalformedAnnotation {
            path: xml_dir.to_path_buf(),
            reason: format!("invalid annotation directory pattern: {}", e),
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    xml_files.sort();

    let mut rows = Vec::new();
    for path in &xml_files {
        rows.extend(parse_annotation_file(path)?);
    }
    Ok(rows)
}

/// Parse a single VOC XML file into one row per `<object>` element.
pub fn parse_annotation_file(path: &Path) -> Result<Vec<AnnotationRow>> {
    let content = fs::read_to_string(path).map_err(|e| Error::MalformedAnnotation {
        path: path.to_path_buf(),
        reason: format!("unreadable: {}", e),
    })?;
    let annotation: VocAnnotation =
        serde_xml_rs::from_str(&content).map_err(|e| Error::MalformedAnnotation {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let VocAnnotation {
        filename,
        size,
        objects,
    } = annotation;

    if size.width == 0 || size.height == 0 {
        return Err(Error::MalformedAnnotation {
            path: path.to_path_buf(),
            reason: format!(
                "image size must be positive, got {}x{}",
                size.width, size.height
            ),
        });
    }

    objects
        .into_iter()
        .map(|object| {
            let VocObject { name, bndbox } = object;
            validate_bndbox(&bndbox, &size, path)?;
            Ok(AnnotationRow {
                filename: filename.clone(),
                width: size.width,
                height: size.height,
                class: name,
                xmin: bndbox.xmin,
                ymin: bndbox.ymin,
                xmax: bndbox.xmax,
                ymax: bndbox.ymax,
            })
        })
        .collect()
}

// Requires 0 <= xmin < xmax <= width and 0 <= ymin < ymax <= height.
fn validate_bndbox(bndbox: &VocBndBox, size: &VocSize, path: &Path) -> Result<()> {
    let VocBndBox {
        xmin,
        ymin,
        xmax,
        ymax,
    } = *bndbox;
    let fits = xmin >= 0
        && ymin >= 0
        && xmin < xmax
        && ymin < ymax
        && xmax <= i64::from(size.width)
        && ymax <= i64::from(size.height);
    if !fits {
        return Err(Error::MalformedAnnotation {
            path: path.to_path_buf(),
            reason: format!(
                "bounding box [{}, {}, {}, {}] does not fit inside a {}x{} image",
                xmin, ymin, xmax, ymax, size.width, size.height
            ),
        });
    }
    Ok(())
}
