use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use prost::Message;

use crate::error::{Error, Result};
use crate::label_map::LabelMap;
use crate::proto::{self, Example, Features};
use crate::types::ImageGroup;

/// Fixed format tag stored in `image/format`, matching the conventional
/// object-detection record layout.
const IMAGE_FORMAT: &[u8] = b"jpg";

/// Build one `Example` for an image group.
///
/// Reads the referenced image from `image_dir` and stores its bytes verbatim;
/// the image is only inspected far enough to obtain its pixel dimensions,
/// never re-encoded. Bounding boxes are normalized against those dimensions,
/// and every class name is resolved through the label map.
pub fn build_example(
    label_map: &LabelMap,
    group: &ImageGroup,
    image_dir: &Path,
) -> Result<Example> {
    let image_path = image_dir.join(&group.filename);
    if !image_path.is_file() {
        return Err(Error::ImageNotFound { path: image_path });
    }
    let encoded = fs::read(&image_path).map_err(|e| Error::ImageDecode {
        path: image_path.clone(),
        reason: format!("read failed: {}", e),
    })?;
    let dims = imagesize::blob_size(&encoded).map_err(|e| Error::ImageDecode {
        path: image_path.clone(),
        reason: e.to_string(),
    })?;
    let width = dims.width as f64;
    let height = dims.height as f64;

    let mut xmins = Vec::with_capacity(group.rows.len());
    let mut xmaxs = Vec::with_capacity(group.rows.len());
    let mut ymins = Vec::with_capacity(group.rows.len());
    let mut ymaxs = Vec::with_capacity(group.rows.len());
    let mut classes_text = Vec::with_capacity(group.rows.len());
    let mut classes = Vec::with_capacity(group.rows.len());
    for row in &group.rows {
        xmins.push((row.xmin as f64 / width) as f32);
        xmaxs.push((row.xmax as f64 / width) as f32);
        ymins.push((row.ymin as f64 / height) as f32);
        ymaxs.push((row.ymax as f64 / height) as f32);
        classes_text.push(row.class.clone().into_bytes());
        classes.push(label_map.resolve(&row.class)?);
    }

    let filename = group.filename.clone().into_bytes();
    let mut feature = BTreeMap::new();
    feature.insert(
        "image/height".to_string(),
        proto::int64_feature(dims.height as i64),
    );
    feature.insert(
        "image/width".to_string(),
        proto::int64_feature(dims.width as i64),
    );
    feature.insert(
        "image/filename".to_string(),
        proto::bytes_feature(filename.clone()),
    );
    feature.insert(
        "image/source_id".to_string(),
        proto::bytes_feature(filename),
    );
    feature.insert("image/encoded".to_string(), proto::bytes_feature(encoded));
    feature.insert(
        "image/format".to_string(),
        proto::bytes_feature(IMAGE_FORMAT.to_vec()),
    );
    feature.insert(
        "image/object/bbox/xmin".to_string(),
        proto::float_list_feature(xmins),
    );
    feature.insert(
        "image/object/bbox/xmax".to_string(),
        proto::float_list_feature(xmaxs),
    );
    feature.insert(
        "image/object/bbox/ymin".to_string(),
        proto::float_list_feature(ymins),
    );
    feature.insert(
        "image/object/bbox/ymax".to_string(),
        proto::float_list_feature(ymaxs),
    );
    feature.insert(
        "image/object/class/text".to_string(),
        proto::bytes_list_feature(classes_text),
    );
    feature.insert(
        "image/object/class/label".to_string(),
        proto::int64_list_feature(classes),
    );

    Ok(Example {
        features: Some(Features { feature }),
    })
}

/// Serialize an example to its protobuf wire form.
pub fn encode_example(example: &Example) -> Vec<u8> {
    example.encode_to_vec()
}
