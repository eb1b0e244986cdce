use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;
use tempfile::tempdir;

use voc2tfrecord::proto::Example;
use voc2tfrecord::{generate, CancelToken, Error, RunConfig};

fn voc_xml(filename: &str, size: (u32, u32), objects: &[(&str, [i64; 4])]) -> String {
    let mut xml = format!(
        "<annotation><filename>{}</filename>\
         <size><width>{}</width><height>{}</height><depth>3</depth></size>",
        filename, size.0, size.1
    );
    for (class, bbox) in objects {
        xml.push_str(&format!(
            "<object><name>{}</name>\
             <bndbox><xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax></bndbox>\
             </object>",
            class, bbox[0], bbox[1], bbox[2], bbox[3]
        ));
    }
    xml.push_str("</annotation>");
    xml
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}

/// One-image fixture: images/, xml/ and a label map under a temp root.
struct Fixture {
    root: tempfile::TempDir,
    config: RunConfig,
}

fn fixture(write_csv: bool) -> Fixture {
    let root = tempdir().unwrap();
    let image_dir = root.path().join("images");
    let xml_dir = root.path().join("xml");
    fs::create_dir(&image_dir).unwrap();
    fs::create_dir(&xml_dir).unwrap();

    let label_map_path = root.path().join("label_map.pbtxt");
    fs::write(
        &label_map_path,
        "item {\n  id: 1\n  name: 'cat'\n}\nitem {\n  id: 2\n  name: 'dog'\n}\n",
    )
    .unwrap();

    let config = RunConfig {
        image_dir,
        annotation_dir: xml_dir,
        label_map_path,
        output_path: root.path().join("train.record"),
        write_csv,
    };
    Fixture { root, config }
}

fn add_image(fx: &Fixture, name: &str, width: u32, height: u32) -> Vec<u8> {
    let bytes = png_bytes(width, height);
    fs::write(fx.config.image_dir.join(name), &bytes).unwrap();
    bytes
}

fn add_xml(fx: &Fixture, xml_name: &str, content: &str) {
    fs::write(fx.config.annotation_dir.join(xml_name), content).unwrap();
}

// Walk the TFRecord framing by hand: u64 length, masked length crc, payload,
// masked payload crc.
fn read_record_payloads(path: &Path) -> Vec<Vec<u8>> {
    let bytes = fs::read(path).unwrap();
    let mut payloads = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let len =
            u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()) as usize;
        offset += 8 + 4;
        payloads.push(bytes[offset..offset + len].to_vec());
        offset += len + 4;
    }
    payloads
}

fn decode_examples(path: &Path) -> Vec<Example> {
    read_record_payloads(path)
        .into_iter()
        .map(|payload| Example::decode(payload.as_slice()).unwrap())
        .collect()
}

#[test]
fn test_single_image_end_to_end() {
    let fx = fixture(false);
    let image_bytes = add_image(&fx, "cat.jpg", 100, 100);
    add_xml(
        &fx,
        "cat.xml",
        &voc_xml("cat.jpg", (100, 100), &[("cat", [10, 10, 60, 60])]),
    );

    let summary = generate(&fx.config, &CancelToken::new()).unwrap();
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.objects_written, 1);
    assert_eq!(summary.record_path, fx.config.output_path);
    assert!(summary.csv_path.is_none());

    let examples = decode_examples(&fx.config.output_path);
    assert_eq!(examples.len(), 1);
    let example = &examples[0];

    assert_eq!(example.get("image/width").unwrap().as_int64_list(), Some(&[100][..]));
    assert_eq!(example.get("image/height").unwrap().as_int64_list(), Some(&[100][..]));
    assert_eq!(
        example.get("image/filename").unwrap().as_bytes_list(),
        Some(&[b"cat.jpg".to_vec()][..])
    );
    assert_eq!(
        example.get("image/encoded").unwrap().as_bytes_list(),
        Some(&[image_bytes][..])
    );
    assert_eq!(
        example.get("image/object/bbox/xmin").unwrap().as_float_list(),
        Some(&[0.1f32][..])
    );
    assert_eq!(
        example.get("image/object/bbox/ymin").unwrap().as_float_list(),
        Some(&[0.1f32][..])
    );
    assert_eq!(
        example.get("image/object/bbox/xmax").unwrap().as_float_list(),
        Some(&[0.6f32][..])
    );
    assert_eq!(
        example.get("image/object/bbox/ymax").unwrap().as_float_list(),
        Some(&[0.6f32][..])
    );
    assert_eq!(
        example.get("image/object/class/label").unwrap().as_int64_list(),
        Some(&[1][..])
    );
    assert_eq!(
        example.get("image/object/class/text").unwrap().as_bytes_list(),
        Some(&[b"cat".to_vec()][..])
    );
}

#[test]
fn test_rerun_produces_byte_identical_output() {
    let fx = fixture(false);
    add_image(&fx, "cat.jpg", 100, 100);
    add_image(&fx, "dog.jpg", 200, 100);
    add_xml(
        &fx,
        "cat.xml",
        &voc_xml("cat.jpg", (100, 100), &[("cat", [10, 10, 60, 60])]),
    );
    add_xml(
        &fx,
        "dog.xml",
        &voc_xml("dog.jpg", (200, 100), &[("dog", [20, 30, 120, 90])]),
    );

    generate(&fx.config, &CancelToken::new()).unwrap();
    let first = fs::read(&fx.config.output_path).unwrap();
    assert!(!first.is_empty());

    generate(&fx.config, &CancelToken::new()).unwrap();
    let second = fs::read(&fx.config.output_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_groups_merge_and_records_follow_group_order() {
    let fx = fixture(false);
    add_image(&fx, "shared.jpg", 100, 100);
    add_image(&fx, "zebra_free.jpg", 100, 100);
    // a.xml and c.xml reference the same image, b.xml sits between them
    add_xml(
        &fx,
        "a.xml",
        &voc_xml("shared.jpg", (100, 100), &[("cat", [1, 1, 10, 10])]),
    );
    add_xml(
        &fx,
        "b.xml",
        &voc_xml("zebra_free.jpg", (100, 100), &[("dog", [2, 2, 20, 20])]),
    );
    add_xml(
        &fx,
        "c.xml",
        &voc_xml("shared.jpg", (100, 100), &[("dog", [3, 3, 30, 30])]),
    );

    let summary = generate(&fx.config, &CancelToken::new()).unwrap();
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.objects_written, 3);

    let examples = decode_examples(&fx.config.output_path);
    // first-seen order: shared.jpg (a.xml) before zebra_free.jpg (b.xml)
    assert_eq!(
        examples[0].get("image/filename").unwrap().as_bytes_list(),
        Some(&[b"shared.jpg".to_vec()][..])
    );
    // objects from a.xml and c.xml merged, file-then-object order
    assert_eq!(
        examples[0].get("image/object/class/label").unwrap().as_int64_list(),
        Some(&[1, 2][..])
    );
    assert_eq!(
        examples[1].get("image/filename").unwrap().as_bytes_list(),
        Some(&[b"zebra_free.jpg".to_vec()][..])
    );
}

#[test]
fn test_unknown_class_aborts_without_writing_that_group() {
    let fx = fixture(false);
    add_image(&fx, "a.jpg", 100, 100);
    add_image(&fx, "b.jpg", 100, 100);
    add_xml(
        &fx,
        "a.xml",
        &voc_xml("a.jpg", (100, 100), &[("cat", [1, 1, 10, 10])]),
    );
    add_xml(
        &fx,
        "b.xml",
        &voc_xml("b.jpg", (100, 100), &[("zebra", [2, 2, 20, 20])]),
    );

    let err = generate(&fx.config, &CancelToken::new()).unwrap_err();
    match &err {
        Error::UnknownClass { class, .. } => assert_eq!(class, "zebra"),
        other => panic!("expected UnknownClass, got {:?}", other),
    }

    // the failed group never reached the writer; earlier records remain
    let examples = decode_examples(&fx.config.output_path);
    assert_eq!(examples.len(), 1);
    assert_eq!(
        examples[0].get("image/filename").unwrap().as_bytes_list(),
        Some(&[b"a.jpg".to_vec()][..])
    );
}

#[test]
fn test_missing_image_aborts_run() {
    let fx = fixture(false);
    add_xml(
        &fx,
        "a.xml",
        &voc_xml("nowhere.jpg", (100, 100), &[("cat", [1, 1, 10, 10])]),
    );

    let err = generate(&fx.config, &CancelToken::new()).unwrap_err();
    match err {
        Error::ImageNotFound { path } => {
            assert_eq!(path, fx.config.image_dir.join("nowhere.jpg"));
        }
        other => panic!("expected ImageNotFound, got {:?}", other),
    }
}

#[test]
fn test_csv_export_counts_rows_not_groups() {
    let fx = fixture(true);
    add_image(&fx, "shared.jpg", 100, 100);
    add_xml(
        &fx,
        "a.xml",
        &voc_xml(
            "shared.jpg",
            (100, 100),
            &[("cat", [1, 1, 10, 10]), ("dog", [2, 2, 20, 20])],
        ),
    );
    add_xml(
        &fx,
        "b.xml",
        &voc_xml("shared.jpg", (100, 100), &[("cat", [3, 3, 30, 30])]),
    );

    let summary = generate(&fx.config, &CancelToken::new()).unwrap();
    assert_eq!(summary.records_written, 1);

    let csv_path = summary.csv_path.expect("csv path in summary");
    assert_eq!(csv_path, fx.root.path().join("annotations.csv"));
    let content = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4); // header + 3 object rows
    assert_eq!(lines[0], "filename,width,height,class,xmin,ymin,xmax,ymax");
}

#[test]
fn test_empty_annotation_dir_writes_empty_record_file() {
    let fx = fixture(false);

    let summary = generate(&fx.config, &CancelToken::new()).unwrap();
    assert_eq!(summary.records_written, 0);
    assert_eq!(fs::read(&fx.config.output_path).unwrap().len(), 0);
}

#[test]
fn test_existing_output_is_truncated() {
    let fx = fixture(false);
    fs::write(&fx.config.output_path, b"stale bytes from an earlier run").unwrap();

    generate(&fx.config, &CancelToken::new()).unwrap();
    assert_eq!(fs::read(&fx.config.output_path).unwrap().len(), 0);
}

#[test]
fn test_cancelled_run_stops_before_encoding() {
    let fx = fixture(false);
    add_image(&fx, "cat.jpg", 100, 100);
    add_xml(
        &fx,
        "cat.xml",
        &voc_xml("cat.jpg", (100, 100), &[("cat", [10, 10, 60, 60])]),
    );

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        generate(&fx.config, &cancel),
        Err(Error::Cancelled)
    ));
    assert_eq!(fs::read(&fx.config.output_path).unwrap().len(), 0);
}

#[test]
fn test_cancelled_run_skips_csv_export() {
    // no annotations, so the group loop never runs and the pipeline reaches
    // the CSV stage, where the token must still be honored
    let fx = fixture(true);

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        generate(&fx.config, &cancel),
        Err(Error::Cancelled)
    ));
    assert!(!fx.root.path().join("annotations.csv").exists());
}

#[test]
fn test_validation_happens_before_any_io() {
    let config = RunConfig {
        image_dir: PathBuf::new(),
        annotation_dir: PathBuf::from("/does/not/exist"),
        label_map_path: PathBuf::from("/does/not/exist.pbtxt"),
        output_path: PathBuf::from("/does/not/exist.record"),
        write_csv: false,
    };

    // empty image dir fails validation before the bogus paths are touched
    assert!(matches!(
        generate(&config, &CancelToken::new()),
        Err(Error::InputValidation("image directory"))
    ));
}
