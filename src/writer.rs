use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tfrecord::BytesWriter;

use crate::error::Result;
use crate::types::AnnotationRow;

/// Name of the optional CSV export, placed next to the record file.
const CSV_FILE_NAME: &str = "annotations.csv";

/// Appends length-framed records to a single TFRecord file.
///
/// The output file is created fresh (truncating existing content) and owned
/// exclusively by this writer for the whole run; it is closed exactly once
/// when the writer is dropped, on success and failure paths alike. A run
/// that fails mid-way leaves the records written so far on disk.
pub struct RecordFileWriter {
    writer: BytesWriter<BufWriter<File>>,
    path: PathBuf,
    records: usize,
}

impl RecordFileWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = BytesWriter::create(path)?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            records: 0,
        })
    }

    /// Append one serialized example as a length-prefixed record.
    pub fn write(&mut self, payload: Vec<u8>) -> Result<()> {
        self.writer.send(payload)?;
        self.records += 1;
        Ok(())
    }

    /// Flush buffered records through to disk, surfacing any I/O error.
    ///
    /// Must be called on the success path; dropping the writer alone would
    /// swallow a failed flush and let a truncated file pass as a success.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sibling path for the CSV export: the record file's final path segment is
/// replaced with the fixed export name.
pub fn csv_sibling_path(output_path: &Path) -> PathBuf {
    output_path.with_file_name(CSV_FILE_NAME)
}

/// Serialize the full flat annotation table (not the groups) as CSV, with
/// header `filename,width,height,class,xmin,ymin,xmax,ymax`.
pub fn write_csv(rows: &[AnnotationRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        // serialize() emits the header from the struct fields, so an empty
        // table needs it written by hand
        writer.write_record([
            "filename", "width", "height", "class", "xmin", "ymin", "xmax", "ymax",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
