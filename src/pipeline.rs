use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::example::{build_example, encode_example};
use crate::group::group_by_filename;
use crate::label_map::LabelMap;
use crate::types::RunSummary;
use crate::utils::create_progress_bar;
use crate::voc::parse_annotation_dir;
use crate::writer::{csv_sibling_path, write_csv, RecordFileWriter};

/// Cooperative cancellation handle, checked between group-encode steps.
///
/// Each image read + encode is the cancellation granularity; a record that
/// has started encoding is still written before the run stops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run the full conversion pipeline once, synchronously.
///
/// Stages run strictly forward: validate inputs, load the label map, parse
/// the annotation directory, group rows by image, then encode and append one
/// record per group. The first error of any kind aborts the run; whatever
/// was already appended to the output file stays on disk and the caller must
/// treat that path as incomplete.
pub fn generate(config: &RunConfig, cancel: &CancelToken) -> Result<RunSummary> {
    config.validate()?;

    let label_map = LabelMap::load(&config.label_map_path)?;
    info!(
        "loaded {} classes from {}",
        label_map.len(),
        config.label_map_path.display()
    );

    let rows = parse_annotation_dir(&config.annotation_dir)?;
    if rows.is_empty() {
        warn!(
            "no annotations found in {}",
            config.annotation_dir.display()
        );
    }
    let groups = group_by_filename(&rows);
    info!("{} objects across {} images", rows.len(), groups.len());

    let records_written = {
        let mut writer = RecordFileWriter::create(&config.output_path)?;
        let pb = create_progress_bar(groups.len() as u64, "encoding");
        for group in &groups {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let example = build_example(&label_map, group, &config.image_dir)?;
            writer.write(encode_example(&example))?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        writer.finish()?;
        writer.records_written()
        // writer drops here, closing the output file before the CSV step
    };

    let csv_path = if config.write_csv {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let path = csv_sibling_path(&config.output_path);
        write_csv(&rows, &path)?;
        Some(path)
    } else {
        None
    };

    Ok(RunSummary {
        record_path: config.output_path.clone(),
        csv_path,
        records_written,
        objects_written: rows.len(),
    })
}
