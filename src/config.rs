use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Command-line arguments for the VOC-to-TFRecord converter.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing the source images
    #[arg(short = 'i', long = "image_dir")]
    pub image_dir: String,

    /// Directory containing the Pascal VOC XML annotation files
    #[arg(short = 'x', long = "xml_dir")]
    pub xml_dir: String,

    /// Path to the class label map (.pbtxt) file
    #[arg(short = 'l', long = "pbtxt")]
    pub label_map: String,

    /// Path of the TFRecord file to write
    #[arg(short = 'o', long = "output")]
    pub output: String,

    /// Also write every annotation row to a sibling annotations.csv file
    #[arg(long = "csv")]
    pub write_csv: bool,
}

/// Immutable description of one conversion run.
///
/// Collected once up front and passed by reference through the pipeline, so
/// no stage mutates shared path state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub image_dir: PathBuf,
    pub annotation_dir: PathBuf,
    pub label_map_path: PathBuf,
    pub output_path: PathBuf,
    pub write_csv: bool,
}

impl RunConfig {
    /// Check that every required path is non-empty, before any disk access.
    pub fn validate(&self) -> Result<()> {
        if self.image_dir.as_os_str().is_empty() {
            return Err(Error::InputValidation("image directory"));
        }
        if self.annotation_dir.as_os_str().is_empty() {
            return Err(Error::InputValidation("annotation directory"));
        }
        if self.label_map_path.as_os_str().is_empty() {
            return Err(Error::InputValidation("label map file"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::InputValidation("output path"));
        }
        Ok(())
    }
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        Self {
            image_dir: PathBuf::from(args.image_dir),
            annotation_dir: PathBuf::from(args.xml_dir),
            label_map_path: PathBuf::from(args.label_map),
            output_path: PathBuf::from(args.output),
            write_csv: args.write_csv,
        }
    }
}
