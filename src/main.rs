use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use voc2tfrecord::{generate, Args, CancelToken, RunConfig};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = RunConfig::from(args);

    info!("starting TFRecord generation...");

    match generate(&config, &CancelToken::new()) {
        Ok(summary) => {
            info!(
                "successfully created the TFRecord file: {} ({} records, {} objects)",
                summary.record_path.display(),
                summary.records_written,
                summary.objects_written
            );
            if let Some(csv_path) = &summary.csv_path {
                info!("successfully created the CSV file: {}", csv_path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to generate TFRecord file: {}", e);
            ExitCode::FAILURE
        }
    }
}
