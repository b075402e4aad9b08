mod app;

use std::process::ExitCode;

use tracing::{error, info};

fn main() -> ExitCode {
    app::init_tracing();
    info!("=== replica replay startup ===");

    match app::run() {
        Ok(report) => {
            info!(
                frames = report.frames,
                ticks = report.ticks,
                payloads_published = report.payloads_published,
                payloads_applied = report.metrics.payloads_applied,
                payloads_dropped = report.metrics.payloads_dropped,
                remaining_representations = report.remaining_representations,
                "replay_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "replay_failed");
            ExitCode::FAILURE
        }
    }
}
