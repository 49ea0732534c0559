use anyhow::{Context, Result};
use console::{Term, style};
use std::path::PathBuf;
use torrent_grabber::{
    AbandonReason, AcquireOutcome, Config, ConsoleRenderer, MonitorOutcome, SubmissionPath,
    TorrentTarget, acquirer_from_config,
};
use tracing::error;

/// Process every target in turn. A failing target never stops the batch.
/// Returns the number of targets that ended in failure.
pub async fn handle_grab(
    config: &Config,
    targets: Vec<String>,
    save_path: Option<PathBuf>,
) -> Result<usize> {
    let term = Term::stdout();
    let acquirer =
        acquirer_from_config(config, save_path).context("Failed to set up torrent acquisition")?;

    let total = targets.len();
    let mut failures = 0;
    let mut partials = 0;

    for (index, input) in targets.iter().enumerate() {
        term.write_line("")?;

        let target = match TorrentTarget::parse(input, &config.catalog.trackers) {
            Ok(target) => target,
            Err(e) => {
                error!("{}", e);
                term.write_line(&format!("{} {}", style("❌").red(), e))?;
                failures += 1;
                continue;
            }
        };

        term.write_line(&format!(
            "{} [{}/{}] {}",
            style("🧲").cyan(),
            index + 1,
            total,
            style(target.label()).cyan().bold()
        ))?;

        let mut renderer = ConsoleRenderer::new();
        let outcome = acquirer.acquire(&target, &mut renderer).await;
        drop(renderer);

        match outcome {
            AcquireOutcome::Success { path, monitor } => {
                let via = match path {
                    SubmissionPath::Direct => "download agent API",
                    SubmissionPath::WatchFolder => "watch folder",
                };
                match monitor {
                    MonitorOutcome::Completed(_) => term.write_line(&format!(
                        "{} Done (submitted via {})",
                        style("✅").green(),
                        via
                    ))?,
                    MonitorOutcome::Abandoned(reason) => {
                        let detail = match reason {
                            AbandonReason::NotFound { polls } => {
                                format!("not seen in the agent listing after {} checks", polls)
                            }
                            AbandonReason::WallClockExceeded => {
                                "still running when the monitor gave up".to_string()
                            }
                        };
                        term.write_line(&format!(
                            "{} Submitted via {}, but completion was not confirmed: {}",
                            style("⚠️").yellow(),
                            via,
                            detail
                        ))?
                    }
                }
            }
            AcquireOutcome::PartialSuccess {
                magnet_reference,
                reason,
            } => {
                partials += 1;
                term.write_line(&format!(
                    "{} Could not hand the torrent to a download agent: {}",
                    style("⚠️").yellow(),
                    reason
                ))?;
                term.write_line(&format!(
                    "{} Add this magnet link manually:",
                    style("💡").yellow()
                ))?;
                term.write_line(&format!("   {}", style(magnet_reference).cyan()))?;
            }
            AcquireOutcome::Failure(e) => {
                failures += 1;
                error!("Acquisition of {} failed: {}", target.label(), e);
                term.write_line(&format!("{} {}", style("❌").red(), e))?;
            }
        }
    }

    term.write_line("")?;
    term.write_line(&format!(
        "{} {} processed, {} need manual action, {} failed",
        style("📊").cyan(),
        total,
        partials,
        failures
    ))?;

    Ok(failures)
}
