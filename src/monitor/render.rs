use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::format::status_line;
use crate::agent::TorrentStatus;

/// Receives everything the monitor wants to show the user.
pub trait StatusRenderer {
    /// Called on every watch-folder check while the descriptor is waiting to
    /// be picked up.
    fn ingest_pending(&mut self, descriptor: &Path, attempt: u32, max_attempts: u32);

    /// Called once, the first time the torrent is seen in the listing.
    fn announce(&mut self, name: &str);

    /// Called on every poll that found the torrent. Replaces the previous
    /// progress line.
    fn progress(&mut self, status: &TorrentStatus);

    fn finish(&mut self, status: &TorrentStatus);

    fn warn(&mut self, message: &str);
}

/// Renders to stdout with a single self-overwriting status line.
pub struct ConsoleRenderer {
    term: Term,
    line: Option<ProgressBar>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            line: None,
        }
    }

    fn line(&mut self) -> &ProgressBar {
        self.line.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        })
    }

    fn clear_line(&mut self) {
        if let Some(bar) = self.line.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRenderer for ConsoleRenderer {
    fn ingest_pending(&mut self, descriptor: &Path, attempt: u32, max_attempts: u32) {
        let file_name = descriptor
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        self.line().set_message(format!(
            "Waiting for download agent to pick up {} ({}/{})",
            style(file_name).cyan(),
            attempt,
            max_attempts
        ));
    }

    fn announce(&mut self, name: &str) {
        self.clear_line();
        written(
            self.term
                .write_line(&format!("{} {}", style("📥").cyan(), style(name).cyan().bold())),
        );
    }

    fn progress(&mut self, status: &TorrentStatus) {
        let message = status_line(status);
        self.line().set_message(message);
    }

    fn finish(&mut self, status: &TorrentStatus) {
        self.clear_line();
        written(self.term.write_line(&format!(
            "{} {} completed",
            style("✅").green(),
            style(&status.name).cyan()
        )));
    }

    fn warn(&mut self, message: &str) {
        self.clear_line();
        written(
            self.term
                .write_line(&format!("{} {}", style("⚠️").yellow(), style(message).yellow())),
        );
    }
}

/// A closed or redirected stdout must not stop the monitor, so write
/// failures are only logged.
fn written(result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("console write failed: {}", e);
            false
        }
    }
}

impl Drop for ConsoleRenderer {
    fn drop(&mut self) {
        self.clear_line();
    }
}
