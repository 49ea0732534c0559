pub mod format;
pub mod render;

pub use format::{format_eta, format_rate, status_line};
pub use render::{ConsoleRenderer, StatusRenderer};

use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::agent::{EndpointResolver, TorrentStatus, find_target};
use crate::error::AcquireError;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Delay after a poll that did not find the torrent.
    pub poll_interval: Duration,
    /// Delay between two renders of a tracked torrent.
    pub render_interval: Duration,
    /// Consecutive polls without a match before giving up.
    pub max_unmatched_polls: u32,
    pub ingest_interval: Duration,
    pub ingest_max_attempts: u32,
    /// Hard ceiling on a whole `track` call, matched or not.
    pub max_wall_clock: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            render_interval: Duration::from_secs(3),
            max_unmatched_polls: 60,
            ingest_interval: Duration::from_secs(2),
            ingest_max_attempts: 30,
            max_wall_clock: Duration::from_secs(6 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    Completed(TorrentStatus),
    Abandoned(AbandonReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    NotFound { polls: u32 },
    WallClockExceeded,
}

/// Follows a torrent through the agent's listing until it reaches a
/// terminal state.
pub struct ProgressMonitor<'a> {
    resolver: &'a dyn EndpointResolver,
    settings: MonitorSettings,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(resolver: &'a dyn EndpointResolver, settings: MonitorSettings) -> Self {
        Self { resolver, settings }
    }

    /// Wait for the agent to consume a descriptor dropped into the watch
    /// folder. Returns the attempt on which the file was gone.
    pub async fn await_ingestion(
        &self,
        descriptor: &Path,
        renderer: &mut dyn StatusRenderer,
    ) -> Result<u32, AcquireError> {
        let max_attempts = self.settings.ingest_max_attempts;

        for attempt in 1..=max_attempts {
            sleep(self.settings.ingest_interval).await;
            renderer.ingest_pending(descriptor, attempt, max_attempts);

            if matches!(tokio::fs::try_exists(descriptor).await, Ok(false)) {
                info!("Download agent picked up {:?} after {} checks", descriptor, attempt);
                return Ok(attempt);
            }
        }

        Err(AcquireError::ProcessingTimeout {
            attempts: max_attempts,
        })
    }

    /// Poll the listing until the torrent completes, disappears for too
    /// long, or the wall-clock ceiling is hit.
    pub async fn track(
        &self,
        content_identifier: &str,
        renderer: &mut dyn StatusRenderer,
    ) -> MonitorOutcome {
        let started = Instant::now();
        let mut unmatched_polls = 0;
        let mut announced = false;

        loop {
            if started.elapsed() >= self.settings.max_wall_clock {
                let message = format!(
                    "stopped following {} after {}s without completion",
                    content_identifier,
                    self.settings.max_wall_clock.as_secs()
                );
                warn!("{}", message);
                renderer.warn(&message);
                return MonitorOutcome::Abandoned(AbandonReason::WallClockExceeded);
            }

            match self.poll_once(content_identifier).await {
                Some(status) => {
                    unmatched_polls = 0;
                    if !announced {
                        renderer.announce(&status.name);
                        announced = true;
                    }
                    renderer.progress(&status);

                    if status.is_terminal() {
                        info!("Torrent {} reached a terminal state", content_identifier);
                        renderer.finish(&status);
                        return MonitorOutcome::Completed(status);
                    }

                    sleep(self.settings.render_interval).await;
                }
                None => {
                    unmatched_polls += 1;
                    if unmatched_polls >= self.settings.max_unmatched_polls {
                        let error = AcquireError::MonitorAbandoned(content_identifier.to_string());
                        warn!("{} ({} polls)", error, unmatched_polls);
                        renderer.warn(&error.to_string());
                        return MonitorOutcome::Abandoned(AbandonReason::NotFound {
                            polls: unmatched_polls,
                        });
                    }

                    sleep(self.settings.poll_interval).await;
                }
            }
        }
    }

    /// The agent may have moved between polls, so every poll resolves a
    /// fresh session.
    async fn poll_once(&self, content_identifier: &str) -> Option<TorrentStatus> {
        let session = match self.resolver.resolve().await {
            Ok(session) => session,
            Err(e) => {
                debug!("Listing poll skipped: {}", e);
                return None;
            }
        };

        match session.list_torrents().await {
            Ok(listing) => find_target(&listing, content_identifier).cloned(),
            Err(e) => {
                debug!("Listing request to {} failed: {}", session.endpoint(), e);
                None
            }
        }
    }
}
