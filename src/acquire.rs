use std::path::PathBuf;
use tracing::{info, warn};

use crate::agent::EndpointResolver;
use crate::error::AcquireError;
use crate::monitor::{MonitorOutcome, MonitorSettings, ProgressMonitor, StatusRenderer};
use crate::submit::{WatchFolderSubmitter, submit_magnet};
use crate::target::TorrentTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPath {
    Direct,
    WatchFolder,
}

#[derive(Debug)]
pub enum AcquireOutcome {
    /// The agent took the torrent. `monitor` says whether completion was
    /// observed.
    Success {
        path: SubmissionPath,
        monitor: MonitorOutcome,
    },
    /// Neither strategy worked, but the magnet reference is still usable by
    /// hand.
    PartialSuccess {
        magnet_reference: String,
        reason: AcquireError,
    },
    Failure(AcquireError),
}

/// Gets a torrent into the download agent: direct magnet submission first,
/// watch-folder drop second, then follows it to completion.
pub struct Acquirer {
    resolver: Box<dyn EndpointResolver>,
    watch_folder: WatchFolderSubmitter,
    settings: MonitorSettings,
    save_path: PathBuf,
}

impl Acquirer {
    pub fn new(
        resolver: Box<dyn EndpointResolver>,
        watch_folder: WatchFolderSubmitter,
        settings: MonitorSettings,
        save_path: PathBuf,
    ) -> Self {
        Self {
            resolver,
            watch_folder,
            settings,
            save_path,
        }
    }

    pub async fn acquire(
        &self,
        target: &TorrentTarget,
        renderer: &mut dyn StatusRenderer,
    ) -> AcquireOutcome {
        let monitor = ProgressMonitor::new(self.resolver.as_ref(), self.settings.clone());
        let content_identifier = target.content_identifier();

        match self.submit_direct(target).await {
            Ok(()) => {
                let outcome = monitor.track(content_identifier, renderer).await;
                return AcquireOutcome::Success {
                    path: SubmissionPath::Direct,
                    monitor: outcome,
                };
            }
            Err(e) => info!(
                "Direct submission of {} unavailable ({}); trying watch folder {:?}",
                target.label(),
                e,
                self.watch_folder.folder()
            ),
        }

        match self
            .watch_folder
            .submit(content_identifier, target.display_name())
            .await
        {
            Ok(descriptor) => {
                if let Err(e) = monitor.await_ingestion(&descriptor, renderer).await {
                    // The agent may still have taken it; the listing will tell.
                    warn!("{}", e);
                    renderer.warn(&e.to_string());
                }
                let outcome = monitor.track(content_identifier, renderer).await;
                AcquireOutcome::Success {
                    path: SubmissionPath::WatchFolder,
                    monitor: outcome,
                }
            }
            Err(e) => {
                warn!("Watch folder submission of {} failed: {}", target.label(), e);
                if target.has_usable_magnet() {
                    AcquireOutcome::PartialSuccess {
                        magnet_reference: target.magnet_reference().to_string(),
                        reason: e,
                    }
                } else {
                    AcquireOutcome::Failure(e)
                }
            }
        }
    }

    async fn submit_direct(&self, target: &TorrentTarget) -> Result<(), AcquireError> {
        let session = self.resolver.resolve().await?;
        submit_magnet(session.as_ref(), target.magnet_reference(), &self.save_path).await
    }
}
