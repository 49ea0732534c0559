pub mod acquire;
pub mod agent;
pub mod config;
pub mod error;
pub mod monitor;
pub mod submit;
pub mod target;

// Re-export commonly used types for easier access in tests
pub use acquire::{AcquireOutcome, Acquirer, SubmissionPath};
pub use agent::{
    AgentConnector, AgentEndpoint, AgentSession, Credentials, EndpointResolver,
    QbittorrentConnector, RankedResolver, TorrentState, TorrentStatus, candidate_endpoints,
};
pub use config::{Config, ConfigManager};
pub use error::{AcquireError, AgentError};
pub use monitor::{
    AbandonReason, ConsoleRenderer, MonitorOutcome, MonitorSettings, ProgressMonitor,
    StatusRenderer,
};
pub use submit::{DescriptorFetcher, WatchFolderSubmitter};
pub use target::TorrentTarget;

/// Wire up an [`Acquirer`] from the loaded configuration.
pub fn acquirer_from_config(
    config: &Config,
    save_path_override: Option<std::path::PathBuf>,
) -> Result<Acquirer, AcquireError> {
    let resolver = RankedResolver::new(
        QbittorrentConnector::new(config.agent.request_timeout()),
        candidate_endpoints(&config.agent),
    );

    let fetcher = DescriptorFetcher::new(
        &config.catalog.descriptor_url_template,
        &config.catalog.user_agent,
        config.catalog.fetch_timeout(),
    )?;
    let watch_folder = WatchFolderSubmitter::new(fetcher, config.paths.watch_folder());

    Ok(Acquirer::new(
        Box::new(resolver),
        watch_folder,
        config.monitor.settings(),
        save_path_override.unwrap_or_else(|| config.paths.download_dir.clone()),
    ))
}
