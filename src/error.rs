use reqwest::StatusCode;
use thiserror::Error;

/// Failures while talking to the download agent's control API.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("request to download agent failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download agent answered with HTTP {0}")]
    Status(StatusCode),

    #[error("download agent refused the login")]
    LoginRefused,

    #[error("download agent rejected the request: {0}")]
    Rejected(String),
}

/// Everything that can go wrong while acquiring a single torrent.
///
/// Only [`AcquireError::InvalidTarget`] is raised before any strategy runs;
/// the other variants are produced by a strategy and recovered or reported
/// by the orchestrator.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no download agent endpoint accepted authentication ({attempted} candidates tried)")]
    TransportUnreachable { attempted: usize },

    #[error("download agent rejected the submission: {0}")]
    SubmissionRejected(String),

    #[error("failed to fetch torrent descriptor: {0}")]
    FetchError(String),

    #[error("watch folder was not drained after {attempts} checks")]
    ProcessingTimeout { attempts: u32 },

    #[error("torrent {0} never showed up in the download agent listing")]
    MonitorAbandoned(String),

    #[error("failed to write descriptor into watch folder: {0}")]
    WatchFolder(#[from] std::io::Error),

    #[error("invalid torrent target: {0}")]
    InvalidTarget(String),
}
