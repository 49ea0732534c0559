pub mod qbittorrent;
pub mod resolver;

pub use qbittorrent::QbittorrentConnector;
pub use resolver::{EndpointResolver, RankedResolver, candidate_endpoints};

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One address a download agent might be listening on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoint {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl AgentEndpoint {
    pub fn new(host: &str, port: u16, credentials: Credentials) -> Self {
        Self {
            host: host.to_string(),
            port,
            credentials,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Two endpoints are the same candidate when host and port match,
    /// whatever the credentials.
    pub fn same_address(&self, other: &AgentEndpoint) -> bool {
        self.port == other.port && self.host.eq_ignore_ascii_case(&other.host)
    }
}

impl fmt::Display for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Normalised torrent state reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentState {
    Queued,
    StalledNoPeers,
    Downloading,
    Paused,
    Checking,
    SeedingStall,
    Uploading,
    Unknown(String),
}

impl TorrentState {
    /// Map a qBittorrent state token.
    pub fn from_token(token: &str) -> Self {
        match token {
            "queuedDL" => TorrentState::Queued,
            "stalledDL" => TorrentState::StalledNoPeers,
            "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" => TorrentState::Downloading,
            "pausedDL" | "stoppedDL" | "pausedUP" | "stoppedUP" => TorrentState::Paused,
            "checkingDL" | "checkingUP" | "checkingResumeData" => TorrentState::Checking,
            "stalledUP" => TorrentState::SeedingStall,
            "uploading" | "forcedUP" | "queuedUP" => TorrentState::Uploading,
            other => TorrentState::Unknown(other.to_string()),
        }
    }
}

/// One entry of the agent's torrent listing, as seen on a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentStatus {
    pub hash: String,
    pub name: String,
    pub fraction_complete: f64,
    pub state: TorrentState,
    /// `None` when the agent does not know.
    pub eta_seconds: Option<u64>,
    pub download_rate: u64,
}

impl TorrentStatus {
    /// Case-insensitive match of the reported hash against a content
    /// identifier.
    pub fn matches(&self, content_identifier: &str) -> bool {
        let reported = self.hash.to_ascii_lowercase();
        let wanted = content_identifier.to_ascii_lowercase();
        !wanted.is_empty() && reported.contains(&wanted)
    }

    /// No further monitoring needed once this is true.
    pub fn is_terminal(&self) -> bool {
        match self.state {
            TorrentState::Downloading => self.fraction_complete >= 1.0,
            TorrentState::Uploading | TorrentState::SeedingStall => true,
            _ => false,
        }
    }
}

/// Return the first listing entry matching `content_identifier`.
pub fn find_target<'a>(
    listing: &'a [TorrentStatus],
    content_identifier: &str,
) -> Option<&'a TorrentStatus> {
    listing.iter().find(|status| status.matches(content_identifier))
}

/// Opens authenticated sessions against a single endpoint.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    async fn connect(&self, endpoint: &AgentEndpoint) -> Result<Box<dyn AgentSession>, AgentError>;
}

/// An authenticated handle to one download agent. Lives for a single
/// acquisition attempt at most.
#[async_trait]
pub trait AgentSession: Send + Sync {
    fn endpoint(&self) -> &AgentEndpoint;

    async fn list_torrents(&self) -> Result<Vec<TorrentStatus>, AgentError>;

    /// Add a magnet reference with an explicit save path; automatic
    /// torrent management is turned off.
    async fn add_magnet(&self, magnet: &str, save_path: &Path) -> Result<(), AgentError>;
}
