use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{AgentConnector, AgentEndpoint, AgentSession, TorrentState, TorrentStatus};
use crate::error::AgentError;

/// qBittorrent reports this ETA when it cannot estimate one.
const ETA_INFINITY: i64 = 8_640_000;

/// Opens sessions against the qBittorrent Web API (v2).
#[derive(Debug, Clone)]
pub struct QbittorrentConnector {
    request_timeout: Duration,
}

impl QbittorrentConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl AgentConnector for QbittorrentConnector {
    async fn connect(&self, endpoint: &AgentEndpoint) -> Result<Box<dyn AgentSession>, AgentError> {
        // Each session gets its own cookie jar; the SID cookie is the session.
        let client = Client::builder()
            .timeout(self.request_timeout)
            .cookie_store(true)
            .build()?;

        let base_url = endpoint.base_url();
        debug!("Logging in to download agent at {}", base_url);

        let response = client
            .post(format!("{}/api/v2/auth/login", base_url))
            .form(&[
                ("username", endpoint.credentials.username.as_str()),
                ("password", endpoint.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Status(status));
        }

        let body = response.text().await?;
        if is_failure_body(&body) {
            return Err(AgentError::LoginRefused);
        }

        Ok(Box::new(QbittorrentSession {
            client,
            base_url,
            endpoint: endpoint.clone(),
        }))
    }
}

pub struct QbittorrentSession {
    client: Client,
    base_url: String,
    endpoint: AgentEndpoint,
}

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    dlspeed: i64,
}

impl From<TorrentInfo> for TorrentStatus {
    fn from(info: TorrentInfo) -> Self {
        let eta_seconds = if info.eta <= 0 || info.eta >= ETA_INFINITY {
            None
        } else {
            Some(info.eta as u64)
        };

        TorrentStatus {
            hash: info.hash,
            name: info.name,
            fraction_complete: info.progress.clamp(0.0, 1.0),
            state: TorrentState::from_token(&info.state),
            eta_seconds,
            download_rate: info.dlspeed.max(0) as u64,
        }
    }
}

#[async_trait]
impl AgentSession for QbittorrentSession {
    fn endpoint(&self) -> &AgentEndpoint {
        &self.endpoint
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentStatus>, AgentError> {
        let response = self
            .client
            .get(format!("{}/api/v2/torrents/info", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::Status(response.status()));
        }

        let torrents: Vec<TorrentInfo> = response.json().await?;
        Ok(torrents.into_iter().map(TorrentStatus::from).collect())
    }

    async fn add_magnet(&self, magnet: &str, save_path: &Path) -> Result<(), AgentError> {
        let save_path = save_path.to_string_lossy();
        let response = self
            .client
            .post(format!("{}/api/v2/torrents/add", self.base_url))
            .form(&[
                ("urls", magnet),
                ("savepath", &*save_path),
                ("autoTMM", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Status(status));
        }

        let body = response.text().await?;
        if is_failure_body(&body) {
            return Err(AgentError::Rejected(body.trim().to_string()));
        }

        Ok(())
    }
}

fn is_failure_body(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case("fails.")
}
