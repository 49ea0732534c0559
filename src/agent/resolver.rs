use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{AgentConnector, AgentEndpoint, AgentSession, Credentials};
use crate::config::AgentConfig;
use crate::error::AcquireError;

// TODO: drop this fallback once configs without credentials are rejected by `validate`.
/// Factory credentials of a stock qBittorrent install. Only used when the
/// config carries none and `allow_default_credentials` is on.
const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "adminadmin";

/// Finds an authenticated session with some download agent.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self) -> Result<Box<dyn AgentSession>, AcquireError>;
}

/// Tries a fixed, ordered list of candidates and keeps the first one that
/// authenticates.
pub struct RankedResolver<C> {
    connector: C,
    candidates: Vec<AgentEndpoint>,
}

impl<C: AgentConnector> RankedResolver<C> {
    /// Duplicate addresses are dropped, keeping the first occurrence.
    pub fn new(connector: C, candidates: Vec<AgentEndpoint>) -> Self {
        Self {
            connector,
            candidates: dedup_candidates(candidates),
        }
    }

    pub fn candidates(&self) -> &[AgentEndpoint] {
        &self.candidates
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

#[async_trait]
impl<C: AgentConnector> EndpointResolver for RankedResolver<C> {
    async fn resolve(&self) -> Result<Box<dyn AgentSession>, AcquireError> {
        for endpoint in &self.candidates {
            match self.connector.connect(endpoint).await {
                Ok(session) => {
                    info!("Connected to download agent at {}", endpoint);
                    return Ok(session);
                }
                Err(e) => debug!("Download agent candidate {} failed: {}", endpoint, e),
            }
        }

        Err(AcquireError::TransportUnreachable {
            attempted: self.candidates.len(),
        })
    }
}

/// Remove candidates whose host and port were already seen, preserving order.
pub fn dedup_candidates(candidates: Vec<AgentEndpoint>) -> Vec<AgentEndpoint> {
    let mut unique: Vec<AgentEndpoint> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.iter().any(|seen| seen.same_address(&candidate)) {
            unique.push(candidate);
        }
    }
    unique
}

/// Build the ranked candidate list: the configured endpoint, any extra
/// configured endpoints, then the fallback ports on the configured host.
pub fn candidate_endpoints(config: &AgentConfig) -> Vec<AgentEndpoint> {
    let primary = credentials_for(config, config.username.as_deref(), config.password.as_deref());

    let mut candidates = vec![AgentEndpoint::new(&config.host, config.port, primary.clone())];

    for extra in &config.endpoints {
        let credentials = if extra.username.is_some() || extra.password.is_some() {
            credentials_for(config, extra.username.as_deref(), extra.password.as_deref())
        } else {
            primary.clone()
        };
        candidates.push(AgentEndpoint::new(&extra.host, extra.port, credentials));
    }

    for port in &config.fallback_ports {
        candidates.push(AgentEndpoint::new(&config.host, *port, primary.clone()));
    }

    dedup_candidates(candidates)
}

fn credentials_for(config: &AgentConfig, username: Option<&str>, password: Option<&str>) -> Credentials {
    match (username, password) {
        (Some(username), Some(password)) => Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
        _ if config.allow_default_credentials => {
            warn!(
                "No download agent credentials configured; falling back to factory defaults. \
                 Set agent.username and agent.password in the config file."
            );
            Credentials {
                username: username.unwrap_or(DEFAULT_USERNAME).to_string(),
                password: password.unwrap_or(DEFAULT_PASSWORD).to_string(),
            }
        }
        _ => Credentials {
            username: username.unwrap_or_default().to_string(),
            password: password.unwrap_or_default().to_string(),
        },
    }
}
