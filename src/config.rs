use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_host")]
    pub host: String,
    #[serde(default = "default_agent_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Fall back to the agent's factory credentials when none are configured.
    #[serde(default = "default_allow_default_credentials")]
    pub allow_default_credentials: bool,
    #[serde(default = "default_fallback_ports")]
    pub fallback_ports: Vec<u16>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// An additional ranked candidate tried after the primary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Folder the agent watches for `.torrent` files. Unset means
    /// `<download_dir>/watch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_descriptor_url_template")]
    pub descriptor_url_template: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_trackers")]
    pub trackers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_render_interval_secs")]
    pub render_interval_secs: u64,
    #[serde(default = "default_max_unmatched_polls")]
    pub max_unmatched_polls: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub ingest_poll_interval_secs: u64,
    #[serde(default = "default_ingest_max_attempts")]
    pub ingest_max_attempts: u32,
    #[serde(default = "default_max_wall_clock_secs")]
    pub max_wall_clock_secs: u64,
}

// Default value functions
fn default_agent_host() -> String {
    "127.0.0.1".to_string()
}
fn default_agent_port() -> u16 {
    8080
}
fn default_allow_default_credentials() -> bool {
    true
}
fn default_fallback_ports() -> Vec<u16> {
    vec![8080, 8081, 8090, 9090]
}
fn default_request_timeout_secs() -> u64 {
    3
}
fn default_download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}
fn default_descriptor_url_template() -> String {
    "https://yts.mx/torrent/download/{hash}".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36"
        .to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_trackers() -> Vec<String> {
    [
        "udp://open.demonii.com:1337/announce",
        "udp://tracker.openbittorrent.com:80",
        "udp://tracker.coppersurfer.tk:6969",
        "udp://glotorrents.pw:6969/announce",
        "udp://tracker.opentrackr.org:1337/announce",
        "udp://torrent.gresille.org:80/announce",
        "udp://p4p.arenabg.com:1337",
        "udp://tracker.leechers-paradise.org:6969",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_render_interval_secs() -> u64 {
    3
}
fn default_max_unmatched_polls() -> u32 {
    60
}
fn default_ingest_max_attempts() -> u32 {
    30
}
fn default_max_wall_clock_secs() -> u64 {
    6 * 60 * 60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: default_agent_host(),
            port: default_agent_port(),
            username: None,
            password: None,
            allow_default_credentials: default_allow_default_credentials(),
            fallback_ports: default_fallback_ports(),
            request_timeout_secs: default_request_timeout_secs(),
            endpoints: Vec::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            watch_folder: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            descriptor_url_template: default_descriptor_url_template(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            trackers: default_trackers(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            render_interval_secs: default_render_interval_secs(),
            max_unmatched_polls: default_max_unmatched_polls(),
            ingest_poll_interval_secs: default_poll_interval_secs(),
            ingest_max_attempts: default_ingest_max_attempts(),
            max_wall_clock_secs: default_max_wall_clock_secs(),
        }
    }
}

impl AgentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PathsConfig {
    pub fn watch_folder(&self) -> PathBuf {
        self.watch_folder
            .clone()
            .unwrap_or_else(|| self.download_dir.join("watch"))
    }
}

impl CatalogConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl MonitorConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            render_interval: Duration::from_secs(self.render_interval_secs),
            max_unmatched_polls: self.max_unmatched_polls,
            ingest_interval: Duration::from_secs(self.ingest_poll_interval_secs),
            ingest_max_attempts: self.ingest_max_attempts,
            max_wall_clock: Duration::from_secs(self.max_wall_clock_secs),
        }
    }
}

pub struct ConfigManager {
    config_file: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load the config from its default location, writing a default file on
    /// first run.
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("", "", "torrent-grabber")
            .context("Failed to determine config directory")?;

        Self::load_from(&project_dirs.config_dir().join("config.toml"))
    }

    /// Load the config from an explicit path, writing a default file there
    /// if it does not exist yet.
    pub fn load_from(config_file: &Path) -> Result<Self> {
        if let Some(config_dir) = config_file.parent() {
            if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
                fs::create_dir_all(config_dir).with_context(|| {
                    format!("Failed to create config directory: {:?}", config_dir)
                })?;
            }
        }

        let config = if config_file.exists() {
            Self::load_config(config_file)?
        } else {
            let default_config = Config::default();
            Self::save_config(config_file, &default_config)?;
            default_config
        };

        Ok(Self {
            config_file: config_file.to_path_buf(),
            config,
        })
    }

    /// Get a reference to the current config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the config file path
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Save the current config to disk
    pub fn save(&self) -> Result<()> {
        Self::save_config(&self.config_file, &self.config)
    }

    /// Replace the config with defaults and persist it
    pub fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        self.save()
    }

    fn load_config(config_file: &Path) -> Result<Config> {
        let content = fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file: {:?}", config_file))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_file))?;

        Ok(config)
    }

    fn save_config(config_file: &Path, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(config_file, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

        Ok(())
    }

    /// Validate the current configuration
    pub fn validate(&self) -> Result<()> {
        let agent = &self.config.agent;
        if agent.host.trim().is_empty() {
            anyhow::bail!("agent.host cannot be empty");
        }
        if agent.port == 0 {
            anyhow::bail!("agent.port must be greater than 0");
        }
        if agent.fallback_ports.contains(&0) {
            anyhow::bail!("agent.fallback_ports cannot contain port 0");
        }
        if agent.request_timeout_secs == 0 {
            anyhow::bail!("agent.request_timeout_secs must be greater than 0");
        }
        for endpoint in &agent.endpoints {
            if endpoint.host.trim().is_empty() || endpoint.port == 0 {
                anyhow::bail!("agent.endpoints entries need a host and a non-zero port");
            }
        }

        if self.config.paths.watch_folder().as_os_str().is_empty() {
            anyhow::bail!("paths.watch_folder cannot be empty");
        }

        let catalog = &self.config.catalog;
        if !catalog.descriptor_url_template.contains("{hash}") {
            anyhow::bail!("catalog.descriptor_url_template must contain a {{hash}} placeholder");
        }
        if catalog.fetch_timeout_secs == 0 {
            anyhow::bail!("catalog.fetch_timeout_secs must be greater than 0");
        }

        let monitor = &self.config.monitor;
        if monitor.max_unmatched_polls == 0 || monitor.ingest_max_attempts == 0 {
            anyhow::bail!("monitor poll counts must be greater than 0");
        }
        if monitor.max_wall_clock_secs == 0 {
            anyhow::bail!("monitor.max_wall_clock_secs must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let manager = ConfigManager::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(manager.config().agent.port, 8080);
        assert_eq!(manager.config().monitor.max_unmatched_polls, 60);
        assert!(manager.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[agent]
host = "nas.local"
port = 8999
username = "me"
password = "secret"

[paths]
watch_folder = "/srv/watch"
"#,
        )
        .unwrap();

        let manager = ConfigManager::load_from(&path).unwrap();
        let config = manager.config();
        assert_eq!(config.agent.host, "nas.local");
        assert_eq!(config.agent.username.as_deref(), Some("me"));
        assert_eq!(config.agent.fallback_ports, vec![8080, 8081, 8090, 9090]);
        assert_eq!(config.paths.watch_folder(), PathBuf::from("/srv/watch"));
        assert_eq!(config.catalog.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_watch_folder_follows_configured_download_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[paths]\ndownload_dir = \"/srv/media\"\n").unwrap();

        let manager = ConfigManager::load_from(&path).unwrap();
        let paths = &manager.config().paths;
        assert_eq!(paths.download_dir, PathBuf::from("/srv/media"));
        assert_eq!(paths.watch_folder, None);
        assert_eq!(paths.watch_folder(), PathBuf::from("/srv/media/watch"));
    }

    #[test]
    fn test_validation_rejects_template_without_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[catalog]\ndescriptor_url_template = \"https://example.org/torrent\"\n",
        )
        .unwrap();

        let manager = ConfigManager::load_from(&path).unwrap();
        assert!(manager.validate().is_err());
    }

    #[test]
    fn test_monitor_settings_conversion() {
        let settings = MonitorConfig::default().settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.render_interval, Duration::from_secs(3));
        assert_eq!(settings.ingest_max_attempts, 30);
    }
}
