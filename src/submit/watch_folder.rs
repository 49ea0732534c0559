use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AcquireError;

/// Torrent descriptors are small; anything bigger is not one.
const MAX_DESCRIPTOR_BYTES: usize = 8 * 1024 * 1024;

/// Downloads torrent descriptor files from the catalog site.
pub struct DescriptorFetcher {
    client: Client,
    url_template: String,
}

impl DescriptorFetcher {
    /// `url_template` must contain a `{hash}` placeholder.
    pub fn new(url_template: &str, user_agent: &str, timeout: Duration) -> Result<Self, AcquireError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AcquireError::FetchError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    pub fn descriptor_url(&self, content_identifier: &str) -> String {
        self.url_template.replace("{hash}", content_identifier)
    }

    pub async fn fetch(&self, content_identifier: &str) -> Result<Vec<u8>, AcquireError> {
        let url = self.descriptor_url(content_identifier);
        debug!("Fetching torrent descriptor from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AcquireError::FetchError(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AcquireError::FetchError(format!(
                "{} answered with HTTP {}",
                url,
                response.status()
            )));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AcquireError::FetchError(format!("failed to read descriptor body: {}", e)))?;
            if bytes.len() + chunk.len() > MAX_DESCRIPTOR_BYTES {
                return Err(AcquireError::FetchError(format!(
                    "descriptor from {} exceeds {} bytes",
                    url, MAX_DESCRIPTOR_BYTES
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        // Catalog sites like to answer 200 with an HTML error page.
        if bytes.first() != Some(&b'd') {
            return Err(AcquireError::FetchError(format!(
                "{} did not return a torrent descriptor",
                url
            )));
        }

        Ok(bytes)
    }
}

/// Fallback path: drop a descriptor file into the folder the download agent
/// watches.
pub struct WatchFolderSubmitter {
    fetcher: DescriptorFetcher,
    folder: PathBuf,
}

impl WatchFolderSubmitter {
    pub fn new(fetcher: DescriptorFetcher, folder: PathBuf) -> Self {
        Self { fetcher, folder }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Fetch the descriptor and place it in the watch folder. Returns the
    /// path the agent is expected to consume.
    pub async fn submit(
        &self,
        content_identifier: &str,
        display_name: Option<&str>,
    ) -> Result<PathBuf, AcquireError> {
        let bytes = self.fetcher.fetch(content_identifier).await?;
        let file_name = descriptor_file_name(content_identifier, display_name);
        let path = write_atomically(&self.folder, &file_name, &bytes).await?;

        info!("Placed torrent descriptor at {:?}", path);
        Ok(path)
    }
}

/// Keep letters, digits, space, hyphen and underscore; drop trailing
/// whitespace.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// `<sanitized-title>_<8-char-hash-prefix>.torrent`
pub fn descriptor_file_name(content_identifier: &str, display_name: Option<&str>) -> String {
    let title = display_name.map(sanitize_title).unwrap_or_default();
    let title = if title.trim().is_empty() {
        "torrent".to_string()
    } else {
        title
    };
    let prefix: String = content_identifier.chars().take(8).collect();
    format!("{}_{}.torrent", title, prefix)
}

/// Removes a half-written temp file unless disarmed.
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// The agent must never see a partially written descriptor, so bytes go to a
/// hidden temp file that is renamed into place.
async fn write_atomically(folder: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AcquireError> {
    tokio::fs::create_dir_all(folder).await?;

    let final_path = folder.join(file_name);
    let mut partial = PartialFile {
        path: folder.join(format!(".{}.{}.part", file_name, Uuid::new_v4().simple())),
        armed: true,
    };

    tokio::fs::write(&partial.path, bytes).await?;
    tokio::fs::rename(&partial.path, &final_path).await?;
    partial.armed = false;

    Ok(final_path)
}
