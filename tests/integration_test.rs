use anyhow::Result;
use httpmock::MockServer;
use httpmock::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use torrent_grabber::{
    AcquireError, AcquireOutcome, Acquirer, AgentConnector, AgentEndpoint, AgentError,
    Credentials, DescriptorFetcher, EndpointResolver, MonitorOutcome, MonitorSettings,
    QbittorrentConnector, RankedResolver, StatusRenderer, SubmissionPath, TorrentState,
    TorrentStatus, TorrentTarget, WatchFolderSubmitter,
};

const HASH: &str = "ABCDEF0123456789ABCDEF0123456789ABCDEF01";
const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Test/1.0";
const DESCRIPTOR: &[u8] = b"d8:announce14:udp://t.test:14:infod4:name4:demoee";

#[derive(Default)]
struct RecordingRenderer {
    announced: Vec<String>,
    progress: Vec<TorrentStatus>,
    warnings: Vec<String>,
    ingest_checks: u32,
    remove_on_ingest: Option<(u32, PathBuf)>,
}

impl StatusRenderer for RecordingRenderer {
    fn ingest_pending(&mut self, _descriptor: &Path, attempt: u32, _max_attempts: u32) {
        self.ingest_checks += 1;
        if let Some((when, path)) = &self.remove_on_ingest {
            if *when == attempt {
                std::fs::remove_file(path).unwrap();
            }
        }
    }

    fn announce(&mut self, name: &str) {
        self.announced.push(name.to_string());
    }

    fn progress(&mut self, status: &TorrentStatus) {
        self.progress.push(status.clone());
    }

    fn finish(&mut self, _status: &TorrentStatus) {}

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

fn instant_settings() -> MonitorSettings {
    MonitorSettings {
        poll_interval: Duration::ZERO,
        render_interval: Duration::ZERO,
        ingest_interval: Duration::ZERO,
        max_unmatched_polls: 5,
        ..MonitorSettings::default()
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "admin".to_string(),
        password: "secret".to_string(),
    }
}

fn endpoint_for(server: &MockServer) -> AgentEndpoint {
    AgentEndpoint::new("127.0.0.1", server.port(), credentials())
}

/// A port nothing listens on.
fn dead_endpoint() -> AgentEndpoint {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    AgentEndpoint::new("127.0.0.1", port, credentials())
}

fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v2/auth/login")
            .body_includes("username=admin");
        then.status(200)
            .header("set-cookie", "SID=test-session; HttpOnly; path=/")
            .body("Ok.");
    })
}

fn connector() -> QbittorrentConnector {
    QbittorrentConnector::new(Duration::from_secs(2))
}

#[tokio::test]
async fn test_qbittorrent_session_lists_torrents() -> Result<()> {
    let server = MockServer::start_async().await;
    let login = mock_login(&server);
    let listing = server.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/info");
        then.status(200).json_body(json!([
            {
                "hash": HASH.to_lowercase(),
                "name": "Big Buck Bunny",
                "progress": 0.25,
                "state": "downloading",
                "eta": 200,
                "dlspeed": 2048,
                "num_seeds": 12
            },
            {
                "hash": "1111111111111111111111111111111111111111",
                "name": "Other",
                "progress": 1.0,
                "state": "stalledUP",
                "eta": 8640000,
                "dlspeed": 0
            }
        ]));
    });

    let session = connector().connect(&endpoint_for(&server)).await?;
    let torrents = session.list_torrents().await?;

    login.assert();
    listing.assert();
    assert_eq!(torrents.len(), 2);
    assert_eq!(torrents[0].state, TorrentState::Downloading);
    assert_eq!(torrents[0].eta_seconds, Some(200));
    assert!(torrents[0].matches(HASH));
    assert_eq!(torrents[1].state, TorrentState::SeedingStall);
    assert_eq!(torrents[1].eta_seconds, None);
    Ok(())
}

#[tokio::test]
async fn test_qbittorrent_login_refused() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/v2/auth/login");
        then.status(200).body("Fails.");
    });

    let result = connector().connect(&endpoint_for(&server)).await;
    assert!(matches!(result, Err(AgentError::LoginRefused)));
    Ok(())
}

#[tokio::test]
async fn test_qbittorrent_truncated_login_body_is_an_error() -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises more body than it sends, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await?;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nOk")
            .await?;
        socket.shutdown().await?;
        while matches!(socket.read(&mut request).await, Ok(n) if n > 0) {}
        Ok::<_, std::io::Error>(())
    });

    let result = connector()
        .connect(&AgentEndpoint::new("127.0.0.1", port, credentials()))
        .await;
    assert!(matches!(result, Err(AgentError::Http(_))));
    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_qbittorrent_add_magnet_disables_auto_management() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_login(&server);
    let add = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v2/torrents/add")
            .body_includes("autoTMM=false")
            .body_includes("savepath=%2Fsrv%2Fmedia")
            .body_includes("urls=magnet%3A%3Fxt%3Durn%3Abtih%3A");
        then.status(200).body("Ok.");
    });

    let session = connector().connect(&endpoint_for(&server)).await?;
    let target = TorrentTarget::new(HASH, Some("Demo"), &[])?;
    session
        .add_magnet(target.magnet_reference(), Path::new("/srv/media"))
        .await?;

    add.assert();
    Ok(())
}

#[tokio::test]
async fn test_qbittorrent_add_rejected() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_login(&server);
    server.mock(|when, then| {
        when.method(POST).path("/api/v2/torrents/add");
        then.status(200).body("Fails.");
    });

    let session = connector().connect(&endpoint_for(&server)).await?;
    let result = session.add_magnet("magnet:?xt=urn:btih:x", Path::new("/tmp")).await;
    assert!(matches!(result, Err(AgentError::Rejected(_))));
    Ok(())
}

#[tokio::test]
async fn test_resolver_skips_dead_and_duplicate_candidates() -> Result<()> {
    let server = MockServer::start_async().await;
    let login = mock_login(&server);

    let dead = dead_endpoint();
    let live = endpoint_for(&server);
    let resolver = RankedResolver::new(
        connector(),
        vec![dead.clone(), dead.clone(), live.clone(), live.clone()],
    );
    assert_eq!(resolver.candidates().len(), 2);

    let session = resolver.resolve().await?;
    assert_eq!(session.endpoint().port, live.port);
    login.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_resolver_unreachable_never_panics() -> Result<()> {
    let resolver = RankedResolver::new(connector(), vec![dead_endpoint(), dead_endpoint()]);
    let result = resolver.resolve().await;
    assert!(matches!(
        result,
        Err(AcquireError::TransportUnreachable { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_descriptor_fetch_sends_browser_user_agent() -> Result<()> {
    let server = MockServer::start_async().await;
    let download = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/torrent/download/{}", HASH))
            .header("user-agent", BROWSER_UA);
        then.status(200).body(DESCRIPTOR);
    });

    let temp_dir = TempDir::new()?;
    let fetcher = DescriptorFetcher::new(
        &format!("{}/torrent/download/{{hash}}", server.base_url()),
        BROWSER_UA,
        Duration::from_secs(5),
    )?;
    let submitter = WatchFolderSubmitter::new(fetcher, temp_dir.path().join("watch"));

    let path = submitter.submit(HASH, Some("Movie: Part 2/3!")).await?;

    download.assert();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "Movie Part 23_ABCDEF01.torrent"
    );
    assert_eq!(std::fs::read(&path)?, DESCRIPTOR);
    Ok(())
}

#[tokio::test]
async fn test_descriptor_html_page_is_fetch_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET);
        then.status(200).body("<html>Cloudflare says no</html>");
    });

    let temp_dir = TempDir::new()?;
    let fetcher = DescriptorFetcher::new(
        &format!("{}/t/{{hash}}", server.base_url()),
        BROWSER_UA,
        Duration::from_secs(5),
    )?;
    let submitter = WatchFolderSubmitter::new(fetcher, temp_dir.path().to_path_buf());

    let result = submitter.submit(HASH, None).await;
    assert!(matches!(result, Err(AcquireError::FetchError(_))));
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_agent_and_missing_descriptor_keeps_magnet() -> Result<()> {
    let catalog = MockServer::start_async().await;
    let download = catalog.mock(|when, then| {
        when.method(GET).path(format!("/torrent/download/{}", HASH));
        then.status(404);
    });

    let temp_dir = TempDir::new()?;
    let watch_folder = temp_dir.path().join("watch");
    let fetcher = DescriptorFetcher::new(
        &format!("{}/torrent/download/{{hash}}", catalog.base_url()),
        BROWSER_UA,
        Duration::from_secs(5),
    )?;
    let acquirer = Acquirer::new(
        Box::new(RankedResolver::new(connector(), vec![dead_endpoint()])),
        WatchFolderSubmitter::new(fetcher, watch_folder.clone()),
        instant_settings(),
        temp_dir.path().to_path_buf(),
    );

    let trackers = vec!["udp://tracker.example.org:1337/announce".to_string()];
    let target = TorrentTarget::new(HASH, Some("Big Buck Bunny"), &trackers)?;
    let original_magnet = target.magnet_reference().to_string();
    let mut renderer = RecordingRenderer::default();

    let outcome = acquirer.acquire(&target, &mut renderer).await;

    download.assert();
    match outcome {
        AcquireOutcome::PartialSuccess {
            magnet_reference,
            reason,
        } => {
            assert_eq!(magnet_reference, original_magnet);
            assert!(matches!(reason, AcquireError::FetchError(_)));
        }
        other => panic!("expected partial success, got {:?}", other),
    }
    assert!(!watch_folder.exists() || std::fs::read_dir(&watch_folder)?.count() == 0);
    Ok(())
}

#[tokio::test]
async fn test_watch_folder_path_completes_on_uploading() -> Result<()> {
    let agent = MockServer::start_async().await;
    mock_login(&agent);
    let add = agent.mock(|when, then| {
        when.method(POST).path("/api/v2/torrents/add");
        then.status(415).body("Torrent file is not valid");
    });
    let listing = agent.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/info");
        then.status(200).json_body(json!([
            {
                "hash": HASH.to_lowercase(),
                "name": "Big Buck Bunny",
                "progress": 1.0,
                "state": "uploading",
                "eta": 8640000,
                "dlspeed": 0
            }
        ]));
    });

    let catalog = MockServer::start_async().await;
    catalog.mock(|when, then| {
        when.method(GET).path(format!("/torrent/download/{}", HASH));
        then.status(200).body(DESCRIPTOR);
    });

    let temp_dir = TempDir::new()?;
    let watch_folder = temp_dir.path().join("watch");
    let fetcher = DescriptorFetcher::new(
        &format!("{}/torrent/download/{{hash}}", catalog.base_url()),
        BROWSER_UA,
        Duration::from_secs(5),
    )?;
    let acquirer = Acquirer::new(
        Box::new(RankedResolver::new(connector(), vec![endpoint_for(&agent)])),
        WatchFolderSubmitter::new(fetcher, watch_folder.clone()),
        instant_settings(),
        temp_dir.path().to_path_buf(),
    );

    let target = TorrentTarget::new(HASH, Some("Big Buck Bunny"), &[])?;
    let mut renderer = RecordingRenderer {
        remove_on_ingest: Some((3, watch_folder.join("Big Buck Bunny_ABCDEF01.torrent"))),
        ..Default::default()
    };

    let outcome = acquirer.acquire(&target, &mut renderer).await;

    add.assert();
    listing.assert_hits(1);
    assert!(matches!(
        outcome,
        AcquireOutcome::Success {
            path: SubmissionPath::WatchFolder,
            monitor: MonitorOutcome::Completed(_),
        }
    ));
    assert_eq!(renderer.ingest_checks, 3);
    assert_eq!(renderer.announced, vec!["Big Buck Bunny"]);
    assert_eq!(renderer.progress.len(), 1);
    assert!(renderer.warnings.is_empty());
    Ok(())
}
