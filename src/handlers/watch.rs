use anyhow::Result;
use console::{Term, style};
use torrent_grabber::{
    Config, ConsoleRenderer, MonitorOutcome, ProgressMonitor, QbittorrentConnector,
    RankedResolver, candidate_endpoints,
};

/// Follow a torrent already known to the agent. Returns whether it completed.
pub async fn handle_watch(config: &Config, hash: String) -> Result<bool> {
    let term = Term::stdout();
    let resolver = RankedResolver::new(
        QbittorrentConnector::new(config.agent.request_timeout()),
        candidate_endpoints(&config.agent),
    );

    term.write_line(&format!(
        "{} Following {} across {} candidate endpoints",
        style("🔍").cyan(),
        style(hash.trim()).cyan(),
        resolver.candidates().len()
    ))?;

    let monitor = ProgressMonitor::new(&resolver, config.monitor.settings());
    let mut renderer = ConsoleRenderer::new();
    let outcome = monitor.track(hash.trim(), &mut renderer).await;

    Ok(matches!(outcome, MonitorOutcome::Completed(_)))
}
