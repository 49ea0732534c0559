use crate::agent::{TorrentState, TorrentStatus};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const BAR_WIDTH: usize = 30;

/// One-line description of a torrent's state as shown on the progress line.
pub fn status_line(status: &TorrentStatus) -> String {
    match &status.state {
        TorrentState::Queued => "queued for download".to_string(),
        TorrentState::StalledNoPeers => "finding peers".to_string(),
        TorrentState::Downloading => format!(
            "{} {:.1}% {} ETA {}",
            progress_bar(status.fraction_complete, BAR_WIDTH),
            status.fraction_complete * 100.0,
            format_rate(status.download_rate),
            format_eta(status.eta_seconds)
        ),
        TorrentState::Paused => "download paused".to_string(),
        TorrentState::Checking => "checking files".to_string(),
        TorrentState::SeedingStall | TorrentState::Uploading => "completed".to_string(),
        TorrentState::Unknown(raw) => raw.clone(),
    }
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Bytes per second, switching unit at 1 KiB and 1 MiB.
pub fn format_rate(bytes_per_second: u64) -> String {
    if bytes_per_second >= MIB {
        format!("{:.1} MB/s", bytes_per_second as f64 / MIB as f64)
    } else if bytes_per_second >= KIB {
        format!("{:.1} KB/s", bytes_per_second as f64 / KIB as f64)
    } else {
        format!("{} B/s", bytes_per_second)
    }
}

/// Coarsest non-zero unit plus the next one down when that is non-zero,
/// e.g. "2h 5m", "3m 20s", "45s".
pub fn format_eta(eta_seconds: Option<u64>) -> String {
    let total_seconds = match eta_seconds {
        Some(seconds) if seconds > 0 => seconds,
        _ => return "unknown".to_string(),
    };

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    } else if minutes > 0 {
        if seconds > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}m", minutes)
        }
    } else {
        format!("{}s", seconds)
    }
}
