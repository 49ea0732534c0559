use std::path::Path;
use tracing::{info, warn};

use crate::agent::AgentSession;
use crate::error::AcquireError;

/// Hand a magnet reference straight to the agent.
///
/// Success only means the agent accepted the call; whether the torrent
/// shows up in the listing is for the progress monitor to find out.
pub async fn submit_magnet(
    session: &dyn AgentSession,
    magnet_reference: &str,
    save_path: &Path,
) -> Result<(), AcquireError> {
    match session.add_magnet(magnet_reference, save_path).await {
        Ok(()) => {
            info!(
                "Download agent at {} accepted magnet (save path {:?})",
                session.endpoint(),
                save_path
            );
            Ok(())
        }
        Err(e) => {
            warn!("Download agent at {} rejected magnet: {}", session.endpoint(), e);
            Err(AcquireError::SubmissionRejected(e.to_string()))
        }
    }
}
