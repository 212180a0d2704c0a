//! Refurbishment-mode file source: replays a captured DM code list from
//! disk into the shared queue instead of reading it off a printer-role
//! TCP listener.

use std::path::Path;
use std::time::Duration;

use tokio::fs;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::queue::CodeSender;

/// Delay before the first line is read, giving downstream emitters and
/// their subscribers time to connect.
const PRE_ROLL: Duration = Duration::from_secs(5);
/// Pause between successive lines once replay starts.
const LINE_PAUSE: Duration = Duration::from_millis(20);

/// Read `path` line by line and feed each trimmed line into `out_queue`,
/// one every [`LINE_PAUSE`], after an initial [`PRE_ROLL`] sleep. Blank
/// lines are kept and enqueued as empty-string codes, not skipped. Returns
/// once the file is exhausted.
pub async fn replay(path: &Path, out_queue: CodeSender) -> std::io::Result<()> {
    let contents = fs::read_to_string(path).await?;
    info!(path = %path.display(), "refurbishment source loaded");

    sleep(PRE_ROLL).await;

    for line in contents.lines() {
        let code = line.trim();
        if out_queue.send(code.to_owned()).is_err() {
            warn!("refurbishment queue has no consumer, stopping replay");
            break;
        }
        sleep(LINE_PAUSE).await;
    }

    info!(path = %path.display(), "refurbishment source exhausted");
    Ok(())
}
