//! Token file polling for credential rotation.
//!
//! An external process (a sidecar refreshing the OIDC token, an operator)
//! rewrites the token file; the poller publishes each new token on a
//! `watch` channel that the REST client and the sync channel follow.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Poll `path` every `interval` and publish its trimmed contents when they
/// change. Read errors and empty files are logged and skipped, keeping
/// the previous token.
pub fn watch_token_file(
    path: PathBuf,
    interval: Duration,
    initial: String,
    cancel: CancellationToken,
) -> (watch::Receiver<String>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let token = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents.trim().to_string(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read token file");
                    continue;
                }
            };
            if token.is_empty() {
                tracing::warn!(path = %path.display(), "Token file is empty");
                continue;
            }

            let changed = tx.send_if_modified(|current| {
                if *current == token {
                    return false;
                }
                *current = token;
                true
            });
            if changed {
                tracing::info!(path = %path.display(), "Token file changed");
            }
        }
        tracing::debug!("Token file poller stopped");
    });

    (rx, handle)
}
