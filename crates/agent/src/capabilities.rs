//! Live capabilities of the signed-in user on the active MSEL.
//!
//! Recomputed whenever the MSEL, role assignment or team stores change,
//! so a realtime role change reaches UI gating without a reload.

use std::sync::Arc;

use msel_core::roles::{resolve_msel_capabilities, MselCapabilities};
use msel_core::types::EntityId;
use msel_store::SessionStores;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capabilities of `user_id` on the active MSEL, optionally scoped to one
/// scenario event. All false when no MSEL is active.
pub fn current_capabilities(
    stores: &SessionStores,
    user_id: EntityId,
    scenario_event_id: Option<EntityId>,
) -> MselCapabilities {
    stores
        .active_msel_view()
        .map(|msel| resolve_msel_capabilities(user_id, &msel, scenario_event_id))
        .unwrap_or_default()
}

/// Publish MSEL-level capabilities of `user_id`, updated on every
/// relevant store change until `cancel` fires.
pub fn watch_capabilities(
    stores: Arc<SessionStores>,
    user_id: EntityId,
    cancel: CancellationToken,
) -> (watch::Receiver<MselCapabilities>, JoinHandle<()>) {
    // Subscribe before the first computation so no change falls between.
    let mut msels = stores.msels.query();
    let mut roles = stores.user_msel_roles.query();
    let mut teams = stores.teams.query();
    let (tx, rx) = watch::channel(current_capabilities(&stores, user_id, None));

    let handle = tokio::spawn(async move {
        loop {
            let alive = tokio::select! {
                _ = cancel.cancelled() => break,
                alive = msels.changed() => alive,
                alive = roles.changed() => alive,
                alive = teams.changed() => alive,
            };
            if !alive {
                break;
            }

            let capabilities = current_capabilities(&stores, user_id, None);
            tx.send_if_modified(|current| {
                if *current == capabilities {
                    return false;
                }
                tracing::debug!(%user_id, ?capabilities, "Capabilities changed");
                *current = capabilities;
                true
            });
        }
    });

    (rx, handle)
}
