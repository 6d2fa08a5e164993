//! Broadcast channel for failed data-service operations.
//!
//! Every failed load or mutation is published here in addition to being
//! logged (loads) or returned (mutations). A central notification surface
//! subscribes once instead of each caller wiring its own error display.

use std::fmt;

use chrono::{DateTime, Utc};
use msel_core::types::EntityId;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// The data-service operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    LoadMine,
    LoadByParent,
    LoadById,
    Add,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::LoadMine => "load mine",
            Self::LoadByParent => "load by parent",
            Self::LoadById => "load by id",
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One failed operation.
#[derive(Debug, Clone)]
pub struct ServiceFailure {
    /// Entity type name, e.g. `"ScenarioEvent"`.
    pub entity: &'static str,
    pub operation: Operation,
    /// The entity (or parent, for scoped loads) the operation targeted.
    pub target_id: Option<EntityId>,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out channel of [`ServiceFailure`]s, shared by every service of a
/// session. Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct FailureChannel {
    sender: broadcast::Sender<ServiceFailure>,
}

impl FailureChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a failure to all current subscribers. Dropped silently when
    /// nobody listens.
    pub fn publish(&self, failure: ServiceFailure) {
        let _ = self.sender.send(failure);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceFailure> {
        self.sender.subscribe()
    }
}

impl Default for FailureChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ServiceFailure {
        ServiceFailure {
            entity: "Msel",
            operation: Operation::Update,
            target_id: None,
            status: Some(500),
            message: "boom".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_failures() {
        let channel = FailureChannel::default();
        let mut rx = channel.subscribe();

        channel.publish(failure());

        let received = rx.recv().await.expect("should receive the failure");
        assert_eq!(received.operation, Operation::Update);
        assert_eq!(received.status, Some(500));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        FailureChannel::default().publish(failure());
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::LoadByParent.to_string(), "load by parent");
    }
}
