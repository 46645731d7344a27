//! Push-event driven invalidation.
//!
//! Other sessions change data behind this client's back. The server
//! announces those changes on a push channel; each event is mapped to the
//! cache scopes it may have affected and handed to the
//! [`InvalidationGate`], never straight to the query client.
//!
//! Push delivery is best effort. Missing an event is safe because the next
//! fetch returns current state anyway, so malformed events are dropped and a
//! lost channel is simply reconnected. After every reconnection the whole
//! cache is invalidated once to catch up on whatever was missed.

use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::Deserialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::{InvalidationScope, keys};
use crate::config::SyncConfig;
use crate::domain::{AreaId, ProjectId, TaskId};
use crate::error::{PushEventError, TransportError};
use crate::gate::InvalidationGate;

// =============================================================================
// Events
// =============================================================================

/// An undecoded notification as delivered by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPushEvent {
    /// Event name, e.g. `task_updated`.
    pub event_type: String,
    /// JSON payload text. May be empty.
    pub data: String,
}

impl RawPushEvent {
    /// Creates a raw event.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
        }
    }
}

/// A decoded change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A task was created.
    TaskCreated {
        /// The new task.
        id: Option<TaskId>,
    },
    /// A task changed.
    TaskUpdated {
        /// The changed task.
        id: Option<TaskId>,
    },
    /// A task was deleted.
    TaskDeleted {
        /// The deleted task.
        id: Option<TaskId>,
    },
    /// A project changed.
    ProjectUpdated {
        /// The changed project.
        id: Option<ProjectId>,
    },
    /// An area changed.
    AreaUpdated {
        /// The changed area.
        id: Option<AreaId>,
    },
    /// A tag changed.
    TagUpdated,
    /// Many entities changed at once.
    BulkChange,
    /// The saved filters of a view changed.
    SavedFilterChanged {
        /// View name.
        view: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    view: Option<String>,
}

impl TryFrom<&RawPushEvent> for PushEvent {
    type Error = PushEventError;

    fn try_from(raw: &RawPushEvent) -> Result<Self, Self::Error> {
        let malformed = |message: String| PushEventError::MalformedPayload {
            event_type: raw.event_type.clone(),
            message,
        };
        let payload: Payload = if raw.data.trim().is_empty() {
            Payload::default()
        } else {
            serde_json::from_str(&raw.data).map_err(|error| malformed(error.to_string()))?
        };

        let event = match raw.event_type.as_str() {
            "task_created" => Self::TaskCreated {
                id: payload.id.map(TaskId::from_uuid),
            },
            "task_updated" => Self::TaskUpdated {
                id: payload.id.map(TaskId::from_uuid),
            },
            "task_deleted" => Self::TaskDeleted {
                id: payload.id.map(TaskId::from_uuid),
            },
            "project_updated" => Self::ProjectUpdated {
                id: payload.id.map(ProjectId::from_uuid),
            },
            "area_updated" => Self::AreaUpdated {
                id: payload.id.map(AreaId::from_uuid),
            },
            "tag_updated" => Self::TagUpdated,
            "bulk_change" => Self::BulkChange,
            "saved_filter_changed" => Self::SavedFilterChanged {
                view: payload
                    .view
                    .ok_or_else(|| malformed("missing field `view`".to_string()))?,
            },
            other => return Err(PushEventError::UnknownType(other.to_string())),
        };
        Ok(event)
    }
}

impl PushEvent {
    /// The cache scopes this event may have made stale.
    #[must_use]
    pub fn scopes(&self) -> Vec<InvalidationScope> {
        use InvalidationScope::{Invalidate, Remove};

        let mut scopes = Vec::new();
        match self {
            Self::TaskCreated { .. } => {
                scopes.extend([Invalidate(keys::views::root()), Invalidate(keys::tasks::all())]);
            }
            Self::TaskUpdated { id } => {
                scopes.extend(id.map(|id| Invalidate(keys::tasks::detail(id))));
                scopes.extend([Invalidate(keys::views::root()), Invalidate(keys::tasks::all())]);
            }
            Self::TaskDeleted { id } => {
                scopes.extend(id.map(|id| Remove(keys::tasks::detail(id))));
                scopes.extend([Invalidate(keys::views::root()), Invalidate(keys::tasks::all())]);
            }
            Self::ProjectUpdated { id } => {
                scopes.extend(id.map(|id| Invalidate(keys::projects::detail(id))));
                scopes.extend([
                    Invalidate(keys::projects::all()),
                    Invalidate(keys::views::root()),
                ]);
            }
            Self::AreaUpdated { id } => {
                scopes.extend(id.map(|id| Invalidate(keys::areas::detail(id))));
                scopes.extend([Invalidate(keys::areas::all()), Invalidate(keys::views::root())]);
            }
            Self::TagUpdated => {
                scopes.extend([Invalidate(keys::tags::all()), Invalidate(keys::views::root())]);
            }
            Self::BulkChange => {
                scopes.extend([
                    Invalidate(keys::views::root()),
                    Invalidate(keys::tasks::all()),
                    Invalidate(keys::projects::all()),
                    Invalidate(keys::areas::all()),
                    Invalidate(keys::tags::all()),
                ]);
            }
            Self::SavedFilterChanged { view } => {
                scopes.push(Invalidate(keys::saved_filters::view(view)));
            }
        }
        scopes
    }
}

/// Scopes invalidated after a reconnection: everything.
#[must_use]
pub fn catch_up_scopes() -> Vec<InvalidationScope> {
    keys::entity_roots()
        .into_iter()
        .chain([keys::saved_filters::all()])
        .map(InvalidationScope::Invalidate)
        .collect()
}

// =============================================================================
// PushChannel
// =============================================================================

/// Stream of notifications from one connection. Ends when the connection is
/// lost.
pub type PushStream = BoxStream<'static, Result<RawPushEvent, TransportError>>;

/// The external push-notification collaborator.
pub trait PushChannel: Send + Sync {
    /// Opens a new connection.
    fn connect(&self) -> BoxFuture<'_, Result<PushStream, TransportError>>;
}

// =============================================================================
// EventInvalidator
// =============================================================================

/// Consumes a [`PushChannel`] and feeds the [`InvalidationGate`].
pub struct EventInvalidator {
    gate: Arc<InvalidationGate>,
    channel: Arc<dyn PushChannel>,
    config: SyncConfig,
}

impl std::fmt::Debug for EventInvalidator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EventInvalidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventInvalidator {
    /// Creates an invalidator using the gate's configuration.
    #[must_use]
    pub fn new(gate: Arc<InvalidationGate>, channel: Arc<dyn PushChannel>) -> Self {
        Self {
            config: *gate.config(),
            gate,
            channel,
        }
    }

    /// Decodes `raw` and requests its scopes through the gate.
    ///
    /// Returns the decoded event, or `None` if it was dropped.
    pub fn handle_raw(&self, raw: &RawPushEvent) -> Option<PushEvent> {
        match PushEvent::try_from(raw) {
            Ok(event) => {
                self.handle(&event);
                Some(event)
            }
            Err(error) => {
                tracing::debug!(error = %error, "dropped push event");
                None
            }
        }
    }

    /// Requests the scopes of `event` through the gate.
    pub fn handle(&self, event: &PushEvent) {
        tracing::debug!(?event, "push event");
        self.gate.request_invalidation(event.scopes());
    }

    /// Consumes the channel forever, reconnecting with exponential backoff.
    pub async fn run(&self) {
        let mut attempt: u32 = 0;
        let mut connected_before = false;
        loop {
            match self.channel.connect().await {
                Ok(stream) => {
                    attempt = 0;
                    if connected_before {
                        tracing::debug!("push channel reconnected; catching up");
                        self.gate.request_invalidation(catch_up_scopes());
                    }
                    connected_before = true;
                    self.consume(stream).await;
                }
                Err(error) => {
                    tracing::warn!(error = %error, attempt, "push channel connect failed");
                }
            }
            let delay = self.config.reconnect_delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::time::sleep(delay).await;
        }
    }

    /// Runs [`Self::run`] on the current Tokio runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn consume(&self, mut stream: PushStream) {
        while let Some(item) = stream.next().await {
            match item {
                Ok(raw) => {
                    self.handle_raw(&raw);
                }
                Err(error) => {
                    tracing::warn!(error = %error, "push channel lost");
                    return;
                }
            }
        }
        tracing::warn!("push channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("task_created", "")]
    #[case("tag_updated", "{}")]
    #[case("bulk_change", "{\"type\":\"bulk_change\"}")]
    fn test_events_without_id_decode(#[case] event_type: &str, #[case] data: &str) {
        assert!(PushEvent::try_from(&RawPushEvent::new(event_type, data)).is_ok());
    }

    #[rstest]
    #[case("task_updated", "{not json")]
    #[case("task_updated", "{\"id\":\"not-a-uuid\"}")]
    #[case("saved_filter_changed", "{}")]
    fn test_malformed_payloads_are_rejected(#[case] event_type: &str, #[case] data: &str) {
        assert!(matches!(
            PushEvent::try_from(&RawPushEvent::new(event_type, data)),
            Err(PushEventError::MalformedPayload { .. })
        ));
    }

    #[rstest]
    fn test_unknown_type_is_rejected() {
        assert_eq!(
            PushEvent::try_from(&RawPushEvent::new("heartbeat", "")),
            Err(PushEventError::UnknownType("heartbeat".to_string()))
        );
    }

    #[rstest]
    fn test_task_deleted_removes_detail() {
        let id = TaskId::generate();
        let scopes = PushEvent::TaskDeleted { id: Some(id) }.scopes();
        assert_eq!(
            scopes[0],
            InvalidationScope::Remove(keys::tasks::detail(id))
        );
        assert_eq!(scopes.len(), 3);
    }
}
