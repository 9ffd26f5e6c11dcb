//! Registry change feed: event types and the in-process broadcaster.
//!
//! Every successful registry put emits exactly one [`ChangeEvent`].
//! Delivery to subscribers is at-least-once from the consumer's point
//! of view (a consumer may observe a redelivered snapshot after a
//! crash/restart), so handlers downstream must stay idempotent.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::tenant::TenantRecord;

/// Default buffer size for the broadcast channel.
/// Slow receivers lag and drop the oldest events beyond this limit.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Kind of registry mutation that produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEventKind {
    /// First insert of the tenant record
    Created,
    /// Any subsequent write (status updates included)
    Updated,
}

impl ChangeEventKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEventKind::Created => "created",
            ChangeEventKind::Updated => "updated",
        }
    }
}

impl std::fmt::Display for ChangeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A mutation observed on the tenant registry.
///
/// Carries a full snapshot of the record as written, so consumers
/// never need to read back just to see what changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub kind: ChangeEventKind,
    pub snapshot: TenantRecord,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    /// Create a new change event from a written record.
    pub fn new(kind: ChangeEventKind, snapshot: TenantRecord) -> Self {
        Self {
            tenant_id: snapshot.tenant_id.clone(),
            kind,
            snapshot,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Create a "created" event.
    pub fn created(snapshot: TenantRecord) -> Self {
        Self::new(ChangeEventKind::Created, snapshot)
    }

    /// Create an "updated" event.
    pub fn updated(snapshot: TenantRecord) -> Self {
        Self::new(ChangeEventKind::Updated, snapshot)
    }

    /// Whether this event is of the given kind.
    pub fn is_kind(&self, kind: ChangeEventKind) -> bool {
        self.kind == kind
    }
}

/// Broadcaster for registry change events.
///
/// Thread-safe and cloneable; multiple subscribers receive every event
/// broadcast after they subscribe.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a new feed with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new feed with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new feed wrapped in an Arc for sharing.
    pub fn new_shared() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 when no
    /// one is listening.
    pub fn send(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Send a "created" event for a freshly inserted record.
    pub fn send_created(&self, snapshot: TenantRecord) -> usize {
        self.send(ChangeEvent::created(snapshot))
    }

    /// Send an "updated" event for a rewritten record.
    pub fn send_updated(&self, snapshot: TenantRecord) -> usize {
        self.send(ChangeEvent::updated(snapshot))
    }

    /// Subscribe to events broadcast after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
