//! Event types for the shield event system
//!
//! Every ingestion and verification call emits one event carrying enough
//! denormalized context (location names, submitter name) for observers to
//! render it without a follow-up fetch.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Shield event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShieldEvent {
    /// A general (communication anomaly) submission was persisted
    GeneralAnalysis {
        /// Submitter display name
        verificateur: String,
        region: String,
        province: String,
        ville: String,
        code_centre: String,
        salle: String,
        matiere: String,
        /// Batch assigned to every item of the submission
        batch: i64,
        /// Number of items persisted
        count: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An empty general submission: the room reported no anomalies
    CleanSession {
        verificateur: String,
        code_centre: String,
        salle: String,
        matiere: String,
        /// Students monitored in the clean session (cols x rows)
        students: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A mobility final-classification submission was persisted
    MobilityDetection {
        verificateur: String,
        region: String,
        province: String,
        ville: String,
        code_centre: String,
        salle: String,
        matiere: String,
        /// Number of risk-positive students persisted
        detections: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A confirm/deny decision was recorded against a mobility reading
    Verification {
        analyse_id: i64,
        action: String,
        id_etudiant: String,
        code_centre: String,
        salle: String,
        matiere: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ShieldEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &str {
        match self {
            ShieldEvent::GeneralAnalysis { .. } => "GeneralAnalysis",
            ShieldEvent::CleanSession { .. } => "CleanSession",
            ShieldEvent::MobilityDetection { .. } => "MobilityDetection",
            ShieldEvent::Verification { .. } => "Verification",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ShieldEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ShieldEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ShieldEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<ShieldEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Broadcast delivery is best-effort: a triggering request never fails
    /// because nobody is watching the dashboard.
    pub fn emit_lossy(&self, event: ShieldEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
