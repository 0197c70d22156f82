//! Event channel between the reconciliation core and the notification
//! processor.
//!
//! Events are idempotent and ephemeral: they carry identifiers rather than
//! full data, and the [`crate::processors::NotifySender`] re-fetches the
//! current transaction from the database before delivering anything.

use crate::entities::TransactionState;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Events that trigger a shop notification.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    /// A transaction reached a new (final) state.
    PaymentStateChanged {
        transaction_id: Uuid,
        new_state: TransactionState,
    },
}

/// Sender handle for NotifyEvent events.
pub type NotifyEventSender = mpsc::Sender<NotifyEvent>;
/// Receiver handle for NotifyEvent events.
pub type NotifyEventReceiver = mpsc::Receiver<NotifyEvent>;

/// Create a new NotifyEvent channel.
pub fn notify_event_channel() -> (NotifyEventSender, NotifyEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Container for all event channel senders.
#[derive(Clone)]
pub struct EventSenders {
    /// Sender for NotifyEvent events.
    pub notify_event: NotifyEventSender,
}
