use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Lifecycle facts emitted by the core after a transaction commits.
/// The dispatcher turns them into outbound mail; nothing here can roll back
/// the transaction that produced the event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    UserRegistered {
        user_id: Uuid,
        email: String,
        token_key: String,
    },
    PasswordResetRequested {
        user_id: Uuid,
        email: String,
        token_key: String,
    },
    OrderPlaced {
        user_id: Uuid,
        email: String,
        order_id: Uuid,
    },
    OrderStatusChanged {
        user_id: Uuid,
        email: String,
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::UserRegistered { .. } => "user_registered",
            NotificationEvent::PasswordResetRequested { .. } => "password_reset_requested",
            NotificationEvent::OrderPlaced { .. } => "order_placed",
            NotificationEvent::OrderStatusChanged { .. } => "order_status_changed",
        }
    }

    pub fn recipient_email(&self) -> &str {
        match self {
            NotificationEvent::UserRegistered { email, .. }
            | NotificationEvent::PasswordResetRequested { email, .. }
            | NotificationEvent::OrderPlaced { email, .. }
            | NotificationEvent::OrderStatusChanged { email, .. } => email,
        }
    }
}

/// Cloneable handle services use to enqueue events after commit.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<NotificationEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event. A closed channel means notifications are being
    /// dropped, which an operator must see, so it is logged at error level
    /// instead of being propagated to the caller.
    pub fn emit(&self, event: NotificationEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::error!(kind, "notification channel closed, event lost");
        }
    }
}
