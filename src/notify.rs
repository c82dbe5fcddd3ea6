use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::events::NotificationEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Boundary to the concrete mail transport. Delivery retries and SMTP
/// mechanics live behind this trait, not in the core.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutboundMail) -> anyhow::Result<()>;
}

/// Default transport: logs the mail instead of delivering it. Stands in
/// until an SMTP-backed implementation is wired up at deployment.
pub struct TracingMailTransport;

impl MailTransport for TracingMailTransport {
    fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "outbound mail");
        Ok(())
    }
}

pub fn render(event: &NotificationEvent) -> OutboundMail {
    let to = event.recipient_email().to_string();
    match event {
        NotificationEvent::UserRegistered { email, token_key, .. } => OutboundMail {
            to,
            subject: format!("Confirm your email {email}"),
            body: format!("Your confirmation token: {token_key}"),
        },
        NotificationEvent::PasswordResetRequested { email, token_key, .. } => OutboundMail {
            to,
            subject: format!("Password reset token for {email}"),
            body: format!("Your password reset token: {token_key}"),
        },
        NotificationEvent::OrderPlaced { order_id, .. } => OutboundMail {
            to,
            subject: "Order placed".to_string(),
            body: format!("Your order {order_id} has been placed."),
        },
        NotificationEvent::OrderStatusChanged {
            order_id,
            old_status,
            new_status,
            ..
        } => OutboundMail {
            to,
            subject: "Order status update".to_string(),
            body: format!("Order {order_id} moved from {old_status} to {new_status}."),
        },
    }
}

/// Drain the event channel and hand each event to the transport.
/// A failed delivery is surfaced in the log; the transport owns retries.
pub fn spawn_dispatcher(
    mut rx: UnboundedReceiver<NotificationEvent>,
    transport: Arc<dyn MailTransport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let kind = event.kind();
            let mail = render(&event);
            if let Err(err) = transport.send(&mail) {
                tracing::error!(kind, to = %mail.to, error = %err, "notification delivery failed");
            } else {
                tracing::debug!(kind, to = %mail.to, "notification delivered");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSender;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct CaptureTransport {
        sent: Mutex<Vec<OutboundMail>>,
    }

    impl MailTransport for CaptureTransport {
        fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_events_in_order() {
        let (events, rx) = EventSender::channel();
        let transport = Arc::new(CaptureTransport {
            sent: Mutex::new(Vec::new()),
        });
        let handle = spawn_dispatcher(rx, transport.clone());

        let user_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        events.emit(NotificationEvent::OrderPlaced {
            user_id,
            email: "buyer@example.com".into(),
            order_id,
        });
        events.emit(NotificationEvent::OrderStatusChanged {
            user_id,
            email: "buyer@example.com".into(),
            order_id,
            old_status: "new".into(),
            new_status: "confirmed".into(),
        });

        drop(events);
        handle.await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].subject, "Order placed");
        assert!(sent[1].body.contains("from new to confirmed"));
    }

    #[test]
    fn registration_mail_carries_token() {
        let mail = render(&NotificationEvent::UserRegistered {
            user_id: Uuid::new_v4(),
            email: "partner@example.com".into(),
            token_key: "abc123".into(),
        });
        assert_eq!(mail.to, "partner@example.com");
        assert!(mail.body.contains("abc123"));
    }
}
