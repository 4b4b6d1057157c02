use std::sync::Arc;

use tokio::sync::broadcast;

use parcel_types::events::{Audience, GatewayEvent};

/// An event plus the audience it is addressed to.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    pub event: GatewayEvent,
}

impl Envelope {
    /// Whether a connection for `user_id` with the given role should receive this.
    pub fn is_for(&self, user_id: &str, is_admin: bool) -> bool {
        match &self.audience {
            Audience::User(target) => target == user_id,
            Audience::Admins => is_admin,
        }
    }
}

/// Fans notices out to connected gateway clients.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection receives every envelope and filters by audience.
    broadcast_tx: broadcast::Sender<Envelope>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.inner.broadcast_tx.subscribe()
    }

    pub fn send(&self, audience: Audience, event: GatewayEvent) {
        // No receivers just means nobody is connected right now.
        let _ = self.inner.broadcast_tx.send(Envelope { audience, event });
    }

    pub fn notify_user(&self, user_id: &str, event: GatewayEvent) {
        self.send(Audience::User(user_id.to_string()), event);
    }

    pub fn notify_admins(&self, event: GatewayEvent) {
        self.send(Audience::Admins, event);
    }
}
