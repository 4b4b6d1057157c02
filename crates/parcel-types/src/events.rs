use serde::{Deserialize, Serialize};

use crate::models::{Role, ShipmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Who a gateway event is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Audience {
    /// A single signed-in user.
    User(String),
    /// Every connection holding the admin role.
    Admins,
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: String, role: Role },

    /// User-facing notification about the outcome of an operation
    Notice {
        title: String,
        description: String,
        variant: NoticeVariant,
    },

    /// A shipment owned by the receiving user changed status
    ShipmentStatusChanged {
        tracking_code: String,
        status: ShipmentStatus,
    },
}

impl GatewayEvent {
    pub fn notice(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Notice {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Notice {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
