//! Push event types delivered over the live channel.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": {...}}`.

use serde::Serialize;

use crate::error::Result;
use crate::models::NotificationPayload;

/// Event pushed to a connected user.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    /// A reminder was just recorded for the recipient.
    #[serde(rename = "notification")]
    Notification(NotificationPayload),
}

impl PushEvent {
    /// Event name as seen by clients.
    pub fn event_type(&self) -> &'static str {
        match self {
            PushEvent::Notification(_) => "notification",
        }
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
