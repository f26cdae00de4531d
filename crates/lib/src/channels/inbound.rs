//! Inbound event from the webhook: normalized unit handed to the router.

/// What kind of webhook event this is. Only `Message` is routed further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Follow,
    Other,
}

/// Message content of a message event. Only `Text` is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Text payload (may be empty).
    Text(String),
    /// Sticker, image, audio, etc. — anything the relay does not handle.
    NonText,
}

/// One normalized unit from the webhook payload.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    /// Opaque single-use token for replying to this event. Empty for events
    /// that carry none.
    pub reply_token: String,
    /// Present only when kind is `Message`.
    pub message: Option<InboundMessage>,
}

impl InboundEvent {
    /// Text of this event when it is a text-message event, else None.
    pub fn text(&self) -> Option<&str> {
        if self.kind != EventKind::Message {
            return None;
        }
        match self.message {
            Some(InboundMessage::Text(ref t)) => Some(t),
            _ => None,
        }
    }
}
