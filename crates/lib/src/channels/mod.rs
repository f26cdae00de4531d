//! Communication channel (LINE Messaging API).
//!
//! Webhook payload parsing with signature verification, plus the reply
//! dispatcher. Parsed events are normalized into [`InboundEvent`] before
//! the router sees them.

mod inbound;
mod line;

pub use inbound::{EventKind, InboundEvent, InboundMessage};
pub use line::{parse_events, verify_signature, DispatchError, LineChannel, ParseError};
