//! LINE channel: webhook payload parsing (with X-Line-Signature verification)
//! and text replies via the Messaging API reply endpoint.

use crate::channels::inbound::{EventKind, InboundEvent, InboundMessage};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const LINE_API_BASE: &str = "https://api.line.me";

type HmacSha256 = Hmac<Sha256>;

/// Webhook request could not be trusted or decoded. Maps to HTTP 400.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing or invalid X-Line-Signature header")]
    BadSignature,
    #[error("malformed webhook payload: {0}")]
    BadPayload(#[from] serde_json::Error),
}

/// Reply send failed. Logged by the caller; never retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("reply request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply rejected: {status} {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

// --- Webhook wire types ---

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type", default)]
    typ: String,
    #[serde(rename = "replyToken", default)]
    reply_token: String,
    #[serde(default)]
    message: Option<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    #[serde(rename = "type", default)]
    typ: String,
    #[serde(default)]
    text: Option<String>,
}

/// Verify the webhook signature: base64(HMAC-SHA256(channel_secret, body))
/// must equal the X-Line-Signature header value.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature_b64: &str) -> bool {
    let Ok(provided) = base64::engine::general_purpose::STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Verify the signature, then decode the payload into normalized events.
/// Unknown event or message types become `Other`/`NonText` rather than errors
/// so one exotic event cannot fail the whole delivery.
pub fn parse_events(
    channel_secret: &str,
    signature_b64: Option<&str>,
    body: &[u8],
) -> Result<Vec<InboundEvent>, ParseError> {
    let signature = signature_b64.ok_or(ParseError::BadSignature)?;
    if !verify_signature(channel_secret, body, signature) {
        return Err(ParseError::BadSignature);
    }
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    Ok(payload.events.into_iter().map(normalize_event).collect())
}

fn normalize_event(ev: WebhookEvent) -> InboundEvent {
    let kind = match ev.typ.as_str() {
        "message" => EventKind::Message,
        "follow" => EventKind::Follow,
        _ => EventKind::Other,
    };
    let message = ev.message.map(|m| {
        if m.typ == "text" {
            InboundMessage::Text(m.text.unwrap_or_default())
        } else {
            InboundMessage::NonText
        }
    });
    InboundEvent {
        kind,
        reply_token: ev.reply_token,
        message,
    }
}

// --- Reply API ---

#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: Vec<ReplyMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyMessage<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    text: &'a str,
}

/// LINE Messaging API client: sends one-shot text replies keyed by reply token.
#[derive(Clone)]
pub struct LineChannel {
    base_url: String,
    channel_access_token: String,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(channel_access_token: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            base_url,
            channel_access_token,
            client: reqwest::Client::new(),
        }
    }

    /// POST /v2/bot/message/reply — send one text message for a reply token.
    /// The token is single-use and short-lived, so there is no retry.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), DispatchError> {
        let url = format!("{}/v2/bot/message/reply", self.base_url);
        let body = ReplyRequest {
            reply_token,
            messages: vec![ReplyMessage { typ: "text", text }],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status, body });
        }
        Ok(())
    }
}
