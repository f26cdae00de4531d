//! Event routing: decide, per inbound event, between no reply, the canned
//! identity reply, and a completion-backed reply.
//!
//! Failures from the completion backend are logged and swallowed here: the
//! chat user gets no reply rather than an error message, and the webhook
//! response is unaffected.

use crate::channels::InboundEvent;
use crate::llm::CompletionBackend;
use std::sync::Arc;

/// Known identity question answered without a completion call.
pub const CANNED_TRIGGER: &str = "你是誰";
/// Static answer for [`CANNED_TRIGGER`].
pub const CANNED_REPLY: &str = "我是由施鈞譯jimmy架設的自動回覆機器人，使用gpt3.5-turbo作為語言模型";
/// Locale instruction prepended to every prompt sent to the backend.
pub const PROMPT_PREFIX: &str = "使用繁體中文回答：";

/// Reply intent: text to send back for one event's reply token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub reply_token: String,
    pub text: String,
}

/// Routes text-message events to the canned reply or the completion backend.
#[derive(Clone)]
pub struct Router {
    backend: Arc<dyn CompletionBackend>,
}

impl Router {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Route one event. Non-message and non-text events yield nothing.
    /// A text event yields at most one reply intent; on completion failure
    /// the failure kind is logged and the event is dropped.
    pub async fn route_event(&self, event: &InboundEvent) -> Option<OutboundReply> {
        let text = event.text()?;
        log::info!("received a message: {}", text);

        if text == CANNED_TRIGGER {
            log::debug!("answering identity query with canned reply");
            return Some(OutboundReply {
                reply_token: event.reply_token.clone(),
                text: CANNED_REPLY.to_string(),
            });
        }

        let prompt = format!("{}{}", PROMPT_PREFIX, text);
        match self.backend.complete(&prompt).await {
            Ok(reply) => Some(OutboundReply {
                reply_token: event.reply_token.clone(),
                text: reply,
            }),
            Err(e) => {
                log::warn!("completion failed, skipping event: {}", e);
                None
            }
        }
    }

    /// Route a parsed payload's events in order, one at a time.
    pub async fn route(&self, events: &[InboundEvent]) -> Vec<OutboundReply> {
        let mut replies = Vec::new();
        for event in events {
            if let Some(reply) = self.route_event(event).await {
                replies.push(reply);
            }
        }
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{EventKind, InboundMessage};
    use crate::llm::CompletionError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that records prompts and returns a scripted result.
    struct MockBackend {
        prompts: Mutex<Vec<String>>,
        result: fn() -> Result<String, CompletionError>,
    }

    impl MockBackend {
        fn new(result: fn() -> Result<String, CompletionError>) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                result,
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.result)()
        }
    }

    fn text_event(token: &str, text: &str) -> InboundEvent {
        InboundEvent {
            kind: EventKind::Message,
            reply_token: token.to_string(),
            message: Some(InboundMessage::Text(text.to_string())),
        }
    }

    #[tokio::test]
    async fn non_message_events_yield_nothing() {
        let backend = MockBackend::new(|| Ok("unused".to_string()));
        let router = Router::new(backend.clone());
        let events = vec![
            InboundEvent {
                kind: EventKind::Follow,
                reply_token: "r1".to_string(),
                message: None,
            },
            InboundEvent {
                kind: EventKind::Other,
                reply_token: "r2".to_string(),
                message: None,
            },
            InboundEvent {
                kind: EventKind::Message,
                reply_token: "r3".to_string(),
                message: Some(InboundMessage::NonText),
            },
        ];
        assert!(router.route(&events).await.is_empty());
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn canned_trigger_bypasses_backend() {
        let backend = MockBackend::new(|| Ok("unused".to_string()));
        let router = Router::new(backend.clone());
        let replies = router.route(&[text_event("tok", CANNED_TRIGGER)]).await;
        assert_eq!(
            replies,
            vec![OutboundReply {
                reply_token: "tok".to_string(),
                text: CANNED_REPLY.to_string(),
            }]
        );
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn text_event_calls_backend_once_with_prefixed_prompt() {
        let backend = MockBackend::new(|| Ok("Hi there".to_string()));
        let router = Router::new(backend.clone());
        let replies = router.route(&[text_event("tok", "hello")]).await;
        assert_eq!(
            replies,
            vec![OutboundReply {
                reply_token: "tok".to_string(),
                text: "Hi there".to_string(),
            }]
        );
        assert_eq!(backend.prompts(), vec![format!("{}hello", PROMPT_PREFIX)]);
    }

    #[tokio::test]
    async fn backend_failure_drops_only_that_event() {
        let backend = MockBackend::new(|| Err(CompletionError::Malformed));
        let router = Router::new(backend.clone());
        let events = vec![text_event("r1", "hello"), text_event("r2", CANNED_TRIGGER)];
        let replies = router.route(&events).await;
        // The failed event produced nothing; the canned event still replied.
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_token, "r2");
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn upstream_and_timeout_failures_yield_nothing() {
        for result in [
            (|| {
                Err(CompletionError::Upstream {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                })
            }) as fn() -> Result<String, CompletionError>,
            || Err(CompletionError::Timeout),
        ] {
            let backend = MockBackend::new(result);
            let router = Router::new(backend.clone());
            assert!(router.route(&[text_event("tok", "hello")]).await.is_empty());
            assert_eq!(backend.prompts().len(), 1);
        }
    }
}
