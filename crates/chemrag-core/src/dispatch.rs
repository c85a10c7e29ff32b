//! Turns a submission into exactly one assistant reply.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{AskBackend, AskRequest};
use crate::state::{Conversation, Message};

#[derive(Clone)]
pub struct QueryDispatcher {
    backend: Arc<dyn AskBackend>,
}

impl QueryDispatcher {
    pub fn new(backend: impl AskBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// One network call. Never fails: any error becomes [`Message::fallback`].
    pub async fn send(&self, query: &str, history: &[Message]) -> Message {
        let request = AskRequest {
            query: query.to_string(),
            history: history.to_vec(),
        };
        debug!(query, turns = history.len(), "dispatching /ask");

        match self.backend.ask(&request).await {
            Ok(response) => {
                debug!(sources = response.sources.len(), "received answer");
                Message::assistant(response.answer, response.sources)
            }
            Err(e) => {
                warn!(error = %e, "ask request failed");
                Message::fallback()
            }
        }
    }

    /// Submit the conversation's pending input and wait for the reply.
    ///
    /// Returns `None` (and sends nothing) if the input is blank or a query is
    /// already in flight. If this future is dropped before the reply arrives
    /// the conversation is settled with the fallback message.
    pub async fn ask<'a>(&self, conversation: &'a mut Conversation) -> Option<&'a Message> {
        let submission = conversation.submit()?;
        let mut guard = SettleGuard {
            conversation: &mut *conversation,
            reply: None,
        };
        guard.reply = Some(self.send(&submission.query, &submission.history).await);
        drop(guard);
        conversation.messages().last()
    }
}

/// Settles the in-flight query when dropped, whatever the exit path.
struct SettleGuard<'a> {
    conversation: &'a mut Conversation,
    reply: Option<Message>,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        let reply = self.reply.take().unwrap_or_else(Message::fallback);
        self.conversation.settle(reply);
    }
}
