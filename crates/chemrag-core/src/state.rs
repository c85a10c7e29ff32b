//! Conversation state shared by every front end.
//!
//! The [`Conversation`] is the single owner of the message history and of the
//! pending query. All mutation goes through [`Conversation::append_user`],
//! [`Conversation::append_assistant`] and the submit/settle pair built on top
//! of them.

use serde::{Deserialize, Serialize};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Bot",
        }
    }
}

/// A single turn in the conversation. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// Shown in place of an answer whenever the `/ask` round trip fails for any reason.
pub const FALLBACK_ANSWER: &str = "Error fetching response.";

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }

    /// Assistant reply used whenever the `/ask` round trip fails.
    pub fn fallback() -> Self {
        Self::assistant(FALLBACK_ANSWER, Vec::new())
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Text being typed plus the flag that gates a second submission.
#[derive(Debug, Clone, Default)]
pub struct PendingQuery {
    input: String,
    cursor: usize, // in chars, not bytes
    in_flight: bool,
}

impl PendingQuery {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor = self.input.chars().count();
    }

    fn take_input(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }
}

/// What the dispatcher needs to issue one `/ask` call.
///
/// `history` already contains the user message for `query` as its last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub query: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: PendingQuery,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pending(&self) -> &PendingQuery {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingQuery {
        &mut self.pending
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.in_flight
    }

    /// Append a user turn. Blank text (after trimming) is ignored and `None`
    /// is returned; otherwise the updated history is returned.
    pub fn append_user(&mut self, text: &str) -> Option<&[Message]> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.messages.push(Message::user(text));
        Some(&self.messages)
    }

    pub fn append_assistant(&mut self, answer: impl Into<String>, sources: Vec<String>) {
        self.messages.push(Message::assistant(answer, sources));
    }

    /// Turn the pending input into a user message and mark the query in flight.
    ///
    /// Returns `None` without touching anything when a query is already in
    /// flight or the input is blank.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.pending.in_flight || self.pending.input.trim().is_empty() {
            return None;
        }
        let text = self.pending.take_input();
        let history = self.append_user(&text)?.to_vec();
        self.pending.in_flight = true;
        Some(Submission {
            query: text.trim().to_string(),
            history,
        })
    }

    /// Record the reply for the in-flight query and release the input.
    pub fn settle(&mut self, reply: Message) {
        self.append_assistant(reply.content, reply.sources);
        self.pending.in_flight = false;
    }

    /// Every citation in the conversation, in message order.
    pub fn all_sources(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.sources.iter().map(String::as_str))
            .collect()
    }
}
