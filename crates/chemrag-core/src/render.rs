//! UI-agnostic message rendering: bold markup and citation lists.

use crate::state::{Message, Role};

const BOLD_DELIMITER: &str = "**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub emphasized: bool,
}

impl<'a> Segment<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self {
            text,
            emphasized: false,
        }
    }

    pub fn emphasized(text: &'a str) -> Self {
        Self {
            text,
            emphasized: true,
        }
    }
}

/// Split `text` on `**`, alternating plain and emphasized segments.
///
/// The first piece is always plain. An odd number of delimiters leaves the
/// tail emphasized; there is no escaping or nesting. Empty pieces are dropped.
pub fn split_emphasis(text: &str) -> Vec<Segment<'_>> {
    text.split(BOLD_DELIMITER)
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| Segment {
            text: part,
            emphasized: i % 2 == 1,
        })
        .collect()
}

/// Sources to show beneath a message, or `None` when no citation section should be drawn.
pub fn citations(message: &Message) -> Option<&[String]> {
    match message.role {
        Role::Assistant if !message.sources.is_empty() => Some(&message.sources),
        _ => None,
    }
}
