//! Append-only conversation transcript.
//!
//! A [`Conversation`] is an immutable snapshot: appending returns a new value
//! and leaves the original untouched, so an in-flight request can hold the
//! exact history it was sent with while the session keeps growing.

use std::sync::Arc;

use completion_provider::{Message, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Arc<[Message]>,
}

impl Conversation {
    /// Starts a conversation holding only the system message.
    #[must_use]
    pub fn initial(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Arc::from(vec![Message::system(system_prompt)]),
        }
    }

    /// Returns a snapshot with `message` added at the end.
    #[must_use]
    pub fn append(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(message);

        Self {
            messages: Arc::from(messages),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: the system message is always present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .filter(|message| message.role == Role::System)
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }

    /// Messages shown to the user, in order. System messages are hidden.
    pub fn visible(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages
            .iter()
            .filter(|message| message.role != Role::System)
    }
}
