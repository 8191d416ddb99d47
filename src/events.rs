use crate::error::DirectiveError;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Success => "ok",
            MessageKind::Warning => "warn",
            MessageKind::Error => "error",
        }
    }
}

/// One line reported back to the user, as it would appear in the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl SystemMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Info, text: text.into() }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: MessageKind::Error, text: text.into() }
    }
}

impl From<&DirectiveError> for SystemMessage {
    fn from(err: &DirectiveError) -> Self {
        SystemMessage::error(err.to_string())
    }
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.text)
    }
}

/// Messages kept when no capacity is given.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 512;

/// Sink the pipeline reports into; the host drains it into the chat. Once
/// full, the oldest messages are dropped first.
#[derive(Debug)]
pub struct MessageLog {
    messages: VecDeque<SystemMessage>,
    capacity: usize,
    dropped: u64,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MESSAGE_CAPACITY)
    }
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { messages: VecDeque::new(), capacity: capacity.max(1), dropped: 0 }
    }

    pub fn push(&mut self, message: SystemMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
            self.dropped += 1;
        }
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = SystemMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    pub fn drain(&mut self) -> Vec<SystemMessage> {
        self.messages.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages discarded because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.text.contains(needle))
    }
}
