//! Terminal transcript: what the debug console shows the user
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Debug,
    Step,
    Trace,
    Error,
    Output,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Debug => "debug",
            MessageKind::Step => "step",
            MessageKind::Trace => "trace",
            MessageKind::Error => "error",
            MessageKind::Output => "output",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalMessage {
    /// Strictly increasing within a session, never reused after `clear`
    pub id: u64,
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for TerminalMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.text)
    }
}

/// Bounded message log
#[derive(Debug, Clone)]
pub struct Terminal {
    messages: VecDeque<TerminalMessage>,
    next_id: u64,
    limit: usize,
}

impl Terminal {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: 1,
            limit: limit.max(1),
        }
    }

    /// Append a message, dropping the oldest past the limit; returns its id
    pub fn push(&mut self, kind: MessageKind, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push_back(TerminalMessage {
            id,
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        });
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
        id
    }

    pub fn info(&mut self, text: impl Into<String>) -> u64 {
        self.push(MessageKind::Info, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> u64 {
        self.push(MessageKind::Error, text)
    }

    /// Drop every message; ids keep counting
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> impl Iterator<Item = &TerminalMessage> {
        self.messages.iter()
    }

    /// Messages with an id at or after `id`
    pub fn since(&self, id: u64) -> Vec<TerminalMessage> {
        self.messages.iter().filter(|m| m.id >= id).cloned().collect()
    }

    /// Id the next message will get
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn to_vec(&self) -> Vec<TerminalMessage> {
        self.messages.iter().cloned().collect()
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(500)
    }
}
