//! Conversation history for a session.

use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub answer: String,
}

/// Ordered, append-only list of turns. Only `clear` removes anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<Turn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: &str, answer: &str) {
        self.turns.push(Turn {
            query: query.to_string(),
            answer: answer.to_string(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `limit` turns, or all of them.
    pub fn recent(&self, limit: Option<usize>) -> &[Turn] {
        match limit {
            Some(n) if n < self.turns.len() => &self.turns[self.turns.len() - n..],
            _ => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Plain-text transcript, used by the condense prompt.
    pub fn transcript(&self, limit: Option<usize>) -> String {
        self.recent(limit)
            .iter()
            .map(|t| format!("Human: {}\nAssistant: {}", t.query, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
