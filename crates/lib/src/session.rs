//! Client-side conversation store: ordered turns persisted to a JSON file.
//!
//! The store owns the conversation the way the browser's local storage did in
//! a web chat: turns are appended only as completed user+model exchanges and
//! the whole file is removed on reset. In-flight responses never touch disk.

use crate::llm::Content;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed greeting shown when no conversation exists yet. Display-only: it is
/// never persisted and never submitted upstream.
pub const GREETING: &str = "Bonjour, je suis Lynn. Comment puis-je vous accompagner aujourd'hui dans la découverte de la Méthode Neuro-Sexo ?";

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }

    /// Wire shape submitted to the relay ({role, parts: [{text}]}).
    pub fn to_content(&self) -> Content {
        Content {
            role: self.role.as_str().to_string(),
            parts: vec![crate::llm::ContentPart::text(self.text.as_str())],
        }
    }
}

/// File-backed conversation store (load, commit completed exchanges, reset).
pub struct SessionStore {
    path: PathBuf,
    turns: Vec<Turn>,
}

impl SessionStore {
    /// Load the conversation from path; missing or invalid file starts empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let turns = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Vec::new()),
            Err(_) => Vec::new(),
        };
        Self { path, turns }
    }

    /// Persisted turns, in submission order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns to show on initialization: the persisted conversation, or a
    /// single greeting turn when nothing has been exchanged yet.
    pub fn display_turns(&self) -> Vec<Turn> {
        if self.turns.is_empty() {
            vec![Turn::model(GREETING)]
        } else {
            self.turns.clone()
        }
    }

    /// The conversation as wire-shaped history for submission.
    pub fn to_history(&self) -> Vec<Content> {
        self.turns.iter().map(Turn::to_content).collect()
    }

    /// Append one completed exchange (user turn + model turn) and persist.
    /// Called only after a response has fully settled, so a failed exchange
    /// can never leave a dangling user turn behind.
    pub fn commit_exchange(&mut self, user_text: &str, model_text: &str) -> std::io::Result<()> {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::model(model_text));
        self.save()
    }

    /// Clear the in-memory conversation and remove the persisted file.
    pub fn reset(&mut self) -> std::io::Result<()> {
        self.turns.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn save(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.turns)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_history_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("lynn-session-test-{}", uuid::Uuid::new_v4()))
            .join("history.json")
    }

    #[test]
    fn reload_preserves_turn_order() {
        let path = temp_history_path();
        let mut store = SessionStore::load(&path);
        store.commit_exchange("salut", "bonjour").expect("commit");
        store.commit_exchange("ça va ?", "très bien").expect("commit");

        let reloaded = SessionStore::load(&path);
        let texts: Vec<&str> = reloaded.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["salut", "bonjour", "ça va ?", "très bien"]);
        assert_eq!(reloaded.turns()[0].role, Role::User);
        assert_eq!(reloaded.turns()[1].role, Role::Model);
    }

    #[test]
    fn fresh_store_displays_exactly_one_greeting() {
        let store = SessionStore::load(temp_history_path());
        let display = store.display_turns();
        assert_eq!(display.len(), 1);
        assert_eq!(display[0].role, Role::Model);
        assert_eq!(display[0].text, GREETING);
        // The greeting is display-only: nothing was persisted.
        assert!(store.is_empty());
    }

    #[test]
    fn reset_clears_persisted_state() {
        let path = temp_history_path();
        let mut store = SessionStore::load(&path);
        store.commit_exchange("salut", "bonjour").expect("commit");
        assert!(path.exists());

        store.reset().expect("reset");
        assert!(!path.exists());

        let reloaded = SessionStore::load(&path);
        assert_eq!(reloaded.display_turns().len(), 1);
        assert_eq!(reloaded.display_turns()[0].text, GREETING);
    }

    #[test]
    fn reset_without_file_is_ok() {
        let mut store = SessionStore::load(temp_history_path());
        store.reset().expect("reset on missing file");
    }

    #[test]
    fn history_uses_wire_roles() {
        let path = temp_history_path();
        let mut store = SessionStore::load(&path);
        store.commit_exchange("salut", "bonjour").expect("commit");

        let history = store.to_history();
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "model");
        assert_eq!(history[1].text(), "bonjour");
    }

    #[test]
    fn invalid_file_starts_empty() {
        let path = temp_history_path();
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "not json").expect("write");
        let store = SessionStore::load(&path);
        assert!(store.is_empty());
    }
}
