//! Keyword-based intent classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user wants done to their tasks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Create,
    Read,
    Update,
    Delete,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DISPLAY_CUES: &[&str] = &[
    "show", "list", "display", "view", "see", "what are", "what is", "whats",
];
const MARK_VERBS: &[&str] = &["mark", "set", "flag"];
const STATUS_WORDS: &[&str] = &[
    "done", "complete", "completed", "finished", "incomplete", "undone", "pending", "not done",
];
const CREATE_KEYWORDS: &[&str] = &["add", "create", "new", "make", "insert", "remember", "remind"];
const DELETE_KEYWORDS: &[&str] = &["delete", "remove", "erase", "drop", "clear", "cancel", "get rid of"];
const UPDATE_KEYWORDS: &[&str] = &[
    "update", "change", "edit", "rename", "modify", "complete", "finish", "toggle", "mark", "set",
];
const READ_KEYWORDS: &[&str] = &[
    "find", "search", "get", "fetch", "which", "how many", "count", "pending", "completed",
];

/// Whole-word (or whole-phrase) match against already preprocessed text
fn has_cue(text: &str, cue: &str) -> bool {
    let padded = format!(" {} ", text);
    padded.contains(&format!(" {} ", cue))
}

fn has_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| has_cue(text, cue))
}

/// Map preprocessed text to an intent. Never fails; unmatched input is a read.
///
/// Precedence is fixed: display cues, then "mark/set ... done" compounds, then the
/// CREATE, DELETE, UPDATE and READ keyword sets in that order. Categories share
/// keywords, so the order is the only disambiguator.
pub fn classify_intent(text: &str) -> Intent {
    if has_any(text, DISPLAY_CUES) {
        return Intent::Read;
    }
    if has_any(text, MARK_VERBS) && has_any(text, STATUS_WORDS) {
        return Intent::Update;
    }
    if has_any(text, CREATE_KEYWORDS) {
        return Intent::Create;
    }
    if has_any(text, DELETE_KEYWORDS) {
        return Intent::Delete;
    }
    if has_any(text, UPDATE_KEYWORDS) {
        return Intent::Update;
    }
    if has_any(text, READ_KEYWORDS) {
        return Intent::Read;
    }
    Intent::Read
}
