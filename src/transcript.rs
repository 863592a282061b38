//! Chat transcript state
//!
//! Holds the ordered message log of the active chat screen. A user submit
//! appends the user's message followed by an empty model placeholder, and
//! streamed reply fragments are written into that placeholder in place. At
//! most one reply is in progress at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Set when the reply was cut short by a transport failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            interrupted: None,
        }
    }
}

/// Message log for the chat screen
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    in_progress: bool,
    pending_input: String,
}

impl Transcript {
    /// Start a transcript with a scripted model line
    pub fn with_opening(opening_line: &str) -> Self {
        let mut transcript = Self::default();
        transcript.reset(opening_line);
        transcript
    }

    /// Replace the log with a single scripted model line
    pub fn reset(&mut self, opening_line: &str) {
        self.messages = vec![ChatMessage::new(Role::Model, opening_line)];
        self.in_progress = false;
        self.pending_input.clear();
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Submit the pending input as a user message
    ///
    /// Returns the text to send to the model, or `None` when the input is
    /// blank or a reply is already streaming (in which case nothing changes).
    pub fn submit_user_message(&mut self) -> Option<String> {
        if self.in_progress || self.pending_input.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.pending_input);
        self.messages.push(ChatMessage::new(Role::User, text.clone()));
        self.in_progress = true;
        self.messages.push(ChatMessage::new(Role::Model, String::new()));
        Some(text)
    }

    /// Set the input and submit it in one step
    pub fn submit_text(&mut self, text: &str) -> Option<String> {
        if self.in_progress {
            return None;
        }
        self.set_input(text);
        self.submit_user_message()
    }

    /// Append a streamed fragment to the placeholder
    ///
    /// Ignored when no reply is in progress.
    pub fn receive_fragment(&mut self, fragment: &str) {
        if let Some(placeholder) = self.placeholder_mut() {
            placeholder.text.push_str(fragment);
        }
    }

    /// Mark the streaming reply as finished
    pub fn complete_reply(&mut self) {
        self.in_progress = false;
    }

    /// Finish the streaming reply after a failure
    ///
    /// The placeholder keeps whatever text already arrived.
    pub fn fail_reply(&mut self, reason: impl Into<String>) {
        if let Some(placeholder) = self.placeholder_mut() {
            placeholder.interrupted = Some(reason.into());
        }
        self.in_progress = false;
    }

    /// The model entry currently receiving fragments
    pub fn placeholder(&self) -> Option<&ChatMessage> {
        if self.in_progress {
            self.messages.last()
        } else {
            None
        }
    }

    fn placeholder_mut(&mut self) -> Option<&mut ChatMessage> {
        if self.in_progress {
            self.messages.last_mut()
        } else {
            None
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_starts_with_opening_line() {
        let t = Transcript::with_opening("...What do you want?");
        assert_eq!(t.len(), 1);
        assert_eq!(t.messages()[0].role, Role::Model);
        assert_eq!(t.messages()[0].text, "...What do you want?");
        assert!(!t.is_in_progress());
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let mut t = Transcript::with_opening("hi");
        t.set_input("hello");
        assert_eq!(t.submit_user_message().as_deref(), Some("hello"));
        assert_eq!(t.len(), 3);
        assert_eq!(t.messages()[1].role, Role::User);
        assert_eq!(t.messages()[1].text, "hello");
        assert_eq!(t.messages()[2].role, Role::Model);
        assert_eq!(t.messages()[2].text, "");
        assert!(t.is_in_progress());
        assert_eq!(t.pending_input(), "");
        assert_ne!(t.messages()[1].id, t.messages()[2].id);
    }

    #[test]
    fn test_fragments_concatenate_into_placeholder() {
        let mut t = Transcript::with_opening("hi");
        let before = t.len();
        t.submit_text("hello");
        let fragments = ["Who ", "let ", "you ", "in?"];
        for f in fragments {
            t.receive_fragment(f);
        }
        assert_eq!(t.len(), before + 2);
        assert_eq!(t.placeholder().unwrap().text, fragments.concat());
        assert_eq!(t.messages()[0].text, "hi");
        assert_eq!(t.messages()[1].text, "hello");
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut t = Transcript::with_opening("hi");
        assert!(t.submit_text("   \n\t").is_none());
        assert_eq!(t.len(), 1);
        assert!(!t.is_in_progress());
    }

    #[test]
    fn test_submit_while_in_progress_is_noop() {
        let mut t = Transcript::with_opening("hi");
        t.submit_text("first");
        t.receive_fragment("partial");
        let snapshot = t.messages().to_vec();

        assert!(t.submit_text("second").is_none());
        t.set_input("third");
        assert!(t.submit_user_message().is_none());

        assert_eq!(t.messages(), snapshot.as_slice());
        assert_eq!(t.pending_input(), "third");
    }

    #[test]
    fn test_complete_reply_allows_next_send() {
        let mut t = Transcript::with_opening("hi");
        t.submit_text("one");
        t.receive_fragment("reply");
        t.complete_reply();
        assert!(t.placeholder().is_none());
        assert!(t.submit_text("two").is_some());
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn test_fragment_after_completion_ignored() {
        let mut t = Transcript::with_opening("hi");
        t.submit_text("one");
        t.receive_fragment("done");
        t.complete_reply();
        t.receive_fragment(" late");
        assert_eq!(t.messages()[2].text, "done");
    }

    #[test]
    fn test_fail_reply_keeps_partial_text() {
        let mut t = Transcript::with_opening("hi");
        t.submit_text("one");
        t.receive_fragment("par");
        t.fail_reply("connection reset");
        assert!(!t.is_in_progress());
        let last = t.messages().last().unwrap();
        assert_eq!(last.text, "par");
        assert_eq!(last.interrupted.as_deref(), Some("connection reset"));
    }
}
