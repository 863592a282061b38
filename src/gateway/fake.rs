//! Scripted in-process gateway
//!
//! [`ScriptedGateway`] replaces the remote model in tests. Replies are taken
//! from a shared queue in order; when the queue is empty each send streams a
//! fixed in-character line.
//!
//! # Example
//!
//! ```
//! use futures::StreamExt;
//! use pwice::catalog::Catalog;
//! use pwice::gateway::{ChatGateway, ScriptedGateway, ScriptedReply};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let catalog = Catalog::embedded().unwrap();
//! let gateway = ScriptedGateway::new();
//! gateway.push_reply(ScriptedReply::text(["Speak. ", "Quickly."]));
//!
//! let mut session = gateway.open(catalog.find_character("jo-jun-jae").unwrap()).unwrap();
//! let fragments: Vec<String> = session.send("hello").map(|f| f.unwrap()).collect().await;
//! assert_eq!(fragments.concat(), "Speak. Quickly.");
//! # }
//! ```

use crate::catalog::Character;
use crate::error::{PwiceError, Result};
use crate::gateway::{ChatGateway, ChatSession, FragmentStream};

use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Line used when the script has run out
pub const FALLBACK_REPLY: &str = "...";

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Stream these fragments, then end
    Fragments(Vec<String>),
    /// Stream these fragments, then fail with a transport error
    FailAfter(Vec<String>, String),
    /// Stream these fragments, then never end
    Stall(Vec<String>),
}

impl ScriptedReply {
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: Mutex<VecDeque<ScriptedReply>>,
    sent: Mutex<Vec<(usize, String)>>,
    opened: AtomicUsize,
}

/// Gateway that plays back scripted replies
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Script>,
    refuse_open: bool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose `open` always fails as if no credential were set
    pub fn unconfigured() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        if let Ok(mut replies) = self.script.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.script.opened.load(Ordering::SeqCst)
    }

    /// Every message sent, tagged with the 1-based session number
    pub fn sent(&self) -> Vec<(usize, String)> {
        self.script
            .sent
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl ChatGateway for ScriptedGateway {
    fn open(&self, character: &Character) -> Result<Box<dyn ChatSession>> {
        if self.refuse_open {
            return Err(PwiceError::MissingCredentials("scripted".to_string()).into());
        }
        let number = self.script.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            character_id: character.id.clone(),
            number,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Script>,
    character_id: String,
    number: usize,
}

impl ChatSession for ScriptedSession {
    fn character_id(&self) -> &str {
        &self.character_id
    }

    fn send(&mut self, text: &str) -> FragmentStream {
        if let Ok(mut sent) = self.script.sent.lock() {
            sent.push((self.number, text.to_string()));
        }

        let reply = self
            .script
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| ScriptedReply::text([FALLBACK_REPLY]));

        match reply {
            ScriptedReply::Fragments(fragments) => {
                stream::iter(fragments.into_iter().map(Ok)).boxed()
            }
            ScriptedReply::FailAfter(fragments, reason) => stream::iter(
                fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err::<String, anyhow::Error>(
                        PwiceError::Transport(reason).into(),
                    ))),
            )
            .boxed(),
            ScriptedReply::Stall(fragments) => stream::iter(fragments.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn character() -> Character {
        Catalog::embedded()
            .unwrap()
            .find_character("song-dan-woo")
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_replies_played_in_order() {
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::text(["a", "b"]));
        gateway.push_reply(ScriptedReply::text(["c"]));
        let mut session = gateway.open(&character()).unwrap();

        let first: Vec<String> = session.send("1").map(|f| f.unwrap()).collect().await;
        let second: Vec<String> = session.send("2").map(|f| f.unwrap()).collect().await;
        let third: Vec<String> = session.send("3").map(|f| f.unwrap()).collect().await;

        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(second, vec!["c"]);
        assert_eq!(third, vec![FALLBACK_REPLY]);
        assert_eq!(gateway.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_fail_after_ends_with_error() {
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::FailAfter(vec!["x".into()], "reset".into()));
        let mut session = gateway.open(&character()).unwrap();
        let items: Vec<Result<String>> = session.send("hi").collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap_err().to_string().contains("reset"));
    }

    #[test]
    fn test_unconfigured_refuses_open() {
        let gateway = ScriptedGateway::unconfigured();
        assert!(gateway.open(&character()).is_err());
        assert_eq!(gateway.sessions_opened(), 0);
    }
}
