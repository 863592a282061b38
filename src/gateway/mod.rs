//! Chat session gateway
//!
//! This module contains the narrow interface to the remote conversational
//! model: a gateway opens a session bound to one character's persona, and a
//! session turns each user message into a lazy stream of reply fragments.
//!
//! - `gemini`: Google Gemini implementation over HTTPS with SSE streaming
//! - `fake`: scripted in-process implementation used by tests
//! - `sse`: incremental Server-Sent Events decoder

pub mod fake;
pub mod gemini;
pub mod sse;

pub use fake::{ScriptedGateway, ScriptedReply};
pub use gemini::GeminiGateway;

use crate::catalog::Character;
use crate::error::Result;
use futures::Stream;
use std::pin::Pin;

/// Ordered, finite stream of reply fragments
///
/// A failure ends the stream with a single `Err` item. The stream cannot be
/// restarted; dropping it abandons the reply.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Opens conversation contexts with the remote model
pub trait ChatGateway: Send + Sync {
    /// Open a session seeded with the character's persona prompt
    ///
    /// # Errors
    ///
    /// Returns a configuration error (`PwiceError::Config` or
    /// `PwiceError::MissingCredentials`) when the credential is absent or
    /// malformed. No network I/O happens here.
    fn open(&self, character: &Character) -> Result<Box<dyn ChatSession>>;
}

/// A conversation bound to one character
///
/// Each `send` is a single attempt; there is no retry. Callers must not
/// start a new send before the previous stream has ended.
pub trait ChatSession: Send {
    /// Id of the character this session speaks as
    fn character_id(&self) -> &str;

    /// Send a user message and stream the model's reply
    fn send(&mut self, text: &str) -> FragmentStream;
}
