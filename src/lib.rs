//! PWICE - character roleplay terminal library
//!
//! This library provides the core of the PWICE terminal: the character
//! catalog, the watch-data generator, the streaming chat gateway, the view
//! reducer and the chat transcript.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `catalog`: Character profiles, archives, and watch-data pools
//! - `watch`: Randomized watch snapshots shown beside a chat
//! - `gateway`: Chat session abstraction and the Gemini streaming client
//! - `view`: Screen state and its pure transition reducer
//! - `controller`: Owner of the view state and the active chat
//! - `transcript`: Chat message log with in-place streaming
//! - `render`: Terminal rendering of each screen
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pwice::{Catalog, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let catalog = Catalog::embedded()?;
//!     pwice::commands::session::run_session(config, catalog).await
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod render;
pub mod transcript;
pub mod view;
pub mod watch;

// Re-export commonly used types
pub use catalog::{Catalog, Character};
pub use config::Config;
pub use controller::Controller;
pub use error::{PwiceError, Result};
pub use transcript::{ChatMessage, Transcript};
pub use view::{Screen, ViewState};

#[cfg(test)]
pub mod test_utils;
