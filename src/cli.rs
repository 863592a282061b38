//! Command-line interface definition for PWICE
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// PWICE - character roleplay terminal
///
/// Unlock the personnel dashboard, browse profiles and archives, and open
/// streamed chat sessions with each character.
#[derive(Parser, Debug, Clone)]
#[command(name = "pwice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Path to a catalog YAML replacing the built-in one
    #[arg(long)]
    pub catalog: Option<String>,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute (defaults to `session`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for PWICE
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive terminal (lock screen first)
    Session,

    /// List personnel
    Characters {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one character profile
    Profile {
        /// Character id
        id: String,
    },

    /// Generate one watch snapshot for a character
    Watch {
        /// Character id
        id: String,

        /// Output JSON instead of a panel
        #[arg(long)]
        json: bool,
    },

    /// Store the model credential in the system keyring
    Auth,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, `session` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Session)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            catalog: None,
            model: None,
            verbose: false,
            command: None,
        }
    }
}
