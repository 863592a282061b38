/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `session`   — Interactive terminal (lock screen, navigation, chat)
- `personnel` — One-shot catalog views (`characters`, `profile`, `watch`)
- `auth`      — Store the model credential in the system keyring
*/

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{PwiceError, Result};

// Special commands parser for navigation
pub mod special_commands;

// Interactive session handler
pub mod session {
    //! Interactive session handler.
    //!
    //! Runs a `tokio::select!` loop over three sources: lines typed by the
    //! user (read by rustyline on its own thread, one line per prompt),
    //! reply events from the streaming model call, and the timer that hides
    //! the passcode error. A prompt is only issued while no reply is
    //! streaming.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, SpecialCommand};
    use crate::controller::{Controller, ReplyEvent};
    use crate::gateway::{ChatGateway, GeminiGateway};
    use crate::render;
    use crate::view::{Screen, Transition};

    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

    /// What the loop should do after handling a line
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Step {
        /// Print this text (possibly empty) and keep going
        Print(String),
        Exit,
    }

    /// Session state driven by the event loop
    pub struct Session {
        controller: Controller,
        gateway: Box<dyn ChatGateway>,
        events: mpsc::UnboundedSender<ReplyEvent>,
        passcode_length: usize,
        rendered_epoch: Option<u64>,
    }

    impl Session {
        /// Create a session and the receiver its reply events arrive on
        pub fn new(
            config: &Config,
            catalog: Arc<Catalog>,
            gateway: Box<dyn ChatGateway>,
        ) -> (Self, mpsc::UnboundedReceiver<ReplyEvent>) {
            let (events, replies) = mpsc::unbounded_channel();
            let controller =
                Controller::new(catalog, config.access.clone(), config.chat.clone());
            let session = Self {
                controller,
                gateway,
                events,
                passcode_length: config.access.passcode_length,
                rendered_epoch: None,
            };
            (session, replies)
        }

        pub fn controller(&self) -> &Controller {
            &self.controller
        }

        pub fn prompt(&self) -> String {
            match self.controller.state().screen {
                Screen::Lock => "passcode> ".to_string(),
                Screen::Chat => "you> ".to_string(),
                screen => format!("{}> ", screen.to_string().to_lowercase()),
            }
        }

        /// Render the current screen, showing any alert once
        ///
        /// The terminal is cleared first whenever the viewport changed since
        /// the last render.
        pub fn render(&mut self) -> String {
            let epoch = self.controller.state().viewport_epoch;
            let mut out = String::new();
            if self.rendered_epoch.is_some_and(|last| last != epoch) {
                out.push_str(CLEAR_SCREEN);
            }
            self.rendered_epoch = Some(epoch);
            out.push_str(&render::screen(&self.controller, self.passcode_length));
            if self.controller.state().alert.is_some() {
                self.controller.dispatch(Transition::DismissAlert);
            }
            out
        }

        pub fn clear_passcode_error(&mut self) {
            self.controller.dispatch(Transition::ClearPasscodeError);
        }

        pub fn handle_line(&mut self, line: &str) -> Step {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return Step::Print(String::new());
            }

            let command = match parse_special_command(trimmed) {
                Ok(command) => command,
                Err(e) => return Step::Print(format!("{}\n", e.to_string().yellow())),
            };

            match command {
                SpecialCommand::Exit => return Step::Exit,
                SpecialCommand::Help => return Step::Print(render::help()),
                SpecialCommand::ShowStatus => return Step::Print(self.status()),
                SpecialCommand::None => return self.handle_text(trimmed),
                SpecialCommand::Personnel => self.controller.dispatch(Transition::OpenPersonnel),
                SpecialCommand::Archive(id) => self.controller.select_archive(&id),
                SpecialCommand::Select(id) => self.controller.select_character(&id),
                SpecialCommand::Back => self.controller.back(),
                SpecialCommand::Chat => {
                    if let Err(e) = self
                        .controller
                        .start_chat(self.gateway.as_ref(), &mut rand::rng())
                    {
                        tracing::debug!("Chat not started: {:#}", e);
                    }
                }
            }
            Step::Print(self.render())
        }

        fn handle_text(&mut self, text: &str) -> Step {
            match self.controller.state().screen {
                Screen::Lock => {
                    // Anything but a run of at most passcode_length digits
                    // counts as a failed attempt
                    let is_attempt = text.len() <= self.passcode_length
                        && text.bytes().all(|b| b.is_ascii_digit());
                    if is_attempt {
                        for c in text.chars() {
                            self.controller.dispatch(Transition::PasscodeDigit(c));
                        }
                    }
                    let state = self.controller.state();
                    if state.screen == Screen::Lock
                        && (!is_attempt || !state.passcode.entered.is_empty())
                    {
                        self.controller.dispatch(Transition::SubmitPasscode);
                    }
                    Step::Print(self.render())
                }
                Screen::Chat => {
                    if !self.controller.submit(text, &self.events) {
                        return Step::Print(String::new());
                    }
                    let name = self
                        .controller
                        .state()
                        .selected_character
                        .as_deref()
                        .and_then(|id| self.controller.catalog().find_character(id).ok())
                        .map(|c| format!("{}: ", render::speaker(crate::transcript::Role::Model, c)))
                        .unwrap_or_default();
                    Step::Print(name)
                }
                _ => Step::Print(format!(
                    "Not a command. Type {} for commands.\n",
                    "/help".cyan()
                )),
            }
        }

        /// Apply a reply event, returning the text to print for it
        pub fn handle_reply(&mut self, event: ReplyEvent) -> Option<String> {
            let printed = match &event {
                ReplyEvent::Fragment { text, .. } => text.clone(),
                ReplyEvent::Completed { .. } => "\n".to_string(),
                ReplyEvent::Failed { .. } => format!(
                    "\n{}\n",
                    self.controller.chat_config().interrupted_notice.yellow()
                ),
            };
            self.controller.apply(event).then_some(printed)
        }

        fn status(&self) -> String {
            let state = self.controller.state();
            let mut out = format!("Screen: {}\n", state.screen.to_string().cyan());
            if let Some(id) = &state.selected_character {
                out.push_str(&format!("Selected: {}\n", id));
            }
            if let Some(id) = &state.selected_archive {
                out.push_str(&format!("Archive: {}\n", id));
            }
            if let Some(transcript) = self.controller.transcript() {
                out.push_str(&format!("Messages: {}\n", transcript.len()));
            }
            out
        }
    }

    struct Prompt {
        text: String,
        remember: bool,
    }

    enum Input {
        Line(String),
        Closed,
    }

    /// Read lines on a dedicated thread, one per prompt request
    fn spawn_line_reader() -> Result<(mpsc::UnboundedSender<Prompt>, mpsc::UnboundedReceiver<Input>)> {
        let mut editor = DefaultEditor::new()?;
        let (prompt_tx, mut prompt_rx) = mpsc::unbounded_channel::<Prompt>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            while let Some(prompt) = prompt_rx.blocking_recv() {
                let input = match editor.readline(&prompt.text) {
                    Ok(line) => {
                        if prompt.remember {
                            let _ = editor.add_history_entry(line.as_str());
                        }
                        Input::Line(line)
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Input::Closed,
                    Err(e) => {
                        tracing::warn!("Readline error: {}", e);
                        Input::Closed
                    }
                };
                let closed = matches!(input, Input::Closed);
                if line_tx.send(input).is_err() || closed {
                    break;
                }
            }
        });

        Ok((prompt_tx, line_rx))
    }

    fn emit(text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    /// Start the interactive terminal
    ///
    /// # Examples
    ///
    /// ```
    /// use pwice::commands::session;
    /// use pwice::config::Config;
    ///
    /// // In application code:
    /// // session::run_session(Config::default(), catalog).await?;
    /// ```
    pub async fn run_session(config: Config, catalog: Catalog) -> Result<()> {
        tracing::info!("Starting interactive session");

        let gateway = GeminiGateway::new(config.gateway.clone())?;
        let error_display = Duration::from_millis(config.access.error_display_ms);
        let (mut session, mut replies) =
            Session::new(&config, Arc::new(catalog), Box::new(gateway));
        let (prompts, mut lines) = spawn_line_reader()?;

        emit(&session.render());
        let mut awaiting_line = false;

        loop {
            if !awaiting_line && !session.controller().is_reply_in_progress() {
                let prompt = Prompt {
                    text: session.prompt(),
                    remember: session.controller().state().screen != Screen::Lock,
                };
                if prompts.send(prompt).is_err() {
                    break;
                }
                awaiting_line = true;
            }
            let error_shown = session.controller().state().passcode.error;

            tokio::select! {
                input = lines.recv() => {
                    awaiting_line = false;
                    match input {
                        Some(Input::Line(line)) => match session.handle_line(&line) {
                            Step::Print(text) => emit(&text),
                            Step::Exit => break,
                        },
                        Some(Input::Closed) | None => break,
                    }
                }
                Some(event) = replies.recv() => {
                    if let Some(text) = session.handle_reply(event) {
                        emit(&text);
                    }
                }
                _ = tokio::time::sleep(error_display), if error_shown => {
                    session.clear_passcode_error();
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

}

// One-shot catalog views
pub mod personnel {
    //! Non-interactive views of the catalog.

    use super::*;
    use crate::render;
    use crate::watch;

    /// Print the personnel list as a table or JSON
    pub fn list_characters(catalog: &Catalog, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(catalog.characters())?);
        } else {
            println!("\nPersonnel:");
            render::personnel_table(catalog).printstd();
            println!();
        }
        Ok(())
    }

    /// Print one character profile
    pub fn show_profile(catalog: &Catalog, id: &str) -> Result<()> {
        let character = catalog.find_character(id)?;
        print!("{}", render::profile(character));
        Ok(())
    }

    /// Print a freshly generated watch snapshot
    pub fn show_watch(catalog: &Catalog, id: &str, json: bool) -> Result<()> {
        catalog.find_character(id)?;
        let snapshot = watch::snapshot_for(catalog, id, &mut rand::rng());
        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            print!("{}", render::watch_panel(&snapshot));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_utils::test_catalog;

        #[test]
        fn test_unknown_profile_is_lookup_error() {
            let catalog = test_catalog();
            let err = show_profile(&catalog, "nobody").unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PwiceError>(),
                Some(PwiceError::Lookup { .. })
            ));
        }

        #[test]
        fn test_unknown_watch_is_lookup_error() {
            let catalog = test_catalog();
            assert!(show_watch(&catalog, "nobody", true).is_err());
        }
    }
}

// Credential helper
pub mod auth {
    use super::*;
    use crate::gateway::gemini::store_api_key;
    use rustyline::DefaultEditor;

    /// Check that a credential is usable before storing it
    pub fn validate_api_key(key: &str) -> Result<&str> {
        let key = key.trim();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(PwiceError::Config("API key must be a single non-empty token".to_string()).into());
        }
        Ok(key)
    }

    /// Prompt for the model credential and store it in the system keyring
    pub fn authenticate(config: &Config) -> Result<()> {
        tracing::info!("Storing credential for model: {}", config.gateway.model);
        if config.gateway.api_key.is_some() {
            println!("Note: a configured API key takes precedence over the keyring.");
        }

        let mut editor = DefaultEditor::new()?;
        let line = editor.readline("Gemini API key: ")?;
        let key = validate_api_key(&line)?;

        store_api_key(key)?;
        println!("Credential stored in the system keyring.");
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_validate_api_key() {
            assert_eq!(validate_api_key("  abc123 \n").unwrap(), "abc123");
            assert!(validate_api_key("   ").is_err());
            assert!(validate_api_key("abc 123").is_err());
        }
    }
}
