//! Special commands parser for the interactive session
//!
//! Lines starting with `/` drive navigation: opening the personnel list or
//! an archive, selecting a character, starting and leaving a chat. Anything
//! else is passed through as ordinary input (passcode digits on the lock
//! screen, chat messages on the chat screen).
//!
//! Commands are case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// Command takes no argument but was given one
    #[error("Command {command} takes no argument, got: {arg}")]
    UnexpectedArgument { command: String, arg: String },
}

/// Special commands that can be executed during the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show the personnel list
    Personnel,

    /// Open an archive by id
    Archive(String),

    /// Open a character profile by id
    Select(String),

    /// Open a chat with the selected character
    Chat,

    /// Go back one screen
    Back,

    /// Show the current screen and selection
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the session
    Exit,

    /// Not a special command
    None,
}

fn no_argument(command: &str, arg: &str, cmd: SpecialCommand) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(cmd)
    } else {
        Err(CommandError::UnexpectedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

fn required_argument(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

/// Parse user input into a special command
///
/// Returns `SpecialCommand::None` for input that is not a command.
///
/// # Examples
///
/// ```
/// use pwice::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/select jo-jun-jae").unwrap(),
///     SpecialCommand::Select("jo-jun-jae".to_string())
/// );
/// assert_eq!(parse_special_command("0829").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (command, arg) = match lower.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (lower.as_str(), ""),
    };

    match command {
        "/personnel" | "/list" => no_argument(command, arg, SpecialCommand::Personnel),
        "/archive" => required_argument(command, "/archive <id>", arg).map(SpecialCommand::Archive),
        "/select" => required_argument(command, "/select <id>", arg).map(SpecialCommand::Select),
        "/chat" => no_argument(command, arg, SpecialCommand::Chat),
        "/back" => no_argument(command, arg, SpecialCommand::Back),
        "/status" => no_argument(command, arg, SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_input_is_not_a_command() {
        assert_eq!(parse_special_command("0829").unwrap(), SpecialCommand::None);
        assert_eq!(
            parse_special_command("who are you?").unwrap(),
            SpecialCommand::None
        );
    }

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(
            parse_special_command("/personnel").unwrap(),
            SpecialCommand::Personnel
        );
        assert_eq!(parse_special_command("/chat").unwrap(), SpecialCommand::Chat);
        assert_eq!(parse_special_command("/BACK").unwrap(), SpecialCommand::Back);
        assert_eq!(
            parse_special_command("  /status  ").unwrap(),
            SpecialCommand::ShowStatus
        );
    }

    #[test]
    fn test_parse_select_with_id() {
        assert_eq!(
            parse_special_command("/select  Pil-Do-Seop ").unwrap(),
            SpecialCommand::Select("pil-do-seop".to_string())
        );
    }

    #[test]
    fn test_parse_archive_requires_id() {
        let err = parse_special_command("/archive").unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { .. }));
        assert_eq!(
            parse_special_command("/archive saif").unwrap(),
            SpecialCommand::Archive("saif".to_string())
        );
    }

    #[test]
    fn test_parse_unexpected_argument() {
        let err = parse_special_command("/back now").unwrap_err();
        assert_eq!(
            err,
            CommandError::UnexpectedArgument {
                command: "/back".to_string(),
                arg: "now".to_string()
            }
        );
    }

    #[test]
    fn test_parse_exit_aliases() {
        assert_eq!(parse_special_command("/exit").unwrap(), SpecialCommand::Exit);
        assert_eq!(parse_special_command("/quit").unwrap(), SpecialCommand::Exit);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_special_command("/mode write").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/mode write".to_string()));
        assert!(err.to_string().contains("/help"));
    }
}
