//! Terminal rendering of each screen
//!
//! Every function here returns the text to print rather than printing it, so
//! the session loop decides when output happens and tests can inspect it.

use crate::catalog::{Archive, Catalog, Character, LogEntry, MAX_SCORE};
use crate::controller::Controller;
use crate::transcript::{ChatMessage, Role, Transcript};
use crate::view::{PasscodeEntry, Screen};
use crate::watch::WatchSnapshot;

use colored::{ColoredString, Colorize};
use prettytable::{format, row, Table};

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Capability score as a fixed-width bar
pub fn score_bar(score: u8) -> String {
    let filled = usize::from(score.min(MAX_SCORE));
    let empty = usize::from(MAX_SCORE) - filled;
    format!(
        "{}{} {:>2}",
        BAR_FILLED.to_string().repeat(filled),
        BAR_EMPTY.to_string().repeat(empty),
        score
    )
}

/// Paint text in the character's signature color, if it has one
pub fn paint(text: &str, character: &Character) -> ColoredString {
    match character.signature_rgb() {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

pub fn lock_screen(entry: &PasscodeEntry, passcode_length: usize) -> String {
    let dots: Vec<&str> = (0..passcode_length)
        .map(|i| if i < entry.entered.len() { "●" } else { "○" })
        .collect();

    let mut out = format!(
        "{}\nEnter passcode: {}\n",
        "RESTRICTED TERMINAL".bold(),
        dots.join(" ")
    );
    if entry.error {
        out.push_str(&format!("{}\n", "ACCESS DENIED".red().bold()));
    }
    out
}

pub fn dashboard(catalog: &Catalog) -> String {
    let org = catalog.organization();
    let mut out = format!(
        "{}\n{}\n\n{}\n\n{} {}\n\n{}\n",
        org.name.bold(),
        org.slogan.italic(),
        org.philosophy,
        "Public face:".dimmed(),
        org.public_face,
        "Archives".bold()
    );
    for archive in catalog.archives() {
        out.push_str(&format!("  {}  {}\n", archive.id.cyan(), archive.title));
    }
    out.push_str(&format!(
        "\n{} personnel on file. Use {} or {}.\n",
        catalog.characters().len(),
        "/personnel".cyan(),
        "/archive <id>".cyan()
    ));
    out
}

pub fn personnel_table(catalog: &Catalog) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row![
        "ID".bold(),
        "Name".bold(),
        "Age".bold(),
        "Position".bold(),
        "Role".bold(),
        "MBTI".bold()
    ]);

    for c in catalog.characters() {
        table.add_row(row![
            c.id.cyan(),
            paint(&format!("{} {}", c.name, c.hanja), c),
            c.age,
            c.position,
            c.role,
            c.mbti
        ]);
    }
    table
}

pub fn profile(character: &Character) -> String {
    let symbol = character.symbol.as_deref().unwrap_or("");
    let mut out = format!(
        "{} {} {}\n{}\n{} · {} · age {} · {}\n\n",
        paint(&character.name, character).bold(),
        character.hanja,
        symbol,
        character.meaning.italic(),
        character.position,
        character.role,
        character.age,
        character.mbti
    );

    for (axis, score) in character.scores.axes() {
        out.push_str(&format!(
            "  {:<13}{}\n",
            axis,
            paint(&score_bar(score), character)
        ));
    }
    out.push('\n');

    out.push_str(&format!("{}\n{}\n\n", "Appearance".bold(), character.appearance));
    out.push_str(&format!("{}\n{}\n\n", "Personality".bold(), character.personality));
    if !character.features.is_empty() {
        out.push_str(&format!("{}\n", "Features".bold()));
        for feature in &character.features {
            out.push_str(&format!("  - {}\n", feature));
        }
        out.push('\n');
    }
    if let Some(theme) = &character.theme {
        match &theme.url {
            Some(url) => out.push_str(&format!("♪ {} {}\n", theme.title, url.dimmed())),
            None => out.push_str(&format!("♪ {}\n", theme.title)),
        }
    }
    out
}

pub fn archive(archive: &Archive) -> String {
    let mut out = format!("{}\n{}\n\n", archive.title.bold(), archive.summary.italic());
    for entry in &archive.entries {
        out.push_str(&format!("{}\n{}\n\n", entry.heading.cyan(), entry.body));
    }
    out
}

fn log_line(entry: &LogEntry) -> String {
    format!("[{}] {}: {}", entry.direction, entry.name.bold(), entry.content)
}

pub fn watch_panel(snapshot: &WatchSnapshot) -> String {
    let mut out = format!(
        "{}\n♥ {} bpm   resp {} /min   {:.1} °C\n",
        "── WATCH ──".dimmed(),
        snapshot.heart_rate.to_string().red(),
        snapshot.respiration_rate,
        snapshot.temperature
    );
    if let Some(location) = &snapshot.location {
        out.push_str(&format!("⌖ {}\n", location));
    }
    for call in &snapshot.calls {
        out.push_str(&format!("☎ {}\n", log_line(call)));
    }
    for message in &snapshot.messages {
        out.push_str(&format!("✉ {}\n", log_line(message)));
    }
    if !snapshot.searches.is_empty() {
        out.push_str(&format!("⌕ {}\n", snapshot.searches.join(" | ")));
    }
    out
}

/// Label printed before each transcript entry
pub fn speaker(role: Role, character: &Character) -> ColoredString {
    match role {
        Role::User => "You".bold(),
        Role::Model => paint(&character.name, character).bold(),
    }
}

pub fn message(msg: &ChatMessage, character: &Character, interrupted_notice: &str) -> String {
    let mut out = format!("{}: {}", speaker(msg.role, character), msg.text);
    if msg.interrupted.is_some() {
        out.push_str(&format!("\n{}", interrupted_notice.yellow()));
    }
    out
}

pub fn transcript(
    transcript: &Transcript,
    character: &Character,
    interrupted_notice: &str,
) -> String {
    transcript
        .messages()
        .iter()
        .map(|m| message(m, character, interrupted_notice))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn alert(text: &str) -> String {
    format!("{} {}", "!".red().bold(), text.red())
}

pub fn help() -> String {
    let commands = [
        ("/personnel", "List personnel"),
        ("/archive <id>", "Open an archive"),
        ("/select <id>", "Open a character profile"),
        ("/chat", "Open a chat with the selected character"),
        ("/back", "Go back one screen"),
        ("/status", "Show where you are"),
        ("/help", "Show this help"),
        ("/exit", "Leave the terminal"),
    ];
    let mut out = String::from("Commands:\n");
    for (cmd, about) in commands {
        out.push_str(&format!("  {:<15}{}\n", cmd.cyan(), about));
    }
    out
}

/// Full render of whatever screen the controller is on
pub fn screen(controller: &Controller, passcode_length: usize) -> String {
    let state = controller.state();
    let catalog = controller.catalog();
    let selected = state
        .selected_character
        .as_deref()
        .and_then(|id| catalog.find_character(id).ok());

    let mut out = match state.screen {
        Screen::Lock => lock_screen(&state.passcode, passcode_length),
        Screen::Dashboard => dashboard(catalog),
        Screen::PersonnelList => personnel_table(catalog).to_string(),
        Screen::CharacterDetail => selected.map(profile).unwrap_or_default(),
        Screen::Archive => state
            .selected_archive
            .as_deref()
            .and_then(|id| catalog.find_archive(id).ok())
            .map(archive)
            .unwrap_or_default(),
        Screen::Chat => {
            let mut out = state.watch.as_ref().map(watch_panel).unwrap_or_default();
            if let (Some(character), Some(log)) = (selected, controller.transcript()) {
                out.push('\n');
                out.push_str(&transcript(
                    log,
                    character,
                    &controller.chat_config().interrupted_notice,
                ));
                out.push('\n');
            }
            out
        }
    };

    if let Some(text) = &state.alert {
        out.push('\n');
        out.push_str(&alert(text));
        out.push('\n');
    }
    out
}
