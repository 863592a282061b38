//! View state and its transition reducer
//!
//! The visible screen and the current selections live in a single
//! [`ViewState`] value. Every change goes through [`reduce`], a pure function
//! from the current state and a [`Transition`] to the next state. Effects
//! (opening a chat session, generating watch data) are performed by the
//! controller, which then reports their outcome as a transition.

use crate::catalog::Catalog;
use crate::config::AccessConfig;
use crate::watch::WatchSnapshot;
use std::fmt;

/// Screen identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Lock,
    Dashboard,
    Archive,
    PersonnelList,
    CharacterDetail,
    Chat,
}

impl Screen {
    /// Destination of the back edge, `None` where there is none
    pub fn back_target(self) -> Option<Screen> {
        match self {
            Self::Chat => Some(Self::CharacterDetail),
            Self::CharacterDetail => Some(Self::PersonnelList),
            Self::PersonnelList => Some(Self::Dashboard),
            Self::Archive => Some(Self::Dashboard),
            Self::Lock | Self::Dashboard => None,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lock => "LOCK",
            Self::Dashboard => "DASHBOARD",
            Self::Archive => "ARCHIVE",
            Self::PersonnelList => "PERSONNEL",
            Self::CharacterDetail => "PROFILE",
            Self::Chat => "CHAT",
        };
        write!(f, "{}", name)
    }
}

/// Digits typed on the lock screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasscodeEntry {
    pub entered: String,
    /// Raised on a wrong code; cleared by `ClearPasscodeError`
    pub error: bool,
}

/// Everything that decides what is on screen
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub screen: Screen,
    pub selected_character: Option<String>,
    pub selected_archive: Option<String>,
    /// Present only while the chat screen is shown
    pub watch: Option<WatchSnapshot>,
    pub passcode: PasscodeEntry,
    /// Blocking message shown over the current screen
    pub alert: Option<String>,
    /// Bumped whenever the screen or the selected character changes, so the
    /// renderer knows to reset its viewport
    pub viewport_epoch: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            screen: Screen::Lock,
            selected_character: None,
            selected_archive: None,
            watch: None,
            passcode: PasscodeEntry::default(),
            alert: None,
            viewport_epoch: 0,
        }
    }
}

/// A request to change the view
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    PasscodeDigit(char),
    PasscodeBackspace,
    SubmitPasscode,
    ClearPasscodeError,
    OpenPersonnel,
    SelectCharacter(String),
    SelectArchive(String),
    /// A chat session was opened for the selected character
    ChatOpened(WatchSnapshot),
    /// Opening a chat session failed; the message is shown as an alert
    ChatFailed(String),
    DismissAlert,
    Back,
}

/// Read-only inputs the reducer consults
#[derive(Debug, Clone, Copy)]
pub struct ReduceContext<'a> {
    pub catalog: &'a Catalog,
    pub access: &'a AccessConfig,
}

impl ViewState {
    fn goto(&mut self, screen: Screen) {
        if self.screen != screen {
            self.screen = screen;
            self.viewport_epoch += 1;
        }
    }

    fn check_passcode(&mut self, access: &AccessConfig) {
        let entered = std::mem::take(&mut self.passcode.entered);
        if entered == access.passcode {
            self.passcode.error = false;
            self.goto(Screen::Dashboard);
        } else {
            self.passcode.error = true;
        }
    }

    /// Whether the screen/selection invariants hold
    pub fn is_consistent(&self) -> bool {
        let needs_character = matches!(self.screen, Screen::CharacterDetail | Screen::Chat);
        let needs_archive = self.screen == Screen::Archive;
        (!needs_character || self.selected_character.is_some())
            && (!needs_archive || self.selected_archive.is_some())
            && (self.watch.is_none() || self.screen == Screen::Chat)
    }
}

/// Compute the state that follows `transition`
///
/// Unknown character or archive ids leave the state unchanged. While the
/// lock screen is shown only passcode transitions have any effect.
pub fn reduce(state: &ViewState, transition: Transition, ctx: &ReduceContext<'_>) -> ViewState {
    let mut next = state.clone();

    if state.screen == Screen::Lock {
        match transition {
            Transition::PasscodeDigit(c) if c.is_ascii_digit() => {
                if next.passcode.entered.len() < ctx.access.passcode_length {
                    next.passcode.entered.push(c);
                }
                if next.passcode.entered.len() >= ctx.access.passcode_length {
                    next.check_passcode(ctx.access);
                }
            }
            Transition::PasscodeBackspace => {
                next.passcode.entered.pop();
            }
            Transition::SubmitPasscode => next.check_passcode(ctx.access),
            Transition::ClearPasscodeError => next.passcode.error = false,
            _ => {}
        }
        return next;
    }

    match transition {
        Transition::OpenPersonnel => {
            if state.screen == Screen::Dashboard {
                next.goto(Screen::PersonnelList);
            }
        }
        Transition::SelectCharacter(id) => match ctx.catalog.find_character(&id) {
            Ok(character) => {
                if next.selected_character.as_deref() != Some(character.id.as_str()) {
                    next.viewport_epoch += 1;
                }
                next.selected_character = Some(character.id.clone());
                next.watch = None;
                next.alert = None;
                next.goto(Screen::CharacterDetail);
            }
            Err(e) => tracing::debug!("Ignoring character selection: {}", e),
        },
        Transition::SelectArchive(id) => match ctx.catalog.find_archive(&id) {
            Ok(archive) => {
                next.selected_archive = Some(archive.id.clone());
                next.watch = None;
                next.goto(Screen::Archive);
            }
            Err(e) => tracing::debug!("Ignoring archive selection: {}", e),
        },
        Transition::ChatOpened(snapshot) => {
            if state.screen == Screen::CharacterDetail && next.selected_character.is_some() {
                next.watch = Some(snapshot);
                next.alert = None;
                next.goto(Screen::Chat);
            }
        }
        Transition::ChatFailed(message) => next.alert = Some(message),
        Transition::DismissAlert => next.alert = None,
        Transition::Back => {
            if let Some(target) = state.screen.back_target() {
                if state.screen == Screen::Chat {
                    next.watch = None;
                }
                next.goto(target);
            }
        }
        Transition::PasscodeDigit(_)
        | Transition::PasscodeBackspace
        | Transition::SubmitPasscode
        | Transition::ClearPasscodeError => {}
    }

    next
}
