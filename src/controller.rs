//! Owner of the view state and the active chat
//!
//! [`Controller`] applies transitions through the reducer and performs the
//! effects the reducer cannot: opening a chat session, generating the watch
//! snapshot, and running the task that pumps reply fragments back into the
//! event loop.
//!
//! Each chat gets a fresh [`ChatId`]. Reply events carry the id of the chat
//! that produced them, so anything still in flight after the user leaves the
//! chat (or opens a new one) is recognised as stale and dropped.

use crate::catalog::Catalog;
use crate::config::{AccessConfig, ChatConfig};
use crate::error::PwiceError;
use crate::gateway::{ChatGateway, ChatSession, FragmentStream};
use crate::transcript::Transcript;
use crate::view::{reduce, ReduceContext, Screen, Transition, ViewState};
use crate::watch;

use futures::StreamExt;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Alert raised when a chat cannot open for lack of a usable credential
pub const CONFIGURATION_ALERT: &str = "API Key configuration required";

/// Identity of one chat screen visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(u64);

/// Progress of a streamed reply, delivered to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Fragment { chat: ChatId, text: String },
    Completed { chat: ChatId },
    Failed { chat: ChatId, reason: String },
}

impl ReplyEvent {
    pub fn chat(&self) -> ChatId {
        match self {
            Self::Fragment { chat, .. } | Self::Completed { chat } | Self::Failed { chat, .. } => {
                *chat
            }
        }
    }
}

/// Handle to a running reply pump; aborts the pump when dropped
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drain a fragment stream into the event channel
///
/// Each wait for the next fragment is bounded by `timeout` when set; expiry
/// is reported as a failure.
pub fn spawn_pump(
    chat: ChatId,
    mut stream: FragmentStream,
    events: mpsc::UnboundedSender<ReplyEvent>,
    timeout: Option<Duration>,
) -> Subscription {
    let handle = tokio::spawn(async move {
        loop {
            let next = match timeout {
                Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let _ = events.send(ReplyEvent::Failed {
                            chat,
                            reason: format!("no reply within {}s", limit.as_secs()),
                        });
                        return;
                    }
                },
                None => stream.next().await,
            };

            let event = match next {
                Some(Ok(text)) => ReplyEvent::Fragment { chat, text },
                Some(Err(e)) => ReplyEvent::Failed {
                    chat,
                    reason: e.to_string(),
                },
                None => ReplyEvent::Completed { chat },
            };
            let done = !matches!(event, ReplyEvent::Fragment { .. });
            if events.send(event).is_err() || done {
                return;
            }
        }
    });

    Subscription { handle }
}

/// The chat screen's session and transcript
pub struct ActiveChat {
    id: ChatId,
    character_id: String,
    session: Box<dyn ChatSession>,
    transcript: Transcript,
    subscription: Option<Subscription>,
}

impl ActiveChat {
    pub fn id(&self) -> ChatId {
        self.id
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

/// View state plus the chat it owns
pub struct Controller {
    catalog: Arc<Catalog>,
    access: AccessConfig,
    chat_config: ChatConfig,
    state: ViewState,
    active: Option<ActiveChat>,
    next_chat: u64,
}

impl Controller {
    pub fn new(catalog: Arc<Catalog>, access: AccessConfig, chat_config: ChatConfig) -> Self {
        Self {
            catalog,
            access,
            chat_config,
            state: ViewState::default(),
            active: None,
            next_chat: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn chat_config(&self) -> &ChatConfig {
        &self.chat_config
    }

    pub fn active_chat(&self) -> Option<&ActiveChat> {
        self.active.as_ref()
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.active.as_ref().map(|chat| &chat.transcript)
    }

    pub fn is_reply_in_progress(&self) -> bool {
        self.transcript().is_some_and(Transcript::is_in_progress)
    }

    /// Apply a transition and release the chat if the view left it
    pub fn dispatch(&mut self, transition: Transition) {
        let ctx = ReduceContext {
            catalog: &self.catalog,
            access: &self.access,
        };
        let before = self.state.screen;
        self.state = reduce(&self.state, transition, &ctx);
        if before != self.state.screen {
            tracing::debug!(from = %before, to = %self.state.screen, "Screen changed");
        }

        let keep = self.active.as_ref().is_some_and(|chat| {
            self.state.screen == Screen::Chat
                && self.state.selected_character.as_deref() == Some(chat.character_id.as_str())
        });
        if !keep {
            self.release_chat();
        }
    }

    pub fn back(&mut self) {
        self.dispatch(Transition::Back);
    }

    pub fn select_character(&mut self, id: &str) {
        self.dispatch(Transition::SelectCharacter(id.to_string()));
    }

    pub fn select_archive(&mut self, id: &str) {
        self.dispatch(Transition::SelectArchive(id.to_string()));
    }

    /// Open a chat with the selected character
    ///
    /// Does nothing unless the character detail screen is shown. On failure
    /// the view stays on the detail screen with an alert raised, and the
    /// error is returned.
    pub fn start_chat<R: Rng + ?Sized>(
        &mut self,
        gateway: &dyn ChatGateway,
        rng: &mut R,
    ) -> crate::error::Result<()> {
        if self.state.screen != Screen::CharacterDetail {
            return Ok(());
        }
        let Some(character_id) = self.state.selected_character.clone() else {
            return Ok(());
        };
        let character = self.catalog.find_character(&character_id)?;

        let session = match gateway.open(character) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(character = %character_id, "Chat session refused: {}", e);
                let alert = match e.downcast_ref::<PwiceError>() {
                    Some(err) if err.is_configuration() => CONFIGURATION_ALERT.to_string(),
                    _ => e.to_string(),
                };
                self.dispatch(Transition::ChatFailed(alert));
                return Err(e);
            }
        };

        self.release_chat();
        let snapshot = watch::snapshot_for(&self.catalog, &character_id, rng);

        self.next_chat += 1;
        let id = ChatId(self.next_chat);
        self.active = Some(ActiveChat {
            id,
            character_id: character_id.clone(),
            session,
            transcript: Transcript::with_opening(&self.chat_config.opening_line),
            subscription: None,
        });
        self.dispatch(Transition::ChatOpened(snapshot));
        tracing::info!(character = %character_id, chat = id.0, "Chat started");
        Ok(())
    }

    /// Submit a user message and start streaming the reply
    ///
    /// Returns `false` (changing nothing) when there is no active chat, the
    /// text is blank, or a reply is already streaming.
    pub fn submit(&mut self, text: &str, events: &mpsc::UnboundedSender<ReplyEvent>) -> bool {
        let timeout = match self.chat_config.reply_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let Some(chat) = self.active.as_mut() else {
            return false;
        };
        let Some(message) = chat.transcript.submit_text(text) else {
            return false;
        };

        tracing::debug!(chat = chat.id.0, chars = message.chars().count(), "Sending message");
        let stream = chat.session.send(&message);
        chat.subscription = Some(spawn_pump(chat.id, stream, events.clone(), timeout));
        true
    }

    /// Apply a reply event to the transcript it belongs to
    ///
    /// Returns `false` for events from a chat that is no longer active.
    pub fn apply(&mut self, event: ReplyEvent) -> bool {
        let Some(chat) = self.active.as_mut().filter(|c| c.id == event.chat()) else {
            tracing::debug!("Dropping stale reply event");
            return false;
        };

        match event {
            ReplyEvent::Fragment { text, .. } => chat.transcript.receive_fragment(&text),
            ReplyEvent::Completed { .. } => {
                chat.transcript.complete_reply();
                chat.subscription = None;
            }
            ReplyEvent::Failed { reason, .. } => {
                tracing::warn!(chat = chat.id.0, "Reply failed: {}", reason);
                chat.transcript.fail_reply(reason);
                chat.subscription = None;
            }
        }
        true
    }

    fn release_chat(&mut self) {
        if let Some(chat) = self.active.take() {
            tracing::info!(character = %chat.character_id, chat = chat.id.0, "Chat session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ScriptedGateway, ScriptedReply};
    use crate::test_utils::{test_catalog, test_config};
    use crate::transcript::Role;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn controller() -> Controller {
        let config = test_config();
        Controller::new(Arc::new(test_catalog()), config.access, config.chat)
    }

    fn unlocked_on(id: &str) -> Controller {
        let mut c = controller();
        for d in "0829".chars() {
            c.dispatch(Transition::PasscodeDigit(d));
        }
        c.dispatch(Transition::OpenPersonnel);
        c.select_character(id);
        c
    }

    async fn drain(c: &mut Controller, rx: &mut mpsc::UnboundedReceiver<ReplyEvent>) {
        while c.is_reply_in_progress() {
            let event = rx.recv().await.unwrap();
            c.apply(event);
        }
    }

    #[test]
    fn test_start_chat_without_selection_is_noop() {
        let mut c = controller();
        let gateway = ScriptedGateway::new();
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(c.state().screen, Screen::Lock);
        assert_eq!(gateway.sessions_opened(), 0);
    }

    #[test]
    fn test_start_chat_ignored_off_detail_screen() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        let mut rng = StdRng::seed_from_u64(0);

        c.back();
        c.back();
        assert_eq!(c.state().screen, Screen::Dashboard);
        c.start_chat(&gateway, &mut rng).unwrap();
        assert_eq!(c.state().screen, Screen::Dashboard);

        c.select_archive("saif");
        c.start_chat(&gateway, &mut rng).unwrap();
        assert_eq!(c.state().screen, Screen::Archive);

        c.start_chat(&ScriptedGateway::unconfigured(), &mut rng).unwrap();
        assert!(c.state().alert.is_none());
        assert_eq!(gateway.sessions_opened(), 0);
        assert!(c.active_chat().is_none());
    }

    #[test]
    fn test_start_chat_opens_session_and_snapshot() {
        let mut c = unlocked_on("eun-hyeok-jeong");
        let gateway = ScriptedGateway::new();
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(c.state().screen, Screen::Chat);
        assert!(c.state().watch.is_some());
        let transcript = c.transcript().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::Model);
        assert_eq!(transcript.messages()[0].text, ChatConfig::default().opening_line);
        assert_eq!(c.active_chat().unwrap().character_id(), "eun-hyeok-jeong");
    }

    #[test]
    fn test_start_chat_failure_stays_on_detail() {
        let mut c = unlocked_on("jo-jun-jae");
        let result = c.start_chat(&ScriptedGateway::unconfigured(), &mut StdRng::seed_from_u64(0));
        assert!(result.is_err());
        assert_eq!(c.state().screen, Screen::CharacterDetail);
        assert_eq!(c.state().alert.as_deref(), Some(CONFIGURATION_ALERT));
        assert!(c.active_chat().is_none());
        assert!(c.state().watch.is_none());
    }

    #[test]
    fn test_back_releases_session_and_restart_opens_new_one() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        let mut rng = StdRng::seed_from_u64(0);

        c.start_chat(&gateway, &mut rng).unwrap();
        let first = c.active_chat().unwrap().id();
        c.back();
        assert_eq!(c.state().screen, Screen::CharacterDetail);
        assert!(c.active_chat().is_none());
        assert!(c.state().watch.is_none());

        c.start_chat(&gateway, &mut rng).unwrap();
        assert_eq!(gateway.sessions_opened(), 2);
        assert_ne!(c.active_chat().unwrap().id(), first);
        assert_eq!(c.transcript().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_streams_into_placeholder() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::text(["Don't ", "waste ", "my time."]));
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(c.submit("hello", &tx));
        assert!(c.is_reply_in_progress());
        assert!(!c.submit("again", &tx));

        drain(&mut c, &mut rx).await;
        let messages = c.transcript().unwrap().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "hello");
        assert_eq!(messages[2].text, "Don't waste my time.");
        assert_eq!(gateway.sent(), vec![(1, "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_transport_failure_marks_placeholder() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::FailAfter(
            vec!["Li".to_string()],
            "connection reset".to_string(),
        ));
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        c.submit("hello", &tx);
        drain(&mut c, &mut rx).await;

        let last = c.transcript().unwrap().messages().last().unwrap();
        assert_eq!(last.text, "Li");
        assert!(last.interrupted.as_deref().unwrap().contains("connection reset"));
        assert!(c.submit("retry", &tx));
    }

    #[tokio::test]
    async fn test_stale_events_ignored_after_new_chat() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        let mut rng = StdRng::seed_from_u64(0);
        c.start_chat(&gateway, &mut rng).unwrap();
        let old = c.active_chat().unwrap().id();

        c.back();
        c.start_chat(&gateway, &mut rng).unwrap();
        let stale = ReplyEvent::Fragment {
            chat: old,
            text: "ghost".to_string(),
        };
        assert!(!c.apply(stale));
        assert_eq!(c.transcript().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_selecting_other_character_releases_chat() {
        let mut c = unlocked_on("jo-jun-jae");
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::Stall(vec!["...".to_string()]));
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        c.submit("hello", &tx);

        c.select_character("pil-do-seop");
        assert_eq!(c.state().screen, Screen::CharacterDetail);
        assert!(c.active_chat().is_none());
        assert!(!c.is_reply_in_progress());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_reply_times_out() {
        let mut c = Controller::new(
            Arc::new(test_catalog()),
            AccessConfig::default(),
            ChatConfig {
                reply_timeout_seconds: 5,
                ..Default::default()
            },
        );
        for d in "0829".chars() {
            c.dispatch(Transition::PasscodeDigit(d));
        }
        c.select_character("song-dan-woo");
        let gateway = ScriptedGateway::new();
        gateway.push_reply(ScriptedReply::Stall(vec!["Wait".to_string()]));
        c.start_chat(&gateway, &mut StdRng::seed_from_u64(0)).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        c.submit("status?", &tx);
        drain(&mut c, &mut rx).await;

        let last = c.transcript().unwrap().messages().last().unwrap();
        assert_eq!(last.text, "Wait");
        assert!(last.interrupted.as_deref().unwrap().contains("no reply within 5s"));
    }
}
