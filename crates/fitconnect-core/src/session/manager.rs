use std::future::Future;

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::SensayClient;
use crate::config::Config;
use crate::language::Language;
use crate::session::store::{SessionStore, MESSAGES_KEY, PROFILE_KEY};
use crate::state::{ChatMessage, Sender, UserProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid birth date: {0}")]
    InvalidBirthDate(String),
    #[error("a reply is already pending")]
    Busy,
    #[error("the intake form has not been submitted")]
    NotStarted,
}

impl SessionError {
    /// Text shown to the user for a rejected form. `Busy` has none; the
    /// input is disabled while a reply is pending.
    pub fn user_message(&self, language: Language) -> Option<&'static str> {
        let strings = language.strings();
        match self {
            SessionError::MissingFields(_) | SessionError::NotStarted => {
                Some(strings.fill_all_fields)
            }
            SessionError::InvalidBirthDate(_) => Some(strings.invalid_birth_date),
            SessionError::Busy => None,
        }
    }
}

/// Something that can answer a chat turn.
pub trait ChatBackend {
    fn reply(&self, content: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// The configured replica, answering as the configured user.
#[derive(Clone)]
pub struct ReplicaChat {
    client: SensayClient,
    replica_uuid: String,
    user_id: String,
}

impl ReplicaChat {
    pub fn new(client: SensayClient, replica_uuid: &str, user_id: &str) -> Self {
        Self {
            client,
            replica_uuid: replica_uuid.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            SensayClient::from_config(config)?,
            config.replica_uuid()?,
            &config.user_id,
        ))
    }
}

impl ChatBackend for ReplicaChat {
    fn reply(&self, content: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.client
            .chat_completion(&self.replica_uuid, &self.user_id, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyKind {
    Welcome,
    Answer,
}

/// An upstream request that has been started but not yet completed.
#[derive(Debug)]
pub struct PendingReply {
    context: String,
    kind: ReplyKind,
    generation: u64,
}

impl PendingReply {
    /// The text to send upstream.
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// `"<label>: <content>"` lines for the transcript, then the new user line.
pub fn conversation_context(language: Language, history: &[ChatMessage], input: &str) -> String {
    let mut lines: Vec<String> = history
        .iter()
        .map(|m| format!("{}: {}", language.label(m.sender), m.content))
        .collect();
    lines.push(format!("{}: {}", language.label(Sender::User), input));
    lines.join("\n")
}

/// One visitor's conversation, mirrored into a [`SessionStore`].
pub struct ChatSession<S: SessionStore> {
    store: S,
    language: Language,
    profile: Option<UserProfile>,
    messages: Vec<ChatMessage>,
    pending: bool,
    generation: u64,
}

impl<S: SessionStore> ChatSession<S> {
    pub fn new(store: S, language: Language) -> Self {
        Self {
            store,
            language,
            profile: None,
            messages: Vec::new(),
            pending: false,
            generation: 0,
        }
    }

    /// Pick up a previous session from the store. Anything unreadable is
    /// discarded and the session starts empty.
    pub fn restore(store: S, language: Language) -> Self {
        let mut session = Self::new(store, language);

        let saved = (
            session.store.get(PROFILE_KEY),
            session.store.get(MESSAGES_KEY),
        );
        let (profile_raw, messages_raw) = match saved {
            (Ok(Some(p)), Ok(Some(m))) => (p, m),
            (Err(e), _) | (_, Err(e)) => {
                warn!("discarding unreadable chat session: {:#}", e);
                session.clear_store();
                return session;
            }
            _ => return session,
        };

        let parsed = serde_json::from_str::<UserProfile>(&profile_raw).and_then(|p| {
            serde_json::from_str::<Vec<ChatMessage>>(&messages_raw).map(|m| (p, m))
        });

        match parsed {
            Ok((profile, messages)) => {
                debug!(messages = messages.len(), "restored chat session");
                session.profile = Some(profile);
                session.messages = messages;
            }
            Err(e) => {
                warn!("discarding corrupted chat session: {}", e);
                session.clear_store();
            }
        }
        session
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// True once the intake form has been accepted.
    pub fn has_started(&self) -> bool {
        self.profile.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate the intake form and queue the introduction message.
    pub fn begin_profile(
        &mut self,
        profile: UserProfile,
        today: NaiveDate,
    ) -> Result<PendingReply, SessionError> {
        if self.pending {
            return Err(SessionError::Busy);
        }

        let missing = profile.missing_fields();
        if !missing.is_empty() {
            return Err(SessionError::MissingFields(missing));
        }

        let birth = profile
            .parsed_birth_date()
            .ok_or_else(|| SessionError::InvalidBirthDate(profile.birth_date.clone()))?;
        let intro = self.language.intake_message(&profile, age_on(birth, today));

        match serde_json::to_string(&profile) {
            Ok(json) => {
                if let Err(e) = self.store.set(PROFILE_KEY, &json) {
                    warn!("could not save profile: {:#}", e);
                }
            }
            Err(e) => warn!("could not encode profile: {}", e),
        }
        self.profile = Some(profile);

        self.messages.clear();
        self.push(ChatMessage::user(intro.clone()));

        Ok(self.start(intro, ReplyKind::Welcome))
    }

    /// Queue a user message. Blank input is ignored and yields `None`.
    pub fn begin_message(&mut self, text: &str) -> Result<Option<PendingReply>, SessionError> {
        if self.pending {
            return Err(SessionError::Busy);
        }
        if self.profile.is_none() {
            return Err(SessionError::NotStarted);
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let context = conversation_context(self.language, &self.messages, text);
        self.push(ChatMessage::user(text));

        Ok(Some(self.start(context, ReplyKind::Answer)))
    }

    /// Append the outcome of a pending request. Replies that arrive after a
    /// reset are dropped and `None` is returned.
    pub fn complete(
        &mut self,
        pending: PendingReply,
        outcome: Result<Option<String>>,
    ) -> Option<&ChatMessage> {
        if pending.generation != self.generation || !self.pending {
            debug!("dropping reply for a cleared session");
            return None;
        }
        self.pending = false;

        let strings = self.language.strings();
        let content = match outcome {
            Ok(Some(content)) => content,
            Ok(None) => match pending.kind {
                ReplyKind::Welcome => strings.default_welcome.to_string(),
                ReplyKind::Answer => strings.processing_error.to_string(),
            },
            Err(e) => {
                warn!("chat request failed: {:#}", e);
                match pending.kind {
                    ReplyKind::Welcome => strings.fallback_welcome.to_string(),
                    ReplyKind::Answer => strings.error_message.to_string(),
                }
            }
        };

        self.push(ChatMessage::assistant(content));
        self.messages.last()
    }

    pub async fn submit_profile<B: ChatBackend>(
        &mut self,
        backend: &B,
        profile: UserProfile,
    ) -> Result<(), SessionError> {
        let pending = self.begin_profile(profile, Local::now().date_naive())?;
        let outcome = backend.reply(pending.context()).await;
        self.complete(pending, outcome);
        Ok(())
    }

    pub async fn send_message<B: ChatBackend>(
        &mut self,
        backend: &B,
        text: &str,
    ) -> Result<(), SessionError> {
        if let Some(pending) = self.begin_message(text)? {
            let outcome = backend.reply(pending.context()).await;
            self.complete(pending, outcome);
        }
        Ok(())
    }

    /// Forget the visitor and the conversation, both in memory and on disk.
    pub fn reset(&mut self) {
        self.clear_store();
        self.profile = None;
        self.messages.clear();
        self.pending = false;
        self.generation += 1;
    }

    fn start(&mut self, context: String, kind: ReplyKind) -> PendingReply {
        self.pending = true;
        PendingReply {
            context,
            kind,
            generation: self.generation,
        }
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        match serde_json::to_string(&self.messages) {
            Ok(json) => {
                if let Err(e) = self.store.set(MESSAGES_KEY, &json) {
                    warn!("could not save chat: {:#}", e);
                }
            }
            Err(e) => warn!("could not encode chat: {}", e),
        }
    }

    fn clear_store(&mut self) {
        for key in [PROFILE_KEY, MESSAGES_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("could not remove {}: {:#}", key, e);
            }
        }
    }
}
