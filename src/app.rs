use anyhow::anyhow;
use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fitconnect_core::session::PendingReply;
use fitconnect_core::{ChatBackend, ChatSession, FileStore, Language, ReplicaChat, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intake,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    BirthDate,
    Phone,
    Email,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Name,
        FormField::BirthDate,
        FormField::Phone,
        FormField::Email,
    ];

    pub fn next(self) -> Self {
        match self {
            FormField::Name => FormField::BirthDate,
            FormField::BirthDate => FormField::Phone,
            FormField::Phone => FormField::Email,
            FormField::Email => FormField::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::Name => FormField::Email,
            FormField::BirthDate => FormField::Name,
            FormField::Phone => FormField::BirthDate,
            FormField::Email => FormField::Phone,
        }
    }

    pub fn label(self, language: Language) -> &'static str {
        let strings = language.strings();
        match self {
            FormField::Name => strings.name_label,
            FormField::BirthDate => strings.birth_date_label,
            FormField::Phone => strings.phone_label,
            FormField::Email => strings.email_label,
        }
    }
}

type ReplyTask = JoinHandle<anyhow::Result<Option<String>>>;

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    pub session: ChatSession<FileStore>,
    pub backend: Option<ReplicaChat>,

    // Intake form
    pub form: UserProfile,
    pub form_field: FormField,
    pub form_error: Option<String>,

    // Chat input
    pub input: String,
    pub cursor: usize,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8,
    pub confirm_reset: bool,

    reply: Option<(PendingReply, ReplyTask)>,
}

impl App {
    pub fn new(session: ChatSession<FileStore>, backend: Option<ReplicaChat>) -> Self {
        let screen = if session.has_started() {
            Screen::Chat
        } else {
            Screen::Intake
        };

        let mut app = Self {
            should_quit: false,
            screen,
            input_mode: InputMode::Editing,
            session,
            backend,
            form: UserProfile::default(),
            form_field: FormField::default(),
            form_error: None,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            confirm_reset: false,
            reply: None,
        };
        app.scroll_to_bottom();
        app
    }

    pub fn language(&self) -> Language {
        self.session.language()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_pending()
    }

    pub fn form_value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.form.name,
            FormField::BirthDate => &self.form.birth_date,
            FormField::Phone => &self.form.phone,
            FormField::Email => &self.form.email,
        }
    }

    pub fn form_value_mut(&mut self) -> &mut String {
        match self.form_field {
            FormField::Name => &mut self.form.name,
            FormField::BirthDate => &mut self.form.birth_date,
            FormField::Phone => &mut self.form.phone,
            FormField::Email => &mut self.form.email,
        }
    }

    /// Validate the form and, if it passes, move to the chat and ask for a welcome.
    pub fn submit_form(&mut self) {
        let today = Local::now().date_naive();
        match self.session.begin_profile(self.form.clone(), today) {
            Ok(pending) => {
                self.form_error = None;
                self.screen = Screen::Chat;
                self.input_mode = InputMode::Editing;
                self.spawn_reply(pending);
            }
            Err(e) => {
                debug!(error = %e, "intake form rejected");
                self.form_error = e.user_message(self.language()).map(str::to_string);
            }
        }
    }

    /// Send what is in the input box. Does nothing while a reply is pending.
    pub fn send_input(&mut self) {
        if self.is_loading() {
            return;
        }
        match self.session.begin_message(&self.input) {
            Ok(Some(pending)) => {
                self.input.clear();
                self.cursor = 0;
                self.spawn_reply(pending);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "message not sent"),
        }
    }

    fn spawn_reply(&mut self, pending: PendingReply) {
        let backend = self.backend.clone();
        let context = pending.context().to_string();
        let task = tokio::spawn(async move {
            match backend {
                Some(backend) => backend.reply(&context).await,
                None => Err(anyhow!("replica is not configured")),
            }
        });
        self.reply = Some((pending, task));
        self.scroll_to_bottom();
    }

    /// Collect a finished reply, if any. Called on every tick.
    pub async fn poll_reply(&mut self) {
        let finished = matches!(&self.reply, Some((_, task)) if task.is_finished());
        if !finished {
            return;
        }
        if let Some((pending, task)) = self.reply.take() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!("reply task failed: {}", e)),
            };
            self.session.complete(pending, outcome);
            self.scroll_to_bottom();
        }
    }

    /// Clear the conversation and go back to the intake form.
    pub fn reset(&mut self) {
        self.reply = None;
        self.session.reset();
        self.form = UserProfile::default();
        self.form_field = FormField::default();
        self.form_error = None;
        self.input.clear();
        self.cursor = 0;
        self.chat_scroll = 0;
        self.confirm_reset = false;
        self.screen = Screen::Intake;
        self.input_mode = InputMode::Editing;
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll so the newest message (or the typing indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.session.messages() {
            total_lines = total_lines.saturating_add(1); // sender label
            for line in msg.content.lines() {
                let chars = line.chars().count();
                total_lines = total_lines.saturating_add(chars / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1);
        }
        if self.is_loading() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };
        self.chat_scroll = u16::try_from(total_lines.saturating_sub(visible)).unwrap_or(u16::MAX);
    }
}
