use crate::contacts::ContactDirectory;
use crate::dashboard::StageSummary;
use crate::error::{BoardError, FieldErrors};
use crate::forms::{validate_login, validate_signup, Form, FormAction};
use crate::kanban_board::{KanbanBoard, TaskDraft};
use crate::notify::Notifications;
use crate::profile::{normalize_tag, ProfileUpdate, ProfileView};
use crate::session::{Session, SessionStore};
use crate::sync::{ApiEvent, Envelope, SyncClient};
use crate::task::{Direction, OwnerId, Stage, TaskId};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Signup,
    Dashboard,
    Contacts,
    Deals,
    Profile,
}

impl Screen {
    pub const NAV: [Self; 4] = [Self::Dashboard, Self::Contacts, Self::Deals, Self::Profile];

    pub fn title(self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Signup => "Create account",
            Self::Dashboard => "Dashboard",
            Self::Contacts => "Contacts",
            Self::Deals => "Deals",
            Self::Profile => "Profile",
        }
    }

    fn requires_session(self) -> bool {
        !matches!(self, Self::Login | Self::Signup)
    }
}

/// A modal form drawn over the current screen.
#[derive(Debug)]
pub enum Overlay {
    NewTask { form: Form, stage: Stage },
    EditDescription(Form),
    NewTag(Form),
}

impl Overlay {
    pub fn form(&self) -> &Form {
        match self {
            Self::NewTask { form, .. } | Self::EditDescription(form) | Self::NewTag(form) => form,
        }
    }

    fn form_mut(&mut self) -> &mut Form {
        match self {
            Self::NewTask { form, .. } | Self::EditDescription(form) | Self::NewTag(form) => form,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::NewTask { stage, .. } => format!("New deal in {stage}"),
            Self::EditDescription(_) => "Edit description".to_string(),
            Self::NewTag(_) => "Add tag".to_string(),
        }
    }
}

pub struct App {
    pub screen: Screen,
    pub session: Option<Session>,
    store: SessionStore,
    sync: SyncClient,
    pub board: KanbanBoard,
    pub contacts: ContactDirectory,
    pub profile: ProfileView,
    pub selected_tag: usize,
    pub summary: Option<StageSummary>,
    pub notices: Notifications,
    pub login_form: Form,
    pub signup_form: Form,
    pub overlay: Option<Overlay>,
    pub report_url: Option<String>,
    /// A login or signup request is outstanding.
    pub busy: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(sync: SyncClient, store: SessionStore, report_url: Option<String>) -> Self {
        let mut notices = Notifications::default();
        let session = store.load().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unreadable session");
            notices.error("Saved session could not be read, please sign in again");
            None
        });

        let mut app = Self {
            screen: Screen::Login,
            session,
            store,
            sync,
            board: KanbanBoard::new(),
            contacts: ContactDirectory::new(),
            profile: ProfileView::Idle,
            selected_tag: 0,
            summary: None,
            notices,
            login_form: Form::login(),
            signup_form: Form::signup(),
            overlay: None,
            report_url,
            busy: false,
            should_quit: false,
        };
        if let Some(session) = &app.session {
            info!(owner = %session.owner_id, "resuming session");
            app.sync.set_token(session.token.clone());
            app.navigate(Screen::Dashboard);
        }
        app
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.session.as_ref().map(|s| s.owner_id)
    }

    /// Switches screens and kicks off the fetch the new screen needs.
    pub fn navigate(&mut self, screen: Screen) {
        if self.screen == Screen::Profile && screen != Screen::Profile {
            self.sync.cancel_profile_fetch();
            if matches!(self.profile, ProfileView::Loading) {
                self.profile = ProfileView::Idle;
            }
        }
        self.overlay = None;
        self.screen = screen;
        if !screen.requires_session() {
            return;
        }

        let Some(owner) = self.owner_id() else {
            if screen == Screen::Profile {
                self.profile = ProfileView::Failed("User not authenticated".to_string());
            } else {
                self.notices.error("Please sign in first");
                self.screen = Screen::Login;
            }
            return;
        };
        debug!(screen = screen.title(), "navigating");
        match screen {
            Screen::Dashboard => self.sync.fetch_summary(owner),
            Screen::Contacts => self.sync.fetch_contacts(owner),
            Screen::Deals => self.sync.fetch_tasks(owner),
            Screen::Profile => {
                self.profile = ProfileView::Loading;
                self.sync.fetch_profile(owner);
            }
            Screen::Login | Screen::Signup => {}
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.notices.prune(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.overlay.is_some() {
            self.overlay_key(key);
            return;
        }
        match self.screen {
            Screen::Login => self.login_key(key),
            Screen::Signup => self.signup_key(key),
            Screen::Contacts if self.contacts.searching => self.contacts_key(key),
            _ => {
                if !self.global_key(key) {
                    match self.screen {
                        Screen::Contacts => self.contacts_key(key),
                        Screen::Deals => self.deals_key(key),
                        Screen::Profile => self.profile_key(key),
                        _ => {}
                    }
                }
            }
        }
    }

    fn global_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.navigate(Screen::NAV[index]);
            }
            KeyCode::Char('r') => self.navigate(self.screen),
            KeyCode::Char('L') => self.logout(),
            _ => return false,
        }
        true
    }

    fn login_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('n') {
            self.screen = Screen::Signup;
            return;
        }
        if self.login_form.handle_key(key) == FormAction::Submit {
            self.submit_login();
        }
    }

    fn signup_key(&mut self, key: KeyEvent) {
        match self.signup_form.handle_key(key) {
            FormAction::Submit => {
                self.submit_signup();
            }
            FormAction::Cancel => self.screen = Screen::Login,
            FormAction::Editing => {}
        }
    }

    fn deals_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.board.select_stage(-1),
            KeyCode::Right | KeyCode::Char('l') => self.board.select_stage(1),
            KeyCode::Up | KeyCode::Char('k') => self.board.select_task(-1),
            KeyCode::Down | KeyCode::Char('j') => self.board.select_task(1),
            KeyCode::Char('f' | ']' | '>') => self.move_selected(Direction::Forward),
            KeyCode::Char('b' | '[' | '<') => self.move_selected(Direction::Backward),
            KeyCode::Char('a') => {
                self.overlay = Some(Overlay::NewTask {
                    form: Form::task(),
                    stage: self.board.selected_stage(),
                });
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.board.selected().map(|t| t.id.clone()) {
                    self.delete_task(&id);
                }
            }
            _ => {}
        }
    }

    fn contacts_key(&mut self, key: KeyEvent) {
        if self.contacts.searching {
            match key.code {
                KeyCode::Esc => self.contacts.close_search(),
                KeyCode::Enter => {
                    if self.contacts.accept_suggestion() {
                        self.notices.info("Contact added");
                    }
                }
                KeyCode::Up => self.contacts.select(-1),
                KeyCode::Down => self.contacts.select(1),
                KeyCode::Backspace => {
                    self.contacts.search.pop();
                    self.contacts.selected_suggestion = 0;
                }
                KeyCode::Char(c) => {
                    self.contacts.search.push(c);
                    self.contacts.selected_suggestion = 0;
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('a') => self.contacts.open_search(),
            KeyCode::Up | KeyCode::Char('k') => self.contacts.select(-1),
            KeyCode::Down | KeyCode::Char('j') => self.contacts.select(1),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.contacts.selected_contact().map(|c| c.id.clone()) {
                    self.contacts.remove(&id);
                }
            }
            _ => {}
        }
    }

    fn profile_key(&mut self, key: KeyEvent) {
        let Some(profile) = self.profile.profile() else {
            return;
        };
        let tag_count = profile.tags.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected_tag = self.selected_tag.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_tag = (self.selected_tag + 1).min(tag_count.saturating_sub(1));
            }
            KeyCode::Char('e') => {
                let mut form = Form::single("description", "Description");
                form.set_value("description", profile.description.clone().unwrap_or_default());
                self.overlay = Some(Overlay::EditDescription(form));
            }
            KeyCode::Char('t') => self.overlay = Some(Overlay::NewTag(Form::single("tag", "Tag"))),
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(tag) = profile.tags.get(self.selected_tag).cloned() {
                    self.remove_tag(tag);
                }
            }
            _ => {}
        }
    }

    fn overlay_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        match overlay.form_mut().handle_key(key) {
            FormAction::Editing => {}
            FormAction::Cancel => self.overlay = None,
            FormAction::Submit => self.submit_overlay(),
        }
    }

    fn submit_overlay(&mut self) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        match overlay {
            Overlay::NewTask { mut form, stage } => {
                let draft = TaskDraft {
                    title: form.value("title").to_string(),
                    description: form.value("description").to_string(),
                    due_date: form.value("due_date").to_string(),
                    priority: form.value("priority").to_string(),
                    stage: Some(stage),
                };
                if let Err(errors) = self.add_task(&draft) {
                    form.errors = errors;
                    self.overlay = Some(Overlay::NewTask { form, stage });
                }
            }
            Overlay::EditDescription(form) => {
                self.update_description(form.value("description").trim().to_string());
            }
            Overlay::NewTag(mut form) => {
                let raw = form.value("tag").to_string();
                if !self.add_tag(&raw) {
                    form.errors.insert("tag", "Tag is empty or already present");
                    self.overlay = Some(Overlay::NewTag(form));
                }
            }
        }
    }

    /// Validates the login form and sends it. Returns `false` if validation failed.
    pub fn submit_login(&mut self) -> bool {
        match validate_login(self.login_form.value("email"), self.login_form.value("password")) {
            Ok(credentials) => {
                self.login_form.errors = FieldErrors::new();
                self.busy = true;
                self.sync.login(credentials);
                true
            }
            Err(errors) => {
                self.login_form.errors = errors;
                false
            }
        }
    }

    pub fn submit_signup(&mut self) -> bool {
        match validate_signup(&self.signup_form, Local::now().date_naive()) {
            Ok(request) => {
                self.signup_form.errors = FieldErrors::new();
                self.busy = true;
                self.sync.signup(request);
                true
            }
            Err(errors) => {
                self.signup_form.errors = errors;
                false
            }
        }
    }

    pub fn logout(&mut self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear session");
        }
        self.sync.end_session();
        self.session = None;
        self.board = KanbanBoard::new();
        self.contacts = ContactDirectory::new();
        self.profile = ProfileView::Idle;
        self.summary = None;
        self.overlay = None;
        self.screen = Screen::Login;
        info!("signed out");
    }

    fn move_selected(&mut self, direction: Direction) {
        if let Some((id, from)) = self.board.selected().map(|t| (t.id.clone(), t.status)) {
            self.move_task(&id, from, direction);
        }
    }

    /// Moves a task one column and tells the backend. Boundary moves do nothing.
    ///
    /// The board changes immediately; if the update is rejected the whole task
    /// list is fetched again rather than undoing the move locally.
    pub fn move_task(&mut self, id: &TaskId, from: Stage, direction: Direction) -> bool {
        match self.board.begin_move(id, from, direction) {
            Ok(planned) => {
                self.board.follow(id);
                self.sync.update_status(planned);
                true
            }
            Err(BoardError::AtBoundary { .. }) => false,
            Err(err) => {
                warn!(error = %err, "move refused");
                self.notices.error(err.to_string());
                false
            }
        }
    }

    /// Validates a new deal and sends it. Invalid drafts never reach the backend.
    pub fn add_task(&mut self, draft: &TaskDraft) -> Result<(), FieldErrors> {
        let Some(owner) = self.owner_id() else {
            self.notices.error("Please sign in first");
            return Ok(());
        };
        let new_task = draft.validate(owner)?;
        self.sync.create_task(new_task);
        Ok(())
    }

    pub fn delete_task(&mut self, id: &TaskId) -> bool {
        match self.board.remove(id) {
            Some(task) => {
                info!(task = %task.id, "deleting task");
                self.sync.delete_task(task.id);
                true
            }
            None => false,
        }
    }

    pub fn update_description(&mut self, description: String) {
        if let Some(owner) = self.owner_id() {
            self.sync.update_profile(owner, ProfileUpdate { description });
        }
    }

    /// Sends a new tag. `false` if it is blank, a duplicate, or there is no profile.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let (Some(owner), Some(profile)) = (self.owner_id(), self.profile.profile()) else {
            return false;
        };
        match normalize_tag(profile, raw) {
            Some(tag) => {
                self.sync.add_tag(owner, tag);
                true
            }
            None => false,
        }
    }

    pub fn remove_tag(&mut self, tag: String) {
        if let Some(owner) = self.owner_id() {
            self.sync.remove_tag(owner, tag);
        }
    }

    /// Drops local board state in favour of a fresh fetch.
    fn resync(&mut self, message: String) {
        self.notices.error(message);
        self.board.mark_stale();
        if let Some(owner) = self.owner_id() {
            self.sync.fetch_tasks(owner);
        }
    }

    /// Applies a finished call unless it belongs to a session that has since ended.
    pub fn receive(&mut self, envelope: Envelope) {
        if !self.sync.is_current(&envelope) {
            debug!(session = envelope.session, "dropping result from an ended session");
            return;
        }
        self.apply(envelope.event);
    }

    pub fn apply(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::LoggedIn(result) => {
                self.busy = false;
                match result {
                    Ok(login) => {
                        let session = Session {
                            owner_id: login.owner_id,
                            name: login.name,
                            token: login.token,
                        };
                        if let Err(err) = self.store.save(&session) {
                            warn!(error = %err, "failed to persist session");
                            self.notices.error("Signed in, but the session could not be saved");
                        }
                        info!(owner = %session.owner_id, "signed in");
                        self.sync.set_token(session.token.clone());
                        self.notices.info(format!("Welcome back, {}", session.name));
                        self.session = Some(session);
                        self.login_form.clear();
                        self.navigate(Screen::Dashboard);
                    }
                    Err(err) => {
                        warn!(error = %err, "login failed");
                        self.notices.error(err.user_message("Could not sign in"));
                    }
                }
            }
            ApiEvent::SignedUp(result) => {
                self.busy = false;
                match result {
                    Ok(()) => {
                        self.signup_form.clear();
                        self.notices.info("Account created, you can sign in now");
                        self.screen = Screen::Login;
                    }
                    Err(err) => self.notices.error(err.user_message("Sign-up failed")),
                }
            }
            ApiEvent::TasksLoaded(result) => match result {
                Ok(tasks) => {
                    debug!(count = tasks.len(), "tasks loaded");
                    self.board.replace_all(tasks);
                }
                Err(err) => {
                    warn!(error = %err, resyncing = self.board.resyncing, "task fetch failed");
                    self.notices.error(err.user_message("Could not load deals"));
                }
            },
            ApiEvent::TaskCreated(result) => match result {
                Ok(task) => {
                    let id = task.id.clone();
                    self.board.insert(task);
                    self.board.follow(&id);
                    self.notices.info("Deal added");
                }
                Err(err) => self.notices.error(err.user_message("Could not add deal")),
            },
            ApiEvent::StatusUpdated { planned, result } => match result {
                Ok(()) => {
                    debug!(task = %planned.task_id, to = %planned.to, "move confirmed");
                    self.board.confirm_move(&planned);
                }
                Err(err) => {
                    warn!(task = %planned.task_id, error = %err, "move rejected, resyncing");
                    self.resync(err.user_message("Could not move deal"));
                }
            },
            ApiEvent::TaskDeleted { id, result } => match result {
                Ok(()) => {
                    debug!(task = %id, "delete confirmed");
                    self.board.confirm_removal(&id);
                }
                Err(err) => {
                    warn!(task = %id, error = %err, "delete rejected, resyncing");
                    self.resync(err.user_message("Could not delete deal"));
                }
            },
            ApiEvent::ContactsLoaded(result) => match result {
                Ok(contacts) => self.contacts.load(contacts),
                Err(err) => self.notices.error(err.user_message("Could not load contacts")),
            },
            ApiEvent::SuggestionsLoaded(result) => match result {
                Ok(suggestions) => self.contacts.load_suggestions(suggestions),
                Err(err) => warn!(error = %err, "suggestion fetch failed"),
            },
            ApiEvent::ProfileLoaded { request, result } => {
                if !self.sync.is_current_profile(request) {
                    debug!(request, "dropping cancelled profile result");
                    return;
                }
                self.profile = match result {
                    Ok(profile) => ProfileView::Loaded(profile),
                    Err(err) => {
                        warn!(error = %err, "profile fetch failed");
                        ProfileView::Failed("Could not load profile".to_string())
                    }
                };
                self.selected_tag = 0;
            }
            ApiEvent::ProfileUpdated(result) => match result {
                Ok(profile) => {
                    self.profile = ProfileView::Loaded(profile);
                    self.notices.info("Profile updated");
                }
                Err(err) => self.notices.error(err.user_message("Could not update profile")),
            },
            ApiEvent::TagAdded { tag, result } => match result {
                Ok(()) => {
                    if let Some(profile) = self.profile.profile_mut() {
                        if !profile.has_tag(&tag) {
                            profile.tags.push(tag);
                        }
                    }
                }
                Err(err) => self.notices.error(err.user_message("Could not add tag")),
            },
            ApiEvent::TagRemoved { tag, result } => match result {
                Ok(()) => {
                    if let Some(profile) = self.profile.profile_mut() {
                        profile.tags.retain(|t| t != &tag);
                        self.selected_tag = self.selected_tag.min(profile.tags.len().saturating_sub(1));
                    }
                }
                Err(err) => self.notices.error(err.user_message("Could not remove tag")),
            },
            ApiEvent::SummaryLoaded(summary) => self.summary = Some(summary),
        }
    }
}
