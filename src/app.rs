use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::{ApiClient, Connectivity},
    comment::Comment,
    error::{NetworkFault, WidgetError},
    render::WidgetPage,
    request::Credentials,
    session::{Session, Storage},
    validate::validate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    pub name: String,
    pub text: String,
    pub focus: Option<Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPrompt {
    pub visible: bool,
    pub error: Option<String>,
}

/// Everything the widget shows, owned by [`App`].
#[derive(Debug, Clone, Default)]
pub struct WidgetState {
    pub comments: Vec<Comment>,
    pub session: Option<Session>,
    pub is_loading: bool,
    pub is_adding_comment: bool,
    /// Posting without a session, with a name, as the older API allows.
    pub anonymous_posting: bool,
    pub form: CommentForm,
    pub notice: Option<String>,
    pub login: LoginPrompt,
}

impl WidgetState {
    pub fn is_authorized(&self) -> bool {
        self.session.is_some()
    }

    fn comment_mut(&mut self, id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    fn prompt_login(&mut self) {
        self.login.visible = true;
        self.login.error = None;
    }
}

/// The interactions the rendered widget can trigger.
#[derive(Debug, Clone)]
pub enum Action {
    Like(String),
    OpenReply(String),
    Submit,
    Login(Credentials),
    Logout,
    Reload,
}

pub struct App {
    client: ApiClient,
    storage: Box<dyn Storage>,
    connectivity: Box<dyn Connectivity>,
    state: Mutex<WidgetState>,
}

impl App {
    pub fn new(
        client: ApiClient,
        storage: Box<dyn Storage>,
        connectivity: Box<dyn Connectivity>,
        anonymous_posting: bool,
    ) -> Self {
        Self {
            client,
            storage,
            connectivity,
            state: Mutex::new(WidgetState {
                anonymous_posting,
                ..WidgetState::default()
            }),
        }
    }

    pub async fn state(&self) -> WidgetState {
        self.state.lock().await.clone()
    }

    /// Snapshot for rendering. Takes the pending notice so it is shown once.
    pub async fn page(&self) -> WidgetPage {
        let mut state = self.state.lock().await;
        let notice = state.notice.take();
        WidgetPage::new(&state, notice)
    }

    pub async fn set_draft(&self, name: Option<String>, text: String) {
        let mut state = self.state.lock().await;
        if let Some(name) = name {
            state.form.name = name;
        }
        state.form.text = text;
    }

    /// Restores a stored session, then loads the comments.
    pub async fn init(&self) -> Result<(), WidgetError> {
        self.check_auth().await;
        self.load_comments().await
    }

    pub async fn dispatch(&self, action: Action) -> Result<(), WidgetError> {
        debug!(?action, "dispatch");
        match action {
            Action::Like(id) => {
                self.like(&id).await;
                Ok(())
            }
            Action::OpenReply(id) => {
                self.open_reply(&id).await;
                Ok(())
            }
            Action::Submit => self.submit().await,
            Action::Login(credentials) => self.login(credentials).await,
            Action::Logout => {
                self.drop_session(false).await;
                Ok(())
            }
            Action::Reload => self.load_comments().await,
        }
    }

    async fn check_auth(&self) {
        match Session::load(self.storage.as_ref()) {
            Ok(session) => self.state.lock().await.session = session,
            Err(err) => warn!(%err, "could not read stored session"),
        }
    }

    pub async fn load_comments(&self) -> Result<(), WidgetError> {
        self.state.lock().await.is_loading = true;

        let result = if self.connectivity.is_online().await {
            self.client.fetch_comments().await
        } else {
            Err(NetworkFault::Offline.into())
        };

        let mut state = self.state.lock().await;
        state.is_loading = false;
        match result {
            Ok(comments) => {
                state.comments = comments;
                Ok(())
            }
            Err(err) => {
                state.notice = Some(match &err {
                    WidgetError::Network(NetworkFault::Offline) => {
                        "Нет интернета. Комментарии не загружены.".to_owned()
                    }
                    err => format!("Ошибка загрузки: {err}"),
                });
                Err(err)
            }
        }
    }

    async fn like(&self, id: &str) {
        let mut state = self.state.lock().await;
        if let Some(comment) = state.comment_mut(id) {
            comment.toggle_like();
        }
    }

    async fn open_reply(&self, id: &str) {
        let mut state = self.state.lock().await;
        let Some(quote) = state.comment_mut(id).map(|c| c.reply_quote()) else {
            return;
        };
        state.form.text = quote;
        state.form.focus = Some(if state.is_authorized() {
            Field::Text
        } else {
            Field::Name
        });
    }

    async fn submit(&self) -> Result<(), WidgetError> {
        let (name, text, token) = {
            let mut state = self.state.lock().await;

            if !state.is_authorized() && !state.anonymous_posting {
                state.prompt_login();
                return Ok(());
            }
            if state.is_adding_comment {
                debug!("submit ignored, a comment is already being added");
                return Ok(());
            }

            let name = state.form.name.trim().to_owned();
            let text = state.form.text.trim().to_owned();
            if let Some(message) = validate(state.is_authorized(), &name, &text) {
                state.notice = Some(message.to_owned());
                return Err(WidgetError::Validation(message));
            }

            state.is_adding_comment = true;
            (name, text, state.session.as_ref().map(|s| s.token.clone()))
        };

        let result = if self.connectivity.is_online().await {
            self.client.post_comment(&text, &name, token.as_deref()).await
        } else {
            Err(NetworkFault::Offline.into())
        };

        {
            let mut state = self.state.lock().await;
            state.is_adding_comment = false;
            match &result {
                // a draft typed while the post was in flight stays
                Ok(()) if state.form.text.trim() == text => {
                    state.form.text.clear();
                    state.form.focus = None;
                }
                Ok(()) => {}
                Err(err) if err.is_auth() => {}
                Err(err) => {
                    state.notice = Some(format!("Не удалось добавить комментарий: {err}"));
                }
            }
        }

        match result {
            Ok(()) => {
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                if err.is_auth() {
                    self.drop_session(true).await;
                }
                Err(err)
            }
        }
    }

    async fn login(&self, credentials: Credentials) -> Result<(), WidgetError> {
        let result = if self.connectivity.is_online().await {
            self.client.login(&credentials).await
        } else {
            Err(NetworkFault::Offline.into())
        };

        let session = match result {
            Ok(session) => session,
            Err(err) => {
                let mut state = self.state.lock().await;
                state.login.visible = true;
                state.login.error = Some(err.to_string());
                return Err(err);
            }
        };

        if let Err(err) = session.save(self.storage.as_ref()) {
            warn!(%err, "could not store session");
        }
        info!(name = %session.name, "session started");

        {
            let mut state = self.state.lock().await;
            state.session = Some(session);
            state.login = LoginPrompt::default();
        }
        self.reload_after_change().await;
        Ok(())
    }

    /// Refreshes the list after a write that already succeeded. A failed
    /// reload only leaves its notice behind.
    async fn reload_after_change(&self) {
        if let Err(err) = self.load_comments().await {
            debug!(%err, "reload after change failed");
        }
    }

    async fn drop_session(&self, reprompt: bool) {
        if let Err(err) = Session::clear(self.storage.as_ref()) {
            warn!(%err, "could not clear stored session");
        }

        let mut state = self.state.lock().await;
        state.session = None;
        if reprompt {
            state.prompt_login();
        }
        info!("session dropped");
    }
}
