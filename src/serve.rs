use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::{get, get_service, post},
    Form, Router,
};
use miette::IntoDiagnostic;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::{
    app::{Action, App},
    request::Credentials,
    ServerConfig,
};

#[derive(Clone)]
struct WidgetServer {
    app: Arc<App>,
}

impl WidgetServer {
    /// Errors are already turned into a notice on the page.
    async fn run(&self, action: Action) {
        if let Err(err) = self.app.dispatch(action).await {
            debug!(%err, "action failed");
        }
    }
}

#[derive(Deserialize)]
struct Draft {
    name: Option<String>,
    #[serde(default)]
    text: String,
}

async fn index(State(state): State<WidgetServer>) -> impl IntoResponse {
    state.app.page().await
}

async fn add_comment(State(state): State<WidgetServer>, Form(draft): Form<Draft>) -> Redirect {
    state.app.set_draft(draft.name, draft.text).await;
    state.run(Action::Submit).await;
    Redirect::to("/")
}

async fn like(State(state): State<WidgetServer>, Path(id): Path<String>) -> Redirect {
    let target = if id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        format!("/#comment-{id}")
    } else {
        "/".to_owned()
    };
    state.run(Action::Like(id)).await;
    Redirect::to(&target)
}

async fn reply(State(state): State<WidgetServer>, Path(id): Path<String>) -> Redirect {
    state.run(Action::OpenReply(id)).await;
    Redirect::to("/")
}

/// Renders the page with the login form open, leaving the state alone.
async fn show_login(State(state): State<WidgetServer>) -> impl IntoResponse {
    let mut page = state.app.page().await;
    page.login_visible = !page.is_authorized;
    page
}

async fn login(State(state): State<WidgetServer>, Form(credentials): Form<Credentials>) -> Redirect {
    state.run(Action::Login(credentials)).await;
    Redirect::to("/")
}

async fn logout(State(state): State<WidgetServer>) -> Redirect {
    state.run(Action::Logout).await;
    Redirect::to("/")
}

async fn reload(State(state): State<WidgetServer>) -> Redirect {
    state.run(Action::Reload).await;
    Redirect::to("/")
}

fn router(app: Arc<App>) -> Router {
    Router::new()
        .nest_service("/static", get_service(ServeDir::new("static")))
        .route("/", get(index))
        .route("/comments", post(add_comment))
        .route("/like/{id}", post(like))
        .route("/reply/{id}", post(reply))
        .route("/login", get(show_login).post(login))
        .route("/logout", post(logout))
        .route("/reload", post(reload))
        .with_state(WidgetServer { app })
}

pub async fn serve(app: App, config: ServerConfig) -> miette::Result<()> {
    let app = Arc::new(app);

    // the page shows the loading indicator until this finishes
    let initial = app.clone();
    tokio::spawn(async move {
        if let Err(err) = initial.init().await {
            debug!(%err, "initial load failed");
        }
    });

    let listener = TcpListener::bind(&config.addr).await.into_diagnostic()?;
    info!(addr = %config.addr, "serving comment widget");
    axum::serve(listener, router(app).into_make_service())
        .await
        .into_diagnostic()?;
    Ok(())
}
