mod api;
mod app;
mod client;
mod comment;
mod error;
mod render;
mod request;
mod serve;
mod session;
mod validate;

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser};
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{ApiClient, Connectivity, HostLookup},
    app::App,
    session::{FileStorage, MemoryStorage, Storage},
};

#[derive(Parser)]
#[command(author, version, about)]
pub enum Command {
    /// Serve the comment widget on the configured address
    Serve,
    /// List the comments on the board
    List,
    /// Post a new comment
    Post(Post),
    /// Log in and remember the session
    Login {
        /// The login to use, asked for when missing
        login: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Print the comment list as HTML
    Render,
}

#[derive(Args)]
pub struct Post {
    text: String,
    #[arg(short, long)]
    /// Author name for anonymous posting
    name: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    api: ApiConfig,
    widget: WidgetConfig,
    server: ServerConfig,
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    comments_url: String,
    login_url: String,
    /// Asks the service to fail anonymous posts, for trying out error paths.
    force_error: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            comments_url: "https://wedev-api.sky.pro/api/v2/commentkeeper/comments".to_owned(),
            login_url: "https://wedev-api.sky.pro/api/user/login".to_owned(),
            force_error: false,
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WidgetConfig {
    require_login: bool,
    /// Where the session is kept; in memory only when unset.
    session_file: Option<PathBuf>,
    check_connectivity: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            require_login: true,
            session_file: Some(PathBuf::from("session.json")),
            check_connectivity: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

fn build_app(config: &Config) -> miette::Result<App> {
    let client = ApiClient::new(&config.api)?;

    let storage: Box<dyn Storage> = match &config.widget.session_file {
        Some(path) => Box::new(FileStorage::new(path)),
        None => Box::new(MemoryStorage::default()),
    };
    let connectivity: Box<dyn Connectivity> = if config.widget.check_connectivity {
        Box::new(HostLookup::for_url(client.comments_url()))
    } else {
        Box::new(true)
    };

    Ok(App::new(
        client,
        storage,
        connectivity,
        !config.widget.require_login,
    ))
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("commentkeeper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = Command::parse();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file("commentkeeper.toml"))
        .extract()
        .into_diagnostic()?;

    let app = build_app(&config)?;

    match command {
        Command::Serve => serve::serve(app, config.server).await?,
        Command::List => client::list(app).await?,
        Command::Post(post) => client::post(app, post).await?,
        Command::Login { login } => client::login(app, login).await?,
        Command::Logout => client::logout(app).await?,
        Command::Render => client::render(app).await?,
    }

    Ok(())
}
