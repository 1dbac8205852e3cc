use miette::Diagnostic;
use thiserror::Error;

/// Everything that can go wrong while talking to the comment service or
/// preparing a comment for it.
#[derive(Debug, Error, Diagnostic)]
pub enum WidgetError {
    #[error("{0}")]
    #[diagnostic(code(commentkeeper::server))]
    Server(ServerFault),

    #[error("{0}")]
    #[diagnostic(code(commentkeeper::auth), help("log in again with `commentkeeper login`"))]
    Auth(AuthFailure),

    #[error("{0}")]
    #[diagnostic(code(commentkeeper::network))]
    Network(NetworkFault),

    #[error("{0}")]
    #[diagnostic(code(commentkeeper::validation))]
    Validation(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServerFault {
    /// The service answered with a 5xx status.
    #[error("Сервер сломался, попробуйте позже")]
    Internal(u16),
    #[error("Ошибка сервера ({0})")]
    Rejected(u16),
    /// A success status with a body we could not read.
    #[error("Сервер вернул некорректный ответ")]
    Malformed,
}

impl ServerFault {
    pub fn from_status(status: u16) -> Self {
        if (500..600).contains(&status) {
            ServerFault::Internal(status)
        } else {
            ServerFault::Rejected(status)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Неверный логин или пароль")]
    InvalidCredentials,
    #[error("Сессия истекла, авторизуйтесь заново")]
    SessionExpired,
}

#[derive(Debug, Error)]
pub enum NetworkFault {
    #[error("Нет подключения к интернету")]
    Offline,
    #[error("Кажется, у вас сломался интернет, попробуйте позже")]
    Transport(#[source] reqwest::Error),
}

impl WidgetError {
    pub fn is_auth(&self) -> bool {
        matches!(self, WidgetError::Auth(_))
    }
}

impl From<NetworkFault> for WidgetError {
    fn from(value: NetworkFault) -> Self {
        WidgetError::Network(value)
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(value: reqwest::Error) -> Self {
        WidgetError::Network(NetworkFault::Transport(value))
    }
}
