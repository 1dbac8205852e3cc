use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::{
    comment::Comment,
    error::{AuthFailure, ServerFault, WidgetError},
    request::{CommentsResponse, Credentials, LoginResponse, NewComment},
    session::Session,
    ApiConfig,
};

/// Talks to the external comment service. Every call is one-shot: no
/// retries and no timeouts.
pub struct ApiClient {
    http: Client,
    comments_url: Url,
    login_url: Url,
    force_error: bool,
}

impl ApiClient {
    pub fn new(conf: &ApiConfig) -> miette::Result<Self> {
        let comments_url = Url::parse(&conf.comments_url)
            .map_err(|err| miette::miette!("invalid comments_url {:?}: {err}", conf.comments_url))?;
        let login_url = Url::parse(&conf.login_url)
            .map_err(|err| miette::miette!("invalid login_url {:?}: {err}", conf.login_url))?;

        Ok(Self {
            http: Client::new(),
            comments_url,
            login_url,
            force_error: conf.force_error,
        })
    }

    pub fn comments_url(&self) -> &Url {
        &self.comments_url
    }

    pub async fn fetch_comments(&self) -> Result<Vec<Comment>, WidgetError> {
        let resp = self.http.get(self.comments_url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "comment list request failed");
            return Err(WidgetError::Server(ServerFault::from_status(status.as_u16())));
        }

        let data: CommentsResponse = resp.json().await.map_err(|err| {
            warn!(%err, "unreadable comment list");
            WidgetError::Server(ServerFault::Malformed)
        })?;

        debug!(count = data.comments.len(), "fetched comments");
        Ok(data
            .comments
            .into_iter()
            .enumerate()
            .map(|(position, record)| Comment::from_record(record, position))
            .collect())
    }

    /// Posts a comment, as the session's user when a token is given.
    pub async fn post_comment(
        &self,
        text: &str,
        name: &str,
        token: Option<&str>,
    ) -> Result<(), WidgetError> {
        let text = text.to_owned();
        let (payload, request) = match token {
            Some(token) => (
                NewComment::Authenticated { text },
                self.http.post(self.comments_url.clone()).bearer_auth(token),
            ),
            None => (
                NewComment::Anonymous {
                    name: name.to_owned(),
                    text,
                    force_error: self.force_error,
                },
                self.http.post(self.comments_url.clone()),
            ),
        };

        let resp = request.json(&payload).send().await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => {
                warn!("comment rejected, session expired");
                Err(WidgetError::Auth(AuthFailure::SessionExpired))
            }
            status if !status.is_success() => {
                warn!(%status, "comment rejected");
                Err(WidgetError::Server(ServerFault::from_status(status.as_u16())))
            }
            _ => {
                info!("comment posted");
                Ok(())
            }
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, WidgetError> {
        let resp = self
            .http
            .post(self.login_url.clone())
            .json(credentials)
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), login = %credentials.login, "login refused");
            return Err(WidgetError::Auth(AuthFailure::InvalidCredentials));
        }

        let data: LoginResponse = resp
            .json()
            .await
            .map_err(|_| WidgetError::Server(ServerFault::Malformed))?;

        info!(name = %data.user.name, "logged in");
        Ok(Session {
            token: data.user.token,
            name: data.user.name,
        })
    }
}

/// Answers whether the client is online before a network-dependent action.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Considers the client online when the service's host resolves.
pub struct HostLookup {
    host: String,
    port: u16,
}

impl HostLookup {
    pub fn for_url(url: &Url) -> Self {
        Self {
            host: url.host_str().unwrap_or_default().to_owned(),
            port: url.port_or_known_default().unwrap_or(443),
        }
    }
}

#[async_trait]
impl Connectivity for HostLookup {
    async fn is_online(&self) -> bool {
        match tokio::net::lookup_host((self.host.as_str(), self.port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(err) => {
                debug!(host = %self.host, %err, "host lookup failed");
                false
            }
        }
    }
}

/// A fixed answer, for when the connectivity check is switched off.
#[async_trait]
impl Connectivity for bool {
    async fn is_online(&self) -> bool {
        *self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::error::NetworkFault;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            comments_url: format!("{}/comments", server.uri()),
            login_url: format!("{}/user/login", server.uri()),
            force_error: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_normalizes_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "comments": [
                    {
                        "id": "a1",
                        "author": { "name": "Глеб" },
                        "date": "2024-01-05T13:07:00.000Z",
                        "text": "Первый",
                        "likes": 2,
                        "isLiked": false
                    },
                    { "name": "Варвара", "date": "2024-01-05T13:08:00Z", "text": "Второй" }
                ]
            })))
            .mount(&server)
            .await;

        let comments = client_for(&server).fetch_comments().await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "a1");
        assert_eq!(comments[0].likes, 2);
        assert_eq!(comments[1].id, "1");
        assert_eq!(comments[1].author, "Варвара");
        assert_eq!(comments[1].likes, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_a_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_comments().await.unwrap_err();
        assert!(matches!(err, WidgetError::Server(ServerFault::Internal(500))));
    }

    #[tokio::test]
    async fn fetch_garbage_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_comments().await.unwrap_err();
        assert!(matches!(err, WidgetError::Server(ServerFault::Malformed)));
    }

    #[tokio::test]
    async fn authenticated_post_sends_bearer_and_text_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({ "text": "Привет" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "result": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .post_comment("Привет", "ignored", Some("tok"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn anonymous_post_sends_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(
                json!({ "name": "Глеб", "text": "Привет", "forceError": false }),
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .post_comment("Привет", "Глеб", None)
            .await
            .unwrap();
    }

    async fn post_failure(status: u16) -> WidgetError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        client_for(&server)
            .post_comment("Привет", "", Some("tok"))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn post_classifies_statuses() {
        assert!(matches!(
            post_failure(401).await,
            WidgetError::Auth(AuthFailure::SessionExpired)
        ));
        assert!(matches!(
            post_failure(500).await,
            WidgetError::Server(ServerFault::Internal(500))
        ));
        assert!(matches!(
            post_failure(502).await,
            WidgetError::Server(ServerFault::Internal(502))
        ));
        assert!(matches!(
            post_failure(400).await,
            WidgetError::Server(ServerFault::Rejected(400))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let client = ApiClient::new(&ApiConfig {
            comments_url: "http://127.0.0.1:1/comments".into(),
            login_url: "http://127.0.0.1:1/login".into(),
            force_error: false,
        })
        .unwrap();

        let err = client
            .post_comment("Привет", "", Some("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::Network(NetworkFault::Transport(_))));
    }

    #[tokio::test]
    async fn login_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .and(body_json(json!({ "login": "gleb", "password": "secret" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "user": { "_id": "1", "login": "gleb", "name": "Глеб", "token": "tok" }
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .login(&Credentials {
                login: "gleb".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();

        assert_eq!(session.token, "tok");
        assert_eq!(session.name, "Глеб");
    }

    #[tokio::test]
    async fn refused_login_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login(&Credentials {
                login: "gleb".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::Auth(AuthFailure::InvalidCredentials)));
    }

    #[tokio::test]
    async fn fixed_connectivity() {
        assert!(true.is_online().await);
        assert!(!false.is_online().await);
    }
}
