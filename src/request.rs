use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentRecord>,
}

/// A comment as the service sends it. The older API has a flat `name` and
/// no id or likes; the newer one nests the author and tracks likes.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: Option<RecordId>,
    pub author: Option<AuthorRecord>,
    pub name: Option<String>,
    pub date: String,
    pub text: String,
    pub likes: Option<u32>,
    pub is_liked: Option<bool>,
}

#[derive(Deserialize)]
pub struct AuthorRecord {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Text(id) => f.write_str(id),
            RecordId::Number(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NewComment {
    Anonymous {
        name: String,
        text: String,
        #[serde(rename = "forceError")]
        force_error: bool,
    },
    Authenticated {
        text: String,
    },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub user: UserRecord,
}

#[derive(Deserialize)]
pub struct UserRecord {
    pub token: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shapes() {
        let anonymous = NewComment::Anonymous {
            name: "Глеб".into(),
            text: "Привет".into(),
            force_error: false,
        };
        assert_eq!(
            serde_json::to_value(&anonymous).unwrap(),
            serde_json::json!({ "name": "Глеб", "text": "Привет", "forceError": false })
        );

        let authenticated = NewComment::Authenticated {
            text: "Привет".into(),
        };
        assert_eq!(
            serde_json::to_value(&authenticated).unwrap(),
            serde_json::json!({ "text": "Привет" })
        );
    }

    #[test]
    fn credentials_hide_the_password() {
        let credentials = Credentials {
            login: "gleb".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("gleb"));
        assert!(!debug.contains("hunter2"));
    }
}
