use askama::Template;
use askama_web::WebTemplate;

use crate::{
    app::{Field, WidgetState},
    comment::Comment,
};

/// Neutralizes the five markup-significant characters.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// A comment with every user-supplied field already escaped. Templates print
/// these fields with `|safe`.
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub date: String,
    pub text: String,
    pub likes: u32,
    pub is_liked: bool,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: escape_html(&comment.id),
            author: escape_html(&comment.author),
            date: escape_html(&comment.date),
            text: escape_html(&comment.text),
            likes: comment.likes,
            is_liked: comment.is_liked,
        }
    }
}

#[derive(Template)]
#[template(path = "comments.html")]
pub struct CommentList {
    pub comments: Vec<CommentView>,
}

impl CommentList {
    pub fn new(comments: &[Comment]) -> Self {
        Self {
            comments: comments.iter().map(CommentView::from).collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "widget.html")]
pub struct WidgetPage {
    pub comments: Vec<CommentView>,
    pub is_loading: bool,
    pub notice: Option<String>,
    pub is_authorized: bool,
    pub can_post: bool,
    pub is_adding_comment: bool,
    pub name: String,
    pub text: String,
    pub focus: &'static str,
    pub login_visible: bool,
    pub login_error: Option<String>,
}

impl WidgetPage {
    /// Renders a snapshot of the controller state. The notice is shown once,
    /// so the caller takes it out of the state before rendering.
    pub fn new(state: &WidgetState, notice: Option<String>) -> Self {
        let name = match &state.session {
            Some(session) => session.name.as_str(),
            None => state.form.name.as_str(),
        };

        Self {
            comments: state.comments.iter().map(CommentView::from).collect(),
            is_loading: state.is_loading,
            notice,
            is_authorized: state.is_authorized(),
            can_post: state.is_authorized() || state.anonymous_posting,
            is_adding_comment: state.is_adding_comment,
            name: escape_html(name),
            text: escape_html(&state.form.text),
            focus: match state.form.focus {
                Some(Field::Name) => "name",
                Some(Field::Text) => "text",
                None => "",
            },
            login_visible: state.login.visible,
            login_error: state.login.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn comment(id: &str, author: &str, text: &str, likes: u32, is_liked: bool) -> Comment {
        Comment {
            id: id.into(),
            author: author.into(),
            date: "05.01.24 13:07".into(),
            text: text.into(),
            likes,
            is_liked,
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"x"</b>"#),
            "&lt;b&gt;&quot;x&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("Tom & 'Jerry'"), "Tom &amp; &#039;Jerry&#039;");
        assert_eq!(escape_html("Привет"), "Привет");
    }

    #[test]
    fn list_escapes_user_content() {
        let html = CommentList::new(&[comment("1", "<i>eve</i>", r#"<b>"x"</b>"#, 0, false)])
            .render()
            .unwrap();

        assert!(html.contains("&lt;b&gt;&quot;x&quot;&lt;/b&gt;"));
        assert!(html.contains("&lt;i&gt;eve&lt;/i&gt;"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("<i>eve"));
    }

    #[test]
    fn list_marks_liked_comments() {
        let html = CommentList::new(&[
            comment("a1", "Глеб", "liked", 5, true),
            comment("b2", "Варвара", "not liked", 1, false),
        ])
        .render()
        .unwrap();

        assert!(html.contains(r#"action="/like/a1""#));
        assert!(html.contains(r#"action="/reply/b2""#));
        assert!(html.contains(r#"<span class="likes-counter">5</span>"#));
        assert_eq!(html.matches("-active-like").count(), 1);
        assert!(html.contains("05.01.24 13:07"));
    }

    #[test]
    fn anonymous_page_offers_login() {
        let state = WidgetState::default();
        let html = WidgetPage::new(&state, Some("Ошибка загрузки".into()))
            .render()
            .unwrap();

        assert!(html.contains("Ошибка загрузки"));
        assert!(html.contains("авторизуйтесь"));
        assert!(!html.contains(r#"class="add-form""#));
    }

    #[test]
    fn authorized_page_prefills_name_and_disables_while_adding() {
        let mut state = WidgetState {
            session: Some(Session {
                token: "tok".into(),
                name: "Глеб".into(),
            }),
            ..WidgetState::default()
        };
        state.form.text = "<script>".into();
        state.is_adding_comment = true;

        let html = WidgetPage::new(&state, None).render().unwrap();

        assert!(html.contains(r#"value="Глеб""#));
        assert!(html.contains("readonly"));
        assert!(html.contains("Добавление..."));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn loading_indicator_follows_state() {
        let state = WidgetState {
            is_loading: true,
            ..WidgetState::default()
        };
        let html = WidgetPage::new(&state, None).render().unwrap();
        assert!(html.contains("initial-loading"));

        let html = WidgetPage::new(&WidgetState::default(), None)
            .render()
            .unwrap();
        assert!(!html.contains("initial-loading"));
    }
}
