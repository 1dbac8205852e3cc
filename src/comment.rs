use chrono::{DateTime, Local, TimeZone};
use tracing::warn;

use crate::request::CommentRecord;

const DATE_FORMAT: &str = "%d.%m.%y %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub date: String,
    pub text: String,
    pub likes: u32,
    pub is_liked: bool,
}

impl Comment {
    /// Normalizes a server record. Records without an id (the older,
    /// anonymous API) are identified by their position in the list.
    pub fn from_record(record: CommentRecord, position: usize) -> Self {
        let author = match (record.author, record.name) {
            (Some(author), _) => author.name,
            (None, Some(name)) => name,
            (None, None) => String::new(),
        };

        let is_liked = record.is_liked.unwrap_or(false);
        // a liked comment counts at least its own like
        let likes = record.likes.unwrap_or(0).max(u32::from(is_liked));

        Self {
            id: record
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| position.to_string()),
            author,
            date: format_date(&record.date),
            text: record.text,
            likes,
            is_liked,
        }
    }

    pub fn toggle_like(&mut self) {
        self.is_liked = !self.is_liked;
        if self.is_liked {
            self.likes += 1;
        } else {
            self.likes -= 1;
        }
    }

    pub fn reply_quote(&self) -> String {
        format!("> {} писал(а): {}\n\n", self.author, self.text)
    }
}

pub fn format_date(iso: &str) -> String {
    format_date_in(iso, &Local)
}

pub fn format_date_in<Tz: TimeZone>(iso: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(iso) {
        Ok(date) => date.with_timezone(tz).format(DATE_FORMAT).to_string(),
        Err(err) => {
            warn!(%iso, %err, "unparseable comment date");
            iso.to_owned()
        }
    }
}
