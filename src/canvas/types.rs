use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static BREAK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</li\s*>|</h[1-6]\s*>").expect("break pattern is valid")
});
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank line pattern is valid"));

/// A discussion topic as returned by `GET /courses/:id/discussion_topics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    /// Topic body, HTML as stored by Canvas
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
}

/// A file reference embedded in a discussion topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "content-type", alias = "content_type")]
    pub content_type: String,
    pub url: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A file record from a course or folder listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFile {
    #[serde(rename = "content-type", alias = "content_type")]
    pub content_type: String,
    pub url: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Anything with a declared content type and a download URL
pub trait FileRef {
    fn content_type(&self) -> &str;
    fn url(&self) -> &str;

    /// Whether the declared type is `application/pdf`, ignoring case and parameters
    fn is_pdf(&self) -> bool {
        self.content_type()
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
    }
}

impl FileRef for Attachment {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl FileRef for CourseFile {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// URL of the first PDF in `files`, in order
pub fn first_pdf_url<F: FileRef>(files: &[F]) -> Option<&str> {
    files.iter().find(|file| file.is_pdf()).map(FileRef::url)
}

impl DiscussionPost {
    /// The message with markup removed, suitable for a prompt
    pub fn plain_message(&self) -> String {
        html_to_text(&self.message)
    }
}

/// Pick the newest topic.
///
/// When every topic carries `posted_at` the latest timestamp wins, with list
/// order breaking ties. Otherwise the API's own order is trusted and the first
/// topic wins.
pub fn select_latest(topics: Vec<DiscussionPost>) -> Option<DiscussionPost> {
    let all_dated = topics.iter().all(|topic| topic.posted_at.is_some());
    if !all_dated {
        return topics.into_iter().next();
    }

    let mut latest: Option<DiscussionPost> = None;
    for topic in topics {
        // Strictly newer only, so the earlier entry keeps a tie
        let newer = latest
            .as_ref()
            .is_none_or(|current| topic.posted_at > current.posted_at);
        if newer {
            latest = Some(topic);
        }
    }
    latest
}

/// Strip HTML tags and decode the handful of entities Canvas emits
pub fn html_to_text(html: &str) -> String {
    let with_breaks = BREAK_PATTERN.replace_all(html, "\n");
    let without_tags = TAG_PATTERN.replace_all(&with_breaks, "");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&amp;", "&");
    BLANK_LINES
        .replace_all(&decoded, "\n\n")
        .trim()
        .to_string()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
