//! Canvas LMS access: discussion topics, course files and reply publishing.

mod client;
pub mod reply;
pub mod types;

pub use client::CanvasClient;
pub use reply::render_reply_html;
pub use types::{Attachment, CourseFile, DiscussionPost, FileRef};
