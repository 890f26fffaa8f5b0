use super::types::{CourseFile, DiscussionPost, first_pdf_url, select_latest};
use crate::config::{CanvasConfig, CanvasStatusConfig};
use crate::error::{ResponderError, Result};
use crate::http::{Credential, HttpRequest, HttpTransport};
use crate::{log_debug, log_info};
use serde_json::json;
use std::sync::Arc;

/// Client for the Canvas discussion and file endpoints of one institution.
#[derive(Clone)]
pub struct CanvasClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credential: Credential,
    documents_folder_id: Option<u64>,
    files_per_page: u32,
    status: CanvasStatusConfig,
}

impl CanvasClient {
    pub fn new(config: &CanvasConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential: config.credential(),
            documents_folder_id: config.documents_folder_id,
            files_per_page: config.files_per_page,
            status: config.success_status.clone(),
        }
    }

    fn discussions_url(&self, course_id: &str) -> String {
        format!("{}/courses/{}/discussion_topics", self.base_url, course_id)
    }

    fn files_url(&self, course_id: &str) -> String {
        match self.documents_folder_id {
            Some(folder_id) => format!(
                "{}/folders/{}/files?per_page={}",
                self.base_url, folder_id, self.files_per_page
            ),
            None => format!(
                "{}/courses/{}/files?per_page={}",
                self.base_url, course_id, self.files_per_page
            ),
        }
    }

    fn entries_url(&self, course_id: &str, topic_id: u64) -> String {
        format!(
            "{}/courses/{}/discussion_topics/{}/entries",
            self.base_url, course_id, topic_id
        )
    }

    /// Fetch the most recent discussion topic of a course
    pub async fn fetch_latest_discussion(&self, course_id: &str) -> Result<DiscussionPost> {
        let request = HttpRequest::get(self.discussions_url(course_id)).with_credential(&self.credential);
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status("Fetching discussion topics", &self.status.discussions)?;

        let topics: Vec<DiscussionPost> = response.json("discussion topics")?;
        log_debug!("Course {} has {} discussion topics", course_id, topics.len());

        let latest = select_latest(topics).ok_or_else(|| {
            ResponderError::NotFound(format!("Course {course_id} has no discussion topics"))
        })?;
        log_info!("Latest discussion topic in course {}: {}", course_id, latest.id);
        Ok(latest)
    }

    /// List the files of the course, or of the configured documents folder
    pub async fn fetch_documents_folder(&self, course_id: &str) -> Result<Vec<CourseFile>> {
        let request = HttpRequest::get(self.files_url(course_id)).with_credential(&self.credential);
        let response = self
            .transport
            .send(request)
            .await?
            .ensure_status("Listing course files", &self.status.files)?;

        let files: Vec<CourseFile> = response.json("course files")?;
        log_debug!("Found {} files for course {}", files.len(), course_id);
        Ok(files)
    }

    /// URL of the first PDF attached to the topic
    pub fn locate_attachment_pdf(post: &DiscussionPost) -> Option<&str> {
        first_pdf_url(&post.attachments)
    }

    /// URL of the first PDF in a file listing
    pub fn locate_folder_pdf(files: &[CourseFile]) -> Option<&str> {
        first_pdf_url(files)
    }

    /// Post `message` as a new entry on the topic
    pub async fn publish_reply(&self, message: &str, topic_id: u64, course_id: &str) -> Result<()> {
        let request = HttpRequest::post_json(
            self.entries_url(course_id, topic_id),
            json!({ "message": message }),
        )
        .with_credential(&self.credential);

        self.transport
            .send(request)
            .await?
            .ensure_status("Posting discussion reply", &self.status.publish)?;

        log_info!("Reply posted to topic {} in course {}", topic_id, course_id);
        Ok(())
    }
}
