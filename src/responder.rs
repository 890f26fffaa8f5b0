//! One answering run: fetch the latest topic, gather document context,
//! generate a reply and post it.
//!
//! Stages run strictly in order and every failure ends the run, except a
//! document that cannot be downloaded or parsed: the run then continues with
//! the discussion text alone. Nothing is posted unless generation succeeded.

use crate::canvas::{CanvasClient, DiscussionPost, render_reply_html};
use crate::config::{Config, PromptConfig};
use crate::document::{DocumentFetcher, DocumentSource, ExtractedDocument};
use crate::error::Result;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::llm::CompletionClient;
use crate::prompt::build_prompt;
use crate::{log_debug, log_info, log_warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchDiscussion,
    LocatePdf,
    ExtractText,
    BuildPrompt,
    Generate,
    Publish,
    Done,
}

impl Stage {
    /// Short present-tense description for progress output
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FetchDiscussion => "Fetching the latest discussion topic",
            Self::LocatePdf => "Looking for a course PDF",
            Self::ExtractText => "Extracting PDF text",
            Self::BuildPrompt => "Building the prompt",
            Self::Generate => "Generating a reply",
            Self::Publish => "Posting the reply",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchDiscussion => "fetch_discussion",
            Self::LocatePdf => "locate_pdf",
            Self::ExtractText => "extract_text",
            Self::BuildPrompt => "build_prompt",
            Self::Generate => "generate",
            Self::Publish => "publish",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Generate the reply but do not post it
    pub dry_run: bool,
}

/// Outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub course_id: String,
    pub topic_id: u64,
    pub topic_title: Option<String>,
    pub document: Option<DocumentSource>,
    /// Download URL of the PDF whose text went into the prompt
    pub document_url: Option<String>,
    pub prompt: String,
    pub reply: String,
    pub published: bool,
}

pub type StageCallback = Box<dyn Fn(Stage) + Send + Sync>;

pub struct Responder {
    canvas: CanvasClient,
    documents: DocumentFetcher,
    completions: CompletionClient,
    prompt: PromptConfig,
    course_id: String,
    folder_fallback: bool,
    on_stage: Option<StageCallback>,
}

impl Responder {
    /// Validate `config` and wire every client to `transport`
    pub fn new(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;

        let canvas = CanvasClient::new(&config.canvas, Arc::clone(&transport));
        let documents = DocumentFetcher::new(
            Arc::clone(&transport),
            config.canvas.credential(),
            config.canvas.success_status.download.clone(),
            config.prompt.max_document_chars,
        )
        .with_staging_dir(config.http.staging_dir.clone());
        let completions = CompletionClient::new(&config.llm, transport)?;

        Ok(Self {
            canvas,
            documents,
            completions,
            prompt: config.prompt.clone(),
            course_id: config.canvas.course_id.clone(),
            folder_fallback: config.canvas.folder_fallback,
            on_stage: None,
        })
    }

    /// Build a responder that talks to the real services
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::new(config, Arc::new(transport))
    }

    /// Call `callback` as each stage starts
    pub fn on_stage(mut self, callback: StageCallback) -> Self {
        self.on_stage = Some(callback);
        self
    }

    fn notify(&self, stage: Stage) {
        log_debug!("Entering stage {}", stage);
        if let Some(callback) = &self.on_stage {
            callback(stage);
        }
    }

    fn enter(&self, stage: Stage) -> tracing::Span {
        self.notify(stage);
        tracing::info_span!("stage", name = %stage, course = %self.course_id)
    }

    /// Execute one run for the configured course
    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        let course_id = self.course_id.as_str();

        let span = self.enter(Stage::FetchDiscussion);
        let post = self
            .canvas
            .fetch_latest_discussion(course_id)
            .instrument(span)
            .await?;

        let span = self.enter(Stage::LocatePdf);
        let located = self.locate_pdf(&post).instrument(span).await?;

        let document = match located {
            Some((source, url)) => {
                let span = self.enter(Stage::ExtractText);
                self.extract(source, url).instrument(span).await
            }
            None => None,
        };

        let guard = self.enter(Stage::BuildPrompt).entered();
        let prompt = build_prompt(
            &self.prompt,
            &post.plain_message(),
            document.as_ref().map(|doc| doc.text.as_str()),
        );
        drop(guard);
        log_debug!("Prompt is {} characters", prompt.chars().count());

        let span = self.enter(Stage::Generate);
        let reply = self.completions.generate(&prompt).instrument(span).await?;

        let published = if options.dry_run {
            log_info!("Dry run: reply for topic {} not posted", post.id);
            false
        } else {
            let span = self.enter(Stage::Publish);
            let message = if self.prompt.render_markdown {
                render_reply_html(&reply)
            } else {
                reply.clone()
            };
            self.canvas
                .publish_reply(&message, post.id, course_id)
                .instrument(span)
                .await?;
            true
        };

        self.notify(Stage::Done);
        let (document, document_url) = match document {
            Some(doc) => (Some(doc.source), Some(doc.url)),
            None => (None, None),
        };
        Ok(RunReport {
            course_id: course_id.to_string(),
            topic_id: post.id,
            topic_title: post.title,
            document,
            document_url,
            prompt,
            reply,
            published,
        })
    }

    /// Attachment PDF first, then the course files when fallback is enabled
    async fn locate_pdf(&self, post: &DiscussionPost) -> Result<Option<(DocumentSource, String)>> {
        if let Some(url) = CanvasClient::locate_attachment_pdf(post) {
            log_info!("Topic {} has a PDF attachment", post.id);
            return Ok(Some((DocumentSource::Attachment, url.to_string())));
        }

        if !self.folder_fallback {
            log_debug!("No PDF attachment and folder fallback disabled");
            return Ok(None);
        }

        let files = self.canvas.fetch_documents_folder(&self.course_id).await?;
        let found = CanvasClient::locate_folder_pdf(&files)
            .map(|url| (DocumentSource::CourseFolder, url.to_string()));
        if found.is_none() {
            log_info!("No PDF found for topic {}", post.id);
        }
        Ok(found)
    }

    async fn extract(&self, source: DocumentSource, url: String) -> Option<ExtractedDocument> {
        match self.documents.fetch_text(&url).await {
            Ok(text) if text.trim().is_empty() => {
                log_warn!("PDF from {} has no extractable text, continuing without it", source);
                None
            }
            Ok(text) => {
                log_info!("Using {} characters from the {} PDF at {}", text.chars().count(), source, url);
                Some(ExtractedDocument { source, url, text })
            }
            Err(e) => {
                log_warn!("Could not use PDF from {}: {}. Continuing with discussion text only", source, e);
                None
            }
        }
    }
}
