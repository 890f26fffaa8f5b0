//! Canvas Responder - answers Canvas discussion topics with an LLM
//!
//! Fetches the latest discussion topic of a course, gathers text from an
//! attached or course-hosted PDF, asks a chat-completion provider for a reply
//! and posts it back to the thread.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough

pub mod canvas;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod llm;
pub mod logger;
pub mod prompt;
pub mod providers;
pub mod responder;
pub mod ui;

pub use config::Config;
pub use error::{ResponderError, Result};
pub use providers::Provider;
pub use responder::{Responder, RunOptions, RunReport, Stage};
