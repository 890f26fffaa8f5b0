use crate::config::Config;
use crate::document::DocumentSource;
use crate::responder::{Responder, RunOptions, RunReport};
use crate::{log_debug, log_error, ui};
use anyhow::Context;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, crate_version};
use std::path::PathBuf;

const LOG_FILE: &str = "canvas-responder.log";
/// `--log-file` value that sends log lines to stdout instead
const STDOUT_LOG: &str = "-";

/// Answer the latest discussion topic of a Canvas course
#[derive(Parser, Debug)]
#[command(
    author,
    version = crate_version!(),
    about = "Canvas Responder: answers the latest course discussion with an LLM",
    long_about = "Fetches the most recent discussion topic of a Canvas course, adds the text of an attached or course-hosted PDF, asks an LLM for a reply and posts it back to the thread.",
    disable_version_flag = true,
    styles = get_styles(),
)]
pub struct Cli {
    /// Course to answer in, overriding configuration and environment
    #[arg(long = "course", value_name = "ID", help = "Course id to answer in")]
    pub course: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long = "config", value_name = "PATH", help = "Path to a configuration file")]
    pub config: Option<PathBuf>,

    /// Generate the reply but do not post it
    #[arg(long = "dry-run", help = "Generate the reply without posting it")]
    pub dry_run: bool,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", help = "Log debug messages to a file")]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(long = "log-file", help = "Specify a custom log file path (- for stdout)")]
    pub log_file: Option<String>,

    /// Suppress non-essential output
    #[arg(short = 'q', long = "quiet", help = "Suppress non-essential output")]
    pub quiet: bool,

    /// Display the version
    #[arg(short = 'v', long = "version", help = "Display the version")]
    pub version: bool,
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Parse arguments and run the pipeline once
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if cli.log {
        crate::logger::enable_logging();
        match cli.log_file.as_deref() {
            Some(STDOUT_LOG) => crate::logger::set_log_to_stdout(true),
            log_file => {
                let log_file = log_file.unwrap_or(LOG_FILE);
                crate::logger::set_log_file(log_file)
                    .with_context(|| format!("Failed to open log file {log_file}"))?;
            }
        }
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    let result = run(&cli).await;
    if let Err(e) = &result {
        log_error!("Run failed: {:#}", e);
    }
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(course) = &cli.course {
        config.set_course(course);
    }

    let spinner = ui::create_spinner("Starting");
    let progress = spinner.clone();
    let responder = Responder::from_config(&config)?.on_stage(Box::new(move |stage| {
        log_debug!("Stage: {}", stage);
        progress.set_message(format!("{}...", stage.description()));
    }));

    let outcome = responder
        .run(RunOptions {
            dry_run: cli.dry_run,
        })
        .await;
    spinner.finish_and_clear();

    let report = outcome.with_context(|| {
        format!(
            "Failed to answer the latest discussion in course {}",
            config.canvas.course_id
        )
    })?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    let title = report.topic_title.as_deref().unwrap_or("(untitled)");
    ui::print_info(&format!("Topic {}: {}", report.topic_id, title));

    match (report.document, report.document_url.as_deref()) {
        (Some(DocumentSource::Attachment), Some(url)) => {
            ui::print_info(&format!("Context: PDF attached to the topic ({url})"));
        }
        (Some(DocumentSource::CourseFolder), Some(url)) => {
            ui::print_info(&format!("Context: PDF from the course files ({url})"));
        }
        _ => ui::print_warning("Context: discussion text only"),
    }

    ui::print_bordered_content(&report.reply);

    if report.published {
        ui::print_success("Reply posted to the discussion.");
    } else {
        ui::print_warning("Dry run: reply not posted.");
    }
}
