use crate::config::PromptConfig;
use crate::document::truncate;

/// Header placed between the discussion text and the document text
pub const DOCUMENT_HEADER: &str = "Relevant PDF Content:";

/// Assemble the prompt for a discussion message and optional document text.
///
/// The document is cut to `max_document_chars` first, then the whole prompt
/// to `max_prompt_chars`.
pub fn build_prompt(config: &PromptConfig, message: &str, document: Option<&str>) -> String {
    let mut prompt = String::new();

    let instructions = config.instructions.trim();
    if !instructions.is_empty() {
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
    }

    prompt.push_str(message.trim());

    if let Some(document) = document.map(str::trim).filter(|text| !text.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(DOCUMENT_HEADER);
        prompt.push('\n');
        prompt.push_str(&truncate(document, config.max_document_chars));
    }

    truncate(&prompt, config.max_prompt_chars)
}
