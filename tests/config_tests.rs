use canvas_responder::config::{
    CANVAS_COURSE_ENV, CANVAS_TOKEN_ENV, Config, LLM_API_KEY_ENV, LLM_ENDPOINT_ENV,
    LLM_MODEL_ENV, LLM_PROVIDER_ENV,
};
use canvas_responder::error::ResponderError;
use canvas_responder::http::Credential;
use canvas_responder::providers::Provider;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

mod test_utils;
use test_utils::{CANVAS_TOKEN, COURSE_ID, LLM_ENDPOINT, LLM_KEY, test_config};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn assert_config_error(config: &Config, needle: &str) {
    match config.validate() {
        Err(ResponderError::Config(message)) => {
            assert!(message.contains(needle), "{message:?} should mention {needle:?}");
        }
        other => panic!("expected config error mentioning {needle:?}, got {other:?}"),
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.canvas.base_url, "https://canvas.instructure.com/api/v1");
    assert!(config.canvas.folder_fallback);
    assert_eq!(config.canvas.files_per_page, 100);
    assert_eq!(config.canvas.success_status.discussions, vec![200]);
    assert_eq!(config.canvas.success_status.publish, vec![200, 201]);
    assert_eq!(config.llm.provider, Provider::Azure);
    assert_eq!(config.llm.policy_marker, "ResponsibleAIPolicyViolation");
    assert_eq!(config.llm.success_status, vec![200]);
    assert_eq!(config.prompt.max_prompt_chars, 3000);
    assert_eq!(config.prompt.max_document_chars, 2000);
    assert!(config.prompt.render_markdown);
    assert_eq!(config.request_timeout(), Duration::from_secs(60));
}

#[test]
fn test_toml_sections_override_defaults() {
    let config = Config::from_toml_str(
        r#"
[canvas]
base_url = "https://school.instructure.com/api/v1"
course_id = "1234"
documents_folder_id = 77
folder_fallback = false

[canvas.success_status]
publish = [201]

[llm]
provider = "openai"
model = "gpt-4o"
temperature = 0.2

[prompt]
max_prompt_chars = 1500
instructions = "Answer briefly."
render_markdown = false

[http]
timeout_seconds = 15
"#,
    )
    .expect("config should parse");

    assert_eq!(config.canvas.base_url, "https://school.instructure.com/api/v1");
    assert_eq!(config.canvas.course_id, "1234");
    assert_eq!(config.canvas.documents_folder_id, Some(77));
    assert!(!config.canvas.folder_fallback);
    assert_eq!(config.canvas.success_status.publish, vec![201]);
    assert_eq!(config.canvas.success_status.download, vec![200]);
    assert_eq!(config.llm.provider, Provider::OpenAI);
    assert_eq!(config.llm.effective_model(), Some("gpt-4o"));
    assert_eq!(config.llm.temperature, Some(0.2));
    assert_eq!(config.prompt.max_prompt_chars, 1500);
    assert_eq!(config.prompt.max_document_chars, 2000);
    assert_eq!(config.prompt.instructions, "Answer briefly.");
    assert!(!config.prompt.render_markdown);
    assert_eq!(config.request_timeout(), Duration::from_secs(15));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = Config::from_toml_str("[canvas\nbase_url = ");
    assert!(matches!(result, Err(ResponderError::Config(_))));

    let result = Config::from_toml_str("[llm]\nprovider = \"carrier-pigeon\"\n");
    assert!(matches!(result, Err(ResponderError::Config(_))));
}

#[test]
fn test_load_reads_explicit_path() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[canvas]\ncourse_id = \"9001\"\nfiles_per_page = 10\n").expect("write config");

    let config = Config::from_file(&path).expect("file should load");

    assert_eq!(config.canvas.course_id, "9001");
    assert_eq!(config.canvas.files_per_page, 10);
}

#[test]
fn test_load_missing_explicit_path_fails() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("nope.toml");

    let err = Config::from_file(&missing).expect_err("missing file should fail");
    match err {
        ResponderError::Config(message) => assert!(message.contains("nope.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_environment_overrides() {
    let mut config = Config::default();
    config
        .apply_overrides_from(lookup(&[
            (CANVAS_TOKEN_ENV, CANVAS_TOKEN),
            (CANVAS_COURSE_ENV, " 42 "),
            ("AZURE_API_KEY", LLM_KEY),
            (LLM_ENDPOINT_ENV, LLM_ENDPOINT),
            (LLM_MODEL_ENV, "gpt-35-turbo"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.canvas.access_token, CANVAS_TOKEN);
    assert_eq!(config.canvas.course_id, COURSE_ID);
    assert_eq!(config.llm.api_key, LLM_KEY);
    assert_eq!(config.llm.endpoint, LLM_ENDPOINT);
    assert_eq!(config.llm.model.as_deref(), Some("gpt-35-turbo"));
    config.validate().expect("overridden config should validate");
}

#[test]
fn test_empty_environment_values_are_ignored() {
    let mut config = test_config();
    config
        .apply_overrides_from(lookup(&[(CANVAS_TOKEN_ENV, ""), (CANVAS_COURSE_ENV, "   ")]))
        .expect("overrides should apply");

    assert_eq!(config.canvas.access_token, CANVAS_TOKEN);
    assert_eq!(config.canvas.course_id, COURSE_ID);
}

#[test]
fn test_provider_override_selects_key_variable() {
    let mut config = Config::default();
    config
        .apply_overrides_from(lookup(&[
            (LLM_PROVIDER_ENV, "openai"),
            ("AZURE_API_KEY", "azure-key"),
            ("OPENAI_API_KEY", "openai-key"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.llm.provider, Provider::OpenAI);
    assert_eq!(config.llm.api_key, "openai-key");
    assert_eq!(
        config.llm.effective_endpoint(),
        Some("https://api.openai.com/v1/chat/completions")
    );
    assert_eq!(
        config.llm.credential(),
        Credential::Bearer("openai-key".to_string())
    );
}

#[test]
fn test_generic_key_is_fallback() {
    let mut config = Config::default();
    config
        .apply_overrides_from(lookup(&[(LLM_API_KEY_ENV, "generic")]))
        .expect("overrides should apply");
    assert_eq!(config.llm.api_key, "generic");

    config
        .apply_overrides_from(lookup(&[(LLM_API_KEY_ENV, "generic"), ("AZURE_API_KEY", "specific")]))
        .expect("overrides should apply");
    assert_eq!(config.llm.api_key, "specific");
}

#[test]
fn test_unknown_provider_override_is_config_error() {
    let mut config = Config::default();
    let result = config.apply_overrides_from(lookup(&[(LLM_PROVIDER_ENV, "carrier-pigeon")]));

    match result {
        Err(ResponderError::Config(message)) => assert!(message.contains("carrier-pigeon")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_set_course_overrides_configured_course() {
    let mut config = test_config();
    config.set_course(" 77 ");
    assert_eq!(config.canvas.course_id, "77");
}

#[test]
fn test_validate_accepts_complete_config() {
    test_config().validate().expect("test config should be valid");
}

#[test]
fn test_validate_reports_missing_settings() {
    let mut config = test_config();
    config.canvas.access_token.clear();
    assert_config_error(&config, CANVAS_TOKEN_ENV);

    let mut config = test_config();
    config.canvas.course_id.clear();
    assert_config_error(&config, CANVAS_COURSE_ENV);

    let mut config = test_config();
    config.llm.api_key.clear();
    assert_config_error(&config, "AZURE_API_KEY");

    let mut config = test_config();
    config.llm.endpoint.clear();
    assert_config_error(&config, LLM_ENDPOINT_ENV);
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = test_config();
    config.canvas.base_url = "not a url".to_string();
    assert_config_error(&config, "canvas.base_url");

    let mut config = test_config();
    config.llm.endpoint = "ftp://llm.test/chat".to_string();
    assert_config_error(&config, "http or https");

    let mut config = test_config();
    config.prompt.max_prompt_chars = 0;
    assert_config_error(&config, "max_prompt_chars");

    let mut config = test_config();
    config.http.timeout_seconds = 0;
    assert_config_error(&config, "http.timeout_seconds");

    let mut config = test_config();
    config.canvas.success_status.publish.clear();
    assert_config_error(&config, "canvas.success_status.publish");
}

#[test]
fn test_redacted_hides_secrets() {
    let redacted = test_config().redacted();
    assert_eq!(redacted.canvas.access_token, "***");
    assert_eq!(redacted.llm.api_key, "***");

    let rendered = format!("{redacted:?}");
    assert!(!rendered.contains(CANVAS_TOKEN));
    assert!(!rendered.contains(LLM_KEY));
}
