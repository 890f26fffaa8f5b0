use crate::error::{ResponderError, Result};
use crate::http::Credential;
use crate::log_debug;
use crate::providers::{Provider, ProviderError};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable holding the Canvas access token
pub const CANVAS_TOKEN_ENV: &str = "CANVAS_API_KEY";
/// Environment variable holding the course to answer in
pub const CANVAS_COURSE_ENV: &str = "CANVAS_COURSE_ID";
pub const CANVAS_BASE_URL_ENV: &str = "CANVAS_BASE_URL";
pub const LLM_PROVIDER_ENV: &str = "LLM_PROVIDER";
pub const LLM_ENDPOINT_ENV: &str = "LLM_ENDPOINT";
pub const LLM_MODEL_ENV: &str = "LLM_MODEL";
/// Provider-agnostic fallback for the completion API key
pub const LLM_API_KEY_ENV: &str = "LLM_API_KEY";

/// Configuration structure for the responder
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Canvas LMS connection settings
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct CanvasConfig {
    /// API root, e.g. `https://school.instructure.com/api/v1`
    pub base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    pub course_id: String,
    /// Folder searched for a PDF when the topic has none attached.
    /// Unset means the whole course file list.
    pub documents_folder_id: Option<u64>,
    pub folder_fallback: bool,
    pub files_per_page: u32,
    pub success_status: CanvasStatusConfig,
}

/// Accepted HTTP statuses per Canvas endpoint
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct CanvasStatusConfig {
    pub discussions: Vec<u16>,
    pub files: Vec<u16>,
    pub download: Vec<u16>,
    pub publish: Vec<u16>,
}

/// Completion provider settings
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Full chat-completions URL; falls back to the provider default
    pub endpoint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub model: Option<String>,
    /// Substring of an error body that marks a content-policy rejection
    pub policy_marker: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub success_status: Vec<u16>,
}

/// Prompt assembly limits
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct PromptConfig {
    pub max_prompt_chars: usize,
    pub max_document_chars: usize,
    /// Prepended to every prompt when non-empty
    pub instructions: String,
    /// Convert the Markdown reply to HTML before posting
    pub render_markdown: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    /// Where downloaded PDFs are staged; the system temp dir when unset
    pub staging_dir: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_url: "https://canvas.instructure.com/api/v1".to_string(),
            access_token: String::new(),
            course_id: String::new(),
            documents_folder_id: None,
            folder_fallback: true,
            files_per_page: 100,
            success_status: CanvasStatusConfig::default(),
        }
    }
}

impl Default for CanvasStatusConfig {
    fn default() -> Self {
        Self {
            discussions: vec![200],
            files: vec![200],
            download: vec![200],
            publish: vec![200, 201],
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            endpoint: String::new(),
            api_key: String::new(),
            model: None,
            policy_marker: "ResponsibleAIPolicyViolation".to_string(),
            temperature: None,
            max_tokens: None,
            success_status: vec![200],
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 3000,
            max_document_chars: 2000,
            instructions: String::new(),
            render_markdown: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            staging_dir: None,
        }
    }
}

impl Config {
    /// Load the configuration file (if any) and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    log_debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        log_debug!("Configuration loaded: {:?}", config.redacted());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ResponderError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ResponderError::Config(msg) => {
                ResponderError::Config(format!("{} in {}", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ResponderError::Config(format!("Invalid configuration format: {e}")))
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let mut path = config_dir().ok_or_else(|| {
            ResponderError::Config("Unable to determine config directory".to_string())
        })?;
        path.push("canvas-responder");
        path.push("config.toml");
        Ok(path)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = get(CANVAS_TOKEN_ENV) {
            self.canvas.access_token = token;
        }
        if let Some(course) = get(CANVAS_COURSE_ENV) {
            self.canvas.course_id = course.trim().to_string();
        }
        if let Some(base_url) = get(CANVAS_BASE_URL_ENV) {
            self.canvas.base_url = base_url;
        }

        // Provider first: it decides which key variable applies
        if let Some(provider) = get(LLM_PROVIDER_ENV) {
            self.llm.provider = provider
                .parse()
                .map_err(|e: ProviderError| ResponderError::Config(e.to_string()))?;
        }
        if let Some(key) = get(self.llm.provider.api_key_env()).or_else(|| get(LLM_API_KEY_ENV)) {
            self.llm.api_key = key;
        }
        if let Some(endpoint) = get(LLM_ENDPOINT_ENV) {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = get(LLM_MODEL_ENV) {
            self.llm.model = Some(model);
        }

        Ok(())
    }

    /// Override the course, typically from the command line
    pub fn set_course(&mut self, course_id: &str) {
        self.canvas.course_id = course_id.trim().to_string();
    }

    /// Check that everything a run needs is present
    pub fn validate(&self) -> Result<()> {
        parse_http_url("canvas.base_url", &self.canvas.base_url)?;

        if self.canvas.access_token.is_empty() {
            return Err(ResponderError::Config(format!(
                "Canvas access token missing: set {CANVAS_TOKEN_ENV} or canvas.access_token"
            )));
        }
        if self.canvas.course_id.is_empty() {
            return Err(ResponderError::Config(format!(
                "Course id missing: set {CANVAS_COURSE_ENV}, canvas.course_id, or pass --course"
            )));
        }
        if self.llm.api_key.is_empty() {
            return Err(ResponderError::Config(format!(
                "API key required for provider {}: set {}",
                self.llm.provider,
                self.llm.provider.api_key_env()
            )));
        }

        let endpoint = self.llm.effective_endpoint().ok_or_else(|| {
            ResponderError::Config(format!(
                "Completion endpoint required for provider {}: set {LLM_ENDPOINT_ENV} or llm.endpoint",
                self.llm.provider
            ))
        })?;
        parse_http_url("llm.endpoint", endpoint)?;

        if self.prompt.max_prompt_chars == 0 {
            return Err(ResponderError::Config(
                "prompt.max_prompt_chars must be greater than zero".to_string(),
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ResponderError::Config(
                "http.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        let status_lists = [
            ("canvas.success_status.discussions", &self.canvas.success_status.discussions),
            ("canvas.success_status.files", &self.canvas.success_status.files),
            ("canvas.success_status.download", &self.canvas.success_status.download),
            ("canvas.success_status.publish", &self.canvas.success_status.publish),
            ("llm.success_status", &self.llm.success_status),
        ];
        if let Some((name, _)) = status_lists.iter().find(|(_, list)| list.is_empty()) {
            return Err(ResponderError::Config(format!(
                "{name} must list at least one status"
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Copy with secrets blanked, for logging
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.canvas.access_token.is_empty() {
            copy.canvas.access_token = "***".to_string();
        }
        if !copy.llm.api_key.is_empty() {
            copy.llm.api_key = "***".to_string();
        }
        copy
    }
}

impl CanvasConfig {
    pub fn credential(&self) -> Credential {
        Credential::Bearer(self.access_token.clone())
    }
}

impl LlmConfig {
    /// Configured endpoint, or the provider default
    pub fn effective_endpoint(&self) -> Option<&str> {
        if self.endpoint.is_empty() {
            self.provider.default_endpoint()
        } else {
            Some(&self.endpoint)
        }
    }

    pub fn effective_model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or_else(|| self.provider.default_model())
    }

    pub fn credential(&self) -> Credential {
        self.provider.credential(&self.api_key)
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| ResponderError::Config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ResponderError::Config(format!(
            "{field} must use http or https, got {scheme}"
        ))),
    }
}
