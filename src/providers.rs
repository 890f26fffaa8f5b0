//! LLM provider catalog.
//!
//! Single source of truth for supported completion providers and how each
//! one is reached and authenticated.

use crate::http::Credential;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Azure OpenAI deployment (`api-key` header, deployment-specific URL)
    #[default]
    Azure,
    /// `OpenAI` or any OpenAI-compatible chat completions API (bearer token)
    OpenAI,
}

impl Provider {
    /// All available providers
    pub const ALL: &'static [Provider] = &[Provider::Azure, Provider::OpenAI];

    /// Provider name as used in config files and the environment
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::OpenAI => "openai",
        }
    }

    /// Completion endpoint used when none is configured.
    ///
    /// Azure endpoints embed the resource and deployment name, so there is no
    /// sensible default.
    pub const fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::Azure => None,
            Self::OpenAI => Some("https://api.openai.com/v1/chat/completions"),
        }
    }

    /// Model sent in the request body when none is configured.
    ///
    /// Azure selects the model through the deployment in the URL.
    pub const fn default_model(&self) -> Option<&'static str> {
        match self {
            Self::Azure => None,
            Self::OpenAI => Some("gpt-4o-mini"),
        }
    }

    /// Environment variable name for the API key
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::Azure => "AZURE_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Wrap an API key in the header style this provider expects
    pub fn credential(&self, api_key: &str) -> Credential {
        match self {
            Self::Azure => Credential::header("api-key", api_key),
            Self::OpenAI => Credential::Bearer(api_key.to_string()),
        }
    }

    /// Get all provider names as strings
    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::name).collect()
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let normalized = match lower.as_str() {
            "azure-openai" | "azure_openai" | "azureopenai" => "azure",
            other => other,
        };

        Self::ALL
            .iter()
            .find(|p| p.name() == normalized)
            .copied()
            .ok_or_else(|| ProviderError::Unknown {
                name: s.to_string(),
                supported: Self::all_names().join(", "),
            })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider configuration error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown provider: {name}. Supported: {supported}")]
    Unknown { name: String, supported: String },
}
