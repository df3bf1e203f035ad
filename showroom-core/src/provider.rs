//! LLM provider selection and the OpenAI-compatible chat completions client.
//!
//! All three supported providers speak the OpenAI chat completions protocol:
//! `openai` directly, `gemini` through Google's OpenAI-compatible endpoint and
//! `local` through any self-hosted server (vLLM, Ollama, LM Studio).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::contract::{LlmProvider, StructuredRequest};
use crate::error::{ProviderConfigError, ProviderError};

pub const PROVIDER_ENV: &str = "LLM_PROVIDER";
pub const TEMPERATURE_ENV: &str = "LLM_TEMPERATURE";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    Local,
    OpenAi,
    #[default]
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err(ProviderConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Resolved endpoint, credentials and model for one provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// HTTP request timeout; `None` leaves reqwest's default.
    pub request_timeout: Option<Duration>,
}

// Keeps the API key out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve from the process environment.
    ///
    /// `provider` and `model` override `LLM_PROVIDER` and the per-provider
    /// model variable.
    pub fn from_env(provider: Option<&str>, model: Option<&str>) -> Result<Self, ProviderConfigError> {
        Self::resolve_with(provider, model, env_lookup)
    }

    /// Resolve using `lookup` for every variable, so callers and tests can
    /// supply their own environment.
    pub fn resolve_with<F>(
        provider: Option<&str>,
        model: Option<&str>,
        lookup: F,
    ) -> Result<Self, ProviderConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind: ProviderKind = match provider.map(str::to_string).or_else(|| lookup(PROVIDER_ENV)) {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };
        let model = model.map(str::to_string);

        let config = match kind {
            ProviderKind::Local => {
                let api_key = lookup("LOCAL_OPENAI_API_KEY");
                let base_url = lookup("LOCAL_OPENAI_BASE_URL");
                let model = model.or_else(|| lookup("LOCAL_OPENAI_MODEL"));
                match (api_key, base_url, model) {
                    (Some(api_key), Some(base_url), Some(model)) => ProviderConfig {
                        kind,
                        api_key,
                        base_url,
                        model,
                        request_timeout: None,
                    },
                    _ => {
                        return Err(ProviderConfigError::MissingVariables {
                            provider: "local",
                            variables: "LOCAL_OPENAI_API_KEY, LOCAL_OPENAI_BASE_URL, and LOCAL_OPENAI_MODEL"
                                .to_string(),
                        })
                    }
                }
            }
            ProviderKind::OpenAi => ProviderConfig {
                kind,
                api_key: lookup("OPENAI_API_KEY").ok_or(ProviderConfigError::MissingVariables {
                    provider: "openai",
                    variables: "OPENAI_API_KEY".to_string(),
                })?,
                base_url: OPENAI_BASE_URL.to_string(),
                model: model
                    .or_else(|| lookup("OPENAI_MODEL"))
                    .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
                request_timeout: None,
            },
            ProviderKind::Gemini => ProviderConfig {
                kind,
                api_key: lookup("GEMINI_API_KEY").ok_or(ProviderConfigError::MissingVariables {
                    provider: "gemini",
                    variables: "GEMINI_API_KEY".to_string(),
                })?,
                base_url: GEMINI_BASE_URL.to_string(),
                model: model
                    .or_else(|| lookup("GEMINI_MODEL"))
                    .unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
                request_timeout: None,
            },
        };
        debug!(provider = %config.kind, model = %config.model, base_url = %config.base_url, "Resolved LLM provider");
        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `LLM_TEMPERATURE`, or `0.1` when unset.
pub fn default_temperature_with<F>(lookup: F) -> Result<f32, ProviderConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(TEMPERATURE_ENV) {
        None => Ok(DEFAULT_TEMPERATURE),
        Some(raw) => raw
            .trim()
            .parse::<f32>()
            .map_err(|e| ProviderConfigError::InvalidValue {
                variable: TEMPERATURE_ENV.to_string(),
                message: e.to_string(),
            }),
    }
}

pub fn default_temperature_from_env() -> Result<f32, ProviderConfigError> {
    default_temperature_with(env_lookup)
}

/// Chat completions client for any OpenAI-compatible endpoint.
pub struct OpenAiCompatibleProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderConfigError::Client(e.to_string()))?;
        info!(provider = %config.kind, model = %config.model, "Initialised LLM client");
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

/// JSON body of a schema-constrained chat completion.
pub fn request_body(model: &str, request: &StructuredRequest) -> Value {
    json!({
        "model": model,
        "temperature": request.temperature,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": request.user_content },
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": request.schema_name,
                "schema": request.schema,
                "strict": true,
            },
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

impl ChatCompletion {
    /// Text of the first choice.
    pub fn into_content(self) -> Result<String, ProviderError> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ProviderError::EmptyResponse)?;
        if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(ProviderError::Refused(refusal));
        }
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> String {
        self.config.kind.to_string()
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }

    async fn complete_structured(&self, request: StructuredRequest) -> Result<String, ProviderError> {
        let body = request_body(&self.config.model, &request);
        debug!(
            provider = %self.config.kind,
            model = %self.config.model,
            schema = %request.schema_name,
            system_chars = request.system_prompt.len(),
            user_chars = request.user_content.len(),
            "Sending structured completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = %self.config.kind, status = status.as_u16(), "LLM API returned an error");
            return Err(ProviderError::Api {
                provider: self.config.kind.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion.into_content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_is_the_default_provider() {
        let config =
            ProviderConfig::resolve_with(None, None, lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.kind, ProviderKind::Gemini);
        assert_eq!(config.model, GEMINI_DEFAULT_MODEL);
        assert!(config.base_url.contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn explicit_provider_and_model_win_over_env() {
        let lookup = lookup_from(&[
            ("LLM_PROVIDER", "gemini"),
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_MODEL", "from-env"),
        ]);
        let config = ProviderConfig::resolve_with(Some("OpenAI"), Some("cli-model"), lookup).unwrap();
        assert_eq!(config.kind, ProviderKind::OpenAi);
        assert_eq!(config.model, "cli-model");
    }

    #[test]
    fn local_requires_all_three_variables() {
        let lookup = lookup_from(&[
            ("LOCAL_OPENAI_API_KEY", "k"),
            ("LOCAL_OPENAI_BASE_URL", "http://localhost:8000/v1"),
        ]);
        let err = ProviderConfig::resolve_with(Some("local"), None, lookup).unwrap_err();
        assert!(matches!(err, ProviderConfigError::MissingVariables { provider: "local", .. }));
    }

    #[test]
    fn missing_key_and_unknown_provider_fail() {
        assert!(matches!(
            ProviderConfig::resolve_with(Some("openai"), None, lookup_from(&[])),
            Err(ProviderConfigError::MissingVariables { provider: "openai", .. })
        ));
        assert_eq!(
            ProviderConfig::resolve_with(Some("claude"), None, lookup_from(&[])).unwrap_err(),
            ProviderConfigError::UnknownProvider("claude".into())
        );
    }

    #[test]
    fn temperature_defaults_and_parses() {
        assert_eq!(default_temperature_with(lookup_from(&[])).unwrap(), 0.1);
        assert_eq!(
            default_temperature_with(lookup_from(&[("LLM_TEMPERATURE", "0.7")])).unwrap(),
            0.7
        );
        assert!(default_temperature_with(lookup_from(&[("LLM_TEMPERATURE", "hot")])).is_err());
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = ProviderConfig::resolve_with(
            Some("gemini"),
            None,
            lookup_from(&[("GEMINI_API_KEY", "super-secret")]),
        )
        .unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn body_requests_strict_json_schema() {
        let request = StructuredRequest {
            system_prompt: "sys".into(),
            user_content: "user".into(),
            schema_name: "ShowroomSummary".into(),
            schema: json!({ "type": "object" }),
            temperature: 0.1,
        };
        let body = request_body("m", &request);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "ShowroomSummary");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn completion_content_refusal_and_empty() {
        let ok: ChatCompletion =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "{}" } }] })).unwrap();
        assert_eq!(ok.into_content().unwrap(), "{}");

        let refused: ChatCompletion = serde_json::from_value(
            json!({ "choices": [{ "message": { "content": null, "refusal": "no" } }] }),
        )
        .unwrap();
        assert!(matches!(refused.into_content(), Err(ProviderError::Refused(_))));

        let empty: ChatCompletion = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(empty.into_content(), Err(ProviderError::EmptyResponse)));
    }
}
