//! Schema-constrained LLM invocation.
//!
//! [`invoke`] sends one request (or one request per field), validates the
//! answer against the artifact's field table and returns an [`Invocation`]:
//! the typed artifact or the reason there is none, plus metadata describing
//! the attempt. There are no retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::contract::{LlmProvider, StructuredRequest};
use crate::error::InvokeError;
use crate::prompt::{build_system_prompt, ContextHint};
use crate::provider::DEFAULT_TEMPERATURE;
use crate::schema::{json_schema, validate, FieldSpec, StructuredOutput};

/// What happened during an invocation. Stored on successful artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub timestamp: DateTime<Utc>,
    pub llm_provider: String,
    pub model_name: String,
    /// Seconds.
    pub processing_duration: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub llm_calls: usize,
}

/// How the artifact is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One request for all fields.
    #[default]
    Single,
    /// One request per field, merged afterwards.
    PerField,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "single" => Ok(Strategy::Single),
            "per_field" | "iterative" => Ok(Strategy::PerField),
            other => Err(format!("unknown strategy '{other}' (expected single or per-field)")),
        }
    }
}

/// Parts a per-field system prompt is rebuilt from, so each request only
/// carries the instructions of its own field.
#[derive(Debug, Clone, Default)]
pub struct FieldPrompt {
    pub base_prompt: String,
    pub hints: Vec<ContextHint>,
}

impl FieldPrompt {
    fn system_for(&self, field: &FieldSpec) -> String {
        build_system_prompt(&self.base_prompt, std::slice::from_ref(field), &self.hints)
    }
}

#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub temperature: f32,
    /// Limit for each individual request.
    pub timeout: Option<Duration>,
    pub strategy: Strategy,
    /// Requests in flight at once for [`Strategy::PerField`].
    pub field_concurrency: usize,
    /// Used by [`Strategy::PerField`] instead of the shared system prompt.
    pub field_prompt: Option<FieldPrompt>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            timeout: None,
            strategy: Strategy::Single,
            field_concurrency: 1,
            field_prompt: None,
        }
    }
}

/// Outcome of [`invoke`].
#[derive(Debug)]
pub struct Invocation<T> {
    pub result: Result<T, InvokeError>,
    pub metadata: ProcessingMetadata,
}

impl<T> Invocation<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, InvokeError> {
        self.result
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Invocation<U> {
        Invocation {
            result: self.result.map(f),
            metadata: self.metadata,
        }
    }
}

/// Request a `T` from `provider`.
pub async fn invoke<T, P>(
    provider: &P,
    system_prompt: &str,
    content: &str,
    options: &InvokeOptions,
) -> Invocation<T>
where
    T: StructuredOutput,
    P: LlmProvider + ?Sized,
{
    let timestamp = Utc::now();
    let started = Instant::now();
    let provider_name = provider.provider_name();
    let model_name = provider.model_name();
    info!(
        provider = %provider_name,
        model = %model_name,
        schema = T::SCHEMA_NAME,
        strategy = ?options.strategy,
        "Calling LLM with structured output"
    );

    let (outcome, llm_calls) = match options.strategy {
        Strategy::Single => {
            let request = StructuredRequest {
                system_prompt: system_prompt.to_string(),
                user_content: content.to_string(),
                schema_name: T::SCHEMA_NAME.to_string(),
                schema: json_schema(T::fields()),
                temperature: options.temperature,
            };
            (request_json(provider, request, options.timeout).await, 1)
        }
        Strategy::PerField => per_field::<T, P>(provider, system_prompt, content, options).await,
    };

    let result = outcome.and_then(into_artifact::<T>);
    let processing_duration = started.elapsed().as_secs_f64();

    let metadata = ProcessingMetadata {
        timestamp,
        llm_provider: provider_name,
        model_name,
        processing_duration,
        success: result.is_ok(),
        error: result.as_ref().err().map(ToString::to_string),
        llm_calls,
    };

    let result = match result {
        Ok(mut artifact) => {
            info!(schema = T::SCHEMA_NAME, duration_secs = processing_duration, calls = llm_calls, "Structured output generated");
            artifact.set_processing_metadata(metadata.clone());
            Ok(artifact)
        }
        Err(e) => {
            error!(schema = T::SCHEMA_NAME, duration_secs = processing_duration, error = %e, "Structured output failed");
            Err(e)
        }
    };

    Invocation { result, metadata }
}

fn into_artifact<T: StructuredOutput>(value: Value) -> Result<T, InvokeError> {
    let violation = |message: String| InvokeError::SchemaViolation {
        schema: T::SCHEMA_NAME.to_string(),
        message,
    };
    validate(T::fields(), &value).map_err(violation)?;
    serde_json::from_value(value).map_err(|e| violation(e.to_string()))
}

async fn request_json<P>(
    provider: &P,
    request: StructuredRequest,
    timeout: Option<Duration>,
) -> Result<Value, InvokeError>
where
    P: LlmProvider + ?Sized,
{
    let schema = request.schema_name.clone();
    let call = provider.complete_structured(request);
    let raw = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| InvokeError::Timeout(limit))??,
        None => call.await?,
    };
    debug!(schema = %schema, chars = raw.len(), "Received structured response");
    serde_json::from_str(&raw).map_err(|e| InvokeError::SchemaViolation {
        schema,
        message: format!("response is not valid JSON: {e}"),
    })
}

fn field_focus(field: &str) -> String {
    format!(
        "You are an expert summarizer. Extract only the '{field}' field from the provided content.\n\n\
         Follow the schema exactly and provide accurate, detailed information based only on what's mentioned in the content."
    )
}

async fn per_field<T, P>(
    provider: &P,
    system_prompt: &str,
    content: &str,
    options: &InvokeOptions,
) -> (Result<Value, InvokeError>, usize)
where
    T: StructuredOutput,
    P: LlmProvider + ?Sized,
{
    let issued = AtomicUsize::new(0);
    let issued = &issued;
    let fields: Vec<&'static FieldSpec> = T::fields().iter().filter(|f| f.is_generated()).collect();

    let requests = fields.into_iter().map(|field| async move {
        issued.fetch_add(1, Ordering::Relaxed);
        debug!(field = field.name, "Requesting single field");
        let base = match &options.field_prompt {
            Some(parts) => parts.system_for(field),
            None => system_prompt.to_string(),
        };
        let request = StructuredRequest {
            system_prompt: format!("{base}\n\n{}", field_focus(field.name)),
            user_content: content.to_string(),
            schema_name: format!("{}_{}", T::SCHEMA_NAME, field.name),
            schema: json_schema(std::slice::from_ref(field)),
            temperature: options.temperature,
        };
        let failed = |message: String| InvokeError::FieldFailed {
            field: field.name.to_string(),
            message,
        };
        let mut answer = request_json(provider, request, options.timeout)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let value = answer
            .get_mut(field.name)
            .map(Value::take)
            .ok_or_else(|| failed("field missing from response".to_string()))?;
        Ok::<_, InvokeError>((field.name.to_string(), value))
    });

    let merged = stream::iter(requests)
        .buffered(options.field_concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await
        .map(|pairs| Value::Object(pairs.into_iter().collect::<Map<String, Value>>()));

    (merged, issued.load(Ordering::Relaxed))
}
