//! Static field tables for structured artifacts.
//!
//! Each artifact type declares its fields once, as a `&'static [FieldSpec]`.
//! The same table drives the prompt instructions, the JSON schema sent with
//! the request, and the validation of the model's answer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::invoke::ProcessingMetadata;

/// Fields never rendered as prompt instructions.
pub const EXCLUDED_FIELDS: [&str; 3] = ["source_url", "source_ref", "processing_metadata"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer { min: i64, max: i64 },
    StringList,
    /// Filled in by the invoker, never requested from the model.
    Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Behavioral instruction for the model; empty for none.
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn new(
        name: &'static str,
        kind: FieldKind,
        required: bool,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required,
            description,
        }
    }

    /// Whether the model is asked to produce this field.
    pub fn is_generated(&self) -> bool {
        self.kind != FieldKind::Metadata
    }

    /// Whether this field gets its own instruction block in the system prompt.
    pub fn has_instructions(&self) -> bool {
        self.is_generated()
            && !EXCLUDED_FIELDS.contains(&self.name)
            && !self.description.trim().is_empty()
    }

    fn property_schema(&self) -> Value {
        let mut schema = match self.kind {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer { min, max } => {
                json!({ "type": "integer", "minimum": min, "maximum": max })
            }
            FieldKind::StringList => json!({ "type": "array", "items": { "type": "string" } }),
            FieldKind::Metadata => json!({ "type": "object" }),
        };
        if !self.required {
            // Strict mode wants every property listed as required; optional
            // ones are expressed as nullable instead.
            if let Some(ty) = schema.get("type").cloned() {
                schema["type"] = json!([ty, "null"]);
            }
        }
        if !self.description.is_empty() {
            schema["description"] = json!(self.description);
        }
        schema
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match self.kind {
            FieldKind::String if value.is_string() => Ok(()),
            FieldKind::String => Err(format!("field '{}' must be a string", self.name)),
            FieldKind::Integer { min, max } => match value.as_i64() {
                Some(n) if (min..=max).contains(&n) => Ok(()),
                Some(n) => Err(format!(
                    "field '{}' is {n}, outside {min}..={max}",
                    self.name
                )),
                None => Err(format!("field '{}' must be an integer", self.name)),
            },
            FieldKind::StringList => match value.as_array() {
                Some(items) if items.iter().all(Value::is_string) => Ok(()),
                _ => Err(format!("field '{}' must be a list of strings", self.name)),
            },
            FieldKind::Metadata => Ok(()),
        }
    }
}

/// An artifact the invoker can request from a model.
pub trait StructuredOutput: Serialize + DeserializeOwned + Send + 'static {
    /// Name the schema is sent under.
    const SCHEMA_NAME: &'static str;

    fn fields() -> &'static [FieldSpec];

    /// Store invocation metadata on the artifact, when it has a slot for it.
    fn set_processing_metadata(&mut self, _metadata: ProcessingMetadata) {}
}

/// Strict JSON schema for the generated fields of `fields`.
pub fn json_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields.iter().filter(|f| f.is_generated()) {
        properties.insert(field.name.to_string(), field.property_schema());
        required.push(Value::from(field.name));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Check a model answer against `fields`.
///
/// Required fields must be present and non-null; present values must have
/// the declared kind.
pub fn validate(fields: &[FieldSpec], value: &Value) -> Result<(), String> {
    let object = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;
    for field in fields.iter().filter(|f| f.is_generated()) {
        match object.get(field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(format!("missing required field '{}'", field.name));
            }
            None | Some(Value::Null) => {}
            Some(present) => field.check(present)?,
        }
    }
    Ok(())
}

/// Single-field table used when fields are generated one call at a time.
pub fn single_field(fields: &[FieldSpec], name: &str) -> Option<[FieldSpec; 1]> {
    fields.iter().find(|f| f.name == name).map(|f| [*f])
}
