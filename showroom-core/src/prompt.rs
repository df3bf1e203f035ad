//! Prompt assembly: system prompt with per-field behavioral instructions and
//! optional context hints, user content with the full lab text.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::model::Showroom;
use crate::schema::FieldSpec;

const MODULE_RULE_WIDTH: usize = 50;

const FIELD_PREAMBLE: &str = "FIELD-SPECIFIC BEHAVIORAL INSTRUCTIONS:
Each field below requires a COMPLETELY DIFFERENT analytical approach. Do not mix behaviors between fields.";

const FIELD_CLOSING: &str = "CRITICAL: Each field has its own FOCUS, IGNORE, and ACT LIKE instructions. Apply each field's behavioral approach independently. Do not let one field's focus contaminate another field's analysis.";

const HINTS_HEADER: &str = "CONTEXT HINTS TO CONSIDER (but do not summarize):
Use these hints only to disambiguate names, products and terminology. Never summarize, quote or echo them in your output.";

/// Value of a context hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HintData {
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// Extra knowledge handed to the model for disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHint {
    pub label: String,
    pub data: HintData,
    #[serde(default = "default_hint_source")]
    pub source: String,
    #[serde(default = "default_hint_confidence")]
    pub confidence: f64,
}

fn default_hint_source() -> String {
    "config".to_string()
}

fn default_hint_confidence() -> f64 {
    1.0
}

impl ContextHint {
    pub fn new(label: impl Into<String>, data: HintData, source: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            data,
            source: source.into(),
            confidence,
        }
    }

    /// Confidence limited to `[0, 1]`; NaN counts as 0.
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}

/// System prompt plus user content, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Per-field instruction block, or an empty string when no field qualifies.
pub fn field_instructions(fields: &[FieldSpec]) -> String {
    let blocks: Vec<String> = fields
        .iter()
        .filter(|f| f.has_instructions())
        .map(|f| {
            format!(
                "{} FIELD BEHAVIORAL INSTRUCTIONS:\nIGNORE everything except this field's specific focus. Your analytical approach for this field: {}\n",
                f.name.to_uppercase(),
                f.description.trim()
            )
        })
        .collect();

    if blocks.is_empty() {
        return String::new();
    }
    format!("{FIELD_PREAMBLE}\n\n{}\n\n{FIELD_CLOSING}", blocks.join("\n"))
}

fn hints_section(hints: &[ContextHint]) -> String {
    let mut section = format!("{HINTS_HEADER}\n");
    for hint in hints {
        // Writing to a String cannot fail.
        let _ = writeln!(section, "\n{}:", hint.label.to_uppercase());
        match &hint.data {
            HintData::Text(text) => {
                let _ = writeln!(section, "{text}");
            }
            HintData::List(items) => {
                for item in items {
                    let _ = writeln!(section, "- {item}");
                }
            }
            HintData::Map(entries) => {
                for (key, value) in entries {
                    let _ = writeln!(section, "- {key}: {value}");
                }
            }
        }
        let _ = writeln!(
            section,
            "(Source: {}, Confidence: {:.2})",
            hint.source,
            hint.clamped_confidence()
        );
    }
    section
}

/// Base prompt, then field instructions, then context hints.
pub fn build_system_prompt(base_prompt: &str, fields: &[FieldSpec], hints: &[ContextHint]) -> String {
    let mut prompt = base_prompt.trim_end().to_string();
    let instructions = field_instructions(fields);
    if !instructions.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&instructions);
    }
    if !hints.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(hints_section(hints).trim_end());
    }
    prompt
}

/// Lab header followed by every module in navigation order.
pub fn format_showroom_content(showroom: &Showroom) -> String {
    let rule = "-".repeat(MODULE_RULE_WIDTH);
    let mut lines: Vec<String> = vec![
        format!("LAB TITLE: {}", showroom.lab_name),
        format!("REPOSITORY: {}", showroom.git_url),
        format!("BRANCH/REF: {}", showroom.git_ref),
        format!("TOTAL MODULES: {}", showroom.modules().len()),
        String::new(),
    ];
    for (i, module) in showroom.modules().iter().enumerate() {
        lines.push(format!("MODULE {}: {}", i + 1, module.module_name));
        lines.push(format!("FILENAME: {}", module.filename));
        lines.push("CONTENT:".to_string());
        lines.push(rule.clone());
        lines.push(module.module_content.clone());
        lines.push(rule.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn build_prompt(
    base_prompt: &str,
    fields: &[FieldSpec],
    showroom: &Showroom,
    hints: &[ContextHint],
) -> Prompt {
    Prompt {
        system: build_system_prompt(base_prompt, fields, hints),
        user: format_showroom_content(showroom),
    }
}
