use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::artifacts::ArtifactKind;
use crate::invoke::{FieldPrompt, InvokeOptions, Strategy};
use crate::prompt::ContextHint;
use crate::provider::DEFAULT_TEMPERATURE;

/// Tunables for artifact generation, normally loaded from YAML.
///
/// Every field is optional so that several files can be layered with
/// [`AnalysisConfig::merge`]; the accessor methods apply the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Base prompt per artifact kind, replacing the built-in one.
    pub prompts: BTreeMap<ArtifactKind, String>,
    pub temperatures: BTreeMap<ArtifactKind, f32>,
    pub default_temperature: Option<f32>,
    pub strategy: Option<Strategy>,
    pub field_concurrency: Option<usize>,
    pub llm_timeout_secs: Option<u64>,
    pub git_timeout_secs: Option<u64>,
    pub context_hints: Vec<ContextHint>,
}

impl AnalysisConfig {
    /// Layer `other` on top of `self`: values set in `other` win, hints are
    /// appended.
    pub fn merge(mut self, other: AnalysisConfig) -> AnalysisConfig {
        self.prompts.extend(other.prompts);
        self.temperatures.extend(other.temperatures);
        self.default_temperature = other.default_temperature.or(self.default_temperature);
        self.strategy = other.strategy.or(self.strategy);
        self.field_concurrency = other.field_concurrency.or(self.field_concurrency);
        self.llm_timeout_secs = other.llm_timeout_secs.or(self.llm_timeout_secs);
        self.git_timeout_secs = other.git_timeout_secs.or(self.git_timeout_secs);
        self.context_hints.extend(other.context_hints);
        self
    }

    pub fn base_prompt(&self, kind: ArtifactKind) -> &str {
        self.prompts
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_base_prompt())
    }

    /// Per-kind temperature, then the configured default, then `0.1`.
    pub fn temperature(&self, kind: ArtifactKind) -> f32 {
        self.temperatures
            .get(&kind)
            .copied()
            .or(self.default_temperature)
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn git_timeout(&self) -> Option<Duration> {
        self.git_timeout_secs.map(Duration::from_secs)
    }

    pub fn llm_timeout(&self) -> Option<Duration> {
        self.llm_timeout_secs.map(Duration::from_secs)
    }

    pub fn invoke_options(&self, kind: ArtifactKind) -> InvokeOptions {
        InvokeOptions {
            temperature: self.temperature(kind),
            timeout: self.llm_timeout(),
            strategy: self.strategy.unwrap_or_default(),
            field_concurrency: self.field_concurrency.unwrap_or(1).max(1),
            field_prompt: Some(FieldPrompt {
                base_prompt: self.base_prompt(kind).to_string(),
                hints: self.context_hints.clone(),
            }),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            prompt_overrides = self.prompts.len(),
            context_hints = self.context_hints.len(),
            strategy = ?self.strategy.unwrap_or_default(),
            "Loaded analysis config"
        );
        debug!(?self, "Analysis config loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AnalysisConfig::default();
        assert_eq!(config.temperature(ArtifactKind::Review), DEFAULT_TEMPERATURE);
        assert_eq!(
            config.base_prompt(ArtifactKind::Summary),
            ArtifactKind::Summary.default_base_prompt()
        );
        let options = config.invoke_options(ArtifactKind::Summary);
        assert_eq!(options.strategy, Strategy::Single);
        assert_eq!(options.field_concurrency, 1);
        assert!(options.timeout.is_none());
        let field_prompt = options.field_prompt.expect("per-field prompt parts");
        assert_eq!(field_prompt.base_prompt, config.base_prompt(ArtifactKind::Summary));
        assert!(field_prompt.hints.is_empty());
    }

    #[test]
    fn yaml_overrides_are_read() {
        let yaml = r#"
prompts:
  summary: "Custom summary prompt"
temperatures:
  review: 0.4
default_temperature: 0.2
strategy: per_field
field_concurrency: 3
llm_timeout_secs: 90
context_hints:
  - label: products
    data: ["OpenShift", "Ansible"]
    source: catalog
    confidence: 0.9
"#;
        let config: AnalysisConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.base_prompt(ArtifactKind::Summary), "Custom summary prompt");
        assert_eq!(config.temperature(ArtifactKind::Review), 0.4);
        assert_eq!(config.temperature(ArtifactKind::Description), 0.2);
        let options = config.invoke_options(ArtifactKind::Review);
        assert_eq!(options.strategy, Strategy::PerField);
        assert_eq!(options.field_concurrency, 3);
        assert_eq!(options.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.context_hints.len(), 1);
    }

    #[test]
    fn later_layer_wins() {
        let user = AnalysisConfig {
            default_temperature: Some(0.5),
            git_timeout_secs: Some(30),
            ..Default::default()
        };
        let mut project = AnalysisConfig {
            default_temperature: Some(0.3),
            ..Default::default()
        };
        project
            .prompts
            .insert(ArtifactKind::Review, "Project review".into());

        let merged = user.merge(project);
        assert_eq!(merged.default_temperature, Some(0.3));
        assert_eq!(merged.git_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(merged.base_prompt(ArtifactKind::Review), "Project review");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<AnalysisConfig>("colour: blue\n").is_err());
    }
}
