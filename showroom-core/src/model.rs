//! Typed document model produced by extraction.

use serde::{Deserialize, Serialize};

use crate::artifacts::{Artifact, CatalogDescription, ShowroomReview, ShowroomSummary};

/// One navigation entry of a lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowroomModule {
    /// Title derived from the page heading; empty when none was found.
    pub module_name: String,
    /// Path relative to `content/modules/ROOT/pages`, as listed in the navigation.
    pub filename: String,
    /// Raw AsciiDoc source.
    pub module_content: String,
}

impl ShowroomModule {
    pub fn word_count(&self) -> usize {
        self.module_content.split_whitespace().count()
    }

    pub fn line_count(&self) -> usize {
        self.module_content.lines().count()
    }
}

/// A parsed Showroom repository.
///
/// Modules are fixed at extraction time; only the generated artifacts can be
/// attached afterwards, through [`Showroom::attach`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showroom {
    pub lab_name: String,
    pub git_url: String,
    pub git_ref: String,
    modules: Vec<ShowroomModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_output: Option<ShowroomSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_output: Option<ShowroomReview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_output: Option<CatalogDescription>,
}

impl Showroom {
    pub fn new(
        lab_name: impl Into<String>,
        git_url: impl Into<String>,
        git_ref: impl Into<String>,
        modules: Vec<ShowroomModule>,
    ) -> Self {
        Self {
            lab_name: lab_name.into(),
            git_url: git_url.into(),
            git_ref: git_ref.into(),
            modules,
            summary_output: None,
            review_output: None,
            description_output: None,
        }
    }

    /// Modules in navigation order.
    pub fn modules(&self) -> &[ShowroomModule] {
        &self.modules
    }

    pub fn total_words(&self) -> usize {
        self.modules.iter().map(ShowroomModule::word_count).sum()
    }

    pub fn total_lines(&self) -> usize {
        self.modules.iter().map(ShowroomModule::line_count).sum()
    }

    /// Store a generated artifact in its slot, replacing any earlier one.
    pub fn attach(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::Summary(summary) => self.summary_output = Some(summary),
            Artifact::Review(review) => self.review_output = Some(review),
            Artifact::Description(description) => self.description_output = Some(description),
        }
    }
}
