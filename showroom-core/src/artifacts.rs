//! The three artifacts generated from a Showroom and their field tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::invoke::ProcessingMetadata;
use crate::schema::{FieldKind, FieldSpec, StructuredOutput};

const SCORE: FieldKind = FieldKind::Integer { min: 0, max: 10 };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowroomSummary {
    pub redhat_products: Vec<String>,
    pub lab_audience: Vec<String>,
    pub lab_learning_objectives: Vec<String>,
    pub lab_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_metadata: Option<ProcessingMetadata>,
}

const SUMMARY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "redhat_products",
        FieldKind::StringList,
        true,
        "FOCUS: Red Hat products named in the lab content. IGNORE: products that are only implied, upstream projects and third-party tools. ACT LIKE: a product catalog auditor. WRITE: official Red Hat product names, one per entry.",
    ),
    FieldSpec::new(
        "lab_audience",
        FieldKind::StringList,
        true,
        "FOCUS: who the lab is written for, judged from prerequisites, vocabulary and depth. IGNORE: products and learning outcomes. ACT LIKE: a training coordinator placing attendees. WRITE: specific roles with skill levels, e.g. 'Platform engineers new to GitOps'.",
    ),
    FieldSpec::new(
        "lab_learning_objectives",
        FieldKind::StringList,
        true,
        "FOCUS: concrete skills participants can demonstrate after finishing. IGNORE: marketing claims and product lists. ACT LIKE: an instructional designer writing outcomes. WRITE: one action-oriented objective per entry.",
    ),
    FieldSpec::new(
        "lab_summary",
        FieldKind::String,
        true,
        "FOCUS: the whole lab experience from start to finish. IGNORE: scoring or opinions. ACT LIKE: a neutral technical writer. WRITE: an objective overview in exactly 5-6 sentences.",
    ),
    FieldSpec::new(
        "processing_metadata",
        FieldKind::Metadata,
        false,
        "",
    ),
];

impl StructuredOutput for ShowroomSummary {
    const SCHEMA_NAME: &'static str = "ShowroomSummary";

    fn fields() -> &'static [FieldSpec] {
        SUMMARY_FIELDS
    }

    fn set_processing_metadata(&mut self, metadata: ProcessingMetadata) {
        self.processing_metadata = Some(metadata);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowroomReview {
    pub completeness_score: i64,
    pub completeness_feedback: String,
    pub clarity_score: i64,
    pub clarity_feedback: String,
    pub technical_detail_score: i64,
    pub technical_detail_feedback: String,
    pub usefulness_score: i64,
    pub usefulness_feedback: String,
    pub business_value_score: i64,
    pub business_value_feedback: String,
    pub overall_feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_metadata: Option<ProcessingMetadata>,
}

impl ShowroomReview {
    /// Mean of the five dimension scores.
    pub fn average_score(&self) -> f64 {
        let total = self.completeness_score
            + self.clarity_score
            + self.technical_detail_score
            + self.usefulness_score
            + self.business_value_score;
        total as f64 / 5.0
    }
}

const REVIEW_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "completeness_score",
        SCORE,
        true,
        "FOCUS: whether every topic the lab promises is actually covered end to end. ACT LIKE: a curriculum auditor. WRITE: an integer from 0 to 10.",
    ),
    FieldSpec::new(
        "completeness_feedback",
        FieldKind::String,
        true,
        "FOCUS: missing steps, gaps and unfinished sections only. IGNORE: writing style. WRITE: specific, actionable observations with examples.",
    ),
    FieldSpec::new(
        "clarity_score",
        SCORE,
        true,
        "FOCUS: how easy the instructions are to follow. ACT LIKE: a first-time participant. WRITE: an integer from 0 to 10.",
    ),
    FieldSpec::new(
        "clarity_feedback",
        FieldKind::String,
        true,
        "FOCUS: ambiguous instructions, unexplained jargon and confusing structure. IGNORE: technical accuracy. WRITE: concrete suggestions quoting the unclear passages.",
    ),
    FieldSpec::new(
        "technical_detail_score",
        SCORE,
        true,
        "FOCUS: depth and accuracy of the technical content. ACT LIKE: a senior engineer. WRITE: an integer from 0 to 10.",
    ),
    FieldSpec::new(
        "technical_detail_feedback",
        FieldKind::String,
        true,
        "FOCUS: commands, configuration and explanations that are shallow, outdated or wrong. IGNORE: business framing. WRITE: precise technical corrections.",
    ),
    FieldSpec::new(
        "usefulness_score",
        SCORE,
        true,
        "FOCUS: practical value for the target audience. ACT LIKE: a practitioner deciding whether to take the lab. WRITE: an integer from 0 to 10.",
    ),
    FieldSpec::new(
        "usefulness_feedback",
        FieldKind::String,
        true,
        "FOCUS: real-world applicability of the exercises. IGNORE: formatting. WRITE: where the lab helps and where it stays theoretical.",
    ),
    FieldSpec::new(
        "business_value_score",
        SCORE,
        true,
        "FOCUS: how well the lab demonstrates business benefits. ACT LIKE: a technical seller. WRITE: an integer from 0 to 10.",
    ),
    FieldSpec::new(
        "business_value_feedback",
        FieldKind::String,
        true,
        "FOCUS: business outcomes, ROI and customer scenarios. IGNORE: low-level technical detail. WRITE: how the business story could be strengthened.",
    ),
    FieldSpec::new(
        "overall_feedback",
        FieldKind::String,
        true,
        "FOCUS: the most important strengths and improvements across all dimensions. ACT LIKE: a lead reviewer signing off. WRITE: a short, constructive paragraph.",
    ),
    FieldSpec::new(
        "processing_metadata",
        FieldKind::Metadata,
        false,
        "",
    ),
];

impl StructuredOutput for ShowroomReview {
    const SCHEMA_NAME: &'static str = "ShowroomReview";

    fn fields() -> &'static [FieldSpec] {
        REVIEW_FIELDS
    }

    fn set_processing_metadata(&mut self, metadata: ProcessingMetadata) {
        self.processing_metadata = Some(metadata);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescription {
    pub headline: String,
    pub redhat_products: Vec<String>,
    pub intended_audience: Vec<String>,
    pub lab_bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_metadata: Option<ProcessingMetadata>,
}

const DESCRIPTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "headline",
        FieldKind::String,
        true,
        "FOCUS: the core value of the lab in one line. IGNORE: marketing hyperbole. ACT LIKE: a catalog editor. WRITE: a single compelling, accurate sentence.",
    ),
    FieldSpec::new(
        "redhat_products",
        FieldKind::StringList,
        true,
        "FOCUS: Red Hat products explicitly used or demonstrated. IGNORE: anything merely mentioned in passing. WRITE: official product names, one per entry.",
    ),
    FieldSpec::new(
        "intended_audience",
        FieldKind::StringList,
        true,
        "FOCUS: the 2-4 audiences who benefit most. IGNORE: generic labels like 'IT professionals'. ACT LIKE: a marketing segmenter. WRITE: roles with skill levels and use cases.",
    ),
    FieldSpec::new(
        "lab_bullets",
        FieldKind::StringList,
        true,
        "FOCUS: 3-6 distinct takeaways participants gain. IGNORE: setup chores. ACT LIKE: someone writing the 'what you will learn' box. WRITE: short, specific outcome statements.",
    ),
    FieldSpec::new(
        "processing_metadata",
        FieldKind::Metadata,
        false,
        "",
    ),
];

impl StructuredOutput for CatalogDescription {
    const SCHEMA_NAME: &'static str = "CatalogDescription";

    fn fields() -> &'static [FieldSpec] {
        DESCRIPTION_FIELDS
    }

    fn set_processing_metadata(&mut self, metadata: ProcessingMetadata) {
        self.processing_metadata = Some(metadata);
    }
}

/// The artifact kinds the tool can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Summary,
    Review,
    Description,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Summary,
        ArtifactKind::Review,
        ArtifactKind::Description,
    ];

    /// Prefix of saved artifact files.
    pub fn tag(self) -> &'static str {
        match self {
            ArtifactKind::Summary => "showroom_summary",
            ArtifactKind::Review => "showroom_review",
            ArtifactKind::Description => "showroom_description",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            ArtifactKind::Summary => ShowroomSummary::fields(),
            ArtifactKind::Review => ShowroomReview::fields(),
            ArtifactKind::Description => CatalogDescription::fields(),
        }
    }

    pub fn default_base_prompt(self) -> &'static str {
        match self {
            ArtifactKind::Summary => SUMMARY_BASE_PROMPT,
            ArtifactKind::Review => REVIEW_BASE_PROMPT,
            ArtifactKind::Description => DESCRIPTION_BASE_PROMPT,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Summary => "summary",
            ArtifactKind::Review => "review",
            ArtifactKind::Description => "description",
        })
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ArtifactKind::Summary),
            "review" => Ok(ArtifactKind::Review),
            "description" => Ok(ArtifactKind::Description),
            other => Err(format!("unknown artifact kind '{other}'")),
        }
    }
}

/// A generated artifact of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Artifact {
    Summary(ShowroomSummary),
    Review(ShowroomReview),
    Description(CatalogDescription),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Summary(_) => ArtifactKind::Summary,
            Artifact::Review(_) => ArtifactKind::Review,
            Artifact::Description(_) => ArtifactKind::Description,
        }
    }
}

pub const SUMMARY_BASE_PROMPT: &str = "You are an expert technical content analyst specializing in analyzing Red Hat hands-on laboratory exercises and demo content. Your role is to analyze Showroom lab repositories and extract specific structured information.

ANALYSIS FOCUS:
- Identify Red Hat products explicitly mentioned in the content (not implied or assumed)
- Determine the target audience based on skill level, roles, and prerequisites
- Extract clear learning objectives that participants will achieve
- Create a concise but comprehensive summary of the entire lab experience

CRITICAL INSTRUCTIONS:
- For Red Hat products: Only include products that are explicitly named in the content
- For audience: Consider technical level, job roles, and experience requirements
- For learning objectives: Focus on specific skills and knowledge participants will gain
- For summary: Provide an objective overview in exactly 5-6 sentences

Be precise, accurate, and focus only on information that is clearly stated or directly demonstrated in the lab content.";

pub const REVIEW_BASE_PROMPT: &str = "You are an expert technical content reviewer specializing in evaluating Red Hat hands-on laboratory exercises and demo content. Your role is to provide constructive, detailed feedback on Showroom lab repositories across multiple quality dimensions.

REVIEW FOCUS:
- Completeness: Assess if the content covers all necessary topics and provides complete learning experiences
- Clarity: Evaluate how clear and understandable the instructions, explanations, and objectives are
- Technical Detail: Analyze the depth and accuracy of technical information provided
- Usefulness: Determine practical value for the target audience and real-world applicability
- Business Value: Assess how well the content demonstrates business benefits and ROI

SCORING GUIDELINES:
- Use a 0-10 scale where 10 is exceptional, 7-8 is good, 5-6 is adequate, 3-4 needs improvement, 0-2 is poor
- Provide specific, actionable feedback for each dimension
- Focus on constructive suggestions for improvement
- Consider the target audience when evaluating appropriateness

Maintain a professional, constructive tone and give specific examples when giving feedback.";

pub const DESCRIPTION_BASE_PROMPT: &str = "You are an expert technical catalog writer specializing in creating compelling catalog entries for Red Hat hands-on laboratory exercises and demo content. Your role is to analyze Showroom lab repositories and generate catalog descriptions that accurately represent the content and attract the right audience.

ANALYSIS FOCUS:
- Headline: Create a compelling, concise summary that captures the lab's core value proposition
- Products: Identify specific Red Hat products that are explicitly covered or used in the lab
- Audience: Determine 2-4 specific audiences who would benefit most from this content
- Lab Benefits: Extract 3-6 key takeaways that participants will gain from completing the lab

Write in a professional, informative tone that appeals to technical practitioners and decision-makers.";
