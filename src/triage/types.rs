use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// UrgencyLevel
// ---------------------------------------------------------------------------

/// Urgency tier. Ordered `Routine < Within24Hrs < Immediate` so escalation is
/// a plain `max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UrgencyLevel {
    #[serde(rename = "routine")]
    Routine,
    #[serde(rename = "within_24hrs")]
    Within24Hrs,
    #[serde(rename = "immediate")]
    Immediate,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Within24Hrs => "within_24hrs",
            Self::Immediate => "immediate",
        }
    }

    /// Display label: uppercased, underscores replaced with spaces.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase().replace('_', " ")
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UrgencyLevel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine" => Ok(Self::Routine),
            "within_24hrs" => Ok(Self::Within24Hrs),
            "immediate" => Ok(Self::Immediate),
            other => Err(TriageError::InvalidReferenceData(format!(
                "unknown urgency level '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference data: conditions, specialists, categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSeverity {
    Mild,
    Moderate,
    Severe,
}

/// A candidate condition within a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub name: String,
    /// Fixed match confidence, 0.0–1.0.
    pub confidence: f64,
    pub description: String,
    pub severity: ConditionSeverity,
}

/// A specialist the category recommends. Reference data only, no booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistCandidate {
    pub name: String,
    pub specialization: String,
    pub urgency: UrgencyLevel,
    pub reasoning: String,
    pub availability: String,
    /// 0.0–5.0
    pub rating: f64,
}

impl SpecialistCandidate {
    /// Whether the availability text promises a slot today (or now).
    pub fn available_today(&self) -> bool {
        let lower = self.availability.to_lowercase();
        lower.contains("today") || lower.contains("available now")
    }
}

/// A bucket of related conditions keyed by symptom keywords.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionCategory {
    pub key: String,
    pub display_name: String,
    /// Matched as substrings of the normalized text, in order.
    pub keywords: Vec<String>,
    /// Matched only as whole tokens, after `keywords`. "heart" must not fire
    /// on "heartburn", nor "itch" on "kitchen".
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub conditions: Vec<Condition>,
    pub specialists: Vec<SpecialistCandidate>,
    pub base_urgency: UrgencyLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ConditionCategory {
    /// Condition names in declaration order.
    pub fn condition_names(&self) -> Vec<&str> {
        self.conditions.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Fixed image-analysis output for one recognized visual signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSignal {
    pub key: String,
    /// Lower-case substrings looked for in attachment filenames.
    #[serde(default)]
    pub filename_hints: Vec<String>,
    /// Text category that corroborates this signal when no filename hint matches.
    #[serde(default)]
    pub category: Option<String>,
    pub confidence: f64,
    pub detected_conditions: Vec<String>,
    pub visual_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub urgency: UrgencyLevel,
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Jpeg,
    Png,
}

/// An image attachment. Blobs produced by `intake::decode_attachments`
/// carry the sniffed format and dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageBlob {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: Option<ImageKind>,
    pub dimensions: Option<(u32, u32)>,
}

impl ImageBlob {
    /// Unverified blob straight from the caller.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            format: None,
            dimensions: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Canonical, immutable form of one user submission.
/// Built only by `normalizer::normalize`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRecord {
    pub(crate) raw_text: String,
    pub(crate) normalized_text: String,
    pub(crate) tokens: Vec<String>,
    pub(crate) attachments: Vec<ImageBlob>,
}

impl IntakeRecord {
    /// Trimmed text exactly as the user typed or dictated it.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn attachments(&self) -> &[ImageBlob] {
        &self.attachments
    }

    pub fn has_text(&self) -> bool {
        !self.raw_text.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Where an image finding's signal came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    FilenameHint,
    TextContext,
    Generic,
}

/// Simulated image-analysis output for one attachment batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageFinding {
    pub signal: String,
    pub source: FindingSource,
    pub confidence: f64,
    pub detected_conditions: BTreeSet<String>,
    pub visual_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub urgency: UrgencyLevel,
    pub images_analyzed: usize,
}

/// Aggregate result of one triage turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub category: String,
    pub symptoms: BTreeSet<String>,
    pub possible_conditions: Vec<Condition>,
    pub recommended_specialists: Vec<SpecialistCandidate>,
    pub urgency_level: UrgencyLevel,
    pub recommendations: Vec<String>,
    pub report: String,
    pub image_finding: Option<ImageFinding>,
    pub analyzed_at: NaiveDateTime,
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    pub fn top_specialist(&self) -> Option<&SpecialistCandidate> {
        self.recommended_specialists.first()
    }
}

// ---------------------------------------------------------------------------
// TriageError
// ---------------------------------------------------------------------------

/// One attachment that could not be read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentDecodeFailure {
    pub index: usize,
    pub filename: String,
    pub reason: String,
}

impl fmt::Display for AttachmentDecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} '{}': {}", self.index, self.filename, self.reason)
    }
}

fn join_failures(failures: &[AttachmentDecodeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    #[error("Submission has no text and no attachments")]
    EmptyInput,

    #[error("Attachment decode failed: {}", join_failures(.0))]
    AttachmentDecode(Vec<AttachmentDecodeFailure>),

    #[error("Too many attachments: {count} (max {max})")]
    TooManyAttachments { count: usize, max: usize },

    #[error("Attachment {index} ({filename}) is {bytes} bytes (max {max})")]
    AttachmentTooLarge {
        index: usize,
        filename: String,
        bytes: usize,
        max: usize,
    },

    #[error("Reference data load failed ({0}): {1}")]
    ReferenceDataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    ReferenceDataParse(String, String),

    #[error("Invalid reference data: {0}")]
    InvalidReferenceData(String),

    #[error("Analysis superseded by a newer submission")]
    Superseded,

    #[error("Speech listener already closed")]
    ListenerClosed,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Internal lock failed")]
    LockFailed,
}

impl TriageError {
    /// Calm, user-facing message for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => {
                "Please describe your symptoms or attach a photo so we can help.".to_string()
            }
            Self::AttachmentDecode(failures) => {
                let names: Vec<&str> = failures.iter().map(|f| f.filename.as_str()).collect();
                format!(
                    "We couldn't read {}. Please re-attach a JPEG or PNG image and try again.",
                    names.join(", ")
                )
            }
            Self::TooManyAttachments { max, .. } => {
                format!("Please attach at most {max} images per submission.")
            }
            Self::AttachmentTooLarge { filename, .. } => {
                format!("{filename} is too large. Please attach a smaller photo.")
            }
            Self::Superseded => "A newer submission replaced this one.".to_string(),
            Self::ListenerClosed => {
                "Voice input has already stopped. Please start listening again.".to_string()
            }
            _ => "Something went wrong while analyzing your symptoms. Please try again."
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// TriageEngine trait
// ---------------------------------------------------------------------------

/// The triage pipeline: one stateless analysis per intake record.
pub trait TriageEngine {
    /// Run matcher → image simulator → urgency → ranker → report.
    fn analyze(&self, intake: &IntakeRecord) -> Result<AnalysisResult, TriageError>;
}
