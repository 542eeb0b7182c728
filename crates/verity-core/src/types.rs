//! Core types for claim routing and reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::scores;

/// Errors raised when building inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Claim text is empty")]
    EmptyClaim,

    #[error("Assessment {0} is empty")]
    EmptyAssessment(RecordId),

    #[error("Score for {field} is not a finite number")]
    NonFiniteScore { field: &'static str },
}

/// Raw text submitted for evaluation.
///
/// Immutable once received: the fields are private and only readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimInput {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl ClaimInput {
    /// Create a claim, rejecting text that is empty after trimming.
    pub fn new(text: impl Into<String>) -> Result<Self, InputError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InputError::EmptyClaim);
        }
        Ok(Self {
            text,
            context: None,
        })
    }

    /// Attach free-text context. Blank context is dropped.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

/// The closed set of assessment tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Track {
    /// Empirically checkable claim: scored for factual grounding.
    FactualVerification,
    /// Value-laden, contested, or uncertain: perspectives are explored.
    NormativeExploration,
    /// Exploration where the text carries weaponized-communication signals.
    NormativeExplorationDefensive,
    /// Exploration where the asker is supportable but contemptuous of others.
    NormativeExplorationMirrored,
}

impl Track {
    pub const ALL: [Track; 4] = [
        Track::FactualVerification,
        Track::NormativeExploration,
        Track::NormativeExplorationDefensive,
        Track::NormativeExplorationMirrored,
    ];

    /// Wire identifier of the track.
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::FactualVerification => "factual-verification",
            Track::NormativeExploration => "normative-exploration",
            Track::NormativeExplorationDefensive => "normative-exploration-defensive",
            Track::NormativeExplorationMirrored => "normative-exploration-mirrored",
        }
    }

    /// Whether this is one of the exploration tracks.
    pub fn is_exploration(&self) -> bool {
        !matches!(self, Track::FactualVerification)
    }

    /// Whether the track runs both an initial and a verify pass.
    pub fn requires_dual_assessment(&self) -> bool {
        matches!(self, Track::FactualVerification)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of a mixed claim leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Empirical,
    Normative,
}

/// Both parts of a claim that mixes an empirical and a normative statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedComponents {
    /// The checkable part
    pub empirical: String,

    /// The value-laden part
    pub normative: String,

    /// The part the asker emphasizes more, handled first
    pub lead: ComponentKind,
}

/// Output of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDecision {
    /// Chosen track; absent when the classifier declined to commit
    #[serde(default)]
    pub track: Option<Track>,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Detected signal labels
    #[serde(default)]
    pub signals: Vec<String>,

    /// Questions to ask before routing; non-empty means provisional
    #[serde(default)]
    pub clarifying_questions: Vec<String>,

    /// User-facing explanation
    #[serde(default)]
    pub explanation: String,

    /// Present when the claim mixes empirical and normative parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<MixedComponents>,
}

/// What a caller should do with a [`TrackDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Route to the track now.
    Routed(Track),
    /// Ask the clarifying questions and re-submit.
    NeedsClarification,
    /// Neither a track nor questions: the decision cannot be used.
    Uncommitted,
}

impl TrackDecision {
    /// A committed decision.
    pub fn routed(track: Track, confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            track: Some(track),
            confidence: scores::clamp_unit(confidence),
            signals: Vec::new(),
            clarifying_questions: Vec::new(),
            explanation: explanation.into(),
            components: None,
        }
    }

    /// A provisional decision that asks for clarification.
    pub fn clarify(confidence: f64, questions: Vec<String>, explanation: impl Into<String>) -> Self {
        Self {
            track: None,
            confidence: scores::clamp_unit(confidence),
            signals: Vec::new(),
            clarifying_questions: questions,
            explanation: explanation.into(),
            components: None,
        }
    }

    /// Decide how the caller must treat this decision.
    ///
    /// Clarifying questions always win: a decision that carries them is
    /// provisional even when it also names a track.
    pub fn routing(&self) -> Routing {
        if !self.clarifying_questions.is_empty() {
            return Routing::NeedsClarification;
        }
        match self.track {
            Some(track) => Routing::Routed(track),
            None => Routing::Uncommitted,
        }
    }

    /// Add a signal label if not already present.
    pub fn push_signal(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.signals.iter().any(|s| s == &label) {
            self.signals.push(label);
        }
    }
}

/// Which of the two independent passes produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentPass {
    Initial,
    Verify,
}

impl AssessmentPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentPass::Initial => "initial",
            AssessmentPass::Verify => "verify",
        }
    }
}

/// Result of one assessment pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// Factual grounding in [-10, 10]
    pub reality_score: f64,

    /// Presentation honesty in [-1, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_score: Option<f64>,

    /// Free-text rationale
    #[serde(default)]
    pub rationale: String,

    /// Detected distortion patterns, in order of detection
    #[serde(default)]
    pub distortion_patterns: Vec<String>,
}

impl AssessmentRecord {
    pub fn new(reality_score: f64, rationale: impl Into<String>) -> Self {
        Self {
            reality_score,
            integrity_score: None,
            rationale: rationale.into(),
            distortion_patterns: Vec::new(),
        }
    }

    pub fn with_integrity(mut self, integrity_score: f64) -> Self {
        self.integrity_score = Some(integrity_score);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.distortion_patterns = patterns;
        self
    }

    /// A record with no rationale carries nothing to compare.
    pub fn is_empty(&self) -> bool {
        self.rationale.trim().is_empty()
    }

    /// Bring both scores into protocol range.
    pub fn clamped(mut self) -> Self {
        self.reality_score = scores::clamp_reality(self.reality_score);
        self.integrity_score = self.integrity_score.map(scores::clamp_integrity);
        self
    }

    /// Check that the record can be adjudicated.
    pub fn check(&self, id: RecordId) -> Result<(), InputError> {
        if self.is_empty() {
            return Err(InputError::EmptyAssessment(id));
        }
        if !self.reality_score.is_finite() {
            return Err(InputError::NonFiniteScore {
                field: "reality_score",
            });
        }
        if matches!(self.integrity_score, Some(v) if !v.is_finite()) {
            return Err(InputError::NonFiniteScore {
                field: "integrity_score",
            });
        }
        Ok(())
    }
}

/// Identity of one of the two records under adjudication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordId {
    A,
    B,
}

impl RecordId {
    /// The other record.
    pub fn other(&self) -> RecordId {
        match self {
            RecordId::A => RecordId::B,
            RecordId::B => RecordId::A,
        }
    }

    /// Select this record from a pair.
    pub fn pick<'a, T>(&self, a: &'a T, b: &'a T) -> &'a T {
        match self {
            RecordId::A => a,
            RecordId::B => b,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::A => f.write_str("A"),
            RecordId::B => f.write_str("B"),
        }
    }
}

/// The four fixed comparison criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    SourceQuality,
    ReasoningRigor,
    EvidenceCompleteness,
    Calibration,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::SourceQuality,
        Criterion::ReasoningRigor,
        Criterion::EvidenceCompleteness,
        Criterion::Calibration,
    ];

    /// Label the adjudication reply uses for this criterion.
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::SourceQuality => "SOURCE_QUALITY",
            Criterion::ReasoningRigor => "REASONING_RIGOR",
            Criterion::EvidenceCompleteness => "EVIDENCE_COMPLETENESS",
            Criterion::Calibration => "CALIBRATION",
        }
    }

    /// Human-readable description used in the comparison request.
    pub fn description(&self) -> &'static str {
        match self {
            Criterion::SourceQuality => "quality and independence of cited sources",
            Criterion::ReasoningRigor => "rigor of the reasoning from evidence to conclusion",
            Criterion::EvidenceCompleteness => "completeness of the evidence considered",
            Criterion::Calibration => "calibration of the stated confidence to the evidence",
        }
    }
}

/// Reconciled outcome of comparing two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationResult {
    /// The stronger record; never a tie
    pub winner: RecordId,

    /// Confidence in [0.5, 1.0]
    pub confidence: f64,

    /// Score the adjudicator recommended directly, if any
    pub recommended_score: Option<f64>,

    /// Derived final score
    pub final_score: f64,

    /// Per-criterion winners that could be read from the reply
    pub criteria: BTreeMap<Criterion, RecordId>,

    /// Adjudicator's stated reasoning
    pub reasoning: Option<String>,

    /// When the adjudication was resolved
    pub adjudicated_at: DateTime<Utc>,
}

/// How a verdict's final score was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMethod {
    /// Only one pass ran for the track.
    SinglePass,
    /// Two passes agreed within the divergence threshold.
    Agreement,
    /// Two passes diverged and were adjudicated.
    Adjudicated,
}

/// Final reconciled verdict for a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Track that produced the assessments
    pub track: Track,

    /// Initial assessment
    pub initial: AssessmentRecord,

    /// Verify assessment, for dual-assessment tracks
    pub verify: Option<AssessmentRecord>,

    /// Adjudication, when the passes diverged
    pub adjudication: Option<AdjudicationResult>,

    /// Reconciled reality score
    pub final_score: f64,

    /// How `final_score` was reached
    pub method: ReconcileMethod,
}
