//! Instruction prompts for each service call.
//!
//! System prompts are constant so they cache across claims. Everything that
//! varies per claim goes into the user message.

use verity_core::{AssessmentPass, AssessmentRecord, ClaimInput, Criterion, Track, Verdict};

use crate::providers::ChatMessage;

/// Routing policy for the classification call.
pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"
## Task: classify a claim into one assessment track

You route claims. You do not assess them.

## Tracks
- "factual-verification": the text is an empirically checkable factual claim.
  Truth-value questions, statistics, historical or scientific claims, and
  explicit requests for a confidence score or a source check belong here.
- "normative-exploration": the text is value-laden, genuinely contested, or
  expresses the asker's own uncertainty.
- "normative-exploration-defensive": exploration, where the text itself uses
  weaponized communication: contemptuous dismissal as the primary frame,
  wholesale dismissal of sources without engagement, tribal loyalty offered as
  argument, reality-distortion idioms ("everyone knows", "wake up"), or
  talking points in place of dialogue.
- "normative-exploration-mirrored": exploration, where the asker's factual
  position is supportable by evidence but is delivered with contempt for
  people who disagree (dehumanizing language, rhetorical "how can anyone...",
  superiority framing). The asker is right but not reaching anyone; the work
  is tone repair, not fact repair.

## Rules
1. If the text mixes an empirical claim and a normative claim, fill
   "components" with both parts and set "lead" to the one the asker
   emphasizes more. Route "track" to the lead part.
2. If the text is too short or too ambiguous to classify reliably, do not
   commit: set "track" to null, confidence below 0.4, and ask at least one
   clarifying question.
3. Never ask clarifying questions on a committed decision.

## Output Format (JSON only)
{
  "track": "factual-verification" | "normative-exploration" | "normative-exploration-defensive" | "normative-exploration-mirrored" | null,
  "confidence": 0.0-1.0,
  "signals": ["short_snake_case_labels"],
  "clarifying_questions": ["..."],
  "explanation": "one or two sentences for the asker",
  "components": { "empirical": "...", "normative": "...", "lead": "empirical" | "normative" } | null
}
"#;

/// Shared instructions for every assessment pass.
pub const ASSESS_SYSTEM_PROMPT: &str = r#"
## Task: assess one claim

Search for evidence where you can and cite what you find in the rationale.

## Scores
- reality_score: -10 (no factual grounding) to +10 (fully grounded)
- integrity_score: -1 (dishonest presentation) to +1 (transparent), or null
  when presentation is not at issue

## Output Format (JSON only)
{
  "reality_score": -10..10,
  "integrity_score": -1..1 | null,
  "rationale": "evidence-based reasoning with sources",
  "distortion_patterns": ["cherry_picking", "false_equivalence", "..."]
}
"#;

/// Comparison instructions for the adjudication call.
pub const ADJUDICATE_SYSTEM_PROMPT: &str = r#"
## Task: adjudicate between two assessments

Two independent assessments of the same claim disagree. Compare them; do not
assess the claim again.

Judge each criterion, naming A or B as the stronger record:
- SOURCE_QUALITY: quality and independence of cited sources
- REASONING_RIGOR: rigor of the reasoning from evidence to conclusion
- EVIDENCE_COMPLETENESS: completeness of the evidence considered
- CALIBRATION: calibration of the stated confidence to the evidence

Then name one overall winner. A tie is not an answer.

## Output Format (one label per line)
SOURCE_QUALITY: A | B
REASONING_RIGOR: A | B
EVIDENCE_COMPLETENESS: A | B
CALIBRATION: A | B
WINNER: A | B
CONFIDENCE: 0.5-1.0
RECOMMENDED_SCORE: -10..10 | none
REASONING: one paragraph
"#;

/// Adversarial review of a reconciled verdict.
pub const STRESS_TEST_SYSTEM_PROMPT: &str = r#"
## Task: stress test a verdict

Attack the verdict below as a capable skeptic would. Find the strongest
counterarguments and the weakest link in its evidence.

## Output Format
First a JSON block:
```json
{
  "counterarguments": ["..."],
  "robustness": 0.0-1.0,
  "weakest_point": "..." | null
}
```
Then, after the block, a short narrative for the asker explaining how well
the verdict holds up.
"#;

/// Track-specific direction appended to the assessment request.
pub fn track_guidance(track: Track) -> &'static str {
    match track {
        Track::FactualVerification => {
            "Verify the factual content. Score how well the evidence supports it."
        }
        Track::NormativeExploration => {
            "Lay out the strongest versions of the competing positions. Score only the \
             factual premises the positions rest on."
        }
        Track::NormativeExplorationDefensive => {
            "The framing uses weaponized communication. Name the techniques without \
             mirroring them, then score the factual premises underneath."
        }
        Track::NormativeExplorationMirrored => {
            "The factual position may be sound but is delivered with contempt. Score the \
             facts fairly and note how the framing would land with someone who disagrees."
        }
    }
}

fn pass_guidance(pass: AssessmentPass) -> &'static str {
    match pass {
        AssessmentPass::Initial => "This is the initial assessment.",
        AssessmentPass::Verify => {
            "This is an independent verify pass. Reach your own conclusion from the \
             evidence; another assessor is working on the same claim separately."
        }
    }
}

fn claim_block(claim: &ClaimInput) -> String {
    match claim.context() {
        Some(context) => format!("CLAIM:\n{}\n\nCONTEXT:\n{}", claim.text(), context),
        None => format!("CLAIM:\n{}", claim.text()),
    }
}

fn record_block(label: &str, record: &AssessmentRecord) -> String {
    let integrity = record
        .integrity_score
        .map_or_else(|| "n/a".to_string(), |v| v.to_string());
    let patterns = if record.distortion_patterns.is_empty() {
        "none".to_string()
    } else {
        record.distortion_patterns.join(", ")
    };
    format!(
        "ASSESSMENT {}:\nreality_score: {}\nintegrity_score: {}\ndistortion_patterns: {}\nrationale:\n{}",
        label, record.reality_score, integrity, patterns, record.rationale
    )
}

pub fn classification_messages(claim: &ClaimInput) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CLASSIFY_SYSTEM_PROMPT),
        ChatMessage::user(claim_block(claim)),
    ]
}

pub fn assessment_messages(
    claim: &ClaimInput,
    track: Track,
    pass: AssessmentPass,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ASSESS_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "TRACK: {}\nPASS: {}\n{}\n{}\n\n{}",
            track,
            pass.as_str(),
            track_guidance(track),
            pass_guidance(pass),
            claim_block(claim)
        )),
    ]
}

pub fn adjudication_messages(
    claim: &ClaimInput,
    a: &AssessmentRecord,
    b: &AssessmentRecord,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ADJUDICATE_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "{}\n\n{}\n\n{}",
            claim_block(claim),
            record_block("A", a),
            record_block("B", b)
        )),
    ]
}

pub fn stress_test_messages(claim: &ClaimInput, verdict: &Verdict) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(STRESS_TEST_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "{}\n\nVERDICT:\ntrack: {}\nfinal_score: {}\nrationale:\n{}",
            claim_block(claim),
            verdict.track,
            verdict.final_score,
            verdict.initial.rationale
        )),
    ]
}
