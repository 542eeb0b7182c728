//! Regex detectors for claim framing and communication signals.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Track;

lazy_static! {
    // Weaponized-communication signals: the frame is the attack, not the claim.
    static ref WEAPONIZED_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("contemptuous_dismissal", Regex::new(r"(?i)\b(only an? (idiot|moron|fool)|don'?t be (so )?(stupid|naive)|get a clue|laughable|give me a break|what a joke)\b").unwrap()),
        ("source_dismissal", Regex::new(r"(?i)\b(fake news|mainstream media|msm|lamestream|so-called experts?|the experts are (all )?(lying|wrong|bought)|scientists are (all )?(paid|bought|lying)|don'?t trust (the )?(media|experts|scientists))\b").unwrap()),
        ("tribal_loyalty", Regex::new(r"(?i)\b(real (americans|patriots|conservatives|liberals|progressives)|true patriots|our side|their side|with us or against us|us (vs\.?|versus) them|the (left|right) (always|never))\b").unwrap()),
        ("reality_distortion", Regex::new(r"(?i)\b(everyone knows|wake up|open your eyes|do your own research|they don'?t want you to know|sheeple)\b").unwrap()),
        ("talking_points", Regex::new(r"(?i)\b(end of (story|discussion)|full stop|case closed|facts don'?t care|not up for debate|educate yourself)\b").unwrap()),
    ];

    // Contempt toward people who disagree.
    static ref CONTEMPT_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("dehumanizing_language", Regex::new(r"(?i)\b(idiots|morons|imbeciles|subhuman|vermin|cavemen|braindead|brain-dead|knuckle-?draggers|flat-?earthers|science deniers)\b").unwrap()),
        ("rhetorical_incredulity", Regex::new(r"(?i)\bhow (can|could|do|does) (anyone|anybody|people|these people|they) (still )?(possibly )?(believe|think|deny|not see|not understand|be so)\b").unwrap()),
        ("superiority_framing", Regex::new(r"(?i)\b(anyone with (a brain|half a brain|basic intelligence|common sense)|smart people know|too (dumb|stupid) to|unlike (those|these) (idiots|people))\b").unwrap()),
    ];

    // The asker leans on evidence: the position may be supportable.
    static ref EVIDENCE_APPEAL: Regex = Regex::new(
        r"(?i)\b(scientific consensus|peer[- ]reviewed|studies (show|have shown|confirm)|the (data|evidence) (shows?|is clear|confirms?)|according to (the )?(data|research|census|cdc|who|nasa|bls)|well[- ]established)\b"
    ).unwrap();

    // Empirically checkable framing.
    static ref FACTUAL_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("truth_value_question", Regex::new(r"(?i)^\s*(is it true|did|does|do|is|are|was|were|has|have|had|will)\b[^?]*\?\s*$").unwrap()),
        ("statistic", Regex::new(r"(?i)(\d+(\.\d+)?\s*(%|percent|million|billion|thousand)|\b(rate|percentage|average|median|statistics?|gdp|unemployment|inflation|population|quarter|per capita)\b)").unwrap()),
        ("historical_or_scientific", Regex::new(r"(?i)\b(in (1[5-9]|20)\d{2}|history|historical(ly)?|scientific(ally)?|caused?|causes|invented|discovered|founded|vaccines?|climate|temperature|species|evolution|planet|moon|century)\b").unwrap()),
        ("verification_request", Regex::new(r"(?i)\b(fact[- ]check|true or false|is (this|that|it) (true|accurate|correct|real)|confidence score|check (the )?sources?|sources? check|verify|debunked?)\b").unwrap()),
    ];

    // Value-laden or contested framing.
    static ref NORMATIVE_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("ought_statement", Regex::new(r"(?i)\b(should|shouldn'?t|ought|must we|deserves?)\b").unwrap()),
        ("moral_language", Regex::new(r"(?i)\b(moral(ly|ity)?|immoral|ethic(s|al|ally)|unethical|fair|unfair|justice|unjust|right or wrong|wrong to|evil|acceptable)\b").unwrap()),
        ("contested_topic", Regex::new(r"(?i)\b(debate|controversial|contested|divisive|opinion|values)\b").unwrap()),
    ];

    // The asker's own uncertainty.
    static ref UNCERTAINTY_PATTERN: Regex = Regex::new(
        r"(?i)\b(i'?m not sure|i don'?t know (what|whether|if|how)|i'?m torn|conflicted|confused about|struggling with|what do you think|how should i (feel|think))\b"
    ).unwrap();
}

/// Signals found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalScan {
    /// Weaponized-communication labels
    pub weaponized: Vec<&'static str>,

    /// Contempt-toward-disagreers labels
    pub contempt: Vec<&'static str>,

    /// Whether the asker appeals to evidence
    pub evidence_appeal: bool,

    /// Factual-framing labels
    pub factual: Vec<&'static str>,

    /// Normative-framing labels
    pub normative: Vec<&'static str>,

    /// Whether the asker expresses their own uncertainty
    pub uncertainty: bool,
}

impl SignalScan {
    /// Run every detector over `text`.
    pub fn scan(text: &str) -> Self {
        Self {
            weaponized: labels_matching(&WEAPONIZED_PATTERNS, text),
            contempt: labels_matching(&CONTEMPT_PATTERNS, text),
            evidence_appeal: EVIDENCE_APPEAL.is_match(text),
            factual: labels_matching(&FACTUAL_PATTERNS, text),
            normative: labels_matching(&NORMATIVE_PATTERNS, text),
            uncertainty: UNCERTAINTY_PATTERN.is_match(text),
        }
    }

    /// Communication signal labels, weaponized first.
    pub fn communication_labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.weaponized.iter().chain(self.contempt.iter()).copied()
    }

    /// Exploration variant the communication signals call for, if any.
    ///
    /// Weaponized signals mean defensive. Contempt alone means mirrored when
    /// the asker leans on evidence (right but not reaching anyone), and
    /// defensive when contempt is the whole frame.
    pub fn escalation(&self) -> Option<Track> {
        if !self.weaponized.is_empty() {
            return Some(Track::NormativeExplorationDefensive);
        }
        if !self.contempt.is_empty() {
            return Some(if self.evidence_appeal {
                Track::NormativeExplorationMirrored
            } else {
                Track::NormativeExplorationDefensive
            });
        }
        None
    }

    /// Weight of evidence for an exploration framing.
    pub fn normative_weight(&self) -> usize {
        self.normative.len()
            + usize::from(self.uncertainty)
            + usize::from(!self.weaponized.is_empty() || !self.contempt.is_empty())
    }

    /// Weight of evidence for a verification framing.
    pub fn factual_weight(&self) -> usize {
        self.factual.len()
    }
}

fn labels_matching(patterns: &[(&'static str, Regex)], text: &str) -> Vec<&'static str> {
    patterns
        .iter()
        .filter(|(_, regex)| regex.is_match(text))
        .map(|(label, _)| *label)
        .collect()
}
