//! Response selection policy
//!
//! Decides, per slide, whether Orik speaks and what he says. Pure given the
//! personality, a dig-line source, and an injectable RNG; every failure path
//! degrades to a silent verdict rather than an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::digs::DigLineSource;
use crate::{Error, Result};

/// Placeholder substituted with the combined span content in templates
const CONTENT_SLOT: &str = "{content}";

/// Template used when the personality carries no templates at all
const DEFAULT_TEMPLATE: &str = "Oh, {content}? How... enlightening, Aaron.";

/// Contextual fillers used when the dice say "speak" but "no dig".
///
/// Kept as data rather than branches so the policy stays tunable.
const CONTEXTUAL_FILLERS: &[&str] = &[
    "Hmm, interesting approach, Aaron.",
    "How... fascinating.",
    "Truly groundbreaking work here.",
    "I'm sure that made perfect sense to someone.",
];

/// What Orik says, or the decision to stay quiet.
///
/// An explicit variant rather than a sentinel string, so nothing downstream
/// can accidentally synthesize the words "stay silent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speech {
    Spoken(String),
    Silent,
}

impl Speech {
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }

    /// Spoken text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Spoken(text) => Some(text),
            Self::Silent => None,
        }
    }
}

impl std::fmt::Display for Speech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spoken(text) => f.write_str(text),
            Self::Silent => f.write_str("[SILENT]"),
        }
    }
}

/// How a response was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Reply to `[Orik]`-tagged speaker notes
    Tagged,
    /// Unprompted one-liner from the dig library
    RandomDig,
    /// Context-aware filler
    Contextual,
}

/// One decided response, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub speech: Speech,
    /// Confidence in the response, in `[0, 1]`
    pub confidence: f64,
    pub kind: ResponseKind,
    pub produced_at: DateTime<Utc>,
    /// The note content that prompted this response, if any
    pub source_text: Option<String>,
}

impl ResponseRecord {
    fn new(speech: Speech, confidence: f64, kind: ResponseKind, source: Option<String>) -> Self {
        Self {
            speech,
            confidence,
            kind,
            produced_at: Utc::now(),
            source_text: source,
        }
    }

    /// The silent verdict: kind Contextual, confidence zero
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Speech::Silent, 0.0, ResponseKind::Contextual, None)
    }
}

/// Personality knobs for the response policy.
///
/// Immutable once built; the orchestrator hot-swaps the whole value rather
/// than mutating fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityConfig {
    /// How cutting the sarcasm reads, in `[0, 1]`
    pub sarcasm_level: f64,
    /// Chance of speaking on an untagged slide, in `[0, 1]`
    pub interruption_frequency: f64,
    /// Chance an interruption is a dig rather than filler, in `[0, 1]`
    pub dig_probability: f64,
    /// Templates for tagged responses; `{content}` is the substitution slot
    pub response_templates: Vec<String>,
    /// Topics Orik will not touch
    pub forbidden_topics: Vec<String>,
}

impl PersonalityConfig {
    /// Build a config, validating that all three probabilities are in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if any probability falls outside `[0, 1]`.
    pub fn new(
        sarcasm_level: f64,
        interruption_frequency: f64,
        dig_probability: f64,
        response_templates: Vec<String>,
        forbidden_topics: Vec<String>,
    ) -> Result<Self> {
        for (name, value) in [
            ("sarcasm_level", sarcasm_level),
            ("interruption_frequency", interruption_frequency),
            ("dig_probability", dig_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Invalid(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        Ok(Self {
            sarcasm_level,
            interruption_frequency,
            dig_probability,
            response_templates,
            forbidden_topics,
        })
    }

    fn default_templates() -> Vec<String> {
        [
            "Oh {content}? How... groundbreaking, Aaron.",
            "Sure, let's all pretend {content} makes perfect sense.",
            "Wow Aaron, {content}. Revolutionary stuff from 2012.",
            "Another brilliant insight: {content}. Truly inspired.",
            "Oh please, continue with {content}. We're all fascinated.",
            "{content}? That's... actually not terrible. Wait, what am I saying?",
            "Let me guess, {content} is going to change everything, right Aaron?",
            "Ah yes, {content}. Because that's exactly what we needed to hear.",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn default_forbidden_topics() -> Vec<String> {
        ["personal information", "private data", "confidential", "password", "secret"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            sarcasm_level: 0.8,
            interruption_frequency: 0.3,
            dig_probability: 0.4,
            response_templates: Self::default_templates(),
            forbidden_topics: Self::default_forbidden_topics(),
        }
    }
}

/// Decides Orik's responses
pub struct ResponsePolicy {
    digs: Arc<dyn DigLineSource>,
}

impl ResponsePolicy {
    #[must_use]
    pub fn new(digs: Arc<dyn DigLineSource>) -> Self {
        Self { digs }
    }

    /// Decide a response with the thread-local RNG
    #[must_use]
    pub fn decide(
        &self,
        spans: &[String],
        context_hint: Option<&str>,
        personality: &PersonalityConfig,
    ) -> ResponseRecord {
        self.decide_with_rng(spans, context_hint, personality, &mut rand::thread_rng())
    }

    /// Decide a response with an injected RNG (deterministic in tests).
    ///
    /// Tagged content always wins; otherwise the interruption and dig dice
    /// run in that order. Never errors: malformed input degrades to the
    /// silent verdict.
    pub fn decide_with_rng<R: Rng>(
        &self,
        spans: &[String],
        context_hint: Option<&str>,
        personality: &PersonalityConfig,
        rng: &mut R,
    ) -> ResponseRecord {
        if !spans.is_empty() {
            return Self::tagged_response(spans, personality);
        }

        // Stay quiet unless the interruption die comes up
        if rng.gen_range(0.0..1.0) >= personality.interruption_frequency {
            return ResponseRecord::silent();
        }

        if rng.gen_range(0.0..1.0) < personality.dig_probability {
            let line = self.digs.next_line(context_hint);
            return ResponseRecord::new(Speech::Spoken(line), 0.6, ResponseKind::RandomDig, None);
        }

        let filler = CONTEXTUAL_FILLERS[rng.gen_range(0..CONTEXTUAL_FILLERS.len())];
        ResponseRecord::new(
            Speech::Spoken(filler.to_string()),
            0.6,
            ResponseKind::Contextual,
            context_hint.map(ToString::to_string),
        )
    }

    /// Substitute combined span content into the first template.
    ///
    /// Empty combined content and forbidden topics degrade to silent.
    fn tagged_response(spans: &[String], personality: &PersonalityConfig) -> ResponseRecord {
        let combined = spans.join(" ");
        if combined.trim().is_empty() {
            tracing::debug!("tagged content empty after joining, staying silent");
            return ResponseRecord::silent();
        }

        let lower = combined.to_lowercase();
        if let Some(topic) = personality
            .forbidden_topics
            .iter()
            .find(|t| lower.contains(&t.to_lowercase()))
        {
            tracing::debug!(topic = %topic, "tagged content touches forbidden topic");
            return ResponseRecord::silent();
        }

        let template = personality
            .response_templates
            .first()
            .map_or(DEFAULT_TEMPLATE, String::as_str);

        let text = if template.contains(CONTENT_SLOT) {
            template.replace(CONTENT_SLOT, &combined)
        } else {
            // A template with no slot cannot carry the content; fall back
            DEFAULT_TEMPLATE.replace(CONTENT_SLOT, &combined)
        };

        ResponseRecord::new(Speech::Spoken(text), 0.8, ResponseKind::Tagged, Some(combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct FixedDigs;

    impl DigLineSource for FixedDigs {
        fn next_line(&self, _context: Option<&str>) -> String {
            "a well-rehearsed dig".to_string()
        }

        fn reset_history(&self) {}
    }

    fn policy() -> ResponsePolicy {
        ResponsePolicy::new(Arc::new(FixedDigs))
    }

    fn personality(interrupt: f64, dig: f64) -> PersonalityConfig {
        PersonalityConfig {
            interruption_frequency: interrupt,
            dig_probability: dig,
            ..PersonalityConfig::default()
        }
    }

    #[test]
    fn tagged_spans_always_yield_tagged_at_point_eight() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(1);
        let spans = vec!["Aaron is about to explain serverless".to_string()];

        for (interrupt, dig) in [(0.0, 0.0), (1.0, 1.0), (0.5, 0.5)] {
            let record =
                policy.decide_with_rng(&spans, None, &personality(interrupt, dig), &mut rng);
            assert_eq!(record.kind, ResponseKind::Tagged);
            assert!((record.confidence - 0.8).abs() < f64::EPSILON);
            let text = record.speech.text().unwrap();
            assert!(text.contains("Aaron is about to explain serverless"));
        }
    }

    #[test]
    fn multiple_spans_join_with_single_space() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(2);
        let spans = vec!["first".to_string(), "second".to_string()];
        let record = policy.decide_with_rng(&spans, None, &PersonalityConfig::default(), &mut rng);
        assert_eq!(record.source_text.as_deref(), Some("first second"));
    }

    #[test]
    fn zero_interruption_frequency_is_always_silent() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(3);
        let config = personality(0.0, 1.0);

        for _ in 0..100 {
            let record = policy.decide_with_rng(&[], None, &config, &mut rng);
            assert!(record.speech.is_silent());
            assert!(record.confidence.abs() < f64::EPSILON);
            assert_eq!(record.kind, ResponseKind::Contextual);
        }
    }

    #[test]
    fn full_interruption_zero_dig_is_always_contextual_filler() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(4);
        let config = personality(1.0, 0.0);

        for _ in 0..100 {
            let record = policy.decide_with_rng(&[], None, &config, &mut rng);
            assert!(!record.speech.is_silent());
            assert_eq!(record.kind, ResponseKind::Contextual);
        }
    }

    #[test]
    fn full_interruption_full_dig_draws_from_dig_source() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(5);
        let config = personality(1.0, 1.0);

        let record = policy.decide_with_rng(&[], None, &config, &mut rng);
        assert_eq!(record.kind, ResponseKind::RandomDig);
        assert_eq!(record.speech.text(), Some("a well-rehearsed dig"));
    }

    #[test]
    fn empty_template_list_uses_default_template() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(6);
        let config = PersonalityConfig {
            response_templates: vec![],
            ..PersonalityConfig::default()
        };

        let spans = vec!["something".to_string()];
        let record = policy.decide_with_rng(&spans, None, &config, &mut rng);
        assert!(record.speech.text().unwrap().contains("something"));
    }

    #[test]
    fn slotless_template_degrades_to_default() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(7);
        let config = PersonalityConfig {
            response_templates: vec!["no slot here".to_string()],
            ..PersonalityConfig::default()
        };

        let spans = vec!["payload".to_string()];
        let record = policy.decide_with_rng(&spans, None, &config, &mut rng);
        assert!(record.speech.text().unwrap().contains("payload"));
    }

    #[test]
    fn whitespace_spans_degrade_to_silent() {
        // Extraction never produces these, but the policy must not panic
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(8);
        let spans = vec!["   ".to_string()];
        let record = policy.decide_with_rng(&spans, None, &PersonalityConfig::default(), &mut rng);
        assert!(record.speech.is_silent());
    }

    #[test]
    fn forbidden_topics_stay_silent() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(9);
        let spans = vec!["here is Aaron's password for everyone".to_string()];
        let record = policy.decide_with_rng(&spans, None, &PersonalityConfig::default(), &mut rng);
        assert!(record.speech.is_silent());
    }

    #[test]
    fn silent_displays_as_sentinel_for_logs_only() {
        assert_eq!(Speech::Silent.to_string(), "[SILENT]");
        assert!(Speech::Silent.text().is_none());
    }

    #[test]
    fn personality_rejects_out_of_range_probabilities() {
        assert!(PersonalityConfig::new(1.5, 0.0, 0.0, vec![], vec![]).is_err());
        assert!(PersonalityConfig::new(0.5, -0.1, 0.0, vec![], vec![]).is_err());
        assert!(PersonalityConfig::new(0.5, 0.3, 2.0, vec![], vec![]).is_err());
        assert!(PersonalityConfig::new(1.0, 0.0, 1.0, vec![], vec![]).is_ok());
    }
}
