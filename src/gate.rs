//! Refusal gating of generated answers.
//!
//! A two-state policy: an answer is either `Grounded` (derived from the
//! supplied context) or `Refused` (insufficient grounding). The gate refuses
//! when retrieval found nothing, or when the raw model output contains one
//! of the configured refusal phrases (case-insensitive substring match). On
//! refusal it emits a canned message instead of the raw output, so the model
//! cannot fabricate an answer when retrieval found nothing relevant.
//!
//! Substring matching is a heuristic with known false positives: a
//! legitimate answer that merely contains "抱歉" in passing will be
//! reclassified as a refusal. It is kept as an explicit, configurable policy
//! rather than inline string checks; tightening it (e.g. relying on a
//! similarity floor alone) is a policy change, not a code rewrite.

use crate::config::GateConfig;

/// Classification of a model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Grounded,
    Refused,
}

/// Configurable refusal-detection policy.
#[derive(Debug, Clone)]
pub struct RefusalPolicy {
    /// Lowercased refusal phrases, matched as substrings.
    phrases: Vec<String>,
    refusal_message: String,
}

impl RefusalPolicy {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            phrases: config
                .refusal_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            refusal_message: config.refusal_message.clone(),
        }
    }

    /// The canned, user-facing refusal text.
    pub fn refusal_message(&self) -> &str {
        &self.refusal_message
    }

    /// Classify a raw model answer against the phrase list.
    pub fn classify(&self, raw_answer: &str) -> Verdict {
        let lowered = raw_answer.to_lowercase();
        if self.phrases.iter().any(|p| lowered.contains(p.as_str())) {
            Verdict::Refused
        } else {
            Verdict::Grounded
        }
    }
}

impl Default for RefusalPolicy {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_answer_passes() {
        let policy = RefusalPolicy::default();
        assert_eq!(
            policy.classify("掷出双数后可以再掷一次骰子。"),
            Verdict::Grounded
        );
    }

    #[test]
    fn chinese_refusal_phrase_is_detected() {
        let policy = RefusalPolicy::default();
        assert_eq!(policy.classify("抱歉，找不到相关信息"), Verdict::Refused);
        assert_eq!(policy.classify("文档中没有提到这一点。"), Verdict::Refused);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let policy = RefusalPolicy::default();
        assert_eq!(
            policy.classify("The answer was NOT FOUND in the context."),
            Verdict::Refused
        );
    }

    #[test]
    fn custom_phrase_list_replaces_defaults() {
        let config = GateConfig {
            refusal_phrases: vec!["beats me".to_string()],
            refusal_message: "nothing here".to_string(),
        };
        let policy = RefusalPolicy::new(&config);
        assert_eq!(policy.classify("Beats me, honestly."), Verdict::Refused);
        // Default phrases no longer apply.
        assert_eq!(policy.classify("not found"), Verdict::Grounded);
        assert_eq!(policy.refusal_message(), "nothing here");
    }

    #[test]
    fn known_false_positive_is_a_documented_tradeoff() {
        // An otherwise-grounded answer containing a phrase in passing is
        // still reclassified; the policy is substring-based by design.
        let policy = RefusalPolicy::default();
        assert_eq!(
            policy.classify("规则写明：说\"抱歉\"后移回原位。"),
            Verdict::Refused
        );
    }
}
