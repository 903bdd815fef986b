//! Learning State
//!
//! The record threaded through every stage of a checkpoint. Stages never
//! mutate it directly: each one returns a [`StateUpdate`] and the orchestrator
//! merges it with [`LearningState::apply`].

use serde::{Deserialize, Serialize};

/// The understanding score at or above which a checkpoint is mastered.
pub const MASTERY_THRESHOLD: u8 = 70;

/// The assessment material currently staged for the learner.
///
/// A remediation explanation and a block of multiple-choice questions share
/// the same slot in the state; the variant says which one it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum QuestionSet {
    /// Five numbered multiple-choice questions, no answer key.
    Assessment(String),
    /// A simplified Feynman-style explanation produced after a failed attempt.
    Remediation(String),
}

impl QuestionSet {
    /// Prefix used by the flat string encoding of a remediation entry.
    pub const REMEDIATION_MARKER: &'static str = "FEYNMAN_PHASE|";

    pub fn text(&self) -> &str {
        match self {
            QuestionSet::Assessment(text) | QuestionSet::Remediation(text) => text,
        }
    }

    pub fn is_remediation(&self) -> bool {
        matches!(self, QuestionSet::Remediation(_))
    }

    /// Encodes the entry as a single string, marking remediation text with
    /// [`Self::REMEDIATION_MARKER`].
    pub fn to_tagged(&self) -> String {
        match self {
            QuestionSet::Assessment(text) => text.clone(),
            QuestionSet::Remediation(text) => format!("{}{}", Self::REMEDIATION_MARKER, text),
        }
    }

    /// Decodes the flat string form produced by [`Self::to_tagged`].
    pub fn from_tagged(raw: &str) -> Self {
        match raw.strip_prefix(Self::REMEDIATION_MARKER) {
            Some(explanation) => QuestionSet::Remediation(explanation.to_string()),
            None => QuestionSet::Assessment(raw.to_string()),
        }
    }
}

/// Mutable record for a single topic checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningState {
    /// The topic being studied. Set once at checkpoint start.
    pub topic: String,
    /// Free-text learning goals for the topic. Set once at checkpoint start.
    pub objectives: String,
    /// Study material produced by the gatherer. May hold the gatherer's error sentinel.
    pub gathered_context: String,
    /// 1..=5 relevance judgment of `gathered_context`; 0 until the first validation.
    pub relevance_score: u8,
    /// Number of validation passes run so far.
    pub search_retry_count: u32,
    /// At most one entry in normal operation.
    pub questions: Vec<QuestionSet>,
    /// The learner's free-text answers. Empty while no answer is pending grading.
    pub learner_answers: String,
    /// 0..=100 percentage from the last verification; 0 until the first one.
    pub understanding_score: u8,
}

impl LearningState {
    /// Creates the fresh state for a checkpoint.
    pub fn new(topic: impl Into<String>, objectives: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            objectives: objectives.into(),
            gathered_context: String::new(),
            relevance_score: 0,
            search_retry_count: 0,
            questions: Vec::new(),
            learner_answers: String::new(),
            understanding_score: 0,
        }
    }

    /// Merges a partial update, overwriting only the fields it carries.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            gathered_context,
            relevance_score,
            search_retry_count,
            questions,
            learner_answers,
            understanding_score,
        } = update;

        if let Some(value) = gathered_context {
            self.gathered_context = value;
        }
        if let Some(value) = relevance_score {
            self.relevance_score = value;
        }
        if let Some(value) = search_retry_count {
            self.search_retry_count = value;
        }
        if let Some(value) = questions {
            self.questions = value;
        }
        if let Some(value) = learner_answers {
            self.learner_answers = value;
        }
        if let Some(value) = understanding_score {
            self.understanding_score = value;
        }
    }

    pub fn has_answers(&self) -> bool {
        !self.learner_answers.is_empty()
    }

    /// The entry currently staged in `questions`, if any.
    pub fn staged_questions(&self) -> Option<&QuestionSet> {
        self.questions.first()
    }

    /// True when questions are staged and the learner has not answered them yet.
    pub fn is_awaiting_answers(&self) -> bool {
        !self.questions.is_empty() && self.learner_answers.is_empty()
    }

    pub fn has_mastery(&self) -> bool {
        self.understanding_score >= MASTERY_THRESHOLD
    }
}

/// A partial update returned by a stage. `None` fields leave the state untouched.
///
/// `topic` and `objectives` are absent: no stage may change them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub gathered_context: Option<String>,
    pub relevance_score: Option<u8>,
    pub search_retry_count: Option<u32>,
    pub questions: Option<Vec<QuestionSet>>,
    pub learner_answers: Option<String>,
    pub understanding_score: Option<u8>,
}

impl StateUpdate {
    /// An update that only records learner answers.
    pub fn answers(answers: impl Into<String>) -> Self {
        Self {
            learner_answers: Some(answers.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_blank() {
        let state = LearningState::new("Backpropagation", "Chain rule");

        assert_eq!(state.topic, "Backpropagation");
        assert_eq!(state.objectives, "Chain rule");
        assert!(state.gathered_context.is_empty());
        assert_eq!(state.relevance_score, 0);
        assert_eq!(state.search_retry_count, 0);
        assert!(state.questions.is_empty());
        assert!(!state.has_answers());
        assert_eq!(state.understanding_score, 0);
        assert!(!state.is_awaiting_answers());
    }

    #[test]
    fn test_apply_overwrites_only_present_fields() {
        let mut state = LearningState::new("Dropout", "Overfitting");
        state.gathered_context = "old context".to_string();
        state.understanding_score = 45;

        state.apply(StateUpdate {
            relevance_score: Some(4),
            search_retry_count: Some(2),
            ..Default::default()
        });

        assert_eq!(state.gathered_context, "old context");
        assert_eq!(state.understanding_score, 45);
        assert_eq!(state.relevance_score, 4);
        assert_eq!(state.search_retry_count, 2);
    }

    #[test]
    fn test_apply_can_clear_fields() {
        let mut state = LearningState::new("Dropout", "Overfitting");
        state.learner_answers = "1.A".to_string();
        state.questions = vec![QuestionSet::Assessment("1. Q".to_string())];

        state.apply(StateUpdate {
            learner_answers: Some(String::new()),
            questions: Some(Vec::new()),
            ..Default::default()
        });

        assert!(!state.has_answers());
        assert!(state.questions.is_empty());
    }

    #[test]
    fn test_awaiting_answers_requires_questions_and_no_answers() {
        let mut state = LearningState::new("CNN", "Kernels");
        state.questions = vec![QuestionSet::Assessment("1. Q".to_string())];
        assert!(state.is_awaiting_answers());

        state.apply(StateUpdate::answers("1.B"));
        assert!(!state.is_awaiting_answers());
    }

    #[test]
    fn test_mastery_threshold_boundary() {
        let mut state = LearningState::new("CNN", "Kernels");
        state.understanding_score = 69;
        assert!(!state.has_mastery());
        state.understanding_score = 70;
        assert!(state.has_mastery());
    }

    #[test]
    fn test_remediation_tagging() {
        let remediation = QuestionSet::Remediation("Think of it like a ramp.".to_string());
        let tagged = remediation.to_tagged();

        assert!(tagged.starts_with("FEYNMAN_PHASE|"));
        assert_eq!(QuestionSet::from_tagged(&tagged), remediation);
        assert!(remediation.is_remediation());
        assert_eq!(remediation.text(), "Think of it like a ramp.");
    }

    #[test]
    fn test_assessment_is_never_tagged() {
        let assessment = QuestionSet::Assessment("1. What is a kernel?".to_string());

        assert!(!assessment.to_tagged().contains(QuestionSet::REMEDIATION_MARKER));
        assert!(!assessment.is_remediation());
        assert_eq!(QuestionSet::from_tagged("1. What is a kernel?"), assessment);
    }

    #[test]
    fn test_question_set_serialization() {
        let json = serde_json::to_value(QuestionSet::Remediation("simple".into())).unwrap();
        assert_eq!(json["kind"], "remediation");
        assert_eq!(json["text"], "simple");
    }
}
