//! Checkpoint Stages
//!
//! One async function per stage. Each reads the current [`LearningState`],
//! calls its collaborator, and returns a [`StateUpdate`] for the orchestrator
//! to merge. Collaborator failures are absorbed here and replaced by the
//! conservative defaults, so the machine always has well-typed fields to
//! route on.

use tracing::{info, warn};

use crate::gatherer::ContentGatherer;
use crate::llm_client::{RemediationRequest, TutorBackend};
use crate::markers;
use crate::state::{LearningState, QuestionSet, StateUpdate};

/// Explanation staged when the remediation backend is unavailable.
pub const FALLBACK_EXPLANATION: &str = "A simplified explanation could not be generated this time. \
Re-read the study material, focusing on the objectives you were unsure about, then try the assessment again.";

pub async fn gather(state: &LearningState, gatherer: &dyn ContentGatherer) -> StateUpdate {
    let context = gatherer.gather(&state.topic, &state.objectives).await;
    StateUpdate {
        gathered_context: Some(context),
        ..Default::default()
    }
}

/// Scores the relevance of the gathered material and spends one unit of retry budget.
pub async fn validate(state: &LearningState, backend: &dyn TutorBackend) -> StateUpdate {
    let retries = state.search_retry_count + 1;

    let score = match backend
        .judge_relevance(&state.topic, &state.objectives, &state.gathered_context)
        .await
    {
        Ok(judgment) => markers::relevance_score(&judgment),
        Err(e) => {
            warn!(topic = %state.topic, error = %e, "Relevance judgment failed");
            markers::DEFAULT_RELEVANCE
        }
    };

    info!(topic = %state.topic, score, retries, "Context relevance scored");
    StateUpdate {
        relevance_score: Some(score),
        search_retry_count: Some(retries),
        ..Default::default()
    }
}

/// Stages a fresh assessment. A failed or empty generation stages nothing.
pub async fn generate_questions(state: &LearningState, backend: &dyn TutorBackend) -> StateUpdate {
    info!(topic = %state.topic, "Generating assessment");

    let questions = match backend
        .generate_questions(&state.gathered_context, &state.topic, &state.objectives)
        .await
    {
        Ok(text) if !text.trim().is_empty() => vec![QuestionSet::Assessment(text)],
        Ok(_) => {
            warn!(topic = %state.topic, "Question backend returned no text");
            Vec::new()
        }
        Err(e) => {
            warn!(topic = %state.topic, error = %e, "Question generation failed");
            Vec::new()
        }
    };

    StateUpdate {
        questions: Some(questions),
        ..Default::default()
    }
}

/// Grades the pending answers into an understanding percentage.
pub async fn verify(state: &LearningState, backend: &dyn TutorBackend) -> StateUpdate {
    let questions = staged_text(state);

    let score = match backend
        .grade(&state.gathered_context, &questions, &state.learner_answers)
        .await
    {
        Ok(grading) => markers::understanding_score(&grading),
        Err(e) => {
            warn!(topic = %state.topic, error = %e, "Grading failed");
            markers::DEFAULT_UNDERSTANDING
        }
    };

    info!(topic = %state.topic, score, "Answers verified");
    StateUpdate {
        understanding_score: Some(score),
        ..Default::default()
    }
}

/// Replaces the staged questions with a Feynman explanation and clears the answers.
///
/// The understanding score is carried over unchanged; only a later
/// verification may change it.
pub async fn remediate(state: &LearningState, backend: &dyn TutorBackend) -> StateUpdate {
    info!(topic = %state.topic, score = state.understanding_score, "Below mastery threshold, re-teaching");

    let request = RemediationRequest {
        topic: state.topic.clone(),
        objectives: state.objectives.clone(),
        context: state.gathered_context.clone(),
        questions: staged_text(state),
        answers: state.learner_answers.clone(),
        score: state.understanding_score,
    };

    let explanation = match backend.explain(&request).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => FALLBACK_EXPLANATION.to_string(),
        Err(e) => {
            warn!(topic = %state.topic, error = %e, "Remediation failed");
            FALLBACK_EXPLANATION.to_string()
        }
    };

    StateUpdate {
        questions: Some(vec![QuestionSet::Remediation(explanation)]),
        learner_answers: Some(String::new()),
        understanding_score: Some(state.understanding_score),
        ..Default::default()
    }
}

fn staged_text(state: &LearningState) -> String {
    state
        .questions
        .iter()
        .map(QuestionSet::text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatherer::MockContentGatherer;
    use crate::llm_client::MockTutorBackend;
    use anyhow::anyhow;

    fn assessed_state() -> LearningState {
        let mut state = LearningState::new("Backpropagation", "Chain rule, Loss function");
        state.gathered_context = "## Backpropagation - Study Guide".to_string();
        state.relevance_score = 5;
        state.search_retry_count = 1;
        state.questions = vec![QuestionSet::Assessment("1. What is...".to_string())];
        state
    }

    #[tokio::test]
    async fn test_gather_sets_context_only() {
        let mut gatherer = MockContentGatherer::new();
        gatherer
            .expect_gather()
            .withf(|topic, objectives| topic == "Backpropagation" && objectives == "Chain rule")
            .times(1)
            .returning(|_, _| "material".to_string());

        let state = LearningState::new("Backpropagation", "Chain rule");
        let update = gather(&state, &gatherer).await;

        assert_eq!(
            update,
            StateUpdate {
                gathered_context: Some("material".to_string()),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_validate_parses_score_and_increments_retries() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_judge_relevance()
            .returning(|_, _, _| Ok("Covers everything.\nFINAL_SCORE: 4".to_string()));

        let mut state = LearningState::new("Backpropagation", "Chain rule");
        state.search_retry_count = 1;
        let update = validate(&state, &backend).await;

        assert_eq!(update.relevance_score, Some(4));
        assert_eq!(update.search_retry_count, Some(2));
        assert!(update.gathered_context.is_none());
    }

    #[tokio::test]
    async fn test_validate_defaults_on_backend_failure() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_judge_relevance()
            .returning(|_, _, _| Err(anyhow!("timeout")));

        let state = LearningState::new("Backpropagation", "Chain rule");
        let update = validate(&state, &backend).await;

        assert_eq!(update.relevance_score, Some(1));
        assert_eq!(update.search_retry_count, Some(1));
    }

    #[tokio::test]
    async fn test_validate_is_idempotent_apart_from_retry_count() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_judge_relevance()
            .times(3)
            .returning(|_, _, _| Ok("FINAL_SCORE: 3".to_string()));

        let mut state = LearningState::new("Gradient Descent", "Learning rate");
        state.gathered_context = "unchanged".to_string();
        for expected_retries in 1..=3 {
            let update = validate(&state, &backend).await;
            state.apply(update);
            assert_eq!(state.relevance_score, 3);
            assert_eq!(state.search_retry_count, expected_retries);
        }
    }

    #[tokio::test]
    async fn test_generate_questions_stages_untagged_assessment() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_generate_questions()
            .withf(|context, topic, _| context.contains("Study Guide") && topic == "Backpropagation")
            .returning(|_, _, _| Ok("1. Q\n   A) a\n   B) b".to_string()));

        let update = generate_questions(&assessed_state(), &backend).await;
        let questions = update.questions.unwrap();

        assert_eq!(questions.len(), 1);
        assert!(!questions[0].is_remediation());
        assert!(!questions[0].to_tagged().starts_with(QuestionSet::REMEDIATION_MARKER));
    }

    #[tokio::test]
    async fn test_generate_questions_failure_stages_nothing() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_generate_questions()
            .returning(|_, _, _| Err(anyhow!("quota exceeded")));

        let update = generate_questions(&assessed_state(), &backend).await;
        assert_eq!(update.questions, Some(vec![]));
    }

    #[tokio::test]
    async fn test_verify_parses_percentage() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_grade()
            .withf(|_, questions, answers| questions == "1. What is..." && answers == "1.A")
            .returning(|_, _, _| Ok("FINAL_PERCENTAGE: 80".to_string()));

        let mut state = assessed_state();
        state.learner_answers = "1.A".to_string();
        let update = verify(&state, &backend).await;

        assert_eq!(update.understanding_score, Some(80));
        assert!(update.learner_answers.is_none());
    }

    #[tokio::test]
    async fn test_verify_defaults_to_zero() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_grade()
            .returning(|_, _, _| Ok("Great effort!".to_string()));

        let mut state = assessed_state();
        state.learner_answers = "1.A".to_string();
        assert_eq!(verify(&state, &backend).await.understanding_score, Some(0));
    }

    #[tokio::test]
    async fn test_remediation_tags_explanation_and_clears_answers() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_explain()
            .withf(|req| req.score == 45 && req.answers == "1.A,2.B,3.C,4.D,5.A")
            .times(1)
            .returning(|_| Ok("Imagine a row of dominoes...".to_string()));

        let mut state = assessed_state();
        state.understanding_score = 45;
        state.learner_answers = "1.A,2.B,3.C,4.D,5.A".to_string();
        state.apply(remediate(&state, &backend).await);

        assert_eq!(state.learner_answers, "");
        assert_eq!(state.understanding_score, 45);
        assert_eq!(state.questions.len(), 1);
        assert!(state.questions[0].to_tagged().starts_with("FEYNMAN_PHASE|"));
        assert_eq!(state.questions[0].text(), "Imagine a row of dominoes...");
    }

    #[tokio::test]
    async fn test_remediation_failure_still_tags_and_clears() {
        let mut backend = MockTutorBackend::new();
        backend
            .expect_explain()
            .returning(|_| Err(anyhow!("connection reset")));

        let mut state = assessed_state();
        state.understanding_score = 20;
        state.learner_answers = "1.B".to_string();
        let update = remediate(&state, &backend).await;

        assert_eq!(
            update.questions,
            Some(vec![QuestionSet::Remediation(FALLBACK_EXPLANATION.to_string())])
        );
        assert_eq!(update.learner_answers, Some(String::new()));
        assert_eq!(update.understanding_score, Some(20));
    }
}
