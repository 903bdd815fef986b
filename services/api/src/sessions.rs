//! In-memory learner sessions.
//!
//! Each session walks its own [`LearningPath`] and owns the
//! [`CheckpointSession`] of the current checkpoint. Sessions sit behind their
//! own mutex, so one learner's grading never blocks another's.

use chrono::{DateTime, Utc};
use mastery_core::{
    CheckpointOutcome, CheckpointReport, CheckpointSession, LearningPath, Step, Tutor,
    gatherer::is_degraded, orchestrator::SubmitError,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{
    CheckpointResult, CheckpointStatus, CheckpointView, SessionSummary, SessionView, reason_label,
};

/// One learner's progress through a learning path.
pub struct LearnerSession {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    path: LearningPath,
    current: Option<CheckpointSession>,
    reports: Vec<CheckpointReport>,
}

impl LearnerSession {
    pub fn new(user_id: impl Into<String>, path: LearningPath) -> Self {
        let now = Utc::now();
        let current = path.current().cloned().map(CheckpointSession::new);
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            path,
            current,
            reports: Vec::new(),
        }
    }

    /// Runs the current checkpoint up to its next suspension point.
    pub async fn advance(&mut self, tutor: &Tutor) -> Option<Step> {
        let current = self.current.as_mut()?;
        let step = tutor.advance(current).await;
        self.updated_at = Utc::now();
        Some(step)
    }

    pub fn submit_answers(&mut self, answers: &str) -> Result<(), SubmitError> {
        let current = self.current.as_mut().ok_or(SubmitError::NotAwaiting)?;
        current.submit_answers(answers)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Closes the current checkpoint, abandoning it if unfinished, and moves to the next one.
    pub fn next_checkpoint(&mut self) {
        if let Some(mut finished) = self.current.take() {
            finished.abandon();
            self.reports.push(finished.report());
        }
        self.path.advance();
        self.current = self.path.current().cloned().map(CheckpointSession::new);
        self.updated_at = Utc::now();
    }

    pub fn current(&self) -> Option<&CheckpointSession> {
        self.current.as_ref()
    }

    pub fn reports(&self) -> &[CheckpointReport] {
        &self.reports
    }

    pub fn is_complete(&self) -> bool {
        self.path.is_complete()
    }

    pub fn view(&self) -> SessionView {
        let (completed, total) = self.path.progress();
        SessionView {
            id: self.id,
            completed,
            total,
            current: self
                .current
                .as_ref()
                .map(|session| checkpoint_view(session, self.path.index())),
            results: self.reports.iter().map(checkpoint_result).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let (completed, total) = self.path.progress();
        SessionSummary {
            id: self.id,
            current_topic: self.current.as_ref().map(|s| s.checkpoint().topic.clone()),
            completed,
            total,
            mastered: self
                .reports
                .iter()
                .filter(|r| r.outcome.is_mastered())
                .count(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn status_of(outcome: Option<CheckpointOutcome>, awaiting: bool) -> (CheckpointStatus, Option<String>) {
    match outcome {
        Some(CheckpointOutcome::Mastered { .. }) => (CheckpointStatus::Mastered, None),
        Some(CheckpointOutcome::Incomplete { reason }) => {
            (CheckpointStatus::Incomplete, Some(reason_label(reason)))
        }
        None if awaiting => (CheckpointStatus::AwaitingAnswers, None),
        None => (CheckpointStatus::InProgress, None),
    }
}

fn checkpoint_view(session: &CheckpointSession, index: usize) -> CheckpointView {
    let state = session.state();
    let awaiting = !session.is_finished() && state.is_awaiting_answers();
    let (status, incomplete_reason) = status_of(session.outcome(), awaiting);
    CheckpointView {
        topic: session.checkpoint().topic.clone(),
        objectives: session.checkpoint().objectives.clone(),
        index,
        status,
        study_material: state.gathered_context.clone(),
        material_unavailable: is_degraded(&state.gathered_context),
        questions: awaiting
            .then(|| state.staged_questions().map(|q| q.text().to_string()))
            .flatten(),
        explanation: session.pending_explanation().map(str::to_string),
        last_score: state.understanding_score,
        attempts: session.attempts(),
        remediation_rounds: session.remediation_rounds(),
        incomplete_reason,
    }
}

fn checkpoint_result(report: &CheckpointReport) -> CheckpointResult {
    let (status, incomplete_reason) = status_of(Some(report.outcome), false);
    CheckpointResult {
        topic: report.checkpoint.topic.clone(),
        status,
        final_score: report.final_score,
        attempts: report.attempts,
        remediation_rounds: report.remediation_rounds,
        incomplete_reason,
    }
}

struct Entry {
    user_id: String,
    session: Arc<Mutex<LearnerSession>>,
}

/// All live sessions, keyed by id and scoped to their owner.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionStore {
    pub async fn insert(&self, session: LearnerSession) -> Arc<Mutex<LearnerSession>> {
        let id = session.id;
        let user_id = session.user_id.clone();
        let session = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            Entry {
                user_id,
                session: session.clone(),
            },
        );
        session
    }

    /// Returns the session only if it belongs to `user_id`.
    pub async fn get(&self, id: Uuid, user_id: &str) -> Option<Arc<Mutex<LearnerSession>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.session.clone())
    }

    pub async fn list(&self, user_id: &str) -> Vec<Arc<Mutex<LearnerSession>>> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.session.clone())
            .collect()
    }

    /// Drops the session if it belongs to `user_id`. Returns whether anything was removed.
    pub async fn remove(&self, id: Uuid, user_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            Some(entry) if entry.user_id == user_id => {
                sessions.remove(&id);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use mastery_core::{
        Catalog, Checkpoint,
        gatherer::{ContentGatherer, GATHER_ERROR_SENTINEL},
        llm_client::{RemediationRequest, TutorBackend},
    };

    struct StaticGatherer(&'static str);

    #[async_trait]
    impl ContentGatherer for StaticGatherer {
        async fn gather(&self, _: &str, _: &str) -> String {
            self.0.to_string()
        }
    }

    /// Grades every attempt with the same percentage.
    struct FixedGrade(u8);

    #[async_trait]
    impl TutorBackend for FixedGrade {
        async fn summarize(&self, _: &str, _: &str, raw: &str) -> Result<String> {
            Ok(raw.to_string())
        }
        async fn judge_relevance(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Ok("FINAL_SCORE: 5".to_string())
        }
        async fn generate_questions(&self, _: &str, topic: &str, _: &str) -> Result<String> {
            Ok(format!("1. What is {}?", topic))
        }
        async fn grade(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Ok(format!("FINAL_PERCENTAGE: {}", self.0))
        }
        async fn explain(&self, _: &RemediationRequest) -> Result<String> {
            Ok("Think of it like this...".to_string())
        }
    }

    fn tutor(material: &'static str, grade: u8) -> Tutor {
        Tutor::new(Arc::new(StaticGatherer(material)), Arc::new(FixedGrade(grade)))
    }

    fn two_step_path() -> LearningPath {
        LearningPath::new(
            Catalog::new(vec![
                Checkpoint::new("Backpropagation", "Chain rule"),
                Checkpoint::new("Regularization", "Dropout"),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_new_session_awaits_first_answers() {
        let tutor = tutor("## Study Guide", 90);
        let mut session = LearnerSession::new("learner-1", two_step_path());
        session.advance(&tutor).await;

        let view = session.view();
        let current = view.current.unwrap();
        assert_eq!((view.completed, view.total), (0, 2));
        assert_eq!(current.topic, "Backpropagation");
        assert_eq!(current.status, CheckpointStatus::AwaitingAnswers);
        assert_eq!(current.questions.as_deref(), Some("1. What is Backpropagation?"));
        assert!(!current.material_unavailable);
    }

    #[tokio::test]
    async fn test_answers_are_graded_and_checkpoint_mastered() {
        let tutor = tutor("## Study Guide", 90);
        let mut session = LearnerSession::new("learner-1", two_step_path());
        session.advance(&tutor).await;

        session.submit_answers("1.A").unwrap();
        let step = session.advance(&tutor).await;

        assert_eq!(step, Some(Step::Mastered { score: 90 }));
        let current = session.view().current.unwrap();
        assert_eq!(current.status, CheckpointStatus::Mastered);
        assert!(current.questions.is_none());
        assert_eq!(
            session.submit_answers("1.B"),
            Err(SubmitError::NotAwaiting)
        );
    }

    #[tokio::test]
    async fn test_failed_attempt_surfaces_explanation() {
        let tutor = tutor(GATHER_ERROR_SENTINEL, 20);
        let mut session = LearnerSession::new("learner-1", two_step_path());
        session.advance(&tutor).await;
        session.submit_answers("1.A").unwrap();
        session.advance(&tutor).await;

        let current = session.view().current.unwrap();
        assert!(current.material_unavailable);
        assert_eq!(current.status, CheckpointStatus::AwaitingAnswers);
        assert_eq!(current.explanation.as_deref(), Some("Think of it like this..."));
        assert_eq!(current.last_score, 20);
        assert_eq!(current.remediation_rounds, 1);
    }

    #[tokio::test]
    async fn test_next_checkpoint_abandons_unfinished_one() {
        let tutor = tutor("## Study Guide", 90);
        let mut session = LearnerSession::new("learner-1", two_step_path());
        session.advance(&tutor).await;

        session.next_checkpoint();
        session.advance(&tutor).await;

        let view = session.view();
        assert_eq!(view.completed, 1);
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].status, CheckpointStatus::Incomplete);
        assert_eq!(view.results[0].incomplete_reason.as_deref(), Some("abandoned"));
        assert_eq!(view.current.unwrap().topic, "Regularization");

        session.next_checkpoint();
        assert!(session.is_complete());
        assert!(session.view().current.is_none());
        assert_eq!(session.advance(&tutor).await, None);
    }

    #[tokio::test]
    async fn test_mastered_checkpoint_keeps_its_outcome_on_next() {
        let tutor = tutor("## Study Guide", 75);
        let mut session = LearnerSession::new("learner-1", two_step_path());
        session.advance(&tutor).await;
        session.submit_answers("1.A").unwrap();
        session.advance(&tutor).await;

        session.next_checkpoint();

        assert_eq!(session.reports()[0].outcome, CheckpointOutcome::Mastered { score: 75 });
        assert_eq!(session.summary().mastered, 1);
    }

    #[tokio::test]
    async fn test_store_scopes_sessions_by_user() {
        let store = SessionStore::default();
        let alice = store
            .insert(LearnerSession::new("alice", two_step_path()))
            .await;
        let alice_id = alice.lock().await.id;
        store
            .insert(LearnerSession::new("bob", two_step_path()))
            .await;

        assert!(store.get(alice_id, "alice").await.is_some());
        assert!(store.get(alice_id, "bob").await.is_none());
        assert!(store.get(Uuid::new_v4(), "alice").await.is_none());
        assert_eq!(store.list("alice").await.len(), 1);
        assert_eq!(store.list("carol").await.len(), 0);
    }

    #[tokio::test]
    async fn test_remove_only_drops_the_owners_session() {
        let store = SessionStore::default();
        let alice = store
            .insert(LearnerSession::new("alice", two_step_path()))
            .await;
        let alice_id = alice.lock().await.id;

        assert!(!store.remove(alice_id, "bob").await);
        assert!(store.get(alice_id, "alice").await.is_some());

        assert!(store.remove(alice_id, "alice").await);
        assert!(store.get(alice_id, "alice").await.is_none());
        assert!(store.list("alice").await.is_empty());
        assert!(!store.remove(alice_id, "alice").await);
    }
}
