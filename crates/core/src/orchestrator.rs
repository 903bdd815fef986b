//! Checkpoint Orchestrator
//!
//! Drives a [`LearningState`] through the machine in [`crate::machine`].
//!
//! - A *pass* ([`Tutor::run_pass`]) runs stages from the entry phase until the
//!   machine halts, either waiting for answers or done. Inside [`Tutor::advance`]
//!   a pass also halts before remediating once the round budget is spent.
//! - [`Tutor::advance`] is one turn of the checkpoint loop. It returns at the
//!   learner boundary, so it can be driven by a blocking terminal loop
//!   ([`Tutor::run_checkpoint`]) or by request handlers that resume it later.
//! - [`Tutor::run_path`] walks a whole [`LearningPath`].

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::catalog::LearningPath;
use crate::gatherer::ContentGatherer;
use crate::learner::{AnswerPrompt, LearnerChannel};
use crate::llm_client::TutorBackend;
use crate::machine::{Phase, is_halted, transition};
use crate::stages;
use crate::state::{LearningState, QuestionSet, StateUpdate};
use crate::topic::Checkpoint;

/// Bounds on a single checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPolicy {
    /// Remediation rounds allowed before the checkpoint is given up. `None` is unbounded.
    pub max_remediation_rounds: Option<u32>,
    /// Times a scored attempt that left nothing staged may re-enter the machine.
    pub max_reentries: u32,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            max_remediation_rounds: Some(3),
            max_reentries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    /// Nothing staged and nothing scored; looping further would not progress.
    Stalled,
    /// Remediation budget exhausted without reaching mastery.
    RemediationLimit { rounds: u32 },
    /// The learner walked away.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckpointOutcome {
    Mastered { score: u8 },
    Incomplete { reason: IncompleteReason },
}

impl CheckpointOutcome {
    pub fn is_mastered(&self) -> bool {
        matches!(self, CheckpointOutcome::Mastered { .. })
    }
}

/// Where [`Tutor::advance`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Suspended at the learner boundary.
    AwaitingAnswers {
        questions: QuestionSet,
        explanation: Option<String>,
    },
    Mastered { score: u8 },
    Incomplete { reason: IncompleteReason },
}

impl From<CheckpointOutcome> for Step {
    fn from(outcome: CheckpointOutcome) -> Self {
        match outcome {
            CheckpointOutcome::Mastered { score } => Step::Mastered { score },
            CheckpointOutcome::Incomplete { reason } => Step::Incomplete { reason },
        }
    }
}

/// Trace of one pass through the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub visited: Vec<Phase>,
    pub halted_at: Phase,
    /// The explanation staged by this pass's remediation, if it ran.
    pub explanation: Option<String>,
    /// The machine wanted to remediate but the round budget was spent.
    pub remediation_blocked: bool,
}

impl PassReport {
    pub fn remediated(&self) -> bool {
        self.explanation.is_some()
    }

    pub fn verified(&self) -> bool {
        self.visited.contains(&Phase::Verifying)
    }
}

/// Why submitted answers were not recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("answers must not be blank")]
    Blank,
    #[error("no questions are waiting for answers")]
    NotAwaiting,
}

/// The summary of a finished checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointReport {
    pub checkpoint: Checkpoint,
    pub outcome: CheckpointOutcome,
    pub final_score: u8,
    pub attempts: u32,
    pub remediation_rounds: u32,
}

/// Per-checkpoint bookkeeping around a [`LearningState`].
#[derive(Debug, Clone)]
pub struct CheckpointSession {
    checkpoint: Checkpoint,
    state: LearningState,
    attempts: u32,
    remediation_rounds: u32,
    pending_explanation: Option<String>,
    outcome: Option<CheckpointOutcome>,
}

impl CheckpointSession {
    pub fn new(checkpoint: Checkpoint) -> Self {
        let state = LearningState::new(&checkpoint.topic, &checkpoint.objectives);
        Self {
            checkpoint,
            state,
            attempts: 0,
            remediation_rounds: 0,
            pending_explanation: None,
            outcome: None,
        }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn state(&self) -> &LearningState {
        &self.state
    }

    /// Number of graded attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remediation_rounds(&self) -> u32 {
        self.remediation_rounds
    }

    /// The latest explanation, until the learner answers the questions that follow it.
    pub fn pending_explanation(&self) -> Option<&str> {
        self.pending_explanation.as_deref()
    }

    pub fn outcome(&self) -> Option<CheckpointOutcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records the learner's answers for the staged questions.
    pub fn submit_answers(&mut self, answers: &str) -> Result<(), SubmitError> {
        if self.is_finished() || !self.state.is_awaiting_answers() {
            return Err(SubmitError::NotAwaiting);
        }
        let answers = answers.trim();
        if answers.is_empty() {
            return Err(SubmitError::Blank);
        }
        self.state.apply(StateUpdate::answers(answers));
        self.pending_explanation = None;
        Ok(())
    }

    /// Gives up on the checkpoint. No-op once it has finished.
    pub fn abandon(&mut self) {
        if !self.is_finished() {
            self.outcome = Some(CheckpointOutcome::Incomplete {
                reason: IncompleteReason::Abandoned,
            });
        }
    }

    /// Summarizes the checkpoint. An unfinished checkpoint reports as abandoned.
    pub fn report(&self) -> CheckpointReport {
        CheckpointReport {
            checkpoint: self.checkpoint.clone(),
            outcome: self.outcome.unwrap_or(CheckpointOutcome::Incomplete {
                reason: IncompleteReason::Abandoned,
            }),
            final_score: self.state.understanding_score,
            attempts: self.attempts,
            remediation_rounds: self.remediation_rounds,
        }
    }

    fn finish(&mut self, outcome: CheckpointOutcome) -> Step {
        self.outcome = Some(outcome);
        outcome.into()
    }

    fn awaiting_step(&self) -> Option<Step> {
        if !self.state.is_awaiting_answers() {
            return None;
        }
        self.state
            .staged_questions()
            .map(|questions| Step::AwaitingAnswers {
                questions: questions.clone(),
                explanation: self.pending_explanation.clone(),
            })
    }
}

/// The results of a whole learning path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathReport {
    pub reports: Vec<CheckpointReport>,
}

impl PathReport {
    pub fn mastered_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_mastered())
            .count()
    }
}

/// Runs checkpoints against a gatherer and a language backend.
pub struct Tutor {
    gatherer: Arc<dyn ContentGatherer>,
    backend: Arc<dyn TutorBackend>,
    policy: CheckpointPolicy,
}

impl Tutor {
    pub fn new(gatherer: Arc<dyn ContentGatherer>, backend: Arc<dyn TutorBackend>) -> Self {
        Self {
            gatherer,
            backend,
            policy: CheckpointPolicy::default(),
        }
    }

    pub fn with_policy(self, policy: CheckpointPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn policy(&self) -> &CheckpointPolicy {
        &self.policy
    }

    /// Runs the machine from its entry phase until it halts, merging every stage's update.
    pub async fn run_pass(&self, state: &mut LearningState) -> PassReport {
        self.drive(state, true).await
    }

    /// [`Tutor::run_pass`], optionally halting at `CheckingMastery` instead of
    /// entering `Remediating`.
    async fn drive(&self, state: &mut LearningState, remediation_allowed: bool) -> PassReport {
        let mut phase = Phase::entry(state);
        let mut visited = Vec::new();
        let mut explanation = None;
        let mut remediation_blocked = false;

        loop {
            debug!(%phase, topic = %state.topic, "Entering phase");
            visited.push(phase);

            let update = match phase {
                Phase::Gathering => Some(stages::gather(state, self.gatherer.as_ref()).await),
                Phase::Validating => Some(stages::validate(state, self.backend.as_ref()).await),
                Phase::GeneratingQuestions => {
                    Some(stages::generate_questions(state, self.backend.as_ref()).await)
                }
                Phase::Verifying => Some(stages::verify(state, self.backend.as_ref()).await),
                Phase::Remediating => {
                    let update = stages::remediate(state, self.backend.as_ref()).await;
                    explanation = update
                        .questions
                        .as_ref()
                        .and_then(|questions| questions.first())
                        .map(|questions| questions.text().to_string());
                    Some(update)
                }
                Phase::Routing | Phase::AwaitingAnswer | Phase::CheckingMastery | Phase::Done => {
                    None
                }
            };
            if let Some(update) = update {
                state.apply(update);
            }

            if is_halted(phase, state) {
                break;
            }
            let next = transition(phase, state);
            if next == Phase::Remediating && !remediation_allowed {
                remediation_blocked = true;
                break;
            }
            phase = next;
        }

        PassReport {
            visited,
            halted_at: phase,
            explanation,
            remediation_blocked,
        }
    }

    /// One turn of the checkpoint loop: runs passes until the checkpoint needs
    /// the learner or has finished.
    pub async fn advance(&self, session: &mut CheckpointSession) -> Step {
        if let Some(outcome) = session.outcome {
            return outcome.into();
        }
        if let Some(step) = session.awaiting_step() {
            return step;
        }

        let mut reentries = 0;
        loop {
            let remediation_allowed = self
                .policy
                .max_remediation_rounds
                .is_none_or(|limit| session.remediation_rounds < limit);
            let report = self.drive(&mut session.state, remediation_allowed).await;
            if report.verified() {
                session.attempts += 1;
            }
            if report.remediated() {
                session.remediation_rounds += 1;
                session.pending_explanation = report.explanation.clone();
            }

            let score = session.state.understanding_score;
            if session.state.has_mastery() {
                info!(topic = %session.checkpoint.topic, score, "Mastery achieved");
                return session.finish(CheckpointOutcome::Mastered { score });
            }

            if report.remediation_blocked {
                let rounds = session.remediation_rounds;
                warn!(topic = %session.checkpoint.topic, score, rounds, "Remediation limit reached");
                return session.finish(CheckpointOutcome::Incomplete {
                    reason: IncompleteReason::RemediationLimit { rounds },
                });
            }

            if let Some(step) = session.awaiting_step() {
                return step;
            }

            if score > 0 && reentries < self.policy.max_reentries {
                reentries += 1;
                warn!(topic = %session.checkpoint.topic, score, reentries, "Nothing staged after a scored attempt, re-entering");
                session.state.apply(StateUpdate::answers(""));
                continue;
            }

            warn!(topic = %session.checkpoint.topic, halted_at = %report.halted_at, "Checkpoint stalled");
            return session.finish(CheckpointOutcome::Incomplete {
                reason: IncompleteReason::Stalled,
            });
        }
    }

    /// Drives one checkpoint to completion, soliciting answers from `learner`.
    #[instrument(name = "checkpoint", skip_all, fields(topic = %checkpoint.topic))]
    pub async fn run_checkpoint(
        &self,
        checkpoint: Checkpoint,
        learner: &dyn LearnerChannel,
    ) -> Result<CheckpointReport> {
        info!("Starting checkpoint");
        let mut session = CheckpointSession::new(checkpoint);
        let mut material_shown = false;

        while let Step::AwaitingAnswers {
            questions,
            explanation,
        } = self.advance(&mut session).await
        {
            if !material_shown {
                learner
                    .present_material(&session.checkpoint, &session.state.gathered_context)
                    .await?;
                material_shown = true;
            }

            let prompt = AnswerPrompt {
                topic: session.checkpoint.topic.clone(),
                questions,
                explanation,
                last_score: session.state.understanding_score,
            };
            match learner.request_answers(&prompt).await? {
                Some(answers) => {
                    if let Err(e) = session.submit_answers(&answers) {
                        debug!(error = %e, "Answers not accepted, asking again");
                    }
                }
                None => {
                    info!("Learner abandoned the checkpoint");
                    session.abandon();
                }
            }
        }

        let report = session.report();
        info!(outcome = ?report.outcome, final_score = report.final_score, "Checkpoint finished");
        Ok(report)
    }

    /// Runs every remaining checkpoint of `path`, advancing it after each one.
    pub async fn run_path(
        &self,
        path: &mut LearningPath,
        learner: &dyn LearnerChannel,
    ) -> Result<PathReport> {
        let mut reports = Vec::new();
        while let Some(checkpoint) = path.current().cloned() {
            let report = self.run_checkpoint(checkpoint, learner).await?;
            learner.checkpoint_finished(&report).await?;
            reports.push(report);
            path.advance();
        }
        info!(checkpoints = reports.len(), "Learning path finished");
        Ok(PathReport { reports })
    }
}
