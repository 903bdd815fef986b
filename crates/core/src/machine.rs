//! Checkpoint Progression Machine
//!
//! The pure control logic of a checkpoint: the phases a checkpoint moves
//! through, the two decision nodes (post-validation routing and the
//! post-verification mastery check), and the transition function tying them
//! together. Nothing here performs I/O; the orchestrator runs the stage that
//! belongs to each phase and asks [`transition`] where to go next.

use crate::state::{LearningState, MASTERY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relevance score at which gathered content is good enough to assess on.
pub const RELEVANCE_PASS_SCORE: u8 = 4;

/// Number of validation passes after which questions are generated regardless of relevance.
pub const MAX_SEARCH_RETRIES: u32 = 3;

/// Every position a checkpoint can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Gathering,
    Validating,
    Routing,
    GeneratingQuestions,
    AwaitingAnswer,
    Verifying,
    CheckingMastery,
    Remediating,
    Done,
}

impl Phase {
    /// Where a pass over `state` starts.
    ///
    /// A state that has never been validated starts from scratch. Anything else
    /// resumes at the routing node, so submitted answers go straight to grading.
    pub fn entry(state: &LearningState) -> Self {
        if state.search_retry_count == 0 {
            Phase::Gathering
        } else {
            Phase::Routing
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Gathering => "gathering",
            Phase::Validating => "validating",
            Phase::Routing => "routing",
            Phase::GeneratingQuestions => "generating_questions",
            Phase::AwaitingAnswer => "awaiting_answer",
            Phase::Verifying => "verifying",
            Phase::CheckingMastery => "checking_mastery",
            Phase::Remediating => "remediating",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of the post-validation decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Verify,
    GenerateQuestions,
    GatherAgain,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Verify => "verify",
            Route::GenerateQuestions => "generate_questions",
            Route::GatherAgain => "gather_again",
        }
    }
}

/// Outcome of the post-verification decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasteryDecision {
    Remediate,
    Done,
}

/// Decides what follows a validation pass.
pub fn route_after_validation(state: &LearningState) -> Route {
    if state.has_answers() {
        Route::Verify
    } else if state.relevance_score >= RELEVANCE_PASS_SCORE
        || state.search_retry_count >= MAX_SEARCH_RETRIES
    {
        Route::GenerateQuestions
    } else {
        Route::GatherAgain
    }
}

/// Decides what follows a verification pass.
///
/// Requiring answers guards against re-entry with a stale score and no fresh attempt.
pub fn check_mastery(state: &LearningState) -> MasteryDecision {
    if state.understanding_score < MASTERY_THRESHOLD && state.has_answers() {
        MasteryDecision::Remediate
    } else {
        MasteryDecision::Done
    }
}

/// The transition function. Returns `phase` itself when the machine halts there.
pub fn transition(phase: Phase, state: &LearningState) -> Phase {
    match phase {
        Phase::Gathering => Phase::Validating,
        Phase::Validating => Phase::Routing,
        Phase::Routing => match route_after_validation(state) {
            Route::Verify => Phase::Verifying,
            Route::GenerateQuestions => Phase::GeneratingQuestions,
            Route::GatherAgain => Phase::Gathering,
        },
        Phase::GeneratingQuestions => Phase::AwaitingAnswer,
        Phase::AwaitingAnswer => {
            if state.has_answers() {
                Phase::Verifying
            } else {
                Phase::AwaitingAnswer
            }
        }
        Phase::Verifying => Phase::CheckingMastery,
        Phase::CheckingMastery => match check_mastery(state) {
            MasteryDecision::Remediate => Phase::Remediating,
            MasteryDecision::Done => Phase::Done,
        },
        Phase::Remediating => Phase::GeneratingQuestions,
        Phase::Done => Phase::Done,
    }
}

/// True when [`transition`] would keep the machine at `phase`.
pub fn is_halted(phase: Phase, state: &LearningState) -> bool {
    transition(phase, state) == phase
}
