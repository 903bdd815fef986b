//! The out-of-band channel to the learner.
//!
//! The orchestrator never blocks on anything but this trait: it shows study
//! material and staged questions, then waits for an answer string.

use anyhow::Result;
use async_trait::async_trait;

use crate::orchestrator::CheckpointReport;
use crate::state::QuestionSet;
use crate::topic::Checkpoint;

/// What the learner sees when asked for answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPrompt {
    pub topic: String,
    /// The staged assessment (or explanation, if nothing else could be staged).
    pub questions: QuestionSet,
    /// The Feynman explanation produced since the previous prompt, if any.
    pub explanation: Option<String>,
    /// Score of the previous attempt; 0 before the first one.
    pub last_score: u8,
}

#[async_trait]
pub trait LearnerChannel: Send + Sync {
    /// Shows the study material for a checkpoint. Called once per checkpoint.
    async fn present_material(&self, checkpoint: &Checkpoint, material: &str) -> Result<()>;

    /// Asks for answers. `Ok(None)` means the learner abandoned the checkpoint.
    async fn request_answers(&self, prompt: &AnswerPrompt) -> Result<Option<String>>;

    /// Reports how a checkpoint ended.
    async fn checkpoint_finished(&self, report: &CheckpointReport) -> Result<()>;
}
