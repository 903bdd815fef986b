//! Terminal learner channel used by the `tutor` binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use mastery_core::{
    Checkpoint, CheckpointOutcome, CheckpointReport, IncompleteReason, PathReport,
    gatherer::is_degraded,
    learner::{AnswerPrompt, LearnerChannel},
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Typing this instead of answers abandons the checkpoint.
pub const SKIP_COMMAND: &str = ":skip";

pub struct TerminalLearner {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalLearner {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for TerminalLearner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LearnerChannel for TerminalLearner {
    async fn present_material(&self, checkpoint: &Checkpoint, material: &str) -> Result<()> {
        println!("{}", render_material(checkpoint, material));
        Ok(())
    }

    async fn request_answers(&self, prompt: &AnswerPrompt) -> Result<Option<String>> {
        print!("{}", render_prompt(prompt));
        std::io::stdout().flush()?;

        let line = self
            .lines
            .lock()
            .await
            .next_line()
            .await
            .context("Failed to read answers from stdin")?;
        Ok(interpret_line(line))
    }

    async fn checkpoint_finished(&self, report: &CheckpointReport) -> Result<()> {
        println!("\n{}", render_report(report));
        Ok(())
    }
}

/// `None` (end of input) and the skip command both abandon the checkpoint.
pub fn interpret_line(line: Option<String>) -> Option<String> {
    line.filter(|l| l.trim() != SKIP_COMMAND)
}

pub fn render_material(checkpoint: &Checkpoint, material: &str) -> String {
    let body = if is_degraded(material) {
        "(The study material failed to load. The quiz will draw on general knowledge.)"
    } else {
        material
    };
    format!(
        "\n=== {} ===\nObjectives: {}\n\n{}",
        checkpoint.topic, checkpoint.objectives, body
    )
}

pub fn render_prompt(prompt: &AnswerPrompt) -> String {
    let mut out = String::new();
    if let Some(explanation) = &prompt.explanation {
        out.push_str(&format!(
            "\n--- You scored {}%. Let's look at it another way ---\n{}\n",
            prompt.last_score, explanation
        ));
    }
    out.push_str(&format!(
        "\n--- Quiz: {} ---\n{}\n\nYour answers (e.g. 1.A, 2.C; '{}' to move on) > ",
        prompt.topic,
        prompt.questions.text(),
        SKIP_COMMAND
    ));
    out
}

pub fn render_report(report: &CheckpointReport) -> String {
    let verdict = match report.outcome {
        CheckpointOutcome::Mastered { score } => format!("mastered ({}%)", score),
        CheckpointOutcome::Incomplete {
            reason: IncompleteReason::Abandoned,
        } => "skipped".to_string(),
        CheckpointOutcome::Incomplete {
            reason: IncompleteReason::Stalled,
        } => "incomplete (the tutor could not prepare a quiz)".to_string(),
        CheckpointOutcome::Incomplete {
            reason: IncompleteReason::RemediationLimit { rounds },
        } => format!(
            "incomplete ({}% after {} re-explanations)",
            report.final_score, rounds
        ),
    };
    format!(
        "{}: {} [{} attempt(s)]",
        report.checkpoint.topic, verdict, report.attempts
    )
}

pub fn render_summary(report: &PathReport) -> String {
    let mut out = format!(
        "\n=== Learning path finished: {}/{} mastered ===",
        report.mastered_count(),
        report.reports.len()
    );
    for checkpoint in &report.reports {
        out.push('\n');
        out.push_str(&render_report(checkpoint));
    }
    out
}
