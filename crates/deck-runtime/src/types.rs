use deck_assemble::AssembleError;
use deck_intake::IntakeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document error: {0}")]
    Assemble(#[from] AssembleError),
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
    #[error("Mail error: {0}")]
    Mail(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// The step of a run an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Load,
    Assemble,
    Save,
    Email,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Intake => "intake",
            Stage::Load => "load",
            Stage::Assemble => "assemble",
            Stage::Save => "save",
            Stage::Email => "email",
        };
        f.write_str(name)
    }
}

/// A run that stopped at `stage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

impl StageFailure {
    pub fn new(stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

/// What one finished deck looked like
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub recipient: Option<String>,
    /// Kept only when an output directory is configured
    pub output: Option<std::path::PathBuf>,
    pub slides: usize,
    pub images_placed: usize,
    pub images_unresolved: usize,
    pub styles_filled: usize,
    pub text_replacements: usize,
    pub slides_pruned: usize,
    pub style_slides_removed: usize,
}

/// Result of handing one event to the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Already processed or being processed; nothing was done
    Skipped { key: String, reason: String },
    Processed { key: String, summary: RunSummary },
    /// The deck was built but a later stage failed
    Partial {
        key: String,
        stage: Stage,
        reason: String,
        summary: RunSummary,
    },
    Failed {
        key: String,
        stage: Stage,
        reason: String,
    },
}

impl PipelineOutcome {
    pub fn key(&self) -> &str {
        match self {
            PipelineOutcome::Skipped { key, .. }
            | PipelineOutcome::Processed { key, .. }
            | PipelineOutcome::Partial { key, .. }
            | PipelineOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PipelineOutcome::Skipped { .. })
    }

    /// Annotation stored next to the key in the ledger
    pub fn annotation(&self) -> Option<String> {
        match self {
            PipelineOutcome::Partial { stage, reason, .. }
            | PipelineOutcome::Failed { stage, reason, .. } => {
                Some(format!("{stage} failed: {reason}"))
            }
            _ => None,
        }
    }
}
