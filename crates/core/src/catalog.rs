//! Checkpoint Catalog
//!
//! The ordered list of topics a learner works through, and the
//! [`LearningPath`] cursor that walks it one checkpoint at a time.

use std::path::Path;

use crate::topic::Checkpoint;

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog contains no checkpoints")]
    Empty,
    #[error("Checkpoint {0} has a blank topic")]
    BlankTopic(usize),
}

/// An ordered sequence of checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    checkpoints: Vec<Checkpoint>,
}

impl Catalog {
    /// Validates and wraps a list of checkpoints.
    pub fn new(checkpoints: Vec<Checkpoint>) -> Result<Self, CatalogError> {
        if checkpoints.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(idx) = checkpoints.iter().position(|c| c.topic.trim().is_empty()) {
            return Err(CatalogError::BlankTopic(idx));
        }
        Ok(Self { checkpoints })
    }

    /// The built-in deep learning path.
    pub fn builtin() -> Self {
        Self {
            checkpoints: vec![
                Checkpoint::new(
                    "Backpropagation",
                    "Goal, Chain rule, Loss function, Weight updates, Vanishing gradient.",
                ),
                Checkpoint::new(
                    "Gradient Descent",
                    "SGD vs Batch, Learning rate, Convergence, Local minima, Momentum.",
                ),
                Checkpoint::new(
                    "Activation Functions",
                    "Non-linearity, ReLU, Sigmoid, Tanh, Softmax.",
                ),
                Checkpoint::new(
                    "CNN Architectures",
                    "Kernels, Stride, Padding, Max pooling, Flattening.",
                ),
                Checkpoint::new(
                    "Regularization",
                    "Overfitting, L1/L2, Dropout, Early stopping.",
                ),
            ],
        }
    }

    /// Parses a JSON array of `{ "topic": ..., "objectives": ... }` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let checkpoints: Vec<Checkpoint> = serde_json::from_str(json)?;
        Self::new(checkpoints)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn len(&self) -> usize {
        self.checkpoints().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints().is_empty()
    }
}

/// A cursor over a catalog. The index only moves forward.
#[derive(Debug, Clone)]
pub struct LearningPath {
    catalog: Catalog,
    index: usize,
}

impl LearningPath {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, index: 0 }
    }

    /// Starts the path at `index`, clamped to the end of the catalog.
    pub fn start_at(catalog: Catalog, index: usize) -> Self {
        let index = index.min(catalog.len());
        Self { catalog, index }
    }

    /// The checkpoint currently being worked on, `None` once the path is finished.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.catalog.checkpoints().get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves to the next checkpoint. Returns the new current checkpoint.
    pub fn advance(&mut self) -> Option<&Checkpoint> {
        if self.index < self.catalog.len() {
            self.index += 1;
        }
        self.current()
    }

    /// `(completed, total)` checkpoint counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.catalog.len())
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.catalog.len()
    }
}
