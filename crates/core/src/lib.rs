pub mod catalog;
pub mod gatherer;
pub mod learner;
pub mod llm_client;
pub mod machine;
pub mod markers;
pub mod orchestrator;
pub mod retrieval;
pub mod search;
pub mod stages;
pub mod state;
pub mod topic;

pub use catalog::{Catalog, LearningPath};
pub use orchestrator::{
    CheckpointOutcome, CheckpointPolicy, CheckpointReport, CheckpointSession, IncompleteReason,
    PathReport, Step, Tutor,
};
pub use state::{LearningState, QuestionSet, StateUpdate};
pub use topic::Checkpoint;
