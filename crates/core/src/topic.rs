use serde::{Deserialize, Serialize};

/// One entry of the learning path: a topic and the goals a learner must master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub topic: String,
    pub objectives: String,
}

impl Checkpoint {
    pub fn new(topic: impl Into<String>, objectives: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            objectives: objectives.into(),
        }
    }
}
