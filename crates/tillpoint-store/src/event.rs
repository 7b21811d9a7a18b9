use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by a collection when its documents change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Inserted { id: String, doc: Value },
    Updated { id: String, doc: Value },
    Removed { id: String },
}

impl ChangeEvent {
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Inserted { id, .. }
            | ChangeEvent::Updated { id, .. }
            | ChangeEvent::Removed { id } => id,
        }
    }
}
