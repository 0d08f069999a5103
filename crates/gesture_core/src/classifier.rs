use std::sync::Arc;

use shared::protocol::SemanticCommand;

use crate::table::GestureTable;

/// Maps gesture identities to commands. Pure: no state, no side effects.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: Arc<GestureTable>,
    target_identity: Option<String>,
}

impl Classifier {
    pub fn new(table: Arc<GestureTable>) -> Self {
        Self {
            table,
            target_identity: None,
        }
    }

    /// Restricts dispatch to a single identity. `None` accepts every gesture.
    pub fn with_target_identity(mut self, target: Option<String>) -> Self {
        self.target_identity = target;
        self
    }

    pub fn target_identity(&self) -> Option<&str> {
        self.target_identity.as_deref()
    }

    pub fn accepts(&self, identity: &str) -> bool {
        self.target_identity
            .as_deref()
            .map_or(true, |target| target == identity)
    }

    pub fn classify(&self, identity: &str) -> SemanticCommand {
        match self.table.lookup(identity) {
            Some(kind) => kind.into(),
            None => SemanticCommand::Unknown(identity.to_string()),
        }
    }

    pub fn table(&self) -> &GestureTable {
        &self.table
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Arc::new(GestureTable::default()))
    }
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
