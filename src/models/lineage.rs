use serde::{Deserialize, Serialize};

/// Directed data dependency between two relations
///
/// Edges are reported in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LineageEdge {
    pub source: String,
    pub target: String,
}

impl LineageEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
