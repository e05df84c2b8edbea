//! What a capability hands back to the dispatcher.

use serde_json::{Map, Value};

use crate::error::Failure;

/// A loosely-typed record (JSON object) as received from callers or stored
/// by the persistence collaborator.
pub type Record = Map<String, Value>;

/// Result of a capability call that did not fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { code: Option<u16>, data: Value },
    Failure(Failure),
}

impl Outcome {
    /// Success with the default status.
    pub fn data(data: impl Into<Value>) -> Self {
        Outcome::Success {
            code: None,
            data: data.into(),
        }
    }

    pub fn with_code(code: u16, data: impl Into<Value>) -> Self {
        Outcome::Success {
            code: Some(code),
            data: data.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failure(f) => Some(f),
            Outcome::Success { .. } => None,
        }
    }
}

impl From<Failure> for Outcome {
    fn from(value: Failure) -> Self {
        Outcome::Failure(value)
    }
}
