//! Failure taxonomy shared by capabilities, middleware and the dispatcher.

use serde_json::Value;
use thiserror::Error;

/// Kind of a failed call. Every kind maps to exactly one status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structured per-field validation messages.
    Validation,
    NotFound,
    /// Authorization failed against an ownership or role rule.
    Forbidden,
    /// Uniqueness violation.
    Conflict,
    /// Missing or invalid credential.
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn from_status_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(ErrorKind::Validation),
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            409 => Some(ErrorKind::Conflict),
            500 => Some(ErrorKind::Internal),
            _ => None,
        }
    }
}

/// A business failure reported by a capability or middleware: `{code, error}`.
///
/// Failures are ordinary values, never panics or `Err` faults. `code` may be
/// left unset, in which case the response dispatcher reports 400.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failure: {error}")]
pub struct Failure {
    pub code: Option<u16>,
    pub error: Value,
}

impl Failure {
    pub const DEFAULT_CODE: u16 = 400;

    pub fn new(kind: ErrorKind, error: impl Into<Value>) -> Self {
        Self {
            code: Some(kind.status_code()),
            error: error.into(),
        }
    }

    /// A failure without an explicit code.
    pub fn uncoded(error: impl Into<Value>) -> Self {
        Self {
            code: None,
            error: error.into(),
        }
    }

    pub fn validation(errors: impl Into<Value>) -> Self {
        Self::new(ErrorKind::Validation, errors)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg.into())
    }

    pub fn status_code(&self) -> u16 {
        self.code.unwrap_or(Self::DEFAULT_CODE)
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_status_code(self.status_code())
    }
}
