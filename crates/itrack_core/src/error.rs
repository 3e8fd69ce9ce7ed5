use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification callers branch on. Validation and not-found are expected outcomes;
/// storage and config failures end the current request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Config,
}

/// Single structured error shape used across backend layers and exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    /// Field-level messages, in rule order. Only populated for `ErrorKind::Validation`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
            errors: Vec::new(),
            retryable: false,
        }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        let mut err = Self::new(ErrorKind::Validation, "VALIDATION_FAILED", "Validation failed");
        err.errors = errors;
        err
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(ErrorKind::NotFound, "INCIDENT_NOT_FOUND", "Incident not found.")
            .with_details(format!("id={id}"))
    }

    pub fn storage(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, code, message)
    }

    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, code, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.errors.is_empty() {
            write!(f, ": {}", self.errors.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
