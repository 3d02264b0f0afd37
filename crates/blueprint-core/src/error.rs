//! Unified error handling for Blueprint Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{self, DomainError};

/// Root error type for Blueprint Core operations.
#[derive(Debug, Error, Clone)]
pub enum BlueprintError {
    /// Errors from the domain layer (schema, rendering, graph wiring).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Errors from the application layer (discovery, resolution, I/O).
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl BlueprintError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec!["This appears to be a bug in blueprint".into()],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                domain::ErrorCategory::Validation => ErrorCategory::Validation,
                domain::ErrorCategory::Rendering => ErrorCategory::Rendering,
                domain::ErrorCategory::Graph => ErrorCategory::Rendering,
            },
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Borrow the domain validation error, if that is what this is.
    pub fn as_validation(&self) -> Option<&domain::ValidationError> {
        match self {
            Self::Domain(DomainError::Validation(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<domain::ValidationError> for BlueprintError {
    fn from(e: domain::ValidationError) -> Self {
        Self::Domain(DomainError::Validation(e))
    }
}

impl From<crate::application::ConfigurationError> for BlueprintError {
    fn from(e: crate::application::ConfigurationError) -> Self {
        Self::Application(ApplicationError::Configuration(e))
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Configuration,
    Rendering,
    Io,
    Internal,
}

/// Convenient result type alias.
pub type BlueprintResult<T> = Result<T, BlueprintError>;
