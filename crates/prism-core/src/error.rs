//! Error types for the documentation-model engine
//!
//! Three severities exist: invalid construction input (fatal to the
//! call), a structural problem with one declaration (that subtree is
//! skipped, siblings continue), and a provider failure (the only error
//! that aborts a whole build). Merge inconsistencies are warnings, not
//! errors; see [`crate::merge::MergeWarning`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::VariantId;

/// Best-effort source location attached to diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path as reported by the declaration provider
    pub path: String,
    /// 1-based line number, if known
    pub line: Option<u32>,
}

impl SourceLocation {
    /// Create a new source location
    #[must_use]
    pub fn new(path: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line),
            None => write!(f, "{}", self.path),
        }
    }
}

/// A declaration the identifier model cannot address
///
/// Fatal only to the declaration's own subtree. The builder logs the
/// error, records it in the build outcome, and continues with the
/// remaining siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    /// What went wrong
    pub reason: String,
    /// The platform variant being built when the error occurred
    pub variant: VariantId,
    /// Canonical identifier of the nearest addressable enclosing scope
    pub context: String,
    /// Where the offending declaration lives, if known
    pub location: Option<SourceLocation>,
}

impl StructuralError {
    /// Create a new structural error
    #[must_use]
    pub fn new(reason: impl Into<String>, variant: VariantId, context: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            variant,
            context: context.into(),
            location: None,
        }
    }

    /// Attach a source location
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} ({})", self.reason, self.context, self.variant)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StructuralError {}

/// Top-level error type for the documentation-model engine
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Malformed construction input, e.g. an empty composite platform set
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What the caller got wrong
        reason: String,
    },

    /// A single declaration could not be addressed
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A platform variant's declarations could not be fetched at all
    #[error("declaration provider failed for {variant}: {reason}")]
    Provider {
        /// The variant whose forest could not be built
        variant: VariantId,
        /// Provider-reported failure
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidArgument`]
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
