//! Error taxonomy
//!
//! Four families, matching the phases of a task:
//!
//! - [`CompileError`]: the job graph cannot become a program. Raised before any
//!   record is read and always carries every issue found, not just the first.
//! - [`DecodeError`]: the source document is malformed or lacks a required node.
//! - [`TransformError`]: applying the program to a record failed.
//! - [`StorageError`]: the graph sink rejected the result.
//!
//! [`PipelineError`] wraps all of them for callers that drive a whole task.

use crate::graph::InvalidStatement;
use crate::job::ComponentKind;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A structural problem in a job graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("duplicate component id '{0}'")]
    DuplicateComponent(String),

    #[error("component '{component}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { component: String, parameter: String },

    #[error("component '{component}' has unknown type '{kind}'")]
    UnknownComponentType { component: String, kind: String },

    #[error("source component '{0}' must not have inputs")]
    SourceWithInputs(String),

    #[error("target component '{0}' must not have outputs")]
    TargetWithOutputs(String),

    #[error("{kind} component '{component}' needs at least one input and one output")]
    Unwired {
        component: String,
        kind: ComponentKind,
    },

    #[error("component '{component}' references unknown input '{input}'")]
    DanglingInput { component: String, input: String },

    #[error("component '{component}' references unknown output '{output}'")]
    DanglingOutput { component: String, output: String },

    #[error("component '{component}' reads from '{input}', which is not declared before it")]
    ForwardReference { component: String, input: String },

    #[error("component '{component}' lists output '{output}', which does not read from it")]
    AsymmetricWiring { component: String, output: String },

    #[error("target component '{0}' is not reachable from any source")]
    UnreachableTarget(String),
}

/// One reason a job graph failed to compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileIssue {
    #[error(transparent)]
    Invalid(#[from] ValidationIssue),

    #[error("component '{component}' uses unknown function '{function}'")]
    UnknownFunction { component: String, function: String },

    #[error("function '{function}' in component '{component}' requires parameter '{parameter}'")]
    MissingParameter {
        component: String,
        function: String,
        parameter: String,
    },

    #[error("parameter '{parameter}' of component '{component}' is invalid: {reason}")]
    InvalidParameter {
        component: String,
        parameter: String,
        reason: String,
    },

    #[error("{kind} component '{component}' reads {count} inputs, expected one")]
    TooManyInputs {
        component: String,
        kind: ComponentKind,
        count: usize,
    },

    #[error("filter on component '{component}' cannot be parsed: {reason}")]
    InvalidFilter { component: String, reason: String },

    #[error("malformed job description: {0}")]
    Description(String),

    #[error("malformed morph script: {0}")]
    Script(String),
}

/// All issues found while compiling one transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    issues: Vec<CompileIssue>,
}

impl CompileError {
    pub fn new(issues: Vec<CompileIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[CompileIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<CompileIssue> {
        self.issues
    }

    /// Create an error carrying a single script problem
    pub fn script(msg: impl Into<String>) -> Self {
        Self::from(CompileIssue::Script(msg.into()))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation failed with {} issue(s)", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

impl From<CompileIssue> for CompileError {
    fn from(issue: CompileIssue) -> Self {
        Self::new(vec![issue])
    }
}

impl From<Vec<ValidationIssue>> for CompileError {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self::new(issues.into_iter().map(CompileIssue::Invalid).collect())
    }
}

/// Source document errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {format} input: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("record {record} has no '{section}' section")]
    MissingSection { record: usize, section: String },

    #[error("unsupported input format '{0}'")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn malformed(format: &'static str, msg: impl fmt::Display) -> Self {
        Self::Malformed {
            format,
            message: msg.to_string(),
        }
    }

    pub fn missing_section(record: usize, section: impl Into<String>) -> Self {
        Self::MissingSection {
            record,
            section: section.into(),
        }
    }
}

/// Errors raised while a program processes a record
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("function '{function}' failed: {message}")]
    Function { function: String, message: String },

    #[error("unexpected {event} event: {reason}")]
    UnexpectedEvent { event: &'static str, reason: String },

    #[error(transparent)]
    InvalidStatement(#[from] InvalidStatement),
}

impl TransformError {
    pub fn function(function: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Function {
            function: function.into(),
            message: msg.into(),
        }
    }

    pub fn unexpected(event: &'static str, reason: impl Into<String>) -> Self {
        Self::UnexpectedEvent {
            event,
            reason: reason.into(),
        }
    }
}

/// Graph sink errors
///
/// Surfaced to the caller unmodified. The pipeline never retries, the
/// classification below is for whoever drives it.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The write did not complete in time
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The model could not be encoded for the store
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Check if an external caller could reasonably retry the write
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Get error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Any error that aborts a task
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The worker running the task panicked or was cancelled
    #[error("task '{task}' did not complete: {message}")]
    Worker { task: String, message: String },
}

impl PipelineError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Compile(_) => "compile",
            Self::Decode(_) => "decode",
            Self::Transform(_) => "transform",
            Self::Storage(_) => "storage",
            Self::Worker { .. } => "worker",
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
pub type DecodeResult<T> = Result<T, DecodeError>;
pub type TransformResult<T> = Result<T, TransformError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_lists_every_issue() {
        let err = CompileError::new(vec![
            CompileIssue::UnknownFunction {
                component: "F1".into(),
                function: "frobnicate".into(),
            },
            ValidationIssue::DuplicateComponent("S1".into()).into(),
        ]);

        assert_eq!(err.issues().len(), 2);
        assert_eq!(
            err.to_string(),
            "compilation failed with 2 issue(s): component 'F1' uses unknown function \
             'frobnicate'; duplicate component id 'S1'"
        );
    }

    #[test]
    fn test_storage_error_retryability() {
        assert!(StorageError::unavailable("connection refused").is_retryable());
        assert!(StorageError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(!StorageError::rejected("constraint violated").is_retryable());
    }

    #[test]
    fn test_storage_error_category() {
        assert_eq!(StorageError::rejected("x").category(), "rejected");
        assert_eq!(StorageError::serialization("x").category(), "serialization");
    }

    #[test]
    fn test_pipeline_error_keeps_storage_error_unmodified() {
        let err: PipelineError = StorageError::rejected("quota exceeded").into();
        assert_eq!(err.category(), "storage");
        assert_eq!(err.to_string(), "Write rejected: quota exceeded");
        assert!(matches!(err, PipelineError::Storage(StorageError::Rejected(ref m)) if m == "quota exceeded"));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::missing_section(2, "metadata.oai_dc:dc");
        assert_eq!(err.to_string(), "record 2 has no 'metadata.oai_dc:dc' section");
    }
}
