//! Structured error types shared across hgx crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`HgError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (state ids, line numbers, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the hypergraph engine.
///
/// Algorithms never recover locally from any of these; they are returned to the
/// caller as soon as they are detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HgError {
    /// Malformed text-format input.
    #[error("file format error: {0}")]
    FileFormat(ErrorInfo),
    /// Structurally invalid request (missing arc index, non-graph input, conflicting options).
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// A required start/final state or derivation does not exist.
    #[error("empty set: {0}")]
    EmptySet(ErrorInfo),
    /// An algorithm that assumes acyclicity found a back edge.
    #[error("cycle error: {0}")]
    Cycle(ErrorInfo),
    /// A NaN surfaced during reweighting or pushing.
    #[error("not a number: {0}")]
    NotANumber(ErrorInfo),
    /// The weight type does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(ErrorInfo),
    /// Unknown or removed state/arc handles.
    #[error("graph error: {0}")]
    Graph(ErrorInfo),
    /// Persistence errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl HgError {
    /// Builds a [`HgError::FileFormat`] error.
    pub fn file_format(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::FileFormat(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::Config`] error.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::Config(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::EmptySet`] error.
    pub fn empty_set(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::EmptySet(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::Cycle`] error.
    pub fn cycle(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::Cycle(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::NotANumber`] error.
    pub fn not_a_number(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::NotANumber(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::Unsupported`] error.
    pub fn unsupported(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::Unsupported(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::Graph`] error.
    pub fn graph(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::Graph(ErrorInfo::new(code, message))
    }

    /// Builds a [`HgError::Serde`] error.
    pub fn serde(code: impl Into<String>, message: impl Into<String>) -> Self {
        HgError::Serde(ErrorInfo::new(code, message))
    }

    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HgError::FileFormat(info)
            | HgError::Config(info)
            | HgError::EmptySet(info)
            | HgError::Cycle(info)
            | HgError::NotANumber(info)
            | HgError::Unsupported(info)
            | HgError::Graph(info)
            | HgError::Serde(info) => info,
        }
    }

    /// Returns the stable machine readable code of the error.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Adds a context entry to the payload, keeping the error family.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        self.map_info(|info| info.with_context(key, value.to_string()))
    }

    /// Sets a remediation hint, keeping the error family.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        self.map_info(|info| info.with_hint(hint))
    }

    fn map_info(self, f: impl FnOnce(ErrorInfo) -> ErrorInfo) -> Self {
        match self {
            HgError::FileFormat(info) => HgError::FileFormat(f(info)),
            HgError::Config(info) => HgError::Config(f(info)),
            HgError::EmptySet(info) => HgError::EmptySet(f(info)),
            HgError::Cycle(info) => HgError::Cycle(f(info)),
            HgError::NotANumber(info) => HgError::NotANumber(f(info)),
            HgError::Unsupported(info) => HgError::Unsupported(f(info)),
            HgError::Graph(info) => HgError::Graph(f(info)),
            HgError::Serde(info) => HgError::Serde(f(info)),
        }
    }
}
