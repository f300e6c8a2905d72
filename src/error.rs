// 🚨 Errors & Load Report
//
// Two families of failure:
// - Structural problems abort a read (ReadError) or a write (WriteError)
// - Per-attribute problems are collected in a LoadReport and the read goes on

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// STRUCTURAL ERRORS
// ============================================================================

/// A failure that aborts a whole read. The partial graph is discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    /// The container syntax itself is broken (bad tag, bad attribute, ...)
    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The stream ended while `element` was still open
    #[error("truncated stream: <{element}> is never closed")]
    Truncated { element: String },

    /// The document does not start with the expected root element
    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot { expected: String, found: String },

    /// The stream ended before any root element was found
    #[error("empty document, expected <{expected}>")]
    MissingRoot { expected: String },

    /// An end tag does not close the element currently open
    #[error("mismatched end tag </{found}>, expected </{expected}>")]
    MismatchedEnd { expected: String, found: String },

    /// Something other than comments follows the root element
    #[error("unexpected content after the root element at byte {position}")]
    TrailingContent { position: usize },

    /// The progress callback asked the reader to stop
    #[error("read cancelled at {fraction:.2}")]
    Cancelled { fraction: f64 },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Io(err.to_string())
    }
}

/// Writing only fails when the underlying stream does.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to emit XML: {0}")]
    Emit(String),

    #[error("written document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A scalar text that cannot be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert '{text}' to {expected}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub text: String,
}

impl ConversionError {
    pub fn new(expected: &'static str, text: impl Into<String>) -> Self {
        ConversionError {
            expected,
            text: text.into(),
        }
    }
}

// ============================================================================
// LOAD REPORT
// ============================================================================

/// One recoverable problem met while loading a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadIssue {
    /// The attribute kept its default value
    TypeConversion {
        element: String,
        attribute: String,
        value: String,
        expected: String,
    },

    /// The reference was left unresolved (None)
    UnresolvedReference {
        owner: String,
        type_name: String,
        id: String,
    },

    /// A keyed child had no key attribute and was skipped
    MissingKey { element: String, attribute: String },

    /// Two entities share one address; the first one wins
    DuplicateId { type_name: String, id: String },

    /// A keyed child repeated an existing key; the first one wins and the
    /// repeat was skipped
    DuplicateKey { element: String, key: String },
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadIssue::TypeConversion {
                element,
                attribute,
                value,
                expected,
            } => write!(
                f,
                "<{}> {}: cannot convert '{}' to {}",
                element, attribute, value, expected
            ),
            LoadIssue::UnresolvedReference { owner, type_name, id } => {
                write!(f, "{}: dangling reference to {} '{}'", owner, type_name, id)
            }
            LoadIssue::MissingKey { element, attribute } => {
                write!(f, "<{}> skipped: missing key attribute '{}'", element, attribute)
            }
            LoadIssue::DuplicateId { type_name, id } => {
                write!(f, "duplicate {} id '{}'", type_name, id)
            }
            LoadIssue::DuplicateKey { element, key } => {
                write!(f, "<{}> skipped: key '{}' already read", element, key)
            }
        }
    }
}

/// Issues accumulated over one load, returned next to the best-effort graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn new() -> Self {
        LoadReport::default()
    }

    pub fn record(&mut self, issue: LoadIssue) {
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn conversion_errors(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, LoadIssue::TypeConversion { .. }))
            .count()
    }

    pub fn unresolved_references(&self) -> Vec<&LoadIssue> {
        self.issues
            .iter()
            .filter(|i| matches!(i, LoadIssue::UnresolvedReference { .. }))
            .collect()
    }

    /// Human-readable one-liner
    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "clean load".to_string();
        }
        format!(
            "{} issue(s): {} conversion, {} unresolved reference(s)",
            self.len(),
            self.conversion_errors(),
            self.unresolved_references().len()
        )
    }
}
