//! Error types for feedspec
//!
//! Two families live here. [`Error`] covers configuration-time failures
//! (registering extensions, minting flags, loading a checker configuration).
//! [`ParserError`] is what a walk produces: a set of [`Flags`] plus a message,
//! qualified by the chain of elements the failure bubbled through.

use crate::flags::Flags;
use std::fmt;
use thiserror::Error;

/// Result type alias using feedspec Error
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error type for feedspec
#[derive(Error, Debug)]
pub enum Error {
    /// The same qualified name was registered twice under one parent tag
    #[error("extension '{name}' is already registered under '{parent}'")]
    DuplicateExtension {
        /// Parent tag name
        parent: String,
        /// Qualified name of the extension
        name: String,
    },

    /// A flag name was minted or aliased twice
    #[error("flag '{0}' is already registered")]
    DuplicateFlag(String),

    /// No more bits are available for new flags
    #[error("flag space exhausted: all {0} kinds are in use")]
    FlagsExhausted(u32),

    /// A configuration referenced a flag name the registry does not know
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON configuration could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised while walking a document
///
/// The path lists the elements the error was delegated through, outermost
/// first. It renders as `in 'feed': in 'entry': title should exist`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    flags: Flags,
    message: String,
    path: Vec<String>,
}

impl ParserError {
    /// Create a new error of the given kinds
    pub fn new(flags: Flags, message: impl Into<String>) -> Self {
        Self {
            flags,
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Wrap the error with the name of the element it surfaced in
    pub fn delegate(mut self, element: impl Into<String>) -> Self {
        self.path.insert(0, element.into());
        self
    }

    /// Kinds carried by this error
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Unqualified message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Elements the error was delegated through, outermost first
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Name of the innermost element the error was delegated through
    pub fn element(&self) -> Option<&str> {
        self.path.last().map(|s| s.as_str())
    }

    /// Check if the error carries any of `flags`
    pub fn has(&self, flags: Flags) -> bool {
        self.flags.intersects(flags)
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.path {
            write!(f, "in '{}': ", element)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParserError {}

/// Collects the errors of one element into a single combined error
#[derive(Debug, Clone, Default)]
pub struct ErrorAggregator {
    errors: Vec<ParserError>,
}

impl ErrorAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error
    pub fn push(&mut self, error: ParserError) {
        self.errors.push(error);
    }

    /// Add an error if there is one
    pub fn add(&mut self, error: Option<ParserError>) {
        if let Some(error) = error {
            self.push(error);
        }
    }

    /// Check if nothing was collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Union of the flags of every collected error
    pub fn flags(&self) -> Flags {
        self.errors
            .iter()
            .fold(Flags::empty(), |acc, e| acc | e.flags())
    }

    /// Forget everything collected so far
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Reduce the collected errors to none or one combined error
    pub fn finish(&mut self) -> Option<ParserError> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => {
                let flags = self.flags();
                let message = self
                    .errors
                    .drain(..)
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                Some(ParserError::new(flags, message))
            }
        }
    }
}

impl Extend<ParserError> for ErrorAggregator {
    fn extend<I: IntoIterator<Item = ParserError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}
