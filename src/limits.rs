//! Limits and constraints for walking untrusted documents
//!
//! The walker reads its whole input before tokenizing, so the input size is
//! the main lever a caller has against resource exhaustion. Nesting depth and
//! the malformed-token retry budget are bounded here as well.

use crate::error::ParserError;
use crate::flags::Flags;

/// Walk limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum input size in bytes
    pub max_input_size: usize,

    /// Maximum element nesting depth
    pub max_depth: usize,

    /// Number of malformed tokens that may be excised before giving up
    pub retry_budget: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_size: 64 * 1024 * 1024, // 64 MB
            max_depth: 512,
            retry_budget: 8,
        }
    }
}

impl Limits {
    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_input_size: 4 * 1024 * 1024, // 4 MB
            max_depth: 64,
            retry_budget: 0,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_input_size: 1024 * 1024 * 1024, // 1 GB
            max_depth: 4096,
            retry_budget: 64,
        }
    }

    /// Set the retry budget
    pub fn with_retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Check if the input size is within limits
    pub fn check_input_size(&self, size: usize) -> Result<(), ParserError> {
        if size > self.max_input_size {
            Err(ParserError::new(
                Flags::INPUT,
                format!(
                    "input size {} bytes exceeds maximum {} bytes",
                    size, self.max_input_size
                ),
            ))
        } else {
            Ok(())
        }
    }

    /// Check if the nesting depth is within limits
    pub fn check_depth(&self, depth: usize) -> Result<(), ParserError> {
        if depth > self.max_depth {
            Err(ParserError::new(
                Flags::INPUT,
                format!("nesting depth {} exceeds maximum {}", depth, self.max_depth),
            ))
        } else {
            Ok(())
        }
    }
}
