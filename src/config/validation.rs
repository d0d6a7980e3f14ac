//! Configuration validation report.
//!
//! # Example
//!
//! ```rust
//! use sigil::config::ValidationReport;
//!
//! let report = ValidationReport::new();
//! assert!(report.is_valid()); // Empty report is valid
//! assert_eq!(report.exit_code(), 0);
//! ```

use std::fmt;

use crate::error::SigilError;

/// Result of configuration validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make part of the configuration unusable.
    pub errors: Vec<String>,
    /// Suspicious settings that still load.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, error: SigilError) {
        self.errors.push(error.to_string());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// `true` when there are no errors; warnings don't count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Exit status for `sigil config validate`.
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}
