#![forbid(unsafe_code)]

//! Error types.
//!
//! Nothing here is fatal. [`PublishError`] never leaves the [`Publisher`]
//! (it is logged and the next frame overwrites again); [`ConfigError`] is only
//! produced while loading configuration.
//!
//! [`Publisher`]: crate::publisher::Publisher

use core::fmt;

/// A styling write the host rejected or could not perform this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The host threw while applying a property or class.
    Rejected {
        /// Name of the property, class, or element attribute being written.
        target: &'static str,
        /// Host-provided description of the failure.
        detail: String,
    },
    /// An element the sink writes to is not present in the document.
    MissingElement(&'static str),
}

impl PublishError {
    /// Build a [`PublishError::Rejected`] from any displayable host error.
    pub fn rejected(target: &'static str, detail: impl Into<String>) -> Self {
        Self::Rejected {
            target,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { target, detail } => write!(f, "write to {target} rejected: {detail}"),
            Self::MissingElement(name) => write!(f, "element not found: {name}"),
        }
    }
}

impl std::error::Error for PublishError {}

/// One out-of-range configuration value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub value: String,
    pub message: &'static str,
}

impl ConfigViolation {
    pub fn new(field: &'static str, value: impl fmt::Display, message: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            message,
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The input was not valid JSON for the expected shape.
    Parse(String),
    /// The input parsed but one or more values are out of range.
    Invalid(Vec<ConfigViolation>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Invalid(violations) => {
                write!(f, "invalid config:")?;
                for (idx, v) in violations.iter().enumerate() {
                    let sep = if idx == 0 { " " } else { "; " };
                    write!(f, "{sep}{v}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
