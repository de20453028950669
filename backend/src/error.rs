//! Error types for scheduling operations.
//!
//! Every fallible operation in the crate returns [`SchedulerResult`]. Errors carry
//! a structured [`ErrorContext`] so callers (and logs) can see which operation and
//! which section triggered them.
//!
//! Missing history is never an error: predictions and trends return `None`
//! instead, and callers fall back to the unadjusted duration.

use std::fmt;

use crate::models::SectionId;

/// Result type for scheduling operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Structured context for scheduling errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "compute_loads", "generate")
    pub operation: Option<String>,
    /// The section involved, if any
    pub section: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Set when the referenced section has no recorded history
    pub unknown_section: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the section.
    pub fn with_section(mut self, section: &SectionId) -> Self {
        self.section = Some(section.as_str().to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark the section as never observed.
    pub fn with_unknown_section(mut self) -> Self {
        self.unknown_section = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref section) = self.section {
            parts.push(format!("section={}", section));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Upstream contract violation: malformed counts, negative load,
    /// unknown section reference.
    #[error("Invalid input: {message} {context}")]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Persisted history could not be read or written.
    #[error("Persistence error: {message} {context}")]
    Persistence {
        message: String,
        context: ErrorContext,
    },
}

impl SchedulerError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an invalid input error with context.
    pub fn invalid_input_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a persistence error with context.
    pub fn persistence_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Persistence {
            message: message.into(),
            context,
        }
    }

    /// Reference to a section that has never been observed.
    pub fn unknown_section(section: &SectionId, operation: &str) -> Self {
        Self::invalid_input_with_context(
            format!("unknown section '{}'", section),
            ErrorContext::new(operation)
                .with_section(section)
                .with_unknown_section(),
        )
    }

    /// Whether this error was caused by the caller's input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Whether this error refers to a section with no recorded history.
    pub fn is_unknown_section(&self) -> bool {
        match self {
            Self::InvalidInput { context, .. } => context.unknown_section,
            _ => false,
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidInput { context, .. }
            | Self::Configuration { context, .. }
            | Self::Persistence { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::InvalidInput { context, .. }
            | Self::Configuration { context, .. }
            | Self::Persistence { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::persistence(err.to_string())
    }
}
