//! Error types for resource and provider resolution.
//!
//! Errors are grouped into categories so callers can tell definition-time
//! failures (a class declaration that must abort) from dispatch-time failures
//! (surfaced to the recipe runner) and provider-raised failures.

use std::fmt;
use std::path::PathBuf;

use crate::warnings::WarningKind;

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of resolution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed declaration, raised while a class is being defined.
    Registration,
    /// No class could be resolved for a DSL call or action.
    Resolution,
    /// Raised by a provider while converging; passed through untouched.
    Provider,
    /// A warning escalated by `treat_deprecation_warnings_as_errors`.
    Deprecation,
    /// A recipe block used the resource incorrectly.
    Usage,
}

impl ErrorCategory {
    /// Whether this error aborts a class definition.
    #[must_use]
    pub fn is_fatal_at_definition(&self) -> bool {
        matches!(self, Self::Registration | Self::Deprecation)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Registration => "Invalid resource or provider declaration",
            Self::Resolution => "Nothing registered for this name on this node",
            Self::Provider => "Provider failed",
            Self::Deprecation => "Deprecated usage treated as an error",
            Self::Usage => "Invalid use of a resource in a recipe",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors raised by the registries, the dispatcher and providers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A declaration could not be registered (bad name, malformed filter).
    #[error("registration error: {message}")]
    Registration {
        /// What was wrong with the declaration.
        message: String,
    },

    /// No resource class resolves for the DSL name on this node.
    #[error("cannot find a resource for {dsl_name} on {node}")]
    NoSuchResourceType {
        /// The DSL name used in the recipe.
        dsl_name: String,
        /// Summary of the node attributes relevant to resolution.
        node: String,
    },

    /// A resource resolved but no provider is eligible for it.
    #[error("cannot find a provider for {declared_type} with action {action}")]
    ProviderNotFound {
        /// The DSL name the resource was declared with.
        declared_type: String,
        /// The action being executed.
        action: String,
    },

    /// A provider found a different kind of file than it manages.
    #[error("file type mismatch at {}: expected {expected}, found {actual}", .path.display())]
    FileTypeMismatch {
        /// Path of the offending file.
        path: PathBuf,
        /// The file type the provider manages.
        expected: String,
        /// The file type found on disk.
        actual: String,
    },

    /// A warning raised as an error.
    #[error("{message}")]
    Deprecation {
        /// Which warning was escalated.
        kind: WarningKind,
        /// The warning text.
        message: String,
    },

    /// A recipe block set an attribute the resource does not declare.
    #[error("{resource} has no attribute '{attribute}'")]
    UnknownAttribute {
        /// Resource description, e.g. `log[hello]`.
        resource: String,
        /// The attribute name.
        attribute: String,
    },

    /// A recipe block or executor requested an action the resource does not allow.
    #[error("{resource} does not allow action :{action} (allowed: {allowed})")]
    InvalidAction {
        /// Resource description.
        resource: String,
        /// The requested action.
        action: String,
        /// Comma separated list of allowed actions.
        allowed: String,
    },

    /// A DSL call was made without a resource name.
    #[error("{dsl_name} was called without a resource name")]
    MissingResourceName {
        /// The DSL name used in the recipe.
        dsl_name: String,
    },

    /// An action was executed on a resource that cannot converge from its state.
    #[error("{resource} cannot converge from state {state}")]
    InvalidState {
        /// Resource description.
        resource: String,
        /// The current lifecycle state.
        state: String,
    },

    /// Any other provider-raised error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a registration error.
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Get the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Registration { .. } => ErrorCategory::Registration,
            Error::NoSuchResourceType { .. } | Error::ProviderNotFound { .. } => {
                ErrorCategory::Resolution
            }
            Error::FileTypeMismatch { .. } | Error::Other(_) => ErrorCategory::Provider,
            Error::Deprecation { .. } => ErrorCategory::Deprecation,
            Error::UnknownAttribute { .. }
            | Error::InvalidAction { .. }
            | Error::MissingResourceName { .. }
            | Error::InvalidState { .. } => ErrorCategory::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::registration("bad").category(),
            ErrorCategory::Registration
        );
        assert_eq!(
            Error::NoSuchResourceType {
                dsl_name: "thingy".into(),
                node: "{}".into(),
            }
            .category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            Error::ProviderNotFound {
                declared_type: "thingy".into(),
                action: "create".into(),
            }
            .category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            Error::Other(anyhow::anyhow!("boom")).category(),
            ErrorCategory::Provider
        );
    }

    #[test]
    fn test_fatal_at_definition() {
        assert!(ErrorCategory::Registration.is_fatal_at_definition());
        assert!(ErrorCategory::Deprecation.is_fatal_at_definition());
        assert!(!ErrorCategory::Resolution.is_fatal_at_definition());
        assert!(!ErrorCategory::Provider.is_fatal_at_definition());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ProviderNotFound {
            declared_type: "my_resource".into(),
            action: "create".into(),
        };
        let display = err.to_string();
        assert!(display.contains("my_resource"));
        assert!(display.contains("create"));

        let err = Error::FileTypeMismatch {
            path: PathBuf::from("/tmp/x"),
            expected: "file".into(),
            actual: "directory".into(),
        };
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_provider_errors_pass_through() {
        let err: Error = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
    }
}
