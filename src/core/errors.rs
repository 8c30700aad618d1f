use thiserror::Error;

use crate::dom::NodeId;
use crate::hooks::HookName;

/// Unified error type for the parallel visit library
#[derive(Debug, Error)]
pub enum ParallelError {
    /// A replace handler expected the host's default handler and got none
    #[error("No default handler supplied for hook `{hook}`")]
    MissingDefaultHandler { hook: HookName },

    /// Hook was used before it was created on the bus
    #[error("Unknown hook `{hook}`")]
    UnknownHook { hook: HookName },

    /// A registered hook handler failed
    #[error("Hook `{hook}` failed: {message}")]
    Hook {
        hook: HookName,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Selector could not be parsed
    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// Node id does not belong to the document
    #[error("Node not found: {node:?}")]
    NodeNotFound { node: NodeId },

    /// Tree mutation that would leave the document inconsistent
    #[error("DOM operation `{operation}` failed: {message}")]
    Dom { operation: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Errors raised by integrator handlers written against anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParallelError {
    /// Create a missing default handler error
    pub fn missing_default(hook: HookName) -> Self {
        Self::MissingDefaultHandler { hook }
    }

    /// Create an unknown hook error
    pub fn unknown_hook(hook: HookName) -> Self {
        Self::UnknownHook { hook }
    }

    /// Create a hook failure error
    pub fn hook<M: Into<String>>(hook: HookName, message: M) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
            source: None,
        }
    }

    /// Create a selector error
    pub fn selector<S: Into<String>, M: Into<String>>(selector: S, message: M) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(node: NodeId) -> Self {
        Self::NodeNotFound { node }
    }

    /// Create a DOM operation error
    pub fn dom<S: Into<String>, M: Into<String>>(operation: S, message: M) -> Self {
        Self::Dom {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error signals a broken host/plugin contract rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingDefaultHandler { .. } | Self::UnknownHook { .. } | Self::NodeNotFound { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingDefaultHandler { .. } | Self::UnknownHook { .. } => "contract",
            Self::Hook { .. } => "hook",
            Self::Selector { .. } => "selector",
            Self::NodeNotFound { .. } | Self::Dom { .. } => "dom",
            Self::Configuration { .. } => "configuration",
            Self::Serialization { .. } => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, ParallelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ParallelError::missing_default(HookName::AnimationOutAwait);
        assert!(err.is_fatal());
        assert_eq!(err.category(), "contract");
        assert_eq!(
            err.to_string(),
            "No default handler supplied for hook `animation:out:await`"
        );

        let err = ParallelError::selector("#a >", "dangling combinator");
        assert!(!err.is_fatal());
        assert_eq!(err.category(), "selector");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ParallelError = anyhow::anyhow!("handler blew up").into();
        assert_eq!(err.category(), "other");
        assert_eq!(err.to_string(), "handler blew up");
    }
}
