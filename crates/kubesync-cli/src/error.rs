//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use kubesync_core::CoreError;
use kubesync_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Schema validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(code(kubesync::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Manifest loading error
    #[error("Manifest error: {message}")]
    #[diagnostic(code(kubesync::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kubesync::cli::io))]
    Io { message: String },

    /// Cluster or API failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(kubesync::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid arguments
    #[error("Usage error: {message}")]
    #[diagnostic(code(kubesync::cli::usage))]
    Usage { message: String },

    /// Interrupted before completion
    #[error("Interrupted")]
    #[diagnostic(
        code(kubesync::cli::interrupted),
        help("objects written before the interrupt were kept")
    )]
    Interrupted,

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(kubesync::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Interrupted => exit_codes::INTERRUPTED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    fn cluster(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: help.map(String::from),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::ManifestNotFound { .. } => CliError::Manifest {
                message: err.to_string(),
                help: Some("check the path, directories are read recursively".to_string()),
            },
            CoreError::InvalidVersion { .. } => CliError::cluster(err.to_string(), None),
            _ => CliError::Manifest {
                message: err.to_string(),
                help: Some(
                    "every document needs apiVersion, kind and metadata.name".to_string(),
                ),
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        if err.is_cancelled() {
            return CliError::Interrupted;
        }

        match err {
            KubeError::Core(e) => e.into(),
            KubeError::SchemaValidation { .. } => CliError::Validation {
                message: err.to_string(),
                help: None,
            },
            KubeError::SchemaNotFound { .. } => CliError::Validation {
                message: err.to_string(),
                help: Some("use --ignore-unknown to skip kinds without a schema".to_string()),
            },
            KubeError::NoResourceMapping { .. } => CliError::cluster(
                err.to_string(),
                Some("is the CustomResourceDefinition installed?"),
            ),
            KubeError::NoNamespace { .. } => {
                CliError::cluster(err.to_string(), Some("set --namespace or metadata.namespace"))
            }
            KubeError::CreateDisabled { .. } => {
                CliError::cluster(err.to_string(), Some("rerun with --create=true"))
            }
            KubeError::InvalidConfig(_) => CliError::cluster(
                err.to_string(),
                Some("check your kubeconfig and --context"),
            ),
            _ => CliError::cluster(err.to_string(), None),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err: CliError = KubeError::SchemaValidation {
            object: "ConfigMap default/a".to_string(),
            reason: "/data/a: 1 is not of type 'string'".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);

        let err: CliError = CoreError::ManifestNotFound {
            path: "missing.yaml".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 4);

        let err: CliError = KubeError::NoResourceMapping {
            api_version: "example.com/v1".to_string(),
            kind: "Widget".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 6);

        assert_eq!(CliError::usage("bad").exit_code(), 64);
    }

    #[test]
    fn test_cancellation_is_interrupt() {
        let err: CliError = KubeError::Cancelled.into();
        assert!(matches!(err, CliError::Interrupted));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_core_error_through_kube_error() {
        let err: CliError = KubeError::Core(CoreError::InvalidObject {
            message: "missing kind".to_string(),
        })
        .into();
        assert!(matches!(err, CliError::Manifest { .. }));
    }
}
