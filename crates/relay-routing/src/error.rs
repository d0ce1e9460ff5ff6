use core::result::Result as CoreResult;

use relay_core::{Capability, ContentType, Error as CoreError};
use thiserror::Error;

/// Result type for routing operations.
pub type Result<T> = CoreResult<T, RoutingError>;

/// Errors raised while routing requests and tracking jobs.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// An error from the core library or an adapter.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// No catalog model matches the request.
    #[error("No suitable provider for {content_type} generation")]
    NoSuitableProvider {
        /// Requested content type
        content_type: ContentType,
    },

    /// Every eligible candidate was tried and none succeeded.
    #[error("All configured providers failed ({attempts} attempted)")]
    AllProvidersFailed {
        /// Number of candidates that were invoked
        attempts: usize,
    },

    /// The job id is unknown or already retired.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The provider's adapter does not implement an optional capability.
    #[error("Provider {provider} does not support {capability}")]
    CapabilityMissing {
        /// Provider whose adapter lacks the capability
        provider: String,
        /// The capability that was requested
        capability: Capability,
    },

    /// No adapter is registered under the provider name.
    #[error("No adapter registered for provider {0}")]
    ProviderNotRegistered(String),

    /// No eligible candidate could open a stream.
    #[error("No streaming-capable provider for {content_type} generation")]
    NoStreamingProvider {
        /// Requested content type
        content_type: ContentType,
    },
}

impl RoutingError {
    /// Lifts adapter capability errors into the routing variant.
    pub fn from_adapter(error: CoreError) -> Self {
        match error {
            CoreError::CapabilityMissing {
                provider,
                capability,
            } => Self::CapabilityMissing {
                provider,
                capability,
            },
            other => Self::Core(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let no_provider = RoutingError::NoSuitableProvider {
            content_type: ContentType::Video,
        };
        assert_eq!(no_provider.to_string(), "No suitable provider for video generation");

        let exhausted = RoutingError::AllProvidersFailed { attempts: 3 };
        assert_eq!(exhausted.to_string(), "All configured providers failed (3 attempted)");

        let missing = RoutingError::JobNotFound("job_abc".to_owned());
        assert_eq!(missing.to_string(), "Job not found: job_abc");
    }

    #[test]
    fn test_from_adapter_lifts_capability_errors() {
        let lifted =
            RoutingError::from_adapter(CoreError::capability_missing("mock", Capability::Embedding));
        assert!(matches!(
            lifted,
            RoutingError::CapabilityMissing {
                capability: Capability::Embedding,
                ..
            }
        ));

        let wrapped = RoutingError::from_adapter(CoreError::Provider("down".to_owned()));
        assert!(matches!(wrapped, RoutingError::Core(CoreError::Provider(_))));
    }
}
