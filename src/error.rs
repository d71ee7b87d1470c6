//! Error types for aeroforge
//!
//! `AeroforgeError` covers crate plumbing (storage, missions, IO). Collaborator
//! failures use `CollaboratorError`, which stages absorb into the workflow state
//! instead of propagating.

use thiserror::Error;

use crate::llm::LlmError;

/// All error types that can occur in aeroforge plumbing
#[derive(Debug, Error)]
pub enum AeroforgeError {
    /// Mission not found in the manager or storage
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// LLM client construction error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for aeroforge operations
pub type Result<T> = std::result::Result<T, AeroforgeError>;

/// Failure reported by an external collaborator (designer, geometry kernel,
/// simulator, analyst, decision oracle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Missing credential or collaborator not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transient network, timeout or quota failure
    #[error("Service error: {0}")]
    Service(String),

    /// Collaborator answered with something outside its contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Artifact could not be turned into a geometric model
    #[error("Execution error: {0}")]
    Execution(String),

    /// Geometric model could not be exported
    #[error("Export error: {0}")]
    Export(String),

    /// Simulation subprocess failed, timed out or produced no usable output
    #[error("Process error: {0}")]
    Process(String),

    /// Unrecoverable; ends the mission at the next decision
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl CollaboratorError {
    /// Returns true for missing-credential / unconfigured failures
    pub fn is_configuration(&self) -> bool {
        matches!(self, CollaboratorError::Configuration(_))
    }

}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey { .. } => CollaboratorError::Configuration(err.to_string()),
            LlmError::InvalidResponse(_) | LlmError::JsonError(_) => {
                CollaboratorError::InvalidResponse(err.to_string())
            }
            _ => CollaboratorError::Service(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_not_found_error() {
        let err = AeroforgeError::MissionNotFound("1738300800123-a1b2".to_string());
        assert_eq!(err.to_string(), "Mission not found: 1738300800123-a1b2");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = AeroforgeError::InvalidState("mission already running".to_string());
        assert_eq!(err.to_string(), "Invalid state: mission already running");
    }

    #[test]
    fn test_storage_error() {
        let err = AeroforgeError::Storage("file locked".to_string());
        assert_eq!(err.to_string(), "Storage error: file locked");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AeroforgeError = io_err.into();
        assert!(matches!(err, AeroforgeError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: AeroforgeError = json_err.into();
        assert!(matches!(err, AeroforgeError::Json(_)));
    }

    #[test]
    fn test_fatal_display_is_tagged() {
        let err = CollaboratorError::Fatal("airframe self-intersects".to_string());
        assert!(err.to_string().to_lowercase().contains("fatal"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_missing_key_maps_to_configuration() {
        let err: CollaboratorError = LlmError::MissingApiKey {
            env_var: "OPENROUTER_API_KEY".to_string(),
        }
        .into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_invalid_response_maps_through() {
        let err: CollaboratorError = LlmError::InvalidResponse("empty choices".to_string()).into();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }

    #[test]
    fn test_api_error_maps_to_service() {
        let err: CollaboratorError = LlmError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        }
        .into();
        assert!(matches!(err, CollaboratorError::Service(_)));
    }
}
