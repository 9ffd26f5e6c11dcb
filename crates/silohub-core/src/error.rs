use thiserror::Error;

use crate::tenant::TenantStatus;

/// Core error types for tenant lifecycle operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: TenantStatus,
        to: TenantStatus,
    },

    #[error("Invalid tenant name: {0}")]
    InvalidTenantName(String),

    #[error("Stack already bound: tenant {tenant_id} holds stack {stack_id}")]
    StackAlreadyBound { tenant_id: String, stack_id: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidTransition error
    pub fn invalid_transition(from: TenantStatus, to: TenantStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Create a new InvalidTenantName error
    pub fn invalid_tenant_name(name: impl Into<String>) -> Self {
        Self::InvalidTenantName(name.into())
    }

    /// Create a new StackAlreadyBound error
    pub fn stack_already_bound(
        tenant_id: impl Into<String>,
        stack_id: impl Into<String>,
    ) -> Self {
        Self::StackAlreadyBound {
            tenant_id: tenant_id.into(),
            stack_id: stack_id.into(),
        }
    }

    /// Check if this error is an invalid-transition rejection
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTransition { .. } => ErrorCategory::Transition,
            Self::InvalidTenantName(_) | Self::StackAlreadyBound { .. } => {
                ErrorCategory::Validation
            }
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transition,
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transition => write!(f, "transition"),
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = CoreError::invalid_transition(TenantStatus::Deleted, TenantStatus::Provisioning);
        assert_eq!(err.to_string(), "Invalid transition: deleted -> provisioning");
        assert!(err.is_invalid_transition());
        assert_eq!(err.category(), ErrorCategory::Transition);
    }

    #[test]
    fn test_stack_already_bound_error() {
        let err = CoreError::stack_already_bound("t1", "s1");
        assert_eq!(
            err.to_string(),
            "Stack already bound: tenant t1 holds stack s1"
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope }").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::JsonError(_)));
        assert_eq!(core_err.category(), ErrorCategory::Serialization);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Transition.to_string(), "transition");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Serialization.to_string(), "serialization");
    }
}
