//! Registry error types.

use std::fmt;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The requested tenant was not found.
    #[error("Tenant not found: {tenant_id}")]
    NotFound {
        /// The id of the tenant that was not found.
        tenant_id: String,
    },

    /// A conditional write lost the optimistic-concurrency race.
    #[error("Version conflict for tenant {tenant_id}: wrote with {supplied}, stored is {stored}")]
    Conflict {
        /// The tenant the write targeted.
        tenant_id: String,
        /// The version token the writer supplied.
        supplied: u64,
        /// The version actually stored.
        stored: u64,
    },

    /// A tenant with this name is already registered.
    #[error("Tenant name already taken: {name}")]
    NameTaken {
        /// The colliding tenant name.
        name: String,
    },

    /// An internal registry error occurred.
    #[error("Internal registry error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl RegistryError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(tenant_id: impl Into<String>) -> Self {
        Self::NotFound {
            tenant_id: tenant_id.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(tenant_id: impl Into<String>, supplied: u64, stored: u64) -> Self {
        Self::Conflict {
            tenant_id: tenant_id.into(),
            supplied,
            stored,
        }
    }

    /// Creates a new `NameTaken` error.
    #[must_use]
    pub fn name_taken(name: impl Into<String>) -> Self {
        Self::NameTaken { name: name.into() }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a lost optimistic-concurrency race.
    ///
    /// Conflicts are always safe to absorb: some other writer already
    /// applied an equal-or-later state.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } | Self::NameTaken { .. } => ErrorCategory::Conflict,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of registry errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Tenant not found.
    NotFound,
    /// Conflict (version race or name collision).
    Conflict,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::not_found("t1");
        assert_eq!(err.to_string(), "Tenant not found: t1");

        let err = RegistryError::conflict("t1", 2, 3);
        assert_eq!(
            err.to_string(),
            "Version conflict for tenant t1: wrote with 2, stored is 3"
        );

        let err = RegistryError::name_taken("Acme");
        assert_eq!(err.to_string(), "Tenant name already taken: Acme");
    }

    #[test]
    fn test_error_predicates() {
        assert!(RegistryError::not_found("t1").is_not_found());
        assert!(!RegistryError::not_found("t1").is_conflict());
        assert!(RegistryError::conflict("t1", 1, 2).is_conflict());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            RegistryError::not_found("t1").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            RegistryError::conflict("t1", 1, 2).category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            RegistryError::name_taken("Acme").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            RegistryError::internal("boom").category(),
            ErrorCategory::Internal
        );
    }
}
