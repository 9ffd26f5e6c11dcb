//! Controller error types.

use silohub_backend::SubmissionError;
use silohub_core::{CoreError, TenantStatus};
use silohub_registry::RegistryError;

/// Errors surfaced by the controller components.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A record-level operation failed (transition, binding, name).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The provisioning backend refused a submission.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The operation is not allowed in the tenant's current status.
    #[error("Tenant {tenant_id} is {status}, operation not allowed")]
    InvalidState {
        /// The tenant the operation targeted.
        tenant_id: String,
        /// The status the tenant was in.
        status: TenantStatus,
    },

    /// A provisioning retry was requested while the tenant still owns
    /// a live stack. Resubmitting would orphan that stack, so the
    /// tenant has to be deleted first.
    #[error("Tenant {tenant_id} is still bound to stack {stack_id}, delete it before retrying")]
    StackStillBound {
        /// The tenant the retry targeted.
        tenant_id: String,
        /// The stack the tenant is bound to.
        stack_id: String,
    },
}

impl ControllerError {
    /// Creates a new `InvalidState` error.
    #[must_use]
    pub fn invalid_state(tenant_id: impl Into<String>, status: TenantStatus) -> Self {
        Self::InvalidState {
            tenant_id: tenant_id.into(),
            status,
        }
    }

    /// Creates a new `StackStillBound` error.
    #[must_use]
    pub fn stack_still_bound(tenant_id: impl Into<String>, stack_id: impl Into<String>) -> Self {
        Self::StackStillBound {
            tenant_id: tenant_id.into(),
            stack_id: stack_id.into(),
        }
    }

    /// Returns `true` if the target tenant or stack does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_not_found(),
            Self::Submission(e) => matches!(e, SubmissionError::UnknownStack { .. }),
            _ => false,
        }
    }

    /// Returns `true` if the operation was refused for the tenant's
    /// current state (precondition or transition rejection).
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        match self {
            Self::InvalidState { .. } | Self::StackStillBound { .. } => true,
            Self::Core(e) => e.is_invalid_transition(),
            _ => false,
        }
    }
}
