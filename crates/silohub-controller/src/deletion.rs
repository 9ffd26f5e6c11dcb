//! Deletion orchestration.
//!
//! Accepts teardown requests, moves the tenant to `Deleting` and
//! submits the stack deletion. Completion is never awaited here: the
//! backend reports DELETE_COMPLETE or DELETE_FAILED on the lifecycle
//! stream and the reconciler folds it in.

use std::sync::Arc;

use silohub_backend::{ProvisioningBackend, StackId};
use silohub_core::{TenantRecord, TenantStatus};
use silohub_registry::TenantRegistry;
use tracing::{info, warn};

use crate::error::ControllerError;

/// Drives stack teardown for tenants.
pub struct DeletionOrchestrator {
    registry: Arc<dyn TenantRegistry>,
    backend: Arc<dyn ProvisioningBackend>,
}

impl DeletionOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(registry: Arc<dyn TenantRegistry>, backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self { registry, backend }
    }

    /// Requests teardown of a tenant's stack.
    ///
    /// Allowed from `Active` and from `ProvisionFailed` when a stack
    /// was bound (a rolled-back creation may have left resources
    /// behind). Everything else, including a tenant already deleting,
    /// is rejected with `InvalidState`. Returns the record as stored
    /// after the request was accepted.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Submission` when the backend refuses
    /// the teardown; the tenant is moved to `DeleteFailed` first so an
    /// operator retry can pick it up.
    pub async fn request_delete(&self, tenant_id: &str) -> Result<TenantRecord, ControllerError> {
        loop {
            let mut record = self.registry.get(tenant_id).await?;
            if !record.status.is_deletable() {
                return Err(ControllerError::invalid_state(tenant_id, record.status));
            }
            let Some(stack_id) = record.stack_id.clone() else {
                // Nothing was ever provisioned, there is no stack to
                // tear down
                return Err(ControllerError::invalid_state(tenant_id, record.status));
            };

            record.transition(TenantStatus::Deleting)?;
            match self.registry.put(record).await {
                Ok(stored) => return self.submit(stored, StackId::new(stack_id)).await,
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Operator retry of a failed teardown.
    ///
    /// Moves `DeleteFailed -> Deleting` and resubmits; any other
    /// status is rejected.
    pub async fn retry(&self, tenant_id: &str) -> Result<TenantRecord, ControllerError> {
        let mut record = self.registry.get(tenant_id).await?;
        if record.status != TenantStatus::DeleteFailed {
            return Err(ControllerError::invalid_state(tenant_id, record.status));
        }
        let Some(stack_id) = record.stack_id.clone() else {
            return Err(ControllerError::invalid_state(tenant_id, record.status));
        };

        record.transition(TenantStatus::Deleting)?;
        let stored = self.registry.put(record).await?;
        self.submit(stored, StackId::new(stack_id)).await
    }

    /// Submits the teardown for a tenant already moved to Deleting.
    async fn submit(
        &self,
        record: TenantRecord,
        stack_id: StackId,
    ) -> Result<TenantRecord, ControllerError> {
        info!(
            tenant_id = %record.tenant_id,
            stack_id = %stack_id,
            backend = self.backend.backend_name(),
            "Submitting stack teardown"
        );
        match self.backend.submit_delete(&stack_id).await {
            Ok(()) => Ok(record),
            Err(e) => {
                warn!(tenant_id = %record.tenant_id, error = %e, "Teardown submission failed");
                self.mark_failed(record, e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    /// Moves the tenant to `DeleteFailed`, tolerating concurrent
    /// writers.
    async fn mark_failed(
        &self,
        mut record: TenantRecord,
        reason: String,
    ) -> Result<(), ControllerError> {
        loop {
            if !record.status.can_transition_to(TenantStatus::DeleteFailed) {
                return Ok(());
            }
            record.fail(TenantStatus::DeleteFailed, reason.clone())?;
            let tenant_id = record.tenant_id.clone();
            match self.registry.put(record).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() => {
                    record = self.registry.get(&tenant_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl std::fmt::Debug for DeletionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionOrchestrator")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}
