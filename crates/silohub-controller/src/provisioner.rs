//! Provisioning orchestration.
//!
//! Turns a freshly registered tenant into a submitted stack. The
//! change feed redelivers, so every step here must be idempotent: the
//! re-read guard and the conditional `Pending -> Provisioning` write
//! together guarantee at most one stack submission per tenant no
//! matter how often the same Created event arrives.

use std::sync::Arc;

use silohub_backend::ProvisioningBackend;
use silohub_core::{TenantRecord, TenantStatus};
use silohub_registry::TenantRegistry;
use tracing::{debug, info, warn};

use crate::error::ControllerError;
use crate::template::StackTemplate;

/// Drives stack creation for registered tenants.
pub struct ProvisioningOrchestrator {
    registry: Arc<dyn TenantRegistry>,
    backend: Arc<dyn ProvisioningBackend>,
    template: StackTemplate,
}

impl ProvisioningOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        backend: Arc<dyn ProvisioningBackend>,
        template: StackTemplate,
    ) -> Self {
        Self {
            registry,
            backend,
            template,
        }
    }

    /// Handles a Created event for a tenant.
    ///
    /// Duplicates and lost races resolve as success without touching
    /// the backend. A synchronous submission rejection moves the
    /// tenant to `ProvisionFailed` with the backend's reason recorded;
    /// there is no automatic retry.
    pub async fn provision(&self, tenant_id: &str) -> Result<(), ControllerError> {
        let mut record = self.registry.get(tenant_id).await?;

        // Re-read guard: anything past Pending means another worker
        // already picked this tenant up, or the event is a redelivery.
        if record.status != TenantStatus::Pending {
            debug!(tenant_id, status = %record.status, "Tenant already claimed, skipping");
            return Ok(());
        }

        record.transition(TenantStatus::Provisioning)?;
        let claimed = match self.registry.put(record).await {
            Ok(stored) => stored,
            Err(e) if e.is_conflict() => {
                debug!(tenant_id, "Lost provisioning claim race, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.submit(claimed).await
    }

    /// Operator retry of a failed provisioning attempt.
    ///
    /// Moves `ProvisionFailed -> Provisioning` and resubmits; any
    /// other status is rejected. Only tenants whose submission was
    /// refused outright can be retried: a rolled-back creation left a
    /// stack bound, and resubmitting would produce a second stack the
    /// record cannot track. Those tenants go through deletion instead.
    /// Returns the record as stored after the retry was accepted.
    pub async fn retry(&self, tenant_id: &str) -> Result<TenantRecord, ControllerError> {
        let mut record = self.registry.get(tenant_id).await?;
        if record.status != TenantStatus::ProvisionFailed {
            return Err(ControllerError::invalid_state(tenant_id, record.status));
        }
        if let Some(stack_id) = &record.stack_id {
            return Err(ControllerError::stack_still_bound(tenant_id, stack_id));
        }

        record.transition(TenantStatus::Provisioning)?;
        let claimed = self.registry.put(record).await?;
        let snapshot = claimed.clone();
        self.submit(claimed).await?;
        Ok(snapshot)
    }

    /// Submits the stack for a tenant already claimed as Provisioning.
    async fn submit(&self, record: TenantRecord) -> Result<(), ControllerError> {
        let request = self.template.render(&record);
        info!(
            tenant_id = %record.tenant_id,
            stack_name = %request.stack_name,
            backend = self.backend.backend_name(),
            "Submitting stack creation"
        );

        match self.backend.submit_create(&request).await {
            Ok(stack_id) => self.bind(record, stack_id.as_str()).await,
            Err(e) => {
                warn!(tenant_id = %record.tenant_id, error = %e, "Stack submission failed");
                self.mark_failed(record, e.to_string()).await
            }
        }
    }

    /// Records the stack id on the tenant, tolerating concurrent
    /// writers.
    ///
    /// A version conflict means someone else wrote in between: re-read
    /// and re-apply. If that writer already bound a different stack,
    /// give up and keep their binding.
    async fn bind(&self, mut record: TenantRecord, stack_id: &str) -> Result<(), ControllerError> {
        let tenant_id = record.tenant_id.clone();
        loop {
            if record.stack_id.as_deref() == Some(stack_id) {
                return Ok(());
            }
            if let Some(other) = &record.stack_id {
                warn!(
                    tenant_id = %record.tenant_id,
                    bound = %other,
                    submitted = stack_id,
                    "Stack already bound by another writer, keeping existing binding"
                );
                return Ok(());
            }

            record.bind_stack(stack_id)?;
            match self.registry.put(record).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() => {
                    record = self.registry.get(&tenant_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves the tenant to `ProvisionFailed`, tolerating concurrent
    /// writers.
    async fn mark_failed(
        &self,
        mut record: TenantRecord,
        reason: String,
    ) -> Result<(), ControllerError> {
        loop {
            if !record.status.can_transition_to(TenantStatus::ProvisionFailed) {
                debug!(
                    tenant_id = %record.tenant_id,
                    status = %record.status,
                    "Tenant moved on, not recording provisioning failure"
                );
                return Ok(());
            }
            record.fail(TenantStatus::ProvisionFailed, reason.clone())?;
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

impl std::fmt::Debug for ProvisioningOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningOrchestrator")
            .field("backend", &self.backend.backend_name())
            .field("template", &self.template)
            .finish()
    }
}
