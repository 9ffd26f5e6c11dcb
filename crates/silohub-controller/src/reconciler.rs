//! Status reconciliation.
//!
//! Consumes the backend's lifecycle event stream and folds terminal
//! stack statuses into tenant records. The stream is unordered and
//! duplicated, so every application is a conditional write against the
//! record's version token, and a record already in the target status
//! is left alone.

use std::sync::Arc;

use silohub_backend::{StackLifecycleEvent, StackStatus};
use silohub_core::TenantStatus;
use silohub_registry::TenantRegistry;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;

/// Folds stack lifecycle events into tenant records.
pub struct StatusReconciler {
    registry: Arc<dyn TenantRegistry>,
}

impl StatusReconciler {
    /// Creates a new reconciler.
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self { registry }
    }

    /// The tenant status a stack status maps to, if any.
    ///
    /// In-progress and unrecognized statuses carry no transition and
    /// are ignored by the reconciler.
    pub fn target_status(status: &StackStatus) -> Option<TenantStatus> {
        match status {
            StackStatus::CreateComplete => Some(TenantStatus::Active),
            StackStatus::CreateFailed
            | StackStatus::RollbackInProgress
            | StackStatus::RollbackComplete
            | StackStatus::RollbackFailed => Some(TenantStatus::ProvisionFailed),
            StackStatus::DeleteComplete => Some(TenantStatus::Deleted),
            StackStatus::DeleteFailed => Some(TenantStatus::DeleteFailed),
            StackStatus::CreateInProgress
            | StackStatus::DeleteInProgress
            | StackStatus::Other(_) => None,
        }
    }

    /// Applies one lifecycle event to the owning tenant record.
    ///
    /// Unknown stacks and unmapped statuses are logged and dropped.
    /// Version conflicts re-read and re-apply; a record that already
    /// reached the target, or can no longer legally reach it, is left
    /// untouched.
    pub async fn apply(&self, event: &StackLifecycleEvent) -> Result<(), ControllerError> {
        let Some(target) = Self::target_status(&event.status) else {
            debug!(stack_id = %event.stack_id, status = %event.status, "No transition for status");
            return Ok(());
        };

        loop {
            let Some(mut record) = self.registry.find_by_stack(event.stack_id.as_str()).await?
            else {
                warn!(stack_id = %event.stack_id, "Event for unknown stack, dropping");
                return Ok(());
            };

            if record.status == target {
                debug!(
                    tenant_id = %record.tenant_id,
                    status = %target,
                    "Already reconciled, dropping duplicate"
                );
                return Ok(());
            }
            if !record.status.can_transition_to(target) {
                debug!(
                    tenant_id = %record.tenant_id,
                    from = %record.status,
                    to = %target,
                    "Stale lifecycle event, dropping"
                );
                return Ok(());
            }

            if target.is_failed() {
                record.fail(target, format!("backend reported {}", event.status))?;
            } else {
                record.transition(target)?;
            }

            let tenant_id = record.tenant_id.clone();
            match self.registry.put(record).await {
                Ok(_) => {
                    info!(tenant_id = %tenant_id, status = %target, "Reconciled tenant status");
                    return Ok(());
                }
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Runs the reconcile loop until the event stream closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<StackLifecycleEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.apply(&event).await {
                        error!(stack_id = %event.stack_id, error = %e, "Reconciliation failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Status reconciler lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl std::fmt::Debug for StatusReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReconciler").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silohub_backend::StackId;
    use silohub_core::TenantRecord;
    use silohub_registry::InMemoryRegistry;

    async fn provisioning_tenant(
        registry: &Arc<dyn TenantRegistry>,
        stack_id: &str,
    ) -> TenantRecord {
        let mut record = TenantRecord::register("Acme").unwrap();
        record.transition(TenantStatus::Provisioning).unwrap();
        record.bind_stack(stack_id).unwrap();
        registry.put(record).await.unwrap()
    }

    fn reconciler() -> (Arc<dyn TenantRegistry>, StatusReconciler) {
        let registry: Arc<dyn TenantRegistry> = Arc::new(InMemoryRegistry::new());
        let reconciler = StatusReconciler::new(registry.clone());
        (registry, reconciler)
    }

    fn event(stack_id: &str, status: StackStatus) -> StackLifecycleEvent {
        StackLifecycleEvent::new(StackId::new(stack_id), status)
    }

    #[tokio::test]
    async fn test_create_complete_activates_tenant() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();

        let after = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(after.status, TenantStatus::Active);
    }

    #[tokio::test]
    async fn test_duplicate_terminal_event_is_noop() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();
        let first = registry.get(&stored.tenant_id).await.unwrap();

        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();
        let second = registry.get(&stored.tenant_id).await.unwrap();

        // The duplicate did not write: same version, same record
        assert_eq!(first.version, second.version);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rollback_records_failure_reason() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        reconciler
            .apply(&event("s1", StackStatus::RollbackComplete))
            .await
            .unwrap();

        let after = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(after.status, TenantStatus::ProvisionFailed);
        assert_eq!(
            after.failure_reason.as_deref(),
            Some("backend reported ROLLBACK_COMPLETE")
        );
    }

    #[tokio::test]
    async fn test_unknown_stack_is_dropped() {
        let (_registry, reconciler) = reconciler();
        reconciler
            .apply(&event("nobody", StackStatus::CreateComplete))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unmapped_statuses_are_ignored() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        for status in [
            StackStatus::CreateInProgress,
            StackStatus::DeleteInProgress,
            StackStatus::Other("REVIEW_IN_PROGRESS".into()),
        ] {
            reconciler.apply(&event("s1", status)).await.unwrap();
        }

        let after = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(after.status, TenantStatus::Provisioning);
        assert_eq!(after.version, stored.version);
    }

    #[tokio::test]
    async fn test_stale_event_after_terminal_state() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        // Walk the tenant all the way to Deleted
        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();
        let mut record = registry.get(&stored.tenant_id).await.unwrap();
        record.transition(TenantStatus::Deleting).unwrap();
        registry.put(record).await.unwrap();
        reconciler
            .apply(&event("s1", StackStatus::DeleteComplete))
            .await
            .unwrap();

        // A late CREATE_COMPLETE duplicate cannot resurrect it
        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();
        let after = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(after.status, TenantStatus::Deleted);
    }

    #[tokio::test]
    async fn test_delete_failed_maps_with_reason() {
        let (registry, reconciler) = reconciler();
        let stored = provisioning_tenant(&registry, "s1").await;

        reconciler
            .apply(&event("s1", StackStatus::CreateComplete))
            .await
            .unwrap();
        let mut record = registry.get(&stored.tenant_id).await.unwrap();
        record.transition(TenantStatus::Deleting).unwrap();
        registry.put(record).await.unwrap();

        reconciler
            .apply(&event("s1", StackStatus::DeleteFailed))
            .await
            .unwrap();

        let after = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(after.status, TenantStatus::DeleteFailed);
        assert_eq!(
            after.failure_reason.as_deref(),
            Some("backend reported DELETE_FAILED")
        );
    }
}
