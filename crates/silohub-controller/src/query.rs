//! Read-side queries over tenants and their stacks.

use std::sync::Arc;

use silohub_backend::{ProvisioningBackend, StackId, StackResource};
use silohub_core::{TenantRecord, TenantStatus};
use silohub_registry::{Page, TenantRegistry};

use crate::error::ControllerError;

/// Read-only access to tenant records and live stack resources.
pub struct QueryService {
    registry: Arc<dyn TenantRegistry>,
    backend: Arc<dyn ProvisioningBackend>,
}

impl QueryService {
    /// Creates a new query service.
    pub fn new(registry: Arc<dyn TenantRegistry>, backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self { registry, backend }
    }

    /// Lists tenant records, one page at a time.
    pub async fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TenantRecord>, ControllerError> {
        Ok(self.registry.list(offset, limit).await?)
    }

    /// Reads one tenant record.
    pub async fn get(&self, tenant_id: &str) -> Result<TenantRecord, ControllerError> {
        Ok(self.registry.get(tenant_id).await?)
    }

    /// Lists the live resources of a tenant's stack.
    ///
    /// Only an `Active` tenant has a stable stack worth introspecting;
    /// any other status is rejected with `InvalidState`.
    pub async fn resources(&self, tenant_id: &str) -> Result<Vec<StackResource>, ControllerError> {
        let record = self.registry.get(tenant_id).await?;
        if record.status != TenantStatus::Active {
            return Err(ControllerError::invalid_state(tenant_id, record.status));
        }
        let Some(stack_id) = record.stack_id else {
            return Err(ControllerError::invalid_state(tenant_id, record.status));
        };
        Ok(self.backend.list_resources(&StackId::new(stack_id)).await?)
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silohub_backend::SimulatedBackend;
    use silohub_registry::InMemoryRegistry;

    fn service() -> (Arc<dyn TenantRegistry>, Arc<SimulatedBackend>, QueryService) {
        let registry: Arc<dyn TenantRegistry> = Arc::new(InMemoryRegistry::new());
        let backend = SimulatedBackend::new_shared();
        let service = QueryService::new(registry.clone(), backend.clone());
        (registry, backend, service)
    }

    #[tokio::test]
    async fn test_list_pages() {
        let (registry, _backend, service) = service();
        for name in ["A", "B", "C"] {
            registry
                .put(TenantRecord::register(name).unwrap())
                .await
                .unwrap();
        }

        let page = service.list(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);

        let page = service.list(2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_resources_requires_active() {
        let (registry, _backend, service) = service();
        let stored = registry
            .put(TenantRecord::register("Acme").unwrap())
            .await
            .unwrap();

        let err = service.resources(&stored.tenant_id).await.unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[tokio::test]
    async fn test_resources_of_active_tenant() {
        let (registry, backend, service) = service();

        use silohub_backend::StackRequest;
        let stack_id = backend
            .submit_create(&StackRequest::new("tenantid-t1", "templates/tenant-stack@v1"))
            .await
            .unwrap();

        let mut record = TenantRecord::register("Acme").unwrap();
        record.transition(TenantStatus::Provisioning).unwrap();
        record.bind_stack(stack_id.as_str()).unwrap();
        record.transition(TenantStatus::Active).unwrap();
        let stored = registry.put(record).await.unwrap();

        let resources = service.resources(&stored.tenant_id).await.unwrap();
        assert!(!resources.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_tenant() {
        let (_registry, _backend, service) = service();
        let err = service.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
