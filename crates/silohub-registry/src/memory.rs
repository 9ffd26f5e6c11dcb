//! In-memory registry backend using papaya lock-free HashMap.

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use silohub_core::TenantRecord;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::traits::{Page, TenantRegistry};

/// In-memory tenant registry.
///
/// Reads are lock-free via papaya; the conditional-write path is
/// serialized through a single mutex so the version check and the
/// replacement are one atomic step. Secondary indexes resolve tenant
/// name and stack id back to the owning tenant.
#[derive(Debug)]
pub struct InMemoryRegistry {
    /// Main store: tenantId -> record
    records: PapayaHashMap<String, TenantRecord>,
    /// Secondary index: tenantName -> tenantId
    names: PapayaHashMap<String, String>,
    /// Secondary index: stackId -> tenantId
    stacks: PapayaHashMap<String, String>,
    /// Serializes conditional writes; reads never take it
    write_lock: Mutex<()>,
}

impl InMemoryRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            records: PapayaHashMap::new(),
            names: PapayaHashMap::new(),
            stacks: PapayaHashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of stored tenant records.
    pub fn count(&self) -> usize {
        self.records.pin().iter().count()
    }

    fn index_stack(&self, record: &TenantRecord) {
        if let Some(stack_id) = &record.stack_id {
            self.stacks
                .pin()
                .insert(stack_id.clone(), record.tenant_id.clone());
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantRegistry for InMemoryRegistry {
    async fn put(&self, mut record: TenantRecord) -> Result<TenantRecord, RegistryError> {
        let _write = self.write_lock.lock().await;
        let guard = self.records.pin();

        match guard.get(&record.tenant_id) {
            None => {
                // First insert: the name must be free
                let names = self.names.pin();
                if names.get(&record.tenant_name).is_some() {
                    return Err(RegistryError::name_taken(record.tenant_name));
                }
                record.version = 1;
                names.insert(record.tenant_name.clone(), record.tenant_id.clone());
                self.index_stack(&record);
                guard.insert(record.tenant_id.clone(), record.clone());
                Ok(record)
            }
            Some(existing) => {
                if record.version != existing.version {
                    return Err(RegistryError::conflict(
                        record.tenant_id,
                        record.version,
                        existing.version,
                    ));
                }
                if record.tenant_name != existing.tenant_name {
                    return Err(RegistryError::internal(
                        "tenant name is immutable after creation",
                    ));
                }
                record.version = existing.version + 1;
                record.updated_at = OffsetDateTime::now_utc();
                self.index_stack(&record);
                guard.insert(record.tenant_id.clone(), record.clone());
                Ok(record)
            }
        }
    }

    async fn get(&self, tenant_id: &str) -> Result<TenantRecord, RegistryError> {
        self.records
            .pin()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(tenant_id))
    }

    async fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TenantRecord>, RegistryError> {
        let guard = self.records.pin();
        let mut all: Vec<TenantRecord> = guard.iter().map(|(_, r)| r.clone()).collect();
        // Stable order: registration time, tenant id as tiebreaker
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.tenant_id.cmp(&b.tenant_id))
        });

        let total = all.len();
        let items: Vec<TenantRecord> = all.into_iter().skip(offset).take(limit).collect();
        Ok(Page::new(items, total, offset))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TenantRecord>, RegistryError> {
        let tenant_id = match self.names.pin().get(name) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.records.pin().get(&tenant_id).cloned())
    }

    async fn find_by_stack(&self, stack_id: &str) -> Result<Option<TenantRecord>, RegistryError> {
        let tenant_id = match self.stacks.pin().get(stack_id) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.records.pin().get(&tenant_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silohub_core::TenantStatus;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    async fn registered(registry: &InMemoryRegistry, name: &str) -> TenantRecord {
        registry
            .put(TenantRecord::register(name).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = InMemoryRegistry::new();
        let stored = registered(&registry, "Acme").await;
        assert_eq!(stored.version, 1);

        let fetched = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(fetched.tenant_name, "Acme");
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let registry = InMemoryRegistry::new();
        let err = registry.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_name_collision_rejected() {
        let registry = InMemoryRegistry::new();
        registered(&registry, "Acme").await;

        let err = registry
            .put(TenantRecord::register("Acme").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NameTaken { .. }));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_conditional_update_bumps_version() {
        let registry = InMemoryRegistry::new();
        let mut stored = registered(&registry, "Acme").await;

        stored.transition(TenantStatus::Provisioning).unwrap();
        let stored = registry.put(stored).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, TenantStatus::Provisioning);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let registry = InMemoryRegistry::new();
        let stored = registered(&registry, "Acme").await;

        // Two writers read the same version
        let mut writer_a = stored.clone();
        let mut writer_b = stored.clone();

        writer_a.transition(TenantStatus::Provisioning).unwrap();
        registry.put(writer_a).await.unwrap();

        writer_b.transition(TenantStatus::Provisioning).unwrap();
        let err = registry.put(writer_b).await.unwrap_err();
        assert!(err.is_conflict());

        // The winner's write is intact
        let current = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(current.version, 2);
        assert_eq!(current.status, TenantStatus::Provisioning);
    }

    #[tokio::test]
    async fn test_name_is_immutable() {
        let registry = InMemoryRegistry::new();
        let mut stored = registered(&registry, "Acme").await;
        stored.tenant_name = "Other".into();
        let err = registry.put(stored).await.unwrap_err();
        assert!(matches!(err, RegistryError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let registry = InMemoryRegistry::new();
        let stored = registered(&registry, "Acme").await;

        let found = registry.find_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(found.tenant_id, stored.tenant_id);
        assert!(registry.find_by_name("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_stack_after_binding() {
        let registry = InMemoryRegistry::new();
        let mut stored = registered(&registry, "Acme").await;

        assert!(registry.find_by_stack("s1").await.unwrap().is_none());

        stored.transition(TenantStatus::Provisioning).unwrap();
        stored.bind_stack("s1").unwrap();
        registry.put(stored.clone()).await.unwrap();

        let found = registry.find_by_stack("s1").await.unwrap().unwrap();
        assert_eq!(found.tenant_id, stored.tenant_id);
    }

    #[tokio::test]
    async fn test_list_is_paged_and_stable() {
        let registry = InMemoryRegistry::new();
        for i in 0..5 {
            registered(&registry, &format!("tenant-{i}")).await;
        }

        let first = registry.list(0, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.total, 5);
        assert!(first.has_more);

        let rest = registry.list(2, 10).await.unwrap();
        assert_eq!(rest.len(), 3);
        assert!(!rest.has_more);

        // Restartable: re-reading the first page yields the same ids
        let again = registry.list(0, 2).await.unwrap();
        let ids: Vec<_> = first.items.iter().map(|r| &r.tenant_id).collect();
        let ids_again: Vec<_> = again.items.iter().map(|r| &r.tenant_id).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn test_concurrent_stale_writers_exactly_one_wins() {
        let registry = Arc::new(InMemoryRegistry::new());
        let stored = registered(&registry, "Acme").await;

        let mut join_set = JoinSet::new();
        for _ in 0..10 {
            let registry = Arc::clone(&registry);
            let mut candidate = stored.clone();
            join_set.spawn(async move {
                candidate.transition(TenantStatus::Provisioning).unwrap();
                registry.put(candidate).await
            });
        }

        let mut wins = 0;
        let mut conflicts = 0;
        while let Some(result) = join_set.join_next().await {
            match result.unwrap() {
                Ok(_) => wins += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 9);
        let current = registry.get(&stored.tenant_id).await.unwrap();
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_distinct_names() {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut join_set = JoinSet::new();
        for i in 0..20 {
            let registry = Arc::clone(&registry);
            join_set.spawn(async move {
                registry
                    .put(TenantRecord::register(format!("tenant-{i}")).unwrap())
                    .await
            });
        }

        while let Some(result) = join_set.join_next().await {
            result.unwrap().unwrap();
        }
        assert_eq!(registry.count(), 20);
    }

    #[tokio::test]
    async fn test_concurrent_same_name_single_winner() {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut join_set = JoinSet::new();
        for _ in 0..10 {
            let registry = Arc::clone(&registry);
            join_set.spawn(async move {
                registry
                    .put(TenantRecord::register("Acme").unwrap())
                    .await
            });
        }

        let mut wins = 0;
        let mut taken = 0;
        while let Some(result) = join_set.join_next().await {
            match result.unwrap() {
                Ok(_) => wins += 1,
                Err(RegistryError::NameTaken { .. }) => taken += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(taken, 9);
    }
}
