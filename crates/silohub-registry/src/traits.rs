//! Registry traits and paging types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use silohub_core::TenantRecord;

use crate::error::RegistryError;

/// One page of a restartable scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// Total count of records matching the scan.
    pub total: usize,
    /// Offset this page started at.
    pub offset: usize,
    /// Whether more records exist beyond this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Creates a new page.
    #[must_use]
    pub fn new(items: Vec<T>, total: usize, offset: usize) -> Self {
        let has_more = offset + items.len() < total;
        Self {
            items,
            total,
            offset,
            has_more,
        }
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if this page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The keyed store of tenant records.
///
/// Implementations must be thread-safe (`Send + Sync`). Every write
/// goes through [`put`], which is conditional on the record's version
/// token: the write is accepted only if the stored record has not
/// changed since the writer last read it. Writers losing that race get
/// [`RegistryError::Conflict`] and must re-read before retrying.
///
/// [`put`]: TenantRegistry::put
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Creates or conditionally updates a tenant record.
    ///
    /// A record with version 0 is a first insert; the tenant name must
    /// be free or the put fails with `NameTaken`. Any later put must
    /// carry the version of the record it was read from.
    ///
    /// Returns the stored record with its bumped version token.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` when the version token is stale.
    /// Returns `RegistryError::NameTaken` when a first insert collides
    /// on the tenant name.
    async fn put(&self, record: TenantRecord) -> Result<TenantRecord, RegistryError>;

    /// Reads a tenant record by id.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the tenant does not exist.
    async fn get(&self, tenant_id: &str) -> Result<TenantRecord, RegistryError>;

    /// Scans tenant records in a stable order, one page at a time.
    async fn list(&self, offset: usize, limit: usize)
    -> Result<Page<TenantRecord>, RegistryError>;

    /// Resolves a tenant via the secondary name index.
    ///
    /// Returns `None` if no tenant carries this name.
    async fn find_by_name(&self, name: &str) -> Result<Option<TenantRecord>, RegistryError>;

    /// Resolves the tenant owning a stack via the stack index.
    ///
    /// The index is populated when a put stores a record carrying a
    /// stack id. Returns `None` for unknown stacks.
    async fn find_by_stack(&self, stack_id: &str) -> Result<Option<TenantRecord>, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that TenantRegistry is object-safe
    fn _assert_registry_object_safe(_: &dyn TenantRegistry) {}

    #[test]
    fn test_page_has_more() {
        let page = Page::new(vec![1, 2, 3], 10, 0);
        assert_eq!(page.len(), 3);
        assert!(page.has_more);

        let page = Page::new(vec![9, 10], 10, 8);
        assert!(!page.has_more);
        assert!(!page.is_empty());

        let page: Page<i32> = Page::new(Vec::new(), 0, 0);
        assert!(page.is_empty());
        assert!(!page.has_more);
    }
}
