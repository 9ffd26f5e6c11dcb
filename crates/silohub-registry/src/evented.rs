//! EventedRegistry - a registry wrapper that emits the change feed.
//!
//! Delegates all operations to an inner registry while emitting one
//! change event to the feed after each successful put: Created for the
//! first insert of a tenant, Updated for every write after that.
//! Events are emitted after the write lands, so the feed never carries
//! a snapshot that was not actually stored.

use std::sync::Arc;

use async_trait::async_trait;
use silohub_core::{ChangeFeed, TenantRecord};
use tracing::debug;

use crate::error::RegistryError;
use crate::traits::{Page, TenantRegistry};

/// A registry wrapper emitting change events after successful puts.
pub struct EventedRegistry<R: TenantRegistry> {
    inner: R,
    feed: Arc<ChangeFeed>,
}

impl<R: TenantRegistry> EventedRegistry<R> {
    /// Create a new evented registry wrapper.
    pub fn new(inner: R, feed: Arc<ChangeFeed>) -> Self {
        Self { inner, feed }
    }

    /// Get a reference to the inner registry.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Get a reference to the change feed.
    pub fn feed(&self) -> &Arc<ChangeFeed> {
        &self.feed
    }
}

#[async_trait]
impl<R: TenantRegistry> TenantRegistry for EventedRegistry<R> {
    async fn put(&self, record: TenantRecord) -> Result<TenantRecord, RegistryError> {
        let stored = self.inner.put(record).await?;

        // Version 1 means the put was the first insert
        let subscribers = if stored.version == 1 {
            self.feed.send_created(stored.clone())
        } else {
            self.feed.send_updated(stored.clone())
        };
        debug!(
            tenant_id = %stored.tenant_id,
            version = stored.version,
            subscribers,
            "Emitted change event"
        );

        Ok(stored)
    }

    async fn get(&self, tenant_id: &str) -> Result<TenantRecord, RegistryError> {
        self.inner.get(tenant_id).await
    }

    async fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TenantRecord>, RegistryError> {
        self.inner.list(offset, limit).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TenantRecord>, RegistryError> {
        self.inner.find_by_name(name).await
    }

    async fn find_by_stack(&self, stack_id: &str) -> Result<Option<TenantRecord>, RegistryError> {
        self.inner.find_by_stack(stack_id).await
    }
}

impl<R: TenantRegistry> std::fmt::Debug for EventedRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedRegistry")
            .field("subscriber_count", &self.feed.subscriber_count())
            .finish()
    }
}
