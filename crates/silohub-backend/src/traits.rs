//! The provisioning backend capability trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::SubmissionError;
use crate::types::{StackId, StackLifecycleEvent, StackRequest, StackResource};

/// Capability interface of the provisioning backend.
///
/// Submissions are fire-and-observe: a successful submit means the
/// backend accepted the work, not that it finished. Completion and
/// failure arrive later on the lifecycle event stream, unordered and
/// possibly duplicated. Submitted operations cannot be cancelled.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Submits a stack creation request.
    ///
    /// Returns the id of the stack the backend started creating.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Rejected` when the backend refuses
    /// the request synchronously (bad template, quota, permissions).
    async fn submit_create(&self, request: &StackRequest) -> Result<StackId, SubmissionError>;

    /// Submits a stack teardown request.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::UnknownStack` for unknown stack ids.
    async fn submit_delete(&self, stack_id: &StackId) -> Result<(), SubmissionError>;

    /// Lists the live resources of a stack.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::UnknownStack` for unknown stack ids.
    async fn list_resources(
        &self,
        stack_id: &StackId,
    ) -> Result<Vec<StackResource>, SubmissionError>;

    /// Subscribe to lifecycle events broadcast after this call.
    fn subscribe(&self) -> broadcast::Receiver<StackLifecycleEvent>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that ProvisioningBackend is object-safe
    fn _assert_backend_object_safe(_: &dyn ProvisioningBackend) {}
}
