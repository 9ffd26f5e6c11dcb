//! Simulated in-memory provisioning backend.
//!
//! Used by the test suites and by local runs without a real backend.
//! Every accepted submission is recorded, so tests can assert how many
//! creations a tenant actually triggered; lifecycle events are either
//! emitted by the driver through [`SimulatedBackend::emit_status`] or,
//! with auto-complete enabled, published by the backend itself shortly
//! after each submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::SubmissionError;
use crate::traits::ProvisioningBackend;
use crate::types::{
    StackId, StackLifecycleEvent, StackRequest, StackResource, StackStatus,
};

/// Buffer size of the lifecycle event channel.
const EVENT_BUFFER_SIZE: usize = 256;

/// Delay before auto-complete emits the terminal event.
const AUTO_COMPLETE_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
struct SimulatedStack {
    request: StackRequest,
    status: StackStatus,
}

/// In-memory stand-in for the real provisioning backend.
#[derive(Debug)]
pub struct SimulatedBackend {
    stacks: PapayaHashMap<String, SimulatedStack>,
    create_submissions: AtomicUsize,
    delete_submissions: AtomicUsize,
    reject_creates: AtomicBool,
    reject_deletes: AtomicBool,
    auto_complete: AtomicBool,
    next_stack: AtomicU64,
    events: broadcast::Sender<StackLifecycleEvent>,
}

impl SimulatedBackend {
    /// Creates a new simulated backend that never completes work on
    /// its own; the driver emits lifecycle events explicitly.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            stacks: PapayaHashMap::new(),
            create_submissions: AtomicUsize::new(0),
            delete_submissions: AtomicUsize::new(0),
            reject_creates: AtomicBool::new(false),
            reject_deletes: AtomicBool::new(false),
            auto_complete: AtomicBool::new(false),
            next_stack: AtomicU64::new(1),
            events,
        }
    }

    /// Creates a backend wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Creates a backend that emits the happy-path terminal event
    /// shortly after each accepted submission. Used for local runs.
    pub fn auto_completing() -> Arc<Self> {
        let backend = Self::new_shared();
        backend.auto_complete.store(true, Ordering::SeqCst);
        backend
    }

    /// Make subsequent create submissions fail synchronously.
    pub fn reject_creates(&self, reject: bool) {
        self.reject_creates.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent delete submissions fail synchronously.
    pub fn reject_deletes(&self, reject: bool) {
        self.reject_deletes.store(reject, Ordering::SeqCst);
    }

    /// Number of create submissions the backend accepted or rejected.
    pub fn create_submission_count(&self) -> usize {
        self.create_submissions.load(Ordering::SeqCst)
    }

    /// Number of delete submissions the backend accepted or rejected.
    pub fn delete_submission_count(&self) -> usize {
        self.delete_submissions.load(Ordering::SeqCst)
    }

    /// Snapshot of the accepted create requests, in no stable order.
    pub fn submitted_requests(&self) -> Vec<StackRequest> {
        self.stacks
            .pin()
            .iter()
            .map(|(_, stack)| stack.request.clone())
            .collect()
    }

    /// Update a stack's status and broadcast the lifecycle event.
    ///
    /// Returns the number of subscribers that observed the event.
    pub fn emit_status(&self, stack_id: &StackId, status: StackStatus) -> usize {
        let guard = self.stacks.pin();
        if let Some(stack) = guard.get(stack_id.as_str()) {
            let mut updated = stack.clone();
            updated.status = status.clone();
            guard.insert(stack_id.as_str().to_string(), updated);
        }
        self.emit(StackLifecycleEvent::new(stack_id.clone(), status))
    }

    /// Broadcast an arbitrary lifecycle event, stack known or not.
    ///
    /// Lets tests deliver duplicates and events for stacks this
    /// backend never created.
    pub fn emit(&self, event: StackLifecycleEvent) -> usize {
        self.events.send(event).unwrap_or_default()
    }

    fn schedule_auto_complete(&self, stack_id: StackId, status: StackStatus) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_COMPLETE_DELAY).await;
            let _ = events.send(StackLifecycleEvent::new(stack_id, status));
        });
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningBackend for SimulatedBackend {
    async fn submit_create(&self, request: &StackRequest) -> Result<StackId, SubmissionError> {
        self.create_submissions.fetch_add(1, Ordering::SeqCst);
        if self.reject_creates.load(Ordering::SeqCst) {
            return Err(SubmissionError::rejected(format!(
                "create rejected for stack {}",
                request.stack_name
            )));
        }

        let n = self.next_stack.fetch_add(1, Ordering::SeqCst);
        let stack_id = StackId::new(format!("stack-{n}"));
        self.stacks.pin().insert(
            stack_id.as_str().to_string(),
            SimulatedStack {
                request: request.clone(),
                status: StackStatus::CreateInProgress,
            },
        );
        debug!(stack_id = %stack_id, stack_name = %request.stack_name, "Accepted create submission");

        if self.auto_complete.load(Ordering::SeqCst) {
            self.schedule_auto_complete(stack_id.clone(), StackStatus::CreateComplete);
        }
        Ok(stack_id)
    }

    async fn submit_delete(&self, stack_id: &StackId) -> Result<(), SubmissionError> {
        self.delete_submissions.fetch_add(1, Ordering::SeqCst);
        if self.reject_deletes.load(Ordering::SeqCst) {
            return Err(SubmissionError::rejected(format!(
                "delete rejected for stack {stack_id}"
            )));
        }

        let guard = self.stacks.pin();
        let stack = guard
            .get(stack_id.as_str())
            .ok_or_else(|| SubmissionError::unknown_stack(stack_id.as_str()))?;
        let mut updated = stack.clone();
        updated.status = StackStatus::DeleteInProgress;
        guard.insert(stack_id.as_str().to_string(), updated);
        debug!(stack_id = %stack_id, "Accepted delete submission");

        if self.auto_complete.load(Ordering::SeqCst) {
            self.schedule_auto_complete(stack_id.clone(), StackStatus::DeleteComplete);
        }
        Ok(())
    }

    async fn list_resources(
        &self,
        stack_id: &StackId,
    ) -> Result<Vec<StackResource>, SubmissionError> {
        let guard = self.stacks.pin();
        let stack = guard
            .get(stack_id.as_str())
            .ok_or_else(|| SubmissionError::unknown_stack(stack_id.as_str()))?;

        let name = &stack.request.stack_name;
        Ok(vec![
            StackResource {
                logical_id: "TenantTable".into(),
                resource_type: "Storage::Table".into(),
                physical_id: Some(format!("{name}-table")),
                status: Some(stack.status.as_str().to_string()),
            },
            StackResource {
                logical_id: "TenantBucket".into(),
                resource_type: "Storage::Bucket".into(),
                physical_id: Some(format!("{name}-bucket")),
                status: Some(stack.status.as_str().to_string()),
            },
        ])
    }

    fn subscribe(&self) -> broadcast::Receiver<StackLifecycleEvent> {
        self.events.subscribe()
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}
