//! Change feed consumption.
//!
//! Subscribes to the registry change feed and hands Created events to
//! the provisioning orchestrator. Updated events carry no work for the
//! controller (status changes are driven by the reconciler and the
//! deletion path) and are dropped on arrival.

use std::sync::Arc;

use silohub_core::{ChangeEvent, ChangeEventKind};
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

use crate::provisioner::ProvisioningOrchestrator;

/// Consumes the registry change feed and triggers provisioning.
pub struct ChangeFeedConsumer {
    orchestrator: Arc<ProvisioningOrchestrator>,
}

impl ChangeFeedConsumer {
    /// Creates a new consumer.
    pub fn new(orchestrator: Arc<ProvisioningOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handles one change event.
    ///
    /// Redeliveries are harmless: the orchestrator discards stale
    /// duplicates itself. Orchestration errors are logged, never
    /// propagated, so one bad tenant cannot stall the feed.
    pub async fn handle(&self, event: &ChangeEvent) {
        match event.kind {
            ChangeEventKind::Updated => {
                trace!(tenant_id = %event.tenant_id, "Dropping updated event");
            }
            ChangeEventKind::Created => {
                if let Err(e) = self.orchestrator.provision(&event.tenant_id).await {
                    error!(tenant_id = %event.tenant_id, error = %e, "Provisioning failed");
                }
            }
        }
    }

    /// Runs the consume loop until the feed closes.
    ///
    /// A lagged receiver skips the overwritten events and keeps going;
    /// the orchestrator's re-read guard absorbs whatever was missed or
    /// duplicated.
    pub async fn run(self, mut receiver: broadcast::Receiver<ChangeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change feed consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
