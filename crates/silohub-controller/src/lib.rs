//! Tenant lifecycle orchestration.
//!
//! The controller ties the registry's change feed and the backend's
//! lifecycle event stream to the lifecycle state machine: registering
//! a tenant eventually yields a running stack, deleting one tears the
//! stack down, and every status in between is derived from events.
//! All components are stateless; correctness under concurrent workers
//! and redelivered events rests on the registry's conditional writes.

pub mod consumer;
pub mod deletion;
pub mod error;
pub mod provisioner;
pub mod query;
pub mod reconciler;
pub mod template;

pub use consumer::ChangeFeedConsumer;
pub use deletion::DeletionOrchestrator;
pub use error::ControllerError;
pub use provisioner::ProvisioningOrchestrator;
pub use query::QueryService;
pub use reconciler::StatusReconciler;
pub use template::StackTemplate;
