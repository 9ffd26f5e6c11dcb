//! Provisioning backend boundary.
//!
//! The backend is an external system that creates and destroys named
//! infrastructure stacks asynchronously; the controller only submits
//! requests and observes lifecycle events, it never drives or cancels
//! the work itself. This crate models that capability as a trait plus
//! the types crossing the boundary, and ships a simulated in-memory
//! implementation for tests and local runs.

pub mod error;
pub mod simulated;
pub mod traits;
pub mod types;

pub use error::SubmissionError;
pub use simulated::SimulatedBackend;
pub use traits::ProvisioningBackend;
pub use types::{
    StackId, StackLifecycleEvent, StackParameter, StackRequest, StackResource, StackStatus,
    stack_name_for,
};
