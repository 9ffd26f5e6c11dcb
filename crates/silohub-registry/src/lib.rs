//! Tenant registry abstraction layer.
//!
//! The registry is the single source of truth for tenant records.
//! All writers go through conditional puts keyed on the record's
//! version token; the evented wrapper turns successful puts into the
//! change feed the rest of the controller consumes.

pub mod error;
pub mod evented;
pub mod memory;
pub mod traits;

pub use error::{ErrorCategory, RegistryError};
pub use evented::EventedRegistry;
pub use memory::InMemoryRegistry;
pub use traits::{Page, TenantRegistry};
