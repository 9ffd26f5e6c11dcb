//! Core domain model: tenant records, the lifecycle state machine and
//! the registry change feed.

pub mod error;
pub mod events;
pub mod tenant;

pub use error::{CoreError, ErrorCategory, Result};
pub use events::{ChangeEvent, ChangeEventKind, ChangeFeed};
pub use tenant::{TenantRecord, TenantStatus, generate_tenant_id, safe_name_of};
