//! Tenant records and the lifecycle state machine.
//!
//! Every tenant is one record in the registry. Its `status` only moves
//! along the edges encoded in [`TenantStatus::can_transition_to`]; any
//! other transition attempt is rejected without touching the record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};

/// Lifecycle status of a tenant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Registered, stack creation not yet requested
    Pending,
    /// Stack creation submitted to the provisioning backend
    Provisioning,
    /// Stack is up and serving
    Active,
    /// Stack creation was rejected or rolled back
    ProvisionFailed,
    /// Stack teardown submitted
    Deleting,
    /// Stack torn down; record retained for audit, immutable
    Deleted,
    /// Stack teardown failed
    DeleteFailed,
}

impl TenantStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Pending => "pending",
            TenantStatus::Provisioning => "provisioning",
            TenantStatus::Active => "active",
            TenantStatus::ProvisionFailed => "provision_failed",
            TenantStatus::Deleting => "deleting",
            TenantStatus::Deleted => "deleted",
            TenantStatus::DeleteFailed => "delete_failed",
        }
    }

    /// Whether `next` is a legal transition from this status.
    ///
    /// The failed states allow an operator-driven retry back into the
    /// in-progress state they fell out of. `Deleted` is terminal.
    pub fn can_transition_to(&self, next: TenantStatus) -> bool {
        use TenantStatus::*;
        matches!(
            (self, next),
            (Pending, Provisioning)
                | (Provisioning, Active)
                | (Provisioning, ProvisionFailed)
                | (ProvisionFailed, Provisioning)
                | (ProvisionFailed, Deleting)
                | (Active, Deleting)
                | (Deleting, Deleted)
                | (Deleting, DeleteFailed)
                | (DeleteFailed, Deleting)
        )
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TenantStatus::Deleted)
    }

    /// Failed statuses are eligible for operator retry.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            TenantStatus::ProvisionFailed | TenantStatus::DeleteFailed
        )
    }

    /// Statuses from which teardown may be requested.
    ///
    /// A failed provisioning can still be torn down: the backend may
    /// have created part of the stack before rolling back.
    pub fn is_deletable(&self) -> bool {
        matches!(self, TenantStatus::Active | TenantStatus::ProvisionFailed)
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generate a new tenant id.
pub fn generate_tenant_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive the stack-safe rendering of a tenant name: lowercased with
/// all whitespace stripped.
pub fn safe_name_of(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// A tenant record as stored in the registry.
///
/// `version` is the optimistic-concurrency token: conditional writes
/// are accepted only when it matches the stored record, and the
/// registry bumps it on every successful put.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "tenantName")]
    pub tenant_name: String,
    #[serde(rename = "safeName")]
    pub safe_name: String,
    pub status: TenantStatus,
    #[serde(rename = "stackId", skip_serializing_if = "Option::is_none", default)]
    pub stack_id: Option<String>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(
        rename = "failureReason",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub failure_reason: Option<String>,
    pub version: u64,
}

impl TenantRecord {
    /// Create a fresh record for a newly registered tenant.
    ///
    /// Assigns a tenant id, derives the safe name and starts the
    /// lifecycle at `Pending` with version 0 (never stored yet).
    pub fn register(tenant_name: impl Into<String>) -> Result<Self> {
        let tenant_name = tenant_name.into();
        if tenant_name.trim().is_empty() {
            return Err(CoreError::invalid_tenant_name(tenant_name));
        }
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            tenant_id: generate_tenant_id(),
            safe_name: safe_name_of(&tenant_name),
            tenant_name,
            status: TenantStatus::Pending,
            stack_id: None,
            created_at: now,
            updated_at: now,
            failure_reason: None,
            version: 0,
        })
    }

    /// Move the record to `next`, rejecting illegal transitions.
    ///
    /// Leaving a failed state clears `failure_reason`.
    pub fn transition(&mut self, next: TenantStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::invalid_transition(self.status, next));
        }
        if self.status.is_failed() {
            self.failure_reason = None;
        }
        self.status = next;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    /// Move the record into a failed state, recording the reason.
    pub fn fail(&mut self, next: TenantStatus, reason: impl Into<String>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::invalid_transition(self.status, next));
        }
        self.status = next;
        self.failure_reason = Some(reason.into());
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    /// Record the stack id returned by the provisioning backend.
    ///
    /// The binding is write-once: rebinding to the same id is an
    /// idempotent no-op, any other id is rejected.
    pub fn bind_stack(&mut self, stack_id: impl Into<String>) -> Result<()> {
        let stack_id = stack_id.into();
        match &self.stack_id {
            Some(existing) if *existing == stack_id => Ok(()),
            Some(existing) => Err(CoreError::stack_already_bound(
                self.tenant_id.clone(),
                existing.clone(),
            )),
            None => {
                self.stack_id = Some(stack_id);
                self.updated_at = OffsetDateTime::now_utc();
                Ok(())
            }
        }
    }
}
