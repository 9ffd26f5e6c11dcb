//! Types crossing the provisioning backend boundary.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opaque identifier of a provisioned stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    /// Create a stack id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The string form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Stack name for a tenant, stable across redeliveries.
pub fn stack_name_for(tenant_id: &str) -> String {
    format!("tenantid-{tenant_id}")
}

/// One key/value parameter of a stack request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    #[serde(rename = "ParameterKey")]
    pub key: String,
    #[serde(rename = "ParameterValue")]
    pub value: String,
}

impl StackParameter {
    /// Create a new parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A rendered stack creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRequest {
    /// Name of the stack to create.
    pub stack_name: String,
    /// Stable reference to the template artifact.
    pub template_ref: String,
    /// Template parameters.
    pub parameters: Vec<StackParameter>,
    /// Delegated execution identity the backend assumes for this
    /// request. Opaque to the controller.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub execution_role: Option<String>,
}

impl StackRequest {
    /// Create a request with no parameters.
    pub fn new(stack_name: impl Into<String>, template_ref: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_ref: template_ref.into(),
            parameters: Vec::new(),
            execution_role: None,
        }
    }

    /// Append a parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(StackParameter::new(key, value));
        self
    }

    /// Set the delegated execution identity.
    pub fn with_execution_role(mut self, role: impl Into<String>) -> Self {
        self.execution_role = Some(role.into());
        self
    }

    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// Lifecycle status vocabulary of the provisioning backend.
///
/// Statuses the controller does not recognize arrive as `Other` so
/// new intermediate statuses are representable without breaking the
/// reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    Other(String),
}

impl StackStatus {
    /// Parse the backend's wire form of a status.
    pub fn parse(s: &str) -> Self {
        match s {
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "CREATE_FAILED" => Self::CreateFailed,
            "ROLLBACK_IN_PROGRESS" => Self::RollbackInProgress,
            "ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "ROLLBACK_FAILED" => Self::RollbackFailed,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "DELETE_FAILED" => Self::DeleteFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The backend's wire form of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StackStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for StackStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StackStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// A lifecycle event emitted by the provisioning backend.
///
/// No ordering guarantee; duplicates possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackLifecycleEvent {
    #[serde(rename = "stackId")]
    pub stack_id: StackId,
    pub status: StackStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl StackLifecycleEvent {
    /// Create an event stamped with the current time.
    pub fn new(stack_id: impl Into<StackId>, status: StackStatus) -> Self {
        Self {
            stack_id: stack_id.into(),
            status,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// One live resource of a provisioned stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    #[serde(rename = "LogicalResourceId")]
    pub logical_id: String,
    #[serde(rename = "ResourceType")]
    pub resource_type: String,
    #[serde(rename = "PhysicalResourceId", skip_serializing_if = "Option::is_none", default)]
    pub physical_id: Option<String>,
    #[serde(rename = "ResourceStatus", skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
}
