//! Stack request rendering.

use silohub_backend::{StackRequest, stack_name_for};
use silohub_core::TenantRecord;

/// Parameter key carrying the tenant id.
pub const PARAM_TENANT_ID: &str = "ParamTenantId";
/// Parameter key carrying the display name.
pub const PARAM_TENANT_NAME: &str = "ParamTenantName";
/// Parameter key carrying the stack-safe name.
pub const PARAM_SAFE_NAME: &str = "ParamSafeName";

/// Template configuration a tenant stack is rendered from.
///
/// Rendering is deterministic: the same record always produces the
/// same request, so a redelivered provisioning attempt targets the
/// same stack name.
#[derive(Debug, Clone)]
pub struct StackTemplate {
    /// Stable reference to the template artifact.
    pub artifact_ref: String,
    /// Delegated execution identity the backend assumes. Opaque here.
    pub execution_role: Option<String>,
}

impl StackTemplate {
    /// Creates a template with no execution role.
    pub fn new(artifact_ref: impl Into<String>) -> Self {
        Self {
            artifact_ref: artifact_ref.into(),
            execution_role: None,
        }
    }

    /// Sets the delegated execution identity.
    pub fn with_execution_role(mut self, role: impl Into<String>) -> Self {
        self.execution_role = Some(role.into());
        self
    }

    /// Renders the stack creation request for a tenant.
    pub fn render(&self, record: &TenantRecord) -> StackRequest {
        let mut request = StackRequest::new(stack_name_for(&record.tenant_id), &self.artifact_ref)
            .with_parameter(PARAM_TENANT_ID, &record.tenant_id)
            .with_parameter(PARAM_TENANT_NAME, &record.tenant_name)
            .with_parameter(PARAM_SAFE_NAME, &record.safe_name);
        if let Some(role) = &self.execution_role {
            request = request.with_execution_role(role);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_deterministic() {
        let template =
            StackTemplate::new("templates/tenant-stack@v1").with_execution_role("provisioner");
        let record = TenantRecord::register("Acme Corp").unwrap();

        let a = template.render(&record);
        let b = template.render(&record);
        assert_eq!(a, b);

        assert_eq!(a.stack_name, format!("tenantid-{}", record.tenant_id));
        assert_eq!(a.template_ref, "templates/tenant-stack@v1");
        assert_eq!(a.parameter(PARAM_TENANT_ID), Some(record.tenant_id.as_str()));
        assert_eq!(a.parameter(PARAM_TENANT_NAME), Some("Acme Corp"));
        assert_eq!(a.parameter(PARAM_SAFE_NAME), Some("acmecorp"));
        assert_eq!(a.execution_role.as_deref(), Some("provisioner"));
    }
}
