//! Per-call request context.

use scenegrid_state::TenantId;

use crate::error::{FormationError, FormationResult};

/// Carries the tenant on whose behalf an operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    tenant: Option<TenantId>,
}

impl RequestContext {
    pub fn for_tenant(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: Some(tenant.into()),
        }
    }

    /// Context without a tenant. Every tenant-scoped operation rejects it.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Same context acting as another tenant.
    pub fn with_tenant(&self, tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: Some(tenant.into()),
        }
    }

    pub fn tenant(&self) -> FormationResult<&str> {
        self.tenant.as_deref().ok_or(FormationError::TenantRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn anonymous_context_has_no_tenant() {
        let err = RequestContext::anonymous().tenant().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TenantRequired);
    }

    #[test]
    fn with_tenant_switches_tenant() {
        let ctx = RequestContext::for_tenant("child");
        assert_eq!(ctx.tenant().unwrap(), "child");
        assert_eq!(ctx.with_tenant("parent").tenant().unwrap(), "parent");
    }
}
