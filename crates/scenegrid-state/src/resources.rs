//! Resource Directory: runtimes and applications with tenant visibility.
//!
//! A resource is owned by one tenant and visible from that tenant and from
//! every ancestor of it. Label filters are evaluated in the label space of
//! the tenant that is asking, not the owner's.

use scene_core::ObjectType;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::Tx;
use crate::tables::{APPLICATIONS, RUNTIMES};
use crate::types::{Application, LabelFilter, Runtime};

impl Tx {
    // ── Runtimes ──────────────────────────────────────────────────

    pub fn create_runtime(&self, runtime: &Runtime) -> StateResult<()> {
        self.insert_new_json(RUNTIMES, &runtime.id, runtime)?;
        debug!(id = %runtime.id, tenant = %runtime.tenant, "runtime created");
        Ok(())
    }

    pub fn get_runtime(&self, id: &str) -> StateResult<Option<Runtime>> {
        self.get_json(RUNTIMES, id)
    }

    /// Replace a stored runtime. Fails with `NotFound` if it does not exist.
    pub fn update_runtime(&self, runtime: &Runtime) -> StateResult<()> {
        if !self.contains_key(RUNTIMES, &runtime.id)? {
            return Err(StateError::NotFound(format!("runtime {}", runtime.id)));
        }
        self.put_json(RUNTIMES, &runtime.id, runtime)
    }

    /// Delete a runtime together with its labels in every tenant.
    /// Returns true if it existed.
    pub fn delete_runtime(&self, id: &str) -> StateResult<bool> {
        let existed = self.remove_key(RUNTIMES, id)?;
        if existed {
            let labels = self.delete_labels_for_object(ObjectType::Runtime, id)?;
            debug!(%id, labels, "runtime deleted");
        }
        Ok(existed)
    }

    /// Runtime `id` if it is visible from `tenant`.
    pub fn get_runtime_in_tenant(&self, tenant: &str, id: &str) -> StateResult<Option<Runtime>> {
        match self.get_runtime(id)? {
            Some(rt) if self.tenant_has_access(tenant, &rt.tenant)? => Ok(Some(rt)),
            _ => Ok(None),
        }
    }

    pub fn runtime_exists_in_tenant(&self, tenant: &str, id: &str) -> StateResult<bool> {
        Ok(self.get_runtime_in_tenant(tenant, id)?.is_some())
    }

    /// Runtimes visible from `tenant` whose labels in `tenant`'s label
    /// space satisfy every filter.
    pub fn list_runtimes_in_tenant(
        &self,
        tenant: &str,
        filters: &[LabelFilter],
    ) -> StateResult<Vec<Runtime>> {
        let all: Vec<Runtime> = self
            .scan_prefix::<Runtime>(RUNTIMES, "")?
            .into_iter()
            .map(|(_, rt)| rt)
            .collect();

        let mut visible = Vec::new();
        for rt in all {
            if !self.tenant_has_access(tenant, &rt.tenant)? {
                continue;
            }
            if self.object_matches_filters(tenant, ObjectType::Runtime, &rt.id, filters)? {
                visible.push(rt);
            }
        }
        Ok(visible)
    }

    fn object_matches_filters(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        filters: &[LabelFilter],
    ) -> StateResult<bool> {
        if filters.is_empty() {
            return Ok(true);
        }
        let labels = self.list_labels_map(tenant, object_type, object_id)?;
        Ok(filters.iter().all(|f| match (labels.get(&f.key), &f.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(value), Some(wanted)) => value.matches(wanted),
        }))
    }

    // ── Applications ──────────────────────────────────────────────

    pub fn create_application(&self, app: &Application) -> StateResult<()> {
        self.insert_new_json(APPLICATIONS, &app.id, app)?;
        debug!(id = %app.id, tenant = %app.tenant, "application created");
        Ok(())
    }

    pub fn get_application(&self, id: &str) -> StateResult<Option<Application>> {
        self.get_json(APPLICATIONS, id)
    }

    pub fn application_exists_in_tenant(&self, tenant: &str, id: &str) -> StateResult<bool> {
        match self.get_application(id)? {
            Some(app) => self.tenant_has_access(tenant, &app.tenant),
            None => Ok(false),
        }
    }

    /// Applications owned by `tenant` or one of its descendants.
    pub fn list_applications_in_tenant(&self, tenant: &str) -> StateResult<Vec<Application>> {
        let mut visible = Vec::new();
        for (_, app) in self.scan_prefix::<Application>(APPLICATIONS, "")? {
            if self.tenant_has_access(tenant, &app.tenant)? {
                visible.push(app);
            }
        }
        Ok(visible)
    }

    /// Delete an application together with its labels in every tenant.
    pub fn delete_application(&self, id: &str) -> StateResult<bool> {
        let existed = self.remove_key(APPLICATIONS, id)?;
        if existed {
            let labels = self.delete_labels_for_object(ObjectType::Application, id)?;
            debug!(%id, labels, "application deleted");
        }
        Ok(existed)
    }
}
