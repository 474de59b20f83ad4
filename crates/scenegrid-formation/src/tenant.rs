//! Tenant Directory service: lookups, idempotent registration, and lazy
//! subaccount creation.

use scenegrid_state::{Tenant, TenantType, Tx};
use tracing::info;

use crate::error::{FormationError, FormationResult, Resource};
use crate::ids::SharedIdGenerator;
use crate::model::TenantInput;

#[derive(Clone)]
pub struct TenantService {
    ids: SharedIdGenerator,
}

impl TenantService {
    pub fn new(ids: SharedIdGenerator) -> Self {
        Self { ids }
    }

    pub fn get_tenant_by_id(&self, tx: &Tx, id: &str) -> FormationResult<Tenant> {
        tx.get_tenant(id)?
            .ok_or_else(|| FormationError::not_found(Resource::Tenant, id))
    }

    pub fn get_tenant_by_external_id(&self, tx: &Tx, external_id: &str) -> FormationResult<Tenant> {
        tx.get_tenant_by_external_id(external_id)?
            .ok_or_else(|| FormationError::not_found(Resource::Tenant, external_id))
    }

    /// Register every input whose external id is unknown. Returns the stored
    /// tenant for each input, in order.
    pub fn create_many_if_not_exists(
        &self,
        tx: &Tx,
        inputs: &[TenantInput],
    ) -> FormationResult<Vec<Tenant>> {
        let mut stored = Vec::with_capacity(inputs.len());
        for input in inputs {
            if let Some(existing) = tx.get_tenant_by_external_id(&input.external_id)? {
                stored.push(existing);
                continue;
            }
            let parent = match &input.parent {
                Some(p) => Some(self.resolve_internal_id(tx, p)?),
                None => None,
            };
            let tenant = Tenant {
                id: self.ids.generate(),
                external_id: input.external_id.clone(),
                name: input.name.clone(),
                parent,
                tenant_type: input.tenant_type,
            };
            tx.insert_tenant(&tenant)?;
            info!(id = %tenant.id, external_id = %tenant.external_id, parent = ?tenant.parent, "tenant registered");
            stored.push(tenant);
        }
        Ok(stored)
    }

    /// Internal id for an external or internal tenant id, external first.
    pub fn resolve_internal_id(&self, tx: &Tx, id: &str) -> FormationResult<String> {
        if let Some(tenant) = tx.get_tenant_by_external_id(id)? {
            return Ok(tenant.id);
        }
        if let Some(tenant) = tx.get_tenant(id)? {
            return Ok(tenant.id);
        }
        Err(FormationError::not_found(Resource::Tenant, id))
    }

    /// The subaccount `external_id` under `parent`, created if unknown.
    /// A subaccount already registered under another parent is rejected.
    pub fn ensure_subaccount(
        &self,
        tx: &Tx,
        parent: &str,
        external_id: &str,
    ) -> FormationResult<Tenant> {
        if let Some(existing) = tx.get_tenant_by_external_id(external_id)? {
            if existing.parent.as_deref() != Some(parent) {
                return Err(FormationError::InvalidOperation(format!(
                    "subaccount {external_id} does not belong to tenant {parent}"
                )));
            }
            return Ok(existing);
        }
        let created = self.create_many_if_not_exists(
            tx,
            &[TenantInput {
                external_id: external_id.to_string(),
                name: external_id.to_string(),
                parent: Some(parent.to_string()),
                tenant_type: TenantType::Subaccount,
            }],
        )?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| FormationError::Internal(format!("subaccount {external_id} was not stored")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing;

    fn account(external_id: &str) -> TenantInput {
        TenantInput {
            external_id: external_id.to_string(),
            name: external_id.to_string(),
            parent: None,
            tenant_type: TenantType::Account,
        }
    }

    #[test]
    fn create_many_is_idempotent_on_external_id() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let tenants = TenantService::new(testing::ids());

        let first = tenants.create_many_if_not_exists(&tx, &[account("ga")]).unwrap();
        let second = tenants.create_many_if_not_exists(&tx, &[account("ga")]).unwrap();
        assert_eq!(first, second);
        assert_eq!(tx.list_tenants().unwrap().len(), 1);
    }

    #[test]
    fn create_many_resolves_parent_by_external_id() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let tenants = TenantService::new(testing::ids());
        let parent = tenants.create_many_if_not_exists(&tx, &[account("ga")]).unwrap();

        let child = TenantInput {
            parent: Some("ga".to_string()),
            tenant_type: TenantType::Subaccount,
            ..account("sa")
        };
        let created = tenants.create_many_if_not_exists(&tx, &[child]).unwrap();
        assert_eq!(created[0].parent.as_deref(), Some(parent[0].id.as_str()));
    }

    #[test]
    fn resolve_prefers_external_id() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        testing::seed_tenant(&tx, "t1", None);
        let tenants = TenantService::new(testing::ids());

        assert_eq!(tenants.resolve_internal_id(&tx, "ext-t1").unwrap(), "t1");
        assert_eq!(tenants.resolve_internal_id(&tx, "t1").unwrap(), "t1");
        let err = tenants.resolve_internal_id(&tx, "missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn ensure_subaccount_creates_once_and_checks_owner() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        testing::seed_tenant(&tx, "ga", None);
        testing::seed_tenant(&tx, "other", None);
        let tenants = TenantService::new(testing::ids());

        let sub = tenants.ensure_subaccount(&tx, "ga", "sa-1").unwrap();
        assert_eq!(sub.parent.as_deref(), Some("ga"));
        assert_eq!(sub.tenant_type, TenantType::Subaccount);
        let again = tenants.ensure_subaccount(&tx, "ga", "sa-1").unwrap();
        assert_eq!(sub.id, again.id);

        let err = tenants.ensure_subaccount(&tx, "other", "sa-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }
}
