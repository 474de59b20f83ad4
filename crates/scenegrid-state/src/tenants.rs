//! Tenant Directory: the tenant hierarchy and its external-id index.

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::Tx;
use crate::tables::{TENANT_EXTERNAL_IDS, TENANTS};
use crate::types::{Tenant, TenantId};

impl Tx {
    /// Store a new tenant and index its external id.
    pub fn insert_tenant(&self, tenant: &Tenant) -> StateResult<()> {
        if self.contains_key(TENANT_EXTERNAL_IDS, &tenant.external_id)? {
            return Err(StateError::NotUnique(format!(
                "tenant external id {}",
                tenant.external_id
            )));
        }
        self.insert_new_json(TENANTS, &tenant.id, tenant)?;
        self.put_json(TENANT_EXTERNAL_IDS, &tenant.external_id, &tenant.id)?;
        debug!(id = %tenant.id, external_id = %tenant.external_id, "tenant stored");
        Ok(())
    }

    pub fn get_tenant(&self, id: &str) -> StateResult<Option<Tenant>> {
        self.get_json(TENANTS, id)
    }

    pub fn get_tenant_by_external_id(&self, external_id: &str) -> StateResult<Option<Tenant>> {
        let internal: Option<TenantId> = self.get_json(TENANT_EXTERNAL_IDS, external_id)?;
        match internal {
            Some(id) => self.get_tenant(&id),
            None => Ok(None),
        }
    }

    pub fn list_tenants(&self) -> StateResult<Vec<Tenant>> {
        Ok(self
            .scan_prefix::<Tenant>(TENANTS, "")?
            .into_iter()
            .map(|(_, t)| t)
            .collect())
    }

    /// The tenant itself followed by its ancestors, nearest first.
    /// Unknown tenants yield just their own id.
    pub fn tenant_ancestry(&self, id: &str) -> StateResult<Vec<TenantId>> {
        let mut chain = vec![id.to_string()];
        let mut current = self.get_tenant(id)?;
        while let Some(parent) = current.and_then(|t| t.parent) {
            // A malformed hierarchy must not loop forever.
            if chain.contains(&parent) {
                break;
            }
            current = self.get_tenant(&parent)?;
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Whether objects owned by `owner` are visible from `tenant`, that is,
    /// `tenant` is `owner` or one of its ancestors.
    pub fn tenant_has_access(&self, tenant: &str, owner: &str) -> StateResult<bool> {
        if tenant == owner {
            return Ok(true);
        }
        Ok(self.tenant_ancestry(owner)?.iter().any(|t| t == tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;
    use crate::types::TenantType;

    fn test_tenant(id: &str, parent: Option<&str>) -> Tenant {
        Tenant {
            id: id.to_string(),
            external_id: format!("ext-{id}"),
            name: id.to_string(),
            parent: parent.map(str::to_string),
            tenant_type: if parent.is_some() {
                TenantType::Subaccount
            } else {
                TenantType::Account
            },
        }
    }

    #[test]
    fn tenant_insert_and_lookup_by_external_id() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        let t = test_tenant("ga", None);
        tx.insert_tenant(&t).unwrap();

        assert_eq!(tx.get_tenant(&t.id).unwrap(), Some(t.clone()));
        assert_eq!(tx.get_tenant_by_external_id(&t.external_id).unwrap(), Some(t));
        assert!(tx.get_tenant_by_external_id("nope").unwrap().is_none());
    }

    #[test]
    fn tenant_duplicate_external_id_is_not_unique() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_tenant(&test_tenant("a", None)).unwrap();
        let mut dup = test_tenant("b", None);
        dup.external_id = "ext-a".to_string();

        let err = tx.insert_tenant(&dup).unwrap_err();
        assert!(matches!(err, StateError::NotUnique(_)));
        assert!(tx.get_tenant("b").unwrap().is_none());
    }

    #[test]
    fn tenant_ancestry_walks_to_root() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_tenant(&test_tenant("root", None)).unwrap();
        tx.insert_tenant(&test_tenant("mid", Some("root"))).unwrap();
        tx.insert_tenant(&test_tenant("leaf", Some("mid"))).unwrap();

        assert_eq!(tx.tenant_ancestry("leaf").unwrap(), vec!["leaf", "mid", "root"]);
        assert_eq!(tx.tenant_ancestry("unknown").unwrap(), vec!["unknown"]);
    }

    #[test]
    fn tenant_access_follows_ancestry_only_upwards() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_tenant(&test_tenant("root", None)).unwrap();
        tx.insert_tenant(&test_tenant("leaf", Some("root"))).unwrap();

        assert!(tx.tenant_has_access("root", "leaf").unwrap());
        assert!(tx.tenant_has_access("leaf", "leaf").unwrap());
        assert!(!tx.tenant_has_access("leaf", "root").unwrap());
    }

    #[test]
    fn tenant_ancestry_stops_on_cycle() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_tenant(&test_tenant("a", Some("b"))).unwrap();
        tx.insert_tenant(&test_tenant("b", Some("a"))).unwrap();

        assert_eq!(tx.tenant_ancestry("a").unwrap(), vec!["a", "b"]);
    }
}
