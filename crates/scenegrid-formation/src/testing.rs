//! Fixtures shared by unit tests.

use std::sync::Arc;

use scenegrid_state::{Runtime, StateStore, Tenant, TenantType, Tx};

use crate::ids::{SharedIdGenerator, UuidGenerator};

pub fn store() -> StateStore {
    StateStore::open_in_memory().unwrap()
}

pub fn ids() -> SharedIdGenerator {
    Arc::new(UuidGenerator)
}

/// Insert a tenant whose external id is `ext-{id}`.
pub fn seed_tenant(tx: &Tx, id: &str, parent: Option<&str>) {
    tx.insert_tenant(&Tenant {
        id: id.to_string(),
        external_id: format!("ext-{id}"),
        name: id.to_string(),
        parent: parent.map(str::to_string),
        tenant_type: if parent.is_some() {
            TenantType::Subaccount
        } else {
            TenantType::Account
        },
    })
    .unwrap();
}

pub fn seed_runtime(tx: &Tx, id: &str, tenant: &str) {
    tx.create_runtime(&Runtime {
        id: id.to_string(),
        tenant: tenant.to_string(),
        name: format!("rt-{id}"),
        description: None,
        created_at: 1000,
        updated_at: 1000,
    })
    .unwrap();
}
