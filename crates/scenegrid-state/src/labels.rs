//! Label Store: per-tenant key/value labels on runtimes, applications, and tenants.
//!
//! A label row is identified by (tenant, object type, object id, key). The
//! same object can carry independent rows in several tenants' label spaces.

use scene_core::{Labels, ObjectType};
use tracing::debug;

use crate::error::StateResult;
use crate::store::Tx;
use crate::tables::LABELS;
use crate::types::{Label, label_key, object_prefix};

impl Tx {
    /// Get one label.
    pub fn get_label(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        key: &str,
    ) -> StateResult<Option<Label>> {
        self.get_json(LABELS, &label_key(tenant, object_type, object_id, key))
    }

    /// List every label of an object in one tenant's label space.
    pub fn list_labels(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
    ) -> StateResult<Vec<Label>> {
        let prefix = object_prefix(tenant, object_type, object_id);
        Ok(self
            .scan_prefix::<Label>(LABELS, &prefix)?
            .into_iter()
            .map(|(_, label)| label)
            .collect())
    }

    /// Labels of an object as a key → value map.
    pub fn list_labels_map(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
    ) -> StateResult<Labels> {
        Ok(self
            .list_labels(tenant, object_type, object_id)?
            .into_iter()
            .map(|label| (label.key, label.value))
            .collect())
    }

    /// Labels with `key` for each of the given objects. Objects without
    /// such a label are skipped.
    pub fn list_labels_for_objects(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_ids: &[String],
        key: &str,
    ) -> StateResult<Vec<Label>> {
        let mut results = Vec::new();
        for id in object_ids {
            if let Some(label) = self.get_label(tenant, object_type, id, key)? {
                results.push(label);
            }
        }
        Ok(results)
    }

    /// Every label with `key` in a tenant's label space, across all objects.
    pub fn list_labels_by_key(&self, tenant: &str, key: &str) -> StateResult<Vec<Label>> {
        let prefix = format!("{tenant}/");
        Ok(self
            .scan_prefix::<Label>(LABELS, &prefix)?
            .into_iter()
            .map(|(_, label)| label)
            .filter(|label| label.key == key)
            .collect())
    }

    /// Insert or replace a label. The row is identified by its table key,
    /// so repeating the call with the same label is a no-op.
    pub fn upsert_label(&self, label: &Label) -> StateResult<()> {
        let key = label.table_key();
        self.put_json(LABELS, &key, label)?;
        debug!(%key, "label stored");
        Ok(())
    }

    /// Delete one label. Returns true if it existed.
    pub fn delete_label(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        key: &str,
    ) -> StateResult<bool> {
        let key = label_key(tenant, object_type, object_id, key);
        let existed = self.remove_key(LABELS, &key)?;
        debug!(%key, existed, "label deleted");
        Ok(existed)
    }

    /// Delete an object's labels in one tenant except those whose key
    /// satisfies `keep`. Returns number deleted.
    pub fn delete_labels_except<F>(
        &self,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        keep: F,
    ) -> StateResult<u32>
    where
        F: Fn(&str) -> bool,
    {
        let keys: Vec<String> = self
            .list_labels(tenant, object_type, object_id)?
            .into_iter()
            .filter(|label| !keep(&label.key))
            .map(|label| label.table_key())
            .collect();
        self.remove_keys(LABELS, &keys)
    }

    /// Delete every label of an object in every tenant's label space.
    pub fn delete_labels_for_object(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> StateResult<u32> {
        let keys: Vec<String> = self
            .scan_prefix::<Label>(LABELS, "")?
            .into_iter()
            .filter(|(_, label)| label.object_type == object_type && label.object_id == object_id)
            .map(|(key, _)| key)
            .collect();
        let count = self.remove_keys(LABELS, &keys)?;
        debug!(%object_type, %object_id, count, "object labels deleted");
        Ok(count)
    }
}
