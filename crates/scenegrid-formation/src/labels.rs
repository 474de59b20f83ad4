//! Validated label writes.
//!
//! `scenarios` values are checked against the tenant's formation schema
//! before they are stored. Reconciliation writes from the assignment
//! engine do not come through here.

use scene_core::{LabelValue, Labels, ObjectType, SCENARIOS_KEY};
use scenegrid_state::{Label, Tx};

use crate::definitions::SchemaService;
use crate::error::{FormationError, FormationResult, Resource};
use crate::ids::SharedIdGenerator;

/// A label to write on one object.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelInput {
    pub key: String,
    pub value: LabelValue,
    pub object_type: ObjectType,
    pub object_id: String,
}

#[derive(Clone)]
pub struct LabelService {
    ids: SharedIdGenerator,
    schemas: SchemaService,
}

impl LabelService {
    pub fn new(ids: SharedIdGenerator, schemas: SchemaService) -> Self {
        Self { ids, schemas }
    }

    /// Insert or replace a label in `tenant`'s label space, keeping the id
    /// of an existing row.
    pub fn upsert_label(&self, tx: &Tx, tenant: &str, input: &LabelInput) -> FormationResult<Label> {
        if input.key == SCENARIOS_KEY {
            let (_, schema) = self.schemas.ensure(tx, tenant)?;
            schema.validate(&input.value).map_err(|e| {
                FormationError::InvalidData(format!(
                    "invalid value for label {SCENARIOS_KEY} of {} {}: {e}",
                    input.object_type, input.object_id
                ))
            })?;
        }

        let id = match tx.get_label(tenant, input.object_type, &input.object_id, &input.key)? {
            Some(existing) => existing.id,
            None => self.ids.generate(),
        };
        let label = Label {
            id,
            tenant: tenant.to_string(),
            key: input.key.clone(),
            value: input.value.clone(),
            object_type: input.object_type,
            object_id: input.object_id.clone(),
        };
        tx.upsert_label(&label)?;
        Ok(label)
    }

    /// Upsert every entry of `labels` on one object.
    pub fn upsert_many(
        &self,
        tx: &Tx,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        labels: &Labels,
    ) -> FormationResult<()> {
        for (key, value) in labels {
            self.upsert_label(
                tx,
                tenant,
                &LabelInput {
                    key: key.clone(),
                    value: value.clone(),
                    object_type,
                    object_id: object_id.to_string(),
                },
            )?;
        }
        Ok(())
    }

    pub fn get_label(
        &self,
        tx: &Tx,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        key: &str,
    ) -> FormationResult<Label> {
        tx.get_label(tenant, object_type, object_id, key)?
            .ok_or_else(|| FormationError::not_found(Resource::Label, format!("{object_id}/{key}")))
    }

    pub fn list_labels(
        &self,
        tx: &Tx,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
    ) -> FormationResult<Labels> {
        Ok(tx.list_labels_map(tenant, object_type, object_id)?)
    }

    /// Delete one label; a missing label is `NotFound`.
    pub fn delete_label(
        &self,
        tx: &Tx,
        tenant: &str,
        object_type: ObjectType,
        object_id: &str,
        key: &str,
    ) -> FormationResult<()> {
        if !tx.delete_label(tenant, object_type, object_id, key)? {
            return Err(FormationError::not_found(
                Resource::Label,
                format!("{object_id}/{key}"),
            ));
        }
        Ok(())
    }
}
