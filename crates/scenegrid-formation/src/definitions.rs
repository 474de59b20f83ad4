//! Formation schema lifecycle.
//!
//! The formation schema of a tenant is the label definition for the
//! `scenarios` key. Every change to it is validated against live labels and
//! assignments and written through the versioned compare-and-swap.

use scene_core::{DEFAULT_SCENARIO, SCENARIOS_KEY, ScenarioSet, ScenariosSchema};
use scenegrid_state::{LabelDefinition, StateError, Tx};
use tracing::{debug, warn};

use crate::error::{FormationError, FormationResult};
use crate::ids::SharedIdGenerator;

#[derive(Clone)]
pub struct SchemaService {
    ids: SharedIdGenerator,
}

impl SchemaService {
    pub fn new(ids: SharedIdGenerator) -> Self {
        Self { ids }
    }

    /// The tenant's formation schema, if it has one.
    pub fn get(
        &self,
        tx: &Tx,
        tenant: &str,
    ) -> FormationResult<Option<(LabelDefinition, ScenariosSchema)>> {
        let Some(def) = tx.get_label_definition(tenant, SCENARIOS_KEY)? else {
            return Ok(None);
        };
        let schema = parse_schema(&def)?;
        Ok(Some((def, schema)))
    }

    /// The tenant's formation schema, created with only `DEFAULT` if absent.
    pub fn ensure(&self, tx: &Tx, tenant: &str) -> FormationResult<(LabelDefinition, ScenariosSchema)> {
        if let Some(found) = self.get(tx, tenant)? {
            return Ok(found);
        }
        let schema = ScenariosSchema::for_formations([DEFAULT_SCENARIO]);
        let def = self.create(tx, tenant, &schema)?;
        Ok((def, schema))
    }

    /// Store a first schema for a tenant.
    pub fn create(
        &self,
        tx: &Tx,
        tenant: &str,
        schema: &ScenariosSchema,
    ) -> FormationResult<LabelDefinition> {
        let def = LabelDefinition {
            id: self.ids.generate(),
            tenant: tenant.to_string(),
            key: SCENARIOS_KEY.to_string(),
            schema: Some(schema.to_value()),
            version: 0,
        };
        tx.create_label_definition(&def)?;
        debug!(%tenant, formations = ?schema.formations(), "formation schema created");
        Ok(def)
    }

    /// Formation names the tenant currently enumerates. Empty without a schema.
    pub fn available_scenarios(&self, tx: &Tx, tenant: &str) -> FormationResult<Vec<String>> {
        Ok(self
            .get(tx, tenant)?
            .map(|(_, schema)| schema.formations().to_vec())
            .unwrap_or_default())
    }

    /// Add `name` to the tenant's schema, creating the schema if needed.
    pub fn ensure_formation(&self, tx: &Tx, tenant: &str, name: &str) -> FormationResult<()> {
        let (def, schema) = self.ensure(tx, tenant)?;
        if schema.allows(name) {
            return Ok(());
        }
        self.update(tx, tenant, &def, &schema.with_formation(name))?;
        Ok(())
    }

    /// Replace the tenant's schema after checking that every live
    /// `scenarios` label and assignment still fits it.
    pub fn update(
        &self,
        tx: &Tx,
        tenant: &str,
        current: &LabelDefinition,
        schema: &ScenariosSchema,
    ) -> FormationResult<LabelDefinition> {
        self.validate_existing_labels(tx, tenant, schema)?;
        self.validate_assignments(tx, tenant, schema)?;

        let next = LabelDefinition {
            schema: Some(schema.to_value()),
            ..current.clone()
        };
        match tx.update_label_definition_with_version(&next, current.version) {
            Ok(stored) => {
                debug!(%tenant, version = stored.version, formations = ?schema.formations(), "formation schema updated");
                Ok(stored)
            }
            Err(StateError::VersionConflict { key, expected, found }) => {
                warn!(%tenant, expected, found, "formation schema changed concurrently");
                Err(FormationError::Conflict(format!(
                    "{key} is at version {found}, expected {expected}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every `scenarios` label in the tenant must be a subset of the schema.
    pub fn validate_existing_labels(
        &self,
        tx: &Tx,
        tenant: &str,
        schema: &ScenariosSchema,
    ) -> FormationResult<()> {
        for label in tx.list_labels_by_key(tenant, SCENARIOS_KEY)? {
            let names = ScenarioSet::try_from(&label.value).map_err(|e| {
                FormationError::Internal(format!(
                    "scenarios label of {} {}: {e}",
                    label.object_type, label.object_id
                ))
            })?;
            if let Some(missing) = names.iter().find(|n| !schema.allows(n)) {
                return Err(FormationError::InvalidOperation(format!(
                    "formation {missing} is still used by {} {}",
                    label.object_type, label.object_id
                )));
            }
        }
        Ok(())
    }

    /// Every assignment owned by the tenant must name a formation in the schema.
    pub fn validate_assignments(
        &self,
        tx: &Tx,
        tenant: &str,
        schema: &ScenariosSchema,
    ) -> FormationResult<()> {
        for assignment in tx.list_assignments_for_tenant(tenant)? {
            if !schema.allows(&assignment.scenario_name) {
                return Err(FormationError::InvalidOperation(format!(
                    "formation {} is still assigned to tenant {}",
                    assignment.scenario_name, assignment.target_tenant_id
                )));
            }
        }
        Ok(())
    }
}

fn parse_schema(def: &LabelDefinition) -> FormationResult<ScenariosSchema> {
    let value = def.schema.as_ref().ok_or_else(|| {
        FormationError::Internal(format!("label definition {} has no schema", def.table_key()))
    })?;
    ScenariosSchema::from_value(value).map_err(|e| FormationError::Internal(e.to_string()))
}
