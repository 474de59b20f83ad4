//! Formation Schema Store: per-tenant label definitions with a version counter.

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::Tx;
use crate::tables::LABEL_DEFINITIONS;
use crate::types::LabelDefinition;

impl Tx {
    /// Get the definition of `key` in a tenant.
    pub fn get_label_definition(
        &self,
        tenant: &str,
        key: &str,
    ) -> StateResult<Option<LabelDefinition>> {
        self.get_json(LABEL_DEFINITIONS, &format!("{tenant}/{key}"))
    }

    pub fn label_definition_exists(&self, tenant: &str, key: &str) -> StateResult<bool> {
        self.contains_key(LABEL_DEFINITIONS, &format!("{tenant}/{key}"))
    }

    /// Store a new definition. Fails with `NotUnique` if one exists.
    pub fn create_label_definition(&self, def: &LabelDefinition) -> StateResult<()> {
        let key = def.table_key();
        self.insert_new_json(LABEL_DEFINITIONS, &key, def)?;
        debug!(%key, version = def.version, "label definition created");
        Ok(())
    }

    /// Compare-and-swap update: succeeds only if the stored version equals
    /// `expected_version`, and stores `def` with version `expected_version + 1`.
    pub fn update_label_definition_with_version(
        &self,
        def: &LabelDefinition,
        expected_version: u64,
    ) -> StateResult<LabelDefinition> {
        let key = def.table_key();
        let current: LabelDefinition = self
            .get_json(LABEL_DEFINITIONS, &key)?
            .ok_or_else(|| StateError::NotFound(format!("label definition {key}")))?;
        if current.version != expected_version {
            return Err(StateError::VersionConflict {
                key,
                expected: expected_version,
                found: current.version,
            });
        }
        let next = LabelDefinition {
            id: current.id,
            version: expected_version + 1,
            ..def.clone()
        };
        self.put_json(LABEL_DEFINITIONS, &key, &next)?;
        debug!(%key, version = next.version, "label definition updated");
        Ok(next)
    }
}
