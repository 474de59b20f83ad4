//! Formation Service: formation names in the tenant schema, and assigning
//! formations to applications and tenants.

use scene_core::{ObjectType, SCENARIOS_KEY, ScenarioSet, ScenariosSchema};
use scenegrid_state::{Assignment, LabelSelector, Tx};
use tracing::info;

use crate::assignment::AssignmentService;
use crate::context::RequestContext;
use crate::definitions::SchemaService;
use crate::error::{FormationError, FormationResult, Resource};
use crate::labels::{LabelInput, LabelService};
use crate::model::{Formation, FormationObjectType};
use crate::tenant::TenantService;

#[derive(Clone)]
pub struct FormationService {
    schemas: SchemaService,
    labels: LabelService,
    assignments: AssignmentService,
    tenants: TenantService,
}

impl FormationService {
    pub fn new(
        schemas: SchemaService,
        labels: LabelService,
        assignments: AssignmentService,
        tenants: TenantService,
    ) -> Self {
        Self {
            schemas,
            labels,
            assignments,
            tenants,
        }
    }

    /// Add `name` to the tenant's schema. Idempotent; the first formation of
    /// a tenant creates its schema.
    pub fn create_formation(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        name: &str,
    ) -> FormationResult<Formation> {
        let tenant = ctx.tenant()?;
        match self.schemas.get(tx, tenant)? {
            None => {
                let schema = ScenariosSchema::for_formations([name]);
                schema
                    .validate_name(name)
                    .map_err(|e| FormationError::InvalidData(e.to_string()))?;
                self.schemas.create(tx, tenant, &schema)?;
            }
            Some((def, schema)) => {
                schema
                    .validate_name(name)
                    .map_err(|e| FormationError::InvalidData(e.to_string()))?;
                if schema.allows(name) {
                    return Ok(Formation::new(name));
                }
                self.schemas
                    .update(tx, tenant, &def, &schema.with_formation(name))?;
            }
        }
        info!(%tenant, formation = %name, "formation created");
        Ok(Formation::new(name))
    }

    /// Remove `name` from the tenant's schema. Fails while any label or
    /// assignment of the tenant still references it.
    pub fn delete_formation(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        name: &str,
    ) -> FormationResult<Formation> {
        let tenant = ctx.tenant()?;
        let (def, schema) = match self.schemas.get(tx, tenant)? {
            Some((def, schema)) if schema.allows(name) => (def, schema),
            _ => return Err(FormationError::not_found(Resource::Formation, name)),
        };
        self.schemas
            .update(tx, tenant, &def, &schema.without_formation(name))?;
        info!(%tenant, formation = %name, "formation deleted");
        Ok(Formation::new(name))
    }

    pub fn assign_formation(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        object_id: &str,
        object_type: FormationObjectType,
        formation: Formation,
    ) -> FormationResult<Formation> {
        let tenant = ctx.tenant()?;
        match object_type {
            FormationObjectType::Application => {
                if !tx.application_exists_in_tenant(tenant, object_id)? {
                    return Err(FormationError::not_found(Resource::Application, object_id));
                }
                let mut scenarios = self.application_scenarios(tx, tenant, object_id)?;
                scenarios.insert(formation.name.as_str());
                self.labels.upsert_label(
                    tx,
                    tenant,
                    &scenarios_input(object_id, scenarios),
                )?;
            }
            FormationObjectType::Tenant => {
                let target = self.tenants.resolve_internal_id(tx, object_id)?;
                let assignment = Assignment {
                    scenario_name: formation.name.clone(),
                    tenant: tenant.to_string(),
                    selector: LabelSelector {
                        key: self.assignments.selector_key().to_string(),
                        value: object_id.to_string(),
                    },
                    target_tenant_id: target,
                };
                self.assignments.create(tx, ctx, assignment)?;
            }
            other => {
                return Err(FormationError::InvalidData(format!(
                    "unknown formation type {other}"
                )));
            }
        }
        info!(%tenant, formation = %formation.name, %object_type, %object_id, "formation assigned");
        Ok(formation)
    }

    /// Inverse of [`assign_formation`](Self::assign_formation). An
    /// application without the formation is left as is, while a tenant
    /// without an assignment for it is `NotFound`.
    pub fn unassign_formation(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        object_id: &str,
        object_type: FormationObjectType,
        formation: Formation,
    ) -> FormationResult<Formation> {
        let tenant = ctx.tenant()?;
        match object_type {
            FormationObjectType::Application => {
                let mut scenarios = self.application_scenarios(tx, tenant, object_id)?;
                scenarios.remove(&formation.name);
                if scenarios.is_empty() {
                    tx.delete_label(tenant, ObjectType::Application, object_id, SCENARIOS_KEY)?;
                } else {
                    self.labels.upsert_label(
                        tx,
                        tenant,
                        &scenarios_input(object_id, scenarios),
                    )?;
                }
            }
            FormationObjectType::Tenant => {
                let assignment =
                    self.assignments
                        .get_for_scenario_name(tx, ctx, &formation.name)?;
                self.assignments.delete(tx, ctx, &assignment)?;
            }
            other => {
                return Err(FormationError::InvalidData(format!(
                    "unknown formation type {other}"
                )));
            }
        }
        info!(%tenant, formation = %formation.name, %object_type, %object_id, "formation unassigned");
        Ok(formation)
    }

    fn application_scenarios(
        &self,
        tx: &Tx,
        tenant: &str,
        application_id: &str,
    ) -> FormationResult<ScenarioSet> {
        match tx.get_label(tenant, ObjectType::Application, application_id, SCENARIOS_KEY)? {
            Some(label) => ScenarioSet::try_from(&label.value).map_err(|e| {
                FormationError::Internal(format!(
                    "scenarios label of application {application_id}: {e}"
                ))
            }),
            None => Ok(ScenarioSet::new()),
        }
    }
}

fn scenarios_input(application_id: &str, scenarios: ScenarioSet) -> LabelInput {
    LabelInput {
        key: SCENARIOS_KEY.to_string(),
        value: scenarios.into(),
        object_type: ObjectType::Application,
        object_id: application_id.to_string(),
    }
}
