//! Application registry.

use std::time::{SystemTime, UNIX_EPOCH};

use scene_core::{Labels, ObjectType};
use scenegrid_state::{Application, Tx};
use tracing::info;

use crate::context::RequestContext;
use crate::error::{FormationError, FormationResult, Resource};
use crate::ids::SharedIdGenerator;

#[derive(Clone)]
pub struct ApplicationService {
    ids: SharedIdGenerator,
}

impl ApplicationService {
    pub fn new(ids: SharedIdGenerator) -> Self {
        Self { ids }
    }

    pub fn register(&self, tx: &Tx, ctx: &RequestContext, name: &str) -> FormationResult<Application> {
        let tenant = ctx.tenant()?;
        let app = Application {
            id: self.ids.generate(),
            tenant: tenant.to_string(),
            name: name.to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        tx.create_application(&app)?;
        info!(application_id = %app.id, %tenant, %name, "application registered");
        Ok(app)
    }

    pub fn get(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<Application> {
        let tenant = ctx.tenant()?;
        match tx.get_application(id)? {
            Some(app) if tx.tenant_has_access(tenant, &app.tenant)? => Ok(app),
            _ => Err(FormationError::not_found(Resource::Application, id)),
        }
    }

    pub fn list(&self, tx: &Tx, ctx: &RequestContext) -> FormationResult<Vec<Application>> {
        let tenant = ctx.tenant()?;
        Ok(tx.list_applications_in_tenant(tenant)?)
    }

    pub fn delete(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<()> {
        let app = self.get(tx, ctx, id)?;
        tx.delete_application(&app.id)?;
        info!(application_id = %id, "application deleted");
        Ok(())
    }

    /// Labels of an application in the caller's label space.
    pub fn list_labels(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<Labels> {
        let tenant = ctx.tenant()?;
        self.get(tx, ctx, id)?;
        Ok(tx.list_labels_map(tenant, ObjectType::Application, id)?)
    }
}
