use scenegrid_formation::{ControlPlane, Formation, FormationObjectType};
use tracing::info;

use super::{print_json, tenant_context};

pub fn list(plane: &ControlPlane, tenant: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    print_json(&plane.list_formations(&ctx)?)
}

pub fn create(plane: &ControlPlane, tenant: &str, name: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let formation = plane.create_formation(&ctx, name)?;
    info!(formation = %formation.name, "formation created");
    print_json(&formation)
}

pub fn delete(plane: &ControlPlane, tenant: &str, name: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let formation = plane.delete_formation(&ctx, name)?;
    info!(formation = %formation.name, "formation deleted");
    print_json(&formation)
}

pub fn assign(
    plane: &ControlPlane,
    tenant: &str,
    name: &str,
    object_type: &str,
    object_id: &str,
) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let object_type: FormationObjectType = object_type.parse()?;
    let formation = plane.assign_formation(&ctx, object_id, object_type, Formation::new(name))?;
    print_json(&formation)
}

pub fn unassign(
    plane: &ControlPlane,
    tenant: &str,
    name: &str,
    object_type: &str,
    object_id: &str,
) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let object_type: FormationObjectType = object_type.parse()?;
    let formation = plane.unassign_formation(&ctx, object_id, object_type, Formation::new(name))?;
    print_json(&formation)
}

pub fn list_assignments(
    plane: &ControlPlane,
    tenant: &str,
    page_size: usize,
    cursor: Option<&str>,
) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    print_json(&plane.list_assignments(&ctx, page_size, cursor)?)
}
