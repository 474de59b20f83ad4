use scene_core::Labels;
use scenegrid_formation::{ControlPlane, RuntimeInput};
use scenegrid_state::LabelFilter;

use super::{parse_label, parse_value, print_json, tenant_context};

pub fn create(
    plane: &ControlPlane,
    tenant: &str,
    name: &str,
    description: Option<String>,
    labels: &[String],
) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let labels = labels
        .iter()
        .map(|arg| parse_label(arg))
        .collect::<anyhow::Result<Labels>>()?;
    let input = RuntimeInput {
        name: name.to_string(),
        description,
        labels,
    };
    print_json(&plane.create_runtime(&ctx, input)?)
}

pub fn list(plane: &ControlPlane, tenant: &str, filters: &[String]) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    let filters = filters
        .iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, raw)) => LabelFilter::equals(key, parse_value(raw)),
            None => LabelFilter::exists(arg.as_str()),
        })
        .collect::<Vec<_>>();
    print_json(&plane.list_runtimes(&ctx, &filters)?)
}

pub fn delete(plane: &ControlPlane, tenant: &str, id: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    plane.delete_runtime(&ctx, id)?;
    println!("deleted runtime {id}");
    Ok(())
}

pub fn labels(plane: &ControlPlane, tenant: &str, id: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    print_json(&plane.list_runtime_labels(&ctx, id)?)
}

pub fn set_label(
    plane: &ControlPlane,
    tenant: &str,
    id: &str,
    key: &str,
    value: &str,
) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    plane.set_runtime_label(&ctx, id, key, parse_value(value))?;
    print_json(&plane.get_runtime_label(&ctx, id, key)?)
}

pub fn delete_label(plane: &ControlPlane, tenant: &str, id: &str, key: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    plane.delete_runtime_label(&ctx, id, key)?;
    println!("deleted label {key} from runtime {id}");
    Ok(())
}

pub fn register_application(plane: &ControlPlane, tenant: &str, name: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    print_json(&plane.register_application(&ctx, name)?)
}

pub fn list_applications(plane: &ControlPlane, tenant: &str) -> anyhow::Result<()> {
    let ctx = tenant_context(plane, tenant)?;
    print_json(&plane.list_applications(&ctx)?)
}
