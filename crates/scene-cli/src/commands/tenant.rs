use scenegrid_formation::{ControlPlane, ErrorKind, TenantInput};
use scenegrid_state::TenantType;

use super::print_json;

fn parse_tenant_type(raw: &str) -> anyhow::Result<TenantType> {
    match raw.to_ascii_lowercase().as_str() {
        "account" => Ok(TenantType::Account),
        "subaccount" => Ok(TenantType::Subaccount),
        "customer" => Ok(TenantType::Customer),
        other => anyhow::bail!("unknown tenant type {other:?} (expected account, subaccount or customer)"),
    }
}

pub fn add(
    plane: &ControlPlane,
    external_id: &str,
    name: Option<String>,
    parent: Option<String>,
    tenant_type: &str,
) -> anyhow::Result<()> {
    let input = TenantInput {
        external_id: external_id.to_string(),
        name: name.unwrap_or_else(|| external_id.to_string()),
        parent,
        tenant_type: parse_tenant_type(tenant_type)?,
    };
    let tenants = plane.create_tenants(&[input])?;
    print_json(&tenants)
}

pub fn show(plane: &ControlPlane, id: &str) -> anyhow::Result<()> {
    let tenant = match plane.get_tenant_by_external_id(id) {
        Ok(tenant) => tenant,
        Err(e) if e.kind() == ErrorKind::NotFound => plane.get_tenant(id)?,
        Err(e) => return Err(e.into()),
    };
    print_json(&tenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_type_is_case_insensitive() {
        assert_eq!(parse_tenant_type("Subaccount").unwrap(), TenantType::Subaccount);
        assert!(parse_tenant_type("org").is_err());
    }
}
