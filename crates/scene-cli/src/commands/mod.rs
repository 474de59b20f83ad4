pub mod formation;
pub mod runtime;
pub mod tenant;

use std::path::Path;

use anyhow::Context;
use scene_core::{LabelValue, SceneConfig};
use scenegrid_formation::{ControlPlane, ErrorKind, RequestContext};
use scenegrid_state::StateStore;
use serde::Serialize;

/// Load the config, apply the data file override, and open the store.
pub fn open_plane(config: Option<&Path>, data: Option<&Path>) -> anyhow::Result<ControlPlane> {
    let mut config = match config {
        Some(path) => SceneConfig::from_file(path)?,
        None => SceneConfig::default(),
    };
    if let Some(data) = data {
        config.store.path = data.to_path_buf();
    }

    let store = StateStore::open(&config.store.path)
        .with_context(|| format!("failed to open store {}", config.store.path.display()))?;
    Ok(ControlPlane::new(store, &config)?)
}

/// Request context for a tenant given by external or internal id.
pub fn tenant_context(plane: &ControlPlane, id: &str) -> anyhow::Result<RequestContext> {
    let tenant = match plane.get_tenant_by_external_id(id) {
        Ok(tenant) => tenant,
        Err(e) if e.kind() == ErrorKind::NotFound => plane
            .get_tenant(id)
            .with_context(|| format!("unknown tenant {id}"))?,
        Err(e) => return Err(e.into()),
    };
    Ok(RequestContext::for_tenant(tenant.id))
}

/// Split `key=value`; the value is JSON if it parses, a plain string otherwise.
pub fn parse_label(arg: &str) -> anyhow::Result<(String, LabelValue)> {
    let (key, raw) = arg
        .split_once('=')
        .with_context(|| format!("expected key=value, got {arg:?}"))?;
    if key.is_empty() {
        anyhow::bail!("empty label key in {arg:?}");
    }
    Ok((key.to_string(), parse_value(raw)))
}

pub fn parse_value(raw: &str) -> LabelValue {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => LabelValue::from(value),
        Err(_) => LabelValue::text(raw),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
