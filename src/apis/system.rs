use crate::error::DispatchError;
use crate::registry::ActionRegistry;
use crate::security::unix_now;
use serde_json::json;

/// Owner type of `system://Info`.
pub const SYSTEM_INFO: &str = "SystemInfo";

pub(super) fn register(registry: &mut ActionRegistry) -> Result<(), DispatchError> {
    registry.register_bare(SYSTEM_INFO, "GetVersion", |_ctx, _args| {
        Ok(json!(env!("CARGO_PKG_VERSION")).into())
    })?;
    registry.register_bare(SYSTEM_INFO, "GetTime", |_ctx, _args| {
        Ok(json!(unix_now()).into())
    })?;
    Ok(())
}
