use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use serde_json::{json, Value};

use crate::{required_str, Capability, CapabilityContext, PreferenceHandle};

// ============ get_capabilities ============

pub struct GetCapabilitiesCapability;

#[async_trait]
impl Capability for GetCapabilitiesCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "get_capabilities",
            "List what ORION can do",
            ArgSchema::new(),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, _args: Args) -> Result<Value> {
        let registry = ctx
            .registry
            .as_ref()
            .ok_or_else(|| Error::Capability("Capability registry not available".to_string()))?;
        let schemas = registry
            .read()
            .map_err(|e| Error::Capability(format!("Registry lock error: {}", e)))?
            .list();

        let mut lines = vec!["Available functions:".to_string()];
        for schema in schemas {
            lines.push(format!("- {}: {}", schema.name, schema.description));
        }
        Ok(json!(lines.join("\n")))
    }
}

fn preferences(ctx: &CapabilityContext) -> Result<&PreferenceHandle> {
    ctx.preferences
        .as_ref()
        .ok_or_else(|| Error::Capability("Preference store not available".to_string()))
}

// ============ set_preference ============

pub struct SetPreferenceCapability;

#[async_trait]
impl Capability for SetPreferenceCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "set_preference",
            "Remember a user preference (e.g. favorite folder, theme)",
            ArgSchema::new()
                .required("key", ArgType::String)
                .required("value", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let key = required_str(&args, "key")?.trim();
        let value = required_str(&args, "value")?;
        if key.is_empty() {
            return Err(Error::Validation("Preference key must not be empty".to_string()));
        }
        preferences(&ctx)?.set_preference(key, value)?;
        Ok(json!(format!("Preference saved: {} = {}", key, value)))
    }
}

// ============ get_preference ============

pub struct GetPreferenceCapability;

#[async_trait]
impl Capability for GetPreferenceCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "get_preference",
            "Look up a saved user preference (e.g. favorite_color)",
            ArgSchema::new().required("key", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let key = required_str(&args, "key")?.trim();
        match preferences(&ctx)?.get_preference(key)? {
            Some(value) => Ok(json!(format!("Preference '{}': {}", key, value))),
            None => Ok(json!(format!("No preference saved for '{}'", key))),
        }
    }
}
