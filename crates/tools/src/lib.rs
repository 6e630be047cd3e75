pub mod data;
pub mod dispatcher;
pub mod fs;
pub mod registry;
pub mod system;
pub mod web;

use async_trait::async_trait;
use orion_core::{Args, CapabilitySchema, Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use dispatcher::{apply_aliases, classify_error, Dispatcher};
pub use registry::{CapabilityRegistry, SharedRegistry};

/// Trait abstracting preference persistence needed by capabilities.
/// This keeps the tools crate independent of the storage crate.
pub trait PreferenceOps: Send + Sync {
    fn set_preference(&self, key: &str, value: &str) -> Result<()>;
    fn get_preference(&self, key: &str) -> Result<Option<String>>;
}

pub type PreferenceHandle = Arc<dyn PreferenceOps>;

/// Per-call environment handed to a capability.
#[derive(Clone)]
pub struct CapabilityContext {
    /// Relative paths resolve against this directory.
    pub workspace: PathBuf,
    pub registry: Option<SharedRegistry>,
    pub preferences: Option<PreferenceHandle>,
}

impl CapabilityContext {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            registry: None,
            preferences: None,
        }
    }

    pub fn with_preferences(mut self, preferences: PreferenceHandle) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_path(path, &self.workspace)
    }
}

/// A named, schema-described operation the dispatcher can invoke.
///
/// `execute` receives arguments that already passed schema validation:
/// every required key is present with the declared primitive type.
#[async_trait]
pub trait Capability: Send + Sync {
    fn schema(&self) -> CapabilitySchema;
    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value>;
}

pub fn resolve_path(path: &str, workspace: &Path) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        workspace.join(path)
    }
}

/// Fetch a string argument that the schema marks as required.
pub fn required_str<'a>(args: &'a Args, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Validation(format!("Missing required parameter: {}", name)))
}

pub fn optional_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.as_str())
}

/// Truncate to at most `max_chars` bytes on a UTF-8 boundary.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_path() {
        let ws = PathBuf::from("/work");
        assert_eq!(resolve_path("a/b.txt", &ws), PathBuf::from("/work/a/b.txt"));
        assert_eq!(resolve_path("/etc/hosts", &ws), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_required_str() {
        let args = json!({"path": "x", "n": 1}).as_object().cloned().unwrap();
        assert_eq!(required_str(&args, "path").unwrap(), "x");
        assert!(matches!(required_str(&args, "n"), Err(Error::Validation(_))));
        assert!(optional_str(&args, "content").is_none());
    }

    #[test]
    fn test_safe_truncate_respects_boundaries() {
        assert_eq!(safe_truncate("hola", 10), "hola");
        assert_eq!(safe_truncate("añb", 2), "a");
    }
}
