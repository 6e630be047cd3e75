use orion_core::{Args, Error, FailureKind, Outcome};
use serde_json::Value;
use std::io::ErrorKind;
use tracing::{debug, warn};

use crate::{CapabilityContext, SharedRegistry};

/// DSL-compatible argument aliases, applied before validation.
const ARG_ALIASES: &[(&str, &str)] = &[("input", "input_path"), ("output", "output_path")];

/// Validates calls against the registry and turns every handler result into
/// an `Outcome`. Nothing a capability does escapes as an error.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
    ctx: CapabilityContext,
}

impl Dispatcher {
    pub fn new(registry: SharedRegistry, ctx: CapabilityContext) -> Self {
        let mut ctx = ctx;
        ctx.registry = Some(registry.clone());
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn context(&self) -> &CapabilityContext {
        &self.ctx
    }

    pub async fn dispatch(&self, name: &str, args: &Args) -> Outcome {
        let args = apply_aliases(args);

        // Take what we need out of the lock before awaiting the handler.
        let (capability, schema, known) = {
            let registry = match self.registry.read() {
                Ok(r) => r,
                Err(e) => {
                    return Outcome::failure(FailureKind::Unknown, format!("Registry lock error: {}", e))
                }
            };
            let found = registry
                .get(name)
                .zip(registry.schema(name).cloned());
            match found {
                Some((cap, schema)) => (Some(cap), Some(schema), Vec::new()),
                None => (None, None, registry.names()),
            }
        };

        let (capability, schema) = match (capability, schema) {
            (Some(c), Some(s)) => (c, s),
            _ => {
                debug!(name, "Unknown capability");
                let listing = if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                };
                return Outcome::failure(
                    FailureKind::NotFound,
                    format!("Unknown function '{}'. Available: {}", name, listing),
                );
            }
        };

        let missing: Vec<&str> = schema
            .args
            .required_names()
            .filter(|arg| !args.contains_key(*arg))
            .collect();
        if !missing.is_empty() {
            return Outcome::failure(
                FailureKind::InvalidArgs,
                format!("Missing arguments for {}: {}", name, missing.join(", ")),
            );
        }

        let mut checked = Args::new();
        for (key, value) in args {
            match schema.args.get(&key) {
                Some(spec) if value.is_null() && !spec.required => {}
                Some(spec) if !spec.ty.accepts(&value) => {
                    return Outcome::failure(
                        FailureKind::InvalidArgs,
                        format!("Argument '{}' of {} must be a {}", key, name, spec.ty),
                    );
                }
                Some(_) => {
                    checked.insert(key, value);
                }
                None => debug!(name, arg = %key, "Dropping undeclared argument"),
            }
        }

        debug!(name, "Dispatching capability");
        match capability.execute(self.ctx.clone(), checked).await {
            Ok(value) => Outcome::success(render_value(value)),
            Err(e) => {
                let kind = classify_error(&e);
                warn!(name, kind = %kind, error = %e, "Capability failed");
                Outcome::failure(kind, e.to_string())
            }
        }
    }
}

/// Rename DSL-style `input`/`output` keys to their canonical names unless the
/// canonical key is already present.
pub fn apply_aliases(args: &Args) -> Args {
    let mut out = args.clone();
    for (alias, canonical) in ARG_ALIASES {
        if out.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = out.remove(*alias) {
            out.insert(canonical.to_string(), value);
        }
    }
    out
}

fn render_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "done".to_string(),
        other => other.to_string(),
    }
}

/// Map a handler error onto the failure taxonomy.
pub fn classify_error(error: &Error) -> FailureKind {
    match error {
        Error::NotFound(_) => FailureKind::NotFound,
        Error::PermissionDenied(_) => FailureKind::PermissionDenied,
        Error::Validation(_) => FailureKind::InvalidArgs,
        Error::Data(_) | Error::Json(_) | Error::Yaml(_) => FailureKind::DataError,
        Error::Io(io) => match io.kind() {
            ErrorKind::NotFound => FailureKind::NotFound,
            ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            ErrorKind::InvalidData => FailureKind::DataError,
            _ => FailureKind::Unknown,
        },
        _ => FailureKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, CapabilityRegistry};
    use async_trait::async_trait;
    use orion_core::{ArgSchema, ArgType, CapabilitySchema, Result};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct CopyFile;

    #[async_trait]
    impl Capability for CopyFile {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema::new(
                "copy",
                "Copy a file",
                ArgSchema::new()
                    .required("input_path", ArgType::String)
                    .required("output_path", ArgType::String)
                    .optional("overwrite", ArgType::Boolean),
            )
        }

        async fn execute(&self, _ctx: CapabilityContext, args: Args) -> Result<Value> {
            Ok(json!(format!(
                "{} -> {}",
                args["input_path"].as_str().unwrap_or_default(),
                args["output_path"].as_str().unwrap_or_default()
            )))
        }
    }

    struct Failing(fn() -> Error);

    #[async_trait]
    impl Capability for Failing {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema::new("fail", "Always fails", ArgSchema::new())
        }

        async fn execute(&self, _ctx: CapabilityContext, _args: Args) -> Result<Value> {
            Err((self.0)())
        }
    }

    fn dispatcher_with(caps: Vec<Arc<dyn Capability>>) -> Dispatcher {
        let mut registry = CapabilityRegistry::new();
        for cap in caps {
            registry.register(cap);
        }
        Dispatcher::new(registry.into_shared(), CapabilityContext::new(PathBuf::from(".")))
    }

    fn args(v: Value) -> Args {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_capability_is_not_found() {
        let empty = dispatcher_with(vec![]);
        let outcome = empty.dispatch("nope", &Args::new()).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));

        let one = dispatcher_with(vec![Arc::new(CopyFile)]);
        let outcome = one.dispatch("nope", &Args::new()).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
        assert!(outcome.message().contains("copy"));
    }

    #[tokio::test]
    async fn test_missing_args_named_exactly() {
        let d = dispatcher_with(vec![Arc::new(CopyFile)]);
        let outcome = d.dispatch("copy", &args(json!({"input_path": "a"}))).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidArgs));
        assert!(outcome.message().ends_with(": output_path"));

        let outcome = d.dispatch("copy", &Args::new()).await;
        assert!(outcome.message().ends_with(": input_path, output_path"));
    }

    #[tokio::test]
    async fn test_aliases_are_applied() {
        let d = dispatcher_with(vec![Arc::new(CopyFile)]);
        let outcome = d
            .dispatch("copy", &args(json!({"input": "a.csv", "output": "b.json"})))
            .await;
        assert_eq!(outcome, Outcome::success("a.csv -> b.json"));
    }

    #[tokio::test]
    async fn test_alias_does_not_override_canonical() {
        let d = dispatcher_with(vec![Arc::new(CopyFile)]);
        let outcome = d
            .dispatch(
                "copy",
                &args(json!({"input": "x", "input_path": "a", "output_path": "b"})),
            )
            .await;
        assert_eq!(outcome, Outcome::success("a -> b"));
    }

    #[tokio::test]
    async fn test_wrong_type_is_invalid_args() {
        let d = dispatcher_with(vec![Arc::new(CopyFile)]);
        let outcome = d
            .dispatch("copy", &args(json!({"input_path": 3, "output_path": "b"})))
            .await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidArgs));

        let outcome = d
            .dispatch(
                "copy",
                &args(json!({"input_path": "a", "output_path": "b", "overwrite": "yes"})),
            )
            .await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidArgs));
    }

    #[tokio::test]
    async fn test_handler_errors_are_classified() {
        let cases: Vec<(fn() -> Error, FailureKind)> = vec![
            (|| Error::NotFound("x".into()), FailureKind::NotFound),
            (
                || Error::Io(std::io::Error::new(ErrorKind::PermissionDenied, "denied")),
                FailureKind::PermissionDenied,
            ),
            (|| Error::Data("missing column".into()), FailureKind::DataError),
            (|| Error::Other("boom".into()), FailureKind::Unknown),
        ];
        for (make, expected) in cases {
            let d = dispatcher_with(vec![Arc::new(Failing(make))]);
            let outcome = d.dispatch("fail", &Args::new()).await;
            assert_eq!(outcome.failure_kind(), Some(expected));
        }
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(json!("hi")), "hi");
        assert_eq!(render_value(json!({"a": 1})), "{\"a\":1}");
        assert_eq!(render_value(Value::Null), "done");
    }
}
