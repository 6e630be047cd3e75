use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::paths::{is_path_arg, normalize_path};

pub type Args = Map<String, Value>;

/// One capability call inside a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    #[serde(alias = "CALL")]
    pub call: String,
    #[serde(default, alias = "ARGS")]
    pub args: Args,
}

impl Step {
    pub fn new(call: &str) -> Self {
        Self {
            call: call.to_string(),
            args: Map::new(),
        }
    }

    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(|v| v.as_str())
    }

    /// Normalize every string value held by a path-like argument.
    pub fn normalize_paths(&mut self) {
        normalize_path_args(&mut self.args);
    }
}

/// Ordered sequence of steps; order is execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        let mut plan = Self { steps };
        for step in &mut plan.steps {
            step.normalize_paths();
        }
        plan
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

/// Single-call resolution returned by a call extractor. `call` is `None`
/// when the extractor could not map the text to a capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedCall {
    #[serde(default, alias = "CALL")]
    pub call: Option<String>,
    #[serde(default, alias = "ARGS", deserialize_with = "args_or_empty")]
    pub args: Args,
}

impl ExtractedCall {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn call(name: &str, args: Args) -> Self {
        Self {
            call: Some(name.to_string()),
            args,
        }
    }

    /// Turn into a step with normalized path arguments, or `None` for a null
    /// or blank call.
    pub fn into_step(self) -> Option<Step> {
        let call = self.call?.trim().to_string();
        if call.is_empty() {
            return None;
        }
        let mut step = Step { call, args: self.args };
        step.normalize_paths();
        Some(step)
    }
}

fn args_or_empty<'de, D>(deserializer: D) -> std::result::Result<Args, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Models occasionally emit `"ARGS": null` or a non-object.
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

pub fn normalize_path_args(args: &mut Args) {
    for (name, value) in args.iter_mut() {
        if !is_path_arg(name) {
            continue;
        }
        if let Value::String(s) = value {
            *s = normalize_path(s);
        }
    }
}
