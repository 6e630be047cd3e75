use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Primitive type tag for a capability argument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    String,
    Number,
    Boolean,
}

impl ArgType {
    /// Whether a JSON value has the shape this tag describes.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArgType::String => "string",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgSpec {
    #[serde(rename = "type")]
    pub ty: ArgType,
    pub required: bool,
}

/// Argument schema in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgSchema {
    args: Vec<(String, ArgSpec)>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, ty: ArgType) -> Self {
        self.insert(name, ArgSpec { ty, required: true });
        self
    }

    pub fn optional(mut self, name: &str, ty: ArgType) -> Self {
        self.insert(name, ArgSpec { ty, required: false });
        self
    }

    fn insert(&mut self, name: &str, spec: ArgSpec) {
        match self.args.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = spec,
            None => self.args.push((name.to_string(), spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgSpec)> {
        self.args.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, s)| s.required).map(|(n, _)| n)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }
}

/// Public description of a capability: what the registry lists and the
/// model-assisted extractor sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilitySchema {
    pub name: String,
    pub description: String,
    pub args: ArgSchema,
}

impl CapabilitySchema {
    pub fn new(name: &str, description: &str, args: ArgSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            args,
        }
    }

    /// One-line signature, e.g. `create_file(path: string, content?: string)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .args
            .iter()
            .map(|(name, spec)| {
                if spec.required {
                    format!("{}: {}", name, spec.ty)
                } else {
                    format!("{}?: {}", name, spec.ty)
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}
