use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use serde_json::{json, Value};

use crate::{optional_str, required_str, Capability, CapabilityContext};

// ============ create_folder ============

pub struct CreateFolderCapability;

#[async_trait]
impl Capability for CreateFolderCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "create_folder",
            "Create a folder (and any missing parents); remembered as the last folder",
            ArgSchema::new().required("path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let path_str = required_str(&args, "path")?;
        let path = ctx.resolve(path_str);
        tokio::fs::create_dir_all(&path).await?;
        Ok(json!(format!("Folder created: {}", path_str)))
    }
}

// ============ create_file ============

pub struct CreateFileCapability;

#[async_trait]
impl Capability for CreateFileCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "create_file",
            "Create a file with optional text content, creating parent folders if needed",
            ArgSchema::new()
                .required("path", ArgType::String)
                .optional("content", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let path_str = required_str(&args, "path")?;
        let content = optional_str(&args, "content").unwrap_or("");
        let path = ctx.resolve(path_str);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        Ok(json!(format!(
            "File created: {} ({} characters)",
            path_str,
            content.chars().count()
        )))
    }
}

// ============ list_files ============

pub struct ListFilesCapability;

#[async_trait]
impl Capability for ListFilesCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "list_files",
            "List the entries of a folder",
            ArgSchema::new().required("path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let path_str = required_str(&args, "path")?;
        let path = ctx.resolve(path_str);

        if !path.exists() {
            return Err(Error::NotFound(format!("Folder not found: {}", path_str)));
        }
        if !path.is_dir() {
            return Err(Error::Validation(format!("Not a folder: {}", path_str)));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(if is_dir { format!("{}/", name) } else { name });
        }
        entries.sort();

        if entries.is_empty() {
            return Ok(json!(format!("{} is empty", path_str)));
        }
        Ok(json!(format!("Files in {}: {}", path_str, entries.join(", "))))
    }
}
