use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use orion_tools::{required_str, Capability, CapabilityContext};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{Plugin, PluginRegistrar};

/// Batch rename, duplicate detection and zip compression.
#[derive(Default)]
pub struct FileProcessorPlugin;

impl Plugin for FileProcessorPlugin {
    fn name(&self) -> &str {
        "file_processor"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Advanced file processing: batch rename, duplicate detection, compression"
    }

    fn author(&self) -> &str {
        "ORION Team"
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn register_capabilities(&self, registrar: &mut PluginRegistrar<'_>) {
        registrar.register(Arc::new(BatchRenameCapability));
        registrar.register(Arc::new(FindDuplicatesCapability));
        registrar.register(Arc::new(CompressFilesCapability));
    }
}

fn existing_dir(ctx: &CapabilityContext, dir: &str) -> Result<PathBuf> {
    let path = ctx.resolve(dir);
    if !path.exists() {
        return Err(Error::NotFound(format!("Directory not found: {}", dir)));
    }
    if !path.is_dir() {
        return Err(Error::Validation(format!("Not a directory: {}", dir)));
    }
    Ok(path)
}

/// Every regular file under `root`, depth first, in name order.
fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            files.extend(walk_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

async fn run_blocking<T, F>(what: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Capability(format!("{} task failed: {}", what, e)))?
}

// ============ batch_rename_files ============

pub struct BatchRenameCapability;

#[async_trait]
impl Capability for BatchRenameCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "batch_rename_files",
            "Rename every file in a folder whose name contains a pattern",
            ArgSchema::new()
                .required("directory", ArgType::String)
                .required("pattern", ArgType::String)
                .required("replacement", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let directory = required_str(&args, "directory")?;
        let pattern = required_str(&args, "pattern")?;
        let replacement = required_str(&args, "replacement")?;
        if pattern.is_empty() {
            return Err(Error::Validation("Rename pattern must not be empty".to_string()));
        }
        if replacement.contains(['/', '\\']) {
            return Err(Error::Validation(format!(
                "Replacement must not contain path separators: '{}'",
                replacement
            )));
        }
        let dir = existing_dir(&ctx, directory)?;

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();

        let mut renamed = 0;
        let mut skipped = 0;
        for name in names.iter().filter(|n| n.contains(pattern)) {
            let new_name = name.replace(pattern, replacement);
            if matches!(new_name.as_str(), "" | "." | "..") || new_name == *name {
                continue;
            }
            let target = dir.join(&new_name);
            if tokio::fs::try_exists(&target).await? {
                warn!(from = %name, to = %new_name, "Rename target exists, skipping");
                skipped += 1;
                continue;
            }
            debug!(from = %name, to = %new_name, "Renaming");
            tokio::fs::rename(dir.join(name), target).await?;
            renamed += 1;
        }

        let mut message = format!("Renamed {} files in '{}'", renamed, directory);
        if skipped > 0 {
            message.push_str(&format!(", skipped {} whose new name already exists", skipped));
        }
        Ok(json!(message))
    }
}

// ============ find_duplicates ============

pub struct FindDuplicatesCapability;

fn file_hash(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Groups of files with identical content, each group in path order.
pub fn duplicate_groups(root: &Path) -> Result<Vec<(String, Vec<PathBuf>)>> {
    let mut by_hash: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in walk_files(root)? {
        // Unreadable files are skipped.
        if let Ok(hash) = file_hash(&path) {
            by_hash.entry(hash).or_default().push(path);
        }
    }
    let mut groups: Vec<(String, Vec<PathBuf>)> =
        by_hash.into_iter().filter(|(_, paths)| paths.len() > 1).collect();
    groups.sort_by(|a, b| a.1[0].cmp(&b.1[0]));
    Ok(groups)
}

#[async_trait]
impl Capability for FindDuplicatesCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "find_duplicates",
            "Find files with identical content in a folder tree (SHA-256)",
            ArgSchema::new().required("directory", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let directory = required_str(&args, "directory")?.to_string();
        let dir = existing_dir(&ctx, &directory)?;

        let groups = run_blocking("Duplicate scan", move || duplicate_groups(&dir)).await?;
        if groups.is_empty() {
            return Ok(json!(format!("No duplicates found in '{}'", directory)));
        }

        let mut out = format!("Found {} groups of duplicate files:\n", groups.len());
        for (hash, paths) in &groups {
            out.push_str(&format!("\nHash {}...:\n", &hash[..8]));
            for path in paths {
                out.push_str(&format!("  - {}\n", path.display()));
            }
        }
        Ok(json!(out))
    }
}

// ============ compress_files ============

pub struct CompressFilesCapability;

pub struct ArchiveSummary {
    pub files: usize,
    pub original_bytes: u64,
    pub archive_bytes: u64,
}

/// Zip every file under `root` into `archive`, storing paths relative to `root`.
pub fn write_archive(root: &Path, archive: &Path) -> Result<ArchiveSummary> {
    // Collect first so an archive written inside `root` is not packed into itself.
    let files = walk_files(root)?;
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut original_bytes = 0u64;
    let mut count = 0usize;
    for path in &files {
        if path == archive {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = std::fs::read(path)?;
        zip.start_file(name, options)
            .map_err(|e| Error::Capability(format!("Zip error: {}", e)))?;
        zip.write_all(&data)?;
        original_bytes += data.len() as u64;
        count += 1;
    }
    zip.finish()
        .map_err(|e| Error::Capability(format!("Zip finalize error: {}", e)))?;

    let archive_bytes = std::fs::metadata(archive)?.len();
    Ok(ArchiveSummary {
        files: count,
        original_bytes,
        archive_bytes,
    })
}

#[async_trait]
impl Capability for CompressFilesCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "compress_files",
            "Compress the files of a folder into a ZIP archive",
            ArgSchema::new()
                .required("directory", ArgType::String)
                .required("output_archive", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let directory = required_str(&args, "directory")?;
        let mut output = required_str(&args, "output_archive")?.to_string();
        if !output.ends_with(".zip") {
            output.push_str(".zip");
        }
        let dir = existing_dir(&ctx, directory)?;
        let archive = ctx.resolve(&output);

        let summary = run_blocking("Compression", move || write_archive(&dir, &archive)).await?;
        let ratio = if summary.original_bytes > 0 {
            (1.0 - summary.archive_bytes as f64 / summary.original_bytes as f64) * 100.0
        } else {
            0.0
        };

        Ok(json!(format!(
            "Archive created: {}\nFiles compressed: {}\nOriginal size: {} bytes\nCompressed size: {} bytes\nCompression: {:.1}%",
            output, summary.files, summary.original_bytes, summary.archive_bytes, ratio
        )))
    }
}
