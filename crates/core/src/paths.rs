use std::path::PathBuf;

/// Argument names whose values are treated as filesystem paths.
pub const PATH_ARGS: &[&str] = &[
    "path",
    "input_path",
    "output_path",
    "directory",
    "csv_path",
    "output_archive",
    "input",
    "output",
];

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".orion"))
            .unwrap_or_else(|| PathBuf::from(".orion"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn database_file(&self) -> PathBuf {
        self.base.join("orion.db")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("orion.log")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.base.join("plugins")
    }

    pub fn builtin_plugins_dir(&self) -> PathBuf {
        // Installed layout first (bin/orion + plugins/), then the cargo layout
        // (target/debug/orion + plugins/), then the current directory.
        if let Ok(exe) = std::env::current_exe() {
            if let Some(exe_dir) = exe.parent() {
                for relative in &["../plugins", "../../plugins"] {
                    let candidate = exe_dir.join(relative);
                    if candidate.is_dir() {
                        return candidate;
                    }
                }
            }
        }
        PathBuf::from("./plugins")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.plugins_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a user- or model-supplied relative path.
///
/// Backslashes become forward slashes, runs of slashes collapse to one,
/// leading `./` and `/` prefixes are stripped and surrounding whitespace is
/// trimmed. The result is a fixpoint: normalizing it again returns it unchanged.
pub fn normalize_path(path: &str) -> String {
    let mut clean = path.trim().replace('\\', "/");
    while clean.contains("//") {
        clean = clean.replace("//", "/");
    }

    loop {
        let trimmed = clean.trim();
        let stripped = trimmed
            .strip_prefix("./")
            .or_else(|| trimmed.strip_prefix('/'))
            .unwrap_or(trimmed);
        if stripped.len() == clean.len() {
            break;
        }
        clean = stripped.to_string();
    }

    clean
}

/// Whether an argument name carries a path value.
pub fn is_path_arg(name: &str) -> bool {
    PATH_ARGS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize_path(".//data//file.txt"), "data/file.txt");
        assert_eq!(normalize_path("dir\\file"), "dir/file");
        assert_eq!(normalize_path("  /abs/path  "), "abs/path");
        assert_eq!(normalize_path("proj"), "proj");
        assert_eq!(normalize_path("."), ".");
        assert_eq!(normalize_path(".env"), ".env");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            ".//data//file.txt",
            "././x",
            " ./ y",
            "\\\\server\\share\\f.txt",
            "//./a",
            "a/b/",
            "",
            "   ",
            "./.hidden",
            "mi_app/app.js",
        ];
        for sample in samples {
            let once = normalize_path(sample);
            assert_eq!(normalize_path(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_path_arg_names() {
        assert!(is_path_arg("path"));
        assert!(is_path_arg("output_path"));
        assert!(!is_path_arg("content"));
    }

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_base(PathBuf::from("/tmp/orion-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/orion-test/config.json"));
        assert_eq!(paths.database_file(), PathBuf::from("/tmp/orion-test/orion.db"));
        assert_eq!(paths.log_file(), PathBuf::from("/tmp/orion-test/logs/orion.log"));
    }
}
