use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{required_str, Capability, CapabilityContext};

/// A CSV file held in memory: header row plus string cells.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("CSV file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| Error::Data(format!("CSV header error: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(Error::Data(format!("CSV has no header row: {}", path.display())));
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| Error::Data(format!("CSV parse error: {}", e)))?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Data(format!("Column not found: {}", name)))
    }

    /// Parsed numeric cells of a column; blank and non-numeric cells are skipped.
    pub fn numeric_column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter_map(|cell| cell.trim().parse::<f64>().ok())
            .collect()
    }

    /// A column is numeric when every non-blank cell parses and at least one does.
    pub fn is_numeric(&self, index: usize) -> bool {
        let mut seen = false;
        for cell in self.rows.iter().filter_map(|row| row.get(index)) {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            if cell.parse::<f64>().is_err() {
                return false;
            }
            seen = true;
        }
        seen
    }

    pub fn missing_count(&self, index: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| row.get(index).map(|c| c.trim().is_empty()).unwrap_or(true))
            .count()
    }

    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (i, header) in self.headers.iter().enumerate() {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    obj.insert(header.clone(), parse_cell(cell));
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Try to parse a cell as number or boolean, fall back to string.
pub fn parse_cell(s: &str) -> Value {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return json!(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return json!(f);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return json!(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return json!(false);
    }
    json!(s)
}

/// Linear-interpolated percentile over already-sorted values.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn column_stats(values: &[f64]) -> Value {
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    // Sample standard deviation, zero for a single value.
    let std = if count > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    json!({
        "count": count,
        "mean": round3(mean),
        "std": round3(std),
        "min": sorted[0],
        "p25": round3(percentile_sorted(&sorted, 25.0)),
        "median": round3(percentile_sorted(&sorted, 50.0)),
        "p75": round3(percentile_sorted(&sorted, 75.0)),
        "max": sorted[count - 1],
    })
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

// ============ convert_csv_to_json ============

pub struct ConvertCsvToJsonCapability;

#[async_trait]
impl Capability for ConvertCsvToJsonCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "convert_csv_to_json",
            "Convert a CSV file into a JSON array of records",
            ArgSchema::new()
                .required("input_path", ArgType::String)
                .required("output_path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let input = required_str(&args, "input_path")?;
        let output = required_str(&args, "output_path")?;
        let input_path = ctx.resolve(input);
        let output_path = ctx.resolve(output);

        let count = tokio::task::spawn_blocking(move || -> Result<usize> {
            let table = Table::read(&input_path)?;
            let records = table.to_records();
            write_json(&output_path, &Value::Array(records))?;
            Ok(table.rows.len())
        })
        .await
        .map_err(|e| Error::Capability(format!("Conversion task failed: {}", e)))??;

        Ok(json!(format!("{} converted to JSON in {} ({} records)", input, output, count)))
    }
}

// ============ analyze_data ============

pub struct AnalyzeDataCapability;

#[async_trait]
impl Capability for AnalyzeDataCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "analyze_data",
            "Compute summary statistics for a CSV file (or an inventory of a folder) and save them as JSON",
            ArgSchema::new()
                .required("input_path", ArgType::String)
                .required("output_path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let input = required_str(&args, "input_path")?.to_string();
        let output = required_str(&args, "output_path")?.trim().to_string();
        // The report is written to a file, never a directory.
        if Path::new(&output).file_name().is_none() {
            return Err(Error::Validation(format!(
                "output_path must name a file, got '{}'",
                output
            )));
        }
        let input_path = ctx.resolve(&input);
        let output_path = ctx.resolve(&output);

        let summary = tokio::task::spawn_blocking(move || -> Result<String> {
            if input_path.is_dir() {
                let report = analyze_folder(&input_path)?;
                let files = report["total_files"].as_u64().unwrap_or(0);
                write_json(&output_path, &report)?;
                Ok(format!("{} files inventoried", files))
            } else {
                let table = Table::read(&input_path)?;
                let report = analyze_table(&table);
                write_json(&output_path, &report)?;
                Ok(format!("{} rows x {} columns", table.rows.len(), table.headers.len()))
            }
        })
        .await
        .map_err(|e| Error::Capability(format!("Analysis task failed: {}", e)))??;

        Ok(json!(format!("Analysis saved to {}: {}", output, summary)))
    }
}

pub fn analyze_table(table: &Table) -> Value {
    let mut types = Map::new();
    let mut stats = Map::new();
    let mut missing = Map::new();

    for (i, header) in table.headers.iter().enumerate() {
        missing.insert(header.clone(), json!(table.missing_count(i)));
        if table.is_numeric(i) {
            types.insert(header.clone(), json!("number"));
            stats.insert(header.clone(), column_stats(&table.numeric_column(i)));
        } else {
            types.insert(header.clone(), json!("text"));
        }
    }

    json!({
        "total_rows": table.rows.len(),
        "total_columns": table.headers.len(),
        "columns": table.headers,
        "column_types": types,
        "statistics": stats,
        "missing_values": missing,
    })
}

fn analyze_folder(root: &Path) -> Result<Value> {
    let mut by_extension: BTreeMap<String, u64> = BTreeMap::new();
    let mut total_files = 0u64;
    let mut total_bytes = 0u64;
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            // Skip VCS metadata and build output.
            if name == ".git" || name == "target" || name == "node_modules" {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                total_files += 1;
                total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                let ext = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
                    .unwrap_or_else(|| "(none)".to_string());
                *by_extension.entry(ext).or_insert(0) += 1;
            }
        }
    }

    Ok(json!({
        "root": root.display().to_string(),
        "total_files": total_files,
        "total_bytes": total_bytes,
        "files_by_extension": by_extension,
    }))
}
