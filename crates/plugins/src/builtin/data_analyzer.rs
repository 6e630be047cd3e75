use async_trait::async_trait;
use orion_core::{ArgSchema, ArgType, Args, CapabilitySchema, Error, Result};
use orion_tools::data::{percentile_sorted, round3, Table};
use orion_tools::{required_str, Capability, CapabilityContext};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::{Plugin, PluginRegistrar};

const MAX_LISTED_OUTLIERS: usize = 10;

/// IQR outlier detection and Pearson correlation over CSV columns.
#[derive(Default)]
pub struct DataAnalyzerPlugin;

impl Plugin for DataAnalyzerPlugin {
    fn name(&self) -> &str {
        "data_analyzer"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Advanced data analysis: outlier detection, correlations"
    }

    fn author(&self) -> &str {
        "ORION Team"
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn register_capabilities(&self, registrar: &mut PluginRegistrar<'_>) {
        registrar.register(Arc::new(DetectOutliersCapability));
        registrar.register(Arc::new(CorrelationMatrixCapability));
    }
}

fn numeric_column_index(table: &Table, column: &str) -> Result<usize> {
    let index = table.column_index(column).map_err(|_| {
        Error::Data(format!(
            "Column '{}' not found. Available columns: {}",
            column,
            table.headers.join(", ")
        ))
    })?;
    if !table.is_numeric(index) {
        return Err(Error::Data(format!("Column '{}' is not numeric", column)));
    }
    Ok(index)
}

pub struct OutlierReport {
    pub lower: f64,
    pub upper: f64,
    /// `(row index, value)` pairs, rows counted from zero after the header.
    pub outliers: Vec<(usize, f64)>,
}

/// Values outside `[q1 - 1.5 * iqr, q3 + 1.5 * iqr]`.
pub fn iqr_outliers(table: &Table, index: usize) -> OutlierReport {
    let cells: Vec<(usize, f64)> = table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.get(index).and_then(|c| c.trim().parse::<f64>().ok()).map(|v| (i, v)))
        .collect();

    let mut sorted: Vec<f64> = cells.iter().map(|(_, v)| *v).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = percentile_sorted(&sorted, 25.0);
    let q3 = percentile_sorted(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    OutlierReport {
        lower,
        upper,
        outliers: cells.into_iter().filter(|(_, v)| *v < lower || *v > upper).collect(),
    }
}

/// Pearson coefficient over the pairs where both values are present;
/// `None` with fewer than two pairs or a constant series.
pub fn correlation(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| x.zip(*y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// `{column: {column: r}}` over every numeric column, with the column names.
pub fn correlation_table(table: &Table) -> Result<(Vec<String>, Value)> {
    let numeric: Vec<usize> = (0..table.headers.len()).filter(|i| table.is_numeric(*i)).collect();
    if numeric.is_empty() {
        return Err(Error::Data("No numeric columns in dataset".to_string()));
    }

    let series: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|&i| {
            table
                .rows
                .iter()
                .map(|row| row.get(i).and_then(|c| c.trim().parse::<f64>().ok()))
                .collect()
        })
        .collect();

    let mut matrix = Map::new();
    for (a, &ia) in numeric.iter().enumerate() {
        let mut row = Map::new();
        for (b, &ib) in numeric.iter().enumerate() {
            let r = correlation(&series[a], &series[b]).map(round3);
            row.insert(table.headers[ib].clone(), json!(r));
        }
        matrix.insert(table.headers[ia].clone(), Value::Object(row));
    }

    let names = numeric.iter().map(|&i| table.headers[i].clone()).collect();
    Ok((names, Value::Object(matrix)))
}

// ============ detect_outliers ============

pub struct DetectOutliersCapability;

#[async_trait]
impl Capability for DetectOutliersCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "detect_outliers",
            "Detect outliers in a numeric CSV column using the IQR method",
            ArgSchema::new()
                .required("csv_path", ArgType::String)
                .required("column", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let csv_path = ctx.resolve(required_str(&args, "csv_path")?);
        let column = required_str(&args, "column")?.to_string();

        let col = column.clone();
        let report = tokio::task::spawn_blocking(move || -> Result<OutlierReport> {
            let table = Table::read(&csv_path)?;
            let index = numeric_column_index(&table, &col)?;
            Ok(iqr_outliers(&table, index))
        })
        .await
        .map_err(|e| Error::Capability(format!("Outlier task failed: {}", e)))??;

        if report.outliers.is_empty() {
            return Ok(json!(format!("No outliers detected in '{}'", column)));
        }

        let total = report.outliers.len();
        let mut out = format!(
            "Detected {} outliers in '{}':\nNormal range: [{:.2}, {:.2}]\n\nOutliers:\n",
            total, column, report.lower, report.upper
        );
        for (row, value) in report.outliers.iter().take(MAX_LISTED_OUTLIERS) {
            out.push_str(&format!("  Row {}: {}\n", row, value));
        }
        if total > MAX_LISTED_OUTLIERS {
            out.push_str(&format!("\n(Showing first {} of {} outliers)", MAX_LISTED_OUTLIERS, total));
        }
        Ok(json!(out))
    }
}

// ============ correlation_matrix ============

pub struct CorrelationMatrixCapability;

#[async_trait]
impl Capability for CorrelationMatrixCapability {
    fn schema(&self) -> CapabilitySchema {
        CapabilitySchema::new(
            "correlation_matrix",
            "Compute the correlation matrix of all numeric CSV columns and save it as JSON",
            ArgSchema::new()
                .required("csv_path", ArgType::String)
                .required("output_path", ArgType::String),
        )
    }

    async fn execute(&self, ctx: CapabilityContext, args: Args) -> Result<Value> {
        let csv_path = ctx.resolve(required_str(&args, "csv_path")?);
        let mut output = required_str(&args, "output_path")?.to_string();
        if !output.ends_with(".json") {
            output.push_str("_correlation.json");
        }
        let output_path = ctx.resolve(&output);

        let columns = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let table = Table::read(&csv_path)?;
            let (columns, matrix) = correlation_table(&table)?;
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output_path, serde_json::to_string_pretty(&matrix)?)?;
            Ok(columns)
        })
        .await
        .map_err(|e| Error::Capability(format!("Correlation task failed: {}", e)))??;

        Ok(json!(format!(
            "Correlation matrix saved to {}\nColumns analyzed: {}",
            output,
            columns.join(", ")
        )))
    }
}
