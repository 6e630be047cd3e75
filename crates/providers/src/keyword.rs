use async_trait::async_trait;
use orion_core::{Args, ExtractedCall, Result};
use serde_json::json;
use std::path::Path;

use crate::CallExtractor;

const LIST_WORDS: &[&str] = &["lista", "listá", "listar", "list", "ls", "archivos", "files", "show"];
const FOLDER_WORDS: &[&str] = &["carpeta", "folder", "directorio", "directory", "mkdir"];
const CONVERT_WORDS: &[&str] = &["convert", "csv", "json"];
const ANALYZE_WORDS: &[&str] = &["analiz", "analyz", "analys", "estadistic", "estadístic", "statistic", "metric"];

const DEFAULT_FOLDER: &str = "new_folder";
const DEFAULT_DATASET: &str = "data/ventas.csv";

/// Deterministic offline extractor used when no model is reachable.
#[derive(Debug, Default, Clone)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Pure mapping from text to a call.
    pub fn resolve(&self, text: &str) -> ExtractedCall {
        let lower = text.to_lowercase();
        let words = tokens(text);
        let has_word = |list: &[&str]| words.iter().any(|w| list.contains(&w.to_lowercase().as_str()));
        let has_fragment = |list: &[&str]| list.iter().any(|f| lower.contains(f));

        if has_word(LIST_WORDS) {
            let path = word_after(&words, FOLDER_WORDS)
                .or_else(|| {
                    ["data", "output"]
                        .iter()
                        .find(|d| words.iter().any(|w| w.eq_ignore_ascii_case(d)))
                        .map(|d| d.to_string())
                })
                .unwrap_or_else(|| ".".to_string());
            return call("list_files", json!({ "path": path }));
        }

        if has_word(FOLDER_WORDS) {
            let path = word_after(&words, FOLDER_WORDS).unwrap_or_else(|| DEFAULT_FOLDER.to_string());
            return call("create_folder", json!({ "path": path }));
        }

        if has_fragment(CONVERT_WORDS) && !has_fragment(ANALYZE_WORDS) {
            let input = find_csv(&words).unwrap_or_else(|| DEFAULT_DATASET.to_string());
            let output = format!("output/{}.json", stem(&input));
            return call(
                "convert_csv_to_json",
                json!({ "input_path": input, "output_path": output }),
            );
        }

        if has_fragment(ANALYZE_WORDS) {
            let input = find_csv(&words).unwrap_or_else(|| DEFAULT_DATASET.to_string());
            let output = format!("output/analysis_{}.json", stem(&input));
            return call("analyze_data", json!({ "input_path": input, "output_path": output }));
        }

        ExtractedCall::none()
    }
}

fn call(name: &str, args: serde_json::Value) -> ExtractedCall {
    let args: Args = args.as_object().cloned().unwrap_or_default();
    ExtractedCall::call(name, args)
}

/// Whitespace-separated words with surrounding punctuation and quotes removed.
fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| matches!(c, '\'' | '"' | ',' | ';' | '?' | '!' | '¿' | '¡' | '`'))
                .to_string()
        })
        .map(|w| w.trim_end_matches(':').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn word_after(words: &[String], markers: &[&str]) -> Option<String> {
    let idx = words
        .iter()
        .position(|w| markers.contains(&w.to_lowercase().as_str()))?;
    words
        .get(idx + 1)
        .map(|w| w.trim_end_matches('.').to_string())
        .filter(|w| !w.is_empty())
}

fn find_csv(words: &[String]) -> Option<String> {
    words
        .iter()
        .map(|w| w.trim_end_matches('.'))
        .find(|w| w.to_lowercase().ends_with(".csv"))
        .map(|w| w.to_string())
}

fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

#[async_trait]
impl CallExtractor for KeywordExtractor {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn extract(&self, text: &str, _system_prompt: &str) -> Result<ExtractedCall> {
        Ok(self.resolve(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str) -> ExtractedCall {
        KeywordExtractor::new().resolve(text)
    }

    #[test]
    fn test_create_folder_takes_next_word() {
        let c = resolve("creá una carpeta reportes");
        assert_eq!(c.call.as_deref(), Some("create_folder"));
        assert_eq!(c.args["path"], "reportes");

        let c = resolve("make a folder");
        assert_eq!(c.args["path"], DEFAULT_FOLDER);
    }

    #[test]
    fn test_listing_wins_over_folder() {
        let c = resolve("listá archivos en la carpeta docs");
        assert_eq!(c.call.as_deref(), Some("list_files"));
        assert_eq!(c.args["path"], "docs");

        let c = resolve("list files in output");
        assert_eq!(c.args["path"], "output");

        let c = resolve("ls");
        assert_eq!(c.args["path"], ".");
    }

    #[test]
    fn test_conversion_uses_named_csv() {
        let c = resolve("convert data/clientes.csv to json");
        assert_eq!(c.call.as_deref(), Some("convert_csv_to_json"));
        assert_eq!(c.args["input_path"], "data/clientes.csv");
        assert_eq!(c.args["output_path"], "output/clientes.json");
    }

    #[test]
    fn test_analysis() {
        let c = resolve("analizá iris.csv por favor");
        assert_eq!(c.call.as_deref(), Some("analyze_data"));
        assert_eq!(c.args["input_path"], "iris.csv");
        assert_eq!(c.args["output_path"], "output/analysis_iris.json");

        let c = resolve("show me statistics");
        // "show" is a listing word and is checked first
        assert_eq!(c.call.as_deref(), Some("list_files"));
    }

    #[test]
    fn test_nothing_matches() {
        assert_eq!(resolve("asdkj"), ExtractedCall::none());
    }
}
