//! Plugins shipped with ORION. Their manifests live under the repository's
//! `plugins/` directory and name these providers by catalog id.

mod data_analyzer;
mod file_processor;
mod web_scraper;

pub use data_analyzer::{correlation, DataAnalyzerPlugin};
pub use file_processor::FileProcessorPlugin;
pub use web_scraper::WebScraperPlugin;
