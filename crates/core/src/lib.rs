pub mod capability;
pub mod config;
pub mod error;
pub mod outcome;
pub mod paths;
pub mod types;

pub use capability::{ArgSchema, ArgSpec, ArgType, CapabilitySchema};
pub use config::Config;
pub use error::{Error, Result};
pub use outcome::{FailureKind, Outcome};
pub use paths::{normalize_path, Paths};
pub use types::{Args, ExtractedCall, Plan, Step};
