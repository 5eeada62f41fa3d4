//! binderflow-common — Run configuration, settings, and errors shared by the binderflow crates.

pub mod error;
pub mod endpoint;
pub mod layout;
pub mod region;
pub mod run_config;
pub mod settings;

// Re-export commonly used types
pub use endpoint::{ServiceEndpoint, Stage};
pub use error::{BinderError, Result};
pub use layout::OutputLayoutPolicy;
pub use region::{RegionCatalog, RegionEntry};
pub use run_config::{format_decimal, RunConfiguration};
pub use settings::Settings;
