pub mod app_config;
pub mod config;
pub mod products;

pub use app_config::HarvestConfig;
pub use config::{build_harvest_config, load_harvest_config, load_harvest_config_from_env};
pub use products::{CanonicalProduct, ExtractionMethod, PageKind, PaginationInfo};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
