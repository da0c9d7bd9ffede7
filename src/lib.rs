pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig, Command};

pub use adapters::{load_sdk_config, AwsSettings, S3Storage};
pub use config::OpsConfig;
pub use utils::error::{OpsError, Result};
