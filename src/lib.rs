pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{cli::LocalStorage, toml_config::TomlConfig};
pub use crate::core::{
    etl::EtlEngine,
    pipeline::CleanerPipeline,
    rules::{RowTransformer, TransformRules},
};
pub use crate::utils::error::{EtlError, Result};
