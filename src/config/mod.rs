pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::rules::TransformRules;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_file_extension, validate_path, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const INPUT_EXTENSIONS: &[&str] = &["csv", "txt"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "activity-etl")]
#[command(about = "Cleans an activity CSV export into a tab-delimited dataset")]
pub struct CliConfig {
    /// Comma-delimited input file with a header row
    #[arg(long, default_value = "input.csv")]
    pub input_path: String,

    /// Where the tab-delimited result is written
    #[arg(long, default_value = "processed_done_total.csv")]
    pub output_path: String,

    /// TOML configuration file; replaces the path flags when given
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines on stderr")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn rules(&self) -> TransformRules {
        TransformRules::default()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input_path", &self.input_path)?;
        validate_file_extension("input_path", &self.input_path, INPUT_EXTENSIONS)?;
        validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}
