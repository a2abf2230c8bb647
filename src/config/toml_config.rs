use crate::config::INPUT_EXTENSIONS;
use crate::core::rules::TransformRules;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_ordered, validate_path,
    validate_positive_number, Validate,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub load: LoadConfig,
    #[serde(default)]
    pub rules: TransformRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EtlError::ConfigError {
            message: format!("Cannot read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn rules(&self) -> TransformRules {
        self.rules.clone()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validate_path("source.input_path", &self.source.input_path)?;
        validate_file_extension("source.input_path", &self.source.input_path, INPUT_EXTENSIONS)?;
        validate_path("load.output_path", &self.load.output_path)?;

        let rules = &self.rules;
        validate_positive_number("rules.max_minutes", rules.max_minutes, 1)?;
        validate_ordered("rules.covid_start", &rules.covid_start, &rules.covid_end)?;
        for remap in &rules.remaps {
            validate_non_empty_string("rules.remaps.field", &remap.field)?;
        }
        for append in &rules.appends {
            validate_non_empty_string("rules.appends.field", &append.field)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{FieldAppend, ValueRemap};
    use chrono::NaiveDate;

    const MINIMAL: &str = r#"
[pipeline]
name = "dejepis-activity"

[source]
input_path = "data/export.csv"

[load]
output_path = "out/processed.tsv"
"#;

    #[test]
    fn test_minimal_config_uses_default_rules() {
        let config = TomlConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.input_path(), "data/export.csv");
        assert_eq!(config.output_path(), "out/processed.tsv");
        assert_eq!(config.rules(), TransformRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rules_override() {
        let content = format!(
            r#"{}
[rules]
max_minutes = 90
covid_start = "2020-03-01"
covid_end = "2020-06-30"

[[rules.remaps]]
field = "from"
from = "free"
to = "Fred"

[[rules.appends]]
field = "note"
suffix = " (checked)"
"#,
            MINIMAL
        );

        let config = TomlConfig::from_toml_str(&content).unwrap();
        let rules = config.rules();

        assert_eq!(rules.max_minutes, 90);
        assert_eq!(rules.attendance_value, "0");
        assert_eq!(rules.covid_start, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(rules.covid_end, NaiveDate::from_ymd_opt(2020, 6, 30).unwrap());
        assert_eq!(
            rules.remaps,
            vec![ValueRemap {
                field: "from".to_string(),
                from: "free".to_string(),
                to: "Fred".to_string(),
            }]
        );
        assert_eq!(
            rules.appends,
            vec![FieldAppend {
                field: "note".to_string(),
                suffix: " (checked)".to_string(),
            }]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ACTIVITY_ETL_TEST_DIR", "/srv/exports");
        let content = MINIMAL.replace("data/export.csv", "${ACTIVITY_ETL_TEST_DIR}/export.csv");

        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.input_path(), "/srv/exports/export.csv");
    }

    #[test]
    fn test_unset_env_var_is_kept() {
        let content = MINIMAL.replace("out/processed.tsv", "${ACTIVITY_ETL_UNSET_VAR}/p.tsv");

        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.output_path(), "${ACTIVITY_ETL_UNSET_VAR}/p.tsv");
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = TomlConfig::from_toml_str("[pipeline]\nname = \"x\"\n").unwrap_err();

        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.rules.max_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.rules.covid_start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.source.input_path = "export.json".to_string();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(MINIMAL).unwrap();
        config.pipeline.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_missing_file_is_config_error() {
        let err = TomlConfig::from_file("/definitely/not/here.toml").unwrap_err();

        assert!(matches!(err, EtlError::ConfigError { .. }));
    }
}
