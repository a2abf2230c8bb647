use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::CsvError(e) if e.is_io_error() => ErrorCategory::Io,
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "Check that the input file exists and the path is spelled correctly".to_string()
            }
            EtlError::IoError(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                "Check read permission on the input and write permission on the output directory"
                    .to_string()
            }
            EtlError::IoError(_) => "Check the input and output paths".to_string(),
            EtlError::CsvError(_) => {
                "Make sure the input is a UTF-8, comma-delimited file with a header row".to_string()
            }
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Check the configuration file for syntax errors".to_string()
            }
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
            EtlError::ProcessingError { .. } => {
                "Inspect the input data; re-run with --verbose for per-row details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not read or write a file: {}", self),
            ErrorCategory::Data => format!("The input data could not be processed: {}", self),
            ErrorCategory::Configuration => format!("The configuration is invalid: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_critical() {
        let err = EtlError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "input.csv",
        ));
        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("input file exists"));
    }

    #[test]
    fn test_config_error_is_medium() {
        let err = EtlError::InvalidConfigValueError {
            field: "source.input_path".to_string(),
            value: String::new(),
            reason: "Path cannot be empty".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("source.input_path"));
    }

    #[test]
    fn test_processing_error_is_high() {
        let err = EtlError::ProcessingError {
            message: "bad row".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
