use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extension(
    field_name: &str,
    file: &str,
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_set.contains(extension.to_lowercase().as_str()) => Ok(()),
        Some(extension) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_ordered<T: PartialOrd + std::fmt::Display>(
    field_name: &str,
    start: &T,
    end: &T,
) -> Result<()> {
    if start > end {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", start, end),
            reason: "Start must not be after end".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("input_path", "data/input.csv").is_ok());
        assert!(validate_path("input_path", "").is_err());
        assert!(validate_path("input_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("max_minutes", 60, 1).is_ok());
        assert!(validate_positive_number("max_minutes", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("input_path", "export.csv", &["csv", "txt"]).is_ok());
        assert!(validate_file_extension("input_path", "EXPORT.CSV", &["csv", "txt"]).is_ok());
        assert!(validate_file_extension("input_path", "export.xlsx", &["csv", "txt"]).is_err());
        assert!(validate_file_extension("input_path", "export", &["csv", "txt"]).is_err());
    }

    #[test]
    fn test_validate_ordered() {
        assert!(validate_ordered("covid", &1, &2).is_ok());
        assert!(validate_ordered("covid", &2, &2).is_ok());
        assert!(validate_ordered("covid", &3, &2).is_err());
    }
}
