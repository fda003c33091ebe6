// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{IndexError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
    static ref PATH_PATTERN: Regex =
        Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*$").unwrap();
}

pub struct Validator;

impl Validator {
    /// Schema, field and table names: lowercase snake case.
    pub fn is_valid_name(name: &str) -> bool {
        NAME_PATTERN.is_match(name)
    }

    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            IndexError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(IndexError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    /// Parses a `path=value` filter argument.
    pub fn parse_filter(raw: &str) -> Result<(String, String)> {
        let Some((path, value)) = raw.split_once('=') else {
            return Err(IndexError::Validation(format!(
                "Filter must look like path=value: {}",
                raw
            )));
        };

        let path = path.trim();
        if !PATH_PATTERN.is_match(path) {
            return Err(IndexError::Validation(format!(
                "Invalid filter path: {}",
                path
            )));
        }

        Ok((path.to_string(), value.trim().to_string()))
    }

    pub fn validate_limit(limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(IndexError::Validation(
                "Limit must be greater than 0".to_string(),
            ));
        }

        if limit > 10000 {
            return Err(IndexError::Validation(
                "Limit too large (max 10000)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn sanitize_key(key: &str) -> String {
        key.replace(['/', '\\', ':'], "_").trim().to_string()
    }

    pub fn truncate_text(text: &str, max_length: usize) -> String {
        if text.chars().count() <= max_length {
            text.to_string()
        } else {
            let truncated: String = text.chars().take(max_length).collect();
            format!("{}...", truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_path() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("catalog.json");
        fs::write(&file_path, "{}").unwrap();

        assert!(Validator::validate_file_path(&file_path).is_ok());
        assert!(Validator::validate_file_path(temp.path()).is_err());
        assert!(Validator::validate_file_path(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_is_valid_name() {
        assert!(Validator::is_valid_name("custom_field"));
        assert!(Validator::is_valid_name("_private"));
        assert!(!Validator::is_valid_name("Name"));
        assert!(!Validator::is_valid_name("1st"));
        assert!(!Validator::is_valid_name("a.b"));
        assert!(!Validator::is_valid_name(""));
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            Validator::parse_filter("category.slug=home-tools").unwrap(),
            ("category.slug".to_string(), "home-tools".to_string())
        );
        assert_eq!(
            Validator::parse_filter("name=a=b").unwrap().1,
            "a=b".to_string()
        );
        assert!(Validator::parse_filter("category.slug").is_err());
        assert!(Validator::parse_filter("Category..slug=x").is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(Validator::validate_limit(10).is_ok());
        assert!(Validator::validate_limit(0).is_err());
        assert!(Validator::validate_limit(10001).is_err());
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(Validator::sanitize_key("product:12"), "product_12");
        assert_eq!(Validator::sanitize_key("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(Validator::truncate_text("short", 10), "short");
        assert_eq!(
            Validator::truncate_text("this is a very long text", 10),
            "this is a ..."
        );
    }
}
