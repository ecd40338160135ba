//! Validation of user input before it is sent to snapperd
//!
//! The daemon stores descriptions and userdata in its own metadata files, and
//! userdata is edited in the `key=value,key=value` form. Entries that would not
//! survive that form are rejected here.

use std::collections::BTreeMap;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation result
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a snapshot description
///
/// # Examples
/// ```
/// # use snapview_common::validation::validate_description;
/// assert!(validate_description("before kernel update").is_ok());
/// assert!(validate_description("two\nlines").is_err());
/// ```
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().any(|c| c.is_control()) {
        return Err("Description cannot contain control characters".to_string());
    }

    Ok(())
}

/// Validate a cleanup algorithm name
///
/// The known algorithms are `timeline` and `number`; other names are passed
/// through to the daemon as long as they are a single word.
pub fn validate_cleanup(cleanup: &str) -> Result<(), String> {
    if !cleanup
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!(
            "Invalid cleanup algorithm '{cleanup}'. Use timeline, number or leave it empty"
        ));
    }

    Ok(())
}

/// Validate userdata keys and values
///
/// # Returns
/// `Ok(())` if valid, `Err(errors)` with one error per offending entry
pub fn validate_userdata(userdata: &BTreeMap<String, String>) -> ValidationResult {
    let mut errors = Vec::new();

    for (key, value) in userdata {
        if key.is_empty() {
            errors.push(ValidationError::new("userdata", "Key cannot be empty"));
        } else if key.contains(['=', ',']) {
            errors.push(ValidationError::new(
                "userdata",
                format!("Key '{key}' cannot contain '=' or ','"),
            ));
        }

        if value.contains(',') {
            errors.push(ValidationError::new(
                "userdata",
                format!("Value of '{key}' cannot contain ','"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_description() {
        assert!(validate_description("").is_ok());
        assert!(validate_description("zypp(zypper)").is_ok());
        assert!(validate_description("tab\there").is_err());
    }

    #[test]
    fn test_validate_cleanup() {
        assert!(validate_cleanup("").is_ok());
        assert!(validate_cleanup("timeline").is_ok());
        assert!(validate_cleanup("number").is_ok());
        assert!(validate_cleanup("empty-pre-post").is_ok());

        assert!(validate_cleanup("two words").is_err());
        assert!(validate_cleanup("a,b").is_err());
    }

    #[test]
    fn test_validate_userdata_valid() {
        let map = BTreeMap::from([("important".to_string(), "yes".to_string())]);
        assert!(validate_userdata(&map).is_ok());
        assert!(validate_userdata(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_validate_userdata_multiple_errors() {
        let map = BTreeMap::from([
            (String::new(), "x".to_string()),
            ("a=b".to_string(), "c,d".to_string()),
        ]);

        let errors = validate_userdata(&map).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.field == "userdata"));
    }
}
