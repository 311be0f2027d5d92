//! Teams, folders, documents and shares.
//!
//! [`permission`] holds the access rules; [`queries`] the persistence.

pub mod permission;
pub mod queries;

use thiserror::Error;

use crate::id::IdError;

/// Document domain errors.
#[derive(Debug, Error)]
pub enum DocsError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("ID generation failed: {0}")]
    IdError(#[from] IdError),
}

/// Longest accepted team name, in characters.
pub const MAX_TEAM_NAME_LEN: usize = 50;

/// Longest accepted folder or document name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Check a display name: trimmed, non-empty, at most `max` characters.
pub fn validate_name(field: &str, value: &str, max: usize) -> Result<String, DocsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DocsError::ValidationError(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DocsError::ValidationError(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("name", "  Design  ", 50).unwrap(), "Design");
        assert!(validate_name("name", "   ", 50).is_err());
        assert!(validate_name("name", &"x".repeat(51), 50).is_err());
        assert!(validate_name("name", &"é".repeat(50), 50).is_ok());
    }
}
