//! Domain services.
//!
//! Each module orchestrates repository calls for one resource: slug derivation,
//! existence and uniqueness checks, partial updates and response composition. Handlers
//! stay thin and only pick gates and extractors.

use crate::{
    error::{ApiError, FieldError},
    slug::slugify,
};

pub mod auth;
pub mod careers;
pub mod categories;
pub mod dashboard;
pub mod media;
pub mod portfolio;
pub mod posts;
pub mod tags;
pub mod users;

/// slug_for
///
/// Slug of a title or name. Text without a single sluggable character cannot be
/// addressed by URL and is rejected as a field error on `field`.
pub(crate) fn slug_for(field: &str, text: &str) -> Result<String, ApiError> {
    let slug = slugify(text);
    if slug.is_empty() {
        return Err(ApiError::validation(vec![FieldError::new(
            field,
            format!("{field} must contain at least one letter or digit"),
        )]));
    }
    Ok(slug)
}

/// Trims a free-text search term; blank terms mean "no search".
pub(crate) fn search_term(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|term| !term.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsluggable_titles_are_field_errors() {
        assert_eq!(slug_for("title", "Hello World").unwrap(), "hello-world");
        let err = slug_for("title", "???").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(Some("  rust ")), Some("rust"));
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(None), None);
    }
}
