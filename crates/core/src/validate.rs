//! Field checks shared by every domain crate.

use crate::error::{CatalogError, CatalogResult};

/// Trimmed, non-empty text.
pub fn required(field: &str, value: String) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Patna ".into()).unwrap(), "Patna");
        let err = required("state", " \t ".into()).unwrap_err();
        assert_eq!(err, CatalogError::validation("state cannot be empty"));
    }
}
