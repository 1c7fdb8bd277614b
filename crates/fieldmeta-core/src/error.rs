use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldMetaError>;

#[derive(Debug, Error)]
pub enum FieldMetaError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FieldMetaError {
    /// Field-scoped validation failure. Never emitted after a write has
    /// started — callers may assume state is untouched.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status: exhaustive variant coverage ──────────────────

    #[test]
    fn http_status_validation() {
        assert_eq!(FieldMetaError::validation("name", "blank").http_status(), 400);
    }

    #[test]
    fn http_status_not_found() {
        assert_eq!(FieldMetaError::NotFound("x".into()).http_status(), 404);
    }

    #[test]
    fn http_status_conflict() {
        assert_eq!(FieldMetaError::Conflict("x".into()).http_status(), 409);
    }

    #[test]
    fn http_status_internal() {
        let err = FieldMetaError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.http_status(), 500);
    }

    // ── Display ──────────────────────────────────────────────────

    #[test]
    fn display_validation_is_field_scoped() {
        let e = FieldMetaError::validation("fk_target_field_id", "no field with id 42");
        assert_eq!(e.to_string(), "invalid fk_target_field_id: no field with id 42");
    }

    #[test]
    fn display_not_found() {
        let e = FieldMetaError::NotFound("field 7".into());
        assert_eq!(e.to_string(), "not found: field 7");
    }

    #[test]
    fn display_conflict() {
        let e = FieldMetaError::Conflict("duplicate dimension".into());
        assert_eq!(e.to_string(), "conflict: duplicate dimension");
    }

    #[test]
    fn display_internal() {
        let e = FieldMetaError::Internal(anyhow::anyhow!("zero rows affected"));
        assert_eq!(e.to_string(), "internal: zero rows affected");
    }
}
