//! Core domain types for field metadata.
//! These are pure value types — no sqlx, no DB dependencies.

// `VisibilityType::from_str` returns `Option<Self>` instead of
// implementing `FromStr` because unknown values are not an error here.
#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type FieldId = i64;
pub type DimensionId = i64;
pub type FieldValuesId = i64;

// ── Semantic type tag ─────────────────────────────────────────

/// Semantic column type tag, e.g. `"type/FK"` or `"type/Category"`.
///
/// The vocabulary is open and hierarchical; descent checks are resolved
/// by [`crate::taxonomy::SemanticTypeTaxonomy`], not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemanticType(String);

impl SemanticType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SemanticType {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

// ── Visibility ────────────────────────────────────────────────

/// Where a field surfaces in consuming UIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityType {
    #[default]
    Normal,
    Hidden,
    Sensitive,
    Retired,
}

impl VisibilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hidden => "hidden",
            Self::Sensitive => "sensitive",
            Self::Retired => "retired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "hidden" => Some(Self::Hidden),
            "sensitive" => Some(Self::Sensitive),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

impl fmt::Display for VisibilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Field ─────────────────────────────────────────────────────

/// A data column descriptor.
///
/// Invariant: `fk_target_field_id` is set only while `special_type` is
/// foreign-key-like. [`crate::policy::FieldUpdatePolicy`] is the sole
/// writer that enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    /// Physical column name.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub special_type: Option<SemanticType>,
    pub fk_target_field_id: Option<FieldId>,
    pub visibility_type: VisibilityType,
    pub caveats: Option<String>,
    pub points_of_interest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Dimension ─────────────────────────────────────────────────

/// How a dimension remaps raw values for display.
///
/// `Internal` uses the field's own cached human-readable values;
/// `External` joins to another field for its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DimensionMapping {
    Internal,
    External {
        #[serde(default)]
        human_readable_field_id: Option<FieldId>,
    },
}

impl DimensionMapping {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External { .. } => "external",
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    pub fn human_readable_field_id(&self) -> Option<FieldId> {
        match self {
            Self::Internal => None,
            Self::External {
                human_readable_field_id,
            } => *human_readable_field_id,
        }
    }
}

/// A display-remapping rule attached to exactly one field.
/// At most one dimension exists per field; the storage layer enforces
/// the uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    pub field_id: FieldId,
    pub name: String,
    #[serde(flatten)]
    pub mapping: DimensionMapping,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── FieldValues ───────────────────────────────────────────────

/// Cached snapshot of a field's distinct values, in submission order.
///
/// `human_readable_values`, when present, is positionally aligned with
/// `values` and always the same length — never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValues {
    pub id: FieldValuesId,
    pub field_id: FieldId,
    pub values: Vec<serde_json::Value>,
    pub human_readable_values: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_round_trips_through_str() {
        for v in [
            VisibilityType::Normal,
            VisibilityType::Hidden,
            VisibilityType::Sensitive,
            VisibilityType::Retired,
        ] {
            assert_eq!(VisibilityType::from_str(v.as_str()), Some(v));
        }
        assert_eq!(VisibilityType::from_str("invisible"), None);
    }

    #[test]
    fn dimension_mapping_serde_is_tagged() {
        let internal = serde_json::to_value(DimensionMapping::Internal).unwrap();
        assert_eq!(internal, serde_json::json!({"type": "internal"}));

        let external = serde_json::to_value(DimensionMapping::External {
            human_readable_field_id: Some(9),
        })
        .unwrap();
        assert_eq!(
            external,
            serde_json::json!({"type": "external", "human_readable_field_id": 9})
        );

        // `human_readable_field_id` may be omitted for external mappings
        let parsed: DimensionMapping =
            serde_json::from_str(r#"{"type": "external"}"#).unwrap();
        assert_eq!(
            parsed,
            DimensionMapping::External {
                human_readable_field_id: None
            }
        );
    }

    #[test]
    fn semantic_type_is_transparent_in_serde() {
        let t = SemanticType::from("type/FK");
        assert_eq!(serde_json::to_value(&t).unwrap(), serde_json::json!("type/FK"));
        let back: SemanticType = serde_json::from_str(r#""type/FK""#).unwrap();
        assert_eq!(back, t);
    }
}
