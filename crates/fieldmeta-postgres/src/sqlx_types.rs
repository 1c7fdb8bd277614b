//! Row structs and conversions into the core domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use fieldmeta_core::types::{
    Dimension, DimensionMapping, Field, FieldValues, SemanticType, VisibilityType,
};

#[derive(Debug, FromRow)]
pub struct PgFieldRow {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub special_type: Option<String>,
    pub fk_target_field_id: Option<i64>,
    pub visibility_type: String,
    pub caveats: Option<String>,
    pub points_of_interest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgFieldRow> for Field {
    type Error = String;

    fn try_from(r: PgFieldRow) -> Result<Self, String> {
        let visibility_type = VisibilityType::from_str(&r.visibility_type).ok_or_else(|| {
            format!(
                "unknown visibility_type '{}' for field {}",
                r.visibility_type, r.id
            )
        })?;
        Ok(Field {
            id: r.id,
            name: r.name,
            display_name: r.display_name,
            description: r.description,
            special_type: r.special_type.map(SemanticType::new),
            fk_target_field_id: r.fk_target_field_id,
            visibility_type,
            caveats: r.caveats,
            points_of_interest: r.points_of_interest,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PgDimensionRow {
    pub id: i64,
    pub field_id: i64,
    pub name: String,
    pub kind: String,
    pub human_readable_field_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgDimensionRow> for Dimension {
    type Error = String;

    fn try_from(r: PgDimensionRow) -> Result<Self, String> {
        let mapping = match r.kind.as_str() {
            "internal" => DimensionMapping::Internal,
            "external" => DimensionMapping::External {
                human_readable_field_id: r.human_readable_field_id,
            },
            other => {
                return Err(format!(
                    "unknown dimension kind '{}' for dimension {}",
                    other, r.id
                ))
            }
        };
        Ok(Dimension {
            id: r.id,
            field_id: r.field_id,
            name: r.name,
            mapping,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct PgFieldValuesRow {
    pub id: i64,
    pub field_id: i64,
    pub values: serde_json::Value,
    pub human_readable_values: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgFieldValuesRow> for FieldValues {
    type Error = String;

    fn try_from(r: PgFieldValuesRow) -> Result<Self, String> {
        let values = match r.values {
            serde_json::Value::Array(values) => values,
            other => {
                return Err(format!(
                    "field_values.values for field {} is not a JSON array: {}",
                    r.field_id, other
                ))
            }
        };
        Ok(FieldValues {
            id: r.id,
            field_id: r.field_id,
            values,
            human_readable_values: r.human_readable_values,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
