//! Postgres adapters for the fieldmeta-core ports.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use fieldmeta_core::error::FieldMetaError;
use fieldmeta_core::patch::{FieldChanges, Patch};
use fieldmeta_core::ports::{
    DimensionRepository, FieldRepository, FieldUpdateUnit, FieldValuesRepository, NewDimension,
    NewFieldValues, Result,
};
use fieldmeta_core::types::{
    Dimension, DimensionId, Field, FieldId, FieldValues, FieldValuesId, VisibilityType,
};

use crate::sqlx_types::{PgDimensionRow, PgFieldRow, PgFieldValuesRow};

const FIELD_COLUMNS: &str = "id, name, display_name, description, special_type, \
     fk_target_field_id, visibility_type, caveats, points_of_interest, created_at, updated_at";

/// Map a sqlx error, surfacing unique-index races as `Conflict`.
fn db_err(e: sqlx::Error) -> FieldMetaError {
    match e.as_database_error() {
        Some(d) if d.is_unique_violation() => FieldMetaError::Conflict(d.message().to_owned()),
        _ => FieldMetaError::Internal(anyhow!(e)),
    }
}

/// Build the dynamic UPDATE for a resolved write set. Only changed
/// columns enter the SET list; `updated_at` always bumps, which also
/// keeps the statement valid when the write set is empty.
fn field_update_query(field_id: FieldId, changes: &FieldChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE metadata.fields SET updated_at = now()");

    match &changes.special_type {
        Patch::Keep => {}
        Patch::Clear => {
            qb.push(", special_type = NULL");
        }
        Patch::Set(t) => {
            qb.push(", special_type = ");
            qb.push_bind(t.as_str().to_owned());
        }
    }
    match &changes.fk_target_field_id {
        Patch::Keep => {}
        Patch::Clear => {
            qb.push(", fk_target_field_id = NULL");
        }
        Patch::Set(target) => {
            qb.push(", fk_target_field_id = ");
            qb.push_bind(*target);
        }
    }
    match &changes.visibility_type {
        Patch::Keep => {}
        // the column is NOT NULL; clearing resets to the default
        Patch::Clear => {
            qb.push(", visibility_type = ");
            qb.push_bind(VisibilityType::default().as_str());
        }
        Patch::Set(v) => {
            qb.push(", visibility_type = ");
            qb.push_bind(v.as_str());
        }
    }
    for (column, patch) in [
        ("description", &changes.description),
        ("caveats", &changes.caveats),
        ("points_of_interest", &changes.points_of_interest),
    ] {
        match patch {
            Patch::Keep => {}
            Patch::Clear => {
                qb.push(format!(", {column} = NULL"));
            }
            Patch::Set(text) => {
                qb.push(format!(", {column} = "));
                qb.push_bind(text.clone());
            }
        }
    }
    if let Some(display_name) = &changes.display_name {
        qb.push(", display_name = ");
        qb.push_bind(display_name.clone());
    }

    qb.push(" WHERE id = ");
    qb.push_bind(field_id);
    qb
}

// ── PgFieldStore ──────────────────────────────────────────────

/// Postgres-backed field store. Also implements [`FieldUpdateUnit`],
/// wrapping the update-plus-cascade pair in one transaction.
pub struct PgFieldStore {
    pool: PgPool,
}

impl PgFieldStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FieldRepository for PgFieldStore {
    async fn get(&self, id: FieldId) -> Result<Field> {
        let row = sqlx::query_as::<_, PgFieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM metadata.fields WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?
        .ok_or_else(|| FieldMetaError::NotFound(format!("field {id} not found")))?;
        row.try_into()
            .map_err(|e: String| FieldMetaError::Internal(anyhow!(e)))
    }

    async fn exists(&self, id: FieldId) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM metadata.fields WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;
        Ok(found.is_some())
    }

    async fn update(&self, id: FieldId, changes: &FieldChanges) -> Result<u64> {
        let mut qb = field_update_query(id, changes);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FieldUpdateUnit for PgFieldStore {
    async fn commit_update(
        &self,
        field_id: FieldId,
        changes: &FieldChanges,
        cascade_dimension: Option<DimensionId>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        if let Some(dimension_id) = cascade_dimension {
            // the dimension may have raced away; deleting 0 rows is fine
            sqlx::query("DELETE FROM metadata.dimensions WHERE id = $1")
                .bind(dimension_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!(e))?;
        }

        let mut qb = field_update_query(field_id, changes);
        let affected = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?
            .rows_affected();

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(affected)
    }
}

// ── PgDimensionStore ──────────────────────────────────────────

pub struct PgDimensionStore {
    pool: PgPool,
}

impl PgDimensionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DimensionRepository for PgDimensionStore {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<Dimension>> {
        let row = sqlx::query_as::<_, PgDimensionRow>(
            "SELECT id, field_id, name, kind, human_readable_field_id, created_at, updated_at \
             FROM metadata.dimensions WHERE field_id = $1",
        )
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(|r| {
            r.try_into()
                .map_err(|e: String| FieldMetaError::Internal(anyhow!(e)))
        })
        .transpose()
    }

    async fn insert(&self, attrs: &NewDimension) -> Result<DimensionId> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO metadata.dimensions (field_id, name, kind, human_readable_field_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(attrs.field_id)
        .bind(&attrs.name)
        .bind(attrs.mapping.kind_str())
        .bind(attrs.mapping.human_readable_field_id())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: DimensionId, attrs: &NewDimension) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE metadata.dimensions \
             SET name = $2, kind = $3, human_readable_field_id = $4, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&attrs.name)
        .bind(attrs.mapping.kind_str())
        .bind(attrs.mapping.human_readable_field_id())
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    async fn delete_by_field(&self, field_id: FieldId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM metadata.dimensions WHERE field_id = $1")
            .bind(field_id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: DimensionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM metadata.dimensions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }
}

// ── PgFieldValuesStore ────────────────────────────────────────

pub struct PgFieldValuesStore {
    pool: PgPool,
}

impl PgFieldValuesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FieldValuesRepository for PgFieldValuesStore {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<FieldValues>> {
        let row = sqlx::query_as::<_, PgFieldValuesRow>(
            "SELECT id, field_id, \"values\", human_readable_values, created_at, updated_at \
             FROM metadata.field_values WHERE field_id = $1",
        )
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(|r| {
            r.try_into()
                .map_err(|e: String| FieldMetaError::Internal(anyhow!(e)))
        })
        .transpose()
    }

    async fn insert(&self, attrs: &NewFieldValues) -> Result<FieldValuesId> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO metadata.field_values (field_id, \"values\", human_readable_values) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(attrs.field_id)
        .bind(serde_json::Value::Array(attrs.values.clone()))
        .bind(&attrs.human_readable_values)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: FieldValuesId, attrs: &NewFieldValues) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE metadata.field_values \
             SET \"values\" = $2, human_readable_values = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(serde_json::Value::Array(attrs.values.clone()))
        .bind(&attrs.human_readable_values)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmeta_core::types::SemanticType;

    // The stores themselves need a live database; the SET-list
    // construction does not.

    #[test]
    fn update_query_includes_only_changed_columns() {
        let changes = FieldChanges {
            special_type: Patch::Set(SemanticType::from("type/Category")),
            fk_target_field_id: Patch::Clear,
            display_name: Some("Status".to_owned()),
            ..Default::default()
        };
        let qb = field_update_query(5, &changes);
        let sql = qb.sql();
        assert!(sql.contains("special_type = "));
        assert!(sql.contains("fk_target_field_id = NULL"));
        assert!(sql.contains("display_name = "));
        assert!(!sql.contains("caveats"));
        assert!(!sql.contains("visibility_type"));
        assert!(sql.ends_with("WHERE id = $3"));
    }

    #[test]
    fn empty_write_set_still_bumps_updated_at() {
        let qb = field_update_query(5, &FieldChanges::default());
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE metadata.fields SET updated_at = now()"));
        assert!(sql.ends_with("WHERE id = $1"));
    }

    #[test]
    fn visibility_clear_resets_to_default() {
        let changes = FieldChanges {
            visibility_type: Patch::Clear,
            ..Default::default()
        };
        let qb = field_update_query(5, &changes);
        assert!(qb.sql().contains("visibility_type = $1"));
    }
}
