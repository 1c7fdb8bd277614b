//! Storage port traits.
//! Implemented by `fieldmeta-postgres` — core logic depends only on
//! these traits. [`crate::mem::MemMetaStore`] implements them in memory.

use async_trait::async_trait;

use crate::patch::FieldChanges;
use crate::types::{
    Dimension, DimensionId, DimensionMapping, Field, FieldId, FieldValues, FieldValuesId,
};

pub use crate::error::Result;

/// Field records.
#[async_trait]
pub trait FieldRepository: Send + Sync {
    /// Load a field; `NotFound` when no such id exists.
    async fn get(&self, id: FieldId) -> Result<Field>;

    async fn exists(&self, id: FieldId) -> Result<bool>;

    /// Apply the resolved write set. Returns rows affected.
    async fn update(&self, id: FieldId, changes: &FieldChanges) -> Result<u64>;
}

/// Write shape for dimension upserts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDimension {
    pub field_id: FieldId,
    pub name: String,
    pub mapping: DimensionMapping,
}

/// Dimension records — at most one per field, enforced by storage.
#[async_trait]
pub trait DimensionRepository: Send + Sync {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<Dimension>>;

    /// Insert a new dimension row; `Conflict` when the field already
    /// has one.
    async fn insert(&self, attrs: &NewDimension) -> Result<DimensionId>;

    /// Overwrite an existing row's attributes. Returns rows affected.
    async fn update(&self, id: DimensionId, attrs: &NewDimension) -> Result<u64>;

    /// Returns rows affected; deleting a field with no dimension is 0,
    /// not an error.
    async fn delete_by_field(&self, field_id: FieldId) -> Result<u64>;

    async fn delete_by_id(&self, id: DimensionId) -> Result<u64>;
}

/// Write shape for field-values upserts. `human_readable_values`, when
/// present, is the same length as `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFieldValues {
    pub field_id: FieldId,
    pub values: Vec<serde_json::Value>,
    pub human_readable_values: Option<Vec<String>>,
}

/// Cached distinct-values records — at most one per field, enforced by
/// storage.
#[async_trait]
pub trait FieldValuesRepository: Send + Sync {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<FieldValues>>;

    async fn insert(&self, attrs: &NewFieldValues) -> Result<FieldValuesId>;

    /// Overwrite both sequences. Returns rows affected.
    async fn update(&self, id: FieldValuesId, attrs: &NewFieldValues) -> Result<u64>;
}

/// The transactional boundary for the foreign-key-removal cascade.
///
/// A concurrent reader must never observe the field updated without the
/// dimension deletion applied, or vice versa, so the pair commits
/// through one port method implemented where transactions live: the
/// Postgres adapter wraps both statements in a single
/// `begin`/`commit`, the memory adapter holds both write locks.
#[async_trait]
pub trait FieldUpdateUnit: Send + Sync {
    /// Apply `changes` to the field and delete `cascade_dimension`
    /// (when set) atomically. Returns rows affected for the field
    /// update.
    async fn commit_update(
        &self,
        field_id: FieldId,
        changes: &FieldChanges,
        cascade_dimension: Option<DimensionId>,
    ) -> Result<u64>;
}
