//! In-memory implementation of the storage ports, for tests and local
//! harnesses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::FieldMetaError;
use crate::patch::{FieldChanges, Patch};
use crate::ports::{
    DimensionRepository, FieldRepository, FieldUpdateUnit, FieldValuesRepository, NewDimension,
    NewFieldValues, Result,
};
use crate::types::{
    Dimension, DimensionId, Field, FieldId, FieldValues, FieldValuesId, VisibilityType,
};

/// All four ports over `RwLock<HashMap>` maps.
///
/// The one-dimension-per-field and one-values-per-field invariants are
/// enforced on insert with `Conflict`, standing in for the storage
/// layer's unique indexes.
pub struct MemMetaStore {
    fields: RwLock<HashMap<FieldId, Field>>,
    dimensions: RwLock<HashMap<DimensionId, Dimension>>,
    field_values: RwLock<HashMap<FieldValuesId, FieldValues>>,
    next_id: AtomicI64,
}

impl MemMetaStore {
    pub fn new() -> Self {
        Self {
            fields: RwLock::new(HashMap::new()),
            dimensions: RwLock::new(HashMap::new()),
            field_values: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Seed a plain field with defaults and return it.
    pub async fn seed_field(&self, name: &str) -> Field {
        let now = Utc::now();
        let field = Field {
            id: self.alloc_id(),
            name: name.to_owned(),
            display_name: name.to_owned(),
            description: None,
            special_type: None,
            fk_target_field_id: None,
            visibility_type: VisibilityType::Normal,
            caveats: None,
            points_of_interest: None,
            created_at: now,
            updated_at: now,
        };
        self.fields.write().await.insert(field.id, field.clone());
        field
    }

    /// Overwrite a field record wholesale (test setup for states the
    /// policy would not produce on its own).
    pub async fn put_field(&self, field: Field) {
        self.fields.write().await.insert(field.id, field);
    }
}

impl Default for MemMetaStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_changes(field: &mut Field, changes: &FieldChanges) {
    changes.special_type.apply_to(&mut field.special_type);
    changes
        .fk_target_field_id
        .apply_to(&mut field.fk_target_field_id);
    match &changes.visibility_type {
        Patch::Keep => {}
        Patch::Clear => field.visibility_type = VisibilityType::default(),
        Patch::Set(v) => field.visibility_type = *v,
    }
    changes.description.apply_to(&mut field.description);
    changes.caveats.apply_to(&mut field.caveats);
    changes
        .points_of_interest
        .apply_to(&mut field.points_of_interest);
    if let Some(display_name) = &changes.display_name {
        field.display_name = display_name.clone();
    }
    field.updated_at = Utc::now();
}

#[async_trait]
impl FieldRepository for MemMetaStore {
    async fn get(&self, id: FieldId) -> Result<Field> {
        self.fields
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| FieldMetaError::NotFound(format!("field {id} not found")))
    }

    async fn exists(&self, id: FieldId) -> Result<bool> {
        Ok(self.fields.read().await.contains_key(&id))
    }

    async fn update(&self, id: FieldId, changes: &FieldChanges) -> Result<u64> {
        let mut fields = self.fields.write().await;
        match fields.get_mut(&id) {
            Some(field) => {
                apply_changes(field, changes);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl DimensionRepository for MemMetaStore {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<Dimension>> {
        Ok(self
            .dimensions
            .read()
            .await
            .values()
            .find(|d| d.field_id == field_id)
            .cloned())
    }

    async fn insert(&self, attrs: &NewDimension) -> Result<DimensionId> {
        let mut dimensions = self.dimensions.write().await;
        if dimensions.values().any(|d| d.field_id == attrs.field_id) {
            return Err(FieldMetaError::Conflict(format!(
                "dimension already exists for field {}",
                attrs.field_id
            )));
        }
        let now = Utc::now();
        let dimension = Dimension {
            id: self.alloc_id(),
            field_id: attrs.field_id,
            name: attrs.name.clone(),
            mapping: attrs.mapping.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = dimension.id;
        dimensions.insert(id, dimension);
        Ok(id)
    }

    async fn update(&self, id: DimensionId, attrs: &NewDimension) -> Result<u64> {
        let mut dimensions = self.dimensions.write().await;
        match dimensions.get_mut(&id) {
            Some(dimension) => {
                dimension.name = attrs.name.clone();
                dimension.mapping = attrs.mapping.clone();
                dimension.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_field(&self, field_id: FieldId) -> Result<u64> {
        let mut dimensions = self.dimensions.write().await;
        let before = dimensions.len();
        dimensions.retain(|_, d| d.field_id != field_id);
        Ok((before - dimensions.len()) as u64)
    }

    async fn delete_by_id(&self, id: DimensionId) -> Result<u64> {
        Ok(self.dimensions.write().await.remove(&id).map_or(0, |_| 1))
    }
}

#[async_trait]
impl FieldValuesRepository for MemMetaStore {
    async fn get_by_field(&self, field_id: FieldId) -> Result<Option<FieldValues>> {
        Ok(self
            .field_values
            .read()
            .await
            .values()
            .find(|v| v.field_id == field_id)
            .cloned())
    }

    async fn insert(&self, attrs: &NewFieldValues) -> Result<FieldValuesId> {
        let mut field_values = self.field_values.write().await;
        if field_values.values().any(|v| v.field_id == attrs.field_id) {
            return Err(FieldMetaError::Conflict(format!(
                "field values already exist for field {}",
                attrs.field_id
            )));
        }
        let now = Utc::now();
        let record = FieldValues {
            id: self.alloc_id(),
            field_id: attrs.field_id,
            values: attrs.values.clone(),
            human_readable_values: attrs.human_readable_values.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        field_values.insert(id, record);
        Ok(id)
    }

    async fn update(&self, id: FieldValuesId, attrs: &NewFieldValues) -> Result<u64> {
        let mut field_values = self.field_values.write().await;
        match field_values.get_mut(&id) {
            Some(record) => {
                record.values = attrs.values.clone();
                record.human_readable_values = attrs.human_readable_values.clone();
                record.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl FieldUpdateUnit for MemMetaStore {
    async fn commit_update(
        &self,
        field_id: FieldId,
        changes: &FieldChanges,
        cascade_dimension: Option<DimensionId>,
    ) -> Result<u64> {
        // Both write locks held across the compound mutation: readers
        // see the field update and the cascade together or not at all.
        let mut fields = self.fields.write().await;
        let mut dimensions = self.dimensions.write().await;
        let Some(field) = fields.get_mut(&field_id) else {
            return Ok(0);
        };
        if let Some(dimension_id) = cascade_dimension {
            dimensions.remove(&dimension_id);
        }
        apply_changes(field, changes);
        Ok(1)
    }
}
