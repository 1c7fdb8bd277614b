//! Dimension upsert and delete.

use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::{FieldMetaError, Result};
use crate::ports::{DimensionRepository, FieldRepository, NewDimension};
use crate::types::{Dimension, DimensionMapping, FieldId};

/// Requested dimension attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub name: String,
    #[serde(flatten)]
    pub mapping: DimensionMapping,
}

/// Create-or-update for a field's dimension. The upsert always targets
/// the field's existing row when there is one, so a field never gains a
/// second dimension through this service.
pub struct DimensionUpsertService {
    fields: Arc<dyn FieldRepository>,
    dimensions: Arc<dyn DimensionRepository>,
}

impl DimensionUpsertService {
    pub fn new(fields: Arc<dyn FieldRepository>, dimensions: Arc<dyn DimensionRepository>) -> Self {
        Self { fields, dimensions }
    }

    pub async fn upsert(&self, field_id: FieldId, spec: DimensionSpec) -> Result<Dimension> {
        if spec.name.trim().is_empty() {
            return Err(FieldMetaError::validation(
                "name",
                "dimension name must not be blank",
            ));
        }
        self.fields.get(field_id).await?;

        let attrs = NewDimension {
            field_id,
            name: spec.name,
            mapping: spec.mapping,
        };

        match self.dimensions.get_by_field(field_id).await? {
            Some(existing) => {
                let affected = self.dimensions.update(existing.id, &attrs).await?;
                if affected == 0 {
                    return Err(FieldMetaError::Internal(anyhow!(
                        "dimension update for field {field_id} affected no rows"
                    )));
                }
                tracing::debug!(field_id, dimension_id = existing.id, "dimension updated");
            }
            None => {
                let id = self.dimensions.insert(&attrs).await?;
                tracing::debug!(field_id, dimension_id = id, "dimension created");
            }
        }

        self.dimensions.get_by_field(field_id).await?.ok_or_else(|| {
            FieldMetaError::Internal(anyhow!("dimension row missing after write for field {field_id}"))
        })
    }

    /// Remove the field's dimension. Succeeds when none exists.
    pub async fn delete(&self, field_id: FieldId) -> Result<()> {
        let removed = self.dimensions.delete_by_field(field_id).await?;
        tracing::debug!(field_id, removed, "dimension delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemMetaStore;

    fn service(store: &Arc<MemMetaStore>) -> DimensionUpsertService {
        DimensionUpsertService::new(store.clone(), store.clone())
    }

    fn internal(name: &str) -> DimensionSpec {
        DimensionSpec {
            name: name.to_owned(),
            mapping: DimensionMapping::Internal,
        }
    }

    #[tokio::test]
    async fn first_upsert_creates() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;

        let dim = service(&store)
            .upsert(field.id, internal("Status"))
            .await
            .unwrap();
        assert_eq!(dim.field_id, field.id);
        assert_eq!(dim.name, "Status");
        assert_eq!(dim.mapping, DimensionMapping::Internal);
    }

    #[tokio::test]
    async fn second_upsert_updates_in_place() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;
        let svc = service(&store);

        let first = svc.upsert(field.id, internal("Status")).await.unwrap();
        let second = svc
            .upsert(
                field.id,
                DimensionSpec {
                    name: "Status label".to_owned(),
                    mapping: DimensionMapping::External {
                        human_readable_field_id: Some(42),
                    },
                },
            )
            .await
            .unwrap();

        // one row per field, latest attributes
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Status label");
        assert!(second.mapping.is_external());
        assert_eq!(second.mapping.human_readable_field_id(), Some(42));
    }

    #[tokio::test]
    async fn blank_name_fails_validation() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;

        let err = service(&store)
            .upsert(field.id, internal("   "))
            .await
            .unwrap_err();
        match err {
            FieldMetaError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn missing_field_is_not_found() {
        let store = Arc::new(MemMetaStore::new());
        let err = service(&store)
            .upsert(999, internal("Status"))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn delete_without_dimension_is_ok() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;
        service(&store).delete(field.id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_the_dimension() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;
        let svc = service(&store);

        svc.upsert(field.id, internal("Status")).await.unwrap();
        svc.delete(field.id).await.unwrap();
        assert!(store.get_by_field(field.id).await.unwrap().is_none());
    }
}
