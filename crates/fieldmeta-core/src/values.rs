//! Field-values cache upserts and the value/label pair validator.

use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::{FieldMetaError, Result};
use crate::ports::{FieldRepository, FieldValuesRepository, NewFieldValues};
use crate::types::{FieldId, FieldValues};

/// One submitted distinct value with its optional display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePair {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_readable: Option<String>,
}

impl ValuePair {
    pub fn bare(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            human_readable: None,
        }
    }

    pub fn labeled(value: impl Into<serde_json::Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            human_readable: Some(label.into()),
        }
    }
}

/// Labels must cover every value or none of them. Returns whether
/// labels are present; an empty sequence counts as unlabeled.
pub fn validate_pairs(pairs: &[ValuePair]) -> Result<bool> {
    let labeled = pairs.iter().filter(|p| p.human_readable.is_some()).count();
    if labeled == 0 {
        return Ok(false);
    }
    if labeled == pairs.len() {
        return Ok(true);
    }
    Err(FieldMetaError::validation(
        "values",
        "If remapped values are specified, they must be specified for all field values.",
    ))
}

/// Create-or-update for a field's cached distinct values.
pub struct FieldValuesUpsertService {
    fields: Arc<dyn FieldRepository>,
    values: Arc<dyn FieldValuesRepository>,
}

impl FieldValuesUpsertService {
    pub fn new(fields: Arc<dyn FieldRepository>, values: Arc<dyn FieldValuesRepository>) -> Self {
        Self { fields, values }
    }

    /// Replace the field's cached values with `pairs`, atomically per
    /// record. Validation and the field-existence check both run before
    /// any write.
    pub async fn upsert(&self, field_id: FieldId, pairs: &[ValuePair]) -> Result<FieldValues> {
        let has_labels = validate_pairs(pairs)?;
        self.fields.get(field_id).await?;

        let attrs = NewFieldValues {
            field_id,
            values: pairs.iter().map(|p| p.value.clone()).collect(),
            human_readable_values: if has_labels {
                Some(
                    pairs
                        .iter()
                        .filter_map(|p| p.human_readable.clone())
                        .collect(),
                )
            } else {
                None
            },
        };

        match self.values.get_by_field(field_id).await? {
            Some(existing) => {
                let affected = self.values.update(existing.id, &attrs).await?;
                if affected == 0 {
                    return Err(FieldMetaError::Internal(anyhow!(
                        "field values update for field {field_id} affected no rows"
                    )));
                }
                tracing::debug!(field_id, count = attrs.values.len(), has_labels, "field values replaced");
            }
            None => {
                self.values.insert(&attrs).await?;
                tracing::debug!(field_id, count = attrs.values.len(), has_labels, "field values created");
            }
        }

        self.values.get_by_field(field_id).await?.ok_or_else(|| {
            FieldMetaError::Internal(anyhow!("field values row missing after write for field {field_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemMetaStore;
    use crate::ports::FieldValuesRepository;
    use serde_json::json;

    fn service(store: &Arc<MemMetaStore>) -> FieldValuesUpsertService {
        FieldValuesUpsertService::new(store.clone(), store.clone())
    }

    // ── validator ────────────────────────────────────────────────

    #[test]
    fn all_labeled_is_valid() {
        let pairs = vec![ValuePair::labeled(1, "Pending"), ValuePair::labeled(2, "Done")];
        assert!(validate_pairs(&pairs).unwrap());
    }

    #[test]
    fn none_labeled_is_valid() {
        let pairs = vec![ValuePair::bare(1), ValuePair::bare(2)];
        assert!(!validate_pairs(&pairs).unwrap());
    }

    #[test]
    fn empty_counts_as_unlabeled() {
        assert!(!validate_pairs(&[]).unwrap());
    }

    #[test]
    fn mixed_labels_fail_with_the_fixed_message() {
        let pairs = vec![ValuePair::labeled(1, "Pending"), ValuePair::bare(2)];
        let err = validate_pairs(&pairs).unwrap_err();
        match err {
            FieldMetaError::Validation { field, message } => {
                assert_eq!(field, "values");
                assert_eq!(
                    message,
                    "If remapped values are specified, they must be specified for all field values."
                );
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    // ── upsert service ───────────────────────────────────────────

    #[tokio::test]
    async fn labeled_pairs_round_trip_in_order() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;

        let pairs = vec![
            ValuePair::labeled(3, "Shipped"),
            ValuePair::labeled(1, "Pending"),
            ValuePair::labeled(2, "Packed"),
        ];
        let written = service(&store).upsert(field.id, &pairs).await.unwrap();

        assert_eq!(written.values, vec![json!(3), json!(1), json!(2)]);
        assert_eq!(
            written.human_readable_values.as_deref(),
            Some(&["Shipped".to_owned(), "Pending".to_owned(), "Packed".to_owned()][..])
        );

        let read = store.get_by_field(field.id).await.unwrap().unwrap();
        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn unlabeled_pairs_store_no_label_sequence() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("QUANTITY").await;

        let pairs = vec![ValuePair::bare(10), ValuePair::bare(20)];
        let written = service(&store).upsert(field.id, &pairs).await.unwrap();

        assert_eq!(written.values, vec![json!(10), json!(20)]);
        assert_eq!(written.human_readable_values, None);
    }

    #[tokio::test]
    async fn second_upsert_overwrites_both_sequences() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;
        let svc = service(&store);

        let first = svc
            .upsert(field.id, &[ValuePair::labeled(1, "Pending")])
            .await
            .unwrap();
        let second = svc
            .upsert(field.id, &[ValuePair::bare(1), ValuePair::bare(2)])
            .await
            .unwrap();

        // same record, replaced content, labels cleared
        assert_eq!(second.id, first.id);
        assert_eq!(second.values, vec![json!(1), json!(2)]);
        assert_eq!(second.human_readable_values, None);
    }

    #[tokio::test]
    async fn mixed_pairs_leave_state_untouched() {
        let store = Arc::new(MemMetaStore::new());
        let field = store.seed_field("STATUS").await;
        let svc = service(&store);

        let err = svc
            .upsert(
                field.id,
                &[ValuePair::labeled(1, "Pending"), ValuePair::bare(2)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert!(store.get_by_field(field.id).await.unwrap().is_none());

        // and an existing record survives an invalid replacement
        svc.upsert(field.id, &[ValuePair::bare(7)]).await.unwrap();
        let _ = svc
            .upsert(
                field.id,
                &[ValuePair::labeled(1, "Pending"), ValuePair::bare(2)],
            )
            .await
            .unwrap_err();
        let kept = store.get_by_field(field.id).await.unwrap().unwrap();
        assert_eq!(kept.values, vec![json!(7)]);
    }

    #[tokio::test]
    async fn missing_field_is_not_found() {
        let store = Arc::new(MemMetaStore::new());
        let err = service(&store)
            .upsert(999, &[ValuePair::bare(1)])
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
