//! Field update policy — the sole writer of field classification
//! attributes and of the foreign-key-removal cascade.

use std::sync::Arc;

use anyhow::anyhow;

use crate::error::{FieldMetaError, Result};
use crate::patch::{FieldChanges, FieldPatch, Patch};
use crate::ports::{DimensionRepository, FieldRepository, FieldUpdateUnit};
use crate::taxonomy::SemanticTypeTaxonomy;
use crate::types::{Field, FieldId};

/// Applies classification updates to a field.
///
/// When an update moves `special_type` away from a foreign-key-like
/// tag, the field's external dimension (if any) is deleted and
/// `fk_target_field_id` is cleared, whatever the request said — the
/// external remapping is derived from the FK link and cannot outlive
/// it. Internal dimensions are left untouched. The field write and the
/// dimension deletion commit as one atomic unit.
pub struct FieldUpdatePolicy {
    taxonomy: Arc<SemanticTypeTaxonomy>,
    fields: Arc<dyn FieldRepository>,
    dimensions: Arc<dyn DimensionRepository>,
    unit: Arc<dyn FieldUpdateUnit>,
}

impl FieldUpdatePolicy {
    pub fn new(
        taxonomy: Arc<SemanticTypeTaxonomy>,
        fields: Arc<dyn FieldRepository>,
        dimensions: Arc<dyn DimensionRepository>,
        unit: Arc<dyn FieldUpdateUnit>,
    ) -> Self {
        Self {
            taxonomy,
            fields,
            dimensions,
            unit,
        }
    }

    pub async fn apply(&self, field_id: FieldId, patch: FieldPatch) -> Result<Field> {
        let current = self.fields.get(field_id).await?;

        let old_type = current.special_type.clone();
        let new_type = patch.special_type.clone().resolve(old_type.clone());
        // Only a transition away from foreign-key-like counts; setting
        // the same tag again (or clearing an already-non-FK tag) does
        // not cascade.
        let removed_fk = old_type != new_type
            && self.taxonomy.is_fk_like(old_type.as_ref())
            && !self.taxonomy.is_fk_like(new_type.as_ref());

        let cascade_dimension = if removed_fk {
            match self.dimensions.get_by_field(field_id).await? {
                Some(dim) if dim.mapping.is_external() => {
                    tracing::info!(
                        field_id,
                        dimension_id = dim.id,
                        "fk semantics removed, deleting external dimension"
                    );
                    Some(dim.id)
                }
                _ => None,
            }
        } else {
            None
        };

        // Removing FK semantics clears the target link regardless of
        // what the request asked for.
        let fk_target_field_id = if removed_fk {
            Patch::Clear
        } else {
            patch.fk_target_field_id
        };

        if !removed_fk {
            if let Patch::Set(target) = fk_target_field_id {
                if !self.fields.exists(target).await? {
                    return Err(FieldMetaError::validation(
                        "fk_target_field_id",
                        format!("no field with id {target}"),
                    ));
                }
            }
        }

        let changes = FieldChanges {
            special_type: patch.special_type,
            fk_target_field_id,
            visibility_type: patch.visibility_type,
            description: patch.description,
            caveats: patch.caveats,
            points_of_interest: patch.points_of_interest,
            display_name: patch.display_name,
        };

        let affected = self
            .unit
            .commit_update(field_id, &changes, cascade_dimension)
            .await?;
        if affected == 0 {
            return Err(FieldMetaError::Internal(anyhow!(
                "field update for field {field_id} affected no rows"
            )));
        }

        self.fields.get(field_id).await
    }
}
