//! Three-state update cells for partial field updates.
//!
//! A request key can be absent (leave the column alone), explicitly
//! null (clear it), or carry a value. Collapsing the first two into one
//! `Option` loses the distinction the update policy depends on, so
//! requests deserialize into [`Patch`] cells instead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{FieldId, SemanticType, VisibilityType};

/// One column's worth of a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    /// Key absent from the request — keep the current value.
    Keep,
    /// Key present and null — clear the column.
    Clear,
    /// Key present with a value.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Resolve against the current value: `Keep` preserves it, `Clear`
    /// drops it, `Set` replaces it.
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(v) => Some(v),
        }
    }

    /// Apply in place to an optional slot.
    pub fn apply_to(&self, slot: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v.clone()),
        }
    }
}

// Serde only invokes `Deserialize` for keys that are present, so a
// present-and-null key is `Clear` and a present value is `Set`. Absent
// keys fall back to `Default` (`Keep`) via `#[serde(default)]` on the
// containing struct.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(v) => serializer.serialize_some(v),
            // `Keep` is only reachable here if the caller forgot
            // `skip_serializing_if = "Patch::is_keep"`; emit null rather
            // than invent a value.
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}

/// A requested field update, key-presence faithful.
///
/// `display_name` deliberately uses plain `Option`: it updates only when
/// present and non-null, and can never be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPatch {
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub special_type: Patch<SemanticType>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub fk_target_field_id: Patch<FieldId>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub visibility_type: Patch<VisibilityType>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub caveats: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub points_of_interest: Patch<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The resolved write set handed to the storage ports.
///
/// Same three-state cells as [`FieldPatch`], but post-policy: every
/// `Set`/`Clear` here is a definite column write. Clearing
/// `visibility_type` resets it to [`VisibilityType::default`] since the
/// column is not nullable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldChanges {
    pub special_type: Patch<SemanticType>,
    pub fk_target_field_id: Patch<FieldId>,
    pub visibility_type: Patch<VisibilityType>,
    pub description: Patch<String>,
    pub caveats: Patch<String>,
    pub points_of_interest: Patch<String>,
    pub display_name: Option<String>,
}
