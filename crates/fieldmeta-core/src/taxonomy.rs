//! Hierarchical semantic-type vocabulary.
//!
//! The vocabulary is data, not code: a child → parent map loaded at
//! startup, either from the embedded bundle (`semantic_types.yaml`) or
//! from deployment-supplied YAML. Tags absent from the map are legal
//! values — they just have no ancestors.

use std::collections::BTreeMap;

use anyhow::anyhow;

use crate::error::{FieldMetaError, Result};
use crate::types::SemanticType;

/// Root tag for foreign-key-like semantic types.
pub const FK_ROOT: &str = "type/FK";

/// Child → parent tag map with descent checks.
#[derive(Debug, Clone)]
pub struct SemanticTypeTaxonomy {
    parents: BTreeMap<SemanticType, Option<SemanticType>>,
    fk_root: SemanticType,
}

impl SemanticTypeTaxonomy {
    /// Parse a YAML mapping of `child: parent` entries (roots map to
    /// null). Rejects parents that are not themselves defined and any
    /// cycle in the parent chain.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: BTreeMap<String, Option<String>> = serde_yaml::from_str(yaml)
            .map_err(|e| anyhow!("semantic type taxonomy is not valid YAML: {e}"))?;

        let parents: BTreeMap<SemanticType, Option<SemanticType>> = raw
            .into_iter()
            .map(|(child, parent)| (SemanticType::new(child), parent.map(SemanticType::new)))
            .collect();

        for (child, parent) in &parents {
            if let Some(parent) = parent {
                if !parents.contains_key(parent) {
                    return Err(FieldMetaError::Internal(anyhow!(
                        "taxonomy entry '{child}' names undefined parent '{parent}'"
                    )));
                }
            }
        }

        let taxonomy = Self {
            parents,
            fk_root: SemanticType::new(FK_ROOT),
        };

        // A cycle would make every descent check loop forever. Any
        // parent chain longer than the map itself must repeat a tag.
        for tag in taxonomy.parents.keys() {
            let mut steps = 0usize;
            let mut cur = taxonomy.parent_of(tag);
            while let Some(p) = cur {
                steps += 1;
                if steps > taxonomy.parents.len() {
                    return Err(FieldMetaError::Internal(anyhow!(
                        "taxonomy cycle through '{tag}'"
                    )));
                }
                cur = taxonomy.parent_of(p);
            }
        }

        Ok(taxonomy)
    }

    /// The bundle shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(include_str!("semantic_types.yaml"))
    }

    pub fn contains(&self, tag: &SemanticType) -> bool {
        self.parents.contains_key(tag)
    }

    fn parent_of(&self, tag: &SemanticType) -> Option<&SemanticType> {
        self.parents.get(tag).and_then(|p| p.as_ref())
    }

    /// True when `tag` is `ancestor` or a descendant of it. A tag is
    /// always its own ancestor, known to the vocabulary or not.
    pub fn is_a(&self, tag: &SemanticType, ancestor: &SemanticType) -> bool {
        if tag == ancestor {
            return true;
        }
        let mut cur = self.parent_of(tag);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent_of(p);
        }
        false
    }

    /// Descent test against `type/FK`. `None` is not foreign-key-like.
    pub fn is_fk_like(&self, tag: Option<&SemanticType>) -> bool {
        tag.is_some_and(|t| self.is_a(t, &self.fk_root))
    }
}
