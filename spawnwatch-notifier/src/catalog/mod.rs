//! Canonical entity catalog: the immutable snapshot every spawn resolution
//! and mutation command matches names against.

pub mod loader;
pub mod normalize;

pub use loader::load_catalog;
pub use normalize::normalize;

use spawnwatch_core::common::error::{NotifierError, Result};
use spawnwatch_core::domain::CanonicalEntity;
use std::collections::HashMap;

/// Immutable snapshot of canonical entities with normalized lookup indexes.
///
/// Built once at startup and shared behind an `Arc`; a reload is a whole new
/// snapshot swapped in atomically, never an in-place edit.
pub struct EntityCatalog {
    entities: Vec<CanonicalEntity>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl EntityCatalog {
    /// Build a catalog from entity records, validating invariants:
    /// normalized primary names and aliases must be unique, and `variant_of`
    /// must point at an existing entity that is itself not a variant.
    pub fn from_entities(entities: Vec<CanonicalEntity>) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();

        for (index, entity) in entities.iter().enumerate() {
            let key = normalize(&entity.name);
            if key.is_empty() {
                return Err(NotifierError::Catalog {
                    message: format!("Entity name normalizes to empty: {:?}", entity.name),
                });
            }
            if by_name.insert(key, index).is_some() {
                return Err(NotifierError::Catalog {
                    message: format!("Duplicate entity name: {}", entity.name),
                });
            }
        }

        for (index, entity) in entities.iter().enumerate() {
            for alias in &entity.aliases {
                let key = normalize(alias);
                if key.is_empty() {
                    continue;
                }
                // An alias shadowing a primary name is redundant but harmless;
                // the same alias on two entities is ambiguous
                if let Some(previous) = by_alias.insert(key, index) {
                    if previous != index {
                        return Err(NotifierError::Catalog {
                            message: format!(
                                "Alias {:?} is claimed by both {} and {}",
                                alias, entities[previous].name, entity.name
                            ),
                        });
                    }
                }
            }
        }

        // Variant links must resolve, one hop only
        for entity in &entities {
            if let Some(base_name) = &entity.variant_of {
                let base_index =
                    by_name
                        .get(&normalize(base_name))
                        .ok_or_else(|| NotifierError::Catalog {
                            message: format!(
                                "{} is a variant of unknown entity {}",
                                entity.name, base_name
                            ),
                        })?;
                if entities[*base_index].variant_of.is_some() {
                    return Err(NotifierError::Catalog {
                        message: format!(
                            "{} chains through variant {}; variant links are single-hop",
                            entity.name, base_name
                        ),
                    });
                }
            }
        }

        Ok(Self {
            entities,
            by_name,
            by_alias,
        })
    }

    /// Resolve a raw name to its canonical entity: exact normalized match on
    /// primary names first, then aliases. No partial matching.
    pub fn resolve(&self, raw_name: &str) -> Option<&CanonicalEntity> {
        let key = normalize(raw_name);
        self.by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .map(|&index| &self.entities[index])
    }

    /// Single-hop base entity if this one is a variant. Does not recurse.
    pub fn base_of(&self, entity: &CanonicalEntity) -> Option<&CanonicalEntity> {
        let base_name = entity.variant_of.as_ref()?;
        self.by_name
            .get(&normalize(base_name))
            .map(|&index| &self.entities[index])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities.iter()
    }
}
