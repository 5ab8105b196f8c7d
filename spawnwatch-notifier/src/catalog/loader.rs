//! Catalog loading from the on-disk config source.
//!
//! The catalog source is a JSON file, or a directory of JSON files, each
//! holding an array of entity records:
//! `[{"name": "...", "aliases": [...], "variant_of": "...", "rarity": "..."}]`.

use crate::catalog::EntityCatalog;
use crate::observability::metrics;
use spawnwatch_core::common::error::{NotifierError, Result};
use spawnwatch_core::domain::CanonicalEntity;
use std::fs;
use std::path::Path;
use tracing::info;

/// Load and validate the catalog snapshot from a file or directory.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<EntityCatalog> {
    let path = path.as_ref();

    let result = read_entities(path).and_then(EntityCatalog::from_entities);
    match &result {
        Ok(catalog) => {
            info!("Loaded {} catalog entities from {}", catalog.len(), path.display());
            metrics::catalog::load_success();
        }
        Err(_) => metrics::catalog::load_error(),
    }
    result
}

fn read_entities(path: &Path) -> Result<Vec<CanonicalEntity>> {
    if !path.exists() {
        return Err(NotifierError::Catalog {
            message: format!("Catalog path does not exist: {}", path.display()),
        });
    }

    if path.is_file() {
        return read_entity_file(path);
    }

    let mut entities = Vec::new();
    let mut files: Vec<_> = fs::read_dir(path)
        .map_err(|e| NotifierError::Catalog {
            message: format!("Failed to read catalog directory: {e}"),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // Stable load order so duplicate errors name the same file every run
    files.sort();

    for file in files {
        entities.extend(read_entity_file(&file)?);
    }

    Ok(entities)
}

fn read_entity_file(path: &Path) -> Result<Vec<CanonicalEntity>> {
    let content = fs::read_to_string(path).map_err(|e| NotifierError::Catalog {
        message: format!("Failed to read catalog file {}: {}", path.display(), e),
    })?;

    serde_json::from_str(&content).map_err(|e| NotifierError::Catalog {
        message: format!("Failed to parse catalog file {}: {}", path.display(), e),
    })
}
