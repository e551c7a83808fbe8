//! Loading step-rack and composition files from disk

use std::path::Path;

use synthgrid_core::{Composition, Rack};
use tracing::info;

use crate::persistence::{read_json, PersistenceError};

/// Read a rack file: `{tempo?, lanes: [{steps: [bool; 16], patch}]}`
pub fn load_rack(path: &Path) -> Result<Rack, PersistenceError> {
    let rack: Rack = read_json(path)?;
    info!(path = %path.display(), lanes = rack.lanes.len(), "Loaded rack");
    Ok(rack)
}

/// Read a composition file: `{version, items: [...]}`
pub fn load_composition(path: &Path) -> Result<Composition, PersistenceError> {
    let composition: Composition = read_json(path)?;
    info!(path = %path.display(), items = composition.items.len(), "Loaded composition");
    Ok(composition)
}

pub fn save_composition(path: &Path, composition: &Composition) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(composition)?)?;
    Ok(())
}
