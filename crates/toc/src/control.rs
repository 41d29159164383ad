//! Per-database control flags: `{Archive, Retrieve, List, Wipe, UniqueRoot}`
//! toggles read at catalogue open and consulted before the matching
//! operation runs. Persisted as a small JSON sidecar (`control`) rather than
//! a TOC record, since control state is mutable metadata rather than an
//! append-only fact about the archive.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Archive,
    Retrieve,
    List,
    Wipe,
    UniqueRoot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlags {
    #[serde(default = "default_enabled")]
    pub archive: bool,
    #[serde(default = "default_enabled")]
    pub retrieve: bool,
    #[serde(default = "default_enabled")]
    pub list: bool,
    #[serde(default = "default_enabled")]
    pub wipe: bool,
    #[serde(default)]
    pub unique_root: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self { archive: true, retrieve: true, list: true, wipe: true, unique_root: false }
    }
}

impl ControlFlags {
    pub fn allows(&self, action: ControlAction) -> bool {
        match action {
            ControlAction::Archive => self.archive,
            ControlAction::Retrieve => self.retrieve,
            ControlAction::List => self.list,
            ControlAction::Wipe => self.wipe,
            ControlAction::UniqueRoot => self.unique_root,
        }
    }

    pub fn set(&mut self, action: ControlAction, enabled: bool) {
        match action {
            ControlAction::Archive => self.archive = enabled,
            ControlAction::Retrieve => self.retrieve = enabled,
            ControlAction::List => self.list = enabled,
            ControlAction::Wipe => self.wipe = enabled,
            ControlAction::UniqueRoot => self.unique_root = enabled,
        }
    }
}

fn control_path(root: &Path) -> std::path::PathBuf {
    root.join("control")
}

pub fn read(root: &Path) -> Result<ControlFlags, CatalogueError> {
    let path = control_path(root);
    if !path.exists() {
        return Ok(ControlFlags::default());
    }
    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text).map_err(|e| CatalogueError::Corrupt(format!("control file {path:?}: {e}")))
}

pub fn write(root: &Path, flags: &ControlFlags) -> Result<(), CatalogueError> {
    let text = serde_json::to_string_pretty(flags).map_err(|e| CatalogueError::Corrupt(e.to_string()))?;
    fs::write(control_path(root), text)?;
    Ok(())
}

/// Checks `action` is permitted, returning `LockConflict` naming the
/// database directory if not.
pub fn require(root: &Path, action: ControlAction) -> Result<(), CatalogueError> {
    let flags = read(root)?;
    if flags.allows(action) {
        Ok(())
    } else {
        Err(CatalogueError::Lock(root.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_everything_but_unique_root() {
        let flags = ControlFlags::default();
        assert!(flags.allows(ControlAction::Archive));
        assert!(!flags.allows(ControlAction::UniqueRoot));
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut flags = ControlFlags::default();
        flags.set(ControlAction::Wipe, false);
        write(dir.path(), &flags).unwrap();

        let read_back = read(dir.path()).unwrap();
        assert!(!read_back.allows(ControlAction::Wipe));
        assert!(read_back.allows(ControlAction::Archive));
    }

    #[test]
    fn require_rejects_disabled_action() {
        let dir = tempfile::tempdir().unwrap();
        let mut flags = ControlFlags::default();
        flags.set(ControlAction::Archive, false);
        write(dir.path(), &flags).unwrap();

        let err = require(dir.path(), ControlAction::Archive).unwrap_err();
        assert!(matches!(err, CatalogueError::Lock(_)));
    }
}
