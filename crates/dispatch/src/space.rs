//! Root/FileSpace manager: resolves an `expver` to the [`SpaceConfig`] that
//! owns it, then narrows that space's roots down to the ones a given
//! operation is permitted to touch. Mirrors fdb5's `RootManager`: a
//! database's `expver` picks its space, and each root within a space
//! advertises which of list/retrieve/archive it permits.

use std::path::PathBuf;

use fdb_core::config::{RootConfig, SpaceConfig};
use fdb_core::{Key, Request};

use crate::error::DispatchError;

const DEFAULT_HANDLER: &str = "Default";

#[derive(Debug, Clone)]
pub struct SpaceManager {
    spaces: Vec<SpaceConfig>,
}

impl SpaceManager {
    pub fn new(spaces: Vec<SpaceConfig>) -> Self {
        Self { spaces }
    }

    /// Finds the space handling `expver`, falling back to the space
    /// literally named `Default` if no space claims it by name.
    fn space_for_expver<'a>(&'a self, expver: Option<&str>) -> Option<&'a SpaceConfig> {
        if let Some(expver) = expver {
            if let Some(space) = self.spaces.iter().find(|s| s.handler == expver) {
                return Some(space);
            }
        }
        self.spaces.iter().find(|s| s.handler == DEFAULT_HANDLER)
    }

    fn expver_of(request: &Request) -> Option<&str> {
        request.get("expver").and_then(|values| values.first()).map(String::as_str)
    }

    /// Roots within the request's space that permit archiving. A new
    /// database must land in exactly one of these; callers typically take
    /// the first.
    pub fn archive_roots(&self, request: &Request) -> Result<Vec<PathBuf>, DispatchError> {
        let space = self.space_for_expver(Self::expver_of(request)).ok_or(DispatchError::NoMatchingRoot)?;
        let roots: Vec<PathBuf> = space.roots.iter().filter(|r| r.archive).map(root_path).collect();
        if roots.is_empty() {
            return Err(DispatchError::NoMatchingRoot);
        }
        Ok(roots)
    }

    /// As [`Self::archive_roots`], but resolved directly from a database
    /// key rather than a (possibly multi-valued) request.
    pub fn archive_roots_for_key(&self, db_key: &Key) -> Result<Vec<PathBuf>, DispatchError> {
        let space = self.space_for_expver(db_key.get("expver")).ok_or(DispatchError::NoMatchingRoot)?;
        let roots: Vec<PathBuf> = space.roots.iter().filter(|r| r.archive).map(root_path).collect();
        if roots.is_empty() {
            return Err(DispatchError::NoMatchingRoot);
        }
        Ok(roots)
    }

    /// As [`Self::retrieve_roots`], but resolved directly from a database
    /// key.
    pub fn retrieve_roots_for_key(&self, db_key: &Key) -> Vec<PathBuf> {
        match self.space_for_expver(db_key.get("expver")) {
            Some(space) => space.roots.iter().filter(|r| r.retrieve).map(root_path).collect(),
            None => Vec::new(),
        }
    }

    /// Roots within the request's space that permit listing.
    pub fn list_roots(&self, request: &Request) -> Vec<PathBuf> {
        self.roots_with(request, |r| r.list)
    }

    /// Roots within the request's space that permit retrieval.
    pub fn retrieve_roots(&self, request: &Request) -> Vec<PathBuf> {
        self.roots_with(request, |r| r.retrieve)
    }

    fn roots_with(&self, request: &Request, predicate: impl Fn(&RootConfig) -> bool) -> Vec<PathBuf> {
        match self.space_for_expver(Self::expver_of(request)) {
            Some(space) => space.roots.iter().filter(|r| predicate(r)).map(root_path).collect(),
            None => Vec::new(),
        }
    }

    /// Every configured root across every space, for scans that are not
    /// scoped to a single `expver` (e.g. `stats`, `where`).
    pub fn all_roots(&self) -> Vec<PathBuf> {
        self.spaces.iter().flat_map(|s| s.roots.iter().map(root_path)).collect()
    }
}

fn root_path(root: &RootConfig) -> PathBuf {
    PathBuf::from(&root.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(handler: &str, path: &str, list: bool, retrieve: bool, archive: bool) -> SpaceConfig {
        SpaceConfig { handler: handler.to_string(), roots: vec![RootConfig { path: path.to_string(), list, retrieve, archive }] }
    }

    fn request_with_expver(expver: &str) -> Request {
        let mut request = Request::new();
        request.insert("expver".to_string(), vec![expver.to_string()]);
        request
    }

    #[test]
    fn falls_back_to_default_space_when_no_expver_specific_space_exists() {
        let manager = SpaceManager::new(vec![space("Default", "/data/default", true, true, true)]);
        let roots = manager.archive_roots(&request_with_expver("xxxx")).unwrap();
        assert_eq!(roots, vec![PathBuf::from("/data/default")]);
    }

    #[test]
    fn prefers_an_expver_specific_space_over_default() {
        let manager = SpaceManager::new(vec![
            space("Default", "/data/default", true, true, true),
            space("xxxx", "/data/xxxx", true, true, true),
        ]);
        let roots = manager.archive_roots(&request_with_expver("xxxx")).unwrap();
        assert_eq!(roots, vec![PathBuf::from("/data/xxxx")]);
    }

    #[test]
    fn archive_roots_excludes_read_only_roots() {
        let manager = SpaceManager::new(vec![space("Default", "/data/ro", true, true, false)]);
        assert!(matches!(manager.archive_roots(&request_with_expver("xxxx")), Err(DispatchError::NoMatchingRoot)));
    }
}
