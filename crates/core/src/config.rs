//! Configuration types shared across the `fdb` binary and every store/
//! dispatch backend. Per-backend tagged-enum style: one `backend`
//! discriminant field selects the variant, each variant carrying only
//! the settings that backend needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration, normally loaded from a YAML file referenced by
/// `FDB_HOME` or `--config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdbConfig {
    #[serde(default)]
    pub schema: Option<PathBuf>,
    #[serde(default)]
    pub spaces: Vec<SpaceConfig>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub unsafe_wipe_all: bool,
    /// Bounds the process-wide open-catalogue LRU (`fdbMaxOpenDatabases`
    /// in the original; see spec §5's resource budgets).
    #[serde(default = "default_max_open_databases")]
    pub max_open_databases: usize,
}

fn default_max_open_databases() -> usize {
    16
}

impl Default for FdbConfig {
    fn default() -> Self {
        Self {
            schema: None,
            spaces: Vec::new(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
            unsafe_wipe_all: false,
            max_open_databases: default_max_open_databases(),
        }
    }
}

/// One root: a filesystem (or object-store) location holding databases
/// whose `expver` matches `handler`. Mirrors fdb5's `RootManager`/
/// `FileSpace` mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceConfig {
    pub handler: String,
    pub roots: Vec<RootConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    pub path: String,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub retrieve: bool,
    #[serde(default = "default_true")]
    pub archive: bool,
}

fn default_true() -> bool {
    true
}

/// Selects among the Local/Select/Dist/Remote `FDBBase` dispatch variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DispatchConfig {
    Local(LocalDispatchConfig),
    Select(SelectDispatchConfig),
    Dist(DistDispatchConfig),
    Remote(RemoteDispatchConfig),
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig::Local(LocalDispatchConfig::default())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalDispatchConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectDispatchConfig {
    pub lanes: Vec<SelectLaneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectLaneConfig {
    pub id: String,
    /// Keyword=regex constraints this lane must match to be selected.
    pub select: HashMap<String, String>,
    #[serde(default)]
    pub excludes: HashMap<String, String>,
    /// Whether a request that omits a `select` keyword counts as matching
    /// it. Applies only to `select`; `excludes` always behaves as
    /// `DontMatchOnMissing` (an absent exclude keyword is never treated as
    /// excluded), mirroring `SelectMatcher::matchInner`'s hardcoded
    /// `Matcher::DontMatchOnMissing` for the exclude side.
    #[serde(default)]
    pub match_on_missing: MatchOnMissing,
    #[serde(default)]
    pub dispatch: Option<Box<DispatchConfig>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOnMissing {
    #[default]
    DontMatchOnMissing,
    MatchOnMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistDispatchConfig {
    pub lanes: Vec<DistLaneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistLaneConfig {
    pub id: String,
    #[serde(default = "default_true")]
    pub writable: bool,
    #[serde(default)]
    pub dispatch: Option<Box<DispatchConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDispatchConfig {
    pub host: String,
    pub port: u16,
}

/// Selects among the File/Object content store backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    File(FileStoreConfig),
    Object(ObjectStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File(FileStoreConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self { max_file_size: default_max_file_size() }
    }
}

fn default_max_file_size() -> u64 {
    64 * 1024 * 1024 * 1024
}

/// Covers the FAM/RADOS/S3-style URI-addressed object backends, which
/// differ only in the URI scheme and connection settings they carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub scheme: ObjectScheme,
    pub endpoint: String,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub packed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectScheme {
    Fam,
    Rados,
    S3,
}

/// Per-subsystem logging include toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub catalogue: bool,
    #[serde(default = "default_true")]
    pub store: bool,
    #[serde(default = "default_true")]
    pub dispatch: bool,
    #[serde(default)]
    pub wire: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { catalogue: true, store: true, dispatch: true, wire: false }
    }
}

impl FdbConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_dispatch_is_the_default() {
        let config = FdbConfig::default();
        assert!(matches!(config.dispatch, DispatchConfig::Local(_)));
    }

    #[test]
    fn round_trips_through_yaml() {
        let text = "
schema: /etc/fdb/schema
spaces:
  - handler: Default
    roots:
      - path: /data/fdb
        archive: true
dispatch:
  type: local
  store:
    backend: file
    max_file_size: 1073741824
logging:
  catalogue: true
  store: true
  dispatch: false
  wire: false
unsafe_wipe_all: false
";
        let config = FdbConfig::from_yaml(text).unwrap();
        assert_eq!(config.spaces.len(), 1);
        match config.dispatch {
            DispatchConfig::Local(local) => match local.store {
                StoreConfig::File(file) => assert_eq!(file.max_file_size, 1_073_741_824),
                _ => panic!("expected file store"),
            },
            _ => panic!("expected local dispatch"),
        }
    }

    #[test]
    fn select_dispatch_parses_lane_constraints() {
        let text = "
dispatch:
  type: select
  lanes:
    - id: lane-a
      select:
        class: od|rd
      dispatch:
        type: local
        store:
          backend: file
";
        let config = FdbConfig::from_yaml(text).unwrap();
        match config.dispatch {
            DispatchConfig::Select(select) => assert_eq!(select.lanes.len(), 1),
            _ => panic!("expected select dispatch"),
        }
    }
}
