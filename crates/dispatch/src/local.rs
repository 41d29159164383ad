//! [`LocalDispatch`]: routes every operation against databases living
//! under this process's own configured roots, opening and caching
//! [`Database`] handles by directory path. Owns its databases directly,
//! the same way a `LocalDomain` type elsewhere in this workspace owns
//! its wal/state/archive trio directly rather than forwarding to another
//! process.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use fdb_core::config::{FdbConfig, SpaceConfig, StoreConfig};
use fdb_core::{Axes, FieldLocation, Key, KeyChain, ListElement, Request};
use fdb_toc::{ControlAction, ControlFlags};

use crate::database::Database;
use crate::error::{DispatchError, FdbError};
use crate::gather::HandleGatherer;
use crate::naming::db_dir_name;
use crate::space::SpaceManager;

/// A process-scope, owned open-catalogue cache bounded to `capacity`
/// entries, evicted least-recently-used first with an explicit flush on
/// eviction -- §9's "process-global factories and LRU caches -> a single
/// process-scope registry ... with an explicit eviction callback that
/// closes resources", applied here to open [`Database`] handles
/// (`fdbMaxOpenDatabases`, default 16, per spec §5/§3).
struct DatabaseLru {
    capacity: usize,
    entries: HashMap<PathBuf, Arc<Database>>,
    recency: VecDeque<PathBuf>,
}

impl DatabaseLru {
    fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: HashMap::new(), recency: VecDeque::new() }
    }

    fn get(&mut self, path: &Path) -> Option<Arc<Database>> {
        let db = self.entries.get(path).cloned()?;
        self.touch(path);
        Some(db)
    }

    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.recency.iter().position(|p| p == path) {
            self.recency.remove(pos);
        }
        self.recency.push_back(path.to_path_buf());
    }

    /// Inserts a freshly opened database, evicting (and flushing) the
    /// least-recently-used entry if this insert would exceed `capacity`.
    fn insert(&mut self, path: PathBuf, db: Arc<Database>) {
        if !self.entries.contains_key(&path) && self.entries.len() >= self.capacity {
            if let Some(evict_path) = self.recency.pop_front() {
                if let Some(evicted) = self.entries.remove(&evict_path) {
                    if let Err(e) = evicted.flush() {
                        tracing::warn!(path = %evict_path.display(), error = %e, "flush on LRU eviction failed");
                    }
                }
            }
        }
        self.entries.insert(path.clone(), db);
        self.touch(&path);
    }

    fn remove(&mut self, path: &Path) -> Option<Arc<Database>> {
        self.recency.retain(|p| p != path);
        self.entries.remove(path)
    }

    fn retain(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        self.entries.retain(|path, _| keep(path));
        self.recency.retain(|path| self.entries.contains_key(path));
    }

    fn values(&self) -> impl Iterator<Item = &Arc<Database>> {
        self.entries.values()
    }
}

pub struct LocalDispatch {
    space: SpaceManager,
    schema_text: String,
    schema: Arc<fdb_core::Schema>,
    registry: Arc<fdb_core::TypeRegistry>,
    use_subtoc: bool,
    store_config: StoreConfig,
    gatherer: HandleGatherer,
    open: Mutex<DatabaseLru>,
}

impl LocalDispatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spaces: Vec<SpaceConfig>,
        schema_text: String,
        schema: Arc<fdb_core::Schema>,
        registry: Arc<fdb_core::TypeRegistry>,
        use_subtoc: bool,
        store_config: StoreConfig,
        optimise: bool,
        max_open_databases: usize,
    ) -> Self {
        Self {
            space: SpaceManager::new(spaces),
            schema_text,
            schema,
            registry,
            use_subtoc,
            store_config,
            gatherer: HandleGatherer::new(optimise),
            open: Mutex::new(DatabaseLru::new(max_open_databases)),
        }
    }

    /// Builds a `LocalDispatch` straight from a loaded [`FdbConfig`]'s
    /// `Local` variant; callers that already hold a parsed schema pass it
    /// in directly rather than reparsing on every call.
    pub fn from_config(config: &FdbConfig, schema_text: String, schema: Arc<fdb_core::Schema>, registry: Arc<fdb_core::TypeRegistry>) -> Self {
        let store_config = match &config.dispatch {
            fdb_core::config::DispatchConfig::Local(local) => local.store.clone(),
            _ => StoreConfig::default(),
        };
        Self::new(config.spaces.clone(), schema_text, schema, registry, true, store_config, false, config.max_open_databases)
    }

    fn db_dir(&self, root: &Path, db_key: &Key) -> PathBuf {
        root.join(db_dir_name(db_key))
    }

    fn open_at(&self, path: PathBuf, db_key: Key) -> Result<Arc<Database>, FdbError> {
        let mut open = self.open.lock().unwrap();
        if let Some(db) = open.get(&path) {
            return Ok(db);
        }
        let db = Arc::new(Database::open(
            path.clone(),
            db_key,
            &self.schema_text,
            self.schema.clone(),
            self.registry.clone(),
            self.use_subtoc,
            &self.store_config,
        )?);
        open.insert(path, db.clone());
        Ok(db)
    }

    /// Finds an already-existing database directory for `db_key` among
    /// `roots`, opening (and caching) it. Returns `None` without touching
    /// the filesystem beyond an existence check if no root has it.
    fn find_existing(&self, roots: &[PathBuf], db_key: &Key) -> Result<Option<Arc<Database>>, FdbError> {
        for root in roots {
            let path = self.db_dir(root, db_key);
            if path.join("toc").exists() {
                return Ok(Some(self.open_at(path, db_key.clone())?));
            }
        }
        Ok(None)
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        let roots = self.space.archive_roots_for_key(&chain.db)?;
        let db = match self.find_existing(&roots, &chain.db)? {
            Some(db) => db,
            None => self.open_at(self.db_dir(&roots[0], &chain.db), chain.db.clone())?,
        };
        db.archive(chain, data)
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        let open = self.open.lock().unwrap();
        for db in open.values() {
            db.flush()?;
        }
        Ok(())
    }

    fn candidate_db_keys(&self, request: &Request) -> Result<Vec<Key>, FdbError> {
        Ok(self.schema.expand_first_level(request, &self.registry)?)
    }

    fn matching_databases(&self, request: &Request, roots: &[PathBuf]) -> Result<Vec<Arc<Database>>, FdbError> {
        let mut out = Vec::new();
        for db_key in self.candidate_db_keys(request)? {
            if let Some(db) = self.find_existing(roots, &db_key)? {
                out.push(db);
            }
        }
        Ok(out)
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        let roots = self.space.list_roots(request);
        let mut batches = Vec::new();
        for db in self.matching_databases(request, &roots)? {
            batches.push(db.list(request, deduplicate)?);
        }
        Ok(self.gatherer.gather(batches, deduplicate))
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, FdbError> {
        let roots = self.space.retrieve_roots_for_key(&chain.db);
        match self.find_existing(&roots, &chain.db)? {
            Some(db) => db.inspect(chain),
            None => Ok(None),
        }
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        let roots = self.space.retrieve_roots_for_key(&chain.db);
        let db = match self.find_existing(&roots, &chain.db)? {
            Some(db) => db,
            None => return Ok(None),
        };
        match db.inspect(chain)? {
            Some(location) => Ok(Some(db.retrieve(&location)?)),
            None => Ok(None),
        }
    }

    pub fn axes(&self, request: &Request) -> Result<Axes, FdbError> {
        let roots = self.space.list_roots(request);
        let mut merged = Axes::new();
        for db in self.matching_databases(request, &roots)? {
            merged.merge(&db.axes()?);
        }
        Ok(merged)
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        let roots = self.space.list_roots(request);
        let mut reclaimed = Vec::new();
        for db in self.matching_databases(request, &roots)? {
            reclaimed.extend(db.purge(dry_run)?);
        }
        Ok(reclaimed)
    }

    pub fn wipe(&self, request: &Request, dry_run: bool, unsafe_wipe_all: bool) -> Result<Vec<String>, FdbError> {
        let roots = self.space.list_roots(request);
        let matches = self.matching_databases(request, &roots)?;
        if matches.len() > 1 && !unsafe_wipe_all {
            return Err(DispatchError::AmbiguousDatabase(matches.len()).into());
        }
        let mut removed = Vec::new();
        for db in &matches {
            removed.extend(db.wipe(dry_run)?);
        }
        if !dry_run {
            let mut open = self.open.lock().unwrap();
            open.retain(|path| !matches.iter().any(|db| db.root() == path));
        }
        Ok(removed)
    }

    pub fn control(&self, action: ControlAction, request: &Request, enabled: bool) -> Result<(), FdbError> {
        let roots = self.space.list_roots(request);
        for db in self.matching_databases(request, &roots)? {
            db.set_control(action, enabled)?;
        }
        Ok(())
    }

    pub fn control_flags(&self, request: &Request) -> Result<Vec<ControlFlags>, FdbError> {
        let roots = self.space.list_roots(request);
        self.matching_databases(request, &roots)?.iter().map(|db| db.control_flags()).collect()
    }

    /// Copies the single database `request` resolves to into
    /// `destination_root`, rewrites every index generation's `FieldLocation`
    /// URIs to point at the new root, and removes the source when
    /// `delete_source` is set. Errors if `request` resolves to anything
    /// other than exactly one existing database, matching `fdb-move`'s
    /// single-database requirement.
    pub fn move_database(&self, request: &Request, destination_root: &Path, delete_source: bool) -> Result<PathBuf, FdbError> {
        let roots = self.space.list_roots(request);
        let matches = self.matching_databases(request, &roots)?;
        if matches.len() != 1 {
            return Err(DispatchError::MoveRequiresSingleDatabase.into());
        }
        let db = &matches[0];
        let source = db.root();
        let dir_name = source.file_name().ok_or(DispatchError::MoveRequiresSingleDatabase)?;
        let destination = destination_root.join(dir_name);
        fs::create_dir_all(&destination)?;
        copy_directory_parallel(source, &destination)?;
        relocate_index_locations(&destination, source, &destination)?;
        {
            let mut open = self.open.lock().unwrap();
            open.remove(source);
        }
        if delete_source {
            fs::remove_dir_all(source)?;
        }
        Ok(destination)
    }

    pub fn default_root(&self) -> Option<PathBuf> {
        self.space.all_roots().into_iter().next()
    }
}

/// Rewrites every `index.*.data` generation file freshly copied into
/// `destination` so its `FieldLocation` URIs point under `destination_root`
/// instead of `source_root` -- a copied index file otherwise still embeds
/// the source store's absolute-path URIs (`fdb-store-file`'s `file://`
/// scheme is the source root's path, not a relative one), which would make
/// every field in the moved database unreadable once the source is deleted.
fn relocate_index_locations(destination: &Path, source_root: &Path, destination_root: &Path) -> Result<(), FdbError> {
    let old_prefix = format!("file://{}", source_root.display());
    let new_prefix = format!("file://{}", destination_root.display());
    if old_prefix == new_prefix {
        return Ok(());
    }
    for entry in fs::read_dir(destination)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with("index.") && name.ends_with(".data")) {
            continue;
        }
        let path = entry.path();
        let mut file = fdb_toc::IndexFile::open(&path)?;
        let mut builder = fdb_toc::IndexFileBuilder::new();
        for (key, mut location) in file.entries()? {
            if let Some(rest) = location.uri.strip_prefix(old_prefix.as_str()) {
                location.uri = format!("{new_prefix}{rest}");
            }
            builder.insert(key, location);
        }
        builder.write_to(&path)?;
    }
    Ok(())
}

fn copy_directory_parallel(source: &Path, destination: &Path) -> Result<(), FdbError> {
    let entries: Vec<PathBuf> = fs::read_dir(source)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries
        .par_iter()
        .map(|entry| -> Result<(), FdbError> {
            let name = entry.file_name().expect("directory entries always have a file name");
            if entry.is_dir() {
                let nested = destination.join(name);
                fs::create_dir_all(&nested)?;
                copy_directory_parallel(entry, &nested)?;
            } else {
                fs::copy(entry, destination.join(name))?;
            }
            Ok(())
        })
        .collect::<Result<(), FdbError>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdb_core::config::{RootConfig, SpaceConfig};
    use fdb_core::{Key, KeyChain};

    fn chain(class: &str) -> KeyChain {
        let mut db = Key::new();
        db.set_raw("class", class);
        db.set_raw("expver", "xxxx");
        let mut index = Key::new();
        index.set_raw("stream", "oper");
        index.set_raw("date", "20240101");
        index.set_raw("time", "0000");
        let mut datum = Key::new();
        datum.set_raw("param", "130");
        KeyChain::new(db, index, datum).unwrap()
    }

    #[test]
    fn open_catalogue_lru_evicts_least_recently_used_beyond_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let schema_text = "[ class, expver\n  [ stream, date, time\n    [ param ] ] ]";
        let schema = Arc::new(fdb_core::Schema::parse(schema_text).unwrap());
        let registry = Arc::new(schema.build_registry(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        let spaces = vec![SpaceConfig {
            handler: "Default".to_string(),
            roots: vec![RootConfig { path: dir.path().to_string_lossy().to_string(), list: true, retrieve: true, archive: true }],
        }];
        let dispatch = LocalDispatch::new(spaces, schema_text.to_string(), schema, registry, true, StoreConfig::default(), false, 2);

        for class in ["a", "b", "c"] {
            dispatch.archive(&chain(class), class.as_bytes()).unwrap();
        }
        dispatch.flush().unwrap();

        // Capacity is 2; three distinct databases were opened, so the
        // cache never holds more than 2 at once.
        assert!(dispatch.open.lock().unwrap().entries.len() <= 2);

        // The evicted database is still readable from disk -- eviction
        // only drops the in-memory handle after flushing it.
        assert_eq!(dispatch.read(&chain("a")).unwrap().unwrap(), b"a");
        assert_eq!(dispatch.read(&chain("c")).unwrap().unwrap(), b"c");
    }
}
