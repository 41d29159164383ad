//! [`TocCatalogue`]: the on-disk catalogue for one database. Owns the
//! append-only TOC journal, the per-flush index files and axes sidecars,
//! and the advisory writer lock; implements [`fdb_core::traits::Catalogue`]
//! plus the lifecycle operations (`purge`, `control`) that sit above it.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use fdb_core::{Axes, Deduplicator, FieldLocation, HyperCube, Key, KeyChain, ListElement, Request, Schema, TypeRegistry};

use crate::axes_file;
use crate::control::{self, ControlAction, ControlFlags};
use crate::error::CatalogueError;
use crate::index_file::{self, IndexFile, IndexFileBuilder};
use crate::lock::TocLock;
use crate::record::{self, ClearPayload, IndexPayload, InitPayload, Record, SubTocPayload, WipePayload};

/// One index generation: the index key it was archived under, the file
/// holding its entries, its position in TOC replay order, and whether a
/// later `Clear` record has retired it.
#[derive(Debug, Clone)]
struct IndexVersion {
    ordinal: usize,
    index_key: Key,
    file: PathBuf,
    axes_file: PathBuf,
    cleared: bool,
}

#[derive(Debug, Default)]
struct ScanResult {
    versions: Vec<IndexVersion>,
    wiped: bool,
}

/// Entries buffered in memory for one index key, accumulated between
/// flushes and written out as a brand-new index-file generation on the
/// next [`TocCatalogue::flush`].
#[derive(Default)]
struct Pending {
    index_key: Key,
    builder: IndexFileBuilder,
    axes: Axes,
}

pub struct TocCatalogue {
    root: PathBuf,
    db_key: Key,
    schema: std::sync::Arc<Schema>,
    registry: std::sync::Arc<TypeRegistry>,
    use_subtoc: bool,
    generation: AtomicU64,
    pending: Mutex<HashMap<u64, Pending>>,
}

impl TocCatalogue {
    /// Opens (creating if absent) the database directory at `root`. Writes
    /// the `Init` record and the schema-snapshot sidecar the first time a
    /// database is opened.
    pub fn open(
        root: PathBuf,
        db_key: Key,
        schema_text: &str,
        schema: std::sync::Arc<Schema>,
        registry: std::sync::Arc<TypeRegistry>,
        use_subtoc: bool,
    ) -> Result<Self, CatalogueError> {
        fs::create_dir_all(&root)?;
        let toc_path = root.join("toc");
        if !toc_path.exists() {
            let _lock = TocLock::acquire(&root)?;
            if !toc_path.exists() {
                let mut file = OpenOptions::new().create(true).append(true).open(&toc_path)?;
                Record::Init(InitPayload { db_key: db_key.clone(), created_at: now() }).write_to(&mut file)?;
                file.sync_all()?;
                fs::write(root.join("schema"), schema_text)?;
            }
        }
        let generation = count_existing_generations(&root)?;
        Ok(Self {
            root,
            db_key,
            schema,
            registry,
            use_subtoc,
            generation: AtomicU64::new(generation),
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_key(&self) -> &Key {
        &self.db_key
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    fn toc_path(&self) -> PathBuf {
        self.root.join("toc")
    }

    /// Buffers `chain`'s datum key under its index key; the entry is not
    /// durable, and not visible to readers, until [`Self::flush`].
    pub fn archive(&self, chain: &KeyChain, location: FieldLocation) -> Result<(), CatalogueError> {
        control::require(&self.root, ControlAction::Archive)?;
        let fp = chain.index.fingerprint();
        let mut pending = self.pending.lock().unwrap();
        let entry = pending.entry(fp).or_insert_with(|| Pending {
            index_key: chain.index.clone(),
            builder: IndexFileBuilder::new(),
            axes: Axes::new(),
        });
        entry.builder.insert(chain.datum.clone(), location);
        entry.axes.observe(&chain.datum);
        Ok(())
    }

    /// Publishes every buffered index as a brand-new, immutable generation:
    /// a fresh `index.<fp>.<gen>.data` file plus an `Index` TOC record.
    /// Never merges with a prior generation of the same index key -- that
    /// is `purge`'s job, once a generation is fully superseded.
    pub fn flush(&self) -> Result<(), CatalogueError> {
        let mut pending = self.pending.lock().unwrap();
        if pending.is_empty() {
            return Ok(());
        }

        let _lock = TocLock::acquire(&self.root)?;
        let scan = self.scan(false)?;
        if scan.wiped {
            return Err(CatalogueError::Corrupt("cannot flush into a wiped database".into()));
        }

        let mut file = OpenOptions::new().append(true).open(self.toc_path())?;
        for (_, entry) in pending.drain() {
            if entry.builder.is_empty() {
                continue;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst);
            let fp = entry.index_key.fingerprint();
            let index_name = format!("index.{fp:016x}.{generation:08x}.data");
            let axes_name = format!("axes.{fp:016x}.{generation:08x}");

            entry.builder.write_to(&self.root.join(&index_name))?;
            axes_file::write(&self.root.join(&axes_name), &entry.axes)?;

            Record::Index(IndexPayload { index_key: entry.index_key.clone(), index_file: index_name }).write_to(&mut file)?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Every `ListElement` matching `request`. A keyword present in
    /// `request` must match every key level that declares it; a keyword
    /// the request omits is unconstrained at every level -- this is the
    /// "a request may omit keys ... in list/read mode" relaxation, applied
    /// directly as predicate matching rather than schema-driven expansion.
    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, CatalogueError> {
        control::require(&self.root, ControlAction::List)?;
        if !key_matches(&self.db_key, request) {
            return Ok(Vec::new());
        }
        let scan = self.scan(false)?;
        if scan.wiped {
            return Ok(Vec::new());
        }

        let mut out: Vec<(usize, ListElement)> = Vec::new();
        for version in scan.versions.iter().filter(|v| !v.cleared) {
            if !key_matches(&version.index_key, request) {
                continue;
            }
            let mut file = IndexFile::open(&version.file)?;
            for (datum_key, location) in file.entries()? {
                if !key_matches(&datum_key, request) {
                    continue;
                }
                let chain = KeyChain::new(self.db_key.clone(), version.index_key.clone(), datum_key)?;
                out.push((version.ordinal, ListElement::new(&chain, Some(location))));
            }
        }

        if !deduplicate {
            return Ok(out.into_iter().map(|(_, e)| e).collect());
        }

        // Keep only the highest-ordinal (latest-written) element per
        // combined key -- HyperCube coordinates aren't needed for a flat
        // group-by-latest, so this uses the fingerprint of the combined key
        // directly via `Deduplicator`, scanning in descending ordinal order
        // so the first admission per fingerprint is the latest one.
        out.sort_by(|a, b| b.0.cmp(&a.0));
        let mut dedup = Deduplicator::new();
        let mut kept = Vec::new();
        for (_, elem) in out {
            if dedup.admit(elem.key.fingerprint()) {
                kept.push(elem);
            }
        }
        Ok(kept)
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, CatalogueError> {
        control::require(&self.root, ControlAction::Retrieve)?;
        let scan = self.scan(false)?;
        if scan.wiped {
            return Ok(None);
        }
        let mut best: Option<(usize, FieldLocation)> = None;
        for version in scan.versions.iter().filter(|v| !v.cleared && v.index_key == chain.index) {
            let mut file = IndexFile::open(&version.file)?;
            if let Some(loc) = file.lookup(&chain.datum)? {
                let is_newer = match &best {
                    Some((ord, _)) => version.ordinal > *ord,
                    None => true,
                };
                if is_newer {
                    best = Some((version.ordinal, loc));
                }
            }
        }
        Ok(best.map(|(_, loc)| loc))
    }

    pub fn axes(&self) -> Result<Axes, CatalogueError> {
        let scan = self.scan(false)?;
        let mut merged = Axes::new();
        for version in scan.versions.iter().filter(|v| !v.cleared) {
            let axes = axes_file::read(&version.axes_file)?;
            merged.merge(&axes);
        }
        Ok(merged)
    }

    pub fn hypercube(&self, keywords: &[&str]) -> Result<HyperCube, CatalogueError> {
        Ok(HyperCube::from_axes(&self.axes()?, keywords))
    }

    /// Retires every uncleared index generation whose entries are all
    /// superseded by a later generation of the same index key (§4.6's
    /// conservative "fully-masked" test). Returns the store URIs the
    /// retired generations referenced, for the caller to hand to the
    /// content store.
    pub fn purge(&self, dry_run: bool) -> Result<Vec<String>, CatalogueError> {
        let _lock = TocLock::acquire(&self.root)?;
        // Purge is the one caller that tolerates a dangling SubToc: a
        // vanished child file during reclamation reads as space someone
        // already reclaimed, not as corruption.
        let scan = self.scan(true)?;
        if scan.wiped {
            return Ok(Vec::new());
        }

        let live: Vec<&IndexVersion> = scan.versions.iter().filter(|v| !v.cleared).collect();
        let mut latest_ordinal: HashMap<u64, usize> = HashMap::new();
        let mut entries_by_version: HashMap<usize, Vec<(Key, FieldLocation)>> = HashMap::new();
        for version in &live {
            let mut file = IndexFile::open(&version.file)?;
            let entries = file.entries()?;
            for (key, _) in &entries {
                let fp = key.fingerprint();
                latest_ordinal
                    .entry(fp)
                    .and_modify(|o| *o = (*o).max(version.ordinal))
                    .or_insert(version.ordinal);
            }
            entries_by_version.insert(version.ordinal, entries);
        }

        let mut removed_uris = Vec::new();
        let mut to_clear = Vec::new();
        for version in &live {
            let entries = &entries_by_version[&version.ordinal];
            if entries.is_empty() {
                continue;
            }
            let fully_masked = entries.iter().all(|(k, _)| latest_ordinal[&k.fingerprint()] > version.ordinal);
            if fully_masked {
                for (_, loc) in entries {
                    removed_uris.push(loc.uri.clone());
                }
                to_clear.push((*version).clone());
            }
        }

        if !dry_run && !to_clear.is_empty() {
            let mut file = OpenOptions::new().append(true).open(self.toc_path())?;
            for version in &to_clear {
                let file_name = version.file.file_name().unwrap().to_string_lossy().to_string();
                Record::Clear(ClearPayload { index_key: version.index_key.clone(), index_file: file_name }).write_to(&mut file)?;
            }
            file.sync_all()?;
            for version in &to_clear {
                index_file::remove_index_file(&version.file)?;
                index_file::remove_index_file(&version.axes_file)?;
            }
        }

        removed_uris.sort();
        removed_uris.dedup();
        Ok(removed_uris)
    }

    /// Writes the terminal `Wipe` record and (unless `dry_run`) removes
    /// every index/axes file this database ever published. Returns the
    /// distinct store URIs the caller must still remove from content
    /// storage, and must itself remove the database directory afterwards.
    pub fn wipe(&self, dry_run: bool) -> Result<Vec<String>, CatalogueError> {
        control::require(&self.root, ControlAction::Wipe)?;
        let _lock = TocLock::acquire(&self.root)?;
        let scan = self.scan(false)?;
        if scan.wiped {
            return Ok(Vec::new());
        }

        let mut uris = Vec::new();
        for version in scan.versions.iter().filter(|v| !v.cleared) {
            let mut file = IndexFile::open(&version.file)?;
            for (_, loc) in file.entries()? {
                uris.push(loc.uri.clone());
            }
        }

        if !dry_run {
            let mut file = OpenOptions::new().append(true).open(self.toc_path())?;
            Record::Wipe(WipePayload { wiped_at: now() }).write_to(&mut file)?;
            file.sync_all()?;
            for version in &scan.versions {
                index_file::remove_index_file(&version.file)?;
                index_file::remove_index_file(&version.axes_file)?;
            }
        }

        uris.sort();
        uris.dedup();
        Ok(uris)
    }

    pub fn control_flags(&self) -> Result<ControlFlags, CatalogueError> {
        control::read(&self.root)
    }

    pub fn set_control(&self, action: ControlAction, enabled: bool) -> Result<(), CatalogueError> {
        let mut flags = control::read(&self.root)?;
        flags.set(action, enabled);
        control::write(&self.root, &flags)
    }

    /// Appends a `SubToc` record pointing at `child_path` (relative to
    /// `root`), used by a concurrent writer that holds its own child TOC
    /// rather than the master lock.
    pub fn link_subtoc(&self, child_path: &str) -> Result<(), CatalogueError> {
        if !self.use_subtoc {
            return Ok(());
        }
        let _lock = TocLock::acquire(&self.root)?;
        let mut file = OpenOptions::new().append(true).open(self.toc_path())?;
        Record::SubToc(SubTocPayload { path: child_path.to_string() }).write_to(&mut file)?;
        file.sync_all()?;
        Ok(())
    }

    fn scan(&self, lenient: bool) -> Result<ScanResult, CatalogueError> {
        let mut records = Vec::new();
        self.collect_records(&self.toc_path(), lenient, &mut records)?;

        let mut versions = Vec::new();
        let mut wiped = false;
        for record in records {
            match record {
                Record::Init(_) => {}
                Record::Index(p) => {
                    let gen = versions.len();
                    versions.push(IndexVersion {
                        ordinal: gen,
                        index_key: p.index_key,
                        file: self.root.join(&p.index_file),
                        axes_file: self.root.join(axes_sidecar_name(&p.index_file)),
                        cleared: false,
                    });
                }
                Record::Clear(p) => {
                    if let Some(v) = versions.iter_mut().rev().find(|v| v.file.file_name().map(|n| n.to_string_lossy() == p.index_file).unwrap_or(false)) {
                        v.cleared = true;
                    }
                }
                Record::SubToc(_) => {}
                Record::Wipe(_) => {
                    wiped = true;
                    versions.clear();
                }
            }
        }
        Ok(ScanResult { versions, wiped })
    }

    fn collect_records(&self, path: &Path, lenient: bool, out: &mut Vec<Record>) -> Result<(), CatalogueError> {
        if !path.exists() {
            return Err(CatalogueError::NoSuchDatabase(path.to_path_buf()));
        }
        let mut file = File::open(path)?;
        let records = record::read_all(&mut file)?;
        for record in records {
            if let Record::SubToc(ref p) = record {
                let child = self.root.join(&p.path);
                if !child.exists() {
                    if lenient {
                        tracing::warn!(path = %child.display(), "SubToc target missing, treating as already reclaimed");
                        continue;
                    }
                    return Err(CatalogueError::MissingSubToc(child));
                }
                self.collect_records(&child, lenient, out)?;
            }
            out.push(record);
        }
        Ok(())
    }
}

/// A keyword present in `request` must match one of the candidate values
/// for every key that declares it; a key that does not carry the keyword
/// at all places no constraint (it belongs to a different level).
fn key_matches(key: &Key, request: &Request) -> bool {
    for (keyword, values) in request {
        if let Some(value) = key.get(keyword) {
            if !values.iter().any(|v| v == value) {
                return false;
            }
        }
    }
    true
}

/// `"index.<fp>.<gen>.data"` -> `"axes.<fp>.<gen>"`, the sidecar name
/// written alongside it at flush time.
fn axes_sidecar_name(index_file: &str) -> String {
    let trimmed = index_file.strip_prefix("index.").unwrap_or(index_file);
    let trimmed = trimmed.strip_suffix(".data").unwrap_or(trimmed);
    format!("axes.{trimmed}")
}

fn count_existing_generations(root: &Path) -> Result<AtomicU64, CatalogueError> {
    let mut max_gen = 0u64;
    if root.exists() {
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(gen_hex) = name.strip_prefix("index.").and_then(|rest| rest.strip_suffix(".data")).and_then(|rest| rest.split('.').nth(1)) {
                if let Ok(g) = u64::from_str_radix(gen_hex, 16) {
                    max_gen = max_gen.max(g + 1);
                }
            }
        }
    }
    Ok(AtomicU64::new(max_gen))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::parse(
                "
                [ class, expver
                  [ date, time
                    [ param, step? ]
                  ]
                ]
                ",
            )
            .unwrap(),
        )
    }

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::new(chrono::NaiveDate::from_ymd_opt(2012, 9, 11).unwrap()))
    }

    fn db_key() -> Key {
        let mut k = Key::new();
        k.set_raw("class", "od");
        k.set_raw("expver", "0001");
        k
    }

    fn open(dir: &Path) -> TocCatalogue {
        TocCatalogue::open(dir.to_path_buf(), db_key(), "[ class, expver [ date [ param ] ] ]", schema(), registry(), false).unwrap()
    }

    fn chain(date: &str, param: &str) -> KeyChain {
        let db = db_key();
        let mut index = Key::new();
        index.set_raw("date", date);
        index.set_raw("time", "0000");
        let mut datum = Key::new();
        datum.set_raw("param", param);
        KeyChain::new(db, index, datum).unwrap()
    }

    fn req(pairs: &[(&str, &str)]) -> Request {
        let mut r: StdHashMap<String, Vec<String>> = StdHashMap::new();
        for (k, v) in pairs {
            r.insert(k.to_string(), vec![v.to_string()]);
        }
        r
    }

    #[test]
    fn archive_then_flush_then_list_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());

        cat.archive(&chain("20120911", "130"), FieldLocation::new("file:///data.0", 0, 21)).unwrap();
        cat.flush().unwrap();

        let elems = cat.list(&req(&[("class", "od"), ("expver", "0001")]), true).unwrap();
        assert_eq!(elems.len(), 1);
        assert_eq!(elems[0].location.as_ref().unwrap().uri, "file:///data.0");
    }

    #[test]
    fn dedup_keeps_latest_generation_only() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());

        for n in 0..3u64 {
            cat.archive(&chain("20120911", "130"), FieldLocation::new(format!("file:///data.{n}"), 0, 21)).unwrap();
            cat.flush().unwrap();
        }

        let all = cat.list(&req(&[("class", "od")]), false).unwrap();
        assert_eq!(all.len(), 3);

        let deduped = cat.list(&req(&[("class", "od")]), true).unwrap();
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].location.as_ref().unwrap().uri, "file:///data.2");
    }

    #[test]
    fn purge_removes_fully_masked_generations() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());

        for n in 0..3u64 {
            cat.archive(&chain("20120911", "130"), FieldLocation::new(format!("file:///data.{n}"), 0, 21)).unwrap();
            cat.flush().unwrap();
        }

        let removed = cat.purge(false).unwrap();
        assert_eq!(removed.len(), 2);

        let remaining = cat.list(&req(&[("class", "od")]), false).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].location.as_ref().unwrap().uri, "file:///data.2");
    }

    #[test]
    fn purge_leaves_partially_masked_generations_intact() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());

        cat.archive(&chain("20120911", "130"), FieldLocation::new("file:///gen0.130", 0, 21)).unwrap();
        cat.archive(&chain("20120911", "131"), FieldLocation::new("file:///gen0.131", 0, 21)).unwrap();
        cat.flush().unwrap();

        // Second generation only rewrites param=130; param=131 in the first
        // generation is never superseded, so that generation stays live.
        cat.archive(&chain("20120911", "130"), FieldLocation::new("file:///gen1.130", 0, 21)).unwrap();
        cat.flush().unwrap();

        let removed = cat.purge(false).unwrap();
        assert!(removed.is_empty(), "partially masked generation must not be purged");

        let remaining = cat.list(&req(&[("class", "od")]), false).unwrap();
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn wipe_clears_list_results() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());
        cat.archive(&chain("20120911", "130"), FieldLocation::new("file:///data.0", 0, 21)).unwrap();
        cat.flush().unwrap();

        let removed = cat.wipe(false).unwrap();
        assert_eq!(removed, vec!["file:///data.0".to_string()]);

        let elems = cat.list(&req(&[("class", "od")]), false).unwrap();
        assert!(elems.is_empty());
    }

    #[test]
    fn control_flags_gate_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cat = open(dir.path());
        cat.set_control(ControlAction::Archive, false).unwrap();

        let err = cat.archive(&chain("20120911", "130"), FieldLocation::new("file:///x", 0, 1)).unwrap_err();
        assert!(matches!(err, CatalogueError::Lock(_)));
    }
}
