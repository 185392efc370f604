//! File-backed world persistence.
//!
//! Layout inside the store directory:
//! ```text
//! world.meta.json            - metadata and schema versions
//! snapshots/
//!   000001.snapshot.cbor.zst - CBOR+zstd compressed world snapshots
//! events/
//!   000001.log.cbor.zst      - CBOR+zstd compressed lifecycle event segments
//! integrity/
//!   manifest.json            - hash chain over every written file
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use mobsim_ecs::{EntityWorld, Settings};
use mobsim_kernel::{Environment, WorldEvent};
use serde::{Deserialize, Serialize};

use crate::codec::{cbor_deserialize, cbor_serialize, sha256_hex, zstd_compress, zstd_decompress};
use crate::error::PersistError;
use crate::snapshot::WorldSnapshot;

/// Bumped whenever a saved entity layout changes.
const WORLD_SCHEMA_VERSION: u32 = 1;
const EVENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no snapshots found")]
    NoSnapshots,
    #[error("snapshot {0} does not exist")]
    UnknownSnapshot(u32),
}

/// Contents of `world.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMeta {
    pub world_schema_version: u32,
    pub event_schema_version: u32,
    pub snapshot_count: u32,
    pub event_segment_count: u32,
    /// Tick of the newest snapshot.
    pub latest_tick: Option<u64>,
}

impl Default for WorldMeta {
    fn default() -> Self {
        Self {
            world_schema_version: WORLD_SCHEMA_VERSION,
            event_schema_version: EVENT_SCHEMA_VERSION,
            snapshot_count: 0,
            event_segment_count: 0,
            latest_tick: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

impl IntegrityManifest {
    fn entry(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }
}

/// Directory of world snapshots and lifecycle event segments with schema versioning and a
/// hash-chained integrity manifest. Every read is checked against the manifest.
pub struct WorldStore {
    root: PathBuf,
    meta: WorldMeta,
    manifest: IntegrityManifest,
}

impl WorldStore {
    /// Open the store at `path`, creating an empty one if nothing is there.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        for dir in ["snapshots", "events", "integrity"] {
            fs::create_dir_all(root.join(dir))?;
        }

        let meta_path = root.join("world.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        if !meta_path.exists() {
            let store = Self {
                root,
                meta: WorldMeta::default(),
                manifest: IntegrityManifest::default(),
            };
            store.save_meta()?;
            store.save_manifest()?;
            tracing::info!(root = %store.root.display(), "created world store");
            return Ok(store);
        }

        let meta: WorldMeta = serde_json::from_reader(File::open(&meta_path)?)?;
        for (file_version, expected_version) in [
            (meta.world_schema_version, WORLD_SCHEMA_VERSION),
            (meta.event_schema_version, EVENT_SCHEMA_VERSION),
        ] {
            if file_version != expected_version {
                return Err(StoreError::SchemaMismatch {
                    file_version,
                    expected_version,
                });
            }
        }
        let manifest = if manifest_path.exists() {
            serde_json::from_reader(File::open(&manifest_path)?)?
        } else {
            IntegrityManifest::default()
        };
        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    /// Capture `world` and write it as the next snapshot. Returns the snapshot index.
    pub fn take_snapshot(&mut self, world: &EntityWorld) -> Result<u32, StoreError> {
        let snap = WorldSnapshot::capture(world)?;
        let index = self.meta.snapshot_count + 1;
        let filename = snapshot_filename(index);
        self.write_chained(self.root.join("snapshots"), filename, &cbor_serialize(&snap)?)?;
        self.meta.snapshot_count = index;
        self.meta.latest_tick = Some(snap.tick);
        self.save_meta()?;
        self.save_manifest()?;
        tracing::info!(index, tick = snap.tick, entities = snap.len(), "snapshot written");
        Ok(index)
    }

    /// Append lifecycle events as a new segment. Empty input writes nothing.
    pub fn append_events(&mut self, events: &[WorldEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        let index = self.meta.event_segment_count + 1;
        let filename = segment_filename(index);
        self.write_chained(self.root.join("events"), filename, &cbor_serialize(events)?)?;
        self.meta.event_segment_count = index;
        self.save_meta()?;
        self.save_manifest()?;
        tracing::debug!(index, events = events.len(), "event segment written");
        Ok(())
    }

    pub fn load_snapshot(&self, index: u32) -> Result<WorldSnapshot, StoreError> {
        if index == 0 || index > self.meta.snapshot_count {
            return Err(StoreError::UnknownSnapshot(index));
        }
        let bytes = self.read_checked(&self.root.join("snapshots"), &snapshot_filename(index))?;
        Ok(cbor_deserialize(&bytes)?)
    }

    /// Rebuild the world from the newest snapshot.
    pub fn load_latest(&self, settings: &Settings, env: Environment) -> Result<EntityWorld, StoreError> {
        if self.meta.snapshot_count == 0 {
            return Err(StoreError::NoSnapshots);
        }
        let snap = self.load_snapshot(self.meta.snapshot_count)?;
        let world = snap.restore(settings, env)?;
        tracing::info!(tick = world.tick(), entities = world.entity_count(), "world loaded");
        Ok(world)
    }

    /// Every stored lifecycle event, oldest first.
    pub fn events(&self) -> Result<Vec<WorldEvent>, StoreError> {
        let mut all = Vec::new();
        for index in 1..=self.meta.event_segment_count {
            let bytes = self.read_checked(&self.root.join("events"), &segment_filename(index))?;
            let segment: Vec<WorldEvent> = cbor_deserialize(&bytes)?;
            all.extend(segment);
        }
        Ok(all)
    }

    /// Walk the manifest chain and re-hash every file it names.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<&String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash.as_ref() != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    file: entry.filename.clone(),
                    expected: prev_hash.cloned().unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }
            let data = fs::read(self.locate(&entry.filename))?;
            let actual = sha256_hex(&data);
            if actual != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    file: entry.filename.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
            prev_hash = Some(&entry.sha256);
        }
        Ok(())
    }

    fn locate(&self, filename: &str) -> PathBuf {
        let dir = if filename.ends_with(".snapshot.cbor.zst") {
            "snapshots"
        } else {
            "events"
        };
        self.root.join(dir).join(filename)
    }

    fn write_chained(&mut self, dir: PathBuf, filename: String, cbor: &[u8]) -> Result<(), StoreError> {
        let compressed = zstd_compress(cbor)?;
        let sha256 = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());
        fs::write(dir.join(&filename), &compressed)?;
        self.manifest.entries.push(ManifestEntry {
            filename,
            sha256,
            prev_hash,
        });
        Ok(())
    }

    /// Read a file and check it against its manifest entry before decompressing.
    fn read_checked(&self, dir: &Path, filename: &str) -> Result<Vec<u8>, StoreError> {
        let compressed = fs::read(dir.join(filename))?;
        let actual = sha256_hex(&compressed);
        match self.manifest.entry(filename) {
            Some(entry) if entry.sha256 != actual => Err(StoreError::IntegrityMismatch {
                file: filename.to_owned(),
                expected: entry.sha256.clone(),
                actual,
            }),
            Some(_) => Ok(zstd_decompress(&compressed)?),
            None => Err(StoreError::IntegrityMismatch {
                file: filename.to_owned(),
                expected: "manifest entry".into(),
                actual,
            }),
        }
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("world.meta.json");
        serde_json::to_writer_pretty(File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn snapshot_filename(index: u32) -> String {
    format!("{index:06}.snapshot.cbor.zst")
}

fn segment_filename(index: u32) -> String {
    format!("{index:06}.log.cbor.zst")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use mobsim_common::GCoord;
    use mobsim_ecs::EntityKind;
    use mobsim_kernel::SimConfig;
    use mobsim_stream::{GridIndex, GridPathfinder, VoxelTerrain};

    use crate::adapter;

    fn env() -> Environment {
        Environment {
            terrain: Arc::new(VoxelTerrain::flat(0)),
            spatial: Box::new(GridIndex::new(4.0).unwrap()),
            pathfinder: Arc::new(GridPathfinder),
        }
    }

    fn world(seed: u64) -> EntityWorld {
        let settings = Settings::default();
        let mut w = EntityWorld::new(
            SimConfig {
                seed,
                ..SimConfig::default()
            },
            env(),
        );
        adapter::initialize(&mut w, &settings, EntityKind::Creature, GCoord::new(0, 0, 0)).unwrap();
        adapter::initialize(&mut w, &settings, EntityKind::Item, GCoord::new(3, 0, 3)).unwrap();
        w
    }

    #[test]
    fn open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = WorldStore::open(tmp.path().join("world_data")).unwrap();
        assert_eq!(store.meta(), &WorldMeta::default());
        assert!(store.root().join("snapshots").is_dir());
        assert!(store.root().join("events").is_dir());
        assert!(store.root().join("integrity").join("manifest.json").is_file());
        assert!(store.root().join("world.meta.json").is_file());
    }

    #[test]
    fn snapshot_then_load_after_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut w = world(42);
        w.step();
        w.step();
        {
            let mut store = WorldStore::open(&path).unwrap();
            assert_eq!(store.take_snapshot(&w).unwrap(), 1);
            store.append_events(&w.drain_events()).unwrap();
        }

        let store = WorldStore::open(&path).unwrap();
        assert_eq!(store.meta().snapshot_count, 1);
        assert_eq!(store.meta().latest_tick, Some(2));
        let loaded = store.load_latest(&Settings::default(), env()).unwrap();
        assert_eq!(loaded.tick(), w.tick());
        assert_eq!(loaded.seed(), w.seed());
        assert_eq!(loaded.entity_count(), 2);

        let events = store.events().unwrap();
        assert_eq!(events.iter().filter(|e| matches!(e, WorldEvent::Spawned { .. })).count(), 2);
        assert!(events.contains(&WorldEvent::Stepped { tick: 2, seed: w.seed() }));
    }

    #[test]
    fn latest_snapshot_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = WorldStore::open(tmp.path()).unwrap();
        let mut w = world(1);
        store.take_snapshot(&w).unwrap();
        for _ in 0..5 {
            w.step();
        }
        assert_eq!(store.take_snapshot(&w).unwrap(), 2);

        let loaded = store.load_latest(&Settings::default(), env()).unwrap();
        assert_eq!(loaded.tick(), 5);
        assert_eq!(store.load_snapshot(1).unwrap().tick, 0);
        assert!(matches!(store.load_snapshot(3), Err(StoreError::UnknownSnapshot(3))));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn empty_store_has_nothing_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = WorldStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.load_latest(&Settings::default(), env()),
            Err(StoreError::NoSnapshots)
        ));
        store.verify_integrity().unwrap();
        assert!(store.events().unwrap().is_empty());
    }

    #[test]
    fn corruption_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = WorldStore::open(&path).unwrap();
        store.take_snapshot(&world(7)).unwrap();

        let snap_path = path.join("snapshots").join("000001.snapshot.cbor.zst");
        let mut data = fs::read(&snap_path).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        fs::write(&snap_path, &data).unwrap();

        let store = WorldStore::open(&path).unwrap();
        assert!(matches!(store.verify_integrity(), Err(StoreError::IntegrityMismatch { .. })));
        assert!(matches!(
            store.load_latest(&Settings::default(), env()),
            Err(StoreError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn broken_chain_is_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = WorldStore::open(&path).unwrap();
        let mut w = world(3);
        store.take_snapshot(&w).unwrap();
        w.step();
        store.take_snapshot(&w).unwrap();

        let manifest_path = path.join("integrity").join("manifest.json");
        let mut manifest: IntegrityManifest =
            serde_json::from_reader(File::open(&manifest_path).unwrap()).unwrap();
        manifest.entries[1].prev_hash = None;
        serde_json::to_writer_pretty(File::create(&manifest_path).unwrap(), &manifest).unwrap();

        let store = WorldStore::open(&path).unwrap();
        assert!(matches!(store.verify_integrity(), Err(StoreError::IntegrityMismatch { .. })));
    }

    #[test]
    fn schema_mismatch_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        WorldStore::open(&path).unwrap();

        let meta_path = path.join("world.meta.json");
        let mut meta: WorldMeta = serde_json::from_reader(File::open(&meta_path).unwrap()).unwrap();
        meta.world_schema_version = 999;
        serde_json::to_writer_pretty(File::create(&meta_path).unwrap(), &meta).unwrap();

        match WorldStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, WORLD_SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
