//! Persistent gesture table
//!
//! The table is a JSON object mapping decimal ids to action labels
//! (`{"0": "A", "1": "SPACE"}`). Each record's feature lives next to it in
//! the artifact directory as `gesture_<id>.png` (templates) or
//! `gesture_<id>.json` (landmark vectors).
//!
//! Records can only be appended or wiped wholesale with [`GestureStore::reset`];
//! there is no per-gesture edit or delete.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use super::record::{Action, Feature, FeatureKind, GestureId, GestureRecord, LandmarkVector};
use crate::{GestureError, Result};

/// Where the table and artifacts are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePaths {
    /// Directory holding `gesture_<id>.*` artifacts
    #[serde(default = "default_gesture_dir")]
    pub gesture_dir: PathBuf,
    /// JSON id -> label table
    #[serde(default = "default_mapping_file")]
    pub mapping_file: PathBuf,
}

fn default_gesture_dir() -> PathBuf {
    PathBuf::from("gestures")
}

fn default_mapping_file() -> PathBuf {
    PathBuf::from("gesture_key_mapping.json")
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            gesture_dir: default_gesture_dir(),
            mapping_file: default_mapping_file(),
        }
    }
}

impl StorePaths {
    /// Table and artifact directory side by side under `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            gesture_dir: root.join(default_gesture_dir()),
            mapping_file: root.join(default_mapping_file()),
        }
    }

    /// Artifact file for gesture `id`
    pub fn artifact_path(&self, id: GestureId, kind: FeatureKind) -> PathBuf {
        self.gesture_dir.join(format!("gesture_{}.{}", id, kind.extension()))
    }
}

/// Outcome of opening the store, shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// No table on disk
    NoGestures,
    /// Table loaded with this many gestures
    Loaded(usize),
    /// Table was unreadable and an empty store is used instead
    Corrupt,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStatus::NoGestures => write!(f, "No saved gestures found."),
            StoreStatus::Loaded(_) => write!(f, "Loaded existing gestures."),
            StoreStatus::Corrupt => {
                write!(f, "Saved gestures could not be read. Starting with none.")
            }
        }
    }
}

/// In-memory gesture table kept in sync with disk
#[derive(Debug)]
pub struct GestureStore {
    paths: StorePaths,
    kind: FeatureKind,
    /// Indexed by id; ids are always `0..records.len()`
    records: Vec<GestureRecord>,
}

impl GestureStore {
    /// Create an empty store without touching disk
    pub fn empty(paths: StorePaths, kind: FeatureKind) -> Self {
        Self {
            paths,
            kind,
            records: Vec::new(),
        }
    }

    /// Read the persisted table and every artifact it references
    ///
    /// A missing table is not an error. An unparsable table, gaps in the
    /// ids, or a missing/unreadable artifact yield `CorruptState`.
    pub fn load(paths: StorePaths, kind: FeatureKind) -> Result<(Self, StoreStatus)> {
        if !paths.mapping_file.exists() {
            return Ok((Self::empty(paths, kind), StoreStatus::NoGestures));
        }

        let text = fs::read_to_string(&paths.mapping_file)?;
        let table: BTreeMap<GestureId, String> = serde_json::from_str(&text)
            .map_err(|e| GestureError::corrupt(&paths.mapping_file, e.to_string()))?;

        let mut records = Vec::with_capacity(table.len());
        for (expected, (&id, label)) in table.iter().enumerate() {
            if id as usize != expected {
                return Err(GestureError::corrupt(
                    &paths.mapping_file,
                    format!("expected gesture {} but found {}", expected, id),
                ));
            }
            let action: Action = label.parse().map_err(|_| {
                GestureError::corrupt(&paths.mapping_file, format!("gesture {} has no action", id))
            })?;
            let feature = read_artifact(&paths.artifact_path(id, kind), kind)?;
            records.push(GestureRecord {
                id,
                feature,
                action,
            });
        }

        let count = records.len();
        log::info!("Loaded {} gestures from {}", count, paths.mapping_file.display());
        Ok((
            Self {
                paths,
                kind,
                records,
            },
            StoreStatus::Loaded(count),
        ))
    }

    /// Load, falling back to an empty store when the persisted state is corrupt
    pub fn open(paths: StorePaths, kind: FeatureKind) -> (Self, StoreStatus) {
        if let Err(e) = fs::create_dir_all(&paths.gesture_dir) {
            log::warn!(
                "Could not create gesture directory {}: {}",
                paths.gesture_dir.display(),
                e
            );
        }

        match Self::load(paths.clone(), kind) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("Falling back to an empty gesture store: {}", e);
                remove_artifacts(&paths.gesture_dir);
                (Self::empty(paths, kind), StoreStatus::Corrupt)
            }
        }
    }

    /// Store a new gesture and persist the whole table
    ///
    /// Either the artifact and the table are both written and the record is
    /// added, or nothing changes.
    pub fn append(&mut self, feature: Feature, action: Action) -> Result<GestureId> {
        if feature.kind() != self.kind {
            return Err(GestureError::FeatureKindMismatch {
                expected: self.kind,
                actual: feature.kind(),
            });
        }
        let action = match action {
            Action::Key { key } => Action::Key {
                key: key.trim().to_uppercase(),
            },
            Action::MoveCursor { .. } => {
                return Err(GestureError::UnbindableAction(action.to_string()))
            }
            Action::Click => Action::Click,
        };
        if action.label().is_empty() {
            return Err(GestureError::EmptyBinding);
        }

        let id = self.records.len() as GestureId;
        let artifact = self.paths.artifact_path(id, self.kind);

        fs::create_dir_all(&self.paths.gesture_dir)?;
        write_atomic(&artifact, &encode_feature(&feature)?)?;

        let mut table = self.table();
        table.insert(id, action.label());
        let written = serde_json::to_vec(&table)
            .map_err(GestureError::from)
            .and_then(|json| write_atomic(&self.paths.mapping_file, &json));
        if let Err(e) = written {
            let _ = fs::remove_file(&artifact);
            return Err(e);
        }

        log::info!("Registered gesture {} -> {}", id, action);
        self.records.push(GestureRecord {
            id,
            feature,
            action,
        });
        Ok(id)
    }

    /// Drop every gesture, delete the table and artifacts, recreate an empty directory
    ///
    /// Records stay in memory if the disk cannot be cleared.
    pub fn reset(&mut self) -> Result<()> {
        if self.paths.gesture_dir.exists() {
            fs::remove_dir_all(&self.paths.gesture_dir)?;
        }
        fs::create_dir_all(&self.paths.gesture_dir)?;

        if self.paths.mapping_file.exists() {
            fs::remove_file(&self.paths.mapping_file)?;
        }

        self.records.clear();
        log::info!("Gesture store reset");
        Ok(())
    }

    pub fn get(&self, id: GestureId) -> Option<&GestureRecord> {
        self.records.get(id as usize)
    }

    /// Records in id order
    pub fn records(&self) -> &[GestureRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<GestureId> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Id the next registered gesture will receive
    pub fn current_index(&self) -> GestureId {
        self.records.len() as GestureId
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    fn table(&self) -> BTreeMap<GestureId, String> {
        self.records
            .iter()
            .map(|r| (r.id, r.action.label()))
            .collect()
    }
}

fn encode_feature(feature: &Feature) -> Result<Vec<u8>> {
    match feature {
        Feature::Template(img) => {
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            Ok(buf)
        }
        Feature::Landmarks(vector) => Ok(serde_json::to_vec(vector)?),
    }
}

fn read_artifact(path: &Path, kind: FeatureKind) -> Result<Feature> {
    if !path.exists() {
        return Err(GestureError::corrupt(path, "artifact missing"));
    }
    match kind {
        FeatureKind::Template => {
            let img = image::open(path).map_err(|e| GestureError::corrupt(path, e.to_string()))?;
            Ok(Feature::Template(img.into_luma8()))
        }
        FeatureKind::Landmarks => {
            let text = fs::read_to_string(path)?;
            let vector: LandmarkVector = serde_json::from_str(&text)
                .map_err(|e| GestureError::corrupt(path, e.to_string()))?;
            Ok(Feature::Landmarks(vector))
        }
    }
}

/// Delete `gesture_<id>.*` files left behind by an unreadable table
fn remove_artifacts(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_artifact = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("gesture_"))
            .unwrap_or(false);
        if is_artifact && path.is_file() {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Could not remove stale artifact {}: {}", path.display(), e);
            }
        }
    }
}

/// Write to a sibling temp file, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
