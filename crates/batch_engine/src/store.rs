use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::persist::AtomicFileWriter;
use crate::{Criterion, ImageId, PersistError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("metadata sidecar error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Persist(#[from] PersistError),
    #[error("image {0} not found")]
    NotFound(ImageId),
    #[error("rename failed: {0}")]
    Rename(String),
}

/// Title, alt text, and caption attached to one image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageMetadata {
    pub fn has_alt(&self) -> bool {
        self.alt.as_deref().is_some_and(|alt| !alt.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: ImageId,
    pub path: PathBuf,
    pub mime: String,
    pub metadata: ImageMetadata,
}

impl ImageRecord {
    fn matches(&self, criterion: Criterion) -> bool {
        match criterion {
            Criterion::All => true,
            Criterion::MissingAlt => !self.metadata.has_alt(),
        }
    }
}

/// Backing image collection the worker pages through.
///
/// The worker is stateless across calls, so offset-based resumption is
/// only safe if implementations keep `select_page` ordering stable across
/// calls for a fixed criterion (sort by a stable key). An unstable
/// ordering silently skips or repeats images.
pub trait MediaStore: Send + Sync {
    /// Count images matching `criterion`, with the same predicate
    /// `select_page` applies.
    fn count_matching(&self, criterion: Criterion) -> Result<u64, StoreError>;

    /// The page of matching images at `offset`, at most `limit` long,
    /// in stable order.
    fn select_page(
        &self,
        offset: u64,
        limit: u32,
        criterion: Criterion,
    ) -> Result<Vec<ImageRecord>, StoreError>;

    /// Raw image bytes, for the describer.
    fn read_bytes(&self, record: &ImageRecord) -> Result<Vec<u8>, StoreError>;

    /// Replace the image's metadata. Must be atomic per image.
    fn write_metadata(
        &self,
        record: &ImageRecord,
        metadata: &ImageMetadata,
    ) -> Result<(), StoreError>;

    /// Move the image to a new file stem, keeping its extension. Returns
    /// the new path. Implementations must avoid clobbering existing files.
    fn rename(&self, record: &ImageRecord, new_stem: &str) -> Result<PathBuf, StoreError>;
}

/// Directory-backed store: images anywhere under a root directory, with a
/// `{file}.meta.json` sidecar per image holding its metadata.
///
/// Ordering is the lexicographic relative path, which is stable for a
/// fixed directory tree. Ids are derived from the relative path, so a
/// renamed image gets a new id on the next scan; that matches the
/// relaxed resumption guarantee of offset paging.
pub struct DirMediaStore {
    root: PathBuf,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const SIDECAR_SUFFIX: &str = ".meta.json";

impl DirMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walks the tree and returns all image records in stable path order.
    fn scan(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let mut paths = Vec::new();
        collect_images(&self.root, &mut paths)?;
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let relative = path.strip_prefix(&self.root).unwrap_or(&path);
            let id = path_id(relative);
            let mime = mime_for(&path);
            let metadata = load_sidecar(&sidecar_path(&path))?;
            records.push(ImageRecord {
                id,
                path,
                mime,
                metadata,
            });
        }
        Ok(records)
    }
}

impl MediaStore for DirMediaStore {
    fn count_matching(&self, criterion: Criterion) -> Result<u64, StoreError> {
        let records = self.scan()?;
        Ok(records
            .iter()
            .filter(|record| record.matches(criterion))
            .count() as u64)
    }

    fn select_page(
        &self,
        offset: u64,
        limit: u32,
        criterion: Criterion,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let records = self.scan()?;
        Ok(records
            .into_iter()
            .filter(|record| record.matches(criterion))
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    fn read_bytes(&self, record: &ImageRecord) -> Result<Vec<u8>, StoreError> {
        Ok(fs::read(&record.path)?)
    }

    fn write_metadata(
        &self,
        record: &ImageRecord,
        metadata: &ImageMetadata,
    ) -> Result<(), StoreError> {
        let sidecar = sidecar_path(&record.path);
        let parent = sidecar
            .parent()
            .ok_or_else(|| StoreError::Rename("sidecar has no parent directory".into()))?;
        let filename = sidecar
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::Rename("sidecar has no file name".into()))?;
        let content = serde_json::to_vec_pretty(metadata)?;
        let writer = AtomicFileWriter::new(parent.to_path_buf());
        writer.write(filename, &content)?;
        Ok(())
    }

    fn rename(&self, record: &ImageRecord, new_stem: &str) -> Result<PathBuf, StoreError> {
        let parent = record
            .path
            .parent()
            .ok_or_else(|| StoreError::Rename("image has no parent directory".into()))?;
        let extension = record
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");

        let target = unique_target(parent, new_stem, extension, &record.path)
            .ok_or_else(|| StoreError::Rename(format!("no free filename for {new_stem}")))?;
        if target == record.path {
            return Ok(target);
        }

        fs::rename(&record.path, &target)?;
        let old_sidecar = sidecar_path(&record.path);
        if old_sidecar.exists() {
            fs::rename(&old_sidecar, sidecar_path(&target))?;
        }
        Ok(target)
    }
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if is_image(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    name.push_str(SIDECAR_SUFFIX);
    image.with_file_name(name)
}

fn load_sidecar(path: &Path) -> Result<ImageMetadata, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ImageMetadata::default()),
        Err(err) => Err(err.into()),
    }
}

/// Stable id from the relative path.
fn path_id(relative: &Path) -> ImageId {
    let mut hasher = Sha256::new();
    hasher.update(relative.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// First free `{stem}.{ext}` / `{stem}-{n}.{ext}` in `parent`, treating
/// the image's current path as free.
fn unique_target(parent: &Path, stem: &str, ext: &str, current: &Path) -> Option<PathBuf> {
    let first = parent.join(format!("{stem}.{ext}"));
    if first == current || !first.exists() {
        return Some(first);
    }
    for n in 1..=99 {
        let candidate = parent.join(format!("{stem}-{n}.{ext}"));
        if candidate == current || !candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// In-memory store used as a fixture by tests and demos.
///
/// Keeps records sorted by path so paging behaves like the directory
/// store.
#[derive(Default)]
pub struct MemoryMediaStore {
    images: Mutex<Vec<MemoryImage>>,
}

struct MemoryImage {
    record: ImageRecord,
    bytes: Vec<u8>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an image with the given file name, metadata, and bytes.
    pub fn insert(&self, name: &str, metadata: ImageMetadata, bytes: Vec<u8>) -> ImageId {
        let path = PathBuf::from(name);
        let id = path_id(&path);
        let record = ImageRecord {
            id,
            mime: mime_for(&path),
            path,
            metadata,
        };
        let mut images = self.images.lock().expect("memory store lock");
        images.push(MemoryImage { record, bytes });
        images.sort_by(|a, b| a.record.path.cmp(&b.record.path));
        id
    }

    /// Snapshot of the record with the given id, if present.
    pub fn record(&self, id: ImageId) -> Option<ImageRecord> {
        let images = self.images.lock().expect("memory store lock");
        images
            .iter()
            .find(|image| image.record.id == id)
            .map(|image| image.record.clone())
    }
}

impl MediaStore for MemoryMediaStore {
    fn count_matching(&self, criterion: Criterion) -> Result<u64, StoreError> {
        let images = self.images.lock().expect("memory store lock");
        Ok(images
            .iter()
            .filter(|image| image.record.matches(criterion))
            .count() as u64)
    }

    fn select_page(
        &self,
        offset: u64,
        limit: u32,
        criterion: Criterion,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let images = self.images.lock().expect("memory store lock");
        Ok(images
            .iter()
            .filter(|image| image.record.matches(criterion))
            .skip(offset as usize)
            .take(limit as usize)
            .map(|image| image.record.clone())
            .collect())
    }

    fn read_bytes(&self, record: &ImageRecord) -> Result<Vec<u8>, StoreError> {
        let images = self.images.lock().expect("memory store lock");
        images
            .iter()
            .find(|image| image.record.id == record.id)
            .map(|image| image.bytes.clone())
            .ok_or(StoreError::NotFound(record.id))
    }

    fn write_metadata(
        &self,
        record: &ImageRecord,
        metadata: &ImageMetadata,
    ) -> Result<(), StoreError> {
        let mut images = self.images.lock().expect("memory store lock");
        let image = images
            .iter_mut()
            .find(|image| image.record.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        image.record.metadata = metadata.clone();
        Ok(())
    }

    fn rename(&self, record: &ImageRecord, new_stem: &str) -> Result<PathBuf, StoreError> {
        let mut images = self.images.lock().expect("memory store lock");
        let extension = record
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg")
            .to_string();
        let new_path = PathBuf::from(format!("{new_stem}.{extension}"));
        let image = images
            .iter_mut()
            .find(|image| image.record.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        image.record.path = new_path.clone();
        images.sort_by(|a, b| a.record.path.cmp(&b.record.path));
        Ok(new_path)
    }
}
