//! Directory-backed blob store.
//!
//! # Invariants
//! - Any string is a legal key. The key is hex encoded and split into
//!   segments of at most `SEGMENT_LEN` characters; every full segment but the
//!   last becomes a directory and the rest names the file `k<hex>.blob`.
//! - Every path component stays well under the 255-byte file-name limit.
//! - Writes land in a temp file under the root and are renamed into place;
//!   readers never observe a partially written blob.
//! - Empty segment directories left behind by deletes are not pruned.

use super::{BlobStore, KeyEnumeration, StoreError, StoreResult};
use log::debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const BLOB_EXTENSION: &str = "blob";
const FILE_PREFIX: &str = "k";
const SEGMENT_LEN: usize = 200;

/// Blob store that keeps every key as a file under `root`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (and creates when missing) the store directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        let encoded = hex::encode(key.as_bytes());
        let mut path = self.root.clone();
        let mut rest = encoded.as_str();
        while rest.len() > SEGMENT_LEN {
            let (segment, tail) = rest.split_at(SEGMENT_LEN);
            path.push(segment);
            rest = tail;
        }
        path.push(format!("{FILE_PREFIX}{rest}.{BLOB_EXTENSION}"));
        path
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let target = self.blob_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target)
            .map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        match fs::read(self.blob_path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl KeyEnumeration for FsBlobStore {
    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        collect_keys(&self.root, String::new(), &mut keys)?;
        keys.sort();
        Ok(keys)
    }
}

fn collect_keys(dir: &Path, prefix: String, keys: &mut Vec<String>) -> StoreResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => {
                skip_entry(&path);
                continue;
            }
        };

        if entry.file_type()?.is_dir() {
            if is_segment(&name) {
                collect_keys(&path, format!("{prefix}{name}"), keys)?;
            } else {
                skip_entry(&path);
            }
            continue;
        }

        let stem = name
            .strip_suffix(BLOB_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|rest| rest.strip_prefix(FILE_PREFIX));
        match stem.and_then(|stem| decode_key(&format!("{prefix}{stem}"))) {
            Some(key) => keys.push(key),
            None => skip_entry(&path),
        }
    }
    Ok(())
}

fn is_segment(name: &str) -> bool {
    name.len() == SEGMENT_LEN && name.bytes().all(|byte| byte.is_ascii_hexdigit())
}

fn skip_entry(path: &Path) {
    debug!(
        "event=store_keys module=store status=skip reason=undecodable_name path={}",
        path.display()
    );
}

fn decode_key(encoded: &str) -> Option<String> {
    let raw = hex::decode(encoded).ok()?;
    String::from_utf8(raw).ok()
}
