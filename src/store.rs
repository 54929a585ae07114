//! Mask persistence on local disk.
//!
//! DESIGN
//! ======
//! Uploaded masks land flat in one directory under their client-chosen
//! names, which follow `<uuid>_<kind>.png`. Names are validated rather than
//! rewritten: anything that could escape the directory or hide a file is
//! rejected so the same name can be served back under `/images/`.

use std::path::{Path, PathBuf};

use crate::capture::MaskProfile;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MaskStore {
    dir: PathBuf,
}

impl MaskStore {
    /// Open (creating if needed) the mask directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a validated filename and return the full path.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let name = sanitize_filename(filename)?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Filenames currently in the store, sorted.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Best mask for a capture: the requested profile's building-aware mask,
    /// then its naive variant, then the other profile in the same order.
    pub async fn find_mask(&self, uuid: &str, profile: MaskProfile) -> Result<Option<PathBuf>, StoreError> {
        let names = self.list().await?;
        let uuid = uuid.trim().to_ascii_lowercase();
        Ok(pick_mask(&names, &uuid, profile).map(|name| self.dir.join(name)))
    }
}

fn pick_mask<'a>(names: &'a [String], uuid: &str, profile: MaskProfile) -> Option<&'a str> {
    let prefix = format!("{uuid}_");
    let candidates: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| {
            let lower = n.to_ascii_lowercase();
            lower.starts_with(&prefix) && lower.contains("mask") && lower.ends_with(".png")
        })
        .collect();

    let find = |want: MaskProfile, naive: bool| {
        let tag = format!("_{}_mask", want.as_str());
        candidates.iter().copied().find(|n| {
            let lower = n.to_ascii_lowercase();
            lower.contains(&tag) && lower.contains("_naive") == naive
        })
    };

    let other = profile.other();
    find(profile, false)
        .or_else(|| find(profile, true))
        .or_else(|| find(other, false))
        .or_else(|| find(other, true))
}

/// Accept only plain names made of `[A-Za-z0-9._-]`, not starting with a
/// dot and not containing `..`.
pub fn sanitize_filename(raw: &str) -> Result<&str, StoreError> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains("..")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid { Ok(name) } else { Err(StoreError::InvalidFilename(raw.to_owned())) }
}

/// The capture uuid is everything before the first underscore.
#[must_use]
pub fn uuid_from_filename(filename: &str) -> &str {
    filename.split_once('_').map_or_else(
        || filename.rsplit_once('.').map_or(filename, |(stem, _)| stem),
        |(uuid, _)| uuid,
    )
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
