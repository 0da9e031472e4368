//! Bundle installer
//!
//! Unpacks a downloaded archive into a scratch directory, normalizes archives
//! that wrap everything in one top-level folder, and moves the result to
//! `<tier_root>/<id>`. Called once per storage tier with the same archive.
//! The scratch area must sit on the same filesystem as both tiers, since the
//! final step is a rename.

use crate::error::{Result, UpdaterError};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Archive extraction primitive
pub trait Decompressor: Send + Sync {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Zip archives via the `zip` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipDecompressor;

impl Decompressor for ZipDecompressor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let decompress_error = |reason: String| UpdaterError::Decompress {
            archive: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| decompress_error(e.to_string()))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| decompress_error(e.to_string()))?;
        zip.extract(dest).map_err(|e| decompress_error(e.to_string()))?;

        debug!("Extracted {} entries into {}", zip.len(), dest.display());
        Ok(())
    }
}

#[derive(Clone)]
pub struct BundleInstaller {
    decompressor: Arc<dyn Decompressor>,
    scratch_root: PathBuf,
    entry_file: String,
}

impl BundleInstaller {
    pub fn new(
        decompressor: Arc<dyn Decompressor>,
        scratch_root: impl Into<PathBuf>,
        entry_file: &str,
    ) -> Self {
        Self {
            decompressor,
            scratch_root: scratch_root.into(),
            entry_file: entry_file.to_string(),
        }
    }

    /// Install `archive` as `<tier_root>/<target_id>`.
    ///
    /// No rollback on failure: a scratch directory or a partially moved tree
    /// may be left behind.
    pub fn install(&self, archive: &Path, target_id: &str, tier_root: &Path) -> Result<()> {
        prepare_folder(tier_root)?;
        prepare_folder(&self.scratch_root)?;

        let scratch = self.scratch_root.join(uuid::Uuid::new_v4().simple().to_string());
        self.decompressor.extract(archive, &scratch)?;

        let dest = tier_root.join(target_id);
        if self.unflatten(&scratch, &dest)? {
            fs::remove_dir_all(&scratch).map_err(|e| UpdaterError::storage(&scratch, e))?;
        }

        info!("Installed bundle [{}] into {}", target_id, dest.display());
        Ok(())
    }

    /// Move the extracted tree to `dest`. Returns true when the single
    /// wrapping subdirectory was moved instead of `source` itself.
    fn unflatten(&self, source: &Path, dest: &Path) -> Result<bool> {
        let unflatten_error = |e: std::io::Error| UpdaterError::Unflatten {
            from: source.to_path_buf(),
            to: dest.to_path_buf(),
            source: e,
        };

        let entries: Vec<PathBuf> = fs::read_dir(source)
            .map_err(unflatten_error)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()
            .map_err(unflatten_error)?;

        let wrapped = entries.len() == 1
            && entries[0].is_dir()
            && !source.join(&self.entry_file).exists();

        if wrapped {
            debug!("Unflattening {} into {}", entries[0].display(), dest.display());
            fs::rename(&entries[0], dest).map_err(unflatten_error)?;
        } else {
            fs::rename(source, dest).map_err(unflatten_error)?;
        }
        Ok(wrapped)
    }
}

fn prepare_folder(path: &Path) -> Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| UpdaterError::storage(path, e))?;
    }
    Ok(())
}
