//! Bundle downloader
//!
//! Fetch → checksum → install hot tier → install persist tier, reporting
//! progress per bundle id. Observable progress: 0 before the transfer,
//! 10..=70 during it, then 71, 85 and 100.
//!
//! A failed fetch leaves its provisional `downloading` record in the store
//! and never touches the lifecycle pointers.

use crate::bundle::{BundleInfo, BundleStatus};
use crate::checksum;
use crate::error::{Result, UpdaterError};
use crate::installer::BundleInstaller;
use crate::store::BundleStore;
use crate::transport::Transport;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Progress callback: `(bundle id, percent)`. Runs on runtime threads.
pub type ProgressFn = Arc<dyn Fn(&str, u8) + Send + Sync>;

const ID_LENGTH: usize = 10;
const TRANSFER_MIN: u8 = 10;
const TRANSFER_MAX: u8 = 70;
const PROGRESS_DOWNLOADED: u8 = 71;
const PROGRESS_HOT_INSTALLED: u8 = 85;
const PROGRESS_DONE: u8 = 100;

/// Scale `percent` (0..=100) into `min..=max`. An inverted range pins to `min`.
pub fn calc_total_percent(percent: u8, min: u8, max: u8) -> u8 {
    let percent = u32::from(percent.min(100));
    let (min, max) = (u32::from(min), u32::from(max));
    (min + percent * max.saturating_sub(min) / 100) as u8
}

/// Random alphanumeric bundle id
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    installer: BundleInstaller,
    store: BundleStore,
    progress: ProgressFn,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>, installer: BundleInstaller, store: BundleStore) -> Self {
        Self {
            transport,
            installer,
            store,
            progress: Arc::new(|_: &str, _: u8| {}),
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = progress;
        self
    }

    /// Download and install the bundle at `url`, labelled `version`.
    pub async fn fetch(&self, url: &str, version: &str) -> Result<BundleInfo> {
        let id = generate_id();
        let started = BundleInfo::new(&id, version, BundleStatus::Downloading, "");

        (self.progress)(&id, 0);
        self.store.put(&id, &started)?;
        info!("Downloading bundle [{}] version {} from {}", id, version, url);

        let archive = self
            .store
            .layout()
            .scratch_root
            .join(format!("{}.download", uuid::Uuid::new_v4().simple()));

        let checksum = match self.download_and_install(&id, url, &archive).await {
            Ok(checksum) => checksum,
            Err(e) => {
                error!("Download of bundle [{}] failed: {}", id, e);
                if archive.exists() {
                    if let Err(rm) = std::fs::remove_file(&archive) {
                        warn!("Cannot remove {}: {}", archive.display(), rm);
                    }
                }
                return Err(e);
            }
        };

        let info = BundleInfo {
            status: BundleStatus::Pending,
            checksum,
            ..started
        };
        self.store.put(&id, &info)?;
        info!("Bundle [{}] ready: {}", id, info);
        Ok(info)
    }

    async fn download_and_install(&self, id: &str, url: &str, archive: &Path) -> Result<String> {
        let progress = self.progress.clone();
        let progress_id = id.to_string();
        let report = move |fraction: f64| {
            let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u8;
            progress(&progress_id, calc_total_percent(percent, TRANSFER_MIN, TRANSFER_MAX));
        };

        let archive = self.transport.fetch(url, archive, &report).await?;
        (self.progress)(id, PROGRESS_DOWNLOADED);

        let checksum = checksum::compute(&archive);

        let layout = self.store.layout().clone();
        self.install_tier(&archive, id, layout.hot_root).await?;
        (self.progress)(id, PROGRESS_HOT_INSTALLED);
        self.install_tier(&archive, id, layout.persist_root).await?;
        (self.progress)(id, PROGRESS_DONE);

        std::fs::remove_file(&archive).map_err(|e| UpdaterError::storage(&archive, e))?;
        Ok(checksum)
    }

    async fn install_tier(&self, archive: &Path, id: &str, tier_root: PathBuf) -> Result<()> {
        let installer = self.installer.clone();
        let archive = archive.to_path_buf();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || installer.install(&archive, &id, &tier_root))
            .await
            .map_err(|e| {
                UpdaterError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?
    }
}
