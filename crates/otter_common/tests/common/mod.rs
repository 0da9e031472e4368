//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use otter_common::stats::sink_for;
use otter_common::{
    BundleInstaller, BundleStore, Downloader, JsonFileKv, KvStore, LifecycleController,
    PersistentState, Transport, UpdaterConfig, UpdaterError, ZipDecompressor,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::FileOptions;

/// Write a zip archive holding `files`
pub fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in files {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Transport that treats the URL as a local file path
pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &(dyn Fn(f64) + Send + Sync),
    ) -> otter_common::Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(url, dest).map_err(|e| UpdaterError::Network(e.to_string()))?;
        progress(0.0);
        progress(0.5);
        progress(1.0);
        Ok(dest.to_path_buf())
    }
}

/// Engine wired the way a host wires it, over a JSON state file
pub struct Engine {
    pub temp: TempDir,
    pub config: UpdaterConfig,
    pub controller: LifecycleController,
    pub downloader: Downloader,
    pub progress: Arc<Mutex<Vec<(String, u8)>>>,
}

impl Engine {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::rooted_at(temp.path());
        Self::open(temp, config)
    }

    /// Rebuild every component from disk, as after a process restart
    pub fn restart(self) -> Self {
        let Engine { temp, config, .. } = self;
        Self::open(temp, config)
    }

    fn open(temp: TempDir, config: UpdaterConfig) -> Self {
        let kv: Arc<dyn KvStore> = Arc::new(JsonFileKv::open(&config.state_path).unwrap());
        let layout = config.layout();
        let store = BundleStore::new(kv.clone(), layout.clone());
        let controller = LifecycleController::new(
            store.clone(),
            PersistentState::new(kv),
            sink_for(&config.stats_url, config.device_info()),
        );

        let progress = Arc::new(Mutex::new(Vec::new()));
        let recorder = progress.clone();
        let installer = BundleInstaller::new(
            Arc::new(ZipDecompressor),
            &layout.scratch_root,
            &layout.entry_file,
        );
        let downloader = Downloader::new(Arc::new(LocalTransport), installer, store)
            .with_progress(Arc::new(move |id: &str, percent: u8| {
                recorder.lock().unwrap().push((id.to_string(), percent));
            }));

        Self {
            temp,
            config,
            controller,
            downloader,
            progress,
        }
    }

    /// Archive under the temp dir, returned as the "url" LocalTransport reads
    pub fn archive(&self, name: &str, files: &[(&str, &str)]) -> String {
        let path = self.temp.path().join(name);
        write_zip(&path, files);
        path.to_string_lossy().into_owned()
    }

    pub fn percents(&self, id: &str) -> Vec<u8> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(pid, _)| pid == id)
            .map(|(_, p)| *p)
            .collect()
    }
}
