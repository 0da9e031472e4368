//! Command implementations for otterctl

use anyhow::{bail, Context, Result};
use chrono::Utc;
use otter_common::stats::sink_for;
use otter_common::{
    latest, BundleInstaller, BundleStore, DelayCondition, Downloader, HttpTransport, JsonFileKv,
    KvStore, LifecycleController, PersistentState, UpdaterConfig, ZipDecompressor,
};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Engine components wired from the config file
pub struct Engine {
    config: UpdaterConfig,
    controller: LifecycleController,
    downloader: Downloader,
}

impl Engine {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(UpdaterConfig::default_path);
        let config = UpdaterConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;

        let kv: Arc<dyn KvStore> = Arc::new(
            JsonFileKv::open(&config.state_path)
                .with_context(|| format!("Failed to open state {}", config.state_path.display()))?,
        );
        let layout = config.layout();
        let store = BundleStore::new(kv.clone(), layout.clone());
        let controller = LifecycleController::new(
            store.clone(),
            PersistentState::new(kv),
            sink_for(&config.stats_url, config.device_info()),
        );

        let installer = BundleInstaller::new(
            Arc::new(ZipDecompressor),
            &layout.scratch_root,
            &layout.entry_file,
        );
        let transport = HttpTransport::new().context("Failed to create HTTP client")?;
        let downloader = Downloader::new(Arc::new(transport), installer, store).with_progress(
            Arc::new(|id: &str, percent: u8| {
                tracing::info!("Download [{}] {}%", id, percent);
            }),
        );

        Ok(Self {
            config,
            controller,
            downloader,
        })
    }

    pub async fn download(&self, url: &str, version: &str) -> Result<()> {
        let info = self
            .downloader
            .fetch(url, version)
            .await
            .with_context(|| format!("Download of {} failed", url))?;
        print_json(&info)
    }

    pub fn set(&self, id: &str) -> Result<()> {
        if !self.controller.activate(id) {
            bail!("Bundle {} is not installed", id);
        }
        print_json(&self.controller.current_bundle())
    }

    pub fn reset(&self) -> Result<()> {
        self.controller.reset(false);
        print_json(&self.controller.current_bundle())
    }

    pub fn success(&self, id: &str, keep_previous: bool) -> Result<()> {
        let bundle = self.controller.store().get(id);
        if !bundle.is_builtin() && !self.controller.store().layout().is_installed(id) {
            bail!("Bundle {} is not installed", id);
        }
        let auto_delete = self.config.auto_delete_previous && !keep_previous;
        self.controller.confirm_success(&bundle, auto_delete);
        print_json(&self.controller.fallback_bundle())
    }

    pub fn error(&self, id: &str) -> Result<()> {
        let bundle = self.controller.store().get(id);
        self.controller.confirm_error(&bundle);
        print_json(&json!({
            "failed": self.controller.store().get(id),
            "fallback": self.controller.fallback_bundle(),
        }))
    }

    pub fn delete(&self, id: &str, keep_record: bool) -> Result<()> {
        if !self.controller.delete_with(id, !keep_record) {
            bail!("Bundle {} cannot be deleted", id);
        }
        print_json(&json!({ "deleted": id }))
    }

    pub fn next(&self, id: Option<&str>) -> Result<()> {
        if !self.controller.stage_next(id) {
            bail!("Bundle {} is not installed", id.unwrap_or_default());
        }
        print_json(&json!({ "next": self.controller.next_bundle() }))
    }

    pub fn apply_next(&self) -> Result<()> {
        let applied = self
            .controller
            .apply_next(Utc::now(), &self.config.version_build);
        print_json(&json!({
            "applied": applied,
            "next": self.controller.next_bundle(),
        }))
    }

    pub fn list(&self) -> Result<()> {
        print_json(&self.controller.list())
    }

    pub fn current(&self) -> Result<()> {
        print_json(&self.controller.current_bundle())
    }

    pub fn status(&self) -> Result<()> {
        let builtin = self.controller.is_using_builtin();
        let path = (!builtin)
            .then(|| self.controller.bundle_path(&self.controller.current_bundle_id()));
        print_json(&json!({
            "current": self.controller.current_bundle(),
            "fallback": self.controller.fallback_bundle(),
            "next": self.controller.next_bundle(),
            "builtin": builtin,
            "path": path,
        }))
    }

    pub async fn latest(&self) -> Result<()> {
        let current = self.controller.current_bundle();
        let latest = latest::check_latest(
            &self.config.update_url,
            &self.config.device_info(),
            current.version_name(),
        )
        .await
        .context("Update check failed")?;
        print_json(&latest)
    }

    pub fn delay_set(&self, kind: &str, value: Option<String>) -> Result<()> {
        let mut conditions = self.controller.delay_conditions();
        conditions.push(DelayCondition::new(kind, value));
        self.controller
            .set_delay_conditions(&conditions)
            .context("Failed to store delay conditions")?;
        print_json(&conditions)
    }

    pub fn delay_clear(&self) -> Result<()> {
        self.controller
            .clear_delay_conditions()
            .context("Failed to clear delay conditions")?;
        print_json(&self.controller.delay_conditions())
    }

    pub fn delay_show(&self) -> Result<()> {
        print_json(&self.controller.delay_conditions())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
