//! Lifecycle stats reporting
//!
//! Fire-and-forget POSTs of lifecycle actions (`set`, `set_fail`, `reset`,
//! `delete`). Delivery runs on a spawned task and its outcome is only logged.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of the device and host app, attached to every event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub app_id: String,
    /// Host app version name
    pub version_build: String,
    /// Host app build number
    pub version_code: String,
    pub os_version: String,
    pub plugin_version: String,
}

/// Wire payload for one stats event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsEvent {
    pub platform: String,
    pub action: String,
    pub device_id: String,
    pub version_name: String,
    pub version_build: String,
    pub version_code: String,
    pub version_os: String,
    pub plugin_version: String,
    pub app_id: String,
}

impl StatsEvent {
    pub fn new(device: &DeviceInfo, action: &str, version_name: &str) -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            action: action.to_string(),
            device_id: device.device_id.clone(),
            version_name: version_name.to_string(),
            version_build: device.version_build.clone(),
            version_code: device.version_code.clone(),
            version_os: device.os_version.clone(),
            plugin_version: device.plugin_version.clone(),
            app_id: device.app_id.clone(),
        }
    }
}

pub trait StatsSink: Send + Sync {
    /// Report `action` for the bundle labelled `version_name`. Never blocks
    /// on delivery and never fails the caller.
    fn send(&self, action: &str, version_name: &str);
}

/// Sink used when no stats endpoint is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatsSink;

impl StatsSink for NoopStatsSink {
    fn send(&self, action: &str, version_name: &str) {
        debug!("Stats disabled, dropping {} for {}", action, version_name);
    }
}

#[derive(Debug, Clone)]
pub struct HttpStatsSink {
    url: String,
    device: DeviceInfo,
    client: reqwest::Client,
}

impl HttpStatsSink {
    pub fn new(url: &str, device: DeviceInfo) -> Self {
        Self {
            url: url.to_string(),
            device,
            client: reqwest::Client::new(),
        }
    }
}

impl StatsSink for HttpStatsSink {
    fn send(&self, action: &str, version_name: &str) {
        let event = StatsEvent::new(&self.device, action, version_name);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime, stats {} for {} not sent", action, version_name);
            return;
        };

        let client = self.client.clone();
        let url = self.url.clone();
        handle.spawn(async move {
            let result = client
                .post(&url)
                .json(&event)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => info!("Stats sent for {}, version {}", event.action, event.version_name),
                Err(e) => warn!("Error sending stats: {}", e),
            }
        });
    }
}

/// HTTP sink when `url` is set, otherwise a no-op sink
pub fn sink_for(url: &str, device: DeviceInfo) -> Arc<dyn StatsSink> {
    if url.is_empty() {
        Arc::new(NoopStatsSink)
    } else {
        Arc::new(HttpStatsSink::new(url, device))
    }
}
