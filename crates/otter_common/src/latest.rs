//! Update availability check
//!
//! Posts the device identity and current bundle version to the update
//! endpoint and reads back which bundle to fetch next.

use crate::error::{Result, UpdaterError};
use crate::stats::DeviceInfo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the update endpoint reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatestVersion {
    pub version: String,
    pub url: String,
    pub message: Option<String>,
    /// Set when the update crosses a major version
    pub major: Option<bool>,
}

impl LatestVersion {
    /// Field-to-value mapping for the host bridge and CLI
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("version", self.version.clone()), ("url", self.url.clone())];
        if let Some(message) = &self.message {
            fields.push(("message", message.clone()));
        }
        if let Some(major) = self.major {
            fields.push(("major", major.to_string()));
        }
        fields
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    version: Option<String>,
    url: Option<String>,
    message: Option<String>,
    major: Option<bool>,
}

#[derive(Debug, Serialize)]
struct LatestRequest<'a> {
    platform: &'static str,
    device_id: &'a str,
    app_id: &'a str,
    version_build: &'a str,
    version_code: &'a str,
    version_os: &'a str,
    plugin_version: &'a str,
    version_name: &'a str,
}

/// Ask `update_url` for the latest bundle.
pub async fn check_latest(
    update_url: &str,
    device: &DeviceInfo,
    version_name: &str,
) -> Result<LatestVersion> {
    if update_url.is_empty() {
        return Err(UpdaterError::Config("update_url is not set".to_string()));
    }

    let request = LatestRequest {
        platform: std::env::consts::OS,
        device_id: &device.device_id,
        app_id: &device.app_id,
        version_build: &device.version_build,
        version_code: &device.version_code,
        version_os: &device.os_version,
        plugin_version: &device.plugin_version,
        version_name,
    };
    debug!("Auto-update parameters: {:?}", request);

    let response: LatestResponse = reqwest::Client::new()
        .post(update_url)
        .json(&request)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let latest = LatestVersion {
        version: response.version.unwrap_or_default(),
        url: response.url.unwrap_or_default(),
        message: response.message,
        major: response.major,
    };
    info!("Latest version reported: {:?}", latest.to_fields());
    Ok(latest)
}
