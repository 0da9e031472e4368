//! Bundle records
//!
//! One `BundleInfo` per downloaded bundle. The built-in content and the
//! "unknown" sentinel are never stored; their records are synthesized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the content shipped inside the application
pub const ID_BUILTIN: &str = "builtin";

/// Id used for a missing or corrupt reference
pub const ID_UNKNOWN: &str = "unknown";

/// Lifecycle status of a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    /// Transfer in flight, or a transfer that never finished
    Downloading,
    /// Installed, or activated but not yet confirmed by the host
    Pending,
    /// Confirmed to load correctly
    Success,
    /// Reported broken by the host
    Error,
}

impl BundleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleStatus::Downloading => "downloading",
            BundleStatus::Pending => "pending",
            BundleStatus::Success => "success",
            BundleStatus::Error => "error",
        }
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// Generated id, also the directory name in both storage tiers
    pub id: String,
    /// Caller-supplied version label
    pub version: String,
    pub status: BundleStatus,
    /// When the download started
    pub downloaded_at: DateTime<Utc>,
    /// CRC32 of the downloaded archive, empty when unknown
    #[serde(default)]
    pub checksum: String,
}

impl BundleInfo {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        status: BundleStatus,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            status,
            downloaded_at: Utc::now(),
            checksum: checksum.into(),
        }
    }

    /// Synthesized record for the built-in content
    pub fn builtin() -> Self {
        Self::synthesized(ID_BUILTIN, BundleStatus::Success)
    }

    /// Synthesized record for a reference that resolves to nothing
    pub fn unknown() -> Self {
        Self::synthesized(ID_UNKNOWN, BundleStatus::Error)
    }

    /// Placeholder used when a stored record is missing or unreadable
    pub fn placeholder(id: &str) -> Self {
        Self::synthesized(id, BundleStatus::Pending)
    }

    fn synthesized(id: &str, status: BundleStatus) -> Self {
        Self {
            id: id.to_string(),
            version: String::new(),
            status,
            downloaded_at: DateTime::<Utc>::default(),
            checksum: String::new(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.id == ID_BUILTIN
    }

    pub fn is_unknown(&self) -> bool {
        self.id == ID_UNKNOWN
    }

    /// Version label, or the builtin id when no label was recorded
    pub fn version_name(&self) -> &str {
        if self.version.is_empty() {
            ID_BUILTIN
        } else {
            &self.version
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_status(mut self, status: BundleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Field-to-value mapping for logs and CLI output.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("version", self.version.clone()),
            ("status", self.status.as_str().to_string()),
            ("downloaded", self.downloaded_at.to_rfc3339()),
            ("checksum", self.checksum.clone()),
        ]
    }
}

impl fmt::Display for BundleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .to_fields()
            .into_iter()
            .map(|(k, v)| format!("\"{}\": \"{}\"", k, v))
            .collect();
        write!(f, "{{ {} }}", fields.join(", "))
    }
}
