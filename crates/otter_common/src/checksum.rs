//! Archive integrity digest
//!
//! CRC32 over the whole file, rendered as 8 lowercase hex digits. This is an
//! integrity check only; it says nothing about who produced the archive.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

/// Result of a checksum computation that may degrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    Computed(String),
    /// The file could not be read; integrity is unknown
    Degraded(String),
}

impl ChecksumOutcome {
    /// Digest, or an empty string when degraded
    pub fn digest(&self) -> &str {
        match self {
            ChecksumOutcome::Computed(digest) => digest,
            ChecksumOutcome::Degraded(_) => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ChecksumOutcome::Degraded(_))
    }
}

/// Compute the digest, reporting read failures as `Degraded`.
pub fn try_compute(path: &Path) -> ChecksumOutcome {
    match crc32_file(path) {
        Ok(crc) => ChecksumOutcome::Computed(format!("{:08x}", crc)),
        Err(e) => {
            warn!("Cannot get checksum: {}: {}", path.display(), e);
            ChecksumOutcome::Degraded(e.to_string())
        }
    }
}

/// Compute the digest, returning an empty string if the file cannot be read.
pub fn compute(path: &Path) -> String {
    try_compute(path).digest().to_string()
}

fn crc32_file(path: &Path) -> io::Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}
