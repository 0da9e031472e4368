//! Otter Common - Over-the-air bundle lifecycle engine
//!
//! Downloads versioned content bundles, installs them into a hot and a
//! persist tier, and switches the host application between the built-in
//! content and downloaded bundles with a confirmed fallback to roll back to.
//!
//! Callers serialize lifecycle operations themselves: nothing here takes a
//! lock around metadata or pointer updates.

pub mod bundle;
pub mod checksum;
pub mod config;
pub mod delay;
pub mod downloader;
pub mod error;
pub mod installer;
pub mod kv;
pub mod latest;
pub mod layout;
pub mod lifecycle;
pub mod state;
pub mod stats;
pub mod store;
pub mod transport;

pub use bundle::{BundleInfo, BundleStatus, ID_BUILTIN, ID_UNKNOWN};
pub use config::UpdaterConfig;
pub use delay::{DelayCondition, DelayKind};
pub use downloader::{Downloader, ProgressFn};
pub use error::{Result, UpdaterError};
pub use installer::{BundleInstaller, Decompressor, ZipDecompressor};
pub use kv::{JsonFileKv, KvStore, MemoryKv};
pub use latest::LatestVersion;
pub use layout::StorageLayout;
pub use lifecycle::LifecycleController;
pub use state::PersistentState;
pub use stats::{DeviceInfo, HttpStatsSink, NoopStatsSink, StatsSink};
pub use store::{BundleStore, Lookup};
pub use transport::{HttpTransport, Transport};
