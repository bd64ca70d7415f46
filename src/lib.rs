//! CoreDepot Core Library
//!
//! Asset synchronization and core discovery for an emulator front-end.
//!
//! # Architecture
//!
//! This library is designed to be driven by a thin native shell, either
//! from Rust or through the C ABI in the `ffi` module. Two independent
//! components share nothing but the per-install data directory:
//!
//! ## Core Discovery (`registry` module)
//! - `discover_cores()` - List installed cores and name them from the descriptor table
//! - `discover_from_config()` - Same, with the table read from disk and the CPU probed
//! - `select_core()` - Hand a picked core to the active-selection owner
//!
//! ## Asset Sync (`assets` module)
//! - `AssetSync::run()` - Extract bundled asset groups once per software version
//! - `spawn_sync()` - Run a pass on a background thread
//! - `clear_cache()` - Forget the recorded version so the next pass re-extracts
//!
//! ## Data Structures
//! - `PluginDescriptor` - One discovered core (path, display name, CPU support)
//! - `ActiveCore` - Path and name of the selected core
//! - `DescriptorTable` - Parsed key/value core descriptions
//! - `AssetGroup` / `SyncConfig` / `DiscoveryConfig` - Configuration

pub mod assets;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod ffi;
pub mod plugin;
pub mod registry;
pub mod stamp;

pub use assets::{
    clear_cache, spawn_sync, AssetNode, AssetSource, AssetSync, DirectorySource, GroupReport,
    MemorySource, SyncOutcome, SyncReport,
};
pub use config::{AppConfig, AssetGroup, DiscoveryConfig, StampPolicy, SyncConfig};
pub use descriptor::DescriptorTable;
pub use plugin::{ActiveCore, CoreSelectionSink, DescriptorEntry, PluginDescriptor};
pub use registry::{
    discover_cores, discover_from_config, select_core, DiscoveryIssue, DiscoveryOptions,
    DiscoveryReport, HostFeatures,
};
