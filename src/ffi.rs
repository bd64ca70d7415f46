//! FFI (Foreign Function Interface) bindings for native front-ends.
//!
//! Exposes core discovery and asset synchronization through C-compatible
//! functions, so a JNI shim or any C caller can drive them.
//!
//! # Memory Management
//!
//! - Rust allocates lists and strings and hands out pointers
//! - The caller MUST release them with the matching `_free` function
//! - Strings are null-terminated UTF-8
//!
//! # Usage from C
//!
//! ```c
//! CoreList *cores = coredepot_discover_cores(lib_dir, "/data/libretro_cores.cfg");
//! for (int i = 0; i < coredepot_core_list_count(cores); i++) {
//!     char *name = coredepot_core_list_name(cores, i);
//!     /* ... */
//!     coredepot_free_string(name);
//! }
//! coredepot_free_core_list(cores);
//! ```

use crate::assets::{clear_cache, AssetSync, DirectorySource};
use crate::config::{AppConfig, DiscoveryConfig};
use crate::plugin::PluginDescriptor;
use crate::registry::discover_from_config;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::warn;

// ============================================================================
// C-Compatible Types
// ============================================================================

/// Opaque handle to a list of discovered cores
pub struct CCoreList {
    cores: Vec<PluginDescriptor>,
}

/// Result code for operations
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum CResultCode {
    Success = 0,
    Error = 1,
}

// ============================================================================
// Core Discovery
// ============================================================================

/// Discover installed cores in `cores_dir`.
/// `descriptor_path` may be null when no descriptor table is bundled.
/// Returns null when the directory cannot be listed.
/// Caller MUST call coredepot_free_core_list() when done.
#[no_mangle]
pub extern "C" fn coredepot_discover_cores(
    cores_dir: *const c_char,
    descriptor_path: *const c_char,
) -> *mut CCoreList {
    let Some(cores_dir) = c_char_to_path(cores_dir) else {
        return ptr::null_mut();
    };

    let mut config = DiscoveryConfig::new(cores_dir);
    config.descriptor_table = c_char_to_path(descriptor_path);

    match discover_from_config(&config) {
        Ok(report) => Box::into_raw(Box::new(CCoreList {
            cores: report.cores,
        })),
        Err(e) => {
            warn!(error = %e, "Core discovery failed");
            ptr::null_mut()
        }
    }
}

/// Get the number of cores in a list.
#[no_mangle]
pub extern "C" fn coredepot_core_list_count(list: *const CCoreList) -> c_int {
    match core_list(list) {
        Some(list) => list.cores.len() as c_int,
        None => 0,
    }
}

/// Get the absolute path of the core at `index`.
/// Caller MUST call coredepot_free_string() when done.
#[no_mangle]
pub extern "C" fn coredepot_core_list_path(list: *const CCoreList, index: c_int) -> *mut c_char {
    match core_at(list, index) {
        Some(core) => string_to_c_char(&core.path.to_string_lossy()),
        None => ptr::null_mut(),
    }
}

/// Get the display name of the core at `index`.
/// Caller MUST call coredepot_free_string() when done.
#[no_mangle]
pub extern "C" fn coredepot_core_list_name(list: *const CCoreList, index: c_int) -> *mut c_char {
    match core_at(list, index) {
        Some(core) => string_to_c_char(&core.display_name),
        None => ptr::null_mut(),
    }
}

/// Free a list returned by coredepot_discover_cores().
#[no_mangle]
pub extern "C" fn coredepot_free_core_list(list: *mut CCoreList) {
    if !list.is_null() {
        unsafe {
            let _ = Box::from_raw(list);
        }
    }
}

// ============================================================================
// Asset Synchronization
// ============================================================================

/// Run one asset sync pass for the config at `config_path`.
/// Blocks until done; call it from a worker thread.
/// Returns Success whether the pass skipped or extracted.
#[no_mangle]
pub extern "C" fn coredepot_sync_assets(config_path: *const c_char, version: u32) -> CResultCode {
    let Some(config) = load_config(config_path) else {
        return CResultCode::Error;
    };

    let source = DirectorySource::new(config.sync.bundle_dir.clone());
    AssetSync::new(source, config.sync, version).run();
    CResultCode::Success
}

/// Remove the cache stamp so the next sync re-extracts everything.
#[no_mangle]
pub extern "C" fn coredepot_clear_cache(config_path: *const c_char) -> CResultCode {
    let Some(config) = load_config(config_path) else {
        return CResultCode::Error;
    };

    match clear_cache(&config.sync) {
        Ok(()) => CResultCode::Success,
        Err(e) => {
            warn!(error = %e, "Failed to clear asset cache");
            CResultCode::Error
        }
    }
}

// ============================================================================
// String Management
// ============================================================================

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn coredepot_free_string(s: *mut c_char) {
    free_c_char(s);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn core_list<'a>(list: *const CCoreList) -> Option<&'a CCoreList> {
    unsafe { list.as_ref() }
}

fn core_at<'a>(list: *const CCoreList, index: c_int) -> Option<&'a PluginDescriptor> {
    let idx = usize::try_from(index).ok()?;
    core_list(list)?.cores.get(idx)
}

fn load_config(config_path: *const c_char) -> Option<AppConfig> {
    let path = c_char_to_path(config_path)?;
    match AppConfig::load(&path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "Failed to load config");
            None
        }
    }
}

fn c_char_to_path(s: *const c_char) -> Option<PathBuf> {
    if s.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(s) };
    s.to_str().ok().map(|s| Path::new(s).to_path_buf())
}

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn c_path(path: &Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let owned = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        coredepot_free_string(s);
        owned
    }

    #[test]
    fn discover_and_read_back_cores() {
        let dir = tempfile::tempdir().unwrap();
        let cores = dir.path().join("lib");
        fs::create_dir(&cores).unwrap();
        fs::write(cores.join("libretro_core_a.so"), "").unwrap();
        fs::write(cores.join("libretroarch.so"), "").unwrap();
        let table = dir.path().join("libretro_cores.cfg");
        fs::write(&table, "core_a = \"Core Alpha\"\n").unwrap();

        let list = coredepot_discover_cores(c_path(&cores).as_ptr(), c_path(&table).as_ptr());
        assert!(!list.is_null());
        assert_eq!(coredepot_core_list_count(list), 1);
        assert_eq!(take_string(coredepot_core_list_name(list, 0)), "Core Alpha");
        assert_eq!(
            PathBuf::from(take_string(coredepot_core_list_path(list, 0))),
            cores.join("libretro_core_a.so")
        );
        assert!(coredepot_core_list_name(list, 1).is_null());
        assert!(coredepot_core_list_name(list, -1).is_null());
        coredepot_free_core_list(list);
    }

    #[test]
    fn missing_directory_yields_null() {
        let dir = tempfile::tempdir().unwrap();
        let list = coredepot_discover_cores(c_path(&dir.path().join("nope")).as_ptr(), ptr::null());
        assert!(list.is_null());
        assert_eq!(coredepot_core_list_count(list), 0);
        coredepot_free_core_list(list);
    }

    #[test]
    fn sync_and_clear_through_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle");
        let data = dir.path().join("data");
        fs::create_dir_all(bundle.join("overlays")).unwrap();
        fs::create_dir_all(&data).unwrap();
        fs::write(bundle.join("overlays/pad.cfg"), "pad").unwrap();

        let config_path = dir.path().join("coredepot.json");
        let config = serde_json::json!({
            "sync": {
                "bundle_dir": bundle,
                "data_dir": data,
                "groups": [{ "name": "overlays", "source": "overlays", "target": "overlays" }]
            },
            "discovery": { "cores_dir": dir.path() }
        });
        fs::write(&config_path, config.to_string()).unwrap();
        let config_path = c_path(&config_path);

        assert_eq!(coredepot_sync_assets(config_path.as_ptr(), 12), CResultCode::Success);
        assert_eq!(fs::read(data.join("overlays/pad.cfg")).unwrap(), b"pad");
        assert_eq!(fs::read(data.join(".cacheversion")).unwrap(), vec![0, 0, 0, 12]);

        assert_eq!(coredepot_clear_cache(config_path.as_ptr()), CResultCode::Success);
        assert!(!data.join(".cacheversion").exists());

        assert_eq!(coredepot_sync_assets(ptr::null(), 12), CResultCode::Error);
    }
}
