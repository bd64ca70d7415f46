//! Core discovery for CoreDepot.
//!
//! Lists the native core install directory (one level, no recursion) and
//! turns every file that is not one of the host's own binaries into a
//! [`PluginDescriptor`], named through the bundled descriptor table.
//!
//! # Failure model
//!
//! Only an unlistable core directory fails the pass. A broken descriptor
//! table degrades every name to its file-derived fallback, and a broken
//! directory entry is skipped. Both are logged and collected in
//! [`DiscoveryReport::issues`].
//!
//! # Ordering
//!
//! Cores come back in the order the OS lists the directory. That order is
//! not stable across runs or platforms.

use crate::config::DiscoveryConfig;
use crate::descriptor::DescriptorTable;
use crate::error::{DescriptorParseError, DiscoveryError, PluginConstructionError};
use crate::plugin::{CoreSelectionSink, PluginDescriptor};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Prefixes stripped from a file stem to get the bare core identifier.
/// Accepts both `libretro_core.so` and `libretro-core.so`.
const CORE_PREFIXES: [&str; 3] = ["libretro_", "libretro-", "lib"];

const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// CPU capabilities of the host that affect which core builds can run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostFeatures {
    pub neon: bool,
}

impl HostFeatures {
    /// Reads `/proc/cpuinfo`. Hosts without it report no capabilities.
    /// AArch64 lists NEON as `asimd`.
    pub fn detect() -> Self {
        match fs::read_to_string(CPUINFO_PATH) {
            Ok(cpuinfo) => Self::from_cpuinfo(&cpuinfo),
            Err(e) => {
                debug!(error = %e, "cpuinfo unavailable, assuming no NEON");
                Self::default()
            }
        }
    }

    pub fn from_cpuinfo(cpuinfo: &str) -> Self {
        let neon = cpuinfo
            .lines()
            .filter_map(|line| line.split_once(':'))
            .filter(|(key, _)| {
                let key = key.trim();
                key == "Features" || key == "flags"
            })
            .any(|(_, flags)| {
                flags
                    .split_whitespace()
                    .any(|flag| flag == "neon" || flag == "asimd")
            });
        Self { neon }
    }
}

/// Knobs for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub reserved_prefix: String,
    pub hide_unsupported_variants: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            reserved_prefix: crate::config::DEFAULT_RESERVED_PREFIX.to_string(),
            hide_unsupported_variants: false,
        }
    }
}

impl From<&DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            reserved_prefix: config.reserved_prefix.clone(),
            hide_unsupported_variants: config.hide_unsupported_variants,
        }
    }
}

/// A non-fatal problem met during discovery.
#[derive(Debug)]
pub enum DiscoveryIssue {
    Descriptor(DescriptorParseError),
    Entry(PluginConstructionError),
}

/// Result of a discovery pass: the cores found plus what went wrong on the way.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub cores: Vec<PluginDescriptor>,
    pub issues: Vec<DiscoveryIssue>,
}

/// Lists `cores_dir` and builds a descriptor for every installed core.
///
/// `descriptor_table` is the raw bundled table; it is parsed once here.
pub fn discover_cores(
    cores_dir: &Path,
    descriptor_table: &[u8],
    host: HostFeatures,
    options: &DiscoveryOptions,
) -> Result<DiscoveryReport, DiscoveryError> {
    let mut report = DiscoveryReport::default();

    let table = match DescriptorTable::parse(descriptor_table) {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "Descriptor table unusable, falling back to file names");
            report.issues.push(DiscoveryIssue::Descriptor(e));
            DescriptorTable::default()
        }
    };

    scan_directory(cores_dir, &table, host, options, &mut report)?;

    info!(
        path = %cores_dir.display(),
        count = report.cores.len(),
        issues = report.issues.len(),
        "Discovered cores"
    );
    Ok(report)
}

/// Runs discovery from config, reading the descriptor table from disk and
/// probing the host CPU.
pub fn discover_from_config(config: &DiscoveryConfig) -> Result<DiscoveryReport, DiscoveryError> {
    let mut early_issue = None;
    let table_bytes = match &config.descriptor_table {
        Some(path) => fs::read(path).unwrap_or_else(|source| {
            warn!(path = %path.display(), error = %source, "Failed to read descriptor table");
            early_issue = Some(DescriptorParseError::Unreadable {
                path: path.clone(),
                source,
            });
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut report = discover_cores(
        &config.cores_dir,
        &table_bytes,
        HostFeatures::detect(),
        &DiscoveryOptions::from(config),
    )?;
    if let Some(issue) = early_issue {
        report.issues.insert(0, DiscoveryIssue::Descriptor(issue));
    }
    Ok(report)
}

/// Hands the picked core to whoever tracks the active selection.
pub fn select_core(core: &PluginDescriptor, sink: &mut impl CoreSelectionSink) {
    info!(path = %core.path.display(), name = %core.display_name, "Core selected");
    sink.core_selected(core.selection());
}

fn scan_directory(
    dir: &Path,
    table: &DescriptorTable,
    host: HostFeatures,
    options: &DiscoveryOptions,
    report: &mut DiscoveryReport,
) -> Result<(), DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                skip(report, PluginConstructionError::Entry {
                    dir: dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        let path = entry.path();

        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            skip(report, PluginConstructionError::NonUtf8Name { path });
            continue;
        };

        debug!(name = %file_name, "Core directory entry");

        if file_name.starts_with(&options.reserved_prefix) {
            debug!(name = %file_name, "Skipping host binary");
            continue;
        }

        // fs::metadata follows symlinks, so linked cores count as files.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!(path = %path.display(), "Skipping non-file entry");
                continue;
            }
            Err(source) => {
                skip(report, PluginConstructionError::Metadata { path, source });
                continue;
            }
        }

        let stem = file_stem(&file_name);
        if is_neon_variant(stem) && options.hide_unsupported_variants && !host.neon {
            debug!(name = %file_name, "Hiding NEON build on host without NEON");
            continue;
        }

        report.cores.push(build_descriptor(path.as_path(), stem, table, host));
    }

    Ok(())
}

fn skip(report: &mut DiscoveryReport, err: PluginConstructionError) {
    warn!(error = %err, "Skipping core entry");
    report.issues.push(DiscoveryIssue::Entry(err));
}

fn build_descriptor(
    path: &Path,
    stem: &str,
    table: &DescriptorTable,
    host: HostFeatures,
) -> PluginDescriptor {
    let id = core_identifier(stem);
    let entry = table.get(stem).or_else(|| table.get(id));

    let display_name = entry
        .and_then(|e| e.display_name.clone())
        .unwrap_or_else(|| id.to_string());

    PluginDescriptor {
        path: path.to_path_buf(),
        display_name,
        supports_neon: host.neon,
        library_name: entry.and_then(|e| e.library_name.clone()),
        notes: entry.and_then(|e| e.notes.clone()),
    }
}

/// File name with its last extension removed.
fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

/// Bare core identifier: the stem without its library prefix.
fn core_identifier(stem: &str) -> &str {
    CORE_PREFIXES
        .iter()
        .find_map(|prefix| stem.strip_prefix(prefix).filter(|rest| !rest.is_empty()))
        .unwrap_or(stem)
}

fn is_neon_variant(stem: &str) -> bool {
    stem.to_ascii_lowercase().contains("neon")
}
