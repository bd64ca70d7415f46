//! Asset synchronization.
//!
//! Mirrors each configured [`AssetGroup`] from the read-only bundle into
//! the writable data directory, at most once per software version.
//!
//! A pass reads the version stamp and returns straight away when it
//! matches the running version. Otherwise every group is extracted in
//! turn, and the stamp is rewritten once all groups were attempted. Any
//! stamp read failure counts as "never extracted". A failed group is
//! logged and does not stop its siblings.
//!
//! A pass killed mid-extraction leaves the old stamp in place, so the
//! next run extracts again from scratch.

use crate::config::{AssetGroup, StampPolicy, SyncConfig};
use crate::error::GroupExtractionError;
use crate::stamp::{read_stamp, write_stamp};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// A node of the bundled resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetNode {
    /// Child names, in listing order.
    Directory(Vec<String>),
    File(Vec<u8>),
}

/// Read-only bundled resource tree, addressed by relative path.
pub trait AssetSource {
    fn node(&self, relative: &Path) -> io::Result<AssetNode>;
}

/// Bundle stored as a plain directory tree on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectorySource {
    fn node(&self, relative: &Path) -> io::Result<AssetNode> {
        let path = self.root.join(relative);
        if fs::metadata(&path)?.is_dir() {
            let mut children = Vec::new();
            for entry in fs::read_dir(&path)? {
                let name = entry?.file_name();
                let name = name.into_string().map_err(|raw| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("non UTF-8 asset name {:?}", raw),
                    )
                })?;
                children.push(name);
            }
            children.sort();
            Ok(AssetNode::Directory(children))
        } else {
            Ok(AssetNode::File(fs::read(&path)?))
        }
    }
}

/// Bundle held in memory, keyed by `/`-separated relative file paths.
/// Directories are implied by the file paths beneath them.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(path.trim_matches('/').to_string(), contents.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn node(&self, relative: &Path) -> io::Result<AssetNode> {
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if let Some(contents) = self.files.get(&key) {
            return Ok(AssetNode::File(contents.clone()));
        }

        let prefix = if key.is_empty() { String::new() } else { format!("{key}/") };
        let mut children: Vec<String> = Vec::new();
        for path in self.files.keys().filter(|p| p.starts_with(&prefix)) {
            let child = path[prefix.len()..].split('/').next().unwrap_or_default();
            if children.last().map(String::as_str) != Some(child) {
                children.push(child.to_string());
            }
        }

        if children.is_empty() {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no bundled asset at {key:?}"),
            ))
        } else {
            Ok(AssetNode::Directory(children))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Stamp matched the running version; nothing was touched.
    Skipped,
    Extracted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub files_written: usize,
    /// Set when the group stopped early.
    pub error: Option<String>,
}

impl GroupReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub version: u32,
    /// Stamp found on disk, `None` when missing or unreadable.
    pub previous_stamp: Option<u32>,
    pub outcome: SyncOutcome,
    pub groups: Vec<GroupReport>,
    pub stamp_written: bool,
    pub finished_at: String,
}

/// One asset synchronization pass over a bundle.
pub struct AssetSync<S> {
    source: S,
    config: SyncConfig,
    version: u32,
}

impl<S: AssetSource> AssetSync<S> {
    pub fn new(source: S, config: SyncConfig, version: u32) -> Self {
        Self {
            source,
            config,
            version,
        }
    }

    pub fn run(&self) -> SyncReport {
        let stamp_path = self.config.stamp_path();

        let previous_stamp = match read_stamp(&stamp_path) {
            Ok(stamp) => Some(stamp),
            Err(e) => {
                debug!(error = %e, "No usable cache stamp, extraction required");
                None
            }
        };

        if previous_stamp == Some(self.version) {
            info!(version = self.version, "Assets already extracted, skipping");
            return self.report(previous_stamp, SyncOutcome::Skipped, Vec::new(), false);
        }

        info!(
            version = self.version,
            previous = ?previous_stamp,
            "Extracting bundled assets"
        );

        let groups: Vec<GroupReport> = self
            .config
            .groups
            .iter()
            .map(|group| self.extract_group(group))
            .collect();

        let may_advance = match self.config.stamp_policy {
            StampPolicy::AlwaysAdvance => true,
            StampPolicy::RequireAllGroups => groups.iter().all(GroupReport::succeeded),
        };

        let stamp_written = if may_advance {
            match write_stamp(&stamp_path, self.version) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to record cache version, assets will be re-extracted");
                    false
                }
            }
        } else {
            warn!(version = self.version, "Leaving cache stamp unchanged after group failure");
            false
        };

        self.report(previous_stamp, SyncOutcome::Extracted, groups, stamp_written)
    }

    fn extract_group(&self, group: &AssetGroup) -> GroupReport {
        info!(group = %group.name, "Extracting asset group");
        let mut written = 0;
        let target_root = self.config.data_dir.join(&group.target);

        let error = match self.extract_node(group, &group.source, &target_root, &mut written) {
            Ok(()) => {
                debug!(group = %group.name, files = written, "Asset group extracted");
                None
            }
            Err(e) => {
                warn!(error = %e, files = written, "Asset group extraction failed");
                Some(e.to_string())
            }
        };

        GroupReport {
            name: group.name.clone(),
            files_written: written,
            error,
        }
    }

    fn extract_node(
        &self,
        group: &AssetGroup,
        relative: &Path,
        target: &Path,
        written: &mut usize,
    ) -> Result<(), GroupExtractionError> {
        let to_err = |path: &Path, source: io::Error| GroupExtractionError {
            group: group.name.clone(),
            path: path.to_path_buf(),
            source,
        };

        match self.source.node(relative).map_err(|e| to_err(relative, e))? {
            AssetNode::Directory(children) => {
                for child in children {
                    self.extract_node(group, &relative.join(&child), &target.join(&child), written)?;
                }
            }
            AssetNode::File(contents) => {
                write_leaf(target, &contents).map_err(|e| to_err(target, e))?;
                debug!(path = %target.display(), bytes = contents.len(), "Extracted asset");
                *written += 1;
            }
        }
        Ok(())
    }

    fn report(
        &self,
        previous_stamp: Option<u32>,
        outcome: SyncOutcome,
        groups: Vec<GroupReport>,
        stamp_written: bool,
    ) -> SyncReport {
        SyncReport {
            version: self.version,
            previous_stamp,
            outcome,
            groups,
            stamp_written,
            finished_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Runs a sync pass on a named background thread.
pub fn spawn_sync<S>(source: S, config: SyncConfig, version: u32) -> io::Result<JoinHandle<SyncReport>>
where
    S: AssetSource + Send + 'static,
{
    thread::Builder::new()
        .name("asset-sync".into())
        .spawn(move || AssetSync::new(source, config, version).run())
}

/// Drops the stamp so the next pass re-extracts every group.
pub fn clear_cache(config: &SyncConfig) -> io::Result<()> {
    match fs::remove_file(config.stamp_path()) {
        Ok(()) => {
            info!(path = %config.stamp_path().display(), "Cleared asset cache stamp");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn write_leaf(target: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(target)?);
    writer.write_all(contents)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_source_lists_directories() {
        let source = MemorySource::new()
            .with_file("shaders/crt/a.glsl", "A")
            .with_file("shaders/crt/b.glsl", "B")
            .with_file("shaders/c.glsl", "C")
            .with_file("overlays/pad.cfg", "P");

        assert_eq!(
            source.node(Path::new("")).unwrap(),
            AssetNode::Directory(vec!["overlays".into(), "shaders".into()])
        );
        assert_eq!(
            source.node(Path::new("shaders")).unwrap(),
            AssetNode::Directory(vec!["c.glsl".into(), "crt".into()])
        );
        assert_eq!(
            source.node(Path::new("shaders/crt/b.glsl")).unwrap(),
            AssetNode::File(b"B".to_vec())
        );
        assert_eq!(
            source.node(Path::new("shader")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn directory_source_reads_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("overlays/gamepads")).unwrap();
        fs::write(dir.path().join("overlays/gamepads/pad.cfg"), "pad").unwrap();
        fs::write(dir.path().join("overlays/a.png"), [1, 2, 3]).unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(
            source.node(Path::new("overlays")).unwrap(),
            AssetNode::Directory(vec!["a.png".into(), "gamepads".into()])
        );
        assert_eq!(
            source.node(Path::new("overlays/a.png")).unwrap(),
            AssetNode::File(vec![1, 2, 3])
        );
        assert!(source.node(Path::new("missing")).is_err());
    }

    #[test]
    fn nested_files_get_parent_directories() {
        let data = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("shaders_glsl/crt/deep/x.glsl", "X");
        let config = SyncConfig::new("unused", data.path());

        let report = AssetSync::new(source, config, 3).run();

        assert_eq!(report.outcome, SyncOutcome::Extracted);
        assert_eq!(
            fs::read(data.path().join("shaders_glsl/crt/deep/x.glsl")).unwrap(),
            b"X"
        );
        // The overlays group is absent from this bundle.
        assert!(report.groups[0].succeeded());
        assert!(!report.groups[1].succeeded());
        assert!(report.stamp_written);
    }

    #[test]
    fn require_all_groups_holds_stamp_back() {
        let data = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("shaders_glsl/a.glsl", "A");
        let mut config = SyncConfig::new("unused", data.path());
        config.stamp_policy = StampPolicy::RequireAllGroups;

        let report = AssetSync::new(source, config.clone(), 7).run();
        assert!(!report.stamp_written);
        assert!(!config.stamp_path().exists());
        assert_eq!(fs::read(data.path().join("shaders_glsl/a.glsl")).unwrap(), b"A");
    }

    #[test]
    fn stamp_write_failure_is_reported_not_fatal() {
        let data = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("overlays/a.cfg", "A");
        let mut config = SyncConfig::new("unused", data.path());
        config.groups = vec![AssetGroup::mirrored("overlays", "overlays")];
        // A directory in the stamp's place makes the final rename fail.
        fs::create_dir(config.stamp_path()).unwrap();
        fs::write(config.stamp_path().join("keep"), "").unwrap();

        let report = AssetSync::new(source, config, 2).run();
        assert_eq!(report.outcome, SyncOutcome::Extracted);
        assert!(report.groups[0].succeeded());
        assert!(!report.stamp_written);
    }

    #[test]
    fn clear_cache_forces_reextraction() {
        let data = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("overlays/a.cfg", "A");
        let mut config = SyncConfig::new("unused", data.path());
        config.groups = vec![AssetGroup::mirrored("overlays", "overlays")];

        let sync = AssetSync::new(source, config.clone(), 4);
        assert_eq!(sync.run().outcome, SyncOutcome::Extracted);
        assert_eq!(sync.run().outcome, SyncOutcome::Skipped);

        clear_cache(&config).unwrap();
        clear_cache(&config).unwrap();
        assert_eq!(sync.run().outcome, SyncOutcome::Extracted);
    }

    #[test]
    fn spawned_sync_returns_report() {
        let data = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_file("overlays/a.cfg", "A");
        let mut config = SyncConfig::new("unused", data.path());
        config.groups = vec![AssetGroup::mirrored("overlays", "overlays")];

        let report = spawn_sync(source, config, 9).unwrap().join().unwrap();
        assert_eq!(report.version, 9);
        assert_eq!(report.groups[0].files_written, 1);
    }
}
