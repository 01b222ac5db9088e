//! Migration discovery.
//!
//! Migrations either arrive as an explicit list from the caller or are
//! discovered from a directory-like collaborator whose entries follow the
//! leading-digits naming convention.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::{parse_version, Migration};
use std::io;
use std::path::{Path, PathBuf};

/// One entry of a [`ScriptDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Anything that can list named scripts and read them back as text.
pub trait ScriptDirectory {
    /// Human-readable location, used in error messages.
    fn location(&self) -> String;

    /// List every entry, directories included.
    fn entries(&self) -> io::Result<Vec<ScriptEntry>>;

    /// Read the full text of the entry called `name`.
    fn read_script(&self, name: &str) -> io::Result<String>;
}

/// A [`ScriptDirectory`] backed by a filesystem directory.
#[derive(Debug, Clone)]
pub struct FsScriptDirectory {
    root: PathBuf,
}

impl FsScriptDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScriptDirectory for FsScriptDirectory {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn entries(&self) -> io::Result<Vec<ScriptEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            // Follows symlinks, so a link to a directory counts as one.
            let is_dir = entry.path().is_dir();
            entries.push(ScriptEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn read_script(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(name))
    }
}

/// Where a run's migrations come from.
#[derive(Debug, Clone)]
pub enum MigrationSource {
    /// Caller-supplied migrations; discovery is skipped.
    List(Vec<Migration>),
    /// A filesystem directory of numbered scripts.
    Directory(PathBuf),
}

impl MigrationSource {
    /// Produce the (unsorted) migration set.
    pub fn load(&self) -> MigrateResult<Vec<Migration>> {
        match self {
            MigrationSource::List(migrations) => Ok(migrations.clone()),
            MigrationSource::Directory(path) => discover(&FsScriptDirectory::new(path)),
        }
    }
}

/// Discover migrations from the non-directory entries of `dir`.
///
/// Entries are visited in name order so the first invalid name reported is
/// stable across platforms. The returned set is not sorted by version.
pub fn discover(dir: &dyn ScriptDirectory) -> MigrateResult<Vec<Migration>> {
    let discovery_error = |source: io::Error| MigrateError::Discovery {
        location: dir.location(),
        source,
    };

    let mut entries = dir.entries().map_err(discovery_error)?;
    entries.retain(|entry| !entry.is_dir);
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut migrations = Vec::with_capacity(entries.len());
    for entry in entries {
        let version = parse_version(&entry.name)?;
        let script = dir.read_script(&entry.name).map_err(|e| MigrateError::Discovery {
            location: format!("{}/{}", dir.location(), entry.name),
            source: e,
        })?;
        migrations.push(Migration::from_parts(version, entry.name, script));
    }

    log::debug!(
        "Discovered {} migration(s) in {}",
        migrations.len(),
        dir.location()
    );
    Ok(migrations)
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
