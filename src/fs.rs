//! Local filesystem access used by the walker
//!
//! Two operations: `stat` a path and list a directory's immediate children.
//! Neither follows symbolic links, so a link is reported as a link and never
//! traversed or sized.

use crate::error::{FsError, FsResult};
use std::fs::{FileType, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Block or character device, fifo, socket, or anything else
    Other,
}

impl EntryKind {
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Whether the walker descends into / sizes this kind of entry
    pub fn is_supported(&self) -> bool {
        matches!(self, EntryKind::File | EntryKind::Directory)
    }
}

/// Result of a `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    pub kind: EntryKind,
    pub size: u64,
}

impl NodeStat {
    fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(metadata.file_type()),
            size: metadata.len(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// One immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Stat `path` without following a trailing symlink.
pub async fn stat(path: &Path) -> FsResult<NodeStat> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => Ok(NodeStat::from_metadata(&metadata)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(FsError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(FsError::StatFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Immediate children of a directory, plus how many entries were left out
#[derive(Debug, Default)]
pub struct Listing {
    pub children: Vec<ChildEntry>,
    pub skipped: u64,
}

/// List the children of `dir` that the walker traverses.
///
/// Only regular files and directories are returned, in name order.
/// Everything else is logged as a warning and counted in `skipped`.
pub async fn list_children(dir: &Path) -> FsResult<Listing> {
    let read_err = |source: std::io::Error| FsError::ReadDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut listing = Listing::default();

    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_type = entry.file_type().await.map_err(read_err)?;
        let kind = EntryKind::from_file_type(file_type);
        let path = entry.path();

        if !kind.is_supported() {
            warn!(path = %path.display(), kind = ?kind, "Skipping unsupported entry");
            listing.skipped += 1;
            continue;
        }

        listing.children.push(ChildEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            kind,
        });
    }

    listing.children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}
