//! Per-node statistics and size-bucket histograms
//!
//! A [`FsNodeRecord`] is created once per visited entry. Files land in
//! exactly one [`SizeBucket`] at creation time; directories start empty and
//! only ever change through [`FsNodeRecord::merge`].

use std::path::{Component, Path};
use tracing::warn;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

/// Default threshold above which a file is persisted on its own
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 200 * MIB;

/// Size class a file is assigned to
///
/// | bucket | range |
/// |---|---|
/// | `S`   | `size <= 512 KiB` |
/// | `M`   | `512 KiB < size < 4 MiB` |
/// | `L`   | `4 MiB <= size < 50 MiB` |
/// | `XL`  | `50 MiB <= size <= 200 MiB` |
/// | `XXL` | `size > 200 MiB` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum SizeBucket {
    S = 0,
    M = 1,
    L = 2,
    Xl = 3,
    Xxl = 4,
}

impl SizeBucket {
    pub const ALL: [SizeBucket; 5] = [
        SizeBucket::S,
        SizeBucket::M,
        SizeBucket::L,
        SizeBucket::Xl,
        SizeBucket::Xxl,
    ];

    /// Classify a file size. Total over `u64`: every size maps to one bucket.
    pub fn classify(size: u64) -> Self {
        match size {
            s if s <= 512 * KIB => SizeBucket::S,
            s if s < 4 * MIB => SizeBucket::M,
            s if s < 50 * MIB => SizeBucket::L,
            s if s <= 200 * MIB => SizeBucket::Xl,
            _ => SizeBucket::Xxl,
        }
    }

    /// Short label used in reports and column names
    pub fn label(self) -> &'static str {
        match self {
            SizeBucket::S => "S",
            SizeBucket::M => "M",
            SizeBucket::L => "L",
            SizeBucket::Xl => "XL",
            SizeBucket::Xxl => "XXL",
        }
    }

    /// Human description of the range
    pub fn range(self) -> &'static str {
        match self {
            SizeBucket::S => "0 - 512 KiB",
            SizeBucket::M => "512 KiB - 4 MiB",
            SizeBucket::L => "4 MiB - 50 MiB",
            SizeBucket::Xl => "50 MiB - 200 MiB",
            SizeBucket::Xxl => "above 200 MiB",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// File count and cumulative bytes for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketTally {
    pub count: u32,
    pub size: u64,
}

impl BucketTally {
    fn add(&mut self, other: &BucketTally) {
        self.count += other.count;
        self.size += other.size;
    }
}

/// Statistics for one visited filesystem entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsNodeRecord {
    /// Unique id, never reused
    pub id: u32,

    /// Id of the enclosing directory (0 for the scan root)
    pub parent_id: u32,

    /// Path relative to the scan root, always starting with `/`
    pub path: String,

    pub is_dir: bool,

    /// File length, or the directory entry's own size plus everything merged into it
    pub size: u64,

    /// Number of file descendants (1 for a file)
    pub count: u32,

    /// Per-bucket tallies, indexed by [`SizeBucket`]
    pub buckets: [BucketTally; 5],
}

impl FsNodeRecord {
    /// Build a file record; exactly one bucket is incremented.
    pub fn file(id: u32, parent_id: u32, path: String, size: u64) -> Self {
        let mut buckets = [BucketTally::default(); 5];
        buckets[SizeBucket::classify(size).index()] = BucketTally { count: 1, size };

        Self {
            id,
            parent_id,
            path,
            is_dir: false,
            size,
            count: 1,
            buckets,
        }
    }

    /// Build an empty directory record. The entry size is never classified.
    pub fn directory(id: u32, parent_id: u32, path: String, size: u64) -> Self {
        Self {
            id,
            parent_id,
            path,
            is_dir: true,
            size,
            count: 0,
            buckets: [BucketTally::default(); 5],
        }
    }

    /// Add every numeric field of `child` into `self`.
    ///
    /// Commutative and associative across children, and a zeroed record is
    /// the identity. Identity fields (`id`, `parent_id`, `path`, `is_dir`)
    /// are left alone.
    pub fn merge(&mut self, child: &FsNodeRecord) {
        self.size += child.size;
        self.count += child.count;
        for (mine, theirs) in self.buckets.iter_mut().zip(child.buckets.iter()) {
            mine.add(theirs);
        }
    }

    pub fn bucket(&self, bucket: SizeBucket) -> &BucketTally {
        &self.buckets[bucket.index()]
    }

    /// Sum of bucket counts; equals `count` for every well-formed record
    pub fn bucket_count_total(&self) -> u32 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Total bytes of all files at or below this node
    pub fn file_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.size).sum()
    }
}

/// Normalize `path` to a `/`-separated path relative to `root`.
///
/// The result always starts with `/` and never ends with one; the root
/// itself becomes `/`.
///
/// Components that are not valid UTF-8 are converted lossily, with invalid
/// sequences replaced by U+FFFD, so two distinct names can map to the same
/// string. Each lossy conversion is logged as a warning. Ids, not paths,
/// identify rows.
pub fn node_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut lossy = false;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => {
                lossy |= part.to_str().is_none();
                Some(part.to_string_lossy())
            }
            _ => None,
        })
        .collect();

    if lossy {
        warn!(path = %path.display(), "Path is not valid UTF-8, stored lossily");
    }

    format!("/{}", parts.join("/"))
}
