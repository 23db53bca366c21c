//! Version management - immutable snapshots of active SSTable files.
//!
//! The version system provides:
//! - **FileMetadata**: Information about each SSTable file
//! - **Version**: Immutable snapshot of all files organized by level
//! - **ColumnFamilyMetaData**: The user-key view of a snapshot handed to
//!   external compactors and the input sanitizer
//!
//! # LSM-Tree File Organization
//!
//! ```text
//! Level 0:  [SST-1] [SST-2] [SST-3]  (overlapping keys, newest first)
//! Level 1:  [SST-4][SST-5][SST-6]    (non-overlapping, sorted)
//! Level 2:  [SST-7][SST-8][SST-9][SST-10]  (non-overlapping, sorted)
//! ...
//! ```

mod file_metadata;
#[allow(clippy::module_inception)]
mod version;

pub use file_metadata::FileMetadata;
pub use version::Version;

use bytes::Bytes;

/// User-key-level view of one SSTable, as exposed to external compactors.
#[derive(Debug, Clone)]
pub struct SstFileMetaData {
    /// Unique file number.
    pub file_number: u64,
    /// Raw file size in bytes.
    pub file_size: u64,
    /// Smallest user key in the file.
    pub smallest_key: Bytes,
    /// Largest user key in the file.
    pub largest_key: Bytes,
    /// Whether this file is claimed by a running compaction.
    pub being_compacted: bool,
}

/// The files of one level, in the level's storage order.
#[derive(Debug, Clone)]
pub struct LevelMetaData {
    /// Level index.
    pub level: usize,
    /// Files at this level, ordered as stored in the version.
    pub files: Vec<SstFileMetaData>,
}

/// Snapshot metadata for a whole column family.
#[derive(Debug, Clone)]
pub struct ColumnFamilyMetaData {
    /// Total raw bytes across all levels.
    pub size: u64,
    /// Total file count across all levels.
    pub file_count: usize,
    /// Per-level file lists; entry `l` describes level `l`.
    pub levels: Vec<LevelMetaData>,
}
