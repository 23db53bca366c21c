//! Compaction picking - deciding which files to merge next.
//!
//! The picker analyzes an immutable [`Version`] snapshot and determines:
//! - Whether compaction is warranted at all
//! - Which files to merge, and into which level
//! - What compression the output should use and where it should live
//! - How the chosen work stays disjoint from merges already in flight
//!
//! # Strategies
//!
//! - **Leveled**: each non-zero level is key-partitioned; a size-driven
//!   score picks a level, the largest file inside it seeds the merge, and
//!   overlapping parent-level files are attached.
//! - **Universal** (tiered): all data lives at level 0 as runs ordered by
//!   age; contiguous runs are merged to bound size amplification and file
//!   count.
//! - **FIFO**: a single level with a total-size cap enforced by deleting
//!   the oldest files.
//! - **Pluggable**: file selection is delegated to an external
//!   [`Compactor`], then validated by the input sanitizer.
//!
//! The picker only decides; executing the merge, writing tables and
//! persisting the outcome belong to the host engine.

pub mod fifo;
pub mod leveled;
pub mod picker;
pub mod pluggable;
pub mod universal;

pub use picker::{CompactionPicker, ManualCompaction};
pub use pluggable::{CompactionOptions, Compactor};

use std::sync::Arc;

use crate::options::Compression;
use crate::version::{FileMetadata, Version};

/// Output level value requesting a deletion-only compaction.
pub const DELETION_COMPACTION: i32 = -1;

/// The files a compaction reads from one level.
#[derive(Debug, Clone)]
pub struct CompactionInputFiles {
    /// Level these files live at.
    pub level: usize,
    /// Files at that level, in the level's storage order.
    pub files: Vec<Arc<FileMetadata>>,
}

impl CompactionInputFiles {
    /// Create an empty input set for a level.
    pub fn new(level: usize) -> Self {
        Self {
            level,
            files: Vec::new(),
        }
    }

    /// Number of files in this input set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the input set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A compaction decision produced by the picker.
///
/// Holds back-references to file descriptors owned by the snapshot; the
/// `Arc<Version>` keeps that snapshot alive until the executor hands the
/// decision back through
/// [`release_compaction_files`](CompactionPicker::release_compaction_files).
#[derive(Debug)]
pub struct Compaction {
    /// Picker-assigned identity, used to find this compaction in the
    /// in-flight set.
    pub(crate) id: u64,

    /// Snapshot this compaction was picked from.
    pub(crate) input_version: Arc<Version>,

    /// Level the compaction reads from.
    pub(crate) level: usize,

    /// Level the output is written to.
    pub(crate) output_level: usize,

    /// Input files per level: entry 0 holds `level` files, entry 1 holds
    /// the overlapping `output_level` files. Externally formed compactions
    /// may span more levels.
    pub(crate) inputs: Vec<CompactionInputFiles>,

    /// Files at `output_level + 1` overlapping the compaction, used
    /// downstream to bound output-file size.
    pub(crate) grandparents: Vec<Arc<FileMetadata>>,

    /// Target size for output files.
    pub(crate) max_output_file_size: u64,

    /// Output is split once it overlaps this many grandparent bytes.
    pub(crate) max_grandparent_overlap_bytes: u64,

    /// Storage path the output is written to.
    pub(crate) output_path_id: u32,

    /// Compression for the output.
    pub(crate) compression: Compression,

    /// Score of the level that triggered this compaction.
    pub(crate) score: f64,

    /// Index of the seed file within its level, kept as a search hint.
    pub(crate) base_index: Option<usize>,

    /// Index of the first overlapping parent file, kept as a search hint.
    pub(crate) parent_index: Option<usize>,

    /// Whether this compaction was requested by the user.
    pub(crate) is_manual_compaction: bool,

    /// Whether every level-0 file was picked (universal only).
    pub(crate) is_full_compaction: bool,

    /// Whether the output lands at the bottom of the tree.
    pub(crate) bottommost_level: bool,

    /// Whether the inputs are dropped without producing output.
    pub(crate) deletion_compaction: bool,
}

impl Compaction {
    /// Create an empty compaction from `level` into `output_level`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        input_version: Arc<Version>,
        level: usize,
        output_level: usize,
        max_output_file_size: u64,
        max_grandparent_overlap_bytes: u64,
        output_path_id: u32,
        compression: Compression,
    ) -> Self {
        Self {
            id,
            input_version,
            level,
            output_level,
            inputs: vec![
                CompactionInputFiles::new(level),
                CompactionInputFiles::new(output_level),
            ],
            grandparents: Vec::new(),
            max_output_file_size,
            max_grandparent_overlap_bytes,
            output_path_id,
            compression,
            score: 0.0,
            base_index: None,
            parent_index: None,
            is_manual_compaction: false,
            is_full_compaction: false,
            bottommost_level: false,
            deletion_compaction: false,
        }
    }

    /// Get the input level.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Get the output level.
    pub fn output_level(&self) -> usize {
        self.output_level
    }

    /// Number of input levels carrying files.
    pub fn num_input_levels(&self) -> usize {
        self.inputs.len()
    }

    /// Files taken from input level `which`.
    pub fn inputs(&self, which: usize) -> &[Arc<FileMetadata>] {
        &self.inputs[which].files
    }

    /// Number of files taken from input level `which`.
    pub fn num_input_files(&self, which: usize) -> usize {
        self.inputs[which].files.len()
    }

    /// One input file.
    pub fn input(&self, which: usize, i: usize) -> &Arc<FileMetadata> {
        &self.inputs[which].files[i]
    }

    /// Grandparent files overlapping this compaction.
    pub fn grandparents(&self) -> &[Arc<FileMetadata>] {
        &self.grandparents
    }

    /// Target size for output files.
    pub fn max_output_file_size(&self) -> u64 {
        self.max_output_file_size
    }

    /// Grandparent-overlap bound for output splitting.
    pub fn max_grandparent_overlap_bytes(&self) -> u64 {
        self.max_grandparent_overlap_bytes
    }

    /// Storage path chosen for the output.
    pub fn output_path_id(&self) -> u32 {
        self.output_path_id
    }

    /// Compression chosen for the output.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Score of the level that triggered this compaction.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Whether this compaction was requested by the user.
    pub fn is_manual_compaction(&self) -> bool {
        self.is_manual_compaction
    }

    /// Whether every level-0 file was picked.
    pub fn is_full_compaction(&self) -> bool {
        self.is_full_compaction
    }

    /// Whether the output lands at the bottom of the tree.
    pub fn bottommost_level(&self) -> bool {
        self.bottommost_level
    }

    /// Whether the inputs are dropped without producing output.
    pub fn is_deletion_compaction(&self) -> bool {
        self.deletion_compaction
    }

    /// Snapshot this compaction was picked from.
    pub fn input_version(&self) -> &Arc<Version> {
        &self.input_version
    }

    /// Total compensated bytes across all input levels.
    pub fn total_input_size(&self) -> u64 {
        self.inputs
            .iter()
            .flat_map(|input| input.files.iter())
            .map(|f| f.compensated_file_size())
            .sum()
    }

    /// Claim or release every input file.
    pub(crate) fn mark_files_being_compacted(&self, mark: bool) {
        for input in &self.inputs {
            for f in &input.files {
                debug_assert_ne!(f.being_compacted(), mark);
                f.set_being_compacted(mark);
            }
        }
    }

    /// The output lands at the bottom iff no deeper level holds files.
    pub(crate) fn setup_bottommost_level(&mut self) {
        self.bottommost_level = true;
        for level in (self.output_level + 1)..self.input_version.number_levels() {
            if !self.input_version.files(level).is_empty() {
                self.bottommost_level = false;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InternalKey;
    use crate::util::comparator::InternalKeyComparator;
    use bytes::Bytes;

    fn make_file(num: u64, size: u64, smallest: &str, largest: &str) -> Arc<FileMetadata> {
        Arc::new(FileMetadata::new(
            num,
            size,
            InternalKey::for_value(Bytes::copy_from_slice(smallest.as_bytes()), 1),
            InternalKey::for_value(Bytes::copy_from_slice(largest.as_bytes()), 1),
        ))
    }

    fn empty_version(num_levels: usize) -> Arc<Version> {
        Arc::new(Version::new(InternalKeyComparator::bytewise(), num_levels))
    }

    #[test]
    fn test_compaction_accessors() {
        let version = empty_version(7);
        let mut c = Compaction::new(1, version, 1, 2, 64, 640, 0, Compression::Snappy);
        c.inputs[0].files.push(make_file(1, 100, "a", "m"));
        c.inputs[1].files.push(make_file(2, 200, "b", "n"));

        assert_eq!(c.level(), 1);
        assert_eq!(c.output_level(), 2);
        assert_eq!(c.num_input_levels(), 2);
        assert_eq!(c.num_input_files(0), 1);
        assert_eq!(c.num_input_files(1), 1);
        assert_eq!(c.input(0, 0).file_number(), 1);
        assert_eq!(c.total_input_size(), 300);
        assert_eq!(c.compression(), Compression::Snappy);
        assert!(!c.is_manual_compaction());
        assert!(!c.is_deletion_compaction());
    }

    #[test]
    fn test_mark_files_being_compacted() {
        let version = empty_version(7);
        let mut c = Compaction::new(1, version, 1, 2, 64, 640, 0, Compression::None);
        c.inputs[0].files.push(make_file(1, 100, "a", "m"));
        c.inputs[1].files.push(make_file(2, 200, "b", "n"));

        c.mark_files_being_compacted(true);
        assert!(c.input(0, 0).being_compacted());
        assert!(c.input(1, 0).being_compacted());

        c.mark_files_being_compacted(false);
        assert!(!c.input(0, 0).being_compacted());
        assert!(!c.input(1, 0).being_compacted());
    }

    #[test]
    fn test_setup_bottommost_level() {
        let mut files = vec![Vec::new(); 4];
        files[3].push(make_file(9, 100, "a", "z"));
        let version = Arc::new(Version::with_files(
            InternalKeyComparator::bytewise(),
            files,
        ));

        let mut c = Compaction::new(1, Arc::clone(&version), 1, 2, 64, 640, 0, Compression::None);
        c.setup_bottommost_level();
        assert!(!c.bottommost_level());

        let mut c = Compaction::new(2, version, 2, 3, 64, 640, 0, Compression::None);
        c.setup_bottommost_level();
        assert!(c.bottommost_level());
    }
}
