//! File metadata for SSTable files.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::InternalKey;

/// Metadata about an SSTable file.
///
/// Contains all information needed to identify an SSTable and reason about
/// its key range. The descriptor itself is immutable once built, except for
/// the `being_compacted` claim flag, which the picker toggles under the
/// host's column-family lock.
#[derive(Debug)]
pub struct FileMetadata {
    /// Unique file number.
    file_number: u64,
    /// Index of the storage path holding this file.
    path_id: u32,
    /// Raw file size in bytes.
    file_size: u64,
    /// Raw size adjusted upward for tombstones and overwritten keys, to
    /// bias compaction toward delete-heavy files.
    compensated_file_size: u64,
    /// Smallest key in the file.
    smallest: InternalKey,
    /// Largest key in the file.
    largest: InternalKey,
    /// Smallest sequence number in the file.
    smallest_seqno: u64,
    /// Largest sequence number in the file.
    largest_seqno: u64,
    /// Whether this file is claimed by a running compaction.
    being_compacted: AtomicBool,
}

impl FileMetadata {
    /// Create new file metadata.
    ///
    /// The compensated size starts equal to the raw size and the sequence
    /// bounds are taken from the boundary keys.
    pub fn new(
        file_number: u64,
        file_size: u64,
        smallest: InternalKey,
        largest: InternalKey,
    ) -> Self {
        let smallest_seqno = smallest.sequence().min(largest.sequence());
        let largest_seqno = smallest.sequence().max(largest.sequence());

        Self {
            file_number,
            path_id: 0,
            file_size,
            compensated_file_size: file_size,
            smallest,
            largest,
            smallest_seqno,
            largest_seqno,
            being_compacted: AtomicBool::new(false),
        }
    }

    /// Override the compensated size.
    pub fn set_compensated_file_size(&mut self, size: u64) {
        self.compensated_file_size = size;
    }

    /// Override the storage path index.
    pub fn set_path_id(&mut self, path_id: u32) {
        self.path_id = path_id;
    }

    /// Override the sequence-number bounds.
    pub fn set_seqnos(&mut self, smallest: u64, largest: u64) {
        debug_assert!(smallest <= largest);
        self.smallest_seqno = smallest;
        self.largest_seqno = largest;
    }

    /// Get the file number.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Get the storage path index.
    pub fn path_id(&self) -> u32 {
        self.path_id
    }

    /// Get the raw file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the compensated file size.
    pub fn compensated_file_size(&self) -> u64 {
        self.compensated_file_size
    }

    /// Get the smallest key.
    pub fn smallest(&self) -> &InternalKey {
        &self.smallest
    }

    /// Get the largest key.
    pub fn largest(&self) -> &InternalKey {
        &self.largest
    }

    /// Get the smallest sequence number.
    pub fn smallest_seqno(&self) -> u64 {
        self.smallest_seqno
    }

    /// Get the largest sequence number.
    pub fn largest_seqno(&self) -> u64 {
        self.largest_seqno
    }

    /// Check if the file is claimed by a running compaction.
    pub fn being_compacted(&self) -> bool {
        self.being_compacted.load(Ordering::Relaxed)
    }

    /// Claim or release the file.
    ///
    /// Callers hold the host's column-family lock; the atomic only makes
    /// the flag readable through the shared `Arc`.
    pub fn set_being_compacted(&self, value: bool) {
        self.being_compacted.store(value, Ordering::Relaxed);
    }
}

impl PartialEq for FileMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.file_number == other.file_number
    }
}

impl Eq for FileMetadata {}
