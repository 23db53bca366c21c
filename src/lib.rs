//! # compaction-picker
//!
//! The compaction-decision core of an LSM-tree storage engine.
//!
//! Given an immutable [`Version`] snapshot of a column family's on-disk
//! file arrangement, the picker decides which files to merge next, at what
//! level to place the output, with what compression, and under which
//! non-overlap guarantees with respect to merges already in flight. It is
//! a library component: the host engine owns the lock serializing calls,
//! the executor running merges, and the manifest recording outcomes.
//!
//! ## Strategies
//!
//! - **Leveled**: size-scored, key-partitioned levels
//! - **Universal**: tiered, age-ordered runs on level 0
//! - **FIFO**: oldest-first deletion against a total-size cap
//! - **Pluggable**: selection delegated to an external [`Compactor`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use compaction_picker::{
//!     CompactionPicker, ImmutableOptions, InternalKeyComparator, MutableOptions,
//! };
//!
//! let ioptions = Arc::new(ImmutableOptions::default());
//! let mut picker = CompactionPicker::new(ioptions, InternalKeyComparator::bytewise());
//!
//! // Under the column-family lock:
//! if let Some(compaction) = picker.pick_compaction(&mutable, &version) {
//!     // hand `compaction` to the background executor ...
//!     picker.release_compaction_files(&compaction, Ok(()));
//! }
//! ```

// Public modules
pub mod compaction;
pub mod error;
pub mod options;
pub mod types;
pub mod util;
pub mod version;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use options::{
    CompactionStyle, Compression, DbPath, FifoCompactionOptions, ImmutableOptions,
    MutableOptions, StopStyle, UniversalCompactionOptions,
};
pub use types::{InternalKey, ValueType};

// Comparators
pub use util::comparator::{BytewiseComparator, Comparator, InternalKeyComparator};

// Snapshot types
pub use version::{ColumnFamilyMetaData, FileMetadata, LevelMetaData, SstFileMetaData, Version};

// Picker
pub use compaction::picker::total_compensated_file_size;
pub use compaction::{
    Compaction, CompactionInputFiles, CompactionOptions, CompactionPicker, Compactor,
    ManualCompaction, DELETION_COMPACTION,
};
