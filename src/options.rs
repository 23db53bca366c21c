//! Configuration options for compaction picking.

use std::path::PathBuf;

/// Default number of levels in the LSM tree.
pub const DEFAULT_NUM_LEVELS: usize = 7;

/// Default L0 file limit before compaction.
pub const DEFAULT_L0_COMPACTION_TRIGGER: usize = 4;

/// Default L1 size target (256MB).
pub const DEFAULT_L1_SIZE: u64 = 256 * 1024 * 1024;

/// Default level size multiplier.
pub const DEFAULT_LEVEL_MULTIPLIER: u64 = 10;

/// Default target file size for levels > 0 (64MB).
pub const DEFAULT_TARGET_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Default FIFO total-size cap (1GB).
pub const DEFAULT_FIFO_MAX_TABLE_FILES_SIZE: u64 = 1024 * 1024 * 1024;

/// Compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression.
    #[default]
    None,
    /// LZ4 compression (fast).
    Lz4,
    /// Snappy compression (very fast).
    Snappy,
}

impl Compression {
    /// Check if compression is enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

/// Strategy used to choose compactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompactionStyle {
    /// Size-scored, key-partitioned levels.
    #[default]
    Leveled,
    /// Tiered runs on level 0, merged by age.
    Universal,
    /// Oldest-first deletion against a total-size cap.
    Fifo,
    /// Selection is delegated to an external [`Compactor`].
    ///
    /// [`Compactor`]: crate::compaction::Compactor
    Pluggable,
}

/// Stopping rule for collecting a run of files in universal compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopStyle {
    /// Compare the next file against the running total of the run.
    #[default]
    TotalSize,
    /// Compare the next file against the last picked file, both ways.
    SimilarSize,
}

/// A storage target with a size budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPath {
    /// Directory holding table files.
    pub path: PathBuf,
    /// Bytes this path is expected to hold.
    pub target_size: u64,
}

impl DbPath {
    /// Create a new path entry.
    pub fn new(path: impl Into<PathBuf>, target_size: u64) -> Self {
        Self {
            path: path.into(),
            target_size,
        }
    }
}

/// Options for the universal (tiered) strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniversalCompactionOptions {
    /// Percentage slack when comparing run size against the next file.
    pub size_ratio: u32,
    /// Minimum number of files in a size-ratio run.
    pub min_merge_width: usize,
    /// Maximum number of files merged in one shot.
    pub max_merge_width: usize,
    /// Size-amplification trigger, as a percentage of the oldest file.
    pub max_size_amplification_percent: u64,
    /// Once this percentage of level bytes sits in older files, newer
    /// output is written uncompressed. Negative disables the rule.
    pub compression_size_percent: i32,
    /// Stopping rule for run collection.
    pub stop_style: StopStyle,
}

impl Default for UniversalCompactionOptions {
    fn default() -> Self {
        Self {
            size_ratio: 1,
            min_merge_width: 2,
            max_merge_width: usize::MAX,
            max_size_amplification_percent: 200,
            compression_size_percent: -1,
            stop_style: StopStyle::TotalSize,
        }
    }
}

/// Options for the FIFO strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoCompactionOptions {
    /// Total table-file bytes retained before the oldest files are dropped.
    pub max_table_files_size: u64,
}

impl Default for FifoCompactionOptions {
    fn default() -> Self {
        Self {
            max_table_files_size: DEFAULT_FIFO_MAX_TABLE_FILES_SIZE,
        }
    }
}

/// Options fixed for the lifetime of a column family.
#[derive(Debug, Clone)]
pub struct ImmutableOptions {
    /// Number of levels in the tree.
    pub num_levels: usize,

    /// Strategy used to pick compactions.
    pub compaction_style: CompactionStyle,

    /// Compression for output files.
    pub compression: Compression,

    /// Per-level compression override. When non-empty, output at level `l`
    /// uses entry `min(l, len - 1)`.
    pub compression_per_level: Vec<Compression>,

    /// Ordered storage targets for output placement.
    pub db_paths: Vec<DbPath>,

    /// Universal-strategy tuning.
    pub universal: UniversalCompactionOptions,

    /// FIFO-strategy tuning.
    pub fifo: FifoCompactionOptions,
}

impl Default for ImmutableOptions {
    fn default() -> Self {
        Self {
            num_levels: DEFAULT_NUM_LEVELS,
            compaction_style: CompactionStyle::default(),
            compression: Compression::default(),
            compression_per_level: Vec::new(),
            db_paths: Vec::new(),
            universal: UniversalCompactionOptions::default(),
            fifo: FifoCompactionOptions::default(),
        }
    }
}

impl ImmutableOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_levels == 0 {
            return Err(crate::Error::invalid_argument(
                "num_levels must be at least 1",
            ));
        }

        if self.compaction_style == CompactionStyle::Fifo && self.num_levels != 1 {
            return Err(crate::Error::invalid_argument(
                "FIFO compaction requires num_levels == 1",
            ));
        }

        if self.fifo.max_table_files_size == 0 {
            return Err(crate::Error::invalid_argument(
                "fifo.max_table_files_size must be non-zero",
            ));
        }

        if self.universal.min_merge_width < 2 {
            return Err(crate::Error::invalid_argument(
                "universal.min_merge_width must be at least 2",
            ));
        }

        if self.universal.max_merge_width < self.universal.min_merge_width {
            return Err(crate::Error::invalid_argument(
                "universal.max_merge_width must be >= min_merge_width",
            ));
        }

        Ok(())
    }

    /// Compression for output files placed at `level`.
    pub fn compression_for_level(&self, level: usize) -> Compression {
        if self.compression_per_level.is_empty() {
            self.compression
        } else {
            // Clamp: levels beyond the configured list reuse the last entry.
            let n = self.compression_per_level.len() - 1;
            self.compression_per_level[level.min(n)]
        }
    }
}

/// Options that may change between picks.
#[derive(Debug, Clone, Copy)]
pub struct MutableOptions {
    /// Number of L0 files that triggers compaction.
    pub level0_file_num_compaction_trigger: usize,

    /// Target size for level 1.
    pub max_bytes_for_level_base: u64,

    /// Size multiplier for each level past 1.
    pub max_bytes_for_level_multiplier: u64,

    /// Target file size for levels > 0.
    pub target_file_size_base: u64,

    /// File size multiplier for each level.
    pub target_file_size_multiplier: u64,

    /// Cap on expanded input size, in units of the level's target file
    /// size.
    pub expanded_compaction_factor: u64,

    /// Cap on a manual-compaction batch, in units of the level's target
    /// file size.
    pub source_compaction_factor: u64,

    /// Cap on grandparent overlap, in units of the level's target file
    /// size.
    pub max_grandparent_overlap_factor: u64,
}

impl Default for MutableOptions {
    fn default() -> Self {
        Self {
            level0_file_num_compaction_trigger: DEFAULT_L0_COMPACTION_TRIGGER,
            max_bytes_for_level_base: DEFAULT_L1_SIZE,
            max_bytes_for_level_multiplier: DEFAULT_LEVEL_MULTIPLIER,
            target_file_size_base: DEFAULT_TARGET_FILE_SIZE,
            target_file_size_multiplier: 1,
            expanded_compaction_factor: 25,
            source_compaction_factor: 1,
            max_grandparent_overlap_factor: 10,
        }
    }
}

impl MutableOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the maximum size for a given level.
    ///
    /// Level 0 is triggered by file count, not size, so this applies to
    /// levels >= 1 only.
    pub fn max_bytes_for_level(&self, level: usize) -> u64 {
        debug_assert!(level >= 1);
        let mut size = self.max_bytes_for_level_base;
        for _ in 1..level {
            size = size.saturating_mul(self.max_bytes_for_level_multiplier);
        }
        size
    }

    /// Calculate the target output-file size for a given level.
    pub fn max_file_size_for_level(&self, level: usize) -> u64 {
        let mut size = self.target_file_size_base;
        for _ in 0..level {
            size = size.saturating_mul(self.target_file_size_multiplier);
        }
        size
    }

    /// Byte limit on laterally grown compaction inputs at `level`.
    pub fn expanded_compaction_byte_size_limit(&self, level: usize) -> u64 {
        self.max_file_size_for_level(level)
            .saturating_mul(self.expanded_compaction_factor)
    }

    /// Byte limit on grandparent overlap for a compaction from `level`.
    pub fn max_grandparent_overlap_bytes(&self, level: usize) -> u64 {
        self.max_file_size_for_level(level)
            .saturating_mul(self.max_grandparent_overlap_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ImmutableOptions::default();
        assert_eq!(opts.num_levels, DEFAULT_NUM_LEVELS);
        assert_eq!(opts.compaction_style, CompactionStyle::Leveled);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_options_validation() {
        let mut opts = ImmutableOptions::default();
        opts.num_levels = 0;
        assert!(opts.validate().is_err());

        let mut opts = ImmutableOptions::default();
        opts.compaction_style = CompactionStyle::Fifo;
        assert!(opts.validate().is_err()); // 7 levels
        opts.num_levels = 1;
        assert!(opts.validate().is_ok());

        let mut opts = ImmutableOptions::default();
        opts.universal.min_merge_width = 1;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_level_size_calculation() {
        let opts = MutableOptions::default();

        assert_eq!(opts.max_bytes_for_level(1), DEFAULT_L1_SIZE);
        assert_eq!(
            opts.max_bytes_for_level(2),
            DEFAULT_L1_SIZE * DEFAULT_LEVEL_MULTIPLIER
        );
    }

    #[test]
    fn test_derived_limits() {
        let opts = MutableOptions {
            target_file_size_base: 64,
            target_file_size_multiplier: 2,
            expanded_compaction_factor: 25,
            max_grandparent_overlap_factor: 10,
            ..Default::default()
        };

        assert_eq!(opts.max_file_size_for_level(0), 64);
        assert_eq!(opts.max_file_size_for_level(2), 256);
        assert_eq!(opts.expanded_compaction_byte_size_limit(1), 128 * 25);
        assert_eq!(opts.max_grandparent_overlap_bytes(1), 128 * 10);
    }

    #[test]
    fn test_compression_for_level() {
        let mut opts = ImmutableOptions::default();
        opts.compression = Compression::Snappy;
        assert_eq!(opts.compression_for_level(3), Compression::Snappy);

        opts.compression_per_level =
            vec![Compression::None, Compression::Lz4, Compression::Snappy];
        assert_eq!(opts.compression_for_level(0), Compression::None);
        assert_eq!(opts.compression_for_level(1), Compression::Lz4);
        assert_eq!(opts.compression_for_level(2), Compression::Snappy);
        // Past the end of the list the last entry applies.
        assert_eq!(opts.compression_for_level(6), Compression::Snappy);
    }
}
