//! Version - immutable snapshot of active SSTable files.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::options::{CompactionStyle, ImmutableOptions, MutableOptions};
use crate::types::InternalKey;
use crate::util::comparator::InternalKeyComparator;

use super::{ColumnFamilyMetaData, FileMetadata, LevelMetaData, SstFileMetaData};

/// An immutable snapshot of all SSTable files at a point in time.
///
/// The file arrangement never changes after construction. The one piece of
/// state recomputed in place is the score board, refreshed by the picker
/// through [`compute_compaction_score`](Version::compute_compaction_score)
/// so scores can account for work already in flight.
///
/// Callers must keep the snapshot alive for as long as any compaction
/// picked from it is in use; compactions hold an `Arc` back to it.
#[derive(Debug)]
pub struct Version {
    /// Comparator ordering all keys in this snapshot.
    icmp: InternalKeyComparator,

    /// Files at each level. Level 0 files may overlap and are ordered
    /// newest first; higher levels are sorted by key and non-overlapping.
    files: Vec<Vec<Arc<FileMetadata>>>,

    /// Per level, indices into `files[level]` sorted by descending
    /// compensated file size.
    files_by_size: Vec<Vec<usize>>,

    /// Total raw file size at each level.
    level_sizes: Vec<u64>,

    /// (level, score) pairs sorted by score descending. Score >= 1 means
    /// the level wants compaction.
    scores: RwLock<Vec<(usize, f64)>>,
}

impl Version {
    /// Create an empty version with the given level count.
    pub fn new(icmp: InternalKeyComparator, num_levels: usize) -> Self {
        Self::with_files(icmp, vec![Vec::new(); num_levels])
    }

    /// Create a version with the given files.
    ///
    /// Level 0 is reordered newest first (by largest sequence number);
    /// higher levels are sorted by smallest key.
    pub fn with_files(
        icmp: InternalKeyComparator,
        mut files: Vec<Vec<Arc<FileMetadata>>>,
    ) -> Self {
        assert!(!files.is_empty());

        files[0].sort_by(|a, b| {
            b.largest_seqno()
                .cmp(&a.largest_seqno())
                .then_with(|| b.file_number().cmp(&a.file_number()))
        });
        for level_files in files.iter_mut().skip(1) {
            level_files.sort_by(|a, b| icmp.compare(a.smallest(), b.smallest()));
            // Non-zero levels must hold pairwise disjoint key ranges.
            debug_assert!(level_files.windows(2).all(|w| {
                icmp.compare(w[0].largest(), w[1].smallest()) == Ordering::Less
            }));
        }

        let level_sizes: Vec<u64> = files
            .iter()
            .map(|level_files| level_files.iter().map(|f| f.file_size()).sum())
            .collect();

        let files_by_size: Vec<Vec<usize>> = files
            .iter()
            .map(|level_files| {
                let mut order: Vec<usize> = (0..level_files.len()).collect();
                order.sort_by(|&a, &b| {
                    level_files[b]
                        .compensated_file_size()
                        .cmp(&level_files[a].compensated_file_size())
                });
                order
            })
            .collect();

        Self {
            icmp,
            files,
            files_by_size,
            level_sizes,
            scores: RwLock::new(Vec::new()),
        }
    }

    /// Get the comparator ordering this snapshot.
    pub fn comparator(&self) -> &InternalKeyComparator {
        &self.icmp
    }

    /// Get the number of levels.
    pub fn number_levels(&self) -> usize {
        self.files.len()
    }

    /// Get files at a specific level.
    pub fn files(&self, level: usize) -> &[Arc<FileMetadata>] {
        &self.files[level]
    }

    /// Get number of files at a level.
    pub fn num_files(&self, level: usize) -> usize {
        self.files[level].len()
    }

    /// Indices into `files(level)` ordered by descending compensated size.
    pub fn files_by_size(&self, level: usize) -> &[usize] {
        &self.files_by_size[level]
    }

    /// Total raw bytes stored at a level.
    pub fn num_level_bytes(&self, level: usize) -> u64 {
        self.level_sizes[level]
    }

    /// Recompute the score board, discounting bytes already being
    /// compacted at each level.
    ///
    /// Level 0 scores by file count (or by total size against the FIFO
    /// cap); levels past 0 score by compensated bytes against the level's
    /// size target. The last level never fills toward a deeper one and is
    /// not scored.
    pub fn compute_compaction_score(
        &self,
        ioptions: &ImmutableOptions,
        mutable: &MutableOptions,
        sizes_being_compacted: &[u64],
    ) {
        let mut scores = Vec::new();

        let mut num_files = 0usize;
        let mut total = 0u64;
        for f in &self.files[0] {
            if !f.being_compacted() {
                num_files += 1;
                total += f.compensated_file_size();
            }
        }
        let level0_score = if ioptions.compaction_style == CompactionStyle::Fifo {
            total as f64 / ioptions.fifo.max_table_files_size.max(1) as f64
        } else {
            num_files as f64 / mutable.level0_file_num_compaction_trigger.max(1) as f64
        };
        scores.push((0, level0_score));

        for level in 1..self.number_levels().saturating_sub(1) {
            let total: u64 = self.files[level]
                .iter()
                .map(|f| f.compensated_file_size())
                .sum();
            let in_flight = sizes_being_compacted.get(level).copied().unwrap_or(0);
            let score = total.saturating_sub(in_flight) as f64
                / mutable.max_bytes_for_level(level).max(1) as f64;
            scores.push((level, score));
        }

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        *self.scores.write() = scores;
    }

    /// The score board: (level, score) pairs, highest score first.
    pub fn compaction_scores(&self) -> Vec<(usize, f64)> {
        self.scores.read().clone()
    }

    /// Check if any level wants compaction.
    pub fn needs_compaction(&self) -> bool {
        self.scores.read().first().map_or(false, |(_, s)| *s >= 1.0)
    }

    /// Find files at `level` whose user-key range intersects
    /// `[smallest, largest]`. `None` bounds are unbounded.
    pub fn overlapping_inputs(
        &self,
        level: usize,
        smallest: Option<&InternalKey>,
        largest: Option<&InternalKey>,
    ) -> Vec<Arc<FileMetadata>> {
        self.overlapping_inputs_with_index(level, smallest, largest).0
    }

    /// Like [`overlapping_inputs`](Version::overlapping_inputs), but also
    /// reports the index of the first overlapping file for levels past 0.
    ///
    /// At level 0, files may overlap each other, so a hit whose range
    /// extends past the query bounds widens the search and restarts it;
    /// the result is closed under transitive overlap. At higher levels a
    /// binary search finds the first candidate and the scan stops at the
    /// first file past the upper bound.
    pub fn overlapping_inputs_with_index(
        &self,
        level: usize,
        smallest: Option<&InternalKey>,
        largest: Option<&InternalKey>,
    ) -> (Vec<Arc<FileMetadata>>, Option<usize>) {
        let ucmp = self.icmp.user_comparator();
        let files = &self.files[level];

        if level == 0 {
            let mut begin = smallest.map(|k| k.user_key().to_vec());
            let mut end = largest.map(|k| k.user_key().to_vec());
            let mut result = Vec::new();
            let mut i = 0;
            while i < files.len() {
                let f = &files[i];
                let file_start = f.smallest().user_key();
                let file_limit = f.largest().user_key();
                let before = begin
                    .as_deref()
                    .map_or(false, |b| ucmp.compare(file_limit, b) == Ordering::Less);
                let after = end
                    .as_deref()
                    .map_or(false, |e| ucmp.compare(file_start, e) == Ordering::Greater);
                if before || after {
                    i += 1;
                    continue;
                }

                result.push(Arc::clone(f));

                // A level-0 hit can widen the range; restart so earlier
                // files are reconsidered against the new bounds.
                let mut restart = false;
                if let Some(b) = begin.as_mut() {
                    if ucmp.compare(file_start, b) == Ordering::Less {
                        *b = file_start.to_vec();
                        restart = true;
                    }
                }
                if let Some(e) = end.as_mut() {
                    if ucmp.compare(file_limit, e) == Ordering::Greater {
                        *e = file_limit.to_vec();
                        restart = true;
                    }
                }
                if restart {
                    result.clear();
                    i = 0;
                } else {
                    i += 1;
                }
            }
            return (result, None);
        }

        let start = match smallest {
            Some(k) => files.partition_point(|f| {
                ucmp.compare(f.largest().user_key(), k.user_key()) == Ordering::Less
            }),
            None => 0,
        };

        let mut result = Vec::new();
        for f in &files[start..] {
            if let Some(e) = largest {
                if ucmp.compare(f.smallest().user_key(), e.user_key()) == Ordering::Greater {
                    break;
                }
            }
            result.push(Arc::clone(f));
        }

        let first = if result.is_empty() { None } else { Some(start) };
        (result, first)
    }

    /// Check whether the run `inputs` at `level` shares a user key with a
    /// neighboring file just outside the run.
    ///
    /// A true result means compacting exactly `inputs` would split the
    /// versions of one user key across the compaction boundary.
    pub fn has_overlapping_user_key(
        &self,
        inputs: &[Arc<FileMetadata>],
        level: usize,
    ) -> bool {
        if inputs.is_empty() || level == 0 {
            return false;
        }

        let ucmp = self.icmp.user_comparator();
        let files = &self.files[level];

        let first_file = inputs.first().expect("non-empty inputs");
        let last_file = inputs.last().expect("non-empty inputs");
        let first = files
            .iter()
            .position(|f| f.file_number() == first_file.file_number());
        let last = files
            .iter()
            .position(|f| f.file_number() == last_file.file_number());
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => return false,
        };

        if last + 1 < files.len()
            && ucmp.compare(
                files[last].largest().user_key(),
                files[last + 1].smallest().user_key(),
            ) == Ordering::Equal
        {
            return true;
        }

        if first > 0
            && ucmp.compare(
                files[first].smallest().user_key(),
                files[first - 1].largest().user_key(),
            ) == Ordering::Equal
        {
            return true;
        }

        false
    }

    /// Build the user-key-level snapshot view handed to external
    /// compactors and the input sanitizer.
    pub fn column_family_meta_data(&self) -> ColumnFamilyMetaData {
        let mut size = 0u64;
        let mut file_count = 0usize;
        let levels = self
            .files
            .iter()
            .enumerate()
            .map(|(level, level_files)| {
                let files = level_files
                    .iter()
                    .map(|f| {
                        size += f.file_size();
                        file_count += 1;
                        SstFileMetaData {
                            file_number: f.file_number(),
                            file_size: f.file_size(),
                            smallest_key: f.smallest().user_key_bytes(),
                            largest_key: f.largest().user_key_bytes(),
                            being_compacted: f.being_compacted(),
                        }
                    })
                    .collect();
                LevelMetaData { level, files }
            })
            .collect();

        ColumnFamilyMetaData {
            size,
            file_count,
            levels,
        }
    }
}
