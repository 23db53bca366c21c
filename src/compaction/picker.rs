//! Shared picker state and the procedures common to every strategy.
//!
//! The picker itself is not concurrent: every entry point runs to
//! completion under the host's column-family lock. It reads the immutable
//! [`Version`], mutates its own in-flight bookkeeping plus the
//! `being_compacted` claim flags, and returns. It never performs I/O.

use std::collections::BTreeSet;
use std::cmp::Ordering;
use std::sync::Arc;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::options::{CompactionStyle, ImmutableOptions, MutableOptions};
use crate::types::InternalKey;
use crate::util::comparator::{Comparator, InternalKeyComparator};
use crate::version::{ColumnFamilyMetaData, FileMetadata, Version};

use super::pluggable::{CompactionOptions, Compactor};
use super::{Compaction, CompactionInputFiles, DELETION_COMPACTION};

/// Sum of compensated sizes over a file set.
pub fn total_compensated_file_size(files: &[Arc<FileMetadata>]) -> u64 {
    files.iter().map(|f| f.compensated_file_size()).sum()
}

/// Check if any of the files is claimed by a running compaction.
pub(crate) fn files_in_compaction(files: &[Arc<FileMetadata>]) -> bool {
    files.iter().any(|f| f.being_compacted())
}

/// Check whether two user-key ranges intersect under `ucmp`.
///
/// Sequence numbers are ignored: a single user key may span sequence
/// numbers across files and is never to be split.
pub(crate) fn ranges_overlap(
    ucmp: &dyn Comparator,
    a_smallest: &[u8],
    a_largest: &[u8],
    b_smallest: &[u8],
    b_largest: &[u8],
) -> bool {
    ucmp.compare(a_largest, b_smallest) != Ordering::Less
        && ucmp.compare(b_largest, a_smallest) != Ordering::Less
}

/// Result of a manual range compaction request.
#[derive(Debug)]
pub struct ManualCompaction {
    /// The picked compaction.
    pub compaction: Arc<Compaction>,
    /// Where the next request should begin when the range was truncated;
    /// `None` when the requested range was fully covered.
    pub next_begin: Option<InternalKey>,
}

/// Stateful compaction advisor for one column family.
///
/// Owns the in-flight bookkeeping and the round-robin scan cursors;
/// borrows the [`Version`] snapshot supplied per call. The caller must
/// keep each snapshot alive for as long as compactions picked from it are
/// in use.
pub struct CompactionPicker {
    /// Immutable configuration.
    ioptions: Arc<ImmutableOptions>,

    /// Comparator used for all range arithmetic.
    icmp: InternalKeyComparator,

    /// Live compactions per input level, in insertion order.
    compactions_in_progress: Vec<Vec<Arc<Compaction>>>,

    /// Per-level round-robin cursor into the size-ordered file list.
    /// Living here instead of in the snapshot keeps fairness across
    /// snapshot generations while the snapshot stays immutable.
    next_compaction_index: Vec<usize>,

    /// Identity source for picked compactions.
    next_compaction_id: u64,

    /// External selection strategy, for the pluggable style.
    compactor: Option<Arc<dyn Compactor>>,
}

impl std::fmt::Debug for CompactionPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactionPicker")
            .field("compaction_style", &self.ioptions.compaction_style)
            .field(
                "compactions_in_progress",
                &self
                    .compactions_in_progress
                    .iter()
                    .map(Vec::len)
                    .collect::<Vec<_>>(),
            )
            .field("next_compaction_index", &self.next_compaction_index)
            .finish()
    }
}

impl CompactionPicker {
    /// Create a picker for the configured strategy.
    pub fn new(ioptions: Arc<ImmutableOptions>, icmp: InternalKeyComparator) -> Self {
        let num_levels = ioptions.num_levels;
        Self {
            ioptions,
            icmp,
            compactions_in_progress: vec![Vec::new(); num_levels],
            next_compaction_index: vec![0; num_levels],
            next_compaction_id: 0,
            compactor: None,
        }
    }

    /// Create a pluggable-style picker around an external compactor.
    pub fn with_compactor(
        ioptions: Arc<ImmutableOptions>,
        icmp: InternalKeyComparator,
        compactor: Arc<dyn Compactor>,
    ) -> Self {
        let mut picker = Self::new(ioptions, icmp);
        picker.compactor = Some(compactor);
        picker
    }

    /// Immutable configuration this picker runs under.
    pub fn ioptions(&self) -> &ImmutableOptions {
        &self.ioptions
    }

    /// Comparator used for all range arithmetic.
    pub fn comparator(&self) -> &InternalKeyComparator {
        &self.icmp
    }

    /// Number of levels the picker manages.
    pub fn number_levels(&self) -> usize {
        self.ioptions.num_levels
    }

    /// Deepest level the configured strategy may write output to.
    pub fn max_output_level(&self) -> usize {
        match self.ioptions.compaction_style {
            CompactionStyle::Universal | CompactionStyle::Fifo => 0,
            CompactionStyle::Leveled | CompactionStyle::Pluggable => {
                self.ioptions.num_levels - 1
            }
        }
    }

    /// Live compactions whose input level is `level`.
    pub fn compactions_in_progress(&self, level: usize) -> &[Arc<Compaction>] {
        &self.compactions_in_progress[level]
    }

    /// Pick the next compaction to run, if any work is warranted.
    ///
    /// Returning `None` is not an error: the trigger may not be met, the
    /// eligible files may all be claimed, or every candidate may collide
    /// with in-flight work.
    pub fn pick_compaction(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
    ) -> Option<Arc<Compaction>> {
        match self.ioptions.compaction_style {
            CompactionStyle::Leveled => self.pick_compaction_leveled(mutable, version),
            CompactionStyle::Universal => self.pick_compaction_universal(mutable, version),
            CompactionStyle::Fifo => self.pick_compaction_fifo(version),
            CompactionStyle::Pluggable => self.pick_compaction_pluggable(mutable, version),
        }
    }

    /// Pick a compaction covering `[begin, end]` at `input_level`.
    ///
    /// Oversized ranges are truncated; the returned
    /// [`ManualCompaction::next_begin`] tells the caller where to resume.
    #[allow(clippy::too_many_arguments)]
    pub fn compact_range(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        input_level: usize,
        output_level: usize,
        output_path_id: u32,
        begin: Option<&InternalKey>,
        end: Option<&InternalKey>,
    ) -> Option<ManualCompaction> {
        match self.ioptions.compaction_style {
            CompactionStyle::Fifo => {
                self.compact_range_fifo(version, input_level, output_level, output_path_id)
            }
            CompactionStyle::Pluggable => {
                self.compact_range_pluggable(mutable, version, input_level, output_level)
            }
            CompactionStyle::Leveled | CompactionStyle::Universal => self.compact_range_generic(
                mutable,
                version,
                input_level,
                output_level,
                output_path_id,
                begin,
                end,
            ),
        }
    }

    /// Hand a finished compaction back.
    ///
    /// Clears the claim flags on its inputs and removes it from the
    /// in-flight set. On failure the level's scan cursor is rewound so the
    /// same files are reconsidered later.
    pub fn release_compaction_files(&mut self, c: &Compaction, status: Result<()>) {
        c.mark_files_being_compacted(false);
        let level = c.level();
        self.compactions_in_progress[level].retain(|live| live.id != c.id);
        if status.is_err() {
            self.next_compaction_index[level] = 0;
        }
    }

    /// Compensated bytes of in-flight input per level.
    pub fn sizes_being_compacted(&self) -> Vec<u64> {
        self.compactions_in_progress
            .iter()
            .enumerate()
            .map(|(level, live)| {
                live.iter()
                    .map(|c| {
                        debug_assert_eq!(c.level(), level);
                        total_compensated_file_size(c.inputs(0))
                    })
                    .sum()
            })
            .collect()
    }

    pub(crate) fn alloc_id(&mut self) -> u64 {
        self.next_compaction_id += 1;
        self.next_compaction_id
    }

    pub(crate) fn compactor_ref(&self) -> Option<&Arc<dyn Compactor>> {
        self.compactor.as_ref()
    }

    pub(crate) fn next_index(&self, level: usize) -> usize {
        self.next_compaction_index[level]
    }

    pub(crate) fn set_next_index(&mut self, level: usize, index: usize) {
        self.next_compaction_index[level] = index;
    }

    /// Mark every input file claimed and remember the compaction as
    /// in flight.
    pub(crate) fn register_compaction(&mut self, c: Compaction) -> Arc<Compaction> {
        c.mark_files_being_compacted(true);
        let level = c.level();
        let c = Arc::new(c);
        self.compactions_in_progress[level].push(Arc::clone(&c));
        c
    }

    /// Minimum bounding internal-key range over a non-empty file set.
    pub(crate) fn key_range(&self, files: &[Arc<FileMetadata>]) -> (InternalKey, InternalKey) {
        assert!(!files.is_empty());
        let mut smallest = files[0].smallest().clone();
        let mut largest = files[0].largest().clone();
        for f in &files[1..] {
            if self.icmp.compare(f.smallest(), &smallest) == Ordering::Less {
                smallest = f.smallest().clone();
            }
            if self.icmp.compare(f.largest(), &largest) == Ordering::Greater {
                largest = f.largest().clone();
            }
        }
        (smallest, largest)
    }

    /// Bounding range over the union of two file sets.
    pub(crate) fn key_range2(
        &self,
        inputs1: &[Arc<FileMetadata>],
        inputs2: &[Arc<FileMetadata>],
    ) -> (InternalKey, InternalKey) {
        let all: Vec<Arc<FileMetadata>> =
            inputs1.iter().chain(inputs2.iter()).cloned().collect();
        self.key_range(&all)
    }

    /// Check if any file at `level + 1` overlapping `[smallest, largest]`
    /// is claimed by a running compaction. Records the first overlap index
    /// into `parent_index` as a search hint.
    pub(crate) fn parent_range_in_compaction(
        &self,
        version: &Version,
        smallest: &InternalKey,
        largest: &InternalKey,
        level: usize,
        parent_index: &mut Option<usize>,
    ) -> bool {
        debug_assert!(level + 1 < version.number_levels());
        let (inputs, first) =
            version.overlapping_inputs_with_index(level + 1, Some(smallest), Some(largest));
        if first.is_some() {
            *parent_index = first;
        }
        files_in_compaction(&inputs)
    }

    /// Grow `inputs[0]` until a clean cut at user-key granularity.
    ///
    /// Replaces the set with everything its own range overlaps, repeating
    /// until a fixed point: the overlap query only ever grows the set, so
    /// this terminates after at most one pass per file in the level.
    /// Returns false (and clears the candidate) when the stabilized set is
    /// unusable: empty, already claimed, or, for merges into a different
    /// level, colliding with claimed parent files.
    pub(crate) fn expand_while_overlapping(&self, c: &mut Compaction) -> bool {
        if c.inputs[0].is_empty() {
            debug_assert!(c.inputs[1].is_empty());
            return false;
        }

        // The level-0 overlap query already returns a transitively closed
        // set, so there is nothing to expand.
        if c.level() == 0 {
            return true;
        }

        let version = Arc::clone(&c.input_version);
        let level = c.level();
        loop {
            let old_size = c.inputs[0].len();
            let (smallest, largest) = self.key_range(&c.inputs[0].files);
            c.inputs[0].files =
                version.overlapping_inputs(level, Some(&smallest), Some(&largest));
            if c.inputs[0].len() <= old_size {
                break;
            }
        }

        if c.inputs[0].is_empty() {
            info!("expansion at level {} produced zero input files", level);
        }
        let mut parent_index = None;
        if c.inputs[0].is_empty()
            || files_in_compaction(&c.inputs[0].files)
            || (c.level() != c.output_level() && {
                let (smallest, largest) = self.key_range(&c.inputs[0].files);
                self.parent_range_in_compaction(
                    &version,
                    &smallest,
                    &largest,
                    level,
                    &mut parent_index,
                )
            })
        {
            c.inputs[0].files.clear();
            c.inputs[1].files.clear();
            return false;
        }
        true
    }

    /// Attach the overlapping `level + 1` files, then try to grow
    /// `inputs[0]` laterally without changing the parent set.
    ///
    /// Growth is accepted only when it adds files, stays under the
    /// expanded-size limit, touches nothing claimed, splits no user key,
    /// and leaves the recomputed parent set exactly as large as before:
    /// extra input may only be stolen for free.
    pub(crate) fn setup_other_inputs(&self, mutable: &MutableOptions, c: &mut Compaction) {
        if c.inputs[0].is_empty() || c.level() == c.output_level() {
            return;
        }

        let version = Arc::clone(&c.input_version);
        let level = c.level();
        let (smallest, largest) = self.key_range(&c.inputs[0].files);

        let (parents, parent_index) =
            version.overlapping_inputs_with_index(level + 1, Some(&smallest), Some(&largest));
        c.inputs[1].files = parents;
        if parent_index.is_some() {
            c.parent_index = parent_index;
        }

        let (mut all_start, mut all_limit) =
            self.key_range2(&c.inputs[0].files, &c.inputs[1].files);

        if !c.inputs[1].is_empty() {
            let expanded0 =
                version.overlapping_inputs(level, Some(&all_start), Some(&all_limit));
            let inputs0_size = total_compensated_file_size(&c.inputs[0].files);
            let inputs1_size = total_compensated_file_size(&c.inputs[1].files);
            let expanded0_size = total_compensated_file_size(&expanded0);
            let limit = mutable.expanded_compaction_byte_size_limit(level);
            if expanded0.len() > c.inputs[0].len()
                && inputs1_size + expanded0_size < limit
                && !files_in_compaction(&expanded0)
                && !version.has_overlapping_user_key(&expanded0, level)
            {
                let (new_start, new_limit) = self.key_range(&expanded0);
                let (expanded1, parent_index) = version.overlapping_inputs_with_index(
                    level + 1,
                    Some(&new_start),
                    Some(&new_limit),
                );
                if expanded1.len() == c.inputs[1].len() && !files_in_compaction(&expanded1) {
                    info!(
                        "expanding@{} {}+{} ({}+{} bytes) to {}+{} ({}+{} bytes)",
                        level,
                        c.inputs[0].len(),
                        c.inputs[1].len(),
                        inputs0_size,
                        inputs1_size,
                        expanded0.len(),
                        expanded1.len(),
                        expanded0_size,
                        inputs1_size,
                    );
                    c.inputs[0].files = expanded0;
                    c.inputs[1].files = expanded1;
                    if parent_index.is_some() {
                        c.parent_index = parent_index;
                    }
                    let (start, limit) =
                        self.key_range2(&c.inputs[0].files, &c.inputs[1].files);
                    all_start = start;
                    all_limit = limit;
                }
            }
        }

        // Grandparents bound output-file size downstream.
        if level + 2 < version.number_levels() {
            c.grandparents =
                version.overlapping_inputs(level + 2, Some(&all_start), Some(&all_limit));
        }
    }

    /// Manual range compaction for the leveled and universal styles.
    #[allow(clippy::too_many_arguments)]
    fn compact_range_generic(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        input_level: usize,
        output_level: usize,
        output_path_id: u32,
        begin: Option<&InternalKey>,
        end: Option<&InternalKey>,
    ) -> Option<ManualCompaction> {
        // All level-0 runs overlap under the universal style, so the whole
        // key space is compacted in one shot.
        let (begin, end) = if self.ioptions.compaction_style == CompactionStyle::Universal {
            (None, None)
        } else {
            (begin, end)
        };

        let mut inputs = version.overlapping_inputs(input_level, begin, end);
        if inputs.is_empty() {
            return None;
        }

        // Avoid compacting too much in one shot when the range is large.
        // Level 0 is exempt: its files overlap, and dropping an older
        // overlapping file while keeping a newer one would lose history.
        let mut next_begin = None;
        if input_level > 0 {
            let limit = mutable
                .max_file_size_for_level(input_level)
                .saturating_mul(mutable.source_compaction_factor);
            let mut total = inputs[0].compensated_file_size();
            for i in 1..inputs.len() {
                let size = inputs[i].compensated_file_size();
                if total + size >= limit {
                    next_begin = Some(inputs[i].smallest().clone());
                    inputs.truncate(i);
                    break;
                }
                total += size;
            }
        }

        debug_assert!(
            self.ioptions.db_paths.is_empty()
                || (output_path_id as usize) < self.ioptions.db_paths.len()
        );
        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            input_level,
            output_level,
            mutable.max_file_size_for_level(output_level),
            mutable.max_grandparent_overlap_bytes(input_level),
            output_path_id,
            self.ioptions.compression_for_level(output_level),
        );
        c.inputs[0].files = inputs;

        if !self.expand_while_overlapping(&mut c) {
            info!(
                "manual compaction at level {} refused: expansion failure",
                input_level
            );
            return None;
        }

        self.setup_other_inputs(mutable, &mut c);

        // Manual compactions may touch files claimed by automatics only
        // because the host serializes to a single background compaction.
        c.setup_bottommost_level();
        c.is_manual_compaction = true;

        Some(ManualCompaction {
            compaction: self.register_compaction(c),
            next_begin,
        })
    }

    /// Validate and extend a user-chosen set of file numbers so the
    /// resulting set is safe to compact into `output_level`.
    pub fn sanitize_compaction_input_files(
        &self,
        input_files: &mut BTreeSet<u64>,
        cf_meta: &ColumnFamilyMetaData,
        output_level: i32,
    ) -> Result<()> {
        debug_assert_eq!(
            cf_meta.levels.len().saturating_sub(1),
            cf_meta.levels.last().map_or(0, |l| l.level)
        );
        if output_level >= cf_meta.levels.len() as i32 {
            return Err(Error::invalid_argument(format!(
                "output level must be between [0, {}]",
                cf_meta.levels.len() - 1
            )));
        }

        if output_level > self.max_output_level() as i32 {
            return Err(Error::invalid_argument(format!(
                "exceeds the maximum output level defined by the current compaction algorithm: {}",
                self.max_output_level()
            )));
        }

        if output_level < 0 && output_level != DELETION_COMPACTION {
            return Err(Error::invalid_argument("output level cannot be negative"));
        }

        if input_files.is_empty() {
            return Err(Error::invalid_argument(
                "a compaction must contain at least one file",
            ));
        }

        self.sanitize_input_files_for_all_levels(input_files, cf_meta, output_level)?;

        // Every requested number must name an existing, unclaimed file.
        for file_number in input_files.iter() {
            let mut found = false;
            'levels: for level_meta in &cf_meta.levels {
                for file_meta in &level_meta.files {
                    if *file_number == file_meta.file_number {
                        if file_meta.being_compacted {
                            return Err(Error::aborted(format!(
                                "specified compaction input file {} is already being compacted",
                                file_number
                            )));
                        }
                        found = true;
                        break 'levels;
                    }
                }
            }
            if !found {
                return Err(Error::invalid_argument(format!(
                    "specified compaction input file {} does not exist",
                    file_number
                )));
            }
        }

        Ok(())
    }

    /// For each level up to the output level: close the chosen window over
    /// files it cannot be cut away from, then pull in every deeper-level
    /// file overlapping the running key range.
    fn sanitize_input_files_for_all_levels(
        &self,
        input_files: &mut BTreeSet<u64>,
        cf_meta: &ColumnFamilyMetaData,
        output_level: i32,
    ) -> Result<()> {
        let ucmp = self.icmp.user_comparator();

        // Running key range of the compaction, set once the first input
        // file is seen.
        let mut smallest_key = None;
        let mut largest_key = None;

        let mut l: i32 = 0;
        while l <= output_level {
            let current_files = &cf_meta.levels[l as usize].files;

            let mut first_included = current_files.len();
            let mut last_included = None;
            for (f, file) in current_files.iter().enumerate() {
                if input_files.contains(&file.file_number) {
                    first_included = first_included.min(f);
                    last_included = Some(f);
                    if smallest_key.is_none() {
                        smallest_key = Some(file.smallest_key.clone());
                        largest_key = Some(file.largest_key.clone());
                    }
                }
            }
            let Some(mut last_included) = last_included else {
                l += 1;
                continue;
            };

            if l > 0 {
                // Widen the window while a neighbor shares key range with
                // its boundary file; level 0 skips this because its files
                // overlap arbitrarily.
                while first_included > 0 {
                    if ucmp.compare(
                        &current_files[first_included - 1].largest_key,
                        &current_files[first_included].smallest_key,
                    ) == Ordering::Less
                    {
                        break;
                    }
                    first_included -= 1;
                }
                while last_included + 1 < current_files.len() {
                    if ucmp.compare(
                        &current_files[last_included + 1].smallest_key,
                        &current_files[last_included].largest_key,
                    ) == Ordering::Greater
                    {
                        break;
                    }
                    last_included += 1;
                }
            }

            for f in first_included..=last_included {
                let file = &current_files[f];
                if file.being_compacted {
                    return Err(Error::aborted(format!(
                        "file {} that has an overlapping key range with one of the \
                         compaction input files is currently being compacted",
                        file.file_number
                    )));
                }
                input_files.insert(file.file_number);
            }

            let smallest = smallest_key.as_mut().expect("set when a file was found");
            let largest = largest_key.as_mut().expect("set when a file was found");
            if l == 0 {
                for f in first_included..=last_included {
                    let file = &current_files[f];
                    if ucmp.compare(smallest, &file.smallest_key) == Ordering::Greater {
                        *smallest = file.smallest_key.clone();
                    }
                    if ucmp.compare(largest, &file.largest_key) == Ordering::Less {
                        *largest = file.largest_key.clone();
                    }
                }
            } else {
                let first = &current_files[first_included];
                let last = &current_files[last_included];
                if ucmp.compare(smallest, &first.smallest_key) == Ordering::Greater {
                    *smallest = first.smallest_key.clone();
                }
                if ucmp.compare(largest, &last.largest_key) == Ordering::Less {
                    *largest = last.largest_key.clone();
                }
            }

            for m in (l as usize + 1)..=(output_level as usize) {
                for next_file in &cf_meta.levels[m].files {
                    if ranges_overlap(
                        ucmp,
                        smallest,
                        largest,
                        &next_file.smallest_key,
                        &next_file.largest_key,
                    ) {
                        if next_file.being_compacted {
                            return Err(Error::aborted(format!(
                                "file {} that has an overlapping key range with one of the \
                                 compaction input files is currently being compacted",
                                next_file.file_number
                            )));
                        }
                        input_files.insert(next_file.file_number);
                    }
                }
            }

            l += 1;
        }

        Ok(())
    }

    /// Partition a set of file numbers into per-level input lists,
    /// draining the set. Unknown numbers are an error.
    pub fn get_compaction_inputs_from_file_numbers(
        &self,
        input_set: &mut BTreeSet<u64>,
        version: &Version,
    ) -> Result<Vec<CompactionInputFiles>> {
        if input_set.is_empty() {
            return Err(Error::invalid_argument(
                "compaction must include at least one file",
            ));
        }

        let mut matched: Vec<CompactionInputFiles> = (0..version.number_levels())
            .map(CompactionInputFiles::new)
            .collect();
        let mut first_non_empty_level = None;
        let mut last_non_empty_level = None;
        for level in 0..version.number_levels() {
            for file in version.files(level) {
                if input_set.remove(&file.file_number()) {
                    matched[level].files.push(Arc::clone(file));
                    last_non_empty_level = Some(level);
                    first_non_empty_level.get_or_insert(level);
                }
            }
        }

        if !input_set.is_empty() {
            let missing: Vec<String> =
                input_set.iter().map(|number| number.to_string()).collect();
            return Err(Error::invalid_argument(format!(
                "cannot find matched SST files for the following file numbers: {}",
                missing.join(" ")
            )));
        }

        let (first, last) = (
            first_non_empty_level.expect("input set was non-empty"),
            last_non_empty_level.expect("input set was non-empty"),
        );
        Ok(matched
            .into_iter()
            .skip(first)
            .take(last - first + 1)
            .collect())
    }

    /// Build a compaction from externally chosen per-level inputs.
    pub fn form_compaction(
        &mut self,
        compact_options: &CompactionOptions,
        input_files: Vec<CompactionInputFiles>,
        output_level: i32,
        version: &Arc<Version>,
        mutable: &MutableOptions,
    ) -> Arc<Compaction> {
        assert!(!input_files.is_empty());
        let deletion = output_level == DELETION_COMPACTION;

        let max_grandparent_overlap_bytes = if deletion {
            0
        } else if (output_level as usize) + 1 < self.number_levels() {
            mutable.max_grandparent_overlap_bytes(output_level as usize + 1)
        } else {
            u64::MAX
        };

        let level = input_files[0].level;
        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            level,
            if deletion { 0 } else { output_level as usize },
            compact_options.output_file_size_limit,
            max_grandparent_overlap_bytes,
            0,
            compact_options.compression,
        );
        c.inputs = input_files;
        c.deletion_compaction = deletion;
        c.bottommost_level = !deletion && output_level as usize == self.number_levels() - 1;

        debug!(
            "formed compaction of {} input levels into level {}",
            c.num_input_levels(),
            c.output_level()
        );
        self.register_compaction(c)
    }
}
