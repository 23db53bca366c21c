//! Universal (tiered) strategy - age-ordered runs on level 0.
//!
//! All data lives at level 0 as runs sorted newest first; a merge replaces
//! a contiguous stretch of runs with one. Three sub-policies are tried in
//! order: bound size amplification, merge similar-sized neighbors, and as
//! a last resort shrink the file count regardless of size ratios.

use std::sync::Arc;

use log::debug;

use crate::options::{ImmutableOptions, MutableOptions, StopStyle};
use crate::version::Version;

use super::{Compaction, CompactionPicker};

/// Choose the earliest storage path that can hold the output with room to
/// spare for the run's natural doubling.
///
/// Two conditions must hold: the path's budget covers the file, and the
/// capacity accumulated up to that path still covers the future file this
/// output will grow into (estimated from the size ratio) once it is merged
/// again.
pub(crate) fn get_path_id(ioptions: &ImmutableOptions, file_size: u64) -> u32 {
    if ioptions.db_paths.is_empty() {
        return 0;
    }

    let mut accumulated_size = 0u64;
    let future_size =
        file_size * (100 - u64::from(ioptions.universal.size_ratio).min(100)) / 100;
    let mut p = 0u32;
    for path in &ioptions.db_paths[..ioptions.db_paths.len() - 1] {
        let target_size = path.target_size;
        if target_size > file_size
            && accumulated_size + (target_size - file_size) > future_size
        {
            return p;
        }
        accumulated_size += target_size;
        p += 1;
    }
    p
}

impl CompactionPicker {
    /// Pick a universal compaction over the level-0 runs.
    pub(crate) fn pick_compaction_universal(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
    ) -> Option<Arc<Compaction>> {
        let sizes_being_compacted = self.sizes_being_compacted();
        version.compute_compaction_score(self.ioptions(), mutable, &sizes_being_compacted);
        let score = version
            .compaction_scores()
            .iter()
            .find(|(level, _)| *level == 0)
            .map_or(0.0, |(_, score)| *score);

        if version.files(0).len()
            < mutable.level0_file_num_compaction_trigger
        {
            debug!("universal: nothing to do");
            return None;
        }
        debug!(
            "universal: {} candidate files",
            version.files(0).len()
        );

        // Size amplification first; then size-ratio runs; then force the
        // file count back under the trigger while ignoring size ratios.
        let c = if let Some(c) = self.pick_universal_size_amp(mutable, version, score) {
            debug!("universal: compacting for size amp");
            Some(c)
        } else {
            let ratio = self.ioptions().universal.size_ratio;
            if let Some(c) =
                self.pick_universal_read_amp(mutable, version, score, ratio, usize::MAX)
            {
                debug!("universal: compacting for size ratio");
                Some(c)
            } else {
                let num_files =
                    version.files(0).len() - mutable.level0_file_num_compaction_trigger;
                let c =
                    self.pick_universal_read_amp(mutable, version, score, u32::MAX, num_files);
                if c.is_some() {
                    debug!("universal: compacting for file num");
                }
                c
            }
        };
        let mut c = c?;
        assert!(c.num_input_files(0) > 1);

        // The chosen runs must not interleave in sequence space.
        if cfg!(debug_assertions) {
            let mut newer: Option<&Arc<crate::version::FileMetadata>> = None;
            for f in &c.inputs[0].files {
                debug_assert!(f.smallest_seqno() <= f.largest_seqno());
                if let Some(newer) = newer {
                    debug_assert!(newer.smallest_seqno() > f.largest_seqno());
                }
                newer = Some(f);
            }
        }

        // Is the oldest file on disk part of this compaction?
        let last_file = version.files(0).last().expect("trigger implies files");
        c.bottommost_level = c.inputs[0]
            .files
            .last()
            .map_or(false, |f| f.file_number() == last_file.file_number());

        c.is_full_compaction = c.num_input_files(0) == version.files(0).len();

        Some(self.register_compaction(c))
    }

    /// Size-amplification sub-policy: once the newer runs together exceed
    /// the configured percentage of the oldest run, fold everything into
    /// one.
    fn pick_universal_size_amp(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        score: f64,
    ) -> Option<Compaction> {
        let ratio = self.ioptions().universal.max_size_amplification_percent;
        let files = version.files(0);
        if files.is_empty() {
            return None;
        }

        // Skip claimed files off the front.
        let mut start_index = None;
        for (i, f) in files[..files.len() - 1].iter().enumerate() {
            if !f.being_compacted() {
                start_index = Some(i);
                break;
            }
            debug!(
                "universal: skipping file {} compacted, cannot reduce size amp",
                f.file_number()
            );
        }
        let start_index = start_index?;
        debug!(
            "universal: first candidate file {} to reduce size amp",
            files[start_index].file_number()
        );

        // Sum every remaining file except the oldest. A claimed file in
        // the middle makes size-amp reduction impossible right now.
        let mut candidate_size = 0u64;
        let mut candidate_count = 0usize;
        for f in &files[start_index..files.len() - 1] {
            if f.being_compacted() {
                debug!(
                    "universal: file {} already being compacted, no size amp reduction possible",
                    f.file_number()
                );
                return None;
            }
            candidate_size += f.compensated_file_size();
            candidate_count += 1;
        }
        if candidate_count == 0 {
            return None;
        }

        let earliest_file_size = files.last().expect("non-empty level").file_size();
        if candidate_size * 100 < ratio * earliest_file_size {
            debug!(
                "universal: size amp not needed, newer-files-total-size {} earliest-file-size {}",
                candidate_size, earliest_file_size
            );
            return None;
        }
        debug!(
            "universal: size amp needed, newer-files-total-size {} earliest-file-size {}",
            candidate_size, earliest_file_size
        );
        debug_assert!(start_index < files.len() - 1);

        let estimated_total_size: u64 =
            files[start_index..].iter().map(|f| f.file_size()).sum();
        let path_id = get_path_id(self.ioptions(), estimated_total_size);

        // Everything from the first free file through the oldest is
        // compacted, so the output is always compressed.
        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            0,
            0,
            mutable.max_file_size_for_level(0),
            u64::MAX,
            path_id,
            self.ioptions().compression_for_level(0),
        );
        c.score = score;
        for f in &files[start_index..] {
            c.inputs[0].files.push(Arc::clone(f));
            debug!(
                "universal: size amp picking file {} with size {} (compensated size {})",
                f.file_number(),
                f.file_size(),
                f.compensated_file_size()
            );
        }
        Some(c)
    }

    /// Size-ratio sub-policy: collect a contiguous run of files where each
    /// next file stays within `ratio` percent of the candidate size.
    ///
    /// With the total-size stop style the candidate size is the running
    /// sum; with similar-size it is the last picked file, checked in both
    /// directions so neither neighbor dwarfs the other.
    fn pick_universal_read_amp(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        score: f64,
        ratio: u32,
        max_number_of_files_to_compact: usize,
    ) -> Option<Compaction> {
        let universal = self.ioptions().universal;
        let min_merge_width = universal.min_merge_width.max(2);
        let max_files_to_compact =
            universal.max_merge_width.min(max_number_of_files_to_compact);

        let files = version.files(0);
        let mut start_index = 0usize;
        let mut candidate_count = 0usize;
        let mut done = false;

        let mut loop_index = 0usize;
        while loop_index < files.len() {
            // Skip files that are already being compacted.
            let mut candidate = None;
            while loop_index < files.len() {
                let f = &files[loop_index];
                if !f.being_compacted() {
                    candidate = Some(f);
                    candidate_count = 1;
                    break;
                }
                debug!(
                    "universal: file {} being compacted, skipping",
                    f.file_number()
                );
                loop_index += 1;
            }

            let mut candidate_size = match candidate {
                Some(f) => {
                    debug!(
                        "universal: possible candidate file {}",
                        f.file_number()
                    );
                    f.compensated_file_size()
                }
                None => break,
            };

            // Check whether the succeeding files extend the run.
            let mut i = loop_index + 1;
            while candidate_count < max_files_to_compact && i < files.len() {
                let f = &files[i];
                if f.being_compacted() {
                    break;
                }
                // Pick the next file only while the candidate size,
                // widened by the ratio, still covers it.
                let size_with_slack =
                    candidate_size as f64 * (100.0 + f64::from(ratio)) / 100.0;
                if size_with_slack < f.file_size() as f64 {
                    break;
                }
                if universal.stop_style == StopStyle::SimilarSize {
                    // The last picked file must not dwarf the next one
                    // either. A stretch of small files this one begins
                    // will be collected on a later outer iteration; a
                    // lone straggler falls to the last-resort policy.
                    let size_with_slack =
                        f.file_size() as f64 * (100.0 + f64::from(ratio)) / 100.0;
                    if size_with_slack < candidate_size as f64 {
                        break;
                    }
                    candidate_size = f.compensated_file_size();
                } else {
                    candidate_size += f.compensated_file_size();
                }
                candidate_count += 1;
                i += 1;
            }

            if candidate_count >= min_merge_width {
                start_index = loop_index;
                done = true;
                break;
            }
            for f in &files[loop_index..(loop_index + candidate_count).min(files.len())] {
                debug!(
                    "universal: skipping file {} with size {} (compensated size {})",
                    f.file_number(),
                    f.file_size(),
                    f.compensated_file_size()
                );
            }
            loop_index += 1;
        }
        if !done || candidate_count <= 1 {
            return None;
        }
        let first_index_after = start_index + candidate_count;

        // Compression is skipped once the files older than this compaction
        // already hold the configured share of the level: older data is
        // presumed compressed already.
        let mut enable_compression = true;
        let ratio_to_compress = self.ioptions().universal.compression_size_percent;
        if ratio_to_compress >= 0 {
            let total_size = version.num_level_bytes(0);
            let mut older_file_size = 0u64;
            let mut i = files.len();
            while i > first_index_after {
                i -= 1;
                older_file_size += files[i].file_size();
                if older_file_size * 100 >= total_size * ratio_to_compress as u64 {
                    enable_compression = false;
                    break;
                }
            }
        }

        let estimated_total_size: u64 = files[..first_index_after]
            .iter()
            .map(|f| f.file_size())
            .sum();
        let path_id = get_path_id(self.ioptions(), estimated_total_size);

        let compression = if enable_compression {
            self.ioptions().compression_for_level(0)
        } else {
            crate::options::Compression::None
        };
        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            0,
            0,
            mutable.max_file_size_for_level(0),
            u64::MAX,
            path_id,
            compression,
        );
        c.score = score;
        for f in &files[start_index..first_index_after] {
            c.inputs[0].files.push(Arc::clone(f));
            debug!(
                "universal: picking file {} with size {} (compensated size {})",
                f.file_number(),
                f.file_size(),
                f.compensated_file_size()
            );
        }
        Some(c)
    }
}
