//! Leveled strategy - size-scored, key-partitioned levels.
//!
//! A score over 1 at a level means it holds more bytes than its target
//! (or, at level 0, more files than the trigger). The picker walks levels
//! in score order, seeds a compaction with the largest eligible file of
//! the first qualifying level, expands it to a clean cut and attaches the
//! overlapping files one level down.

use std::sync::Arc;

use log::debug;

use crate::options::MutableOptions;
use crate::version::Version;

use super::{Compaction, CompactionPicker};

impl CompactionPicker {
    /// Pick a leveled compaction from the highest-scoring level that
    /// yields a usable candidate.
    pub(crate) fn pick_compaction_leveled(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
    ) -> Option<Arc<Compaction>> {
        // Recompute scores here so levels with work already in flight are
        // discounted; stale scores would double-schedule them.
        let sizes_being_compacted = self.sizes_being_compacted();
        version.compute_compaction_score(self.ioptions(), mutable, &sizes_being_compacted);

        let mut picked = None;
        let scores = version.compaction_scores();
        for (i, &(level, score)) in scores.iter().enumerate() {
            debug_assert!(i == 0 || score <= scores[i - 1].1);
            if score < 1.0 {
                break;
            }
            if let Some(mut c) = self.pick_compaction_by_size(mutable, version, level, score) {
                if self.expand_while_overlapping(&mut c) {
                    picked = Some(c);
                    break;
                }
            }
        }
        let mut c = picked?;

        // Level-0 files overlap, so the seed is replaced by every file its
        // user-key range touches, and only one level-0 compaction may run.
        if c.level() == 0 {
            debug_assert!(self.compactions_in_progress(0).is_empty());
            let (smallest, largest) = self.key_range(&c.inputs[0].files);
            c.inputs[0].files = version.overlapping_inputs(0, Some(&smallest), Some(&largest));

            // Pulling in more level-0 files can stretch the bounds, so the
            // parent check runs against the recomputed range.
            let (smallest, largest) = self.key_range(&c.inputs[0].files);
            let mut parent_index = c.parent_index;
            if self.parent_range_in_compaction(version, &smallest, &largest, 0, &mut parent_index)
            {
                return None;
            }
            c.parent_index = parent_index;
            debug_assert!(!c.inputs[0].is_empty());
        }

        self.setup_other_inputs(mutable, &mut c);
        c.setup_bottommost_level();

        debug!(
            "leveled: picked {}+{} files at level {} (score {:.2})",
            c.num_input_files(0),
            c.num_input_files(1),
            c.level(),
            c.score()
        );
        Some(self.register_compaction(c))
    }

    /// Seed a compaction at `level` with the largest file that is neither
    /// claimed nor blocked by claimed parents.
    ///
    /// The scan starts at the level's round-robin cursor and the cursor is
    /// advanced to the first unclaimed file, so successive picks rotate
    /// through the level instead of hammering its head.
    pub(crate) fn pick_compaction_by_size(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        level: usize,
        score: f64,
    ) -> Option<Compaction> {
        // Level-0 files overlap, so at most one compaction may run there.
        if level == 0 && !self.compactions_in_progress(0).is_empty() {
            return None;
        }

        debug_assert!(level + 1 < version.number_levels());
        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            level,
            level + 1,
            mutable.max_file_size_for_level(level + 1),
            mutable.max_grandparent_overlap_bytes(level),
            0,
            self.ioptions().compression_for_level(level + 1),
        );
        c.score = score;

        let order = version.files_by_size(level);
        let files = version.files(level);
        let mut next_index = None;

        for i in self.next_index(level).min(order.len())..order.len() {
            let index = order[i];
            let f = &files[index];

            debug_assert!(
                i == order.len() - 1
                    || f.compensated_file_size()
                        >= files[order[i + 1]].compensated_file_size()
            );

            // Claimed from a compaction out of level - 1.
            if f.being_compacted() {
                continue;
            }

            if next_index.is_none() {
                next_index = Some(i);
            }

            // A claimed parent would make the merge overlap in-flight
            // output; look for a quieter file instead.
            let mut parent_index = None;
            if self.parent_range_in_compaction(
                version,
                f.smallest(),
                f.largest(),
                level,
                &mut parent_index,
            ) {
                continue;
            }

            c.inputs[0].files.push(Arc::clone(f));
            c.base_index = Some(index);
            c.parent_index = parent_index;
            break;
        }

        // Where the next pick resumes its scan.
        self.set_next_index(level, next_index.unwrap_or(0));

        if c.inputs[0].is_empty() {
            return None;
        }
        Some(c)
    }
}
