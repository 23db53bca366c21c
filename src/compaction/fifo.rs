//! FIFO strategy - enforce a total-size cap by dropping the oldest files.
//!
//! FIFO trees have a single level. No merging happens; once the level
//! outgrows its cap, the oldest files are deleted outright until the cap
//! holds again.

use std::sync::Arc;

use log::debug;

use crate::options::Compression;
use crate::version::Version;

use super::picker::ManualCompaction;
use super::{Compaction, CompactionPicker};

impl CompactionPicker {
    /// Pick a deletion-only compaction trimming the level back under the
    /// configured cap.
    pub(crate) fn pick_compaction_fifo(
        &mut self,
        version: &Arc<Version>,
    ) -> Option<Arc<Compaction>> {
        let c = self.pick_fifo(version)?;
        Some(self.register_compaction(c))
    }

    /// FIFO variant of a manual range request. The key range is ignored:
    /// the only work FIFO knows is dropping the oldest files, and that
    /// always covers the whole range.
    pub(crate) fn compact_range_fifo(
        &mut self,
        version: &Arc<Version>,
        input_level: usize,
        output_level: usize,
        output_path_id: u32,
    ) -> Option<ManualCompaction> {
        debug_assert_eq!(input_level, 0);
        debug_assert_eq!(output_level, 0);
        let mut c = self.pick_fifo(version)?;
        debug_assert!(
            self.ioptions().db_paths.is_empty()
                || (output_path_id as usize) < self.ioptions().db_paths.len()
        );
        c.output_path_id = output_path_id;
        Some(ManualCompaction {
            compaction: self.register_compaction(c),
            next_begin: None,
        })
    }

    fn pick_fifo(&mut self, version: &Arc<Version>) -> Option<Compaction> {
        debug_assert_eq!(version.number_levels(), 1);
        let max_table_files_size = self.ioptions().fifo.max_table_files_size;

        let mut total_size: u64 = version
            .files(0)
            .iter()
            .map(|f| f.compensated_file_size())
            .sum();
        if total_size <= max_table_files_size || version.files(0).is_empty() {
            debug!(
                "fifo: nothing to do, total size {}, max size {}",
                total_size, max_table_files_size
            );
            return None;
        }

        // Deletions are fast; one at a time is plenty.
        if !self.compactions_in_progress(0).is_empty() {
            debug!("fifo: already executing compaction, not running parallel compactions");
            return None;
        }

        let mut c = Compaction::new(
            self.alloc_id(),
            Arc::clone(version),
            0,
            0,
            0,
            0,
            0,
            Compression::None,
        );
        c.deletion_compaction = true;

        // Delete the oldest files until the cap holds.
        for f in version.files(0).iter().rev() {
            total_size -= f.compensated_file_size();
            c.inputs[0].files.push(Arc::clone(f));
            debug!(
                "fifo: picking file {} with size {} for deletion",
                f.file_number(),
                f.file_size()
            );
            if total_size <= max_table_files_size {
                break;
            }
        }
        Some(c)
    }
}
