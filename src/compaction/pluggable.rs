//! Pluggable strategy - file selection supplied by the host.
//!
//! An external [`Compactor`] names the files it wants merged; the picker
//! only validates the choice. The sanitizer widens the set until no user
//! key is torn and no claimed file is touched, then the file numbers are
//! resolved back into per-level inputs and formed into a compaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::Result;
use crate::options::{Compression, MutableOptions};
use crate::version::{ColumnFamilyMetaData, Version};

use super::picker::ManualCompaction;
use super::{Compaction, CompactionPicker};

/// Options an external compactor can set for the merges it requests.
#[derive(Debug, Clone, Copy)]
pub struct CompactionOptions {
    /// Compression for the output.
    pub compression: Compression,
    /// Target size for output files.
    pub output_file_size_limit: u64,
}

impl Default for CompactionOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            output_file_size_limit: u64::MAX,
        }
    }
}

/// Externally supplied selection strategy.
///
/// Implementations see the user-key-level snapshot view and answer with
/// file numbers; every answer still passes through the picker's sanitizer
/// before any work is formed.
pub trait Compactor: Send + Sync {
    /// Choose the files for the next compaction and the level the output
    /// should land at.
    fn pick_compaction(&self, cf_meta: &ColumnFamilyMetaData) -> Result<(Vec<u64>, i32)>;

    /// Choose the files covering a compaction of `input_level` into
    /// `output_level`.
    fn pick_compaction_by_range(
        &self,
        cf_meta: &ColumnFamilyMetaData,
        input_level: usize,
        output_level: i32,
    ) -> Result<Vec<u64>>;

    /// Options applied to the compactions this compactor requests.
    fn compact_options(&self) -> CompactionOptions {
        CompactionOptions::default()
    }
}

impl CompactionPicker {
    /// Ask the external compactor for work and validate its answer.
    pub(crate) fn pick_compaction_pluggable(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
    ) -> Option<Arc<Compaction>> {
        let compactor = self.compactor()?;
        let cf_meta = version.column_family_meta_data();

        let (file_numbers, output_level) = match compactor.pick_compaction(&cf_meta) {
            Ok(picked) => picked,
            Err(e) => {
                warn!("external compactor failed to pick: {}", e);
                return None;
            }
        };
        if file_numbers.is_empty() {
            return None;
        }

        let mut input_set: BTreeSet<u64> = file_numbers.into_iter().collect();
        self.form_from_file_numbers(
            &compactor.compact_options(),
            &mut input_set,
            &cf_meta,
            output_level,
            version,
            mutable,
        )
    }

    /// Range-driven variant of the pluggable pick.
    pub(crate) fn compact_range_pluggable(
        &mut self,
        mutable: &MutableOptions,
        version: &Arc<Version>,
        input_level: usize,
        output_level: usize,
    ) -> Option<ManualCompaction> {
        let compactor = self.compactor()?;
        let cf_meta = version.column_family_meta_data();

        let file_numbers =
            match compactor.pick_compaction_by_range(&cf_meta, input_level, output_level as i32)
            {
                Ok(picked) => picked,
                Err(e) => {
                    warn!("external compactor failed to pick by range: {}", e);
                    return None;
                }
            };
        if file_numbers.is_empty() {
            return None;
        }

        let mut input_set: BTreeSet<u64> = file_numbers.into_iter().collect();
        let compaction = self.form_from_file_numbers(
            &CompactionOptions::default(),
            &mut input_set,
            &cf_meta,
            output_level as i32,
            version,
            mutable,
        )?;
        Some(ManualCompaction {
            compaction,
            next_begin: None,
        })
    }

    fn compactor(&self) -> Option<Arc<dyn Compactor>> {
        self.compactor_ref().cloned()
    }

    /// Sanitize the chosen numbers, resolve them into per-level inputs and
    /// form the compaction.
    fn form_from_file_numbers(
        &mut self,
        compact_options: &CompactionOptions,
        input_set: &mut BTreeSet<u64>,
        cf_meta: &ColumnFamilyMetaData,
        output_level: i32,
        version: &Arc<Version>,
        mutable: &MutableOptions,
    ) -> Option<Arc<Compaction>> {
        if let Err(e) = self.sanitize_compaction_input_files(input_set, cf_meta, output_level) {
            warn!("rejecting externally picked compaction: {}", e);
            return None;
        }

        let input_files = match self.get_compaction_inputs_from_file_numbers(input_set, version)
        {
            Ok(inputs) if !inputs.is_empty() => inputs,
            Ok(_) => return None,
            Err(e) => {
                warn!("rejecting externally picked compaction: {}", e);
                return None;
            }
        };

        debug!(
            "external compactor picked {} input levels into level {}",
            input_files.len(),
            output_level
        );
        Some(self.form_compaction(compact_options, input_files, output_level, version, mutable))
    }
}
