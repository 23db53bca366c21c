//! Integration tests for complete picking workflows.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use compaction_picker::{
    CompactionPicker, CompactionStyle, Compression, Error, FifoCompactionOptions,
    ImmutableOptions, InternalKey, InternalKeyComparator, MutableOptions, StopStyle,
    UniversalCompactionOptions, Version,
};
use compaction_picker::{FileMetadata, ValueType};

const MB: u64 = 1 << 20;

fn make_key(user_key: &str, seq: u64) -> InternalKey {
    InternalKey::new(
        Bytes::copy_from_slice(user_key.as_bytes()),
        seq,
        ValueType::Value,
    )
}

fn make_file(num: u64, size: u64, smallest: &str, largest: &str) -> Arc<FileMetadata> {
    Arc::new(FileMetadata::new(
        num,
        size,
        make_key(smallest, 1),
        make_key(largest, 1),
    ))
}

/// A level-0 run covering the whole key space with the given sequence span.
fn make_run(num: u64, size: u64, seq_lo: u64, seq_hi: u64) -> Arc<FileMetadata> {
    Arc::new(FileMetadata::new(
        num,
        size,
        make_key("a", seq_lo),
        make_key("z", seq_hi),
    ))
}

fn make_version(num_levels: usize, files: Vec<Vec<Arc<FileMetadata>>>) -> Arc<Version> {
    let mut all = files;
    all.resize(num_levels, Vec::new());
    Arc::new(Version::with_files(InternalKeyComparator::bytewise(), all))
}

fn leveled_picker(num_levels: usize) -> CompactionPicker {
    let ioptions = Arc::new(ImmutableOptions {
        num_levels,
        ..Default::default()
    });
    CompactionPicker::new(ioptions, InternalKeyComparator::bytewise())
}

fn universal_picker(universal: UniversalCompactionOptions) -> CompactionPicker {
    let ioptions = Arc::new(ImmutableOptions {
        num_levels: 1,
        compaction_style: CompactionStyle::Universal,
        compression: Compression::Snappy,
        universal,
        ..Default::default()
    });
    CompactionPicker::new(ioptions, InternalKeyComparator::bytewise())
}

/// Options tuned so a 700-byte level 1 scores 1.3.
fn leveled_mutable() -> MutableOptions {
    MutableOptions {
        max_bytes_for_level_base: 538,
        max_bytes_for_level_multiplier: 10,
        target_file_size_base: 64,
        target_file_size_multiplier: 1,
        expanded_compaction_factor: 25,
        ..Default::default()
    }
}

/// Seven levels; level 1 over target picks its largest file and the
/// overlapping parent, with no lateral growth and no grandparents.
#[test]
fn leveled_score_gate_picks_largest_file() {
    let mut files = vec![Vec::new(); 7];
    files[1].push(make_file(1, 100, "a", "c"));
    files[1].push(make_file(2, 400, "d", "f"));
    files[1].push(make_file(3, 200, "g", "i"));
    files[2].push(make_file(4, 1000, "e", "h"));
    let version = make_version(7, files);

    let mut picker = leveled_picker(7);
    let c = picker
        .pick_compaction(&leveled_mutable(), &version)
        .expect("level 1 score is 1.3");

    assert_eq!(c.level(), 1);
    assert_eq!(c.output_level(), 2);
    assert_eq!(c.num_input_files(0), 1);
    assert_eq!(c.input(0, 0).file_number(), 2);
    assert_eq!(c.num_input_files(1), 1);
    assert_eq!(c.input(1, 0).file_number(), 4);
    // Growing laterally would put 1600 bytes against a 1600-byte limit.
    assert!(c.grandparents().is_empty());
    assert!((c.score() - 700.0 / 538.0).abs() < 1e-9);

    // Claim flags agree exactly with the picked inputs.
    for f in version.files(1) {
        assert_eq!(f.being_compacted(), f.file_number() == 2);
    }
    assert!(version.files(2)[0].being_compacted());

    // Release clears every claim and empties the in-flight set.
    picker.release_compaction_files(&c, Ok(()));
    assert!(version.files(1).iter().all(|f| !f.being_compacted()));
    assert!(!version.files(2)[0].being_compacted());
    assert!(picker.compactions_in_progress(1).is_empty());
}

/// With the parent level claimed across the whole key space, every
/// candidate at the scoring level is blocked and nothing is picked.
#[test]
fn leveled_blocked_by_in_flight_parent() {
    let mut files = vec![Vec::new(); 7];
    files[1].push(make_file(1, 100, "a", "c"));
    files[1].push(make_file(2, 400, "d", "f"));
    files[1].push(make_file(3, 200, "g", "i"));
    files[2].push(make_file(4, 1000, "a", "h"));
    files[2][0].set_being_compacted(true);
    let version = make_version(7, files);

    let mut picker = leveled_picker(7);
    assert!(picker.pick_compaction(&leveled_mutable(), &version).is_none());
    assert!(version.files(1).iter().all(|f| !f.being_compacted()));
}

/// Files sharing a user key at their boundary are never cut apart: the
/// seed expands across the shared key to a clean cut.
#[test]
fn leveled_expansion_reaches_clean_cut() {
    let mut files = vec![Vec::new(); 7];
    // Files 1 and 2 split user key "c" across the boundary.
    files[1].push(Arc::new(FileMetadata::new(
        1,
        100,
        make_key("a", 9),
        make_key("c", 5),
    )));
    files[1].push(Arc::new(FileMetadata::new(
        2,
        400,
        make_key("c", 4),
        make_key("e", 1),
    )));
    files[1].push(make_file(3, 50, "g", "i"));
    let version = make_version(7, files);

    let mutable = MutableOptions {
        max_bytes_for_level_base: 500,
        ..leveled_mutable()
    };
    let mut picker = leveled_picker(7);
    let c = picker
        .pick_compaction(&mutable, &version)
        .expect("level 1 is over target");

    // The largest file seeds the pick, and expansion pulls in the file it
    // shares a user key with; the disjoint file stays out.
    let picked: BTreeSet<u64> = c.inputs(0).iter().map(|f| f.file_number()).collect();
    assert_eq!(picked, [1, 2].into_iter().collect());
    assert!(!version.has_overlapping_user_key(c.inputs(0), 1));
}

/// Lateral growth is free only while the parent set stays fixed: the
/// extra input file joins, the parent list does not change.
#[test]
fn leveled_lateral_growth_keeps_parents_fixed() {
    let mut files = vec![Vec::new(); 7];
    files[1].push(make_file(1, 100, "a", "b"));
    files[1].push(make_file(2, 400, "d", "e"));
    files[2].push(make_file(3, 1000, "a", "e"));
    let version = make_version(7, files);

    let mutable = MutableOptions {
        max_bytes_for_level_base: 400,
        ..leveled_mutable()
    };
    let mut picker = leveled_picker(7);
    let c = picker
        .pick_compaction(&mutable, &version)
        .expect("level 1 is over target");

    // Seeded with file 2; the union range [a, e] also covers file 1, and
    // taking it changes nothing at level 2.
    assert_eq!(c.num_input_files(0), 2);
    assert_eq!(c.num_input_files(1), 1);
    assert_eq!(c.input(1, 0).file_number(), 3);
}

/// Tiered size-amplification: newer runs outweigh the oldest one, so the
/// whole level folds into a single run.
#[test]
fn universal_size_amp_trigger() {
    let mut picker = universal_picker(UniversalCompactionOptions {
        max_size_amplification_percent: 25,
        ..Default::default()
    });
    // Oldest to newest: O(1000), A(100), B(100), C(100).
    let version = make_version(
        1,
        vec![vec![
            make_run(4, 100, 31, 40),
            make_run(3, 100, 21, 30),
            make_run(2, 100, 11, 20),
            make_run(1, 1000, 1, 10),
        ]],
    );

    let c = picker
        .pick_compaction(&MutableOptions::default(), &version)
        .expect("candidate size 300 >= 25% of 1000");

    let numbers: Vec<u64> = c.inputs(0).iter().map(|f| f.file_number()).collect();
    assert_eq!(numbers, vec![4, 3, 2, 1]);
    assert!(c.is_full_compaction());
    assert!(c.bottommost_level());
    // Full folds are always compressed.
    assert_eq!(c.compression(), Compression::Snappy);
}

/// Tiered size-ratio with the similar-size stop style: the run of
/// near-equal files is picked, the jump to the large old runs is not.
#[test]
fn universal_size_ratio_similar_size_stop() {
    let mut picker = universal_picker(UniversalCompactionOptions {
        size_ratio: 20,
        min_merge_width: 2,
        max_merge_width: 8,
        stop_style: StopStyle::SimilarSize,
        ..Default::default()
    });
    // Newest to oldest: 100, 110, 120, 5000, 5500.
    let version = make_version(
        1,
        vec![vec![
            make_run(5, 100, 41, 50),
            make_run(4, 110, 31, 40),
            make_run(3, 120, 21, 30),
            make_run(2, 5000, 11, 20),
            make_run(1, 5500, 1, 10),
        ]],
    );

    let mutable = MutableOptions {
        level0_file_num_compaction_trigger: 5,
        ..Default::default()
    };
    let c = picker
        .pick_compaction(&mutable, &version)
        .expect("three runs sit within 20% of each other");

    let sizes: Vec<u64> = c.inputs(0).iter().map(|f| f.file_size()).collect();
    assert_eq!(sizes, vec![100, 110, 120]);

    // The picked runs never interleave in sequence space.
    for pair in c.inputs(0).windows(2) {
        assert!(pair[0].smallest_seqno() > pair[1].largest_seqno());
    }
}

/// FIFO eviction: oldest files are dropped until the cap holds again.
#[test]
fn fifo_evicts_oldest_first() {
    let ioptions = Arc::new(ImmutableOptions {
        num_levels: 1,
        compaction_style: CompactionStyle::Fifo,
        fifo: FifoCompactionOptions {
            max_table_files_size: 1000,
        },
        ..Default::default()
    });
    let mut picker = CompactionPicker::new(ioptions, InternalKeyComparator::bytewise());

    // Newest first: F1(600), F2(300), F3(400, oldest). Total 1300.
    let version = make_version(
        1,
        vec![vec![
            make_run(1, 600, 21, 30),
            make_run(2, 300, 11, 20),
            make_run(3, 400, 1, 10),
        ]],
    );

    let c = picker
        .pick_compaction(&MutableOptions::default(), &version)
        .expect("1300 exceeds the 1000-byte cap");

    assert_eq!(c.num_input_files(0), 1);
    assert_eq!(c.input(0, 0).file_number(), 3);
    assert!(c.is_deletion_compaction());

    // What survives fits the cap.
    let remaining: u64 = version
        .files(0)
        .iter()
        .filter(|f| !f.being_compacted())
        .map(|f| f.compensated_file_size())
        .sum();
    assert!(remaining <= 1000);
}

/// Manual range compaction over an oversized range is truncated, and the
/// caller learns where to resume.
#[test]
fn compact_range_truncates_oversized_batch() {
    let mut files = vec![Vec::new(); 7];
    files[2].push(make_file(1, 300 * MB, "aa", "bb"));
    files[2].push(make_file(2, 300 * MB, "cc", "dd"));
    files[2].push(make_file(3, 300 * MB, "ee", "ff"));
    let version = make_version(7, files);

    // Batch cap: 250MB * 2 = 500MB.
    let mutable = MutableOptions {
        target_file_size_base: 250 * MB,
        target_file_size_multiplier: 1,
        source_compaction_factor: 2,
        ..Default::default()
    };
    let mut picker = leveled_picker(7);
    let manual = picker
        .compact_range(
            &mutable,
            &version,
            2,
            3,
            0,
            Some(&make_key("aa", 1)),
            Some(&make_key("ff", 1)),
        )
        .expect("range covers three files");

    let c = &manual.compaction;
    // Adding the second file would reach 600MB >= 500MB, so only the
    // first is taken and the caller resumes at the first excluded key.
    assert_eq!(c.num_input_files(0), 1);
    assert_eq!(c.input(0, 0).file_number(), 1);
    assert!(c.is_manual_compaction());
    assert_eq!(
        manual.next_begin.as_ref().map(|k| k.user_key()),
        Some(b"cc".as_slice())
    );

    // Resuming from the reported key truncates again at the third file.
    picker.release_compaction_files(c, Ok(()));
    let manual = picker
        .compact_range(
            &mutable,
            &version,
            2,
            3,
            0,
            manual.next_begin.as_ref(),
            Some(&make_key("ff", 1)),
        )
        .expect("two files remain in range");
    assert_eq!(manual.compaction.input(0, 0).file_number(), 2);
    assert_eq!(
        manual.next_begin.as_ref().map(|k| k.user_key()),
        Some(b"ee".as_slice())
    );

    // The final slice covers the rest of the range.
    picker.release_compaction_files(&manual.compaction, Ok(()));
    let manual = picker
        .compact_range(
            &mutable,
            &version,
            2,
            3,
            0,
            manual.next_begin.as_ref(),
            Some(&make_key("ff", 1)),
        )
        .expect("one file remains in range");
    assert_eq!(manual.compaction.input(0, 0).file_number(), 3);
    assert!(manual.next_begin.is_none());
}

/// Manual compaction of an empty range picks nothing.
#[test]
fn compact_range_empty_range() {
    let mut files = vec![Vec::new(); 7];
    files[2].push(make_file(1, 100, "aa", "bb"));
    let version = make_version(7, files);

    let mut picker = leveled_picker(7);
    assert!(picker
        .compact_range(
            &MutableOptions::default(),
            &version,
            2,
            3,
            0,
            Some(&make_key("x", 1)),
            Some(&make_key("z", 1)),
        )
        .is_none());
}

/// Sanitizing a sanitized set changes nothing.
#[test]
fn sanitize_is_idempotent() {
    let mut files = vec![Vec::new(); 3];
    files[0].push(make_run(1, 100, 1, 10));
    files[1].push(make_file(11, 100, "a", "c"));
    files[1].push(make_file(12, 100, "c", "f"));
    files[1].push(make_file(13, 100, "g", "i"));
    files[2].push(make_file(21, 100, "b", "e"));
    files[2].push(make_file(22, 100, "x", "z"));
    let version = make_version(3, files);

    let ioptions = Arc::new(ImmutableOptions {
        num_levels: 3,
        compaction_style: CompactionStyle::Pluggable,
        ..Default::default()
    });
    let picker = CompactionPicker::new(ioptions, InternalKeyComparator::bytewise());
    let cf_meta = version.column_family_meta_data();

    let mut first: BTreeSet<u64> = [11].into_iter().collect();
    picker
        .sanitize_compaction_input_files(&mut first, &cf_meta, 2)
        .unwrap();
    // File 12 shares user key "c" with file 11; file 21 overlaps the
    // widened range at level 2. The level-0 run was not requested and
    // stays out, as does the disjoint file 22.
    assert!(first.contains(&12));
    assert!(first.contains(&21));
    assert!(!first.contains(&1));
    assert!(!first.contains(&22));

    let mut second = first.clone();
    picker
        .sanitize_compaction_input_files(&mut second, &cf_meta, 2)
        .unwrap();
    assert_eq!(first, second);
}

/// Sanitize rejects unknown files, claimed files, empty sets and bad
/// output levels with the right error kinds.
#[test]
fn sanitize_rejects_bad_input() {
    let mut files = vec![Vec::new(); 3];
    files[1].push(make_file(11, 100, "a", "c"));
    files[1].push(make_file(12, 100, "d", "f"));
    let version = make_version(3, files);

    let ioptions = Arc::new(ImmutableOptions {
        num_levels: 3,
        compaction_style: CompactionStyle::Pluggable,
        ..Default::default()
    });
    let picker = CompactionPicker::new(ioptions, InternalKeyComparator::bytewise());
    let cf_meta = version.column_family_meta_data();

    let mut empty = BTreeSet::new();
    assert!(matches!(
        picker.sanitize_compaction_input_files(&mut empty, &cf_meta, 2),
        Err(Error::InvalidArgument(_))
    ));

    let mut unknown: BTreeSet<u64> = [99].into_iter().collect();
    assert!(matches!(
        picker.sanitize_compaction_input_files(&mut unknown, &cf_meta, 2),
        Err(Error::InvalidArgument(_))
    ));

    let mut bad_level: BTreeSet<u64> = [11].into_iter().collect();
    assert!(matches!(
        picker.sanitize_compaction_input_files(&mut bad_level, &cf_meta, 5),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        picker.sanitize_compaction_input_files(&mut bad_level, &cf_meta, -7),
        Err(Error::InvalidArgument(_))
    ));

    version.files(1)[0].set_being_compacted(true);
    let cf_meta = version.column_family_meta_data();
    let mut claimed: BTreeSet<u64> = [11].into_iter().collect();
    assert!(matches!(
        picker.sanitize_compaction_input_files(&mut claimed, &cf_meta, 2),
        Err(Error::Aborted(_))
    ));
}

/// Across live compactions, the claim flags are exactly the union of all
/// picked inputs, and releases peel them off one compaction at a time.
#[test]
fn in_flight_flags_match_live_compactions() {
    let mut files = vec![Vec::new(); 7];
    files[1].push(make_file(1, 400, "a", "c"));
    files[1].push(make_file(2, 300, "d", "f"));
    files[1].push(make_file(3, 200, "g", "i"));
    let version = make_version(7, files);

    let mutable = MutableOptions {
        max_bytes_for_level_base: 100,
        ..leveled_mutable()
    };
    let mut picker = leveled_picker(7);

    let first = picker.pick_compaction(&mutable, &version).unwrap();
    let second = picker.pick_compaction(&mutable, &version).unwrap();
    assert_eq!(picker.compactions_in_progress(1).len(), 2);

    let claimed: BTreeSet<u64> = version
        .files(1)
        .iter()
        .filter(|f| f.being_compacted())
        .map(|f| f.file_number())
        .collect();
    let inputs: BTreeSet<u64> = [&first, &second]
        .iter()
        .flat_map(|c| c.inputs(0).iter().chain(c.inputs(1).iter()))
        .map(|f| f.file_number())
        .collect();
    assert_eq!(claimed, inputs);

    picker.release_compaction_files(&first, Ok(()));
    let claimed: BTreeSet<u64> = version
        .files(1)
        .iter()
        .filter(|f| f.being_compacted())
        .map(|f| f.file_number())
        .collect();
    let inputs: BTreeSet<u64> = second
        .inputs(0)
        .iter()
        .chain(second.inputs(1).iter())
        .map(|f| f.file_number())
        .collect();
    assert_eq!(claimed, inputs);
}
