use multi_stream_aligner::{
    EpochRenormalizer, Error, FramePattern, Progress, ProgressReporter, RenameOutcome, RenamePlan,
    Timestamp,
};
use std::{fs, path::Path};
use tempfile::tempdir;

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

fn accept(_: &RenamePlan, _: Timestamp) -> bool {
    true
}

#[test]
fn plan_shifts_to_zero_based_epoch() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["105.jpg", "100.jpg", "110.jpg", "notes.txt"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();

    assert_eq!(plan.min_timestamp(), 100);
    assert_eq!(plan.len(), 3);
    assert_eq!(
        plan.entries()
            .iter()
            .map(|entry| entry.timestamp)
            .collect::<Vec<_>>(),
        vec![100, 105, 110]
    );

    let targets: Vec<_> = plan
        .mapping(0)
        .unwrap()
        .into_iter()
        .map(|(source, target)| {
            (
                source.file_name().unwrap().to_str().unwrap().to_string(),
                target.file_name().unwrap().to_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        targets,
        vec![
            ("100.jpg".to_string(), "00000000.jpg".to_string()),
            ("105.jpg".to_string(), "00000005.jpg".to_string()),
            ("110.jpg".to_string(), "00000010.jpg".to_string()),
        ]
    );

    assert_eq!(plan.target_name(105, 1000).unwrap(), "00001005.jpg");
    assert_eq!(plan.target_name(100, -5).unwrap(), "-0000005.jpg");
}

#[test]
fn apply_renames_and_marks_directory() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["105.jpg", "100.jpg", "110.jpg", "notes.txt"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    let (reporter, progress_rx) = ProgressReporter::channel();

    let outcome = renormalizer
        .apply(&plan, 0, &mut accept, reporter)
        .unwrap();
    let RenameOutcome::Applied(summary) = outcome else {
        panic!("renaming was cancelled");
    };

    assert!(summary.is_clean());
    assert_eq!(summary.completed, 3);
    assert_eq!(
        *progress_rx.borrow(),
        Progress {
            total: 3,
            completed: 3,
            failed: 0
        }
    );
    assert_eq!(
        file_names(dir.path()),
        vec![".synced", "00000000.jpg", "00000005.jpg", "00000010.jpg", "notes.txt"]
    );
    assert_eq!(
        fs::read(dir.path().join("00000005.jpg")).unwrap(),
        b"105.jpg".to_vec()
    );
    assert!(fs::metadata(dir.path().join(".synced")).unwrap().len() == 0);

    // the renamed frames still match the pattern, the sentinel stops a second shift
    assert!(matches!(
        renormalizer.plan(dir.path()),
        Err(Error::AlreadySynced { .. })
    ));
}

#[test]
fn cancelled_plan_leaves_directory_alone() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["105.jpg", "100.jpg"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();

    let mut asked = 0;
    let mut decline = |plan: &RenamePlan, offset: Timestamp| {
        asked += 1;
        assert_eq!(plan.min_timestamp(), 100);
        assert_eq!(offset, 40);
        false
    };
    let outcome = renormalizer
        .apply(&plan, 40, &mut decline, ProgressReporter::detached())
        .unwrap();

    assert!(matches!(outcome, RenameOutcome::Cancelled));
    assert_eq!(asked, 1);
    assert_eq!(file_names(dir.path()), vec!["100.jpg", "105.jpg"]);
}

#[test]
fn empty_directory_has_no_plan() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["readme.md", "frame.jpg", "12.png"]);
    fs::create_dir(dir.path().join("42.jpg")).unwrap();

    assert!(matches!(
        EpochRenormalizer::default().plan(dir.path()),
        Err(Error::EmptyDirectory { .. })
    ));
}

#[test]
fn collisions_are_reported_not_overwritten() {
    let dir = tempdir().unwrap();
    // both names carry timestamp 5 and map to the same target
    touch(dir.path(), &["5.jpg", "005.jpg", "9.jpg"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    let (reporter, progress_rx) = ProgressReporter::channel();

    let RenameOutcome::Applied(summary) = renormalizer
        .apply(&plan, 0, &mut accept, reporter)
        .unwrap()
    else {
        panic!("renaming was cancelled");
    };

    assert!(!summary.is_clean());
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed(), 1);
    assert!(matches!(
        &summary.failures[0].1,
        Error::RenameCollision { from, .. } if from.ends_with("5.jpg")
    ));
    assert_eq!(progress_rx.borrow().failed, 1);
    assert_eq!(progress_rx.borrow().visited(), 3);

    // no sentinel, the directory is left for the operator to inspect
    assert_eq!(
        file_names(dir.path()),
        vec!["00000000.jpg", "00000004.jpg", "5.jpg"]
    );
    assert_eq!(
        fs::read(dir.path().join("00000000.jpg")).unwrap(),
        b"005.jpg".to_vec()
    );
    assert!(renormalizer.plan(dir.path()).is_ok());
}

#[test]
fn shifting_padded_names_does_not_collide_with_itself() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["00000000.jpg", "00000010.jpg", "00000020.jpg"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    let RenameOutcome::Applied(summary) = renormalizer
        .apply(&plan, 10, &mut accept, ProgressReporter::detached())
        .unwrap()
    else {
        panic!("renaming was cancelled");
    };

    assert!(summary.is_clean());
    assert_eq!(
        file_names(dir.path()),
        vec![".synced", "00000010.jpg", "00000020.jpg", "00000030.jpg"]
    );
    assert_eq!(
        fs::read(dir.path().join("00000030.jpg")).unwrap(),
        b"00000020.jpg".to_vec()
    );
}

#[test]
fn already_normalized_names_are_kept() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["00000000.jpg", "00000033.jpg"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    let RenameOutcome::Applied(summary) = renormalizer
        .apply(&plan, 0, &mut accept, ProgressReporter::detached())
        .unwrap()
    else {
        panic!("renaming was cancelled");
    };

    assert!(summary.is_clean());
    assert_eq!(summary.completed, 2);
    assert_eq!(
        file_names(dir.path()),
        vec![".synced", "00000000.jpg", "00000033.jpg"]
    );
}

#[test]
fn negative_offsets_keep_the_sign() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["-20.png", "-10.png", "0.png"]);

    let renormalizer = EpochRenormalizer::new(FramePattern::new("png"))
        .with_name_width(4)
        .with_sentinel("DONE");
    let plan = renormalizer.plan(dir.path()).unwrap();
    assert_eq!(plan.min_timestamp(), -20);

    renormalizer
        .apply(&plan, -10, &mut accept, ProgressReporter::detached())
        .unwrap();

    assert_eq!(
        file_names(dir.path()),
        vec!["-010.png", "0000.png", "0010.png", "DONE"]
    );
    assert!(matches!(
        renormalizer.plan(dir.path()),
        Err(Error::AlreadySynced { .. })
    ));
}

#[test]
fn offsets_out_of_range_are_refused_before_renaming() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["100.jpg", "110.jpg"]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    assert_eq!(plan.renormalized(100, Timestamp::MAX), Some(Timestamp::MAX));
    assert_eq!(plan.renormalized(110, Timestamp::MAX), None);
    assert_eq!(plan.target_name(110, Timestamp::MAX), None);
    assert!(matches!(
        plan.mapping(Timestamp::MAX),
        Err(Error::TimestampOverflow {
            timestamp: 110,
            offset: Timestamp::MAX
        })
    ));

    let mut asked = 0;
    let mut count = |_: &RenamePlan, _: Timestamp| {
        asked += 1;
        true
    };
    assert!(matches!(
        renormalizer.apply(&plan, Timestamp::MAX, &mut count, ProgressReporter::detached()),
        Err(Error::TimestampOverflow { .. })
    ));
    assert_eq!(asked, 0);
    assert_eq!(file_names(dir.path()), vec!["100.jpg", "110.jpg"]);
}

#[test]
fn extreme_timestamps_do_not_overflow_the_shift() {
    let dir = tempdir().unwrap();
    let min = format!("{}.jpg", Timestamp::MIN);
    let max = format!("{}.jpg", Timestamp::MAX);
    touch(dir.path(), &[min.as_str(), max.as_str()]);

    let renormalizer = EpochRenormalizer::default();
    let plan = renormalizer.plan(dir.path()).unwrap();
    assert_eq!(plan.min_timestamp(), Timestamp::MIN);

    // the span between the two frames does not fit in a timestamp
    assert!(matches!(
        plan.mapping(0),
        Err(Error::TimestampOverflow { .. })
    ));

    // shifting back onto the old epoch keeps every name
    let mapping = plan.mapping(Timestamp::MIN).unwrap();
    assert_eq!(mapping.len(), 2);
    assert!(mapping.iter().all(|(source, target)| source == target));
}

#[test]
fn unwritable_sentinel_is_reported() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &["100.jpg", "110.jpg"]);

    let renormalizer = EpochRenormalizer::default().with_sentinel("marks/.synced");
    let plan = renormalizer.plan(dir.path()).unwrap();
    let (reporter, progress_rx) = ProgressReporter::channel();

    let RenameOutcome::Applied(summary) = renormalizer
        .apply(&plan, 0, &mut accept, reporter)
        .unwrap()
    else {
        panic!("renaming was cancelled");
    };

    // the frames are renamed, only the marker is missing
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed(), 1);
    assert!(!summary.is_clean());
    assert!(matches!(
        &summary.failures[0],
        (path, Error::Io(_)) if path.ends_with("marks/.synced")
    ));
    assert!(progress_rx.borrow().is_finished());
    assert_eq!(
        file_names(dir.path()),
        vec!["00000000.jpg", "00000010.jpg"]
    );
    assert!(renormalizer.plan(dir.path()).is_ok());
}
