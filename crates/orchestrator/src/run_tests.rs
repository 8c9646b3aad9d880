use super::*;
use crate::config::QuarantineSettings;
use snapward_quarantine::{CollisionPolicy, ExternalClassifier, Outcome};
use snapward_snapshot::DocumentNaming;
use std::{
    fs::{Permissions, create_dir, set_permissions, write},
    io,
    os::unix::fs::PermissionsExt,
    sync::{Arc, Mutex},
};

/// Console stand-in that can be inspected after the run.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
    }
}

fn record_names(document: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_to_string(document)
        .expect("read document")
        .lines()
        .filter_map(|l| l.strip_prefix("Name: ").map(str::to_owned))
        .collect();
    names.sort();
    names
}

fn quarantine_with(classifier: ExternalClassifier, iso: &Path) -> Option<QuarantineSettings> {
    Some(QuarantineSettings {
        isolation_dir: iso.to_path_buf(),
        classifier: Arc::new(classifier),
        collision: CollisionPolicy::Overwrite,
    })
}

#[test]
fn end_to_end_snapshot_and_quarantine() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let d = tmp.path().join("d");
    let out = tmp.path().join("out");
    let iso = tmp.path().join("iso");

    // d/
    //   a.txt   (644, 10 bytes)
    //   sub/
    //     b.txt (000, empty)
    create_dir(&d).expect("create d");
    write(d.join("a.txt"), b"0123456789").expect("write a.txt");
    set_permissions(d.join("a.txt"), Permissions::from_mode(0o644)).expect("chmod a.txt");
    create_dir(d.join("sub")).expect("create sub");
    write(d.join("sub").join("b.txt"), b"").expect("write b.txt");
    set_permissions(d.join("sub").join("b.txt"), Permissions::from_mode(0o000))
        .expect("chmod b.txt");

    let mut config = RunConfig::new(&out);
    config.quarantine = quarantine_with(ExternalClassifier::new("false"), &iso);
    let orchestrator = JobOrchestrator::new(config);

    let report = orchestrator
        .run(&[d.clone()], SharedBuf::default())
        .expect("run");

    let d_str = d.display().to_string();
    assert_eq!(
        record_names(&out.join("Snapshot_d.txt")),
        vec![format!("{d_str}/a.txt"), format!("{d_str}/sub")]
    );
    assert_eq!(
        record_names(&out.join("Snapshot_sub.txt")),
        vec![format!("{d_str}/sub/b.txt")]
    );
    assert!(!d.join("sub").join("b.txt").exists());
    assert!(iso.join("b.txt").exists());
    assert!(d.join("a.txt").exists());

    assert!(report.is_success());
    let unit = &report.units[0];
    assert_eq!(unit.documents.len(), 2);
    assert!(unit
        .documents
        .iter()
        .all(|doc| doc.change == DocumentChange::Written));
    let moved: Vec<_> = unit.quarantine.iter().flat_map(|r| r.quarantined()).collect();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].1, iso.join("b.txt").as_path());
}

#[test]
fn failing_root_does_not_stop_the_others() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let good = tmp.path().join("good");
    let missing = tmp.path().join("missing");
    let out = tmp.path().join("out");
    create_dir(&good).expect("create good");
    write(good.join("f"), b"f").expect("write f");

    let orchestrator = JobOrchestrator::new(RunConfig::new(&out));
    let report = orchestrator
        .run(&[missing.clone(), good.clone()], io::sink())
        .expect("run");

    assert!(!report.is_success());
    match &report.units[0].status {
        UnitStatus::Aborted { error } => {
            assert!(error.contains("missing"), "diagnostic names the path: {error}")
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(report.units[1].status, UnitStatus::Completed { code: 0 });
    assert!(out.join("Snapshot_good.txt").exists());
}

#[test]
fn classifier_output_reaches_console() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let d = tmp.path().join("d");
    let out = tmp.path().join("out");
    create_dir(&d).expect("create d");
    let locked = d.join("locked");
    write(&locked, b"").expect("write locked");
    set_permissions(&locked, Permissions::from_mode(0o000)).expect("chmod");

    let console = SharedBuf::default();
    let mut config = RunConfig::new(&out);
    config.quarantine = quarantine_with(
        ExternalClassifier::new("sh").with_args(["-c", "echo \"clean: $1\"", "cls"]),
        &tmp.path().join("iso"),
    );

    let report = JobOrchestrator::new(config)
        .run(&[d.clone()], console.clone())
        .expect("run");

    assert!(report.is_success());
    assert!(locked.exists());
    assert_eq!(console.text(), format!("clean: {}\n", locked.display()));
    assert!(matches!(
        report.units[0].quarantine[0].files[0].outcome,
        Outcome::VerifiedClean
    ));
}

#[test]
fn verification_failure_marks_unit_with_status_one() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let d = tmp.path().join("d");
    create_dir(&d).expect("create d");
    write(d.join("x"), b"").expect("write x");
    set_permissions(d.join("x"), Permissions::from_mode(0o000)).expect("chmod");

    let mut config = RunConfig::new(tmp.path().join("out"));
    config.quarantine = quarantine_with(
        ExternalClassifier::new("/nonexistent/snapward-classifier"),
        &tmp.path().join("iso"),
    );

    let report = JobOrchestrator::new(config)
        .run(&[d.clone()], io::sink())
        .expect("run");

    assert_eq!(report.units[0].status, UnitStatus::Completed { code: 1 });
    assert!(d.join("x").exists());
}

#[test]
fn compare_mode_reports_created_unchanged_and_changed() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let d = tmp.path().join("d");
    let out = tmp.path().join("out");
    create_dir(&d).expect("create d");
    write(d.join("one"), b"1").expect("write one");

    let journal = JournalStore::with_path(tmp.path().join("journal.log"));
    let mut config = RunConfig::new(&out);
    config.compare = true;
    let orchestrator = JobOrchestrator::new(config).with_journal(Some(journal));

    let changes = |orchestrator: &JobOrchestrator| {
        let report = orchestrator.run(&[d.clone()], io::sink()).expect("run");
        assert!(report.is_success());
        report.units[0].documents[0].change
    };

    assert_eq!(changes(&orchestrator), DocumentChange::Created);
    assert_eq!(changes(&orchestrator), DocumentChange::Unchanged);

    write(d.join("two"), b"22").expect("write two");
    assert!(matches!(
        changes(&orchestrator),
        DocumentChange::Changed { .. }
    ));

    let names = record_names(&out.join("Snapshot_d.txt"));
    assert_eq!(names.len(), 2);

    // Staging directories are cleaned up after each run.
    let leftovers: Vec<_> = fs::read_dir(&out)
        .expect("read out")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
        .collect();
    assert!(leftovers.is_empty());

    let journal = JournalStore::with_path(tmp.path().join("journal.log"));
    let events = journal.recent(10);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0].kind,
        JournalKind::SnapshotChanged { document, .. } if document == &out.join("Snapshot_d.txt")
    ));
}

#[test]
fn compare_mode_folds_shared_documents_in_input_order() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let first = tmp.path().join("a").join("x");
    let second = tmp.path().join("b").join("x");
    let out = tmp.path().join("out");
    fs::create_dir_all(&first).expect("create a/x");
    fs::create_dir_all(&second).expect("create b/x");
    write(first.join("from-a"), b"a").expect("write from-a");
    write(second.join("from-b"), b"b").expect("write from-b");

    let mut config = RunConfig::new(&out);
    config.compare = true;
    let orchestrator = JobOrchestrator::new(config);

    for _ in 0..5 {
        let report = orchestrator
            .run(&[first.clone(), second.clone()], io::sink())
            .expect("run");

        // The second root always lands last and replaces the first root's document.
        assert!(matches!(
            report.units[1].documents[0].change,
            DocumentChange::Changed { first_difference: 1 }
        ));
        let names = record_names(&out.join("Snapshot_x.txt"));
        assert_eq!(names, vec![second.join("from-b").display().to_string()]);
    }
}

#[test]
fn quarantine_is_journaled() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let d = tmp.path().join("d");
    let iso = tmp.path().join("iso");
    create_dir(&d).expect("create d");
    write(d.join("bad"), b"").expect("write bad");
    set_permissions(d.join("bad"), Permissions::from_mode(0o000)).expect("chmod");

    let journal_path = tmp.path().join("journal.log");
    let mut config = RunConfig::new(tmp.path().join("out"));
    config.quarantine = quarantine_with(ExternalClassifier::new("false"), &iso);

    JobOrchestrator::new(config)
        .with_journal(Some(JournalStore::with_path(journal_path.clone())))
        .run(&[d.clone()], io::sink())
        .expect("run");

    let events = JournalStore::with_path(journal_path).recent(10);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].kind,
        JournalKind::Quarantined {
            source: d.join("bad"),
            destination: iso.join("bad"),
            classifier_status: 1,
        }
    );
}

#[test]
fn relative_path_naming_keys_subdirectories_by_path() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let first = tmp.path().join("a").join("data");
    let second = tmp.path().join("b").join("data");
    fs::create_dir_all(first.join("x")).expect("create first");
    fs::create_dir_all(second.join("x")).expect("create second");
    let out = tmp.path().join("out");

    let mut config = RunConfig::new(&out);
    config.naming = DocumentNaming::RelativePath;
    let report = JobOrchestrator::new(config)
        .run(&[first, second], io::sink())
        .expect("run");

    assert!(report.is_success());
    // Keys are unique within a root; roots sharing a base name still share documents.
    assert!(out.join("Snapshot_data.txt").exists());
    assert!(out.join("Snapshot_data%2Fx.txt").exists());
}

#[test]
fn input_validation_cases() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let orchestrator = JobOrchestrator::new(RunConfig::new(tmp.path().join("out")));
    let d = tmp.path().to_path_buf();

    let nested = d.join("data");
    create_dir(&nested).expect("create data");
    create_dir(nested.join("sub")).expect("create sub");
    let alias = nested.join("..").join("data");

    let too_many: Vec<PathBuf> = (0..=MAX_INPUT_DIRS)
        .map(|i| tmp.path().join(i.to_string()))
        .collect();

    let cases: Vec<(Vec<PathBuf>, &str)> = vec![
        (vec![], "no directories"),
        (vec![d.clone(), d.clone()], "more than once"),
        (vec![nested.clone(), alias], "more than once"),
        (vec![nested.clone(), nested.join("sub")], "overlap"),
        (vec![nested.join("sub"), nested.clone()], "overlap"),
        (too_many, "too many"),
    ];

    for (dirs, expected) in cases {
        let err = orchestrator
            .run(&dirs, io::sink())
            .expect_err("invalid input");
        assert!(
            err.to_string().contains(expected),
            "{dirs:?}: expected {expected:?} in {err}"
        );
    }
    assert!(!tmp.path().join("out").exists(), "no side effects on bad input");
}
