use std::path::PathBuf;

use snapward_orchestrator::{DocumentChange, DocumentReport, RunReport, UnitReport, UnitStatus};
use snapward_quarantine::{ClassifyError, DispatchReport, FileReport, Outcome};

use super::*;

fn unit(status: UnitStatus) -> UnitReport {
    UnitReport {
        root: PathBuf::from("/data/a"),
        status,
        documents: vec![DocumentReport {
            directory: PathBuf::from("/data/a"),
            document: PathBuf::from("/out/Snapshot_a.txt"),
            records: 3,
            change: DocumentChange::Changed {
                first_difference: 7,
            },
        }],
        quarantine: vec![DispatchReport {
            source_dir: PathBuf::from("/data/a"),
            files: vec![
                FileReport {
                    path: PathBuf::from("/data/a/locked.bin"),
                    outcome: Outcome::Quarantined {
                        destination: PathBuf::from("/iso/locked.bin"),
                        status: 2,
                    },
                },
                FileReport {
                    path: PathBuf::from("/data/a/slow.bin"),
                    outcome: Outcome::VerificationFailed(ClassifyError::Terminated {
                        path: PathBuf::from("/data/a/slow.bin"),
                    }),
                },
                FileReport {
                    path: PathBuf::from("/data/a/readme.txt"),
                    outcome: Outcome::NotACandidate,
                },
            ],
        }],
    }
}

#[test]
fn human_printer_lists_documents_and_moves() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let u = unit(UnitStatus::Completed { code: 1 });

    HumanPrinter::new(&mut out, &mut err).print_unit(&u).unwrap();

    let out = String::from_utf8(out).unwrap();
    let err = String::from_utf8(err).unwrap();
    assert!(out.starts_with("/data/a\n"));
    assert!(out.contains("/out/Snapshot_a.txt (3 entries, changed at line 7)"));
    assert!(out.contains("quarantined /data/a/locked.bin -> /iso/locked.bin (status 2)"));
    assert!(!out.contains("readme.txt"));
    assert!(err.contains("/data/a/slow.bin"));
}

#[test]
fn human_printer_reports_aborted_unit_on_stderr() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut u = unit(UnitStatus::Aborted {
        error: "cannot read directory".into(),
    });
    u.documents.clear();
    u.quarantine.clear();

    HumanPrinter::new(&mut out, &mut err).print_unit(&u).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "/data/a\n");
    assert_eq!(
        String::from_utf8(err).unwrap(),
        "[run] /data/a: cannot read directory\n"
    );
}

#[test]
fn human_summary_counts_failures() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let report = RunReport {
        units: vec![
            unit(UnitStatus::Completed { code: 0 }),
            unit(UnitStatus::Panicked),
        ],
    };

    HumanPrinter::new(&mut out, &mut err).finish(&report).unwrap();

    let err = String::from_utf8(err).unwrap();
    assert!(err.contains("2 directories, 2 documents, 2 quarantined, 1 failed"));
}

#[test]
fn json_printer_emits_one_object_per_unit() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let u = unit(UnitStatus::Completed { code: 1 });

    {
        let mut printer = JsonPrinter::new(&mut out, &mut err);
        printer.print_unit(&u).unwrap();
        printer.print_unit(&u).unwrap();
    }

    let out = String::from_utf8(out).unwrap();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 2);

    let v: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(v["type"], "unit");
    assert_eq!(v["code"], 1);
    assert!(v["error"].is_null());
    assert_eq!(v["documents"][0]["change"], "changed at line 7");
    assert_eq!(v["quarantined"][0]["destination"], "/iso/locked.bin");
    assert_eq!(v["failures"][0]["path"], "/data/a/slow.bin");
}

#[test]
fn json_summary_goes_to_stderr() {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let report = RunReport {
        units: vec![unit(UnitStatus::Completed { code: 0 })],
    };

    JsonPrinter::new(&mut out, &mut err).finish(&report).unwrap();

    assert!(out.is_empty());
    let err = String::from_utf8(err).unwrap();
    let v: serde_json::Value = serde_json::from_str(err.trim()).unwrap();
    assert_eq!(v["type"], "summary");
    assert_eq!(v["success"], true);
}
