//! Execution-version splicing tests.

mod common;

use std::sync::Arc;

use lopdf::{dictionary, Object};
use sigpacket::events::MemorySink;
use sigpacket::jobs::{run_execution_job, CancelFlag, ExecutionJobSpec};
use sigpacket::Error;

fn exec_spec(
    original: std::path::PathBuf,
    signed: std::path::PathBuf,
    insert_after: i64,
    output_dir: &std::path::Path,
) -> ExecutionJobSpec {
    ExecutionJobSpec {
        original,
        signed,
        insert_after,
        output_dir: Some(output_dir.to_path_buf()),
    }
}

async fn run(spec: ExecutionJobSpec) -> sigpacket::error::Result<sigpacket::jobs::ExecutionJobReport> {
    run_execution_job(spec, Arc::new(MemorySink::new()), CancelFlag::new()).await
}

#[tokio::test]
async fn splices_signed_pages_after_insertion_point() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "Agreement.pdf", &["o1", "o2", "o3", "o4"]);
    let signed = common::write_pdf(dir.path(), "Signed.pdf", &["s1", "s2"]);

    let report = run(exec_spec(original, signed, 2, out.path())).await.unwrap();
    assert!(report.success);
    assert_eq!(report.original_pages, 4);
    assert_eq!(report.signed_pages, 2);
    assert_eq!(report.total_pages, 6);

    let texts = common::pdf_page_texts(std::path::Path::new(&report.output_path));
    assert_eq!(texts, vec!["o1", "o2", "s1", "s2", "o3", "o4"]);
}

#[tokio::test]
async fn negative_and_out_of_range_insertion_appends() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "A.pdf", &["o1", "o2"]);
    let signed = common::write_pdf(dir.path(), "S.pdf", &["s1"]);

    for insert_after in [-1, 2, 500] {
        let report = run(exec_spec(
            original.clone(),
            signed.clone(),
            insert_after,
            out.path(),
        ))
        .await
        .unwrap();
        assert_eq!(report.total_pages, 3);
        let texts = common::pdf_page_texts(std::path::Path::new(&report.output_path));
        assert_eq!(texts, vec!["o1", "o2", "s1"]);
    }
}

/// The output page count is original + signed for every insertion
/// point, in range or not.
#[tokio::test]
async fn page_count_invariant_holds_for_all_insertion_points() {
    let dir = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "A.pdf", &["o1", "o2", "o3"]);
    let signed = common::write_pdf(dir.path(), "S.pdf", &["s1", "s2"]);

    for insert_after in -2..=6 {
        let out = tempfile::tempdir().unwrap();
        let report = run(exec_spec(
            original.clone(),
            signed.clone(),
            insert_after,
            out.path(),
        ))
        .await
        .unwrap();
        assert_eq!(report.total_pages, 5, "insert_after = {insert_after}");
        assert_eq!(
            common::pdf_page_texts(std::path::Path::new(&report.output_path)).len(),
            5
        );
    }
}

#[tokio::test]
async fn zero_insertion_point_puts_signed_pages_first() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "A.pdf", &["o1", "o2"]);
    let signed = common::write_pdf(dir.path(), "S.pdf", &["s1"]);

    let report = run(exec_spec(original, signed, 0, out.path())).await.unwrap();
    let texts = common::pdf_page_texts(std::path::Path::new(&report.output_path));
    assert_eq!(texts, vec!["s1", "o1", "o2"]);
}

#[tokio::test]
async fn output_filename_strips_draft_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "Credit_Agreement_Clean.pdf", &["o1"]);
    let signed = common::write_pdf(dir.path(), "Signed.pdf", &["s1"]);

    let report = run(exec_spec(original, signed, -1, out.path())).await.unwrap();
    assert_eq!(
        report.output_filename,
        "Credit_Agreement (Execution Version).pdf"
    );
    assert!(out.path().join(&report.output_filename).exists());
}

/// A signed file whose restrictions cannot be lifted by any known
/// password is a terminal failure, and nothing is written.
#[tokio::test]
async fn unbreakable_encryption_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let original = common::write_pdf(dir.path(), "A.pdf", &["o1"]);

    let mut signed_doc = common::pdf_document(&["s1"]);
    let encrypt_id = signed_doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 5,
        "R" => 6,
    });
    signed_doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    let signed = dir.path().join("Locked.pdf");
    signed_doc.save(&signed).unwrap();

    let err = run(exec_spec(original, signed, -1, out.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RestrictionUnlockFailed));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
