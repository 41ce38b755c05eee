//! End-to-end packet job tests over real fixture documents.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use sigpacket::config::OutputPolicy;
use sigpacket::events::{Event, MemorySink};
use sigpacket::jobs::{run_packet_job, CancelFlag, PacketJobSpec};
use sigpacket::Error;

fn spec(files: Vec<PathBuf>, output_root: &std::path::Path) -> PacketJobSpec {
    PacketJobSpec {
        files,
        output_root: output_root.to_path_buf(),
        output_format: OutputPolicy::Preserve,
        engine: Default::default(),
    }
}

async fn run(spec: PacketJobSpec) -> (sigpacket::error::Result<sigpacket::jobs::PacketJobReport>, Vec<Event>) {
    let sink = Arc::new(MemorySink::new());
    let result = run_packet_job(spec, sink.clone(), CancelFlag::new()).await;
    (result, sink.take())
}

/// One signer across a long agreement and a short guaranty: one packet
/// holding both signature pages, in input-document order.
#[tokio::test]
async fn aggregates_one_signer_across_documents() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let mut agreement: Vec<String> = (1..=100).map(|i| format!("Section {i} text")).collect();
    agreement[86] =
        "CREDIT AGREEMENT EXECUTION PAGE\nBy: ______________\nName: John Smith\nTitle: CFO"
            .to_string();
    let agreement_pages: Vec<&str> = agreement.iter().map(String::as_str).collect();
    let a = common::write_pdf(input.path(), "Credit Agreement.pdf", &agreement_pages);

    let mut guaranty: Vec<String> = (1..=20).map(|i| format!("Guaranty clause {i}")).collect();
    guaranty[11] =
        "GUARANTY EXECUTION PAGE\nBy: ______________\nName: John Smith\nTitle: CFO".to_string();
    let guaranty_pages: Vec<&str> = guaranty.iter().map(String::as_str).collect();
    let g = common::write_pdf(input.path(), "Guaranty.pdf", &guaranty_pages);

    let (result, events) = run(spec(vec![a, g], output.path())).await;
    let report = result.unwrap();

    assert!(report.success);
    assert_eq!(report.packets_created, 1);
    assert_eq!(report.packets[0].name, "JOHN SMITH");
    assert_eq!(report.packets[0].pages, 2);

    let texts = common::pdf_page_texts(std::path::Path::new(&report.packets[0].path));
    assert!(texts[0].contains("CREDIT AGREEMENT EXECUTION PAGE"));
    assert!(texts[1].contains("GUARANTY EXECUTION PAGE"));

    let master = std::fs::read_to_string(
        output.path().join("tables/MASTER_SIGNATURE_INDEX.csv"),
    )
    .unwrap();
    assert_eq!(
        master,
        "Signer,Document,Page\n\
         JOHN SMITH,Credit Agreement.pdf,87\n\
         JOHN SMITH,Guaranty.pdf,12\n"
    );
    let per_signer = std::fs::read_to_string(
        output.path().join("tables/signature_packet - JOHN SMITH.csv"),
    )
    .unwrap();
    assert_eq!(per_signer.lines().count(), 3);

    // Progress percentages never go backwards.
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

/// Case and punctuation variants of a name collapse to one signer.
#[tokio::test]
async fn name_variants_collapse_to_one_signer() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let a = common::write_pdf(
        input.path(),
        "a.pdf",
        &["By: ________\nName: John Q. Smith"],
    );
    let b = common::write_pdf(
        input.path(),
        "b.pdf",
        &["By: ________\nName: JOHN Q SMITH"],
    );

    let (result, _) = run(spec(vec![a, b], output.path())).await;
    let report = result.unwrap();
    assert_eq!(report.packets_created, 1);
    assert_eq!(report.packets[0].name, "JOHN Q SMITH");
    assert_eq!(report.packets[0].pages, 2);
}

/// Entity block lines are skipped; the fallback picks the person below.
#[tokio::test]
async fn entity_names_are_not_signers() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let page = "By: ______________\nACME HOLDINGS LLC\nJane Doe\nTitle: Manager";
    let a = common::write_pdf(input.path(), "a.pdf", &[page]);

    let (result, _) = run(spec(vec![a], output.path())).await;
    let report = result.unwrap();
    assert_eq!(report.packets_created, 1);
    assert_eq!(report.packets[0].name, "JANE DOE");
}

/// A run with no signature pages fails without writing any packet.
#[tokio::test]
async fn no_signers_is_fatal_with_no_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let a = common::write_pdf(input.path(), "memo.pdf", &["plain prose", "more prose"]);
    let (result, _) = run(spec(vec![a], output.path())).await;
    assert!(matches!(result.unwrap_err(), Error::NoSignersDetected));
    assert_eq!(
        std::fs::read_dir(output.path().join("packets")).unwrap().count(),
        0
    );
}

/// PDF and DOCX inputs for the same signer produce one packet per
/// format family, never a merged file.
#[tokio::test]
async fn mixed_formats_split_into_per_format_packets() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let a = common::write_pdf(
        input.path(),
        "agreement.pdf",
        &["By: ________\nName: Jane Doe"],
    );
    let b = common::write_docx(
        input.path(),
        "consent.docx",
        &[&["By: ________", "Name: Jane Doe"]],
    );

    let (result, _) = run(spec(vec![a, b], output.path())).await;
    let report = result.unwrap();
    assert_eq!(report.packets_created, 2);
    assert!(output
        .path()
        .join("packets/signature_packet - JANE DOE.pdf")
        .exists());
    assert!(output
        .path()
        .join("packets/signature_packet - JANE DOE.docx")
        .exists());
}

/// An unreadable document is skipped with a warning; the rest of the
/// run completes.
#[tokio::test]
async fn unreadable_document_warns_and_continues() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let broken = input.path().join("broken.pdf");
    std::fs::write(&broken, b"not a pdf at all").unwrap();
    let good = common::write_pdf(
        input.path(),
        "good.pdf",
        &["By: ________\nName: Jane Doe"],
    );

    let (result, events) = run(spec(vec![broken, good], output.path())).await;
    let report = result.unwrap();
    assert_eq!(report.packets_created, 1);

    let warned = events.iter().any(|e| {
        matches!(e, Event::Progress { message, .. }
            if message.starts_with("Warning:") && message.contains("broken.pdf"))
    });
    assert!(warned, "expected a Warning: progress event");
}

/// An explicit output format conflicting with an input is rejected
/// before any processing.
#[tokio::test]
async fn conflicting_output_format_is_invalid_input() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let a = common::write_pdf(input.path(), "a.pdf", &["By: ___\nName: Jane Doe"]);
    let b = common::write_docx(input.path(), "b.docx", &[&["By: ___", "Name: Jane Doe"]]);

    let mut s = spec(vec![a, b], output.path());
    s.output_format = OutputPolicy::Docx;
    let (result, _) = run(s).await;
    assert!(matches!(result.unwrap_err(), Error::InvalidJobInput(_)));
}

/// Directory inputs expand one level deep to supported files.
#[tokio::test]
async fn directory_input_expands_to_documents() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    common::write_pdf(input.path(), "a.pdf", &["By: ___\nName: Jane Doe"]);
    common::write_pdf(input.path(), "b.pdf", &["By: ___\nName: John Smith"]);
    std::fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

    let (result, _) = run(spec(vec![input.path().to_path_buf()], output.path())).await;
    let report = result.unwrap();
    assert_eq!(report.packets_created, 2);
}
