//! Job orchestration: bounded concurrent scanning, single-collector
//! aggregation, parallel per-signer assembly, and the execution-version
//! flow.
//!
//! Scan workers run on the blocking pool behind a semaphore and report
//! over an mpsc channel; only the collector mutates shared state. The
//! cancel flag is checked between documents and between signers, and all
//! file writes are atomic, so a cancelled run never leaves partial
//! outputs behind.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, instrument, warn};

use crate::assemble::{assemble_signer_packets, write_tables, PacketRecord};
use crate::config::OutputPolicy;
use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use crate::execution::{build_execution_version, ExecutionRequest};
use crate::formats::load_source;
use crate::index::PageIndex;
use crate::scanner::{scan_document, DocumentScan};
use crate::types::{DocumentFormat, SourceDocument};

/// Cooperative cancellation handle, shared between the caller and a
/// running job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Errors with [`Error::Cancelled`] once the flag is set.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Description of one packet job, deserializable from a job JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct PacketJobSpec {
    /// Input files, or directories expanded one level deep.
    pub files: Vec<PathBuf>,
    pub output_root: PathBuf,
    #[serde(default)]
    pub output_format: OutputPolicy,
    #[serde(default)]
    pub engine: crate::config::EngineConfig,
}

/// Result payload of a packet job, serialized into the final `result`
/// event with the camelCase keys the event consumers expect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketJobReport {
    pub success: bool,
    pub output_path: String,
    pub packets_created: usize,
    pub packets: Vec<PacketRecord>,
}

/// Description of one execution-version job.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionJobSpec {
    pub original: PathBuf,
    pub signed: PathBuf,
    /// 0-based "insert after page N"; negative or out of range appends.
    #[serde(default = "default_insert_after")]
    pub insert_after: i64,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_insert_after() -> i64 {
    -1
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionJobReport {
    pub success: bool,
    pub output_path: String,
    pub output_filename: String,
    pub original_pages: usize,
    pub signed_pages: usize,
    pub total_pages: usize,
}

/// Runs a packet job end to end: scan, index, tables, packets. Progress
/// goes to `sink`; per-document failures become warnings and the run
/// continues. Returns the report for the final `result` event.
#[instrument(skip_all, fields(inputs = spec.files.len()))]
pub async fn run_packet_job(
    spec: PacketJobSpec,
    sink: Arc<dyn EventSink>,
    cancel: CancelFlag,
) -> Result<PacketJobReport> {
    spec.engine.validate()?;
    let files = expand_inputs(&spec.files)?;
    check_format_policy(spec.output_format, &files)?;

    let packets_dir = spec.output_root.join("packets");
    let tables_dir = spec.output_root.join("tables");
    std::fs::create_dir_all(&packets_dir)?;
    std::fs::create_dir_all(&tables_dir)?;

    let (sources, scans) = scan_inputs(&files, &spec, sink.as_ref(), &cancel).await?;
    cancel.checkpoint()?;

    let index = PageIndex::from_scans(scans);
    if index.is_empty() {
        return Err(Error::NoSignersDetected);
    }

    sink.emit(Event::progress(55, "Building tracking tables..."));
    write_tables(&index, &tables_dir)?;

    let packets = assemble_packets(&index, sources, &packets_dir, sink.as_ref(), &cancel).await?;

    info!(packets = packets.len(), signers = index.signer_count(), "packet job complete");
    Ok(PacketJobReport {
        success: true,
        output_path: spec.output_root.to_string_lossy().into_owned(),
        packets_created: packets.len(),
        packets,
    })
}

/// Loads and scans every input on the blocking pool, at most
/// `scan_workers` at a time. The receiving loop is the only place scan
/// results are merged.
async fn scan_inputs(
    files: &[PathBuf],
    spec: &PacketJobSpec,
    sink: &dyn EventSink,
    cancel: &CancelFlag,
) -> Result<(HashMap<usize, Arc<SourceDocument>>, Vec<DocumentScan>)> {
    let total = files.len();
    let engine = Arc::new(spec.engine.clone());
    let semaphore = Arc::new(Semaphore::new(engine.scan_workers()));
    let (tx, mut rx) = mpsc::channel(total);

    for (order, path) in files.iter().cloned().enumerate() {
        let engine = engine.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let outcome = if cancel.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                let scan_path = path.clone();
                tokio::task::spawn_blocking(move || {
                    let source = load_source(&scan_path, order, &engine)?;
                    let scan = scan_document(&source, &engine);
                    Ok::<_, Error>((Arc::new(source), scan))
                })
                .await
                .map_err(Error::from)
                .and_then(|r| r)
            };
            let _ = tx.send((order, path, outcome)).await;
        });
    }
    drop(tx);

    let mut sources = HashMap::new();
    let mut scans = Vec::new();
    let mut completed = 0usize;
    while let Some((order, path, outcome)) = rx.recv().await {
        cancel.checkpoint()?;
        completed += 1;
        let percent = (completed * 50 / total) as u8;
        match outcome {
            Ok((source, scan)) => {
                sink.emit(Event::progress(
                    percent,
                    format!("Scanned {} ({completed}/{total})", source.name),
                ));
                sources.insert(order, source);
                scans.push(scan);
            }
            Err(err) if err.is_document_local() => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                warn!("skipping {name}: {err}");
                sink.emit(Event::warning(percent, format!("Skipping {name}: {err}")));
            }
            Err(err) => return Err(err),
        }
    }
    Ok((sources, scans))
}

/// Assembles every signer's packets in parallel on the blocking pool.
/// Records come back in signer order regardless of completion order.
async fn assemble_packets(
    index: &PageIndex,
    sources: HashMap<usize, Arc<SourceDocument>>,
    packets_dir: &std::path::Path,
    sink: &dyn EventSink,
    cancel: &CancelFlag,
) -> Result<Vec<PacketRecord>> {
    let signers: Vec<String> = index.signers().map(str::to_string).collect();
    let total = signers.len();
    let sources = Arc::new(sources);

    let mut handles = Vec::with_capacity(total);
    for signer in &signers {
        cancel.checkpoint()?;
        let signer = signer.clone();
        let refs = index.refs_for(&signer).to_vec();
        let sources = sources.clone();
        let dir = packets_dir.to_path_buf();
        handles.push(tokio::task::spawn_blocking(move || {
            assemble_signer_packets(&signer, &refs, &sources, &dir)
        }));
    }

    let mut packets = Vec::new();
    for (i, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
        let records = joined??;
        cancel.checkpoint()?;
        let percent = (55 + (i + 1) * 45 / total) as u8;
        sink.emit(Event::progress(
            percent,
            format!("Created packet for {} ({}/{total})", signers[i], i + 1),
        ));
        packets.extend(records);
    }
    Ok(packets)
}

/// Runs the single-threaded execution-version builder off the async
/// runtime.
#[instrument(skip_all)]
pub async fn run_execution_job(
    spec: ExecutionJobSpec,
    sink: Arc<dyn EventSink>,
    cancel: CancelFlag,
) -> Result<ExecutionJobReport> {
    cancel.checkpoint()?;
    let request = ExecutionRequest {
        original: spec.original,
        signed: spec.signed,
        insert_after: spec.insert_after,
        output_dir: spec.output_dir,
    };
    let outcome =
        tokio::task::spawn_blocking(move || build_execution_version(&request, sink.as_ref()))
            .await??;

    Ok(ExecutionJobReport {
        success: true,
        output_path: outcome.output_path.to_string_lossy().into_owned(),
        output_filename: outcome.output_filename,
        original_pages: outcome.original_pages,
        signed_pages: outcome.signed_pages,
        total_pages: outcome.total_pages,
    })
}

/// Expands directories one level deep to supported document files,
/// sorted by name; plain paths pass through in their given order.
fn expand_inputs(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in files {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && DocumentFormat::from_path(p).is_ok())
                .collect();
            entries.sort();
            out.extend(entries);
        } else {
            out.push(path.clone());
        }
    }
    if out.is_empty() {
        return Err(Error::InvalidJobInput("no input documents".into()));
    }
    Ok(out)
}

/// An explicit output format must match every input; pages are copied,
/// never converted between families.
fn check_format_policy(policy: OutputPolicy, files: &[PathBuf]) -> Result<()> {
    let required = match policy {
        OutputPolicy::Preserve => return Ok(()),
        OutputPolicy::Pdf => DocumentFormat::Pdf,
        OutputPolicy::Docx => DocumentFormat::Docx,
    };
    for path in files {
        if DocumentFormat::from_path(path).ok() != Some(required) {
            return Err(Error::InvalidJobInput(format!(
                "output format {} conflicts with input {}",
                required.extension(),
                path.display()
            )));
        }
    }
    Ok(())
}
