//! Document signature processing engine.
//! Finds signature pages in closing sets, extracts who signs where, and
//! assembles per-signer signature packets, tracking tables, and spliced
//! execution versions.

// Configuration, errors, event stream
pub mod config;
pub mod error;
pub mod events;
pub mod types;

// Heuristics: page classification, signer extraction, name handling
pub mod heuristics;

// Document backends and page copying
pub mod formats;

// Scan, aggregate, assemble
pub mod assemble;
pub mod index;
pub mod scanner;

// Execution-version splicing
pub mod execution;

// Job orchestration
pub mod jobs;

pub use config::{EngineConfig, OutputPolicy};
pub use error::{Error, Result};
pub use events::{Event, EventSink, MemorySink, StdoutSink};
pub use jobs::{
    run_execution_job, run_packet_job, CancelFlag, ExecutionJobSpec, PacketJobSpec,
};
