//! Command-line interface for the signature processing engine.
//!
//! Emits newline-delimited JSON events on stdout (progress, then exactly
//! one result or error); human-readable logs go to stderr so a
//! supervising process can parse the event stream.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::error;

use sigpacket::config::OutputPolicy;
use sigpacket::error::{Error, Result};
use sigpacket::events::{Event, EventSink, StdoutSink};
use sigpacket::jobs::{
    run_execution_job, run_packet_job, CancelFlag, ExecutionJobSpec, PacketJobSpec,
};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let sink: Arc<dyn EventSink> = Arc::new(StdoutSink);
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let outcome = match matches.subcommand() {
        Some(("packets", sub)) => run_packets(sub, sink.clone(), cancel).await,
        Some(("execution", sub)) => run_execution(sub, sink.clone(), cancel).await,
        _ => unreachable!("subcommand required"),
    };

    if let Err(err) = outcome {
        sink.emit(Event::error(err.to_string()));
        error!("{err}");
        process::exit(1);
    }
}

async fn run_packets(
    matches: &ArgMatches,
    sink: Arc<dyn EventSink>,
    cancel: CancelFlag,
) -> Result<()> {
    let spec: PacketJobSpec = if let Some(config_path) = matches.get_one::<String>("config") {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| Error::InvalidJobInput(format!("cannot read {config_path}: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidJobInput(format!("invalid job file {config_path}: {e}")))?
    } else {
        let files: Vec<PathBuf> = matches
            .get_many::<String>("files")
            .unwrap_or_default()
            .map(PathBuf::from)
            .collect();
        let output_root = matches
            .get_one::<String>("output")
            .map(PathBuf::from)
            .ok_or_else(|| Error::InvalidJobInput("--output is required".into()))?;
        let output_format = match matches.get_one::<String>("format").map(String::as_str) {
            None | Some("preserve") => OutputPolicy::Preserve,
            Some("pdf") => OutputPolicy::Pdf,
            Some("docx") => OutputPolicy::Docx,
            Some(other) => {
                return Err(Error::InvalidJobInput(format!(
                    "unknown output format: {other}"
                )))
            }
        };
        PacketJobSpec {
            files,
            output_root,
            output_format,
            engine: Default::default(),
        }
    };

    let report = run_packet_job(spec, sink.clone(), cancel).await?;
    let fields = serde_json::to_value(&report).map_err(|e| Error::Internal(e.to_string()))?;
    sink.emit(Event::result(fields));
    Ok(())
}

async fn run_execution(
    matches: &ArgMatches,
    sink: Arc<dyn EventSink>,
    cancel: CancelFlag,
) -> Result<()> {
    let spec = ExecutionJobSpec {
        original: matches
            .get_one::<String>("original")
            .map(PathBuf::from)
            .expect("required arg"),
        signed: matches
            .get_one::<String>("signed")
            .map(PathBuf::from)
            .expect("required arg"),
        insert_after: *matches.get_one::<i64>("insert-after").unwrap_or(&-1),
        output_dir: matches.get_one::<String>("output").map(PathBuf::from),
    };

    let report = run_execution_job(spec, sink.clone(), cancel).await?;
    let fields = serde_json::to_value(&report).map_err(|e| Error::Internal(e.to_string()))?;
    sink.emit(Event::result(fields));
    Ok(())
}

fn build_cli() -> Command {
    Command::new("sigpacket")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Signature packet and execution version builder for closing sets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)"),
        )
        .subcommand(
            Command::new("packets")
                .about("Scan documents and build per-signer signature packets")
                .arg(
                    Arg::new("files")
                        .value_name("FILE_OR_DIR")
                        .num_args(0..)
                        .help("Input documents; directories are expanded one level deep"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Output root for packets/ and tables/"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format policy: preserve (default), pdf, or docx"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Job description JSON; overrides the other arguments"),
                ),
        )
        .subcommand(
            Command::new("execution")
                .about("Splice signed pages back into the original document")
                .arg(
                    Arg::new("original")
                        .long("original")
                        .value_name("FILE")
                        .help("Original PDF without signature pages")
                        .required(true),
                )
                .arg(
                    Arg::new("signed")
                        .long("signed")
                        .value_name("FILE")
                        .help("Signed PDF returned by the signing service")
                        .required(true),
                )
                .arg(
                    Arg::new("insert-after")
                        .long("insert-after")
                        .value_name("N")
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true)
                        .help("Insert signed pages after original page N (0-based); negative appends"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Destination directory (defaults to the original's directory)"),
                ),
        )
}

fn init_logging(verbosity: u8) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("sigpacket={level}")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
