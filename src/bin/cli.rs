use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use mpegts_decryptor::constants::DEFAULT_VIDEO_PID;
use mpegts_decryptor::decryptor::{Options, run};

/// Decrypt a TEA-protected H.264 MPEG-TS fragment.
#[derive(Debug, Parser)]
#[command(author, version, about = "TEA segment decrypter for MPEG-TS", long_about = None)]
struct Cli {
    /// Input MPEG-TS file path
    input: PathBuf,

    /// Output MPEG-TS file path
    output: PathBuf,

    /// Elementary stream PID carrying the protected video
    #[arg(long, default_value_t = DEFAULT_VIDEO_PID)]
    pid: u16,

    /// Print a JSON processing report to stdout
    #[arg(long)]
    report: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .ok()
                .unwrap_or_else(|| "info".to_string()),
        )
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    info!(
        "decrypting {} -> {} (pid 0x{:X})",
        cli.input.display(),
        cli.output.display(),
        cli.pid
    );

    let report = run(Options {
        input: cli.input,
        output: cli.output,
        pid: cli.pid,
    })?;

    info!(
        runs = report.runs,
        slice_units = report.slice_units,
        decrypted_blocks = report.decrypted_blocks,
        "finished"
    );

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
