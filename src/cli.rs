// Command-line interface for blockdelta.
//
// Subcommands inspect the match list the engine produces for a pair of
// files; patch container emission is intentionally not part of this tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueHint};

use crate::diff::DiffOptions;
use crate::io::{FileDiffStats, diff_files};

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024usize),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1usize),
    };
    let num: usize = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Binary differencing match engine.
#[derive(Parser, Debug)]
#[command(
    name = "blockdelta",
    version,
    about = "Binary differencing match engine",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose logging (repeat for more detail).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Finest block size of the pass schedule.
    #[arg(long, global = true, value_parser = parse_byte_size, default_value = "16")]
    min_block_size: usize,

    /// Coarsest block size of the pass schedule.
    #[arg(long, global = true, value_parser = parse_byte_size, default_value = "4K")]
    max_block_size: usize,

    /// Leave overlapping matches in place instead of truncating them.
    #[arg(long, global = true)]
    keep_overlap: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the (p1, p2, num) match triples for a file pair.
    Matches {
        /// Reference file.
        #[arg(value_hint = ValueHint::FilePath)]
        reference: PathBuf,
        /// Target file.
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
    },
    /// Print coverage statistics for a file pair.
    Stats {
        /// Reference file.
        #[arg(value_hint = ValueHint::FilePath)]
        reference: PathBuf,
        /// Target file.
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
    },
}

fn diff_options(cli: &Cli) -> Result<DiffOptions, String> {
    if invalid_schedule(cli.min_block_size, cli.max_block_size) {
        return Err(format!(
            "min block size {} must be non-zero and at most max block size {}",
            cli.min_block_size, cli.max_block_size
        ));
    }
    Ok(DiffOptions {
        min_block_size: cli.min_block_size,
        max_block_size: cli.max_block_size,
        remove_overlap: !cli.keep_overlap,
    })
}

fn invalid_schedule(min: usize, max: usize) -> bool {
    min == 0 || min > max
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_matches(reference: &PathBuf, target: &PathBuf, opts: &DiffOptions) -> i32 {
    match diff_files(reference, target, opts) {
        Ok((matches, _)) => {
            for m in &matches {
                println!("{m}");
            }
            0
        }
        Err(e) => {
            eprintln!("blockdelta: {e}");
            1
        }
    }
}

fn print_stats(stats: &FileDiffStats, quiet: bool) {
    println!("reference bytes: {}", stats.source_size);
    println!("target bytes:    {}", stats.target_size);
    println!("matches:         {}", stats.match_count);
    println!("matched bytes:   {}", stats.matched_bytes);
    println!("literal bytes:   {}", stats.literal_bytes);
    if quiet {
        return;
    }
    if let (Some(src), Some(tgt)) = (stats.source_sha256, stats.target_sha256) {
        println!("reference sha256: {}", hex(&src));
        println!("target sha256:    {}", hex(&tgt));
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn cmd_stats(reference: &PathBuf, target: &PathBuf, opts: &DiffOptions, quiet: bool) -> i32 {
    match diff_files(reference, target, opts) {
        Ok((_, stats)) => {
            print_stats(&stats, quiet);
            0
        }
        Err(e) => {
            eprintln!("blockdelta: {e}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();

    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let opts = match diff_options(&cli) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("blockdelta: {msg}");
            process::exit(2);
        }
    };

    let exit_code = match &cli.command {
        Cmd::Matches { reference, target } => cmd_matches(reference, target, &opts),
        Cmd::Stats { reference, target } => cmd_stats(reference, target, &opts, cli.quiet),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
