use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use stackviz::{
    NumberBase, SharedTracker, Snapshot, SnapshotTable, StackLayout, StackTracker, SymbolTable,
    TrackerConfig,
};

mod trace;

use trace::parse_u32;

#[derive(Parser)]
#[command(name = "stackviz")]
#[command(about = "Runtime stack visualizer for MIPS simulator traces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON Lines event trace and print the stack window.
    Replay {
        #[arg(help = "Trace file, or '-' for stdin")]
        trace: PathBuf,

        #[arg(short, long, help = "Symbol file with 'label = 0xADDRESS' lines")]
        symbols: Option<PathBuf>,

        #[arg(long, value_parser = parse_u32, help = "Initial stack pointer")]
        initial_sp: Option<u32>,

        #[arg(long, value_parser = parse_u32, help = "Highest stack address")]
        stack_base: Option<u32>,

        #[arg(long, value_parser = parse_u32, help = "Exclusive lower bound of the stack")]
        stack_limit: Option<u32>,

        #[arg(short, long, help = "Print only the first N rows")]
        rows: Option<usize>,

        #[arg(short, long, help = "Show addresses and data in decimal")]
        decimal: bool,

        #[arg(long, help = "Show each byte of a word separately")]
        per_byte: bool,

        #[arg(short, long, help = "Print the window after every change")]
        follow: bool,

        #[arg(long, help = "Treat 'j' right after a $ra write as a call")]
        jal_equivalents: bool,

        #[arg(long, help = "Only 'jr $ra' returns from a call")]
        ra_only_returns: bool,
    },
}

struct View {
    rows: Option<usize>,
    base: NumberBase,
    per_byte: bool,
}

impl View {
    fn snapshot(&self, tracker: &SharedTracker) -> Snapshot {
        match self.rows {
            Some(rows) => tracker.snapshot(0..rows),
            None => tracker.snapshot_all(),
        }
    }

    fn print(&self, snapshot: &Snapshot) {
        print!(
            "{}",
            SnapshotTable::new(snapshot)
                .with_base(self.base)
                .per_byte(self.per_byte)
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            trace,
            symbols,
            initial_sp,
            stack_base,
            stack_limit,
            rows,
            decimal,
            per_byte,
            follow,
            jal_equivalents,
            ra_only_returns,
        } => {
            let defaults = StackLayout::default();
            let layout = StackLayout::new(
                stack_base.unwrap_or(defaults.stack_base),
                stack_limit.unwrap_or(defaults.stack_limit),
                initial_sp.unwrap_or(defaults.initial_sp),
            );
            let config = TrackerConfig::default()
                .with_layout(layout)
                .with_jal_equivalents(jal_equivalents)
                .with_ra_only_returns(ra_only_returns);

            let symbols = match symbols {
                Some(path) => parse_symbols(&path)?,
                None => SymbolTable::new(),
            };
            tracing::debug!(count = symbols.len(), "symbols loaded");

            let tracker = SharedTracker::new(
                StackTracker::new(config, symbols).context("Invalid stack configuration")?,
            );
            let view = View {
                rows,
                base: if decimal {
                    NumberBase::Decimal
                } else {
                    NumberBase::Hexadecimal
                },
                per_byte,
            };

            let reader = open_trace(&trace)?;
            let mut events = 0usize;
            for (line_num, line) in reader.lines().enumerate() {
                let line = line.with_context(|| format!("Failed to read {}", trace.display()))?;
                let event = trace::parse_line(&line)
                    .with_context(|| format!("{}:{}", trace.display(), line_num + 1))?;
                let Some(event) = event else {
                    continue;
                };
                events += 1;
                let notice = tracker.dispatch(&event);
                if let (true, Some(notice)) = (follow, notice) {
                    println!("-- #{} {:?}", notice.generation, notice.kind);
                    view.print(&view.snapshot(&tracker));
                }
            }

            tracing::info!(events, "trace replayed");
            if !follow {
                view.print(&view.snapshot(&tracker));
            }
        }
    }

    Ok(())
}

fn open_trace(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = fs::File::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse a symbol file.
///
/// Format (one label per line):
/// ```text
/// # Comments start with #
/// main = 0x00400000
/// fact = 0x00400040
/// ```
fn parse_symbols(path: &Path) -> Result<SymbolTable> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_symbol_lines(&contents, path)
}

fn parse_symbol_lines(contents: &str, path: &Path) -> Result<SymbolTable> {
    let mut table = SymbolTable::new();

    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (label, address) = line.split_once('=').ok_or_else(|| {
            anyhow::anyhow!(
                "{}:{}: invalid format, expected 'label = address'",
                path.display(),
                line_num + 1
            )
        })?;

        let label = label.trim();
        if label.is_empty() {
            anyhow::bail!("{}:{}: empty label", path.display(), line_num + 1);
        }
        let address = parse_u32(address)
            .with_context(|| format!("{}:{}: invalid address", path.display(), line_num + 1))?;

        table.insert(address, label);
    }

    Ok(table)
}
