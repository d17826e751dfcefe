// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracetab::*;

#[derive(Parser, Debug)]
#[command(name = "tracetab")]
#[command(author = "Kevin Laeufer <laeufer@cornell.edu>")]
#[command(version)]
#[command(about = "Converts the value changes of a VCD file into a CSV table with one row per timestamp.", long_about = None)]
#[command(after_help = DUPLICATE_NAMES_NOTE)]
struct Args {
    #[arg(value_name = "VCDFILE", index = 1)]
    filename: PathBuf,
    #[arg(short, long, value_name = "CSVFILE", default_value = "signal_changes.csv")]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = RadixArg::Dec, help = "how multi-bit values are printed")]
    radix: RadixArg,
    #[arg(
        long,
        help = "repeat the last value of a signal in rows where it did not change"
    )]
    hold: bool,
    #[arg(long, help = "prefix signal names with their scope path")]
    full_names: bool,
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
    #[arg(short, long, action = clap::ArgAction::Count, help = "more log output (-v, -vv, -vvv)")]
    verbose: u8,
    #[arg(short, long, help = "only report errors")]
    quiet: bool,
}

const DUPLICATE_NAMES_NOTE: &str = "Signals that share a name (e.g. `valid` in two different scopes) \
each get their own column, even though the column headers are identical. \
Use --full-names to tell them apart.";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RadixArg {
    Bin,
    Dec,
    Hex,
}

impl From<RadixArg> for Radix {
    fn from(value: RadixArg) -> Self {
        match value {
            RadixArg::Bin => Radix::Binary,
            RadixArg::Dec => Radix::Decimal,
            RadixArg::Hex => Radix::Hexadecimal,
        }
    }
}

fn parse_delimiter(arg: &str) -> std::result::Result<u8, String> {
    let arg = if arg == "\\t" { "\t" } else { arg };
    match arg.as_bytes() {
        [b'"' | b'\r' | b'\n'] => Err(format!("{arg:?} cannot be used as a delimiter")),
        [d] => Ok(*d),
        _ => Err("the delimiter must be a single ASCII character".to_string()),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use log::LevelFilter;
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let read_opts = ReadOptions {
        name_style: if args.full_names {
            NameStyle::Hierarchical
        } else {
            NameStyle::Leaf
        },
    };
    let table_opts = TableOptions {
        fill: if args.hold {
            FillMode::Hold
        } else {
            FillMode::AtChange
        },
        radix: args.radix.into(),
    };
    let csv_opts = CsvOptions {
        delimiter: args.delimiter,
    };

    let start = std::time::Instant::now();
    let trace = read(&args.filename, &read_opts)
        .with_context(|| format!("failed to load {}", args.filename.display()))?;
    log::info!(
        "loaded {} changes of {} signals in {:?}",
        trace.num_changes(),
        trace.num_signals(),
        start.elapsed()
    );

    let table = tabulate(&trace, &table_opts);

    // render everything before touching the output file
    let mut buf = Vec::new();
    write_csv(&table, &mut buf, &csv_opts)?;
    std::fs::write(&args.output, buf)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if !args.quiet {
        println!("CSV file created: {}", args.output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["tracetab", "dump.vcd"]).unwrap();
        assert_eq!(args.output, PathBuf::from("signal_changes.csv"));
        assert_eq!(args.delimiter, b',');
        assert!(matches!(args.radix, RadixArg::Dec));
        assert!(!args.hold && !args.full_names);
    }

    #[test]
    fn test_help_mentions_duplicate_names() {
        let help = Args::command().render_help().to_string();
        assert!(help.contains("each get their own column"), "{help}");
        assert!(help.contains("--full-names"), "{help}");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        assert!(Args::try_parse_from(["tracetab"]).is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter("\"").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
