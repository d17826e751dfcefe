// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

mod csv;
mod decode;
mod table;
mod values;
pub mod vcd;

use std::io::BufRead;

/// Cargo.toml version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Determines the column header of a signal.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum NameStyle {
    /// Only the name from the `$var` declaration. Signals in different scopes may end up
    /// with the same name.
    #[default]
    Leaf,
    /// The names of all enclosing scopes joined by `.` followed by the leaf name.
    Hierarchical,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct ReadOptions {
    pub name_style: NameStyle,
}

/// Decides what a cell shows when its signal did not change at the row's time.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum FillMode {
    /// Empty unless the signal changed at exactly this time.
    #[default]
    AtChange,
    /// Repeat the most recent value, empty before the first change.
    Hold,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct TableOptions {
    pub fill: FillMode,
    pub radix: Radix,
}

#[derive(Debug, thiserror::Error)]
pub enum TraceTabError {
    #[error("failed to read VCD:\n{0}")]
    Vcd(#[from] VcdParseError),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TraceTabError>;

/// Reads and decodes a complete VCD file.
pub fn read<P: AsRef<std::path::Path>>(filename: P, options: &ReadOptions) -> Result<Trace> {
    let input = std::fs::File::open(filename)?;
    read_from_reader(std::io::BufReader::new(input), options)
}

/// Read from something that is not a file.
pub fn read_from_reader(input: impl BufRead, options: &ReadOptions) -> Result<Trace> {
    let mut decoder = Decoder::new(options);
    vcd::tokenize(input, |event| decoder.apply(event))?;
    Ok(decoder.finish())
}

pub use csv::{write_csv, CsvOptions, CsvWriter, TableSink};
pub use decode::{decode, Change, Decoder, SignalId, Trace};
pub use table::{tabulate, Row, Table};
pub use values::{Radix, Time, Timescale, Value};
pub use vcd::{Event, SimulationCommand, VcdParseError};
