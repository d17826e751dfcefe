// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::csv::TableSink;
use crate::decode::Trace;
use crate::values::{Radix, Time, Value};
use crate::{FillMode, TableOptions};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Time-major view of a [`Trace`]: one row per distinct timestamp, one column per signal.
/// Values are borrowed from the trace.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    time_label: String,
    columns: Vec<&'a str>,
    times: Vec<Time>,
    /// row major, `times.len() * columns.len()` entries
    cells: Vec<Option<&'a Value>>,
    radix: Radix,
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'t> {
    pub time: Time,
    pub cells: &'t [Option<&'t Value>],
}

/// Pivots the per-signal change logs of `trace` into a table.
///
/// Rows are the distinct timestamps of all changes in ascending order. Columns follow the
/// order in which signals first changed. When a signal changes more than once at the same
/// time, the cell shows the change that was recorded last.
pub fn tabulate<'a>(trace: &'a Trace, options: &TableOptions) -> Table<'a> {
    let columns: Vec<&'a str> = trace.signals().map(|id| trace.display_name(id)).collect();

    // full outer join over time
    let times: Vec<Time> = trace
        .change_logs()
        .flat_map(|(_, log)| log.iter().map(|c| c.time))
        .sorted_unstable()
        .dedup()
        .collect();
    let time_to_row: FxHashMap<Time, usize> =
        FxHashMap::from_iter(times.iter().enumerate().map(|(ii, &t)| (t, ii)));

    let num_cols = columns.len();
    let mut cells = vec![None; times.len() * num_cols];
    for (col, (_, log)) in trace.change_logs().enumerate() {
        // log order decides, so a later change at the same time overwrites an earlier one
        for change in log.iter() {
            let row = time_to_row[&change.time];
            cells[row * num_cols + col] = Some(&change.value);
        }
    }

    if options.fill == FillMode::Hold {
        for row in 1..times.len() {
            for col in 0..num_cols {
                let idx = row * num_cols + col;
                if cells[idx].is_none() {
                    cells[idx] = cells[idx - num_cols];
                }
            }
        }
    }

    log::debug!(
        "tabulated {} rows with {} signal columns",
        times.len(),
        num_cols
    );

    Table {
        time_label: trace.time_label(),
        columns,
        times,
        cells,
        radix: options.radix,
    }
}

impl<'a> Table<'a> {
    /// Header of the leading time column, e.g. `time in ns`.
    pub fn time_label(&self) -> &str {
        &self.time_label
    }

    /// Signal column headers, without the time column.
    pub fn columns(&self) -> &[&'a str] {
        &self.columns
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn num_rows(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&'a Value> {
        assert!(col < self.columns.len(), "column {col} out of range");
        self.cells[row * self.columns.len() + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        let num_cols = self.columns.len();
        self.times.iter().enumerate().map(move |(ii, &time)| Row {
            time,
            cells: &self.cells[ii * num_cols..(ii + 1) * num_cols],
        })
    }

    /// Cell texts of one row including the leading time. Absent values are empty strings.
    pub fn row_strings(&self, row: Row<'_>) -> Vec<Cow<'_, str>> {
        let mut out = Vec::with_capacity(row.cells.len() + 1);
        out.push(Cow::Owned(row.time.to_string()));
        for cell in row.cells.iter() {
            out.push(match cell {
                Some(value) => Cow::Owned(value.render(self.radix).into_owned()),
                None => Cow::Borrowed(""),
            });
        }
        out
    }

    /// Writes the header followed by one record per row in ascending time order.
    pub fn write(&self, sink: &mut impl TableSink) -> std::io::Result<()> {
        let header: Vec<&str> = std::iter::once(self.time_label.as_str())
            .chain(self.columns.iter().copied())
            .collect();
        sink.header(&header)?;
        for row in self.rows() {
            let strings = self.row_strings(row);
            let record: Vec<&str> = strings.iter().map(|s| s.as_ref()).collect();
            sink.record(&record)?;
        }
        sink.finish()
    }
}
