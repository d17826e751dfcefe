// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Delimiter separated output of a `Table`.

use crate::table::Table;
use std::io::Write;

/// Receives a table one record at a time.
pub trait TableSink {
    fn header(&mut self, names: &[&str]) -> std::io::Result<()>;
    fn record(&mut self, cells: &[&str]) -> std::io::Result<()>;
    fn finish(&mut self) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions { delimiter: b',' }
    }
}

const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Writes records with RFC 4180 quoting. Fields are quoted only when they contain the
/// delimiter, a double quote or a line break.
pub struct CsvWriter<W: Write> {
    out: W,
    delimiter: u8,
    num_fields: Option<usize>,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W, options: &CsvOptions) -> Self {
        CsvWriter {
            out,
            delimiter: options.delimiter,
            num_fields: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, fields: &[&str]) -> std::io::Result<()> {
        for (ii, field) in fields.iter().enumerate() {
            if ii > 0 {
                self.out.write_all(&[self.delimiter])?;
            }
            self.write_field(field.as_bytes())?;
        }
        self.out.write_all(LINE_TERMINATOR)
    }

    fn write_field(&mut self, field: &[u8]) -> std::io::Result<()> {
        if !needs_quotes(field, self.delimiter) {
            return self.out.write_all(field);
        }
        self.out.write_all(b"\"")?;
        for (ii, part) in field.split(|&b| b == b'"').enumerate() {
            if ii > 0 {
                self.out.write_all(b"\"\"")?;
            }
            self.out.write_all(part)?;
        }
        self.out.write_all(b"\"")
    }
}

#[inline]
fn needs_quotes(field: &[u8], delimiter: u8) -> bool {
    field
        .iter()
        .any(|&b| b == delimiter || matches!(b, b'"' | b'\r' | b'\n'))
}

impl<W: Write> TableSink for CsvWriter<W> {
    fn header(&mut self, names: &[&str]) -> std::io::Result<()> {
        self.num_fields = Some(names.len());
        self.write_line(names)
    }

    fn record(&mut self, cells: &[&str]) -> std::io::Result<()> {
        debug_assert_eq!(
            self.num_fields,
            Some(cells.len()),
            "record does not match header"
        );
        self.write_line(cells)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// Writes `table` as CSV: a header of `time in <unit>` followed by the signal names and one
/// line per row.
pub fn write_csv(table: &Table, out: impl Write, options: &CsvOptions) -> crate::Result<()> {
    let mut writer = CsvWriter::new(out, options);
    table.write(&mut writer)?;
    Ok(())
}
