// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::values::{Time, Timescale, Value};
use crate::vcd::{Event, Result, VcdParseError};
use crate::{NameStyle, ReadOptions};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::borrow::Borrow;
use std::fmt::{Debug, Display, Formatter};

/// The identifier code that the VCD uses to refer to a signal, e.g. `!` or `#%`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalId(String);

impl SignalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SignalId {
    fn from(value: &str) -> Self {
        SignalId(value.to_string())
    }
}

impl Borrow<str> for SignalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for SignalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Change {
    pub time: Time,
    pub value: Value,
}

/// Keyed by signal id, iterates in the order in which signals changed for the first time.
type ChangeLogs = IndexMap<SignalId, Vec<Change>, FxBuildHasher>;

/// Everything that was recorded while decoding a VCD.
pub struct Trace {
    timescale: Option<Timescale>,
    names: FxHashMap<SignalId, String>,
    changes: ChangeLogs,
}

impl Debug for Trace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trace({} signals, {} changes)",
            self.num_signals(),
            self.num_changes()
        )
    }
}

impl Trace {
    pub fn timescale(&self) -> Option<&Timescale> {
        self.timescale.as_ref()
    }

    /// Header of the time column. Without a `$timescale` the unit is `unknown`.
    pub fn time_label(&self) -> String {
        let unit = self.timescale.as_ref().map(|t| t.unit.as_str());
        format!("time in {}", unit.unwrap_or("unknown"))
    }

    /// The name bound by the last declaration of `id`, if there was one.
    pub fn declared_name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(|n| n.as_str())
    }

    /// Falls back to the raw id for signals that were never declared.
    pub fn display_name<'a>(&'a self, id: &'a SignalId) -> &'a str {
        self.declared_name(id.as_str()).unwrap_or(id.as_str())
    }

    /// All signals with at least one change, in the order of their first change.
    pub fn signals(&self) -> impl Iterator<Item = &SignalId> {
        self.changes.keys()
    }

    pub fn change_log(&self, id: &str) -> Option<&[Change]> {
        self.changes.get(id).map(|log| log.as_slice())
    }

    pub fn change_logs(&self) -> impl Iterator<Item = (&SignalId, &[Change])> {
        self.changes.iter().map(|(id, log)| (id, log.as_slice()))
    }

    pub fn num_signals(&self) -> usize {
        self.changes.len()
    }

    pub fn num_changes(&self) -> usize {
        self.changes.values().map(|log| log.len()).sum()
    }
}

/// Folds a stream of VCD events into a [`Trace`].
/// Time starts at zero and only `$timescale`, `$scope`, `$upscope`, `$var`, timestamps and
/// value changes affect the result. Everything else is skipped.
#[derive(Debug, Default)]
pub struct Decoder {
    options: ReadOptions,
    time: Time,
    scopes: Vec<String>,
    timescale: Option<Timescale>,
    names: FxHashMap<SignalId, String>,
    changes: ChangeLogs,
}

impl Decoder {
    pub fn new(options: &ReadOptions) -> Self {
        Decoder {
            options: *options,
            ..Default::default()
        }
    }

    pub fn time(&self) -> Time {
        self.time
    }

    /// Innermost open scope.
    pub fn scope(&self) -> Option<&str> {
        self.scopes.last().map(|s| s.as_str())
    }

    pub fn apply(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Timescale(factor, unit) => {
                let factor = match factor {
                    b"" => "1",
                    digits => std::str::from_utf8(digits)?,
                };
                let unit = std::str::from_utf8(unit)?;
                self.timescale = Some(Timescale::new(factor, unit));
            }
            Event::Scope(_tpe, name) => {
                self.scopes.push(std::str::from_utf8(name)?.to_string());
            }
            Event::UpScope => {
                if self.scopes.pop().is_none() {
                    log::debug!("ignoring $upscope without an open scope");
                }
            }
            Event::Var(_tpe, _size, id, name) => {
                let id = std::str::from_utf8(id)?;
                let name = self.qualify(reference_name(std::str::from_utf8(name)?));
                if let Some(old) = self.names.insert(SignalId::from(id), name) {
                    log::trace!("id `{id}` was already declared as `{old}`, rebinding");
                }
            }
            Event::Time(value) => self.time = value,
            Event::ScalarChange(value, id) => {
                let value = match value {
                    [c] => Value::Scalar(*c as char),
                    other => return Err(unexpected_value(other)),
                };
                self.record(id, value)?;
            }
            Event::VectorChange(value, id) => {
                let value = match value {
                    [b'b' | b'B', bits @ ..] => Value::Vector(std::str::from_utf8(bits)?.to_string()),
                    // real and string signals do not show up in the table
                    [b'r' | b'R' | b's' | b'S', ..] => {
                        log::trace!(
                            "skipping `{}` change of `{}`",
                            String::from_utf8_lossy(value),
                            String::from_utf8_lossy(id)
                        );
                        return Ok(());
                    }
                    other => return Err(unexpected_value(other)),
                };
                self.record(id, value)?;
            }
            Event::Date(_)
            | Event::Version(_)
            | Event::Comment(_)
            | Event::EndDefinitions
            | Event::Attribute(_)
            | Event::Simulation(_) => {} // nothing to do
        }
        Ok(())
    }

    fn qualify(&self, name: &str) -> String {
        match self.options.name_style {
            NameStyle::Leaf => name.to_string(),
            NameStyle::Hierarchical => {
                let mut full = String::new();
                for scope in self.scopes.iter() {
                    full.push_str(scope);
                    full.push('.');
                }
                full.push_str(name);
                full
            }
        }
    }

    #[inline]
    fn record(&mut self, id: &[u8], value: Value) -> Result<()> {
        if id.is_empty() {
            return Err(VcdParseError::VcdEmptyId);
        }
        let id = std::str::from_utf8(id)?;
        let change = Change {
            time: self.time,
            value,
        };
        match self.changes.get_mut(id) {
            Some(log) => log.push(change),
            None => {
                self.changes.insert(SignalId::from(id), vec![change]);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Trace {
        let trace = Trace {
            timescale: self.timescale,
            names: self.names,
            changes: self.changes,
        };
        log::debug!(
            "decoded {} value changes of {} signals, last timestamp: {}",
            trace.num_changes(),
            trace.num_signals(),
            self.time
        );
        trace
    }
}

/// Drops a bit-select or range suffix like `[7:0]` that is separated from the name by
/// whitespace.
#[inline]
fn reference_name(name: &str) -> &str {
    name.split_ascii_whitespace().next().unwrap_or(name)
}

#[inline]
fn unexpected_value(value: &[u8]) -> VcdParseError {
    VcdParseError::VcdUnexpectedBodyToken(String::from_utf8_lossy(value).to_string())
}

/// Decodes a sequence of events that was produced by some tokenizer.
pub fn decode<'a>(
    events: impl IntoIterator<Item = Event<'a>>,
    options: &ReadOptions,
) -> Result<Trace> {
    let mut decoder = Decoder::new(options);
    for event in events {
        decoder.apply(event)?;
    }
    Ok(decoder.finish())
}
