// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Compares the table for randomly generated dumps against a straightforward model.

use proptest::prelude::*;
use rustc_hash::FxHashMap;
use std::fmt::Write;
use std::io::Cursor;
use tracetab::*;

/// The last id is never declared.
const IDS: [&str; 5] = ["!", "%", "&", "a", "zz"];
const NAMES: [&str; 4] = ["clk", "data", "en", "ready"];

#[derive(Debug, Clone)]
struct Step {
    delta: u64,
    changes: Vec<(usize, char)>,
}

fn step() -> impl Strategy<Value = Step> {
    (
        0u64..4,
        prop::collection::vec(
            (0..IDS.len(), prop::sample::select(vec!['0', '1', 'x', 'z'])),
            0..4,
        ),
    )
        .prop_map(|(delta, changes)| Step { delta, changes })
}

fn to_vcd(steps: &[Step]) -> String {
    let mut out = String::from("$timescale 1 ns $end\n$scope module top $end\n");
    for (id, name) in IDS.iter().zip(NAMES.iter()) {
        writeln!(out, "$var wire 1 {id} {name} $end").unwrap();
    }
    out.push_str("$upscope $end\n$enddefinitions $end\n");
    let mut time = 0;
    for step in steps.iter() {
        time += step.delta;
        writeln!(out, "#{time}").unwrap();
        for (id, value) in step.changes.iter() {
            writeln!(out, "{value}{}", IDS[*id]).unwrap();
        }
    }
    out
}

/// (time, id index, value) in file order
fn flatten(steps: &[Step]) -> Vec<(u64, usize, char)> {
    let mut time = 0;
    let mut out = vec![];
    for step in steps.iter() {
        time += step.delta;
        for &(id, value) in step.changes.iter() {
            out.push((time, id, value));
        }
    }
    out
}

fn load(steps: &[Step]) -> Trace {
    let vcd = to_vcd(steps);
    read_from_reader(Cursor::new(vcd.into_bytes()), &ReadOptions::default()).unwrap()
}

fn first_change_order(changes: &[(u64, usize, char)]) -> Vec<usize> {
    let mut order = vec![];
    for &(_, id, _) in changes.iter() {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

fn distinct_times(changes: &[(u64, usize, char)]) -> Vec<u64> {
    let mut times: Vec<u64> = changes.iter().map(|c| c.0).collect();
    times.dedup();
    times
}

proptest! {
    #[test]
    fn table_shows_last_value_at_each_time(steps in prop::collection::vec(step(), 0..20)) {
        let trace = load(&steps);
        let table = tabulate(&trace, &TableOptions::default());
        let changes = flatten(&steps);

        let order = first_change_order(&changes);
        let names: Vec<&str> = order
            .iter()
            .map(|&id| NAMES.get(id).copied().unwrap_or(IDS[id]))
            .collect();
        prop_assert_eq!(table.columns(), names.as_slice());

        let times = distinct_times(&changes);
        prop_assert_eq!(table.times(), times.as_slice());
        prop_assert!(table.times().windows(2).all(|w| w[0] < w[1]));

        let mut last = FxHashMap::default();
        for &(time, id, value) in changes.iter() {
            last.insert((time, id), value);
        }
        for (row, &time) in times.iter().enumerate() {
            for (col, &id) in order.iter().enumerate() {
                let expected = last.get(&(time, id)).map(|&c| Value::Scalar(c));
                prop_assert_eq!(table.cell(row, col).cloned(), expected);
            }
        }
        prop_assert_eq!(trace.num_changes(), changes.len());
    }

    #[test]
    fn hold_repeats_most_recent_value(steps in prop::collection::vec(step(), 0..20)) {
        let trace = load(&steps);
        let at_change = tabulate(&trace, &TableOptions::default());
        let hold = tabulate(&trace, &TableOptions { fill: FillMode::Hold, ..Default::default() });
        let changes = flatten(&steps);
        let order = first_change_order(&changes);
        let times = distinct_times(&changes);
        prop_assert_eq!(hold.times(), at_change.times());

        let mut current = FxHashMap::default();
        let mut next = 0;
        for (row, &time) in times.iter().enumerate() {
            while next < changes.len() && changes[next].0 <= time {
                current.insert(changes[next].1, changes[next].2);
                next += 1;
            }
            for (col, &id) in order.iter().enumerate() {
                let expected = current.get(&id).map(|&c| Value::Scalar(c));
                prop_assert_eq!(hold.cell(row, col).cloned(), expected);
                if let Some(value) = at_change.cell(row, col) {
                    prop_assert_eq!(hold.cell(row, col), Some(value));
                }
            }
        }
    }

    #[test]
    fn csv_has_one_line_per_row(steps in prop::collection::vec(step(), 0..20)) {
        let trace = load(&steps);
        let table = tabulate(&trace, &TableOptions::default());
        let mut out = Vec::new();
        write_csv(&table, &mut out, &CsvOptions::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split_terminator("\r\n").collect();
        prop_assert_eq!(lines.len(), table.num_rows() + 1);
        prop_assert_eq!(lines[0].split(',').next(), Some("time in ns"));
        for line in lines.iter() {
            prop_assert_eq!(line.split(',').count(), table.columns().len() + 1);
        }
    }
}
