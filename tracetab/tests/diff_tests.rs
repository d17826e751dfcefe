// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Checks the decoded change logs against the third-party `vcd` crate.

use rustc_hash::FxHashMap;
use std::io::BufReader;
use tracetab::*;

fn run_diff_test(vcd_filename: &str) {
    let ours = read(vcd_filename, &ReadOptions::default()).expect("failed to load VCD");
    let mut ref_parser =
        ::vcd::Parser::new(BufReader::new(std::fs::File::open(vcd_filename).unwrap()));
    let ref_header = ref_parser.parse_header().expect("reference parser failed");
    diff_header(&ours, &ref_header);
    diff_changes(&ours, &mut ref_parser);
}

fn diff_header(ours: &Trace, ref_header: &::vcd::Header) {
    match ref_header.timescale {
        None => assert!(ours.timescale().is_none()),
        Some((factor, unit)) => {
            let our_time = ours.timescale().unwrap();
            assert_eq!(factor.to_string(), our_time.factor);
            assert_eq!(unit.to_string(), our_time.unit);
        }
    }
    for item in ref_header.items.iter() {
        diff_item(ours, item);
    }
}

fn diff_item(ours: &Trace, ref_item: &::vcd::ScopeItem) {
    match ref_item {
        ::vcd::ScopeItem::Scope(scope) => {
            for child in scope.items.iter() {
                diff_item(ours, child);
            }
        }
        ::vcd::ScopeItem::Var(var) => {
            assert_eq!(
                ours.declared_name(&var.code.to_string()),
                Some(var.reference.as_str())
            );
        }
        _ => {} // comments
    }
}

fn diff_changes<R: std::io::BufRead>(ours: &Trace, ref_parser: &mut ::vcd::Parser<R>) {
    let mut ref_logs: FxHashMap<String, Vec<(Time, String)>> = FxHashMap::default();
    let mut time = 0;
    for cmd_res in ref_parser {
        let (id, value) = match cmd_res.unwrap() {
            ::vcd::Command::Timestamp(new_time) => {
                time = new_time;
                continue;
            }
            ::vcd::Command::ChangeScalar(id, value) => (id, value.to_string()),
            ::vcd::Command::ChangeVector(id, value) => (id, value.to_string()),
            // real and string signals are not tabulated
            ::vcd::Command::ChangeReal(..) => continue,
            ::vcd::Command::ChangeString(..) => continue,
            ::vcd::Command::Begin(_) => continue,   // ignore
            ::vcd::Command::End(_) => continue,     // ignore
            ::vcd::Command::Comment(_) => continue, // ignore
            other => panic!("Unhandled command: {:?}", other),
        };
        ref_logs
            .entry(id.to_string())
            .or_default()
            .push((time, value));
    }

    assert_eq!(ours.num_signals(), ref_logs.len());
    for (id, ref_log) in ref_logs.iter() {
        let our_log = ours
            .change_log(id)
            .unwrap_or_else(|| panic!("no changes recorded for {id}"));
        assert_eq!(our_log.len(), ref_log.len(), "{id}");
        for (change, (ref_time, ref_value)) in our_log.iter().zip(ref_log.iter()) {
            assert_eq!(change.time, *ref_time, "{id}");
            assert_eq!(change.value.render(Radix::Binary), *ref_value, "{id}");
        }
    }
}

#[test]
fn diff_clk_rst() {
    run_diff_test("inputs/clk_rst.vcd");
}

#[test]
fn diff_counter() {
    run_diff_test("inputs/counter.vcd");
}

#[test]
fn diff_header_only() {
    run_diff_test("inputs/header_only.vcd");
}
