// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end pipeline tests: assemble LOWL source, run the machine,
//! observe the output streams and the final core.

use lowlforge::assembler::{assemble_source, Program};
use lowlforge::core::error::Error;
use lowlforge::vm::{Halt, Machine};

fn assembled(src: &str) -> Program {
    assemble_source(src.as_bytes()).expect("assemble")
}

fn run(program: Program) -> (Machine, Result<Halt, Error>, String) {
    let mut machine = Machine::from_image(program.image);
    let mut stdout = Vec::new();
    let mut msg = Vec::new();
    let outcome = machine.run(&mut stdout, &mut msg, 100_000);
    (machine, outcome, String::from_utf8(stdout).expect("utf8"))
}

fn run_src(src: &str) -> (Machine, Result<Halt, Error>, String) {
    run(assembled(src))
}

#[test]
fn message_program_writes_and_halts() {
    let (machine, outcome, stdout) = run_src("PRGST 'X'\n[BEGIN] MESS 'hi$'\nPRGEN\n");
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "hi\n");
    assert!(machine.halted());
}

#[test]
fn stores_and_adds_accumulate_in_a_variable() {
    let program = assembled(
        "PRGST 'X'\nDCL V\n[BEGIN] LAL 5\nSTV V,X\nLAV V,X\nAAL 3\nSTV V,X\nPRGEN\n",
    );
    let v = program.symbols.resolved_value("V").expect("V") as usize;
    let (machine, outcome, _) = run(program);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(machine.core_value(v), 8);
}

#[test]
fn compare_and_branch_takes_the_less_than_path() {
    let src = "PRGST 'X'\n[BEGIN] LAL 2\nCAL 3\nGOLT L1,0,X,X\nMESS 'no$'\nGO L2,0,X,X\n\
               [L1] MESS 'lt$'\n[L2] PRGEN\n";
    let (_, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "lt\n");
}

#[test]
fn subroutine_call_returns_and_balances_the_stack() {
    let src = "PRGST 'X'\nSUBR S,X,1\nMESS 'in$'\nEXIT 1,S\n[BEGIN] GOSUB S,0\nMESS 'out$'\nPRGEN\n";
    let (machine, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "in\nout\n");
    assert_eq!(machine.return_depth(), 0);
}

#[test]
fn equal_compare_takes_the_equal_path() {
    let src = "PRGST 'X'\n[BEGIN] LAL 65\nCAL 65\nGOEQ T,0,X,X\nMESS 'n$'\nGO E,0,X,X\n\
               [T] MESS 'y$'\n[E] PRGEN\n";
    let (_, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "y\n");
}

#[test]
fn push_twice_pop_once_rewinds_one_slot() {
    let program =
        assembled("PRGST 'X'\nDCL V\n[BEGIN] LAL 10\nFSTK\nLAL 20\nFSTK\nUNSTK V\nPRGEN\n");
    let v = program.symbols.resolved_value("V").expect("V") as usize;
    let (machine, outcome, _) = run(program);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(machine.core_value(v), 20);
    assert_eq!(machine.ffpt(), 1, "forwards pointer rewound by one slot");
}

#[test]
fn goadd_dispatches_through_its_table() {
    let src = "PRGST 'X'\nDCL V\n[BEGIN] LAL 1\nSTV V,X\nGOADD V\n\
               GO L0,0,X,T\nGO L1,0,X,T\nMESS 'fall$'\nGO E,0,X,X\n\
               [L0] MESS 'a$'\nGO E,0,X,X\n[L1] MESS 'b$'\n[E] PRGEN\n";
    let (_, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "b\n");
}

#[test]
fn exit_index_selects_the_call_site_table_entry() {
    let src = "PRGST 'X'\nSUBR S,X,2\nEXIT 2,S\n[BEGIN] GOSUB S,0\n\
               GO L1,0,X,C\nGO L2,0,X,C\nMESS 'fall$'\nGO E,0,X,X\n\
               [L1] MESS 'one$'\nGO E,0,X,X\n[L2] MESS 'two$'\n[E] PRGEN\n";
    let (machine, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "two\n");
    assert_eq!(machine.return_depth(), 0);
}

#[test]
fn parameters_arrive_through_parnm() {
    let src = "PRGST 'X'\nDCL PARNM\nSUBR S,PARNM,1\nEXIT 1,S\n\
               [BEGIN] LAL 42\nGOSUB S,0\nPRGEN\n";
    let program = assembled(src);
    let parnm = program.symbols.resolved_value("PARNM").expect("PARNM") as usize;
    let (machine, outcome, _) = run(program);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(machine.core_value(parnm), 42);
}

#[test]
fn address_of_and_indirect_load_walk_string_data() {
    let src = "PRGST 'X'\nDCL P\n[S] STR 'AB'\n[BEGIN] LAA S,C\nSTV P,X\nLAI P,X\nPRGEN\n";
    let (machine, outcome, _) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(machine.a(), i64::from(b'A'));
}

#[test]
fn mderch_copies_register_c_to_stdout() {
    let src = "PRGST 'X'\n[BEGIN] LCN QUTREP\nGOSUB MDERCH,X\nPRGEN\n";
    let (_, outcome, stdout) = run_src(src);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "\"");
}

#[test]
fn mdquit_is_a_deliberate_exit() {
    let (machine, outcome, _) = run_src("PRGST 'X'\n[BEGIN] GOSUB MDQUIT,X\nPRGEN\n");
    assert_eq!(outcome, Ok(Halt::Quit));
    assert!(machine.halted());
}

#[test]
fn runaway_program_exhausts_the_cycle_budget() {
    let program = assembled("PRGST 'X'\n[BEGIN] GO BEGIN,0,X,X\nPRGEN\n");
    let mut machine = Machine::from_image(program.image);
    let mut stdout = Vec::new();
    let mut msg = Vec::new();
    assert_eq!(
        machine.run(&mut stdout, &mut msg, 50),
        Err(Error::CycleLimit)
    );
}

#[test]
fn missing_begin_halts_immediately() {
    let program = assembled("PRGST 'X'\nMESS 'never$'\nPRGEN\n");
    assert_eq!(program.diagnostics.len(), 1);
    let (_, outcome, stdout) = run(program);
    assert_eq!(outcome, Ok(Halt::Normal));
    assert_eq!(stdout, "", "nothing runs without BEGIN");
}

#[test]
fn scan_errors_abort_before_assembly() {
    let err = assemble_source(b"PRGST 'X'\n[BEGIN] MESS 'open\nPRGEN\n").expect_err("error");
    assert!(matches!(err, Error::Parse { line: 2, .. }));
}

#[test]
fn undefined_branch_targets_abort_assembly() {
    let err = assemble_source(b"PRGST 'X'\n[BEGIN] GO MISSING,0,X,X\nPRGEN\n").expect_err("error");
    assert!(matches!(
        err,
        Error::Assemble { message, .. } if message.contains("MISSING")
    ));
}
