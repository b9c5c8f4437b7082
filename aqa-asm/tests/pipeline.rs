use aqa_asm::{DiagnosticKind, assemble, assemble_source};
use aqa_vm::{CmpFlag, Machine, Value, execute};

fn run(src: &str) -> aqa_vm::RunSummary {
    let program = assemble_source(src).expect("program should assemble");
    Machine::new()
        .with_step_limit(10_000)
        .run(&program)
        .expect("program should halt")
}

#[test]
fn mov_then_add() {
    let summary = run("MOV R0, #5\nADD R1, R0, #3");
    assert_eq!(summary.registers[1], Value::Int(8));
}

#[test]
fn single_instruction_effects() {
    assert_eq!(run("ADD R2, #4, #-6").registers[2], Value::Int(-2));
    assert_eq!(run("SUB R2, #4, #6").registers[2], Value::Int(-2));
    assert_eq!(run("MOV R15, #9").registers[15], Value::Int(9));
    assert_eq!(run("CMP #1, #2").flag, CmpFlag::Lt);
}

#[test]
fn halt_first_leaves_registers_untouched() {
    let summary = run("HALT\nMOV R0, #1\nADD R1, R1, #1");

    assert!(summary.registers.iter().all(|v| *v == Value::Int(0)));
    assert_eq!(summary.steps, 1);
}

#[test]
fn countdown_loop_runs_three_times() {
    let src = "
        MOV R0, #3
        MOV R1, #0
    LOOP:
        SUB R0, R0, #1
        ADD R1, R1, #1
        CMP R0, #0
        B NE LOOP
        HALT
    ";
    let summary = run(src);

    assert_eq!(summary.registers[0], Value::Int(0));
    assert_eq!(summary.registers[1], Value::Int(3));
    // 2 setup + 3 iterations of 4 + halt
    assert_eq!(summary.steps, 15);
}

#[test]
fn conditional_branches_after_greater_than() {
    // Each taken branch skips the MOV that would mark it as not taken.
    let src = "
        MOV R0, #9
        MOV R1, #2
        CMP R0, R1
        B GT L1
        MOV R2, #1
    L1:
        B LT L2
        MOV R3, #1
    L2:
        B EQ L3
        MOV R4, #1
    L3:
        B NE L4
        MOV R5, #1
    L4:
        HALT
    ";
    let summary = run(src);

    assert_eq!(summary.registers[2], Value::Int(0), "GT taken");
    assert_eq!(summary.registers[3], Value::Int(1), "LT not taken");
    assert_eq!(summary.registers[4], Value::Int(1), "EQ not taken");
    assert_eq!(summary.registers[5], Value::Int(0), "NE taken");
}

#[test]
fn program_length_counts_non_label_lines() {
    let program = assemble([
        "START:",
        "MOV R0, #1",
        "B END",
        "MID:",
        "CMP R0, #1",
        "B EQ START",
        "END:",
        "HALT",
    ])
    .unwrap();

    assert_eq!(program.len(), 5 + 1);
}

#[test]
fn one_diagnostic_per_bad_line() {
    let err = assemble([
        "MOV #1, R0",
        "HALT",
        "ADD R0, R1, #0.5",
        "LOOP:",
        "SUB R1, #2.5, #1",
        "HALT #3",
    ])
    .unwrap_err();

    let lines = err.diagnostics.iter().map(|d| d.line).collect::<Vec<_>>();
    assert_eq!(lines, [1, 3, 5, 6]);
    assert!(
        err.diagnostics
            .iter()
            .all(|d| matches!(d.kind, DiagnosticKind::InvalidArgument { .. }))
    );
}

#[test]
fn rejected_program_yields_nothing() {
    let result = assemble(["MOV R0, #1", "ADD R1, R0, #2", "MOV R2, R16"]);
    let err = result.unwrap_err();

    assert_eq!(err.diagnostics.len(), 1);
    assert_eq!(err.diagnostics[0].text, "MOV R2, R16");
}

#[test]
fn float_values_promote_arithmetic() {
    let summary = run("MOV R0, #1.5\nADD R1, R0, #2\nCMP R1, #3");

    assert_eq!(summary.registers[1], Value::Float(3.5));
    assert_eq!(summary.flag, CmpFlag::Gt);
}

#[test]
fn case_and_comments_are_ignored() {
    let summary = run("mov r0, #2 // two\n\n; comment line\nadd r0, r0, r0");
    assert_eq!(summary.registers[0], Value::Int(4));
}

#[test]
fn execute_entry_point() {
    let program = assemble_source("MOV R7, #-1").unwrap();
    let summary = execute(&program).unwrap();

    assert_eq!(summary.registers[7], Value::Int(-1));
}
