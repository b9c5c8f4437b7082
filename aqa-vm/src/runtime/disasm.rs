use std::fmt::Write;

use crate::runtime::program::{Program, Value};

/// Print the disassembly of a whole program, one slot per line.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    for (addr, instr) in program.instructions().iter().enumerate() {
        let _ = writeln!(out, "{:04}: {}", addr, instr);
    }
    out
}

pub fn dump_register_val(value: &Value) -> String {
    match value {
        Value::Int(i) => format!("{}", i),
        Value::Float(x) => format!("{:?}f", x),
    }
}

/// Registers four to a row, `R0` first.
pub fn dump_registers(registers: &[Value]) -> String {
    let mut out = String::new();
    for (row, chunk) in registers.chunks(4).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let cells = chunk
            .iter()
            .enumerate()
            .map(|(i, val)| format!("R{:<2} = {:>11}", row * 4 + i, dump_register_val(val)))
            .collect::<Vec<_>>();
        out.push_str(&cells.join("  "));
    }
    out
}
