use std::fmt::Write as _;

use crate::instruction::{Instruction, OperandValue};
use crate::opcodes::OperandShape;
use crate::script::Script;

pub fn fmt_operand(shape: OperandShape, value: &OperandValue, script: &Script) -> String {
    match value {
        OperandValue::Scalar(v) => match shape {
            OperandShape::BankAddress => format!("{:#04x}", v),
            OperandShape::Int16 => format!("{}", v),
            _ => format!("{:#x}", v),
        },
        OperandValue::Symbolic(id) => script
            .label(*id)
            .map_or_else(|| format!("#{}", id.0), |l| l.name.clone()),
        OperandValue::ResolvedOffset(v) => format!("@{:#x}", v),
        OperandValue::Bytes(bytes) => {
            let mut s = String::from("[");
            for (i, b) in bytes.iter().enumerate() {
                if i > 0 {
                    s.push(' ');
                }
                let _ = write!(s, "{:02x}", b);
            }
            s.push(']');
            s
        }
    }
}

pub fn fmt_instruction(ins: &Instruction, script: &Script) -> String {
    let mut s = ins.mnemonic().to_string();
    if ins.desc().is_none() {
        let _ = write!(s, " {:#04x}", ins.opcode);
        return s;
    }
    for (i, (shape, value)) in ins.shaped_operands().enumerate() {
        s.push_str(if i == 0 { " " } else { ", " });
        s.push_str(&fmt_operand(shape, value, script));
    }
    s
}

/// Full listing: label lines (`name:`) followed by indented instructions.
pub fn listing(script: &Script) -> String {
    let mut buf = String::new();
    for (i, ins) in script.instructions().iter().enumerate() {
        for l in script.labels_at(i) {
            let _ = writeln!(buf, "{}:", l.name);
        }
        let _ = writeln!(buf, "    {}", fmt_instruction(ins, script));
    }
    for l in script.labels_at(script.len()) {
        let _ = writeln!(buf, "{}:", l.name);
    }
    buf
}
