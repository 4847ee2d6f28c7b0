use std::collections::HashMap;

use bitvec::prelude::*;
use tracing::trace;

use crate::instruction::{Instruction, Label, LabelId, OperandValue};
use crate::opcodes::{self, BranchKind};
use crate::operand::{decode_operand, Cursor, OperandError};
use crate::script::{Script, ScriptId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at {offset:#06x}")]
    UnknownOpcode { offset: usize, opcode: u8 },
    #[error("instruction at {offset:#06x} runs past the end of the script")]
    TruncatedInstruction { offset: usize },
    #[error("branch at {offset:#06x} targets {target:#06x}, which is not an instruction boundary")]
    MisalignedBranchTarget { offset: usize, target: i64 },
    #[error("malformed operand in instruction at {offset:#06x}: {source}")]
    MalformedOperand {
        offset: usize,
        #[source]
        source: OperandError,
    },
}

/// Decodes the instruction starting at the cursor. Branch operands stay numeric.
pub fn decode_instruction(cur: &mut Cursor<'_>) -> Result<Instruction, DecodeError> {
    let offset = cur.pos();
    let opcode = cur
        .read_u8()
        .map_err(|_| DecodeError::TruncatedInstruction { offset })?;
    let desc = opcodes::lookup(opcode).ok_or(DecodeError::UnknownOpcode { offset, opcode })?;
    let mut operands = Vec::with_capacity(desc.operands.len());
    for shape in desc.operands {
        let (value, _) = decode_operand(*shape, cur).map_err(|source| match source {
            OperandError::Truncated { .. } => DecodeError::TruncatedInstruction { offset },
            source => DecodeError::MalformedOperand { offset, source },
        })?;
        operands.push(value);
    }
    Ok(Instruction::new(opcode, operands))
}

/// Disassembles a whole byte slice as one script.
pub fn disassemble(id: ScriptId, bytes: &[u8]) -> Result<Script, DecodeError> {
    disassemble_with_len(id, bytes, bytes.len())
}

/// Disassembles the first `len` bytes of `bytes`; scripts do not delimit themselves.
pub fn disassemble_with_len(id: ScriptId, bytes: &[u8], len: usize) -> Result<Script, DecodeError> {
    let view = &bytes[..len.min(bytes.len())];
    let mut cur = Cursor::new(view);
    let mut instructions = Vec::new();
    let mut offsets = Vec::new();
    let mut starts = bitvec![0; view.len() + 1];
    // (instruction index, absolute target)
    let mut pending: Vec<(usize, i64)> = Vec::new();

    while cur.pos() < len {
        let offset = cur.pos();
        if cur.is_at_end() {
            return Err(DecodeError::TruncatedInstruction { offset });
        }
        let ins = decode_instruction(&mut cur)?;
        let end = cur.pos();
        trace!(offset, mnemonic = ins.mnemonic(), "decoded");
        starts.set(offset, true);

        if let Some(target) = branch_destination(&ins, end) {
            pending.push((instructions.len(), target));
        }
        offsets.push(offset);
        instructions.push(ins);
    }
    let len = view.len();
    starts.set(len, true);

    let mut labels: Vec<Label> = Vec::new();
    let mut by_offset: HashMap<usize, LabelId> = HashMap::new();
    for (index, target) in pending {
        let at = usize::try_from(target)
            .ok()
            .filter(|&t| t <= len && starts[t])
            .ok_or(DecodeError::MisalignedBranchTarget {
                offset: offsets[index],
                target,
            })?;
        let id = *by_offset.entry(at).or_insert_with(|| {
            let id = LabelId(labels.len());
            let defined_at = offsets.binary_search(&at).unwrap_or(instructions.len());
            labels.push(Label {
                id,
                name: format!("label_{}", id.0 + 1),
                defined_at: Some(defined_at),
            });
            id
        });
        instructions[index].set_branch_target(id);
    }

    Ok(Script::from_parts(id, instructions, labels))
}

/// Absolute destination of a decoded branch; `end` is the offset right after it.
fn branch_destination(ins: &Instruction, end: usize) -> Option<i64> {
    let desc = ins.desc()?;
    let n = desc.branch_operand()?;
    let OperandValue::ResolvedOffset(raw) = ins.operands.get(n)? else {
        return None;
    };
    let raw = *raw as i64;
    let end = end as i64;
    match desc.branch {
        BranchKind::ConditionalShort | BranchKind::UnconditionalForwardShort => Some(end + raw),
        BranchKind::UnconditionalBackwardShort => Some(end - raw),
        BranchKind::ConditionalLong
        | BranchKind::UnconditionalForwardLong
        | BranchKind::UnconditionalBackwardLong => Some(raw),
        BranchKind::None | BranchKind::Call | BranchKind::Return => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_plain_instructions() {
        let s = disassemble(0, &[0x5F, 0x24, 0x10, 0x00, 0x00]).unwrap();
        assert_eq!(
            s.instructions(),
            &[Instruction::nop(), Instruction::scalars(0x24, &[0x10]), Instruction::ret()]
        );
        assert!(s.labels().is_empty());
    }

    #[test]
    fn labels_are_shared_per_target() {
        // JMPF +3, JMPFL 0x0004, NOP, RET
        let bytes = [0x10, 0x03, 0x11, 0x04, 0x00, 0x5F, 0x00];
        let err = disassemble(0, &bytes).unwrap_err();
        // 0x0004 falls inside JMPFL
        assert_eq!(err, DecodeError::MisalignedBranchTarget { offset: 2, target: 4 });

        let bytes = [0x10, 0x03, 0x11, 0x05, 0x00, 0x5F, 0x00];
        let s = disassemble(0, &bytes).unwrap();
        assert_eq!(s.labels().len(), 1);
        assert_eq!(s.labels()[0].name, "label_1");
        assert_eq!(s.labels()[0].defined_at, Some(2));
        assert_eq!(s.instructions()[0].branch_target(), Some(LabelId(0)));
        assert_eq!(s.instructions()[1].branch_target(), Some(LabelId(0)));
    }

    #[test]
    fn unknown_opcode_reports_offset() {
        assert_eq!(
            disassemble(0, &[0x5F, 0x0D]).unwrap_err(),
            DecodeError::UnknownOpcode { offset: 1, opcode: 0x0D }
        );
    }

    #[test]
    fn declared_length_bounds_decoding() {
        // WAIT needs two operand bytes; only one is inside the script
        let bytes = [0x24, 0x10, 0x00];
        assert_eq!(
            disassemble_with_len(0, &bytes, 2).unwrap_err(),
            DecodeError::TruncatedInstruction { offset: 0 }
        );
        assert_eq!(
            disassemble_with_len(0, &bytes[..1], 3).unwrap_err(),
            DecodeError::TruncatedInstruction { offset: 0 }
        );
    }

    #[test]
    fn huge_declared_length_reports_truncation() {
        for len in [usize::MAX, 1 << 40] {
            assert_eq!(
                disassemble_with_len(0, &[0x00], len).unwrap_err(),
                DecodeError::TruncatedInstruction { offset: 1 }
            );
        }
    }

    #[test]
    fn unused_1c_carries_its_own_payload_length() {
        let bytes = [0x1C, 0x01, 0x02, 0x03, 0x04, 0x02, 0xAA, 0xBB, 0x00];
        let s = disassemble(0, &bytes).unwrap();
        assert_eq!(
            s.instructions()[0].operands,
            vec![OperandValue::Scalar(0x0403_0201), OperandValue::Bytes(vec![0xAA, 0xBB])]
        );
        assert_eq!(s.instructions()[1], Instruction::ret());

        let oversized = [0x1C, 0, 0, 0, 0, 129, 0x00];
        assert!(matches!(
            disassemble(0, &oversized).unwrap_err(),
            DecodeError::MalformedOperand { offset: 0, .. }
        ));
    }
}
