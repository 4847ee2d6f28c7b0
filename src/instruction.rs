use serde::{Deserialize, Serialize};

use crate::opcodes::{self, OpcodeDesc, OperandShape};
use crate::operand::{self, OperandError};

/// Index of a label in its script's label arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandValue {
    Scalar(i64),
    /// Branch target awaiting layout.
    Symbolic(LabelId),
    /// Encoded branch operand: a displacement for short branches, an absolute offset for long ones.
    ResolvedOffset(i32),
    /// Payload of a sized block, size byte excluded.
    Bytes(Vec<u8>),
}

impl OperandValue {
    pub fn as_scalar(&self) -> Option<i64> {
        match self {
            OperandValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<LabelId> {
        match self {
            OperandValue::Symbolic(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<i64> for OperandValue {
    fn from(v: i64) -> Self {
        OperandValue::Scalar(v)
    }
}

impl From<LabelId> for OperandValue {
    fn from(id: LabelId) -> Self {
        OperandValue::Symbolic(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u8,
    pub operands: Vec<OperandValue>,
}

impl Instruction {
    pub fn new(opcode: u8, operands: Vec<OperandValue>) -> Self {
        Self { opcode, operands }
    }

    /// Builds an instruction from plain scalars, in operand order.
    pub fn scalars(opcode: u8, values: &[i64]) -> Self {
        Self::new(opcode, values.iter().copied().map(OperandValue::Scalar).collect())
    }

    pub fn nop() -> Self {
        Self::new(0x5F, Vec::new())
    }

    pub fn ret() -> Self {
        Self::new(0x00, Vec::new())
    }

    /// Unconditional jump; the assembler picks direction and width.
    pub fn jump(target: LabelId) -> Self {
        Self::new(0x10, vec![OperandValue::Symbolic(target)])
    }

    /// Conditional branch whose last operand is `target`.
    pub fn branch(opcode: u8, leading: &[i64], target: LabelId) -> Self {
        let mut operands: Vec<OperandValue> =
            leading.iter().copied().map(OperandValue::Scalar).collect();
        operands.push(OperandValue::Symbolic(target));
        Self::new(opcode, operands)
    }

    pub fn desc(&self) -> Option<&'static OpcodeDesc> {
        opcodes::lookup(self.opcode)
    }

    pub fn mnemonic(&self) -> &'static str {
        self.desc().map_or("???", |d| d.mnemonic)
    }

    pub fn is_branch(&self) -> bool {
        self.desc().is_some_and(|d| d.branch.has_target())
    }

    pub fn branch_target(&self) -> Option<LabelId> {
        let idx = self.desc()?.branch_operand()?;
        self.operands.get(idx)?.as_label()
    }

    /// Points the branch operand at `target`. Returns false for non-branches.
    pub fn set_branch_target(&mut self, target: LabelId) -> bool {
        let Some(idx) = self.desc().and_then(|d| d.branch_operand()) else {
            return false;
        };
        match self.operands.get_mut(idx) {
            Some(slot) => {
                *slot = OperandValue::Symbolic(target);
                true
            }
            None => false,
        }
    }

    /// Encoded length with the current opcode's widths.
    pub fn encoded_len(&self) -> Option<usize> {
        let desc = self.desc()?;
        let mut len = 1;
        for (shape, value) in desc.operands.iter().zip(&self.operands) {
            len += operand::operand_len(*shape, value)?;
        }
        Some(len)
    }

    /// Encodes an instruction whose branch operands are already resolved.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), OperandError> {
        let desc = self
            .desc()
            .ok_or(OperandError::UnknownOpcode { opcode: self.opcode })?;
        if desc.operands.len() != self.operands.len() {
            return Err(OperandError::Arity {
                expected: desc.operands.len(),
                found: self.operands.len(),
            });
        }
        out.push(self.opcode);
        for (shape, value) in desc.operands.iter().zip(&self.operands) {
            operand::encode_operand(*shape, value, out)?;
        }
        Ok(())
    }

    /// Operands paired with their shapes.
    pub fn shaped_operands(&self) -> impl Iterator<Item = (OperandShape, &OperandValue)> {
        let shapes = self.desc().map_or(&[][..], |d| d.operands);
        shapes.iter().copied().zip(self.operands.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    /// Index of the instruction the label precedes; the instruction count marks the end of the script.
    pub defined_at: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_target_roundtrip() {
        let mut i = Instruction::branch(0x14, &[0x10, 3, 7, 0], LabelId(0));
        assert!(i.is_branch());
        assert_eq!(i.branch_target(), Some(LabelId(0)));
        assert!(i.set_branch_target(LabelId(4)));
        assert_eq!(i.branch_target(), Some(LabelId(4)));
        assert_eq!(i.operands.len(), 5);
    }

    #[test]
    fn non_branch_cannot_be_retargeted() {
        let mut i = Instruction::nop();
        assert!(!i.set_branch_target(LabelId(0)));
        assert_eq!(i.branch_target(), None);
    }

    #[test]
    fn encode_resolved_jump() {
        let i = Instruction::new(0x10, vec![OperandValue::ResolvedOffset(3)]);
        let mut out = Vec::new();
        i.encode(&mut out).unwrap();
        assert_eq!(out, vec![0x10, 0x03]);
        assert_eq!(i.encoded_len(), Some(2));
    }

    #[test]
    fn encode_rejects_pending_labels() {
        let i = Instruction::jump(LabelId(0));
        assert!(i.encode(&mut Vec::new()).is_err());
    }
}
