use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::isa::pc::CATALOG;

/// Encoding shape of a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandShape {
    UInt8,
    Int16,
    UInt16,
    UInt32,
    VarRef8,
    VarRef16,
    /// One byte holding two 4-bit bank selectors (high nibble first).
    BankAddress,
    /// 1-byte relative displacement.
    ShortBranchOffset,
    /// 2-byte absolute offset within the script.
    LongBranchOffset,
    /// Size byte (total instruction length, opcode included) followed by the payload.
    SizedBlock,
    /// Payload length byte (at most `MAX_COUNTED_BLOCK`) followed by the payload.
    CountedBlock,
}

/// Largest payload a `CountedBlock` operand carries.
pub const MAX_COUNTED_BLOCK: usize = 128;

impl OperandShape {
    /// Encoded width, `None` for shapes whose width depends on the value.
    pub const fn width(self) -> Option<usize> {
        match self {
            OperandShape::UInt8
            | OperandShape::VarRef8
            | OperandShape::BankAddress
            | OperandShape::ShortBranchOffset => Some(1),
            OperandShape::Int16
            | OperandShape::UInt16
            | OperandShape::VarRef16
            | OperandShape::LongBranchOffset => Some(2),
            OperandShape::UInt32 => Some(4),
            OperandShape::SizedBlock | OperandShape::CountedBlock => None,
        }
    }

    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            OperandShape::ShortBranchOffset | OperandShape::LongBranchOffset
        )
    }

    /// Shapes decoding to `OperandValue::Bytes`.
    pub const fn is_block(self) -> bool {
        matches!(self, OperandShape::SizedBlock | OperandShape::CountedBlock)
    }

    pub const fn is_var_ref(self) -> bool {
        matches!(self, OperandShape::VarRef8 | OperandShape::VarRef16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    None,
    ConditionalShort,
    ConditionalLong,
    UnconditionalForwardShort,
    UnconditionalForwardLong,
    UnconditionalBackwardShort,
    UnconditionalBackwardLong,
    /// Requests another entity's script; no byte-level target.
    Call,
    Return,
}

impl BranchKind {
    /// True for kinds that carry a byte-offset operand.
    pub const fn has_target(self) -> bool {
        matches!(
            self,
            BranchKind::ConditionalShort
                | BranchKind::ConditionalLong
                | BranchKind::UnconditionalForwardShort
                | BranchKind::UnconditionalForwardLong
                | BranchKind::UnconditionalBackwardShort
                | BranchKind::UnconditionalBackwardLong
        )
    }

    pub const fn is_long(self) -> bool {
        matches!(
            self,
            BranchKind::ConditionalLong
                | BranchKind::UnconditionalForwardLong
                | BranchKind::UnconditionalBackwardLong
        )
    }

    pub const fn is_backward(self) -> bool {
        matches!(
            self,
            BranchKind::UnconditionalBackwardShort | BranchKind::UnconditionalBackwardLong
        )
    }

    pub const fn is_conditional(self) -> bool {
        matches!(self, BranchKind::ConditionalShort | BranchKind::ConditionalLong)
    }

    pub const fn is_unconditional_jump(self) -> bool {
        self.has_target() && !self.is_conditional()
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpcodeFlags: u8 {
const EXEC = 1 << 0; // requests a script of another group
const MAP_JUMP = 1 << 1; // moves the player to another scene
const TEXT = 1 << 2; // second non-bank operand is a text id
}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpcodeDesc {
    pub id: u8,
    pub mnemonic: &'static str,
    pub operands: &'static [OperandShape],
    pub branch: BranchKind,
    /// Opcode id of the other-width twin of a branch (short <-> long).
    pub variant: Option<u8>,
    pub flags: OpcodeFlags,
}

impl OpcodeDesc {
    pub const fn new(
        id: u8,
        mnemonic: &'static str,
        operands: &'static [OperandShape],
    ) -> Self {
        Self {
            id,
            mnemonic,
            operands,
            branch: BranchKind::None,
            variant: None,
            flags: OpcodeFlags::empty(),
        }
    }

    pub const fn branch(mut self, kind: BranchKind, variant: Option<u8>) -> Self {
        self.branch = kind;
        self.variant = variant;
        self
    }

    pub const fn flags(mut self, flags: OpcodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Position of the branch operand, if this opcode has one.
    pub fn branch_operand(&self) -> Option<usize> {
        self.operands.iter().position(|s| s.is_branch())
    }

    /// Encoded length when every operand has a fixed width.
    pub fn fixed_len(&self) -> Option<usize> {
        self.operands
            .iter()
            .try_fold(1usize, |acc, s| s.width().map(|w| acc + w))
    }

    /// The long twin of a short branch.
    pub fn long_variant(&self) -> Option<&'static OpcodeDesc> {
        if self.branch.has_target() && !self.branch.is_long() {
            self.variant.and_then(lookup)
        } else {
            None
        }
    }

    /// The short twin of a long branch.
    pub fn short_variant(&self) -> Option<&'static OpcodeDesc> {
        if self.branch.is_long() {
            self.variant.and_then(lookup)
        } else {
            None
        }
    }

    /// Same width, opposite direction; only unconditional jumps have one.
    pub fn reversed(&self) -> Option<&'static OpcodeDesc> {
        if !self.branch.is_unconditional_jump() {
            return None;
        }
        CATALOG.iter().flatten().find(|d| {
            d.branch.is_unconditional_jump()
                && d.branch.is_long() == self.branch.is_long()
                && d.branch.is_backward() != self.branch.is_backward()
        })
    }

    /// Canonical short form, used to compare branches regardless of width.
    pub fn family(&self) -> &OpcodeDesc {
        self.short_variant().unwrap_or(self)
    }
}

/// Looks up the descriptor of an opcode id. Unassigned ids yield `None`.
pub fn lookup(id: u8) -> Option<&'static OpcodeDesc> {
    CATALOG[id as usize].as_ref()
}

pub fn by_mnemonic(mnemonic: &str) -> Option<&'static OpcodeDesc> {
    CATALOG
        .iter()
        .flatten()
        .find(|d| d.mnemonic.eq_ignore_ascii_case(mnemonic))
}

pub fn all() -> impl Iterator<Item = &'static OpcodeDesc> {
    CATALOG.iter().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_match_slots() {
        for (slot, desc) in CATALOG.iter().enumerate() {
            if let Some(d) = desc {
                assert_eq!(d.id as usize, slot, "{} sits in the wrong slot", d.mnemonic);
            }
        }
    }

    #[test]
    fn branch_opcodes_have_exactly_one_target_operand() {
        for d in all() {
            let n = d.operands.iter().filter(|s| s.is_branch()).count();
            if d.branch.has_target() {
                assert_eq!(n, 1, "{}", d.mnemonic);
                let shape = d.operands[d.branch_operand().unwrap()];
                assert_eq!(shape == OperandShape::LongBranchOffset, d.branch.is_long(), "{}", d.mnemonic);
            } else {
                assert_eq!(n, 0, "{}", d.mnemonic);
            }
        }
    }

    #[test]
    fn variants_pair_up() {
        for d in all() {
            if let Some(long) = d.long_variant() {
                assert_eq!(long.variant, Some(d.id));
                assert_eq!(long.fixed_len().unwrap(), d.fixed_len().unwrap() + 1);
                assert_eq!(long.operands.len(), d.operands.len());
            }
        }
    }

    #[test]
    fn jumps_reverse() {
        let jmpf = by_mnemonic("JMPF").unwrap();
        let jmpb = jmpf.reversed().unwrap();
        assert_eq!(jmpb.mnemonic, "JMPB");
        assert_eq!(jmpb.reversed().unwrap().id, jmpf.id);
        assert!(by_mnemonic("IFUB").unwrap().reversed().is_none());
    }

    #[test]
    fn unassigned_ids_are_unknown() {
        assert!(lookup(0x0C).is_none());
        assert_eq!(lookup(0x5F).unwrap().mnemonic, "NOP");
        assert_eq!(lookup(0x5F).unwrap().fixed_len(), Some(1));
    }
}
