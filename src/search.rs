//! Scene-wide instruction search.

use serde::{Deserialize, Serialize};

use crate::group::GroupId;
use crate::instruction::{Instruction, OperandValue};
use crate::opcodes::{OpcodeFlags, OperandShape};
use crate::scene::Scene;
use crate::script::ScriptId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Query {
    /// Any instruction with this opcode id.
    Opcode(u8),
    /// A read or write of `address` in variable bank `bank` (1..=15). With a
    /// `value`, the same instruction must also carry that literal.
    Var {
        bank: u8,
        address: u8,
        value: Option<i64>,
    },
    /// A script request targeting `group`/`script`.
    Exec { group: GroupId, script: ScriptId },
    /// A scene change to this scene id.
    MapJump(u16),
    /// A text box or question showing this text id.
    Text(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub group: GroupId,
    pub script: ScriptId,
    pub index: usize,
}

impl Query {
    pub fn matches(&self, ins: &Instruction) -> bool {
        let Some(desc) = ins.desc() else {
            return false;
        };
        match *self {
            Query::Opcode(id) => desc.id == id,
            Query::Var { bank, address, value } => {
                // bank 0 marks a literal operand
                bank != 0
                    && var_refs(ins).any(|(b, a)| b == bank && a == i64::from(address))
                    && value.map_or(true, |v| var_refs(ins).any(|(b, lit)| b == 0 && lit == v))
            }
            Query::Exec { group, script } => {
                desc.flags.contains(OpcodeFlags::EXEC)
                    && scalar(ins, 0) == Some(i64::from(group))
                    && scalar(ins, 1).map(|v| v & 0x1F) == Some(i64::from(script))
            }
            Query::MapJump(scene) => {
                desc.flags.contains(OpcodeFlags::MAP_JUMP) && scalar(ins, 0) == Some(i64::from(scene))
            }
            Query::Text(id) => desc.flags.contains(OpcodeFlags::TEXT) && text_id(ins) == Some(i64::from(id)),
        }
    }
}

fn scalar(ins: &Instruction, n: usize) -> Option<i64> {
    ins.operands.get(n).and_then(OperandValue::as_scalar)
}

fn text_id(ins: &Instruction) -> Option<i64> {
    ins.shaped_operands()
        .filter(|(shape, _)| *shape != OperandShape::BankAddress)
        .nth(1)
        .and_then(|(_, v)| v.as_scalar())
}

/// Pairs each variable reference with its bank selector.
///
/// Bank bytes hold two selectors, high nibble first; the n-th variable
/// operand of the instruction uses the n-th selector.
fn var_refs(ins: &Instruction) -> impl Iterator<Item = (u8, i64)> + '_ {
    let banks: Vec<u8> = ins
        .shaped_operands()
        .filter(|(shape, _)| *shape == OperandShape::BankAddress)
        .filter_map(|(_, v)| v.as_scalar())
        .flat_map(|b| [((b >> 4) & 0xF) as u8, (b & 0xF) as u8])
        .collect();
    ins.shaped_operands()
        .filter(|(shape, _)| shape.is_var_ref())
        .enumerate()
        .filter_map(move |(n, (_, v))| Some((*banks.get(n)?, v.as_scalar()?)))
}

impl Scene {
    /// Every match, in group, slot and instruction order.
    pub fn find_all(&self, query: &Query) -> Vec<Location> {
        let mut hits = Vec::new();
        for group in self.groups() {
            for slot in group.slots() {
                for (index, ins) in slot.script.instructions().iter().enumerate() {
                    if query.matches(ins) {
                        hits.push(Location {
                            group: group.id,
                            script: slot.script.id,
                            index,
                        });
                    }
                }
            }
        }
        hits
    }

    /// Every variable use, as `(bank, address, location)`, in search order.
    /// Literal operands are skipped.
    pub fn all_vars(&self) -> Vec<(u8, u16, Location)> {
        let mut vars = Vec::new();
        for group in self.groups() {
            for slot in group.slots() {
                for (index, ins) in slot.script.instructions().iter().enumerate() {
                    let at = Location {
                        group: group.id,
                        script: slot.script.id,
                        index,
                    };
                    vars.extend(
                        var_refs(ins)
                            .filter(|&(bank, _)| bank != 0)
                            .filter_map(|(bank, address)| Some((bank, u16::try_from(address).ok()?, at))),
                    );
                }
            }
        }
        vars
    }

    /// First match strictly after `after`, or the first match overall.
    pub fn find_next(&self, query: &Query, after: Option<Location>) -> Option<Location> {
        let hits = self.find_all(query);
        let Some(after) = after else {
            return hits.first().copied();
        };
        let from = self.order_key(after)?;
        hits.into_iter()
            .find(|loc| self.order_key(*loc).is_some_and(|k| k > from))
    }

    /// Last match strictly before `before`, or the last match overall.
    pub fn find_prev(&self, query: &Query, before: Option<Location>) -> Option<Location> {
        let hits = self.find_all(query);
        let Some(before) = before else {
            return hits.last().copied();
        };
        let from = self.order_key(before)?;
        hits.into_iter()
            .rev()
            .find(|loc| self.order_key(*loc).is_some_and(|k| k < from))
    }

    fn order_key(&self, loc: Location) -> Option<(usize, usize, usize)> {
        let g = self.groups().iter().position(|g| g.id == loc.group)?;
        let s = self.groups()[g]
            .slots()
            .iter()
            .position(|s| s.script.id == loc.script)?;
        Some((g, s, loc.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_search_pairs_bank_nibbles() {
        // SETBYTE bank 0x30 => destination in bank 3, source literal
        let ins = Instruction::scalars(0x80, &[0x30, 0x12, 0x05]);
        assert!(Query::Var { bank: 3, address: 0x12, value: None }.matches(&ins));
        assert!(!Query::Var { bank: 3, address: 0x05, value: None }.matches(&ins));
        assert!(!Query::Var { bank: 0, address: 0x05, value: None }.matches(&ins));
    }

    #[test]
    fn var_search_can_require_a_literal() {
        // SETBYTE [3][0x12] = 5
        let ins = Instruction::scalars(0x80, &[0x30, 0x12, 0x05]);
        assert!(Query::Var { bank: 3, address: 0x12, value: Some(5) }.matches(&ins));
        assert!(!Query::Var { bank: 3, address: 0x12, value: Some(6) }.matches(&ins));
        // [3][0x12] = [1][0x05]: no literal to compare against
        let copy = Instruction::scalars(0x80, &[0x31, 0x12, 0x05]);
        assert!(!Query::Var { bank: 3, address: 0x12, value: Some(5) }.matches(&copy));
    }

    #[test]
    fn exec_search_masks_priority_bits() {
        // REQ group 4, priority 2, script 7
        let ins = Instruction::scalars(0x01, &[4, (2 << 5) | 7]);
        assert!(Query::Exec { group: 4, script: 7 }.matches(&ins));
        assert!(!Query::Exec { group: 4, script: 2 }.matches(&ins));
    }

    #[test]
    fn text_search_skips_window_id() {
        let ins = Instruction::scalars(0x40, &[1, 9]);
        assert!(Query::Text(9).matches(&ins));
        assert!(!Query::Text(1).matches(&ins));
    }

    #[test]
    fn map_jump_search() {
        let ins = Instruction::scalars(0x60, &[116, 10, -20, 3, 0]);
        assert!(Query::MapJump(116).matches(&ins));
        assert!(!Query::Opcode(0x5F).matches(&ins));
    }
}
