use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::instruction::{Instruction, Label, LabelId, OperandValue};
use crate::opcodes::OpcodeDesc;

pub type ScriptId = u8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("instruction index {index} out of range (script has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no label with id {0:?}")]
    NoSuchLabel(LabelId),
    #[error("instruction {index} is not a branch")]
    NotABranch { index: usize },
}

/// One field script: an ordered instruction list plus its label arena.
///
/// Labels are positions, not instructions. A label defined at `i` precedes
/// the instruction at index `i`; inserting at `i` places the new
/// instruction after such labels, removing the instruction at `i` leaves
/// them on whatever instruction moves into `i`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    instructions: Vec<Instruction>,
    labels: Vec<Label>,
}

impl Script {
    pub fn new(id: ScriptId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Assembles a script from raw parts. Label ids are reassigned to match
    /// arena order and branch operands follow their label.
    pub fn from_parts(id: ScriptId, mut instructions: Vec<Instruction>, mut labels: Vec<Label>) -> Self {
        let mut renumbered = HashMap::with_capacity(labels.len());
        for (i, l) in labels.iter_mut().enumerate() {
            renumbered.entry(l.id).or_insert(LabelId(i));
            l.id = LabelId(i);
        }
        for ins in &mut instructions {
            for value in &mut ins.operands {
                if let OperandValue::Symbolic(old) = value {
                    if let Some(new) = renumbered.get(old) {
                        *old = *new;
                    }
                }
            }
        }
        Self {
            id,
            instructions,
            labels,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instruction_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(id.0)
    }

    /// First label carrying `name`.
    pub fn label_by_name(&self, name: &str) -> Option<LabelId> {
        self.labels.iter().find(|l| l.name == name).map(|l| l.id)
    }

    /// Labels positioned right before instruction `index`.
    pub fn labels_at(&self, index: usize) -> impl Iterator<Item = &Label> {
        self.labels
            .iter()
            .filter(move |l| l.defined_at == Some(index))
    }

    /// Indices of the instructions branching to `label`.
    pub fn references(&self, label: LabelId) -> Vec<usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter(|(_, ins)| ins.branch_target() == Some(label))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn push(&mut self, ins: Instruction) -> usize {
        self.instructions.push(ins);
        self.instructions.len() - 1
    }

    pub fn insert(&mut self, index: usize, ins: Instruction) -> Result<(), EditError> {
        self.check_position(index)?;
        self.instructions.insert(index, ins);
        for l in &mut self.labels {
            if let Some(at) = l.defined_at.as_mut() {
                if *at > index {
                    *at += 1;
                }
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Instruction, EditError> {
        self.check_index(index)?;
        let ins = self.instructions.remove(index);
        for l in &mut self.labels {
            if let Some(at) = l.defined_at.as_mut() {
                if *at > index {
                    *at -= 1;
                }
            }
        }
        Ok(ins)
    }

    /// Moves one instruction; labels stay where they are.
    pub fn move_instruction(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        self.check_index(from)?;
        self.check_index(to)?;
        let ins = self.instructions.remove(from);
        self.instructions.insert(to, ins);
        Ok(())
    }

    /// Adds a label; `at` may equal the instruction count to mark the end of the script.
    pub fn add_label(&mut self, name: impl Into<String>, at: Option<usize>) -> Result<LabelId, EditError> {
        if let Some(at) = at {
            self.check_position(at)?;
        }
        let id = LabelId(self.labels.len());
        self.labels.push(Label {
            id,
            name: name.into(),
            defined_at: at,
        });
        Ok(id)
    }

    /// Adds a label at the current end of the script.
    pub fn mark(&mut self, name: impl Into<String>) -> LabelId {
        let id = LabelId(self.labels.len());
        self.labels.push(Label {
            id,
            name: name.into(),
            defined_at: Some(self.instructions.len()),
        });
        id
    }

    pub fn place_label(&mut self, id: LabelId, at: Option<usize>) -> Result<(), EditError> {
        if let Some(at) = at {
            self.check_position(at)?;
        }
        let label = self.labels.get_mut(id.0).ok_or(EditError::NoSuchLabel(id))?;
        label.defined_at = at;
        Ok(())
    }

    pub fn rename_label(&mut self, id: LabelId, name: impl Into<String>) -> Result<(), EditError> {
        let label = self.labels.get_mut(id.0).ok_or(EditError::NoSuchLabel(id))?;
        label.name = name.into();
        Ok(())
    }

    /// Points the branch at `index` to `label`.
    pub fn retarget(&mut self, index: usize, label: LabelId) -> Result<(), EditError> {
        if self.labels.get(label.0).is_none() {
            return Err(EditError::NoSuchLabel(label));
        }
        let len = self.instructions.len();
        let ins = self
            .instructions
            .get_mut(index)
            .ok_or(EditError::IndexOutOfRange { index, len })?;
        if ins.set_branch_target(label) {
            Ok(())
        } else {
            Err(EditError::NotABranch { index })
        }
    }

    /// Same program up to label names and branch width/direction.
    pub fn equivalent(&self, other: &Script) -> bool {
        self.len() == other.len()
            && self
                .instructions
                .iter()
                .zip(&other.instructions)
                .all(|(a, b)| self.same_instruction(a, other, b))
    }

    fn same_instruction(&self, a: &Instruction, other: &Script, b: &Instruction) -> bool {
        let (Some(da), Some(db)) = (a.desc(), b.desc()) else {
            return a == b;
        };
        let canon = |d: &'static OpcodeDesc| {
            let d = d.family();
            // both jump families compare equal
            if d.branch.is_unconditional_jump() && d.branch.is_backward() {
                d.reversed().map_or(d.id, |f| f.id)
            } else {
                d.id
            }
        };
        if canon(da) != canon(db) || a.operands.len() != b.operands.len() {
            return false;
        }
        a.operands.iter().zip(&b.operands).all(|(x, y)| match (x, y) {
            (OperandValue::Symbolic(lx), OperandValue::Symbolic(ly)) => {
                let at_x = self.label(*lx).and_then(|l| l.defined_at);
                let at_y = other.label(*ly).and_then(|l| l.defined_at);
                at_x.is_some() && at_x == at_y
            }
            _ => x == y,
        })
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.instructions.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.instructions.len(),
            })
        }
    }

    fn check_position(&self, index: usize) -> Result<(), EditError> {
        if index <= self.instructions.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.instructions.len(),
            })
        }
    }
}
