//! Label resolution and byte emission.
//!
//! Branches start at their short form. Each pass measures every short
//! branch against the current layout and promotes the ones whose target is
//! out of reach; offsets are then recomputed and the next pass runs. Lengths
//! only grow, so the loop settles after at most one pass per promotion plus
//! a confirming pass.

use std::collections::HashMap;
use std::ops::{Deref, RangeInclusive};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticKind, UnreachableReason};
use crate::group::GroupId;
use crate::instruction::{Instruction, LabelId, OperandValue};
use crate::opcodes::{self, OpcodeDesc, OperandShape};
use crate::operand;
use crate::scene::{SceneId, SceneInfo};
use crate::script::{Script, ScriptId};

/// Scripts are addressed through 16-bit offset table entries.
pub const MAX_SCRIPT_LEN: usize = u16::MAX as usize;

/// Displacements a one-byte branch operand can express.
pub const SHORT_RANGE: RangeInclusive<i64> = 0..=255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Let unconditional jumps switch between the forward and backward families.
    pub flip_jump_direction: bool,
    /// Pass limit; defaults to the instruction count.
    pub max_passes: Option<usize>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            flip_jump_direction: true,
            max_passes: None,
        }
    }
}

/// Who is being assembled, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyContext {
    pub scene: SceneId,
    pub scene_name: String,
    pub group: GroupId,
    pub group_name: String,
    pub script: ScriptId,
    pub config: AssemblerConfig,
}

impl AssemblyContext {
    pub fn new(scene: &SceneInfo, group: GroupId, group_name: &str, script: ScriptId) -> Self {
        Self {
            scene: scene.id,
            scene_name: scene.name.clone(),
            group,
            group_name: group_name.to_string(),
            script,
            config: AssemblerConfig::default(),
        }
    }

    /// Context for a script assembled outside any scene.
    pub fn standalone(script: ScriptId) -> Self {
        Self {
            scene: 0,
            scene_name: String::new(),
            group: 0,
            group_name: String::new(),
            script,
            config: AssemblerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn diagnostic(&self, instruction_index: usize, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic {
            scene: self.scene,
            scene_name: self.scene_name.clone(),
            group: self.group,
            group_name: self.group_name.clone(),
            script: self.script,
            instruction_index,
            kind,
        }
    }
}

/// Final bytes of one script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ByteBlob(Vec<u8>);

impl ByteBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Length as stored in the container's offset table.
    pub fn len_u16(&self) -> u16 {
        // assembly refuses anything longer than MAX_SCRIPT_LEN
        self.0.len() as u16
    }
}

impl Deref for ByteBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub bytes: ByteBlob,
    /// Instructions as emitted: final opcode variants, branch operands resolved.
    pub instructions: Vec<Instruction>,
    /// Byte offset of every instruction, plus the end offset.
    pub offsets: Vec<usize>,
    pub passes: usize,
}

#[derive(Debug, Clone, Copy)]
struct Target {
    label: LabelId,
    at: usize,
    backward: bool,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    desc: Option<&'static OpcodeDesc>,
    len: usize,
    target: Option<Target>,
    /// Cleared once a diagnostic already explains why this branch cannot be laid out.
    promotable: bool,
}

/// Assembles `script` into bytes, or reports every problem found.
pub fn assemble(script: &Script, ctx: &AssemblyContext) -> Result<Assembly, Vec<Diagnostic>> {
    let mut diags = Vec::new();
    check_labels(script, ctx, &mut diags);
    let mut slots = prepare(script, ctx, &mut diags);

    let (offsets, passes) = match settle(&mut slots, ctx) {
        Ok(done) => done,
        Err(passes) => {
            let last = script.len().saturating_sub(1);
            diags.push(ctx.diagnostic(last, DiagnosticKind::AssemblyDidNotConverge { passes }));
            return Err(diags);
        }
    };

    check_reach(script, &slots, &offsets, ctx, &mut diags);
    check_size(&offsets, ctx, &mut diags);

    if !diags.is_empty() {
        diags.sort_by_key(|d| d.instruction_index);
        debug!(script = ctx.script, count = diags.len(), "assembly failed");
        return Err(diags);
    }

    let (bytes, instructions) = emit(script, &slots, &offsets, ctx)?;
    debug!(script = ctx.script, len = bytes.len(), passes, "assembled");
    Ok(Assembly {
        bytes: ByteBlob::new(bytes),
        instructions,
        offsets,
        passes,
    })
}

fn label_name(script: &Script, id: LabelId) -> String {
    script
        .label(id)
        .map_or_else(|| format!("#{}", id.0), |l| l.name.clone())
}

fn check_labels(script: &Script, ctx: &AssemblyContext, diags: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, LabelId> = HashMap::new();
    for label in script.labels() {
        let Some(at) = label.defined_at else { continue };
        if seen.insert(label.name.as_str(), label.id).is_some() {
            diags.push(ctx.diagnostic(
                at,
                DiagnosticKind::DuplicateLabel {
                    name: label.name.clone(),
                },
            ));
        }
    }
}

/// Validates operands and picks each branch's starting variant.
fn prepare(script: &Script, ctx: &AssemblyContext, diags: &mut Vec<Diagnostic>) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(script.len());
    for (i, ins) in script.instructions().iter().enumerate() {
        let Some(desc) = opcodes::lookup(ins.opcode) else {
            diags.push(ctx.diagnostic(i, DiagnosticKind::UnknownOpcode { opcode: ins.opcode }));
            slots.push(Slot {
                desc: None,
                len: 1,
                target: None,
                promotable: false,
            });
            continue;
        };

        let mut desc = desc.family();
        let mut target = None;
        let mut promotable = true;
        check_operands(desc, ins, i, ctx, diags);

        if let Some(label) = ins.branch_target() {
            match script.label(label).and_then(|l| l.defined_at) {
                Some(at) if at <= script.len() => {
                    let backward = at <= i;
                    if backward != desc.branch.is_backward() {
                        match desc.reversed().filter(|_| ctx.config.flip_jump_direction) {
                            Some(rev) => desc = rev,
                            None => {
                                let reason = if backward {
                                    UnreachableReason::BackwardReferenceUnsupported
                                } else {
                                    UnreachableReason::ForwardReferenceUnsupported
                                };
                                diags.push(ctx.diagnostic(
                                    i,
                                    DiagnosticKind::UnreachableLabel {
                                        name: label_name(script, label),
                                        reason,
                                    },
                                ));
                                promotable = false;
                            }
                        }
                    }
                    target = Some(Target { label, at, backward });
                }
                _ => {
                    diags.push(ctx.diagnostic(
                        i,
                        DiagnosticKind::UndefinedLabel {
                            name: label_name(script, label),
                        },
                    ));
                    promotable = false;
                }
            }
        }

        let len = slot_len(desc, ins);
        slots.push(Slot {
            desc: Some(desc),
            len,
            target,
            promotable,
        });
    }
    slots
}

fn check_operands(
    desc: &OpcodeDesc,
    ins: &Instruction,
    index: usize,
    ctx: &AssemblyContext,
    diags: &mut Vec<Diagnostic>,
) {
    if desc.operands.len() != ins.operands.len() {
        diags.push(ctx.diagnostic(
            index,
            DiagnosticKind::InvalidOperand {
                operand: ins.operands.len().min(desc.operands.len()),
                reason: format!(
                    "{} takes {} operand(s), found {}",
                    desc.mnemonic,
                    desc.operands.len(),
                    ins.operands.len()
                ),
            },
        ));
        return;
    }
    for (n, (shape, value)) in desc.operands.iter().zip(&ins.operands).enumerate() {
        let problem = if shape.is_branch() {
            match value {
                OperandValue::Symbolic(_) => None,
                _ => Some("branch operands must reference a label".to_string()),
            }
        } else {
            operand::check_operand(*shape, value).err().map(|e| e.to_string())
        };
        if let Some(reason) = problem {
            diags.push(ctx.diagnostic(index, DiagnosticKind::InvalidOperand { operand: n, reason }));
        }
    }
}

fn slot_len(desc: &OpcodeDesc, ins: &Instruction) -> usize {
    desc.operands
        .iter()
        .zip(&ins.operands)
        .map(|(shape, value)| match shape {
            s if s.is_block() => operand::operand_len(*shape, value).unwrap_or(1),
            _ => shape.width().unwrap_or(1),
        })
        .sum::<usize>()
        + 1
}

fn layout(slots: &[Slot]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(slots.len() + 1);
    let mut at = 0;
    for s in slots {
        offsets.push(at);
        at += s.len;
    }
    offsets.push(at);
    offsets
}

fn distance(slot: &Slot, index: usize, target: &Target, offsets: &[usize]) -> i64 {
    let next = (offsets[index] + slot.len) as i64;
    let dest = offsets[target.at] as i64;
    if target.backward {
        next - dest
    } else {
        dest - next
    }
}

/// Promotes out-of-range short branches until the layout stops changing.
/// Returns the final offsets and pass count, or the pass limit on failure.
fn settle(slots: &mut [Slot], ctx: &AssemblyContext) -> Result<(Vec<usize>, usize), usize> {
    let limit = ctx.config.max_passes.unwrap_or(slots.len().max(1));
    let mut passes = 0;
    loop {
        passes += 1;
        if passes > limit {
            return Err(limit);
        }
        let offsets = layout(slots);
        let mut promoted = 0usize;
        for (i, slot) in slots.iter_mut().enumerate() {
            let (Some(desc), Some(target)) = (slot.desc, slot.target) else {
                continue;
            };
            if !slot.promotable || desc.branch.is_long() {
                continue;
            }
            let dist = distance(slot, i, &target, &offsets);
            if SHORT_RANGE.contains(&dist) {
                continue;
            }
            if let Some(long) = desc.long_variant() {
                trace!(index = i, from = desc.mnemonic, to = long.mnemonic, dist, "promote");
                slot.desc = Some(long);
                slot.len += 1;
                promoted += 1;
            }
        }
        debug!(script = ctx.script, pass = passes, promoted, "layout pass");
        if promoted == 0 {
            return Ok((offsets, passes));
        }
    }
}

fn check_reach(
    script: &Script,
    slots: &[Slot],
    offsets: &[usize],
    ctx: &AssemblyContext,
    diags: &mut Vec<Diagnostic>,
) {
    for (i, slot) in slots.iter().enumerate() {
        let (Some(desc), Some(target)) = (slot.desc, slot.target) else {
            continue;
        };
        if !slot.promotable || desc.branch.is_long() {
            continue;
        }
        if !SHORT_RANGE.contains(&distance(slot, i, &target, offsets)) {
            diags.push(ctx.diagnostic(
                i,
                DiagnosticKind::UnreachableLabel {
                    name: label_name(script, target.label),
                    reason: UnreachableReason::RequiresLongVariantUnavailable,
                },
            ));
        }
    }
}

fn check_size(offsets: &[usize], ctx: &AssemblyContext, diags: &mut Vec<Diagnostic>) {
    let total = offsets.last().copied().unwrap_or(0);
    if total <= MAX_SCRIPT_LEN {
        return;
    }
    // blame the first instruction that crosses the limit
    let index = offsets
        .windows(2)
        .position(|w| w[1] > MAX_SCRIPT_LEN)
        .unwrap_or(0);
    diags.push(ctx.diagnostic(index, DiagnosticKind::ScriptTooLarge { actual: total }));
}

fn emit(
    script: &Script,
    slots: &[Slot],
    offsets: &[usize],
    ctx: &AssemblyContext,
) -> Result<(Vec<u8>, Vec<Instruction>), Vec<Diagnostic>> {
    let total = offsets.last().copied().unwrap_or(0);
    let mut out = Vec::with_capacity(total);
    let mut resolved = Vec::with_capacity(slots.len());
    for (i, (slot, ins)) in slots.iter().zip(script.instructions()).enumerate() {
        let Some(desc) = slot.desc else {
            return Err(vec![ctx.diagnostic(i, DiagnosticKind::UnknownOpcode { opcode: ins.opcode })]);
        };
        let mut operands = ins.operands.clone();
        if let (Some(target), Some(n)) = (slot.target, desc.branch_operand()) {
            let value = if desc.branch.is_long() {
                offsets[target.at] as i64
            } else {
                distance(slot, i, &target, offsets)
            };
            operands[n] = OperandValue::ResolvedOffset(value as i32);
        }
        let ins = Instruction::new(desc.id, operands);
        ins.encode(&mut out).map_err(|e| {
            vec![ctx.diagnostic(
                i,
                DiagnosticKind::InvalidOperand {
                    operand: 0,
                    reason: e.to_string(),
                },
            )]
        })?;
        resolved.push(ins);
    }
    Ok((out, resolved))
}
