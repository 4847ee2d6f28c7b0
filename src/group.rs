use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::assembler::{assemble, AssemblerConfig, AssemblyContext, ByteBlob};
use crate::diagnostics::Diagnostic;
use crate::scene::SceneInfo;
use crate::script::{Script, ScriptId};

pub type GroupId = u8;

/// Script slots available to one scene object.
pub const MAX_GROUP_SCRIPTS: usize = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("group {group} already has a script {script}")]
    DuplicateScriptId { group: GroupId, script: ScriptId },
    #[error("group {group} has no script {script}")]
    NoSuchScript { group: GroupId, script: ScriptId },
    #[error("group {group} is full ({limit} scripts)", limit = MAX_GROUP_SCRIPTS)]
    GroupFull { group: GroupId },
    #[error("priority {0} is outside 1..=6")]
    InvalidPriority(u8),
    #[error("scene already has a group {0}")]
    DuplicateGroupId(GroupId),
    #[error("scene has no group {0}")]
    NoSuchGroup(GroupId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(1);
    pub const LOWEST: Priority = Priority(6);

    pub fn new(level: u8) -> Result<Self, GroupError> {
        if (1..=6).contains(&level) {
            Ok(Self(level))
        } else {
            Err(GroupError::InvalidPriority(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::HIGHEST
    }
}

impl TryFrom<u8> for Priority {
    type Error = GroupError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Priority::new(level)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}

/// How a caller waits on a requested script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Invocation {
    #[default]
    AsyncNoWait,
    AsyncWait,
    SyncWait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSlot {
    pub script: Script,
    pub priority: Priority,
    pub invocation: Invocation,
    /// Length of the last successful build, for the container's offset table.
    pub blob_len: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGroup")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    slots: Vec<ScriptSlot>,
}

/// Serialized form of a `Group`, checked slot by slot on the way in.
#[derive(Deserialize)]
struct RawGroup {
    id: GroupId,
    name: String,
    slots: Vec<ScriptSlot>,
}

impl TryFrom<RawGroup> for Group {
    type Error = GroupError;

    fn try_from(raw: RawGroup) -> Result<Self, Self::Error> {
        let mut group = Group::new(raw.id, raw.name);
        for slot in raw.slots {
            group.push_slot(slot)?;
        }
        Ok(group)
    }
}

/// Result of building one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub group: GroupId,
    pub script: ScriptId,
    pub result: Result<ByteBlob, Vec<Diagnostic>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("{} compile error(s)", .0.len())]
    Assembly(Vec<Diagnostic>),
}

impl FinalizeError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            FinalizeError::Assembly(d) => d,
            FinalizeError::Group(_) => &[],
        }
    }
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            slots: Vec::new(),
        }
    }

    pub fn slots(&self) -> &[ScriptSlot] {
        &self.slots
    }

    pub fn slot(&self, script: ScriptId) -> Option<&ScriptSlot> {
        self.slots.iter().find(|s| s.script.id == script)
    }

    fn slot_mut(&mut self, script: ScriptId) -> Result<&mut ScriptSlot, GroupError> {
        let group = self.id;
        self.slots
            .iter_mut()
            .find(|s| s.script.id == script)
            .ok_or(GroupError::NoSuchScript { group, script })
    }

    pub fn script(&self, script: ScriptId) -> Option<&Script> {
        self.slot(script).map(|s| &s.script)
    }

    /// Mutable access for editing; drops the recorded blob length.
    pub fn script_mut(&mut self, script: ScriptId) -> Option<&mut Script> {
        let slot = self.slot_mut(script).ok()?;
        slot.blob_len = None;
        Some(&mut slot.script)
    }

    pub fn add_script(
        &mut self,
        script: Script,
        priority: Priority,
        invocation: Invocation,
    ) -> Result<(), GroupError> {
        self.push_slot(ScriptSlot {
            script,
            priority,
            invocation,
            blob_len: None,
        })
    }

    fn push_slot(&mut self, slot: ScriptSlot) -> Result<(), GroupError> {
        if self.slot(slot.script.id).is_some() {
            return Err(GroupError::DuplicateScriptId {
                group: self.id,
                script: slot.script.id,
            });
        }
        if self.slots.len() >= MAX_GROUP_SCRIPTS {
            return Err(GroupError::GroupFull { group: self.id });
        }
        self.slots.push(slot);
        Ok(())
    }

    /// Clears a slot, handing back its script.
    pub fn remove_script(&mut self, script: ScriptId) -> Result<Script, GroupError> {
        let pos = self
            .slots
            .iter()
            .position(|s| s.script.id == script)
            .ok_or(GroupError::NoSuchScript {
                group: self.id,
                script,
            })?;
        Ok(self.slots.remove(pos).script)
    }

    pub fn set_priority(&mut self, script: ScriptId, level: u8) -> Result<(), GroupError> {
        let priority = Priority::new(level)?;
        self.slot_mut(script)?.priority = priority;
        Ok(())
    }

    pub fn set_invocation(&mut self, script: ScriptId, invocation: Invocation) -> Result<(), GroupError> {
        self.slot_mut(script)?.invocation = invocation;
        Ok(())
    }

    /// Assembles one script and records its length on success.
    pub fn finalize(
        &mut self,
        scene: &SceneInfo,
        script: ScriptId,
        config: AssemblerConfig,
    ) -> Result<ByteBlob, FinalizeError> {
        let ctx = AssemblyContext::new(scene, self.id, &self.name, script).with_config(config);
        let slot = self.slot_mut(script)?;
        match assemble(&slot.script, &ctx) {
            Ok(asm) => {
                slot.blob_len = Some(asm.bytes.len_u16());
                Ok(asm.bytes)
            }
            Err(diags) => {
                slot.blob_len = None;
                Err(FinalizeError::Assembly(diags))
            }
        }
    }

    /// Builds every script; one failure never stops the others.
    pub fn compile_all(&mut self, scene: &SceneInfo, config: AssemblerConfig) -> Vec<ScriptOutcome> {
        let ids: Vec<ScriptId> = self.slots.iter().map(|s| s.script.id).collect();
        let mut outcomes = Vec::with_capacity(ids.len());
        for script in ids {
            let result = match self.finalize(scene, script, config) {
                Ok(blob) => Ok(blob),
                Err(FinalizeError::Assembly(diags)) => {
                    warn!(group = self.id, script, errors = diags.len(), "script failed to compile");
                    Err(diags)
                }
                // ids were just read from the slots
                Err(FinalizeError::Group(_)) => continue,
            };
            outcomes.push(ScriptOutcome {
                group: self.id,
                script,
                result,
            });
        }
        outcomes
    }

    /// Recorded blob lengths, in slot order.
    pub fn blob_lengths(&self) -> Vec<(ScriptId, Option<u16>)> {
        self.slots
            .iter()
            .map(|s| (s.script.id, s.blob_len))
            .collect()
    }
}
