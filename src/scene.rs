//! A scene: the named unit that owns object groups and compiles their scripts.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assembler::{AssemblerConfig, ByteBlob};
use crate::decoder::{disassemble_with_len, DecodeError};
use crate::diagnostics::Diagnostic;
use crate::group::{FinalizeError, Group, GroupError, GroupId, Invocation, Priority, ScriptOutcome};
use crate::script::ScriptId;

pub type SceneId = u16;

/// Name and id shown in diagnostic locators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: SceneId,
    pub name: String,
}

impl SceneInfo {
    pub fn new(id: SceneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error("group {group} script {script}: {source}")]
    Decode {
        group: GroupId,
        script: ScriptId,
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawScene")]
pub struct Scene {
    pub info: SceneInfo,
    pub(crate) groups: Vec<Group>,
    #[serde(default)]
    pub config: AssemblerConfig,
}

#[derive(Deserialize)]
struct RawScene {
    info: SceneInfo,
    groups: Vec<Group>,
    #[serde(default)]
    config: AssemblerConfig,
}

impl TryFrom<RawScene> for Scene {
    type Error = GroupError;

    fn try_from(raw: RawScene) -> Result<Self, Self::Error> {
        let mut scene = Scene {
            info: raw.info,
            groups: Vec::with_capacity(raw.groups.len()),
            config: raw.config,
        };
        for group in raw.groups {
            scene.add_group(group)?;
        }
        Ok(scene)
    }
}

/// Outcome of compiling every script of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileReport {
    pub outcomes: Vec<ScriptOutcome>,
}

impl CompileReport {
    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ScriptOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScriptOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Every diagnostic, in group/script order.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .flatten()
            .collect()
    }

    pub fn blob(&self, group: GroupId, script: ScriptId) -> Option<&ByteBlob> {
        self.outcomes
            .iter()
            .find(|o| o.group == group && o.script == script)
            .and_then(|o| o.result.as_ref().ok())
    }
}

impl Scene {
    pub fn new(id: SceneId, name: impl Into<String>) -> Self {
        Self {
            info: SceneInfo::new(id, name),
            groups: Vec::new(),
            config: AssemblerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn add_group(&mut self, group: Group) -> Result<(), GroupError> {
        if self.group(group.id).is_some() {
            return Err(GroupError::DuplicateGroupId(group.id));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn remove_group(&mut self, id: GroupId) -> Result<Group, GroupError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(GroupError::NoSuchGroup(id))?;
        Ok(self.groups.remove(pos))
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    fn require_group(&mut self, id: GroupId) -> Result<&mut Group, GroupError> {
        self.group_mut(id).ok_or(GroupError::NoSuchGroup(id))
    }

    /// Disassembles `len` bytes of a stored script into a new slot.
    pub fn load_script(
        &mut self,
        group: GroupId,
        script: ScriptId,
        bytes: &[u8],
        len: usize,
        priority: Priority,
        invocation: Invocation,
    ) -> Result<(), SceneError> {
        let decoded = disassemble_with_len(script, bytes, len).map_err(|source| SceneError::Decode {
            group,
            script,
            source,
        })?;
        debug!(group, script, instructions = decoded.len(), "loaded script");
        let g = self.require_group(group)?;
        g.add_script(decoded, priority, invocation)?;
        Ok(())
    }

    pub fn finalize(&mut self, group: GroupId, script: ScriptId) -> Result<ByteBlob, FinalizeError> {
        let config = self.config;
        let info = self.info.clone();
        self.require_group(group)?.finalize(&info, script, config)
    }

    /// Compiles every script of every group; failures are reported, never fatal.
    pub fn compile_all(&mut self) -> CompileReport {
        let config = self.config;
        let info = self.info.clone();
        let mut outcomes = Vec::new();
        for g in &mut self.groups {
            outcomes.extend(g.compile_all(&info, config));
        }
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(scene = info.id, failed, total = outcomes.len(), "scene compiled with errors");
        }
        CompileReport { outcomes }
    }
}
