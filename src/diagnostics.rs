use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assembler::MAX_SCRIPT_LEN;
use crate::group::GroupId;
use crate::scene::SceneId;
use crate::script::ScriptId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnreachableReason {
    RequiresLongVariantUnavailable,
    BackwardReferenceUnsupported,
    ForwardReferenceUnsupported,
}

impl fmt::Display for UnreachableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreachableReason::RequiresLongVariantUnavailable => {
                f.write_str("it is more than 255 bytes away and this opcode has no long form")
            }
            UnreachableReason::BackwardReferenceUnsupported => {
                f.write_str("this opcode can only jump forward")
            }
            UnreachableReason::ForwardReferenceUnsupported => {
                f.write_str("this opcode can only jump backward")
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    #[error("label `{name}` is defined more than once")]
    DuplicateLabel { name: String },
    #[error("label `{name}` is not defined")]
    UndefinedLabel { name: String },
    #[error("label `{name}` is unreachable: {reason}")]
    UnreachableLabel {
        name: String,
        reason: UnreachableReason,
    },
    #[error("script is {actual} bytes long and exceeds {limit} bytes", limit = MAX_SCRIPT_LEN)]
    ScriptTooLarge { actual: usize },
    #[error("branch layout did not settle after {passes} passes")]
    AssemblyDidNotConverge { passes: usize },
    #[error("operand {operand}: {reason}")]
    InvalidOperand { operand: usize, reason: String },
    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
}

impl DiagnosticKind {
    /// Fatal kinds stop any further checking of the script.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiagnosticKind::AssemblyDidNotConverge { .. })
    }
}

/// A compile error bound to its scene/group/script/line locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub scene: SceneId,
    pub scene_name: String,
    pub group: GroupId,
    pub group_name: String,
    pub script: ScriptId,
    pub instruction_index: usize,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}), group {} ({}), script {}, line {}: {}",
            self.scene_name,
            self.scene,
            self.group_name,
            self.group,
            self.script,
            self.instruction_index,
            self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_format() {
        let d = Diagnostic {
            scene: 116,
            scene_name: "md1stin".into(),
            group: 3,
            group_name: "cloud".into(),
            script: 2,
            instruction_index: 14,
            kind: DiagnosticKind::UndefinedLabel { name: "END".into() },
        };
        assert_eq!(
            d.to_string(),
            "md1stin (116), group cloud (3), script 2, line 14: label `END` is not defined"
        );
    }

    #[test]
    fn size_message_names_the_limit() {
        let k = DiagnosticKind::ScriptTooLarge { actual: 70_000 };
        assert_eq!(k.to_string(), "script is 70000 bytes long and exceeds 65535 bytes");
        assert!(!k.is_fatal());
        assert!(DiagnosticKind::AssemblyDidNotConverge { passes: 3 }.is_fatal());
    }
}
