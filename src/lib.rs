pub mod assembler;
pub mod decoder;
pub mod diagnostics;
pub mod disasm;
pub mod group;
pub mod instruction;
pub mod opcodes;
pub mod operand;
pub mod scene;
pub mod script;
pub mod search;

pub mod isa {
    pub mod pc; // PC release opcode catalog
}

pub use assembler::{assemble, AssemblerConfig, Assembly, AssemblyContext, ByteBlob, MAX_SCRIPT_LEN};
pub use decoder::{disassemble, disassemble_with_len, DecodeError};
pub use diagnostics::{Diagnostic, DiagnosticKind, UnreachableReason};
pub use group::{FinalizeError, Group, GroupError, GroupId, Invocation, Priority, ScriptOutcome};
pub use instruction::{Instruction, Label, LabelId, OperandValue};
pub use scene::{CompileReport, Scene, SceneError, SceneId, SceneInfo};
pub use script::{EditError, Script, ScriptId};
pub use search::{Location, Query};
