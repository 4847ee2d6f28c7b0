//! Text listings back into scripts.
//!
//! One item per line: `name:` defines a label, anything else is
//! `MNEMONIC op, op, ...`. Branch slots take label names, sized blocks take
//! `[0a 01 ...]`, everything else is a number. `#` starts a comment line and
//! `;` ends the useful part of any line.

use anyhow::{anyhow, bail, Context, Result};

use fieldscript_rs::opcodes::{self, OperandShape};
use fieldscript_rs::{Instruction, OperandValue, Script, ScriptId};

use crate::model::parse_num;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Label(String),
    Instr { mnemonic: String, operands: Vec<String> },
}

pub fn parse_line(line: &str) -> Result<Option<Item>> {
    let ls = line.trim_start();
    if ls.starts_with('#') {
        return Ok(None);
    }
    let mut s = line;
    if let Some(p) = s.find(';') {
        s = &s[..p];
    }
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Some(name) = s.strip_suffix(':') {
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            bail!("bad label: {line}");
        }
        return Ok(Some(Item::Label(name.to_string())));
    }
    let (mnemonic, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
    let rest = rest.trim();
    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(|x| x.trim().to_string()).collect()
    };
    Ok(Some(Item::Instr {
        mnemonic: mnemonic.to_string(),
        operands,
    }))
}

fn parse_block(s: &str) -> Result<Vec<u8>> {
    let inner = s
        .strip_prefix('[')
        .and_then(|x| x.strip_suffix(']'))
        .ok_or_else(|| anyhow!("expected [..] byte block, got {s}"))?;
    inner
        .split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).map_err(|_| anyhow!("bad byte in block: {b}")))
        .collect()
}

/// Builds a script from a listing. Label problems (duplicates, undefined
/// names) are left for the assembler to report.
pub fn parse_listing(id: ScriptId, text: &str) -> Result<Script> {
    let mut script = Script::new(id);
    for (n, line) in text.lines().enumerate() {
        let lineno = n + 1;
        let Some(item) = parse_line(line).with_context(|| format!("line {lineno}"))? else {
            continue;
        };
        match item {
            Item::Label(name) => {
                let at = Some(script.len());
                let pending = script
                    .label_by_name(&name)
                    .filter(|l| script.label(*l).is_some_and(|l| l.defined_at.is_none()));
                match pending {
                    Some(l) => script.place_label(l, at)?,
                    None => {
                        script.add_label(name, at)?;
                    }
                }
            }
            Item::Instr { mnemonic, operands } => {
                let desc = opcodes::by_mnemonic(&mnemonic)
                    .ok_or_else(|| anyhow!("line {lineno}: unknown mnemonic {mnemonic}"))?;
                if operands.len() != desc.operands.len() {
                    bail!(
                        "line {lineno}: {} takes {} operand(s), found {}",
                        desc.mnemonic,
                        desc.operands.len(),
                        operands.len()
                    );
                }
                let mut values = Vec::with_capacity(operands.len());
                for (shape, text) in desc.operands.iter().zip(&operands) {
                    let value = match shape {
                        s if s.is_branch() => {
                            let label = match script.label_by_name(text) {
                                Some(l) => l,
                                None => script.add_label(text.as_str(), None)?,
                            };
                            OperandValue::Symbolic(label)
                        }
                        s if s.is_block() => {
                            OperandValue::Bytes(parse_block(text).with_context(|| format!("line {lineno}"))?)
                        }
                        _ => OperandValue::Scalar(
                            parse_num(text).ok_or_else(|| anyhow!("line {lineno}: bad number {text}"))?,
                        ),
                    };
                    values.push(value);
                }
                script.push(Instruction::new(desc.id, values));
            }
        }
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comments_and_labels() {
        assert_eq!(parse_line("  # note").unwrap(), None);
        assert_eq!(parse_line("; only a comment").unwrap(), None);
        assert_eq!(parse_line("loop:").unwrap(), Some(Item::Label("loop".into())));
        assert_eq!(
            parse_line("    WAIT 0x10 ; a frame").unwrap(),
            Some(Item::Instr {
                mnemonic: "WAIT".into(),
                operands: vec!["0x10".into()],
            })
        );
        assert!(parse_line("two words:").is_err());
    }

    #[test]
    fn forward_reference_is_placed_later() {
        let text = "    IFUB 0x10, 0x3, 0x7, 0x0, out\n    NOP\nout:\n    RET\n";
        let s = parse_listing(0, text).unwrap();
        assert_eq!(s.labels().len(), 1);
        assert_eq!(s.labels()[0].defined_at, Some(2));
        assert_eq!(s.instructions()[0].branch_target(), Some(s.labels()[0].id));
    }

    #[test]
    fn duplicate_definitions_survive_parsing() {
        let s = parse_listing(0, "a:\n    NOP\na:\n    RET\n").unwrap();
        assert_eq!(s.labels().len(), 2);
    }

    #[test]
    fn blocks_and_signed_operands() {
        let s = parse_listing(0, "    KAWAI [0a 01]\n    WMOVE 0x1, -16, 32\n").unwrap();
        assert_eq!(
            s.instructions()[0].operands,
            vec![OperandValue::Bytes(vec![0x0a, 0x01])]
        );
        assert_eq!(s.instructions()[1], Instruction::scalars(0x51, &[1, -16, 32]));
    }

    #[test]
    fn unknown_mnemonic_names_the_line() {
        let err = parse_listing(0, "    NOP\n    FROB 1\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
