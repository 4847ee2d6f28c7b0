use num_traits::ToPrimitive;

use crate::instruction::OperandValue;
use crate::opcodes::{OperandShape, MAX_COUNTED_BLOCK};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OperandError {
    #[error("operand at {offset:#06x} needs {needed} byte(s), {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("value {value} does not fit a {shape:?} operand")]
    OutOfRange { shape: OperandShape, value: i64 },
    #[error("{shape:?} operand cannot hold {found}")]
    Mismatch {
        shape: OperandShape,
        found: &'static str,
    },
    #[error("block size {size} does not fit its header")]
    BadBlockSize { size: u8 },
    #[error("expected {expected} operand(s), found {found}")]
    Arity { expected: usize, found: usize },
    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
}

/// Read position over one script's bytes.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], OperandError> {
        if self.remaining() < n {
            return Err(OperandError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, OperandError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, OperandError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, OperandError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Decodes one operand, returning the value and the number of bytes consumed.
pub fn decode_operand(
    shape: OperandShape,
    cur: &mut Cursor<'_>,
) -> Result<(OperandValue, usize), OperandError> {
    let start = cur.pos();
    let value = match shape {
        OperandShape::UInt8 | OperandShape::VarRef8 | OperandShape::BankAddress => {
            OperandValue::Scalar(cur.read_u8()? as i64)
        }
        OperandShape::UInt16 | OperandShape::VarRef16 => {
            OperandValue::Scalar(cur.read_u16()? as i64)
        }
        OperandShape::Int16 => OperandValue::Scalar(cur.read_u16()? as i16 as i64),
        OperandShape::UInt32 => OperandValue::Scalar(cur.read_u32()? as i64),
        OperandShape::ShortBranchOffset => OperandValue::ResolvedOffset(cur.read_u8()? as i32),
        OperandShape::LongBranchOffset => OperandValue::ResolvedOffset(cur.read_u16()? as i32),
        OperandShape::SizedBlock => {
            let size = cur.read_u8()?;
            // size counts the opcode byte and itself
            let payload_len = (size as usize)
                .checked_sub(2)
                .ok_or(OperandError::BadBlockSize { size })?;
            OperandValue::Bytes(cur.take(payload_len)?.to_vec())
        }
        OperandShape::CountedBlock => {
            let size = cur.read_u8()?;
            if size as usize > MAX_COUNTED_BLOCK {
                return Err(OperandError::BadBlockSize { size });
            }
            OperandValue::Bytes(cur.take(size as usize)?.to_vec())
        }
    };
    Ok((value, cur.pos() - start))
}

/// Appends the encoding of `value` to `out`. Returns the number of bytes written.
pub fn encode_operand(
    shape: OperandShape,
    value: &OperandValue,
    out: &mut Vec<u8>,
) -> Result<usize, OperandError> {
    let before = out.len();
    match (shape, value) {
        (OperandShape::UInt8 | OperandShape::VarRef8 | OperandShape::BankAddress, OperandValue::Scalar(v)) => {
            out.push(v.to_u8().ok_or(OperandError::OutOfRange { shape, value: *v })?);
        }
        (OperandShape::UInt16 | OperandShape::VarRef16, OperandValue::Scalar(v)) => {
            let w = v.to_u16().ok_or(OperandError::OutOfRange { shape, value: *v })?;
            out.extend_from_slice(&w.to_le_bytes());
        }
        (OperandShape::UInt32, OperandValue::Scalar(v)) => {
            let w = v.to_u32().ok_or(OperandError::OutOfRange { shape, value: *v })?;
            out.extend_from_slice(&w.to_le_bytes());
        }
        (OperandShape::Int16, OperandValue::Scalar(v)) => {
            let w = v.to_i16().ok_or(OperandError::OutOfRange { shape, value: *v })?;
            out.extend_from_slice(&w.to_le_bytes());
        }
        (OperandShape::ShortBranchOffset, OperandValue::ResolvedOffset(v)) => {
            out.push(v.to_u8().ok_or(OperandError::OutOfRange { shape, value: *v as i64 })?);
        }
        (OperandShape::LongBranchOffset, OperandValue::ResolvedOffset(v)) => {
            let w = v.to_u16().ok_or(OperandError::OutOfRange { shape, value: *v as i64 })?;
            out.extend_from_slice(&w.to_le_bytes());
        }
        (OperandShape::SizedBlock, OperandValue::Bytes(payload)) => {
            let size = (payload.len() + 2).to_u8().ok_or(OperandError::OutOfRange {
                shape,
                value: payload.len() as i64 + 2,
            })?;
            out.push(size);
            out.extend_from_slice(payload);
        }
        (OperandShape::CountedBlock, OperandValue::Bytes(payload)) => {
            let size = (payload.len() <= MAX_COUNTED_BLOCK)
                .then(|| payload.len() as u8)
                .ok_or(OperandError::OutOfRange {
                    shape,
                    value: payload.len() as i64,
                })?;
            out.push(size);
            out.extend_from_slice(payload);
        }
        (shape, other) => {
            return Err(OperandError::Mismatch {
                shape,
                found: kind_name(other),
            })
        }
    }
    Ok(out.len() - before)
}

/// Checks that `value` is encodable as `shape` without producing bytes.
pub fn check_operand(shape: OperandShape, value: &OperandValue) -> Result<(), OperandError> {
    encode_operand(shape, value, &mut Vec::new()).map(|_| ())
}

/// Encoded width of `value` under `shape`, if the pairing is valid.
pub fn operand_len(shape: OperandShape, value: &OperandValue) -> Option<usize> {
    match (shape.width(), value) {
        (Some(w), _) => Some(w),
        (None, OperandValue::Bytes(payload)) => Some(payload.len() + 1),
        (None, _) => None,
    }
}

fn kind_name(value: &OperandValue) -> &'static str {
    match value {
        OperandValue::Scalar(_) => "a scalar",
        OperandValue::Symbolic(_) => "an unresolved label",
        OperandValue::ResolvedOffset(_) => "a branch offset",
        OperandValue::Bytes(_) => "a byte payload",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LabelId;
    use pretty_assertions::assert_eq;

    #[test]
    fn int16_is_twos_complement_le() {
        let mut out = Vec::new();
        encode_operand(OperandShape::Int16, &OperandValue::Scalar(-2), &mut out).unwrap();
        assert_eq!(out, vec![0xFE, 0xFF]);
        let mut cur = Cursor::new(&out);
        let (v, n) = decode_operand(OperandShape::Int16, &mut cur).unwrap();
        assert_eq!((v, n), (OperandValue::Scalar(-2), 2));
    }

    #[test]
    fn var_refs_pass_through() {
        let bytes = [0x34, 0x12];
        let mut cur = Cursor::new(&bytes);
        let (v, _) = decode_operand(OperandShape::VarRef16, &mut cur).unwrap();
        assert_eq!(v, OperandValue::Scalar(0x1234));
    }

    #[test]
    fn truncated_operand() {
        let bytes = [0x01];
        let mut cur = Cursor::new(&bytes);
        let err = decode_operand(OperandShape::UInt16, &mut cur).unwrap_err();
        assert_eq!(err, OperandError::Truncated { offset: 0, needed: 2, available: 1 });
    }

    #[test]
    fn out_of_range_scalars_are_rejected() {
        let mut out = Vec::new();
        assert!(encode_operand(OperandShape::UInt8, &OperandValue::Scalar(256), &mut out).is_err());
        assert!(encode_operand(OperandShape::UInt16, &OperandValue::Scalar(-1), &mut out).is_err());
        assert!(encode_operand(OperandShape::Int16, &OperandValue::Scalar(40_000), &mut out).is_err());
        assert!(encode_operand(OperandShape::ShortBranchOffset, &OperandValue::ResolvedOffset(300), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn labels_must_be_resolved_first() {
        let err = check_operand(OperandShape::ShortBranchOffset, &OperandValue::Symbolic(LabelId(0)))
            .unwrap_err();
        assert!(matches!(err, OperandError::Mismatch { .. }));
    }

    #[test]
    fn sized_block_counts_opcode_and_size_byte() {
        let mut out = Vec::new();
        let payload = OperandValue::Bytes(vec![0x10, 0x20, 0x30]);
        assert_eq!(encode_operand(OperandShape::SizedBlock, &payload, &mut out).unwrap(), 4);
        assert_eq!(out, vec![5, 0x10, 0x20, 0x30]);
        assert_eq!(operand_len(OperandShape::SizedBlock, &payload), Some(4));

        let mut cur = Cursor::new(&out);
        let (v, n) = decode_operand(OperandShape::SizedBlock, &mut cur).unwrap();
        assert_eq!((v, n), (payload, 4));
    }

    #[test]
    fn counted_block_counts_payload_only() {
        let mut out = Vec::new();
        let payload = OperandValue::Bytes(vec![0xAA, 0xBB]);
        assert_eq!(encode_operand(OperandShape::CountedBlock, &payload, &mut out).unwrap(), 3);
        assert_eq!(out, vec![2, 0xAA, 0xBB]);
        assert_eq!(operand_len(OperandShape::CountedBlock, &payload), Some(3));

        let too_big = OperandValue::Bytes(vec![0; 129]);
        assert!(check_operand(OperandShape::CountedBlock, &too_big).is_err());

        let bytes = [129u8];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(
            decode_operand(OperandShape::CountedBlock, &mut cur).unwrap_err(),
            OperandError::BadBlockSize { size: 129 }
        );
    }

    #[test]
    fn u32_is_little_endian() {
        let mut cur = Cursor::new(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(
            decode_operand(OperandShape::UInt32, &mut cur).unwrap(),
            (OperandValue::Scalar(0x1234_5678), 4)
        );
    }

    #[test]
    fn sized_block_rejects_tiny_size() {
        let bytes = [1u8];
        let mut cur = Cursor::new(&bytes);
        assert_eq!(
            decode_operand(OperandShape::SizedBlock, &mut cur).unwrap_err(),
            OperandError::BadBlockSize { size: 1 }
        );
    }
}
