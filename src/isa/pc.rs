//! Opcode catalog of the PC release of the field-script instruction set.
//!
//! One slot per opcode id. Empty slots are ids the engine never assigned;
//! the disassembler reports them as unknown.

use crate::opcodes::{BranchKind, OpcodeDesc, OpcodeFlags, OperandShape};

const U8: OperandShape = OperandShape::UInt8;
const I16: OperandShape = OperandShape::Int16;
const U16: OperandShape = OperandShape::UInt16;
const V8: OperandShape = OperandShape::VarRef8;
const V16: OperandShape = OperandShape::VarRef16;
const BK: OperandShape = OperandShape::BankAddress;
const SB: OperandShape = OperandShape::ShortBranchOffset;
const LB: OperandShape = OperandShape::LongBranchOffset;
const U32: OperandShape = OperandShape::UInt32;
const BLK: OperandShape = OperandShape::SizedBlock;
const CNT: OperandShape = OperandShape::CountedBlock;

const fn op(id: u8, mnemonic: &'static str, operands: &'static [OperandShape]) -> Option<OpcodeDesc> {
    Some(OpcodeDesc::new(id, mnemonic, operands))
}

const fn call(id: u8, mnemonic: &'static str) -> Option<OpcodeDesc> {
    Some(OpcodeDesc::new(id, mnemonic, &[U8, U8]).branch(BranchKind::Call, None).flags(OpcodeFlags::EXEC))
}

const fn br(
    id: u8,
    mnemonic: &'static str,
    operands: &'static [OperandShape],
    kind: BranchKind,
    variant: Option<u8>,
) -> Option<OpcodeDesc> {
    Some(OpcodeDesc::new(id, mnemonic, operands).branch(kind, variant))
}

const fn text(id: u8, mnemonic: &'static str, operands: &'static [OperandShape]) -> Option<OpcodeDesc> {
    Some(OpcodeDesc::new(id, mnemonic, operands).flags(OpcodeFlags::TEXT))
}

use BranchKind::{
    ConditionalLong as CL, ConditionalShort as CS, UnconditionalBackwardLong as BWL,
    UnconditionalBackwardShort as BWS, UnconditionalForwardLong as FWL,
    UnconditionalForwardShort as FWS,
};

pub static CATALOG: [Option<OpcodeDesc>; 256] = [
    // 0x00
    Some(OpcodeDesc::new(0x00, "RET", &[]).branch(BranchKind::Return, None)),
    call(0x01, "REQ"),
    call(0x02, "REQSW"),
    call(0x03, "REQEW"),
    call(0x04, "PREQ"),
    call(0x05, "PRQSW"),
    call(0x06, "PRQEW"),
    Some(OpcodeDesc::new(0x07, "RETTO", &[U8]).branch(BranchKind::Return, None)),
    op(0x08, "JOIN", &[U8]),
    op(0x09, "SPLIT", &[BK, BK, BK, I16, I16, U8, I16, I16, U8, U8]),
    op(0x0A, "SPTYE", &[BK, BK, V8, V8, V8]),
    op(0x0B, "GTPYE", &[BK, BK, V8, V8, V8]),
    None,
    None,
    op(0x0E, "DSKCG", &[U8]),
    // TODO: SPECIAL dispatches on its first byte and several sub-ops carry extra operands.
    op(0x0F, "SPECIAL", &[U8]),
    // 0x10
    br(0x10, "JMPF", &[SB], FWS, Some(0x11)),
    br(0x11, "JMPFL", &[LB], FWL, Some(0x10)),
    br(0x12, "JMPB", &[SB], BWS, Some(0x13)),
    br(0x13, "JMPBL", &[LB], BWL, Some(0x12)),
    br(0x14, "IFUB", &[BK, V8, V8, U8, SB], CS, Some(0x15)),
    br(0x15, "IFUBL", &[BK, V8, V8, U8, LB], CL, Some(0x14)),
    br(0x16, "IFSW", &[BK, V16, V16, U8, SB], CS, Some(0x17)),
    br(0x17, "IFSWL", &[BK, V16, V16, U8, LB], CL, Some(0x16)),
    br(0x18, "IFUW", &[BK, V16, V16, U8, SB], CS, Some(0x19)),
    br(0x19, "IFUWL", &[BK, V16, V16, U8, LB], CL, Some(0x18)),
    op(0x1A, "UNUSED1A", &[U8, U8, U8, U8, U8, U8, U8, U8, U8]),
    op(0x1B, "UNUSED1B", &[U8, U8]),
    op(0x1C, "UNUSED1C", &[U32, CNT]),
    None,
    None,
    None,
    // 0x20
    Some(OpcodeDesc::new(0x20, "MINIGAME", &[U16, I16, I16, U16, U8, U8]).flags(OpcodeFlags::MAP_JUMP)),
    op(0x21, "TUTOR", &[U8]),
    op(0x22, "BTMD2", &[U8, U8, U8, U8]),
    op(0x23, "BTRLD", &[BK, V8]),
    op(0x24, "WAIT", &[U16]),
    op(0x25, "NFADE", &[BK, BK, U8, V8, V8, V8, U8, U8]),
    op(0x26, "BLINK", &[U8]),
    op(0x27, "BGMOVIE", &[U8]),
    op(0x28, "KAWAI", &[BLK]),
    op(0x29, "KAWIW", &[]),
    op(0x2A, "PMOVA", &[U8]),
    op(0x2B, "SLIP", &[U8]),
    op(0x2C, "BGPDH", &[BK, U8, I16]),
    op(0x2D, "BGSCR", &[BK, U8, I16, I16]),
    op(0x2E, "WCLS", &[U8]),
    op(0x2F, "WSIZW", &[U8, U16, U16, U16, U16]),
    // 0x30
    br(0x30, "IFKEY", &[U16, SB], CS, None),
    br(0x31, "IFKEYON", &[U16, SB], CS, None),
    br(0x32, "IFKEYOFF", &[U16, SB], CS, None),
    op(0x33, "UC", &[U8]),
    op(0x34, "PDIRA", &[U8]),
    op(0x35, "PTURA", &[U8, U8, U8]),
    op(0x36, "WSPCL", &[U8, U8, U8, U8]),
    op(0x37, "WNUMB", &[BK, U8, V16, V16, U8]),
    op(0x38, "STTIM", &[BK, BK, V8, V8, V8]),
    op(0x39, "GOLDu", &[BK, V16, V16]),
    op(0x3A, "GOLDd", &[BK, V16, V16]),
    op(0x3B, "CHGLD", &[BK, V8, V8]),
    op(0x3C, "HMPMAX1", &[]),
    op(0x3D, "HMPMAX2", &[]),
    op(0x3E, "MHMMX", &[]),
    op(0x3F, "HMPMAX3", &[]),
    // 0x40
    text(0x40, "MESSAGE", &[U8, U8]),
    op(0x41, "MPARA", &[BK, U8, U8, V8]),
    op(0x42, "MPRA2", &[BK, U8, U8, V16]),
    op(0x43, "MPNAM", &[U8]),
    None,
    op(0x45, "MPu", &[BK, V8, V16]),
    None,
    op(0x47, "MPd", &[BK, V8, V16]),
    text(0x48, "ASK", &[BK, U8, U8, U8, U8, V8]),
    op(0x49, "MENU", &[BK, U8, V8]),
    op(0x4A, "MENU2", &[U8]),
    op(0x4B, "BTLTB", &[U8]),
    None,
    op(0x4D, "HPu", &[BK, U8, V16]),
    None,
    op(0x4F, "HPd", &[BK, U8, V16]),
    // 0x50
    op(0x50, "WINDOW", &[U8, U16, U16, U16, U16]),
    op(0x51, "WMOVE", &[U8, I16, I16]),
    op(0x52, "WMODE", &[U8, U8, U8]),
    op(0x53, "WREST", &[U8]),
    op(0x54, "WCLSE", &[U8]),
    op(0x55, "WROW", &[U8, U8]),
    op(0x56, "GWCOL", &[BK, BK, U8, V8, V8, V8]),
    op(0x57, "SWCOL", &[BK, BK, U8, V8, V8, V8]),
    op(0x58, "STITM", &[BK, V16, V8]),
    op(0x59, "DLITM", &[BK, V16, V8]),
    op(0x5A, "CKITM", &[BK, V16, V8]),
    op(0x5B, "SMTRA", &[BK, BK, V8, V8, V8, V8]),
    op(0x5C, "DMTRA", &[BK, BK, V8, V8, V8, V8, U8]),
    op(0x5D, "CMTRA", &[BK, BK, BK, V8, V8, V8, V8, V8, V8]),
    op(0x5E, "SHAKE", &[U8, U8, U8, U8, U8, U8, U8]),
    op(0x5F, "NOP", &[]),
    // 0x60
    Some(OpcodeDesc::new(0x60, "MAPJUMP", &[U16, I16, I16, U16, U8]).flags(OpcodeFlags::MAP_JUMP)),
    op(0x61, "SCRLO", &[U8]),
    op(0x62, "SCRLC", &[BK, V16, U8]),
    op(0x63, "SCRLA", &[BK, V16, U8, U8]),
    op(0x64, "SCR2D", &[BK, V16, V16]),
    op(0x65, "SCRCC", &[]),
    op(0x66, "SCR2DC", &[BK, BK, V16, V16, V16]),
    op(0x67, "SCRLW", &[]),
    op(0x68, "SCR2DL", &[BK, BK, V16, V16, V16]),
    op(0x69, "MPDSP", &[U8]),
    op(0x6A, "VWOFT", &[BK, V16, V16, U8]),
    op(0x6B, "FADE", &[BK, BK, V8, V8, V8, U8, U8, U8]),
    op(0x6C, "FADEW", &[]),
    op(0x6D, "IDLCK", &[U16, U8]),
    op(0x6E, "LSTMP", &[BK, V8]),
    op(0x6F, "SCRLP", &[BK, V16, U8, U8]),
    // 0x70
    op(0x70, "BATTLE", &[BK, V16]),
    op(0x71, "BTLON", &[U8]),
    op(0x72, "BTLMD", &[U16]),
    op(0x73, "PGTDR", &[BK, U8, V8]),
    op(0x74, "GETPC", &[BK, U8, V8]),
    op(0x75, "PXYZI", &[BK, BK, U8, V8, V8, V8, V8]),
    op(0x76, "PLUS!", &[BK, V8, V8]),
    op(0x77, "PLUS2!", &[BK, V8, V16]),
    op(0x78, "MINUS!", &[BK, V8, V8]),
    op(0x79, "MINUS2!", &[BK, V8, V16]),
    op(0x7A, "INC!", &[BK, V8]),
    op(0x7B, "INC2!", &[BK, V8]),
    op(0x7C, "DEC!", &[BK, V8]),
    op(0x7D, "DEC2!", &[BK, V8]),
    op(0x7E, "TLKON", &[U8]),
    op(0x7F, "RDMSD", &[BK, V8]),
    // 0x80
    op(0x80, "SETBYTE", &[BK, V8, V8]),
    op(0x81, "SETWORD", &[BK, V8, V16]),
    op(0x82, "BITON", &[BK, V8, V8]),
    op(0x83, "BITOFF", &[BK, V8, V8]),
    op(0x84, "BITXOR", &[BK, V8, V8]),
    op(0x85, "PLUS", &[BK, V8, V8]),
    op(0x86, "PLUS2", &[BK, V8, V16]),
    op(0x87, "MINUS", &[BK, V8, V8]),
    op(0x88, "MINUS2", &[BK, V8, V16]),
    op(0x89, "MUL", &[BK, V8, V8]),
    op(0x8A, "MUL2", &[BK, V8, V16]),
    op(0x8B, "DIV", &[BK, V8, V8]),
    op(0x8C, "DIV2", &[BK, V8, V16]),
    op(0x8D, "MOD", &[BK, V8, V8]),
    op(0x8E, "MOD2", &[BK, V8, V16]),
    op(0x8F, "AND", &[BK, V8, V8]),
    // 0x90
    op(0x90, "AND2", &[BK, V8, V16]),
    op(0x91, "OR", &[BK, V8, V8]),
    op(0x92, "OR2", &[BK, V8, V16]),
    op(0x93, "XOR", &[BK, V8, V8]),
    op(0x94, "XOR2", &[BK, V8, V16]),
    op(0x95, "INC", &[BK, V8]),
    op(0x96, "INC2", &[BK, V8]),
    op(0x97, "DEC", &[BK, V8]),
    op(0x98, "DEC2", &[BK, V8]),
    op(0x99, "RANDOM", &[BK, V8]),
    op(0x9A, "LBYTE", &[BK, V8, V8]),
    op(0x9B, "HBYTE", &[BK, V8, V16]),
    op(0x9C, "2BYTE", &[BK, BK, V8, V8, V8]),
    op(0x9D, "SETX", &[U8, U8, U8, U8, U8, U8]),
    op(0x9E, "GETX", &[U8, U8, U8, U8, U8, U8]),
    op(0x9F, "SEARCHX", &[BK, BK, BK, U8, V16, V16, V8, V8]),
    // 0xA0
    op(0xA0, "PC", &[U8]),
    op(0xA1, "CHAR", &[U8]),
    op(0xA2, "DFANM", &[U8, U8]),
    op(0xA3, "ANIME1", &[U8, U8]),
    op(0xA4, "VISI", &[U8]),
    op(0xA5, "XYZI", &[BK, BK, V16, V16, V16, V16]),
    op(0xA6, "XYI", &[BK, BK, V16, V16, V16]),
    op(0xA7, "XYZ", &[BK, BK, V16, V16, V16]),
    op(0xA8, "MOVE", &[BK, V16, V16]),
    op(0xA9, "CMOVE", &[BK, V16, V16]),
    op(0xAA, "MOVA", &[U8]),
    op(0xAB, "TURA", &[U8, U8, U8]),
    op(0xAC, "ANIMW", &[]),
    op(0xAD, "FMOVE", &[BK, V16, V16]),
    op(0xAE, "ANIME2", &[U8, U8]),
    op(0xAF, "ANIM!1", &[U8, U8]),
    // 0xB0
    op(0xB0, "CANIM1", &[U8, U8, U8, U8]),
    op(0xB1, "CANM!1", &[U8, U8, U8, U8]),
    op(0xB2, "MSPED", &[BK, V16]),
    op(0xB3, "DIR", &[BK, V8]),
    op(0xB4, "TURNGEN", &[BK, V8, U8, U8, U8]),
    op(0xB5, "TURN", &[BK, V8, U8, U8, U8]),
    op(0xB6, "DIRA", &[U8]),
    op(0xB7, "GETDIR", &[BK, U8, V8]),
    op(0xB8, "GETAXY", &[BK, U8, V8, V8]),
    op(0xB9, "GETAI", &[BK, U8, V8]),
    op(0xBA, "ANIM!2", &[U8, U8]),
    op(0xBB, "CANIM2", &[U8, U8, U8, U8]),
    op(0xBC, "CANM!2", &[U8, U8, U8, U8]),
    op(0xBD, "ASPED", &[BK, V16]),
    None,
    op(0xBF, "CC", &[U8]),
    // 0xC0
    op(0xC0, "JUMP", &[BK, BK, V16, V16, V16, V16]),
    op(0xC1, "AXYZI", &[BK, BK, U8, V8, V8, V8, V8]),
    op(0xC2, "LADER", &[BK, BK, V16, V16, V16, V16, U8, U8, U8, U8]),
    op(0xC3, "OFST", &[BK, BK, U8, V16, V16, V16, V16]),
    op(0xC4, "OFSTW", &[]),
    op(0xC5, "TALKR", &[BK, V8]),
    op(0xC6, "SLIDR", &[BK, V8]),
    op(0xC7, "SOLID", &[U8]),
    op(0xC8, "PRTYP", &[U8]),
    op(0xC9, "PRTYM", &[U8]),
    op(0xCA, "PRTYE", &[U8, U8, U8]),
    br(0xCB, "IFPRTYQ", &[U8, SB], CS, None),
    br(0xCC, "IFMEMBQ", &[U8, SB], CS, None),
    op(0xCD, "MMBud", &[U8, U8]),
    op(0xCE, "MMBLK", &[U8]),
    op(0xCF, "MMBUK", &[U8]),
    // 0xD0
    op(0xD0, "LINE", &[I16, I16, I16, I16, I16, I16]),
    op(0xD1, "LINON", &[U8]),
    op(0xD2, "MPJPO", &[U8]),
    op(0xD3, "SLINE", &[BK, BK, BK, V16, V16, V16, V16, V16, V16]),
    op(0xD4, "SIN", &[BK, BK, V16, V16, V16, V8]),
    op(0xD5, "COS", &[BK, BK, V16, V16, V16, V8]),
    op(0xD6, "TLKR2", &[BK, V16]),
    op(0xD7, "SLDR2", &[BK, V16]),
    op(0xD8, "PMJMP", &[U16]),
    op(0xD9, "PMJMP2", &[]),
    op(0xDA, "AKAO2", &[BK, BK, BK, U8, V16, V16, V16, V16, V16]),
    op(0xDB, "FCFIX", &[U8]),
    op(0xDC, "CCANM", &[U8, U8, U8]),
    op(0xDD, "ANIMB", &[]),
    op(0xDE, "TURNW", &[]),
    op(0xDF, "MPPAL", &[U8, U8, U8, U8, U8, U8, U8, U8, U8, U8]),
    // 0xE0
    op(0xE0, "BGON", &[BK, V8, V8]),
    op(0xE1, "BGOFF", &[BK, V8, V8]),
    op(0xE2, "BGROL", &[BK, V8]),
    op(0xE3, "BGROL2", &[BK, V8]),
    op(0xE4, "BGCLR", &[BK, V8]),
    op(0xE5, "STPAL", &[BK, V8, V8, U8]),
    op(0xE6, "LDPAL", &[BK, V8, V8, U8]),
    op(0xE7, "CPPAL", &[BK, V8, V8, U8]),
    op(0xE8, "RTPAL", &[BK, BK, V8, V8, V8, U8]),
    op(0xE9, "ADPAL", &[BK, BK, BK, V8, V8, V8, V8, V8, V8]),
    op(0xEA, "MPPAL2", &[BK, BK, BK, V8, V8, V8, V8, V8, V8]),
    op(0xEB, "STPLS", &[U8, U8, U8, U8]),
    op(0xEC, "LDPLS", &[U8, U8, U8, U8]),
    op(0xED, "CPPAL2", &[U8, U8, U8, U8, U8, U8, U8]),
    op(0xEE, "RTPAL2", &[U8, U8, U8, U8, U8, U8, U8]),
    op(0xEF, "ADPAL2", &[U8, U8, U8, U8, U8, U8, U8, U8, U8, U8]),
    // 0xF0
    op(0xF0, "MUSIC", &[U8]),
    op(0xF1, "SOUND", &[BK, V16, V8]),
    op(0xF2, "AKAO", &[BK, BK, BK, U8, V8, V16, V16, V16, V16]),
    op(0xF3, "MUSVT", &[U8]),
    op(0xF4, "MUSVM", &[U8]),
    op(0xF5, "MULCK", &[U8]),
    op(0xF6, "BMUSC", &[U8]),
    op(0xF7, "CHMPH", &[U8, U8, U8]),
    op(0xF8, "PMVIE", &[U8]),
    op(0xF9, "MOVIE", &[]),
    op(0xFA, "MVIEF", &[BK, V8]),
    op(0xFB, "MVCAM", &[U8]),
    op(0xFC, "FMUSC", &[U8]),
    op(0xFD, "CMUSC", &[U8, U8, U8, U8, U8, U8, U8]),
    op(0xFE, "CHMST", &[BK, V8]),
    op(0xFF, "GAMEOVER", &[]),
];
