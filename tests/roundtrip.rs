use fieldscript_rs::disasm::listing;
use fieldscript_rs::{
    assemble, disassemble, disassemble_with_len, AssemblyContext, DecodeError, Instruction, OperandValue, Script,
};
use pretty_assertions::assert_eq;

// NOP; IFUB -> RET; KAWAI [0a 01]; MESSAGE 1, 9; JMPB -> start; RET
const SAMPLE: [u8; 17] = [
    0x5F, 0x14, 0x10, 0x03, 0x07, 0x00, 0x09, 0x28, 0x04, 0x0a, 0x01, 0x40, 0x01, 0x09, 0x12, 0x10,
    0x00,
];

#[test]
fn minimal_blob_reassembles_byte_for_byte() {
    let script = disassemble(0, &SAMPLE).unwrap();
    assert_eq!(script.len(), 6);
    assert_eq!(script.labels().len(), 2);
    assert_eq!(
        script.instructions()[2].operands,
        vec![OperandValue::Bytes(vec![0x0a, 0x01])]
    );

    let asm = assemble(&script, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(asm.bytes.as_bytes(), &SAMPLE);
    assert_eq!(asm.offsets, vec![0, 1, 7, 11, 14, 16, 17]);
}

#[test]
fn listing_names_labels_in_reference_order() {
    let script = disassemble(0, &SAMPLE).unwrap();
    assert_eq!(
        listing(&script),
        "label_2:\n    NOP\n    IFUB 0x10, 0x3, 0x7, 0x0, label_1\n    KAWAI [0a 01]\n    MESSAGE 0x1, 0x9\n    JMPB label_2\nlabel_1:\n    RET\n"
    );
}

#[test]
fn oversized_branches_are_equivalent_after_rebuild() {
    // JMPFL to the RET right after it, written long
    let bytes = [0x11, 0x03, 0x00, 0x00];
    let script = disassemble(0, &bytes).unwrap();
    let asm = assemble(&script, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(asm.bytes.as_bytes(), &[0x10, 0x00, 0x00]);

    let rebuilt = disassemble(0, asm.bytes.as_bytes()).unwrap();
    assert!(script.equivalent(&rebuilt));
}

#[test]
fn promoted_branches_survive_a_rebuild() {
    // top: NOP; IFUB -> end; JMPF -> end; NOP x300; JMPF -> top; end: RET
    let mut s = Script::new(0);
    let top = s.add_label("top", Some(0)).unwrap();
    let end = s.add_label("end", None).unwrap();
    s.push(Instruction::nop());
    s.push(Instruction::branch(0x14, &[0x10, 3, 7, 0], end));
    s.push(Instruction::jump(end));
    for _ in 0..300 {
        s.push(Instruction::nop());
    }
    s.push(Instruction::jump(top));
    s.place_label(end, Some(s.len())).unwrap();
    s.push(Instruction::ret());

    let asm = assemble(&s, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(asm.bytes.len(), 315);
    assert_eq!(&asm.bytes[1..8], &[0x15, 0x10, 0x03, 0x07, 0x00, 0x3A, 0x01]);
    assert_eq!(&asm.bytes[8..11], &[0x11, 0x3A, 0x01]);
    assert_eq!(&asm.bytes[311..315], &[0x13, 0x00, 0x00, 0x00]);

    let rebuilt = disassemble(0, asm.bytes.as_bytes()).unwrap();
    let opcodes: Vec<u8> = rebuilt
        .instructions()
        .iter()
        .map(|i| i.opcode)
        .filter(|op| *op != 0x5F)
        .collect();
    assert_eq!(opcodes, vec![0x15, 0x11, 0x13, 0x00]);
    assert!(s.equivalent(&rebuilt));

    let again = assemble(&rebuilt, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(again.bytes, asm.bytes);
}

#[test]
fn unused_1c_reassembles_byte_for_byte() {
    let bytes = [0x1C, 0x01, 0x02, 0x03, 0x04, 0x02, 0xAA, 0xBB, 0x00];
    let script = disassemble(0, &bytes).unwrap();
    let asm = assemble(&script, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(asm.bytes.as_bytes(), &bytes);
}

#[test]
fn branch_to_end_of_script() {
    // JMPF past the last instruction
    let script = disassemble(0, &[0x10, 0x01, 0x00]).unwrap();
    assert_eq!(script.labels()[0].defined_at, Some(2));
    let asm = assemble(&script, &AssemblyContext::standalone(0)).unwrap();
    assert_eq!(asm.bytes.as_bytes(), &[0x10, 0x01, 0x00]);
}

#[test]
fn decode_errors_carry_offsets() {
    assert_eq!(
        disassemble(0, &[0x5F, 0x10, 0x09]).unwrap_err(),
        DecodeError::MisalignedBranchTarget { offset: 1, target: 12 }
    );
    assert_eq!(
        disassemble_with_len(0, &[0x5F, 0x40, 0x01], 3).unwrap_err(),
        DecodeError::TruncatedInstruction { offset: 1 }
    );
    assert!(matches!(
        disassemble(0, &[0x28, 0x01]).unwrap_err(),
        DecodeError::MalformedOperand { offset: 0, .. }
    ));
}

#[test]
fn scripts_assemble_on_separate_threads() {
    let script = disassemble(0, &SAMPLE).unwrap();
    let expected = assemble(&script, &AssemblyContext::standalone(0)).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u8)
            .map(|id| {
                let mut copy = script.clone();
                copy.id = id;
                scope.spawn(move || assemble(&copy, &AssemblyContext::standalone(id)).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().bytes, expected.bytes);
        }
    });
}
