use fieldscript_rs::{
    assemble, AssemblyContext, DiagnosticKind, Instruction, Script, UnreachableReason, MAX_SCRIPT_LEN,
};
use pretty_assertions::assert_eq;

fn ctx() -> AssemblyContext {
    AssemblyContext::standalone(0)
}

fn nops(s: &mut Script, n: usize) {
    for _ in 0..n {
        s.push(Instruction::nop());
    }
}

#[test]
fn far_jump_promotes_to_long_form() {
    // NOP, JMPF END, NOP x300, END:
    let mut s = Script::new(0);
    let end = s.add_label("END", None).unwrap();
    s.push(Instruction::nop());
    s.push(Instruction::jump(end));
    nops(&mut s, 300);
    s.place_label(end, Some(s.len())).unwrap();

    let asm = assemble(&s, &ctx()).unwrap();
    assert_eq!(asm.bytes.len(), 1 + 3 + 300);
    // JMPFL carries the absolute offset of END
    assert_eq!(&asm.bytes[1..4], &[0x11, 0x30, 0x01]);
    assert_eq!(asm.instructions[1].opcode, 0x11);
}

#[test]
fn far_conditional_promotes_to_long_form() {
    let mut s = Script::new(0);
    let end = s.add_label("END", None).unwrap();
    s.push(Instruction::nop());
    s.push(Instruction::branch(0x14, &[0x10, 3, 7, 0], end));
    nops(&mut s, 300);
    s.place_label(end, Some(s.len())).unwrap();

    let asm = assemble(&s, &ctx()).unwrap();
    assert_eq!(asm.bytes.len(), 1 + 7 + 300);
    assert_eq!(&asm.bytes[1..8], &[0x15, 0x10, 0x03, 0x07, 0x00, 0x34, 0x01]);
}

#[test]
fn short_form_is_kept_up_to_255() {
    let mut s = Script::new(0);
    let l = s.add_label("l", None).unwrap();
    s.push(Instruction::jump(l));
    nops(&mut s, 255);
    s.place_label(l, Some(s.len())).unwrap();
    let asm = assemble(&s, &ctx()).unwrap();
    assert_eq!(&asm.bytes[..2], &[0x10, 0xFF]);

    s.insert(1, Instruction::nop()).unwrap();
    let asm = assemble(&s, &ctx()).unwrap();
    assert_eq!(asm.bytes[0], 0x11);
}

#[test]
fn promotion_cascades_and_settles() {
    // J0 -> L sits right at the short limit until J1 grows
    let mut s = Script::new(0);
    let l = s.add_label("L", None).unwrap();
    let m = s.add_label("M", None).unwrap();
    s.push(Instruction::jump(l));
    s.push(Instruction::jump(m));
    nops(&mut s, 253);
    s.place_label(l, Some(s.len())).unwrap();
    nops(&mut s, 300);
    s.place_label(m, Some(s.len())).unwrap();

    let asm = assemble(&s, &ctx()).unwrap();
    assert_eq!(asm.passes, 3);
    assert!(asm.passes <= s.len());
    assert_eq!(&asm.bytes[..6], &[0x11, 0x03, 0x01, 0x11, 0x2F, 0x02]);
    assert_eq!(asm.bytes.len(), 559);
    assert_eq!(asm.offsets.last(), Some(&559));
}

#[test]
fn short_only_branch_out_of_reach() {
    // IFKEY has no long form
    let mut s = Script::new(0);
    let l = s.add_label("far", None).unwrap();
    s.push(Instruction::branch(0x30, &[0x0020], l));
    nops(&mut s, 300);
    s.place_label(l, Some(s.len())).unwrap();

    let errs = assemble(&s, &ctx()).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].instruction_index, 0);
    assert_eq!(
        errs[0].kind,
        DiagnosticKind::UnreachableLabel {
            name: "far".into(),
            reason: UnreachableReason::RequiresLongVariantUnavailable,
        }
    );
}

#[test]
fn conditional_branches_cannot_go_backward() {
    let mut s = Script::new(0);
    let top = s.mark("top");
    s.push(Instruction::nop());
    s.push(Instruction::branch(0x14, &[0, 1, 2, 0], top));
    let errs = assemble(&s, &ctx()).unwrap_err();
    assert_eq!(
        errs[0].kind,
        DiagnosticKind::UnreachableLabel {
            name: "top".into(),
            reason: UnreachableReason::BackwardReferenceUnsupported,
        }
    );
}

#[test]
fn size_ceiling_is_exactly_u16_max() {
    let mut s = Script::new(0);
    nops(&mut s, MAX_SCRIPT_LEN);
    assert_eq!(assemble(&s, &ctx()).unwrap().bytes.len(), 65_535);

    s.push(Instruction::nop());
    let errs = assemble(&s, &ctx()).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].kind, DiagnosticKind::ScriptTooLarge { actual: 65_536 });
    assert_eq!(errs[0].instruction_index, 65_535);
}

#[test]
fn label_errors_are_all_reported() {
    let mut s = Script::new(0);
    s.mark("A");
    s.push(Instruction::nop());
    s.mark("A");
    let ghost = s.add_label("ghost", None).unwrap();
    s.push(Instruction::jump(ghost));
    s.push(Instruction::ret());

    let errs = assemble(&s, &ctx()).unwrap_err();
    let kinds: Vec<DiagnosticKind> = errs.iter().map(|d| d.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::DuplicateLabel { name: "A".into() },
            DiagnosticKind::UndefinedLabel { name: "ghost".into() },
        ]
    );
    assert_eq!(errs[0].instruction_index, 1);
}

#[test]
fn pass_limit_override_reports_non_convergence() {
    let mut s = Script::new(0);
    let l = s.add_label("l", None).unwrap();
    s.push(Instruction::jump(l));
    nops(&mut s, 300);
    s.place_label(l, Some(s.len())).unwrap();
    let cfg = fieldscript_rs::AssemblerConfig {
        max_passes: Some(1),
        ..Default::default()
    };
    let errs = assemble(&s, &ctx().with_config(cfg)).unwrap_err();
    assert_eq!(errs.last().unwrap().kind, DiagnosticKind::AssemblyDidNotConverge { passes: 1 });
    assert!(errs.last().unwrap().kind.is_fatal());
}
