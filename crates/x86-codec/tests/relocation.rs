#![cfg(not(target_arch = "wasm32"))]
//! Relocation and block layout tests.
//!
//! Code is moved to a new address either byte-wise through
//! `copy_and_re_relativize` or instruction-wise through `Block`, and the
//! result is decoded again to confirm every relative reference still
//! resolves to the same absolute address.

use x86_codec::{
    copy_and_re_relativize, decode, Block, Condition, Context, DecodeIter, EncodeError,
    FixupKind, Instruction, Mode, Opcode, Operand, Register,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Absolute targets of every relative reference, in order.
fn targets(code: &[u8], pc: u64) -> Vec<u64> {
    DecodeIter::new(code, Context::x64(), pc)
        .map(|r| r.unwrap())
        .filter_map(|(at, insn)| {
            let next = at + insn.length().unwrap() as u64;
            match insn.branch_target() {
                Some(Operand::Pc(t)) => Some(*t),
                _ => insn.rip_rel_target(next),
            }
        })
        .collect()
}

/// Moves `code` from `from` to `to` one instruction at a time.
fn move_code(code: &[u8], from: u64, to: u64) -> Result<Vec<u8>, EncodeError> {
    let mut out = vec![0u8; code.len()];
    let mut at = 0;
    while at < code.len() {
        let n = copy_and_re_relativize(
            &code[at..],
            Context::x64(),
            from + at as u64,
            to + at as u64,
            &mut out[at..],
        )?;
        at += n;
    }
    Ok(out)
}

// ─── Byte-wise copies ─────────────────────────────────────────────────────────

#[test]
fn moved_function_keeps_its_references() {
    let code = [
        0x48, 0x8b, 0x05, 0xf9, 0x0f, 0x00, 0x00, // mov rax, [rip + 0xff9]
        0xff, 0xc0, // inc eax
        0xe8, 0xf2, 0xff, 0xff, 0xff, // call 0x1000
        0xc3, // ret
    ];
    let before = targets(&code, 0x1000);
    assert_eq!(before, [0x2000, 0x1000]);

    let moved = move_code(&code, 0x1000, 0x10_0000).unwrap();
    assert_ne!(moved, code);
    assert_eq!(targets(&moved, 0x10_0000), before);
    // Bytes without relative fields are untouched.
    assert_eq!(&moved[7..9], &code[7..9]);
    assert_eq!(moved[14], 0xc3);
}

#[test]
fn short_branch_cannot_follow_a_long_move() {
    let code = [0x74, 0x02, 0x90, 0x90];
    assert!(matches!(
        move_code(&code, 0x1000, 0x10_0000),
        Err(EncodeError::Unreachable { max: 127, .. })
    ));
}

#[test]
fn undecodable_bytes_are_reported() {
    let mut out = [0u8; 16];
    assert!(matches!(
        copy_and_re_relativize(&[0x0f], Context::x64(), 0, 0x100, &mut out),
        Err(EncodeError::InvalidOperand { .. })
    ));
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

#[test]
fn counted_loop_links_a_backward_branch() {
    let mut block = Block::new();
    block.push(Instruction::mov(Operand::Reg(Register::ECX), Operand::imm(10, 4)));
    let top = block.push(Instruction::with_operands(
        Opcode::Dec,
        &[Operand::Reg(Register::ECX)],
        &[Operand::Reg(Register::ECX)],
    ));
    block.push(Instruction::jcc_short(Condition::NZ, Operand::Instr(top)));
    block.push(Instruction::ret(Mode::X64));

    let linked = block.encode(Context::x64(), 0x40_0000).unwrap();
    assert_eq!(
        linked.bytes,
        [0xb9, 0x0a, 0x00, 0x00, 0x00, 0xff, 0xc9, 0x75, 0xfc, 0xc3]
    );
    assert_eq!(linked.addresses, [0x40_0000, 0x40_0005, 0x40_0007, 0x40_0009]);
    assert_eq!(linked.end, 0x40_000a);
    assert_eq!(linked.fixups.len(), 1);
    assert_eq!(linked.fixups[0].kind, FixupKind::Rel8);
    assert_eq!(linked.fixups[0].target, 0x40_0005);
}

#[test]
fn decoded_call_placed_in_a_block() {
    let (call, _) = decode(&[0xe8, 0x00, 0x00, 0x00, 0x00], Context::x64(), 0x1000).unwrap();
    let block: Block = vec![Instruction::nop(), call].into();
    let linked = block.encode(Context::x64(), 0x8000).unwrap();
    assert_eq!(linked.bytes, [0x90, 0xe8, 0xff, 0x8f, 0xff, 0xff]);
    assert_eq!(targets(&linked.bytes, 0x8000), [0x1005]);
}

#[test]
fn forward_references_resolve_after_layout() {
    // jz over a call to the final ret; every target is a block index.
    let mut block = Block::new();
    block.push(Instruction::jcc(Condition::Z, Operand::Instr(2)));
    block.push(Instruction::call(Mode::X64, Operand::Instr(2)));
    block.push(Instruction::ret(Mode::X64));

    let linked = block.encode(Context::x64(), 0x1000).unwrap();
    let ret = linked.address_of(2).unwrap();
    assert_eq!(ret, 0x100b);
    assert_eq!(targets(&linked.bytes, 0x1000), [ret, ret]);
}

#[test]
fn block_survives_editing() {
    let mut block: Block = [Instruction::jmp(Operand::Instr(2)), Instruction::nop(), Instruction::nop()]
        .into_iter()
        .collect();
    let first = block.encode(Context::x64(), 0).unwrap();
    assert_eq!(first.bytes, [0xe9, 0x01, 0x00, 0x00, 0x00, 0x90, 0x90]);

    // Retarget to the end of the block.
    assert!(block.get_mut(0).unwrap().set_src(0, Operand::Instr(3)));
    let second = block.encode(Context::x64(), 0).unwrap();
    assert_eq!(second.bytes, [0xe9, 0x02, 0x00, 0x00, 0x00, 0x90, 0x90]);
}
