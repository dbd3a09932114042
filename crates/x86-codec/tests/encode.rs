#![cfg(not(target_arch = "wasm32"))]
//! Encoder integration tests.
//!
//! Instructions are built through the public constructors and compared
//! against known byte sequences, and decoded instructions are re-encoded
//! with their cached bytes dropped to check that the template search lands
//! on the same form.

use x86_codec::{
    decode, encode, encode_instruction, encode_to_vec, Context, EncodeError, FixupKind,
    Instruction, MemRef, Mode, Opcode, Operand, Prefixes, Register,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn reg(r: Register) -> Operand {
    Operand::Reg(r)
}

fn enc(insn: &Instruction, ctx: Context) -> Vec<u8> {
    encode_to_vec(insn, ctx, 0x1000).unwrap_or_else(|e| panic!("encode `{insn}`: {e}"))
}

/// Decode, forget the cached bytes, encode again at the same address.
fn reencode(bytes: &[u8], ctx: Context) -> Vec<u8> {
    let (mut insn, len) = decode(bytes, ctx, 0x1000)
        .unwrap_or_else(|e| panic!("decode {bytes:02x?}: {e}"));
    assert_eq!(len, bytes.len(), "length of {bytes:02x?}");
    insn.clear_raw();
    enc(&insn, ctx)
}

// ─── Immediates ───────────────────────────────────────────────────────────────

#[test]
fn immediate_width_selects_the_form() {
    let ctx = Context::x64();
    let short = Instruction::binary(Opcode::Add, reg(Register::EAX), Operand::imm(1, 1));
    assert_eq!(enc(&short, ctx), [0x83, 0xc0, 0x01]);
    let long = Instruction::binary(Opcode::Add, reg(Register::EAX), Operand::imm(0x1000, 4));
    assert_eq!(enc(&long, ctx), [0x05, 0x00, 0x10, 0x00, 0x00]);
}

#[test]
fn register_immediate_moves() {
    let ctx = Context::x64();
    let mov = Instruction::mov(reg(Register::EAX), Operand::imm(42, 4));
    assert_eq!(enc(&mov, ctx), [0xb8, 0x2a, 0x00, 0x00, 0x00]);
    let wide = Instruction::mov(reg(Register::RAX), Operand::imm(0x1122_3344_5566_7788, 8));
    assert_eq!(
        enc(&wide, ctx),
        [0x48, 0xb8, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
    );
}

#[test]
fn immediate_out_of_range_is_rejected() {
    let add = Instruction::binary(Opcode::Add, reg(Register::EAX), Operand::Imm { value: 300, size: 1 });
    assert!(matches!(
        encode_instruction(&add, Context::x64()),
        Err(EncodeError::NoMatchingTemplate { opcode: Opcode::Add })
    ));
}

// ─── Memory ───────────────────────────────────────────────────────────────────

#[test]
fn absolute_address_in_64_bit_mode_uses_a_sib() {
    let load = Instruction::mov(reg(Register::EAX), Operand::Mem(MemRef::absolute(0x1000, 4)));
    assert_eq!(enc(&load, Context::x64()), [0x8b, 0x04, 0x25, 0x00, 0x10, 0x00, 0x00]);
    // 32-bit mode has a direct disp32 form.
    assert_eq!(enc(&load, Context::x86()), [0x8b, 0x05, 0x00, 0x10, 0x00, 0x00]);
}

#[test]
fn absolute_offset_takes_the_accumulator_form() {
    let abs = Operand::Abs {
        addr: 0x1000,
        seg: None,
        size: 4,
    };
    let load = Instruction::mov(reg(Register::EAX), abs);
    let bytes = enc(&load, Context::x86());
    assert_eq!(bytes, [0xa1, 0x00, 0x10, 0x00, 0x00]);
    assert_eq!(decode(&bytes, Context::x86(), 0x1000).unwrap().0, load);

    // Only the accumulator has an offset form.
    let other = Instruction::mov(reg(Register::EBX), abs);
    assert!(matches!(
        encode_instruction(&other, Context::x86()),
        Err(EncodeError::NoMatchingTemplate { opcode: Opcode::Mov })
    ));
}

#[test]
fn rip_relative_displacement_is_kept() {
    let load = Instruction::mov(
        reg(Register::EAX),
        Operand::RipRel {
            disp: 0x1000,
            seg: None,
            size: 4,
        },
    );
    assert_eq!(enc(&load, Context::x64()), [0x8b, 0x05, 0x00, 0x10, 0x00, 0x00]);
}

#[test]
fn absolute_target_becomes_rip_relative() {
    let lea = Instruction::with_operands(
        Opcode::Lea,
        &[reg(Register::RAX)],
        &[Operand::RelAddr {
            target: 0x2000,
            seg: None,
            size: 0,
        }],
    );
    let bytes = enc(&lea, Context::x64());
    assert_eq!(&bytes[..3], &[0x48, 0x8d, 0x05]);
    let disp = i32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]);
    assert_eq!(0x1007 + i64::from(disp), 0x2000);
}

#[test]
fn stack_and_frame_bases() {
    let ctx = Context::x64();
    let rsp = MemRef::base_disp(Register::RSP, 0x10, 4).unwrap();
    assert_eq!(
        enc(&Instruction::mov(reg(Register::EAX), Operand::Mem(rsp)), ctx),
        [0x8b, 0x44, 0x24, 0x10]
    );
    let rbp = MemRef::base_disp(Register::RBP, 0, 4).unwrap();
    assert_eq!(
        enc(&Instruction::mov(reg(Register::EAX), Operand::Mem(rbp)), ctx),
        [0x8b, 0x45, 0x00]
    );
    let r13 = MemRef::base_disp(Register::R13, 0, 8).unwrap();
    assert_eq!(
        enc(&Instruction::mov(reg(Register::RAX), Operand::Mem(r13)), ctx),
        [0x49, 0x8b, 0x45, 0x00]
    );
}

// ─── Prefixes ─────────────────────────────────────────────────────────────────

#[test]
fn locked_memory_add() {
    let m = MemRef::base_disp(Register::RAX, 0, 4).unwrap();
    let add = Instruction::binary(Opcode::Add, Operand::Mem(m), reg(Register::ECX))
        .with_prefixes(Prefixes::LOCK);
    assert_eq!(enc(&add, Context::x64()), [0xf0, 0x01, 0x08]);
}

#[test]
fn elision_prefixes_reencode_in_order() {
    let ctx = Context::x64();
    for bytes in [&[0xf2, 0xf0, 0x01, 0x08][..], &[0xf3, 0x87, 0x08]] {
        assert_eq!(reencode(bytes, ctx), bytes);
    }
}

// ─── Modes ────────────────────────────────────────────────────────────────────

#[test]
fn stack_operations_follow_the_mode() {
    assert_eq!(enc(&Instruction::push(Mode::X86, Register::EBP), Context::x86()), [0x55]);
    assert_eq!(enc(&Instruction::pop(Mode::X64, Register::R15), Context::x64()), [0x41, 0x5f]);
    assert_eq!(enc(&Instruction::ret(Mode::X64), Context::x64()), [0xc3]);
}

#[test]
fn call_displacement_from_the_next_instruction() {
    let call = Instruction::call(Mode::X64, Operand::Pc(0x1000));
    assert_eq!(enc(&call, Context::x64()), [0xe8, 0xfb, 0xff, 0xff, 0xff]);
}

// ─── Vector encodings ─────────────────────────────────────────────────────────

#[test]
fn vector_forms_reencode_identically() {
    let ctx = Context::x64();
    let cases: &[&[u8]] = &[
        // vzeroupper
        &[0xc5, 0xf8, 0x77],
        // andn eax, ecx, edx
        &[0xc4, 0xe2, 0x70, 0xf2, 0xc2],
        // movss xmm0, xmm1
        &[0xf3, 0x0f, 0x10, 0xc1],
        // vaddps zmm1, zmm2, [rax + 0x40]
        &[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01],
        // vaddps zmm1{k1}, zmm2, [rax]{1to16}
        &[0x62, 0xf1, 0x6c, 0x59, 0x58, 0x08],
        // vaddps zmm1, zmm2, zmm3, {rz-sae}
        &[0x62, 0xf1, 0x6c, 0x78, 0x58, 0xcb],
        // pfadd mm0, mm1
        &[0x0f, 0x0f, 0xc1, 0x9e],
    ];
    for &bytes in cases {
        assert_eq!(reencode(bytes, ctx), bytes, "{bytes:02x?}");
    }
}

// ─── Fixups and output ────────────────────────────────────────────────────────

#[test]
fn address_fixup_is_reported() {
    let jmp = Instruction::jmp(Operand::Pc(0x5000));
    let e = encode_instruction(&jmp, Context::x64()).unwrap();
    assert_eq!(e.len(), 5);
    let fixup = e.fixup.unwrap();
    assert_eq!((fixup.offset, fixup.kind), (1, FixupKind::Rel32));

    let mut out = [0u8; 8];
    assert_eq!(e.write_at(Context::x64(), 0x4000, &mut out), Ok(5));
    assert_eq!(&out[..5], &[0xe9, 0xfb, 0x0f, 0x00, 0x00]);
}

#[test]
fn encode_writes_into_a_caller_buffer() {
    let mut out = [0u8; 16];
    let n = encode(&Instruction::nop(), Context::x64(), 0, &mut out).unwrap();
    assert_eq!(&out[..n], &[0x90]);
}

#[test]
fn cached_bytes_are_copied_when_unchanged() {
    // Two-byte nop with a redundant operand-size prefix.
    let bytes = [0x66, 0x90];
    let (insn, _) = decode(&bytes, Context::x64(), 0x1000).unwrap();
    assert_eq!(enc(&insn, Context::x64()), bytes);
}

#[test]
fn modifying_an_operand_drops_the_cache() {
    let (mut insn, _) = decode(&[0x48, 0x89, 0xc8], Context::x64(), 0x1000).unwrap();
    assert!(insn.raw().is_some());
    assert!(insn.set_src(0, reg(Register::RDX)));
    assert!(insn.raw().is_none());
    assert_eq!(enc(&insn, Context::x64()), [0x48, 0x89, 0xd0]);
}
