#![cfg(not(target_arch = "wasm32"))]
//! Cross-validation tests against iced-x86.
//!
//! Our decoder and iced-x86 must agree on the length and mnemonic of every
//! instruction in the corpus, and every instruction our encoder emits must
//! be decoded by iced-x86 to the expected mnemonic and register operands.
//! iced-x86 is an independent, widely used decoder, so agreement here
//! catches table mistakes that self-consistency tests cannot.

use iced_x86::{
    Decoder, DecoderOptions, Formatter, IntelFormatter, Mnemonic as IcedMnemonic,
    Register as IcedRegister,
};
use x86_codec::{
    decode, encode_to_vec, Context, Instruction, MemRef, Mode, Opcode, Operand, Register,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Decode one instruction with iced-x86 and check it consumed all of `bytes`.
fn iced_decode(bitness: u32, bytes: &[u8]) -> iced_x86::Instruction {
    let mut decoder = Decoder::with_ip(bitness, bytes, 0x1000, DecoderOptions::NONE);
    let instr = decoder.decode();
    assert_ne!(
        instr.mnemonic(),
        IcedMnemonic::INVALID,
        "iced-x86 decoded INVALID for {bytes:02X?}"
    );
    assert_eq!(
        instr.len(),
        bytes.len(),
        "iced-x86 decoded {} bytes of {bytes:02X?}",
        instr.len()
    );
    instr
}

fn iced_text(instr: &iced_x86::Instruction) -> String {
    let mut formatter = IntelFormatter::new();
    let mut output = String::new();
    formatter.format(instr, &mut output);
    output
}

fn iced_name(instr: &iced_x86::Instruction) -> String {
    format!("{:?}", instr.mnemonic()).to_lowercase()
}

fn reg(r: Register) -> Operand {
    Operand::Reg(r)
}

// ─── Decoder agreement ────────────────────────────────────────────────────────

/// Instructions whose mnemonic is spelled the same way by both decoders.
const SAME_NAME_64: &[&[u8]] = &[
    &[0x90],
    &[0x55],
    &[0x5d],
    &[0xc3],
    &[0xc9],
    &[0x48, 0x89, 0xe5],
    &[0x48, 0x83, 0xec, 0x10],
    &[0x8b, 0x44, 0x8b, 0x08],
    &[0x48, 0x8b, 0x05, 0x10, 0x00, 0x00, 0x00],
    &[0x48, 0x8d, 0x04, 0x8b],
    &[0x41, 0x54],
    &[0xf0, 0x01, 0x08],
    &[0x0f, 0x05],
    &[0x0f, 0xa2],
    &[0xe8, 0x00, 0x00, 0x00, 0x00],
    &[0xe9, 0x7b, 0x00, 0x00, 0x00],
    &[0xf3, 0x0f, 0x10, 0xc1],
    &[0x0f, 0x58, 0xc1],
    &[0xc5, 0xf8, 0x77],
    &[0xc5, 0xf0, 0x58, 0xc2],
    &[0xc4, 0xe2, 0x70, 0xf2, 0xc2],
    &[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01],
    &[0x62, 0xf1, 0x74, 0x49, 0x58, 0xc2],
];

#[test]
fn lengths_and_names_match_iced_64() {
    for &bytes in SAME_NAME_64 {
        let (ours, len) = decode(bytes, Context::x64(), 0x1000)
            .unwrap_or_else(|e| panic!("decode {bytes:02x?}: {e}"));
        let theirs = iced_decode(64, bytes);
        assert_eq!(len, theirs.len(), "length of {bytes:02x?}");
        assert_eq!(
            ours.opcode().name(),
            iced_name(&theirs),
            "{bytes:02x?}: ours `{ours}`, iced `{}`",
            iced_text(&theirs)
        );
    }
}

#[test]
fn lengths_match_iced_32() {
    let corpus: &[&[u8]] = &[
        &[0x40],
        &[0x27],
        &[0x89, 0xc0],
        &[0x8b, 0x46, 0x10],
        &[0x67, 0x8b, 0x00],
        &[0xa1, 0x00, 0x10, 0x00, 0x00],
        &[0x66, 0x0f, 0x84, 0x10, 0x00],
        &[0x60],
    ];
    for &bytes in corpus {
        let (_, len) = decode(bytes, Context::x86(), 0x1000)
            .unwrap_or_else(|e| panic!("decode {bytes:02x?}: {e}"));
        assert_eq!(len, iced_decode(32, bytes).len(), "length of {bytes:02x?}");
    }
}

#[test]
fn branch_targets_match_iced() {
    let corpus: &[&[u8]] = &[
        &[0xe8, 0x10, 0x00, 0x00, 0x00],
        &[0xe9, 0xf0, 0xff, 0xff, 0xff],
        &[0xeb, 0x80],
        &[0x0f, 0x85, 0x00, 0x01, 0x00, 0x00],
    ];
    for &bytes in corpus {
        let (ours, _) = decode(bytes, Context::x64(), 0x1000).unwrap();
        let theirs = iced_decode(64, bytes);
        assert_eq!(
            ours.branch_target(),
            Some(&Operand::Pc(theirs.near_branch_target())),
            "{bytes:02x?}"
        );
    }
}

// ─── Encoder output ───────────────────────────────────────────────────────────

#[test]
fn encoded_registers_decode_in_iced() {
    let cases = [
        (
            Instruction::mov(reg(Register::RAX), reg(Register::RCX)),
            IcedMnemonic::Mov,
            [IcedRegister::RAX, IcedRegister::RCX],
        ),
        (
            Instruction::binary(Opcode::Add, reg(Register::R9D), reg(Register::R10D)),
            IcedMnemonic::Add,
            [IcedRegister::R9D, IcedRegister::R10D],
        ),
        (
            Instruction::binary(Opcode::Xor, reg(Register::AH), reg(Register::BL)),
            IcedMnemonic::Xor,
            [IcedRegister::AH, IcedRegister::BL],
        ),
        (
            Instruction::mov(reg(Register::SIL), reg(Register::DIL)),
            IcedMnemonic::Mov,
            [IcedRegister::SIL, IcedRegister::DIL],
        ),
        (
            Instruction::binary(Opcode::Sub, reg(Register::SP), reg(Register::AX)),
            IcedMnemonic::Sub,
            [IcedRegister::SP, IcedRegister::AX],
        ),
    ];
    for (insn, mnemonic, [op0, op1]) in cases {
        let bytes = encode_to_vec(&insn, Context::x64(), 0x1000).unwrap();
        let theirs = iced_decode(64, &bytes);
        assert_eq!(theirs.mnemonic(), mnemonic, "`{insn}` -> {bytes:02x?}");
        assert_eq!(theirs.op0_register(), op0, "`{insn}`");
        assert_eq!(theirs.op1_register(), op1, "`{insn}`");
    }
}

#[test]
fn encoded_memory_operands_decode_in_iced() {
    let bases = [Register::RAX, Register::RSP, Register::RBP, Register::R12, Register::R13];
    for base in bases {
        for disp in [0, 8, -128, 0x1234] {
            let m = MemRef::base_disp(base, disp, 8).unwrap();
            let insn = Instruction::mov(reg(Register::RDX), Operand::Mem(m));
            let bytes = encode_to_vec(&insn, Context::x64(), 0x1000).unwrap();
            let theirs = iced_decode(64, &bytes);
            assert_eq!(theirs.mnemonic(), IcedMnemonic::Mov, "`{insn}`");
            assert_eq!(theirs.memory_base().full_register(), iced_base(base), "`{insn}`");
            assert_eq!(theirs.memory_displacement64() as i64, i64::from(disp), "`{insn}`");
        }
    }
}

fn iced_base(r: Register) -> IcedRegister {
    match r {
        Register::RAX => IcedRegister::RAX,
        Register::RSP => IcedRegister::RSP,
        Register::RBP => IcedRegister::RBP,
        Register::R12 => IcedRegister::R12,
        Register::R13 => IcedRegister::R13,
        _ => unreachable!("no mapping for {r}"),
    }
}

#[test]
fn encoded_stack_operations_decode_in_iced() {
    for (insn, mnemonic) in [
        (Instruction::push(Mode::X64, Register::R12), IcedMnemonic::Push),
        (Instruction::pop(Mode::X64, Register::RBP), IcedMnemonic::Pop),
        (Instruction::ret(Mode::X64), IcedMnemonic::Ret),
        (Instruction::call(Mode::X64, Operand::Pc(0x2000)), IcedMnemonic::Call),
    ] {
        let bytes = encode_to_vec(&insn, Context::x64(), 0x1000).unwrap();
        assert_eq!(iced_decode(64, &bytes).mnemonic(), mnemonic, "`{insn}`");
    }
}

#[test]
fn encoded_vector_operations_decode_in_iced() {
    let ymm = Instruction::with_operands(
        Opcode::Vaddps,
        &[reg(Register::ymm(3))],
        &[reg(Register::ymm(9)), reg(Register::ymm(12))],
    );
    let zmm = Instruction::with_operands(
        Opcode::Vaddps,
        &[reg(Register::zmm(20))],
        &[reg(Register::k(2)), reg(Register::zmm(1)), reg(Register::zmm(31))],
    );
    for insn in [ymm, zmm] {
        let bytes = encode_to_vec(&insn, Context::x64(), 0x1000).unwrap();
        let theirs = iced_decode(64, &bytes);
        assert_eq!(theirs.mnemonic(), IcedMnemonic::Vaddps, "`{insn}` -> {bytes:02x?}");
    }
}
