#![cfg(not(target_arch = "wasm32"))]
//! Property-based tests using proptest.
//!
//! These check codec invariants over randomly generated inputs: arbitrary
//! bytes never panic the decoders, decoded bytes are reproduced exactly,
//! generated instructions survive an encode/decode cycle, and relocated
//! branches keep their targets.

use proptest::prelude::*;
use x86_codec::{
    copy_and_re_relativize, decode, encode_to_vec, fast, Context, Instruction, MemRef, Mode,
    Opcode, Operand, Register, MAX_INSTR_LEN,
};

// ── Strategies ──────────────────────────────────────────────────────────

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop::sample::select(vec![Mode::X86, Mode::X64])
}

fn arb_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..24)
}

fn gpr64() -> impl Strategy<Value = Register> {
    prop::sample::select(vec![
        Register::RAX,
        Register::RCX,
        Register::RDX,
        Register::RBX,
        Register::RSP,
        Register::RBP,
        Register::RSI,
        Register::RDI,
        Register::R8,
        Register::R9,
        Register::R10,
        Register::R11,
        Register::R12,
        Register::R13,
        Register::R14,
        Register::R15,
    ])
}

/// Index registers: every 64-bit GPR except the stack pointer.
fn index64() -> impl Strategy<Value = Register> {
    gpr64().prop_filter("rsp cannot be an index", |r| *r != Register::RSP)
}

fn alu_op() -> impl Strategy<Value = Opcode> {
    prop::sample::select(vec![
        Opcode::Add,
        Opcode::Or,
        Opcode::Adc,
        Opcode::Sbb,
        Opcode::And,
        Opcode::Sub,
        Opcode::Xor,
    ])
}

fn arb_mem() -> impl Strategy<Value = MemRef> {
    (
        gpr64(),
        prop::option::of((index64(), prop::sample::select(vec![1u8, 2, 4, 8]))),
        any::<i32>(),
    )
        .prop_map(|(base, index, disp)| {
            let (index, scale) = match index {
                Some((r, s)) => (Some(r), s),
                None => (None, 0),
            };
            MemRef::new(Some(base), index, scale, disp, 8).unwrap()
        })
}

// ── Decoder robustness ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Decoding arbitrary bytes never panics and never over-reads.
    #[test]
    fn decode_never_panics(bytes in arb_bytes(), mode in arb_mode()) {
        let ctx = Context::new(mode);
        if let Ok((_, len)) = decode(&bytes, ctx, 0x1000) {
            prop_assert!(len >= 1);
            prop_assert!(len <= MAX_INSTR_LEN);
            prop_assert!(len <= bytes.len());
        }
        let _ = fast::length(&bytes, ctx);
        let _ = fast::decode_cti(&bytes, ctx, 0x1000);
    }

    /// The fast decoder measures every instruction the full decoder accepts
    /// at the same length.
    #[test]
    fn fast_length_matches_full_decode(bytes in arb_bytes(), mode in arb_mode()) {
        let ctx = Context::new(mode);
        if let Ok((_, len)) = decode(&bytes, ctx, 0x1000) {
            prop_assert_eq!(fast::length(&bytes, ctx), Ok(len));
        }
    }

    /// A decoded instruction re-encoded at its own address reproduces the
    /// bytes it came from.
    #[test]
    fn decoded_bytes_are_reproduced(bytes in arb_bytes(), mode in arb_mode()) {
        let ctx = Context::new(mode);
        if let Ok((insn, len)) = decode(&bytes, ctx, 0x1000) {
            let out = encode_to_vec(&insn, ctx, 0x1000).unwrap();
            prop_assert_eq!(&out[..], &bytes[..len]);
        }
    }
}

// ── Encode/decode cycle ─────────────────────────────────────────────────

proptest! {
    /// Register-register ALU operations decode to the instruction built.
    #[test]
    fn alu_register_cycle(op in alu_op(), dst in gpr64(), src in gpr64()) {
        let insn = Instruction::binary(op, Operand::Reg(dst), Operand::Reg(src));
        let bytes = encode_to_vec(&insn, Context::x64(), 0).unwrap();
        let (back, len) = decode(&bytes, Context::x64(), 0).unwrap();
        prop_assert_eq!(len, bytes.len());
        prop_assert_eq!(back, insn);
    }

    /// Loads through any base/index/scale/displacement decode to the same
    /// reference.
    #[test]
    fn memory_operand_cycle(dst in gpr64(), mem in arb_mem()) {
        let insn = Instruction::mov(Operand::Reg(dst), Operand::Mem(mem));
        let bytes = encode_to_vec(&insn, Context::x64(), 0).unwrap();
        let (back, len) = decode(&bytes, Context::x64(), 0).unwrap();
        prop_assert_eq!(len, bytes.len());
        prop_assert_eq!(back, insn);
    }

    /// Small immediates pick the sign-extended 8-bit form.
    #[test]
    fn short_immediate_cycle(op in alu_op(), dst in gpr64(), imm in any::<i8>()) {
        let insn = Instruction::binary(op, Operand::Reg(dst), Operand::imm(i64::from(imm), 1));
        let bytes = encode_to_vec(&insn, Context::x64(), 0).unwrap();
        prop_assert_eq!(bytes.len(), 4);
        let (back, _) = decode(&bytes, Context::x64(), 0).unwrap();
        prop_assert_eq!(back, insn);
    }
}

// ── Relocation ──────────────────────────────────────────────────────────

proptest! {
    /// A near jump copied anywhere within reach still lands on its target.
    #[test]
    fn relocated_jump_keeps_target(
        disp in -(1i32 << 30)..(1i32 << 30),
        from in 0x1_0000_0000u64..0x1_4000_0000,
        to in 0x1_0000_0000u64..0x1_4000_0000,
    ) {
        let mut code = vec![0xe9];
        code.extend_from_slice(&disp.to_le_bytes());
        let target = (from as i64 + 5 + i64::from(disp)) as u64;

        let mut out = [0u8; 16];
        let n = copy_and_re_relativize(&code, Context::x64(), from, to, &mut out).unwrap();
        prop_assert_eq!(n, 5);
        let (moved, _) = decode(&out[..n], Context::x64(), to).unwrap();
        prop_assert_eq!(moved.branch_target(), Some(&Operand::Pc(target)));
    }
}
