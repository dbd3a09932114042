//! Regression tests for encodings that are easy to get subtly wrong.
//!
//! Each test documents one behavior that a plausible implementation gets
//! wrong, so that a later change cannot quietly reintroduce it.

use x86_codec::{
    decode, encode_to_vec, Context, DecodeError, Instruction, MemRef, Opcode, Operand, Prefixes,
    Register,
};

/// Regression: `xacquire lock` must keep the F2 byte ahead of F0 when the
/// instruction is re-encoded from its operands.
#[test]
fn elision_prefix_precedes_lock() {
    let ctx = Context::x64();
    let (mut insn, _) = decode(&[0xf2, 0xf0, 0x01, 0x08], ctx, 0).unwrap();
    assert_eq!(insn.prefixes(), Prefixes::XACQUIRE | Prefixes::LOCK);
    insn.clear_raw();
    assert_eq!(encode_to_vec(&insn, ctx, 0).unwrap(), [0xf2, 0xf0, 0x01, 0x08]);
}

/// Regression: in 64-bit code Intel processors ignore an operand-size prefix
/// on a near branch, while AMD honors it with a 16-bit displacement.
#[test]
fn operand_size_prefix_on_branch_is_vendor_specific() {
    use x86_codec::Vendor;

    let bytes = [0x66, 0xe9, 0x10, 0x00, 0x00, 0x00];
    let intel = decode(&bytes, Context::x64().with_vendor(Vendor::Intel), 0).unwrap();
    let amd = decode(&bytes, Context::x64().with_vendor(Vendor::Amd), 0).unwrap();
    assert_eq!((intel.1, amd.1), (6, 4));
}

/// Regression: a zero displacement on `[rbp]` is required, not a
/// preference; it must not be flagged as an explicit zero byte.
#[test]
fn frame_pointer_base_keeps_mandatory_displacement() {
    let (insn, _) = decode(&[0x8b, 0x45, 0x00], Context::x64(), 0).unwrap();
    let m = insn.first_mem_ref().copied().unwrap();
    assert!(!m.encode_zero_disp);
    assert_eq!(m, MemRef::base_disp(Register::RBP, 0, 4).unwrap());
}

/// Regression: `[r12]` shares the SIB escape with `[rsp]`; without a SIB
/// byte the ModR/M would select a different addressing form.
#[test]
fn r12_base_needs_a_sib_byte() {
    let m = MemRef::base_disp(Register::R12, 0, 8).unwrap();
    let load = Instruction::mov(Operand::Reg(Register::RAX), Operand::Mem(m));
    assert_eq!(encode_to_vec(&load, Context::x64(), 0).unwrap(), [0x49, 0x8b, 0x04, 0x24]);
}

/// Regression: EVEX 8-bit displacements are scaled by the memory operand
/// width, so `[rax + 0x40]` on a 64-byte operand is a single disp8 of 1.
#[test]
fn evex_displacement_is_compressed() {
    let bytes = [0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01];
    let (mut add, _) = decode(&bytes, Context::x64(), 0).unwrap();
    assert_eq!(add.opcode(), Opcode::Vaddps);
    let mem = add.srcs().iter().find_map(|op| op.mem_ref().copied()).unwrap();
    assert_eq!(mem.disp, 0x40);
    add.clear_raw();
    assert_eq!(encode_to_vec(&add, Context::x64(), 0).unwrap(), bytes);
}

/// Regression: a displacement that is not a multiple of the EVEX scale must
/// fall back to a full 32-bit displacement rather than be rounded.
#[test]
fn evex_unaligned_displacement_is_not_rounded() {
    let (mut add, _) = decode(&[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01], Context::x64(), 0).unwrap();
    let at = add.srcs().iter().position(|op| op.mem_ref().is_some()).unwrap();
    let mut mem = *add.srcs()[at].mem_ref().unwrap();
    mem.disp = 0x41;
    assert!(add.set_src(at, Operand::Mem(mem)));
    let bytes = encode_to_vec(&add, Context::x64(), 0).unwrap();
    assert_eq!(&bytes[5..], &[0x88, 0x41, 0x00, 0x00, 0x00]);
    let (back, _) = decode(&bytes, Context::x64(), 0).unwrap();
    assert_eq!(back.srcs()[at].mem_ref().map(|m| m.disp), Some(0x41));
}

/// Regression: a displacement cut short by the end of the buffer is a
/// truncation, even though the opcode and ModR/M are both present.
#[test]
fn truncated_displacement_is_reported() {
    assert_eq!(
        decode(&[0x8b, 0x80, 0x10, 0x00], Context::x64(), 0).unwrap_err(),
        DecodeError::Truncated {
            needed: 6,
            available: 4
        }
    );
}
