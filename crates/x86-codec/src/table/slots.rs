//! Operand-slot shorthands in the manual's notation.
//!
//! The first letter says where the operand comes from (`E` ModR/M `rm`,
//! `G` ModR/M `reg`, `I` immediate, `J` relative, `V`/`W` vector reg/rm,
//! `H` `vvvv`, `P`/`Q` MMX reg/rm, `M` memory only, `R`/`U`/`N` register
//! `rm` only); the rest is the size.

#![allow(non_upper_case_globals)]

use super::{OpType, Slot};
use crate::register::Register;
use crate::size::OpSize::{self, Fixed, Var};
use crate::size::VarSize;

const fn s(t: OpType, z: OpSize) -> Slot {
    Slot(t, z)
}

const V: OpSize = Var(VarSize::V);
const Y: OpSize = Var(VarSize::Y);
const Z: OpSize = Var(VarSize::Z);
const X: OpSize = Var(VarSize::X);
const XE: OpSize = Var(VarSize::XE);
const STACK: OpSize = Var(VarSize::Stack);
const PTR: OpSize = Var(VarSize::Pointer);
const ADDR: OpSize = Var(VarSize::Addr);

// ─── General-purpose ─────────────────────────────────────────────────

pub(crate) const Eb: Slot = s(OpType::RmGpr, Fixed(1));
pub(crate) const Ew: Slot = s(OpType::RmGpr, Fixed(2));
pub(crate) const Ed: Slot = s(OpType::RmGpr, Fixed(4));
pub(crate) const Eq: Slot = s(OpType::RmGpr, Fixed(8));
pub(crate) const Ev: Slot = s(OpType::RmGpr, V);
pub(crate) const Ey: Slot = s(OpType::RmGpr, Y);
/// Push/pop `rm` operand.
pub(crate) const Es: Slot = s(OpType::RmGpr, STACK);
/// Near indirect branch target.
pub(crate) const En: Slot = s(OpType::RmGpr, Var(VarSize::NearStack));
/// `mov` to/from a segment register.
pub(crate) const Esw: Slot = s(OpType::RmGpr, Fixed(2));

pub(crate) const Gb: Slot = s(OpType::Gpr, Fixed(1));
pub(crate) const Gw: Slot = s(OpType::Gpr, Fixed(2));
pub(crate) const Gd: Slot = s(OpType::Gpr, Fixed(4));
pub(crate) const Gq: Slot = s(OpType::Gpr, Fixed(8));
pub(crate) const Gv: Slot = s(OpType::Gpr, V);
pub(crate) const Gy: Slot = s(OpType::Gpr, Y);
pub(crate) const Gz: Slot = s(OpType::Gpr, Z);

pub(crate) const Rv: Slot = s(OpType::RmGprReg, V);
pub(crate) const Ry: Slot = s(OpType::RmGprReg, Y);
pub(crate) const Rd: Slot = s(OpType::RmGprReg, Fixed(4));
pub(crate) const Rq: Slot = s(OpType::RmGprReg, Fixed(8));
/// Pointer-width register or memory (`vmread`, `vmwrite`).
pub(crate) const Ep: Slot = s(OpType::RmGpr, PTR);
pub(crate) const Gp: Slot = s(OpType::Gpr, PTR);
/// Pointer-width register for control/debug moves.
pub(crate) const Rp: Slot = s(OpType::RmGprReg, PTR);

// ─── Memory ──────────────────────────────────────────────────────────

pub(crate) const M: Slot = s(OpType::Mem, OpSize::None);
pub(crate) const Mb: Slot = s(OpType::Mem, Fixed(1));
pub(crate) const Mw: Slot = s(OpType::Mem, Fixed(2));
pub(crate) const Md: Slot = s(OpType::Mem, Fixed(4));
pub(crate) const Mq: Slot = s(OpType::Mem, Fixed(8));
pub(crate) const Mt: Slot = s(OpType::Mem, Fixed(10));
pub(crate) const Mdq: Slot = s(OpType::Mem, Fixed(16));
pub(crate) const M512: Slot = s(OpType::Mem, Fixed(512));
pub(crate) const Mv: Slot = s(OpType::Mem, V);
pub(crate) const My: Slot = s(OpType::Mem, Y);
pub(crate) const Mx: Slot = s(OpType::Mem, X);
/// Far pointer in memory.
pub(crate) const Mp: Slot = s(OpType::Mem, Var(VarSize::FarMem));
/// Descriptor-table image.
pub(crate) const Ms: Slot = s(OpType::Mem, Var(VarSize::DescTable));
/// `cmpxchg8b`/`cmpxchg16b` operand.
pub(crate) const Mdq8: Slot = s(OpType::Mem, Var(VarSize::Rex16));
/// x87 environment.
pub(crate) const Mfe: Slot = s(OpType::Mem, Var(VarSize::FpuEnv));
/// x87 full state.
pub(crate) const Mfs: Slot = s(OpType::Mem, Var(VarSize::FpuSave));
/// `bound` operand pair.
pub(crate) const Ma: Slot = s(OpType::Mem, Var(VarSize::Rex16));

// ─── Immediates and targets ──────────────────────────────────────────

pub(crate) const Ib: Slot = s(OpType::Imm, Fixed(1));
pub(crate) const Iw: Slot = s(OpType::Imm, Fixed(2));
pub(crate) const Id: Slot = s(OpType::Imm, Fixed(4));
pub(crate) const Iz: Slot = s(OpType::Imm, Z);
pub(crate) const Iv: Slot = s(OpType::Imm, V);
pub(crate) const Jb: Slot = s(OpType::Rel, Fixed(1));
pub(crate) const Jz: Slot = s(OpType::Rel, Var(VarSize::NearRel));
pub(crate) const Ap: Slot = s(OpType::FarPtr, Var(VarSize::FarImm));
pub(crate) const Ob: Slot = s(OpType::Moffs, Fixed(1));
pub(crate) const Ov: Slot = s(OpType::Moffs, V);
pub(crate) const One: Slot = s(OpType::One, Fixed(1));

// ─── System registers ────────────────────────────────────────────────

pub(crate) const Sw: Slot = s(OpType::Sreg, Fixed(2));
pub(crate) const Cr: Slot = s(OpType::Creg, PTR);
pub(crate) const Dr: Slot = s(OpType::Dreg, PTR);
pub(crate) const Bnd: Slot = s(OpType::Bnd, Fixed(16));
pub(crate) const EBnd: Slot = s(OpType::RmBnd, Fixed(16));
/// MPX address form with no size (`bndmk`, `bndldx`).
pub(crate) const MBnd: Slot = s(OpType::Mem, OpSize::None);

// ─── MMX ─────────────────────────────────────────────────────────────

pub(crate) const Pq: Slot = s(OpType::Mmx, Fixed(8));
pub(crate) const Pd: Slot = s(OpType::Mmx, Fixed(4));
pub(crate) const Qq: Slot = s(OpType::RmMmx, Fixed(8));
pub(crate) const Qd: Slot = s(OpType::RmMmx, Fixed(4));
pub(crate) const Nq: Slot = s(OpType::RmMmxReg, Fixed(8));

// ─── SSE / AVX ───────────────────────────────────────────────────────

pub(crate) const Vdq: Slot = s(OpType::Xmm, Fixed(16));
pub(crate) const Vq: Slot = s(OpType::Xmm, Fixed(8));
pub(crate) const Vd: Slot = s(OpType::Xmm, Fixed(4));
pub(crate) const Vss: Slot = s(OpType::Xmm, Fixed(4));
pub(crate) const Vsd: Slot = s(OpType::Xmm, Fixed(8));
pub(crate) const Vx: Slot = s(OpType::Xmm, X);
pub(crate) const Vqq: Slot = s(OpType::Xmm, Fixed(32));
pub(crate) const Ve: Slot = s(OpType::Xmm, XE);
/// Half-width vector register (conversions that narrow).
pub(crate) const Vh: Slot = s(OpType::Xmm, Var(VarSize::Half));

pub(crate) const Wb: Slot = s(OpType::RmXmm, Fixed(1));
pub(crate) const Wqq: Slot = s(OpType::RmXmm, Fixed(32));
pub(crate) const Wdq: Slot = s(OpType::RmXmm, Fixed(16));
pub(crate) const Wq: Slot = s(OpType::RmXmm, Fixed(8));
pub(crate) const Wd: Slot = s(OpType::RmXmm, Fixed(4));
pub(crate) const Ww: Slot = s(OpType::RmXmm, Fixed(2));
pub(crate) const Wss: Slot = s(OpType::RmXmm, Fixed(4));
pub(crate) const Wsd: Slot = s(OpType::RmXmm, Fixed(8));
pub(crate) const Wx: Slot = s(OpType::RmXmm, X);
pub(crate) const We: Slot = s(OpType::RmXmm, XE);
pub(crate) const Wh: Slot = s(OpType::RmXmm, Var(VarSize::Half));

pub(crate) const Udq: Slot = s(OpType::RmXmmReg, Fixed(16));
pub(crate) const Ux: Slot = s(OpType::RmXmmReg, X);

pub(crate) const Hdq: Slot = s(OpType::VexXmm, Fixed(16));
pub(crate) const Hx: Slot = s(OpType::VexXmm, X);
pub(crate) const Hqq: Slot = s(OpType::VexXmm, Fixed(32));
pub(crate) const Hh: Slot = s(OpType::VexXmm, Var(VarSize::Half));
pub(crate) const He: Slot = s(OpType::VexXmm, XE);
/// Fourth vector operand in bits 7:4 of the immediate.
pub(crate) const Lx: Slot = s(OpType::Is4Xmm, X);
pub(crate) const Ldq: Slot = s(OpType::Is4Xmm, Fixed(16));

/// VSIB with an index as wide as the vector; the access is one element.
pub(crate) const fn vsib(elem: u16) -> Slot {
    s(OpType::Vsib, Fixed(elem))
}

/// VSIB with a half-width index.
pub(crate) const fn vsib_half(elem: u16) -> Slot {
    s(OpType::VsibHalf, Fixed(elem))
}

pub(crate) const By: Slot = s(OpType::VexGpr, Y);

// ─── Opmask ──────────────────────────────────────────────────────────

pub(crate) const KG: Slot = s(OpType::MaskReg, Fixed(8));
pub(crate) const KR: Slot = s(OpType::RmMaskReg, Fixed(8));
pub(crate) const KH: Slot = s(OpType::VexMask, Fixed(8));
/// Memory side of `kmov`.
pub(crate) const fn k_mem(size: u16) -> Slot {
    s(OpType::RmMask, Fixed(size))
}
/// EVEX `aaa`.
pub(crate) const KA: Slot = s(OpType::EvexMask, Fixed(8));

// ─── x87 ─────────────────────────────────────────────────────────────

pub(crate) const St0: Slot = s(OpType::Fixed(Register::ST0), Fixed(10));
pub(crate) const St1: Slot = s(OpType::Fixed(Register::ST1), Fixed(10));
pub(crate) const Sti: Slot = s(OpType::X87, Fixed(10));

// ─── Implicit ────────────────────────────────────────────────────────

pub(crate) const AL: Slot = s(OpType::GprAt(0), Fixed(1));
pub(crate) const AH: Slot = s(OpType::Fixed(Register::AH), Fixed(1));
pub(crate) const AX: Slot = s(OpType::GprAt(0), Fixed(2));
pub(crate) const EAX: Slot = s(OpType::GprAt(0), Fixed(4));
pub(crate) const eAX: Slot = s(OpType::GprAt(0), V);
pub(crate) const zAX: Slot = s(OpType::GprAt(0), Z);
pub(crate) const rAXy: Slot = s(OpType::GprAt(0), Y);
pub(crate) const CL: Slot = s(OpType::GprAt(1), Fixed(1));
pub(crate) const ECX: Slot = s(OpType::GprAt(1), Fixed(4));
/// Count register of the address width (`loop`, `jecxz`, `rep`).
pub(crate) const xCX: Slot = s(OpType::GprAt(1), ADDR);
pub(crate) const DX: Slot = s(OpType::GprAt(2), Fixed(2));
pub(crate) const eDX: Slot = s(OpType::GprAt(2), V);
pub(crate) const EDX: Slot = s(OpType::GprAt(2), Fixed(4));
pub(crate) const rDXy: Slot = s(OpType::GprAt(2), Y);
pub(crate) const EBX: Slot = s(OpType::GprAt(3), Fixed(4));
pub(crate) const rSP: Slot = s(OpType::GprAt(4), PTR);
pub(crate) const rBP: Slot = s(OpType::GprAt(5), PTR);
/// `monitor`/`clzero` address register.
pub(crate) const xAX: Slot = s(OpType::GprAt(0), ADDR);
pub(crate) const XMM0: Slot = s(OpType::Fixed(Register::xmm(0)), Fixed(16));
pub(crate) const rCXy: Slot = s(OpType::GprAt(1), Y);
pub(crate) const rBXy: Slot = s(OpType::GprAt(3), Y);
pub(crate) const RCX: Slot = s(OpType::GprAt(1), Fixed(8));
pub(crate) const R11: Slot = s(OpType::GprAt(11), Fixed(8));

/// General-purpose register `n` of the operand size (`pusha`, `popa`).
pub(crate) const fn gpr_z(n: u8) -> Slot {
    s(OpType::GprAt(n), Z)
}

/// Segment register `seg`.
pub(crate) const fn sreg(seg: Register) -> Slot {
    s(OpType::Fixed(seg), Fixed(2))
}

pub(crate) const Zb: Slot = s(OpType::PlusReg, Fixed(1));
pub(crate) const Zv: Slot = s(OpType::PlusReg, V);
pub(crate) const Zy: Slot = s(OpType::PlusReg, Y);
pub(crate) const Zs: Slot = s(OpType::PlusReg, STACK);

pub(crate) const Xb: Slot = s(OpType::StrSrc, Fixed(1));
pub(crate) const Xv: Slot = s(OpType::StrSrc, V);
pub(crate) const Xz: Slot = s(OpType::StrSrc, Z);
pub(crate) const Yb: Slot = s(OpType::StrDst, Fixed(1));
pub(crate) const Yv: Slot = s(OpType::StrDst, V);
pub(crate) const Yz: Slot = s(OpType::StrDst, Z);
pub(crate) const MaskMovQ: Slot = s(OpType::MaskMov, Fixed(8));
pub(crate) const MaskMovDq: Slot = s(OpType::MaskMov, Fixed(16));
pub(crate) const XlatB: Slot = s(OpType::Xlat, Fixed(1));

/// `[sp - size]` written by a push of `size`.
pub(crate) const fn push(size: OpSize) -> Slot {
    s(OpType::StackPush, size)
}

/// `[sp]` read by a pop of `size`.
pub(crate) const fn pop(size: OpSize) -> Slot {
    s(OpType::StackPop, size)
}

pub(crate) const PushS: Slot = push(STACK);
pub(crate) const PopS: Slot = pop(STACK);
pub(crate) const PushN: Slot = push(Var(VarSize::NearStack));
pub(crate) const PopN: Slot = pop(Var(VarSize::NearStack));
pub(crate) const PushF: Slot = push(Var(VarSize::FarStack));
pub(crate) const PopF: Slot = pop(Var(VarSize::FarStack));
pub(crate) const PopI: Slot = pop(Var(VarSize::Iret));
pub(crate) const PushA: Slot = push(Var(VarSize::PushAll));
pub(crate) const PopA: Slot = pop(Var(VarSize::PushAll));
pub(crate) const FrameTop: Slot = s(OpType::FrameTop, STACK);
