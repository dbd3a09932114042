//! x87 escape opcodes `D8`–`DF`.

use super::slots::*;
use super::{op1, Builder, Slot};
use crate::opcode::Opcode as O;

const ARITH: [O; 8] = [
    O::Fadd,
    O::Fmul,
    O::Fcom,
    O::Fcomp,
    O::Fsub,
    O::Fsubr,
    O::Fdiv,
    O::Fdivr,
];
const INT_ARITH: [O; 8] = [
    O::Fiadd,
    O::Fimul,
    O::Ficom,
    O::Ficomp,
    O::Fisub,
    O::Fisubr,
    O::Fidiv,
    O::Fidivr,
];

fn is_compare(op: O) -> bool {
    matches!(op, O::Fcom | O::Fcomp | O::Ficom | O::Ficomp)
}

/// `op st0, mem` arithmetic with memory of `m`.
fn arith_mem(b: &mut Builder, byte: u8, ops: &[O; 8], m: Slot) {
    for (ext, &op) in ops.iter().enumerate() {
        let f = op1(byte).ext(ext as u8).mem();
        if is_compare(op) {
            b.add(op, f, &[], &[St0, m]);
        } else {
            b.add(op, f, &[St0], &[m, St0]);
        }
    }
}

/// Register forms of the `/n` group `ext` in `byte`.
fn each_sti(b: &mut Builder, byte: u8, ext: u8, op: O, dsts: &[Slot], srcs: &[Slot]) {
    b.add(op, op1(byte).ext(ext).regs(), dsts, srcs);
}

/// A single-byte-modrm form with no explicit operands.
fn fixed(b: &mut Builder, byte: u8, modrm: u8, op: O, dsts: &[Slot], srcs: &[Slot]) {
    b.add(op, op1(byte).ext((modrm >> 3) & 7).rm(modrm & 7), dsts, srcs);
}

pub(super) fn add(b: &mut Builder) {
    // D8: 32-bit real memory, st0 op st(i)
    arith_mem(b, 0xd8, &ARITH, Md);
    for (ext, &op) in ARITH.iter().enumerate() {
        if is_compare(op) {
            each_sti(b, 0xd8, ext as u8, op, &[], &[St0, Sti]);
        } else {
            each_sti(b, 0xd8, ext as u8, op, &[St0], &[Sti, St0]);
        }
    }

    // D9
    b.add(O::Fld, op1(0xd9).ext(0).mem(), &[St0], &[Md]);
    b.add(O::Fst, op1(0xd9).ext(2).mem(), &[Md], &[St0]);
    b.add(O::Fstp, op1(0xd9).ext(3).mem(), &[Md], &[St0]);
    b.add(O::Fldenv, op1(0xd9).ext(4).mem(), &[], &[Mfe]);
    b.add(O::Fldcw, op1(0xd9).ext(5).mem(), &[], &[Mw]);
    b.add(O::Fnstenv, op1(0xd9).ext(6).mem(), &[Mfe], &[]);
    b.add(O::Fnstcw, op1(0xd9).ext(7).mem(), &[Mw], &[]);
    each_sti(b, 0xd9, 0, O::Fld, &[St0], &[Sti]);
    each_sti(b, 0xd9, 1, O::Fxch, &[St0, Sti], &[St0, Sti]);
    fixed(b, 0xd9, 0xd0, O::Fnop, &[], &[]);
    fixed(b, 0xd9, 0xe0, O::Fchs, &[St0], &[St0]);
    fixed(b, 0xd9, 0xe1, O::Fabs, &[St0], &[St0]);
    fixed(b, 0xd9, 0xe4, O::Ftst, &[], &[St0]);
    fixed(b, 0xd9, 0xe5, O::Fxam, &[], &[St0]);
    for (modrm, op) in [
        (0xe8, O::Fld1),
        (0xe9, O::Fldl2t),
        (0xea, O::Fldl2e),
        (0xeb, O::Fldpi),
        (0xec, O::Fldlg2),
        (0xed, O::Fldln2),
        (0xee, O::Fldz),
    ] {
        fixed(b, 0xd9, modrm, op, &[St0], &[]);
    }
    for (modrm, op) in [
        (0xf0, O::F2xm1),
        (0xf1, O::Fyl2x),
        (0xf2, O::Fptan),
        (0xf3, O::Fpatan),
        (0xf4, O::Fxtract),
        (0xf5, O::Fprem1),
        (0xf8, O::Fprem),
        (0xf9, O::Fyl2xp1),
        (0xfa, O::Fsqrt),
        (0xfb, O::Fsincos),
        (0xfc, O::Frndint),
        (0xfd, O::Fscale),
        (0xfe, O::Fsin),
        (0xff, O::Fcos),
    ] {
        fixed(b, 0xd9, modrm, op, &[St0], &[St0]);
    }
    fixed(b, 0xd9, 0xf6, O::Fdecstp, &[], &[]);
    fixed(b, 0xd9, 0xf7, O::Fincstp, &[], &[]);

    // DA: 32-bit integer memory, fcmov
    arith_mem(b, 0xda, &INT_ARITH, Md);
    for (ext, op) in [(0, O::Fcmovb), (1, O::Fcmove), (2, O::Fcmovbe), (3, O::Fcmovu)] {
        each_sti(b, 0xda, ext, op, &[St0], &[Sti]);
    }
    fixed(b, 0xda, 0xe9, O::Fucompp, &[], &[St0, St1]);

    // DB
    b.add(O::Fild, op1(0xdb).ext(0).mem(), &[St0], &[Md]);
    b.add(O::Fisttp, op1(0xdb).ext(1).mem(), &[Md], &[St0]);
    b.add(O::Fist, op1(0xdb).ext(2).mem(), &[Md], &[St0]);
    b.add(O::Fistp, op1(0xdb).ext(3).mem(), &[Md], &[St0]);
    b.add(O::Fld, op1(0xdb).ext(5).mem(), &[St0], &[Mt]);
    b.add(O::Fstp, op1(0xdb).ext(7).mem(), &[Mt], &[St0]);
    for (ext, op) in [(0, O::Fcmovnb), (1, O::Fcmovne), (2, O::Fcmovnbe), (3, O::Fcmovnu)] {
        each_sti(b, 0xdb, ext, op, &[St0], &[Sti]);
    }
    fixed(b, 0xdb, 0xe2, O::Fnclex, &[], &[]);
    fixed(b, 0xdb, 0xe3, O::Fninit, &[], &[]);
    each_sti(b, 0xdb, 5, O::Fucomi, &[], &[St0, Sti]);
    each_sti(b, 0xdb, 6, O::Fcomi, &[], &[St0, Sti]);

    // DC: 64-bit real memory, st(i) op st0
    arith_mem(b, 0xdc, &ARITH, Mq);
    for (ext, op) in [
        (0, O::Fadd),
        (1, O::Fmul),
        (4, O::Fsubr),
        (5, O::Fsub),
        (6, O::Fdivr),
        (7, O::Fdiv),
    ] {
        each_sti(b, 0xdc, ext, op, &[Sti], &[St0, Sti]);
    }

    // DD
    b.add(O::Fld, op1(0xdd).ext(0).mem(), &[St0], &[Mq]);
    b.add(O::Fisttp, op1(0xdd).ext(1).mem(), &[Mq], &[St0]);
    b.add(O::Fst, op1(0xdd).ext(2).mem(), &[Mq], &[St0]);
    b.add(O::Fstp, op1(0xdd).ext(3).mem(), &[Mq], &[St0]);
    b.add(O::Frstor, op1(0xdd).ext(4).mem(), &[], &[Mfs]);
    b.add(O::Fnsave, op1(0xdd).ext(6).mem(), &[Mfs], &[]);
    b.add(O::Fnstsw, op1(0xdd).ext(7).mem(), &[Mw], &[]);
    each_sti(b, 0xdd, 0, O::Ffree, &[], &[Sti]);
    each_sti(b, 0xdd, 2, O::Fst, &[Sti], &[St0]);
    each_sti(b, 0xdd, 3, O::Fstp, &[Sti], &[St0]);
    each_sti(b, 0xdd, 4, O::Fucom, &[], &[Sti, St0]);
    each_sti(b, 0xdd, 5, O::Fucomp, &[], &[Sti, St0]);

    // DE: 16-bit integer memory, pop forms
    arith_mem(b, 0xde, &INT_ARITH, Mw);
    for (ext, op) in [
        (0, O::Faddp),
        (1, O::Fmulp),
        (4, O::Fsubrp),
        (5, O::Fsubp),
        (6, O::Fdivrp),
        (7, O::Fdivp),
    ] {
        each_sti(b, 0xde, ext, op, &[Sti], &[St0, Sti]);
    }
    fixed(b, 0xde, 0xd9, O::Fcompp, &[], &[St0, St1]);

    // DF
    b.add(O::Fild, op1(0xdf).ext(0).mem(), &[St0], &[Mw]);
    b.add(O::Fisttp, op1(0xdf).ext(1).mem(), &[Mw], &[St0]);
    b.add(O::Fist, op1(0xdf).ext(2).mem(), &[Mw], &[St0]);
    b.add(O::Fistp, op1(0xdf).ext(3).mem(), &[Mw], &[St0]);
    b.add(O::Fbld, op1(0xdf).ext(4).mem(), &[St0], &[Mt]);
    b.add(O::Fild, op1(0xdf).ext(5).mem(), &[St0], &[Mq]);
    b.add(O::Fbstp, op1(0xdf).ext(6).mem(), &[Mt], &[St0]);
    b.add(O::Fistp, op1(0xdf).ext(7).mem(), &[Mq], &[St0]);
    fixed(b, 0xdf, 0xe0, O::Fnstsw, &[AX], &[]);
    each_sti(b, 0xdf, 5, O::Fucomip, &[], &[St0, Sti]);
    each_sti(b, 0xdf, 6, O::Fcomip, &[], &[St0, Sti]);
}

