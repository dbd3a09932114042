//! EVEX-encoded AVX-512 instructions.
//!
//! Every template here carries the `aaa` opmask as its first source; an
//! unmasked instruction has `k0` there.

use super::slots::*;
use super::{op2, op38, op3a, Builder, Form, InputSize, Tuple};
use crate::opcode::Opcode as O;

const BY_W: InputSize = InputSize::ByW;

fn e0f(byte: u8, tuple: Tuple, input: InputSize) -> Form {
    op2(byte).evex(tuple, input)
}

pub(super) fn add(b: &mut Builder) {
    moves(b);
    arith(b);
    logic(b);
    misc(b);
}

fn moves(b: &mut Builder) {
    for (byte, ps, pd) in [(0x10, O::Vmovups, O::Vmovupd), (0x28, O::Vmovaps, O::Vmovapd)] {
        b.add(ps, e0f(byte, Tuple::Fvm, BY_W).w0(), &[Ve], &[KA, We]);
        b.add(pd, e0f(byte, Tuple::Fvm, BY_W).p66().w1(), &[Ve], &[KA, We]);
        b.add(ps, e0f(byte + 1, Tuple::Fvm, BY_W).w0(), &[We], &[KA, Ve]);
        b.add(pd, e0f(byte + 1, Tuple::Fvm, BY_W).p66().w1(), &[We], &[KA, Ve]);
    }
    for (w, aligned, unaligned) in [
        (false, O::Vmovdqa32, O::Vmovdqu32),
        (true, O::Vmovdqa64, O::Vmovdqu64),
    ] {
        let f = |byte: u8, form: fn(Form) -> Form| {
            let f = form(e0f(byte, Tuple::Fvm, BY_W));
            if w {
                f.w1()
            } else {
                f.w0()
            }
        };
        b.add(aligned, f(0x6f, Form::p66), &[Ve], &[KA, We]);
        b.add(unaligned, f(0x6f, Form::pf3), &[Ve], &[KA, We]);
        b.add(aligned, f(0x7f, Form::p66), &[We], &[KA, Ve]);
        b.add(unaligned, f(0x7f, Form::pf3), &[We], &[KA, Ve]);
    }
    b.add(
        O::Vbroadcastss,
        op38(0x18).evex(Tuple::T1s, InputSize::Fixed(4)).p66().w0(),
        &[Ve],
        &[KA, Wd],
    );
    b.add(
        O::Vpbroadcastd,
        op38(0x58).evex(Tuple::T1s, InputSize::Fixed(4)).p66().w0(),
        &[Ve],
        &[KA, Wd],
    );
    b.add(
        O::Vpbroadcastq,
        op38(0x59).evex(Tuple::T1s, InputSize::Fixed(8)).p66().w1(),
        &[Ve],
        &[KA, Wq],
    );
}

fn arith(b: &mut Builder) {
    for (byte, [ps, pd, ss, sd]) in [
        (0x58, [O::Vaddps, O::Vaddpd, O::Vaddss, O::Vaddsd]),
        (0x59, [O::Vmulps, O::Vmulpd, O::Vmulss, O::Vmulsd]),
        (0x5c, [O::Vsubps, O::Vsubpd, O::Vsubss, O::Vsubsd]),
        (0x5e, [O::Vdivps, O::Vdivpd, O::Vdivss, O::Vdivsd]),
    ] {
        b.add(ps, e0f(byte, Tuple::Fv, BY_W).w0().er(), &[Ve], &[KA, He, We]);
        b.add(pd, e0f(byte, Tuple::Fv, BY_W).p66().w1().er(), &[Ve], &[KA, He, We]);
        b.add(
            ss,
            e0f(byte, Tuple::T1s, InputSize::Fixed(4)).pf3().w0().er(),
            &[Vdq],
            &[KA, Hdq, Wss],
        );
        b.add(
            sd,
            e0f(byte, Tuple::T1s, InputSize::Fixed(8)).pf2().w1().er(),
            &[Vdq],
            &[KA, Hdq, Wsd],
        );
    }
    for (byte, [ps, pd]) in [
        (0x5d, [O::Vminps, O::Vminpd]),
        (0x5f, [O::Vmaxps, O::Vmaxpd]),
    ] {
        b.add(ps, e0f(byte, Tuple::Fv, BY_W).w0().sae(), &[Ve], &[KA, He, We]);
        b.add(pd, e0f(byte, Tuple::Fv, BY_W).p66().w1().sae(), &[Ve], &[KA, He, We]);
    }
    for (byte, w, op) in [
        (0xfe, false, O::Vpaddd),
        (0xd4, true, O::Vpaddq),
        (0xfa, false, O::Vpsubd),
        (0xfb, true, O::Vpsubq),
    ] {
        let f = e0f(byte, Tuple::Fv, BY_W).p66();
        let f = if w { f.w1() } else { f.w0() };
        b.add(op, f, &[Ve], &[KA, He, We]);
    }
}

fn logic(b: &mut Builder) {
    for (byte, d, q) in [
        (0xdb, O::Vpandd, O::Vpandq),
        (0xeb, O::Vpord, O::Vporq),
        (0xef, O::Vpxord, O::Vpxorq),
    ] {
        b.add(d, e0f(byte, Tuple::Fv, BY_W).p66().w0(), &[Ve], &[KA, He, We]);
        b.add(q, e0f(byte, Tuple::Fv, BY_W).p66().w1(), &[Ve], &[KA, He, We]);
    }
    b.add(O::Vxorps, e0f(0x57, Tuple::Fv, BY_W).w0(), &[Ve], &[KA, He, We]);
    b.add(O::Vxorpd, e0f(0x57, Tuple::Fv, BY_W).p66().w1(), &[Ve], &[KA, He, We]);
    b.add(
        O::Vpternlogd,
        op3a(0x25).evex(Tuple::Fv, BY_W).p66().w0(),
        &[Ve],
        &[KA, He, We, Ib, Ve],
    );
    b.add(
        O::Vpternlogq,
        op3a(0x25).evex(Tuple::Fv, BY_W).p66().w1(),
        &[Ve],
        &[KA, He, We, Ib, Ve],
    );
}

fn misc(b: &mut Builder) {
    b.add(
        O::Vpcmpd,
        op3a(0x1f).evex(Tuple::Fv, BY_W).p66().w0(),
        &[KG],
        &[KA, He, We, Ib],
    );
    b.add(
        O::Vpscatterdd,
        op38(0xa0)
            .evex(Tuple::T1s, InputSize::Fixed(4))
            .p66()
            .w0()
            .mem()
            .not_k0(),
        &[vsib(4)],
        &[KA, Ve],
    );
}
