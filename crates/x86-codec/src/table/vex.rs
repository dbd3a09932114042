//! VEX-encoded AVX, AVX2, FMA, BMI and opmask instructions.

use super::slots::*;
use super::{op2, op38, op3a, Builder, Form};
use crate::opcode::Opcode as O;

fn v0f(byte: u8) -> Form {
    op2(byte).vex().r()
}

fn v38(byte: u8) -> Form {
    op38(byte).vex().r()
}

fn v3a(byte: u8) -> Form {
    op3a(byte).vex().r()
}

pub(super) fn add(b: &mut Builder) {
    moves(b);
    float(b);
    integer(b);
    permute(b);
    gathers(b);
    fma(b);
    bmi(b);
    opmask(b);
}

fn moves(b: &mut Builder) {
    b.add(O::Vmovups, v0f(0x10), &[Vx], &[Wx]);
    b.add(O::Vmovupd, v0f(0x10).p66(), &[Vx], &[Wx]);
    b.add(O::Vmovss, v0f(0x10).pf3().mem(), &[Vdq], &[Md]);
    b.add(O::Vmovss, v0f(0x10).pf3().regs(), &[Vdq], &[Hdq, Udq]);
    b.add(O::Vmovsd, v0f(0x10).pf2().mem(), &[Vdq], &[Mq]);
    b.add(O::Vmovsd, v0f(0x10).pf2().regs(), &[Vdq], &[Hdq, Udq]);
    b.add(O::Vmovups, v0f(0x11), &[Wx], &[Vx]);
    b.add(O::Vmovupd, v0f(0x11).p66(), &[Wx], &[Vx]);
    b.add(O::Vmovss, v0f(0x11).pf3().mem(), &[Md], &[Vss]);
    b.add(O::Vmovss, v0f(0x11).pf3().regs(), &[Udq], &[Hdq, Vdq]);
    b.add(O::Vmovsd, v0f(0x11).pf2().mem(), &[Mq], &[Vsd]);
    b.add(O::Vmovsd, v0f(0x11).pf2().regs(), &[Udq], &[Hdq, Vdq]);
    b.add(O::Vmovaps, v0f(0x28), &[Vx], &[Wx]);
    b.add(O::Vmovapd, v0f(0x28).p66(), &[Vx], &[Wx]);
    b.add(O::Vmovaps, v0f(0x29), &[Wx], &[Vx]);
    b.add(O::Vmovapd, v0f(0x29).p66(), &[Wx], &[Vx]);
    b.add(O::Vmovdqa, v0f(0x6f).p66(), &[Vx], &[Wx]);
    b.add(O::Vmovdqu, v0f(0x6f).pf3(), &[Vx], &[Wx]);
    b.add(O::Vmovdqa, v0f(0x7f).p66(), &[Wx], &[Vx]);
    b.add(O::Vmovdqu, v0f(0x7f).pf3(), &[Wx], &[Vx]);
    b.add(O::Vmovd, v0f(0x6e).p66().l0().w0(), &[Vdq], &[Ed]);
    b.add(O::Vmovq, v0f(0x6e).p66().l0().w1(), &[Vdq], &[Eq]);
    b.add(O::Vmovd, v0f(0x7e).p66().l0().w0(), &[Ed], &[Vd]);
    b.add(O::Vmovq, v0f(0x7e).p66().l0().w1(), &[Eq], &[Vq]);
    b.add(O::Vmovq, v0f(0x7e).pf3().l0(), &[Vdq], &[Wq]);
    b.add(O::Vmovq, v0f(0xd6).p66().l0(), &[Wq], &[Vq]);
    b.add(O::Vmovmskps, v0f(0x50).regs(), &[Gd], &[Ux]);
    b.add(O::Vmovmskpd, v0f(0x50).regs().p66(), &[Gd], &[Ux]);
    b.add(O::Vpmovmskb, v0f(0xd7).regs().p66(), &[Gd], &[Ux]);
    b.add(O::Vzeroupper, op2(0x77).vex().l0(), &[], &[]);
    b.add(O::Vzeroall, op2(0x77).vex().l1(), &[], &[]);
}

fn float(b: &mut Builder) {
    for (byte, [ps, pd, ss, sd]) in [
        (0x58, [O::Vaddps, O::Vaddpd, O::Vaddss, O::Vaddsd]),
        (0x59, [O::Vmulps, O::Vmulpd, O::Vmulss, O::Vmulsd]),
        (0x5c, [O::Vsubps, O::Vsubpd, O::Vsubss, O::Vsubsd]),
        (0x5d, [O::Vminps, O::Vminpd, O::Vminss, O::Vminsd]),
        (0x5e, [O::Vdivps, O::Vdivpd, O::Vdivss, O::Vdivsd]),
        (0x5f, [O::Vmaxps, O::Vmaxpd, O::Vmaxss, O::Vmaxsd]),
    ] {
        b.add(ps, v0f(byte), &[Vx], &[Hx, Wx]);
        b.add(pd, v0f(byte).p66(), &[Vx], &[Hx, Wx]);
        b.add(ss, v0f(byte).pf3(), &[Vdq], &[Hdq, Wss]);
        b.add(sd, v0f(byte).pf2(), &[Vdq], &[Hdq, Wsd]);
    }
    b.add(O::Vsqrtps, v0f(0x51), &[Vx], &[Wx]);
    b.add(O::Vsqrtpd, v0f(0x51).p66(), &[Vx], &[Wx]);
    b.add(O::Vsqrtss, v0f(0x51).pf3(), &[Vdq], &[Hdq, Wss]);
    b.add(O::Vsqrtsd, v0f(0x51).pf2(), &[Vdq], &[Hdq, Wsd]);
    for (byte, ps, pd) in [
        (0x14, O::Vunpcklps, O::Vunpcklpd),
        (0x15, O::Vunpckhps, O::Vunpckhpd),
        (0x54, O::Vandps, O::Vandpd),
        (0x55, O::Vandnps, O::Vandnpd),
        (0x56, O::Vorps, O::Vorpd),
        (0x57, O::Vxorps, O::Vxorpd),
    ] {
        b.add(ps, v0f(byte), &[Vx], &[Hx, Wx]);
        b.add(pd, v0f(byte).p66(), &[Vx], &[Hx, Wx]);
    }
    b.add(O::Vshufps, v0f(0xc6), &[Vx], &[Hx, Wx, Ib]);
    b.add(O::Vshufpd, v0f(0xc6).p66(), &[Vx], &[Hx, Wx, Ib]);
    b.add(O::Vcmpps, v0f(0xc2), &[Vx], &[Hx, Wx, Ib]);
    b.add(O::Vcmppd, v0f(0xc2).p66(), &[Vx], &[Hx, Wx, Ib]);
    b.add(O::Vcmpss, v0f(0xc2).pf3(), &[Vdq], &[Hdq, Wss, Ib]);
    b.add(O::Vcmpsd, v0f(0xc2).pf2(), &[Vdq], &[Hdq, Wsd, Ib]);
    b.add(O::Vcvtps2pd, v0f(0x5a), &[Vx], &[Wh]);
    b.add(O::Vcvtpd2ps, v0f(0x5a).p66(), &[Vh], &[Wx]);
    b.add(O::Vcvtss2sd, v0f(0x5a).pf3(), &[Vdq], &[Hdq, Wss]);
    b.add(O::Vcvtsd2ss, v0f(0x5a).pf2(), &[Vdq], &[Hdq, Wsd]);
    b.add(O::Vcvtdq2ps, v0f(0x5b), &[Vx], &[Wx]);
    b.add(O::Vcvtps2dq, v0f(0x5b).p66(), &[Vx], &[Wx]);
    b.add(O::Vcvttps2dq, v0f(0x5b).pf3(), &[Vx], &[Wx]);
    b.add(O::Vcvtsi2ss, v0f(0x2a).pf3(), &[Vdq], &[Hdq, Ey]);
    b.add(O::Vcvtsi2sd, v0f(0x2a).pf2(), &[Vdq], &[Hdq, Ey]);
    b.add(O::Vcvttss2si, v0f(0x2c).pf3(), &[Gy], &[Wss]);
    b.add(O::Vcvttsd2si, v0f(0x2c).pf2(), &[Gy], &[Wsd]);
    b.add(O::Vucomiss, v0f(0x2e), &[], &[Vss, Wss]);
    b.add(O::Vucomisd, v0f(0x2e).p66(), &[], &[Vsd, Wsd]);
    b.add(O::Vcomiss, v0f(0x2f), &[], &[Vss, Wss]);
    b.add(O::Vcomisd, v0f(0x2f).p66(), &[], &[Vsd, Wsd]);
}

fn integer(b: &mut Builder) {
    for (byte, op) in [
        (0xfc, O::Vpaddb),
        (0xfd, O::Vpaddw),
        (0xfe, O::Vpaddd),
        (0xd4, O::Vpaddq),
        (0xf8, O::Vpsubb),
        (0xf9, O::Vpsubw),
        (0xfa, O::Vpsubd),
        (0xfb, O::Vpsubq),
        (0xdb, O::Vpand),
        (0xdf, O::Vpandn),
        (0xeb, O::Vpor),
        (0xef, O::Vpxor),
        (0x74, O::Vpcmpeqb),
        (0x75, O::Vpcmpeqw),
        (0x76, O::Vpcmpeqd),
        (0x64, O::Vpcmpgtb),
        (0x65, O::Vpcmpgtw),
        (0x66, O::Vpcmpgtd),
        (0xd5, O::Vpmullw),
        (0xda, O::Vpminub),
        (0xde, O::Vpmaxub),
    ] {
        b.add(op, v0f(byte).p66(), &[Vx], &[Hx, Wx]);
    }
    b.add(O::Vpshufd, v0f(0x70).p66(), &[Vx], &[Wx, Ib]);
    b.add(O::Vpshufb, v38(0x00).p66(), &[Vx], &[Hx, Wx]);
    b.add(O::Vptest, v38(0x17).p66(), &[], &[Vx, Wx]);
}

fn permute(b: &mut Builder) {
    b.add(O::Vpbroadcastb, v38(0x78).p66().w0(), &[Vx], &[Wb]);
    b.add(O::Vpbroadcastw, v38(0x79).p66().w0(), &[Vx], &[Ww]);
    b.add(O::Vpbroadcastd, v38(0x58).p66().w0(), &[Vx], &[Wd]);
    b.add(O::Vpbroadcastq, v38(0x59).p66().w0(), &[Vx], &[Wq]);
    b.add(O::Vbroadcastss, v38(0x18).p66().w0(), &[Vx], &[Wd]);
    b.add(O::Vbroadcastsd, v38(0x19).p66().w0().l1(), &[Vqq], &[Wq]);
    b.add(O::Vbroadcastf128, v38(0x1a).p66().w0().l1().mem(), &[Vqq], &[Mdq]);
    b.add(O::Vpermilps, v38(0x0c).p66().w0(), &[Vx], &[Hx, Wx]);
    b.add(O::Vpermd, v38(0x36).p66().w0().l1(), &[Vqq], &[Hqq, Wqq]);
    b.add(O::Vmaskmovps, v38(0x2c).p66().w0().mem(), &[Vx], &[Hx, Mx]);
    b.add(O::Vmaskmovps, v38(0x2e).p66().w0().mem(), &[Mx], &[Hx, Vx]);
    b.add(O::Vpmaskmovd, v38(0x8c).p66().w0().mem(), &[Vx], &[Hx, Mx]);
    b.add(O::Vpmaskmovd, v38(0x8e).p66().w0().mem(), &[Mx], &[Hx, Vx]);

    b.add(O::Vperm2f128, v3a(0x06).p66().w0().l1(), &[Vqq], &[Hqq, Wqq, Ib]);
    b.add(O::Vinsertf128, v3a(0x18).p66().w0().l1(), &[Vqq], &[Hqq, Wdq, Ib]);
    b.add(O::Vextractf128, v3a(0x19).p66().w0().l1(), &[Wdq], &[Vqq, Ib]);
    b.add(O::Vinserti128, v3a(0x38).p66().w0().l1(), &[Vqq], &[Hqq, Wdq, Ib]);
    b.add(O::Vextracti128, v3a(0x39).p66().w0().l1(), &[Wdq], &[Vqq, Ib]);
    b.add(O::Vperm2i128, v3a(0x46).p66().w0().l1(), &[Vqq], &[Hqq, Wqq, Ib]);
    b.add(O::Vpermq, v3a(0x00).p66().w1().l1(), &[Vqq], &[Wqq, Ib]);
    b.add(O::Vpblendd, v3a(0x02).p66().w0(), &[Vx], &[Hx, Wx, Ib]);
    b.add(O::Vblendvps, v3a(0x4a).p66().w0(), &[Vx], &[Hx, Wx, Lx]);
    b.add(O::Vblendvpd, v3a(0x4b).p66().w0(), &[Vx], &[Hx, Wx, Lx]);
    b.add(O::Vpblendvb, v3a(0x4c).p66().w0(), &[Vx], &[Hx, Wx, Lx]);
}

fn gathers(b: &mut Builder) {
    b.add(O::Vpgatherdd, v38(0x90).p66().w0().mem(), &[Vx, Hx], &[vsib(4), Hx]);
    b.add(O::Vpgatherdq, v38(0x90).p66().w1().mem(), &[Vx, Hx], &[vsib_half(8), Hx]);
    b.add(O::Vpgatherqd, v38(0x91).p66().w0().mem(), &[Vh, Hh], &[vsib(4), Hh]);
    b.add(O::Vpgatherqq, v38(0x91).p66().w1().mem(), &[Vx, Hx], &[vsib(8), Hx]);
    b.add(O::Vgatherdps, v38(0x92).p66().w0().mem(), &[Vx, Hx], &[vsib(4), Hx]);
    b.add(O::Vgatherdpd, v38(0x92).p66().w1().mem(), &[Vx, Hx], &[vsib_half(8), Hx]);
    b.add(O::Vgatherqps, v38(0x93).p66().w0().mem(), &[Vh, Hh], &[vsib(4), Hh]);
    b.add(O::Vgatherqpd, v38(0x93).p66().w1().mem(), &[Vx, Hx], &[vsib(8), Hx]);
}

fn fma(b: &mut Builder) {
    for (byte, ps, pd) in [
        (0x98, O::Vfmadd132ps, O::Vfmadd132pd),
        (0xa8, O::Vfmadd213ps, O::Vfmadd213pd),
        (0xb8, O::Vfmadd231ps, O::Vfmadd231pd),
    ] {
        b.add(ps, v38(byte).p66().w0(), &[Vx], &[Hx, Wx, Vx]);
        b.add(pd, v38(byte).p66().w1(), &[Vx], &[Hx, Wx, Vx]);
    }
    for (byte, ss, sd) in [
        (0x99, O::Vfmadd132ss, O::Vfmadd132sd),
        (0xa9, O::Vfmadd213ss, O::Vfmadd213sd),
        (0xb9, O::Vfmadd231ss, O::Vfmadd231sd),
    ] {
        b.add(ss, v38(byte).p66().w0(), &[Vdq], &[Hdq, Wss, Vdq]);
        b.add(sd, v38(byte).p66().w1(), &[Vdq], &[Hdq, Wsd, Vdq]);
    }
    b.add(O::Vfmsub231ps, v38(0xba).p66().w0(), &[Vx], &[Hx, Wx, Vx]);
    b.add(O::Vfnmadd231ps, v38(0xbc).p66().w0(), &[Vx], &[Hx, Wx, Vx]);
}

fn bmi(b: &mut Builder) {
    b.add(O::Andn, v38(0xf2).l0(), &[Gy], &[By, Ey]);
    b.add(O::Blsr, op38(0xf3).vex().ext(1).l0(), &[By], &[Ey]);
    b.add(O::Blsmsk, op38(0xf3).vex().ext(2).l0(), &[By], &[Ey]);
    b.add(O::Blsi, op38(0xf3).vex().ext(3).l0(), &[By], &[Ey]);
    b.add(O::Bzhi, v38(0xf5).l0(), &[Gy], &[Ey, By]);
    b.add(O::Pext, v38(0xf5).pf3().l0(), &[Gy], &[By, Ey]);
    b.add(O::Pdep, v38(0xf5).pf2().l0(), &[Gy], &[By, Ey]);
    b.add(O::Mulx, v38(0xf6).pf2().l0(), &[Gy, By], &[Ey, rDXy]);
    b.add(O::Bextr, v38(0xf7).l0(), &[Gy], &[Ey, By]);
    b.add(O::Shlx, v38(0xf7).p66().l0(), &[Gy], &[Ey, By]);
    b.add(O::Sarx, v38(0xf7).pf3().l0(), &[Gy], &[Ey, By]);
    b.add(O::Shrx, v38(0xf7).pf2().l0(), &[Gy], &[Ey, By]);
    b.add(O::Rorx, v3a(0xf0).pf2().l0(), &[Gy], &[Ey, Ib]);
}

fn opmask(b: &mut Builder) {
    for (pp66, w, op, size) in [
        (false, false, O::Kmovw, 2),
        (true, false, O::Kmovb, 1),
        (true, true, O::Kmovd, 4),
        (false, true, O::Kmovq, 8),
    ] {
        let f = |byte: u8| {
            let f = v0f(byte).l0();
            let f = if pp66 { f.p66() } else { f };
            if w {
                f.w1()
            } else {
                f.w0()
            }
        };
        b.add(op, f(0x90), &[KG], &[k_mem(size)]);
        b.add(op, f(0x91).mem(), &[k_mem(size)], &[KG]);
    }
    b.add(O::Kmovw, v0f(0x92).regs().l0().w0(), &[KG], &[Rd]);
    b.add(O::Kmovb, v0f(0x92).regs().p66().l0().w0(), &[KG], &[Rd]);
    b.add(O::Kmovd, v0f(0x92).regs().pf2().l0().w0(), &[KG], &[Rd]);
    b.add(O::Kmovq, v0f(0x92).regs().pf2().l0().w1(), &[KG], &[Rq]);
    b.add(O::Kmovw, v0f(0x93).regs().l0().w0(), &[Gd], &[KR]);
    b.add(O::Kmovb, v0f(0x93).regs().p66().l0().w0(), &[Gd], &[KR]);
    b.add(O::Kmovd, v0f(0x93).regs().pf2().l0().w0(), &[Gd], &[KR]);
    b.add(O::Kmovq, v0f(0x93).regs().pf2().l0().w1(), &[Gq], &[KR]);
    b.add(O::Kandw, v0f(0x41).regs().l1().w0(), &[KG], &[KH, KR]);
    b.add(O::Knotw, v0f(0x44).regs().l0().w0(), &[KG], &[KR]);
    b.add(O::Korw, v0f(0x45).regs().l1().w0(), &[KG], &[KH, KR]);
    b.add(O::Kxorw, v0f(0x47).regs().l1().w0(), &[KG], &[KH, KR]);
    b.add(O::Kortestw, v0f(0x98).regs().l0().w0(), &[], &[KG, KR]);
}
