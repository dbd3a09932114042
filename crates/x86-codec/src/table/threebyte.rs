//! `0F 38`, `0F 3A` and the 3DNow! suffix map.

use super::slots::*;
use super::{now3d, op38, op3a, Builder};
use crate::opcode::Opcode as O;

pub(super) fn add(b: &mut Builder) {
    map38(b);
    map3a(b);
    amd3dnow(b);
}

fn map38(b: &mut Builder) {
    for (byte, op) in [
        (0x00, O::Pshufb),
        (0x01, O::Phaddw),
        (0x02, O::Phaddd),
        (0x04, O::Pmaddubsw),
        (0x08, O::Psignb),
        (0x0b, O::Pmulhrsw),
        (0x1c, O::Pabsb),
        (0x1d, O::Pabsw),
        (0x1e, O::Pabsd),
    ] {
        let unary = matches!(op, O::Pabsb | O::Pabsw | O::Pabsd);
        if unary {
            b.add(op, op38(byte).r(), &[Pq], &[Qq]);
            b.add(op, op38(byte).r().p66(), &[Vdq], &[Wdq]);
        } else {
            b.add(op, op38(byte).r(), &[Pq], &[Qq, Pq]);
            b.add(op, op38(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
        }
    }
    for (byte, op) in [(0x10, O::Pblendvb), (0x14, O::Blendvps), (0x15, O::Blendvpd)] {
        b.add(op, op38(byte).r().p66(), &[Vdq], &[Wdq, XMM0, Vdq]);
    }
    b.add(O::Ptest, op38(0x17).r().p66(), &[], &[Vdq, Wdq]);
    for (byte, op) in [
        (0x20, O::Pmovsxbw),
        (0x25, O::Pmovsxdq),
        (0x30, O::Pmovzxbw),
        (0x35, O::Pmovzxdq),
    ] {
        b.add(op, op38(byte).r().p66(), &[Vdq], &[Wq]);
    }
    for (byte, op) in [
        (0x28, O::Pmuldq),
        (0x29, O::Pcmpeqq),
        (0x2b, O::Packusdw),
        (0x37, O::Pcmpgtq),
        (0x38, O::Pminsb),
        (0x39, O::Pminsd),
        (0x3c, O::Pmaxsb),
        (0x3d, O::Pmaxsd),
        (0x40, O::Pmulld),
        (0xdc, O::Aesenc),
        (0xdd, O::Aesenclast),
        (0xde, O::Aesdec),
        (0xdf, O::Aesdeclast),
    ] {
        b.add(op, op38(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
    }
    b.add(O::Movntdqa, op38(0x2a).r().mem().p66(), &[Vdq], &[Mdq]);
    b.add(O::Aesimc, op38(0xdb).r().p66(), &[Vdq], &[Wdq]);

    b.add(O::Movbe, op38(0xf0).r().mem(), &[Gv], &[Mv]);
    b.add(O::Movbe, op38(0xf1).r().mem(), &[Mv], &[Gv]);
    b.add(O::Crc32, op38(0xf0).r().pf2(), &[Gy], &[Eb, Gy]);
    b.add(O::Crc32, op38(0xf1).r().pf2(), &[Gy], &[Ev, Gy]);
    b.add(O::Adcx, op38(0xf6).r().p66(), &[Gy], &[Ey, Gy]);
    b.add(O::Adox, op38(0xf6).r().pf3(), &[Gy], &[Ey, Gy]);
}

fn map3a(b: &mut Builder) {
    for (byte, op) in [
        (0x08, O::Roundps),
        (0x09, O::Roundpd),
        (0x0a, O::Roundss),
        (0x0b, O::Roundsd),
    ] {
        b.add(op, op3a(byte).r().p66(), &[Vdq], &[Wdq, Ib]);
    }
    for (byte, op) in [
        (0x0c, O::Blendps),
        (0x0d, O::Blendpd),
        (0x0e, O::Pblendw),
        (0x40, O::Dpps),
        (0x41, O::Dppd),
        (0x42, O::Mpsadbw),
        (0x44, O::Pclmulqdq),
    ] {
        b.add(op, op3a(byte).r().p66(), &[Vdq], &[Wdq, Ib, Vdq]);
    }
    b.add(O::Palignr, op3a(0x0f).r(), &[Pq], &[Qq, Ib, Pq]);
    b.add(O::Palignr, op3a(0x0f).r().p66(), &[Vdq], &[Wdq, Ib, Vdq]);
    b.add(O::Pextrb, op3a(0x14).r().p66(), &[Eb], &[Vdq, Ib]);
    b.add(O::Pextrd, op3a(0x16).r().p66().w0(), &[Ed], &[Vdq, Ib]);
    b.add(O::Pextrq, op3a(0x16).r().p66().w1(), &[Eq], &[Vdq, Ib]);
    b.add(O::Extractps, op3a(0x17).r().p66(), &[Ed], &[Vdq, Ib]);
    b.add(O::Pinsrb, op3a(0x20).r().p66(), &[Vdq], &[Eb, Ib, Vdq]);
    b.add(O::Insertps, op3a(0x21).r().p66(), &[Vdq], &[Wd, Ib, Vdq]);
    b.add(O::Pinsrd, op3a(0x22).r().p66().w0(), &[Vdq], &[Ed, Ib, Vdq]);
    b.add(O::Pinsrq, op3a(0x22).r().p66().w1(), &[Vdq], &[Eq, Ib, Vdq]);
    b.add(O::Pcmpestrm, op3a(0x60).r().p66(), &[XMM0], &[Vdq, Wdq, Ib, EAX, EDX]);
    b.add(O::Pcmpestri, op3a(0x61).r().p66(), &[ECX], &[Vdq, Wdq, Ib, EAX, EDX]);
    b.add(O::Pcmpistrm, op3a(0x62).r().p66(), &[XMM0], &[Vdq, Wdq, Ib]);
    b.add(O::Pcmpistri, op3a(0x63).r().p66(), &[ECX], &[Vdq, Wdq, Ib]);
    b.add(O::Aeskeygenassist, op3a(0xdf).r().p66(), &[Vdq], &[Wdq, Ib]);
}

fn amd3dnow(b: &mut Builder) {
    for (suffix, op) in [
        (0x0c, O::Pi2fw),
        (0x0d, O::Pi2fd),
        (0x1c, O::Pf2iw),
        (0x1d, O::Pf2id),
        (0x8a, O::Pfnacc),
        (0x8e, O::Pfpnacc),
        (0x90, O::Pfcmpge),
        (0x94, O::Pfmin),
        (0x96, O::Pfrcp),
        (0x97, O::Pfrsqrt),
        (0x9a, O::Pfsub),
        (0x9e, O::Pfadd),
        (0xa0, O::Pfcmpgt),
        (0xa4, O::Pfmax),
        (0xa6, O::Pfrcpit1),
        (0xa7, O::Pfrsqit1),
        (0xaa, O::Pfsubr),
        (0xae, O::Pfacc),
        (0xb0, O::Pfcmpeq),
        (0xb4, O::Pfmul),
        (0xb6, O::Pfrcpit2),
        (0xb7, O::Pmulhrw),
        (0xbb, O::Pswapd),
        (0xbf, O::Pavgusb),
    ] {
        let unary = matches!(
            op,
            O::Pi2fw | O::Pi2fd | O::Pf2iw | O::Pf2id | O::Pfrcp | O::Pfrsqrt | O::Pswapd
        );
        if unary {
            b.add(op, now3d(suffix), &[Pq], &[Qq]);
        } else {
            b.add(op, now3d(suffix), &[Pq], &[Qq, Pq]);
        }
    }
}
