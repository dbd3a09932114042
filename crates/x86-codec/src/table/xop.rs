//! AMD XOP, TBM and LWP instructions (`8F` escape).

use super::slots::*;
use super::{xop, Builder, Map};
use crate::opcode::Opcode as O;

pub(super) fn add(b: &mut Builder) {
    b.add(O::Vpcmov, xop(Map::Xop8, 0xa2).w0(), &[Vx], &[Hx, Wx, Lx]);
    b.add(O::Vpcmov, xop(Map::Xop8, 0xa2).w1(), &[Vx], &[Hx, Lx, Wx]);
    b.add(O::Vpmacsdd, xop(Map::Xop8, 0x9e).w0().l0(), &[Vdq], &[Hdq, Wdq, Ldq]);
    b.add(O::Vprotb, xop(Map::Xop8, 0xc0).w0().l0(), &[Vdq], &[Wdq, Ib]);
    b.add(O::Vpcomb, xop(Map::Xop8, 0xcc).w0().l0(), &[Vdq], &[Hdq, Wdq, Ib]);
    b.add(O::Vprotb, xop(Map::Xop9, 0x90).w0().l0(), &[Vdq], &[Wdq, Hdq]);
    b.add(O::Vprotb, xop(Map::Xop9, 0x90).w1().l0(), &[Vdq], &[Hdq, Wdq]);
    b.add(O::Vfrczps, xop(Map::Xop9, 0x80).w0(), &[Vx], &[Wx]);
    b.add(O::Blcfill, xop(Map::Xop9, 0x01).ext(1).l0(), &[By], &[Ey]);
    b.add(O::Lwpins, xop(Map::XopA, 0x12).ext(0).l0(), &[], &[By, Ed, Id]);
    b.add(O::Lwpval, xop(Map::XopA, 0x12).ext(1).l0(), &[], &[By, Ed, Id]);
}
