//! Primary one-byte opcode map.

use super::slots::*;
use super::{op1, Builder};
use crate::opcode::{Condition, Opcode as O};
use crate::register::Register;

const ALU: [O; 8] = [O::Add, O::Or, O::Adc, O::Sbb, O::And, O::Sub, O::Xor, O::Cmp];
const SHIFTS: [(u8, O); 7] = [
    (0, O::Rol),
    (1, O::Ror),
    (2, O::Rcl),
    (3, O::Rcr),
    (4, O::Shl),
    (5, O::Shr),
    (7, O::Sar),
];

pub(super) fn add(b: &mut Builder) {
    alu(b);
    stack_and_segments(b);
    moves(b);
    strings_and_io(b);
    branches(b);
    groups(b);
    misc(b);
}

fn alu(b: &mut Builder) {
    for (i, &op) in ALU.iter().enumerate() {
        let base = (i as u8) * 8;
        let ext = i as u8;
        if op == O::Cmp {
            b.add(op, op1(base).r(), &[], &[Eb, Gb]);
            b.add(op, op1(base + 1).r(), &[], &[Ev, Gv]);
            b.add(op, op1(base + 2).r(), &[], &[Gb, Eb]);
            b.add(op, op1(base + 3).r(), &[], &[Gv, Ev]);
            b.add(op, op1(base + 4), &[], &[AL, Ib]);
            b.add(op, op1(base + 5), &[], &[eAX, Iz]);
            b.add(op, op1(0x80).ext(ext), &[], &[Eb, Ib]);
            b.add(op, op1(0x81).ext(ext), &[], &[Ev, Iz]);
            b.add(op, op1(0x83).ext(ext), &[], &[Ev, Ib]);
            b.add(op, op1(0x82).ext(ext).only32(), &[], &[Eb, Ib]);
            continue;
        }
        b.add(op, op1(base).r(), &[Eb], &[Gb, Eb]);
        b.add(op, op1(base + 1).r(), &[Ev], &[Gv, Ev]);
        b.add(op, op1(base + 2).r(), &[Gb], &[Eb, Gb]);
        b.add(op, op1(base + 3).r(), &[Gv], &[Ev, Gv]);
        b.add(op, op1(base + 4), &[AL], &[Ib, AL]);
        b.add(op, op1(base + 5), &[eAX], &[Iz, eAX]);
        b.add(op, op1(0x80).ext(ext), &[Eb], &[Ib, Eb]);
        b.add(op, op1(0x81).ext(ext), &[Ev], &[Iz, Ev]);
        b.add(op, op1(0x83).ext(ext), &[Ev], &[Ib, Ev]);
        b.add(op, op1(0x82).ext(ext).only32(), &[Eb], &[Ib, Eb]);
    }
    b.add(O::Daa, op1(0x27).only32(), &[AL], &[AL]);
    b.add(O::Das, op1(0x2f).only32(), &[AL], &[AL]);
    b.add(O::Aaa, op1(0x37).only32(), &[AX], &[AL, AX]);
    b.add(O::Aas, op1(0x3f).only32(), &[AX], &[AL, AX]);
    b.add(O::Inc, op1(0x40).plus().only32(), &[Zv], &[Zv]);
    b.add(O::Dec, op1(0x48).plus().only32(), &[Zv], &[Zv]);
    b.add(O::Imul, op1(0x69).r(), &[Gv], &[Ev, Iz]);
    b.add(O::Imul, op1(0x6b).r(), &[Gv], &[Ev, Ib]);
    b.add(O::Test, op1(0x84).r(), &[], &[Eb, Gb]);
    b.add(O::Test, op1(0x85).r(), &[], &[Ev, Gv]);
    b.add(O::Test, op1(0xa8), &[], &[AL, Ib]);
    b.add(O::Test, op1(0xa9), &[], &[eAX, Iz]);
    b.add(O::Aam, op1(0xd4).only32(), &[AX], &[Ib, AX]);
    b.add(O::Aad, op1(0xd5).only32(), &[AX], &[Ib, AX]);
    b.add(O::Salc, op1(0xd6).only32(), &[AL], &[]);
}

fn stack_and_segments(b: &mut Builder) {
    for (byte, seg) in [
        (0x06, Register::ES),
        (0x0e, Register::CS),
        (0x16, Register::SS),
        (0x1e, Register::DS),
    ] {
        b.add(O::Push, op1(byte).only32(), &[rSP, PushS], &[sreg(seg), rSP]);
        if seg != Register::CS {
            b.add(O::Pop, op1(byte + 1).only32(), &[sreg(seg), rSP], &[rSP, PopS]);
        }
    }
    b.add(O::Push, op1(0x50).plus(), &[rSP, PushS], &[Zs, rSP]);
    b.add(O::Pop, op1(0x58).plus(), &[Zs, rSP], &[rSP, PopS]);
    b.add(O::Push, op1(0xff).ext(6), &[rSP, PushS], &[Es, rSP]);
    b.add(O::Pop, op1(0x8f).ext(0), &[Es, rSP], &[rSP, PopS]);
    b.add(O::PushImm, op1(0x68), &[rSP, PushS], &[Iz, rSP]);
    b.add(O::PushImm, op1(0x6a), &[rSP, PushS], &[Ib, rSP]);
    b.add(
        O::Pusha,
        op1(0x60).only32(),
        &[rSP, PushA],
        &[
            rSP,
            gpr_z(0),
            gpr_z(1),
            gpr_z(2),
            gpr_z(3),
            gpr_z(5),
            gpr_z(6),
            gpr_z(7),
        ],
    );
    b.add(
        O::Popa,
        op1(0x61).only32(),
        &[
            rSP,
            gpr_z(7),
            gpr_z(6),
            gpr_z(5),
            gpr_z(3),
            gpr_z(2),
            gpr_z(1),
            gpr_z(0),
        ],
        &[rSP, PopA],
    );
    b.add(O::Pushf, op1(0x9c), &[rSP, PushS], &[rSP]);
    b.add(O::Popf, op1(0x9d), &[rSP], &[rSP, PopS]);
    b.add(O::Enter, op1(0xc8), &[rSP, PushS, rBP], &[Iw, Ib, rSP, rBP]);
    b.add(O::Leave, op1(0xc9), &[rSP, rBP], &[rBP, rSP, FrameTop]);
    b.add(O::Les, op1(0xc4).r().mem().only32(), &[Gz, sreg(Register::ES)], &[Mp]);
    b.add(O::Lds, op1(0xc5).r().mem().only32(), &[Gz, sreg(Register::DS)], &[Mp]);
    b.add(O::Bound, op1(0x62).r().mem().only32(), &[], &[Gv, Ma]);
    b.add(O::Arpl, op1(0x63).r().only32(), &[Ew], &[Gw, Ew]);
    b.add(O::Movsxd, op1(0x63).r().only64(), &[Gv], &[Ed]);
}

fn moves(b: &mut Builder) {
    b.add(O::Mov, op1(0x88).r(), &[Eb], &[Gb]);
    b.add(O::Mov, op1(0x89).r(), &[Ev], &[Gv]);
    b.add(O::Mov, op1(0x8a).r(), &[Gb], &[Eb]);
    b.add(O::Mov, op1(0x8b).r(), &[Gv], &[Ev]);
    b.add(O::Mov, op1(0xa0), &[AL], &[Ob]);
    b.add(O::Mov, op1(0xa1), &[eAX], &[Ov]);
    b.add(O::Mov, op1(0xa2), &[Ob], &[AL]);
    b.add(O::Mov, op1(0xa3), &[Ov], &[eAX]);
    b.add(O::Mov, op1(0xb0).plus(), &[Zb], &[Ib]);
    b.add(O::Mov, op1(0xb8).plus(), &[Zv], &[Iv]);
    b.add(O::Mov, op1(0xc6).ext(0), &[Eb], &[Ib]);
    b.add(O::Mov, op1(0xc7).ext(0), &[Ev], &[Iz]);
    b.add(O::MovSeg, op1(0x8c).r(), &[Esw], &[Sw]);
    b.add(O::MovSeg, op1(0x8e).r(), &[Sw], &[Esw]);
    b.add(O::Lea, op1(0x8d).r().mem(), &[Gv], &[M]);
    b.add(O::Xchg, op1(0x86).r(), &[Eb, Gb], &[Eb, Gb]);
    b.add(O::Xchg, op1(0x87).r(), &[Ev, Gv], &[Ev, Gv]);
    b.add(O::Nop, op1(0x90).rex_b0(), &[], &[]);
    b.add(O::Xchg, op1(0x90).plus(), &[Zv, eAX], &[Zv, eAX]);
    b.add(O::Pause, op1(0x90).pf3(), &[], &[]);
    b.add(O::Cwde, op1(0x98), &[eAX], &[eAX]);
    b.add(O::Cdq, op1(0x99), &[eDX], &[eAX]);
    b.add(O::Sahf, op1(0x9e), &[], &[AH]);
    b.add(O::Lahf, op1(0x9f), &[AH], &[]);
    b.add(O::Xlat, op1(0xd7), &[AL], &[XlatB]);
}

fn strings_and_io(b: &mut Builder) {
    b.add(O::Ins, op1(0x6c), &[Yb], &[DX]);
    b.add(O::Ins, op1(0x6d), &[Yz], &[DX]);
    b.add(O::Outs, op1(0x6e), &[], &[Xb, DX]);
    b.add(O::Outs, op1(0x6f), &[], &[Xz, DX]);
    b.add(O::Movs, op1(0xa4), &[Yb], &[Xb]);
    b.add(O::Movs, op1(0xa5), &[Yv], &[Xv]);
    b.add(O::Cmps, op1(0xa6), &[], &[Xb, Yb]);
    b.add(O::Cmps, op1(0xa7), &[], &[Xv, Yv]);
    b.add(O::Stos, op1(0xaa), &[Yb], &[AL]);
    b.add(O::Stos, op1(0xab), &[Yv], &[eAX]);
    b.add(O::Lods, op1(0xac), &[AL], &[Xb]);
    b.add(O::Lods, op1(0xad), &[eAX], &[Xv]);
    b.add(O::Scas, op1(0xae), &[], &[AL, Yb]);
    b.add(O::Scas, op1(0xaf), &[], &[eAX, Yv]);
    b.add(O::In, op1(0xe4), &[AL], &[Ib]);
    b.add(O::In, op1(0xe5), &[zAX], &[Ib]);
    b.add(O::Out, op1(0xe6), &[], &[Ib, AL]);
    b.add(O::Out, op1(0xe7), &[], &[Ib, zAX]);
    b.add(O::In, op1(0xec), &[AL], &[DX]);
    b.add(O::In, op1(0xed), &[zAX], &[DX]);
    b.add(O::Out, op1(0xee), &[], &[DX, AL]);
    b.add(O::Out, op1(0xef), &[], &[DX, zAX]);
}

fn branches(b: &mut Builder) {
    for cc in Condition::ALL {
        b.add(O::jcc_short(cc), op1(0x70 + cc.code()), &[], &[Jb]);
    }
    b.add(O::Loopne, op1(0xe0), &[xCX], &[Jb, xCX]);
    b.add(O::Loope, op1(0xe1), &[xCX], &[Jb, xCX]);
    b.add(O::Loop, op1(0xe2), &[xCX], &[Jb, xCX]);
    b.add(O::Jecxz, op1(0xe3), &[], &[Jb, xCX]);
    b.add(O::Call, op1(0xe8), &[rSP, PushN], &[Jz, rSP]);
    b.add(O::Jmp, op1(0xe9), &[], &[Jz]);
    b.add(O::JmpFar, op1(0xea).only32(), &[], &[Ap]);
    b.add(O::JmpShort, op1(0xeb), &[], &[Jb]);
    b.add(O::CallFar, op1(0x9a).only32(), &[rSP, PushF], &[Ap, rSP]);
    b.add(O::Ret, op1(0xc2), &[rSP], &[Iw, rSP, PopN]);
    b.add(O::Ret, op1(0xc3), &[rSP], &[rSP, PopN]);
    b.add(O::RetFar, op1(0xca), &[rSP], &[Iw, rSP, PopF]);
    b.add(O::RetFar, op1(0xcb), &[rSP], &[rSP, PopF]);
    b.add(O::Int3, op1(0xcc), &[], &[]);
    b.add(O::Int, op1(0xcd), &[], &[Ib]);
    b.add(O::Into, op1(0xce).only32(), &[], &[]);
    b.add(O::Iret, op1(0xcf), &[rSP], &[rSP, PopI]);
    b.add(O::Int1, op1(0xf1), &[], &[]);
    b.add(O::CallInd, op1(0xff).ext(2), &[rSP, PushN], &[En, rSP]);
    b.add(O::CallFarInd, op1(0xff).ext(3).mem(), &[rSP, PushF], &[Mp, rSP]);
    b.add(O::JmpInd, op1(0xff).ext(4), &[], &[En]);
    b.add(O::JmpFarInd, op1(0xff).ext(5).mem(), &[], &[Mp]);
    b.add(O::Xabort, op1(0xc6).ext(7).rm(0), &[], &[Ib]);
    b.add(O::Xbegin, op1(0xc7).ext(7).rm(0), &[], &[Jz]);
}

fn groups(b: &mut Builder) {
    for (ext, op) in SHIFTS {
        b.add(op, op1(0xc0).ext(ext), &[Eb], &[Ib, Eb]);
        b.add(op, op1(0xc1).ext(ext), &[Ev], &[Ib, Ev]);
        b.add(op, op1(0xd0).ext(ext), &[Eb], &[One, Eb]);
        b.add(op, op1(0xd1).ext(ext), &[Ev], &[One, Ev]);
        b.add(op, op1(0xd2).ext(ext), &[Eb], &[CL, Eb]);
        b.add(op, op1(0xd3).ext(ext), &[Ev], &[CL, Ev]);
    }
    b.add(O::Test, op1(0xf6).ext(0), &[], &[Eb, Ib]);
    b.add(O::Test, op1(0xf7).ext(0), &[], &[Ev, Iz]);
    b.add(O::Not, op1(0xf6).ext(2), &[Eb], &[Eb]);
    b.add(O::Not, op1(0xf7).ext(2), &[Ev], &[Ev]);
    b.add(O::Neg, op1(0xf6).ext(3), &[Eb], &[Eb]);
    b.add(O::Neg, op1(0xf7).ext(3), &[Ev], &[Ev]);
    b.add(O::Mul, op1(0xf6).ext(4), &[AX], &[Eb, AL]);
    b.add(O::Mul, op1(0xf7).ext(4), &[eDX, eAX], &[Ev, eAX]);
    b.add(O::Imul, op1(0xf6).ext(5), &[AX], &[Eb, AL]);
    b.add(O::Imul, op1(0xf7).ext(5), &[eDX, eAX], &[Ev, eAX]);
    b.add(O::Div, op1(0xf6).ext(6), &[AH, AL], &[Eb, AX]);
    b.add(O::Div, op1(0xf7).ext(6), &[eDX, eAX], &[Ev, eDX, eAX]);
    b.add(O::Idiv, op1(0xf6).ext(7), &[AH, AL], &[Eb, AX]);
    b.add(O::Idiv, op1(0xf7).ext(7), &[eDX, eAX], &[Ev, eDX, eAX]);
    b.add(O::Inc, op1(0xfe).ext(0), &[Eb], &[Eb]);
    b.add(O::Dec, op1(0xfe).ext(1), &[Eb], &[Eb]);
    b.add(O::Inc, op1(0xff).ext(0), &[Ev], &[Ev]);
    b.add(O::Dec, op1(0xff).ext(1), &[Ev], &[Ev]);
}

fn misc(b: &mut Builder) {
    b.add(O::Fwait, op1(0x9b), &[], &[]);
    b.add(O::Hlt, op1(0xf4), &[], &[]);
    b.add(O::Cmc, op1(0xf5), &[], &[]);
    b.add(O::Clc, op1(0xf8), &[], &[]);
    b.add(O::Stc, op1(0xf9), &[], &[]);
    b.add(O::Cli, op1(0xfa), &[], &[]);
    b.add(O::Sti, op1(0xfb), &[], &[]);
    b.add(O::Cld, op1(0xfc), &[], &[]);
    b.add(O::Std, op1(0xfd), &[], &[]);
}
