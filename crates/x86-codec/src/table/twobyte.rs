//! `0F` map: system, integer extensions, MMX, SSE through SSE3.

use super::slots::*;
use super::{op2, Builder, Slot};
use crate::opcode::{Condition, Opcode as O};
use crate::register::Register;

pub(super) fn add(b: &mut Builder) {
    system(b);
    integer(b);
    state(b);
    sse_moves(b);
    sse_arith(b);
    sse_convert(b);
    mmx(b);
    mpx(b);
}

/// MMX form without a prefix and the SSE2 form with `66`.
fn mmx_sse(b: &mut Builder, op: O, byte: u8) {
    b.add(op, op2(byte).r(), &[Pq], &[Qq, Pq]);
    b.add(op, op2(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
}

/// Packed and scalar single/double forms of a binary float operation.
fn float4(b: &mut Builder, byte: u8, [ps, pd, ss, sd]: [O; 4]) {
    b.add(ps, op2(byte).r(), &[Vdq], &[Wdq, Vdq]);
    b.add(pd, op2(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(ss, op2(byte).r().pf3(), &[Vss], &[Wss, Vss]);
    b.add(sd, op2(byte).r().pf2(), &[Vsd], &[Wsd, Vsd]);
}

fn packed2(b: &mut Builder, byte: u8, ps: O, pd: O) {
    b.add(ps, op2(byte).r(), &[Vdq], &[Wdq, Vdq]);
    b.add(pd, op2(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
}

fn system(b: &mut Builder) {
    b.add(O::Sldt, op2(0x00).ext(0), &[Ew], &[]);
    b.add(O::Str, op2(0x00).ext(1), &[Ew], &[]);
    b.add(O::Lldt, op2(0x00).ext(2), &[], &[Ew]);
    b.add(O::Ltr, op2(0x00).ext(3), &[], &[Ew]);
    b.add(O::Verr, op2(0x00).ext(4), &[], &[Ew]);
    b.add(O::Verw, op2(0x00).ext(5), &[], &[Ew]);

    b.add(O::Sgdt, op2(0x01).ext(0).mem(), &[Ms], &[]);
    b.add(O::Sidt, op2(0x01).ext(1).mem(), &[Ms], &[]);
    b.add(O::Lgdt, op2(0x01).ext(2).mem(), &[], &[Ms]);
    b.add(O::Lidt, op2(0x01).ext(3).mem(), &[], &[Ms]);
    b.add(O::Smsw, op2(0x01).ext(4), &[Ew], &[]);
    b.add(O::Lmsw, op2(0x01).ext(6), &[], &[Ew]);
    b.add(O::Invlpg, op2(0x01).ext(7).mem(), &[], &[Mb]);
    let fixed = |b: &mut Builder, modrm: u8, op: O, d: &[Slot], s: &[Slot]| {
        b.add(op, op2(0x01).ext((modrm >> 3) & 7).rm(modrm & 7), d, s);
    };
    fixed(b, 0xc1, O::Vmcall, &[], &[]);
    fixed(b, 0xc2, O::Vmlaunch, &[], &[]);
    fixed(b, 0xc3, O::Vmresume, &[], &[]);
    fixed(b, 0xc4, O::Vmxoff, &[], &[]);
    fixed(b, 0xc8, O::Monitor, &[], &[xAX, ECX, EDX]);
    fixed(b, 0xc9, O::Mwait, &[], &[EAX, ECX]);
    fixed(b, 0xca, O::Clac, &[], &[]);
    fixed(b, 0xcb, O::Stac, &[], &[]);
    fixed(b, 0xd0, O::Xgetbv, &[EDX, EAX], &[ECX]);
    fixed(b, 0xd1, O::Xsetbv, &[], &[ECX, EDX, EAX]);
    fixed(b, 0xd5, O::Xend, &[], &[]);
    fixed(b, 0xd6, O::Xtest, &[], &[]);
    b.add(O::Swapgs, op2(0x01).ext(7).rm(0).only64(), &[], &[]);
    fixed(b, 0xf9, O::Rdtscp, &[EDX, EAX, ECX], &[]);

    b.add(O::Lar, op2(0x02).r(), &[Gv], &[Ew]);
    b.add(O::Lsl, op2(0x03).r(), &[Gv], &[Ew]);
    b.add(O::Syscall, op2(0x05), &[RCX, R11], &[]);
    b.add(O::Clts, op2(0x06), &[], &[]);
    b.add(O::Sysret, op2(0x07), &[], &[RCX, R11]);
    b.add(O::Invd, op2(0x08), &[], &[]);
    b.add(O::Wbinvd, op2(0x09), &[], &[]);
    b.add(O::Ud2, op2(0x0b), &[], &[]);
    b.add(O::Prefetch, op2(0x0d).ext(0).mem(), &[], &[Mb]);
    b.add(O::Prefetchw, op2(0x0d).ext(1).mem(), &[], &[Mb]);
    b.add(O::Femms, op2(0x0e), &[], &[]);

    b.add(O::MovCr, op2(0x20).r().regs(), &[Rp], &[Cr]);
    b.add(O::MovDr, op2(0x21).r().regs(), &[Rp], &[Dr]);
    b.add(O::MovCr, op2(0x22).r().regs(), &[Cr], &[Rp]);
    b.add(O::MovDr, op2(0x23).r().regs(), &[Dr], &[Rp]);

    b.add(O::Wrmsr, op2(0x30), &[], &[ECX, EDX, EAX]);
    b.add(O::Rdtsc, op2(0x31), &[EDX, EAX], &[]);
    b.add(O::Rdmsr, op2(0x32), &[EDX, EAX], &[ECX]);
    b.add(O::Rdpmc, op2(0x33), &[EDX, EAX], &[ECX]);
    b.add(O::Sysenter, op2(0x34), &[], &[]);
    b.add(O::Sysexit, op2(0x35), &[], &[]);
    b.add(O::Getsec, op2(0x37), &[EAX], &[EAX, EBX]);
    b.add(O::Cpuid, op2(0xa2), &[EAX, EBX, ECX, EDX], &[EAX, ECX]);
    b.add(O::Rsm, op2(0xaa), &[], &[]);

    b.add(O::Vmread, op2(0x78).r(), &[Ep], &[Gp]);
    b.add(O::Vmwrite, op2(0x79).r(), &[Gp], &[Ep]);
    b.add(O::Vmptrld, op2(0xc7).ext(6).mem(), &[], &[Mq]);
    b.add(O::Vmclear, op2(0xc7).ext(6).mem().p66(), &[], &[Mq]);
    b.add(O::Vmxon, op2(0xc7).ext(6).mem().pf3(), &[], &[Mq]);
    b.add(O::Vmptrst, op2(0xc7).ext(7).mem(), &[Mq], &[]);

    b.add(O::Ud1, op2(0xb9).r(), &[], &[Gv, Ev]);
    b.add(O::Ud0, op2(0xff).r(), &[], &[Gv, Ev]);
}

fn integer(b: &mut Builder) {
    for cc in Condition::ALL {
        b.add(O::cmovcc(cc), op2(0x40 + cc.code()).r(), &[Gv], &[Ev]);
        b.add(O::jcc(cc), op2(0x80 + cc.code()), &[], &[Jz]);
        b.add(O::setcc(cc), op2(0x90 + cc.code()).r(), &[Eb], &[]);
    }
    for (byte, seg) in [(0xa0, Register::FS), (0xa8, Register::GS)] {
        b.add(O::Push, op2(byte), &[rSP, PushS], &[sreg(seg), rSP]);
        b.add(O::Pop, op2(byte + 1), &[sreg(seg), rSP], &[rSP, PopS]);
    }
    b.add(O::Bt, op2(0xa3).r(), &[], &[Ev, Gv]);
    b.add(O::Shld, op2(0xa4).r(), &[Ev], &[Gv, Ib, Ev]);
    b.add(O::Shld, op2(0xa5).r(), &[Ev], &[Gv, CL, Ev]);
    b.add(O::Bts, op2(0xab).r(), &[Ev], &[Gv, Ev]);
    b.add(O::Shrd, op2(0xac).r(), &[Ev], &[Gv, Ib, Ev]);
    b.add(O::Shrd, op2(0xad).r(), &[Ev], &[Gv, CL, Ev]);
    b.add(O::Imul, op2(0xaf).r(), &[Gv], &[Ev, Gv]);
    b.add(O::Cmpxchg, op2(0xb0).r(), &[Eb, AL], &[Gb, Eb, AL]);
    b.add(O::Cmpxchg, op2(0xb1).r(), &[Ev, eAX], &[Gv, Ev, eAX]);
    b.add(O::Lss, op2(0xb2).r().mem(), &[Gz, sreg(Register::SS)], &[Mp]);
    b.add(O::Btr, op2(0xb3).r(), &[Ev], &[Gv, Ev]);
    b.add(O::Lfs, op2(0xb4).r().mem(), &[Gz, sreg(Register::FS)], &[Mp]);
    b.add(O::Lgs, op2(0xb5).r().mem(), &[Gz, sreg(Register::GS)], &[Mp]);
    b.add(O::Movzx, op2(0xb6).r(), &[Gv], &[Eb]);
    b.add(O::Movzx, op2(0xb7).r(), &[Gv], &[Ew]);
    b.add(O::Popcnt, op2(0xb8).r().pf3(), &[Gv], &[Ev]);
    b.add(O::Bt, op2(0xba).ext(4), &[], &[Ev, Ib]);
    b.add(O::Bts, op2(0xba).ext(5), &[Ev], &[Ib, Ev]);
    b.add(O::Btr, op2(0xba).ext(6), &[Ev], &[Ib, Ev]);
    b.add(O::Btc, op2(0xba).ext(7), &[Ev], &[Ib, Ev]);
    b.add(O::Btc, op2(0xbb).r(), &[Ev], &[Gv, Ev]);
    b.add(O::Bsf, op2(0xbc).r(), &[Gv], &[Ev]);
    b.add(O::Tzcnt, op2(0xbc).r().pf3(), &[Gv], &[Ev]);
    b.add(O::Bsr, op2(0xbd).r(), &[Gv], &[Ev]);
    b.add(O::Lzcnt, op2(0xbd).r().pf3(), &[Gv], &[Ev]);
    b.add(O::Movsx, op2(0xbe).r(), &[Gv], &[Eb]);
    b.add(O::Movsx, op2(0xbf).r(), &[Gv], &[Ew]);
    b.add(O::Xadd, op2(0xc0).r(), &[Eb, Gb], &[Gb, Eb]);
    b.add(O::Xadd, op2(0xc1).r(), &[Ev, Gv], &[Gv, Ev]);
    b.add(O::Movnti, op2(0xc3).r().mem(), &[My], &[Gy]);
    b.add(
        O::Cmpxchg8b,
        op2(0xc7).ext(1).mem().w0(),
        &[Mdq8, rDXy, rAXy],
        &[Mdq8, rDXy, rAXy, rCXy, rBXy],
    );
    b.add(
        O::Cmpxchg16b,
        op2(0xc7).ext(1).mem().w1(),
        &[Mdq8, rDXy, rAXy],
        &[Mdq8, rDXy, rAXy, rCXy, rBXy],
    );
    b.add(O::Rdrand, op2(0xc7).ext(6).regs(), &[Rv], &[]);
    b.add(O::Rdseed, op2(0xc7).ext(7).regs(), &[Rv], &[]);
    b.add(O::Rdpid, op2(0xc7).ext(7).regs().pf3(), &[Rp], &[]);
    b.add(O::Bswap, op2(0xc8).plus(), &[Zy], &[Zy]);
    b.add(O::NopModrm, op2(0x1f).ext(0), &[], &[Ev]);
}

fn state(b: &mut Builder) {
    for (ext, op) in [(0, O::Prefetchnta), (1, O::Prefetcht0), (2, O::Prefetcht1), (3, O::Prefetcht2)] {
        b.add(op, op2(0x18).ext(ext).mem(), &[], &[Mb]);
    }
    b.add(O::Fxsave, op2(0xae).ext(0).mem().w0(), &[M512], &[]);
    b.add(O::Fxsave64, op2(0xae).ext(0).mem().w1(), &[M512], &[]);
    b.add(O::Fxrstor, op2(0xae).ext(1).mem().w0(), &[], &[M512]);
    b.add(O::Fxrstor64, op2(0xae).ext(1).mem().w1(), &[], &[M512]);
    b.add(O::Ldmxcsr, op2(0xae).ext(2).mem(), &[], &[Md]);
    b.add(O::Stmxcsr, op2(0xae).ext(3).mem(), &[Md], &[]);
    b.add(O::Xsave, op2(0xae).ext(4).mem(), &[M], &[EDX, EAX]);
    b.add(O::Xrstor, op2(0xae).ext(5).mem(), &[], &[M, EDX, EAX]);
    b.add(O::Xsaveopt, op2(0xae).ext(6).mem(), &[M], &[EDX, EAX]);
    b.add(O::Clflush, op2(0xae).ext(7).mem(), &[], &[Mb]);
    b.add(O::Clwb, op2(0xae).ext(6).mem().p66(), &[], &[Mb]);
    b.add(O::Clflushopt, op2(0xae).ext(7).mem().p66(), &[], &[Mb]);
    b.add(O::Lfence, op2(0xae).ext(5).regs(), &[], &[]);
    b.add(O::Mfence, op2(0xae).ext(6).regs(), &[], &[]);
    b.add(O::Sfence, op2(0xae).ext(7).regs(), &[], &[]);
    b.add(O::Rdfsbase, op2(0xae).ext(0).regs().pf3().only64(), &[Ry], &[]);
    b.add(O::Rdgsbase, op2(0xae).ext(1).regs().pf3().only64(), &[Ry], &[]);
    b.add(O::Wrfsbase, op2(0xae).ext(2).regs().pf3().only64(), &[], &[Ry]);
    b.add(O::Wrgsbase, op2(0xae).ext(3).regs().pf3().only64(), &[], &[Ry]);
}

fn sse_moves(b: &mut Builder) {
    b.add(O::Movups, op2(0x10).r(), &[Vdq], &[Wdq]);
    b.add(O::Movupd, op2(0x10).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Movss, op2(0x10).r().pf3(), &[Vss], &[Wss]);
    b.add(O::Movsd, op2(0x10).r().pf2(), &[Vsd], &[Wsd]);
    b.add(O::Movups, op2(0x11).r(), &[Wdq], &[Vdq]);
    b.add(O::Movupd, op2(0x11).r().p66(), &[Wdq], &[Vdq]);
    b.add(O::Movss, op2(0x11).r().pf3(), &[Wss], &[Vss]);
    b.add(O::Movsd, op2(0x11).r().pf2(), &[Wsd], &[Vsd]);
    b.add(O::Movlps, op2(0x12).r().mem(), &[Vq], &[Mq]);
    b.add(O::Movhlps, op2(0x12).r().regs(), &[Vq], &[Udq]);
    b.add(O::Movlpd, op2(0x12).r().mem().p66(), &[Vq], &[Mq]);
    b.add(O::Movsldup, op2(0x12).r().pf3(), &[Vdq], &[Wdq]);
    b.add(O::Movddup, op2(0x12).r().pf2(), &[Vdq], &[Wq]);
    b.add(O::Movlps, op2(0x13).r().mem(), &[Mq], &[Vq]);
    b.add(O::Movlpd, op2(0x13).r().mem().p66(), &[Mq], &[Vq]);
    packed2(b, 0x14, O::Unpcklps, O::Unpcklpd);
    packed2(b, 0x15, O::Unpckhps, O::Unpckhpd);
    b.add(O::Movhps, op2(0x16).r().mem(), &[Vdq], &[Mq, Vdq]);
    b.add(O::Movlhps, op2(0x16).r().regs(), &[Vdq], &[Udq, Vdq]);
    b.add(O::Movhpd, op2(0x16).r().mem().p66(), &[Vdq], &[Mq, Vdq]);
    b.add(O::Movshdup, op2(0x16).r().pf3(), &[Vdq], &[Wdq]);
    b.add(O::Movhps, op2(0x17).r().mem(), &[Mq], &[Vdq]);
    b.add(O::Movhpd, op2(0x17).r().mem().p66(), &[Mq], &[Vdq]);
    b.add(O::Movaps, op2(0x28).r(), &[Vdq], &[Wdq]);
    b.add(O::Movapd, op2(0x28).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Movaps, op2(0x29).r(), &[Wdq], &[Vdq]);
    b.add(O::Movapd, op2(0x29).r().p66(), &[Wdq], &[Vdq]);
    b.add(O::Movntps, op2(0x2b).r().mem(), &[Mdq], &[Vdq]);
    b.add(O::Movntpd, op2(0x2b).r().mem().p66(), &[Mdq], &[Vdq]);
    b.add(O::Movmskps, op2(0x50).r().regs(), &[Gd], &[Udq]);
    b.add(O::Movmskpd, op2(0x50).r().regs().p66(), &[Gd], &[Udq]);

    b.add(O::Movd, op2(0x6e).r().w0(), &[Pq], &[Ed]);
    b.add(O::Movq, op2(0x6e).r().w1(), &[Pq], &[Eq]);
    b.add(O::Movd, op2(0x6e).r().p66().w0(), &[Vdq], &[Ed]);
    b.add(O::Movq, op2(0x6e).r().p66().w1(), &[Vdq], &[Eq]);
    b.add(O::Movq, op2(0x6f).r(), &[Pq], &[Qq]);
    b.add(O::Movdqa, op2(0x6f).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Movdqu, op2(0x6f).r().pf3(), &[Vdq], &[Wdq]);
    b.add(O::Movd, op2(0x7e).r().w0(), &[Ed], &[Pd]);
    b.add(O::Movq, op2(0x7e).r().w1(), &[Eq], &[Pq]);
    b.add(O::Movd, op2(0x7e).r().p66().w0(), &[Ed], &[Vd]);
    b.add(O::Movq, op2(0x7e).r().p66().w1(), &[Eq], &[Vq]);
    b.add(O::Movq, op2(0x7e).r().pf3(), &[Vdq], &[Wq]);
    b.add(O::Movq, op2(0x7f).r(), &[Qq], &[Pq]);
    b.add(O::Movdqa, op2(0x7f).r().p66(), &[Wdq], &[Vdq]);
    b.add(O::Movdqu, op2(0x7f).r().pf3(), &[Wdq], &[Vdq]);
    b.add(O::Movq, op2(0xd6).r().p66(), &[Wq], &[Vq]);
    b.add(O::Movq2dq, op2(0xd6).r().regs().pf3(), &[Vdq], &[Nq]);
    b.add(O::Movdq2q, op2(0xd6).r().regs().pf2(), &[Pq], &[Udq]);
    b.add(O::Movntq, op2(0xe7).r().mem(), &[Mq], &[Pq]);
    b.add(O::Movntdq, op2(0xe7).r().mem().p66(), &[Mdq], &[Vdq]);
    b.add(O::Lddqu, op2(0xf0).r().mem().pf2(), &[Vdq], &[Mdq]);
    b.add(O::Maskmovq, op2(0xf7).r().regs(), &[MaskMovQ], &[Pq, Nq]);
    b.add(O::Maskmovdqu, op2(0xf7).r().regs().p66(), &[MaskMovDq], &[Vdq, Udq]);
}

fn sse_arith(b: &mut Builder) {
    b.add(O::Sqrtps, op2(0x51).r(), &[Vdq], &[Wdq]);
    b.add(O::Sqrtpd, op2(0x51).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Sqrtss, op2(0x51).r().pf3(), &[Vss], &[Wss]);
    b.add(O::Sqrtsd, op2(0x51).r().pf2(), &[Vsd], &[Wsd]);
    b.add(O::Rsqrtps, op2(0x52).r(), &[Vdq], &[Wdq]);
    b.add(O::Rsqrtss, op2(0x52).r().pf3(), &[Vss], &[Wss]);
    b.add(O::Rcpps, op2(0x53).r(), &[Vdq], &[Wdq]);
    b.add(O::Rcpss, op2(0x53).r().pf3(), &[Vss], &[Wss]);
    packed2(b, 0x54, O::Andps, O::Andpd);
    packed2(b, 0x55, O::Andnps, O::Andnpd);
    packed2(b, 0x56, O::Orps, O::Orpd);
    packed2(b, 0x57, O::Xorps, O::Xorpd);
    float4(b, 0x58, [O::Addps, O::Addpd, O::Addss, O::Addsd]);
    float4(b, 0x59, [O::Mulps, O::Mulpd, O::Mulss, O::Mulsd]);
    float4(b, 0x5c, [O::Subps, O::Subpd, O::Subss, O::Subsd]);
    float4(b, 0x5d, [O::Minps, O::Minpd, O::Minss, O::Minsd]);
    float4(b, 0x5e, [O::Divps, O::Divpd, O::Divss, O::Divsd]);
    float4(b, 0x5f, [O::Maxps, O::Maxpd, O::Maxss, O::Maxsd]);
    b.add(O::Ucomiss, op2(0x2e).r(), &[], &[Vss, Wss]);
    b.add(O::Ucomisd, op2(0x2e).r().p66(), &[], &[Vsd, Wsd]);
    b.add(O::Comiss, op2(0x2f).r(), &[], &[Vss, Wss]);
    b.add(O::Comisd, op2(0x2f).r().p66(), &[], &[Vsd, Wsd]);
    b.add(O::Haddpd, op2(0x7c).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Haddps, op2(0x7c).r().pf2(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Hsubpd, op2(0x7d).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Hsubps, op2(0x7d).r().pf2(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Cmpps, op2(0xc2).r(), &[Vdq], &[Wdq, Ib, Vdq]);
    b.add(O::Cmppd, op2(0xc2).r().p66(), &[Vdq], &[Wdq, Ib, Vdq]);
    b.add(O::Cmpss, op2(0xc2).r().pf3(), &[Vss], &[Wss, Ib, Vss]);
    b.add(O::Cmpsd, op2(0xc2).r().pf2(), &[Vsd], &[Wsd, Ib, Vsd]);
    b.add(O::Shufps, op2(0xc6).r(), &[Vdq], &[Wdq, Ib, Vdq]);
    b.add(O::Shufpd, op2(0xc6).r().p66(), &[Vdq], &[Wdq, Ib, Vdq]);
    b.add(O::Addsubpd, op2(0xd0).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Addsubps, op2(0xd0).r().pf2(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Extrq, op2(0x78).ext(0).regs().p66(), &[Udq], &[Ib, Ib, Udq]);
    b.add(O::Insertq, op2(0x78).r().regs().pf2(), &[Vdq], &[Udq, Ib, Ib, Vdq]);
    b.add(O::Extrq, op2(0x79).r().regs().p66(), &[Vdq], &[Udq, Vdq]);
    b.add(O::Insertq, op2(0x79).r().regs().pf2(), &[Vdq], &[Udq, Vdq]);
}

fn sse_convert(b: &mut Builder) {
    b.add(O::Cvtpi2ps, op2(0x2a).r(), &[Vdq], &[Qq]);
    b.add(O::Cvtpi2pd, op2(0x2a).r().p66(), &[Vdq], &[Qq]);
    b.add(O::Cvtsi2ss, op2(0x2a).r().pf3(), &[Vss], &[Ey]);
    b.add(O::Cvtsi2sd, op2(0x2a).r().pf2(), &[Vsd], &[Ey]);
    b.add(O::Cvttps2pi, op2(0x2c).r(), &[Pq], &[Wq]);
    b.add(O::Cvttpd2pi, op2(0x2c).r().p66(), &[Pq], &[Wdq]);
    b.add(O::Cvttss2si, op2(0x2c).r().pf3(), &[Gy], &[Wss]);
    b.add(O::Cvttsd2si, op2(0x2c).r().pf2(), &[Gy], &[Wsd]);
    b.add(O::Cvtps2pi, op2(0x2d).r(), &[Pq], &[Wq]);
    b.add(O::Cvtpd2pi, op2(0x2d).r().p66(), &[Pq], &[Wdq]);
    b.add(O::Cvtss2si, op2(0x2d).r().pf3(), &[Gy], &[Wss]);
    b.add(O::Cvtsd2si, op2(0x2d).r().pf2(), &[Gy], &[Wsd]);
    b.add(O::Cvtps2pd, op2(0x5a).r(), &[Vdq], &[Wq]);
    b.add(O::Cvtpd2ps, op2(0x5a).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Cvtss2sd, op2(0x5a).r().pf3(), &[Vsd], &[Wss]);
    b.add(O::Cvtsd2ss, op2(0x5a).r().pf2(), &[Vss], &[Wsd]);
    b.add(O::Cvtdq2ps, op2(0x5b).r(), &[Vdq], &[Wdq]);
    b.add(O::Cvtps2dq, op2(0x5b).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Cvttps2dq, op2(0x5b).r().pf3(), &[Vdq], &[Wdq]);
    b.add(O::Cvttpd2dq, op2(0xe6).r().p66(), &[Vdq], &[Wdq]);
    b.add(O::Cvtdq2pd, op2(0xe6).r().pf3(), &[Vdq], &[Wq]);
    b.add(O::Cvtpd2dq, op2(0xe6).r().pf2(), &[Vdq], &[Wdq]);
}

fn mmx(b: &mut Builder) {
    for (byte, op) in [
        (0x60, O::Punpcklbw),
        (0x61, O::Punpcklwd),
        (0x62, O::Punpckldq),
    ] {
        b.add(op, op2(byte).r(), &[Pq], &[Qd, Pq]);
        b.add(op, op2(byte).r().p66(), &[Vdq], &[Wdq, Vdq]);
    }
    for (byte, op) in [
        (0x63, O::Packsswb),
        (0x64, O::Pcmpgtb),
        (0x65, O::Pcmpgtw),
        (0x66, O::Pcmpgtd),
        (0x67, O::Packuswb),
        (0x68, O::Punpckhbw),
        (0x69, O::Punpckhwd),
        (0x6a, O::Punpckhdq),
        (0x6b, O::Packssdw),
        (0x74, O::Pcmpeqb),
        (0x75, O::Pcmpeqw),
        (0x76, O::Pcmpeqd),
        (0xd1, O::Psrlw),
        (0xd2, O::Psrld),
        (0xd3, O::Psrlq),
        (0xd4, O::Paddq),
        (0xd5, O::Pmullw),
        (0xd8, O::Psubusb),
        (0xd9, O::Psubusw),
        (0xda, O::Pminub),
        (0xdb, O::Pand),
        (0xdc, O::Paddusb),
        (0xdd, O::Paddusw),
        (0xde, O::Pmaxub),
        (0xdf, O::Pandn),
        (0xe0, O::Pavgb),
        (0xe1, O::Psraw),
        (0xe2, O::Psrad),
        (0xe3, O::Pavgw),
        (0xe4, O::Pmulhuw),
        (0xe5, O::Pmulhw),
        (0xe8, O::Psubsb),
        (0xe9, O::Psubsw),
        (0xea, O::Pminsw),
        (0xeb, O::Por),
        (0xec, O::Paddsb),
        (0xed, O::Paddsw),
        (0xee, O::Pmaxsw),
        (0xef, O::Pxor),
        (0xf1, O::Psllw),
        (0xf2, O::Pslld),
        (0xf3, O::Psllq),
        (0xf4, O::Pmuludq),
        (0xf5, O::Pmaddwd),
        (0xf6, O::Psadbw),
        (0xf8, O::Psubb),
        (0xf9, O::Psubw),
        (0xfa, O::Psubd),
        (0xfb, O::Psubq),
        (0xfc, O::Paddb),
        (0xfd, O::Paddw),
        (0xfe, O::Paddd),
    ] {
        mmx_sse(b, op, byte);
    }
    b.add(O::Punpcklqdq, op2(0x6c).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Punpckhqdq, op2(0x6d).r().p66(), &[Vdq], &[Wdq, Vdq]);
    b.add(O::Pshufw, op2(0x70).r(), &[Pq], &[Qq, Ib]);
    b.add(O::Pshufd, op2(0x70).r().p66(), &[Vdq], &[Wdq, Ib]);
    b.add(O::Pshufhw, op2(0x70).r().pf3(), &[Vdq], &[Wdq, Ib]);
    b.add(O::Pshuflw, op2(0x70).r().pf2(), &[Vdq], &[Wdq, Ib]);
    for (byte, ext, op) in [
        (0x71, 2, O::Psrlw),
        (0x71, 4, O::Psraw),
        (0x71, 6, O::Psllw),
        (0x72, 2, O::Psrld),
        (0x72, 4, O::Psrad),
        (0x72, 6, O::Pslld),
        (0x73, 2, O::Psrlq),
        (0x73, 6, O::Psllq),
    ] {
        b.add(op, op2(byte).ext(ext).regs(), &[Nq], &[Ib, Nq]);
        b.add(op, op2(byte).ext(ext).regs().p66(), &[Udq], &[Ib, Udq]);
    }
    b.add(O::Psrldq, op2(0x73).ext(3).regs().p66(), &[Udq], &[Ib, Udq]);
    b.add(O::Pslldq, op2(0x73).ext(7).regs().p66(), &[Udq], &[Ib, Udq]);
    b.add(O::Emms, op2(0x77), &[], &[]);
    b.add(O::Pinsrw, op2(0xc4).r(), &[Pq], &[Ew, Ib, Pq]);
    b.add(O::Pinsrw, op2(0xc4).r().p66(), &[Vdq], &[Ew, Ib, Vdq]);
    b.add(O::Pextrw, op2(0xc5).r().regs(), &[Gd], &[Nq, Ib]);
    b.add(O::Pextrw, op2(0xc5).r().regs().p66(), &[Gd], &[Udq, Ib]);
    b.add(O::Pmovmskb, op2(0xd7).r().regs(), &[Gd], &[Nq]);
    b.add(O::Pmovmskb, op2(0xd7).r().regs().p66(), &[Gd], &[Udq]);
}

fn mpx(b: &mut Builder) {
    b.add(O::Bndldx, op2(0x1a).r().mem(), &[Bnd], &[MBnd]);
    b.add(O::Bndmov, op2(0x1a).r().p66(), &[Bnd], &[EBnd]);
    b.add(O::Bndcl, op2(0x1a).r().pf3(), &[], &[Bnd, Ep]);
    b.add(O::Bndcu, op2(0x1a).r().pf2(), &[], &[Bnd, Ep]);
    b.add(O::Bndstx, op2(0x1b).r().mem(), &[MBnd], &[Bnd]);
    b.add(O::Bndmov, op2(0x1b).r().p66(), &[EBnd], &[Bnd]);
    b.add(O::Bndmk, op2(0x1b).r().mem().pf3(), &[Bnd], &[MBnd]);
    b.add(O::Bndcn, op2(0x1b).r().pf2(), &[], &[Bnd, Ep]);
}
