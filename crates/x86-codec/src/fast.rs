//! Fast length decoder.
//!
//! Walks prefixes and opcode bytes through flat per-byte tables and
//! computes the instruction length, the position of an embedded relative
//! field, and the arithmetic flags used, without building operands. The
//! lengths agree with [`crate::decode`] for every input it accepts.
//!
//! [`decode_cti`] adds a control-transfer fast path: the common unprefixed
//! branches, calls and returns are built directly; other control transfers
//! go through the full decoder.

use crate::decoder::{self, segment_of, MAX_INSTR_LEN};
use crate::error::DecodeError;
use crate::instr::{Instruction, RawBits, RelField, RelKind};
use crate::mode::Context;
use crate::opcode::{Condition, EFlags, Opcode};
use crate::operand::{sign_extend, Operand};
use crate::register::Register;
use crate::size::{SizeCtx, VarSize};
use crate::table::{Mandatory, Map, Space};

// ─── Public entry points ─────────────────────────────────────────────

/// Length of the instruction at the start of `bytes`.
///
/// ```
/// use x86_codec::{fast, Context};
///
/// assert_eq!(fast::length(&[0x48, 0x8b, 0x05, 0, 0, 0, 0], Context::x64()), Ok(7));
/// ```
pub fn length(bytes: &[u8], ctx: Context) -> Result<usize, DecodeError> {
    scan(bytes, ctx).map(|s| s.len)
}

/// Length plus the position of an instruction-pointer-relative
/// displacement or branch offset, if the instruction has one.
pub fn length_with_rel(
    bytes: &[u8],
    ctx: Context,
) -> Result<(usize, Option<RelField>), DecodeError> {
    scan(bytes, ctx).map(|s| (s.len, s.rel))
}

/// Arithmetic flags read and written by the instruction at `bytes`.
pub fn eflags(bytes: &[u8], ctx: Context) -> Result<EFlags, DecodeError> {
    let s = scan(bytes, ctx)?;
    Ok(flags_of(&s))
}

/// Fast-path decode result.
#[derive(Debug, Clone, PartialEq)]
pub struct FastInstr {
    /// Instruction length in bytes.
    pub length: usize,
    /// Relative field, if any.
    pub rel: Option<RelField>,
    /// Flags read and written.
    pub eflags: EFlags,
    /// `fs`/`gs` override, the only segment prefixes reported here.
    pub seg: Option<Register>,
    /// The decoded instruction when it transfers control, raises an
    /// interrupt or enters or leaves the kernel; `None` otherwise.
    pub instr: Option<Instruction>,
}

/// Length, flags and, for control transfers, the full instruction.
///
/// Interrupts (`int`, `int1`, `int3`, `into`, `iret`) and fast system calls
/// (`syscall`, `sysret`, `sysenter`, `sysexit`) count as control transfers
/// here.
///
/// Unprefixed short and near jumps, conditional branches, `call` and `ret`
/// are built without consulting the decision tree. Any other control
/// transfer, or one carrying prefixes, is handed to [`crate::decode`].
pub fn decode_cti(bytes: &[u8], ctx: Context, pc: u64) -> Result<FastInstr, DecodeError> {
    let s = scan(bytes, ctx)?;
    let mut out = FastInstr {
        length: s.len,
        rel: s.rel,
        eflags: flags_of(&s),
        seg: s.seg.filter(|&b| b == 0x64 || b == 0x65).map(segment_of),
        instr: None,
    };
    if !s.is_cti() {
        return Ok(out);
    }
    if s.opcode_at > 0 {
        out.instr = Some(decoder::decode(bytes, ctx, pc)?.0);
        return Ok(out);
    }

    let next = pc.wrapping_add(s.len as u64);
    let target = |disp: i64| {
        let t = next.wrapping_add(disp as u64);
        let t = if ctx.mode.is_64() { t } else { t & 0xffff_ffff };
        Operand::Pc(t)
    };
    let disp = || match s.rel {
        Some(r) => read_int(bytes, usize::from(r.offset), usize::from(r.width)),
        None => 0,
    };
    let cc = || Condition::ALL[usize::from(s.op & 0xf)];
    let mut insn = match (s.map, s.op) {
        (Map::OneByte, 0xeb) => Instruction::jmp_short(target(disp())),
        (Map::OneByte, 0x70..=0x7f) => Instruction::jcc_short(cc(), target(disp())),
        (Map::OneByte, 0xe9) => Instruction::jmp(target(disp())),
        (Map::OneByte, 0xe8) => Instruction::call(ctx.mode, target(disp())),
        (Map::OneByte, 0xc3) => Instruction::ret(ctx.mode),
        (Map::Esc0F, 0x80..=0x8f) => Instruction::jcc(cc(), target(disp())),
        _ => {
            out.instr = Some(decoder::decode(bytes, ctx, pc)?.0);
            return Ok(out);
        }
    };
    insn.set_raw(RawBits::new(&bytes[..s.len], s.rel, pc));
    out.instr = Some(insn);
    Ok(out)
}

// ─── Byte access ─────────────────────────────────────────────────────

fn need(bytes: &[u8], pos: usize, n: usize) -> Result<(), DecodeError> {
    let end = pos + n;
    if end > MAX_INSTR_LEN {
        return Err(DecodeError::invalid(pos));
    }
    if end > bytes.len() {
        return Err(DecodeError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }
    Ok(())
}

fn at(bytes: &[u8], pos: usize) -> Result<u8, DecodeError> {
    need(bytes, pos, 1)?;
    Ok(bytes[pos])
}

/// Signed little-endian field; the caller has checked the bounds.
fn read_int(bytes: &[u8], pos: usize, n: usize) -> i64 {
    let v = bytes[pos..pos + n]
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    sign_extend(v as i64, n as u16)
}

// ─── Flat tables ─────────────────────────────────────────────────────

/// Trailing immediate of a legacy opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Imm {
    None,
    /// One byte.
    B,
    /// Two bytes.
    W,
    /// Operand size, at most four bytes.
    Z,
    /// Full operand size (`mov r, imm`).
    V,
    /// 8-bit branch offset.
    Jb,
    /// Near branch offset.
    Jz,
    /// Far pointer.
    Far,
    /// Address-sized absolute offset.
    Moffs,
    /// `enter`: a word and a byte.
    Enter,
    /// Group 3: `test` at `/0` takes a byte (`true`) or operand-sized
    /// immediate, `/1` is undefined.
    Grp3(bool),
    /// `C7`: `xbegin` at `/7`, `mov` otherwise.
    C7,
    /// SSE4a `extrq`/`insertq` immediates on `0F 78`.
    Sse4a,
}

#[derive(Debug, Clone, Copy)]
struct Op {
    modrm: bool,
    imm: Imm,
    no64: bool,
}

const PLAIN: Op = Op {
    modrm: false,
    imm: Imm::None,
    no64: false,
};

const fn m(imm: Imm) -> Op {
    Op {
        modrm: true,
        imm,
        no64: false,
    }
}

const fn i(imm: Imm) -> Op {
    Op {
        modrm: false,
        imm,
        no64: false,
    }
}

const fn no64(op: Op) -> Op {
    Op { no64: true, ..op }
}

const ONE_BYTE: [Op; 256] = one_byte();
const TWO_BYTE: [Op; 256] = two_byte();

const fn one_byte() -> [Op; 256] {
    let mut t = [PLAIN; 256];
    let mut b = 0;
    while b < 0x40 {
        t[b] = match b & 7 {
            0..=3 => m(Imm::None),
            4 => i(Imm::B),
            5 => i(Imm::Z),
            _ => PLAIN,
        };
        b += 1;
    }
    let mut b = 0x70;
    while b < 0x80 {
        t[b] = i(Imm::Jb);
        t[b + 0x10] = m(Imm::None);
        b += 1;
    }
    let mut b = 0;
    while b < 8 {
        t[0xb0 + b] = i(Imm::B);
        t[0xb8 + b] = i(Imm::V);
        t[0xd8 + b] = m(Imm::None);
        b += 1;
    }
    let mut b = 0xe0;
    while b < 0xe4 {
        t[b] = i(Imm::Jb);
        t[b + 4] = i(Imm::B);
        b += 1;
    }
    let mut b = 0;
    while b < 0x40 {
        if matches!(b & 7, 6 | 7) && b != 0x0f && b != 0x26 && b != 0x2e && b != 0x36 && b != 0x3e
        {
            t[b] = no64(PLAIN);
        }
        b += 1;
    }
    t[0x62] = no64(m(Imm::None));
    t[0x63] = m(Imm::None);
    t[0x68] = i(Imm::Z);
    t[0x69] = m(Imm::Z);
    t[0x6a] = i(Imm::B);
    t[0x6b] = m(Imm::B);
    t[0x80] = m(Imm::B);
    t[0x81] = m(Imm::Z);
    t[0x82] = no64(m(Imm::B));
    t[0x83] = m(Imm::B);
    t[0x9a] = no64(i(Imm::Far));
    t[0xa0] = i(Imm::Moffs);
    t[0xa1] = i(Imm::Moffs);
    t[0xa2] = i(Imm::Moffs);
    t[0xa3] = i(Imm::Moffs);
    t[0xa8] = i(Imm::B);
    t[0xa9] = i(Imm::Z);
    t[0xc0] = m(Imm::B);
    t[0xc1] = m(Imm::B);
    t[0xc2] = i(Imm::W);
    t[0xc4] = no64(m(Imm::None));
    t[0xc5] = no64(m(Imm::None));
    t[0xc6] = m(Imm::B);
    t[0xc7] = m(Imm::C7);
    t[0xc8] = i(Imm::Enter);
    t[0xca] = i(Imm::W);
    t[0xcd] = i(Imm::B);
    t[0xce] = no64(PLAIN);
    t[0xd0] = m(Imm::None);
    t[0xd1] = m(Imm::None);
    t[0xd2] = m(Imm::None);
    t[0xd3] = m(Imm::None);
    t[0xd4] = no64(i(Imm::B));
    t[0xd5] = no64(i(Imm::B));
    t[0xd6] = no64(PLAIN);
    t[0xe8] = i(Imm::Jz);
    t[0xe9] = i(Imm::Jz);
    t[0xea] = no64(i(Imm::Far));
    t[0xeb] = i(Imm::Jb);
    t[0xf6] = m(Imm::Grp3(true));
    t[0xf7] = m(Imm::Grp3(false));
    t[0xfe] = m(Imm::None);
    t[0xff] = m(Imm::None);
    t
}

const fn two_byte() -> [Op; 256] {
    let mut t = [m(Imm::None); 256];
    let mut b = 0x80;
    while b < 0x90 {
        t[b] = i(Imm::Jz);
        b += 1;
    }
    let mut b = 0x30;
    while b < 0x38 {
        t[b] = PLAIN;
        b += 1;
    }
    let mut b = 0xc8;
    while b < 0xd0 {
        t[b] = PLAIN;
        b += 1;
    }
    t[0x05] = PLAIN;
    t[0x06] = PLAIN;
    t[0x07] = PLAIN;
    t[0x08] = PLAIN;
    t[0x09] = PLAIN;
    t[0x0b] = PLAIN;
    t[0x0e] = PLAIN;
    t[0x77] = PLAIN;
    t[0xa0] = PLAIN;
    t[0xa1] = PLAIN;
    t[0xa2] = PLAIN;
    t[0xa8] = PLAIN;
    t[0xa9] = PLAIN;
    t[0xaa] = PLAIN;
    t[0x70] = m(Imm::B);
    t[0x71] = m(Imm::B);
    t[0x72] = m(Imm::B);
    t[0x73] = m(Imm::B);
    t[0x78] = m(Imm::Sse4a);
    t[0xa4] = m(Imm::B);
    t[0xac] = m(Imm::B);
    t[0xba] = m(Imm::B);
    t[0xc2] = m(Imm::B);
    t[0xc4] = m(Imm::B);
    t[0xc5] = m(Imm::B);
    t[0xc6] = m(Imm::B);
    t
}

/// VEX/EVEX opcodes in map `0F` taking an 8-bit immediate.
const fn vex_0f_imm(op: u8) -> bool {
    matches!(op, 0x70..=0x73 | 0xc2 | 0xc4..=0xc6)
}

// ─── Scan ────────────────────────────────────────────────────────────

/// What the length walk learned about an instruction.
#[derive(Debug, Clone, Copy)]
struct Scan {
    len: usize,
    rel: Option<RelField>,
    /// Offset of the first opcode byte (after any VEX/EVEX/XOP prefix).
    opcode_at: usize,
    space: Space,
    map: Map,
    op: u8,
    modrm: Option<u8>,
    pp: Mandatory,
    x64: bool,
    strict: bool,
    /// Last of `F2`/`F3`.
    rep: Option<Mandatory>,
    f2: bool,
    f3: bool,
    data: bool,
    seg: Option<u8>,
}

impl Scan {
    fn reg(&self) -> u8 {
        self.modrm.map_or(0, |b| (b >> 3) & 7)
    }

    fn is_reg_form(&self) -> bool {
        self.modrm.map_or(false, |b| b >> 6 == 3)
    }

    /// Whether the opcode transfers control, counting interrupts and
    /// system calls.
    fn is_cti(&self) -> bool {
        match (self.space, self.map) {
            (Space::Legacy, Map::OneByte) => match self.op {
                0x70..=0x7f | 0x9a | 0xc2 | 0xc3 | 0xca..=0xcf | 0xe0..=0xe3 | 0xe8..=0xeb | 0xf1 => {
                    true
                }
                0xff => (2..=5).contains(&self.reg()),
                _ => false,
            },
            (Space::Legacy, Map::Esc0F) => {
                matches!(self.op, 0x80..=0x8f | 0x05 | 0x07 | 0x34 | 0x35)
            }
            _ => false,
        }
    }
}

/// Whether `0F 78`/`0F 79` selects the SSE4a form, following the same
/// mandatory-prefix fallback order as the decoder.
fn sse4a_form(op: u8, modrm: u8, rep: Option<Mandatory>, data: bool, strict: bool) -> bool {
    let mut cols = [Mandatory::None; 3];
    let mut n = 0;
    if let Some(r) = rep {
        cols[n] = r;
        n += 1;
        if !strict {
            if data {
                cols[n] = Mandatory::P66;
                n += 1;
            }
            cols[n] = Mandatory::None;
            n += 1;
        }
    } else if data {
        cols[0] = Mandatory::P66;
        cols[1] = Mandatory::None;
        n = 2;
    } else {
        n = 1;
    }
    let reg_form = modrm >> 6 == 3;
    for &c in &cols[..n] {
        match c {
            Mandatory::F2 if reg_form => return true,
            Mandatory::P66 if reg_form && (op == 0x79 || (modrm >> 3) & 7 == 0) => return true,
            Mandatory::None => return false,
            _ => {}
        }
    }
    false
}

/// Bytes taken by ModR/M, SIB and displacement starting at `pos`, and the
/// offset of a RIP-relative displacement.
fn modrm_len(
    bytes: &[u8],
    pos: usize,
    addr: u16,
    x64: bool,
) -> Result<(usize, Option<usize>), DecodeError> {
    let b = at(bytes, pos)?;
    let md = b >> 6;
    let rm = b & 7;
    if md == 3 {
        return Ok((1, None));
    }
    if addr == 2 {
        let disp = match (md, rm) {
            (0, 6) => 2,
            (0, _) => 0,
            (1, _) => 1,
            _ => 2,
        };
        return Ok((1 + disp, None));
    }
    let mut len = 1;
    let mut base = rm;
    if rm == 4 {
        base = at(bytes, pos + 1)? & 7;
        len += 1;
    }
    let disp = match md {
        0 if base == 5 => 4,
        0 => 0,
        1 => 1,
        _ => 4,
    };
    let rip = (x64 && md == 0 && rm == 5).then_some(pos + 1);
    Ok((len + disp, rip))
}

fn scan(bytes: &[u8], ctx: Context) -> Result<Scan, DecodeError> {
    let x64 = ctx.mode.is_64();
    let mut pos = 0;
    let (mut lock, mut f2, mut f3, mut data, mut addr) = (false, false, false, false, false);
    let mut rep = None;
    let mut seg = None;
    let mut rex: Option<u8> = None;
    loop {
        let b = at(bytes, pos)?;
        match b {
            0xf0 => lock = true,
            0xf2 => {
                f2 = true;
                rep = Some(Mandatory::F2);
            }
            0xf3 => {
                f3 = true;
                rep = Some(Mandatory::F3);
            }
            0x66 => data = true,
            0x67 => addr = true,
            0x26 | 0x2e | 0x36 | 0x3e | 0x64 | 0x65 => seg = Some(b),
            0x40..=0x4f if x64 => {
                rex = Some(b);
                pos += 1;
                continue;
            }
            _ => break,
        }
        rex = None;
        pos += 1;
    }

    let mut cx = SizeCtx::new(ctx.mode, ctx.vendor);
    cx.data16 = data;
    cx.addr16 = addr;
    cx.rex_w = rex.map_or(false, |r| r & 8 != 0);
    let addr_size = cx.addr_size();

    let mut s = Scan {
        len: 0,
        rel: None,
        opcode_at: pos,
        space: Space::Legacy,
        map: Map::OneByte,
        op: 0,
        modrm: None,
        pp: Mandatory::None,
        x64,
        strict: ctx.strict,
        rep,
        f2,
        f3,
        data,
        seg,
    };

    // VEX, EVEX and XOP.
    let lead = at(bytes, pos)?;
    if matches!(lead, 0xc4 | 0xc5 | 0x62 | 0x8f) {
        let next = at(bytes, pos + 1)?;
        let is_ext = match lead {
            0x8f => (next & 0x1f) >= 8,
            _ => x64 || next >> 6 == 3,
        };
        if is_ext {
            if data || rep.is_some() || rex.is_some() || lock {
                return Err(DecodeError::invalid(pos));
            }
            let (space, map, pp, width) = match lead {
                0xc5 => (Space::Vex, Some(Map::Esc0F), next, 2),
                0xc4 | 0x8f => {
                    let b2 = at(bytes, pos + 2)?;
                    let space = if lead == 0x8f { Space::Xop } else { Space::Vex };
                    (space, Map::from_mmmmm(next & 0x1f, lead == 0x8f), b2, 3)
                }
                _ => {
                    let p1 = at(bytes, pos + 2)?;
                    need(bytes, pos, 4)?;
                    if next & 0x0c != 0 || p1 & 0x04 == 0 {
                        return Err(DecodeError::invalid(pos + 1));
                    }
                    (Space::Evex, Map::from_mmmmm(next & 3, false), p1, 4)
                }
            };
            let map = map.ok_or(DecodeError::invalid(pos + 1))?;
            pos += width;
            s.space = space;
            s.map = map;
            s.pp = Mandatory::from_pp(pp);
            s.opcode_at = pos;
            s.op = at(bytes, pos)?;
            pos += 1;
            let has_modrm = !(space == Space::Vex && map == Map::Esc0F && s.op == 0x77);
            if has_modrm {
                s.modrm = Some(at(bytes, pos)?);
                let (n, rip) = modrm_len(bytes, pos, addr_size, x64)?;
                s.rel = rip.map(|o| rel_at(o, 4, RelKind::RipRel));
                pos += n;
            }
            let imm = match map {
                Map::Esc0F if vex_0f_imm(s.op) => 1,
                Map::Esc0F3A | Map::Xop8 => 1,
                Map::XopA => 4,
                _ => 0,
            };
            need(bytes, pos, imm)?;
            s.len = pos + imm;
            return Ok(s);
        }
    }

    // Legacy opcode bytes.
    s.op = at(bytes, pos)?;
    pos += 1;
    let entry = if s.op == 0x0f {
        s.op = at(bytes, pos)?;
        pos += 1;
        match s.op {
            0x38 | 0x3a => {
                s.map = if s.op == 0x38 { Map::Esc0F38 } else { Map::Esc0F3A };
                s.op = at(bytes, pos)?;
                pos += 1;
                m(if s.map == Map::Esc0F3A { Imm::B } else { Imm::None })
            }
            0x0f => {
                s.map = Map::Amd3dnow;
                m(Imm::B)
            }
            op => {
                s.map = Map::Esc0F;
                TWO_BYTE[usize::from(op)]
            }
        }
    } else {
        ONE_BYTE[usize::from(s.op)]
    };
    if entry.no64 && x64 {
        return Err(DecodeError::invalid(s.opcode_at));
    }
    if entry.modrm {
        let b = at(bytes, pos)?;
        s.modrm = Some(b);
        let (n, rip) = modrm_len(bytes, pos, addr_size, x64)?;
        s.rel = rip.map(|o| rel_at(o, 4, RelKind::RipRel));
        pos += n;
    }
    if s.map == Map::Amd3dnow {
        // The suffix byte is the real opcode.
        s.op = at(bytes, pos)?;
        s.len = pos + 1;
        return Ok(s);
    }

    let var = |v: VarSize| usize::from(v.resolve(&cx));
    let reg = s.reg();
    let (n, branch) = match entry.imm {
        Imm::None => (0, false),
        Imm::B => (1, false),
        Imm::W => (2, false),
        Imm::Z => (var(VarSize::Z), false),
        Imm::V => (var(VarSize::V), false),
        Imm::Jb => (1, true),
        Imm::Jz => (var(VarSize::NearRel), true),
        Imm::Far => (var(VarSize::FarImm), false),
        Imm::Moffs => (usize::from(addr_size), false),
        Imm::Enter => (3, false),
        Imm::Grp3(byte) => match reg {
            0 if byte => (1, false),
            0 => (var(VarSize::Z), false),
            1 => return Err(DecodeError::invalid(s.opcode_at)),
            _ => (0, false),
        },
        Imm::C7 if reg == 7 => (var(VarSize::NearRel), true),
        Imm::C7 => (var(VarSize::Z), false),
        Imm::Sse4a => {
            let modrm = s.modrm.unwrap_or(0);
            if sse4a_form(s.op, modrm, rep, data, ctx.strict) {
                (2, false)
            } else {
                (0, false)
            }
        }
    };
    need(bytes, pos, n)?;
    if branch {
        s.rel = Some(rel_at(pos, n, RelKind::Branch));
    }
    s.len = pos + n;
    Ok(s)
}

fn rel_at(offset: usize, width: usize, kind: RelKind) -> RelField {
    RelField {
        offset: offset as u8,
        width: width as u8,
        kind,
    }
}

// ─── Flags ───────────────────────────────────────────────────────────

/// Flag source for a flat-table byte.
#[derive(Debug, Clone, Copy)]
enum Fx {
    None,
    Op(Opcode),
    /// Condition code in the low opcode nibble.
    Cond,
    /// Depends on ModR/M, mode or prefixes.
    Group,
}

const ONE_BYTE_FX: [Fx; 256] = one_byte_fx();
const TWO_BYTE_FX: [Fx; 256] = two_byte_fx();

const ALU: [Opcode; 8] = [
    Opcode::Add,
    Opcode::Or,
    Opcode::Adc,
    Opcode::Sbb,
    Opcode::And,
    Opcode::Sub,
    Opcode::Xor,
    Opcode::Cmp,
];

const SHIFT: [Opcode; 8] = [
    Opcode::Rol,
    Opcode::Ror,
    Opcode::Rcl,
    Opcode::Rcr,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Shl,
    Opcode::Sar,
];

const UNARY: [Opcode; 8] = [
    Opcode::Test,
    Opcode::Test,
    Opcode::Not,
    Opcode::Neg,
    Opcode::Mul,
    Opcode::Imul,
    Opcode::Div,
    Opcode::Idiv,
];

const fn one_byte_fx() -> [Fx; 256] {
    use Opcode as O;
    let mut t = [Fx::None; 256];
    let mut b = 0;
    while b < 0x40 {
        if b & 7 < 6 {
            t[b] = Fx::Op(ALU[b >> 3]);
        }
        b += 1;
    }
    let mut b = 0;
    while b < 8 {
        t[0x40 + b] = Fx::Op(O::Inc);
        t[0x48 + b] = Fx::Op(O::Dec);
        t[0xd8 + b] = Fx::Group;
        b += 1;
    }
    let mut b = 0x70;
    while b < 0x80 {
        t[b] = Fx::Cond;
        b += 1;
    }
    t[0x27] = Fx::Op(O::Daa);
    t[0x2f] = Fx::Op(O::Das);
    t[0x37] = Fx::Op(O::Aaa);
    t[0x3f] = Fx::Op(O::Aas);
    t[0x63] = Fx::Group;
    t[0x69] = Fx::Op(O::Imul);
    t[0x6b] = Fx::Op(O::Imul);
    t[0x6c] = Fx::Op(O::Ins);
    t[0x6d] = Fx::Op(O::Ins);
    t[0x6e] = Fx::Op(O::Outs);
    t[0x6f] = Fx::Op(O::Outs);
    t[0x80] = Fx::Group;
    t[0x81] = Fx::Group;
    t[0x82] = Fx::Group;
    t[0x83] = Fx::Group;
    t[0x84] = Fx::Op(O::Test);
    t[0x85] = Fx::Op(O::Test);
    t[0x9c] = Fx::Op(O::Pushf);
    t[0x9d] = Fx::Op(O::Popf);
    t[0x9e] = Fx::Op(O::Sahf);
    t[0x9f] = Fx::Op(O::Lahf);
    t[0xa4] = Fx::Op(O::Movs);
    t[0xa5] = Fx::Op(O::Movs);
    t[0xa6] = Fx::Op(O::Cmps);
    t[0xa7] = Fx::Op(O::Cmps);
    t[0xa8] = Fx::Op(O::Test);
    t[0xa9] = Fx::Op(O::Test);
    t[0xaa] = Fx::Op(O::Stos);
    t[0xab] = Fx::Op(O::Stos);
    t[0xac] = Fx::Op(O::Lods);
    t[0xad] = Fx::Op(O::Lods);
    t[0xae] = Fx::Op(O::Scas);
    t[0xaf] = Fx::Op(O::Scas);
    t[0xc0] = Fx::Group;
    t[0xc1] = Fx::Group;
    t[0xcc] = Fx::Op(O::Int3);
    t[0xcd] = Fx::Op(O::Int);
    t[0xce] = Fx::Op(O::Into);
    t[0xcf] = Fx::Op(O::Iret);
    t[0xd0] = Fx::Group;
    t[0xd1] = Fx::Group;
    t[0xd2] = Fx::Group;
    t[0xd3] = Fx::Group;
    t[0xd4] = Fx::Op(O::Aam);
    t[0xd5] = Fx::Op(O::Aad);
    t[0xd6] = Fx::Op(O::Salc);
    t[0xe0] = Fx::Op(O::Loopne);
    t[0xe1] = Fx::Op(O::Loope);
    t[0xf1] = Fx::Op(O::Int1);
    t[0xf5] = Fx::Op(O::Cmc);
    t[0xf6] = Fx::Group;
    t[0xf7] = Fx::Group;
    t[0xf8] = Fx::Op(O::Clc);
    t[0xf9] = Fx::Op(O::Stc);
    t[0xfa] = Fx::Op(O::Cli);
    t[0xfb] = Fx::Op(O::Sti);
    t[0xfc] = Fx::Op(O::Cld);
    t[0xfd] = Fx::Op(O::Std);
    t[0xfe] = Fx::Group;
    t[0xff] = Fx::Group;
    t
}

const fn two_byte_fx() -> [Fx; 256] {
    use Opcode as O;
    let mut t = [Fx::None; 256];
    let mut b = 0;
    while b < 0x10 {
        t[0x40 + b] = Fx::Cond;
        t[0x80 + b] = Fx::Cond;
        t[0x90 + b] = Fx::Cond;
        b += 1;
    }
    t[0x00] = Fx::Group;
    t[0x01] = Fx::Group;
    t[0x02] = Fx::Op(O::Lar);
    t[0x03] = Fx::Op(O::Lsl);
    t[0x05] = Fx::Op(O::Syscall);
    t[0x07] = Fx::Op(O::Sysret);
    t[0x20] = Fx::Op(O::MovCr);
    t[0x22] = Fx::Op(O::MovCr);
    t[0x21] = Fx::Op(O::MovDr);
    t[0x23] = Fx::Op(O::MovDr);
    t[0x2e] = Fx::Op(O::Ucomiss);
    t[0x2f] = Fx::Op(O::Comiss);
    t[0x34] = Fx::Op(O::Sysenter);
    t[0x35] = Fx::Op(O::Sysexit);
    t[0x78] = Fx::Group;
    t[0x79] = Fx::Group;
    t[0xa3] = Fx::Op(O::Bt);
    t[0xa4] = Fx::Op(O::Shld);
    t[0xa5] = Fx::Op(O::Shld);
    t[0xaa] = Fx::Op(O::Rsm);
    t[0xab] = Fx::Op(O::Bts);
    t[0xac] = Fx::Op(O::Shrd);
    t[0xad] = Fx::Op(O::Shrd);
    t[0xaf] = Fx::Op(O::Imul);
    t[0xb0] = Fx::Op(O::Cmpxchg);
    t[0xb1] = Fx::Op(O::Cmpxchg);
    t[0xb3] = Fx::Op(O::Btr);
    t[0xb8] = Fx::Group;
    t[0xba] = Fx::Group;
    t[0xbb] = Fx::Op(O::Btc);
    t[0xbc] = Fx::Op(O::Bsf);
    t[0xbd] = Fx::Op(O::Bsr);
    t[0xc0] = Fx::Op(O::Xadd);
    t[0xc1] = Fx::Op(O::Xadd);
    t[0xc7] = Fx::Group;
    t
}

fn flags_of(s: &Scan) -> EFlags {
    let fx = match (s.space, s.map) {
        (Space::Legacy, Map::OneByte) => ONE_BYTE_FX[usize::from(s.op)],
        (Space::Legacy, Map::Esc0F) => TWO_BYTE_FX[usize::from(s.op)],
        _ => return other_map_flags(s),
    };
    match fx {
        Fx::None => EFlags::empty(),
        Fx::Op(op) => op.eflags(),
        Fx::Cond => Condition::ALL[usize::from(s.op & 0xf)].reads(),
        Fx::Group => group_flags(s),
    }
}

fn group_flags(s: &Scan) -> EFlags {
    use Opcode as O;
    let reg = usize::from(s.reg());
    let modrm = s.modrm.unwrap_or(0);
    let op = match (s.map, s.op) {
        (Map::OneByte, 0x80..=0x83) => Some(ALU[reg]),
        (Map::OneByte, 0xc0 | 0xc1 | 0xd0..=0xd3) => Some(SHIFT[reg]),
        (Map::OneByte, 0xf6 | 0xf7) => Some(UNARY[reg]),
        (Map::OneByte, 0xfe | 0xff) => match reg {
            0 => Some(O::Inc),
            1 => Some(O::Dec),
            _ => None,
        },
        (Map::OneByte, 0x63) => (!s.x64).then_some(O::Arpl),
        (Map::OneByte, 0xd8..=0xdf) => x87_op(s.op, modrm),
        (Map::Esc0F, 0x00) => match reg {
            4 => Some(O::Verr),
            5 => Some(O::Verw),
            _ => None,
        },
        (Map::Esc0F, 0x01) => match modrm {
            0xc1 => Some(O::Vmcall),
            0xc2 => Some(O::Vmlaunch),
            0xc3 => Some(O::Vmresume),
            0xc4 => Some(O::Vmxoff),
            0xd6 => Some(O::Xtest),
            _ => None,
        },
        (Map::Esc0F, 0x78 | 0x79) => {
            if sse4a_form(s.op, modrm, s.rep, s.data, s.strict) {
                None
            } else if s.op == 0x78 {
                Some(O::Vmread)
            } else {
                Some(O::Vmwrite)
            }
        }
        (Map::Esc0F, 0xb8) => s.f3.then_some(O::Popcnt),
        (Map::Esc0F, 0xba) => match reg {
            4 => Some(O::Bt),
            5 => Some(O::Bts),
            6 => Some(O::Btr),
            7 => Some(O::Btc),
            _ => None,
        },
        (Map::Esc0F, 0xc7) => match (reg, s.is_reg_form()) {
            (1, false) => Some(O::Cmpxchg8b),
            (6, false) => Some(O::Vmptrld),
            (7, false) => Some(O::Vmptrst),
            (6, true) => Some(O::Rdrand),
            (7, true) if !s.f3 => Some(O::Rdseed),
            _ => None,
        },
        _ => None,
    };
    op.map_or(EFlags::empty(), Opcode::eflags)
}

fn x87_op(op: u8, modrm: u8) -> Option<Opcode> {
    use Opcode as O;
    if modrm < 0xc0 {
        return None;
    }
    let row = (modrm >> 3) & 7;
    match (op, row) {
        (0xda, 0) => Some(O::Fcmovb),
        (0xda, 1) => Some(O::Fcmove),
        (0xda, 2) => Some(O::Fcmovbe),
        (0xda, 3) => Some(O::Fcmovu),
        (0xdb, 0) => Some(O::Fcmovnb),
        (0xdb, 1) => Some(O::Fcmovne),
        (0xdb, 2) => Some(O::Fcmovnbe),
        (0xdb, 3) => Some(O::Fcmovnu),
        (0xdb, 5) => Some(O::Fucomi),
        (0xdb, 6) => Some(O::Fcomi),
        (0xdf, 5) => Some(O::Fucomip),
        (0xdf, 6) => Some(O::Fcomip),
        _ => None,
    }
}

/// Flags for the three-byte maps and the VEX/EVEX/XOP spaces, which have
/// few flag writers.
fn other_map_flags(s: &Scan) -> EFlags {
    use Opcode as O;
    let legacy_pp = if s.data {
        Mandatory::P66
    } else if s.f3 {
        Mandatory::F3
    } else if s.f2 {
        Mandatory::F2
    } else {
        Mandatory::None
    };
    let op = match (s.space, s.map, s.op) {
        (Space::Legacy, Map::Esc0F38, 0x17) => Some(O::Ptest),
        (Space::Legacy, Map::Esc0F38, 0xf6) => match legacy_pp {
            Mandatory::P66 => Some(O::Adcx),
            Mandatory::F3 => Some(O::Adox),
            _ => None,
        },
        (Space::Legacy, Map::Esc0F3A, 0x60) => Some(O::Pcmpestrm),
        (Space::Legacy, Map::Esc0F3A, 0x61) => Some(O::Pcmpestri),
        (Space::Legacy, Map::Esc0F3A, 0x62) => Some(O::Pcmpistrm),
        (Space::Legacy, Map::Esc0F3A, 0x63) => Some(O::Pcmpistri),
        (Space::Vex | Space::Evex, Map::Esc0F, 0x2e) => Some(O::Vucomiss),
        (Space::Vex | Space::Evex, Map::Esc0F, 0x2f) => Some(O::Vcomiss),
        (Space::Vex, Map::Esc0F, 0x98) => Some(O::Kortestw),
        (Space::Vex, Map::Esc0F38, 0x17) => Some(O::Vptest),
        (Space::Vex, Map::Esc0F38, 0xf2) => Some(O::Andn),
        (Space::Vex, Map::Esc0F38, 0xf3) => Some(O::Blsr),
        (Space::Vex, Map::Esc0F38, 0xf5) if s.pp == Mandatory::None => Some(O::Bzhi),
        (Space::Vex, Map::Esc0F38, 0xf7) if s.pp == Mandatory::None => Some(O::Bextr),
        (Space::Xop, Map::Xop9, 0x01 | 0x02) => Some(O::Blcfill),
        (Space::Xop, Map::XopA, 0x12) if s.reg() == 0 => Some(O::Lwpins),
        _ => None,
    };
    op.map_or(EFlags::empty(), Opcode::eflags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Vendor;

    fn len64(bytes: &[u8]) -> usize {
        length(bytes, Context::x64()).unwrap()
    }

    fn len32(bytes: &[u8]) -> usize {
        length(bytes, Context::x86()).unwrap()
    }

    #[test]
    fn one_byte_lengths() {
        assert_eq!(len64(&[0x90]), 1);
        assert_eq!(len64(&[0xc3]), 1);
        assert_eq!(len64(&[0xc2, 0x08, 0x00]), 3);
        assert_eq!(len64(&[0x05, 1, 2, 3, 4]), 5);
        assert_eq!(len64(&[0x66, 0x05, 1, 2]), 4);
        assert_eq!(len64(&[0x48, 0xb8, 1, 2, 3, 4, 5, 6, 7, 8]), 10);
        assert_eq!(len64(&[0xc8, 0x10, 0x00, 0x01]), 4);
        assert_eq!(len64(&[0xf6, 0xc0, 0x01]), 3);
        assert_eq!(len64(&[0xf7, 0xd0]), 2);
    }

    #[test]
    fn modrm_forms() {
        // mov eax, [rsp + rax*2 + 0x12345678]
        assert_eq!(len64(&[0x8b, 0x84, 0x44, 0x78, 0x56, 0x34, 0x12]), 7);
        // mov eax, [rbp]
        assert_eq!(len64(&[0x8b, 0x45, 0x00]), 3);
        // 16-bit: mov eax, [0x1234]
        assert_eq!(len32(&[0x67, 0x8b, 0x06, 0x34, 0x12]), 5);
        // 16-bit: mov eax, [bp + si + 8]
        assert_eq!(len32(&[0x67, 0x8b, 0x42, 0x08]), 4);
    }

    #[test]
    fn relative_fields_are_located() {
        let (len, rel) = length_with_rel(&[0x48, 0x8d, 0x05, 0, 0, 0, 0], Context::x64()).unwrap();
        assert_eq!(len, 7);
        assert_eq!(rel, Some(rel_at(3, 4, RelKind::RipRel)));

        let (len, rel) = length_with_rel(&[0x0f, 0x85, 0, 0, 0, 0], Context::x64()).unwrap();
        assert_eq!(len, 6);
        assert_eq!(rel, Some(rel_at(2, 4, RelKind::Branch)));

        // 32-bit mode has no RIP-relative form.
        let (_, rel) = length_with_rel(&[0x8b, 0x05, 0, 0, 0, 0], Context::x86()).unwrap();
        assert_eq!(rel, None);
    }

    #[test]
    fn near_branch_width_follows_vendor() {
        // 66 0f 84 rel16 in 32-bit mode.
        assert_eq!(len32(&[0x66, 0x0f, 0x84, 0x10, 0x00]), 5);
        // Intel ignores 66 on near branches in 64-bit mode.
        assert_eq!(len64(&[0x66, 0xe9, 0, 0, 0, 0]), 6);
        let amd = Context::x64().with_vendor(Vendor::Amd);
        assert_eq!(length(&[0x66, 0xe9, 0, 0], amd), Ok(4));
    }

    #[test]
    fn moffs_uses_address_size() {
        assert_eq!(len64(&[0xa1, 0, 0, 0, 0, 0, 0, 0, 0]), 9);
        assert_eq!(len64(&[0x67, 0xa1, 0, 0, 0, 0]), 6);
        assert_eq!(len32(&[0xa1, 0, 0, 0, 0]), 5);
        assert_eq!(len32(&[0x67, 0xa1, 0, 0]), 4);
    }

    #[test]
    fn vex_evex_xop_lengths() {
        assert_eq!(len64(&[0xc5, 0xf8, 0x77]), 3);
        // vpshufd ymm0, ymm1, 0x1b
        assert_eq!(len64(&[0xc5, 0xfd, 0x70, 0xc1, 0x1b]), 5);
        // vaddps zmm1, zmm2, [rax + 0x40]
        assert_eq!(len64(&[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01]), 7);
        // lwpins eax, ecx, imm32
        assert_eq!(len64(&[0x8f, 0xea, 0x78, 0x12, 0xc1, 1, 2, 3, 4]), 9);
        // pop [rax] is not XOP.
        assert_eq!(len64(&[0x8f, 0x00]), 2);
    }

    #[test]
    fn sse4a_immediates() {
        // extrq xmm0, 1, 2
        assert_eq!(len64(&[0x66, 0x0f, 0x78, 0xc0, 1, 2]), 6);
        // insertq xmm0, xmm1, 1, 2
        assert_eq!(len64(&[0xf2, 0x0f, 0x78, 0xc1, 1, 2]), 6);
        // vmread rax, rcx
        assert_eq!(len64(&[0x0f, 0x78, 0xc8]), 3);
    }

    #[test]
    fn invalid_and_truncated() {
        assert!(matches!(
            length(&[0x27], Context::x64()),
            Err(DecodeError::Invalid { .. })
        ));
        assert_eq!(len32(&[0x27]), 1);
        assert!(matches!(
            length(&[0xf6, 0xc8, 0x01], Context::x64()),
            Err(DecodeError::Invalid { .. })
        ));
        assert_eq!(
            length(&[0xe8, 0, 0], Context::x64()),
            Err(DecodeError::Truncated {
                needed: 5,
                available: 3
            })
        );
        assert!(matches!(
            length(&[0x66; 15], Context::x64()),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn flags_without_full_decode() {
        let f = |b: &[u8]| eflags(b, Context::x64()).unwrap();
        assert_eq!(f(&[0x01, 0xc8]), Opcode::Add.eflags());
        assert_eq!(f(&[0x83, 0xd0, 0x01]), Opcode::Adc.eflags());
        assert_eq!(f(&[0xff, 0xc0]), Opcode::Inc.eflags());
        assert_eq!(f(&[0xff, 0xe0]), EFlags::empty());
        assert_eq!(f(&[0x74, 0x00]), Condition::Z.reads());
        assert_eq!(f(&[0x0f, 0x94, 0xc0]), Condition::Z.reads());
        assert_eq!(f(&[0xf7, 0xd0]), EFlags::empty());
        assert_eq!(f(&[0xdb, 0xf1]), Opcode::Fcomi.eflags());
        assert_eq!(f(&[0xc4, 0xe2, 0x70, 0xf2, 0xc2]), Opcode::Andn.eflags());
        assert_eq!(f(&[0x90]), EFlags::empty());
    }

    #[test]
    fn flags_agree_with_full_decode() {
        let samples: &[&[u8]] = &[
            &[0x01, 0xc8],
            &[0x19, 0xc8],
            &[0xd1, 0xe0],
            &[0xd1, 0xd0],
            &[0xf7, 0xe1],
            &[0x0f, 0xa3, 0xc8],
            &[0x0f, 0xba, 0xe8, 0x03],
            &[0x0f, 0xb1, 0x08],
            &[0xf3, 0x0f, 0xb8, 0xc1],
            &[0x0f, 0x4f, 0xc1],
            &[0xfc],
            &[0x9d],
            &[0xf3, 0xa6],
            &[0x0f, 0x2f, 0xc1],
        ];
        for bytes in samples {
            let (insn, _) = decoder::decode(bytes, Context::x64(), 0).unwrap();
            assert_eq!(
                eflags(bytes, Context::x64()).unwrap(),
                insn.eflags(),
                "{:02x?}",
                bytes
            );
        }
    }

    #[test]
    fn cti_fast_path_matches_full_decode() {
        let ctx = Context::x64();
        let samples: &[&[u8]] = &[
            &[0xeb, 0x10],
            &[0x75, 0xf0],
            &[0xe9, 0x00, 0x01, 0x00, 0x00],
            &[0xe8, 0xfb, 0xff, 0xff, 0xff],
            &[0x0f, 0x84, 0x10, 0x00, 0x00, 0x00],
            &[0xc3],
            &[0xff, 0xe0],
            &[0xe2, 0xfe],
            &[0x3e, 0x74, 0x02],
        ];
        for bytes in samples {
            let fast = decode_cti(bytes, ctx, 0x1000).unwrap();
            let (full, len) = decoder::decode(bytes, ctx, 0x1000).unwrap();
            assert_eq!(fast.length, len);
            assert_eq!(fast.instr.as_ref(), Some(&full), "{:02x?}", bytes);
        }
    }

    #[test]
    fn non_cti_has_no_instruction() {
        let fast = decode_cti(&[0x64, 0x48, 0x8b, 0x04, 0x25, 0, 0, 0, 0], Context::x64(), 0).unwrap();
        assert_eq!(fast.length, 9);
        assert!(fast.instr.is_none());
        assert_eq!(fast.seg, Some(Register::FS));
    }
}
