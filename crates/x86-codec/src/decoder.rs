//! Full decoder: raw bytes to [`Instruction`].
//!
//! Decoding runs in four steps:
//!
//! 1. the legacy prefix scan (`F0 F2 F3 66 67`, segment overrides, REX);
//! 2. recognition of a VEX, EVEX or XOP prefix;
//! 3. the decision-tree walk from the opcode byte to one template;
//! 4. operand materialization from the template's slots.
//!
//! Every read is bounded by the caller's buffer and by the 15-byte
//! architectural limit. Running out of input yields
//! [`DecodeError::Truncated`]; anything else that does not form an
//! instruction yields [`DecodeError::Invalid`].

use crate::error::DecodeError;
use crate::fast;
use crate::instr::{Instruction, OperandList, Prefixes, RawBits, RelField, RelKind};
use crate::mode::{Context, Mode};
use crate::opcode::Opcode;
use crate::operand::{sign_extend, MemRef, Operand};
use crate::register::{RegClass, Register};
use crate::size::{OpSize, SizeCtx, VarSize};
use crate::table::{
    prefix_column, tables, EvexInfo, Mandatory, Map, Node, NodeId, OpType, Slot, SlotList, Space,
    Tables, TemplateFlags, TemplateId,
};

/// Longest instruction the processor accepts.
pub const MAX_INSTR_LEN: usize = 15;

// ─── Entry points ────────────────────────────────────────────────────

/// Decodes the instruction at the start of `bytes`, which sits at address
/// `pc`.
///
/// Returns the instruction and the number of bytes it occupies. Relative
/// branch targets are resolved against `pc`; instruction-pointer-relative
/// memory keeps its raw offset.
///
/// # Examples
///
/// ```
/// use x86_codec::{decode, Context, Opcode, Operand, Register};
///
/// let (insn, len) = decode(&[0x48, 0x89, 0xc0], Context::x64(), 0).unwrap();
/// assert_eq!(len, 3);
/// assert_eq!(insn.opcode(), Opcode::Mov);
/// assert_eq!(insn.dsts(), &[Operand::Reg(Register::RAX)]);
/// ```
pub fn decode(bytes: &[u8], ctx: Context, pc: u64) -> Result<(Instruction, usize), DecodeError> {
    match Decoder::new(bytes, ctx, pc).run() {
        Err(DecodeError::Invalid {
            offset,
            length: None,
        }) => {
            let length = fast::length(bytes, ctx).ok();
            log::debug!(
                "invalid instruction at offset {} (skip length {:?})",
                offset,
                length
            );
            Err(DecodeError::Invalid { offset, length })
        }
        other => other,
    }
}

/// Decodes bytes copied away from their original address `orig_pc`.
///
/// Branch targets are computed as if the bytes still lived at `orig_pc`,
/// and the instruction's raw bits remember `orig_pc` so the linker can
/// later re-relativize them for a new location.
pub fn decode_from_copy(
    copy: &[u8],
    ctx: Context,
    orig_pc: u64,
) -> Result<(Instruction, usize), DecodeError> {
    decode(copy, ctx, orig_pc)
}

/// Address of the instruction following the one at `pc`, computed by the
/// length decoder alone.
pub fn decode_next_pc(bytes: &[u8], ctx: Context, pc: u64) -> Result<u64, DecodeError> {
    let len = fast::length(bytes, ctx)?;
    Ok(pc.wrapping_add(len as u64))
}

/// Iterator decoding consecutive instructions.
///
/// Yields `(address, instruction)` pairs and stops after the first error
/// or at the end of the buffer.
#[derive(Debug, Clone)]
pub struct DecodeIter<'a> {
    bytes: &'a [u8],
    ctx: Context,
    pc: u64,
    offset: usize,
    done: bool,
}

impl<'a> DecodeIter<'a> {
    /// Decodes `bytes` starting at address `pc`.
    pub fn new(bytes: &'a [u8], ctx: Context, pc: u64) -> Self {
        Self {
            bytes,
            ctx,
            pc,
            offset: 0,
            done: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<(u64, Instruction), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.bytes.len() {
            return None;
        }
        let at = self.pc.wrapping_add(self.offset as u64);
        match decode(&self.bytes[self.offset..], self.ctx, at) {
            Ok((insn, len)) => {
                self.offset += len;
                Some(Ok((at, insn)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ─── Input cursor ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn need(&self, n: usize) -> Result<(), DecodeError> {
        let end = self.pos + n;
        if end > MAX_INSTR_LEN {
            return Err(DecodeError::invalid(self.pos));
        }
        if end > self.bytes.len() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.bytes.len(),
            });
        }
        Ok(())
    }

    fn peek_at(&self, ahead: usize) -> Result<u8, DecodeError> {
        self.need(ahead + 1)?;
        Ok(self.bytes[self.pos + ahead])
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.peek_at(0)
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    /// Little-endian unsigned field of `n` bytes.
    fn uint(&mut self, n: usize) -> Result<u64, DecodeError> {
        self.need(n)?;
        let v = self.bytes[self.pos..self.pos + n]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        self.pos += n;
        Ok(v)
    }

    /// Little-endian signed field of `n` bytes.
    fn int(&mut self, n: usize) -> Result<i64, DecodeError> {
        let v = self.uint(n)?;
        Ok(sign_extend(v as i64, n as u16))
    }
}

// ─── Prefix state ────────────────────────────────────────────────────

/// Legacy prefixes seen before the opcode.
#[derive(Debug, Clone, Copy, Default)]
struct Legacy {
    lock: bool,
    f2: bool,
    f3: bool,
    /// Whichever of F2/F3 came last.
    rep: Option<Mandatory>,
    data: bool,
    addr: bool,
    seg: Option<u8>,
    rex: Option<u8>,
}

impl Legacy {
    fn rex_bit(&self, bit: u8) -> u8 {
        match self.rex {
            Some(r) if r & bit != 0 => 1,
            _ => 0,
        }
    }
}

fn scan_prefixes(cur: &mut Cursor<'_>, mode: Mode) -> Result<Legacy, DecodeError> {
    let mut p = Legacy::default();
    loop {
        let b = cur.peek()?;
        match b {
            0xf0 => p.lock = true,
            0xf2 => {
                p.f2 = true;
                p.rep = Some(Mandatory::F2);
            }
            0xf3 => {
                p.f3 = true;
                p.rep = Some(Mandatory::F3);
            }
            0x66 => p.data = true,
            0x67 => p.addr = true,
            0x26 | 0x2e | 0x36 | 0x3e | 0x64 | 0x65 => p.seg = Some(b),
            0x40..=0x4f if mode.is_64() => {
                p.rex = Some(b);
                cur.pos += 1;
                continue;
            }
            _ => break,
        }
        // REX only counts as the last prefix; an earlier one is a no-op.
        p.rex = None;
        cur.pos += 1;
    }
    Ok(p)
}

/// Segment register selected by an override byte.
pub(crate) fn segment_of(byte: u8) -> Register {
    match byte {
        0x26 => Register::ES,
        0x2e => Register::CS,
        0x36 => Register::SS,
        0x3e => Register::DS,
        0x64 => Register::FS,
        _ => Register::GS,
    }
}

/// Register-number extensions and vector fields from REX, VEX, EVEX or
/// XOP, each already shifted into place.
#[derive(Debug, Clone, Copy)]
struct Ext {
    space: Space,
    map: Map,
    pp: Mandatory,
    /// Added to ModR/M `reg`.
    reg: u8,
    /// Added to a register `rm`.
    rm: u8,
    /// Added to a memory base.
    base: u8,
    /// Added to a SIB index.
    index: u8,
    /// Added to a VSIB index only (EVEX.V').
    vidx: u8,
    vvvv: u8,
    w: bool,
    l: u8,
    z: bool,
    b: bool,
    aaa: u8,
}

impl Ext {
    fn legacy(p: &Legacy) -> Ext {
        let b = p.rex_bit(0x01) << 3;
        Ext {
            space: Space::Legacy,
            map: Map::OneByte,
            pp: Mandatory::None,
            reg: p.rex_bit(0x04) << 3,
            rm: b,
            base: b,
            index: p.rex_bit(0x02) << 3,
            vidx: 0,
            vvvv: 0,
            w: p.rex_bit(0x08) != 0,
            l: 0,
            z: false,
            b: false,
            aaa: 0,
        }
    }
}

/// Inverted single bit `bit` of `byte`, shifted to `to`.
fn inv(byte: u8, bit: u8, to: u8) -> u8 {
    ((!byte >> bit) & 1) << to
}

/// Parses a VEX/EVEX/XOP prefix if the next bytes form one.
fn extended(cur: &mut Cursor<'_>, p: &Legacy, mode: Mode) -> Result<Option<Ext>, DecodeError> {
    let lead = cur.peek()?;
    if !matches!(lead, 0xc4 | 0xc5 | 0x62 | 0x8f) {
        return Ok(None);
    }
    let next = cur.peek_at(1)?;
    let is_ext = match lead {
        0x8f => (next & 0x1f) >= 8,
        _ => mode.is_64() || next >> 6 == 3,
    };
    if !is_ext {
        return Ok(None);
    }
    let at = cur.pos;
    if p.data || p.rep.is_some() || p.rex.is_some() || p.lock {
        return Err(DecodeError::invalid(at));
    }
    cur.pos += 1;
    let base = Ext::legacy(p);
    let mut e = match lead {
        0xc5 => {
            let b1 = cur.byte()?;
            Ext {
                space: Space::Vex,
                map: Map::Esc0F,
                pp: Mandatory::from_pp(b1),
                reg: inv(b1, 7, 3),
                rm: 0,
                base: 0,
                index: 0,
                vvvv: (!b1 >> 3) & 0xf,
                w: false,
                l: (b1 >> 2) & 1,
                ..base
            }
        }
        0xc4 | 0x8f => {
            let b1 = cur.byte()?;
            let b2 = cur.byte()?;
            let map = Map::from_mmmmm(b1 & 0x1f, lead == 0x8f).ok_or(DecodeError::invalid(at + 1))?;
            Ext {
                space: if lead == 0x8f { Space::Xop } else { Space::Vex },
                map,
                pp: Mandatory::from_pp(b2),
                reg: inv(b1, 7, 3),
                rm: inv(b1, 5, 3),
                base: inv(b1, 5, 3),
                index: inv(b1, 6, 3),
                vvvv: (!b2 >> 3) & 0xf,
                w: b2 & 0x80 != 0,
                l: (b2 >> 2) & 1,
                ..base
            }
        }
        _ => {
            let p0 = cur.byte()?;
            let p1 = cur.byte()?;
            let p2 = cur.byte()?;
            if p0 & 0x0c != 0 || p1 & 0x04 == 0 {
                return Err(DecodeError::invalid(at + 1));
            }
            let map = Map::from_mmmmm(p0 & 3, false).ok_or(DecodeError::invalid(at + 1))?;
            let v_hi = inv(p2, 3, 4);
            Ext {
                space: Space::Evex,
                map,
                pp: Mandatory::from_pp(p1),
                reg: inv(p0, 7, 3) | inv(p0, 4, 4),
                rm: inv(p0, 5, 3) | inv(p0, 6, 4),
                base: inv(p0, 5, 3),
                index: inv(p0, 6, 3),
                vidx: v_hi,
                vvvv: ((!p1 >> 3) & 0xf) | v_hi,
                w: p1 & 0x80 != 0,
                l: (p2 >> 5) & 3,
                z: p2 & 0x80 != 0,
                b: p2 & 0x10 != 0,
                aaa: p2 & 7,
            }
        }
    };
    if !mode.is_64() {
        e.reg = 0;
        e.rm = 0;
        e.base = 0;
        e.index = 0;
        e.vidx = 0;
        e.vvvv &= 7;
    }
    Ok(Some(e))
}

// ─── Decision-tree walk ──────────────────────────────────────────────

/// Key values tested by the decision tree.
struct Keys {
    /// Prefix-level columns to try, in order.
    cols: [usize; 3],
    ncols: usize,
    x64: bool,
    modrm: Result<u8, DecodeError>,
    rex_b: bool,
    w: bool,
    l: u8,
}

fn select(t: &Tables, entry: NodeId, k: &Keys) -> Result<Option<TemplateId>, DecodeError> {
    if let Node::Prefix(cols) = t.node(entry) {
        for &c in &k.cols[..k.ncols] {
            if let Some(id) = descend(t, cols[c], k)? {
                return Ok(Some(id));
            }
        }
        return Ok(None);
    }
    descend(t, entry, k)
}

fn descend(t: &Tables, mut id: NodeId, k: &Keys) -> Result<Option<TemplateId>, DecodeError> {
    loop {
        id = match *t.node(id) {
            Node::Leaf(tid) => return Ok(Some(tid)),
            Node::Invalid | Node::Escape(_) | Node::Suffix3dnow | Node::Prefix(_) => {
                return Ok(None)
            }
            Node::Mode(c) => c[usize::from(k.x64)],
            Node::Reg(c) => c[usize::from((k.modrm? >> 3) & 7)],
            Node::Mod(c) => c[usize::from(k.modrm? >> 6 == 3)],
            Node::Rm(c) => c[usize::from(k.modrm? & 7)],
            Node::RexB(c) => c[usize::from(k.rex_b)],
            Node::W(c) => c[usize::from(k.w)],
            Node::VexL(c) => match c.get(usize::from(k.l)) {
                Some(&n) => n,
                None => return Ok(None),
            },
        };
    }
}

// ─── ModR/M ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ModRm {
    md: u8,
    reg: u8,
    rm: u8,
    sib: Option<u8>,
    disp: i32,
    disp_at: usize,
    disp_len: u8,
    /// Address width the memory form was parsed with.
    addr: u16,
}

impl ModRm {
    fn is_reg(&self) -> bool {
        self.md == 3
    }
}

/// 16-bit addressing: base and index for each `rm`.
pub(crate) const ADDR16: [(u8, Option<u8>); 8] = [
    (3, Some(6)),
    (3, Some(7)),
    (5, Some(6)),
    (5, Some(7)),
    (6, None),
    (7, None),
    (5, None),
    (3, None),
];

// ─── Decoder ─────────────────────────────────────────────────────────

struct Decoder<'a> {
    cur: Cursor<'a>,
    ctx: Context,
    pc: u64,
    lg: Legacy,
    ext: Ext,
    cx: SizeCtx,
    op: u8,
    modrm: Option<ModRm>,
    evex: Option<EvexInfo>,
    disp8: i32,
    rel: Option<RelField>,
    /// Pending relative branch: displacement and field width.
    branch: Option<(i64, u8)>,
    addr_used: bool,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8], ctx: Context, pc: u64) -> Self {
        let lg = Legacy::default();
        Decoder {
            cur: Cursor { bytes, pos: 0 },
            ctx,
            pc,
            lg,
            ext: Ext::legacy(&lg),
            cx: SizeCtx::new(ctx.mode, ctx.vendor),
            op: 0,
            modrm: None,
            evex: None,
            disp8: 1,
            rel: None,
            branch: None,
            addr_used: false,
        }
    }

    fn invalid(&self) -> DecodeError {
        DecodeError::invalid(self.cur.pos)
    }

    fn run(mut self) -> Result<(Instruction, usize), DecodeError> {
        let t = tables();
        let mode = self.ctx.mode;
        self.lg = scan_prefixes(&mut self.cur, mode)?;
        self.ext = match extended(&mut self.cur, &self.lg, mode)? {
            Some(e) => e,
            None => Ext::legacy(&self.lg),
        };
        self.cx.addr16 = self.lg.addr;

        // Opcode bytes and escapes.
        let opcode_at = self.cur.pos;
        self.op = self.cur.byte()?;
        let mut node = match self.ext.space {
            Space::Legacy => t.entry(Map::OneByte, self.op),
            _ => t.entry(self.ext.map, self.op),
        };
        let mut suffix3dnow = false;
        loop {
            let node_here = *t.node(node);
            // A VEX/EVEX/XOP prefix selects the map itself; 38, 3A and 0F
            // are plain opcode bytes there.
            if self.ext.space != Space::Legacy
                && matches!(node_here, Node::Escape(_) | Node::Suffix3dnow)
            {
                return Err(DecodeError::invalid(opcode_at));
            }
            match node_here {
                Node::Escape(m) => {
                    self.op = self.cur.byte()?;
                    node = t.entry(m, self.op);
                }
                Node::Suffix3dnow => {
                    let m = self.parse_modrm()?;
                    self.modrm = Some(m);
                    self.op = self.cur.byte()?;
                    node = t.entry(Map::Amd3dnow, self.op);
                    suffix3dnow = true;
                    break;
                }
                _ => break,
            }
        }

        let keys = self.keys();
        let tid = select(t, node, &keys)?.ok_or_else(|| DecodeError::invalid(opcode_at))?;
        let tpl = t.template(tid);
        let form = tpl.form;
        let consumed = self.gate(&form.space, form.mandatory, form.flags)?;

        self.cx.data16 = self.lg.data && consumed != Mandatory::P66;
        self.cx.rex_w = match self.ext.space {
            Space::Legacy => self.ext.w,
            _ => self.ext.w && mode.is_64(),
        };
        self.cx.vl = self.ext.l;

        if form.has_modrm() && !suffix3dnow {
            let m = self.parse_modrm()?;
            self.modrm = Some(m);
        }
        self.evex = form.evex;
        self.check_evex(form.flags)?;

        let (dslots, sslots) = t.slots(tid);
        self.check_vvvv(&dslots, &sslots)?;
        if let (Some(e), Some(m)) = (self.evex, self.modrm) {
            let bcast = self.ext.b && !m.is_reg();
            self.disp8 = i32::from(e.disp8_scale(self.cx.vector_bytes(), self.ext.w, bcast));
        }

        let mut dsts = OperandList::new();
        for s in dslots.iter() {
            let op = self.operand(*s)?;
            dsts.push(op);
        }
        let mut srcs = OperandList::new();
        for s in sslots.iter() {
            let op = self.operand(*s)?;
            srcs.push(op);
        }
        let len = self.cur.pos;

        if let Some((disp, width)) = self.branch {
            let target = self.branch_target(len, disp, width);
            for op in dsts.as_mut_slice().iter_mut().chain(srcs.as_mut_slice()) {
                if let Operand::Pc(pc) = op {
                    *pc = target;
                }
            }
        }

        let prefixes = self.prefixes(tpl.opcode, consumed, &dslots, &sslots, &dsts)?;
        let mut insn = Instruction::from_parts(tpl.opcode, dsts, srcs, prefixes);
        insn.set_raw(RawBits::new(&self.cur.bytes[..len], self.rel, self.pc));
        Ok((insn, len))
    }

    fn keys(&self) -> Keys {
        let space = self.ext.space;
        let mut cols = [0usize; 3];
        let mut ncols = 0;
        let mut push = |c: usize| {
            cols[ncols] = c;
            ncols += 1;
        };
        match space {
            Space::Legacy => {
                if let Some(rep) = self.lg.rep {
                    push(prefix_column(space, rep));
                    if !self.ctx.strict {
                        if self.lg.data {
                            push(prefix_column(space, Mandatory::P66));
                        }
                        push(prefix_column(space, Mandatory::None));
                    }
                } else if self.lg.data {
                    push(prefix_column(space, Mandatory::P66));
                    push(prefix_column(space, Mandatory::None));
                } else {
                    push(prefix_column(space, Mandatory::None));
                }
            }
            _ => push(prefix_column(space, self.ext.pp)),
        }
        let modrm = match self.modrm {
            Some(m) => Ok((m.md << 6) | (m.reg << 3) | m.rm),
            None => self.cur.peek(),
        };
        let reg_form = matches!(modrm, Ok(b) if b >> 6 == 3);
        let l = if space == Space::Evex && self.ext.b && reg_form {
            2
        } else {
            self.ext.l
        };
        Keys {
            cols,
            ncols,
            x64: self.ctx.mode.is_64(),
            modrm,
            rex_b: self.lg.rex_bit(0x01) != 0,
            w: self.ext.w,
            l,
        }
    }

    /// Leaf checks; returns the mandatory prefix the template consumed.
    fn gate(
        &self,
        space: &Space,
        mandatory: Mandatory,
        flags: TemplateFlags,
    ) -> Result<Mandatory, DecodeError> {
        if *space != self.ext.space {
            return Err(self.invalid());
        }
        let mode_bad = if self.ctx.mode.is_64() {
            flags.contains(TemplateFlags::X64_INVALID)
        } else {
            flags.contains(TemplateFlags::X86_INVALID)
        };
        if mode_bad {
            return Err(self.invalid());
        }
        match self.ext.space {
            Space::Legacy => {
                let present = match mandatory {
                    Mandatory::None => true,
                    Mandatory::P66 => self.lg.data,
                    Mandatory::F3 => self.lg.f3,
                    Mandatory::F2 => self.lg.f2,
                };
                if !present {
                    return Err(self.invalid());
                }
                Ok(mandatory)
            }
            _ => {
                if mandatory != self.ext.pp {
                    return Err(self.invalid());
                }
                Ok(Mandatory::None)
            }
        }
    }

    fn check_evex(&mut self, flags: TemplateFlags) -> Result<(), DecodeError> {
        let Some(info) = self.evex else {
            return Ok(());
        };
        if flags.contains(TemplateFlags::NOT_K0) && self.ext.aaa == 0 {
            return Err(self.invalid());
        }
        let reg_form = self.modrm.map_or(true, |m| m.is_reg());
        if self.ext.b && reg_form {
            if !(info.er || info.sae) {
                return Err(self.invalid());
            }
            self.cx.vl = 2;
        } else {
            if self.ext.l == 3 {
                return Err(self.invalid());
            }
            if self.ext.b && !info.broadcasts() {
                return Err(self.invalid());
            }
        }
        Ok(())
    }

    /// An unused `vvvv` must be all ones (zero after inversion).
    fn check_vvvv(&self, d: &SlotList, s: &SlotList) -> Result<(), DecodeError> {
        if self.ext.space == Space::Legacy {
            return Ok(());
        }
        let all = || d.iter().chain(s.iter());
        if all().any(|s| s.ty().uses_vvvv()) {
            return Ok(());
        }
        let vsib = all().any(|s| matches!(s.ty(), OpType::Vsib | OpType::VsibHalf));
        if self.ext.vvvv & 0xf != 0 || (self.ext.vvvv & 0x10 != 0 && !vsib) {
            return Err(self.invalid());
        }
        Ok(())
    }

    fn parse_modrm(&mut self) -> Result<ModRm, DecodeError> {
        let b = self.cur.byte()?;
        let mut m = ModRm {
            md: b >> 6,
            reg: (b >> 3) & 7,
            rm: b & 7,
            sib: None,
            disp: 0,
            disp_at: self.cur.pos,
            disp_len: 0,
            addr: self.cx.addr_size(),
        };
        if m.is_reg() {
            return Ok(m);
        }
        if m.addr == 2 {
            m.disp_len = match (m.md, m.rm) {
                (0, 6) => 2,
                (0, _) => 0,
                (1, _) => 1,
                _ => 2,
            };
        } else {
            let mut base = m.rm;
            if m.rm == 4 {
                let s = self.cur.byte()?;
                m.sib = Some(s);
                base = s & 7;
            }
            m.disp_len = match m.md {
                0 if base == 5 => 4,
                0 => 0,
                1 => 1,
                _ => 4,
            };
        }
        m.disp_at = self.cur.pos;
        m.disp = self.cur.int(usize::from(m.disp_len))? as i32;
        Ok(m)
    }

    fn need_modrm(&self) -> Result<ModRm, DecodeError> {
        self.modrm.ok_or_else(|| self.invalid())
    }

    fn seg(&self) -> Option<Register> {
        self.lg.seg.map(segment_of)
    }

    fn gpr(&self, num: u8, size: u16) -> Result<Register, DecodeError> {
        if size == 1 && self.lg.rex.is_none() && (4..8).contains(&num) {
            return Ok(Register::wrapping(RegClass::Gpr8High, num - 4));
        }
        Register::gpr(num, size).ok_or_else(|| self.invalid())
    }

    fn addr_reg(&self, num: u8) -> Result<Register, DecodeError> {
        Register::gpr(num, self.cx.addr_size()).ok_or_else(|| self.invalid())
    }

    fn stack_reg(&self, num: u8) -> Result<Register, DecodeError> {
        Register::gpr(num, self.ctx.mode.addr_bytes()).ok_or_else(|| self.invalid())
    }

    fn branch_target(&self, len: usize, disp: i64, width: u8) -> u64 {
        let next = self.pc.wrapping_add(len as u64);
        let mut target = next.wrapping_add(disp as u64);
        if width == 2 {
            target &= 0xffff;
        }
        if !self.ctx.mode.is_64() {
            target &= 0xffff_ffff;
        }
        target
    }

    /// Memory operand from a parsed ModR/M. `vsib` is the byte width of a
    /// vector index.
    fn memory(&mut self, m: &ModRm, size: u16, vsib: Option<u16>) -> Result<Operand, DecodeError> {
        let seg = self.seg();
        let scaled = if m.disp_len == 1 {
            m.disp.wrapping_mul(self.disp8)
        } else {
            m.disp
        };
        self.addr_used = true;

        if m.addr == 2 {
            if vsib.is_some() {
                return Err(self.invalid());
            }
            if m.md == 0 && m.rm == 6 {
                let mut r = MemRef::absolute(scaled, size);
                r.seg = seg;
                r.short_addr = true;
                return Ok(Operand::Mem(r));
            }
            let (b, i) = ADDR16[usize::from(m.rm)];
            let mut r = MemRef::absolute(scaled, size);
            r.seg = seg;
            r.base = Some(Register::wrapping(RegClass::Gpr16, b));
            if let Some(i) = i {
                r.index = Some(Register::wrapping(RegClass::Gpr16, i));
                r.scale = 1;
            }
            self.disp_flags(&mut r, m, m.rm != 6);
            return Ok(Operand::Mem(r));
        }

        let class = if m.addr == 8 {
            RegClass::Gpr64
        } else {
            RegClass::Gpr32
        };
        let mut r = MemRef::absolute(scaled, size);
        r.seg = seg;
        match m.sib {
            None => {
                if vsib.is_some() {
                    return Err(self.invalid());
                }
                if m.md == 0 && m.rm == 5 {
                    if self.ctx.mode.is_64() {
                        self.addr_used = false;
                        self.rel = Some(RelField {
                            offset: m.disp_at as u8,
                            width: 4,
                            kind: RelKind::RipRel,
                        });
                        return Ok(Operand::RipRel {
                            disp: m.disp,
                            seg,
                            size,
                        });
                    }
                    return Ok(Operand::Mem(r));
                }
                let base = m.rm | self.ext.base;
                r.base = Some(Register::wrapping(class, base));
                self.disp_flags(&mut r, m, base & 7 != 5);
            }
            Some(s) => {
                let ss = s >> 6;
                let idx = (s >> 3) & 7;
                let b = s & 7;
                if !(b == 5 && m.md == 0) {
                    r.base = Some(Register::wrapping(class, b | self.ext.base));
                }
                r.index = match vsib {
                    Some(bytes) => Some(vector(idx | self.ext.index | self.ext.vidx, bytes)),
                    None => {
                        let n = idx | self.ext.index;
                        (n != 4).then(|| Register::wrapping(class, n))
                    }
                };
                if r.index.is_some() {
                    r.scale = 1 << ss;
                }
                match r.base {
                    Some(_) => self.disp_flags(&mut r, m, b != 5),
                    None => r.short_addr = self.cx.addr16,
                }
            }
        }
        Ok(Operand::Mem(r))
    }

    /// Records a displacement wider than the minimal encoding.
    /// `optional_zero` says whether a zero displacement could be omitted.
    fn disp_flags(&self, r: &mut MemRef, m: &ModRm, optional_zero: bool) {
        if m.md == 1 && m.disp == 0 && optional_zero {
            r.encode_zero_disp = true;
        }
        if m.md == 2 {
            let scale = self.disp8;
            if r.disp % scale == 0 && i8::try_from(r.disp / scale).is_ok() {
                r.force_full_disp = true;
            }
        }
    }

    fn rm_operand(&mut self, ty: OpType, size: u16) -> Result<Operand, DecodeError> {
        let m = self.need_modrm()?;
        if m.is_reg() {
            let n = m.rm;
            let reg = match ty {
                OpType::RmGpr | OpType::RmGprReg => self.gpr(n | (self.ext.rm & 8), size)?,
                OpType::RmMmx | OpType::RmMmxReg => Register::mm(n),
                OpType::RmXmm | OpType::RmXmmReg => vector(n | self.ext.rm, size),
                OpType::RmMask | OpType::RmMaskReg => Register::k(n),
                OpType::RmBnd => Register::new(RegClass::Bound, n).ok_or_else(|| self.invalid())?,
                OpType::X87 => Register::st(n),
                _ => return Err(self.invalid()),
            };
            return Ok(Operand::Reg(reg));
        }
        match ty {
            OpType::RmGprReg
            | OpType::RmMmxReg
            | OpType::RmXmmReg
            | OpType::RmMaskReg
            | OpType::X87 => Err(self.invalid()),
            OpType::Vsib | OpType::VsibHalf => {
                let vl = self.cx.vector_bytes();
                let idx = if ty == OpType::Vsib { vl } else { (vl / 2).max(16) };
                self.memory(&m, size, Some(idx))
            }
            OpType::RmXmm if self.ext.b => {
                let elem = self.evex.map_or(size, |e| e.element(self.ext.w));
                self.memory(&m, elem, None)
            }
            _ => self.memory(&m, size, None),
        }
    }

    fn operand(&mut self, slot: Slot) -> Result<Operand, DecodeError> {
        let size = slot.size().resolve(&self.cx);
        let ty = slot.ty();
        if ty.uses_rm_field() {
            return self.rm_operand(ty, size);
        }
        let op = match ty {
            OpType::None => return Err(self.invalid()),
            OpType::Gpr => {
                let m = self.need_modrm()?;
                Operand::Reg(self.gpr(m.reg | (self.ext.reg & 8), size)?)
            }
            OpType::Mmx => Operand::Reg(Register::mm(self.need_modrm()?.reg)),
            OpType::Xmm => {
                let m = self.need_modrm()?;
                Operand::Reg(vector(m.reg | self.ext.reg, size))
            }
            OpType::Creg => Operand::Reg(Register::cr(self.need_modrm()?.reg | (self.ext.reg & 8))),
            OpType::Dreg => Operand::Reg(Register::dr(self.need_modrm()?.reg | (self.ext.reg & 8))),
            OpType::Sreg => {
                let n = self.need_modrm()?.reg;
                Operand::Reg(Register::new(RegClass::Segment, n).ok_or_else(|| self.invalid())?)
            }
            OpType::MaskReg => Operand::Reg(Register::k(self.need_modrm()?.reg)),
            OpType::Bnd => {
                let n = self.need_modrm()?.reg;
                Operand::Reg(Register::new(RegClass::Bound, n).ok_or_else(|| self.invalid())?)
            }
            OpType::VexGpr => Operand::Reg(self.gpr(self.ext.vvvv & 0xf, size)?),
            OpType::VexXmm => Operand::Reg(vector(self.ext.vvvv, size)),
            OpType::VexMask => Operand::Reg(Register::k(self.ext.vvvv)),
            OpType::EvexMask => Operand::Reg(Register::k(self.ext.aaa)),
            OpType::Is4Xmm => {
                let b = self.cur.byte()?;
                let n = if self.ctx.mode.is_64() { b >> 4 } else { (b >> 4) & 7 };
                Operand::Reg(vector(n, size))
            }
            OpType::Imm => {
                let v = self.cur.int(usize::from(size))?;
                Operand::imm(v, size)
            }
            OpType::Rel => {
                let at = self.cur.pos;
                let disp = self.cur.int(usize::from(size))?;
                self.rel = Some(RelField {
                    offset: at as u8,
                    width: size as u8,
                    kind: RelKind::Branch,
                });
                self.branch = Some((disp, size as u8));
                Operand::Pc(0)
            }
            OpType::FarPtr => {
                let off = self.cur.uint(usize::from(size.saturating_sub(2)))?;
                let selector = self.cur.uint(2)? as u16;
                Operand::FarPc { selector, pc: off }
            }
            OpType::Moffs => {
                let width = self.cx.addr_size();
                let addr = self.cur.uint(usize::from(width))?;
                self.addr_used = true;
                let seg = self.seg();
                if self.lg.addr {
                    let mut r = MemRef::absolute(sign_extend(addr as i64, width) as i32, size);
                    r.seg = seg;
                    r.short_addr = true;
                    Operand::Mem(r)
                } else {
                    Operand::Abs { addr, seg, size }
                }
            }
            OpType::GprAt(n) => {
                if slot.size() == OpSize::Var(VarSize::Addr) {
                    self.addr_used = true;
                }
                Operand::Reg(self.gpr(n, size)?)
            }
            OpType::Fixed(r) => Operand::Reg(r),
            OpType::PlusReg => Operand::Reg(self.gpr((self.op & 7) | (self.ext.base & 8), size)?),
            OpType::StackPush | OpType::StackPop | OpType::FrameTop => {
                let (num, disp) = match ty {
                    OpType::StackPush => (4, -i32::from(size)),
                    OpType::StackPop => (4, 0),
                    _ => (5, 0),
                };
                let mut r = MemRef::absolute(disp, size);
                r.base = Some(self.stack_reg(num)?);
                Operand::Mem(r)
            }
            OpType::StrSrc | OpType::StrDst | OpType::MaskMov | OpType::Xlat => {
                self.addr_used = true;
                let num = match ty {
                    OpType::StrSrc => 6,
                    OpType::Xlat => 3,
                    _ => 7,
                };
                let mut r = MemRef::absolute(0, size);
                r.base = Some(self.addr_reg(num)?);
                if ty != OpType::StrDst {
                    r.seg = self.seg();
                }
                if ty == OpType::Xlat {
                    r.index = Some(Register::AL);
                    r.scale = 1;
                }
                Operand::Mem(r)
            }
            OpType::One => Operand::imm(1, 1),
            _ => return Err(self.invalid()),
        };
        Ok(op)
    }

    fn prefixes(
        &self,
        opcode: Opcode,
        consumed: Mandatory,
        dslots: &SlotList,
        sslots: &SlotList,
        dsts: &OperandList,
    ) -> Result<Prefixes, DecodeError> {
        let lg = &self.lg;
        let mut p = Prefixes::empty();
        let mem_dst = dsts.first().map_or(false, Operand::is_memory_reference);

        if lg.lock {
            if !(opcode.is_lockable() && mem_dst) {
                return Err(self.invalid());
            }
            p |= Prefixes::LOCK;
        }

        let f2 = lg.f2 && consumed != Mandatory::F2;
        let f3 = lg.f3 && consumed != Mandatory::F3;
        let rep = match (f2, f3) {
            (true, true) => lg.rep,
            (true, false) => Some(Mandatory::F2),
            (false, true) => Some(Mandatory::F3),
            (false, false) => None,
        };
        let hle = (lg.lock && opcode.is_lockable()) || (opcode == Opcode::Xchg && mem_dst);
        if let Some(r) = rep {
            p |= match (hle, r) {
                (true, Mandatory::F2) => Prefixes::XACQUIRE,
                (true, _) => Prefixes::XRELEASE,
                (false, Mandatory::F2) => Prefixes::REPNE,
                (false, _) => Prefixes::REP,
            };
        }

        if opcode >= Opcode::Jo && opcode <= Opcode::JnleShort {
            match lg.seg {
                Some(0x2e) => p |= Prefixes::JCC_NOT_TAKEN,
                Some(0x3e) => p |= Prefixes::JCC_TAKEN,
                _ => {}
            }
        }

        if lg.data && consumed != Mandatory::P66 {
            let sized = dslots
                .iter()
                .chain(sslots.iter())
                .filter(|s| !matches!(s.ty(), OpType::Rel | OpType::FarPtr))
                .any(|s| s.size().depends_on_data16(&self.cx));
            if !sized {
                p |= Prefixes::DATA;
            }
        }
        if lg.addr && !self.addr_used {
            p |= Prefixes::ADDR;
        }

        if self.ext.space == Space::Evex {
            if self.ext.z {
                p |= Prefixes::EVEX_Z;
            }
            if self.ext.b {
                p |= Prefixes::EVEX_B;
                let reg_form = self.modrm.map_or(true, |m| m.is_reg());
                if reg_form && self.evex.map_or(false, |e| e.er) {
                    p |= Prefixes::from_rounding(self.ext.l);
                }
            }
            if self.ext.z && mem_dst {
                return Err(self.invalid());
            }
        }
        Ok(p)
    }
}

/// Vector register `num` of the class that holds `size` bytes.
pub(crate) fn vector(num: u8, size: u16) -> Register {
    let class = match size {
        0..=16 => RegClass::Xmm,
        17..=32 => RegClass::Ymm,
        _ => RegClass::Zmm,
    };
    Register::wrapping(class, num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Vendor;

    fn x64(bytes: &[u8]) -> (Instruction, usize) {
        decode(bytes, Context::x64(), 0x1000).unwrap()
    }

    fn x86(bytes: &[u8]) -> (Instruction, usize) {
        decode(bytes, Context::x86(), 0x1000).unwrap()
    }

    #[test]
    fn mov_register_to_register() {
        let (i, len) = x64(&[0x48, 0x89, 0xc0]);
        assert_eq!(len, 3);
        assert_eq!(i.opcode(), Opcode::Mov);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::RAX)]);
        assert_eq!(i.srcs(), &[Operand::Reg(Register::RAX)]);
        assert!(i.prefixes().is_empty());
    }

    #[test]
    fn vex_map_bytes_are_not_escapes() {
        // c5 selects map 0F; a following 38 is an opcode byte, not the
        // 0F 38 escape.
        assert_eq!(
            decode(&[0xc5, 0xf9, 0x38, 0x00, 0xc1], Context::x64(), 0),
            Err(DecodeError::Invalid {
                offset: 2,
                length: Some(4)
            })
        );
        assert!(matches!(
            decode(&[0xc4, 0xe1, 0xfd, 0x3a, 0x00, 0x25, 0, 0, 0, 0, 0], Context::x64(), 0),
            Err(DecodeError::Invalid { .. })
        ));
        let (i, len) = x64(&[0xc4, 0xe2, 0x79, 0x00, 0xc1]);
        assert_eq!((i.opcode(), len), (Opcode::Vpshufb, 5));
    }

    #[test]
    fn rex_before_legacy_prefix_is_dropped() {
        // 48 66 89 c0: the REX is not last, so this is a 16-bit move.
        let (i, len) = x64(&[0x48, 0x66, 0x89, 0xc0]);
        assert_eq!(len, 4);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::AX)]);
    }

    #[test]
    fn truncated_input_is_reported() {
        assert_eq!(
            decode(&[0x48, 0x8b], Context::x64(), 0),
            Err(DecodeError::Truncated {
                needed: 3,
                available: 2
            })
        );
        assert!(matches!(
            decode(&[0xe8, 0x00, 0x00], Context::x64(), 0),
            Err(DecodeError::Truncated { .. })
        ));
        assert!(matches!(
            decode(&[], Context::x64(), 0),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn overlong_prefix_run_is_invalid() {
        let mut bytes = [0x66u8; 16];
        bytes[15] = 0x90;
        assert!(matches!(
            decode(&bytes, Context::x64(), 0),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn rip_relative_keeps_raw_offset() {
        // mov rax, [rip + 0x10]
        let (i, len) = x64(&[0x48, 0x8b, 0x05, 0x10, 0, 0, 0]);
        assert_eq!(len, 7);
        assert_eq!(
            i.srcs()[0],
            Operand::RipRel {
                disp: 0x10,
                seg: None,
                size: 8
            }
        );
        let raw = i.raw().unwrap();
        let rel = raw.rel.unwrap();
        assert_eq!((rel.offset, rel.width, rel.kind), (3, 4, RelKind::RipRel));
        assert_eq!(i.rip_rel_target(0x1007), Some(0x1017));
    }

    #[test]
    fn absolute_in_32_bit_mode() {
        let (i, _) = x86(&[0x8b, 0x05, 0x00, 0x10, 0, 0]);
        assert_eq!(i.srcs()[0], Operand::Mem(MemRef::absolute(0x1000, 4)));
    }

    #[test]
    fn sib_with_index_and_disp8() {
        // mov eax, [rbx + rcx*4 + 8]
        let (i, _) = x64(&[0x8b, 0x44, 0x8b, 0x08]);
        let m = MemRef::new(Some(Register::RBX), Some(Register::RCX), 4, 8, 4).unwrap();
        assert_eq!(i.srcs()[0], Operand::Mem(m));
    }

    #[test]
    fn zero_disp8_is_remembered() {
        // mov eax, [rax + 0] with an explicit disp8
        let (i, _) = x64(&[0x8b, 0x40, 0x00]);
        let m = i.srcs()[0].mem_ref().copied().unwrap();
        assert!(m.encode_zero_disp);
        // [rbp + 0] needs the displacement anyway.
        let (i, _) = x64(&[0x8b, 0x45, 0x00]);
        assert!(!i.srcs()[0].mem_ref().unwrap().encode_zero_disp);
    }

    #[test]
    fn sixteen_bit_addressing() {
        // 67 8b 00: mov eax, [bx + si]
        let (i, len) = x86(&[0x67, 0x8b, 0x00]);
        assert_eq!(len, 3);
        let m = MemRef::new(Some(Register::BX), Some(Register::SI), 1, 0, 4).unwrap();
        assert_eq!(i.srcs()[0], Operand::Mem(m));
        assert!(!i.prefixes().contains(Prefixes::ADDR));
        // 67 8b 06 34 12: mov eax, [0x1234]
        let (i, len) = x86(&[0x67, 0x8b, 0x06, 0x34, 0x12]);
        assert_eq!(len, 5);
        let m = i.srcs()[0].mem_ref().copied().unwrap();
        assert!(m.short_addr && m.base.is_none());
        assert_eq!(m.disp, 0x1234);
    }

    #[test]
    fn vex_prefix_versus_lds_in_32_bit_mode() {
        // c5 f8 77: vzeroupper in both modes.
        assert_eq!(x86(&[0xc5, 0xf8, 0x77]).0.opcode(), Opcode::Vzeroupper);
        assert_eq!(x64(&[0xc5, 0xf8, 0x77]).0.opcode(), Opcode::Vzeroupper);
        // c5 06: lds eax, [esi] in 32-bit mode.
        let (i, len) = x86(&[0xc5, 0x06]);
        assert_eq!(i.opcode(), Opcode::Lds);
        assert_eq!(len, 2);
    }

    #[test]
    fn vex_after_rex_is_invalid() {
        assert!(matches!(
            decode(&[0x48, 0xc5, 0xf8, 0x77], Context::x64(), 0),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn mandatory_prefix_is_consumed() {
        // f3 0f 10 c1: movss xmm0, xmm1
        let (i, _) = x64(&[0xf3, 0x0f, 0x10, 0xc1]);
        assert_eq!(i.opcode(), Opcode::Movss);
        assert!(!i.prefixes().contains(Prefixes::REP));
        // 66 0f 6f c1: movdqa xmm0, xmm1
        let (i, _) = x64(&[0x66, 0x0f, 0x6f, 0xc1]);
        assert_eq!(i.opcode(), Opcode::Movdqa);
        assert!(!i.prefixes().contains(Prefixes::DATA));
        // f3 90: pause
        assert_eq!(x64(&[0xf3, 0x90]).0.opcode(), Opcode::Pause);
    }

    #[test]
    fn strict_mode_refuses_prefix_fallback() {
        // f2 0f 6f c1 has no F2 variant; lax decoding keeps F2 as a prefix.
        let (i, _) = x64(&[0xf2, 0x0f, 0x6f, 0xc1]);
        assert_eq!(i.opcode(), Opcode::Movq);
        assert!(i.prefixes().contains(Prefixes::REPNE));
        assert!(matches!(
            decode(&[0xf2, 0x0f, 0x6f, 0xc1], Context::x64().strict(true), 0),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn data_prefix_without_effect_is_recorded() {
        // 66 48 89 c0: REX.W wins, the 66 is inert.
        let (i, _) = x64(&[0x66, 0x48, 0x89, 0xc0]);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::RAX)]);
        assert!(i.prefixes().contains(Prefixes::DATA));
    }

    #[test]
    fn relative_branch_targets() {
        let (i, len) = x64(&[0xe9, 0x7b, 0x00, 0x00, 0x00]);
        assert_eq!(len, 5);
        assert_eq!(i.opcode(), Opcode::Jmp);
        assert_eq!(i.srcs(), &[Operand::Pc(0x1000 + 5 + 0x7b)]);
        let rel = i.raw().unwrap().rel.unwrap();
        assert_eq!((rel.offset, rel.width, rel.kind), (1, 4, RelKind::Branch));

        let (i, _) = x64(&[0x74, 0xfe]);
        assert_eq!(i.opcode(), Opcode::JzShort);
        assert_eq!(i.srcs(), &[Operand::Pc(0x1000)]);
    }

    #[test]
    fn copy_resolves_against_original_address() {
        let (i, _) = decode_from_copy(&[0xeb, 0x10], Context::x64(), 0x4000).unwrap();
        assert_eq!(i.srcs(), &[Operand::Pc(0x4012)]);
        assert_eq!(i.raw().unwrap().orig_pc, 0x4000);
        assert_eq!(decode_next_pc(&[0xeb, 0x10], Context::x64(), 0x4000), Ok(0x4002));
    }

    #[test]
    fn branch_hints() {
        let (i, _) = x64(&[0x3e, 0x74, 0x00]);
        assert!(i.prefixes().contains(Prefixes::JCC_TAKEN));
        let (i, _) = x64(&[0x2e, 0x0f, 0x84, 0, 0, 0, 0]);
        assert!(i.prefixes().contains(Prefixes::JCC_NOT_TAKEN));
    }

    #[test]
    fn lock_needs_lockable_memory_destination() {
        // lock add [rax], ecx
        let (i, _) = x64(&[0xf0, 0x01, 0x08]);
        assert!(i.prefixes().contains(Prefixes::LOCK));
        // lock add eax, ecx
        assert!(matches!(
            decode(&[0xf0, 0x01, 0xc8], Context::x64(), 0),
            Err(DecodeError::Invalid { .. })
        ));
        // lock mov [rax], ecx
        assert!(decode(&[0xf0, 0x89, 0x08], Context::x64(), 0).is_err());
    }

    #[test]
    fn hle_prefixes() {
        let (i, _) = x64(&[0xf2, 0xf0, 0x01, 0x08]);
        assert!(i.prefixes().contains(Prefixes::XACQUIRE | Prefixes::LOCK));
        let (i, _) = x64(&[0xf3, 0x87, 0x08]);
        assert!(i.prefixes().contains(Prefixes::XRELEASE));
    }

    #[test]
    fn rep_string_ops() {
        let (i, _) = x64(&[0xf3, 0xa4]);
        assert_eq!(i.opcode(), Opcode::Movs);
        assert!(i.is_rep_string_op());
        let dst = i.dsts()[0].mem_ref().copied().unwrap();
        assert_eq!(dst.base, Some(Register::RDI));
        let src = i.srcs()[0].mem_ref().copied().unwrap();
        assert_eq!(src.base, Some(Register::RSI));
    }

    #[test]
    fn high_byte_registers_depend_on_rex() {
        // 88 e0: mov al, ah
        let (i, _) = x64(&[0x88, 0xe0]);
        assert_eq!(i.srcs(), &[Operand::Reg(Register::AH)]);
        // 40 88 e0: mov al, spl
        let (i, _) = x64(&[0x40, 0x88, 0xe0]);
        assert_eq!(i.srcs(), &[Operand::Reg(Register::SPL)]);
    }

    #[test]
    fn invalid_in_64_bit_mode() {
        assert!(matches!(
            decode(&[0x27], Context::x64(), 0),
            Err(DecodeError::Invalid { .. })
        ));
        assert_eq!(x86(&[0x27]).0.opcode(), Opcode::Daa);
    }

    #[test]
    fn moffs_uses_address_width() {
        let (i, len) = x64(&[0xa1, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(len, 9);
        assert_eq!(
            i.srcs()[0],
            Operand::Abs {
                addr: 0x0807_0605_0403_0201,
                seg: None,
                size: 4
            }
        );
        let (i, len) = x86(&[0xa1, 0x00, 0x10, 0, 0]);
        assert_eq!(len, 5);
        assert!(matches!(i.srcs()[0], Operand::Abs { addr: 0x1000, .. }));
    }

    #[test]
    fn evex_compressed_displacement() {
        // vaddps zmm1, zmm2, [rax + 0x40] (disp8 = 1, scaled by 64)
        let (i, len) = x64(&[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01]);
        assert_eq!(len, 7);
        assert_eq!(i.opcode(), Opcode::Vaddps);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::zmm(1))]);
        assert_eq!(i.srcs()[0], Operand::Reg(Register::K0));
        assert_eq!(i.srcs()[1], Operand::Reg(Register::zmm(2)));
        let m = i.srcs()[2].mem_ref().copied().unwrap();
        assert_eq!((m.base, m.disp, m.size), (Some(Register::RAX), 0x40, 64));
    }

    #[test]
    fn evex_broadcast_uses_element_size() {
        // vaddps zmm1{k1}, zmm2, [rax]{1to16}
        let (i, _) = x64(&[0x62, 0xf1, 0x6c, 0x59, 0x58, 0x08]);
        assert!(i.prefixes().contains(Prefixes::EVEX_B));
        assert_eq!(i.srcs()[0], Operand::Reg(Register::k(1)));
        assert_eq!(i.srcs()[2].mem_ref().unwrap().size, 4);
    }

    #[test]
    fn evex_rounding_in_register_form() {
        // vaddps zmm1, zmm2, zmm3, {rz-sae}
        let (i, _) = x64(&[0x62, 0xf1, 0x6c, 0x78, 0x58, 0xcb]);
        assert_eq!(i.prefixes().rounding(), 3);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::zmm(1))]);
    }

    #[test]
    fn three_dnow_suffix() {
        // 0f 0f c1 9e: pfadd mm0, mm1
        let (i, len) = x64(&[0x0f, 0x0f, 0xc1, 0x9e]);
        assert_eq!(len, 4);
        assert_eq!(i.opcode(), Opcode::Pfadd);
        assert_eq!(i.dsts(), &[Operand::Reg(Register::mm(0))]);
    }

    #[test]
    fn vendor_changes_near_branch_width() {
        // 66 e8 rel16 on AMD, rel32 (66 ignored) on Intel.
        let bytes = [0x66, 0xe8, 0x10, 0x00, 0x00, 0x00];
        let (_, intel) = decode(&bytes, Context::x64(), 0).unwrap();
        assert_eq!(intel, 6);
        let amd = Context::x64().with_vendor(Vendor::Amd);
        let (_, len) = decode(&bytes, amd, 0).unwrap();
        assert_eq!(len, 4);
    }

    #[test]
    fn invalid_reports_skip_length() {
        // lock add eax, ecx: well-formed length, invalid prefix.
        let err = decode(&[0xf0, 0x01, 0xc8], Context::x64(), 0).unwrap_err();
        assert_eq!(err.skip_length(), Some(3));
    }

    #[test]
    fn iterator_walks_a_buffer() {
        let code = [0x55, 0x48, 0x89, 0xe5, 0x5d, 0xc3];
        let ops: Vec<_> = DecodeIter::new(&code, Context::x64(), 0x400)
            .map(|r| r.map(|(pc, i)| (pc, i.opcode())))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            ops,
            vec![
                (0x400, Opcode::Push),
                (0x401, Opcode::Mov),
                (0x404, Opcode::Pop),
                (0x405, Opcode::Ret)
            ]
        );
    }
}
