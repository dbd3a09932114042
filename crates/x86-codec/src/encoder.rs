//! Encoder: [`Instruction`] to machine-code bytes.
//!
//! Encoding inverts the decoder. The templates of the instruction's opcode
//! are tried in table order. For each one the encoder searches the free
//! encoding knobs (operand-size prefix, W, vector length, address-size
//! prefix) for a setting under which every operand fits its slot, then
//! emits prefixes, opcode, ModR/M, SIB, displacement and immediates.
//!
//! A position-dependent field (a branch displacement, a RIP-relative
//! displacement to a known target, or the absolute address of another
//! instruction) is left zeroed and described by a [`Fixup`]. [`encode`]
//! resolves address targets on the spot; instruction targets are resolved
//! by [`crate::linker::Block`].
//!
//! ```
//! use x86_codec::{encode_to_vec, Context, Instruction, Operand, Register};
//!
//! let mov = Instruction::mov(Operand::Reg(Register::RAX), Operand::Reg(Register::RCX));
//! assert_eq!(encode_to_vec(&mov, Context::x64(), 0).unwrap(), [0x48, 0x89, 0xc8]);
//! ```

use alloc::format;
use alloc::vec::Vec;
use core::fmt;

use crate::decoder::{vector, ADDR16, MAX_INSTR_LEN};
use crate::error::EncodeError;
use crate::instr::{EncodingHint, Instruction, Prefixes};
use crate::linker;
use crate::mode::Context;
use crate::opcode::Opcode;
use crate::operand::{sign_extend, MemRef, Operand};
use crate::register::{RegClass, Register};
use crate::size::SizeCtx;
use crate::table::{tables, Form, Mandatory, Map, ModrmUse, OpType, Slot, Space, TemplateFlags, TemplateId, Tables};

// ─── InstrBytes ──────────────────────────────────────────────────────

/// Stack-allocated byte buffer for one encoded instruction.
///
/// The backing array is larger than the 15-byte architectural limit so
/// that an over-long encoding can be built and then rejected.
#[derive(Clone)]
pub struct InstrBytes {
    data: [u8; InstrBytes::CAPACITY],
    len: u8,
}

impl InstrBytes {
    const CAPACITY: usize = 32;

    /// Empty buffer.
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: [0; Self::CAPACITY],
            len: 0,
        }
    }

    /// Buffer holding `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is longer than the buffer capacity.
    pub fn from_slice(src: &[u8]) -> Self {
        let mut b = Self::new();
        b.extend_from_slice(src);
        b
    }

    /// Appends one byte.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        assert!(
            (self.len as usize) < Self::CAPACITY,
            "InstrBytes overflow: capacity {}",
            Self::CAPACITY
        );
        self.data[self.len as usize] = byte;
        self.len += 1;
    }

    /// Appends `src`.
    pub fn extend_from_slice(&mut self, src: &[u8]) {
        for &b in src {
            self.push(b);
        }
    }

    /// Appends the low `width` bytes of `value`, little-endian.
    fn push_le(&mut self, value: u64, width: u8) {
        for i in 0..u32::from(width) {
            self.push((value >> (8 * i)) as u8);
        }
    }

    /// Number of bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether no bytes have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copies the bytes into a `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_ref().to_vec()
    }
}

impl Default for InstrBytes {
    fn default() -> Self {
        Self::new()
    }
}

impl core::ops::Deref for InstrBytes {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

impl AsRef<[u8]> for InstrBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for InstrBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for InstrBytes {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl Eq for InstrBytes {}

impl PartialEq<[u8]> for InstrBytes {
    fn eq(&self, other: &[u8]) -> bool {
        **self == *other
    }
}

impl PartialEq<Vec<u8>> for InstrBytes {
    fn eq(&self, other: &Vec<u8>) -> bool {
        **self == **other
    }
}

// ─── Fixups ──────────────────────────────────────────────────────────

/// How a position-dependent field is computed and how wide it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixupKind {
    /// 8-bit branch displacement from the end of the instruction.
    Rel8,
    /// 16-bit branch displacement; the target is truncated to 16 bits.
    Rel16,
    /// 32-bit branch displacement.
    Rel32,
    /// 32-bit RIP-relative memory displacement.
    RipRel32,
    /// 16-bit absolute address.
    Abs16,
    /// 32-bit absolute address.
    Abs32,
    /// 64-bit absolute address.
    Abs64,
}

impl FixupKind {
    /// Field width in bytes.
    pub const fn width(self) -> usize {
        match self {
            FixupKind::Rel8 => 1,
            FixupKind::Rel16 | FixupKind::Abs16 => 2,
            FixupKind::Rel32 | FixupKind::RipRel32 | FixupKind::Abs32 => 4,
            FixupKind::Abs64 => 8,
        }
    }

    /// Whether the field holds a distance rather than an address.
    pub const fn is_relative(self) -> bool {
        matches!(
            self,
            FixupKind::Rel8 | FixupKind::Rel16 | FixupKind::Rel32 | FixupKind::RipRel32
        )
    }
}

/// What a fixup points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixupTarget {
    /// A known address.
    Addr(u64),
    /// The start of instruction `index` of the enclosing block, plus `disp`.
    Instr {
        /// Instruction index.
        index: usize,
        /// Byte offset added to the instruction's address.
        disp: i32,
    },
}

/// A zeroed field in an encoding that still needs its final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixup {
    /// Byte offset of the field in the instruction.
    pub offset: u8,
    /// Field kind.
    pub kind: FixupKind,
    /// Target.
    pub target: FixupTarget,
}

/// Position-independent encoding of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInstr {
    /// Encoded bytes; a fixup field is zero.
    pub bytes: InstrBytes,
    /// The one position-dependent field, if any.
    pub fixup: Option<Fixup>,
}

impl EncodedInstr {
    /// Encoded length.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoding is empty (never true for a real instruction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the bytes into `out` as if placed at `pc`, resolving an
    /// address fixup.
    ///
    /// Returns the number of bytes written.
    pub fn write_at(&self, ctx: Context, pc: u64, out: &mut [u8]) -> Result<usize, EncodeError> {
        let n = self.len();
        if out.len() < n {
            return Err(EncodeError::BufferTooSmall {
                needed: n,
                available: out.len(),
            });
        }
        out[..n].copy_from_slice(&self.bytes);
        if let Some(fixup) = self.fixup {
            match fixup.target {
                FixupTarget::Addr(target) => {
                    linker::apply_fixup(&mut out[..n], &fixup, ctx.mode, pc, target)?;
                }
                FixupTarget::Instr { index, .. } => {
                    return Err(EncodeError::UnresolvedTarget { index });
                }
            }
        }
        Ok(n)
    }
}

// ─── Entry points ────────────────────────────────────────────────────

/// Encodes `insn` as if placed at `pc` into `out`.
///
/// An instruction still carrying the raw bytes it was decoded from is
/// copied verbatim, with its relative field re-targeted for `pc`.
/// Returns the number of bytes written.
pub fn encode(insn: &Instruction, ctx: Context, pc: u64, out: &mut [u8]) -> Result<usize, EncodeError> {
    if let Some(raw) = insn.raw() {
        return linker::copy_raw(raw, ctx, pc, out);
    }
    encode_instruction(insn, ctx)?.write_at(ctx, pc, out)
}

/// Like [`encode`], returning a fresh `Vec`.
pub fn encode_to_vec(insn: &Instruction, ctx: Context, pc: u64) -> Result<Vec<u8>, EncodeError> {
    let mut buf = [0u8; MAX_INSTR_LEN];
    let n = encode(insn, ctx, pc, &mut buf)?;
    Ok(buf[..n].to_vec())
}

/// Selects a template for `insn` and produces its position-independent
/// encoding.
///
/// Raw bytes cached on the instruction are ignored.
pub fn encode_instruction(insn: &Instruction, ctx: Context) -> Result<EncodedInstr, EncodeError> {
    let t = tables();
    let opcode = insn.opcode();
    let mut late = None;
    for tid in t.templates_of(opcode) {
        let plan = match select(t, tid, insn, ctx) {
            Ok(plan) => plan,
            Err(why) => {
                log::trace!("{:?}: template {} rejected: {}", opcode, tid.index(), why);
                continue;
            }
        };
        match plan.emit(insn, ctx) {
            Ok(e) => return Ok(e),
            Err(e) => {
                log::trace!("{:?}: template {} failed to emit: {}", opcode, tid.index(), e);
                late = Some(e);
            }
        }
    }
    log::debug!("no template of {:?} encodes {}", opcode, insn);
    Err(late.unwrap_or(EncodeError::NoMatchingTemplate { opcode }))
}

// ─── Template selection ──────────────────────────────────────────────

/// Why a template (or one knob setting of it) does not fit.
type Reject = &'static str;

/// Free encoding choices a template leaves open.
#[derive(Debug, Clone, Copy)]
struct Knobs {
    data16: bool,
    addr16: bool,
    w: bool,
    vl: u8,
}

/// A template with every field decided, ready to emit.
struct Plan {
    form: Form,
    knobs: Knobs,
    fields: Fields,
    ext: Ext,
}

/// Fixed or free boolean choice, tried false first.
fn choices(fixed: Option<bool>) -> &'static [bool] {
    match fixed {
        Some(true) => &[true],
        Some(false) => &[false],
        None => &[false, true],
    }
}

fn select(t: &Tables, tid: TemplateId, insn: &Instruction, ctx: Context) -> Result<Plan, Reject> {
    let form = t.template(tid).form;
    let x64 = ctx.mode.is_64();
    let bad_mode = if x64 {
        TemplateFlags::X64_INVALID
    } else {
        TemplateFlags::X86_INVALID
    };
    if form.flags.contains(bad_mode) {
        return Err("not encodable in this mode");
    }
    if insn.hint() == EncodingHint::Evex && form.space != Space::Evex {
        return Err("EVEX encoding requested");
    }
    let (dslots, sslots) = t.slots(tid);
    if dslots.len() != insn.num_dsts() || sslots.len() != insn.num_srcs() {
        return Err("operand count");
    }
    check_prefixes(insn, &form)?;

    let p = insn.prefixes();
    let legacy = form.space == Space::Legacy;
    let evex_b = form.space == Space::Evex && p.contains(Prefixes::EVEX_B);
    let reg_form = !insn
        .dsts()
        .iter()
        .chain(insn.srcs())
        .any(Operand::is_memory_reference);
    if evex_b {
        let info = form.evex.ok_or("EVEX template without EVEX data")?;
        if reg_form {
            if !(info.er || info.sae) {
                return Err("no rounding control or SAE on this template");
            }
            if p.rounding() != 0 && !info.er {
                return Err("no embedded rounding on this template");
            }
        } else if !info.broadcasts() {
            return Err("no broadcast on this template");
        }
    }

    let data16 = if !legacy || form.mandatory == Mandatory::P66 {
        Some(false)
    } else if p.contains(Prefixes::DATA) {
        Some(true)
    } else {
        None
    };
    let w = match form.w {
        Some(w) => Some(w),
        None if legacy && !x64 => Some(false),
        None => None,
    };
    let addr16 = if p.contains(Prefixes::ADDR) { Some(true) } else { None };
    let (mut vl_lo, mut vl_hi) = match (form.l, form.space) {
        (Some(l), _) => (l, l),
        (None, Space::Legacy) => (0, 0),
        (None, Space::Vex | Space::Xop) => (0, 1),
        (None, Space::Evex) => (0, 2),
    };
    if evex_b && reg_form {
        if !(vl_lo..=vl_hi).contains(&2) {
            return Err("rounding control needs the 512-bit form");
        }
        (vl_lo, vl_hi) = (2, 2);
    }

    let mut last = "operands do not fit";
    for vl in vl_lo..=vl_hi {
        for &w in choices(w) {
            for &data16 in choices(data16) {
                for &addr16 in choices(addr16) {
                    let knobs = Knobs { data16, addr16, w, vl };
                    match fit(&form, knobs, &dslots, &sslots, insn, ctx, evex_b && !reg_form) {
                        Ok((fields, ext)) => {
                            return Ok(Plan {
                                form,
                                knobs,
                                fields,
                                ext,
                            })
                        }
                        Err(why) => last = why,
                    }
                }
            }
        }
    }
    Err(last)
}

/// Prefix requests that depend only on the template, not the knobs.
fn check_prefixes(insn: &Instruction, form: &Form) -> Result<(), Reject> {
    let p = insn.prefixes();
    let opcode = insn.opcode();
    let legacy = form.space == Space::Legacy;
    let mem_dst = insn.dsts().first().map_or(false, Operand::is_memory_reference);

    if p.contains(Prefixes::LOCK) && !(legacy && opcode.is_lockable() && mem_dst) {
        return Err("LOCK needs a lockable memory destination");
    }
    let f3 = p.intersects(Prefixes::REP | Prefixes::XRELEASE);
    let f2 = p.intersects(Prefixes::REPNE | Prefixes::XACQUIRE);
    if f2 && f3 {
        return Err("both F2 and F3 requested");
    }
    if (f2 || f3) && !legacy {
        return Err("repeat prefix outside legacy encoding");
    }
    let hle = (p.contains(Prefixes::LOCK) && opcode.is_lockable()) || (opcode == Opcode::Xchg && mem_dst);
    if p.intersects(Prefixes::XACQUIRE | Prefixes::XRELEASE) && !hle {
        return Err("lock elision hint without a locked operation");
    }
    if p.intersects(Prefixes::REP | Prefixes::REPNE) && hle {
        return Err("repeat prefix would read as a lock elision hint");
    }
    if (f3 && form.mandatory == Mandatory::F3) || (f2 && form.mandatory == Mandatory::F2) {
        return Err("repeat prefix is this template's mandatory prefix");
    }
    if p.contains(Prefixes::DATA) && (!legacy || form.mandatory == Mandatory::P66) {
        return Err("operand-size prefix not available");
    }
    let hints = Prefixes::JCC_TAKEN | Prefixes::JCC_NOT_TAKEN;
    if p.intersects(hints) {
        if !(opcode >= Opcode::Jo && opcode <= Opcode::JnleShort) {
            return Err("branch hint on a non-conditional branch");
        }
        if p.contains(hints) {
            return Err("both branch hints requested");
        }
    }
    let evex_only = Prefixes::EVEX_Z | Prefixes::EVEX_B | Prefixes::EVEX_RC0 | Prefixes::EVEX_RC1;
    if p.intersects(evex_only) && form.space != Space::Evex {
        return Err("EVEX attribute on a non-EVEX template");
    }
    if p.contains(Prefixes::EVEX_Z) && mem_dst {
        return Err("zeroing-masking into memory");
    }
    if p.rounding() != 0 && !p.contains(Prefixes::EVEX_B) {
        return Err("rounding bits without EVEX.b");
    }
    Ok(())
}

// ─── Operand placement ───────────────────────────────────────────────

/// The `rm` side of ModR/M.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rm {
    Reg(u8),
    Mem(MemOp),
}

/// A memory operand reduced to what addressing needs.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MemOp {
    Ref(MemRef),
    /// `[rip + disp]`.
    Rip(i32),
    /// RIP-relative to a target resolved at placement.
    RipTo(FixupTarget),
    /// 32-bit absolute address resolved at placement.
    AbsTo(FixupTarget),
}

/// Bytes trailing the ModR/M group, in slot order.
#[derive(Debug, Clone, Copy)]
enum Piece {
    Value { value: u64, width: u8 },
    Field { width: u8, kind: FixupKind, target: FixupTarget },
}

#[derive(Debug, Clone, Copy)]
enum Disp {
    None,
    D8(i8),
    D16(i16),
    D32(i32),
    Field(FixupKind, FixupTarget),
}

/// A resolved ModR/M memory form.
#[derive(Debug, Clone, Copy)]
struct Addressing {
    md: u8,
    rm: u8,
    sib: Option<u8>,
    disp: Disp,
}

/// Field values collected from the operands.
#[derive(Debug, Clone, Copy, Default)]
struct Fields {
    reg: Option<u8>,
    rm: Option<Rm>,
    addressing: Option<Addressing>,
    vvvv: Option<u8>,
    aaa: Option<u8>,
    plus: Option<u8>,
    want_rex: bool,
    no_rex: bool,
    seg: Option<Register>,
    pieces: [Option<Piece>; 4],
}

/// Register-extension bits implied by the fields.
#[derive(Debug, Clone, Copy, Default)]
struct Ext {
    r: bool,
    r2: bool,
    x: bool,
    x2: bool,
    b: bool,
    v2: bool,
}

fn set(field: &mut Option<u8>, value: u8) -> Result<(), Reject> {
    match *field {
        Some(old) if old != value => Err("operands disagree on a shared field"),
        _ => {
            *field = Some(value);
            Ok(())
        }
    }
}

fn fit(
    form: &Form,
    knobs: Knobs,
    dslots: &[Slot],
    sslots: &[Slot],
    insn: &Instruction,
    ctx: Context,
    broadcast: bool,
) -> Result<(Fields, Ext), Reject> {
    let mut cx = SizeCtx::new(ctx.mode, ctx.vendor);
    cx.data16 = knobs.data16;
    cx.addr16 = knobs.addr16;
    cx.rex_w = knobs.w && ctx.mode.is_64();
    cx.vl = knobs.vl;
    let mut fit = Fit {
        ctx,
        cx,
        form,
        w: knobs.w,
        broadcast,
        f: Fields::default(),
    };
    let pairs = dslots
        .iter()
        .zip(insn.dsts())
        .chain(sslots.iter().zip(insn.srcs()));
    for (slot, op) in pairs {
        fit.place(*slot, op)?;
    }
    fit.finish()?;
    let ext = fit.ext()?;
    Ok((fit.f, ext))
}

struct Fit<'a> {
    ctx: Context,
    cx: SizeCtx,
    form: &'a Form,
    w: bool,
    broadcast: bool,
    f: Fields,
}

impl Fit<'_> {
    fn place(&mut self, slot: Slot, op: &Operand) -> Result<(), Reject> {
        let size = slot.size().resolve(&self.cx);
        let ty = slot.ty();
        if ty.uses_rm_field() {
            return self.place_rm(ty, size, op);
        }
        match ty {
            OpType::None => Err("empty slot"),
            OpType::Gpr => {
                let r = self.gpr(op, size)?;
                set(&mut self.f.reg, r.encoding())
            }
            OpType::Xmm => {
                let r = vector_reg(op, size)?;
                set(&mut self.f.reg, r.num())
            }
            OpType::Creg | OpType::Dreg => {
                let r = class_reg(op, fixed_class(ty))?;
                set(&mut self.f.reg, r.num())
            }
            OpType::Mmx | OpType::Sreg | OpType::MaskReg | OpType::Bnd => {
                let r = class_reg(op, fixed_class(ty))?;
                if r.num() >= 8 {
                    return Err("register not encodable in this slot");
                }
                set(&mut self.f.reg, r.num())
            }
            OpType::VexGpr => {
                let r = self.gpr(op, size)?;
                set(&mut self.f.vvvv, r.encoding())
            }
            OpType::VexXmm => {
                let r = vector_reg(op, size)?;
                set(&mut self.f.vvvv, r.num())
            }
            OpType::VexMask => {
                let r = class_reg(op, RegClass::Mask)?;
                set(&mut self.f.vvvv, r.num())
            }
            OpType::EvexMask => {
                let r = class_reg(op, RegClass::Mask)?;
                if r.num() == 0 && self.form.flags.contains(TemplateFlags::NOT_K0) {
                    return Err("k0 cannot be the write mask here");
                }
                set(&mut self.f.aaa, r.num())
            }
            OpType::Is4Xmm => {
                let n = vector_reg(op, size)?.num();
                if n >= 16 || (!self.ctx.mode.is_64() && n >= 8) {
                    return Err("register not encodable in an is4 byte");
                }
                self.piece(Piece::Value {
                    value: u64::from(n) << 4,
                    width: 1,
                })
            }
            OpType::Imm => self.imm(op, size),
            OpType::Rel => self.rel(op, size),
            OpType::FarPtr => self.far(op, size),
            OpType::Moffs => self.moffs(op, size),
            OpType::GprAt(n) => {
                let r = Register::gpr(n, size).ok_or("implicit register width")?;
                expect(op, &Operand::Reg(r))
            }
            OpType::Fixed(r) => expect(op, &Operand::Reg(r)),
            OpType::PlusReg => {
                let r = self.gpr(op, size)?;
                set(&mut self.f.plus, r.encoding())
            }
            OpType::StackPush | OpType::StackPop | OpType::FrameTop => {
                let (num, disp) = match ty {
                    OpType::StackPush => (4, -i32::from(size)),
                    OpType::StackPop => (4, 0),
                    _ => (5, 0),
                };
                let base = Register::gpr(num, self.ctx.mode.addr_bytes()).ok_or("stack register width")?;
                let m = MemRef {
                    base: Some(base),
                    ..MemRef::absolute(disp, size)
                };
                expect(op, &Operand::Mem(m))
            }
            OpType::StrSrc | OpType::StrDst | OpType::MaskMov | OpType::Xlat => {
                let num = match ty {
                    OpType::StrSrc => 6,
                    OpType::Xlat => 3,
                    _ => 7,
                };
                let base = Register::gpr(num, self.cx.addr_size()).ok_or("string register width")?;
                let seg = if ty == OpType::StrDst { None } else { op.segment() };
                let mut m = MemRef {
                    base: Some(base),
                    seg,
                    ..MemRef::absolute(0, size)
                };
                if ty == OpType::Xlat {
                    m.index = Some(Register::AL);
                    m.scale = 1;
                }
                expect(op, &Operand::Mem(m))?;
                self.set_seg(seg)
            }
            OpType::One => expect(op, &Operand::imm(1, 1)),
            _ => Err("unsupported slot"),
        }
    }

    fn place_rm(&mut self, ty: OpType, size: u16, op: &Operand) -> Result<(), Reject> {
        if op.register().is_some() {
            let n = match ty {
                OpType::RmGpr | OpType::RmGprReg => self.gpr(op, size)?.encoding(),
                OpType::RmXmm | OpType::RmXmmReg => vector_reg(op, size)?.num(),
                OpType::Mem | OpType::Vsib | OpType::VsibHalf => return Err("memory operand required"),
                _ => {
                    let n = class_reg(op, fixed_class(ty))?.num();
                    if n >= 8 {
                        return Err("register not encodable in this slot");
                    }
                    n
                }
            };
            return self.set_rm(Rm::Reg(n));
        }
        if !ty.rm_allows_memory() {
            return Err("register operand required");
        }
        let size = match (ty, self.broadcast, self.form.evex) {
            (OpType::RmXmm, true, Some(info)) => info.element(self.w),
            _ => size,
        };
        let vl = self.cx.vector_bytes();
        let vsib = match ty {
            OpType::Vsib => Some(vl),
            OpType::VsibHalf => Some((vl / 2).max(16)),
            _ => None,
        };
        let m = self.memory(op, size, vsib)?;
        self.set_rm(Rm::Mem(m))
    }

    fn set_rm(&mut self, rm: Rm) -> Result<(), Reject> {
        match self.f.rm {
            Some(old) if old != rm => Err("operands disagree on the rm field"),
            _ => {
                self.f.rm = Some(rm);
                Ok(())
            }
        }
    }

    fn set_seg(&mut self, seg: Option<Register>) -> Result<(), Reject> {
        let Some(s) = seg else { return Ok(()) };
        if s.class() != RegClass::Segment {
            return Err("segment override is not a segment register");
        }
        match self.f.seg {
            Some(old) if old != s => Err("conflicting segment overrides"),
            _ => {
                self.f.seg = Some(s);
                Ok(())
            }
        }
    }

    fn piece(&mut self, p: Piece) -> Result<(), Reject> {
        let slot = self
            .f
            .pieces
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or("too many immediates")?;
        *slot = Some(p);
        Ok(())
    }

    /// A general-purpose register of `size`, recording REX constraints.
    fn gpr(&mut self, op: &Operand, size: u16) -> Result<Register, Reject> {
        let Operand::Reg(r) = *op else {
            return Err("general-purpose register expected");
        };
        if r.size() != size || !r.is_gpr() {
            return Err("register width");
        }
        if r.is_high_byte() {
            self.f.no_rex = true;
        } else if r.class() == RegClass::Gpr8 && (4..8).contains(&r.num()) {
            self.f.want_rex = true;
        }
        Ok(r)
    }

    fn memory(&mut self, op: &Operand, size: u16, vsib: Option<u16>) -> Result<MemOp, Reject> {
        if op.size() != size {
            return Err("memory width");
        }
        let x64 = self.ctx.mode.is_64();
        let addr16 = self.cx.addr16;
        let mem = match *op {
            Operand::Mem(m) => {
                match (vsib, m.index) {
                    (Some(bytes), Some(i)) if i.class() == vector(0, bytes).class() => {}
                    (Some(_), _) => return Err("vector index of the wrong width"),
                    (None, _) if m.is_vsib() => return Err("vector index outside a VSIB slot"),
                    _ => {}
                }
                let addr_reg = |r: Register| matches!(r.class(), RegClass::Gpr16 | RegClass::Gpr32 | RegClass::Gpr64);
                if !m.base.map_or(true, addr_reg) {
                    return Err("base is not an address register");
                }
                if let (None, Some(i)) = (vsib, m.index) {
                    if !addr_reg(i) {
                        return Err("index is not an address register");
                    }
                    if m.base.map_or(false, |b| b.class() != i.class()) {
                        return Err("base and index widths differ");
                    }
                }
                match m.reg_addr_size() {
                    Some(w) if w != self.cx.addr_size() => return Err("address width"),
                    None if m.short_addr != addr16 => return Err("address width"),
                    _ => {}
                }
                if vsib.is_some() && self.cx.addr_size() == 2 {
                    return Err("VSIB with 16-bit addressing");
                }
                MemOp::Ref(m)
            }
            _ if vsib.is_some() => return Err("VSIB memory expected"),
            // An absolute operand only has the accumulator `moffs` form;
            // a ModR/M reference with no base is `MemRef::absolute`.
            Operand::Abs { .. } => return Err("absolute offset fits only a moffs slot"),
            Operand::RipRel { disp, .. } if x64 => MemOp::Rip(disp),
            Operand::RelAddr { target, seg, size } => {
                if x64 {
                    MemOp::RipTo(FixupTarget::Addr(target))
                } else {
                    if addr16 {
                        return Err("absolute address needs full-width addressing");
                    }
                    let a = u32::try_from(target).map_err(|_| "absolute address out of range")?;
                    MemOp::Ref(MemRef {
                        seg,
                        ..MemRef::absolute(a as i32, size)
                    })
                }
            }
            Operand::MemInstr { index, disp, .. } => {
                let t = FixupTarget::Instr { index, disp };
                if x64 {
                    MemOp::RipTo(t)
                } else if addr16 {
                    return Err("absolute address needs full-width addressing");
                } else {
                    MemOp::AbsTo(t)
                }
            }
            _ => return Err("memory operand expected"),
        };
        self.set_seg(op.segment())?;
        Ok(mem)
    }

    fn imm(&mut self, op: &Operand, size: u16) -> Result<(), Reject> {
        let width = size as u8;
        match *op {
            Operand::Imm { value, size: s } if s == size => {
                if !fits(value, size) {
                    return Err("immediate out of range");
                }
                self.piece(Piece::Value {
                    value: value as u64,
                    width,
                })
            }
            Operand::Pc(addr) => {
                if !fits_unsigned(addr, size) && !fits(addr as i64, size) {
                    return Err("address does not fit the immediate");
                }
                self.piece(Piece::Value { value: addr, width })
            }
            Operand::Instr(index) => self.piece(Piece::Field {
                width,
                kind: abs_kind(size)?,
                target: FixupTarget::Instr { index, disp: 0 },
            }),
            _ => Err("immediate expected"),
        }
    }

    fn rel(&mut self, op: &Operand, size: u16) -> Result<(), Reject> {
        let kind = match size {
            1 => FixupKind::Rel8,
            2 => FixupKind::Rel16,
            4 => FixupKind::Rel32,
            _ => return Err("branch displacement width"),
        };
        let target = match *op {
            Operand::Pc(a) => FixupTarget::Addr(a),
            Operand::Instr(index) => FixupTarget::Instr { index, disp: 0 },
            _ => return Err("branch target expected"),
        };
        self.piece(Piece::Field {
            width: size as u8,
            kind,
            target,
        })
    }

    fn far(&mut self, op: &Operand, size: u16) -> Result<(), Reject> {
        let width = size.saturating_sub(2);
        let selector = match *op {
            Operand::FarPc { selector, pc } => {
                if !fits_unsigned(pc, width) {
                    return Err("far offset out of range");
                }
                self.piece(Piece::Value {
                    value: pc,
                    width: width as u8,
                })?;
                selector
            }
            Operand::FarInstr { selector, index } => {
                self.piece(Piece::Field {
                    width: width as u8,
                    kind: abs_kind(width)?,
                    target: FixupTarget::Instr { index, disp: 0 },
                })?;
                selector
            }
            _ => return Err("far pointer expected"),
        };
        self.piece(Piece::Value {
            value: u64::from(selector),
            width: 2,
        })
    }

    fn moffs(&mut self, op: &Operand, size: u16) -> Result<(), Reject> {
        if op.size() != size {
            return Err("memory width");
        }
        let width = self.cx.addr_size();
        let value = match *op {
            Operand::Abs { addr, seg, .. } if !self.cx.addr16 => {
                if !fits_unsigned(addr, width) {
                    return Err("offset does not fit the address width");
                }
                self.set_seg(seg)?;
                addr
            }
            Operand::Mem(m) if self.cx.addr16 && m.short_addr && m.base.is_none() && m.index.is_none() => {
                let d = i64::from(m.disp);
                if sign_extend(d, width) != d {
                    return Err("offset does not fit the address width");
                }
                self.set_seg(m.seg)?;
                d as u64
            }
            _ => return Err("absolute offset expected"),
        };
        self.piece(Piece::Value {
            value,
            width: width as u8,
        })
    }

    /// Applies the template's fixed ModR/M values and computes addressing.
    fn finish(&mut self) -> Result<(), Reject> {
        let form = self.form;
        if let Some(n) = form.reg {
            if self.f.reg.is_some() {
                return Err("reg field holds an opcode extension");
            }
            self.f.reg = Some(n);
        }
        if let Some(n) = form.rm {
            match self.f.rm {
                None => self.f.rm = Some(Rm::Reg(n)),
                Some(Rm::Reg(x)) if x & 7 == n && x & !7 == 0 => {}
                _ => return Err("rm field is fixed by the template"),
            }
        }
        match (form.modrm, self.f.rm) {
            (ModrmUse::Mem, Some(Rm::Mem(_))) => {}
            (ModrmUse::Mem, _) => return Err("memory operand required"),
            (ModrmUse::Reg, Some(Rm::Mem(_))) => return Err("register operand required"),
            _ => {}
        }
        if let Some(Rm::Mem(m)) = self.f.rm {
            let scale = match form.evex {
                Some(info) => i32::from(info.disp8_scale(self.cx.vector_bytes(), self.w, self.broadcast)),
                None => 1,
            };
            let a = addressing(m, self.cx.addr_size(), self.ctx.mode.is_64(), scale.max(1))?;
            self.f.addressing = Some(a);
        }
        Ok(())
    }

    /// Extension bits, checked against what the mode and space can carry.
    fn ext(&self) -> Result<Ext, Reject> {
        let f = &self.f;
        let form = self.form;
        let reg = f.reg.unwrap_or(0);
        let mut e = Ext {
            r: reg & 8 != 0,
            r2: reg & 16 != 0,
            ..Ext::default()
        };
        let mut vsib = false;
        match f.rm {
            Some(Rm::Reg(n)) => {
                e.b = n & 8 != 0;
                e.x2 = n & 16 != 0;
            }
            Some(Rm::Mem(MemOp::Ref(m))) => {
                e.b = m.base.map_or(false, |r| r.encoding() & 8 != 0);
                if let Some(i) = m.index {
                    e.x = i.encoding() & 8 != 0;
                    e.v2 = i.encoding() & 16 != 0;
                    vsib = i.is_vector();
                }
            }
            _ => {}
        }
        if let Some(p) = f.plus {
            e.b = p & 8 != 0;
        }
        let vvvv = f.vvvv.unwrap_or(0);
        let evex = form.space == Space::Evex;

        if !self.ctx.mode.is_64() && (e.r || e.r2 || e.x || e.x2 || e.b || e.v2 || vvvv >= 8) {
            return Err("extended register outside 64-bit mode");
        }
        if !evex && (e.r2 || e.x2 || e.v2 || vvvv >= 16 || f.aaa.is_some()) {
            return Err("operand needs EVEX");
        }
        if vsib && f.vvvv.is_some() && (vvvv & 16 != 0) != e.v2 {
            return Err("vector index and vvvv disagree on V'");
        }
        if form.space == Space::Legacy {
            if f.vvvv.is_some() {
                return Err("vvvv outside VEX/EVEX");
            }
            let rex = (self.w && self.ctx.mode.is_64()) || e.r || e.x || e.b || f.want_rex;
            if rex && f.no_rex {
                return Err("high-byte register with REX");
            }
            if (f.want_rex || self.w) && !self.ctx.mode.is_64() {
                return Err("REX outside 64-bit mode");
            }
            if form.rex_b.map_or(false, |rb| rb != e.b) {
                return Err("REX.B selects another template");
            }
        } else {
            if f.want_rex {
                return Err("byte register needs REX");
            }
            if form.rex_b == Some(true) {
                return Err("REX.B template outside legacy encoding");
            }
        }
        Ok(e)
    }
}

fn expect(op: &Operand, want: &Operand) -> Result<(), Reject> {
    if op == want {
        Ok(())
    } else {
        Err("implicit operand mismatch")
    }
}

fn fixed_class(ty: OpType) -> RegClass {
    match ty {
        OpType::Mmx | OpType::RmMmx | OpType::RmMmxReg => RegClass::Mmx,
        OpType::Creg => RegClass::Control,
        OpType::Dreg => RegClass::Debug,
        OpType::Sreg => RegClass::Segment,
        OpType::Bnd | OpType::RmBnd => RegClass::Bound,
        OpType::X87 => RegClass::X87,
        _ => RegClass::Mask,
    }
}

fn class_reg(op: &Operand, class: RegClass) -> Result<Register, Reject> {
    match *op {
        Operand::Reg(r) if r.class() == class => Ok(r),
        _ => Err("register class"),
    }
}

fn vector_reg(op: &Operand, size: u16) -> Result<Register, Reject> {
    match *op {
        Operand::Reg(r) if r.class() == vector(0, size).class() => Ok(r),
        _ => Err("vector register width"),
    }
}

/// `value` is representable in `size` bytes, signed or unsigned.
fn fits(value: i64, size: u16) -> bool {
    if size >= 8 {
        return true;
    }
    let bits = 8 * u32::from(size);
    (-(1i64 << (bits - 1))..=(1i64 << bits) - 1).contains(&value)
}

fn fits_unsigned(value: u64, size: u16) -> bool {
    size >= 8 || value >> (8 * u32::from(size)) == 0
}

fn abs_kind(size: u16) -> Result<FixupKind, Reject> {
    match size {
        2 => Ok(FixupKind::Abs16),
        4 => Ok(FixupKind::Abs32),
        8 => Ok(FixupKind::Abs64),
        _ => Err("address field width"),
    }
}

// ─── Addressing ──────────────────────────────────────────────────────

fn addressing(mem: MemOp, addr_size: u16, x64: bool, scale: i32) -> Result<Addressing, Reject> {
    let rip = |disp| Addressing {
        md: 0,
        rm: 5,
        sib: None,
        disp,
    };
    match mem {
        MemOp::Rip(d) => Ok(rip(Disp::D32(d))),
        MemOp::RipTo(t) => Ok(rip(Disp::Field(FixupKind::RipRel32, t))),
        MemOp::AbsTo(t) => Ok(rip(Disp::Field(FixupKind::Abs32, t))),
        MemOp::Ref(m) if addr_size == 2 => addressing16(&m, scale),
        MemOp::Ref(m) => addressing32(&m, x64, scale),
    }
}

/// Displacement compressed by `scale`, if it fits a signed byte.
fn short_disp(disp: i32, scale: i32) -> Option<i8> {
    if disp % scale != 0 {
        return None;
    }
    i8::try_from(disp / scale).ok()
}

/// Mod field and displacement for a based reference. `zero_ok` says mod 0
/// means "no displacement" for this base.
fn based_disp(m: &MemRef, scale: i32, zero_ok: bool, wide: Disp) -> (u8, Disp) {
    if m.force_full_disp {
        return (2, wide);
    }
    if m.disp == 0 && zero_ok && !m.encode_zero_disp {
        return (0, Disp::None);
    }
    match short_disp(m.disp, scale) {
        Some(d) => (1, Disp::D8(d)),
        None => (2, wide),
    }
}

fn addressing16(m: &MemRef, scale: i32) -> Result<Addressing, Reject> {
    let disp16 = i16::try_from(m.disp).map_err(|_| "16-bit displacement out of range")?;
    let num = |r: Register| {
        if r.class() == RegClass::Gpr16 {
            Ok(r.num())
        } else {
            Err("16-bit address register expected")
        }
    };
    let base = m.base.map(num).transpose()?;
    let index = m.index.map(num).transpose()?;
    if index.is_some() && m.scale > 1 {
        return Err("16-bit addressing has no scale");
    }
    let (base, index) = match (base, index) {
        (None, Some(i)) => (Some(i), None),
        other => other,
    };
    let Some(b) = base else {
        return Ok(Addressing {
            md: 0,
            rm: 6,
            sib: None,
            disp: Disp::D16(disp16),
        });
    };
    let rm = ADDR16
        .iter()
        .position(|&e| e == (b, index))
        .or_else(|| index.and_then(|i| ADDR16.iter().position(|&e| e == (i, Some(b)))))
        .ok_or("no 16-bit addressing form for these registers")? as u8;
    let (md, disp) = based_disp(m, scale, rm != 6, Disp::D16(disp16));
    Ok(Addressing {
        md,
        rm,
        sib: None,
        disp,
    })
}

fn addressing32(m: &MemRef, x64: bool, scale: i32) -> Result<Addressing, Reject> {
    let ss = match (m.index, m.scale) {
        (None, _) | (Some(_), 1) => 0,
        (Some(_), 2) => 1,
        (Some(_), 4) => 2,
        (Some(_), 8) => 3,
        _ => return Err("scale must be 1, 2, 4 or 8"),
    };
    if m.index.map_or(false, |i| i.is_gpr() && i.encoding() == 4) {
        return Err("stack pointer cannot be an index");
    }
    let idx = m.index.map_or(4, |r| r.encoding() & 7);
    let sib = |base: u8| Some(ss << 6 | idx << 3 | base);
    match m.base {
        None if m.index.is_none() => Ok(if x64 {
            Addressing {
                md: 0,
                rm: 4,
                sib: Some(0x25),
                disp: Disp::D32(m.disp),
            }
        } else {
            Addressing {
                md: 0,
                rm: 5,
                sib: None,
                disp: Disp::D32(m.disp),
            }
        }),
        None => Ok(Addressing {
            md: 0,
            rm: 4,
            sib: sib(5),
            disp: Disp::D32(m.disp),
        }),
        Some(b) => {
            let low = b.encoding() & 7;
            let (md, disp) = based_disp(m, scale, low != 5, Disp::D32(m.disp));
            Ok(if m.index.is_some() || low == 4 {
                Addressing {
                    md,
                    rm: 4,
                    sib: sib(low),
                    disp,
                }
            } else {
                Addressing {
                    md,
                    rm: low,
                    sib: None,
                    disp,
                }
            })
        }
    }
}

// ─── Emission ────────────────────────────────────────────────────────

fn segment_byte(seg: Register) -> u8 {
    [0x26, 0x2e, 0x36, 0x3e, 0x64, 0x65][usize::from(seg.num() % 6)]
}

#[inline]
fn inv(bit: bool) -> u8 {
    u8::from(!bit)
}

#[inline]
fn modrm(md: u8, reg: u8, rm: u8) -> u8 {
    (md << 6) | ((reg & 7) << 3) | (rm & 7)
}

impl Plan {
    fn emit(&self, insn: &Instruction, ctx: Context) -> Result<EncodedInstr, EncodeError> {
        let form = &self.form;
        let f = &self.fields;
        let e = self.ext;
        let p = insn.prefixes();
        let w = self.knobs.w;
        let mut out = InstrBytes::new();
        let mut fixup = None;

        if p.intersects(Prefixes::REP | Prefixes::XRELEASE) {
            out.push(0xf3);
        } else if p.intersects(Prefixes::REPNE | Prefixes::XACQUIRE) {
            out.push(0xf2);
        }
        if p.contains(Prefixes::LOCK) {
            out.push(0xf0);
        }
        if self.knobs.data16 {
            out.push(0x66);
        }
        if self.knobs.addr16 {
            out.push(0x67);
        }
        let hint = if p.contains(Prefixes::JCC_TAKEN) {
            Some(0x3e)
        } else if p.contains(Prefixes::JCC_NOT_TAKEN) {
            Some(0x2e)
        } else {
            None
        };
        if let Some(s) = f.seg.map(segment_byte).or(hint) {
            out.push(s);
        }

        let pp = form.mandatory.pp();
        match form.space {
            Space::Legacy => {
                if let Some(b) = form.mandatory.byte() {
                    out.push(b);
                }
                let w = w && ctx.mode.is_64();
                if w || e.r || e.x || e.b || f.want_rex {
                    out.push(0x40 | u8::from(w) << 3 | u8::from(e.r) << 2 | u8::from(e.x) << 1 | u8::from(e.b));
                }
                out.extend_from_slice(form.map.escape_bytes());
            }
            Space::Vex | Space::Xop => {
                let mmmmm = form.map.vex_mmmmm().ok_or_else(|| invalid("template map has no VEX encoding"))?;
                let vvvv = (!f.vvvv.unwrap_or(0) & 0xf) << 3;
                let l = (self.knobs.vl & 1) << 2;
                if form.space == Space::Vex && form.map == Map::Esc0F && !e.x && !e.b && !w {
                    out.push(0xc5);
                    out.push(inv(e.r) << 7 | vvvv | l | pp);
                } else {
                    out.push(if form.space == Space::Xop { 0x8f } else { 0xc4 });
                    out.push(inv(e.r) << 7 | inv(e.x) << 6 | inv(e.b) << 5 | mmmmm);
                    out.push(u8::from(w) << 7 | vvvv | l | pp);
                }
            }
            Space::Evex => {
                let mm = form.map.vex_mmmmm().ok_or_else(|| invalid("template map has no EVEX encoding"))?;
                let vvvv = f.vvvv.unwrap_or(0);
                let v2 = if f.vvvv.is_some() { vvvv & 16 != 0 } else { e.v2 };
                let reg_form = !matches!(f.rm, Some(Rm::Mem(_)));
                let b = p.contains(Prefixes::EVEX_B);
                let ll = if b && reg_form {
                    if form.evex.map_or(false, |i| i.er) {
                        p.rounding()
                    } else {
                        0
                    }
                } else {
                    self.knobs.vl
                };
                out.push(0x62);
                out.push(inv(e.r) << 7 | inv(e.x || e.x2) << 6 | inv(e.b) << 5 | inv(e.r2) << 4 | (mm & 3));
                out.push(u8::from(w) << 7 | (!vvvv & 0xf) << 3 | 0x04 | pp);
                out.push(
                    u8::from(p.contains(Prefixes::EVEX_Z)) << 7
                        | (ll & 3) << 5
                        | u8::from(b) << 4
                        | inv(v2) << 3
                        | f.aaa.unwrap_or(0),
                );
            }
        }

        if form.map != Map::Amd3dnow {
            let plus = if form.plus_reg { f.plus.unwrap_or(0) & 7 } else { 0 };
            out.push(form.opcode | plus);
        }

        if form.has_modrm() {
            let reg = f.reg.unwrap_or(0);
            match (f.rm, f.addressing) {
                (Some(Rm::Mem(_)), Some(a)) => {
                    out.push(modrm(a.md, reg, a.rm));
                    if let Some(s) = a.sib {
                        out.push(s);
                    }
                    match a.disp {
                        Disp::None => {}
                        Disp::D8(d) => out.push(d as u8),
                        Disp::D16(d) => out.push_le(d as u16 as u64, 2),
                        Disp::D32(d) => out.push_le(d as u32 as u64, 4),
                        Disp::Field(kind, target) => {
                            record(&mut fixup, &out, kind, target)?;
                            out.push_le(0, 4);
                        }
                    }
                }
                (Some(Rm::Reg(n)), _) => out.push(modrm(3, reg, n)),
                _ => out.push(modrm(3, reg, 0)),
            }
        }

        for piece in f.pieces.iter().flatten() {
            match *piece {
                Piece::Value { value, width } => out.push_le(value, width),
                Piece::Field { width, kind, target } => {
                    record(&mut fixup, &out, kind, target)?;
                    out.push_le(0, width);
                }
            }
        }

        if form.map == Map::Amd3dnow {
            out.push(form.opcode);
        }

        if out.len() > MAX_INSTR_LEN {
            return Err(invalid(&format!(
                "encoding is {} bytes, longer than {}",
                out.len(),
                MAX_INSTR_LEN
            )));
        }
        Ok(EncodedInstr { bytes: out, fixup })
    }
}

fn record(fixup: &mut Option<Fixup>, out: &InstrBytes, kind: FixupKind, target: FixupTarget) -> Result<(), EncodeError> {
    if fixup.is_some() {
        return Err(invalid("more than one position-dependent field"));
    }
    *fixup = Some(Fixup {
        offset: out.len() as u8,
        kind,
        target,
    });
    Ok(())
}

fn invalid(detail: &str) -> EncodeError {
    EncodeError::InvalidOperand { detail: detail.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::mode::Mode;

    fn x64(insn: &Instruction) -> Vec<u8> {
        encode_to_vec(insn, Context::x64(), 0x1000).unwrap()
    }

    fn reg(r: Register) -> Operand {
        Operand::Reg(r)
    }

    #[test]
    fn near_jump_displacement_is_from_the_next_instruction() {
        let jmp = Instruction::jmp(Operand::Pc(0x1000 + 130));
        assert_eq!(x64(&jmp), [0xe9, 0x7d, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn short_jump_uses_eb() {
        let jmp = Instruction::jmp_short(Operand::Pc(0x1000 + 0x12));
        assert_eq!(x64(&jmp), [0xeb, 0x10]);
    }

    #[test]
    fn register_move_gets_rex_w() {
        assert_eq!(x64(&Instruction::mov(reg(Register::RAX), reg(Register::RCX))), [0x48, 0x89, 0xc8]);
    }

    #[test]
    fn sixteen_bit_move_gets_operand_size_prefix() {
        assert_eq!(x64(&Instruction::mov(reg(Register::AX), reg(Register::CX))), [0x66, 0x89, 0xc8]);
    }

    #[test]
    fn memory_destination_with_disp8() {
        let m = MemRef::base_disp(Register::RBX, 8, 4).unwrap();
        let add = Instruction::binary(Opcode::Add, Operand::Mem(m), reg(Register::ECX));
        assert_eq!(x64(&add), [0x01, 0x4b, 0x08]);
    }

    #[test]
    fn high_byte_register_needs_no_rex() {
        assert_eq!(x64(&Instruction::mov(reg(Register::AH), reg(Register::BL))), [0x88, 0xdc]);
    }

    #[test]
    fn high_byte_register_and_rex_byte_register_conflict() {
        let mov = Instruction::mov(reg(Register::AH), reg(Register::SIL));
        assert!(matches!(
            encode_instruction(&mov, Context::x64()),
            Err(EncodeError::NoMatchingTemplate { opcode: Opcode::Mov })
        ));
    }

    #[test]
    fn push_extended_register() {
        assert_eq!(x64(&Instruction::push(Mode::X64, Register::R12)), [0x41, 0x54]);
    }

    #[test]
    fn vex_two_byte_form() {
        let i = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::xmm(0))],
            &[reg(Register::xmm(1)), reg(Register::xmm(2))],
        );
        assert_eq!(x64(&i), [0xc5, 0xf0, 0x58, 0xc2]);
        let i = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::ymm(0))],
            &[reg(Register::ymm(1)), reg(Register::ymm(2))],
        );
        assert_eq!(x64(&i), [0xc5, 0xf4, 0x58, 0xc2]);
    }

    #[test]
    fn evex_masked_512_bit_add() {
        let i = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::zmm(0))],
            &[reg(Register::k(1)), reg(Register::zmm(1)), reg(Register::zmm(2))],
        );
        assert_eq!(x64(&i), [0x62, 0xf1, 0x74, 0x49, 0x58, 0xc2]);
    }

    #[test]
    fn evex_hint_forces_evex_for_xmm() {
        let i = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::xmm(0))],
            &[reg(Register::k(0)), reg(Register::xmm(1)), reg(Register::xmm(2))],
        )
        .with_hint(EncodingHint::Evex);
        assert_eq!(x64(&i), [0x62, 0xf1, 0x74, 0x08, 0x58, 0xc2]);
    }

    #[test]
    fn upper_vector_registers_need_evex() {
        let i = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::xmm(0))],
            &[reg(Register::xmm(1)), reg(Register::xmm(17))],
        );
        assert!(encode_instruction(&i, Context::x64()).is_err());
    }

    #[test]
    fn short_branch_out_of_range() {
        let jmp = Instruction::jmp_short(Operand::Pc(0x1000 + 1000));
        assert_eq!(
            encode_to_vec(&jmp, Context::x64(), 0x1000),
            Err(EncodeError::Unreachable { disp: 998, max: 127 })
        );
    }

    #[test]
    fn instruction_target_is_left_as_a_fixup() {
        let jmp = Instruction::jmp(Operand::Instr(3));
        let e = encode_instruction(&jmp, Context::x64()).unwrap();
        assert_eq!(e.bytes, [0xe9, 0, 0, 0, 0][..]);
        assert_eq!(
            e.fixup,
            Some(Fixup {
                offset: 1,
                kind: FixupKind::Rel32,
                target: FixupTarget::Instr { index: 3, disp: 0 },
            })
        );
        assert_eq!(
            encode_to_vec(&jmp, Context::x64(), 0),
            Err(EncodeError::UnresolvedTarget { index: 3 })
        );
    }

    #[test]
    fn short_output_buffer() {
        let mov = Instruction::mov(reg(Register::RAX), reg(Register::RCX));
        let mut buf = [0u8; 2];
        assert_eq!(
            encode(&mov, Context::x64(), 0, &mut buf),
            Err(EncodeError::BufferTooSmall { needed: 3, available: 2 })
        );
    }

    #[test]
    fn lock_requires_memory_destination() {
        let add = Instruction::binary(Opcode::Add, reg(Register::EAX), reg(Register::ECX)).with_prefixes(Prefixes::LOCK);
        assert!(encode_instruction(&add, Context::x64()).is_err());
    }

    #[test]
    fn extended_register_rejected_in_32_bit_mode() {
        let mov = Instruction::mov(reg(Register::R8D), reg(Register::ECX));
        assert!(encode_instruction(&mov, Context::x86()).is_err());
    }

    #[test]
    fn decoded_bytes_reencode_identically() {
        let cases: &[(Mode, &[u8])] = &[
            (Mode::X64, &[0x48, 0x89, 0xc8]),
            (Mode::X64, &[0x01, 0x4b, 0x08]),
            (Mode::X64, &[0x8b, 0x44, 0x24, 0x10]),
            (Mode::X64, &[0x48, 0x8b, 0x05, 0x10, 0x00, 0x00, 0x00]),
            (Mode::X64, &[0x8b, 0x45, 0x00]),
            (Mode::X64, &[0x8b, 0x40, 0x00]),
            (Mode::X64, &[0x8b, 0x80, 0x10, 0x00, 0x00, 0x00]),
            (Mode::X64, &[0xf0, 0x01, 0x08]),
            (Mode::X64, &[0xf3, 0xa4]),
            (Mode::X64, &[0x66, 0x89, 0xc8]),
            (Mode::X64, &[0x41, 0x54]),
            (Mode::X64, &[0xe8, 0x00, 0x00, 0x00, 0x00]),
            (Mode::X64, &[0xc5, 0xf0, 0x58, 0xc2]),
            (Mode::X64, &[0x62, 0xf1, 0x74, 0x49, 0x58, 0xc2]),
            (Mode::X86, &[0x8b, 0x46, 0x10]),
            (Mode::X86, &[0x67, 0x8b, 0x00]),
        ];
        for &(mode, bytes) in cases {
            let ctx = Context::new(mode);
            let (mut insn, len) = decode(bytes, ctx, 0x1000).unwrap();
            assert_eq!(len, bytes.len(), "{:02x?}", bytes);
            insn.clear_raw();
            assert_eq!(encode_to_vec(&insn, ctx, 0x1000).unwrap(), bytes, "{}", insn);
        }
    }

    #[test]
    fn decoded_branch_moves_with_its_target() {
        let (jmp, _) = decode(&[0xe9, 0x10, 0x00, 0x00, 0x00], Context::x64(), 0x1000).unwrap();
        // Target 0x1015, now reached from 0x2000.
        let bytes = encode_to_vec(&jmp, Context::x64(), 0x2000).unwrap();
        let disp = i32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        assert_eq!(0x2005 + i64::from(disp), 0x1015);
    }
}
