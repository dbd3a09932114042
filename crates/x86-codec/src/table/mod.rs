//! Opcode and template tables.
//!
//! Every encoding variant of every operation is a [`Template`]. Templates
//! are declared flat, each naming its own encoding ([`Form`]); the
//! [`Builder`] then derives, for every `(map, byte)` entry point, a small
//! decision tree whose levels are, in fixed order:
//!
//! | level  | keyed on                                          | columns |
//! |--------|---------------------------------------------------|---------|
//! | Prefix | encoding family × mandatory prefix                | 12      |
//! | Mode   | 32- or 64-bit mode                                | 2       |
//! | Reg    | ModR/M `reg` (opcode extension)                   | 8       |
//! | Mod    | ModR/M `mod`: memory or register                  | 2       |
//! | Rm     | ModR/M `rm`                                       | 8       |
//! | RexB   | REX.B (for `90`)                                  | 2       |
//! | W      | REX.W / VEX.W / EVEX.W                            | 2       |
//! | VexL   | VEX.L / EVEX.L'L                                  | 3       |
//!
//! A level exists at a node only when some template below it constrains
//! that key. Where several templates remain at a leaf the most specific
//! one wins; an unresolved tie is recorded as a table defect.
//!
//! All nodes and templates live in arenas addressed by [`NodeId`] and
//! [`TemplateId`]. The tables are built once, on first use, and are
//! read-only afterwards.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;
use lazy_static::lazy_static;

use crate::opcode::Opcode;
use crate::register::Register;
use crate::size::OpSize;

mod evex;
mod onebyte;
pub(crate) mod slots;
mod threebyte;
mod twobyte;
mod vex;
mod x87;
mod xop;

// ─── Identifiers ─────────────────────────────────────────────────────

/// Index of a [`Node`] in the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The shared invalid-encoding node.
    pub const INVALID: NodeId = NodeId(0);

    /// Arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a [`Template`] in the template arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(u32);

impl TemplateId {
    /// Arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ─── Encoding description ────────────────────────────────────────────

/// Encoding family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    /// Legacy and REX encodings.
    Legacy,
    /// VEX (`C4`/`C5`).
    Vex,
    /// EVEX (`62`).
    Evex,
    /// AMD XOP (`8F`).
    Xop,
}

/// Opcode map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Map {
    /// Primary one-byte map.
    OneByte,
    /// `0F xx`.
    Esc0F,
    /// `0F 38 xx`.
    Esc0F38,
    /// `0F 3A xx`.
    Esc0F3A,
    /// XOP map 8.
    Xop8,
    /// XOP map 9.
    Xop9,
    /// XOP map A.
    XopA,
    /// 3DNow!, keyed by the suffix byte after `0F 0F modrm`.
    Amd3dnow,
}

impl Map {
    /// Every map.
    pub const ALL: [Map; 8] = [
        Map::OneByte,
        Map::Esc0F,
        Map::Esc0F38,
        Map::Esc0F3A,
        Map::Xop8,
        Map::Xop9,
        Map::XopA,
        Map::Amd3dnow,
    ];

    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }

    /// VEX/EVEX `mmmmm` value selecting this map, if any.
    pub const fn vex_mmmmm(self) -> Option<u8> {
        match self {
            Map::Esc0F => Some(1),
            Map::Esc0F38 => Some(2),
            Map::Esc0F3A => Some(3),
            Map::Xop8 => Some(8),
            Map::Xop9 => Some(9),
            Map::XopA => Some(10),
            _ => None,
        }
    }

    /// Map selected by a VEX/EVEX/XOP `mmmmm` value.
    pub const fn from_mmmmm(mmmmm: u8, xop: bool) -> Option<Map> {
        match (mmmmm, xop) {
            (1, false) => Some(Map::Esc0F),
            (2, false) => Some(Map::Esc0F38),
            (3, false) => Some(Map::Esc0F3A),
            (8, true) => Some(Map::Xop8),
            (9, true) => Some(Map::Xop9),
            (10, true) => Some(Map::XopA),
            _ => None,
        }
    }

    /// Legacy escape bytes that lead to this map.
    pub const fn escape_bytes(self) -> &'static [u8] {
        match self {
            Map::OneByte => &[],
            Map::Esc0F => &[0x0f],
            Map::Esc0F38 => &[0x0f, 0x38],
            Map::Esc0F3A => &[0x0f, 0x3a],
            Map::Amd3dnow => &[0x0f, 0x0f],
            Map::Xop8 | Map::Xop9 | Map::XopA => &[],
        }
    }
}

/// Mandatory (opcode-selecting) legacy prefix, or the VEX/EVEX `pp` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mandatory {
    /// None.
    None,
    /// `66`.
    P66,
    /// `F3`.
    F3,
    /// `F2`.
    F2,
}

impl Mandatory {
    /// `pp` encoding.
    #[inline]
    pub const fn pp(self) -> u8 {
        match self {
            Mandatory::None => 0,
            Mandatory::P66 => 1,
            Mandatory::F3 => 2,
            Mandatory::F2 => 3,
        }
    }

    /// From a `pp` field.
    #[inline]
    pub const fn from_pp(pp: u8) -> Mandatory {
        match pp & 3 {
            0 => Mandatory::None,
            1 => Mandatory::P66,
            2 => Mandatory::F3,
            _ => Mandatory::F2,
        }
    }

    /// Legacy prefix byte.
    #[inline]
    pub const fn byte(self) -> Option<u8> {
        match self {
            Mandatory::None => None,
            Mandatory::P66 => Some(0x66),
            Mandatory::F3 => Some(0xf3),
            Mandatory::F2 => Some(0xf2),
        }
    }
}

/// How a template uses the ModR/M byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModrmUse {
    /// No ModR/M byte.
    None,
    /// ModR/M with either a register or a memory `rm`.
    Any,
    /// ModR/M with a memory `rm` only.
    Mem,
    /// ModR/M with a register `rm` only (`mod == 11`).
    Reg,
}

bitflags! {
    /// Per-template attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TemplateFlags: u16 {
        /// Not encodable in 32-bit mode.
        const X86_INVALID = 1 << 0;
        /// Not encodable in 64-bit mode.
        const X64_INVALID = 1 << 1;
        /// Predicated on a condition code.
        const HAS_PRED_CC = 1 << 2;
        /// Predicated in a way no single condition expresses.
        const HAS_PRED_COMPLEX = 1 << 3;
        /// The opmask slot may not be `k0`.
        const NOT_K0 = 1 << 4;
        /// Holds the overflow operands of another template.
        const CONTINUATION = 1 << 5;
    }
}

/// EVEX tuple type, which with the input size fixes the disp8 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tuple {
    /// Full vector (broadcast allowed).
    Fv,
    /// Half vector (broadcast allowed).
    Hv,
    /// Full vector memory.
    Fvm,
    /// Tuple1 scalar.
    T1s,
    /// Tuple1 fixed.
    T1f,
    /// Tuple2.
    T2,
    /// Tuple4.
    T4,
    /// Tuple8.
    T8,
    /// Half vector memory.
    Hvm,
    /// Quarter vector memory.
    Qvm,
    /// Eighth vector memory.
    Ovm,
    /// 128-bit memory.
    M128,
    /// `movddup`.
    Dup,
}

/// EVEX element (input) size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSize {
    /// Fixed element width in bytes.
    Fixed(u8),
    /// 4 with EVEX.W0, 8 with EVEX.W1.
    ByW,
}

/// EVEX-only template data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvexInfo {
    /// Tuple type.
    pub tuple: Tuple,
    /// Element size.
    pub input: InputSize,
    /// Register form accepts embedded rounding.
    pub er: bool,
    /// Register form accepts suppress-all-exceptions.
    pub sae: bool,
}

impl EvexInfo {
    /// Element width in bytes.
    pub const fn element(&self, w: bool) -> u16 {
        match self.input {
            InputSize::Fixed(n) => n as u16,
            InputSize::ByW => {
                if w {
                    8
                } else {
                    4
                }
            }
        }
    }

    /// Whether the tuple type allows embedded broadcast.
    pub const fn broadcasts(&self) -> bool {
        matches!(self.tuple, Tuple::Fv | Tuple::Hv)
    }

    /// Compressed-displacement scale for vector length `vl_bytes`.
    pub const fn disp8_scale(&self, vl_bytes: u16, w: bool, broadcast: bool) -> u16 {
        let elem = self.element(w);
        match self.tuple {
            Tuple::Fv => {
                if broadcast {
                    elem
                } else {
                    vl_bytes
                }
            }
            Tuple::Hv => {
                if broadcast {
                    elem
                } else {
                    vl_bytes / 2
                }
            }
            Tuple::Fvm => vl_bytes,
            Tuple::T1s | Tuple::T1f => elem,
            Tuple::T2 => elem * 2,
            Tuple::T4 => elem * 4,
            Tuple::T8 => elem * 8,
            Tuple::Hvm => vl_bytes / 2,
            Tuple::Qvm => vl_bytes / 4,
            Tuple::Ovm => vl_bytes / 8,
            Tuple::M128 => 16,
            Tuple::Dup => {
                if vl_bytes == 16 {
                    8
                } else {
                    vl_bytes
                }
            }
        }
    }
}

/// One template's encoding: family, map, opcode byte and the key values
/// the decision tree tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Form {
    /// Encoding family.
    pub space: Space,
    /// Opcode map.
    pub map: Map,
    /// Mandatory prefix (`pp` for VEX/EVEX/XOP).
    pub mandatory: Mandatory,
    /// Opcode byte (the suffix byte for 3DNow!).
    pub opcode: u8,
    /// The low three opcode bits select a register.
    pub plus_reg: bool,
    /// Required ModR/M `reg` field.
    pub reg: Option<u8>,
    /// ModR/M usage.
    pub modrm: ModrmUse,
    /// Required ModR/M `rm` field (register forms only).
    pub rm: Option<u8>,
    /// Required REX.B.
    pub rex_b: Option<bool>,
    /// Required W bit.
    pub w: Option<bool>,
    /// Required vector length (0, 1, 2).
    pub l: Option<u8>,
    /// Template attributes.
    pub flags: TemplateFlags,
    /// EVEX data.
    pub evex: Option<EvexInfo>,
}

const fn form(space: Space, map: Map, opcode: u8) -> Form {
    Form {
        space,
        map,
        mandatory: Mandatory::None,
        opcode,
        plus_reg: false,
        reg: None,
        modrm: ModrmUse::None,
        rm: None,
        rex_b: None,
        w: None,
        l: None,
        flags: TemplateFlags::empty(),
        evex: None,
    }
}

/// One-byte opcode.
pub(crate) const fn op1(b: u8) -> Form {
    form(Space::Legacy, Map::OneByte, b)
}

/// `0F` opcode.
pub(crate) const fn op2(b: u8) -> Form {
    form(Space::Legacy, Map::Esc0F, b)
}

/// `0F 38` opcode.
pub(crate) const fn op38(b: u8) -> Form {
    form(Space::Legacy, Map::Esc0F38, b)
}

/// `0F 3A` opcode.
pub(crate) const fn op3a(b: u8) -> Form {
    form(Space::Legacy, Map::Esc0F3A, b)
}

/// XOP opcode in `map`.
pub(crate) const fn xop(map: Map, b: u8) -> Form {
    form(Space::Xop, map, b).r()
}

/// 3DNow! opcode with `suffix`.
pub(crate) const fn now3d(suffix: u8) -> Form {
    form(Space::Legacy, Map::Amd3dnow, suffix).r()
}

impl Form {
    /// Has a ModR/M byte (`/r`).
    pub(crate) const fn r(mut self) -> Form {
        if matches!(self.modrm, ModrmUse::None) {
            self.modrm = ModrmUse::Any;
        }
        self
    }

    /// Opcode extension `/n`.
    pub(crate) const fn ext(mut self, n: u8) -> Form {
        self.reg = Some(n);
        self.r()
    }

    /// Memory `rm` only.
    pub(crate) const fn mem(mut self) -> Form {
        self.modrm = ModrmUse::Mem;
        self
    }

    /// Register `rm` only.
    pub(crate) const fn regs(mut self) -> Form {
        self.modrm = ModrmUse::Reg;
        self
    }

    /// Fixed register `rm` (a full ModR/M byte together with `ext`).
    pub(crate) const fn rm(mut self, n: u8) -> Form {
        self.rm = Some(n);
        self.modrm = ModrmUse::Reg;
        self
    }

    /// Low three opcode bits select a register.
    pub(crate) const fn plus(mut self) -> Form {
        self.plus_reg = true;
        self
    }

    /// Mandatory `66`.
    pub(crate) const fn p66(mut self) -> Form {
        self.mandatory = Mandatory::P66;
        self
    }

    /// Mandatory `F3`.
    pub(crate) const fn pf3(mut self) -> Form {
        self.mandatory = Mandatory::F3;
        self
    }

    /// Mandatory `F2`.
    pub(crate) const fn pf2(mut self) -> Form {
        self.mandatory = Mandatory::F2;
        self
    }

    /// W must be clear.
    pub(crate) const fn w0(mut self) -> Form {
        self.w = Some(false);
        self
    }

    /// W must be set.
    pub(crate) const fn w1(mut self) -> Form {
        self.w = Some(true);
        self
    }

    /// Vector length 128.
    pub(crate) const fn l0(mut self) -> Form {
        self.l = Some(0);
        self
    }

    /// Vector length 256.
    pub(crate) const fn l1(mut self) -> Form {
        self.l = Some(1);
        self
    }

    /// REX.B must be clear.
    pub(crate) const fn rex_b0(mut self) -> Form {
        self.rex_b = Some(false);
        self
    }

    /// Encoded with VEX.
    pub(crate) const fn vex(mut self) -> Form {
        self.space = Space::Vex;
        self
    }

    /// Encoded with EVEX; `tuple`/`input` fix the disp8 scale.
    pub(crate) const fn evex(mut self, tuple: Tuple, input: InputSize) -> Form {
        self.space = Space::Evex;
        self.evex = Some(EvexInfo {
            tuple,
            input,
            er: false,
            sae: false,
        });
        self.r()
    }

    /// Register form accepts embedded rounding.
    pub(crate) const fn er(mut self) -> Form {
        if let Some(mut e) = self.evex {
            e.er = true;
            e.sae = true;
            self.evex = Some(e);
        }
        self
    }

    /// Register form accepts suppress-all-exceptions.
    pub(crate) const fn sae(mut self) -> Form {
        if let Some(mut e) = self.evex {
            e.sae = true;
            self.evex = Some(e);
        }
        self
    }

    /// 32-bit mode only.
    pub(crate) const fn only32(mut self) -> Form {
        self.flags = self.flags.union(TemplateFlags::X64_INVALID);
        self
    }

    /// 64-bit mode only.
    pub(crate) const fn only64(mut self) -> Form {
        self.flags = self.flags.union(TemplateFlags::X86_INVALID);
        self
    }

    /// Opmask may not be `k0`.
    pub(crate) const fn not_k0(mut self) -> Form {
        self.flags = self.flags.union(TemplateFlags::NOT_K0);
        self
    }

    /// Whether the template reads a ModR/M byte.
    #[inline]
    pub const fn has_modrm(&self) -> bool {
        !matches!(self.modrm, ModrmUse::None)
    }

    /// Number of key constraints; the most constrained template wins a
    /// shared leaf.
    fn specificity(&self) -> u32 {
        let mut n = 0;
        n += !matches!(self.mandatory, Mandatory::None) as u32;
        n += self
            .flags
            .intersects(TemplateFlags::X86_INVALID | TemplateFlags::X64_INVALID) as u32;
        n += self.reg.is_some() as u32;
        n += matches!(self.modrm, ModrmUse::Mem | ModrmUse::Reg) as u32;
        n += self.rm.is_some() as u32;
        n += self.rex_b.is_some() as u32;
        n += self.w.is_some() as u32;
        n += self.l.is_some() as u32;
        n
    }
}

// ─── Operand slots ───────────────────────────────────────────────────

/// Where a template operand comes from and what kind of operand it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// Unused slot.
    None,

    /// ModR/M `reg`: general-purpose register.
    Gpr,
    /// ModR/M `reg`: MMX register.
    Mmx,
    /// ModR/M `reg`: vector register (class from the slot size).
    Xmm,
    /// ModR/M `reg`: control register.
    Creg,
    /// ModR/M `reg`: debug register.
    Dreg,
    /// ModR/M `reg`: segment register.
    Sreg,
    /// ModR/M `reg`: opmask register.
    MaskReg,
    /// ModR/M `reg`: bound register.
    Bnd,

    /// ModR/M `rm`: general-purpose register or memory.
    RmGpr,
    /// ModR/M `rm`: MMX register or memory.
    RmMmx,
    /// ModR/M `rm`: vector register or memory.
    RmXmm,
    /// ModR/M `rm`: opmask register or memory.
    RmMask,
    /// ModR/M `rm`: bound register or memory.
    RmBnd,
    /// ModR/M `rm`: general-purpose register only.
    RmGprReg,
    /// ModR/M `rm`: MMX register only.
    RmMmxReg,
    /// ModR/M `rm`: vector register only.
    RmXmmReg,
    /// ModR/M `rm`: opmask register only.
    RmMaskReg,
    /// ModR/M `rm`: memory only.
    Mem,
    /// ModR/M `rm`: VSIB memory, index as wide as the vector length.
    Vsib,
    /// ModR/M `rm`: VSIB memory, index half the vector length.
    VsibHalf,
    /// ModR/M `rm`: x87 `ST(i)`.
    X87,

    /// `vvvv`: general-purpose register.
    VexGpr,
    /// `vvvv`: vector register.
    VexXmm,
    /// `vvvv`: opmask register.
    VexMask,
    /// EVEX `aaa`: opmask register (always present, `k0` = unmasked).
    EvexMask,
    /// Bits 7:4 of a trailing immediate byte: vector register.
    Is4Xmm,

    /// Immediate of the slot size.
    Imm,
    /// Relative branch displacement of the slot size.
    Rel,
    /// Far pointer immediate (offset then selector).
    FarPtr,
    /// Memory at an absolute address-size offset (`moffs`).
    Moffs,

    /// Implicit general-purpose register number `n`.
    GprAt(u8),
    /// Implicit fixed register.
    Fixed(Register),
    /// General-purpose register from the low opcode bits.
    PlusReg,
    /// Stack slot about to be written: `[sp - size]`.
    StackPush,
    /// Stack slot about to be read: `[sp]`.
    StackPop,
    /// Frame slot `[bp]` read by `leave`.
    FrameTop,
    /// String source `seg:[si]`.
    StrSrc,
    /// String destination `es:[di]`.
    StrDst,
    /// `xlat` table entry `seg:[bx + al]`.
    Xlat,
    /// `maskmovq`/`maskmovdqu` destination `seg:[di]`.
    MaskMov,
    /// The constant 1 (shift count).
    One,
}

impl OpType {
    /// Reads the ModR/M `reg` field.
    pub const fn uses_reg_field(self) -> bool {
        matches!(
            self,
            OpType::Gpr
                | OpType::Mmx
                | OpType::Xmm
                | OpType::Creg
                | OpType::Dreg
                | OpType::Sreg
                | OpType::MaskReg
                | OpType::Bnd
        )
    }

    /// Reads the ModR/M `rm` field.
    pub const fn uses_rm_field(self) -> bool {
        matches!(
            self,
            OpType::RmGpr
                | OpType::RmMmx
                | OpType::RmXmm
                | OpType::RmMask
                | OpType::RmBnd
                | OpType::RmGprReg
                | OpType::RmMmxReg
                | OpType::RmXmmReg
                | OpType::RmMaskReg
                | OpType::Mem
                | OpType::Vsib
                | OpType::VsibHalf
                | OpType::X87
        )
    }

    /// Reads the `vvvv` field.
    pub const fn uses_vvvv(self) -> bool {
        matches!(self, OpType::VexGpr | OpType::VexXmm | OpType::VexMask)
    }

    /// Always memory when present.
    pub const fn is_memory_only(self) -> bool {
        matches!(
            self,
            OpType::Mem
                | OpType::Vsib
                | OpType::VsibHalf
                | OpType::Moffs
                | OpType::StackPush
                | OpType::StackPop
                | OpType::FrameTop
                | OpType::StrSrc
                | OpType::StrDst
                | OpType::Xlat
                | OpType::MaskMov
        )
    }

    /// `rm` may name memory.
    pub const fn rm_allows_memory(self) -> bool {
        matches!(
            self,
            OpType::RmGpr
                | OpType::RmMmx
                | OpType::RmXmm
                | OpType::RmMask
                | OpType::RmBnd
                | OpType::Mem
                | OpType::Vsib
                | OpType::VsibHalf
        )
    }

    /// Has no encoding bits of its own.
    pub const fn is_implicit(self) -> bool {
        matches!(
            self,
            OpType::GprAt(_)
                | OpType::Fixed(_)
                | OpType::StackPush
                | OpType::StackPop
                | OpType::FrameTop
                | OpType::StrSrc
                | OpType::StrDst
                | OpType::Xlat
                | OpType::MaskMov
                | OpType::One
        )
    }

    /// Consumes trailing immediate bytes.
    pub const fn is_immediate(self) -> bool {
        matches!(
            self,
            OpType::Imm | OpType::Rel | OpType::FarPtr | OpType::Moffs | OpType::Is4Xmm
        )
    }
}

/// A template operand: where it comes from and its declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(pub OpType, pub OpSize);

impl Slot {
    /// The empty slot.
    pub const NONE: Slot = Slot(OpType::None, OpSize::None);

    /// Whether the slot is unused.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self.0, OpType::None)
    }

    /// Operand type.
    #[inline]
    pub const fn ty(&self) -> OpType {
        self.0
    }

    /// Declared size.
    #[inline]
    pub const fn size(&self) -> OpSize {
        self.1
    }
}

/// A template's full operand list, continuations included.
#[derive(Debug, Clone, Copy)]
pub struct SlotList {
    items: [Slot; 8],
    len: u8,
}

impl SlotList {
    const fn new() -> SlotList {
        SlotList {
            items: [Slot::NONE; 8],
            len: 0,
        }
    }

    fn push(&mut self, s: Slot) {
        if (self.len as usize) < self.items.len() {
            self.items[self.len as usize] = s;
            self.len += 1;
        }
    }

    /// Active slots.
    #[inline]
    pub fn as_slice(&self) -> &[Slot] {
        &self.items[..self.len as usize]
    }
}

impl core::ops::Deref for SlotList {
    type Target = [Slot];
    #[inline]
    fn deref(&self) -> &[Slot] {
        self.as_slice()
    }
}

// ─── Templates and nodes ─────────────────────────────────────────────

/// One encoding variant of one operation.
#[derive(Debug, Clone)]
pub struct Template {
    /// Operation.
    pub opcode: Opcode,
    /// Encoding.
    pub form: Form,
    /// Destination slots (first two).
    pub dsts: [Slot; 2],
    /// Source slots (first three).
    pub srcs: [Slot; 3],
    /// Next template of the same operation, in table order.
    pub next: Option<TemplateId>,
    /// Continuation holding further slots.
    pub extra: Option<TemplateId>,
}

/// A decision-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// No instruction.
    Invalid,
    /// Terminal.
    Leaf(TemplateId),
    /// Read another opcode byte from `Map`.
    Escape(Map),
    /// 3DNow!: operands follow, then a suffix byte indexes [`Map::Amd3dnow`].
    Suffix3dnow,
    /// Columns `family * 4 + pp` with family legacy 0, VEX 1, EVEX 2.
    Prefix([NodeId; 12]),
    /// Columns 32-bit, 64-bit.
    Mode([NodeId; 2]),
    /// Columns ModR/M `reg` 0–7.
    Reg([NodeId; 8]),
    /// Columns memory, register.
    Mod([NodeId; 2]),
    /// Columns ModR/M `rm` 0–7.
    Rm([NodeId; 8]),
    /// Columns REX.B clear, set.
    RexB([NodeId; 2]),
    /// Columns W clear, set.
    W([NodeId; 2]),
    /// Columns vector length 128, 256, 512.
    VexL([NodeId; 3]),
}

impl Node {
    /// Child nodes.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Invalid | Node::Leaf(_) | Node::Escape(_) | Node::Suffix3dnow => &[],
            Node::Prefix(c) => c,
            Node::Mode(c) | Node::Mod(c) | Node::RexB(c) | Node::W(c) => c,
            Node::Reg(c) | Node::Rm(c) => c,
            Node::VexL(c) => c,
        }
    }
}

/// Prefix-level column.
#[inline]
pub const fn prefix_column(space: Space, mandatory: Mandatory) -> usize {
    let family = match space {
        Space::Legacy | Space::Xop => 0,
        Space::Vex => 1,
        Space::Evex => 2,
    };
    family * 4 + mandatory.pp() as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Prefix,
    Mode,
    Reg,
    Mod,
    Rm,
    RexB,
    W,
    VexL,
}

const LEVELS: [Level; 8] = [
    Level::Prefix,
    Level::Mode,
    Level::Reg,
    Level::Mod,
    Level::Rm,
    Level::RexB,
    Level::W,
    Level::VexL,
];

impl Level {
    const fn columns(self) -> usize {
        match self {
            Level::Prefix => 12,
            Level::Reg | Level::Rm => 8,
            Level::VexL => 3,
            Level::Mode | Level::Mod | Level::RexB | Level::W => 2,
        }
    }

    fn constrains(self, f: &Form) -> bool {
        match self {
            Level::Prefix => {
                !matches!(f.space, Space::Legacy | Space::Xop)
                    || (!matches!(f.mandatory, Mandatory::None) && f.space == Space::Legacy)
            }
            Level::Mode => f
                .flags
                .intersects(TemplateFlags::X86_INVALID | TemplateFlags::X64_INVALID),
            Level::Reg => f.reg.is_some(),
            Level::Mod => matches!(f.modrm, ModrmUse::Mem | ModrmUse::Reg),
            Level::Rm => f.rm.is_some(),
            Level::RexB => f.rex_b.is_some(),
            Level::W => f.w.is_some(),
            Level::VexL => f.l.is_some(),
        }
    }

    fn accepts(self, f: &Form, col: usize) -> bool {
        match self {
            Level::Prefix => prefix_column(f.space, f.mandatory) == col,
            Level::Mode => {
                if col == 0 {
                    !f.flags.contains(TemplateFlags::X86_INVALID)
                } else {
                    !f.flags.contains(TemplateFlags::X64_INVALID)
                }
            }
            Level::Reg => f.reg.map_or(true, |r| r as usize == col),
            Level::Mod => match f.modrm {
                ModrmUse::Mem => col == 0,
                ModrmUse::Reg => col == 1,
                _ => true,
            },
            Level::Rm => f.rm.map_or(true, |r| r as usize == col),
            Level::RexB => f.rex_b.map_or(true, |b| b as usize == col),
            Level::W => f.w.map_or(true, |w| w as usize == col),
            Level::VexL => f.l.map_or(true, |l| l as usize == col),
        }
    }

    fn node(self, kids: &[NodeId]) -> Node {
        fn arr<const N: usize>(kids: &[NodeId]) -> [NodeId; N] {
            let mut a = [NodeId::INVALID; N];
            a.copy_from_slice(&kids[..N]);
            a
        }
        match self {
            Level::Prefix => Node::Prefix(arr(kids)),
            Level::Mode => Node::Mode(arr(kids)),
            Level::Reg => Node::Reg(arr(kids)),
            Level::Mod => Node::Mod(arr(kids)),
            Level::Rm => Node::Rm(arr(kids)),
            Level::RexB => Node::RexB(arr(kids)),
            Level::W => Node::W(arr(kids)),
            Level::VexL => Node::VexL(arr(kids)),
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Collects templates and derives the decision trees.
pub(crate) struct Builder {
    templates: Vec<Template>,
    first: Vec<Option<TemplateId>>,
    last: Vec<Option<TemplateId>>,
}

impl Builder {
    fn new() -> Builder {
        Builder {
            templates: Vec::with_capacity(2048),
            first: vec![None; Opcode::COUNT],
            last: vec![None; Opcode::COUNT],
        }
    }

    /// Adds a template for `opcode`.
    ///
    /// Slots beyond two destinations or three sources go to continuation
    /// templates.
    pub(crate) fn add(&mut self, opcode: Opcode, mut form: Form, dsts: &[Slot], srcs: &[Slot]) {
        if opcode.condition().is_some() {
            form.flags |= TemplateFlags::HAS_PRED_CC;
        }
        let masked = srcs.iter().any(|s| s.0 == OpType::EvexMask);
        if opcode.is_string_op() || masked {
            form.flags |= TemplateFlags::HAS_PRED_COMPLEX;
        }
        let id = self.push_chunk(opcode, form, dsts, srcs);
        match self.last[opcode as usize] {
            Some(prev) => self.templates[prev.index()].next = Some(id),
            None => self.first[opcode as usize] = Some(id),
        }
        self.last[opcode as usize] = Some(id);
    }

    fn push_chunk(&mut self, opcode: Opcode, form: Form, dsts: &[Slot], srcs: &[Slot]) -> TemplateId {
        let (d_now, d_rest) = dsts.split_at(dsts.len().min(2));
        let (s_now, s_rest) = srcs.split_at(srcs.len().min(3));
        let mut d = [Slot::NONE; 2];
        d[..d_now.len()].copy_from_slice(d_now);
        let mut s = [Slot::NONE; 3];
        s[..s_now.len()].copy_from_slice(s_now);
        let id = TemplateId(self.templates.len() as u32);
        self.templates.push(Template {
            opcode,
            form,
            dsts: d,
            srcs: s,
            next: None,
            extra: None,
        });
        if !d_rest.is_empty() || !s_rest.is_empty() {
            let mut cont = form;
            cont.flags |= TemplateFlags::CONTINUATION;
            let extra = self.push_chunk(opcode, cont, d_rest, s_rest);
            self.templates[id.index()].extra = Some(extra);
        }
        id
    }

    fn finish(self) -> Tables {
        let mut t = Tables {
            nodes: vec![Node::Invalid],
            templates: self.templates,
            maps: [[NodeId::INVALID; 256]; 8],
            first: self.first,
            defects: Vec::new(),
        };

        let mut buckets: Vec<Vec<TemplateId>> = vec![Vec::new(); 8 * 256];
        for (i, tpl) in t.templates.iter().enumerate() {
            if tpl.form.flags.contains(TemplateFlags::CONTINUATION) {
                continue;
            }
            let base = tpl.form.opcode as usize;
            let span = if tpl.form.plus_reg { 8 } else { 1 };
            for b in base..(base + span).min(256) {
                buckets[tpl.form.map.slot() * 256 + b].push(TemplateId(i as u32));
            }
        }

        for map in Map::ALL {
            for byte in 0..256usize {
                let cands = core::mem::take(&mut buckets[map.slot() * 256 + byte]);
                let id = t.build_tree(&cands, 0);
                t.maps[map.slot()][byte] = id;
            }
        }

        let escape0f = t.push_node(Node::Escape(Map::Esc0F));
        let escape38 = t.push_node(Node::Escape(Map::Esc0F38));
        let escape3a = t.push_node(Node::Escape(Map::Esc0F3A));
        let suffix = t.push_node(Node::Suffix3dnow);
        for (map, byte, node) in [
            (Map::OneByte, 0x0f, escape0f),
            (Map::Esc0F, 0x38, escape38),
            (Map::Esc0F, 0x3a, escape3a),
            (Map::Esc0F, 0x0f, suffix),
        ] {
            if t.maps[map.slot()][byte] != NodeId::INVALID {
                t.defects
                    .push(format!("{:?} {:02x}: escape byte also has templates", map, byte));
            }
            t.maps[map.slot()][byte] = node;
        }
        t.check_templates();
        t
    }
}

// ─── Tables ──────────────────────────────────────────────────────────

/// The immutable decision graph and template arena.
pub struct Tables {
    nodes: Vec<Node>,
    templates: Vec<Template>,
    maps: [[NodeId; 256]; 8],
    first: Vec<Option<TemplateId>>,
    defects: Vec<String>,
}

lazy_static! {
    static ref TABLES: Tables = Tables::build();
}

/// The shared tables, built on first use.
pub fn tables() -> &'static Tables {
    &TABLES
}

impl Tables {
    fn build() -> Tables {
        let mut b = Builder::new();
        onebyte::add(&mut b);
        x87::add(&mut b);
        twobyte::add(&mut b);
        threebyte::add(&mut b);
        vex::add(&mut b);
        evex::add(&mut b);
        xop::add(&mut b);
        let t = b.finish();
        log::debug!(
            "opcode tables: {} templates, {} nodes, {} defects",
            t.templates.len(),
            t.nodes.len(),
            t.defects.len()
        );
        t
    }

    fn push_node(&mut self, n: Node) -> NodeId {
        if n == Node::Invalid {
            return NodeId::INVALID;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(n);
        id
    }

    fn build_tree(&mut self, cands: &[TemplateId], from: usize) -> NodeId {
        if cands.is_empty() {
            return NodeId::INVALID;
        }
        for (li, &level) in LEVELS.iter().enumerate().skip(from) {
            if !cands
                .iter()
                .any(|&c| level.constrains(&self.templates[c.index()].form))
            {
                continue;
            }
            let mut kids = Vec::with_capacity(level.columns());
            for col in 0..level.columns() {
                let sub: Vec<TemplateId> = cands
                    .iter()
                    .copied()
                    .filter(|&c| level.accepts(&self.templates[c.index()].form, col))
                    .collect();
                kids.push(self.build_tree(&sub, li + 1));
            }
            if kids.iter().all(|&k| k == NodeId::INVALID) {
                return NodeId::INVALID;
            }
            return self.push_node(level.node(&kids));
        }
        self.pick_leaf(cands)
    }

    fn pick_leaf(&mut self, cands: &[TemplateId]) -> NodeId {
        let spec = |t: &TemplateId| self.templates[t.index()].form.specificity();
        let best = cands.iter().map(spec).max().unwrap_or(0);
        let winners: Vec<TemplateId> = cands.iter().copied().filter(|t| spec(t) == best).collect();
        if winners.len() > 1 {
            let names: Vec<_> = winners
                .iter()
                .map(|t| self.templates[t.index()].opcode.name())
                .collect();
            let f = &self.templates[winners[0].index()].form;
            self.defects.push(format!(
                "{:?} {:02x}: ambiguous templates {:?}",
                f.map, f.opcode, names
            ));
        }
        self.push_node(Node::Leaf(winners[0]))
    }

    fn check_templates(&mut self) {
        let mut found = Vec::new();
        for (i, t) in self.templates.iter().enumerate() {
            if t.form.flags.contains(TemplateFlags::CONTINUATION) {
                continue;
            }
            let slots = self.slots(TemplateId(i as u32));
            let all = slots.0.iter().chain(slots.1.iter());
            let modrm_slot = all.clone().any(|s| s.0.uses_reg_field() || s.0.uses_rm_field());
            if t.form.has_modrm() && !modrm_slot && t.form.reg.is_none() {
                found.push(format!("{}: ModR/M byte with no ModR/M operand or extension", t.opcode));
            }
            if !t.form.has_modrm() && modrm_slot {
                found.push(format!("{}: ModR/M operand without a ModR/M byte", t.opcode));
            }
            if t.form.plus_reg != all.clone().any(|s| s.0 == OpType::PlusReg) {
                found.push(format!("{}: plus-register form and operand disagree", t.opcode));
            }
            if matches!(t.form.space, Space::Legacy) && all.clone().any(|s| s.0.uses_vvvv() || s.0 == OpType::EvexMask) {
                found.push(format!("{}: legacy template uses vvvv or a mask", t.opcode));
            }
            if matches!(t.form.space, Space::Evex) != t.form.evex.is_some() {
                found.push(format!("{}: EVEX data mismatch", t.opcode));
            }
            if t.form.flags.contains(TemplateFlags::NOT_K0) && !all.clone().any(|s| s.0 == OpType::EvexMask) {
                found.push(format!("{}: NOT_K0 without an opmask slot", t.opcode));
            }
        }
        self.defects.extend(found);
    }

    /// Node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Template by id.
    #[inline]
    pub fn template(&self, id: TemplateId) -> &Template {
        &self.templates[id.index()]
    }

    /// Entry node for `byte` in `map`.
    #[inline]
    pub fn entry(&self, map: Map, byte: u8) -> NodeId {
        self.maps[map.slot()][byte as usize]
    }

    /// Templates of `opcode`, in table order.
    pub fn templates_of(&self, opcode: Opcode) -> impl Iterator<Item = TemplateId> + '_ {
        let mut cur = self.first.get(opcode as usize).copied().flatten();
        core::iter::from_fn(move || {
            let id = cur?;
            cur = self.templates[id.index()].next;
            Some(id)
        })
    }

    /// Full destination and source slot lists of a template.
    pub fn slots(&self, id: TemplateId) -> (SlotList, SlotList) {
        let mut d = SlotList::new();
        let mut s = SlotList::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let t = &self.templates[c.index()];
            t.dsts.iter().filter(|x| !x.is_none()).for_each(|x| d.push(*x));
            t.srcs.iter().filter(|x| !x.is_none()).for_each(|x| s.push(*x));
            cur = t.extra;
        }
        (d, s)
    }

    /// Number of templates, continuations included.
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Data-authoring problems found while building.
    pub fn defects(&self) -> &[String] {
        &self.defects
    }

    /// Walks every decision path and checks the structural contract.
    ///
    /// Every path from an entry point must end in exactly one terminal
    /// without revisiting a node, within `max_depth` decision levels, and
    /// every leaf's template must accept the key values that lead to it.
    pub fn self_check(&self, max_depth: usize) -> Result<usize, Vec<String>> {
        let mut errors: Vec<String> = self.defects.clone();
        let mut leaves = 0usize;
        for map in Map::ALL {
            for byte in 0..256usize {
                let entry = self.maps[map.slot()][byte];
                let mut path = Vec::new();
                self.walk(entry, &mut path, max_depth, &mut errors, &mut leaves, map, byte);
            }
        }
        if errors.is_empty() {
            Ok(leaves)
        } else {
            Err(errors)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        id: NodeId,
        path: &mut Vec<(NodeId, Level, usize)>,
        max_depth: usize,
        errors: &mut Vec<String>,
        leaves: &mut usize,
        map: Map,
        byte: usize,
    ) {
        if path.iter().any(|(n, _, _)| *n == id) {
            errors.push(format!("{:?} {:02x}: cycle at node {}", map, byte, id.index()));
            return;
        }
        if path.len() > max_depth {
            errors.push(format!("{:?} {:02x}: deeper than {}", map, byte, max_depth));
            return;
        }
        let level = match self.node(id) {
            Node::Invalid | Node::Escape(_) | Node::Suffix3dnow => return,
            Node::Leaf(t) => {
                *leaves += 1;
                let f = &self.template(*t).form;
                if f.map != map {
                    errors.push(format!("{:?} {:02x}: leaf from map {:?}", map, byte, f.map));
                }
                for &(_, level, col) in path.iter() {
                    if !level.accepts(f, col) {
                        errors.push(format!(
                            "{:?} {:02x}: {} reached through {:?} column {}",
                            map,
                            byte,
                            self.template(*t).opcode,
                            level,
                            col
                        ));
                    }
                }
                return;
            }
            Node::Prefix(_) => Level::Prefix,
            Node::Mode(_) => Level::Mode,
            Node::Reg(_) => Level::Reg,
            Node::Mod(_) => Level::Mod,
            Node::Rm(_) => Level::Rm,
            Node::RexB(_) => Level::RexB,
            Node::W(_) => Level::W,
            Node::VexL(_) => Level::VexL,
        };
        if let Some(&(_, prev, _)) = path.last() {
            let order = |l: Level| LEVELS.iter().position(|&x| x == l);
            if order(prev) >= order(level) {
                errors.push(format!("{:?} {:02x}: {:?} below {:?}", map, byte, level, prev));
            }
        }
        for (col, &kid) in self.node(id).children().iter().enumerate() {
            path.push((id, level, col));
            self.walk(kid, path, max_depth, errors, leaves, map, byte);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_pass_self_check() {
        let t = tables();
        match t.self_check(LEVELS.len()) {
            Ok(leaves) => assert!(leaves > 1000, "only {} leaves", leaves),
            Err(errors) => panic!("table defects:\n{}", errors.join("\n")),
        }
    }

    #[test]
    fn escapes_are_wired() {
        let t = tables();
        assert_eq!(*t.node(t.entry(Map::OneByte, 0x0f)), Node::Escape(Map::Esc0F));
        assert_eq!(*t.node(t.entry(Map::Esc0F, 0x38)), Node::Escape(Map::Esc0F38));
        assert_eq!(*t.node(t.entry(Map::Esc0F, 0x3a)), Node::Escape(Map::Esc0F3A));
        assert_eq!(*t.node(t.entry(Map::Esc0F, 0x0f)), Node::Suffix3dnow);
    }

    #[test]
    fn one_byte_mov_is_a_direct_leaf() {
        let t = tables();
        match t.node(t.entry(Map::OneByte, 0x89)) {
            Node::Leaf(id) => assert_eq!(t.template(*id).opcode, Opcode::Mov),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nop_and_xchg_split_on_rex_b() {
        let t = tables();
        let Node::Prefix(cols) = *t.node(t.entry(Map::OneByte, 0x90)) else {
            panic!("90 should split on prefix");
        };
        let Node::RexB(rb) = *t.node(cols[0]) else {
            panic!("90 should split on REX.B");
        };
        let leaf = |id: NodeId| match t.node(id) {
            Node::Leaf(tid) => t.template(*tid).opcode,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(leaf(rb[0]), Opcode::Nop);
        assert_eq!(leaf(rb[1]), Opcode::Xchg);
        assert_eq!(leaf(cols[prefix_column(Space::Legacy, Mandatory::F3)]), Opcode::Pause);
    }

    #[test]
    fn every_opcode_has_a_template() {
        let t = tables();
        let missing: Vec<_> = Opcode::ALL
            .iter()
            .filter(|op| t.templates_of(**op).next().is_none())
            .map(|op| format!("{:?}", op))
            .collect();
        assert!(missing.is_empty(), "no templates for {:?}", missing);
    }

    #[test]
    fn continuation_slots_are_appended() {
        let t = tables();
        let pusha = t.templates_of(Opcode::Pusha).next().unwrap();
        let (d, s) = t.slots(pusha);
        assert_eq!(d.len(), 2);
        assert_eq!(s.len(), 8);
        assert!(t.template(pusha).extra.is_some());
    }

    #[test]
    fn disp8_scales() {
        let fv = EvexInfo {
            tuple: Tuple::Fv,
            input: InputSize::ByW,
            er: false,
            sae: false,
        };
        assert_eq!(fv.disp8_scale(64, false, false), 64);
        assert_eq!(fv.disp8_scale(64, false, true), 4);
        assert_eq!(fv.disp8_scale(32, true, true), 8);
        let t1s = EvexInfo {
            tuple: Tuple::T1s,
            ..fv
        };
        assert_eq!(t1s.disp8_scale(64, true, false), 8);
        let dup = EvexInfo {
            tuple: Tuple::Dup,
            ..fv
        };
        assert_eq!(dup.disp8_scale(16, false, false), 8);
        assert_eq!(dup.disp8_scale(32, false, false), 32);
    }
}
