//! Operand model: registers, immediates, memory references, and relative
//! or absolute targets.

use core::fmt;

use crate::mode::Mode;
use crate::register::{RegClass, Register, RegisterValues};

// ─── MemRef ─────────────────────────────────────────────────────────

/// A `seg:[base + index*scale + disp]` memory reference.
///
/// `scale` is 0 when there is no index and one of 1, 2, 4, 8 otherwise.
/// A vector `index` makes this a VSIB reference. The two `*_disp` flags
/// preserve a non-minimal displacement encoding seen by the decoder so the
/// instruction re-encodes byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemRef {
    /// Segment override, `None` for the default segment.
    pub seg: Option<Register>,
    /// Base register.
    pub base: Option<Register>,
    /// Index register (general-purpose, or vector for VSIB).
    pub index: Option<Register>,
    /// Index scale.
    pub scale: u8,
    /// Signed displacement.
    pub disp: i32,
    /// Access width in bytes (0 when the instruction only computes the
    /// address).
    pub size: u16,
    /// Emit an 8-bit zero displacement even where none is needed.
    pub encode_zero_disp: bool,
    /// Emit a full-width displacement even where 8 bits would do.
    pub force_full_disp: bool,
    /// A base-less, index-less reference that uses the address-size
    /// override (16-bit displacement in 32-bit mode, 32-bit in 64-bit mode).
    pub short_addr: bool,
}

impl MemRef {
    /// Builds a reference, validating the addressing components.
    ///
    /// Returns `None` when `scale` is not 0, 1, 2, 4 or 8, when an index is
    /// given with scale 0 (or a scale without an index), when base or index
    /// is not an address register, when the stack pointer is used as a
    /// general-purpose index, or when base and index widths disagree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use x86_codec::{MemRef, Register};
    ///
    /// let m = MemRef::new(Some(Register::RAX), Some(Register::RCX), 4, 16, 8).unwrap();
    /// assert_eq!(m.scale, 4);
    /// assert!(MemRef::new(Some(Register::RAX), Some(Register::RCX), 3, 0, 8).is_none());
    /// assert!(MemRef::new(None, Some(Register::RSP), 1, 0, 8).is_none());
    /// ```
    pub fn new(
        base: Option<Register>,
        index: Option<Register>,
        scale: u8,
        disp: i32,
        size: u16,
    ) -> Option<MemRef> {
        if !matches!(scale, 0 | 1 | 2 | 4 | 8) {
            return None;
        }
        if index.is_some() != (scale != 0) {
            return None;
        }
        if let Some(b) = base {
            if !is_addr_reg(b) {
                return None;
            }
        }
        if let Some(i) = index {
            let gpr_index = is_addr_reg(i) && i.num() != 4;
            if !gpr_index && !i.is_vector() {
                return None;
            }
            if let Some(b) = base {
                if i.is_gpr() && i.class() != b.class() {
                    return None;
                }
            }
        }
        Some(MemRef {
            seg: None,
            base,
            index,
            scale,
            disp,
            size,
            encode_zero_disp: false,
            force_full_disp: false,
            short_addr: false,
        })
    }

    /// `[base + disp]`. `base` must be a 16-, 32- or 64-bit GPR.
    pub fn base_disp(base: Register, disp: i32, size: u16) -> Option<MemRef> {
        MemRef::new(Some(base), None, 0, disp, size)
    }

    /// `[disp]` with neither base nor index.
    pub const fn absolute(disp: i32, size: u16) -> MemRef {
        MemRef {
            seg: None,
            base: None,
            index: None,
            scale: 0,
            disp,
            size,
            encode_zero_disp: false,
            force_full_disp: false,
            short_addr: false,
        }
    }

    /// Sets the segment override.
    pub const fn with_seg(mut self, seg: Register) -> MemRef {
        self.seg = Some(seg);
        self
    }

    /// Sets the access width.
    pub const fn with_size(mut self, size: u16) -> MemRef {
        self.size = size;
        self
    }

    /// Whether the index is a vector register.
    #[inline]
    pub fn is_vsib(&self) -> bool {
        self.index.map_or(false, |r| r.is_vector())
    }

    /// Width of the address registers, if any are present.
    pub fn reg_addr_size(&self) -> Option<u16> {
        match (self.base, self.index) {
            (Some(b), _) => Some(b.size()),
            (None, Some(i)) if i.is_gpr() => Some(i.size()),
            _ => None,
        }
    }

    /// Whether the addressing components (not the size or encoding hints)
    /// are identical.
    pub fn same_address(&self, other: &MemRef) -> bool {
        self.seg == other.seg
            && self.base == other.base
            && self.index == other.index
            && self.scale == other.scale
            && self.disp == other.disp
            && self.short_addr == other.short_addr
    }

    /// Linear address, using lane `lane` of a VSIB index with elements of
    /// `elem_size` bytes.
    pub fn compute_address_lane(
        &self,
        values: &dyn RegisterValues,
        mode: Mode,
        lane: usize,
        elem_size: u16,
    ) -> u64 {
        let mut ea = self.base.map_or(0, |b| b.value_from(values));
        if let Some(idx) = self.index {
            let iv = if idx.is_vector() {
                values.vector_lane(idx.num(), lane, elem_size) as u64
            } else {
                idx.value_from(values)
            };
            ea = ea.wrapping_add(iv.wrapping_mul(u64::from(self.scale)));
        }
        ea = ea.wrapping_add(i64::from(self.disp) as u64);
        ea &= self.addr_mask(mode);
        if let Some(seg) = self.seg {
            ea = ea.wrapping_add(values.segment_base(seg));
            if !mode.is_64() {
                ea &= 0xffff_ffff;
            }
        }
        ea
    }

    fn addr_mask(&self, mode: Mode) -> u64 {
        let width = match self.reg_addr_size() {
            Some(w) => w,
            None if self.short_addr => {
                if mode.is_64() {
                    4
                } else {
                    2
                }
            }
            None => mode.addr_bytes(),
        };
        match width {
            2 => 0xffff,
            4 => 0xffff_ffff,
            _ => u64::MAX,
        }
    }
}

fn is_addr_reg(r: Register) -> bool {
    matches!(
        r.class(),
        RegClass::Gpr64 | RegClass::Gpr32 | RegClass::Gpr16
    )
}

// ─── Operand ────────────────────────────────────────────────────────

/// Instruction operand.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// A whole register.
    Reg(Register),
    /// Part of a register narrower than its natural width.
    SubReg {
        /// Containing register.
        reg: Register,
        /// Bytes accessed.
        size: u16,
    },
    /// Integer immediate, stored sign-extended from `size` bytes.
    Imm {
        /// Value.
        value: i64,
        /// Width of the immediate field in bytes.
        size: u16,
    },
    /// Single-precision constant (implicit operands only).
    Float(f32),
    /// Double-precision constant (implicit x87 load constants).
    Double(f64),
    /// Near branch target, absolute.
    Pc(u64),
    /// Far branch target.
    FarPc {
        /// Segment selector.
        selector: u16,
        /// Offset.
        pc: u64,
    },
    /// Near branch to another instruction of a block, by position.
    Instr(usize),
    /// Far branch to another instruction of a block.
    FarInstr {
        /// Segment selector.
        selector: u16,
        /// Target position in the block.
        index: usize,
    },
    /// Memory at the address of another instruction of a block.
    MemInstr {
        /// Target position in the block.
        index: usize,
        /// Offset from the instruction's address.
        disp: i32,
        /// Access width.
        size: u16,
    },
    /// Base/index/displacement memory.
    Mem(MemRef),
    /// Absolute address of a `moffs` form (`mov` to or from the
    /// accumulator). Other base-less references are [`MemRef::absolute`].
    Abs {
        /// Linear address.
        addr: u64,
        /// Segment override.
        seg: Option<Register>,
        /// Access width.
        size: u16,
    },
    /// Instruction-pointer-relative memory, as the raw signed offset from
    /// the end of the instruction.
    RipRel {
        /// Offset from the next instruction.
        disp: i32,
        /// Segment override.
        seg: Option<Register>,
        /// Access width.
        size: u16,
    },
    /// Instruction-pointer-relative memory given by its absolute target;
    /// the offset is computed when the final address is known.
    RelAddr {
        /// Absolute target.
        target: u64,
        /// Segment override.
        seg: Option<Register>,
        /// Access width.
        size: u16,
    },
}

/// Operand kind, one per [`Operand`] variant (with `Mem` as `BaseDisp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// [`Operand::Reg`].
    Reg,
    /// [`Operand::SubReg`].
    SubReg,
    /// [`Operand::Imm`].
    Imm,
    /// [`Operand::Float`].
    Float,
    /// [`Operand::Double`].
    Double,
    /// [`Operand::Pc`].
    Pc,
    /// [`Operand::FarPc`].
    FarPc,
    /// [`Operand::Instr`].
    Instr,
    /// [`Operand::FarInstr`].
    FarInstr,
    /// [`Operand::MemInstr`].
    MemInstr,
    /// [`Operand::Mem`].
    BaseDisp,
    /// [`Operand::Abs`].
    Abs,
    /// [`Operand::RipRel`].
    RipRel,
    /// [`Operand::RelAddr`].
    RelAddr,
}

impl OperandKind {
    /// All kinds.
    pub const ALL: [OperandKind; 14] = [
        OperandKind::Reg,
        OperandKind::SubReg,
        OperandKind::Imm,
        OperandKind::Float,
        OperandKind::Double,
        OperandKind::Pc,
        OperandKind::FarPc,
        OperandKind::Instr,
        OperandKind::FarInstr,
        OperandKind::MemInstr,
        OperandKind::BaseDisp,
        OperandKind::Abs,
        OperandKind::RipRel,
        OperandKind::RelAddr,
    ];
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Imm { value: 0, size: 0 }
    }
}

impl From<Register> for Operand {
    fn from(r: Register) -> Self {
        Operand::Reg(r)
    }
}

impl From<MemRef> for Operand {
    fn from(m: MemRef) -> Self {
        Operand::Mem(m)
    }
}

/// Sign-extends the low `size` bytes of `value`.
pub(crate) fn sign_extend(value: i64, size: u16) -> i64 {
    match size {
        1 => value as i8 as i64,
        2 => value as i16 as i64,
        4 => value as i32 as i64,
        _ => value,
    }
}

impl Operand {
    /// Register operand.
    #[inline]
    pub const fn reg(r: Register) -> Operand {
        Operand::Reg(r)
    }

    /// Immediate of `size` bytes. The value is stored sign-extended, so
    /// `imm(0xff, 1)` and `imm(-1, 1)` are the same operand.
    pub fn imm(value: i64, size: u16) -> Operand {
        Operand::Imm {
            value: sign_extend(value, size),
            size,
        }
    }

    /// 8-bit immediate.
    pub fn imm8(value: i64) -> Operand {
        Operand::imm(value, 1)
    }

    /// 16-bit immediate.
    pub fn imm16(value: i64) -> Operand {
        Operand::imm(value, 2)
    }

    /// 32-bit immediate.
    pub fn imm32(value: i64) -> Operand {
        Operand::imm(value, 4)
    }

    /// 64-bit immediate.
    pub fn imm64(value: i64) -> Operand {
        Operand::imm(value, 8)
    }

    /// Memory operand.
    #[inline]
    pub const fn mem(m: MemRef) -> Operand {
        Operand::Mem(m)
    }

    /// `[base + disp]` of `size` bytes, or `None` for a non-address base.
    pub fn base_disp(base: Register, disp: i32, size: u16) -> Option<Operand> {
        MemRef::base_disp(base, disp, size).map(Operand::Mem)
    }

    /// Raw instruction-pointer-relative reference.
    #[inline]
    pub const fn rip_rel(disp: i32, size: u16) -> Operand {
        Operand::RipRel {
            disp,
            seg: None,
            size,
        }
    }

    /// Instruction-pointer-relative reference to an absolute target.
    #[inline]
    pub const fn rel_addr(target: u64, size: u16) -> Operand {
        Operand::RelAddr {
            target,
            seg: None,
            size,
        }
    }

    /// Absolute address.
    #[inline]
    pub const fn abs(addr: u64, size: u16) -> Operand {
        Operand::Abs {
            addr,
            seg: None,
            size,
        }
    }

    /// Kind tag.
    pub const fn kind(&self) -> OperandKind {
        match self {
            Operand::Reg(_) => OperandKind::Reg,
            Operand::SubReg { .. } => OperandKind::SubReg,
            Operand::Imm { .. } => OperandKind::Imm,
            Operand::Float(_) => OperandKind::Float,
            Operand::Double(_) => OperandKind::Double,
            Operand::Pc(_) => OperandKind::Pc,
            Operand::FarPc { .. } => OperandKind::FarPc,
            Operand::Instr(_) => OperandKind::Instr,
            Operand::FarInstr { .. } => OperandKind::FarInstr,
            Operand::MemInstr { .. } => OperandKind::MemInstr,
            Operand::Mem(_) => OperandKind::BaseDisp,
            Operand::Abs { .. } => OperandKind::Abs,
            Operand::RipRel { .. } => OperandKind::RipRel,
            Operand::RelAddr { .. } => OperandKind::RelAddr,
        }
    }

    /// A whole register.
    #[inline]
    pub const fn is_reg(&self) -> bool {
        matches!(self, Operand::Reg(_))
    }

    /// Part of a register.
    #[inline]
    pub const fn is_sub_reg(&self) -> bool {
        matches!(self, Operand::SubReg { .. })
    }

    /// Integer immediate.
    #[inline]
    pub const fn is_imm(&self) -> bool {
        matches!(self, Operand::Imm { .. })
    }

    /// Floating-point constant of either precision.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Operand::Float(_) | Operand::Double(_))
    }

    /// Near or far absolute branch target.
    #[inline]
    pub const fn is_pc(&self) -> bool {
        matches!(self, Operand::Pc(_) | Operand::FarPc { .. })
    }

    /// Near or far instruction-relative branch target.
    #[inline]
    pub const fn is_instr(&self) -> bool {
        matches!(self, Operand::Instr(_) | Operand::FarInstr { .. })
    }

    /// Base/index/displacement memory.
    #[inline]
    pub const fn is_base_disp(&self) -> bool {
        matches!(self, Operand::Mem(_))
    }

    /// Absolute-address memory.
    #[inline]
    pub const fn is_abs(&self) -> bool {
        matches!(self, Operand::Abs { .. })
    }

    /// Instruction-pointer-relative memory, in either representation.
    #[inline]
    pub const fn is_rip_rel(&self) -> bool {
        matches!(self, Operand::RipRel { .. } | Operand::RelAddr { .. })
    }

    /// Any operand that names memory.
    #[inline]
    pub const fn is_memory_reference(&self) -> bool {
        matches!(
            self,
            Operand::Mem(_)
                | Operand::Abs { .. }
                | Operand::RipRel { .. }
                | Operand::RelAddr { .. }
                | Operand::MemInstr { .. }
        )
    }

    /// The register of a `Reg` or `SubReg` operand.
    pub const fn register(&self) -> Option<Register> {
        match self {
            Operand::Reg(r) | Operand::SubReg { reg: r, .. } => Some(*r),
            _ => None,
        }
    }

    /// The memory reference of a `Mem` operand.
    pub const fn mem_ref(&self) -> Option<&MemRef> {
        match self {
            Operand::Mem(m) => Some(m),
            _ => None,
        }
    }

    /// Integer value of an immediate.
    pub const fn imm_value(&self) -> Option<i64> {
        match self {
            Operand::Imm { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Segment override of a memory operand.
    pub const fn segment(&self) -> Option<Register> {
        match self {
            Operand::Mem(m) => m.seg,
            Operand::Abs { seg, .. } | Operand::RipRel { seg, .. } | Operand::RelAddr { seg, .. } => {
                *seg
            }
            _ => None,
        }
    }

    /// Width in bytes. Branch targets report 0.
    pub const fn size(&self) -> u16 {
        match self {
            Operand::Reg(r) => r.size(),
            Operand::SubReg { size, .. } | Operand::Imm { size, .. } => *size,
            Operand::Float(_) => 4,
            Operand::Double(_) => 8,
            Operand::Pc(_) | Operand::FarPc { .. } | Operand::Instr(_) | Operand::FarInstr { .. } => 0,
            Operand::MemInstr { size, .. }
            | Operand::Abs { size, .. }
            | Operand::RipRel { size, .. }
            | Operand::RelAddr { size, .. } => *size,
            Operand::Mem(m) => m.size,
        }
    }

    /// Copy of a memory operand with its access width replaced.
    pub fn with_size(self, size: u16) -> Operand {
        match self {
            Operand::Mem(m) => Operand::Mem(m.with_size(size)),
            Operand::Abs { addr, seg, .. } => Operand::Abs { addr, seg, size },
            Operand::RipRel { disp, seg, .. } => Operand::RipRel { disp, seg, size },
            Operand::RelAddr { target, seg, .. } => Operand::RelAddr { target, seg, size },
            Operand::MemInstr { index, disp, .. } => Operand::MemInstr { index, disp, size },
            Operand::Imm { value, .. } => Operand::imm(value, size),
            other => other,
        }
    }

    /// Operand equality for matching purposes.
    ///
    /// Kinds must match, with one exception: a `SubReg` covering a
    /// register's full natural width is the same as the `Reg` itself.
    /// Registers compare by identity only (their width is implied);
    /// immediates and memory compare value and declared size. Memory
    /// ignores the displacement-encoding hints.
    #[doc(alias = "same_operand")]
    pub fn same(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Reg(a), Operand::Reg(b)) => a == b,
            (Operand::Reg(a), Operand::SubReg { reg, size })
            | (Operand::SubReg { reg, size }, Operand::Reg(a)) => a == reg && *size == a.size(),
            (Operand::SubReg { reg: a, size: sa }, Operand::SubReg { reg: b, size: sb }) => {
                a == b && sa == sb
            }
            (Operand::Imm { value: a, size: sa }, Operand::Imm { value: b, size: sb }) => {
                sa == sb && sign_extend(*a, *sa) == sign_extend(*b, *sb)
            }
            (Operand::Float(a), Operand::Float(b)) => a.to_bits() == b.to_bits(),
            (Operand::Double(a), Operand::Double(b)) => a.to_bits() == b.to_bits(),
            (Operand::Mem(a), Operand::Mem(b)) => a.same_address(b) && a.size == b.size,
            _ => self.kind() == other.kind() && self == other,
        }
    }

    /// Whether both operands name the same memory, ignoring access width
    /// and kind-independent encoding details. Non-memory operands never
    /// share an address.
    pub fn same_address(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Mem(a), Operand::Mem(b)) => a.same_address(b),
            (Operand::Abs { addr: a, seg: sa, .. }, Operand::Abs { addr: b, seg: sb, .. }) => {
                a == b && sa == sb
            }
            (
                Operand::RipRel { disp: a, seg: sa, .. },
                Operand::RipRel { disp: b, seg: sb, .. },
            ) => a == b && sa == sb,
            (
                Operand::RelAddr { target: a, seg: sa, .. },
                Operand::RelAddr { target: b, seg: sb, .. },
            ) => a == b && sa == sb,
            (
                Operand::MemInstr { index: a, disp: da, .. },
                Operand::MemInstr { index: b, disp: db, .. },
            ) => a == b && da == db,
            _ => false,
        }
    }

    /// Whether the register `reg` is read to form this operand's address
    /// or is the operand itself (width-insensitive).
    pub fn uses_register(&self, reg: Register) -> bool {
        match self {
            Operand::Reg(r) | Operand::SubReg { reg: r, .. } => r.overlaps(reg),
            Operand::Mem(m) => {
                m.base.map_or(false, |b| b.overlaps(reg))
                    || m.index.map_or(false, |i| i.overlaps(reg))
            }
            _ => false,
        }
    }

    /// Effective (linear) address of a memory operand.
    ///
    /// `next_pc` is the address of the following instruction, used for
    /// instruction-pointer-relative references. Returns `None` for
    /// non-memory operands and for `MemInstr`, whose address depends on
    /// block layout.
    pub fn compute_address(
        &self,
        values: &dyn RegisterValues,
        mode: Mode,
        next_pc: u64,
    ) -> Option<u64> {
        self.compute_address_lane(values, mode, next_pc, 0, 4)
    }

    /// Like [`Operand::compute_address`], selecting VSIB lane `lane` with
    /// index elements of `elem_size` bytes.
    pub fn compute_address_lane(
        &self,
        values: &dyn RegisterValues,
        mode: Mode,
        next_pc: u64,
        lane: usize,
        elem_size: u16,
    ) -> Option<u64> {
        let seg_base = |seg: &Option<Register>| seg.map_or(0, |s| values.segment_base(s));
        let wrap = |a: u64| if mode.is_64() { a } else { a & 0xffff_ffff };
        match self {
            Operand::Mem(m) => Some(m.compute_address_lane(values, mode, lane, elem_size)),
            Operand::Abs { addr, seg, .. } => Some(wrap(addr.wrapping_add(seg_base(seg)))),
            Operand::RipRel { disp, seg, .. } => Some(wrap(
                next_pc
                    .wrapping_add(i64::from(*disp) as u64)
                    .wrapping_add(seg_base(seg)),
            )),
            Operand::RelAddr { target, seg, .. } => {
                Some(wrap(target.wrapping_add(seg_base(seg))))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::SubReg { reg, size } => write!(f, "{}.{}", reg, size),
            Operand::Imm { value, .. } => write!(f, "{:#x}", value),
            Operand::Float(v) => write!(f, "{}", v),
            Operand::Double(v) => write!(f, "{}", v),
            Operand::Pc(pc) => write!(f, "{:#x}", pc),
            Operand::FarPc { selector, pc } => write!(f, "{:#x}:{:#x}", selector, pc),
            Operand::Instr(i) => write!(f, "@{}", i),
            Operand::FarInstr { selector, index } => write!(f, "{:#x}:@{}", selector, index),
            Operand::MemInstr { index, disp, .. } => write!(f, "[@{}{:+}]", index, disp),
            Operand::Mem(m) => {
                if let Some(s) = m.seg {
                    write!(f, "{}:", s)?;
                }
                f.write_str("[")?;
                let mut first = true;
                if let Some(b) = m.base {
                    write!(f, "{}", b)?;
                    first = false;
                }
                if let Some(i) = m.index {
                    if !first {
                        f.write_str("+")?;
                    }
                    write!(f, "{}*{}", i, m.scale)?;
                    first = false;
                }
                if first {
                    write!(f, "{:#x}", m.disp)?;
                } else if m.disp != 0 {
                    write!(f, "{:+#x}", m.disp)?;
                }
                f.write_str("]")
            }
            Operand::Abs { addr, .. } => write!(f, "[{:#x}]", addr),
            Operand::RipRel { disp, .. } => write!(f, "[rip{:+#x}]", disp),
            Operand::RelAddr { target, .. } => write!(f, "[rel {:#x}]", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Values;

    impl RegisterValues for Values {
        fn gpr(&self, num: u8) -> u64 {
            match num {
                0 => 0x1000,
                1 => 0x10,
                3 => 0xffff_ffff_ffff_fff0,
                _ => 0,
            }
        }

        fn vector_lane(&self, _num: u8, lane: usize, _elem: u16) -> i64 {
            lane as i64 * 4
        }

        fn segment_base(&self, seg: Register) -> u64 {
            if seg == Register::FS {
                0x7000_0000
            } else {
                0
            }
        }
    }

    fn sample() -> [Operand; 14] {
        let m = MemRef::base_disp(Register::RAX, 8, 4).unwrap();
        [
            Operand::Reg(Register::RAX),
            Operand::SubReg {
                reg: Register::xmm(1),
                size: 8,
            },
            Operand::imm8(1),
            Operand::Float(1.0),
            Operand::Double(1.0),
            Operand::Pc(0x400000),
            Operand::FarPc {
                selector: 0x23,
                pc: 0x1000,
            },
            Operand::Instr(3),
            Operand::FarInstr {
                selector: 0x23,
                index: 3,
            },
            Operand::MemInstr {
                index: 1,
                disp: 0,
                size: 8,
            },
            Operand::Mem(m),
            Operand::abs(0x1000, 8),
            Operand::rip_rel(0x10, 4),
            Operand::rel_addr(0x2000, 4),
        ]
    }

    #[test]
    fn kinds_partition_operands() {
        for op in sample() {
            let preds = [
                op.is_reg(),
                op.is_sub_reg(),
                op.is_imm(),
                op.is_float(),
                op.is_pc(),
                op.is_instr(),
                op.is_base_disp(),
                op.is_abs(),
                op.is_rip_rel(),
                matches!(op, Operand::MemInstr { .. }),
            ];
            assert_eq!(preds.iter().filter(|p| **p).count(), 1, "{:?}", op);
        }
        let kinds: alloc::vec::Vec<_> = sample().iter().map(Operand::kind).collect();
        assert_eq!(kinds, OperandKind::ALL.to_vec());
    }

    #[test]
    fn memory_reference_predicate() {
        let mem: alloc::vec::Vec<_> = sample()
            .iter()
            .filter(|o| o.is_memory_reference())
            .map(Operand::kind)
            .collect();
        assert_eq!(
            mem,
            [
                OperandKind::MemInstr,
                OperandKind::BaseDisp,
                OperandKind::Abs,
                OperandKind::RipRel,
                OperandKind::RelAddr
            ]
        );
    }

    #[test]
    fn same_is_reflexive_and_symmetric() {
        let ops = sample();
        for a in &ops {
            assert!(a.same(a), "{:?}", a);
            for b in &ops {
                assert_eq!(a.same(b), b.same(a));
            }
        }
    }

    #[test]
    fn same_size_rules() {
        // Full-width sub-register equals the register.
        let full = Operand::SubReg {
            reg: Register::EAX,
            size: 4,
        };
        assert!(full.same(&Operand::Reg(Register::EAX)));
        let part = Operand::SubReg {
            reg: Register::EAX,
            size: 2,
        };
        assert!(!part.same(&Operand::Reg(Register::EAX)));
        // Immediates and memory compare sizes.
        assert!(!Operand::imm8(1).same(&Operand::imm32(1)));
        let m4 = Operand::base_disp(Register::RBX, 0, 4).unwrap();
        let m8 = Operand::base_disp(Register::RBX, 0, 8).unwrap();
        assert!(!m4.same(&m8));
        assert!(m4.same_address(&m8));
    }

    #[test]
    fn imm_is_sign_extended() {
        assert_eq!(Operand::imm8(0xff), Operand::imm8(-1));
        assert_eq!(Operand::imm16(0x8000).imm_value(), Some(-0x8000));
        assert_eq!(Operand::imm64(0x8000).imm_value(), Some(0x8000));
    }

    #[test]
    fn memref_validation() {
        assert!(MemRef::new(Some(Register::EAX), Some(Register::RCX), 1, 0, 4).is_none());
        assert!(MemRef::new(Some(Register::RAX), None, 2, 0, 4).is_none());
        assert!(MemRef::new(Some(Register::AL), None, 0, 0, 4).is_none());
        assert!(MemRef::new(Some(Register::R12), Some(Register::R12), 8, 0, 4).is_some());
        let vsib = MemRef::new(Some(Register::RAX), Some(Register::ymm(2)), 4, 0, 4).unwrap();
        assert!(vsib.is_vsib());
    }

    #[test]
    fn effective_addresses() {
        let m = MemRef::new(Some(Register::RAX), Some(Register::RCX), 4, -8, 4).unwrap();
        let op = Operand::Mem(m);
        assert_eq!(op.compute_address(&Values, Mode::X64, 0), Some(0x1000 + 0x40 - 8));
        // 32-bit registers wrap at 4 GiB.
        let m = MemRef::base_disp(Register::EBX, 0x20, 4).unwrap();
        assert_eq!(
            Operand::Mem(m).compute_address(&Values, Mode::X64, 0),
            Some(0x10)
        );
        // Segment base is added.
        let m = MemRef::base_disp(Register::RAX, 0, 4)
            .unwrap()
            .with_seg(Register::FS);
        assert_eq!(
            Operand::Mem(m).compute_address(&Values, Mode::X64, 0),
            Some(0x7000_1000)
        );
        assert_eq!(
            Operand::rip_rel(-0x10, 4).compute_address(&Values, Mode::X64, 0x4010),
            Some(0x4000)
        );
        assert_eq!(Operand::Reg(Register::RAX).compute_address(&Values, Mode::X64, 0), None);
    }

    #[test]
    fn vsib_lanes() {
        let m = MemRef::new(Some(Register::RAX), Some(Register::xmm(1)), 2, 0, 4).unwrap();
        let op = Operand::Mem(m);
        assert_eq!(
            op.compute_address_lane(&Values, Mode::X64, 0, 3, 4),
            Some(0x1000 + 24)
        );
    }

    #[test]
    fn display() {
        let m = MemRef::new(Some(Register::RAX), Some(Register::RCX), 8, 0x10, 8).unwrap();
        assert_eq!(Operand::Mem(m).to_string(), "[rax+rcx*8+0x10]");
        assert_eq!(Operand::rip_rel(0x20, 4).to_string(), "[rip+0x20]");
        assert_eq!(Operand::Reg(Register::R9D).to_string(), "r9d");
    }
}
