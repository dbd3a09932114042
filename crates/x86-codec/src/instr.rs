//! The decoded/encodable instruction.
//!
//! An [`Instruction`] lists every operand the operation touches, implicit
//! ones included: `push rax` has destinations `rsp, [rsp-8]` and sources
//! `rax, rsp`. Read-modify-write operands appear in both lists. The encoder
//! matches the whole list against a template, so two instructions that
//! compare equal always encode identically.

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::mode::Mode;
use crate::opcode::{Condition, EFlags, Opcode};
use crate::operand::{MemRef, Operand};
use crate::register::{Register, RegisterValues};

// ─── OperandList: stack-allocated operand array ──────────────────────

/// Stack-allocated operand list (max 8 operands).
///
/// No x86 operation needs more: `pusha` reads the stack pointer and eight
/// general-purpose registers, of which the stack pointer is one.
#[derive(Clone, Copy)]
pub struct OperandList {
    items: [Operand; 8],
    len: u8,
}

impl OperandList {
    /// Maximum number of operands.
    pub const MAX_LEN: usize = 8;

    /// Creates a new empty operand list.
    #[inline]
    pub fn new() -> Self {
        Self {
            items: [Operand::default(); 8],
            len: 0,
        }
    }

    /// Builds a list from a slice.
    ///
    /// # Panics
    /// Panics if `ops` holds more than [`OperandList::MAX_LEN`] operands.
    pub fn from_slice(ops: &[Operand]) -> Self {
        let mut list = Self::new();
        for op in ops {
            list.push(*op);
        }
        list
    }

    /// Appends an operand to the list.
    ///
    /// # Panics
    /// Panics if the list is full.
    #[inline]
    pub fn push(&mut self, op: Operand) {
        assert!(
            (self.len as usize) < Self::MAX_LEN,
            "OperandList overflow: max {} operands",
            Self::MAX_LEN
        );
        self.items[self.len as usize] = op;
        self.len += 1;
    }

    /// Appends an operand unless the list is full. Returns whether it was
    /// stored.
    #[inline]
    pub fn try_push(&mut self, op: Operand) -> bool {
        if (self.len as usize) < Self::MAX_LEN {
            self.items[self.len as usize] = op;
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Removes every operand.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Returns the number of operands.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the active operands as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[Operand] {
        &self.items[..self.len as usize]
    }

    /// Returns the active operands as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Operand] {
        &mut self.items[..self.len as usize]
    }
}

impl core::ops::Deref for OperandList {
    type Target = [Operand];
    #[inline]
    fn deref(&self) -> &[Operand] {
        self.as_slice()
    }
}

impl core::ops::DerefMut for OperandList {
    #[inline]
    fn deref_mut(&mut self) -> &mut [Operand] {
        self.as_mut_slice()
    }
}

impl PartialEq for OperandList {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl PartialEq<Vec<Operand>> for OperandList {
    fn eq(&self, other: &Vec<Operand>) -> bool {
        self.as_slice() == &other[..]
    }
}

impl fmt::Debug for OperandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice().iter()).finish()
    }
}

impl Default for OperandList {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Operand>> for OperandList {
    fn from(v: Vec<Operand>) -> Self {
        assert!(
            v.len() <= Self::MAX_LEN,
            "OperandList: max {} operands, got {}",
            Self::MAX_LEN,
            v.len()
        );
        Self::from_slice(&v)
    }
}

impl<'a> IntoIterator for &'a OperandList {
    type Item = &'a Operand;
    type IntoIter = core::slice::Iter<'a, Operand>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a mut OperandList {
    type Item = &'a mut Operand;
    type IntoIter = core::slice::IterMut<'a, Operand>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for OperandList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for op in self.as_slice() {
            seq.serialize_element(op)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for OperandList {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Vec::<Operand>::deserialize(deserializer)?;
        if v.len() > Self::MAX_LEN {
            return Err(serde::de::Error::invalid_length(
                v.len(),
                &"at most 8 operands",
            ));
        }
        Ok(Self::from_slice(&v))
    }
}

// ─── Prefixes ────────────────────────────────────────────────────────

bitflags! {
    /// Prefix bits that are not implied by the operands.
    ///
    /// Operand-size, REX and vector-length bits are derived from operand
    /// widths and never stored. `DATA` and `ADDR` record a 0x66/0x67 byte
    /// that had no effect on any operand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Prefixes: u16 {
        /// `lock` (0xF0).
        const LOCK = 1 << 0;
        /// `rep`/`repe` (0xF3) on a string operation.
        const REP = 1 << 1;
        /// `repne` (0xF2) on a string operation.
        const REPNE = 1 << 2;
        /// Operand-size byte with no effect on the operands.
        const DATA = 1 << 3;
        /// Address-size byte with no effect on the operands.
        const ADDR = 1 << 4;
        /// HLE `xacquire` (0xF2 with lock, or on `xchg` with memory).
        const XACQUIRE = 1 << 5;
        /// HLE `xrelease` (0xF3 with lock, or on `xchg` with memory).
        const XRELEASE = 1 << 6;
        /// Branch hint "taken" (0x3E).
        const JCC_TAKEN = 1 << 7;
        /// Branch hint "not taken" (0x2E).
        const JCC_NOT_TAKEN = 1 << 8;
        /// EVEX zeroing-masking.
        const EVEX_Z = 1 << 9;
        /// EVEX.b: broadcast (memory form) or rounding/SAE (register form).
        const EVEX_B = 1 << 10;
        /// Low bit of the EVEX embedded rounding mode.
        const EVEX_RC0 = 1 << 11;
        /// High bit of the EVEX embedded rounding mode.
        const EVEX_RC1 = 1 << 12;
    }
}

impl Prefixes {
    /// Embedded rounding control (0–3) from the two RC bits.
    #[inline]
    pub const fn rounding(self) -> u8 {
        (self.contains(Prefixes::EVEX_RC0) as u8) | ((self.contains(Prefixes::EVEX_RC1) as u8) << 1)
    }

    /// RC bits for rounding mode `rc` (0–3).
    #[inline]
    pub const fn from_rounding(rc: u8) -> Prefixes {
        let mut bits = 0;
        if rc & 1 != 0 {
            bits |= Prefixes::EVEX_RC0.bits();
        }
        if rc & 2 != 0 {
            bits |= Prefixes::EVEX_RC1.bits();
        }
        Prefixes::from_bits_retain(bits)
    }
}

/// Which encoding family the encoder should prefer when several fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodingHint {
    /// First matching template in table order.
    #[default]
    Default,
    /// Only EVEX templates.
    Evex,
}

/// Instruction predicate, computed from the opcode and prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Predicate {
    /// Executes (or branches) only if the condition holds.
    Cond(Condition),
    /// Conditional in a way a single condition code cannot express: a rep
    /// string loop or an opmask-controlled vector operation.
    Complex,
}

// ─── Raw bits ────────────────────────────────────────────────────────

/// What a position-dependent field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelKind {
    /// Relative branch displacement.
    Branch,
    /// Instruction-pointer-relative memory displacement.
    RipRel,
}

/// Location of the single field in an encoded instruction whose value
/// depends on where the instruction is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelField {
    /// Byte offset of the field from the instruction start.
    pub offset: u8,
    /// Field width in bytes (1, 2 or 4).
    pub width: u8,
    /// Field meaning.
    pub kind: RelKind,
}

/// The bytes an instruction was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawBits {
    /// Instruction bytes; only the first `len` are meaningful.
    pub bytes: [u8; 15],
    /// Length in bytes.
    pub len: u8,
    /// Position-dependent field, if any.
    pub rel: Option<RelField>,
    /// Address the bytes were decoded at.
    pub orig_pc: u64,
}

impl RawBits {
    /// Captures `bytes` (at most 15) decoded at `orig_pc`.
    pub fn new(bytes: &[u8], rel: Option<RelField>, orig_pc: u64) -> RawBits {
        let len = bytes.len().min(15);
        let mut buf = [0u8; 15];
        buf[..len].copy_from_slice(&bytes[..len]);
        RawBits {
            bytes: buf,
            len: len as u8,
            rel,
            orig_pc,
        }
    }

    /// The meaningful bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

// ─── Instruction ─────────────────────────────────────────────────────

/// A structured instruction.
///
/// # Examples
///
/// ```rust
/// use x86_codec::{Instruction, Opcode, Operand, Register};
///
/// // add rax, rcx: rax is written and read.
/// let add = Instruction::new(Opcode::Add)
///     .with_dst(Operand::Reg(Register::RAX))
///     .with_src(Operand::Reg(Register::RCX))
///     .with_src(Operand::Reg(Register::RAX));
/// assert_eq!(add.num_dsts(), 1);
/// assert_eq!(add.num_srcs(), 2);
/// assert!(!add.is_cti());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    opcode: Opcode,
    dsts: OperandList,
    srcs: OperandList,
    prefixes: Prefixes,
    hint: EncodingHint,
    raw: Option<RawBits>,
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode
            && self.dsts == other.dsts
            && self.srcs == other.srcs
            && self.prefixes == other.prefixes
    }
}

impl Instruction {
    /// An instruction with no operands.
    pub fn new(opcode: Opcode) -> Instruction {
        Instruction {
            opcode,
            dsts: OperandList::new(),
            srcs: OperandList::new(),
            prefixes: Prefixes::empty(),
            hint: EncodingHint::Default,
            raw: None,
        }
    }

    /// An instruction with the given operand lists.
    ///
    /// # Panics
    /// Panics if either list exceeds [`OperandList::MAX_LEN`].
    pub fn with_operands(opcode: Opcode, dsts: &[Operand], srcs: &[Operand]) -> Instruction {
        let mut i = Instruction::new(opcode);
        i.dsts = OperandList::from_slice(dsts);
        i.srcs = OperandList::from_slice(srcs);
        i
    }

    pub(crate) fn from_parts(
        opcode: Opcode,
        dsts: OperandList,
        srcs: OperandList,
        prefixes: Prefixes,
    ) -> Instruction {
        Instruction {
            opcode,
            dsts,
            srcs,
            prefixes,
            hint: EncodingHint::Default,
            raw: None,
        }
    }

    // ── builders ──

    /// Appends a destination.
    pub fn with_dst(mut self, op: Operand) -> Instruction {
        self.push_dst(op);
        self
    }

    /// Appends a source.
    pub fn with_src(mut self, op: Operand) -> Instruction {
        self.push_src(op);
        self
    }

    /// Adds prefix bits.
    pub fn with_prefixes(mut self, p: Prefixes) -> Instruction {
        self.add_prefixes(p);
        self
    }

    /// Sets the encoding hint.
    pub fn with_hint(mut self, hint: EncodingHint) -> Instruction {
        self.hint = hint;
        self
    }

    // ── accessors ──

    /// Operation.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Destination operands.
    #[inline]
    pub fn dsts(&self) -> &[Operand] {
        self.dsts.as_slice()
    }

    /// Source operands.
    #[inline]
    pub fn srcs(&self) -> &[Operand] {
        self.srcs.as_slice()
    }

    /// Destination `i`.
    #[inline]
    pub fn dst(&self, i: usize) -> Option<&Operand> {
        self.dsts.get(i)
    }

    /// Source `i`.
    #[inline]
    pub fn src(&self, i: usize) -> Option<&Operand> {
        self.srcs.get(i)
    }

    /// Number of destinations.
    #[inline]
    pub fn num_dsts(&self) -> usize {
        self.dsts.len()
    }

    /// Number of sources.
    #[inline]
    pub fn num_srcs(&self) -> usize {
        self.srcs.len()
    }

    /// Prefix bits.
    #[inline]
    pub fn prefixes(&self) -> Prefixes {
        self.prefixes
    }

    /// Encoding hint.
    #[inline]
    pub fn hint(&self) -> EncodingHint {
        self.hint
    }

    /// Cached bytes from decoding, if still valid.
    #[inline]
    pub fn raw(&self) -> Option<&RawBits> {
        self.raw.as_ref()
    }

    /// Encoded length, if the instruction was decoded and not modified.
    #[inline]
    pub fn length(&self) -> Option<usize> {
        self.raw.map(|r| r.len as usize)
    }

    pub(crate) fn set_raw(&mut self, raw: RawBits) {
        self.raw = Some(raw);
    }

    /// Drops the cached bytes so the next encode selects a template afresh.
    pub fn clear_raw(&mut self) {
        self.raw = None;
    }

    // ── mutation (invalidates raw bits) ──

    /// Replaces the opcode.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.opcode = opcode;
        self.raw = None;
    }

    /// Replaces destination `i`. Returns `false` if `i` is out of range.
    pub fn set_dst(&mut self, i: usize, op: Operand) -> bool {
        self.raw = None;
        match self.dsts.get_mut(i) {
            Some(slot) => {
                *slot = op;
                true
            }
            None => false,
        }
    }

    /// Replaces source `i`. Returns `false` if `i` is out of range.
    pub fn set_src(&mut self, i: usize, op: Operand) -> bool {
        self.raw = None;
        match self.srcs.get_mut(i) {
            Some(slot) => {
                *slot = op;
                true
            }
            None => false,
        }
    }

    /// Appends a destination.
    ///
    /// # Panics
    /// Panics if the destination list is full.
    pub fn push_dst(&mut self, op: Operand) {
        self.raw = None;
        self.dsts.push(op);
    }

    /// Appends a source.
    ///
    /// # Panics
    /// Panics if the source list is full.
    pub fn push_src(&mut self, op: Operand) {
        self.raw = None;
        self.srcs.push(op);
    }

    /// Replaces the prefix bits.
    pub fn set_prefixes(&mut self, p: Prefixes) {
        self.prefixes = p;
        self.raw = None;
    }

    /// Adds prefix bits.
    pub fn add_prefixes(&mut self, p: Prefixes) {
        self.prefixes |= p;
        self.raw = None;
    }

    /// Sets the encoding hint. The hint does not change semantics, so the
    /// cached bytes stay valid.
    pub fn set_hint(&mut self, hint: EncodingHint) {
        self.hint = hint;
    }

    // ── derived properties ──

    /// Arithmetic flags read and written.
    #[inline]
    pub fn eflags(&self) -> EFlags {
        self.opcode.eflags()
    }

    /// The AVX-512 write mask, when the instruction has one.
    ///
    /// Masked vector operations carry their opmask as the first source.
    /// Opmask-register instructions (`kmov`, `kand`...) have none.
    pub fn evex_mask(&self) -> Option<Register> {
        if self.opcode.is_mask_op() {
            return None;
        }
        match self.srcs.first() {
            Some(Operand::Reg(r)) if r.is_mask() => Some(*r),
            _ => None,
        }
    }

    /// Predicate, if the instruction is conditional.
    pub fn predicate(&self) -> Option<Predicate> {
        if let Some(cc) = self.opcode.condition() {
            return Some(Predicate::Cond(cc));
        }
        if self.is_rep_string_op() {
            return Some(Predicate::Complex);
        }
        match self.evex_mask() {
            Some(k) if k != Register::K0 => Some(Predicate::Complex),
            _ => None,
        }
    }

    // ── classification ──

    /// Conditional branch (`jcc`, `loop*`, `jecxz`).
    pub fn is_cbr(&self) -> bool {
        use Opcode::*;
        (self.opcode >= Jo && self.opcode <= JnleShort)
            || matches!(self.opcode, Loop | Loope | Loopne | Jecxz)
    }

    /// Direct unconditional near jump.
    pub fn is_ubr(&self) -> bool {
        matches!(self.opcode, Opcode::Jmp | Opcode::JmpShort)
    }

    /// Any call.
    pub fn is_call(&self) -> bool {
        use Opcode::*;
        matches!(self.opcode, Call | CallInd | CallFar | CallFarInd)
    }

    /// Direct near call.
    pub fn is_call_direct(&self) -> bool {
        self.opcode == Opcode::Call
    }

    /// Indirect call, near or far.
    pub fn is_call_indirect(&self) -> bool {
        matches!(self.opcode, Opcode::CallInd | Opcode::CallFarInd)
    }

    /// Indirect jump, near or far.
    pub fn is_jump_indirect(&self) -> bool {
        matches!(self.opcode, Opcode::JmpInd | Opcode::JmpFarInd)
    }

    /// Return of any kind.
    pub fn is_return(&self) -> bool {
        matches!(self.opcode, Opcode::Ret | Opcode::RetFar | Opcode::Iret)
    }

    /// Multi-way branch: target known only at run time.
    pub fn is_mbr(&self) -> bool {
        self.is_jump_indirect() || self.is_call_indirect() || self.is_return()
    }

    /// Control transfer of any kind (interrupts and system calls excluded).
    pub fn is_cti(&self) -> bool {
        self.is_cbr() || self.is_ubr() || self.is_call() || self.is_mbr() || self.opcode == Opcode::JmpFar
    }

    /// Branch with an 8-bit displacement.
    pub fn is_cti_short(&self) -> bool {
        use Opcode::*;
        (self.opcode >= JoShort && self.opcode <= JnleShort)
            || matches!(self.opcode, JmpShort | Loop | Loope | Loopne | Jecxz)
    }

    /// `loop`, `loope`, `loopne` or `jecxz`.
    pub fn is_cti_loop(&self) -> bool {
        use Opcode::*;
        matches!(self.opcode, Loop | Loope | Loopne | Jecxz)
    }

    /// Software interrupt.
    pub fn is_interrupt(&self) -> bool {
        use Opcode::*;
        matches!(self.opcode, Int | Int1 | Int3 | Into)
    }

    /// Fast system call or the matching return.
    pub fn is_syscall(&self) -> bool {
        use Opcode::*;
        matches!(self.opcode, Syscall | Sysret | Sysenter | Sysexit)
    }

    /// Far (segment-changing) transfer.
    pub fn is_far_cti(&self) -> bool {
        use Opcode::*;
        matches!(self.opcode, JmpFar | JmpFarInd | CallFar | CallFarInd | RetFar)
    }

    /// Software prefetch.
    pub fn is_prefetch(&self) -> bool {
        use Opcode::*;
        matches!(
            self.opcode,
            Prefetchnta | Prefetcht0 | Prefetcht1 | Prefetcht2 | Prefetch | Prefetchw
        )
    }

    /// String operation.
    #[inline]
    pub fn is_string_op(&self) -> bool {
        self.opcode.is_string_op()
    }

    /// String operation repeated by `rep`/`repne`.
    pub fn is_rep_string_op(&self) -> bool {
        self.is_string_op() && self.prefixes.intersects(Prefixes::REP | Prefixes::REPNE)
    }

    /// Whether any source accesses memory. `lea` and hint `nop` only
    /// compute an address.
    pub fn reads_memory(&self) -> bool {
        !matches!(self.opcode, Opcode::Lea | Opcode::NopModrm)
            && self.srcs.iter().any(Operand::is_memory_reference)
    }

    /// Whether any destination is memory.
    pub fn writes_memory(&self) -> bool {
        self.dsts.iter().any(Operand::is_memory_reference)
    }

    /// Whether the instruction touches `reg` (width-insensitive), either as
    /// an operand or in an address.
    pub fn uses_register(&self, reg: Register) -> bool {
        self.dsts.iter().chain(self.srcs.iter()).any(|op| op.uses_register(reg))
    }

    // ── addresses ──

    /// Distinct memory operands, sources first. A read-modify-write memory
    /// operand is reported once, as a write.
    pub fn memory_operands(&self) -> impl Iterator<Item = (&Operand, bool)> + '_ {
        let srcs = self
            .srcs
            .iter()
            .filter(|op| op.is_memory_reference())
            .filter(move |op| !self.dsts.iter().any(|d| d.same_address(op)))
            .map(|op| (op, false));
        let dsts = self
            .dsts
            .iter()
            .filter(|op| op.is_memory_reference())
            .map(|op| (op, true));
        srcs.chain(dsts)
    }

    /// Effective address of the `index`-th distinct memory operand (see
    /// [`Instruction::memory_operands`]) and whether it is written.
    ///
    /// `next_pc` is the address of the following instruction. A VSIB
    /// reference reports lane 0; use [`MemRef::compute_address_lane`] for
    /// the others.
    pub fn compute_address(
        &self,
        index: usize,
        values: &dyn RegisterValues,
        mode: Mode,
        next_pc: u64,
    ) -> Option<(u64, bool)> {
        let (op, write) = self.memory_operands().nth(index)?;
        let elem = self.opcode.vsib_index_size();
        let addr = match op {
            Operand::Mem(m) if m.is_vsib() => m.compute_address_lane(values, mode, 0, elem),
            _ => op.compute_address(values, mode, next_pc)?,
        };
        Some((addr, write))
    }

    /// Absolute target of the instruction-pointer-relative operand, if any.
    pub fn rip_rel_target(&self, next_pc: u64) -> Option<u64> {
        self.dsts
            .iter()
            .chain(self.srcs.iter())
            .find_map(|op| match op {
                Operand::RipRel { disp, .. } => Some(next_pc.wrapping_add(i64::from(*disp) as u64)),
                Operand::RelAddr { target, .. } => Some(*target),
                _ => None,
            })
    }

    /// The branch target operand of a direct branch or call.
    pub fn branch_target(&self) -> Option<&Operand> {
        let direct = self.is_cbr()
            || self.is_ubr()
            || matches!(self.opcode, Opcode::Call | Opcode::JmpFar | Opcode::CallFar);
        if !direct {
            return None;
        }
        self.srcs.iter().find(|op| {
            matches!(
                op,
                Operand::Pc(_) | Operand::FarPc { .. } | Operand::Instr(_) | Operand::FarInstr { .. }
            )
        })
    }

    /// First memory operand as a base/displacement reference.
    pub fn first_mem_ref(&self) -> Option<&MemRef> {
        self.dsts
            .iter()
            .chain(self.srcs.iter())
            .find_map(Operand::mem_ref)
    }
}

// ─── Common constructors ─────────────────────────────────────────────

impl Instruction {
    fn stack_pointer(mode: Mode) -> Register {
        match mode {
            Mode::X64 => Register::RSP,
            Mode::X86 => Register::ESP,
        }
    }

    fn stack_slot(mode: Mode, disp: i32, size: u16) -> Operand {
        Operand::Mem(MemRef {
            base: Some(Self::stack_pointer(mode)),
            ..MemRef::absolute(disp, size)
        })
    }

    /// Near `jmp` with a 32-bit displacement.
    pub fn jmp(target: Operand) -> Instruction {
        Instruction::new(Opcode::Jmp).with_src(target)
    }

    /// Near `jmp` with an 8-bit displacement.
    pub fn jmp_short(target: Operand) -> Instruction {
        Instruction::new(Opcode::JmpShort).with_src(target)
    }

    /// Conditional branch with a 32-bit displacement.
    pub fn jcc(cc: Condition, target: Operand) -> Instruction {
        Instruction::new(Opcode::jcc(cc)).with_src(target)
    }

    /// Conditional branch with an 8-bit displacement.
    pub fn jcc_short(cc: Condition, target: Operand) -> Instruction {
        Instruction::new(Opcode::jcc_short(cc)).with_src(target)
    }

    /// Direct near `call`.
    pub fn call(mode: Mode, target: Operand) -> Instruction {
        let sp = Operand::Reg(Self::stack_pointer(mode));
        let slot = mode.addr_bytes();
        Instruction::with_operands(
            Opcode::Call,
            &[sp, Self::stack_slot(mode, -i32::from(slot), slot)],
            &[target, sp],
        )
    }

    /// Near `ret`.
    pub fn ret(mode: Mode) -> Instruction {
        let sp = Operand::Reg(Self::stack_pointer(mode));
        let slot = mode.addr_bytes();
        Instruction::with_operands(Opcode::Ret, &[sp], &[sp, Self::stack_slot(mode, 0, slot)])
    }

    /// `push` of a full-width general-purpose register.
    pub fn push(mode: Mode, reg: Register) -> Instruction {
        let sp = Operand::Reg(Self::stack_pointer(mode));
        let size = reg.size();
        Instruction::with_operands(
            Opcode::Push,
            &[sp, Self::stack_slot(mode, -i32::from(size), size)],
            &[Operand::Reg(reg), sp],
        )
    }

    /// `pop` into a full-width general-purpose register.
    pub fn pop(mode: Mode, reg: Register) -> Instruction {
        let sp = Operand::Reg(Self::stack_pointer(mode));
        Instruction::with_operands(
            Opcode::Pop,
            &[Operand::Reg(reg), sp],
            &[sp, Self::stack_slot(mode, 0, reg.size())],
        )
    }

    /// Two-operand read-modify-write arithmetic (`add dst, src` and
    /// friends): `dst` is both written and read.
    pub fn binary(opcode: Opcode, dst: Operand, src: Operand) -> Instruction {
        Instruction::with_operands(opcode, &[dst], &[src, dst])
    }

    /// `mov dst, src`.
    pub fn mov(dst: Operand, src: Operand) -> Instruction {
        Instruction::with_operands(Opcode::Mov, &[dst], &[src])
    }

    /// One-byte `nop`.
    pub fn nop() -> Instruction {
        Instruction::new(Opcode::Nop)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefixes.contains(Prefixes::LOCK) {
            f.write_str("lock ")?;
        }
        if self.is_rep_string_op() {
            f.write_str(if self.prefixes.contains(Prefixes::REPNE) {
                "repne "
            } else {
                "rep "
            })?;
        }
        f.write_str(self.opcode.name())?;
        for (i, op) in self.srcs.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{}", op)?;
        }
        if !self.dsts.is_empty() {
            f.write_str(" ->")?;
            for (i, op) in self.dsts.iter().enumerate() {
                f.write_str(if i == 0 { " " } else { ", " })?;
                write!(f, "{}", op)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(r: Register) -> Operand {
        Operand::Reg(r)
    }

    #[test]
    fn operand_list_push_and_compare() {
        let mut l = OperandList::new();
        assert!(l.is_empty());
        l.push(reg(Register::RAX));
        l.push(Operand::imm8(1));
        assert_eq!(l.len(), 2);
        assert_eq!(l, alloc::vec![reg(Register::RAX), Operand::imm8(1)]);
        for _ in 0..6 {
            assert!(l.try_push(Operand::imm8(0)));
        }
        assert!(!l.try_push(Operand::imm8(0)));
    }

    #[test]
    #[should_panic(expected = "OperandList overflow")]
    fn operand_list_overflow_panics() {
        let mut l = OperandList::new();
        for _ in 0..9 {
            l.push(Operand::imm8(0));
        }
    }

    #[test]
    fn equality_ignores_hint_and_raw() {
        let a = Instruction::binary(Opcode::Add, reg(Register::RAX), reg(Register::RCX));
        let mut b = a.clone().with_hint(EncodingHint::Evex);
        b.set_raw(RawBits::new(&[0x48, 0x01, 0xc8], None, 0x1000));
        assert_eq!(a, b);
        let c = a.clone().with_prefixes(Prefixes::LOCK);
        assert_ne!(a, c);
    }

    #[test]
    fn mutation_clears_raw_bits() {
        let mut i = Instruction::mov(reg(Register::EAX), reg(Register::ECX));
        i.set_raw(RawBits::new(&[0x89, 0xc8], None, 0));
        assert_eq!(i.length(), Some(2));
        i.set_hint(EncodingHint::Evex);
        assert!(i.raw().is_some());
        assert!(i.set_src(0, reg(Register::EDX)));
        assert!(i.raw().is_none());
        assert!(!i.set_dst(3, reg(Register::EDX)));
    }

    #[test]
    fn branch_classification() {
        let j = Instruction::jmp(Operand::Pc(0x1000));
        assert!(j.is_ubr() && j.is_cti() && !j.is_cbr() && !j.is_cti_short());
        let js = Instruction::jcc_short(Condition::Z, Operand::Pc(0));
        assert!(js.is_cbr() && js.is_cti_short());
        assert_eq!(js.predicate(), Some(Predicate::Cond(Condition::Z)));
        let c = Instruction::call(Mode::X64, Operand::Pc(0));
        assert!(c.is_call() && c.is_call_direct() && !c.is_mbr());
        assert!(c.writes_memory());
        let r = Instruction::ret(Mode::X64);
        assert!(r.is_return() && r.is_mbr() && r.reads_memory());
        assert_eq!(c.branch_target(), Some(&Operand::Pc(0)));
        assert!(r.branch_target().is_none());
        assert!(Instruction::new(Opcode::Loop).is_cti_loop());
        assert!(Instruction::new(Opcode::Int3).is_interrupt());
        assert!(Instruction::new(Opcode::Syscall).is_syscall());
        assert!(Instruction::new(Opcode::RetFar).is_far_cti());
        assert!(Instruction::new(Opcode::Prefetchw).is_prefetch());
    }

    #[test]
    fn predicates() {
        let movs = Instruction::new(Opcode::Movs);
        assert_eq!(movs.predicate(), None);
        let rep = movs.clone().with_prefixes(Prefixes::REP);
        assert!(rep.is_rep_string_op());
        assert_eq!(rep.predicate(), Some(Predicate::Complex));

        let masked = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::zmm(0))],
            &[reg(Register::K1), reg(Register::zmm(1)), reg(Register::zmm(2))],
        );
        assert_eq!(masked.evex_mask(), Some(Register::K1));
        assert_eq!(masked.predicate(), Some(Predicate::Complex));
        let unmasked = Instruction::with_operands(
            Opcode::Vaddps,
            &[reg(Register::zmm(0))],
            &[reg(Register::K0), reg(Register::zmm(1)), reg(Register::zmm(2))],
        );
        assert_eq!(unmasked.predicate(), None);
        let kand = Instruction::with_operands(
            Opcode::Kandw,
            &[reg(Register::K1)],
            &[reg(Register::K2), reg(Register::K3)],
        );
        assert_eq!(kand.evex_mask(), None);
    }

    #[test]
    fn memory_operands_dedup_rmw() {
        let m = Operand::base_disp(Register::RBX, 8, 8).unwrap();
        let add = Instruction::binary(Opcode::Add, m, reg(Register::RAX));
        let ops: Vec<_> = add.memory_operands().collect();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].1);
        assert!(add.reads_memory() && add.writes_memory());

        let lea = Instruction::with_operands(Opcode::Lea, &[reg(Register::RAX)], &[m.with_size(0)]);
        assert!(!lea.reads_memory());
    }

    struct Regs;

    impl RegisterValues for Regs {
        fn gpr(&self, num: u8) -> u64 {
            u64::from(num) * 0x100
        }
    }

    #[test]
    fn effective_addresses() {
        let m = Operand::base_disp(Register::RBX, 8, 8).unwrap();
        let load = Instruction::mov(reg(Register::RAX), m);
        assert_eq!(load.compute_address(0, &Regs, Mode::X64, 0), Some((0x308, false)));
        assert_eq!(load.compute_address(1, &Regs, Mode::X64, 0), None);

        let rip = Instruction::mov(reg(Register::RAX), Operand::rip_rel(0x10, 8));
        assert_eq!(rip.rip_rel_target(0x1000), Some(0x1010));
        assert_eq!(rip.compute_address(0, &Regs, Mode::X64, 0x1000), Some((0x1010, false)));
    }

    #[test]
    fn stack_helpers_list_implicit_operands() {
        let p = Instruction::push(Mode::X64, Register::RBX);
        assert_eq!(p.dsts()[0], reg(Register::RSP));
        let slot = p.dsts()[1].mem_ref().copied().unwrap();
        assert_eq!((slot.base, slot.disp, slot.size), (Some(Register::RSP), -8, 8));
        assert_eq!(p.srcs(), &[reg(Register::RBX), reg(Register::RSP)]);
        let p32 = Instruction::pop(Mode::X86, Register::EBX);
        assert_eq!(p32.srcs()[1].mem_ref().map(|m| m.size), Some(4));
    }

    #[test]
    fn rounding_bits() {
        for rc in 0..4 {
            assert_eq!(Prefixes::from_rounding(rc).rounding(), rc);
        }
    }
}
