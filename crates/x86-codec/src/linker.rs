//! Final placement: fixup resolution, block layout, and relocation of
//! already-encoded instructions.
//!
//! Encoding leaves at most one position-dependent field per instruction,
//! described by a [`Fixup`]. [`Block`] lays a sequence of instructions out
//! from a base address and resolves every fixup in a second pass, once all
//! instruction addresses are known. Field widths are chosen by the
//! template, so layout never changes during resolution: a target that does
//! not fit is reported as [`EncodeError::Unreachable`], never widened.
//!
//! A decoded instruction still holding its raw bytes is copied instead of
//! re-encoded; only its recorded relative field is recomputed for the new
//! address ([`copy_and_re_relativize`]).

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::encoder::{encode_instruction, EncodedInstr, Fixup, FixupKind, FixupTarget};
use crate::error::EncodeError;
use crate::fast;
use crate::instr::{Instruction, RawBits, RelField, RelKind};
use crate::mode::{Context, Mode};

// ─── Fixup values ────────────────────────────────────────────────────

fn unreachable(disp: i64, max: i64) -> EncodeError {
    EncodeError::Unreachable { disp, max }
}

/// Value of a `kind` field in an instruction ending at `end`.
fn fixup_value(kind: FixupKind, mode: Mode, end: u64, target: u64) -> Result<u64, EncodeError> {
    let delta = target.wrapping_sub(end);
    let rel = if mode.is_64() {
        delta as i64
    } else {
        i64::from(delta as u32 as i32)
    };
    let signed = |max: i64| {
        if (-max - 1..=max).contains(&rel) {
            Ok(rel as u64)
        } else {
            Err(unreachable(rel, max))
        }
    };
    let absolute = |max: u64| {
        if target <= max {
            Ok(target)
        } else {
            Err(unreachable(target as i64, max as i64))
        }
    };
    match kind {
        FixupKind::Rel8 => signed(i64::from(i8::MAX)),
        // The processor truncates a 16-bit branch target, so any
        // displacement reaches any 16-bit address.
        FixupKind::Rel16 if target > 0xffff => Err(unreachable(rel, i64::from(i16::MAX))),
        FixupKind::Rel16 => Ok(delta & 0xffff),
        FixupKind::Rel32 if !mode.is_64() => {
            if target > u64::from(u32::MAX) {
                Err(unreachable(rel, i64::from(i32::MAX)))
            } else {
                Ok(rel as u64)
            }
        }
        FixupKind::Rel32 | FixupKind::RipRel32 => signed(i64::from(i32::MAX)),
        FixupKind::Abs16 => absolute(0xffff),
        FixupKind::Abs32 => absolute(u64::from(u32::MAX)),
        FixupKind::Abs64 => Ok(target),
    }
}

/// Writes the value of `fixup` for an instruction occupying `bytes` at
/// `pc` whose field refers to `target`.
pub fn apply_fixup(bytes: &mut [u8], fixup: &Fixup, mode: Mode, pc: u64, target: u64) -> Result<(), EncodeError> {
    let end = pc.wrapping_add(bytes.len() as u64);
    let value = fixup_value(fixup.kind, mode, end, target)?;
    let at = usize::from(fixup.offset);
    let width = fixup.kind.width();
    let available = bytes.len();
    let field = bytes
        .get_mut(at..at + width)
        .ok_or(EncodeError::BufferTooSmall {
            needed: at + width,
            available,
        })?;
    field.copy_from_slice(&value.to_le_bytes()[..width]);
    log::trace!("fixup {:?} at {:#x}+{} -> {:#x}", fixup.kind, pc, at, target);
    Ok(())
}

// ─── Copy and re-relativize ──────────────────────────────────────────

fn read_signed(field: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf[..field.len()].copy_from_slice(field);
    let raw = i64::from_le_bytes(buf);
    let shift = 64 - 8 * field.len() as u32;
    (raw << shift) >> shift
}

fn relocate(
    bytes: &[u8],
    rel: Option<RelField>,
    ctx: Context,
    orig_pc: u64,
    new_pc: u64,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let n = bytes.len();
    let available = out.len();
    let out = out
        .get_mut(..n)
        .ok_or(EncodeError::BufferTooSmall { needed: n, available })?;
    out.copy_from_slice(bytes);
    let Some(field) = rel else { return Ok(n) };

    let kind = match (field.kind, field.width) {
        (RelKind::Branch, 1) => FixupKind::Rel8,
        (RelKind::Branch, 2) => FixupKind::Rel16,
        (RelKind::Branch, 4) => FixupKind::Rel32,
        (RelKind::RipRel, 4) => FixupKind::RipRel32,
        _ => {
            return Err(EncodeError::InvalidOperand {
                detail: format!("{}-byte {:?} field cannot be relocated", field.width, field.kind),
            })
        }
    };
    let at = usize::from(field.offset);
    let disp = bytes
        .get(at..at + usize::from(field.width))
        .map(read_signed)
        .ok_or_else(|| EncodeError::InvalidOperand {
            detail: format!("relative field at {} lies outside the {}-byte instruction", at, n),
        })?;
    let mut target = orig_pc.wrapping_add(n as u64).wrapping_add(disp as u64);
    if kind == FixupKind::Rel16 {
        target &= 0xffff;
    }
    if !ctx.mode.is_64() {
        target &= 0xffff_ffff;
    }
    let fixup = Fixup {
        offset: field.offset,
        kind,
        target: FixupTarget::Addr(target),
    };
    apply_fixup(out, &fixup, ctx.mode, new_pc, target)?;
    Ok(n)
}

/// Copies the single instruction at the start of `bytes`, encoded for
/// `orig_pc`, into `out` so that it behaves the same at `new_pc`.
///
/// Only the relative field is rewritten. If the new displacement does not
/// fit the field's width the copy fails with
/// [`EncodeError::Unreachable`]. Returns the number of bytes written.
pub fn copy_and_re_relativize(
    bytes: &[u8],
    ctx: Context,
    orig_pc: u64,
    new_pc: u64,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let (len, rel) = fast::length_with_rel(bytes, ctx).map_err(|e| EncodeError::InvalidOperand {
        detail: format!("cannot size instruction: {}", e),
    })?;
    relocate(&bytes[..len], rel, ctx, orig_pc, new_pc, out)
}

/// Re-emits the bytes an instruction was decoded from, at `pc`.
pub(crate) fn copy_raw(raw: &RawBits, ctx: Context, pc: u64, out: &mut [u8]) -> Result<usize, EncodeError> {
    relocate(raw.as_slice(), raw.rel, ctx, raw.orig_pc, pc, out)
}

// ─── Block ───────────────────────────────────────────────────────────

/// A fixup as written into the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedFixup {
    /// Index of the instruction holding the field.
    pub instr: usize,
    /// Address of the field.
    pub at: u64,
    /// Field kind.
    pub kind: FixupKind,
    /// Resolved target address.
    pub target: u64,
}

/// The output of [`Block::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linked {
    /// Machine code for the whole block.
    pub bytes: Vec<u8>,
    /// Start address of every instruction, in order.
    pub addresses: Vec<u64>,
    /// Address just past the last instruction.
    pub end: u64,
    /// Every resolved fixup, in instruction order.
    pub fixups: Vec<AppliedFixup>,
}

impl Linked {
    /// Address of instruction `index`; the block length names the end.
    pub fn address_of(&self, index: usize) -> Option<u64> {
        match self.addresses.get(index) {
            Some(&a) => Some(a),
            None if index == self.addresses.len() => Some(self.end),
            None => None,
        }
    }
}

/// Instructions laid out back to back.
///
/// [`Operand::Instr`](crate::Operand::Instr),
/// [`Operand::FarInstr`](crate::Operand::FarInstr) and
/// [`Operand::MemInstr`](crate::Operand::MemInstr) refer to other
/// instructions of the block by index. An index equal to the block length
/// names the address just past the last instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    instrs: Vec<Instruction>,
}

/// One instruction's bytes before placement.
enum Staged {
    Encoded(EncodedInstr),
    Raw(RawBits),
}

impl Staged {
    fn len(&self) -> usize {
        match self {
            Staged::Encoded(e) => e.len(),
            Staged::Raw(r) => usize::from(r.len),
        }
    }
}

impl Block {
    /// Empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `insn`, returning its index.
    pub fn push(&mut self, insn: Instruction) -> usize {
        self.instrs.push(insn);
        self.instrs.len() - 1
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether the block holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// The instructions, in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instrs
    }

    /// Instruction `index`.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instrs.get(index)
    }

    /// Mutable access to instruction `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instrs.get_mut(index)
    }

    /// Encodes the block at `base`.
    ///
    /// The first pass encodes every instruction and fixes its address; the
    /// second writes the bytes and resolves fixups against those addresses.
    pub fn encode(&self, ctx: Context, base: u64) -> Result<Linked, EncodeError> {
        let mut staged = Vec::with_capacity(self.instrs.len());
        let mut addresses = Vec::with_capacity(self.instrs.len() + 1);
        let mut pc = base;
        for insn in &self.instrs {
            let s = match insn.raw() {
                Some(raw) => Staged::Raw(*raw),
                None => Staged::Encoded(encode_instruction(insn, ctx)?),
            };
            addresses.push(pc);
            pc = pc.wrapping_add(s.len() as u64);
            staged.push(s);
        }
        addresses.push(pc);
        let total = pc.wrapping_sub(base) as usize;
        log::debug!("block of {} instructions: {} bytes at {:#x}", staged.len(), total, base);

        let mut bytes = vec![0u8; total];
        let mut fixups = Vec::new();
        let mut at = 0usize;
        for (i, s) in staged.iter().enumerate() {
            let n = s.len();
            let out = &mut bytes[at..at + n];
            let pc = addresses[i];
            match s {
                Staged::Raw(raw) => {
                    copy_raw(raw, ctx, pc, out)?;
                }
                Staged::Encoded(e) => {
                    out.copy_from_slice(&e.bytes);
                    if let Some(fixup) = e.fixup {
                        let target = match fixup.target {
                            FixupTarget::Addr(a) => a,
                            FixupTarget::Instr { index, disp } => addresses
                                .get(index)
                                .ok_or(EncodeError::UnresolvedTarget { index })?
                                .wrapping_add(disp as i64 as u64),
                        };
                        apply_fixup(out, &fixup, ctx.mode, pc, target)?;
                        fixups.push(AppliedFixup {
                            instr: i,
                            at: pc.wrapping_add(u64::from(fixup.offset)),
                            kind: fixup.kind,
                            target,
                        });
                    }
                }
            }
            at += n;
        }
        addresses.pop();
        Ok(Linked {
            bytes,
            addresses,
            end: pc,
            fixups,
        })
    }
}

impl From<Vec<Instruction>> for Block {
    fn from(instrs: Vec<Instruction>) -> Self {
        Block { instrs }
    }
}

impl FromIterator<Instruction> for Block {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Block {
            instrs: iter.into_iter().collect(),
        }
    }
}

impl Extend<Instruction> for Block {
    fn extend<I: IntoIterator<Item = Instruction>>(&mut self, iter: I) {
        self.instrs.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::opcode::Condition;
    use crate::operand::Operand;
    use crate::register::Register;

    fn relocated(bytes: &[u8], ctx: Context, from: u64, to: u64) -> Result<Vec<u8>, EncodeError> {
        let mut out = [0u8; 15];
        let n = copy_and_re_relativize(bytes, ctx, from, to, &mut out)?;
        Ok(out[..n].to_vec())
    }

    #[test]
    fn short_branch_moves_within_range() {
        let moved = relocated(&[0xeb, 0x10], Context::x64(), 0x1000, 0x1008).unwrap();
        assert_eq!(moved, [0xeb, 0x08]);
    }

    #[test]
    fn short_branch_moved_too_far_fails() {
        let err = relocated(&[0xeb, 0x10], Context::x64(), 0x1000, 0x2000).unwrap_err();
        assert!(matches!(err, EncodeError::Unreachable { max: 127, .. }));
    }

    #[test]
    fn near_call_keeps_its_target() {
        // call 0x1105 from 0x1000, moved to 0x5000.
        let moved = relocated(&[0xe8, 0x00, 0x01, 0x00, 0x00], Context::x64(), 0x1000, 0x5000).unwrap();
        let disp = i32::from_le_bytes([moved[1], moved[2], moved[3], moved[4]]);
        assert_eq!(0x5005 + i64::from(disp), 0x1105);
    }

    #[test]
    fn rip_relative_load_keeps_its_target() {
        let moved = relocated(
            &[0x48, 0x8b, 0x05, 0x10, 0x00, 0x00, 0x00],
            Context::x64(),
            0x1000,
            0x2000,
        )
        .unwrap();
        assert_eq!(moved, [0x48, 0x8b, 0x05, 0x10, 0xf0, 0xff, 0xff]);
    }

    #[test]
    fn position_independent_bytes_copy_verbatim() {
        let moved = relocated(&[0x48, 0x89, 0xc8, 0xcc], Context::x64(), 0x1000, 0x9000).unwrap();
        assert_eq!(moved, [0x48, 0x89, 0xc8]);
    }

    #[test]
    fn rel32_wraps_in_32_bit_mode() {
        let fixup = Fixup {
            offset: 1,
            kind: FixupKind::Rel32,
            target: FixupTarget::Addr(0x10),
        };
        let mut bytes = [0xe9, 0, 0, 0, 0];
        apply_fixup(&mut bytes, &fixup, Mode::X86, 0xffff_fff0, 0x10).unwrap();
        assert_eq!(bytes, [0xe9, 0x1b, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn absolute_field_checks_width() {
        let fixup = Fixup {
            offset: 0,
            kind: FixupKind::Abs32,
            target: FixupTarget::Addr(0x1_0000_0000),
        };
        let mut bytes = [0u8; 4];
        assert!(matches!(
            apply_fixup(&mut bytes, &fixup, Mode::X64, 0, 0x1_0000_0000),
            Err(EncodeError::Unreachable { .. })
        ));
    }

    #[test]
    fn forward_branch_to_a_later_instruction() {
        let block: Block = vec![Instruction::jmp(Operand::Instr(2)), Instruction::nop(), Instruction::nop()].into();
        let linked = block.encode(Context::x64(), 0x1000).unwrap();
        assert_eq!(linked.bytes, [0xe9, 0x01, 0x00, 0x00, 0x00, 0x90, 0x90]);
        assert_eq!(linked.addresses, [0x1000, 0x1005, 0x1006]);
        assert_eq!(
            linked.fixups,
            [AppliedFixup {
                instr: 0,
                at: 0x1001,
                kind: FixupKind::Rel32,
                target: 0x1006,
            }]
        );
    }

    #[test]
    fn backward_short_branch() {
        let mut block = Block::new();
        let top = block.push(Instruction::nop());
        block.push(Instruction::jcc_short(Condition::NZ, Operand::Instr(top)));
        let linked = block.encode(Context::x64(), 0x1000).unwrap();
        assert_eq!(linked.bytes, [0x90, 0x75, 0xfd]);
    }

    #[test]
    fn branch_to_the_end_of_the_block() {
        let block: Block = vec![Instruction::jmp_short(Operand::Instr(1))].into();
        let linked = block.encode(Context::x64(), 0).unwrap();
        assert_eq!(linked.bytes, [0xeb, 0x00]);
        assert_eq!(linked.address_of(1), Some(2));
    }

    #[test]
    fn rip_relative_reference_to_an_instruction() {
        let lea = Instruction::with_operands(
            crate::opcode::Opcode::Lea,
            &[Operand::Reg(Register::RAX)],
            &[Operand::MemInstr {
                index: 1,
                disp: 0,
                size: 0,
            }],
        );
        let block: Block = vec![lea, Instruction::nop()].into();
        let linked = block.encode(Context::x64(), 0x1000).unwrap();
        assert_eq!(linked.bytes, [0x48, 0x8d, 0x05, 0x00, 0x00, 0x00, 0x00, 0x90]);
        assert_eq!(linked.fixups[0].kind, FixupKind::RipRel32);
    }

    #[test]
    fn dangling_instruction_index() {
        let block: Block = vec![Instruction::jmp(Operand::Instr(7))].into();
        assert_eq!(
            block.encode(Context::x64(), 0),
            Err(EncodeError::UnresolvedTarget { index: 7 })
        );
    }

    #[test]
    fn decoded_instruction_is_copied_into_place() {
        let (jmp, _) = decode(&[0xe9, 0x00, 0x10, 0x00, 0x00], Context::x64(), 0x1000).unwrap();
        let block: Block = vec![Instruction::nop(), jmp].into();
        let linked = block.encode(Context::x64(), 0x4000).unwrap();
        // Original target 0x2005; the copy ends at 0x4006.
        let d = &linked.bytes[2..6];
        let disp = i32::from_le_bytes([d[0], d[1], d[2], d[3]]);
        assert_eq!(0x4006 + i64::from(disp), 0x2005);
        assert!(linked.fixups.is_empty());
    }
}
