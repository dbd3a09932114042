//! # x86-codec — table-driven x86 / x86-64 instruction codec
//!
//! `x86-codec` decodes machine code into structured [`Instruction`]s and
//! encodes them back, for 32-bit and 64-bit code, covering the legacy,
//! VEX, EVEX, XOP and 3DNow! encoding spaces.
//!
//! ## Quick Start
//!
//! ```rust
//! use x86_codec::{decode, encode_to_vec, Context, Opcode};
//!
//! let ctx = Context::x64();
//! let (mut insn, len) = decode(&[0x48, 0x89, 0xc8], ctx, 0x1000).unwrap();
//! assert_eq!((insn.opcode(), len), (Opcode::Mov, 3));
//!
//! insn.clear_raw();
//! assert_eq!(encode_to_vec(&insn, ctx, 0x1000).unwrap(), [0x48, 0x89, 0xc8]);
//! ```
//!
//! ## Features
//!
//! - **Full decoder**: prefixes, opcode maps, ModR/M, SIB, compressed
//!   displacement and every operand materialized ([`decode`]).
//! - **Fast decoder**: length, relative-field position, EFLAGS usage and
//!   control-transfer shape without building operands ([`fast`]).
//! - **Encoder**: template search with typed fixups ([`encode`]).
//! - **Linker**: block layout, instruction-relative targets, and
//!   copy-and-re-relativize for already-encoded bytes ([`linker`]).
//! - **`no_std` + `alloc`**, no mutable global state: the addressing mode is an
//!   explicit [`Context`] on every call.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// Encoding packs and unpacks bit fields of every width, so narrowing and
// sign-changing casts between integer types are routine here, as are
// dense hex literals for opcode bytes.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::redundant_closure_for_method_calls,
    clippy::bool_to_int_with_if,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::fn_params_excessive_bools,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::single_match_else,
    clippy::manual_let_else,
    clippy::many_single_char_names,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

extern crate alloc;

/// Full decoder: bytes to [`Instruction`].
pub mod decoder;
/// Encoder: [`Instruction`] to bytes, with fixups.
pub mod encoder;
/// Decode and encode error types.
pub mod error;
/// Length, EFLAGS and control-transfer decoding without operands.
pub mod fast;
/// Instructions, prefixes, and raw-bytes caching.
pub mod instr;
/// Block layout, fixup resolution, and relocation of encoded bytes.
pub mod linker;
/// Addressing mode, vendor, and the per-call [`Context`].
pub mod mode;
/// Opcode identifiers, condition codes, and EFLAGS masks.
pub mod opcode;
/// Operands and memory references.
pub mod operand;
/// Registers and register classes.
pub mod register;
/// Operand-size resolution.
pub mod size;
/// Decision-graph opcode tables.
pub mod table;

// Re-exports
pub use decoder::{decode, decode_from_copy, decode_next_pc, DecodeIter, MAX_INSTR_LEN};
pub use encoder::{
    encode, encode_instruction, encode_to_vec, EncodedInstr, Fixup, FixupKind, FixupTarget, InstrBytes,
};
pub use error::{DecodeError, EncodeError};
pub use fast::FastInstr;
pub use instr::{EncodingHint, Instruction, Predicate, Prefixes, RawBits, RelField, RelKind};
pub use linker::{copy_and_re_relativize, AppliedFixup, Block, Linked};
pub use mode::{Context, Mode, Vendor};
pub use opcode::{Condition, EFlags, Opcode};
pub use operand::{MemRef, Operand, OperandKind};
pub use register::{RegClass, Register, RegisterValues};
