//! Error types for decoding, encoding, and relocation.

use alloc::string::String;
use core::fmt;

use crate::opcode::Opcode;

/// Decode failure.
///
/// Malformed input never aborts: it is reported as one of these variants so
/// the caller can choose between skipping ahead and treating it as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    /// The instruction continues past the end of the supplied buffer.
    Truncated {
        /// Number of bytes the decoder needed to continue.
        needed: usize,
        /// Number of bytes the caller supplied.
        available: usize,
    },

    /// The bytes do not form a valid instruction in the requested mode.
    Invalid {
        /// Offset within the instruction at which decoding gave up.
        offset: usize,
        /// Best-effort length for skipping past the bad instruction, if the
        /// length decoder could still size it.
        length: Option<usize>,
    },
}

impl DecodeError {
    /// Shorthand for an invalid-instruction outcome with no skip length.
    #[must_use]
    pub(crate) fn invalid(offset: usize) -> Self {
        DecodeError::Invalid {
            offset,
            length: None,
        }
    }

    /// Number of bytes a caller may skip to resynchronize, when known.
    #[must_use]
    pub fn skip_length(&self) -> Option<usize> {
        match self {
            DecodeError::Invalid { length, .. } => *length,
            DecodeError::Truncated { .. } => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed, available } => {
                write!(
                    f,
                    "truncated instruction: needed {} bytes, only {} available",
                    needed, available
                )
            }
            DecodeError::Invalid {
                offset,
                length: Some(len),
            } => {
                write!(
                    f,
                    "invalid instruction at byte {} (skip length {})",
                    offset, len
                )
            }
            DecodeError::Invalid {
                offset,
                length: None,
            } => {
                write!(f, "invalid instruction at byte {}", offset)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Encode or relocation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    /// No template of the opcode accepts this operand combination.
    NoMatchingTemplate {
        /// The opcode whose template chain was exhausted.
        opcode: Opcode,
    },

    /// An operand has the wrong register class, size, or shape.
    InvalidOperand {
        /// Description of the offending operand.
        detail: String,
    },

    /// A relative target does not fit the field that must hold it.
    Unreachable {
        /// The displacement that was required.
        disp: i64,
        /// Largest magnitude the field can hold.
        max: i64,
    },

    /// The output buffer cannot hold the encoded bytes.
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// An instruction-relative operand names no instruction in the block.
    UnresolvedTarget {
        /// The dangling instruction index.
        index: usize,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NoMatchingTemplate { opcode } => {
                write!(f, "no encoding template of '{}' matches the operands", opcode)
            }
            EncodeError::InvalidOperand { detail } => {
                write!(f, "invalid operand: {}", detail)
            }
            EncodeError::Unreachable { disp, max } => {
                write!(
                    f,
                    "target unreachable (displacement={}, max=±{})",
                    disp, max
                )
            }
            EncodeError::BufferTooSmall { needed, available } => {
                write!(
                    f,
                    "output buffer too small: needed {} bytes, only {} available",
                    needed, available
                )
            }
            EncodeError::UnresolvedTarget { index } => {
                write!(f, "instruction target #{} is not part of the block", index)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}
