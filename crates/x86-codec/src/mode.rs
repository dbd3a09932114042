//! Decoding/encoding context: addressing mode, processor vendor, strictness.
//!
//! Every entry point takes a [`Context`] by value. Nothing is read from
//! global or thread-local state, so disjoint byte ranges can be decoded from
//! any number of threads without locking.

use core::fmt;

/// Processor addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// 32-bit protected mode.
    X86,
    /// 64-bit long mode.
    #[default]
    X64,
}

impl Mode {
    /// Whether this is 64-bit mode.
    #[inline]
    pub const fn is_64(self) -> bool {
        matches!(self, Mode::X64)
    }

    /// Default address width in bytes.
    #[inline]
    pub const fn addr_bytes(self) -> u16 {
        match self {
            Mode::X86 => 4,
            Mode::X64 => 8,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::X86 => f.write_str("x86"),
            Mode::X64 => f.write_str("x86_64"),
        }
    }
}

/// Processor vendor, for the handful of size rules that differ between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vendor {
    /// Intel semantics (the default).
    #[default]
    Intel,
    /// AMD semantics.
    Amd,
    /// Vendor not known. Resolved per rule; see [`crate::size::VendorRule`].
    Unknown,
}

/// Explicit per-call configuration.
///
/// # Examples
///
/// ```rust
/// use x86_codec::{Context, Mode, Vendor};
///
/// let ctx = Context::new(Mode::X86).with_vendor(Vendor::Amd).strict(true);
/// assert_eq!(ctx.mode, Mode::X86);
/// assert!(ctx.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Context {
    /// Addressing mode of the code being decoded or encoded.
    pub mode: Mode,
    /// Vendor whose size rules apply.
    pub vendor: Vendor,
    /// Reject a mandatory-prefix slot that is invalid for the seen prefix
    /// instead of falling back to the prefix-less entry.
    pub strict: bool,
}

impl Context {
    /// Creates a context for `mode` with Intel semantics, non-strict.
    #[inline]
    pub const fn new(mode: Mode) -> Self {
        Self {
            mode,
            vendor: Vendor::Intel,
            strict: false,
        }
    }

    /// 64-bit context with defaults.
    #[inline]
    pub const fn x64() -> Self {
        Self::new(Mode::X64)
    }

    /// 32-bit context with defaults.
    #[inline]
    pub const fn x86() -> Self {
        Self::new(Mode::X86)
    }

    /// Sets the vendor.
    #[inline]
    pub const fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    /// Enables or disables strict mandatory-prefix checking.
    #[inline]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::x64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let ctx = Context::x86().with_vendor(Vendor::Unknown).strict(true);
        assert_eq!(ctx.mode, Mode::X86);
        assert_eq!(ctx.vendor, Vendor::Unknown);
        assert!(ctx.strict);
    }

    #[test]
    fn defaults() {
        let ctx = Context::default();
        assert_eq!(ctx.mode, Mode::X64);
        assert_eq!(ctx.vendor, Vendor::Intel);
        assert!(!ctx.strict);
        assert_eq!(Mode::X86.addr_bytes(), 4);
        assert_eq!(Mode::X64.addr_bytes(), 8);
    }
}
