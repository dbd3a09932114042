//! Operand sizes and the rules that resolve variable sizes.
//!
//! A template slot declares an [`OpSize`]. Fixed sizes are literal byte
//! widths; variable sizes are one of a closed set of [`VarSize`] rules,
//! each resolved to a concrete width from a [`SizeCtx`] once the prefix
//! state of the instruction is known.

use crate::mode::{Mode, Vendor};

/// Prefix state that variable sizes depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeCtx {
    /// Addressing mode.
    pub mode: Mode,
    /// Vendor, for the rules in [`VENDOR_SIZES`].
    pub vendor: Vendor,
    /// Operand-size prefix (0x66) is in effect.
    pub data16: bool,
    /// Address-size prefix (0x67) is in effect.
    pub addr16: bool,
    /// REX.W (or VEX/EVEX.W where it selects operand size).
    pub rex_w: bool,
    /// Vector length: 0 = 128, 1 = 256, 2 = 512 bits.
    pub vl: u8,
}

impl SizeCtx {
    /// Context with no prefixes in `mode`.
    pub const fn new(mode: Mode, vendor: Vendor) -> Self {
        Self {
            mode,
            vendor,
            data16: false,
            addr16: false,
            rex_w: false,
            vl: 0,
        }
    }

    /// Effective address width in bytes.
    #[inline]
    pub const fn addr_size(&self) -> u16 {
        match (self.mode, self.addr16) {
            (Mode::X64, false) => 8,
            (Mode::X64, true) | (Mode::X86, false) => 4,
            (Mode::X86, true) => 2,
        }
    }

    /// Vector length in bytes.
    #[inline]
    pub const fn vector_bytes(&self) -> u16 {
        16 << self.vl
    }

    /// Operand-size prefix, with REX.W taking precedence over it.
    #[inline]
    const fn data16_eff(&self) -> bool {
        self.data16 && !self.rex_w
    }
}

/// A slot's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpSize {
    /// No size (address-only memory, as for `lea`, or an absent slot).
    None,
    /// Fixed width in bytes.
    Fixed(u16),
    /// Resolved from prefix state.
    Var(VarSize),
}

impl OpSize {
    /// Concrete width in bytes under `cx`.
    pub fn resolve(self, cx: &SizeCtx) -> u16 {
        match self {
            OpSize::None => 0,
            OpSize::Fixed(n) => n,
            OpSize::Var(v) => v.resolve(cx),
        }
    }

    /// Whether toggling the operand-size prefix changes the width.
    pub fn depends_on_data16(self, cx: &SizeCtx) -> bool {
        match self {
            OpSize::Var(v) => {
                let mut on = *cx;
                on.data16 = true;
                let mut off = *cx;
                off.data16 = false;
                v.resolve(&on) != v.resolve(&off)
            }
            _ => false,
        }
    }

    /// Whether this is a variable size.
    #[inline]
    pub const fn is_var(self) -> bool {
        matches!(self, OpSize::Var(_))
    }
}

/// Variable-size resolution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarSize {
    /// 2 with 0x66, else 4.
    Z,
    /// 8 with REX.W, 2 with 0x66, else 4.
    V,
    /// 8 with REX.W, else 4.
    Y,
    /// Stack slot: 2 with 0x66, else 8 in 64-bit mode and 4 otherwise.
    Stack,
    /// Near call/return stack slot (vendor rule).
    NearStack,
    /// Near relative displacement (vendor rule).
    NearRel,
    /// Far pointer in memory (vendor rule).
    FarMem,
    /// Far pointer immediate: 4 with 0x66, else 6.
    FarImm,
    /// Far call/return stack: 4 with 0x66, 16 with REX.W, else 8.
    FarStack,
    /// Pointer width of the mode (control/debug register moves).
    Pointer,
    /// Address width (string-op index registers, `moffs`).
    Addr,
    /// Descriptor-table register image: 10 in 64-bit mode, else 6.
    DescTable,
    /// 16 with REX.W, else 8 (`cmpxchg8b`/`cmpxchg16b`).
    Rex16,
    /// Interrupt return frame: 6 with 0x66, 40 with REX.W, else 12.
    Iret,
    /// `pusha`/`popa` image: 16 with 0x66, else 32.
    PushAll,
    /// x87 environment: 14 with 0x66, else 28.
    FpuEnv,
    /// x87 state: 94 with 0x66, else 108.
    FpuSave,
    /// Vector: 16 or 32 by VEX.L.
    X,
    /// Vector: 16, 32 or 64 by VEX.L / EVEX.L'L.
    XE,
    /// Half a vector: 8, 16 or 32.
    Half,
    /// Quarter vector: 4, 8 or 16.
    Quarter,
    /// Eighth vector: 2, 4 or 8.
    Eighth,
}

impl VarSize {
    /// Concrete width in bytes under `cx`.
    pub fn resolve(self, cx: &SizeCtx) -> u16 {
        let d16 = cx.data16_eff();
        match self {
            VarSize::Z => {
                if d16 {
                    2
                } else {
                    4
                }
            }
            VarSize::V => {
                if cx.rex_w {
                    8
                } else if cx.data16 {
                    2
                } else {
                    4
                }
            }
            VarSize::Y => {
                if cx.rex_w {
                    8
                } else {
                    4
                }
            }
            VarSize::Stack => {
                if d16 {
                    2
                } else if cx.mode.is_64() {
                    8
                } else {
                    4
                }
            }
            VarSize::NearStack => vendor_size(VendorRule::NearStack, cx),
            VarSize::NearRel => vendor_size(VendorRule::NearRel, cx),
            VarSize::FarMem => vendor_size(VendorRule::FarMem, cx),
            VarSize::FarImm => {
                if d16 {
                    4
                } else {
                    6
                }
            }
            VarSize::FarStack => {
                if cx.rex_w {
                    16
                } else if cx.data16 {
                    4
                } else {
                    8
                }
            }
            VarSize::Pointer => cx.mode.addr_bytes(),
            VarSize::Addr => cx.addr_size(),
            VarSize::DescTable => {
                if cx.mode.is_64() {
                    10
                } else {
                    6
                }
            }
            VarSize::Rex16 => {
                if cx.rex_w {
                    16
                } else {
                    8
                }
            }
            VarSize::Iret => {
                if cx.rex_w {
                    40
                } else if cx.data16 {
                    6
                } else {
                    12
                }
            }
            VarSize::PushAll => {
                if d16 {
                    16
                } else {
                    32
                }
            }
            VarSize::FpuEnv => {
                if d16 {
                    14
                } else {
                    28
                }
            }
            VarSize::FpuSave => {
                if d16 {
                    94
                } else {
                    108
                }
            }
            VarSize::X => {
                if cx.vl == 0 {
                    16
                } else {
                    32
                }
            }
            VarSize::XE => cx.vector_bytes(),
            VarSize::Half => cx.vector_bytes() / 2,
            VarSize::Quarter => cx.vector_bytes() / 4,
            VarSize::Eighth => cx.vector_bytes() / 8,
        }
    }
}

// ─── Vendor/mode-dependent rules ─────────────────────────────────────

/// Size rules whose result depends on the processor vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorRule {
    /// Near `call`/`ret`/`jmp` stack or target width.
    NearStack,
    /// Near relative branch displacement width.
    NearRel,
    /// Far pointer loaded from memory (`jmp far`, `call far`, `lfs`...).
    FarMem,
}

/// One row of the vendor size table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorRow {
    /// Rule.
    pub rule: VendorRule,
    /// Vendor.
    pub vendor: Vendor,
    /// Mode.
    pub mode: Mode,
    /// Operand-size prefix present.
    pub data16: bool,
    /// REX.W present (always false in 32-bit mode).
    pub rex_w: bool,
    /// Resolved width in bytes.
    pub size: u16,
}

const fn row(
    rule: VendorRule,
    vendor: Vendor,
    mode: Mode,
    data16: bool,
    rex_w: bool,
    size: u16,
) -> VendorRow {
    VendorRow {
        rule,
        vendor,
        mode,
        data16,
        rex_w,
        size,
    }
}

use Mode::{X64, X86};
use Vendor::{Amd, Intel, Unknown};
use VendorRule::{FarMem, NearRel, NearStack};

/// Every `(rule, vendor, mode, 0x66, REX.W)` combination and its width.
///
/// Intel ignores 0x66 on near branches in 64-bit mode; AMD honours it.
/// AMD ignores REX.W on far pointers in memory; Intel widens to 10 bytes.
/// An unknown vendor takes the AMD reading of the near-branch rules and
/// the Intel reading of the far-pointer rule.
pub const VENDOR_SIZES: [VendorRow; 54] = [
    // Near call/ret stack slot.
    row(NearStack, Intel, X86, false, false, 4),
    row(NearStack, Intel, X86, true, false, 2),
    row(NearStack, Intel, X64, false, false, 8),
    row(NearStack, Intel, X64, true, false, 8),
    row(NearStack, Intel, X64, false, true, 8),
    row(NearStack, Intel, X64, true, true, 8),
    row(NearStack, Amd, X86, false, false, 4),
    row(NearStack, Amd, X86, true, false, 2),
    row(NearStack, Amd, X64, false, false, 8),
    row(NearStack, Amd, X64, true, false, 2),
    row(NearStack, Amd, X64, false, true, 8),
    row(NearStack, Amd, X64, true, true, 8),
    row(NearStack, Unknown, X86, false, false, 4),
    row(NearStack, Unknown, X86, true, false, 2),
    row(NearStack, Unknown, X64, false, false, 8),
    row(NearStack, Unknown, X64, true, false, 2),
    row(NearStack, Unknown, X64, false, true, 8),
    row(NearStack, Unknown, X64, true, true, 8),
    // Near relative displacement.
    row(NearRel, Intel, X86, false, false, 4),
    row(NearRel, Intel, X86, true, false, 2),
    row(NearRel, Intel, X64, false, false, 4),
    row(NearRel, Intel, X64, true, false, 4),
    row(NearRel, Intel, X64, false, true, 4),
    row(NearRel, Intel, X64, true, true, 4),
    row(NearRel, Amd, X86, false, false, 4),
    row(NearRel, Amd, X86, true, false, 2),
    row(NearRel, Amd, X64, false, false, 4),
    row(NearRel, Amd, X64, true, false, 2),
    row(NearRel, Amd, X64, false, true, 4),
    row(NearRel, Amd, X64, true, true, 4),
    row(NearRel, Unknown, X86, false, false, 4),
    row(NearRel, Unknown, X86, true, false, 2),
    row(NearRel, Unknown, X64, false, false, 4),
    row(NearRel, Unknown, X64, true, false, 2),
    row(NearRel, Unknown, X64, false, true, 4),
    row(NearRel, Unknown, X64, true, true, 4),
    // Far pointer in memory.
    row(FarMem, Intel, X86, false, false, 6),
    row(FarMem, Intel, X86, true, false, 4),
    row(FarMem, Intel, X64, false, false, 6),
    row(FarMem, Intel, X64, true, false, 4),
    row(FarMem, Intel, X64, false, true, 10),
    row(FarMem, Intel, X64, true, true, 10),
    row(FarMem, Amd, X86, false, false, 6),
    row(FarMem, Amd, X86, true, false, 4),
    row(FarMem, Amd, X64, false, false, 6),
    row(FarMem, Amd, X64, true, false, 4),
    row(FarMem, Amd, X64, false, true, 6),
    row(FarMem, Amd, X64, true, true, 6),
    row(FarMem, Unknown, X86, false, false, 6),
    row(FarMem, Unknown, X86, true, false, 4),
    row(FarMem, Unknown, X64, false, false, 6),
    row(FarMem, Unknown, X64, true, false, 4),
    row(FarMem, Unknown, X64, false, true, 10),
    row(FarMem, Unknown, X64, true, true, 10),
];

/// Looks a vendor rule up in [`VENDOR_SIZES`].
///
/// REX.W cannot occur in 32-bit mode; a stray `rex_w` there is ignored.
pub fn vendor_size(rule: VendorRule, cx: &SizeCtx) -> u16 {
    let rex_w = cx.rex_w && cx.mode.is_64();
    VENDOR_SIZES
        .iter()
        .find(|r| {
            r.rule == rule
                && r.vendor == cx.vendor
                && r.mode == cx.mode
                && r.data16 == cx.data16
                && r.rex_w == rex_w
        })
        .map_or(4, |r| r.size)
}
