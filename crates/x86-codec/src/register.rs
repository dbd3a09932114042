//! Register identifiers.
//!
//! A [`Register`] is a `(class, number)` pair. The number is the hardware
//! encoding within the class except for [`RegClass::Gpr8High`], where
//! `AH`–`BH` are numbered 0–3 and encode as 4–7 without a REX prefix.

use core::fmt;

/// Register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegClass {
    /// 64-bit general-purpose (`RAX`–`R15`).
    Gpr64,
    /// 32-bit general-purpose (`EAX`–`R15D`).
    Gpr32,
    /// 16-bit general-purpose (`AX`–`R15W`).
    Gpr16,
    /// Low 8-bit general-purpose (`AL`–`BL`, `SPL`–`DIL`, `R8B`–`R15B`).
    Gpr8,
    /// Legacy high-byte aliases (`AH`, `CH`, `DH`, `BH`).
    Gpr8High,
    /// MMX (`MM0`–`MM7`).
    Mmx,
    /// 128-bit vector (`XMM0`–`XMM31`).
    Xmm,
    /// 256-bit vector (`YMM0`–`YMM31`).
    Ymm,
    /// 512-bit vector (`ZMM0`–`ZMM31`).
    Zmm,
    /// AVX-512 opmask (`K0`–`K7`).
    Mask,
    /// MPX bound (`BND0`–`BND3`).
    Bound,
    /// x87 stack (`ST0`–`ST7`).
    X87,
    /// Segment (`ES`, `CS`, `SS`, `DS`, `FS`, `GS`).
    Segment,
    /// Debug (`DR0`–`DR15`).
    Debug,
    /// Control (`CR0`–`CR15`).
    Control,
}

impl RegClass {
    /// Number of registers in the class.
    pub const fn count(self) -> u8 {
        match self {
            RegClass::Gpr64 | RegClass::Gpr32 | RegClass::Gpr16 | RegClass::Gpr8 => 16,
            RegClass::Gpr8High | RegClass::Bound => 4,
            RegClass::Mmx | RegClass::Mask | RegClass::X87 => 8,
            RegClass::Xmm | RegClass::Ymm | RegClass::Zmm => 32,
            RegClass::Segment => 6,
            RegClass::Debug | RegClass::Control => 16,
        }
    }

    /// Whether the class holds general-purpose registers.
    pub const fn is_gpr(self) -> bool {
        matches!(
            self,
            RegClass::Gpr64 | RegClass::Gpr32 | RegClass::Gpr16 | RegClass::Gpr8 | RegClass::Gpr8High
        )
    }

    /// Whether the class holds SSE/AVX vector registers.
    pub const fn is_vector(self) -> bool {
        matches!(self, RegClass::Xmm | RegClass::Ymm | RegClass::Zmm)
    }

    /// General-purpose class for a byte width (1, 2, 4 or 8).
    pub const fn gpr_for_size(size: u16) -> Option<RegClass> {
        match size {
            1 => Some(RegClass::Gpr8),
            2 => Some(RegClass::Gpr16),
            4 => Some(RegClass::Gpr32),
            8 => Some(RegClass::Gpr64),
            _ => None,
        }
    }

    /// Vector class for a byte width (16, 32 or 64).
    pub const fn vector_for_size(size: u16) -> Option<RegClass> {
        match size {
            16 => Some(RegClass::Xmm),
            32 => Some(RegClass::Ymm),
            64 => Some(RegClass::Zmm),
            _ => None,
        }
    }
}

/// A machine register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    class: RegClass,
    num: u8,
}

/// Source of register contents for effective-address computation.
pub trait RegisterValues {
    /// Full-width value of general-purpose register `num` (0–15).
    fn gpr(&self, num: u8) -> u64;

    /// Lane `lane` of vector register `num`, as a sign-extended index
    /// element of `elem_size` bytes. Used for VSIB addresses.
    fn vector_lane(&self, _num: u8, _lane: usize, _elem_size: u16) -> i64 {
        0
    }

    /// Linear base of segment `seg`.
    fn segment_base(&self, _seg: Register) -> u64 {
        0
    }
}

macro_rules! reg_consts {
    ($class:ident: $($name:ident = $num:expr),* $(,)?) => {
        $(
            #[allow(missing_docs)]
            pub const $name: Register = Register { class: RegClass::$class, num: $num };
        )*
    };
}

impl Register {
    reg_consts!(Gpr64: RAX = 0, RCX = 1, RDX = 2, RBX = 3, RSP = 4, RBP = 5, RSI = 6, RDI = 7,
        R8 = 8, R9 = 9, R10 = 10, R11 = 11, R12 = 12, R13 = 13, R14 = 14, R15 = 15);
    reg_consts!(Gpr32: EAX = 0, ECX = 1, EDX = 2, EBX = 3, ESP = 4, EBP = 5, ESI = 6, EDI = 7,
        R8D = 8, R9D = 9, R10D = 10, R11D = 11, R12D = 12, R13D = 13, R14D = 14, R15D = 15);
    reg_consts!(Gpr16: AX = 0, CX = 1, DX = 2, BX = 3, SP = 4, BP = 5, SI = 6, DI = 7,
        R8W = 8, R9W = 9, R10W = 10, R11W = 11, R12W = 12, R13W = 13, R14W = 14, R15W = 15);
    reg_consts!(Gpr8: AL = 0, CL = 1, DL = 2, BL = 3, SPL = 4, BPL = 5, SIL = 6, DIL = 7,
        R8B = 8, R9B = 9, R10B = 10, R11B = 11, R12B = 12, R13B = 13, R14B = 14, R15B = 15);
    reg_consts!(Gpr8High: AH = 0, CH = 1, DH = 2, BH = 3);
    reg_consts!(Segment: ES = 0, CS = 1, SS = 2, DS = 3, FS = 4, GS = 5);
    reg_consts!(X87: ST0 = 0, ST1 = 1, ST2 = 2, ST3 = 3, ST4 = 4, ST5 = 5, ST6 = 6, ST7 = 7);
    reg_consts!(Mask: K0 = 0, K1 = 1, K2 = 2, K3 = 3, K4 = 4, K5 = 5, K6 = 6, K7 = 7);

    /// Creates a register, or `None` if `num` does not fit the class.
    pub const fn new(class: RegClass, num: u8) -> Option<Register> {
        if num < class.count() {
            Some(Register { class, num })
        } else {
            None
        }
    }

    /// Like [`Register::new`] but wraps an out-of-range number into range.
    pub(crate) const fn wrapping(class: RegClass, num: u8) -> Register {
        Register {
            class,
            num: num % class.count(),
        }
    }

    /// `XMMn` (n wraps modulo 32).
    pub const fn xmm(n: u8) -> Register {
        Self::wrapping(RegClass::Xmm, n)
    }

    /// `YMMn` (n wraps modulo 32).
    pub const fn ymm(n: u8) -> Register {
        Self::wrapping(RegClass::Ymm, n)
    }

    /// `ZMMn` (n wraps modulo 32).
    pub const fn zmm(n: u8) -> Register {
        Self::wrapping(RegClass::Zmm, n)
    }

    /// `MMn` (n wraps modulo 8).
    pub const fn mm(n: u8) -> Register {
        Self::wrapping(RegClass::Mmx, n)
    }

    /// `Kn` (n wraps modulo 8).
    pub const fn k(n: u8) -> Register {
        Self::wrapping(RegClass::Mask, n)
    }

    /// `ST(n)` (n wraps modulo 8).
    pub const fn st(n: u8) -> Register {
        Self::wrapping(RegClass::X87, n)
    }

    /// `CRn` (n wraps modulo 16).
    pub const fn cr(n: u8) -> Register {
        Self::wrapping(RegClass::Control, n)
    }

    /// `DRn` (n wraps modulo 16).
    pub const fn dr(n: u8) -> Register {
        Self::wrapping(RegClass::Debug, n)
    }

    /// `BNDn` (n wraps modulo 4).
    pub const fn bnd(n: u8) -> Register {
        Self::wrapping(RegClass::Bound, n)
    }

    /// General-purpose register `num` (0–15) of byte width `size`.
    ///
    /// Numbers 4–7 at width 1 are `SPL`–`DIL`; use [`Register::AH`] and
    /// friends for the high-byte aliases.
    pub const fn gpr(num: u8, size: u16) -> Option<Register> {
        match RegClass::gpr_for_size(size) {
            Some(class) => Register::new(class, num),
            None => None,
        }
    }

    /// Register class.
    #[inline]
    pub const fn class(self) -> RegClass {
        self.class
    }

    /// Number within the class.
    #[inline]
    pub const fn num(self) -> u8 {
        self.num
    }

    /// Hardware encoding (up to 5 bits). The low 3 bits go in ModR/M, SIB
    /// or the opcode; bit 3 in REX/VEX/EVEX; bit 4 in the EVEX high bits.
    #[inline]
    pub const fn encoding(self) -> u8 {
        match self.class {
            RegClass::Gpr8High => self.num + 4,
            _ => self.num,
        }
    }

    /// Natural width in bytes.
    pub const fn size(self) -> u16 {
        match self.class {
            RegClass::Gpr64 => 8,
            RegClass::Gpr32 => 4,
            RegClass::Gpr16 | RegClass::Segment => 2,
            RegClass::Gpr8 | RegClass::Gpr8High => 1,
            RegClass::Mmx | RegClass::Mask => 8,
            RegClass::Xmm | RegClass::Bound => 16,
            RegClass::Ymm => 32,
            RegClass::Zmm => 64,
            RegClass::X87 => 10,
            RegClass::Debug | RegClass::Control => 8,
        }
    }

    /// Natural width in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.size() as u32 * 8
    }

    /// Needs REX.R/X/B (or the VEX/EVEX equivalent): encoding bit 3 is set.
    #[inline]
    pub const fn is_extended(self) -> bool {
        self.encoding() & 0x8 != 0
    }

    /// Needs an EVEX high bit (R', V' or X): encoding bit 4 is set.
    #[inline]
    pub const fn is_evex_extended(self) -> bool {
        self.encoding() & 0x10 != 0
    }

    /// Can only be encoded with a REX prefix present (`SPL`–`DIL`, any
    /// extended register).
    pub const fn needs_rex(self) -> bool {
        match self.class {
            RegClass::Gpr8 => self.num >= 4,
            RegClass::Gpr64 | RegClass::Gpr32 | RegClass::Gpr16 => self.num >= 8,
            RegClass::Xmm | RegClass::Ymm | RegClass::Zmm | RegClass::Control | RegClass::Debug => {
                self.num >= 8
            }
            _ => false,
        }
    }

    /// Whether this is one of `AH`, `CH`, `DH`, `BH`.
    #[inline]
    pub const fn is_high_byte(self) -> bool {
        matches!(self.class, RegClass::Gpr8High)
    }

    /// General-purpose register of any width.
    #[inline]
    pub const fn is_gpr(self) -> bool {
        self.class.is_gpr()
    }

    /// XMM, YMM or ZMM.
    #[inline]
    pub const fn is_vector(self) -> bool {
        self.class.is_vector()
    }

    /// AVX-512 opmask.
    #[inline]
    pub const fn is_mask(self) -> bool {
        matches!(self.class, RegClass::Mask)
    }

    /// MMX.
    #[inline]
    pub const fn is_mmx(self) -> bool {
        matches!(self.class, RegClass::Mmx)
    }

    /// x87 stack register.
    #[inline]
    pub const fn is_x87(self) -> bool {
        matches!(self.class, RegClass::X87)
    }

    /// Segment register.
    #[inline]
    pub const fn is_segment(self) -> bool {
        matches!(self.class, RegClass::Segment)
    }

    /// MPX bound register.
    #[inline]
    pub const fn is_bound(self) -> bool {
        matches!(self.class, RegClass::Bound)
    }

    /// Control or debug register.
    #[inline]
    pub const fn is_system(self) -> bool {
        matches!(self.class, RegClass::Control | RegClass::Debug)
    }

    /// The same general-purpose register at another width. High-byte
    /// registers resize from their containing register (`AH` → `AX`).
    pub const fn resize(self, size: u16) -> Option<Register> {
        let num = match self.class {
            RegClass::Gpr8High => self.num,
            RegClass::Gpr64 | RegClass::Gpr32 | RegClass::Gpr16 | RegClass::Gpr8 => self.num,
            _ => return None,
        };
        Register::gpr(num, size)
    }

    /// The full 64-bit register containing this one (GPRs), or the ZMM
    /// register containing an XMM/YMM register. Other classes map to
    /// themselves.
    pub const fn canonical(self) -> Register {
        match self.class {
            RegClass::Gpr64
            | RegClass::Gpr32
            | RegClass::Gpr16
            | RegClass::Gpr8
            | RegClass::Gpr8High => Register {
                class: RegClass::Gpr64,
                num: self.num,
            },
            RegClass::Xmm | RegClass::Ymm => Register {
                class: RegClass::Zmm,
                num: self.num,
            },
            _ => self,
        }
    }

    /// The register actually selected by this register's encoding when a
    /// REX prefix is present: `AH`–`BH` become `SPL`–`DIL`.
    pub const fn under_rex(self) -> Register {
        match self.class {
            RegClass::Gpr8High => Register {
                class: RegClass::Gpr8,
                num: self.num + 4,
            },
            _ => self,
        }
    }

    /// Whether the two registers share storage, assuming no REX prefix.
    #[inline]
    pub fn overlaps(self, other: Register) -> bool {
        self.overlaps_in(other, false)
    }

    /// Whether the two registers share storage in an instruction that does
    /// (`rex_present`) or does not carry a REX-class prefix.
    ///
    /// Registers overlap when they resolve to the same full register. With
    /// a REX prefix the high-byte encodings select `SPL`–`DIL` instead, so
    /// `AH` overlaps `RSP` rather than `RAX`.
    pub fn overlaps_in(self, other: Register, rex_present: bool) -> bool {
        let (a, b) = if rex_present {
            (self.under_rex(), other.under_rex())
        } else {
            (self, other)
        };
        a.canonical() == b.canonical()
    }

    /// Reads this register's value out of `values`, truncated to its width.
    pub fn value_from(self, values: &dyn RegisterValues) -> u64 {
        match self.class {
            RegClass::Gpr64 => values.gpr(self.num),
            RegClass::Gpr32 => values.gpr(self.num) & 0xffff_ffff,
            RegClass::Gpr16 => values.gpr(self.num) & 0xffff,
            RegClass::Gpr8 => values.gpr(self.num) & 0xff,
            RegClass::Gpr8High => (values.gpr(self.num) >> 8) & 0xff,
            _ => 0,
        }
    }

    /// Lowercase assembler name.
    pub fn name(self) -> &'static str {
        const GPR64: [&str; 16] = [
            "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11",
            "r12", "r13", "r14", "r15",
        ];
        const GPR32: [&str; 16] = [
            "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d",
            "r12d", "r13d", "r14d", "r15d",
        ];
        const GPR16: [&str; 16] = [
            "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w", "r12w",
            "r13w", "r14w", "r15w",
        ];
        const GPR8: [&str; 16] = [
            "al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b",
            "r12b", "r13b", "r14b", "r15b",
        ];
        const HIGH: [&str; 4] = ["ah", "ch", "dh", "bh"];
        const SEG: [&str; 6] = ["es", "cs", "ss", "ds", "fs", "gs"];
        const XMM: [&str; 32] = [
            "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9",
            "xmm10", "xmm11", "xmm12", "xmm13", "xmm14", "xmm15", "xmm16", "xmm17", "xmm18",
            "xmm19", "xmm20", "xmm21", "xmm22", "xmm23", "xmm24", "xmm25", "xmm26", "xmm27",
            "xmm28", "xmm29", "xmm30", "xmm31",
        ];
        const YMM: [&str; 32] = [
            "ymm0", "ymm1", "ymm2", "ymm3", "ymm4", "ymm5", "ymm6", "ymm7", "ymm8", "ymm9",
            "ymm10", "ymm11", "ymm12", "ymm13", "ymm14", "ymm15", "ymm16", "ymm17", "ymm18",
            "ymm19", "ymm20", "ymm21", "ymm22", "ymm23", "ymm24", "ymm25", "ymm26", "ymm27",
            "ymm28", "ymm29", "ymm30", "ymm31",
        ];
        const ZMM: [&str; 32] = [
            "zmm0", "zmm1", "zmm2", "zmm3", "zmm4", "zmm5", "zmm6", "zmm7", "zmm8", "zmm9",
            "zmm10", "zmm11", "zmm12", "zmm13", "zmm14", "zmm15", "zmm16", "zmm17", "zmm18",
            "zmm19", "zmm20", "zmm21", "zmm22", "zmm23", "zmm24", "zmm25", "zmm26", "zmm27",
            "zmm28", "zmm29", "zmm30", "zmm31",
        ];
        const MM: [&str; 8] = ["mm0", "mm1", "mm2", "mm3", "mm4", "mm5", "mm6", "mm7"];
        const K: [&str; 8] = ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];
        const ST: [&str; 8] = ["st0", "st1", "st2", "st3", "st4", "st5", "st6", "st7"];
        const BND: [&str; 4] = ["bnd0", "bnd1", "bnd2", "bnd3"];
        const CR: [&str; 16] = [
            "cr0", "cr1", "cr2", "cr3", "cr4", "cr5", "cr6", "cr7", "cr8", "cr9", "cr10", "cr11",
            "cr12", "cr13", "cr14", "cr15",
        ];
        const DR: [&str; 16] = [
            "dr0", "dr1", "dr2", "dr3", "dr4", "dr5", "dr6", "dr7", "dr8", "dr9", "dr10", "dr11",
            "dr12", "dr13", "dr14", "dr15",
        ];
        let n = self.num as usize;
        match self.class {
            RegClass::Gpr64 => GPR64[n],
            RegClass::Gpr32 => GPR32[n],
            RegClass::Gpr16 => GPR16[n],
            RegClass::Gpr8 => GPR8[n],
            RegClass::Gpr8High => HIGH[n],
            RegClass::Segment => SEG[n],
            RegClass::Xmm => XMM[n],
            RegClass::Ymm => YMM[n],
            RegClass::Zmm => ZMM[n],
            RegClass::Mmx => MM[n],
            RegClass::Mask => K[n],
            RegClass::X87 => ST[n],
            RegClass::Bound => BND[n],
            RegClass::Control => CR[n],
            RegClass::Debug => DR[n],
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_validate_number() {
        assert!(Register::new(RegClass::Gpr8High, 4).is_none());
        assert!(Register::new(RegClass::Segment, 6).is_none());
        assert!(Register::new(RegClass::Mask, 7).is_some());
        assert!(Register::new(RegClass::Zmm, 31).is_some());
        assert!(Register::new(RegClass::Zmm, 32).is_none());
        assert_eq!(Register::gpr(3, 8), Some(Register::RBX));
        assert_eq!(Register::gpr(3, 3), None);
    }

    #[test]
    fn encodings() {
        assert_eq!(Register::AH.encoding(), 4);
        assert_eq!(Register::BH.encoding(), 7);
        assert_eq!(Register::SPL.encoding(), 4);
        assert_eq!(Register::R13D.encoding(), 13);
        assert!(Register::R13D.is_extended());
        assert!(Register::xmm(17).is_evex_extended());
        assert!(!Register::xmm(17).is_extended());
        assert!(Register::xmm(25).is_extended());
    }

    #[test]
    fn rex_requirements() {
        assert!(Register::SPL.needs_rex());
        assert!(Register::R8B.needs_rex());
        assert!(!Register::AL.needs_rex());
        assert!(!Register::AH.needs_rex());
        assert!(Register::R9.needs_rex());
        assert!(!Register::RAX.needs_rex());
    }

    #[test]
    fn sizes() {
        assert_eq!(Register::RAX.size(), 8);
        assert_eq!(Register::EAX.size(), 4);
        assert_eq!(Register::AX.size(), 2);
        assert_eq!(Register::AH.size(), 1);
        assert_eq!(Register::ymm(3).size(), 32);
        assert_eq!(Register::ST0.size(), 10);
        assert_eq!(Register::zmm(0).bits(), 512);
    }

    #[test]
    fn high_byte_overlap_depends_on_rex() {
        // Without REX, AH is bits 8..15 of RAX.
        assert!(Register::AH.overlaps_in(Register::AL, false));
        assert!(Register::AH.overlaps(Register::AL));
        // With REX the same encoding selects SPL, part of RSP.
        assert!(!Register::AH.overlaps_in(Register::AL, true));
        assert!(Register::AH.overlaps_in(Register::RSP, true));
        assert!(!Register::AH.overlaps_in(Register::RSP, false));
    }

    #[test]
    fn overlap_is_width_insensitive() {
        assert!(Register::EAX.overlaps(Register::RAX));
        assert!(Register::R15B.overlaps(Register::R15W));
        assert!(!Register::RAX.overlaps(Register::RCX));
        assert!(Register::xmm(3).overlaps(Register::zmm(3)));
        assert!(!Register::xmm(3).overlaps(Register::mm(3)));
    }

    #[test]
    fn resize_and_canonical() {
        assert_eq!(Register::AH.resize(2), Some(Register::AX));
        assert_eq!(Register::R10D.resize(1), Some(Register::R10B));
        assert_eq!(Register::xmm(1).resize(4), None);
        assert_eq!(Register::DIL.canonical(), Register::RDI);
        assert_eq!(Register::ymm(9).canonical(), Register::zmm(9));
    }

    struct Regs;

    impl RegisterValues for Regs {
        fn gpr(&self, num: u8) -> u64 {
            0x1122_3344_5566_7700 | num as u64
        }
    }

    #[test]
    fn value_extraction() {
        assert_eq!(Register::RAX.value_from(&Regs), 0x1122_3344_5566_7700);
        assert_eq!(Register::ECX.value_from(&Regs), 0x5566_7701);
        assert_eq!(Register::DX.value_from(&Regs), 0x7702);
        assert_eq!(Register::BL.value_from(&Regs), 0x03);
        assert_eq!(Register::AH.value_from(&Regs), 0x77);
    }

    #[test]
    fn names() {
        assert_eq!(Register::R8B.name(), "r8b");
        assert_eq!(Register::BH.to_string(), "bh");
        assert_eq!(Register::k(5).name(), "k5");
        assert_eq!(Register::zmm(31).name(), "zmm31");
        assert_eq!(Register::GS.name(), "gs");
    }
}
