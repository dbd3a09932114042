//! Canonical operation identifiers.
//!
//! One [`Opcode`] names an operation independently of how it is encoded:
//! `add` has a dozen templates, all under [`Opcode::Add`]. Each opcode also
//! carries its lowercase mnemonic and the flags it reads and writes.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Arithmetic-flag usage, as separate read and write masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EFlags: u32 {
        const READ_CF = 1 << 0;
        const READ_PF = 1 << 1;
        const READ_AF = 1 << 2;
        const READ_ZF = 1 << 3;
        const READ_SF = 1 << 4;
        const READ_TF = 1 << 5;
        const READ_IF = 1 << 6;
        const READ_DF = 1 << 7;
        const READ_OF = 1 << 8;
        const READ_NT = 1 << 9;
        const READ_RF = 1 << 10;
        const WRITE_CF = 1 << 11;
        const WRITE_PF = 1 << 12;
        const WRITE_AF = 1 << 13;
        const WRITE_ZF = 1 << 14;
        const WRITE_SF = 1 << 15;
        const WRITE_TF = 1 << 16;
        const WRITE_IF = 1 << 17;
        const WRITE_DF = 1 << 18;
        const WRITE_OF = 1 << 19;
        const WRITE_NT = 1 << 20;
        const WRITE_RF = 1 << 21;

        /// The six status flags, read.
        const READ_6 = Self::READ_CF.bits() | Self::READ_PF.bits() | Self::READ_AF.bits()
            | Self::READ_ZF.bits() | Self::READ_SF.bits() | Self::READ_OF.bits();
        /// The six status flags, written.
        const WRITE_6 = Self::WRITE_CF.bits() | Self::WRITE_PF.bits() | Self::WRITE_AF.bits()
            | Self::WRITE_ZF.bits() | Self::WRITE_SF.bits() | Self::WRITE_OF.bits();
        /// Every flag, read.
        const READ_ALL = (1 << 11) - 1;
        /// Every flag, written.
        const WRITE_ALL = ((1 << 11) - 1) << 11;
    }
}

impl EFlags {
    /// Moves the write bits into read position, for comparing what one
    /// instruction writes with what another reads.
    pub const fn writes_as_reads(self) -> EFlags {
        EFlags::from_bits_retain((self.bits() >> 11) & EFlags::READ_ALL.bits())
    }

    /// Read bits only.
    pub const fn reads(self) -> EFlags {
        EFlags::from_bits_retain(self.bits() & EFlags::READ_ALL.bits())
    }

    /// Write bits only.
    pub const fn writes(self) -> EFlags {
        EFlags::from_bits_retain(self.bits() & EFlags::WRITE_ALL.bits())
    }
}

/// Branch/move condition, in encoding order (`cc` of `0x70+cc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    O,
    NO,
    B,
    NB,
    Z,
    NZ,
    BE,
    NBE,
    S,
    NS,
    P,
    NP,
    L,
    NL,
    LE,
    NLE,
}

impl Condition {
    /// All conditions in encoding order.
    pub const ALL: [Condition; 16] = [
        Condition::O,
        Condition::NO,
        Condition::B,
        Condition::NB,
        Condition::Z,
        Condition::NZ,
        Condition::BE,
        Condition::NBE,
        Condition::S,
        Condition::NS,
        Condition::P,
        Condition::NP,
        Condition::L,
        Condition::NL,
        Condition::LE,
        Condition::NLE,
    ];

    /// The 4-bit condition code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Condition from its 4-bit code.
    #[inline]
    pub const fn from_code(code: u8) -> Condition {
        Self::ALL[(code & 0xf) as usize]
    }

    /// The opposite condition.
    #[inline]
    pub const fn invert(self) -> Condition {
        Self::from_code(self.code() ^ 1)
    }

    /// Flags the condition reads.
    pub const fn reads(self) -> EFlags {
        match self {
            Condition::O | Condition::NO => EFlags::READ_OF,
            Condition::B | Condition::NB => EFlags::READ_CF,
            Condition::Z | Condition::NZ => EFlags::READ_ZF,
            Condition::BE | Condition::NBE => {
                EFlags::from_bits_retain(EFlags::READ_CF.bits() | EFlags::READ_ZF.bits())
            }
            Condition::S | Condition::NS => EFlags::READ_SF,
            Condition::P | Condition::NP => EFlags::READ_PF,
            Condition::L | Condition::NL => {
                EFlags::from_bits_retain(EFlags::READ_SF.bits() | EFlags::READ_OF.bits())
            }
            Condition::LE | Condition::NLE => EFlags::from_bits_retain(
                EFlags::READ_ZF.bits() | EFlags::READ_SF.bits() | EFlags::READ_OF.bits(),
            ),
        }
    }
}

// Flag shorthands for the opcode list.
const NONE: EFlags = EFlags::empty();
const W6: EFlags = EFlags::WRITE_6;
const RC_W6: EFlags = EFlags::from_bits_retain(EFlags::READ_CF.bits() | EFlags::WRITE_6.bits());
const W5: EFlags = EFlags::from_bits_retain(EFlags::WRITE_6.bits() & !EFlags::WRITE_CF.bits());
const RC_WCO: EFlags = EFlags::from_bits_retain(
    EFlags::READ_CF.bits() | EFlags::WRITE_CF.bits() | EFlags::WRITE_OF.bits(),
);
const RD: EFlags = EFlags::READ_DF;
const RD_W6: EFlags = EFlags::from_bits_retain(EFlags::READ_DF.bits() | EFlags::WRITE_6.bits());
const WC: EFlags = EFlags::WRITE_CF;
const RC_WC: EFlags = EFlags::from_bits_retain(EFlags::READ_CF.bits() | EFlags::WRITE_CF.bits());
const RO_WO: EFlags = EFlags::from_bits_retain(EFlags::READ_OF.bits() | EFlags::WRITE_OF.bits());
const WD: EFlags = EFlags::WRITE_DF;
const WI: EFlags = EFlags::WRITE_IF;
const RZ: EFlags = EFlags::READ_ZF;
const WZ: EFlags = EFlags::WRITE_ZF;
const RA: EFlags = EFlags::READ_ALL;
const WA: EFlags = EFlags::WRITE_ALL;
const W_SAHF: EFlags = EFlags::from_bits_retain(
    EFlags::WRITE_CF.bits()
        | EFlags::WRITE_PF.bits()
        | EFlags::WRITE_AF.bits()
        | EFlags::WRITE_ZF.bits()
        | EFlags::WRITE_SF.bits(),
);
const R_LAHF: EFlags = W_SAHF.writes_as_reads();
const R6_W6: EFlags = EFlags::from_bits_retain(EFlags::READ_6.bits() | EFlags::WRITE_6.bits());
const INTR: EFlags = EFlags::from_bits_retain(
    EFlags::WRITE_TF.bits() | EFlags::WRITE_IF.bits() | EFlags::WRITE_NT.bits() | EFlags::WRITE_RF.bits(),
);
const RO_INTR: EFlags = EFlags::from_bits_retain(EFlags::READ_OF.bits() | INTR.bits());
const CO: EFlags = Condition::O.reads();
const CB: EFlags = Condition::B.reads();
const CZ: EFlags = Condition::Z.reads();
const CBE: EFlags = Condition::BE.reads();
const CS: EFlags = Condition::S.reads();
const CP: EFlags = Condition::P.reads();
const CL: EFlags = Condition::L.reads();
const CLE: EFlags = Condition::LE.reads();
const WZPC: EFlags = EFlags::from_bits_retain(
    EFlags::WRITE_ZF.bits() | EFlags::WRITE_PF.bits() | EFlags::WRITE_CF.bits(),
);

macro_rules! opcodes {
    ($($variant:ident = $name:literal, $flags:expr;)*) => {
        /// Operation identifier.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Number of opcodes.
            pub const COUNT: usize = Self::ALL.len();

            /// Lowercase mnemonic.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }

            /// Flags read and written.
            pub const fn eflags(self) -> EFlags {
                match self {
                    $(Opcode::$variant => $flags,)*
                }
            }
        }
    };
}

opcodes! {
    // ── Integer arithmetic and logic ──
    Add = "add", W6;
    Or = "or", W6;
    Adc = "adc", RC_W6;
    Sbb = "sbb", RC_W6;
    And = "and", W6;
    Sub = "sub", W6;
    Xor = "xor", W6;
    Cmp = "cmp", W6;
    Test = "test", W6;
    Inc = "inc", W5;
    Dec = "dec", W5;
    Not = "not", NONE;
    Neg = "neg", W6;
    Mul = "mul", W6;
    Imul = "imul", W6;
    Div = "div", W6;
    Idiv = "idiv", W6;
    Daa = "daa", R6_W6;
    Das = "das", R6_W6;
    Aaa = "aaa", R6_W6;
    Aas = "aas", R6_W6;
    Aam = "aam", W6;
    Aad = "aad", W6;
    Rol = "rol", RC_WCO;
    Ror = "ror", RC_WCO;
    Rcl = "rcl", RC_WCO;
    Rcr = "rcr", RC_WCO;
    Shl = "shl", W6;
    Shr = "shr", W6;
    Sar = "sar", W6;
    Shld = "shld", W6;
    Shrd = "shrd", W6;
    Bt = "bt", W6;
    Bts = "bts", W6;
    Btr = "btr", W6;
    Btc = "btc", W6;
    Bsf = "bsf", W6;
    Bsr = "bsr", W6;
    Popcnt = "popcnt", W6;
    Lzcnt = "lzcnt", W6;
    Tzcnt = "tzcnt", W6;
    Adcx = "adcx", RC_WC;
    Adox = "adox", RO_WO;
    Crc32 = "crc32", NONE;
    Movbe = "movbe", NONE;

    // ── Data movement ──
    Mov = "mov", NONE;
    MovSeg = "mov", NONE;
    MovCr = "mov", W6;
    MovDr = "mov", W6;
    Movsx = "movsx", NONE;
    Movsxd = "movsxd", NONE;
    Movzx = "movzx", NONE;
    Lea = "lea", NONE;
    Xchg = "xchg", NONE;
    Xadd = "xadd", W6;
    Cmpxchg = "cmpxchg", W6;
    Cmpxchg8b = "cmpxchg8b", WZ;
    Cmpxchg16b = "cmpxchg16b", WZ;
    Bswap = "bswap", NONE;
    Cwde = "cwde", NONE;
    Cdq = "cdq", NONE;
    Xlat = "xlat", NONE;
    Lahf = "lahf", R_LAHF;
    Sahf = "sahf", W_SAHF;
    Movnti = "movnti", NONE;
    Nop = "nop", NONE;
    NopModrm = "nop", NONE;
    Pause = "pause", NONE;

    // ── Stack ──
    Push = "push", NONE;
    Pop = "pop", NONE;
    PushImm = "push", NONE;
    Pusha = "pusha", NONE;
    Popa = "popa", NONE;
    Pushf = "pushf", RA;
    Popf = "popf", WA;
    Enter = "enter", NONE;
    Leave = "leave", NONE;

    // ── Control transfer ──
    Jmp = "jmp", NONE;
    JmpShort = "jmp", NONE;
    JmpInd = "jmp", NONE;
    JmpFar = "ljmp", NONE;
    JmpFarInd = "ljmp", NONE;
    Call = "call", NONE;
    CallInd = "call", NONE;
    CallFar = "lcall", NONE;
    CallFarInd = "lcall", NONE;
    Ret = "ret", NONE;
    RetFar = "lret", NONE;
    Iret = "iret", WA;
    Int = "int", INTR;
    Int1 = "int1", INTR;
    Int3 = "int3", INTR;
    Into = "into", RO_INTR;
    Syscall = "syscall", WA;
    Sysret = "sysret", WA;
    Sysenter = "sysenter", WA;
    Sysexit = "sysexit", WA;
    Loopne = "loopne", RZ;
    Loope = "loope", RZ;
    Loop = "loop", NONE;
    Jecxz = "jecxz", NONE;
    Jo = "jo", CO;
    Jno = "jno", CO;
    Jb = "jb", CB;
    Jnb = "jnb", CB;
    Jz = "jz", CZ;
    Jnz = "jnz", CZ;
    Jbe = "jbe", CBE;
    Jnbe = "jnbe", CBE;
    Js = "js", CS;
    Jns = "jns", CS;
    Jp = "jp", CP;
    Jnp = "jnp", CP;
    Jl = "jl", CL;
    Jnl = "jnl", CL;
    Jle = "jle", CLE;
    Jnle = "jnle", CLE;
    JoShort = "jo", CO;
    JnoShort = "jno", CO;
    JbShort = "jb", CB;
    JnbShort = "jnb", CB;
    JzShort = "jz", CZ;
    JnzShort = "jnz", CZ;
    JbeShort = "jbe", CBE;
    JnbeShort = "jnbe", CBE;
    JsShort = "js", CS;
    JnsShort = "jns", CS;
    JpShort = "jp", CP;
    JnpShort = "jnp", CP;
    JlShort = "jl", CL;
    JnlShort = "jnl", CL;
    JleShort = "jle", CLE;
    JnleShort = "jnle", CLE;
    Seto = "seto", CO;
    Setno = "setno", CO;
    Setb = "setb", CB;
    Setnb = "setnb", CB;
    Setz = "setz", CZ;
    Setnz = "setnz", CZ;
    Setbe = "setbe", CBE;
    Setnbe = "setnbe", CBE;
    Sets = "sets", CS;
    Setns = "setns", CS;
    Setp = "setp", CP;
    Setnp = "setnp", CP;
    Setl = "setl", CL;
    Setnl = "setnl", CL;
    Setle = "setle", CLE;
    Setnle = "setnle", CLE;
    Cmovo = "cmovo", CO;
    Cmovno = "cmovno", CO;
    Cmovb = "cmovb", CB;
    Cmovnb = "cmovnb", CB;
    Cmovz = "cmovz", CZ;
    Cmovnz = "cmovnz", CZ;
    Cmovbe = "cmovbe", CBE;
    Cmovnbe = "cmovnbe", CBE;
    Cmovs = "cmovs", CS;
    Cmovns = "cmovns", CS;
    Cmovp = "cmovp", CP;
    Cmovnp = "cmovnp", CP;
    Cmovl = "cmovl", CL;
    Cmovnl = "cmovnl", CL;
    Cmovle = "cmovle", CLE;
    Cmovnle = "cmovnle", CLE;
    Xbegin = "xbegin", NONE;
    Xabort = "xabort", NONE;
    Xend = "xend", NONE;
    Xtest = "xtest", W6;

    // ── Strings and I/O ──
    Movs = "movs", RD;
    Cmps = "cmps", RD_W6;
    Stos = "stos", RD;
    Lods = "lods", RD;
    Scas = "scas", RD_W6;
    Ins = "ins", RD;
    Outs = "outs", RD;
    In = "in", NONE;
    Out = "out", NONE;

    // ── Flags ──
    Cmc = "cmc", RC_WC;
    Clc = "clc", WC;
    Stc = "stc", WC;
    Cli = "cli", WI;
    Sti = "sti", WI;
    Cld = "cld", WD;
    Std = "std", WD;
    Salc = "salc", EFlags::READ_CF;

    // ── Segments and system ──
    Les = "les", NONE;
    Lds = "lds", NONE;
    Lss = "lss", NONE;
    Lfs = "lfs", NONE;
    Lgs = "lgs", NONE;
    Bound = "bound", NONE;
    Arpl = "arpl", WZ;
    Hlt = "hlt", NONE;
    Fwait = "fwait", NONE;
    Sldt = "sldt", NONE;
    Str = "str", NONE;
    Lldt = "lldt", NONE;
    Ltr = "ltr", NONE;
    Verr = "verr", WZ;
    Verw = "verw", WZ;
    Sgdt = "sgdt", NONE;
    Sidt = "sidt", NONE;
    Lgdt = "lgdt", NONE;
    Lidt = "lidt", NONE;
    Smsw = "smsw", NONE;
    Lmsw = "lmsw", NONE;
    Invlpg = "invlpg", NONE;
    Vmcall = "vmcall", WA;
    Vmlaunch = "vmlaunch", WA;
    Vmresume = "vmresume", WA;
    Vmxoff = "vmxoff", WA;
    Vmptrld = "vmptrld", WA;
    Vmptrst = "vmptrst", WA;
    Vmclear = "vmclear", WA;
    Vmxon = "vmxon", WA;
    Vmread = "vmread", WA;
    Vmwrite = "vmwrite", WA;
    Monitor = "monitor", NONE;
    Mwait = "mwait", NONE;
    Clac = "clac", NONE;
    Stac = "stac", NONE;
    Xgetbv = "xgetbv", NONE;
    Xsetbv = "xsetbv", NONE;
    Swapgs = "swapgs", NONE;
    Rdtscp = "rdtscp", NONE;
    Lar = "lar", WZ;
    Lsl = "lsl", WZ;
    Clts = "clts", NONE;
    Invd = "invd", NONE;
    Wbinvd = "wbinvd", NONE;
    Ud0 = "ud0", NONE;
    Ud1 = "ud1", NONE;
    Ud2 = "ud2", NONE;
    Wrmsr = "wrmsr", NONE;
    Rdtsc = "rdtsc", NONE;
    Rdmsr = "rdmsr", NONE;
    Rdpmc = "rdpmc", NONE;
    Getsec = "getsec", NONE;
    Cpuid = "cpuid", NONE;
    Rsm = "rsm", WA;
    Prefetchnta = "prefetchnta", NONE;
    Prefetcht0 = "prefetcht0", NONE;
    Prefetcht1 = "prefetcht1", NONE;
    Prefetcht2 = "prefetcht2", NONE;
    Prefetch = "prefetch", NONE;
    Prefetchw = "prefetchw", NONE;
    Fxsave = "fxsave", NONE;
    Fxrstor = "fxrstor", NONE;
    Fxsave64 = "fxsave64", NONE;
    Fxrstor64 = "fxrstor64", NONE;
    Ldmxcsr = "ldmxcsr", NONE;
    Stmxcsr = "stmxcsr", NONE;
    Xsave = "xsave", NONE;
    Xrstor = "xrstor", NONE;
    Xsaveopt = "xsaveopt", NONE;
    Clflush = "clflush", NONE;
    Clflushopt = "clflushopt", NONE;
    Clwb = "clwb", NONE;
    Lfence = "lfence", NONE;
    Mfence = "mfence", NONE;
    Sfence = "sfence", NONE;
    Rdfsbase = "rdfsbase", NONE;
    Rdgsbase = "rdgsbase", NONE;
    Wrfsbase = "wrfsbase", NONE;
    Wrgsbase = "wrgsbase", NONE;
    Rdrand = "rdrand", W6;
    Rdseed = "rdseed", W6;
    Rdpid = "rdpid", NONE;
    Bndmk = "bndmk", NONE;
    Bndcl = "bndcl", NONE;
    Bndcu = "bndcu", NONE;
    Bndcn = "bndcn", NONE;
    Bndmov = "bndmov", NONE;
    Bndldx = "bndldx", NONE;
    Bndstx = "bndstx", NONE;

    // ── x87 ──
    Fadd = "fadd", NONE;
    Fmul = "fmul", NONE;
    Fcom = "fcom", NONE;
    Fcomp = "fcomp", NONE;
    Fsub = "fsub", NONE;
    Fsubr = "fsubr", NONE;
    Fdiv = "fdiv", NONE;
    Fdivr = "fdivr", NONE;
    Fld = "fld", NONE;
    Fst = "fst", NONE;
    Fstp = "fstp", NONE;
    Fldenv = "fldenv", NONE;
    Fldcw = "fldcw", NONE;
    Fnstenv = "fnstenv", NONE;
    Fnstcw = "fnstcw", NONE;
    Fxch = "fxch", NONE;
    Fnop = "fnop", NONE;
    Fchs = "fchs", NONE;
    Fabs = "fabs", NONE;
    Ftst = "ftst", NONE;
    Fxam = "fxam", NONE;
    Fld1 = "fld1", NONE;
    Fldl2t = "fldl2t", NONE;
    Fldl2e = "fldl2e", NONE;
    Fldpi = "fldpi", NONE;
    Fldlg2 = "fldlg2", NONE;
    Fldln2 = "fldln2", NONE;
    Fldz = "fldz", NONE;
    F2xm1 = "f2xm1", NONE;
    Fyl2x = "fyl2x", NONE;
    Fptan = "fptan", NONE;
    Fpatan = "fpatan", NONE;
    Fxtract = "fxtract", NONE;
    Fprem1 = "fprem1", NONE;
    Fdecstp = "fdecstp", NONE;
    Fincstp = "fincstp", NONE;
    Fprem = "fprem", NONE;
    Fyl2xp1 = "fyl2xp1", NONE;
    Fsqrt = "fsqrt", NONE;
    Fsincos = "fsincos", NONE;
    Frndint = "frndint", NONE;
    Fscale = "fscale", NONE;
    Fsin = "fsin", NONE;
    Fcos = "fcos", NONE;
    Fiadd = "fiadd", NONE;
    Fimul = "fimul", NONE;
    Ficom = "ficom", NONE;
    Ficomp = "ficomp", NONE;
    Fisub = "fisub", NONE;
    Fisubr = "fisubr", NONE;
    Fidiv = "fidiv", NONE;
    Fidivr = "fidivr", NONE;
    Fcmovb = "fcmovb", CB;
    Fcmove = "fcmove", CZ;
    Fcmovbe = "fcmovbe", CBE;
    Fcmovu = "fcmovu", CP;
    Fcmovnb = "fcmovnb", CB;
    Fcmovne = "fcmovne", CZ;
    Fcmovnbe = "fcmovnbe", CBE;
    Fcmovnu = "fcmovnu", CP;
    Fucompp = "fucompp", NONE;
    Fild = "fild", NONE;
    Fisttp = "fisttp", NONE;
    Fist = "fist", NONE;
    Fistp = "fistp", NONE;
    Fnclex = "fnclex", NONE;
    Fninit = "fninit", NONE;
    Fucomi = "fucomi", WZPC;
    Fcomi = "fcomi", WZPC;
    Frstor = "frstor", NONE;
    Fnsave = "fnsave", NONE;
    Fnstsw = "fnstsw", NONE;
    Ffree = "ffree", NONE;
    Fucom = "fucom", NONE;
    Fucomp = "fucomp", NONE;
    Faddp = "faddp", NONE;
    Fmulp = "fmulp", NONE;
    Fcompp = "fcompp", NONE;
    Fsubrp = "fsubrp", NONE;
    Fsubp = "fsubp", NONE;
    Fdivrp = "fdivrp", NONE;
    Fdivp = "fdivp", NONE;
    Fbld = "fbld", NONE;
    Fbstp = "fbstp", NONE;
    Fucomip = "fucomip", WZPC;
    Fcomip = "fcomip", WZPC;

    // ── MMX / SSE / SSE2 / SSE3 ──
    Movups = "movups", NONE;
    Movupd = "movupd", NONE;
    Movss = "movss", NONE;
    Movsd = "movsd", NONE;
    Movlps = "movlps", NONE;
    Movlpd = "movlpd", NONE;
    Movhlps = "movhlps", NONE;
    Movsldup = "movsldup", NONE;
    Movddup = "movddup", NONE;
    Unpcklps = "unpcklps", NONE;
    Unpcklpd = "unpcklpd", NONE;
    Unpckhps = "unpckhps", NONE;
    Unpckhpd = "unpckhpd", NONE;
    Movhps = "movhps", NONE;
    Movhpd = "movhpd", NONE;
    Movlhps = "movlhps", NONE;
    Movshdup = "movshdup", NONE;
    Movaps = "movaps", NONE;
    Movapd = "movapd", NONE;
    Cvtpi2ps = "cvtpi2ps", NONE;
    Cvtpi2pd = "cvtpi2pd", NONE;
    Cvtsi2ss = "cvtsi2ss", NONE;
    Cvtsi2sd = "cvtsi2sd", NONE;
    Movntps = "movntps", NONE;
    Movntpd = "movntpd", NONE;
    Cvttps2pi = "cvttps2pi", NONE;
    Cvttpd2pi = "cvttpd2pi", NONE;
    Cvttss2si = "cvttss2si", NONE;
    Cvttsd2si = "cvttsd2si", NONE;
    Cvtps2pi = "cvtps2pi", NONE;
    Cvtpd2pi = "cvtpd2pi", NONE;
    Cvtss2si = "cvtss2si", NONE;
    Cvtsd2si = "cvtsd2si", NONE;
    Ucomiss = "ucomiss", W6;
    Ucomisd = "ucomisd", W6;
    Comiss = "comiss", W6;
    Comisd = "comisd", W6;
    Movmskps = "movmskps", NONE;
    Movmskpd = "movmskpd", NONE;
    Sqrtps = "sqrtps", NONE;
    Sqrtpd = "sqrtpd", NONE;
    Sqrtss = "sqrtss", NONE;
    Sqrtsd = "sqrtsd", NONE;
    Rsqrtps = "rsqrtps", NONE;
    Rsqrtss = "rsqrtss", NONE;
    Rcpps = "rcpps", NONE;
    Rcpss = "rcpss", NONE;
    Andps = "andps", NONE;
    Andpd = "andpd", NONE;
    Andnps = "andnps", NONE;
    Andnpd = "andnpd", NONE;
    Orps = "orps", NONE;
    Orpd = "orpd", NONE;
    Xorps = "xorps", NONE;
    Xorpd = "xorpd", NONE;
    Addps = "addps", NONE;
    Addpd = "addpd", NONE;
    Addss = "addss", NONE;
    Addsd = "addsd", NONE;
    Mulps = "mulps", NONE;
    Mulpd = "mulpd", NONE;
    Mulss = "mulss", NONE;
    Mulsd = "mulsd", NONE;
    Cvtps2pd = "cvtps2pd", NONE;
    Cvtpd2ps = "cvtpd2ps", NONE;
    Cvtss2sd = "cvtss2sd", NONE;
    Cvtsd2ss = "cvtsd2ss", NONE;
    Cvtdq2ps = "cvtdq2ps", NONE;
    Cvtps2dq = "cvtps2dq", NONE;
    Cvttps2dq = "cvttps2dq", NONE;
    Subps = "subps", NONE;
    Subpd = "subpd", NONE;
    Subss = "subss", NONE;
    Subsd = "subsd", NONE;
    Minps = "minps", NONE;
    Minpd = "minpd", NONE;
    Minss = "minss", NONE;
    Minsd = "minsd", NONE;
    Divps = "divps", NONE;
    Divpd = "divpd", NONE;
    Divss = "divss", NONE;
    Divsd = "divsd", NONE;
    Maxps = "maxps", NONE;
    Maxpd = "maxpd", NONE;
    Maxss = "maxss", NONE;
    Maxsd = "maxsd", NONE;
    Punpcklbw = "punpcklbw", NONE;
    Punpcklwd = "punpcklwd", NONE;
    Punpckldq = "punpckldq", NONE;
    Packsswb = "packsswb", NONE;
    Pcmpgtb = "pcmpgtb", NONE;
    Pcmpgtw = "pcmpgtw", NONE;
    Pcmpgtd = "pcmpgtd", NONE;
    Packuswb = "packuswb", NONE;
    Punpckhbw = "punpckhbw", NONE;
    Punpckhwd = "punpckhwd", NONE;
    Punpckhdq = "punpckhdq", NONE;
    Packssdw = "packssdw", NONE;
    Punpcklqdq = "punpcklqdq", NONE;
    Punpckhqdq = "punpckhqdq", NONE;
    Movd = "movd", NONE;
    Movq = "movq", NONE;
    Movdqa = "movdqa", NONE;
    Movdqu = "movdqu", NONE;
    Pshufw = "pshufw", NONE;
    Pshufd = "pshufd", NONE;
    Pshufhw = "pshufhw", NONE;
    Pshuflw = "pshuflw", NONE;
    Psrlw = "psrlw", NONE;
    Psraw = "psraw", NONE;
    Psllw = "psllw", NONE;
    Psrld = "psrld", NONE;
    Psrad = "psrad", NONE;
    Pslld = "pslld", NONE;
    Psrlq = "psrlq", NONE;
    Psrldq = "psrldq", NONE;
    Psllq = "psllq", NONE;
    Pslldq = "pslldq", NONE;
    Pcmpeqb = "pcmpeqb", NONE;
    Pcmpeqw = "pcmpeqw", NONE;
    Pcmpeqd = "pcmpeqd", NONE;
    Emms = "emms", NONE;
    Extrq = "extrq", NONE;
    Insertq = "insertq", NONE;
    Haddpd = "haddpd", NONE;
    Haddps = "haddps", NONE;
    Hsubpd = "hsubpd", NONE;
    Hsubps = "hsubps", NONE;
    Cmpps = "cmpps", NONE;
    Cmppd = "cmppd", NONE;
    Cmpss = "cmpss", NONE;
    Cmpsd = "cmpsd", NONE;
    Pinsrw = "pinsrw", NONE;
    Pextrw = "pextrw", NONE;
    Shufps = "shufps", NONE;
    Shufpd = "shufpd", NONE;
    Addsubpd = "addsubpd", NONE;
    Addsubps = "addsubps", NONE;
    Paddq = "paddq", NONE;
    Pmullw = "pmullw", NONE;
    Movq2dq = "movq2dq", NONE;
    Movdq2q = "movdq2q", NONE;
    Pmovmskb = "pmovmskb", NONE;
    Psubusb = "psubusb", NONE;
    Psubusw = "psubusw", NONE;
    Pminub = "pminub", NONE;
    Pand = "pand", NONE;
    Paddusb = "paddusb", NONE;
    Paddusw = "paddusw", NONE;
    Pmaxub = "pmaxub", NONE;
    Pandn = "pandn", NONE;
    Pavgb = "pavgb", NONE;
    Pavgw = "pavgw", NONE;
    Pmulhuw = "pmulhuw", NONE;
    Pmulhw = "pmulhw", NONE;
    Cvttpd2dq = "cvttpd2dq", NONE;
    Cvtdq2pd = "cvtdq2pd", NONE;
    Cvtpd2dq = "cvtpd2dq", NONE;
    Movntq = "movntq", NONE;
    Movntdq = "movntdq", NONE;
    Psubsb = "psubsb", NONE;
    Psubsw = "psubsw", NONE;
    Pminsw = "pminsw", NONE;
    Por = "por", NONE;
    Paddsb = "paddsb", NONE;
    Paddsw = "paddsw", NONE;
    Pmaxsw = "pmaxsw", NONE;
    Pxor = "pxor", NONE;
    Lddqu = "lddqu", NONE;
    Pmuludq = "pmuludq", NONE;
    Pmaddwd = "pmaddwd", NONE;
    Psadbw = "psadbw", NONE;
    Maskmovq = "maskmovq", NONE;
    Maskmovdqu = "maskmovdqu", NONE;
    Psubb = "psubb", NONE;
    Psubw = "psubw", NONE;
    Psubd = "psubd", NONE;
    Psubq = "psubq", NONE;
    Paddb = "paddb", NONE;
    Paddw = "paddw", NONE;
    Paddd = "paddd", NONE;
    Femms = "femms", NONE;

    // ── SSSE3 / SSE4 / AES (0F 38, 0F 3A) ──
    Pshufb = "pshufb", NONE;
    Phaddw = "phaddw", NONE;
    Phaddd = "phaddd", NONE;
    Pmaddubsw = "pmaddubsw", NONE;
    Psignb = "psignb", NONE;
    Pmulhrsw = "pmulhrsw", NONE;
    Pblendvb = "pblendvb", NONE;
    Blendvps = "blendvps", NONE;
    Blendvpd = "blendvpd", NONE;
    Ptest = "ptest", W6;
    Pabsb = "pabsb", NONE;
    Pabsw = "pabsw", NONE;
    Pabsd = "pabsd", NONE;
    Pmovsxbw = "pmovsxbw", NONE;
    Pmovsxdq = "pmovsxdq", NONE;
    Pmovzxbw = "pmovzxbw", NONE;
    Pmovzxdq = "pmovzxdq", NONE;
    Pmuldq = "pmuldq", NONE;
    Pcmpeqq = "pcmpeqq", NONE;
    Movntdqa = "movntdqa", NONE;
    Packusdw = "packusdw", NONE;
    Pcmpgtq = "pcmpgtq", NONE;
    Pminsb = "pminsb", NONE;
    Pminsd = "pminsd", NONE;
    Pmaxsb = "pmaxsb", NONE;
    Pmaxsd = "pmaxsd", NONE;
    Pmulld = "pmulld", NONE;
    Aesimc = "aesimc", NONE;
    Aesenc = "aesenc", NONE;
    Aesenclast = "aesenclast", NONE;
    Aesdec = "aesdec", NONE;
    Aesdeclast = "aesdeclast", NONE;
    Roundps = "roundps", NONE;
    Roundpd = "roundpd", NONE;
    Roundss = "roundss", NONE;
    Roundsd = "roundsd", NONE;
    Blendps = "blendps", NONE;
    Blendpd = "blendpd", NONE;
    Pblendw = "pblendw", NONE;
    Palignr = "palignr", NONE;
    Pextrb = "pextrb", NONE;
    Pextrd = "pextrd", NONE;
    Pextrq = "pextrq", NONE;
    Extractps = "extractps", NONE;
    Pinsrb = "pinsrb", NONE;
    Insertps = "insertps", NONE;
    Pinsrd = "pinsrd", NONE;
    Pinsrq = "pinsrq", NONE;
    Dpps = "dpps", NONE;
    Dppd = "dppd", NONE;
    Mpsadbw = "mpsadbw", NONE;
    Pclmulqdq = "pclmulqdq", NONE;
    Pcmpestrm = "pcmpestrm", W6;
    Pcmpestri = "pcmpestri", W6;
    Pcmpistrm = "pcmpistrm", W6;
    Pcmpistri = "pcmpistri", W6;
    Aeskeygenassist = "aeskeygenassist", NONE;

    // ── 3DNow! ──
    Pi2fw = "pi2fw", NONE;
    Pi2fd = "pi2fd", NONE;
    Pf2iw = "pf2iw", NONE;
    Pf2id = "pf2id", NONE;
    Pfnacc = "pfnacc", NONE;
    Pfpnacc = "pfpnacc", NONE;
    Pfcmpge = "pfcmpge", NONE;
    Pfmin = "pfmin", NONE;
    Pfrcp = "pfrcp", NONE;
    Pfrsqrt = "pfrsqrt", NONE;
    Pfsub = "pfsub", NONE;
    Pfadd = "pfadd", NONE;
    Pfcmpgt = "pfcmpgt", NONE;
    Pfmax = "pfmax", NONE;
    Pfrcpit1 = "pfrcpit1", NONE;
    Pfrsqit1 = "pfrsqit1", NONE;
    Pfsubr = "pfsubr", NONE;
    Pfacc = "pfacc", NONE;
    Pfcmpeq = "pfcmpeq", NONE;
    Pfmul = "pfmul", NONE;
    Pfrcpit2 = "pfrcpit2", NONE;
    Pmulhrw = "pmulhrw", NONE;
    Pswapd = "pswapd", NONE;
    Pavgusb = "pavgusb", NONE;

    // ── AVX / AVX2 (VEX) ──
    Vmovups = "vmovups", NONE;
    Vmovupd = "vmovupd", NONE;
    Vmovss = "vmovss", NONE;
    Vmovsd = "vmovsd", NONE;
    Vmovaps = "vmovaps", NONE;
    Vmovapd = "vmovapd", NONE;
    Vmovdqa = "vmovdqa", NONE;
    Vmovdqu = "vmovdqu", NONE;
    Vmovd = "vmovd", NONE;
    Vmovq = "vmovq", NONE;
    Vaddps = "vaddps", NONE;
    Vaddpd = "vaddpd", NONE;
    Vaddss = "vaddss", NONE;
    Vaddsd = "vaddsd", NONE;
    Vmulps = "vmulps", NONE;
    Vmulpd = "vmulpd", NONE;
    Vmulss = "vmulss", NONE;
    Vmulsd = "vmulsd", NONE;
    Vsubps = "vsubps", NONE;
    Vsubpd = "vsubpd", NONE;
    Vsubss = "vsubss", NONE;
    Vsubsd = "vsubsd", NONE;
    Vminps = "vminps", NONE;
    Vminpd = "vminpd", NONE;
    Vminss = "vminss", NONE;
    Vminsd = "vminsd", NONE;
    Vdivps = "vdivps", NONE;
    Vdivpd = "vdivpd", NONE;
    Vdivss = "vdivss", NONE;
    Vdivsd = "vdivsd", NONE;
    Vmaxps = "vmaxps", NONE;
    Vmaxpd = "vmaxpd", NONE;
    Vmaxss = "vmaxss", NONE;
    Vmaxsd = "vmaxsd", NONE;
    Vsqrtps = "vsqrtps", NONE;
    Vsqrtpd = "vsqrtpd", NONE;
    Vsqrtss = "vsqrtss", NONE;
    Vsqrtsd = "vsqrtsd", NONE;
    Vandps = "vandps", NONE;
    Vandpd = "vandpd", NONE;
    Vandnps = "vandnps", NONE;
    Vandnpd = "vandnpd", NONE;
    Vorps = "vorps", NONE;
    Vorpd = "vorpd", NONE;
    Vxorps = "vxorps", NONE;
    Vxorpd = "vxorpd", NONE;
    Vunpcklps = "vunpcklps", NONE;
    Vunpcklpd = "vunpcklpd", NONE;
    Vunpckhps = "vunpckhps", NONE;
    Vunpckhpd = "vunpckhpd", NONE;
    Vshufps = "vshufps", NONE;
    Vshufpd = "vshufpd", NONE;
    Vcmpps = "vcmpps", NONE;
    Vcmppd = "vcmppd", NONE;
    Vcmpss = "vcmpss", NONE;
    Vcmpsd = "vcmpsd", NONE;
    Vcvtps2pd = "vcvtps2pd", NONE;
    Vcvtpd2ps = "vcvtpd2ps", NONE;
    Vcvtss2sd = "vcvtss2sd", NONE;
    Vcvtsd2ss = "vcvtsd2ss", NONE;
    Vcvtdq2ps = "vcvtdq2ps", NONE;
    Vcvtps2dq = "vcvtps2dq", NONE;
    Vcvttps2dq = "vcvttps2dq", NONE;
    Vcvtsi2ss = "vcvtsi2ss", NONE;
    Vcvtsi2sd = "vcvtsi2sd", NONE;
    Vcvttss2si = "vcvttss2si", NONE;
    Vcvttsd2si = "vcvttsd2si", NONE;
    Vucomiss = "vucomiss", W6;
    Vucomisd = "vucomisd", W6;
    Vcomiss = "vcomiss", W6;
    Vcomisd = "vcomisd", W6;
    Vmovmskps = "vmovmskps", NONE;
    Vmovmskpd = "vmovmskpd", NONE;
    Vpaddb = "vpaddb", NONE;
    Vpaddw = "vpaddw", NONE;
    Vpaddd = "vpaddd", NONE;
    Vpaddq = "vpaddq", NONE;
    Vpsubb = "vpsubb", NONE;
    Vpsubw = "vpsubw", NONE;
    Vpsubd = "vpsubd", NONE;
    Vpsubq = "vpsubq", NONE;
    Vpand = "vpand", NONE;
    Vpandn = "vpandn", NONE;
    Vpor = "vpor", NONE;
    Vpxor = "vpxor", NONE;
    Vpcmpeqb = "vpcmpeqb", NONE;
    Vpcmpeqw = "vpcmpeqw", NONE;
    Vpcmpeqd = "vpcmpeqd", NONE;
    Vpcmpgtb = "vpcmpgtb", NONE;
    Vpcmpgtw = "vpcmpgtw", NONE;
    Vpcmpgtd = "vpcmpgtd", NONE;
    Vpmullw = "vpmullw", NONE;
    Vpminub = "vpminub", NONE;
    Vpmaxub = "vpmaxub", NONE;
    Vpshufd = "vpshufd", NONE;
    Vpmovmskb = "vpmovmskb", NONE;
    Vpshufb = "vpshufb", NONE;
    Vptest = "vptest", W6;
    Vpbroadcastb = "vpbroadcastb", NONE;
    Vpbroadcastw = "vpbroadcastw", NONE;
    Vpbroadcastd = "vpbroadcastd", NONE;
    Vpbroadcastq = "vpbroadcastq", NONE;
    Vbroadcastss = "vbroadcastss", NONE;
    Vbroadcastsd = "vbroadcastsd", NONE;
    Vbroadcastf128 = "vbroadcastf128", NONE;
    Vinsertf128 = "vinsertf128", NONE;
    Vextractf128 = "vextractf128", NONE;
    Vperm2f128 = "vperm2f128", NONE;
    Vinserti128 = "vinserti128", NONE;
    Vextracti128 = "vextracti128", NONE;
    Vperm2i128 = "vperm2i128", NONE;
    Vpermilps = "vpermilps", NONE;
    Vpermd = "vpermd", NONE;
    Vpermq = "vpermq", NONE;
    Vblendvps = "vblendvps", NONE;
    Vblendvpd = "vblendvpd", NONE;
    Vpblendvb = "vpblendvb", NONE;
    Vpblendd = "vpblendd", NONE;
    Vmaskmovps = "vmaskmovps", NONE;
    Vpmaskmovd = "vpmaskmovd", NONE;
    Vzeroupper = "vzeroupper", NONE;
    Vzeroall = "vzeroall", NONE;
    Vgatherdps = "vgatherdps", NONE;
    Vgatherdpd = "vgatherdpd", NONE;
    Vgatherqps = "vgatherqps", NONE;
    Vgatherqpd = "vgatherqpd", NONE;
    Vpgatherdd = "vpgatherdd", NONE;
    Vpgatherdq = "vpgatherdq", NONE;
    Vpgatherqd = "vpgatherqd", NONE;
    Vpgatherqq = "vpgatherqq", NONE;
    Vpscatterdd = "vpscatterdd", NONE;
    Vfmadd132ps = "vfmadd132ps", NONE;
    Vfmadd132pd = "vfmadd132pd", NONE;
    Vfmadd213ps = "vfmadd213ps", NONE;
    Vfmadd213pd = "vfmadd213pd", NONE;
    Vfmadd231ps = "vfmadd231ps", NONE;
    Vfmadd231pd = "vfmadd231pd", NONE;
    Vfmadd132ss = "vfmadd132ss", NONE;
    Vfmadd132sd = "vfmadd132sd", NONE;
    Vfmadd213ss = "vfmadd213ss", NONE;
    Vfmadd213sd = "vfmadd213sd", NONE;
    Vfmadd231ss = "vfmadd231ss", NONE;
    Vfmadd231sd = "vfmadd231sd", NONE;
    Vfmsub231ps = "vfmsub231ps", NONE;
    Vfnmadd231ps = "vfnmadd231ps", NONE;

    // ── BMI / ADX / TBM / LWP ──
    Andn = "andn", W6;
    Bextr = "bextr", W6;
    Blsr = "blsr", W6;
    Blsmsk = "blsmsk", W6;
    Blsi = "blsi", W6;
    Bzhi = "bzhi", W6;
    Pdep = "pdep", NONE;
    Pext = "pext", NONE;
    Mulx = "mulx", NONE;
    Rorx = "rorx", NONE;
    Sarx = "sarx", NONE;
    Shlx = "shlx", NONE;
    Shrx = "shrx", NONE;
    Blcfill = "blcfill", W6;
    Lwpins = "lwpins", WC;
    Lwpval = "lwpval", NONE;

    // ── AVX-512 opmask ──
    Kmovw = "kmovw", NONE;
    Kmovb = "kmovb", NONE;
    Kmovd = "kmovd", NONE;
    Kmovq = "kmovq", NONE;
    Kandw = "kandw", NONE;
    Korw = "korw", NONE;
    Kxorw = "kxorw", NONE;
    Knotw = "knotw", NONE;
    Kortestw = "kortestw", W6;

    // ── AVX-512 (EVEX only) ──
    Vmovdqu32 = "vmovdqu32", NONE;
    Vmovdqu64 = "vmovdqu64", NONE;
    Vmovdqa32 = "vmovdqa32", NONE;
    Vmovdqa64 = "vmovdqa64", NONE;
    Vpxord = "vpxord", NONE;
    Vpxorq = "vpxorq", NONE;
    Vpandd = "vpandd", NONE;
    Vpandq = "vpandq", NONE;
    Vpord = "vpord", NONE;
    Vporq = "vporq", NONE;
    Vpternlogd = "vpternlogd", NONE;
    Vpternlogq = "vpternlogq", NONE;
    Vpcmpd = "vpcmpd", NONE;

    // ── XOP ──
    Vpcmov = "vpcmov", NONE;
    Vprotb = "vprotb", NONE;
    Vpcomb = "vpcomb", NONE;
    Vpmacsdd = "vpmacsdd", NONE;
    Vfrczps = "vfrczps", NONE;
}

impl Opcode {
    /// Condition of a conditional branch, set, move, or x87 move.
    pub fn condition(self) -> Option<Condition> {
        use Opcode::*;
        let base = |first: Opcode| Condition::from_code((self as usize - first as usize) as u8);
        match self {
            Jo | Jno | Jb | Jnb | Jz | Jnz | Jbe | Jnbe | Js | Jns | Jp | Jnp | Jl | Jnl | Jle
            | Jnle => Some(base(Jo)),
            JoShort | JnoShort | JbShort | JnbShort | JzShort | JnzShort | JbeShort
            | JnbeShort | JsShort | JnsShort | JpShort | JnpShort | JlShort | JnlShort
            | JleShort | JnleShort => Some(base(JoShort)),
            Seto | Setno | Setb | Setnb | Setz | Setnz | Setbe | Setnbe | Sets | Setns | Setp
            | Setnp | Setl | Setnl | Setle | Setnle => Some(base(Seto)),
            Cmovo | Cmovno | Cmovb | Cmovnb | Cmovz | Cmovnz | Cmovbe | Cmovnbe | Cmovs
            | Cmovns | Cmovp | Cmovnp | Cmovl | Cmovnl | Cmovle | Cmovnle => Some(base(Cmovo)),
            Fcmovb => Some(Condition::B),
            Fcmove => Some(Condition::Z),
            Fcmovbe => Some(Condition::BE),
            Fcmovu => Some(Condition::P),
            Fcmovnb => Some(Condition::NB),
            Fcmovne => Some(Condition::NZ),
            Fcmovnbe => Some(Condition::NBE),
            Fcmovnu => Some(Condition::NP),
            _ => None,
        }
    }

    /// The near conditional branch for `cc`.
    pub fn jcc(cc: Condition) -> Opcode {
        Self::ALL[Opcode::Jo as usize + cc.code() as usize]
    }

    /// The short conditional branch for `cc`.
    pub fn jcc_short(cc: Condition) -> Opcode {
        Self::ALL[Opcode::JoShort as usize + cc.code() as usize]
    }

    /// The `setcc` for `cc`.
    pub fn setcc(cc: Condition) -> Opcode {
        Self::ALL[Opcode::Seto as usize + cc.code() as usize]
    }

    /// The `cmovcc` for `cc`.
    pub fn cmovcc(cc: Condition) -> Opcode {
        Self::ALL[Opcode::Cmovo as usize + cc.code() as usize]
    }

    /// Whether a `lock` prefix is architecturally allowed (given a memory
    /// destination).
    pub const fn is_lockable(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Add | Adc
                | And
                | Btc
                | Btr
                | Bts
                | Cmpxchg
                | Cmpxchg8b
                | Cmpxchg16b
                | Dec
                | Inc
                | Neg
                | Not
                | Or
                | Sbb
                | Sub
                | Xor
                | Xadd
                | Xchg
        )
    }

    /// Instructions operating on opmask registers themselves.
    pub const fn is_mask_op(self) -> bool {
        use Opcode::*;
        matches!(self, Kmovw | Kmovb | Kmovd | Kmovq | Kandw | Korw | Kxorw | Knotw | Kortestw)
    }

    /// String operations that accept `rep`/`repne`.
    pub const fn is_string_op(self) -> bool {
        use Opcode::*;
        matches!(self, Movs | Cmps | Stos | Lods | Scas | Ins | Outs)
    }

    /// String operations whose `rep` form also tests ZF.
    pub const fn is_repe_string_op(self) -> bool {
        matches!(self, Opcode::Cmps | Opcode::Scas)
    }

    /// Element width of a VSIB index, for gathers and scatters.
    pub const fn vsib_index_size(self) -> u16 {
        use Opcode::*;
        match self {
            Vgatherqps | Vgatherqpd | Vpgatherqd | Vpgatherqq => 8,
            _ => 4,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_display() {
        assert_eq!(Opcode::Add.name(), "add");
        assert_eq!(Opcode::Vpgatherdd.to_string(), "vpgatherdd");
        assert_eq!(Opcode::JmpShort.name(), "jmp");
        assert_eq!(Opcode::ALL.len(), Opcode::COUNT);
        assert_eq!(Opcode::ALL[Opcode::Cmc as usize], Opcode::Cmc);
    }

    #[test]
    fn condition_families_line_up() {
        for cc in Condition::ALL {
            assert_eq!(Opcode::jcc(cc).condition(), Some(cc));
            assert_eq!(Opcode::jcc_short(cc).condition(), Some(cc));
            assert_eq!(Opcode::setcc(cc).condition(), Some(cc));
            assert_eq!(Opcode::cmovcc(cc).condition(), Some(cc));
            assert_eq!(Opcode::jcc(cc).eflags(), cc.reads());
        }
        assert_eq!(Opcode::Jnle.condition(), Some(Condition::NLE));
        assert_eq!(Opcode::Fcmovnu.condition(), Some(Condition::NP));
        assert_eq!(Opcode::Add.condition(), None);
        assert_eq!(Condition::Z.invert(), Condition::NZ);
    }

    #[test]
    fn eflags_masks() {
        assert_eq!(Opcode::Add.eflags(), EFlags::WRITE_6);
        assert!(Opcode::Adc.eflags().contains(EFlags::READ_CF));
        assert!(!Opcode::Inc.eflags().contains(EFlags::WRITE_CF));
        assert_eq!(Opcode::Pushf.eflags(), EFlags::READ_ALL);
        assert_eq!(Opcode::Sahf.eflags().writes_as_reads(), Opcode::Lahf.eflags());
        assert!(Opcode::Movs.eflags().contains(EFlags::READ_DF));
        assert_eq!(Opcode::Mov.eflags(), EFlags::empty());
        assert_eq!(EFlags::WRITE_6.writes_as_reads(), EFlags::READ_6);
    }

    #[test]
    fn lockable_set() {
        assert!(Opcode::Xadd.is_lockable());
        assert!(Opcode::Cmpxchg16b.is_lockable());
        assert!(!Opcode::Mov.is_lockable());
        assert!(!Opcode::Cmp.is_lockable());
    }
}
