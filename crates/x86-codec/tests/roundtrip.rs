#![cfg(not(target_arch = "wasm32"))]
//! Decode → encode round trips over a corpus of canonical encodings.
//!
//! Every entry is decoded, stripped of its cached bytes, and encoded again
//! from its operands alone. The template search must land on the very same
//! bytes, and decoding those bytes must give back an equal instruction.

use x86_codec::{decode, encode_to_vec, fast, Context, Instruction, Mode, Prefixes};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn decode_all(bytes: &[u8], ctx: Context) -> Instruction {
    let (insn, len) = decode(bytes, ctx, 0x1000)
        .unwrap_or_else(|e| panic!("decode {bytes:02x?}: {e}"));
    assert_eq!(len, bytes.len(), "length of {bytes:02x?}");
    insn
}

fn check(mode: Mode, corpus: &[&[u8]]) {
    let ctx = Context::new(mode);
    for &bytes in corpus {
        let mut insn = decode_all(bytes, ctx);
        insn.clear_raw();
        let out = encode_to_vec(&insn, ctx, 0x1000)
            .unwrap_or_else(|e| panic!("encode `{insn}` from {bytes:02x?}: {e}"));
        assert_eq!(out, bytes, "`{insn}`");
        assert_eq!(decode_all(&out, ctx), insn, "{bytes:02x?}");
    }
}

// ─── Corpora ──────────────────────────────────────────────────────────────────

#[test]
fn integer_64() {
    check(
        Mode::X64,
        &[
            &[0x48, 0x8d, 0x04, 0x8b],
            &[0x48, 0xc7, 0xc0, 0xff, 0xff, 0xff, 0xff],
            &[0x0f, 0xb6, 0xc1],
            &[0x48, 0x0f, 0xaf, 0xc1],
            &[0x87, 0x08],
            &[0xc2, 0x08, 0x00],
            &[0xcd, 0x80],
            &[0x49, 0x8b, 0x45, 0x00],
            &[0x42, 0x8b, 0x04, 0xa8],
        ],
    );
}

#[test]
fn prefixes_64() {
    check(
        Mode::X64,
        &[
            // fs-relative absolute load
            &[0x64, 0x8b, 0x04, 0x25, 0x28, 0x00, 0x00, 0x00],
            // jz with a not-taken hint
            &[0x2e, 0x74, 0x10],
            // jz near with a taken hint
            &[0x3e, 0x0f, 0x84, 0x00, 0x01, 0x00, 0x00],
            // xacquire lock add
            &[0xf2, 0xf0, 0x01, 0x08],
        ],
    );
}

#[test]
fn floating_point_64() {
    check(
        Mode::X64,
        &[
            // fadd st0, st1
            &[0xd8, 0xc1],
            // fld1
            &[0xd9, 0xe8],
            // addpd xmm0, xmm1
            &[0x66, 0x0f, 0x58, 0xc1],
            // movss xmm0, xmm1
            &[0xf3, 0x0f, 0x10, 0xc1],
        ],
    );
}

#[test]
fn legacy_32() {
    check(
        Mode::X86,
        &[
            &[0x40],
            &[0x60],
            &[0x89, 0xc0],
            &[0x8b, 0x46, 0x10],
            &[0x0f, 0x84, 0x10, 0x00, 0x00, 0x00],
            // jmp far 0x8:0x1000
            &[0xea, 0x00, 0x10, 0x00, 0x00, 0x08, 0x00],
        ],
    );
}

#[test]
fn accumulator_offsets() {
    check(
        Mode::X64,
        &[
            &[0xa1, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            &[0x48, 0xa3, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01],
            &[0x64, 0xa0, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            &[0x66, 0xa1, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        ],
    );
    check(
        Mode::X86,
        &[
            &[0xa1, 0x00, 0x10, 0x00, 0x00],
            &[0xa2, 0xff, 0xff, 0xff, 0xff],
            &[0x2e, 0xa3, 0x00, 0x10, 0x00, 0x00],
        ],
    );
}

#[test]
fn hints_are_decoded_as_prefixes() {
    let ctx = Context::x64();
    let jz = decode_all(&[0x2e, 0x74, 0x10], ctx);
    assert!(jz.prefixes().contains(Prefixes::JCC_NOT_TAKEN));
    let jz = decode_all(&[0x3e, 0x0f, 0x84, 0x00, 0x01, 0x00, 0x00], ctx);
    assert!(jz.prefixes().contains(Prefixes::JCC_TAKEN));
}

// ─── Byte sweep ───────────────────────────────────────────────────────────────

/// Opcode heads for every map: one-byte, the 0F escapes, and VEX/EVEX
/// prefixes selecting each map with a few `pp`/`L` settings.
const HEADS: &[&[u8]] = &[
    &[],
    &[0x0f],
    &[0x0f, 0x38],
    &[0x0f, 0x3a],
    &[0xc5, 0xf8],
    &[0xc5, 0xf9],
    &[0xc5, 0xfa],
    &[0xc5, 0xfb],
    &[0xc5, 0xfd],
    &[0xc4, 0xe2, 0x79],
    &[0xc4, 0xe2, 0xf9],
    &[0xc4, 0xe3, 0x79],
    &[0x62, 0xf1, 0x7c, 0x48],
    &[0x62, 0xf1, 0xfd, 0x48],
    &[0x62, 0xf2, 0x7d, 0x48],
];

/// ModR/M bytes covering register, SIB, disp32 and RIP/absolute forms.
const MODRM: &[u8] = &[0xc1, 0x00, 0x44, 0x80, 0x05];

/// Trailing bytes: a SIB of `[rax + rcx*4]`, then displacement and
/// immediate filler.
const TAIL: &[u8] = &[0x88, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x11, 0x22, 0x33, 0x44, 0x55];

/// Number of bytes in each prefix group found at the start of `bytes`.
fn prefix_groups(bytes: &[u8], mode: Mode) -> [usize; 6] {
    let mut n = [0; 6];
    for &b in bytes {
        let g = match b {
            0xf0 => 0,
            0xf2 | 0xf3 => 1,
            0x26 | 0x2e | 0x36 | 0x3e | 0x64 | 0x65 => 2,
            0x66 => 3,
            0x67 => 4,
            0x40..=0x4f if mode == Mode::X64 => 5,
            _ => break,
        };
        n[g] += 1;
    }
    n
}

fn sweep(mode: Mode, prefixes: &[&[u8]]) -> usize {
    let ctx = Context::new(mode);
    let mut decoded = 0;
    for pre in prefixes {
        for head in HEADS {
            for op in 0..=0xffu8 {
                for &modrm in MODRM {
                    let mut input = pre.to_vec();
                    input.extend_from_slice(head);
                    input.push(op);
                    input.push(modrm);
                    input.extend_from_slice(TAIL);

                    let Ok((mut insn, len)) = decode(&input, ctx, 0x1000) else {
                        continue;
                    };
                    decoded += 1;
                    let bytes = &input[..len];
                    assert_eq!(fast::length(&input, ctx), Ok(len), "{mode:?} {bytes:02x?}");

                    insn.clear_raw();
                    let out = encode_to_vec(&insn, ctx, 0x1000)
                        .unwrap_or_else(|e| panic!("{mode:?} encode `{insn}` from {bytes:02x?}: {e}"));
                    let (back, back_len) = decode(&out, ctx, 0x1000)
                        .unwrap_or_else(|e| panic!("{mode:?} {out:02x?} from {bytes:02x?}: {e}"));
                    assert_eq!(back_len, out.len(), "{mode:?} {out:02x?}");
                    assert_eq!(back, insn, "{mode:?} {bytes:02x?} -> {out:02x?}");
                    assert!(
                        prefix_groups(&out, mode).iter().all(|&c| c <= 1),
                        "{mode:?} redundant prefixes in {out:02x?} from {bytes:02x?}"
                    );
                }
            }
        }
    }
    decoded
}

#[test]
fn byte_sweep_64() {
    let n = sweep(
        Mode::X64,
        &[&[], &[0x66], &[0xf2], &[0xf3], &[0xf0], &[0x67], &[0x64], &[0x48], &[0x45], &[0x66, 0x41]],
    );
    assert!(n > 10_000, "only {n} inputs decoded");
}

#[test]
fn byte_sweep_32() {
    let n = sweep(Mode::X86, &[&[], &[0x66], &[0xf2], &[0xf3], &[0xf0], &[0x67], &[0x2e]]);
    assert!(n > 10_000, "only {n} inputs decoded");
}
