//! Performance benchmarks for `x86_codec`.
//!
//! Measures:
//! - Single instruction decode and encode latency
//! - Decode throughput over a mixed code buffer (full vs. fast decoder)
//! - Encoder template search for legacy, VEX and EVEX forms
//! - Block layout and byte-wise relocation
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use x86_codec::{
    copy_and_re_relativize, decode, encode_instruction, encode_to_vec, fast, Block, Condition,
    Context, DecodeIter, Instruction, MemRef, Mode, Opcode, Operand, Register,
};

// ─── Inputs ───────────────────────────────────────────────────────────────────

/// A representative mix of 64-bit encodings.
const MIX: &[&[u8]] = &[
    &[0x55],
    &[0x48, 0x89, 0xe5],
    &[0x48, 0x83, 0xec, 0x20],
    &[0x8b, 0x44, 0x8b, 0x08],
    &[0x48, 0x8b, 0x05, 0x10, 0x00, 0x00, 0x00],
    &[0xf0, 0x01, 0x08],
    &[0xe8, 0x00, 0x00, 0x00, 0x00],
    &[0x74, 0x10],
    &[0xc5, 0xf0, 0x58, 0xc2],
    &[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01],
    &[0xf3, 0x0f, 0x10, 0xc1],
    &[0x5d],
    &[0xc3],
];

/// Concatenate the mix until the buffer holds at least `n` bytes.
fn gen_code(n: usize) -> Vec<u8> {
    let mut code = Vec::with_capacity(n + 16);
    while code.len() < n {
        for insn in MIX {
            code.extend_from_slice(insn);
        }
    }
    code
}

fn reg(r: Register) -> Operand {
    Operand::Reg(r)
}

// ─── Single-Instruction Latency ──────────────────────────────────────────────

fn bench_single_instruction(c: &mut Criterion) {
    let ctx = Context::x64();
    let mut group = c.benchmark_group("single_instruction");

    group.bench_function("decode_mov_reg_reg", |b| {
        b.iter(|| decode(black_box(&[0x48, 0x89, 0xc8]), ctx, 0x1000).unwrap())
    });

    group.bench_function("decode_mov_sib", |b| {
        b.iter(|| decode(black_box(&[0x8b, 0x44, 0x8b, 0x08]), ctx, 0x1000).unwrap())
    });

    group.bench_function("decode_evex", |b| {
        b.iter(|| {
            decode(black_box(&[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01]), ctx, 0x1000).unwrap()
        })
    });

    group.bench_function("fast_length_evex", |b| {
        b.iter(|| fast::length(black_box(&[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x01]), ctx).unwrap())
    });

    let mov = Instruction::mov(reg(Register::RAX), reg(Register::RBX));
    group.bench_function("encode_mov_reg_reg", |b| {
        b.iter(|| encode_to_vec(black_box(&mov), ctx, 0x1000).unwrap())
    });

    let store = Instruction::mov(
        Operand::Mem(MemRef::new(Some(Register::RAX), Some(Register::RCX), 8, 0x10, 8).unwrap()),
        reg(Register::RDX),
    );
    group.bench_function("encode_mov_mem", |b| {
        b.iter(|| encode_to_vec(black_box(&store), ctx, 0x1000).unwrap())
    });

    let vex = Instruction::with_operands(
        Opcode::Vaddps,
        &[reg(Register::ymm(0))],
        &[reg(Register::ymm(1)), reg(Register::ymm(2))],
    );
    group.bench_function("encode_vaddps_avx", |b| {
        b.iter(|| encode_instruction(black_box(&vex), ctx).unwrap())
    });

    let evex = Instruction::with_operands(
        Opcode::Vaddps,
        &[reg(Register::zmm(0))],
        &[reg(Register::k(1)), reg(Register::zmm(1)), reg(Register::zmm(2))],
    );
    group.bench_function("encode_vaddps_avx512", |b| {
        b.iter(|| encode_instruction(black_box(&evex), ctx).unwrap())
    });

    group.finish();
}

// ─── Decode Throughput ────────────────────────────────────────────────────────

fn bench_decode_throughput(c: &mut Criterion) {
    let ctx = Context::x64();
    let mut group = c.benchmark_group("decode_throughput");

    for size in [1024usize, 16 * 1024] {
        let code = gen_code(size);
        group.throughput(Throughput::Bytes(code.len() as u64));

        group.bench_function(format!("full_{size}"), |b| {
            b.iter(|| {
                DecodeIter::new(black_box(&code), ctx, 0x40_0000)
                    .map(|r| r.unwrap())
                    .count()
            })
        });

        group.bench_function(format!("fast_{size}"), |b| {
            b.iter(|| {
                let mut at = 0;
                let mut n = 0;
                while at < code.len() {
                    at += fast::length(black_box(&code[at..]), ctx).unwrap();
                    n += 1;
                }
                n
            })
        });
    }

    group.finish();
}

// ─── Linking and Relocation ───────────────────────────────────────────────────

/// A block of `n` instructions with a backward branch every eighth slot.
fn gen_block(n: usize) -> Block {
    let mut block = Block::new();
    for i in 0..n {
        let insn = match i % 8 {
            7 => Instruction::jcc(Condition::NZ, Operand::Instr(i - 7)),
            3 => Instruction::push(Mode::X64, Register::R12),
            5 => Instruction::pop(Mode::X64, Register::R12),
            _ => Instruction::binary(Opcode::Add, reg(Register::RAX), reg(Register::RCX)),
        };
        block.push(insn);
    }
    block
}

fn bench_linking(c: &mut Criterion) {
    let ctx = Context::x64();
    let mut group = c.benchmark_group("linking");

    for n in [100usize, 1000] {
        let block = gen_block(n);
        group.bench_function(format!("block_{n}_insn"), |b| {
            b.iter(|| black_box(&block).encode(ctx, 0x40_0000).unwrap())
        });
    }

    let code = gen_code(16 * 1024);
    group.throughput(Throughput::Bytes(code.len() as u64));
    // A short move keeps the 8-bit branches in the mix within reach.
    group.bench_function("relocate_16k", |b| {
        let mut out = vec![0u8; code.len()];
        b.iter(|| {
            let mut at = 0;
            while at < code.len() {
                at += copy_and_re_relativize(
                    &code[at..],
                    ctx,
                    0x40_0000 + at as u64,
                    0x40_0040 + at as u64,
                    &mut out[at..],
                )
                .unwrap();
            }
            black_box(&out);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_instruction, bench_decode_throughput, bench_linking);
criterion_main!(benches);
