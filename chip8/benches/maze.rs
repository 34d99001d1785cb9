use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::prelude::*;

/// Maze generator that finishes on a jump to itself.
#[rustfmt::skip]
const MAZE: &[u8] = &[
    0x60, 0x00, 0x61, 0x00, 0xA2, 0x22, 0xC2, 0x01,
    0x32, 0x01, 0xA2, 0x1E, 0xD0, 0x14, 0x70, 0x04,
    0x30, 0x40, 0x12, 0x04, 0x60, 0x00, 0x71, 0x04,
    0x31, 0x20, 0x12, 0x04, 0x12, 0x1C, 0x80, 0x40,
    0x20, 0x10, 0x20, 0x40, 0x80, 0x10,
];

fn criterion_benchmark(c: &mut Criterion) {
    {
        let mut vm = Chip8Vm::new(Chip8Conf {
            rng_seed: Some(1),
            ..Default::default()
        });
        vm.load_bytecode(MAZE).unwrap();

        c.bench_function("maze bytecode", |b| {
            b.iter(|| {
                vm.reset();
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }

    {
        let mut buf = String::with_capacity(1024);

        c.bench_function("maze disassembly", |b| {
            b.iter(|| {
                buf.clear();
                black_box(Disassembler::new(black_box(MAZE)).disassemble(&mut buf))
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
