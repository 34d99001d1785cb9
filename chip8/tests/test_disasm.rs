use chip8::prelude::*;

/// Maze generator, drawing random diagonal lines until the screen is full.
#[rustfmt::skip]
const MAZE: &[u8] = &[
    0x60, 0x00, 0x61, 0x00, 0xA2, 0x22, 0xC2, 0x01,
    0x32, 0x01, 0xA2, 0x1E, 0xD0, 0x14, 0x70, 0x04,
    0x30, 0x40, 0x12, 0x04, 0x60, 0x00, 0x71, 0x04,
    0x31, 0x20, 0x12, 0x04, 0x12, 0x1C, 0x80, 0x40,
    0x20, 0x10, 0x20, 0x40, 0x80, 0x10,
];

#[test]
fn test_disassemble_maze() {
    let mut buf = String::new();
    Disassembler::new(MAZE).disassemble(&mut buf).unwrap();
    println!("{buf}");

    let lines: Vec<&str> = buf.lines().collect();
    assert_eq!(lines.len(), MAZE.len() / 2);
    assert_eq!(lines[0], "0x0200 6000 LD v0, 0x00");
    assert_eq!(lines[2], "0x0204 A222 LD I, 0x222");
    assert_eq!(lines[3], "0x0206 C201 RND v2, 0x01");
    assert_eq!(lines[6], "0x020C D014 DRW v0, v1, 4");
    assert_eq!(lines[14], "0x021C 121C JP 0x21C");

    // Sprite data is listed as whatever it decodes to.
    assert_eq!(lines[15], "0x021E 8040 LD v0, v4");
    assert_eq!(lines[18], "0x0224 8010 LD v0, v1");
}

#[test]
fn test_disassemble_unknown_words() {
    let mut buf = String::new();
    Disassembler::new(&[0xFF, 0xFF, 0x51, 0x21]).disassemble(&mut buf).unwrap();

    let lines: Vec<&str> = buf.lines().collect();
    assert_eq!(lines[0], "0x0200 FFFF 0b11111111 0b11111111");
    assert_eq!(lines[1], "0x0202 5121 0b01010001 0b00100001");
}

#[test]
fn test_disassembler_iter_decodes() {
    let ops: Vec<Option<Op>> = Disassembler::new(MAZE).map(|instr| instr.op).take(3).collect();
    assert_eq!(
        ops,
        vec![
            Some(Op::Load_Byte { vx: 0, nn: 0 }),
            Some(Op::Load_Byte { vx: 1, nn: 0 }),
            Some(Op::Load_Address { address: 0x222 }),
        ]
    );
}

#[test]
fn test_maze_runs() {
    let mut vm = Chip8Vm::new(Chip8Conf {
        rng_seed: Some(7),
        ..Default::default()
    });
    vm.load_bytecode(MAZE).unwrap();

    // 8 cells per row, 8 rows; loop ends on JP to self.
    vm.run_steps(5_000).unwrap();
    assert_eq!(vm.pc(), 0x21C);
    assert!(!vm.is_halted());

    // Every 4x4 cell holds exactly one diagonal of 4 pixels.
    let lit = vm.display_buffer().iter().filter(|px| **px).count();
    assert_eq!(lit, 16 * 8 * 4);
}
