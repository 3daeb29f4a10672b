//! Behaviour of individual instruction families, run on a full machine.

mod common;

use emu_core::Cpu;
use zilog_z80::instruction::Behavior;
use zilog_z80::{State, CF, NF, PF, ZF};

#[test]
fn call_pushes_return_address() {
    let mut machine = common::machine(&[]);
    machine.bus_mut().load(0x1E25, &[0xCD, 0xED, 0x49]);
    let regs = machine.cpu_mut().regs_mut();
    regs.pc = 0x1E25;
    regs.sp = 0x0000;

    assert_eq!(common::run_instruction(&mut machine), 17);
    let regs = machine.cpu().regs();
    assert_eq!(regs.pc, 0x49ED);
    assert_eq!(regs.sp, 0xFFFE);
    assert_eq!(machine.bus().peek(0xFFFE), 0x28);
    assert_eq!(machine.bus().peek(0xFFFF), 0x1E);
}

#[test]
fn call_and_return() {
    // CALL 0x0010; HALT; ... 0x0010: LD A,7; RET
    let mut machine = common::machine(&[0xCD, 0x10, 0x00, 0x76]);
    machine.bus_mut().load(0x0010, &[0x3E, 0x07, 0xC9]);
    assert_eq!(common::run_until_halt(&mut machine), 17 + 7 + 10 + 4);
    let regs = machine.cpu().regs();
    assert_eq!(regs.a, 7);
    assert_eq!(regs.sp, common::STACK);
    assert_eq!(regs.pc, 0x0004);
}

#[test]
fn restart_jumps_to_page_zero() {
    let mut machine = common::machine(&[]);
    machine.bus_mut().load(0x2000, &[0xEF]);
    machine.cpu_mut().regs_mut().pc = 0x2000;
    assert_eq!(common::run_instruction(&mut machine), 11);
    assert_eq!(machine.cpu().pc(), 0x0028);
    assert_eq!(machine.bus().peek(common::STACK - 2), 0x01);
    assert_eq!(machine.bus().peek(common::STACK - 1), 0x20);
}

#[test]
fn relative_jump_backwards() {
    let mut machine = common::machine(&[]);
    // JR -4
    machine.bus_mut().load(0x0100, &[0x18, 0xFC]);
    machine.cpu_mut().regs_mut().pc = 0x0100;
    assert_eq!(common::run_instruction(&mut machine), 12);
    assert_eq!(machine.cpu().pc(), 0x00FE);
}

#[test]
fn djnz_counts_down() {
    // LD B,3; loop: INC A; DJNZ loop; HALT
    let mut machine = common::machine(&[0x06, 0x03, 0x3C, 0x10, 0xFD, 0x76]);
    let ticks = common::run_until_halt(&mut machine);
    let regs = machine.cpu().regs();
    assert_eq!(regs.a, 3);
    assert_eq!(regs.b, 0);
    assert_eq!(ticks, 7 + 3 * 4 + 2 * 13 + 8 + 4);
}

#[test]
fn jump_through_hl() {
    let mut machine = common::machine(&[0xE9]);
    machine.cpu_mut().regs_mut().set_hl(0x4321);
    assert_eq!(common::run_instruction(&mut machine), 4);
    assert_eq!(machine.cpu().pc(), 0x4321);
}

#[test]
fn push_then_pop_round_trips() {
    // LD BC,0x1234; PUSH BC; POP DE
    let mut machine = common::machine(&[0x01, 0x34, 0x12, 0xC5, 0xD1]);
    assert_eq!(common::run_instruction(&mut machine), 10);
    assert_eq!(common::run_instruction(&mut machine), 11);
    assert_eq!(machine.cpu().regs().sp, common::STACK - 2);
    assert_eq!(common::run_instruction(&mut machine), 10);
    let regs = machine.cpu().regs();
    assert_eq!(regs.de(), 0x1234);
    assert_eq!(regs.sp, common::STACK);
}

#[test]
fn push_af_keeps_every_flag_bit() {
    // PUSH AF; POP BC
    let mut machine = common::machine(&[0xF5, 0xC1]);
    let regs = machine.cpu_mut().regs_mut();
    regs.a = 0x9C;
    regs.f = 0xFF;
    common::run_instruction(&mut machine);
    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().bc(), 0x9CFF);
}

#[test]
fn exchange_with_stack_is_its_own_inverse() {
    // EX (SP),HL twice
    let mut machine = common::machine(&[0xE3, 0xE3]);
    machine.cpu_mut().regs_mut().set_hl(0x1111);
    machine.bus_mut().load(common::STACK, &[0x22, 0x33]);

    assert_eq!(common::run_instruction(&mut machine), 19);
    assert_eq!(machine.cpu().regs().hl(), 0x3322);
    assert_eq!(machine.bus().peek(common::STACK), 0x11);
    assert_eq!(machine.bus().peek(common::STACK + 1), 0x11);

    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().hl(), 0x1111);
    assert_eq!(machine.bus().peek(common::STACK), 0x22);
    assert_eq!(machine.bus().peek(common::STACK + 1), 0x33);
    assert_eq!(machine.cpu().regs().sp, common::STACK);
}

#[test]
fn register_bank_exchanges() {
    // EX AF,AF'; EXX; EX DE,HL
    let mut machine = common::machine(&[0x08, 0xD9, 0xEB]);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_af(0x1122);
    regs.set_bc(0x3344);
    regs.set_de(0x5566);
    regs.set_hl(0x7788);
    regs.a_alt = 0xAA;
    regs.f_alt = 0xBB;
    regs.h_alt = 0xCC;
    regs.l_alt = 0xDD;

    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().af(), 0xAABB);
    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().hl(), 0xCCDD);
    assert_eq!(machine.cpu().regs().h_alt, 0x77);
    assert_eq!(machine.cpu().regs().b_alt, 0x33);
    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().de(), 0xCCDD);
}

#[test]
fn ldir_copies_a_block() {
    let mut machine = common::machine(&[0xED, 0xB0]);
    let source = [0x11, 0x22, 0x33, 0x44, 0x55];
    machine.bus_mut().load(0x69A1, &source);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_hl(0x69A1);
    regs.set_de(0xD00D);
    regs.set_bc(5);

    let mut ticks = 0;
    while machine.cpu().pc() == 0 {
        ticks += common::run_instruction(&mut machine);
    }

    assert_eq!(ticks, 4 * 21 + 16);
    for (offset, &byte) in source.iter().enumerate() {
        assert_eq!(machine.bus().peek(0xD00D + offset as u16), byte);
    }
    let regs = machine.cpu().regs();
    assert_eq!(regs.bc(), 0);
    assert_eq!(regs.hl(), 0x69A6);
    assert_eq!(regs.de(), 0xD012);
    assert!(!regs.flag(PF));
}

#[test]
fn lddr_copies_downwards() {
    let mut machine = common::machine(&[0xED, 0xB8]);
    machine.bus_mut().load(0x4000, &[0xA1, 0xA2, 0xA3]);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_hl(0x4002);
    regs.set_de(0x5002);
    regs.set_bc(3);
    while machine.cpu().pc() == 0 {
        common::run_instruction(&mut machine);
    }
    assert_eq!(machine.bus().peek(0x5000), 0xA1);
    assert_eq!(machine.bus().peek(0x5002), 0xA3);
    assert_eq!(machine.cpu().regs().hl(), 0x3FFF);
}

#[test]
fn single_transfer_reports_remaining_count() {
    // LDI with BC=2 leaves P/V set
    let mut machine = common::machine(&[0xED, 0xA0]);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_hl(0x4000);
    regs.set_de(0x5000);
    regs.set_bc(2);
    common::run_instruction(&mut machine);
    assert!(machine.cpu().regs().flag(PF));
    assert!(!machine.cpu().regs().flag(NF));
}

#[test]
fn cpir_stops_on_match() {
    let mut machine = common::machine(&[0xED, 0xB1]);
    machine.bus_mut().load(0x4000, &[0x01, 0x02, 0x03, 0x42, 0x05]);
    let regs = machine.cpu_mut().regs_mut();
    regs.a = 0x42;
    regs.set_hl(0x4000);
    regs.set_bc(10);

    let mut ticks = 0;
    while machine.cpu().pc() == 0 {
        ticks += common::run_instruction(&mut machine);
    }
    assert_eq!(ticks, 3 * 21 + 16);
    let regs = machine.cpu().regs();
    assert_eq!(regs.hl(), 0x4004);
    assert_eq!(regs.bc(), 6);
    assert!(regs.flag(ZF));
    assert!(regs.flag(PF));
}

#[test]
fn cpir_stops_when_count_runs_out() {
    let mut machine = common::machine(&[0xED, 0xB1]);
    let regs = machine.cpu_mut().regs_mut();
    regs.a = 0x42;
    regs.set_hl(0x4000);
    regs.set_bc(3);
    while machine.cpu().pc() == 0 {
        common::run_instruction(&mut machine);
    }
    let regs = machine.cpu().regs();
    assert_eq!(regs.bc(), 0);
    assert!(!regs.flag(ZF));
    assert!(!regs.flag(PF));
}

#[test]
fn inir_fills_memory_from_port() {
    let mut machine = common::machine(&[0xED, 0xB2]);
    let regs = machine.cpu_mut().regs_mut();
    regs.b = 3;
    regs.c = 0x10;
    regs.set_hl(0x6000);

    let mut ticks = 0;
    while machine.cpu().pc() == 0 {
        ticks += common::run_instruction(&mut machine);
    }
    assert_eq!(ticks, 21 + 21 + 16);
    for address in 0x6000..0x6003 {
        assert_eq!(machine.bus().peek(address), 0xFF);
    }
    let regs = machine.cpu().regs();
    assert_eq!(regs.b, 0);
    assert_eq!(regs.hl(), 0x6003);
    assert!(regs.flag(ZF));
    assert!(regs.flag(NF));
}

#[test]
fn otir_sends_a_block() {
    let mut machine = common::machine(&[0xED, 0xB3]);
    machine.bus_mut().load(0x6000, &[1, 2, 3]);
    let regs = machine.cpu_mut().regs_mut();
    regs.b = 3;
    regs.c = 0x20;
    regs.set_hl(0x6000);
    while machine.cpu().pc() == 0 {
        common::run_instruction(&mut machine);
    }
    let outputs = machine.bus().outputs();
    let values: Vec<u8> = outputs.iter().map(|&(_, value)| value).collect();
    assert_eq!(values, vec![1, 2, 3]);
    assert!(outputs.iter().all(|&(port, _)| port & 0xFF == 0x20));
    assert_eq!(machine.cpu().regs().b, 0);
}

#[test]
fn block_output_always_sets_subtract() {
    // OUTI with a byte whose bit 7 is clear
    let mut machine = common::machine(&[0xED, 0xA3]);
    machine.bus_mut().load(0x6000, &[0x01]);
    let regs = machine.cpu_mut().regs_mut();
    regs.b = 2;
    regs.c = 0x20;
    regs.f = CF;
    regs.set_hl(0x6000);
    assert_eq!(common::run_instruction(&mut machine), 16);
    assert_eq!(machine.bus().outputs(), &[(0x0120, 0x01)]);
    let regs = machine.cpu().regs();
    assert!(regs.flag(NF));
    assert!(!regs.flag(ZF));
    assert!(regs.flag(CF));
    assert_eq!(regs.hl(), 0x6001);
}

#[test]
fn input_uses_accumulator_as_high_port_byte() {
    // IN A,(0xFE)
    let mut machine = common::machine(&[0xDB, 0xFE]);
    machine.cpu_mut().regs_mut().a = 0x12;
    machine.bus_mut().set_port(0x12FE, 0x5A);
    assert_eq!(common::run_instruction(&mut machine), 11);
    assert_eq!(machine.cpu().regs().a, 0x5A);
}

#[test]
fn input_through_c_sets_flags() {
    // IN D,(C)
    let mut machine = common::machine(&[0xED, 0x50]);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_bc(0x0140);
    regs.f = CF;
    machine.bus_mut().set_port(0x0140, 0x00);
    common::run_instruction(&mut machine);
    let regs = machine.cpu().regs();
    assert_eq!(regs.d, 0);
    assert!(regs.flag(ZF));
    assert!(regs.flag(PF));
    assert!(regs.flag(CF));
}

#[test]
fn output_through_c() {
    // OUT (C),E
    let mut machine = common::machine(&[0xED, 0x59]);
    let regs = machine.cpu_mut().regs_mut();
    regs.set_bc(0xBEEF);
    regs.e = 0x77;
    common::run_instruction(&mut machine);
    assert_eq!(machine.bus().outputs(), &[(0xBEEF, 0x77)]);
}

#[test]
fn digit_rotates() {
    // RLD
    let mut machine = common::machine(&[0xED, 0x6F]);
    machine.cpu_mut().regs_mut().a = 0x84;
    machine.cpu_mut().regs_mut().set_hl(0x4000);
    machine.bus_mut().poke(0x4000, 0x20);
    assert_eq!(common::run_instruction(&mut machine), 18);
    assert_eq!(machine.cpu().regs().a, 0x82);
    assert_eq!(machine.bus().peek(0x4000), 0x04);

    // RRD
    let mut machine = common::machine(&[0xED, 0x67]);
    machine.cpu_mut().regs_mut().a = 0x84;
    machine.cpu_mut().regs_mut().set_hl(0x4000);
    machine.bus_mut().poke(0x4000, 0x20);
    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().a, 0x80);
    assert_eq!(machine.bus().peek(0x4000), 0x42);
}

#[test]
fn indexed_memory_operands() {
    // LD (IX-2),0x99; INC (IX-2); LD B,(IX-2)
    let mut machine = common::machine(&[
        0xDD, 0x36, 0xFE, 0x99, //
        0xDD, 0x34, 0xFE, //
        0xDD, 0x46, 0xFE,
    ]);
    machine.cpu_mut().regs_mut().ix = 0x5002;

    assert_eq!(common::run_instruction(&mut machine), 19);
    assert_eq!(machine.bus().peek(0x5000), 0x99);
    assert_eq!(common::run_instruction(&mut machine), 23);
    assert_eq!(machine.bus().peek(0x5000), 0x9A);
    assert_eq!(common::run_instruction(&mut machine), 19);
    assert_eq!(machine.cpu().regs().b, 0x9A);
}

#[test]
fn indexed_load_keeps_plain_h() {
    // LD H,(IY+1)
    let mut machine = common::machine(&[0xFD, 0x66, 0x01]);
    machine.cpu_mut().regs_mut().iy = 0x7000;
    machine.cpu_mut().regs_mut().l = 0x34;
    machine.bus_mut().poke(0x7001, 0xAB);
    common::run_instruction(&mut machine);
    let regs = machine.cpu().regs();
    assert_eq!(regs.h, 0xAB);
    assert_eq!(regs.l, 0x34);
    assert_eq!(regs.iy, 0x7000);
}

#[test]
fn index_halves_substitute_for_h_and_l() {
    // LD IXH,0x12; LD IXL,IXH
    let mut machine = common::machine(&[0xDD, 0x26, 0x12, 0xDD, 0x6C]);
    machine.cpu_mut().regs_mut().set_hl(0xFFFF);
    common::run_instruction(&mut machine);
    common::run_instruction(&mut machine);
    let regs = machine.cpu().regs();
    assert_eq!(regs.ix, 0x1212);
    assert_eq!(regs.hl(), 0xFFFF);
}

#[test]
fn indexed_bit_group_writes_back_and_copies() {
    // SET 0,(IX+2) then RLC (IX+2),B
    let mut machine = common::machine(&[0xDD, 0xCB, 0x02, 0xC6, 0xDD, 0xCB, 0x02, 0x00]);
    machine.cpu_mut().regs_mut().ix = 0x3000;
    machine.bus_mut().poke(0x3002, 0x80);

    assert_eq!(common::run_instruction(&mut machine), 23);
    assert_eq!(machine.bus().peek(0x3002), 0x81);
    assert_eq!(common::run_instruction(&mut machine), 23);
    assert_eq!(machine.bus().peek(0x3002), 0x03);
    assert_eq!(machine.cpu().regs().b, 0x03);
    assert!(machine.cpu().regs().flag(CF));
}

#[test]
fn indexed_bit_test() {
    // BIT 3,(IY-1)
    let mut machine = common::machine(&[0xFD, 0xCB, 0xFF, 0x5E]);
    machine.cpu_mut().regs_mut().iy = 0x3001;
    machine.bus_mut().poke(0x3000, 0x08);
    assert_eq!(common::run_instruction(&mut machine), 20);
    assert!(!machine.cpu().regs().flag(ZF));
    assert_eq!(machine.cpu().pc(), 4);
}

#[test]
fn stacked_prefixes_use_the_last_one() {
    // DD FD 21 nn: LD IY,nn after a discarded DD
    let mut machine = common::machine(&[0xDD, 0xFD, 0x21, 0x34, 0x12]);
    assert_eq!(common::run_instruction(&mut machine), 18);
    let regs = machine.cpu().regs();
    assert_eq!(regs.iy, 0x1234);
    assert_eq!(regs.ix, 0);
}

#[test]
fn unknown_extended_opcode_acts_as_nop() {
    let mut machine = common::machine(&[0xED, 0x00, 0x3C]);
    assert_eq!(common::run_instruction(&mut machine), 8);
    assert_eq!(machine.cpu().pc(), 2);
    common::run_instruction(&mut machine);
    assert_eq!(machine.cpu().regs().a, 1);
}

#[test]
fn identical_runs_are_identical() {
    let program = [
        0x21, 0x00, 0x40, // LD HL,0x4000
        0x06, 0x10, // LD B,16
        0x77, // loop: LD (HL),A
        0x23, // INC HL
        0x87, // ADD A,A
        0xCE, 0x03, // ADC A,3
        0x10, 0xF9, // DJNZ loop
        0x76, // HALT
    ];
    let mut first = common::machine(&program);
    let mut second = common::machine(&program);
    let ticks = common::run_until_halt(&mut first);
    assert_eq!(common::run_until_halt(&mut second), ticks);
    assert_eq!(first.cpu().regs(), second.cpu().regs());
    for address in 0x4000..0x4010 {
        assert_eq!(first.bus().peek(address), second.bus().peek(address));
    }
}

#[test]
fn reset_instruction_replays_identically() {
    // INC BC: two internal T-states after the fetch.
    let mut instruction = zilog_z80::decode(0x0003).expect("INC BC decodes");
    let mut run = |state: &mut State| {
        instruction.reset();
        instruction.start_execution(state);
        let mut pulses = 0;
        while !instruction.is_complete() {
            instruction.clock(state);
            pulses += 1;
        }
        pulses
    };

    let mut state = State::default();
    state.regs.set_bc(0x00FF);
    assert_eq!(run(&mut state), 2);
    assert_eq!(state.regs.bc(), 0x0100);
    assert_eq!(run(&mut state), 2);
    assert_eq!(state.regs.bc(), 0x0101);
}

#[test]
fn register_only_instruction_needs_no_pulses() {
    let mut instruction = zilog_z80::decode(0x0080).expect("ADD A,B decodes");
    let mut state = State::default();
    state.regs.a = 1;
    state.regs.b = 2;
    instruction.reset();
    instruction.start_execution(&mut state);
    assert!(instruction.is_complete());
    assert_eq!(state.regs.a, 3);
    assert_eq!(instruction.mnemonic(), "ADD A,B");
}
