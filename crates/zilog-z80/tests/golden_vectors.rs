//! Hand-checked single-instruction vectors.
//!
//! Each case in `data/golden.json` gives the register file and the RAM
//! bytes that matter before one instruction, the same after it, and the
//! T-states it takes. Final RAM lists only the bytes to check.

use emu_core::{Cpu, SimpleBus};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use zilog_z80::{Machine, Registers};

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    cycles: u64,
}

#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    sp: u16,
    a: u8,
    f: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    iff1: u8,
    iff2: u8,
    im: u8,
    ram: Vec<(u16, u8)>,
}

fn setup(state: &CpuState) -> Machine<SimpleBus> {
    let mut bus = SimpleBus::new();
    for &(address, value) in &state.ram {
        bus.poke(address, value);
    }
    let mut machine = Machine::new(bus);
    let regs = machine.cpu_mut().regs_mut();
    regs.pc = state.pc;
    regs.sp = state.sp;
    regs.a = state.a;
    regs.f = state.f;
    regs.b = state.b;
    regs.c = state.c;
    regs.d = state.d;
    regs.e = state.e;
    regs.h = state.h;
    regs.l = state.l;
    regs.i = state.i;
    regs.r = state.r;
    regs.ix = state.ix;
    regs.iy = state.iy;
    regs.iff1 = state.iff1 != 0;
    regs.iff2 = state.iff2 != 0;
    regs.im = state.im;
    machine
}

fn check_u8(errors: &mut Vec<String>, name: &str, actual: u8, expected: u8) {
    if actual != expected {
        errors.push(format!("{name}: got {actual:02X}, want {expected:02X}"));
    }
}

fn check_u16(errors: &mut Vec<String>, name: &str, actual: u16, expected: u16) {
    if actual != expected {
        errors.push(format!("{name}: got {actual:04X}, want {expected:04X}"));
    }
}

fn compare(regs: &Registers, bus: &SimpleBus, want: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    check_u16(&mut errors, "PC", regs.pc, want.pc);
    check_u16(&mut errors, "SP", regs.sp, want.sp);
    check_u8(&mut errors, "A", regs.a, want.a);
    check_u8(&mut errors, "F", regs.f, want.f);
    check_u8(&mut errors, "B", regs.b, want.b);
    check_u8(&mut errors, "C", regs.c, want.c);
    check_u8(&mut errors, "D", regs.d, want.d);
    check_u8(&mut errors, "E", regs.e, want.e);
    check_u8(&mut errors, "H", regs.h, want.h);
    check_u8(&mut errors, "L", regs.l, want.l);
    check_u8(&mut errors, "I", regs.i, want.i);
    check_u8(&mut errors, "R", regs.r, want.r);
    check_u16(&mut errors, "IX", regs.ix, want.ix);
    check_u16(&mut errors, "IY", regs.iy, want.iy);
    check_u8(&mut errors, "IFF1", u8::from(regs.iff1), want.iff1);
    check_u8(&mut errors, "IFF2", u8::from(regs.iff2), want.iff2);
    check_u8(&mut errors, "IM", regs.im, want.im);
    for &(address, value) in &want.ram {
        check_u8(&mut errors, &format!("RAM[{address:04X}]"), bus.peek(address), value);
    }
    errors
}

#[test]
fn golden_vectors() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/golden.json");
    let text = fs::read_to_string(&path).expect("golden vectors present");
    let cases: Vec<TestCase> = serde_json::from_str(&text).expect("golden vectors parse");
    assert!(!cases.is_empty());

    let mut failures = Vec::new();
    for case in &cases {
        let mut machine = setup(&case.initial);
        let ticks = machine.step().get();
        let mut errors = compare(&machine.cpu().registers(), machine.bus(), &case.final_state);
        if ticks != case.cycles {
            errors.push(format!("cycles: got {ticks}, want {}", case.cycles));
        }
        if !errors.is_empty() {
            failures.push(format!("{}: {}", case.name, errors.join("; ")));
        }
    }

    assert!(failures.is_empty(), "{}", failures.join("\n"));
}
