#![allow(unsafe_code)]

//! Test support utilities - only compiled in test builds.

use heapless::Vec;

use crate::timing::driver::{Quirks, VideoTiming};
use crate::timing::hw::VideoHw;
use crate::timing::preset::TvStandard;
use crate::timing::reg::{REG_COUNT, Reg};

/// Hardware double that records every register write in program order.
pub struct RecordingHw {
    pub regs: [u32; REG_COUNT],
    pub writes: Vec<(Reg, u32), 128>,
}

impl RecordingHw {
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            writes: Vec::new(),
        }
    }
}

impl Default for RecordingHw {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoHw for RecordingHw {
    fn read_reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    fn write_reg(&mut self, reg: Reg, value: u32) {
        if self.writes.push((reg, value)).is_err() {
            panic!("write log full");
        }
        // The line counter is free-running; writing it only acknowledges
        // the interrupt. Keeping the test-set value makes scan positions
        // stable across dispatches.
        if reg != Reg::VCurrent {
            self.regs[reg.index()] = value;
        }
    }
}

/// A driver over a recording double, standard board.
pub fn test_driver(standard: TvStandard) -> VideoTiming<RecordingHw> {
    VideoTiming::new(RecordingHw::new(), standard, Quirks::default())
}

/// Parks the simulated scan position on a half-line.
pub fn set_scan_pos(vt: &VideoTiming<RecordingHw>, half_line: u32) {
    vt.with_hw(|hw| hw.regs[Reg::VCurrent.index()] = half_line);
}

/// All values written to one register, in order.
pub fn writes_to(vt: &VideoTiming<RecordingHw>, reg: Reg) -> Vec<u32, 128> {
    vt.with_hw(|hw| {
        hw.writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    })
}

/// Simulates one firing of the line interrupt.
pub fn fire(vt: &VideoTiming<RecordingHw>) {
    unsafe { vt.on_line_interrupt() }
}
