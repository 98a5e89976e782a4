//! Interrupt loop example: simulating the refresh cycle on a host machine
//!
//! This example demonstrates:
//! - A driver instance over a simulated register block
//! - Border and aspect-ratio math against the NTSC preset
//! - A raster callback multiplexed onto the vblank interrupt line
//! - The shadow schedule committing at the frame boundary

use crt_timing::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

struct SimHw {
    regs: [u32; REG_COUNT],
}

impl VideoHw for SimHw {
    fn read_reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    fn write_reg(&mut self, reg: Reg, value: u32) {
        // The line counter is free-running on real hardware; a write only
        // acknowledges the interrupt.
        if reg != Reg::VCurrent {
            self.regs[reg.index()] = value;
        }
    }
}

static RASTER_HITS: AtomicU32 = AtomicU32::new(0);

fn raster_callback() {
    RASTER_HITS.fetch_add(1, Ordering::Relaxed);
}

fn main() {
    println!("=== Video Timing Simulation ===\n");

    let hw = SimHw {
        regs: [0; REG_COUNT],
    };
    let vt = VideoTiming::new(hw, TvStandard::Ntsc, Quirks::default());

    println!("refresh rate:  {:.2} Hz", vt.refresh_rate());
    println!("legal bounds:  {:?}", vt.output_bounds());

    // A 16:9 window with a 5% overscan margin.
    vt.set_borders(vt.calc_borders(16.0 / 9.0, 0.05));
    println!("16:9 window:   {:?}", vt.output());
    println!("as borders:    {:?}\n", vt.borders());

    vt.present(Some(&Surface {
        base: 0x0010_0000,
        width: 320,
        height: 240,
        stride: 320,
        depth: ColorDepth::Bpp16,
    }));

    // Fires on scanline 120 of every frame, starting with the next one.
    vt.schedule_line_interrupt(120, raster_callback);

    // Drive the interrupt line by hand. The schedule holds only the vblank
    // entry during the first frame; the raster entry goes live at the
    // boundary firing.
    unsafe { vt.on_line_interrupt() };
    for frame in 1..=3 {
        unsafe { vt.on_line_interrupt() }; // scanline 120
        unsafe { vt.on_line_interrupt() }; // vblank, next frame boundary
        println!(
            "frame {frame}: raster callback ran {} time(s)",
            RASTER_HITS.load(Ordering::Relaxed)
        );
    }

    println!("\nSimulation complete");
}
