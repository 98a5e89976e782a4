//! A `no_std`, no-alloc video-timing driver for CRT scan-out hardware.
//!
//! This crate owns all mutable state of a video-output unit that scans a
//! framebuffer out to an NTSC, PAL or MPAL signal, and serializes every
//! configuration change against the unit's own refresh cycle so hardware
//! never observes a torn or illegal configuration.
//!
//! # Features
//!
//! - **Zero heap allocation** - All state statically sized
//! - **Shadow register mirror** - Reads never touch hardware; writes land
//!   at the next vertical blank, or immediately when the unit is idle
//! - **Nestable write batches** - Group register changes so they reach
//!   hardware together
//! - **Line-interrupt scheduling** - One hardware interrupt line
//!   multiplexed over a sorted, round-robin callback table
//! - **Border and aspect-ratio math** - Active-window clipping against the
//!   bounds the live sync configuration makes legal
//!
//! # Architecture
//!
//! Configuration flows one way, foreground to hardware, gated by the scan
//! position:
//!
//! ```text
//! ┌──────────────────┐          ┌───────────────────────────┐
//! │  Foreground      │          │  Line interrupt (ISR)     │
//! │                  │          │                           │
//! │  write_begin()   │          │  on_line_interrupt()      │
//! │  write_masked()  │─────────▶│    commit IRQ schedule    │
//! │  write_end()     │ pending  │    flush pending slots    │
//! │                  │  bits    │    field corrections      │
//! │  (idle unit:     │          │    re-arm next trigger    │
//! │   flushes now)   │          │                           │
//! └──────────────────┘          └───────────────────────────┘
//! ```
//!
//! Foreground methods mask the interrupt line for the duration of each
//! read-modify-write sequence; there is no blocking lock, because the
//! handler must never wait on one.
//!
//! # Example
//!
//! ```rust,no_run
//! use crt_timing::prelude::*;
//!
//! // Platform glue maps the register slots onto the MMIO block.
//! struct Mmio;
//! impl VideoHw for Mmio {
//!     fn read_reg(&self, reg: Reg) -> u32 {
//!         // volatile read of the slot at its hardware offset
//!         # let _ = reg; 0
//!     }
//!     fn write_reg(&mut self, reg: Reg, value: u32) {
//!         // volatile write
//!         # let _ = (reg, value);
//!     }
//! }
//!
//! let vt = VideoTiming::new(Mmio, TvStandard::Ntsc, Quirks::default());
//!
//! // Pull the picture out of the overscan and show a framebuffer.
//! vt.set_borders(Borders::uniform(12));
//! vt.present(Some(&Surface {
//!     base: 0x0010_0000,
//!     width: 320,
//!     height: 240,
//!     stride: 320,
//!     depth: ColorDepth::Bpp16,
//! }));
//!
//! // Raster-timed callback on scanline 120, from the next frame on.
//! vt.schedule_line_interrupt(120, || { /* split-screen tricks */ });
//! ```

#![deny(unsafe_code)]
#![no_std]

pub mod timing;

pub mod prelude {
    pub use crate::timing::prelude::*;
}
