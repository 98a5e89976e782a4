//! Per-standard timing presets.
//!
//! Each TV standard comes with an immutable register preset: pixel clock,
//! scan totals, sync and burst timing, and the default active-display
//! window. Presets are the starting point for the mirror at start-up and
//! the reference that border offsets are expressed against.

use crate::timing::reg::{self, REG_COUNT, Reg};

/// Detected TV standard of the attached display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvStandard {
    Pal,
    Ntsc,
    Mpal,
}

impl TvStandard {
    /// The immutable timing preset for this standard.
    pub const fn preset(self) -> &'static Preset {
        match self {
            TvStandard::Pal => &PAL,
            TvStandard::Ntsc => &NTSC,
            TvStandard::Mpal => &MPAL,
        }
    }

    /// Size of the virtual display output the resampler targets.
    ///
    /// Both sizes have a 4:3 display aspect ratio on their respective
    /// standards, so a framebuffer looks the same on all of them.
    pub const fn virtual_output(self) -> (i32, i32) {
        match self {
            TvStandard::Pal => (640, 576),
            TvStandard::Ntsc | TvStandard::Mpal => (640, 480),
        }
    }
}

/// Immutable per-standard timing constants.
pub struct Preset {
    pub standard: TvStandard,
    /// Pixel clock in Hz; refresh rate is derived from this and the sync
    /// registers, never stored.
    pub clock_hz: u32,
    /// Register values programmed at start-up.
    pub regs: [u32; REG_COUNT],
    /// Alternate VBURST pattern for the field-swap erratum workaround.
    /// Equals the preset pattern on standards without the erratum.
    pub vburst_alt: u32,
}

impl Preset {
    /// Default active-display window `(x0, y0, x1, y1)`.
    pub(crate) fn default_window(&self) -> (i32, i32, i32, i32) {
        let h = self.regs[Reg::HVideo.index()];
        let v = self.regs[Reg::VVideo.index()];
        (
            reg::h_video_start(h) as i32,
            reg::v_video_start(v) as i32,
            reg::h_video_end(h) as i32,
            reg::v_video_end(v) as i32,
        )
    }
}

/// Half-line armed as the enter-vblank trigger. Architecturally fixed.
pub(crate) const VBLANK_TRIGGER: u16 = 2;

pub static NTSC: Preset = Preset {
    standard: TvStandard::Ntsc,
    clock_hz: 48_681_818,
    regs: [
        0,
        0,
        0,
        VBLANK_TRIGGER as u32,
        0,
        reg::burst_set(62, 5, 34, 57),
        reg::v_sync_set(525),
        reg::h_sync_set(0b00000, 3093),
        reg::h_sync_leap_set(3093, 3093),
        reg::h_video_set(108, 748),
        reg::v_video_set(35, 515),
        reg::v_burst_set(14, 516),
        reg::x_scale_set(0, 640),
        reg::y_scale_set(0, 240),
    ],
    vburst_alt: reg::v_burst_set(14, 516),
};

pub static PAL: Preset = Preset {
    standard: TvStandard::Pal,
    clock_hz: 49_656_530,
    regs: [
        0,
        0,
        0,
        VBLANK_TRIGGER as u32,
        0,
        reg::burst_set(64, 4, 35, 58),
        reg::v_sync_set(625),
        reg::h_sync_set(0b10101, 3177),
        reg::h_sync_leap_set(3183, 3182),
        reg::h_video_set(128, 768),
        reg::v_video_set(45, 621),
        reg::v_burst_set(9, 619),
        reg::x_scale_set(0, 640),
        reg::y_scale_set(0, 288),
    ],
    vburst_alt: reg::v_burst_set(9, 619),
};

pub static MPAL: Preset = Preset {
    standard: TvStandard::Mpal,
    clock_hz: 48_628_322,
    regs: [
        0,
        0,
        0,
        VBLANK_TRIGGER as u32,
        0,
        reg::burst_set(70, 5, 30, 57),
        reg::v_sync_set(525),
        reg::h_sync_set(0b00100, 3089),
        reg::h_sync_leap_set(3097, 3098),
        reg::h_video_set(108, 748),
        reg::v_video_set(37, 511),
        reg::v_burst_set(14, 516),
        reg::x_scale_set(0, 640),
        reg::y_scale_set(0, 240),
    ],
    // Known-good alternate pattern; the affected board revision corrupts
    // the top of the MPAL picture unless VBURST alternates between fields.
    vburst_alt: reg::v_burst_set(11, 514),
};
