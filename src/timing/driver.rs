#![allow(unsafe_code)]

//! The driver context: transactions, flush decisions, the vblank apply
//! routine and the interrupt dispatch loop.
//!
//! One [`VideoTiming`] instance owns all mutable state of one video-output
//! unit. Foreground methods take `&self` and wrap their read-modify-write
//! sequences in a critical section, because the line-interrupt handler
//! reads and writes the same mirror, masks and schedule. The handler itself
//! runs with interrupts already masked by hardware convention, so its entry
//! point skips the critical section (same split as a host/kernel shadow
//! view pair).

use core::cell::UnsafeCell;

use log::{debug, trace, warn};

use crate::timing::hw::VideoHw;
use crate::timing::irq::{LineHandler, LineIrqTable};
use crate::timing::mirror::RegisterMirror;
use crate::timing::preset::{TvStandard, VBLANK_TRIGGER};
use crate::timing::reg::{self, Reg};
use crate::timing::validate::validate;

/// Board-revision quirks, detected outside this crate like the TV standard.
#[derive(Debug, Default, Clone, Copy)]
pub struct Quirks {
    /// The cost-reduced board revision needs a shorter pixel-advance
    /// pipeline configuration.
    pub short_pixel_advance: bool,
    /// The same revision corrupts the top of the MPAL picture unless the
    /// vertical burst window alternates between two patterns every field.
    pub vburst_field_swap: bool,
}

/// Bit depth of a presented surface. The unit scans out nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Bpp16,
    Bpp32,
}

impl ColorDepth {
    /// Bytes per pixel.
    #[inline]
    pub const fn bytes(self) -> u32 {
        match self {
            ColorDepth::Bpp16 => 2,
            ColorDepth::Bpp32 => 4,
        }
    }

    #[inline]
    const fn ctrl_type(self) -> u32 {
        match self {
            ColorDepth::Bpp16 => reg::CTRL_TYPE_16_BPP,
            ColorDepth::Bpp32 => reg::CTRL_TYPE_32_BPP,
        }
    }
}

/// A pixel buffer to scan out.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    /// Physical base address. Must be 8-byte aligned.
    pub base: u32,
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in rows.
    pub height: u32,
    /// Distance between consecutive rows, in pixels.
    pub stride: u32,
    pub depth: ColorDepth,
}

/// Precomputed odd-field correction, applied directly to hardware.
///
/// Interlaced output samples the odd field half a source line further down
/// the buffer. The offset delta is folded into the YSCALE subpixel field;
/// when it overflows a full source line it carries into ORIGIN by one
/// stride instead.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FieldAdjust {
    origin_delta: u32,
    y_offset: u32,
}

fn field_adjust(mirror: &RegisterMirror) -> FieldAdjust {
    let y_scale = mirror.read(Reg::YScale);
    let step = reg::scale_step(y_scale);
    let mut off = reg::scale_offset(y_scale) + step / 2;
    let mut origin_delta = 0;
    if off >= 0x400 {
        off -= 0x400;
        let bytes = if mirror.read(Reg::Ctrl) & reg::CTRL_TYPE == reg::CTRL_TYPE_32_BPP {
            4
        } else {
            2
        };
        origin_delta = mirror.read(Reg::Width) * bytes;
    }
    FieldAdjust {
        origin_delta,
        y_offset: off & 0xFFF,
    }
}

pub(crate) struct State {
    pub(crate) mirror: RegisterMirror,
    pub(crate) standard: TvStandard,
    quirks: Quirks,
    /// Non-zero while a write batch is open; flushes are suppressed.
    txn_depth: u32,
    /// One-shot request to zero the active width at the next apply.
    pending_blank: bool,
    pub(crate) irqs: LineIrqTable,
    adjust: FieldAdjust,
}

impl State {
    pub(crate) fn begin(&mut self) {
        self.txn_depth += 1;
    }

    pub(crate) fn end(&mut self, hw: &mut impl VideoHw) {
        assert!(
            self.txn_depth > 0,
            "write_end without a matching write_begin"
        );
        self.txn_depth -= 1;
        self.maybe_flush(hw);
    }

    pub(crate) fn write_masked(&mut self, reg: Reg, mask: u32, value: u32, hw: &mut impl VideoHw) {
        self.mirror.write_masked(reg, mask, value);
        if self.txn_depth == 0 {
            self.maybe_flush(hw);
        }
    }

    /// Applies pending changes right away when the scan position is inside
    /// (or within two half-lines of entering) the non-active window.
    ///
    /// This is not just a latency optimization: a disabled unit holds its
    /// line counter at zero and never fires the interrupt, so waiting for
    /// one would hang forever.
    fn maybe_flush(&mut self, hw: &mut impl VideoHw) {
        if self.txn_depth > 0 {
            return;
        }
        let first_line = reg::v_video_start(self.mirror.read(Reg::VVideo));
        let cur = hw.read_reg(Reg::VCurrent) & !1;
        if cur < first_line.saturating_sub(2).max(2) {
            self.apply(hw);
        }
    }

    /// The vblank apply routine: flushes the mirror, honors the one-shot
    /// blank, performs the interlaced field corrections, and runs the
    /// advisory validator.
    pub(crate) fn apply(&mut self, hw: &mut impl VideoHw) {
        let written = self.mirror.flush(|r, v| hw.write_reg(r, v));

        if self.pending_blank {
            hw.write_reg(Reg::HVideo, 0);
            self.pending_blank = false;
        }

        let ctrl = self.mirror.read(Reg::Ctrl);
        if ctrl & reg::CTRL_SERRATE != 0 {
            if written.get(Reg::YScale.index())
                || written.get(Reg::Width.index())
                || written.get(Reg::Ctrl.index())
            {
                self.adjust = field_adjust(&self.mirror);
            }
            let odd_field = hw.read_reg(Reg::VCurrent) & 1 != 0;
            if odd_field {
                hw.write_reg(
                    Reg::Origin,
                    self.mirror.read(Reg::Origin).wrapping_add(self.adjust.origin_delta),
                );
                hw.write_reg(
                    Reg::YScale,
                    reg::scale_with_offset(self.mirror.read(Reg::YScale), self.adjust.y_offset),
                );
            } else {
                hw.write_reg(Reg::Origin, self.mirror.read(Reg::Origin));
                hw.write_reg(Reg::YScale, self.mirror.read(Reg::YScale));
            }

            if self.quirks.vburst_field_swap && self.standard == TvStandard::Mpal {
                let pattern = if odd_field {
                    self.standard.preset().vburst_alt
                } else {
                    self.mirror.read(Reg::VBurst)
                };
                hw.write_reg(Reg::VBurst, pattern);
            }
        }

        if written.get(Reg::Ctrl.index())
            || written.get(Reg::XScale.index())
            || written.get(Reg::YScale.index())
        {
            for d in validate(&self.mirror, self.standard) {
                warn!("{}", d.message());
            }
        }

        if written.first_index().is_some() {
            trace!("timing registers applied: {:08x?}", self.mirror.raw());
        }
    }
}

/// Driver context for one video-output unit.
///
/// Construct exactly one per unit at start-up; it stays resident for the
/// process lifetime. All configuration flows through the register mirror
/// and reaches hardware at the next safe point of the refresh cycle.
pub struct VideoTiming<H: VideoHw> {
    state: UnsafeCell<State>,
    hw: UnsafeCell<H>,
}

impl<H: VideoHw> VideoTiming<H> {
    /// Selects the preset for `standard`, programs the fixed timing
    /// registers, and arms the vblank entry of the interrupt schedule.
    ///
    /// The unit may be disabled at this point, so the initial programming
    /// happens through the immediate-apply path rather than waiting for an
    /// interrupt that would never fire.
    pub fn new(hw: H, standard: TvStandard, quirks: Quirks) -> Self {
        let preset = standard.preset();
        let state = State {
            mirror: RegisterMirror::from_preset(preset),
            standard,
            quirks,
            txn_depth: 0,
            pending_blank: false,
            irqs: LineIrqTable::new(),
            adjust: FieldAdjust::default(),
        };
        let vt = Self {
            state: UnsafeCell::new(state),
            hw: UnsafeCell::new(hw),
        };
        vt.with_state(|state, hw| {
            state.begin();
            let advance = if quirks.short_pixel_advance {
                reg::CTRL_PIXEL_ADVANCE_SHORT
            } else {
                reg::CTRL_PIXEL_ADVANCE_DEFAULT
            };
            state.write_masked(Reg::Ctrl, reg::CTRL_PIXEL_ADVANCE, advance, hw);
            state.end(hw);
            hw.write_reg(Reg::VIntr, VBLANK_TRIGGER as u32);
        });
        debug!("video timing initialized for {standard:?}");
        vt
    }

    /// Runs `f` on the driver state inside a critical section.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut State, &mut H) -> R) -> R {
        critical_section::with(|_| {
            let state = unsafe { &mut *self.state.get() };
            let hw = unsafe { &mut *self.hw.get() };
            f(state, hw)
        })
    }

    /// Current value of a slot, including changes still pending.
    pub fn read(&self, reg: Reg) -> u32 {
        self.with_state(|state, _| state.mirror.read(reg))
    }

    /// Writes a whole slot. Applied at the next safe point, or immediately
    /// when the unit is outside its active window.
    pub fn write(&self, reg: Reg, value: u32) {
        self.write_masked(reg, !0, value);
    }

    /// Writes the masked bits of a slot, leaving the rest untouched.
    ///
    /// # Panics
    /// Panics if `value` carries bits outside `mask`, or when targeting the
    /// line counter or the interrupt trigger.
    pub fn write_masked(&self, reg: Reg, mask: u32, value: u32) {
        self.with_state(|state, hw| state.write_masked(reg, mask, value, hw));
    }

    /// Opens a write batch; nested batches are allowed. Nothing reaches
    /// hardware until the outermost batch closes.
    pub fn write_begin(&self) {
        self.with_state(|state, _| state.begin());
    }

    /// Closes a write batch, flushing when this was the outermost one and
    /// the unit is currently outside its active window.
    ///
    /// # Panics
    /// Panics without a matching [`write_begin`](Self::write_begin).
    pub fn write_end(&self) {
        self.with_state(|state, hw| state.end(hw));
    }

    /// Runs `f` inside a write batch.
    pub fn update<R>(&self, f: impl FnOnce() -> R) -> R {
        self.write_begin();
        let r = f();
        self.write_end();
        r
    }

    /// Configures scan-out of `surface`, stretching it across the current
    /// output window; `None` blanks the output signal content.
    ///
    /// # Panics
    /// Panics when the base address or the stride is not 8-byte aligned,
    /// or when the stride is narrower than the visible width.
    pub fn present(&self, surface: Option<&Surface>) {
        let Some(fb) = surface else {
            self.with_state(|state, hw| {
                state.begin();
                state.write_masked(Reg::Origin, !0, 0, hw);
                state.write_masked(Reg::Width, !0, 0, hw);
                state.write_masked(Reg::Ctrl, reg::CTRL_TYPE, reg::CTRL_TYPE_BLANK, hw);
                state.end(hw);
            });
            return;
        };

        assert!(
            fb.base % 8 == 0,
            "surface base {:#010x} is not 8-byte aligned",
            fb.base
        );
        assert!(
            (fb.stride * fb.depth.bytes()) % 8 == 0,
            "surface stride of {} pixels is not 8-byte aligned",
            fb.stride
        );
        assert!(
            fb.stride >= fb.width,
            "surface stride {} is narrower than its width {}",
            fb.stride,
            fb.width
        );

        self.with_state(|state, hw| {
            state.begin();
            state.write_masked(Reg::Origin, !0, fb.base, hw);
            state.write_masked(Reg::Width, !0, fb.stride, hw);
            state.write_masked(Reg::Ctrl, reg::CTRL_TYPE, fb.depth.ctrl_type(), hw);

            let h_video = state.mirror.read(Reg::HVideo);
            let v_video = state.mirror.read(Reg::VVideo);
            let out_w = reg::h_video_end(h_video) - reg::h_video_start(h_video);
            let out_h = reg::v_video_end(v_video) - reg::v_video_start(v_video);
            state.write_masked(
                Reg::XScale,
                0xFFF,
                reg::x_scale_set(fb.width, out_w),
                hw,
            );
            state.write_masked(
                Reg::YScale,
                0xFFF,
                reg::y_scale_set(fb.height, out_h / 2),
                hw,
            );
            state.end(hw);
        });
    }

    /// Switches between interlaced and progressive scan-out. Interlaced
    /// frames drop one half-line from the scan total.
    pub fn set_interlaced(&self, interlaced: bool) {
        self.with_state(|state, hw| {
            state.begin();
            state.write_masked(
                Reg::Ctrl,
                reg::CTRL_SERRATE,
                if interlaced { reg::CTRL_SERRATE } else { 0 },
                hw,
            );
            state.write_masked(Reg::VSync, 0x1, if interlaced { 0 } else { 1 }, hw);
            state.end(hw);
        });
    }

    /// `true` requests a one-shot blank: the active width register is
    /// forced to zero at exactly the next apply. `false` restores the
    /// mirrored window.
    pub fn blank(&self, blank: bool) {
        self.with_state(|state, hw| {
            if blank {
                state.pending_blank = true;
            } else {
                let v = state.mirror.read(Reg::HVideo);
                state.write_masked(Reg::HVideo, !0, v, hw);
            }
        });
    }

    /// Opts a slot in or out of per-frame reassertion. Stabilized slots are
    /// rewritten at every vblank even when unchanged, so raster effects
    /// that poke hardware mid-frame survive the flush.
    pub fn stabilize(&self, reg: Reg, on: bool) {
        self.with_state(|state, _| state.mirror.set_stabilized(reg, on));
    }

    /// Schedules `callback` to run when the scan reaches `line`.
    ///
    /// The change takes effect at the next frame boundary; the schedule the
    /// interrupt handler is walking right now is never disturbed.
    ///
    /// # Panics
    /// Panics on line 0 (reserved), a line outside the frame, a line that is
    /// already scheduled, or a full table.
    pub fn schedule_line_interrupt(&self, line: u16, callback: fn()) {
        self.with_state(|state, _| {
            let trigger = biased_trigger(state, line);
            state.irqs.schedule(trigger, LineHandler::Raster(callback));
        });
    }

    /// Cancels the interrupt scheduled on `line`, effective from the next
    /// frame boundary.
    ///
    /// # Panics
    /// Panics when nothing is scheduled on `line`.
    pub fn cancel_line_interrupt(&self, line: u16) {
        self.with_state(|state, _| {
            let trigger = biased_trigger(state, line);
            state.irqs.cancel(trigger);
        });
    }

    /// Blocks until the scan enters the vertical blanking region.
    ///
    /// Busy-polls the live line counter with no timeout; returns
    /// immediately when the output is blanked (the counter would never
    /// move).
    pub fn wait_vblank(&self) {
        let blanked = self.with_state(|state, _| {
            state.mirror.read(Reg::Ctrl) & reg::CTRL_TYPE == reg::CTRL_TYPE_BLANK
        });
        if blanked {
            return;
        }
        loop {
            // One short critical section per poll so the interrupt line
            // stays serviceable while we spin.
            let cur = self.with_state(|_, hw| hw.read_reg(Reg::VCurrent));
            if cur & !1 == VBLANK_TRIGGER as u32 {
                return;
            }
            core::hint::spin_loop();
        }
    }

    /// Refresh rate in Hz, derived from the live sync configuration.
    ///
    /// Normally close to 50 (PAL) or 60 (NTSC/MPAL), but advanced
    /// configurations shift it, so it is computed rather than stored.
    pub fn refresh_rate(&self) -> f32 {
        self.with_state(|state, _| {
            let clock = state.standard.preset().clock_hz;
            let h_sync = state.mirror.read(Reg::HSync);
            let period = reg::h_sync_period(h_sync);
            let total = reg::v_sync_total(state.mirror.read(Reg::VSync));
            let leap = state.mirror.read(Reg::HSyncLeap);
            let leap_bits = reg::h_sync_leap_pattern(h_sync).count_ones();
            let leap_avg = (reg::h_sync_leap_a(leap) * leap_bits
                + reg::h_sync_leap_b(leap) * (5 - leap_bits))
                / 5;
            clock as f32 / (period * (total - 2) / 2 + leap_avg) as f32
        })
    }

    /// Line-interrupt entry point.
    ///
    /// Runs the armed callback, advances the schedule round-robin, re-arms
    /// the trigger register for the next entry and acknowledges the
    /// interrupt. The re-arm happens unconditionally: callback edits only
    /// ever reach the shadow schedule, never the table being walked.
    ///
    /// # Safety
    /// Must be called from the unit's line-interrupt handler, with
    /// interrupts already masked and no nesting of handlers.
    pub unsafe fn on_line_interrupt(&self) {
        // Commit staged schedule edits at the frame boundary, then decide
        // what to dispatch. No state borrow survives into the callback:
        // callbacks are allowed to call back into the foreground API.
        let handler = {
            let state = unsafe { &mut *self.state.get() };
            if state.irqs.at_head() && state.txn_depth == 0 {
                state.irqs.commit();
            }
            state.irqs.current().handler
        };

        match handler {
            LineHandler::VblankApply => {
                let state = unsafe { &mut *self.state.get() };
                let hw = unsafe { &mut *self.hw.get() };
                // A larger write is ongoing; its registers land together at
                // a later vblank.
                if state.txn_depth == 0 {
                    state.apply(hw);
                }
            }
            LineHandler::Raster(f) => f(),
        }

        let state = unsafe { &mut *self.state.get() };
        let hw = unsafe { &mut *self.hw.get() };
        let next = state.irqs.advance();
        hw.write_reg(Reg::VIntr, next as u32);
        hw.write_reg(Reg::VCurrent, 0);
    }
}

#[cfg(test)]
impl<H: VideoHw> VideoTiming<H> {
    /// Direct access to the hardware double, for test assertions.
    pub(crate) fn with_hw<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.with_state(|_, hw| f(hw))
    }
}

/// Converts a visible scanline into the armed half-line trigger: doubled
/// into half-line units, plus the forced odd bit the counting convention
/// requires of mid-frame triggers (it also makes the trigger fire in both
/// fields of an interlaced frame).
fn biased_trigger(state: &State, line: u16) -> u16 {
    assert!(line >= 1, "line 0 is reserved");
    let trigger = ((line as u32) << 1) | 1;
    let total = reg::v_sync_total(state.mirror.read(Reg::VSync));
    assert!(
        trigger < total,
        "line {line} is outside the frame ({total} half-lines)"
    );
    trigger as u16
}
