//! Output-window and border model.
//!
//! The active display window is a rectangle in hardware dot coordinates,
//! clipped against the bounds the current sync configuration makes legal.
//! Borders are a derived view of the same rectangle: signed offsets from
//! the preset's default window, positive shrinking it, negative growing it.

use crate::timing::driver::VideoTiming;
use crate::timing::hw::VideoHw;
use crate::timing::mirror::RegisterMirror;
use crate::timing::preset::TvStandard;
use crate::timing::reg::{self, Reg};

/// Signed offsets from the preset's default display window, in dots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Borders {
    pub left: i16,
    pub right: i16,
    pub up: i16,
    pub down: i16,
}

impl Borders {
    /// The same border thickness on all four edges.
    pub const fn uniform(b: i16) -> Self {
        Self {
            left: b,
            right: b,
            up: b,
            down: b,
        }
    }
}

/// A rectangle in hardware dot coordinates, `x1`/`y1` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x0: 0,
        y0: 0,
        x1: 0,
        y1: 0,
    };

    pub const fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub const fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// Borders achieving `aspect_ratio` plus a proportional overscan margin.
///
/// The margin is a fraction of the virtual display output; 0.05 is a good
/// default for CRTs. The aspect correction lands on whichever border pair
/// the target ratio calls for, after comparing it against the standard's
/// native pixel aspect.
pub fn calc_borders(standard: TvStandard, aspect_ratio: f32, overscan_margin: f32) -> Borders {
    let (out_w, out_h) = standard.virtual_output();
    let par = out_w as f32 / out_h as f32;
    let dar = 4.0 / 3.0;
    let correction = (aspect_ratio / dar) * par;

    let mut b = Borders {
        left: (out_w as f32 * overscan_margin) as i16,
        right: (out_w as f32 * overscan_margin) as i16,
        up: (out_h as f32 * overscan_margin) as i16,
        down: (out_h as f32 * overscan_margin) as i16,
    };
    let width = out_w - (b.left + b.right) as i32;
    let height = out_h - (b.up + b.down) as i32;

    if correction > 1.0 {
        let vborders = (height as f32 - width as f32 / correction + 0.5) as i32;
        b.up += (vborders / 2) as i16;
        b.down += (vborders / 2) as i16;
    } else {
        let hborders = (width as f32 - height as f32 * correction + 0.5) as i32;
        b.left += (hborders / 2) as i16;
        b.right += (hborders / 2) as i16;
    }

    b
}

/// Hardware-legal bounds under the mirrored sync configuration: left at the
/// end of the color burst, top below the vsync pulse, right and bottom at
/// the scan totals minus their sync overhead. Recomputed on every call; the
/// timing registers it depends on are free to change.
fn bounds_of(mirror: &RegisterMirror) -> Rect {
    let burst = mirror.read(Reg::Burst);
    Rect {
        x0: (reg::burst_start(burst) + reg::burst_color_width(burst)) as i32,
        y0: reg::burst_vsync_width(burst) as i32,
        x1: (reg::h_sync_period(mirror.read(Reg::HSync)) / 4) as i32,
        y1: reg::v_sync_total(mirror.read(Reg::VSync)) as i32 - 2,
    }
}

fn window_of(mirror: &RegisterMirror) -> Rect {
    let h = mirror.read(Reg::HVideo);
    let v = mirror.read(Reg::VVideo);
    Rect {
        x0: reg::h_video_start(h) as i32,
        y0: reg::v_video_start(v) as i32,
        x1: reg::h_video_end(h) as i32,
        y1: reg::v_video_end(v) as i32,
    }
}

/// Clips a requested window against the legal bounds. A fully disjoint
/// request collapses to the zero rectangle (blank output beats an illegal
/// register value); a partial overlap pulls the offending edge in and
/// shifts the opposite edge by the same amount to preserve the size.
fn clip_window(r: Rect, b: Rect) -> Rect {
    let Rect {
        mut x0,
        mut y0,
        mut x1,
        mut y1,
    } = r;

    if x0 > b.x1 || x1 < b.x0 || y0 > b.y1 || y1 < b.y0 {
        return Rect::ZERO;
    }

    if x0 < b.x0 {
        x1 += b.x0 - x0;
        x0 = b.x0;
    }
    if x1 > b.x1 {
        x0 -= x1 - b.x1;
        x1 = b.x1;
    }
    if y0 < b.y0 {
        y1 += b.y0 - y0;
        y0 = b.y0;
    }
    if y1 > b.y1 {
        y0 -= y1 - b.y1;
        y1 = b.y1;
    }

    Rect { x0, y0, x1, y1 }
}

impl<H: VideoHw> VideoTiming<H> {
    /// The active display window currently configured, including pending
    /// changes.
    pub fn output(&self) -> Rect {
        self.with_state(|state, _| window_of(&state.mirror))
    }

    /// The hardware-legal bounds for the active display window.
    pub fn output_bounds(&self) -> Rect {
        self.with_state(|state, _| bounds_of(&state.mirror))
    }

    /// Active display width in dots.
    pub fn display_width(&self) -> i32 {
        self.output().width()
    }

    /// Active display height in half-lines.
    pub fn display_height(&self) -> i32 {
        self.output().height()
    }

    /// Programs the active display window, clipped against the legal
    /// bounds. A request that misses the bounds entirely blanks the output
    /// by collapsing the window to zero area.
    pub fn set_output(&self, rect: Rect) {
        self.with_state(|state, hw| {
            let r = clip_window(rect, bounds_of(&state.mirror));
            state.begin();
            state.write_masked(
                Reg::HVideo,
                !0,
                reg::h_video_set(r.x0 as u32, r.x1 as u32),
                hw,
            );
            state.write_masked(
                Reg::VVideo,
                !0,
                reg::v_video_set(r.y0 as u32, r.y1 as u32),
                hw,
            );
            state.end(hw);
            log::trace!("active window: {}-{} {}-{}", r.x0, r.x1, r.y0, r.y1);
        });
    }

    /// Applies border offsets relative to the preset's default window.
    pub fn set_borders(&self, b: Borders) {
        let rect = self.with_state(|state, _| {
            let (x0, y0, x1, y1) = state.standard.preset().default_window();
            Rect {
                x0: x0 + b.left as i32,
                y0: y0 + b.up as i32,
                x1: x1 - b.right as i32,
                y1: y1 - b.down as i32,
            }
        });
        self.set_output(rect);
    }

    /// The configured window expressed as border offsets.
    pub fn borders(&self) -> Borders {
        self.with_state(|state, _| {
            let (x0, y0, x1, y1) = state.standard.preset().default_window();
            let w = window_of(&state.mirror);
            Borders {
                left: (w.x0 - x0) as i16,
                right: (x1 - w.x1) as i16,
                up: (w.y0 - y0) as i16,
                down: (y1 - w.y1) as i16,
            }
        })
    }

    /// [`calc_borders`] for the driver's detected standard.
    pub fn calc_borders(&self, aspect_ratio: f32, overscan_margin: f32) -> Borders {
        let standard = self.with_state(|state, _| state.standard);
        calc_borders(standard, aspect_ratio, overscan_margin)
    }

    /// Legal positions for the window's top-left corner:
    /// `(min_x, max_x, min_y, max_y)` for the current window size.
    pub fn scroll_bounds(&self) -> (i32, i32, i32, i32) {
        self.with_state(|state, _| {
            let b = bounds_of(&state.mirror);
            let w = window_of(&state.mirror);
            (b.x0, b.x1 - w.width(), b.y0, b.y1 - w.height())
        })
    }

    /// Current top-left corner of the active window.
    pub fn scroll_pos(&self) -> (i32, i32) {
        let w = self.output();
        (w.x0, w.y0)
    }

    /// Moves the active window to an absolute top-left position, clamped to
    /// the legal bounds.
    pub fn set_scroll(&self, x: i32, y: i32) {
        let (cx, cy) = self.scroll_pos();
        self.scroll_by((x - cx) as i16, (y - cy) as i16);
    }

    /// Translates the active window without resizing it.
    pub fn scroll_by(&self, dx: i16, dy: i16) {
        self.update(|| {
            let mut b = self.borders();
            b.left += dx;
            b.right -= dx;
            b.up += dy;
            b.down -= dy;
            self.set_borders(b);
        });
    }
}
