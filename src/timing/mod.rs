pub mod driver;
pub mod hw;
pub(crate) mod irq;
pub(crate) mod mirror;
pub mod preset;
pub mod reg;
pub(crate) mod validate;
pub mod window;

#[cfg(test)]
mod test_support;

pub use driver::{ColorDepth, Quirks, Surface, VideoTiming};
pub use hw::VideoHw;
pub use irq::LINE_IRQS_MAX;
pub use preset::{Preset, TvStandard};
pub use reg::{REG_COUNT, Reg};
pub use window::{Borders, Rect, calc_borders};

pub mod prelude {
    pub use super::{
        Borders, ColorDepth, LINE_IRQS_MAX, Preset, Quirks, REG_COUNT, Rect, Reg, Surface,
        TvStandard, VideoHw, VideoTiming, calc_borders,
    };
}
