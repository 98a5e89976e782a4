//! Heuristic cross-register checks.
//!
//! Some register combinations are legal as far as the unit is concerned but
//! misbehave on a fraction of physical consoles. The checks here flag the
//! known ones as diagnostics; they never block or mutate anything, because
//! the combinations are only wrong on certain units.

use heapless::Vec;

use crate::timing::mirror::RegisterMirror;
use crate::timing::preset::TvStandard;
use crate::timing::reg::{self, Reg};

/// A known-bad register combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Diagnostic {
    /// Resampling disabled on a narrow 16-bit framebuffer under NTSC.
    NarrowUnfiltered16Bpp,
    /// Dither-correction filter combined with anti-aliased fetch.
    DeditherWithAntiAlias,
}

impl Diagnostic {
    pub(crate) fn message(self) -> &'static str {
        match self {
            Diagnostic::NarrowUnfiltered16Bpp => {
                "resampling disabled with a 16-bit framebuffer narrower than \
                 320 pixels; some NTSC units lose sync on this configuration"
            }
            Diagnostic::DeditherWithAntiAlias => {
                "dither-correction filter enabled together with anti-aliased \
                 fetch; the two filters conflict on some units"
            }
        }
    }
}

/// Scans the mirror for known-bad combinations.
pub(crate) fn validate(mirror: &RegisterMirror, standard: TvStandard) -> Vec<Diagnostic, 4> {
    let mut out = Vec::new();
    let ctrl = mirror.read(Reg::Ctrl);
    let width = mirror.read(Reg::Width);

    if standard == TvStandard::Ntsc
        && ctrl & reg::CTRL_AA_MODE == reg::CTRL_AA_NONE
        && ctrl & reg::CTRL_TYPE == reg::CTRL_TYPE_16_BPP
        && width != 0
        && width < 320
    {
        let _ = out.push(Diagnostic::NarrowUnfiltered16Bpp);
    }

    let aa_enabled = matches!(
        ctrl & reg::CTRL_AA_MODE,
        reg::CTRL_AA_RESAMPLE_ALWAYS | reg::CTRL_AA_RESAMPLE_FETCH
    );
    if ctrl & reg::CTRL_DEDITHER != 0 && aa_enabled {
        let _ = out.push(Diagnostic::DeditherWithAntiAlias);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::preset::NTSC;

    fn mirror_with(ctrl: u32, width: u32) -> RegisterMirror {
        let mut m = RegisterMirror::from_preset(&NTSC);
        m.write_masked(Reg::Ctrl, !0, ctrl);
        m.write_masked(Reg::Width, !0, width);
        m
    }

    #[test]
    fn narrow_unfiltered_16bpp_flags_on_ntsc_only() {
        let ctrl = reg::CTRL_AA_NONE | reg::CTRL_TYPE_16_BPP;
        let m = mirror_with(ctrl, 256);

        let d = validate(&m, TvStandard::Ntsc);
        assert_eq!(d.as_slice(), [Diagnostic::NarrowUnfiltered16Bpp]);

        assert!(validate(&m, TvStandard::Pal).is_empty());
    }

    #[test]
    fn wide_or_filtered_buffers_pass() {
        // Wide enough.
        let m = mirror_with(reg::CTRL_AA_NONE | reg::CTRL_TYPE_16_BPP, 320);
        assert!(validate(&m, TvStandard::Ntsc).is_empty());

        // Resampler on.
        let m = mirror_with(reg::CTRL_AA_RESAMPLE_ONLY | reg::CTRL_TYPE_16_BPP, 256);
        assert!(validate(&m, TvStandard::Ntsc).is_empty());

        // 32-bit pixels.
        let m = mirror_with(reg::CTRL_AA_NONE | reg::CTRL_TYPE_32_BPP, 256);
        assert!(validate(&m, TvStandard::Ntsc).is_empty());

        // Blanked width is not a framebuffer.
        let m = mirror_with(reg::CTRL_AA_NONE | reg::CTRL_TYPE_16_BPP, 0);
        assert!(validate(&m, TvStandard::Ntsc).is_empty());
    }

    #[test]
    fn dedither_flags_only_with_anti_aliased_fetch() {
        let m = mirror_with(reg::CTRL_DEDITHER | reg::CTRL_AA_RESAMPLE_FETCH, 320);
        assert_eq!(
            validate(&m, TvStandard::Ntsc).as_slice(),
            [Diagnostic::DeditherWithAntiAlias]
        );

        let m = mirror_with(reg::CTRL_DEDITHER | reg::CTRL_AA_RESAMPLE_ONLY, 320);
        assert!(validate(&m, TvStandard::Ntsc).is_empty());
    }

    #[test]
    fn both_checks_can_fire_together() {
        let ctrl = reg::CTRL_AA_NONE | reg::CTRL_TYPE_16_BPP;
        let m = mirror_with(ctrl | reg::CTRL_DEDITHER, 256);
        // AA none disables fetch, so only the narrow check fires here.
        assert_eq!(
            validate(&m, TvStandard::Ntsc).as_slice(),
            [Diagnostic::NarrowUnfiltered16Bpp]
        );
    }
}
