//! In-memory shadow of the hardware configuration slots.
//!
//! The mirror is the single source of truth for the current configuration:
//! reads never touch hardware, writes land here first and reach the unit
//! through [`RegisterMirror::flush`] at a safe point in the refresh cycle.

use bitmaps::Bitmap;

use crate::timing::preset::Preset;
use crate::timing::reg::{REG_COUNT, Reg};

/// One bit per configuration slot.
pub(crate) type RegMask = Bitmap<REG_COUNT>;

pub(crate) struct RegisterMirror {
    regs: [u32; REG_COUNT],
    /// Bit set: mirror value differs from what hardware latched.
    pending: RegMask,
    /// Bit set: slot is rewritten every flush even when unchanged.
    stabilized: RegMask,
}

impl RegisterMirror {
    /// Seeds the mirror from a preset and marks everything pending, so the
    /// first flush programs the whole unit.
    ///
    /// The interrupt-trigger slot and the line counter are excluded: the
    /// scheduler owns the former, the latter is a free-running counter.
    pub(crate) fn from_preset(preset: &Preset) -> Self {
        let mut pending = RegMask::new();
        for reg in Reg::ALL {
            if !scheduler_owned(reg) {
                pending.set(reg.index(), true);
            }
        }
        Self {
            regs: preset.regs,
            pending,
            stabilized: RegMask::new(),
        }
    }

    /// Last requested value of a slot, whether or not it reached hardware.
    #[inline]
    pub(crate) fn read(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    /// Updates the masked bits of a slot and marks it pending.
    ///
    /// # Panics
    /// Panics if `value` carries bits outside `mask`, or when targeting the
    /// line counter or the scheduler-owned interrupt trigger.
    pub(crate) fn write_masked(&mut self, reg: Reg, mask: u32, value: u32) {
        assert!(
            value & !mask == 0,
            "value {value:#010x} has bits outside the write mask {mask:#010x}"
        );
        assert!(
            !scheduler_owned(reg),
            "{reg:?} is not writable through the mirror"
        );
        let slot = reg.index();
        self.regs[slot] = (self.regs[slot] & !mask) | value;
        self.pending.set(slot, true);
    }

    /// Opts a slot in or out of per-flush reassertion. Stabilized bits are
    /// never cleared by the flush itself.
    pub(crate) fn set_stabilized(&mut self, reg: Reg, on: bool) {
        assert!(
            !scheduler_owned(reg),
            "{reg:?} cannot be stabilized"
        );
        self.stabilized.set(reg.index(), on);
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, reg: Reg) -> bool {
        self.pending.get(reg.index())
    }

    #[cfg(test)]
    pub(crate) fn any_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Writes the pending and stabilized slots through `f`, clears exactly
    /// the pending bits written, and returns the written set.
    pub(crate) fn flush(&mut self, mut f: impl FnMut(Reg, u32)) -> RegMask {
        let mut written = self.pending;
        let mut idx = self.stabilized.first_index();
        while let Some(slot) = idx {
            written.set(slot, true);
            idx = self.stabilized.next_index(slot);
        }

        let mut idx = written.first_index();
        while let Some(slot) = idx {
            f(Reg::from_index(slot), self.regs[slot]);
            self.pending.set(slot, false);
            idx = written.next_index(slot);
        }
        written
    }

    /// Raw slot values, for the post-flush trace dump.
    pub(crate) fn raw(&self) -> &[u32; REG_COUNT] {
        &self.regs
    }
}

/// Slots the mirror refuses to touch: the scheduler reprograms the trigger
/// on every firing, and the counter only acknowledges interrupts.
#[inline]
fn scheduler_owned(reg: Reg) -> bool {
    matches!(reg, Reg::VIntr | Reg::VCurrent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::preset::NTSC;
    use crate::timing::reg;

    fn mirror() -> RegisterMirror {
        RegisterMirror::from_preset(&NTSC)
    }

    #[test]
    fn from_preset_marks_everything_pending_except_scheduler_slots() {
        let m = mirror();
        for r in Reg::ALL {
            assert_eq!(
                m.is_pending(r),
                !matches!(r, Reg::VIntr | Reg::VCurrent),
                "{r:?}"
            );
        }
    }

    #[test]
    fn masked_write_touches_only_masked_bits() {
        let mut m = mirror();
        m.write_masked(Reg::Ctrl, !0, 0);
        m.write_masked(Reg::Ctrl, reg::CTRL_TYPE, reg::CTRL_TYPE_16_BPP);
        m.write_masked(Reg::Ctrl, reg::CTRL_SERRATE, reg::CTRL_SERRATE);
        assert_eq!(m.read(Reg::Ctrl), reg::CTRL_TYPE_16_BPP | reg::CTRL_SERRATE);

        // Flipping the type field leaves the serrate bit alone.
        m.write_masked(Reg::Ctrl, reg::CTRL_TYPE, reg::CTRL_TYPE_32_BPP);
        assert_eq!(m.read(Reg::Ctrl), reg::CTRL_TYPE_32_BPP | reg::CTRL_SERRATE);
    }

    #[test]
    fn flush_clears_pending_but_not_stabilized() {
        let mut m = mirror();
        m.flush(|_, _| {});
        assert!(!m.any_pending());

        m.write_masked(Reg::Origin, !0, 0x10_0000);
        m.set_stabilized(Reg::XScale, true);

        let mut seen = 0;
        let written = m.flush(|_, _| seen += 1);
        assert_eq!(seen, 2);
        assert!(written.get(Reg::Origin.index()));
        assert!(written.get(Reg::XScale.index()));
        assert!(!m.any_pending());

        // The stabilized slot keeps flushing; the plain one does not.
        let mut seen = 0;
        m.flush(|r, _| {
            assert_eq!(r, Reg::XScale);
            seen += 1;
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn flush_reports_values_from_the_mirror() {
        let mut m = mirror();
        m.flush(|_, _| {});
        m.write_masked(Reg::Width, !0, 320);
        m.flush(|r, v| {
            assert_eq!(r, Reg::Width);
            assert_eq!(v, 320);
        });
    }

    #[test]
    #[should_panic(expected = "outside the write mask")]
    fn value_bits_outside_mask_are_fatal() {
        mirror().write_masked(Reg::Ctrl, 0x3, 0x4);
    }

    #[test]
    #[should_panic(expected = "not writable through the mirror")]
    fn writing_the_line_counter_is_fatal() {
        mirror().write_masked(Reg::VCurrent, !0, 0);
    }

    #[test]
    #[should_panic(expected = "not writable through the mirror")]
    fn writing_the_interrupt_trigger_is_fatal() {
        mirror().write_masked(Reg::VIntr, !0, 0);
    }

    #[test]
    #[should_panic(expected = "cannot be stabilized")]
    fn stabilizing_the_trigger_is_fatal() {
        mirror().set_stabilized(Reg::VIntr, true);
    }
}
