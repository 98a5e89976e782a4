//! Hardware access boundary.

use crate::timing::reg::Reg;

/// Access to the physical timing registers.
///
/// Implementations map [`Reg`] slots onto the unit's memory-mapped
/// registers; raw addresses never cross this boundary. Platform glue
/// typically wraps a volatile MMIO block, test code substitutes a
/// recording double.
///
/// Two slots behave specially at the hardware level:
///
/// - [`Reg::VCurrent`] is a free-running half-line counter; writing it
///   acknowledges the pending line interrupt instead of storing the value.
/// - [`Reg::VIntr`] holds the half-line that triggers the next interrupt.
pub trait VideoHw {
    /// Reads the live value of a hardware register.
    fn read_reg(&self, reg: Reg) -> u32;

    /// Writes a hardware register.
    fn write_reg(&mut self, reg: Reg, value: u32);
}
