//! Line-interrupt schedule.
//!
//! A single hardware interrupt line serves every raster-timed callback: the
//! table below maps armed half-line triggers to handlers, and each firing
//! re-arms the trigger register with the next entry, round-robin. The
//! interrupt handler walks the live table while it fires, so edits go to a
//! shadow copy and are committed at the frame boundary.

use heapless::Vec;

use crate::timing::preset::VBLANK_TRIGGER;

/// Table capacity. Line-timed features rarely use more than one or two
/// entries on top of the fixed vblank head.
pub const LINE_IRQS_MAX: usize = 8;

/// What to run when an armed trigger fires.
#[derive(Clone, Copy)]
pub(crate) enum LineHandler {
    /// The driver's own vblank flush routine.
    VblankApply,
    /// A caller-registered raster callback.
    Raster(fn()),
}

#[derive(Clone, Copy)]
pub(crate) struct LineIrqEntry {
    /// Armed half-line trigger value.
    pub(crate) trigger: u16,
    pub(crate) handler: LineHandler,
}

pub(crate) struct LineIrqTable {
    live: Vec<LineIrqEntry, LINE_IRQS_MAX>,
    shadow: Vec<LineIrqEntry, LINE_IRQS_MAX>,
    /// Shadow diverges from live; commit at the next frame boundary.
    edits_pending: bool,
    /// Index of the live entry whose trigger is currently armed.
    cursor: usize,
}

impl LineIrqTable {
    /// A fresh table holding only the vblank head entry.
    pub(crate) fn new() -> Self {
        let mut live = Vec::new();
        let _ = live.push(LineIrqEntry {
            trigger: VBLANK_TRIGGER,
            handler: LineHandler::VblankApply,
        });
        Self {
            live,
            shadow: Vec::new(),
            edits_pending: false,
            cursor: 0,
        }
    }

    /// The shadow copy, snapshotting the live table on the first edit of a
    /// frame so the interrupt walk is never disturbed.
    fn edit(&mut self) -> &mut Vec<LineIrqEntry, LINE_IRQS_MAX> {
        if !self.edits_pending {
            self.shadow = self.live.clone();
            self.edits_pending = true;
        }
        &mut self.shadow
    }

    /// Inserts an entry in ascending trigger order.
    ///
    /// # Panics
    /// Panics on a duplicate trigger (ambiguous precedence), on the
    /// reserved vblank trigger, or when the table is full.
    pub(crate) fn schedule(&mut self, trigger: u16, handler: LineHandler) {
        assert!(
            trigger != VBLANK_TRIGGER,
            "trigger {trigger} is reserved for the vblank entry"
        );
        let table = self.edit();
        match table.binary_search_by_key(&trigger, |e| e.trigger) {
            Ok(_) => panic!("a line interrupt is already scheduled on trigger {trigger}"),
            Err(pos) => {
                if table.insert(pos, LineIrqEntry { trigger, handler }).is_err() {
                    panic!("line interrupt table full ({LINE_IRQS_MAX} entries)");
                }
            }
        }
    }

    /// Removes the entry matching `trigger`.
    ///
    /// # Panics
    /// Panics when no entry matches: a caller must own what it scheduled.
    pub(crate) fn cancel(&mut self, trigger: u16) {
        assert!(
            trigger != VBLANK_TRIGGER,
            "the vblank entry cannot be cancelled"
        );
        let table = self.edit();
        match table.binary_search_by_key(&trigger, |e| e.trigger) {
            Ok(pos) => {
                table.remove(pos);
            }
            Err(_) => panic!("no line interrupt scheduled on trigger {trigger}"),
        }
    }

    /// True while the armed entry is the vblank head, i.e. the firing that
    /// opens a new frame.
    #[inline]
    pub(crate) fn at_head(&self) -> bool {
        self.cursor == 0
    }

    /// Copies the shadow over the live table. Only legal at the frame
    /// boundary, before the head entry dispatches.
    pub(crate) fn commit(&mut self) {
        debug_assert!(self.cursor == 0, "table committed mid-frame");
        if self.edits_pending {
            self.live = self.shadow.clone();
            self.edits_pending = false;
        }
    }

    /// The live entry currently armed.
    #[inline]
    pub(crate) fn current(&self) -> LineIrqEntry {
        self.live[self.cursor]
    }

    /// Advances round-robin and returns the trigger to arm next.
    pub(crate) fn advance(&mut self) -> u16 {
        self.cursor = (self.cursor + 1) % self.live.len();
        self.live[self.cursor].trigger
    }

    #[cfg(test)]
    pub(crate) fn live_triggers(&self) -> Vec<u16, LINE_IRQS_MAX> {
        self.live.iter().map(|e| e.trigger).collect()
    }
}
