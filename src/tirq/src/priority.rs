//! The line-to-level routing table.
use core::sync::atomic::{AtomicU8, Ordering};

use crate::{
    InterruptNum, InterruptPriority, Kernel, INTERRUPT_PRIORITY_NORMAL, INTERRUPT_PRIORITY_URGENT,
    NUM_INTERRUPT_LINES,
};

/// Maps each interrupt line to its urgency level.
///
/// The mapping is coarse and many-to-one: the hardware distinguishes only
/// [`NUM_PRIORITY_LEVELS`](crate::NUM_PRIORITY_LEVELS) levels, every line
/// defaults to [`INTERRUPT_PRIORITY_NORMAL`], and exactly one line — the
/// port's [`Kernel::DIRECT_LINE`] — is routed to
/// [`INTERRUPT_PRIORITY_URGENT`] by [`init`](crate::init).
///
/// Lookups are plain array indexing; [`level`](Self::level) runs on the
/// dispatcher's hot path.
#[derive(Debug)]
pub struct PriorityTable {
    levels: [AtomicU8; NUM_INTERRUPT_LINES],
}

impl PriorityTable {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const LEVEL_INIT: AtomicU8 = AtomicU8::new(INTERRUPT_PRIORITY_NORMAL as u8);
        Self {
            levels: [LEVEL_INIT; NUM_INTERRUPT_LINES],
        }
    }

    /// The level `line` is routed to.
    ///
    /// Panics if `line` is out of range.
    #[inline]
    pub fn level(&self, line: InterruptNum) -> InterruptPriority {
        self.levels[line].load(Ordering::Relaxed) as InterruptPriority
    }

    /// Route `line` to `level`. Range checking is the caller's job;
    /// [`set_interrupt_line_priority`](crate::set_interrupt_line_priority)
    /// is the public entry point.
    #[inline]
    pub(crate) fn set(&self, line: InterruptNum, level: InterruptPriority) {
        self.levels[line].store(level as u8, Ordering::Relaxed);
    }

    /// Restore the boot-time routing: everything to the normal level,
    /// the direct line to the most urgent one.
    pub(crate) fn reset<System: Kernel>(&self) {
        for level in self.levels.iter() {
            level.store(INTERRUPT_PRIORITY_NORMAL as u8, Ordering::Relaxed);
        }
        self.set(System::DIRECT_LINE, INTERRUPT_PRIORITY_URGENT);
    }
}
