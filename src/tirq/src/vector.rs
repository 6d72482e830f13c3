//! The software vector table: one handler slot per interrupt line.
use core::cell::UnsafeCell;

use crate::{error::RegisterHandlerError, utils::Init, InterruptNum, NUM_INTERRUPT_LINES};

#[cfg(feature = "stats")]
use crate::error::QueryInterruptLineError;

#[cfg(feature = "stats")]
use core::sync::atomic::{AtomicU32, Ordering};

/// An interrupt service routine. Receives the opaque argument it was
/// registered with.
pub type InterruptHandlerFn = fn(usize);

/// One vector slot: the bound handler, its argument, and (with the
/// `stats` feature) the statistics the dispatcher maintains for it.
pub struct IsrEntry {
    /// Written only while no trap can dispatch this slot; see
    /// [`IsrTable::register`].
    isr: UnsafeCell<Option<(InterruptHandlerFn, usize)>>,
    #[cfg(feature = "stats")]
    irq_count: AtomicU32,
    #[cfg(feature = "stats")]
    max_cycles: AtomicU32,
}

// Safety: the `UnsafeCell` is only written under `register`'s contract
// (no concurrent access to the slot), and is otherwise read-only.
unsafe impl Sync for IsrEntry {}

impl Init for IsrEntry {
    const INIT: Self = Self {
        isr: UnsafeCell::new(None),
        #[cfg(feature = "stats")]
        irq_count: AtomicU32::new(0),
        #[cfg(feature = "stats")]
        max_cycles: AtomicU32::new(0),
    };
}

/// Per-line dispatch statistics, enabled by the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsrStats {
    /// How many times the handler has been invoked.
    pub count: u32,
    /// The worst observed service time, in cycle-counter units.
    pub max_cycles: u32,
}

/// The software vector table.
///
/// Statically allocated by the port; the dispatcher reads the handler
/// and argument of each slot and updates its statistics. Binding happens
/// once at boot ([`init`](crate::init) installs the fault fallback
/// everywhere, drivers overwrite their own slots afterwards).
pub struct IsrTable {
    entries: [IsrEntry; NUM_INTERRUPT_LINES],
}

impl IsrTable {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            entries: [IsrEntry::INIT; NUM_INTERRUPT_LINES],
        }
    }

    /// Bind `handler` (with its opaque argument) to `line`, replacing
    /// whatever was bound before.
    ///
    /// # Safety
    ///
    /// The slot must be quiescent: no trap may dispatch `line` and no
    /// other call may touch the slot while this runs. In practice this
    /// means boot time, or with the line disabled and its pending bit
    /// clear.
    pub unsafe fn register(
        &self,
        line: InterruptNum,
        handler: InterruptHandlerFn,
        arg: usize,
    ) -> Result<(), RegisterHandlerError> {
        if line >= NUM_INTERRUPT_LINES {
            return Err(RegisterHandlerError::BadParam);
        }
        // Safety: exclusivity is the caller's contract
        unsafe { *self.entries[line].isr.get() = Some((handler, arg)) };
        Ok(())
    }

    /// The handler bound to `line`, if any.
    #[inline]
    pub(crate) fn entry(&self, line: InterruptNum) -> Option<(InterruptHandlerFn, usize)> {
        // Safety: slots change only under `register`'s no-concurrency
        // contract, so this read cannot tear
        unsafe { *self.entries[line].isr.get() }
    }

    /// Fold `cycles` into the statistics of `line` and count one
    /// invocation.
    #[cfg(feature = "stats")]
    #[inline]
    pub(crate) fn record(&self, line: InterruptNum, cycles: u32) {
        let entry = &self.entries[line];
        entry.irq_count.fetch_add(1, Ordering::Relaxed);
        entry.max_cycles.fetch_max(cycles, Ordering::Relaxed);
    }

    /// Read back the statistics of `line`.
    #[cfg(feature = "stats")]
    pub fn stats(&self, line: InterruptNum) -> Result<IsrStats, QueryInterruptLineError> {
        let entry = self
            .entries
            .get(line)
            .ok_or(QueryInterruptLineError::BadParam)?;
        Ok(IsrStats {
            count: entry.irq_count.load(Ordering::Relaxed),
            max_cycles: entry.max_cycles.load(Ordering::Relaxed),
        })
    }

    /// Zero every slot's statistics.
    #[cfg(feature = "stats")]
    pub fn reset_stats(&self) {
        for entry in self.entries.iter() {
            entry.irq_count.store(0, Ordering::Relaxed);
            entry.max_cycles.store(0, Ordering::Relaxed);
        }
    }
}
