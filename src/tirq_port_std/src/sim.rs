//! The simulated interrupt controller register file.
use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use spin::Mutex as SpinMutex;
use tirq::{Kernel, LINE_BITMAP_WORDS, NUM_PRIORITY_LEVELS};

use crate::SimSystem;

bitflags! {
    /// The simulated status register: one pipeline-enable bit plus one
    /// nesting-mask bit per urgency level.
    pub(crate) struct Status: u32 {
        const IE = 1;
        const IM_ALL = ((1 << NUM_PRIORITY_LEVELS as u32) - 1) << 1;
    }
}

impl Status {
    /// The mask bits admitting exactly the levels strictly more urgent
    /// than `level`.
    pub(crate) fn levels_above(level: usize) -> Status {
        Status::from_bits_truncate(((1 << level as u32) - 1) << 1)
    }

    /// The set of admitted levels, one bit per level.
    pub(crate) fn allowed_levels(self) -> u32 {
        (self.bits() & Status::IM_ALL.bits()) >> 1
    }
}

pub(crate) struct RegFile {
    pub(crate) enable: [u32; LINE_BITMAP_WORDS],
    pub(crate) pending: [u32; LINE_BITMAP_WORDS],
    pub(crate) status: Status,
}

impl RegFile {
    const fn new() -> Self {
        Self {
            enable: [0; LINE_BITMAP_WORDS],
            pending: [0; LINE_BITMAP_WORDS],
            status: Status::empty(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

/// The register file. Lock scopes must stay short: a handler invoked by
/// the dispatcher may re-enter the simulator on the same thread.
pub(crate) static REGS: SpinMutex<RegFile> = SpinMutex::new(RegFile::new());

/// A free-running cycle counter; each read advances it so consecutive
/// reads always differ.
pub(crate) static CYCLES: AtomicU32 = AtomicU32::new(0);

/// How many simulated traps have been taken since the last reset.
pub(crate) static TRAP_COUNT: AtomicU32 = AtomicU32::new(0);

/// Take simulated traps until no pending and enabled line is admitted by
/// the current status register.
///
/// This stands in for the hardware trap machinery: it saves the status
/// register, masks the pipeline, runs the dispatcher, and restores the
/// saved status — including when called re-entrantly from inside a
/// handler, which is how nested preemption happens.
pub(crate) fn check_pending_traps() {
    loop {
        let saved = {
            let mut regs = REGS.lock();
            if !trap_eligible(&regs) {
                return;
            }
            let saved = regs.status;
            // Taking a trap masks the pipeline; the dispatcher re-opens
            // it level by level.
            regs.status.remove(Status::IE);
            saved
        };

        let n = TRAP_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("taking simulated trap #{n}");

        // Safety: this is the simulated trap prologue; the status
        // register is restored below, as the real epilogue would
        unsafe { tirq::dispatch::enter_interrupt::<SimSystem>() };

        log::trace!("returning from simulated trap #{n}");
        REGS.lock().status = saved;
    }
}

/// Whether any pending and enabled line is routed to an admitted level.
fn trap_eligible(regs: &RegFile) -> bool {
    if !regs.status.contains(Status::IE) {
        return false;
    }
    let allowed = regs.status.allowed_levels();
    for word in 0..LINE_BITMAP_WORDS {
        let mut hits = regs.pending[word] & regs.enable[word];
        while hits != 0 {
            let line = word * 32 + hits.trailing_zeros() as usize;
            hits &= hits - 1;
            if allowed & (1 << SimSystem::priority_table().level(line)) != 0 {
                return true;
            }
        }
    }
    false
}
