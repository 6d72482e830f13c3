//! Priority-tiered nested interrupt dispatching for single-core SoCs.
//!
//! This crate implements the interrupt subsystem shared by the kernel and
//! every device driver on a family of small audio SoCs: the hardware trap
//! dispatcher, the per-line enable/pending controls, and the lock
//! primitives everything else builds critical sections out of.
//!
//! The interrupt controller exposes one enable bit and one
//! write-one-to-clear pending bit per line, packed 32 lines to a word, and
//! a small, hardware-fixed number of urgency levels (level 0 is the most
//! urgent). A trap is serviced level by level in ascending order; while a
//! level is in service, strictly more urgent levels are re-enabled at the
//! hardware so they can preempt mid-handler and recursively re-enter the
//! dispatcher. See [`dispatch::enter_interrupt`] for the exact algorithm.
//!
//! # Ports
//!
//! All hardware access goes through the [`Port`] trait, implemented once
//! per target. The kernel-side collaborators (vector table, priority
//! table, nesting counter, scheduler lock, fatal-error path) are supplied
//! through [`Kernel`]. Nothing in this crate blocks, sleeps, or
//! allocates; every operation is bounded bit arithmetic over fixed-size
//! tables.
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

use core::sync::atomic::{AtomicU32, Ordering};

pub mod dispatch;
mod error;
pub mod fault;
mod mask;
mod priority;
mod source;
pub mod utils;
mod vector;

pub use self::{
    error::{
        ClearInterruptLineError, EnableInterruptLineError, QueryInterruptLineError,
        RegisterHandlerError, SetInterruptLinePriorityError,
    },
    mask::{hold_interrupts, release_interrupts, HeldInterrupts},
    priority::PriorityTable,
    source::{
        clear_interrupt_line, disable_interrupt_line, enable_interrupt_line,
        interrupt_line_priority, is_interrupt_line_enabled, is_interrupt_line_pending,
        set_interrupt_line_priority,
    },
    vector::{InterruptHandlerFn, IsrEntry, IsrTable},
};

#[cfg(feature = "stats")]
pub use self::vector::IsrStats;

/// Identifies an interrupt line by its global number.
pub type InterruptNum = usize;

/// An urgency level. Numerically smaller values are more urgent.
pub type InterruptPriority = usize;

/// The number of interrupt lines. The valid range of interrupt numbers is
/// defined as `0..NUM_INTERRUPT_LINES`.
pub const NUM_INTERRUPT_LINES: usize = 64;

/// The number of words in the enable and pending bitmaps.
pub const LINE_BITMAP_WORDS: usize = NUM_INTERRUPT_LINES / 32;

/// The number of urgency levels the controller distinguishes. Each level
/// corresponds to one hardware nesting-mask bit.
pub const NUM_PRIORITY_LEVELS: usize = 6;

/// The most urgent level. Only the direct line runs here.
pub const INTERRUPT_PRIORITY_URGENT: InterruptPriority = 0;

/// The level every line is routed to unless explicitly reassigned.
pub const INTERRUPT_PRIORITY_NORMAL: InterruptPriority = 1;

/// The saved state of the interrupt pipeline, returned by
/// [`Port::enter_cpu_lock`].
///
/// The key records whether the pipeline was enabled immediately before
/// the lock — it's an absolute snapshot, not a counter. Nested
/// lock/unlock pairs therefore compose only if each unlock is given the
/// key produced by its own immediately enclosing lock.
#[derive(Debug, Clone, Copy)]
pub struct CpuLockKey {
    was_enabled: bool,
}

impl CpuLockKey {
    /// Construct a key recording the pre-lock pipeline state. Only port
    /// implementations have a reason to call this.
    #[inline]
    pub const fn new(was_enabled: bool) -> Self {
        Self { was_enabled }
    }

    /// `true` if the pipeline was enabled just before the paired
    /// [`Port::enter_cpu_lock`].
    #[inline]
    pub const fn was_enabled(self) -> bool {
        self.was_enabled
    }
}

/// Hardware access used by this subsystem, implemented once per target.
///
/// # Safety
///
/// Implementations must uphold the documented semantics of every method;
/// the dispatcher's correctness (and the soundness of code relying on
/// its critical sections) depends on them. In particular,
/// `enter_cpu_lock` must not return until the disabled state has settled
/// per the target's requirements — callers never insert barriers of
/// their own.
pub unsafe trait Port: 'static {
    /// Atomically disable the whole interrupt pipeline and return a key
    /// encoding the prior state. Includes any settling barrier the
    /// hardware mandates before the new state is trustworthy.
    fn enter_cpu_lock() -> CpuLockKey;

    /// Restore the pipeline to "enabled" if `key` says it was enabled
    /// before the paired [`enter_cpu_lock`](Self::enter_cpu_lock);
    /// otherwise leave it disabled.
    ///
    /// # Safety
    ///
    /// `key` must come from the immediately enclosing `enter_cpu_lock`
    /// on this core. Unlocking with a foreign key re-enables (or fails
    /// to re-enable) the pipeline at the wrong time.
    unsafe fn leave_cpu_lock(key: CpuLockKey);

    /// `true` if the pipeline is currently disabled. A read-only probe
    /// for assertions; the dispatcher doesn't use it.
    fn is_cpu_lock_active() -> bool;

    /// Read one word of the per-line enable bitmap.
    fn enable_reg(word: usize) -> u32;

    /// Write one word of the per-line enable bitmap.
    ///
    /// # Safety
    ///
    /// The caller must hold the CPU lock; an unlocked read-modify-write
    /// can interleave with the dispatcher or another writer.
    unsafe fn set_enable_reg(word: usize, bits: u32);

    /// Read one word of the per-line pending bitmap.
    fn pending_reg(word: usize) -> u32;

    /// Clear the pending bits set in `bits` (write-one-to-clear). Bits
    /// that are zero in `bits` must be left untouched.
    ///
    /// # Safety
    ///
    /// The caller must own the event being acknowledged — clearing a
    /// pending bit someone else is about to service loses that event.
    unsafe fn clear_pending_reg(word: usize, bits: u32);

    /// Program the hardware nesting mask to admit exactly the levels
    /// strictly more urgent than `level`, enabling the pipeline if any
    /// such level exists. With `level == 0` everything stays masked.
    ///
    /// # Safety
    ///
    /// Interrupt context only; this manipulates the same mask an
    /// enclosing trap relies on to bound its own preemption.
    unsafe fn enable_nesting(level: InterruptPriority);

    /// Mask every level and disable the pipeline.
    ///
    /// # Safety
    ///
    /// Interrupt context only, see [`enable_nesting`](Self::enable_nesting).
    unsafe fn disable_nesting();

    /// The least urgent level the current trap is still allowed to
    /// service, as bounded by whatever an enclosing trap has claimed
    /// through the nesting mask.
    fn nesting_limit() -> InterruptPriority;

    /// A free-running cycle counter used for service-time statistics.
    /// Wraps; only differences are meaningful.
    fn cycle_count() -> u32;
}

/// Kernel-side collaborators of the interrupt subsystem.
///
/// # Safety
///
/// `isr_table`, `priority_table`, and `nesting` must return the same
/// instances for the system's lifetime, and `DIRECT_LINE` must be a
/// valid line number.
pub unsafe trait Kernel: Port {
    /// The line hard-bound to [`INTERRUPT_PRIORITY_URGENT`] at
    /// [`init`]. With the `sys-lock-keep-direct` feature this is also
    /// the line a held section keeps alive.
    const DIRECT_LINE: InterruptNum;

    /// The vector table the dispatcher reads handlers from.
    fn isr_table() -> &'static IsrTable;

    /// The line-to-level routing table.
    fn priority_table() -> &'static PriorityTable;

    /// The process-wide trap nesting counter, owned by the scheduler.
    fn nesting() -> &'static InterruptNesting;

    /// Disable thread preemption on this core. Taken only by
    /// [`hold_interrupts`].
    fn sched_lock();

    /// Undo [`sched_lock`](Self::sched_lock).
    fn sched_unlock();

    /// The kernel's fatal-error path. Does not return.
    fn fatal_error(reason: fault::FaultReason, frame: &fault::ExceptionFrame) -> !;
}

/// The trap nesting counter consumed by the scheduler and the stack
/// unwinder to detect interrupt context.
///
/// The dispatcher increments it by exactly one on trap entry and
/// decrements it by exactly one on trap exit.
#[derive(Debug)]
pub struct InterruptNesting(AtomicU32);

impl InterruptNesting {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// The current trap nesting depth. Zero in thread context.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// `true` when called from inside a trap.
    #[inline]
    pub fn is_in_interrupt(&self) -> bool {
        self.depth() != 0
    }

    /// Zero the counter. Meant for boot-time initialization.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn enter(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn leave(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Initialize the interrupt subsystem.
///
/// Disables every line, masks every level, routes every line to
/// [`INTERRUPT_PRIORITY_NORMAL`] except [`Kernel::DIRECT_LINE`] (which is
/// hard-bound to [`INTERRUPT_PRIORITY_URGENT`]), and installs
/// [`fault::spurious_interrupt`] in every vector slot. Drivers register
/// their real handlers afterwards.
///
/// # Safety
///
/// Boot phase only: no trap may be taken and no other code may touch the
/// vector table while this runs.
pub unsafe fn init<System: Kernel>() {
    let key = System::enter_cpu_lock();
    for word in 0..LINE_BITMAP_WORDS {
        // Safety: CPU lock is active
        unsafe { System::set_enable_reg(word, 0) };
    }
    // Safety: boot phase, no enclosing trap to disturb
    unsafe { System::disable_nesting() };
    // Safety: CPU lock is active and the key is ours
    unsafe { System::leave_cpu_lock(key) };

    System::priority_table().reset::<System>();
    System::nesting().reset();

    let table = System::isr_table();
    for line in 0..NUM_INTERRUPT_LINES {
        // Safety: the caller guarantees nothing dispatches concurrently
        unsafe {
            table
                .register(line, fault::spurious_interrupt::<System>, 0)
                .unwrap_or_else(|_| unreachable!())
        };
    }
    #[cfg(feature = "stats")]
    table.reset_stats();
}
