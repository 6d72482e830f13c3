//! The system-level interrupt lock.
//!
//! [`hold_interrupts`] builds a critical section that is atomic with
//! respect to both thread preemption and (almost) every interrupt
//! source: it takes the scheduler lock, then forces the whole enable
//! bitmap to zero while remembering the previous contents in a
//! caller-owned snapshot. With the `sys-lock-keep-direct` feature the
//! direct line stays enabled — if it was enabled going in — so the one
//! safety-critical source keeps making forward progress inside the
//! section.
//!
//! Call sites may nest freely because each owns its own snapshot.
//!
//! Without the `sys-lock` feature the pair collapses to the plain CPU
//! lock: no scheduler interaction and no bitmap save/restore.
use crate::Kernel;

#[cfg(feature = "sys-lock")]
use crate::{utils::LineBitmap, LINE_BITMAP_WORDS};

#[cfg(not(feature = "sys-lock"))]
use crate::CpuLockKey;

/// The caller-owned state saved by [`hold_interrupts`] and consumed by
/// [`release_interrupts`].
#[must_use = "dropping this leaks a critical section; pass it to `release_interrupts`"]
pub struct HeldInterrupts {
    #[cfg(feature = "sys-lock")]
    lines: LineBitmap,
    #[cfg(not(feature = "sys-lock"))]
    key: CpuLockKey,
}

/// Enter the system-level critical section.
#[cfg(feature = "sys-lock")]
pub fn hold_interrupts<System: Kernel>() -> HeldInterrupts {
    System::sched_lock();

    let key = System::enter_cpu_lock();

    let mut lines = LineBitmap::EMPTY;
    for word in 0..LINE_BITMAP_WORDS {
        lines.set_word(word, System::enable_reg(word));
    }

    let (direct_word, direct_bit) = (System::DIRECT_LINE / 32, 1u32 << (System::DIRECT_LINE % 32));
    for word in 0..LINE_BITMAP_WORDS {
        let keep = if cfg!(feature = "sys-lock-keep-direct") && word == direct_word {
            // Keep the direct line only if it was enabled on entry.
            lines.word(word) & direct_bit
        } else {
            0
        };
        // Safety: CPU lock is active
        unsafe { System::set_enable_reg(word, keep) };
    }

    // The forced enable state stays in effect after the pipeline comes
    // back up.
    // Safety: `key` comes from the enclosing `enter_cpu_lock`
    unsafe { System::leave_cpu_lock(key) };

    HeldInterrupts { lines }
}

/// Leave the system-level critical section, restoring the enable bitmap
/// bit-for-bit from the snapshot.
#[cfg(feature = "sys-lock")]
pub fn release_interrupts<System: Kernel>(held: HeldInterrupts) {
    let key = System::enter_cpu_lock();
    for word in 0..LINE_BITMAP_WORDS {
        // Safety: CPU lock is active
        unsafe { System::set_enable_reg(word, held.lines.word(word)) };
    }
    // Safety: `key` comes from the enclosing `enter_cpu_lock`
    unsafe { System::leave_cpu_lock(key) };

    System::sched_unlock();
}

/// Enter the system-level critical section.
#[cfg(not(feature = "sys-lock"))]
pub fn hold_interrupts<System: Kernel>() -> HeldInterrupts {
    HeldInterrupts {
        key: System::enter_cpu_lock(),
    }
}

/// Leave the system-level critical section.
#[cfg(not(feature = "sys-lock"))]
pub fn release_interrupts<System: Kernel>(held: HeldInterrupts) {
    // Safety: `held` was produced by the matching `hold_interrupts`,
    // which entered the CPU lock this key belongs to
    unsafe { System::leave_cpu_lock(held.key) };
}
