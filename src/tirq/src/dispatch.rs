//! The priority-tiered trap dispatcher.
use crate::{
    fault, utils::LineBitmap, InterruptNum, InterruptPriority, Kernel, LINE_BITMAP_WORDS,
};

/// Service one hardware trap.
///
/// Called once per trap by the port's low-level entry code, with the
/// pipeline disabled by the trap itself. The algorithm:
///
/// 1. Bump the kernel nesting counter.
/// 2. Ask the hardware nesting mask for the least urgent level this trap
///    may service — an enclosing, already-nested trap limits it to the
///    levels it left open.
/// 3. For each level from 0 (most urgent) up to that limit, run
///    [`service_level`]: snapshot pending∧enabled, open the nesting mask
///    to the strictly more urgent levels, and invoke every snapshot
///    member routed to this level in ascending line order.
/// 4. Drop the nesting counter and return to the trap epilogue, which
///    restores the interrupted context.
///
/// A line that becomes pending after its level's snapshot was taken is
/// *not* serviced in this pass; it is picked up by the next trap. That
/// caps the work done per trap at one snapshot per level.
///
/// # Safety
///
/// Interrupt context only: must be entered from the port's trap
/// prologue, which has saved the hardware nesting mask for restoration
/// on return.
pub unsafe fn enter_interrupt<System: Kernel>() {
    System::nesting().enter();

    let mut any_pending = false;
    for word in 0..LINE_BITMAP_WORDS {
        any_pending |= System::pending_reg(word) & System::enable_reg(word) != 0;
    }
    if !any_pending {
        // Tolerated: log and return with the nesting balanced.
        log::debug!(
            "stray trap with nothing pending and enabled: pending = {:?}",
            pending_words::<System>()
        );
    }

    let limit = System::nesting_limit();
    for level in 0..=limit {
        // Safety: forwarded from the caller
        unsafe { service_level::<System>(level) };
    }

    System::nesting().leave();
}

/// Service every line of one urgency level that was pending and enabled
/// when this pass began.
///
/// # Safety
///
/// Interrupt context only; see [`enter_interrupt`].
unsafe fn service_level<System: Kernel>(level: InterruptPriority) {
    let mut snapshot = LineBitmap::EMPTY;
    for word in 0..LINE_BITMAP_WORDS {
        snapshot.set_word(word, System::pending_reg(word) & System::enable_reg(word));
    }
    if snapshot.is_empty() {
        return;
    }

    // Admit the strictly more urgent levels while this level's handlers
    // run. A more urgent line firing now re-enters `enter_interrupt`
    // recursively, bounded by the level count.
    // Safety: interrupt context, per this function's contract
    unsafe { System::enable_nesting(level) };

    while let Some(line) = snapshot.find_set() {
        snapshot.clear(line);

        // The snapshot covers every level; lines routed elsewhere belong
        // to another iteration of the caller's loop.
        if System::priority_table().level(line) != level {
            continue;
        }

        // Safety: forwarded from the caller
        unsafe { service_line::<System>(line) };
    }

    // Safety: interrupt context, per this function's contract
    unsafe { System::disable_nesting() };
}

/// Invoke one line's handler, update its statistics, and acknowledge the
/// line.
///
/// # Safety
///
/// Interrupt context only; see [`enter_interrupt`].
unsafe fn service_line<System: Kernel>(line: InterruptNum) {
    let Some((isr, arg)) = System::isr_table().entry(line) else {
        // An empty slot means even the boot-time fallback binding is
        // missing; treat it the same way the fallback would.
        fault::spurious_interrupt::<System>(0);
        return;
    };

    #[cfg(feature = "stats")]
    let enter_cycles = System::cycle_count();

    isr(arg);

    #[cfg(feature = "stats")]
    System::isr_table().record(line, System::cycle_count().wrapping_sub(enter_cycles));

    // Acknowledge exactly once, only after the handler has returned.
    // Safety: this line's event was just serviced and belongs to us
    unsafe { System::clear_pending_reg(line / 32, 1 << (line % 32)) };
}

fn pending_words<System: Kernel>() -> [u32; LINE_BITMAP_WORDS] {
    let mut words = [0; LINE_BITMAP_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        *word = System::pending_reg(i);
    }
    words
}
