//! Per-line enable/disable/pending/routing operations.
use crate::{
    error::{
        ClearInterruptLineError, EnableInterruptLineError, QueryInterruptLineError,
        SetInterruptLinePriorityError,
    },
    InterruptNum, InterruptPriority, Kernel, Port, NUM_INTERRUPT_LINES, NUM_PRIORITY_LEVELS,
};

#[inline]
fn word_and_bit(line: InterruptNum) -> (usize, u32) {
    (line / 32, 1 << (line % 32))
}

/// Enable the specified interrupt line.
pub fn enable_interrupt_line<System: Port>(
    line: InterruptNum,
) -> Result<(), EnableInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(EnableInterruptLineError::BadParam);
    }
    let (word, bit) = word_and_bit(line);

    // The read-modify-write must not interleave with the dispatcher or
    // another writer.
    let key = System::enter_cpu_lock();
    let bits = System::enable_reg(word);
    // Safety: CPU lock is active
    unsafe { System::set_enable_reg(word, bits | bit) };
    // Safety: `key` comes from the enclosing `enter_cpu_lock`
    unsafe { System::leave_cpu_lock(key) };

    Ok(())
}

/// Disable the specified interrupt line.
pub fn disable_interrupt_line<System: Port>(
    line: InterruptNum,
) -> Result<(), EnableInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(EnableInterruptLineError::BadParam);
    }
    let (word, bit) = word_and_bit(line);

    let key = System::enter_cpu_lock();
    let bits = System::enable_reg(word);
    // Safety: CPU lock is active
    unsafe { System::set_enable_reg(word, bits & !bit) };
    // Safety: `key` comes from the enclosing `enter_cpu_lock`
    unsafe { System::leave_cpu_lock(key) };

    Ok(())
}

/// Get whether the specified interrupt line is enabled.
pub fn is_interrupt_line_enabled<System: Port>(
    line: InterruptNum,
) -> Result<bool, QueryInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(QueryInterruptLineError::BadParam);
    }
    let (word, bit) = word_and_bit(line);
    // Single-bit reads are atomic on this class of hardware; no lock
    Ok(System::enable_reg(word) & bit != 0)
}

/// Get whether the specified interrupt line is pending.
pub fn is_interrupt_line_pending<System: Port>(
    line: InterruptNum,
) -> Result<bool, QueryInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(QueryInterruptLineError::BadParam);
    }
    let (word, bit) = word_and_bit(line);
    Ok(System::pending_reg(word) & bit != 0)
}

/// Acknowledge the specified interrupt line.
///
/// The pending register is write-one-to-clear: exactly this line's bit
/// is written as one, so unrelated pending lines are never clobbered.
pub fn clear_interrupt_line<System: Port>(
    line: InterruptNum,
) -> Result<(), ClearInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(ClearInterruptLineError::BadParam);
    }
    let (word, bit) = word_and_bit(line);
    // Safety: the caller owns the event it is acknowledging
    unsafe { System::clear_pending_reg(word, bit) };
    Ok(())
}

/// Route the specified interrupt line to an urgency level.
///
/// Rejected here, at admin time: out-of-range lines, out-of-range
/// levels, and the direct line (which stays hard-bound to the most
/// urgent level). The dispatcher never re-validates levels on the hot
/// path.
pub fn set_interrupt_line_priority<System: Kernel>(
    line: InterruptNum,
    level: InterruptPriority,
) -> Result<(), SetInterruptLinePriorityError> {
    if line >= NUM_INTERRUPT_LINES || level >= NUM_PRIORITY_LEVELS || line == System::DIRECT_LINE {
        return Err(SetInterruptLinePriorityError::BadParam);
    }
    // A single atomic store; concurrent dispatch sees either the old or
    // the new routing, both of which are valid levels.
    System::priority_table().set(line, level);
    Ok(())
}

/// Get the urgency level the specified interrupt line is routed to.
pub fn interrupt_line_priority<System: Kernel>(
    line: InterruptNum,
) -> Result<InterruptPriority, QueryInterruptLineError> {
    if line >= NUM_INTERRUPT_LINES {
        return Err(QueryInterruptLineError::BadParam);
    }
    Ok(System::priority_table().level(line))
}
