//! The fallback handler for unclaimed vector slots.
use crate::{utils::Init, Kernel, LINE_BITMAP_WORDS};

/// Why the kernel's fatal-error path was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FaultReason {
    /// An interrupt line with no real handler fired.
    SpuriousInterrupt,
}

/// A register snapshot handed to the fatal-error path.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionFrame {
    pub epc: u32,
    pub status: u32,
    pub cause: u32,
    pub ra: u32,
    pub sp: u32,
}

impl Init for ExceptionFrame {
    const INIT: Self = Self {
        epc: 0,
        status: 0,
        cause: 0,
        ra: 0,
        sp: 0,
    };
}

/// The frame reported when the fault site has no captured context.
static DEFAULT_FRAME: ExceptionFrame = ExceptionFrame::INIT;

/// The handler [`init`](crate::init) installs in every vector slot.
///
/// Reaching it means a line fired that nobody claimed — usually a
/// misconfigured or unbound source. Both pending words are logged for
/// diagnosis (no attempt is made to name the offending line) and control
/// transfers to the kernel's fatal-error path. Does not return.
pub fn spurious_interrupt<System: Kernel>(_arg: usize) {
    let mut pending = [0u32; LINE_BITMAP_WORDS];
    for (i, word) in pending.iter_mut().enumerate() {
        *word = System::pending_reg(i);
    }
    log::error!("spurious interrupt detected! pending: {pending:08x?}");

    System::fatal_error(FaultReason::SpuriousInterrupt, &DEFAULT_FRAME)
}
