//! Simulation environment for running the `tirq` interrupt subsystem on
//! a hosted target.
//!
//! The port keeps a software copy of the controller's register file —
//! enable words, write-one-to-clear pending words, and a status register
//! with a pipeline-enable bit and one nesting-mask bit per urgency
//! level — and takes *simulated traps*: whenever a pending, enabled line
//! is admitted by the current status register, the dispatcher is entered
//! synchronously on the calling thread, exactly where the hardware would
//! have trapped. Pending an urgent line from inside a handler therefore
//! re-enters the dispatcher recursively, so nested preemption behaves as
//! it does on the real controller.
//!
//! The simulator's state is process-global, like the hardware it stands
//! in for. Tests wanting a pristine system run under
//! [`with_isolated_system`].
#![deny(unsafe_op_in_unsafe_fn)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use tirq::{
    fault::{ExceptionFrame, FaultReason},
    CpuLockKey, InterruptNesting, InterruptNum, InterruptPriority, IsrTable, Kernel, Port,
    PriorityTable, NUM_INTERRUPT_LINES,
};

mod sim;

use sim::{Status, CYCLES, REGS, TRAP_COUNT};

/// The simulated system type. Uninhabited; used only as a type parameter
/// for the `tirq` operations.
pub enum SimSystem {}

static ISR_TABLE: IsrTable = IsrTable::new();
static PRIORITY: PriorityTable = PriorityTable::new();
static NESTING: InterruptNesting = InterruptNesting::new();
static SCHED_LOCK_DEPTH: AtomicU32 = AtomicU32::new(0);

// Safety: the methods faithfully model a single-core controller with a
// settling-free (software) register file
unsafe impl Port for SimSystem {
    fn enter_cpu_lock() -> CpuLockKey {
        let mut regs = REGS.lock();
        let was_enabled = regs.status.contains(Status::IE);
        regs.status.remove(Status::IE);
        CpuLockKey::new(was_enabled)
    }

    unsafe fn leave_cpu_lock(key: CpuLockKey) {
        if key.was_enabled() {
            REGS.lock().status.insert(Status::IE);
            // Anything that became eligible during the lock fires now.
            sim::check_pending_traps();
        }
    }

    fn is_cpu_lock_active() -> bool {
        !REGS.lock().status.contains(Status::IE)
    }

    fn enable_reg(word: usize) -> u32 {
        REGS.lock().enable[word]
    }

    unsafe fn set_enable_reg(word: usize, bits: u32) {
        REGS.lock().enable[word] = bits;
        sim::check_pending_traps();
    }

    fn pending_reg(word: usize) -> u32 {
        REGS.lock().pending[word]
    }

    unsafe fn clear_pending_reg(word: usize, bits: u32) {
        REGS.lock().pending[word] &= !bits;
    }

    unsafe fn enable_nesting(level: InterruptPriority) {
        {
            let mut regs = REGS.lock();
            regs.status.remove(Status::IM_ALL | Status::IE);
            regs.status.insert(Status::levels_above(level));
            if level != 0 {
                regs.status.insert(Status::IE);
            }
        }
        // A more urgent line that is already pending preempts right here.
        sim::check_pending_traps();
    }

    unsafe fn disable_nesting() {
        REGS.lock().status.remove(Status::IM_ALL | Status::IE);
    }

    fn nesting_limit() -> InterruptPriority {
        let allowed = REGS.lock().status.allowed_levels();
        match allowed.checked_ilog2() {
            Some(level) => level as InterruptPriority,
            None => 0,
        }
    }

    fn cycle_count() -> u32 {
        CYCLES.fetch_add(37, Ordering::Relaxed)
    }
}

// Safety: the statics below live for the process lifetime and
// `DIRECT_LINE` is in range
unsafe impl Kernel for SimSystem {
    const DIRECT_LINE: InterruptNum = 0;

    fn isr_table() -> &'static IsrTable {
        &ISR_TABLE
    }

    fn priority_table() -> &'static PriorityTable {
        &PRIORITY
    }

    fn nesting() -> &'static InterruptNesting {
        &NESTING
    }

    fn sched_lock() {
        SCHED_LOCK_DEPTH.fetch_add(1, Ordering::Relaxed);
    }

    fn sched_unlock() {
        SCHED_LOCK_DEPTH.fetch_sub(1, Ordering::Relaxed);
    }

    fn fatal_error(reason: FaultReason, frame: &ExceptionFrame) -> ! {
        panic!("fatal error: {reason:?} ({frame:?})");
    }
}

/// Make the given interrupt line pending, as the hardware event would.
///
/// If the line is enabled and its level is admitted by the current
/// status register, a simulated trap is taken before this returns.
pub fn pend_interrupt_line(line: InterruptNum) {
    assert!(line < NUM_INTERRUPT_LINES, "line {line} out of range");
    {
        let mut regs = REGS.lock();
        regs.pending[line / 32] |= 1 << (line % 32);
    }
    sim::check_pending_traps();
}

/// Enable the pipeline and admit every urgency level, like the kernel
/// does when it starts scheduling. Eligible lines fire immediately.
pub fn start() {
    {
        let mut regs = REGS.lock();
        regs.status.insert(Status::IE | Status::IM_ALL);
    }
    sim::check_pending_traps();
}

/// Return the simulator to its power-on state and run
/// [`tirq::init`]: everything disabled, masked, and routed to the
/// default levels, with the fault fallback in every vector slot.
///
/// Must not run concurrently with a simulated trap; tests get this for
/// free from [`with_isolated_system`].
pub fn reset() {
    REGS.lock().reset();
    NESTING.reset();
    SCHED_LOCK_DEPTH.store(0, Ordering::Relaxed);
    TRAP_COUNT.store(0, Ordering::Relaxed);
    CYCLES.store(0, Ordering::Relaxed);
    // Safety: the pipeline is disabled, so no trap can dispatch while
    // the vector table is rewritten
    unsafe { tirq::init::<SimSystem>() };
}

/// How many simulated traps have been taken since the last [`reset`].
pub fn trap_count() -> u32 {
    TRAP_COUNT.load(Ordering::Relaxed)
}

/// The scheduler lock depth, as seen by the simulated kernel.
pub fn sched_lock_depth() -> u32 {
    SCHED_LOCK_DEPTH.load(Ordering::Relaxed)
}

/// The current trap nesting depth.
pub fn nesting_depth() -> u32 {
    NESTING.depth()
}

/// Run `f` against a freshly [`reset`] simulator, serialized against
/// every other test using this entry point.
pub fn with_isolated_system(f: impl FnOnce()) {
    static EXCLUSIVE: Mutex<()> = Mutex::new(());
    // A `should_panic` test poisons the mutex; the state is rebuilt by
    // `reset`, so the poison itself carries no information.
    let _guard = EXCLUSIVE.lock().unwrap_or_else(|e| e.into_inner());
    let _ = env_logger::builder().is_test(true).try_init();
    reset();
    f();
}
