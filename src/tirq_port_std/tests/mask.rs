//! The system-level interrupt lock and its direct-line carve-out.
mod common;

use common::{clear_events, log_handler, take_events, Event};
use tirq::{
    enable_interrupt_line, hold_interrupts, is_interrupt_line_enabled, is_interrupt_line_pending,
    release_interrupts, Kernel, Port,
};
use tirq_port_std::{
    pend_interrupt_line, sched_lock_depth, start, with_isolated_system, SimSystem,
};

fn bind(line: usize, handler: tirq::InterruptHandlerFn) {
    // Safety: the line is disabled, so nothing can dispatch this slot
    // concurrently
    unsafe { SimSystem::isr_table().register(line, handler, line).unwrap() };
}

#[test]
fn hold_and_release_restore_the_enable_set_exactly() {
    with_isolated_system(|| {
        clear_events();
        bind(0, log_handler);
        bind(5, log_handler);
        bind(40, log_handler);
        for line in [0, 5, 40] {
            enable_interrupt_line::<SimSystem>(line).unwrap();
        }
        start();
        let before = [SimSystem::enable_reg(0), SimSystem::enable_reg(1)];

        let held = hold_interrupts::<SimSystem>();
        assert_eq!(sched_lock_depth(), 1);
        // Only the direct line survives the hold.
        assert_eq!(is_interrupt_line_enabled::<SimSystem>(0), Ok(true));
        assert_eq!(is_interrupt_line_enabled::<SimSystem>(5), Ok(false));
        assert_eq!(is_interrupt_line_enabled::<SimSystem>(40), Ok(false));

        // A masked-out line pends but cannot dispatch inside the section.
        pend_interrupt_line(5);
        assert!(take_events().is_empty());
        assert_eq!(is_interrupt_line_pending::<SimSystem>(5), Ok(true));

        release_interrupts::<SimSystem>(held);
        assert_eq!(sched_lock_depth(), 0);
        assert_eq!(SimSystem::enable_reg(0), before[0]);
        assert_eq!(SimSystem::enable_reg(1), before[1]);
        // The deferred line fired on the way out.
        assert_eq!(take_events(), [Event::Run { line: 5, depth: 1 }]);
    });
}

#[test]
fn direct_line_stays_live_inside_the_section() {
    with_isolated_system(|| {
        clear_events();
        bind(0, log_handler);
        enable_interrupt_line::<SimSystem>(0).unwrap();
        start();

        let held = hold_interrupts::<SimSystem>();
        pend_interrupt_line(0);
        // Serviced immediately, not deferred to the release.
        assert_eq!(take_events(), [Event::Run { line: 0, depth: 1 }]);
        release_interrupts::<SimSystem>(held);
        assert!(take_events().is_empty());
    });
}

/// The carve-out re-enables nothing: a direct line that was disabled
/// going in stays disabled throughout.
#[test]
fn carve_out_never_enables_a_disabled_direct_line() {
    with_isolated_system(|| {
        clear_events();
        bind(0, log_handler);
        start();

        let held = hold_interrupts::<SimSystem>();
        pend_interrupt_line(0);
        assert!(take_events().is_empty());
        release_interrupts::<SimSystem>(held);

        assert_eq!(is_interrupt_line_enabled::<SimSystem>(0), Ok(false));
        // Still latched, still undelivered.
        assert_eq!(is_interrupt_line_pending::<SimSystem>(0), Ok(true));
        assert!(take_events().is_empty());
    });
}

#[test]
fn sections_nest_with_independent_snapshots() {
    with_isolated_system(|| {
        clear_events();
        bind(20, log_handler);
        enable_interrupt_line::<SimSystem>(20).unwrap();
        start();

        let outer = hold_interrupts::<SimSystem>();
        let inner = hold_interrupts::<SimSystem>();
        assert_eq!(sched_lock_depth(), 2);

        pend_interrupt_line(20);
        release_interrupts::<SimSystem>(inner);
        // The inner snapshot saw the already-held state, so nothing is
        // re-enabled yet.
        assert_eq!(is_interrupt_line_enabled::<SimSystem>(20), Ok(false));
        assert!(take_events().is_empty());

        release_interrupts::<SimSystem>(outer);
        assert_eq!(sched_lock_depth(), 0);
        assert_eq!(take_events(), [Event::Run { line: 20, depth: 1 }]);
    });
}
