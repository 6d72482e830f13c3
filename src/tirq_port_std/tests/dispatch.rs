//! Dispatcher behavior: level ordering, tie-breaks, nesting, and the
//! clear-once guarantee.
mod common;

use common::{clear_events, log_handler, take_events, Event};
use tirq::{
    enable_interrupt_line, is_interrupt_line_pending, set_interrupt_line_priority, Kernel,
};
use tirq_port_std::{
    nesting_depth, pend_interrupt_line, start, trap_count, with_isolated_system, SimSystem,
};

fn bind(line: usize, handler: tirq::InterruptHandlerFn) {
    // Safety: the line is disabled (or the system not yet started), so
    // nothing can dispatch this slot concurrently
    unsafe { SimSystem::isr_table().register(line, handler, line).unwrap() };
}

/// Asserts its own pending bit is still set while it runs: the
/// dispatcher acknowledges only after the handler returns.
fn pending_while_running_handler(arg: usize) {
    assert_eq!(is_interrupt_line_pending::<SimSystem>(arg), Ok(true));
    log_handler(arg);
}

/// §8 scenario: an urgent and a normal line pending together are
/// serviced urgent-first within a single trap, each exactly once, with
/// the nesting depth restored afterwards.
#[test]
fn two_level_scenario() {
    with_isolated_system(|| {
        clear_events();
        bind(0, pending_while_running_handler);
        bind(40, pending_while_running_handler);
        enable_interrupt_line::<SimSystem>(0).unwrap();
        enable_interrupt_line::<SimSystem>(40).unwrap();

        // Pend both while the pipeline is still down, then open it.
        pend_interrupt_line(0);
        pend_interrupt_line(40);
        assert_eq!(trap_count(), 0);
        start();

        assert_eq!(
            take_events(),
            [
                Event::Run { line: 0, depth: 1 },
                Event::Run { line: 40, depth: 1 },
            ]
        );
        assert_eq!(trap_count(), 1);
        assert_eq!(is_interrupt_line_pending::<SimSystem>(0), Ok(false));
        assert_eq!(is_interrupt_line_pending::<SimSystem>(40), Ok(false));
        assert_eq!(nesting_depth(), 0);
    });
}

#[test]
fn ascending_level_order_across_many_levels() {
    with_isolated_system(|| {
        clear_events();
        for (line, level) in [(30, 4), (20, 3), (10, 2)] {
            bind(line, log_handler);
            set_interrupt_line_priority::<SimSystem>(line, level).unwrap();
            enable_interrupt_line::<SimSystem>(line).unwrap();
            pend_interrupt_line(line);
        }
        bind(0, log_handler);
        enable_interrupt_line::<SimSystem>(0).unwrap();
        pend_interrupt_line(0);

        start();

        // One trap, most urgent level first, nothing nested.
        assert_eq!(
            take_events(),
            [
                Event::Run { line: 0, depth: 1 },
                Event::Run { line: 10, depth: 1 },
                Event::Run { line: 20, depth: 1 },
                Event::Run { line: 30, depth: 1 },
            ]
        );
        assert_eq!(trap_count(), 1);
    });
}

/// Lines 3 and 35 share a level but live in different bitmap words; the
/// low-index word is scanned first.
#[test]
fn same_level_ties_break_by_ascending_line_number() {
    with_isolated_system(|| {
        clear_events();
        bind(35, log_handler);
        bind(3, log_handler);
        enable_interrupt_line::<SimSystem>(35).unwrap();
        enable_interrupt_line::<SimSystem>(3).unwrap();
        pend_interrupt_line(35);
        pend_interrupt_line(3);

        start();

        assert_eq!(
            take_events(),
            [
                Event::Run { line: 3, depth: 1 },
                Event::Run { line: 35, depth: 1 },
            ]
        );
    });
}

#[test]
fn handler_runs_exactly_once_per_pass() {
    with_isolated_system(|| {
        clear_events();
        bind(17, pending_while_running_handler);
        enable_interrupt_line::<SimSystem>(17).unwrap();
        start();

        pend_interrupt_line(17);
        assert_eq!(take_events(), [Event::Run { line: 17, depth: 1 }]);
        assert_eq!(is_interrupt_line_pending::<SimSystem>(17), Ok(false));
        assert_eq!(trap_count(), 1);

        // A later event is a fresh trap, not a replay.
        pend_interrupt_line(17);
        assert_eq!(take_events(), [Event::Run { line: 17, depth: 1 }]);
        assert_eq!(trap_count(), 2);
    });
}

fn urgent_pending_handler(arg: usize) {
    common::push(Event::Enter {
        line: arg,
        depth: nesting_depth(),
    });
    // The urgent line preempts before this handler finishes.
    pend_interrupt_line(0);
    common::push(Event::Exit { line: arg });
}

/// While a normal-level handler runs, an urgent line recursively
/// re-enters the dispatcher instead of waiting for the handler to
/// finish.
#[test]
fn urgent_level_preempts_mid_handler() {
    with_isolated_system(|| {
        clear_events();
        bind(0, log_handler);
        bind(40, urgent_pending_handler);
        enable_interrupt_line::<SimSystem>(0).unwrap();
        enable_interrupt_line::<SimSystem>(40).unwrap();
        start();

        pend_interrupt_line(40);

        assert_eq!(
            take_events(),
            [
                Event::Enter { line: 40, depth: 1 },
                Event::Run { line: 0, depth: 2 },
                Event::Exit { line: 40 },
            ]
        );
        assert_eq!(trap_count(), 2);
        assert_eq!(nesting_depth(), 0);
    });
}

fn same_level_pending_handler(arg: usize) {
    common::push(Event::Enter {
        line: arg,
        depth: nesting_depth(),
    });
    pend_interrupt_line(arg + 1);
    common::push(Event::Exit { line: arg });
}

/// A line of the same level that pends after its level's snapshot was
/// taken is not serviced within that pass: the work done per trap for
/// one level is capped at one snapshot.
#[test]
fn late_same_level_line_waits_for_the_next_trap() {
    with_isolated_system(|| {
        clear_events();
        bind(50, same_level_pending_handler);
        bind(51, log_handler);
        for line in [50, 51] {
            set_interrupt_line_priority::<SimSystem>(line, 5).unwrap();
            enable_interrupt_line::<SimSystem>(line).unwrap();
        }
        start();

        pend_interrupt_line(50);

        // Line 51 ran only after the first trap completed.
        assert_eq!(
            take_events(),
            [
                Event::Enter { line: 50, depth: 1 },
                Event::Exit { line: 50 },
                Event::Run { line: 51, depth: 1 },
            ]
        );
        assert_eq!(trap_count(), 2);
    });
}

/// A trap with nothing pending and enabled is tolerated: it logs,
/// services nothing, and leaves the nesting depth balanced.
#[test]
fn stray_trap_is_harmless() {
    with_isolated_system(|| {
        clear_events();
        start();
        // Safety: simulated trap context; the status register is
        // already what a trap prologue would leave behind
        unsafe { tirq::dispatch::enter_interrupt::<SimSystem>() };
        assert!(take_events().is_empty());
        assert_eq!(nesting_depth(), 0);
    });
}

/// An enabled line nobody claimed falls through to the boot-time
/// fallback, which is unconditionally fatal.
#[test]
#[should_panic(expected = "fatal error: SpuriousInterrupt")]
fn unclaimed_line_is_fatal() {
    with_isolated_system(|| {
        enable_interrupt_line::<SimSystem>(7).unwrap();
        start();
        pend_interrupt_line(7);
    });
}

#[test]
fn statistics_count_invocations_and_service_time() {
    with_isolated_system(|| {
        clear_events();
        bind(12, log_handler);
        enable_interrupt_line::<SimSystem>(12).unwrap();
        start();

        pend_interrupt_line(12);
        pend_interrupt_line(12);

        let stats = SimSystem::isr_table().stats(12).unwrap();
        assert_eq!(stats.count, 2);
        assert!(stats.max_cycles > 0);

        // An untouched line has untouched statistics.
        let idle = SimSystem::isr_table().stats(13).unwrap();
        assert_eq!(idle.count, 0);
        assert_eq!(idle.max_cycles, 0);
    });
}
