//! Shared scaffolding for the integration tests: a process-global event
//! recorder that interrupt handlers (plain `fn` pointers, so no closure
//! captures) append to.
#![allow(dead_code)]

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A line's handler ran to completion.
    Run { line: usize, depth: u32 },
    /// A multi-step handler started.
    Enter { line: usize, depth: u32 },
    /// A multi-step handler finished.
    Exit { line: usize },
}

static EVENTS: Mutex<Vec<Event>> = Mutex::new(Vec::new());

pub fn push(event: Event) {
    EVENTS.lock().unwrap().push(event);
}

pub fn clear_events() {
    EVENTS.lock().unwrap().clear();
}

pub fn take_events() -> Vec<Event> {
    std::mem::take(&mut EVENTS.lock().unwrap())
}

/// A handler that records its invocation. Register it with the line
/// number as the opaque argument.
pub fn log_handler(arg: usize) {
    push(Event::Run {
        line: arg,
        depth: tirq_port_std::nesting_depth(),
    });
}
