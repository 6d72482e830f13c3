//! Error types for the administrative interrupt-line operations.
//!
//! Everything on the dispatcher's hot path is non-fallible by
//! construction; `Result` appears only on the admin surface.

/// Error type for [`enable_interrupt_line`](crate::enable_interrupt_line)
/// and [`disable_interrupt_line`](crate::disable_interrupt_line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableInterruptLineError {
    /// The interrupt line number is out of range.
    BadParam,
}

/// Error type for [`clear_interrupt_line`](crate::clear_interrupt_line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearInterruptLineError {
    /// The interrupt line number is out of range.
    BadParam,
}

/// Error type for the read-only interrupt line queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryInterruptLineError {
    /// The interrupt line number is out of range.
    BadParam,
}

/// Error type for
/// [`set_interrupt_line_priority`](crate::set_interrupt_line_priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetInterruptLinePriorityError {
    /// The line number or the level is out of range, or the line is
    /// hard-bound to the most urgent level.
    BadParam,
}

/// Error type for [`IsrTable::register`](crate::IsrTable::register).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterHandlerError {
    /// The interrupt line number is out of range.
    BadParam,
}
