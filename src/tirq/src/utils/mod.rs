//! Utility
use core::cell::UnsafeCell;

mod bitmap;

pub use self::bitmap::LineBitmap;

/// Trait for types having a constant default value. This is essentially a
/// constant version of `Default`.
pub trait Init {
    /// The default value.
    const INIT: Self;
}

impl<T> Init for Option<T> {
    const INIT: Self = None;
}

impl Init for u32 {
    const INIT: Self = 0;
}

impl<T: Init> Init for UnsafeCell<T> {
    const INIT: Self = UnsafeCell::new(T::INIT);
}

impl Init for core::sync::atomic::AtomicU32 {
    const INIT: Self = Self::new(0);
}

impl Init for core::sync::atomic::AtomicU8 {
    const INIT: Self = Self::new(0);
}

impl<T: Init, const LEN: usize> Init for [T; LEN] {
    const INIT: Self = [T::INIT; LEN];
}
