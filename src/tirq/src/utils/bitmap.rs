//! Provides `LineBitmap`, a fixed-capacity bit array indexed by interrupt
//! line number.
use core::fmt;

use super::Init;
use crate::{InterruptNum, LINE_BITMAP_WORDS, NUM_INTERRUPT_LINES};

/// A bitmap with one bit per interrupt line, packed 32 lines to a word.
///
/// Line `n` lives in word `n / 32`, bit `n % 32`. All methods taking a
/// line number panic when it is out of range.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LineBitmap {
    words: [u32; LINE_BITMAP_WORDS],
}

impl Init for LineBitmap {
    const INIT: Self = Self::EMPTY;
}

impl LineBitmap {
    /// A bitmap with no bit set.
    pub const EMPTY: Self = Self {
        words: [0; LINE_BITMAP_WORDS],
    };

    /// Get the bit for the specified line.
    #[inline]
    pub fn get(&self, line: InterruptNum) -> bool {
        assert!(line < NUM_INTERRUPT_LINES);
        self.words[line / 32] & (1 << (line % 32)) != 0
    }

    /// Set the bit for the specified line.
    #[inline]
    pub fn set(&mut self, line: InterruptNum) {
        assert!(line < NUM_INTERRUPT_LINES);
        self.words[line / 32] |= 1 << (line % 32);
    }

    /// Clear the bit for the specified line.
    #[inline]
    pub fn clear(&mut self, line: InterruptNum) {
        assert!(line < NUM_INTERRUPT_LINES);
        self.words[line / 32] &= !(1 << (line % 32));
    }

    /// Find the lowest-numbered set bit.
    ///
    /// Scans the low-index word before the high-index word, so ties
    /// between words are broken in ascending line order.
    #[inline]
    pub fn find_set(&self) -> Option<InterruptNum> {
        for (i, &word) in self.words.iter().enumerate() {
            if word != 0 {
                return Some(i * 32 + word.trailing_zeros() as usize);
            }
        }
        None
    }

    /// `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words == [0; LINE_BITMAP_WORDS]
    }

    /// Read one backing word.
    #[inline]
    pub fn word(&self, i: usize) -> u32 {
        self.words[i]
    }

    /// Replace one backing word.
    #[inline]
    pub fn set_word(&mut self, i: usize, bits: u32) {
        self.words[i] = bits;
    }
}

impl fmt::Debug for LineBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries((0..NUM_INTERRUPT_LINES).filter(|&line| self.get(line)))
            .finish()
    }
}
