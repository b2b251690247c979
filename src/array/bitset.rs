//! The occupancy bitset backing `DynamicArray<T>` when `store_occupied` is
//! on. One bit per index, packed 64 to a word, carried in the same chunked
//! [`Pool`] substrate as the element storage itself.

use crate::array::chunk::Pool;

pub(crate) struct Bitset {
    words: Pool<u64>,
}

impl Bitset {
    pub(crate) fn new(chunk_len: usize) -> Self {
        Self {
            words: Pool::new(chunk_len),
        }
    }

    pub(crate) fn get(&self, i: usize) -> bool {
        let w = i / 64;
        if w >= self.words.len() {
            return false;
        }
        (self.words.get(w) >> (i % 64)) & 1 != 0
    }

    pub(crate) fn set(&mut self, i: usize, value: bool) {
        let w = i / 64;
        if w >= self.words.len() {
            if !value {
                return; // already clear by default, no need to grow
            }
            self.words.set(w, 0);
        }
        let word = self.words.get_mut(w);
        let mask = 1u64 << (i % 64);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Lowest clear bit within `[0, length)`, word-scanning rather than
    /// bit-by-bit.
    pub(crate) fn lowest_clear_bit(&self, length: usize) -> Option<usize> {
        if length == 0 {
            return None;
        }
        let full_words = length / 64;
        for w in 0..full_words {
            let word = if w < self.words.len() { *self.words.get(w) } else { 0 };
            if word != u64::MAX {
                return Some(w * 64 + word.trailing_ones() as usize);
            }
        }
        let rem = length % 64;
        if rem > 0 {
            let w = full_words;
            let word = if w < self.words.len() { *self.words.get(w) } else { 0 };
            for b in 0..rem {
                if (word >> b) & 1 == 0 {
                    return Some(w * 64 + b);
                }
            }
        }
        None
    }

    /// Walks down from the highest word, skipping all-zero words, until a
    /// live bit is found; returns the new
    /// logical length (`last_live + 1`, or `0` if nothing is live) and
    /// returns now-unused chunks to the pool.
    pub(crate) fn shrink_length(&mut self) -> usize {
        let mut w = self.words.len();
        while w > 0 {
            w -= 1;
            let word = *self.words.get(w);
            if word != 0 {
                let bit = 63 - word.leading_zeros() as usize;
                let new_len = w * 64 + bit + 1;
                self.words.truncate(w + 1);
                return new_len;
            }
        }
        self.words.clear();
        0
    }

    pub(crate) fn truncate_for_length(&mut self, length: usize) {
        let words_needed = length.div_ceil(64);
        if words_needed <= self.words.len() {
            self.words.truncate(words_needed);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.words.clear();
    }
}
