//! The append-only modification log backing `DynamicArray<T>` when
//! `store_modifications` is on.

use crate::array::chunk::Pool;

/// One recorded write: the index that changed and the value it now holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayModification<T> {
    pub index: i64,
    pub value: T,
}

impl<T: Default> Default for ArrayModification<T> {
    fn default() -> Self {
        Self {
            index: -1,
            value: T::default(),
        }
    }
}

pub(crate) struct ModLog<T: Default + Clone> {
    entries: Pool<ArrayModification<T>>,
}

impl<T: Default + Clone> ModLog<T> {
    pub(crate) fn new(chunk_len: usize) -> Self {
        Self {
            entries: Pool::new(chunk_len),
        }
    }

    pub(crate) fn append(&mut self, index: i64, value: T) {
        self.entries.push(ArrayModification { index, value });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copies the whole log to `dest`, returning the number of entries
    /// copied.
    pub(crate) fn drain_into(&self, dest: &mut Vec<ArrayModification<T>>) -> usize {
        let n = self.entries.len();
        for i in 0..n {
            dest.push(self.entries.get(i).clone());
        }
        n
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
