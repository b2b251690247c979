//! `DynamicArray<T>`: a pool-backed, chunked, stable-index container with
//! optional occupancy tracking and an optional append-only modification
//! log. This is the container the quadtree's tree and data arenas are
//! built from (see `crate::quadtree`).
//!
//! Generalises a reusable-slot buffer with a "first available" cursor,
//! keeping that reuse discipline but splitting it across three cooperating
//! pieces —
//! [`chunk::Pool`] (chunked storage), [`bitset::Bitset`] (occupancy),
//! [`modlog::ModLog`] (the modification log) — instead of one `Vec` of
//! `(reserved, item)` pairs, so growth never needs a single contiguous
//! reallocation, and each of shrink/hash/replay has a natural home.

pub(crate) mod bitset;
pub(crate) mod chunk;
pub(crate) mod hash;
pub(crate) mod modlog;


pub use hash::ByteSerialize;
pub use modlog::ArrayModification;

use bitset::Bitset;
use chunk::Pool;
use modlog::ModLog;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};

/// Elements per internal chunk, chosen so `CHUNK_LEN * sizeof(T)` stays
/// comfortably under the large-object threshold some allocators apply
/// around 85 KB.
pub const CHUNK_LEN: usize = 2048;

#[derive(Debug, Clone, Copy)]
pub struct DynamicArrayConfig {
    pub chunk_len: usize,
    pub store_occupied: bool,
    pub store_modifications: bool,
}

impl Default for DynamicArrayConfig {
    fn default() -> Self {
        Self {
            chunk_len: CHUNK_LEN,
            store_occupied: true,
            store_modifications: false,
        }
    }
}

impl DynamicArrayConfig {
    pub fn new(chunk_len: usize, store_occupied: bool, store_modifications: bool) -> Self {
        Self {
            chunk_len,
            store_occupied,
            store_modifications,
        }
    }

    /// Dense, no occupancy tracking, no modification log — the shape a
    /// modification log's own backing storage needs.
    pub fn dense(chunk_len: usize) -> Self {
        Self {
            chunk_len,
            store_occupied: false,
            store_modifications: false,
        }
    }
}

pub struct DynamicArray<T: Default + Clone> {
    config: DynamicArrayConfig,
    data: Pool<T>,
    occupied: Option<Bitset>,
    modifications: Option<ModLog<T>>,
    modification_length: usize,
}

impl<T: Default + Clone> DynamicArray<T> {
    pub fn new(config: DynamicArrayConfig) -> Self {
        Self {
            occupied: config.store_occupied.then(|| Bitset::new(config.chunk_len)),
            modifications: config
                .store_modifications
                .then(|| ModLog::new(config.chunk_len)),
            data: Pool::new(config.chunk_len),
            modification_length: 0,
            config,
        }
    }

    pub fn config(&self) -> DynamicArrayConfig {
        self.config
    }

    /// Logical length, including holes left by `remove`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn modification_length(&self) -> usize {
        self.modification_length
    }

    pub fn ensure_capacity(&mut self, n: usize) {
        self.data.ensure_capacity(n);
    }

    fn check_index(&self, i: usize) -> CoreResult<()> {
        if i >= self.data.len() {
            return Err(CoreError::InvalidIndex {
                index: i as i64,
                length: self.data.len(),
            });
        }
        if let Some(occ) = &self.occupied {
            if !occ.get(i) {
                return Err(CoreError::DeletedElement { index: i as i64 });
            }
        }
        Ok(())
    }

    pub fn get(&self, i: usize) -> CoreResult<&T> {
        self.check_index(i)?;
        Ok(self.data.get(i))
    }

    pub fn get_mut(&mut self, i: usize) -> CoreResult<&mut T> {
        self.check_index(i)?;
        Ok(self.data.get_mut(i))
    }

    /// Raw read ignoring occupancy — used internally by the quadtree when
    /// it already knows an index is live by construction (e.g. walking
    /// branch children), to avoid redundant bitset lookups.
    pub(crate) fn get_unchecked(&self, i: usize) -> &T {
        self.data.get(i)
    }

    /// Writes `v` at `i`, growing the array if needed. Marks `i` occupied
    /// and appends a modification record if logging is on.
    pub fn set(&mut self, i: usize, v: T) {
        self.data.set(i, v.clone());
        if let Some(occ) = &mut self.occupied {
            occ.set(i, true);
        }
        if let Some(log) = &mut self.modifications {
            log.append(i as i64, v);
            self.modification_length = self.data.len();
        }
    }

    /// Picks the lowest clear occupancy bit within `[0, length)` if
    /// occupancy is tracked, else appends at the end; returns the index
    /// chosen.
    pub fn add(&mut self, v: T) -> usize {
        let i = match &self.occupied {
            Some(occ) => occ.lowest_clear_bit(self.data.len()).unwrap_or(self.data.len()),
            None => self.data.len(),
        };
        self.set(i, v);
        i
    }

    pub fn remove(&mut self, i: usize, shrink: bool) -> CoreResult<()> {
        if !self.config.store_occupied {
            return Err(CoreError::StoredVacanciesDisabled);
        }
        if i >= self.data.len() {
            return Err(CoreError::InvalidIndex {
                index: i as i64,
                length: self.data.len(),
            });
        }
        let occ = self.occupied.as_mut().unwrap();
        occ.set(i, false);
        if shrink && i == self.data.len() - 1 {
            let new_len = occ.shrink_length();
            self.data.truncate(new_len);
        }
        Ok(())
    }

    /// Exchanges the values at `a` and `b`, logging both values as they
    /// stand after the swap.
    pub fn swap(&mut self, a: usize, b: usize) -> CoreResult<()> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Ok(());
        }
        let va = self.data.get(a).clone();
        let vb = self.data.get(b).clone();
        *self.data.get_mut(a) = vb.clone();
        *self.data.get_mut(b) = va.clone();
        if let Some(occ) = &mut self.occupied {
            let oa = occ.get(a);
            let ob = occ.get(b);
            occ.set(a, ob);
            occ.set(b, oa);
        }
        if let Some(log) = &mut self.modifications {
            log.append(a as i64, vb);
            log.append(b as i64, va);
            self.modification_length = self.data.len();
        }
        Ok(())
    }

    /// Sets length to `i`, returning chunks beyond it to the pool.
    pub fn remove_end(&mut self, i: usize) {
        debug_assert!(i <= self.data.len());
        self.data.truncate(i);
        if let Some(occ) = &mut self.occupied {
            occ.truncate_for_length(i);
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        if let Some(occ) = &mut self.occupied {
            occ.clear();
        }
        if let Some(log) = &mut self.modifications {
            log.clear();
        }
        self.modification_length = 0;
    }

    /// Copies every logged modification to `dest` and clears the log, so
    /// the next call only reports writes made since this one.
    pub fn get_modifications(&mut self, dest: &mut Vec<ArrayModification<T>>) -> CoreResult<usize> {
        match &mut self.modifications {
            Some(log) => {
                let n = log.drain_into(dest);
                log.clear();
                self.modification_length = self.data.len();
                Ok(n)
            }
            None => Err(CoreError::StoredModificationsDisabled),
        }
    }

    pub fn clear_modifications(&mut self) -> CoreResult<()> {
        match &mut self.modifications {
            Some(log) => {
                log.clear();
                self.modification_length = self.data.len();
                Ok(())
            }
            None => Err(CoreError::StoredModificationsDisabled),
        }
    }

    /// Builds an array from a slice via repeated `add`, for tests and small
    /// fixtures.
    pub fn from_values(values: &[T], config: DynamicArrayConfig) -> Self {
        let mut arr = Self::new(config);
        for v in values {
            arr.add(v.clone());
        }
        arr
    }

    /// In-place merge sort over `[0, length)`. Undefined for arrays with
    /// holes (i.e. when `store_occupied` is on and some indices are not
    /// live) — callers must only sort dense arrays.
    pub fn sort<F: Fn(&T, &T) -> Ordering>(&mut self, cmp: F) {
        let len = self.data.len();
        if len < 2 {
            return;
        }
        let mut working: Vec<T> = (0..len).map(|i| self.data.get(i).clone()).collect();
        let mut scratch = working.clone();
        Self::merge_sort(&mut working, &mut scratch, &cmp);
        for (i, v) in working.into_iter().enumerate() {
            *self.data.get_mut(i) = v;
        }
    }

    fn merge_sort<F: Fn(&T, &T) -> Ordering>(data: &mut [T], buf: &mut [T], cmp: &F) {
        let len = data.len();
        if len < 2 {
            return;
        }
        let mid = len / 2;
        Self::merge_sort(&mut data[..mid], &mut buf[..mid], cmp);
        Self::merge_sort(&mut data[mid..], &mut buf[mid..], cmp);
        buf[..len].clone_from_slice(data);
        let (left, right) = buf.split_at(mid);
        let (mut li, mut ri, mut out) = (0, 0, 0);
        while li < left.len() && ri < right.len() {
            if cmp(&left[li], &right[ri]) != Ordering::Greater {
                data[out] = left[li].clone();
                li += 1;
            } else {
                data[out] = right[ri].clone();
                ri += 1;
            }
            out += 1;
        }
        while li < left.len() {
            data[out] = left[li].clone();
            li += 1;
            out += 1;
        }
        while ri < right.len() {
            data[out] = right[ri].clone();
            ri += 1;
            out += 1;
        }
    }
}

impl<T: Default + Clone + ByteSerialize> DynamicArray<T> {
    /// 256-bit content hash over `[start, stop)`: the XOR of each live
    /// element's SHA-256 digest, so element order doesn't affect the
    /// result. Used only by tests, never for correctness.
    pub fn hash(&self, start: usize, stop: usize) -> [u8; 32] {
        let mut acc = [0u8; 32];
        let stop = stop.min(self.data.len());
        for i in start..stop {
            if let Some(occ) = &self.occupied {
                if !occ.get(i) {
                    continue;
                }
            }
            let bytes = self.data.get(i).to_canonical_bytes();
            let digest = Sha256::digest(&bytes);
            for k in 0..32 {
                acc[k] ^= digest[k];
            }
        }
        acc
    }
}
