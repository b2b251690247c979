//! The chunked storage substrate `DynamicArray<T>` is built on.
//!
//! Generalises a single growable buffer of reusable slots with a "first
//! available" cursor to fixed-size chunks rented from a private per-array
//! pool (so
//! growth never needs one contiguous reallocation of the whole array, and a
//! shrink can return whole chunks instead of just marking slots free)
//! while keeping the same reuse discipline: freed storage is handed back to
//! the pool and the next grow reuses it before allocating anything new.

/// One fixed-length slab of `T`, always exactly `chunk_len` elements long.
pub(crate) struct Chunk<T> {
    pub(crate) slots: Vec<T>,
}

impl<T: Default + Clone> Chunk<T> {
    fn new(chunk_len: usize) -> Self {
        Self {
            slots: vec![T::default(); chunk_len],
        }
    }
}

/// Pool of spare chunks private to a single [`Pool`]. Never shared across
/// arrays or across element types.
struct ChunkPool<T> {
    spares: Vec<Chunk<T>>,
}

impl<T> ChunkPool<T> {
    fn new() -> Self {
        Self { spares: Vec::new() }
    }

    fn rent(&mut self, chunk_len: usize) -> Chunk<T>
    where
        T: Default + Clone,
    {
        self.spares.pop().unwrap_or_else(|| Chunk::new(chunk_len))
    }

    fn park(&mut self, chunk: Chunk<T>) {
        self.spares.push(chunk);
    }
}

/// Chunked, pool-backed storage with stable indices: once index `i` is
/// exposed by growth, it refers to the same storage slot until the array
/// is truncated below `i` or cleared. This is the substrate shared by
/// `DynamicArray<T>`'s element storage, its occupancy bitset, and its
/// modification log, which is how this crate avoids a `DynamicArray<T>`
/// whose own auxiliary fields would otherwise have to be
/// `DynamicArray<u64>` / `DynamicArray<ArrayModification<T>>` — infinitely
/// recursive generic types that Rust cannot monomorphize.
pub(crate) struct Pool<T> {
    chunk_len: usize,
    chunks: Vec<Chunk<T>>,
    length: usize,
    spares: ChunkPool<T>,
}

impl<T: Default + Clone> Pool<T> {
    pub(crate) fn new(chunk_len: usize) -> Self {
        assert!(chunk_len > 0, "chunk_len must be positive");
        Self {
            chunk_len,
            chunks: Vec::new(),
            length: 0,
            spares: ChunkPool::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.length
    }

    pub(crate) fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_len
    }

    /// Rents/allocates chunks until `capacity() >= n`.
    pub(crate) fn ensure_capacity(&mut self, n: usize) {
        while self.capacity() < n {
            let chunk = self.spares.rent(self.chunk_len);
            self.chunks.push(chunk);
        }
    }

    /// Grows logical length to at least `n`, reserving chunks as needed.
    /// Newly exposed slots hold `T::default()` until written.
    fn grow_length_to(&mut self, n: usize) {
        if n > self.length {
            self.ensure_capacity(n);
            self.length = n;
        }
    }

    pub(crate) fn get(&self, i: usize) -> &T {
        debug_assert!(i < self.length);
        &self.chunks[i / self.chunk_len].slots[i % self.chunk_len]
    }

    pub(crate) fn get_mut(&mut self, i: usize) -> &mut T {
        debug_assert!(i < self.length);
        &mut self.chunks[i / self.chunk_len].slots[i % self.chunk_len]
    }

    /// Writes `v` at `i`, growing the logical length to `i + 1` if needed.
    pub(crate) fn set(&mut self, i: usize, v: T) {
        self.grow_length_to(i + 1);
        *self.get_mut(i) = v;
    }

    /// Appends `v` at the current end, returning its index.
    pub(crate) fn push(&mut self, v: T) -> usize {
        let i = self.length;
        self.set(i, v);
        i
    }

    /// Sets the logical length to `new_len`, returning whole chunks beyond
    /// it to the pool. `new_len` must be `<= length`.
    pub(crate) fn truncate(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.length);
        self.length = new_len;
        let keep_chunks = new_len.div_ceil(self.chunk_len);
        while self.chunks.len() > keep_chunks {
            let chunk = self.chunks.pop().unwrap();
            self.spares.park(chunk);
        }
    }

    /// Drops all elements and returns every chunk to the pool.
    pub(crate) fn clear(&mut self) {
        self.truncate(0);
    }
}
