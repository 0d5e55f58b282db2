//! Fixed-capacity ring buffer used for every per-session history.
//!
//! Storage is allocated once; pushing past capacity overwrites the oldest
//! entry, so long sessions keep flat memory.

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Next slot to write once the buffer has wrapped.
    write_index: usize,
}

impl<T> RingBuffer<T> {
    /// A zero capacity is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { data: Vec::with_capacity(capacity), capacity, write_index: 0 }
    }

    /// Pushes a value and returns the evicted one, if any.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.data.len() < self.capacity {
            self.data.push(value);
            None
        } else {
            let old = std::mem::replace(&mut self.data[self.write_index], value);
            self.write_index = (self.write_index + 1) % self.capacity;
            Some(old)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.write_index = 0;
    }

    /// Element `i` counted from the oldest.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.data.len() {
            return None;
        }
        let start = if self.is_full() { self.write_index } else { 0 };
        self.data.get((start + i) % self.capacity)
    }

    /// Element `k` counted back from the newest (0 = newest).
    pub fn back(&self, k: usize) -> Option<&T> {
        let n = self.data.len();
        if k >= n {
            return None;
        }
        self.get(n - 1 - k)
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.back(0)
    }

    /// Oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        let start = if self.is_full() { self.write_index } else { 0 };
        let cap = self.capacity;
        (0..self.data.len()).map(move |i| &self.data[(start + i) % cap])
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        let skip = self.data.len().saturating_sub(n);
        self.iter().skip(skip)
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
