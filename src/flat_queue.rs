//! Minimal binary min-heap over two parallel arrays.
//!
//! Used by nearest-neighbor traversal, where each queued id carries a
//! squared-distance priority. Keeping ids and values in parallel flat
//! vectors avoids per-entry allocation and keeps sift operations on plain
//! numeric slices.

/// A binary min-heap of `(id, value)` pairs ordered by value.
///
/// `pop` and `peek` return `None` on an empty queue. Values compare with
/// `<`/`<=` only, so `NaN` priorities are a caller error.
#[derive(Clone, Debug, Default)]
pub struct FlatQueue<I> {
    ids: Vec<I>,
    values: Vec<f64>,
}

impl<I: Copy> FlatQueue<I> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self { ids: Vec::new(), values: Vec::new() }
    }

    /// Creates an empty queue with preallocated room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { ids: Vec::with_capacity(capacity), values: Vec::with_capacity(capacity) }
    }

    /// Number of entries currently in the queue.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Removes all entries, keeping the backing storage for reuse.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.values.clear();
    }

    /// Releases backing storage beyond the current length.
    ///
    /// Worth calling once after a construction burst; pointless on a hot
    /// query path.
    pub fn shrink(&mut self) {
        self.ids.shrink_to_fit();
        self.values.shrink_to_fit();
    }

    /// Adds `id` with the given priority; O(log n).
    pub fn push(&mut self, id: I, value: f64) {
        self.ids.push(id);
        self.values.push(value);

        // Sift up: shift cheaper parents down into the hole.
        let mut pos = self.ids.len() - 1;
        while pos > 0 {
            let parent = (pos - 1) >> 1;
            if self.values[parent] <= value {
                break;
            }
            self.values[pos] = self.values[parent];
            self.ids[pos] = self.ids[parent];
            pos = parent;
        }
        self.values[pos] = value;
        self.ids[pos] = id;
    }

    /// Removes and returns the id with the smallest value; O(log n).
    pub fn pop(&mut self) -> Option<I> {
        let top = *self.ids.first()?;
        let last_id = self.ids.pop()?;
        let last_value = self.values.pop()?;
        let len = self.ids.len();

        if len > 0 {
            // Sift the former tail down from the root.
            let mut pos = 0;
            let half = len >> 1;
            while pos < half {
                let mut child = (pos << 1) + 1;
                if child + 1 < len && self.values[child + 1] < self.values[child] {
                    child += 1;
                }
                if self.values[child] >= last_value {
                    break;
                }
                self.values[pos] = self.values[child];
                self.ids[pos] = self.ids[child];
                pos = child;
            }
            self.values[pos] = last_value;
            self.ids[pos] = last_id;
        }

        Some(top)
    }

    /// Returns the id with the smallest value without removing it.
    pub fn peek(&self) -> Option<I> {
        self.ids.first().copied()
    }

    /// Returns the smallest value without removing its entry.
    pub fn peek_value(&self) -> Option<f64> {
        self.values.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::FlatQueue;
    use rand::{Rng, SeedableRng};

    #[test]
    fn pops_in_value_order() {
        let mut queue = FlatQueue::new();
        queue.push(0usize, 5.0);
        queue.push(1, 1.0);
        queue.push(2, 4.0);
        queue.push(3, 0.5);
        queue.push(4, 3.0);

        assert_eq!(queue.peek(), Some(3), "cheapest id on top");
        assert_eq!(queue.peek_value(), Some(0.5), "cheapest value on top");

        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(order, vec![3, 1, 4, 2, 0], "ids should come out by ascending value");
        assert!(queue.is_empty(), "queue drained");
    }

    #[test]
    fn empty_queue_returns_none() {
        let mut queue: FlatQueue<u32> = FlatQueue::new();
        assert_eq!(queue.pop(), None, "pop on empty");
        assert_eq!(queue.peek(), None, "peek on empty");
        assert_eq!(queue.peek_value(), None, "peek_value on empty");
    }

    #[test]
    fn clear_keeps_working() {
        let mut queue = FlatQueue::with_capacity(8);
        queue.push(1u32, 2.0);
        queue.push(2, 1.0);
        queue.clear();
        assert!(queue.is_empty(), "cleared");

        queue.push(7, 9.0);
        queue.push(8, 3.0);
        assert_eq!(queue.pop(), Some(8), "reused queue orders correctly");
        assert_eq!(queue.pop(), Some(7), "reused queue drains correctly");
    }

    #[test]
    fn random_values_drain_sorted() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        let mut queue = FlatQueue::new();
        for id in 0..1000usize {
            queue.push(id, rng.random_range(0.0..100.0));
        }
        queue.shrink();

        let mut last = f64::NEG_INFINITY;
        while let Some(value) = queue.peek_value() {
            assert!(value >= last, "values should be non-decreasing");
            last = value;
            let _ = queue.pop();
        }
    }

    #[test]
    fn duplicate_values_all_come_out() {
        let mut queue = FlatQueue::new();
        for id in 0..64u32 {
            queue.push(id, f64::from(id % 4));
        }
        let mut seen = Vec::new();
        while let Some(id) = queue.pop() {
            seen.push(id);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<_>>(), "every id pops exactly once");
    }
}
