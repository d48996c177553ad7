//! Packed Hilbert R-tree over 2D axis-aligned bounding boxes.
//!
//! The whole index lives in a single contiguous buffer:
//!
//! - Header: 8 bytes (magic, version + coordinate tag, `node_size`, `num_items`)
//! - All boxes: `num_nodes` * 4 coordinates, leaves first, parent levels after
//! - All indices: `num_nodes` pointers (item id for leaves, first-child
//!   offset for internal nodes)
//!
//! The tree is built bottom-up once all items are added: leaves are ordered
//! along a Hilbert curve over their centers, grouped into `node_size` runs,
//! and each level's enclosing boxes are appended above the previous one.
//! After `finish()` the structure is immutable and the buffer can be handed
//! to another thread or process and reconstructed with `from_bytes` without
//! recomputation.

use crate::coord::Coord;
use crate::error::{Error, Result};
use crate::flat_queue::FlatQueue;
use crate::format::{self, Header};
use crate::hilbert::hilbert_xy_to_index;

/// Side length of the Hilbert grid minus one; box centers are mapped onto
/// `0..=HILBERT_MAX` before curve indexing.
const HILBERT_MAX: f64 = ((1u32 << 16) - 1) as f64;

/// Queued entry during nearest-neighbor traversal.
///
/// An explicit tag instead of packing node/leaf into one shifted integer id,
/// which also lifts the item-count ceiling the bit trick would impose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueueEntry {
    /// An internal node, identified by the position of its first child.
    Node(usize),
    /// A leaf, identified by the original item id.
    Leaf(usize),
}

/// A static packed Hilbert R-tree over 2D boxes of coordinate type `T`.
///
/// The index is declared with a fixed item count, filled with exactly that
/// many [`add`](Self::add) calls, sealed with [`finish`](Self::finish), and
/// then queried any number of times with [`search`](Self::search) and
/// [`neighbors`](Self::neighbors).
///
/// # Example
///
/// ```
/// use packbush::PackedRTree;
///
/// # fn main() -> packbush::Result<()> {
/// let mut tree = PackedRTree::new(3)?;
/// tree.add(0.0, 0.0, 1.0, 1.0)?;
/// tree.add(2.0, 2.0, 3.0, 3.0)?;
/// tree.add(10.0, 10.0, 11.0, 11.0)?;
/// tree.finish()?;
///
/// let mut found = tree.search(0.5, 0.5, 2.5, 2.5)?;
/// found.sort_unstable();
/// assert_eq!(found, vec![0, 1]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PackedRTree<T: Coord = f64> {
    /// Single buffer: header + boxes + indices.
    data: Vec<u8>,
    /// Number of leaf items declared at construction (possibly trimmed).
    num_items: usize,
    /// Maximum children per node, in [2, 65535].
    node_size: usize,
    /// End position of each tree level, in node units, leaves first.
    level_bounds: Vec<usize>,
    /// Total node count, cached from `level_bounds.last()`.
    num_nodes: usize,
    /// Boxes added so far.
    num_added: usize,
    /// Set once `finish()` has built the internal levels.
    indexed: bool,
    min_x: T,
    min_y: T,
    max_x: T,
    max_y: T,
}

/// End position of each level for a tree of `num_items` leaves.
fn compute_level_bounds(num_items: usize, node_size: usize) -> Vec<usize> {
    let mut bounds = vec![num_items];
    let mut count = num_items;
    let mut num_nodes = num_items;
    loop {
        count = count.div_ceil(node_size);
        num_nodes += count;
        bounds.push(num_nodes);
        if count == 1 {
            break;
        }
    }
    bounds
}

/// Distance from `k` to the interval `[min, max]` along one axis.
#[inline]
fn axis_dist(k: f64, min: f64, max: f64) -> f64 {
    if k < min {
        min - k
    } else if k > max {
        k - max
    } else {
        0.0
    }
}

impl<T: Coord> PackedRTree<T> {
    /// Creates an index for exactly `num_items` boxes with the default node
    /// size of 16.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNumItems`] when `num_items` is zero or does
    /// not fit the header's 32-bit count field.
    pub fn new(num_items: usize) -> Result<Self> {
        Self::with_node_size(num_items, format::DEFAULT_NODE_SIZE)
    }

    /// Creates an index for exactly `num_items` boxes with the given node
    /// size (fan-out), clamped to `[2, 65535]`.
    ///
    /// Smaller node sizes favor query-heavy workloads, larger ones favor
    /// build speed and memory.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNumItems`] when `num_items` is zero or does
    /// not fit the header's 32-bit count field.
    pub fn with_node_size(num_items: usize, node_size: u16) -> Result<Self> {
        Self::with_dims(num_items, usize::from(node_size.max(format::MIN_NODE_SIZE)))
    }

    fn with_dims(num_items: usize, node_size: usize) -> Result<Self> {
        if num_items == 0 || u32::try_from(num_items).is_err() {
            return Err(Error::InvalidNumItems(num_items as u64));
        }
        let level_bounds = compute_level_bounds(num_items, node_size);
        let num_nodes = level_bounds.last().copied().unwrap_or(num_items);

        // The buffer is exactly sized up front; the header goes in first.
        let mut data = vec![0u8; format::buffer_size(num_nodes, T::BYTES)];
        #[expect(clippy::cast_possible_truncation, reason = "both fields are range-checked above")]
        Header {
            type_tag: T::TYPE_TAG,
            node_size: node_size as u16,
            num_items: num_items as u32,
        }
        .write(&mut data);

        Ok(Self {
            data,
            num_items,
            node_size,
            level_bounds,
            num_nodes,
            num_added: 0,
            indexed: false,
            min_x: T::MAX_BOUND,
            min_y: T::MAX_BOUND,
            max_x: T::MIN_BOUND,
            max_y: T::MIN_BOUND,
        })
    }

    /// Reconstructs a finished index directly over a serialized buffer.
    ///
    /// The buffer is adopted as-is; boxes and indices are read in place, and
    /// the global bounding box is restored from the root node. No tree
    /// construction work is repeated, which is the point of the flat layout:
    /// the bytes from [`as_bytes`](Self::as_bytes)/[`into_bytes`](Self::into_bytes)
    /// can cross a thread, process, or IPC boundary and come back queryable.
    ///
    /// # Errors
    /// Returns a format error when the magic byte, version, coordinate type
    /// tag, or total length do not match, and [`Error::InvalidNumItems`]
    /// when the header declares zero items.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = Header::read(&data)?;
        header.check_type_tag(T::TYPE_TAG)?;

        let num_items = header.num_items as usize;
        if num_items == 0 {
            return Err(Error::InvalidNumItems(0));
        }
        let node_size = usize::from(header.node_size.max(format::MIN_NODE_SIZE));
        let level_bounds = compute_level_bounds(num_items, node_size);
        let num_nodes = level_bounds.last().copied().unwrap_or(num_items);

        let expected = format::buffer_size(num_nodes, T::BYTES);
        if data.len() != expected {
            return Err(Error::LengthMismatch { got: data.len(), expected });
        }

        let mut tree = Self {
            data,
            num_items,
            node_size,
            level_bounds,
            num_nodes,
            num_added: num_items,
            indexed: true,
            min_x: T::MAX_BOUND,
            min_y: T::MAX_BOUND,
            max_x: T::MIN_BOUND,
            max_y: T::MIN_BOUND,
        };
        let [min_x, min_y, max_x, max_y] = tree.box_at(tree.num_nodes - 1);
        tree.min_x = min_x;
        tree.min_y = min_y;
        tree.max_x = max_x;
        tree.max_y = max_y;
        Ok(tree)
    }

    /// Adds one box and returns its id (0-based insertion order).
    ///
    /// The caller must ensure `min_x <= max_x` and `min_y <= max_y`; this is
    /// not validated. O(1): the box is written at the next slot and the
    /// running global bounding box is folded, nothing else happens until
    /// [`finish`](Self::finish).
    ///
    /// # Errors
    /// Returns [`Error::Capacity`] when the declared item count is already
    /// reached or the index is finished.
    pub fn add(&mut self, min_x: T, min_y: T, max_x: T, max_y: T) -> Result<usize> {
        if self.indexed || self.num_added >= self.num_items {
            return Err(Error::Capacity { expected: self.num_items });
        }
        let index = self.num_added;
        self.set_index(index, index);
        self.write_box(index, [min_x, min_y, max_x, max_y]);

        if min_x < self.min_x {
            self.min_x = min_x;
        }
        if min_y < self.min_y {
            self.min_y = min_y;
        }
        if max_x > self.max_x {
            self.max_x = max_x;
        }
        if max_y > self.max_y {
            self.max_y = max_y;
        }

        self.num_added += 1;
        Ok(index)
    }

    /// Builds the tree; must be called once after all boxes are added.
    ///
    /// Items are ordered by the Hilbert index of their centers with a
    /// partial quicksort (ordering inside one node-sized block is left
    /// unresolved on purpose), then every level's enclosing boxes are
    /// written bottom-up. Afterwards the index is read-only; calling
    /// `finish` again is a no-op.
    ///
    /// Adding fewer boxes than declared shrinks the index to the actual
    /// count first, as if it had been constructed with that count.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNumItems`] when no boxes were added at all.
    pub fn finish(&mut self) -> Result<()> {
        if self.indexed {
            return Ok(());
        }
        if self.num_added < self.num_items {
            self.trim()?;
        }

        if self.num_items <= self.node_size {
            // Only one node: the root covers the global bounding box.
            self.write_box(self.num_items, [self.min_x, self.min_y, self.max_x, self.max_y]);
            self.set_index(self.num_items, 0);
            self.indexed = true;
            return Ok(());
        }

        // Map item centers onto the Hilbert grid spanned by the global bbox.
        let min_x = self.min_x.to_f64();
        let min_y = self.min_y.to_f64();
        let mut width = self.max_x.to_f64() - min_x;
        let mut height = self.max_y.to_f64() - min_y;
        if width == 0.0 {
            width = 1.0;
        }
        if height == 0.0 {
            height = 1.0;
        }

        let mut hilbert_values = vec![0u32; self.num_items];
        for (i, value) in hilbert_values.iter_mut().enumerate() {
            let [b_min_x, b_min_y, b_max_x, b_max_y] = self.box_at(i);
            let center_x = (b_min_x.to_f64() + b_max_x.to_f64()) / 2.0;
            let center_y = (b_min_y.to_f64() + b_max_y.to_f64()) / 2.0;
            #[expect(clippy::cast_possible_truncation, reason = "grid coordinates are in 0..=65535")]
            let x = (HILBERT_MAX * (center_x - min_x) / width) as u32;
            #[expect(clippy::cast_possible_truncation, reason = "grid coordinates are in 0..=65535")]
            let y = (HILBERT_MAX * (center_y - min_y) / height) as u32;
            *value = hilbert_xy_to_index(x, y);
        }

        self.sort_by_hilbert(&mut hilbert_values);

        // Build parent levels bottom-up: group up to node_size consecutive
        // entries, record the first child and the enclosing box.
        let mut pos = 0;
        let mut write_pos = self.num_items;
        for level in 0..self.level_bounds.len() - 1 {
            let level_end = self.level_bounds[level];
            while pos < level_end {
                let first_child = pos;
                let [mut n_min_x, mut n_min_y, mut n_max_x, mut n_max_y] = self.box_at(pos);
                pos += 1;
                let group_end = (first_child + self.node_size).min(level_end);
                while pos < group_end {
                    let [b_min_x, b_min_y, b_max_x, b_max_y] = self.box_at(pos);
                    pos += 1;
                    if b_min_x < n_min_x {
                        n_min_x = b_min_x;
                    }
                    if b_min_y < n_min_y {
                        n_min_y = b_min_y;
                    }
                    if b_max_x > n_max_x {
                        n_max_x = b_max_x;
                    }
                    if b_max_y > n_max_y {
                        n_max_y = b_max_y;
                    }
                }
                // Child offsets are stored in coordinate-count units to keep
                // the serialized values identical to the reference format.
                self.set_index(write_pos, first_child << 2);
                self.write_box(write_pos, [n_min_x, n_min_y, n_max_x, n_max_y]);
                write_pos += 1;
            }
        }

        self.indexed = true;
        Ok(())
    }

    /// Finds the ids of all boxes intersecting the query rectangle.
    ///
    /// Result order is traversal order, not spatial order.
    ///
    /// # Errors
    /// Returns [`Error::NotIndexed`] before [`finish`](Self::finish).
    pub fn search(&self, min_x: T, min_y: T, max_x: T, max_y: T) -> Result<Vec<usize>> {
        self.search_filtered(min_x, min_y, max_x, max_y, |_| true)
    }

    /// Like [`search`](Self::search), keeping only item ids accepted by `filter`.
    ///
    /// # Errors
    /// Returns [`Error::NotIndexed`] before [`finish`](Self::finish).
    pub fn search_filtered<F>(
        &self,
        min_x: T,
        min_y: T,
        max_x: T,
        max_y: T,
        mut filter: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> bool,
    {
        if !self.indexed {
            return Err(Error::NotIndexed);
        }

        let mut results = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        // Depth-first from the root, which is always the last node written.
        let mut node_index = Some(self.num_nodes - 1);

        while let Some(first_child) = node_index {
            let end = (first_child + self.node_size).min(self.upper_bound(first_child));
            for pos in first_child..end {
                let [n_min_x, n_min_y, n_max_x, n_max_y] = self.box_at(pos);
                if max_x < n_min_x || max_y < n_min_y || min_x > n_max_x || min_y > n_max_y {
                    continue;
                }
                let index = self.index_at(pos);
                if first_child >= self.num_items {
                    stack.push(index >> 2);
                } else if filter(index) {
                    results.push(index);
                }
            }
            node_index = stack.pop();
        }

        Ok(results)
    }

    /// Finds item ids around `(x, y)` in order of non-decreasing distance.
    ///
    /// Distance is measured to the nearest point of each box (zero when the
    /// query point lies inside it). `max_results` bounds how many ids are
    /// returned; `max_distance` cuts the search off once the next nearest
    /// box lies farther away. `None` means unbounded.
    ///
    /// # Example
    ///
    /// ```
    /// use packbush::PackedRTree;
    ///
    /// # fn main() -> packbush::Result<()> {
    /// let mut tree = PackedRTree::with_node_size(2, 4)?;
    /// tree.add(0.0, 0.0, 1.0, 1.0)?;
    /// tree.add(5.0, 5.0, 6.0, 6.0)?;
    /// tree.finish()?;
    ///
    /// assert_eq!(tree.neighbors(0.0, 0.0, Some(1), None)?, vec![0]);
    /// assert_eq!(tree.neighbors(0.0, 0.0, None, Some(2.0))?, vec![0]);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::NotIndexed`] before [`finish`](Self::finish).
    pub fn neighbors(
        &self,
        x: T,
        y: T,
        max_results: Option<usize>,
        max_distance: Option<f64>,
    ) -> Result<Vec<usize>> {
        self.neighbors_filtered(x, y, max_results, max_distance, |_| true)
    }

    /// Like [`neighbors`](Self::neighbors), keeping only item ids accepted
    /// by `filter` (applied before an item can occupy a result slot).
    ///
    /// # Errors
    /// Returns [`Error::NotIndexed`] before [`finish`](Self::finish).
    pub fn neighbors_filtered<F>(
        &self,
        x: T,
        y: T,
        max_results: Option<usize>,
        max_distance: Option<f64>,
        mut filter: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut(usize) -> bool,
    {
        if !self.indexed {
            return Err(Error::NotIndexed);
        }
        let max_results = max_results.unwrap_or(usize::MAX);
        let max_dist_sq = max_distance.map_or(f64::INFINITY, |d| d * d);
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let qx = x.to_f64();
        let qy = y.to_f64();

        // Best-first traversal: the queue is call-local, so a finished index
        // can serve concurrent queries from multiple threads.
        let mut queue: FlatQueue<QueueEntry> = FlatQueue::new();
        let mut results = Vec::new();
        let mut node_index = Some(self.num_nodes - 1);

        'traversal: while let Some(first_child) = node_index {
            let end = (first_child + self.node_size).min(self.upper_bound(first_child));
            for pos in first_child..end {
                let [n_min_x, n_min_y, n_max_x, n_max_y] = self.box_at(pos);
                let dx = axis_dist(qx, n_min_x.to_f64(), n_max_x.to_f64());
                let dy = axis_dist(qy, n_min_y.to_f64(), n_max_y.to_f64());
                let dist = dx * dx + dy * dy;

                let index = self.index_at(pos);
                if first_child >= self.num_items {
                    queue.push(QueueEntry::Node(index >> 2), dist);
                } else if filter(index) {
                    queue.push(QueueEntry::Leaf(index), dist);
                }
            }

            // Accept leading leaves: every unexpanded node in the queue has a
            // lower-bound distance at least as large, so they are final.
            while let Some(QueueEntry::Leaf(id)) = queue.peek() {
                match queue.peek_value() {
                    Some(dist) if dist <= max_dist_sq => {
                        results.push(id);
                        let _ = queue.pop();
                        if results.len() >= max_results {
                            break 'traversal;
                        }
                    }
                    _ => break 'traversal,
                }
            }

            node_index = match queue.pop() {
                Some(QueueEntry::Node(pos)) => Some(pos),
                _ => None,
            };
        }

        Ok(results)
    }

    /// Number of leaf items in the index.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Maximum children per node.
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Minimum x of all boxes added so far.
    pub fn min_x(&self) -> T {
        self.min_x
    }

    /// Minimum y of all boxes added so far.
    pub fn min_y(&self) -> T {
        self.min_y
    }

    /// Maximum x of all boxes added so far.
    pub fn max_x(&self) -> T {
        self.max_x
    }

    /// Maximum y of all boxes added so far.
    pub fn max_y(&self) -> T {
        self.max_y
    }

    /// The serialized form: header, boxes, index pointers.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the index, returning the serialized buffer without copying.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    // --- internal helpers ---

    /// Replaces storage with a copy sized for the boxes actually added.
    ///
    /// Runs only inside `finish` when fewer boxes than declared arrived;
    /// this is a one-time shrink, not a general resize.
    fn trim(&mut self) -> Result<()> {
        let num_added = self.num_added;
        let mut fresh = Self::with_dims(num_added, self.node_size)?;

        // Leaf boxes sit right after the header in both buffers; leaf index
        // pointers are still the identity at this point (nothing is sorted
        // until finish), so they are rewritten rather than copied.
        let end = format::HEADER_SIZE + num_added * 4 * T::BYTES;
        fresh.data[format::HEADER_SIZE..end].copy_from_slice(&self.data[format::HEADER_SIZE..end]);
        for i in 0..num_added {
            fresh.set_index(i, i);
        }
        fresh.num_added = num_added;
        fresh.min_x = self.min_x;
        fresh.min_y = self.min_y;
        fresh.max_x = self.max_x;
        fresh.max_y = self.max_y;

        *self = fresh;
        Ok(())
    }

    /// First level bound past `node_index`, i.e. the end of its level.
    #[inline]
    fn upper_bound(&self, node_index: usize) -> usize {
        for &bound in &self.level_bounds {
            if bound > node_index {
                return bound;
            }
        }
        self.num_nodes
    }

    #[inline]
    fn box_offset(pos: usize) -> usize {
        format::HEADER_SIZE + pos * 4 * T::BYTES
    }

    /// Reads the box at node position `pos`.
    #[inline]
    fn box_at(&self, pos: usize) -> [T; 4] {
        let off = Self::box_offset(pos);
        [
            T::read_le(&self.data[off..]),
            T::read_le(&self.data[off + T::BYTES..]),
            T::read_le(&self.data[off + 2 * T::BYTES..]),
            T::read_le(&self.data[off + 3 * T::BYTES..]),
        ]
    }

    /// Writes the box at node position `pos`.
    #[inline]
    fn write_box(&mut self, pos: usize, value: [T; 4]) {
        let off = Self::box_offset(pos);
        for (i, coord) in value.into_iter().enumerate() {
            coord.write_le(&mut self.data[off + i * T::BYTES..]);
        }
    }

    /// Reads the index pointer at node position `pos`.
    #[inline]
    fn index_at(&self, pos: usize) -> usize {
        let width = format::index_bytes(self.num_nodes);
        let off = Self::box_offset(self.num_nodes) + pos * width;
        if width == 2 {
            usize::from(u16::from_le_bytes([self.data[off], self.data[off + 1]]))
        } else {
            u32::from_le_bytes([
                self.data[off],
                self.data[off + 1],
                self.data[off + 2],
                self.data[off + 3],
            ]) as usize
        }
    }

    /// Writes the index pointer at node position `pos`.
    #[inline]
    fn set_index(&mut self, pos: usize, value: usize) {
        let width = format::index_bytes(self.num_nodes);
        let off = Self::box_offset(self.num_nodes) + pos * width;
        #[expect(clippy::cast_possible_truncation, reason = "pointer width is chosen to fit num_nodes")]
        if width == 2 {
            self.data[off..off + 2].copy_from_slice(&(value as u16).to_le_bytes());
        } else {
            self.data[off..off + 4].copy_from_slice(&(value as u32).to_le_bytes());
        }
    }

    /// Partial quicksort over Hilbert keys, permuting keys, boxes, and index
    /// pointers in lockstep.
    ///
    /// Subdivision stops once a range falls inside one node-sized block:
    /// items that will share a tree node only need to be grouped, not
    /// ordered. The recursion is an explicit range stack, so adversarial
    /// inputs cannot blow the call stack.
    fn sort_by_hilbert(&mut self, values: &mut [u32]) {
        let mut ranges = vec![(0usize, self.num_items - 1)];
        while let Some((left, right)) = ranges.pop() {
            if left / self.node_size >= right / self.node_size {
                continue;
            }

            // Hoare partition around the middle element's key.
            let pivot = values[(left + right) >> 1];
            let mut i = left as i64 - 1;
            let mut j = right as i64 + 1;
            loop {
                loop {
                    i += 1;
                    if values[i as usize] >= pivot {
                        break;
                    }
                }
                loop {
                    j -= 1;
                    if values[j as usize] <= pivot {
                        break;
                    }
                }
                if i >= j {
                    break;
                }
                self.swap_entries(values, i as usize, j as usize);
            }

            let mid = j as usize;
            ranges.push((left, mid));
            ranges.push((mid + 1, right));
        }
    }

    /// Swaps two leaf entries across all three parallel arrays.
    fn swap_entries(&mut self, values: &mut [u32], i: usize, j: usize) {
        values.swap(i, j);

        let box_i = self.box_at(i);
        let box_j = self.box_at(j);
        self.write_box(i, box_j);
        self.write_box(j, box_i);

        let index_i = self.index_at(i);
        let index_j = self.index_at(j);
        self.set_index(i, index_j);
        self.set_index(j, index_i);
    }
}

#[cfg(test)]
mod tests {
    use super::compute_level_bounds;

    #[test]
    fn level_bounds_count_nodes_per_level() {
        // 4 items, node size 2: 4 leaves, 2 nodes, 1 root.
        assert_eq!(compute_level_bounds(4, 2), vec![4, 6, 7], "4/2 tree");
        // Everything fits in one node: a single root above the leaves.
        assert_eq!(compute_level_bounds(5, 16), vec![5, 6], "single-node tree");
        assert_eq!(compute_level_bounds(1, 16), vec![1, 2], "one-item tree");
        // 100 items, node size 4: 100, 25, 7, 2, 1.
        assert_eq!(compute_level_bounds(100, 4), vec![100, 125, 132, 134, 135], "deep tree");
    }
}
