//! # packbush - Packed Hilbert R-tree Spatial Index
//!
//! A static spatial index over 2D axis-aligned bounding boxes, packed into a
//! single contiguous binary buffer. Supports rectangle intersection queries
//! and best-first k-nearest-neighbor queries.
//!
//! ## Features
//!
//! - **Hilbert Curve Packing**: leaves are ordered along a space-filling
//!   curve, giving near-optimal node occupancy and cache-friendly traversal
//! - **Rect and k-NN Queries**: intersection search plus incremental
//!   nearest-neighbor search with distance and count cutoffs
//! - **Flat Binary Buffer**: versioned little-endian layout; a finished
//!   index serializes as one byte slice and restores with zero rebuild work
//! - **Generic Coordinates**: box coordinates are any of the eight supported
//!   numeric types, declared in the buffer header
//!
//! The index is build-once: declare the item count up front, add exactly
//! that many boxes, call [`finish`](PackedRTree::finish), then query freely.
//! There is no insertion or removal afterwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use packbush::PackedRTree;
//!
//! # fn main() -> packbush::Result<()> {
//! // Declare the number of boxes up front (node size 2 for the example)
//! let mut tree = PackedRTree::with_node_size(4, 2)?;
//! tree.add(0.0, 0.0, 1.0, 1.0)?;
//! tree.add(2.0, 2.0, 3.0, 3.0)?;
//! tree.add(4.0, 4.0, 5.0, 5.0)?;
//! tree.add(6.0, 6.0, 7.0, 7.0)?;
//! tree.finish()?;
//!
//! // Rectangle query: ids of boxes intersecting the region
//! let mut found = tree.search(0.0, 0.0, 3.0, 3.0)?;
//! found.sort_unstable();
//! assert_eq!(found, vec![0, 1]);
//!
//! // Nearest-neighbor query: ids ordered by distance from the point
//! assert_eq!(tree.neighbors(0.0, 0.0, Some(1), None)?, vec![0]);
//!
//! // Round-trip through the serialized buffer, no rebuild
//! let restored: PackedRTree<f64> = PackedRTree::from_bytes(tree.into_bytes())?;
//! let mut found = restored.search(0.0, 0.0, 3.0, 3.0)?;
//! found.sort_unstable();
//! assert_eq!(found, vec![0, 1]);
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! `finish()` maps every box center onto a 65536 x 65536 grid spanned by the
//! global bounding box and sorts items by their Hilbert curve index, with a
//! partial quicksort that stops subdividing inside node-sized blocks. Nodes
//! are then built bottom-up over consecutive runs of `node_size` children,
//! so every level is a contiguous slice of one flat array. Queries walk that
//! array with an explicit stack (`search`) or a flat binary min-heap keyed
//! by lower-bound distance (`neighbors`).

pub mod coord;
pub mod error;
pub mod flat_queue;
mod format;
mod hilbert;
pub mod packed_rtree;
pub mod prelude;

pub use coord::Coord;
pub use error::{Error, Result};
pub use flat_queue::FlatQueue;
pub use packed_rtree::PackedRTree;
