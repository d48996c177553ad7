//! Convenience re-exports for the common case.
//!
//! ```rust
//! use packbush::prelude::*;
//! ```

pub use crate::coord::Coord;
pub use crate::error::{Error, Result};
pub use crate::flat_queue::FlatQueue;
pub use crate::packed_rtree::PackedRTree;
