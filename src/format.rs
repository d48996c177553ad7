//! Binary header layout and buffer sizing.
//!
//! Serialized layout, all little-endian:
//!
//! ```text
//! [magic: u8][version: 4 bits | coord type tag: 4 bits]
//! [node_size: u16][num_items: u32]
//! [boxes: num_nodes * 4 coordinates][indices: num_nodes * (u16 | u32)]
//! ```
//!
//! Index pointers are u16 when the tree has fewer than 16384 nodes
//! (the largest stored child offset, `(num_nodes - 1) * 4`, still fits
//! 16 bits) and u32 otherwise.

use crate::error::{Error, Result};

pub(crate) const MAGIC: u8 = 0xfb;
pub(crate) const VERSION: u8 = 3;
pub(crate) const HEADER_SIZE: usize = 8;

pub(crate) const DEFAULT_NODE_SIZE: u16 = 16;
pub(crate) const MIN_NODE_SIZE: u16 = 2;

/// Highest coordinate type tag the format defines.
const MAX_TYPE_TAG: u8 = 8;
/// The uint8-clamped tag; read back as plain u8.
const U8_CLAMPED_TAG: u8 = 2;

/// Byte width of one index pointer for a tree of `num_nodes` nodes.
#[inline]
pub(crate) fn index_bytes(num_nodes: usize) -> usize {
    if num_nodes < 16384 { 2 } else { 4 }
}

/// Total serialized size for `num_nodes` nodes of `coord_bytes`-wide coordinates.
#[inline]
pub(crate) fn buffer_size(num_nodes: usize, coord_bytes: usize) -> usize {
    HEADER_SIZE + num_nodes * 4 * coord_bytes + num_nodes * index_bytes(num_nodes)
}

/// Decoded header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) type_tag: u8,
    pub(crate) node_size: u16,
    pub(crate) num_items: u32,
}

impl Header {
    /// Writes the 8-byte header at the start of `data`.
    pub(crate) fn write(&self, data: &mut [u8]) {
        data[0] = MAGIC;
        data[1] = (VERSION << 4) | self.type_tag;
        data[2..4].copy_from_slice(&self.node_size.to_le_bytes());
        data[4..8].copy_from_slice(&self.num_items.to_le_bytes());
    }

    /// Parses and validates the header of a serialized index.
    pub(crate) fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::LengthMismatch { got: data.len(), expected: HEADER_SIZE });
        }
        if data[0] != MAGIC {
            return Err(Error::BadMagic(data[0]));
        }
        let version = data[1] >> 4;
        if version != VERSION {
            return Err(Error::UnsupportedVersion { got: version, expected: VERSION });
        }
        let type_tag = data[1] & 0x0f;
        if type_tag > MAX_TYPE_TAG {
            return Err(Error::UnknownCoordType(type_tag));
        }
        let node_size = u16::from_le_bytes([data[2], data[3]]);
        let num_items = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Ok(Self { type_tag, node_size, num_items })
    }

    /// Checks the stored coordinate tag against the tag of the requested type.
    pub(crate) fn check_type_tag(&self, expected: u8) -> Result<()> {
        // uint8-clamped data is byte-identical to u8 (tag 1).
        if self.type_tag == expected || (self.type_tag == U8_CLAMPED_TAG && expected == 1) {
            Ok(())
        } else {
            Err(Error::CoordTypeMismatch { got: self.type_tag, expected })
        }
    }
}
