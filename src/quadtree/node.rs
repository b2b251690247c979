//! `QuadtreeNode`: the fixed 36-byte tagged-union node record.
//!
//! A small tagged enum stored in an object pool, generalised from a plain
//! `Nothing | Leaf(T)` node (where the leaf carries the value inline) to
//! `Branch([ref; 4]) | Leaf(data_ref)`, where a leaf carries only an index
//! into a separate data arena and a branch carries its four children
//! inline rather than through a side `node_children` vector — the
//! branch/leaf split a fixed-width wire format requires.

use crate::bits::{read_i64, read_u32, write_i64, write_u32, Endian};
use crate::error::{CoreError, CoreResult};
use crate::geometry::{BL, BR, TL, TR};

pub const NODE_BYTE_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Branch = 0,
    Leaf = 1,
}

/// `ref0..ref3` in child order `[BL, BR, TL, TR]`, matching
/// `Range2D::split_into_quarters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadtreeNode {
    Branch([i64; 4]),
    Leaf(i64),
}

impl Default for QuadtreeNode {
    fn default() -> Self {
        // Data index 0 always holds the quadtree's default value, so a
        // freshly-exposed slot reading as `Leaf(0)` is harmless: it is
        // never observed until a real write marks it occupied.
        QuadtreeNode::Leaf(0)
    }
}

impl QuadtreeNode {
    pub fn branch(children: [i64; 4]) -> Self {
        QuadtreeNode::Branch(children)
    }

    pub fn leaf(data_ref: i64) -> Self {
        QuadtreeNode::Leaf(data_ref)
    }

    pub fn tag(&self) -> NodeType {
        match self {
            QuadtreeNode::Branch(_) => NodeType::Branch,
            QuadtreeNode::Leaf(_) => NodeType::Leaf,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, QuadtreeNode::Leaf(_))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, QuadtreeNode::Branch(_))
    }

    pub fn leaf_ref(&self) -> CoreResult<i64> {
        match self {
            QuadtreeNode::Leaf(r) => Ok(*r),
            QuadtreeNode::Branch(_) => Err(CoreError::InvalidNodeType),
        }
    }

    /// `quadrant` is one of [`BL`], [`BR`], [`TL`], [`TR`].
    pub fn child_ref(&self, quadrant: usize) -> CoreResult<i64> {
        match self {
            QuadtreeNode::Branch(refs) => Ok(refs[quadrant]),
            QuadtreeNode::Leaf(_) => Err(CoreError::InvalidNodeType),
        }
    }

    pub fn children(&self) -> CoreResult<[i64; 4]> {
        match self {
            QuadtreeNode::Branch(refs) => Ok(*refs),
            QuadtreeNode::Leaf(_) => Err(CoreError::InvalidNodeType),
        }
    }

    /// Every child of this branch equals `leaf_ref` and is itself a leaf
    /// pointing at that same data index — used by `compress` after it
    /// has already confirmed the children are leaves.
    pub fn is_uniform_leaf_quad(children: [&QuadtreeNode; 4]) -> Option<i64> {
        let refs: Option<Vec<i64>> = children.iter().map(|c| c.leaf_ref().ok()).collect();
        let refs = refs?;
        if refs.windows(2).all(|w| w[0] == w[1]) {
            Some(refs[0])
        } else {
            None
        }
    }

    /// Writes the fixed 36-byte record. Unused fields (padding for a leaf)
    /// are zero; the encoder writes all 36 bytes whether Leaf or Branch.
    pub fn encode(&self, endian: Endian) -> [u8; NODE_BYTE_LEN] {
        let mut buf = Vec::with_capacity(NODE_BYTE_LEN);
        match self {
            QuadtreeNode::Branch(refs) => {
                write_u32(&mut buf, endian, NodeType::Branch as u32);
                for r in refs {
                    write_i64(&mut buf, endian, *r);
                }
            }
            QuadtreeNode::Leaf(leaf_ref) => {
                write_u32(&mut buf, endian, NodeType::Leaf as u32);
                write_i64(&mut buf, endian, *leaf_ref);
                write_i64(&mut buf, endian, 0);
                write_i64(&mut buf, endian, 0);
                write_i64(&mut buf, endian, 0);
            }
        }
        let mut out = [0u8; NODE_BYTE_LEN];
        out.copy_from_slice(&buf);
        out
    }

    pub fn decode(bytes: &[u8], endian: Endian) -> CoreResult<Self> {
        if bytes.len() < NODE_BYTE_LEN {
            return Err(CoreError::MalformedFile(format!(
                "node record truncated: got {} bytes, need {}",
                bytes.len(),
                NODE_BYTE_LEN
            )));
        }
        let tag = read_u32(&bytes[0..4], endian);
        let ref0 = read_i64(&bytes[4..12], endian);
        match tag {
            0 => {
                let ref1 = read_i64(&bytes[12..20], endian);
                let ref2 = read_i64(&bytes[20..28], endian);
                let ref3 = read_i64(&bytes[28..36], endian);
                Ok(QuadtreeNode::Branch([ref0, ref1, ref2, ref3]))
            }
            1 => Ok(QuadtreeNode::Leaf(ref0)),
            other => Err(CoreError::MalformedFile(format!(
                "unknown node tag {other}"
            ))),
        }
    }
}

impl crate::array::ByteSerialize for QuadtreeNode {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        self.encode(Endian::Little).to_vec()
    }
}

/// Indices of [`QuadtreeNode::Branch`]'s four refs, for call sites that
/// iterate `0..4` instead of naming a quadrant directly.
pub const QUADRANTS: [usize; 4] = [BL, BR, TL, TR];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_round_trips_both_endians() {
        for endian in [Endian::Little, Endian::Big] {
            let n = QuadtreeNode::leaf(12345);
            let bytes = n.encode(endian);
            assert_eq!(bytes.len(), NODE_BYTE_LEN);
            assert_eq!(QuadtreeNode::decode(&bytes, endian).unwrap(), n);
        }
    }

    #[test]
    fn branch_round_trips_both_endians() {
        for endian in [Endian::Little, Endian::Big] {
            let n = QuadtreeNode::branch([1, 2, 3, 4]);
            let bytes = n.encode(endian);
            assert_eq!(QuadtreeNode::decode(&bytes, endian).unwrap(), n);
        }
    }

    #[test]
    fn leaf_padding_is_zeroed() {
        let n = QuadtreeNode::leaf(7);
        let bytes = n.encode(Endian::Little);
        assert_eq!(&bytes[12..36], &[0u8; 24]);
    }

    #[test]
    fn wrong_node_type_operations_fail() {
        let leaf = QuadtreeNode::leaf(1);
        let branch = QuadtreeNode::branch([0, 0, 0, 0]);
        assert!(matches!(branch.leaf_ref(), Err(CoreError::InvalidNodeType)));
        assert!(matches!(
            leaf.child_ref(BL),
            Err(CoreError::InvalidNodeType)
        ));
    }

    #[test]
    fn truncated_bytes_are_malformed() {
        let short = [0u8; 10];
        assert!(matches!(
            QuadtreeNode::decode(&short, Endian::Little),
            Err(CoreError::MalformedFile(_))
        ));
    }
}
