//! `Quadtree<T>`: a region quadtree over a signed, origin-centred square
//! world, backed by two `DynamicArray`s (tree nodes, tile data) addressed
//! through stable indices.
//!
//! A stack-walk expands a leaf into a branch of four leaves on demand,
//! descends, then runs a bottom-up `simplify` pass over the path just
//! touched; `compress()` runs that same pass over the whole tree rather
//! than gating it to a per-insert pass alone.

pub mod node;

mod detail;
pub mod serialize;
pub mod tile;

#[cfg(feature = "svg")]
pub mod svg;


pub use node::{NodeType, QuadtreeNode, NODE_BYTE_LEN};

use crate::array::{ArrayModification, DynamicArray, DynamicArrayConfig};
use crate::error::{CoreError, CoreResult};
use crate::geometry::Range2D;
use std::collections::HashSet;

pub use crate::geometry::Vec2;

/// Below this coalesced area (world units squared), consecutive pending
/// modifications may be merged before a `compress()` pass runs.
pub const EAGER_COMPRESS_AREA: u128 = 4096;

/// Maximum number of writes a deferred compression pass can be pushed past
/// before it is forced.
pub const MAX_MODIFICATION_LIFETIME: u32 = 20;

pub struct Quadtree<T: Default + Clone + PartialEq> {
    height: u32,
    world: Range2D,
    default: T,
    tree: DynamicArray<QuadtreeNode>,
    data: DynamicArray<T>,
    auto_compress: bool,
    pending_area: u128,
    pending_age: u32,
}

impl<T: Default + Clone + PartialEq> Quadtree<T> {
    /// `height` must be in `[2, 64]`. The root starts as a leaf pointing at
    /// data index 0, which holds `default`.
    pub fn new(height: u32, default: T, store_modifications: bool) -> CoreResult<Self> {
        if !(2..=64).contains(&height) {
            return Err(CoreError::InvalidHeight { height });
        }
        let tree_config = DynamicArrayConfig::new(crate::array::CHUNK_LEN, true, store_modifications);
        let data_config = DynamicArrayConfig::new(crate::array::CHUNK_LEN, true, store_modifications);
        let mut tree: DynamicArray<QuadtreeNode> = DynamicArray::new(tree_config);
        let mut data: DynamicArray<T> = DynamicArray::new(data_config);
        let root_data = data.add(default.clone());
        debug_assert_eq!(root_data, 0);
        let root_node = tree.add(QuadtreeNode::leaf(0));
        debug_assert_eq!(root_node, 0);
        Ok(Self {
            world: detail::world_range(height),
            height,
            default,
            tree,
            data,
            auto_compress: true,
            pending_area: 0,
            pending_age: 0,
        })
    }

    pub fn set_auto_compress(&mut self, on: bool) {
        self.auto_compress = on;
    }

    pub fn dimensions(&self) -> Range2D {
        self.world
    }

    pub fn max_height(&self) -> u32 {
        self.height
    }

    pub fn get_length(&self) -> (usize, usize) {
        (self.tree.len(), self.data.len())
    }

    /// `(tree_length, data_length)`, same as [`Self::get_length`].
    pub fn len(&self) -> (usize, usize) {
        self.get_length()
    }

    /// True if the tree holds nothing but the root leaf pointing at the
    /// default value, i.e. no write has ever taken effect.
    pub fn is_empty(&self) -> bool {
        let (tree_length, data_length) = self.get_length();
        tree_length <= 1 && data_length <= 1
    }

    pub fn get(&self, point: Vec2) -> CoreResult<T> {
        if !self.world.contains_point(point) {
            return Err(CoreError::OutOfRange {
                x: point.x,
                y: point.y,
            });
        }
        let z = detail::morton_index(point, self.height);
        let mut node_idx = 0usize;
        for level in 0..self.height {
            let node = self.tree.get(node_idx)?;
            match node {
                QuadtreeNode::Leaf(leaf_ref) => return Ok(self.data.get(*leaf_ref as usize)?.clone()),
                QuadtreeNode::Branch(_) => {
                    let quadrant = detail::quadrant_at(z, self.height, level);
                    node_idx = node.child_ref(quadrant)?.try_into().unwrap();
                }
            }
        }
        let node = self.tree.get(node_idx)?;
        Ok(self.data.get(node.leaf_ref()? as usize)?.clone())
    }

    /// `OutOfRange` if `point` lies outside the world.
    pub fn set(&mut self, point: Vec2, v: T) -> CoreResult<()> {
        if !self.world.contains_point(point) {
            return Err(CoreError::OutOfRange {
                x: point.x,
                y: point.y,
            });
        }
        let target = Range2D::from_corners(point, point);
        let data_idx = self.dedup_data(v);
        self.set_range_node(0, self.world, target, data_idx);
        self.note_modification(1);
        Ok(())
    }

    /// A no-op if `range` doesn't overlap the world at all; otherwise the
    /// write is clipped to the world before being applied.
    pub fn set_range(&mut self, range: Range2D, v: T) {
        if !self.world.overlaps(&range) {
            return;
        }
        let clipped = self.world.overlap(&range);
        let data_idx = self.dedup_data(v);
        self.set_range_node(0, self.world, clipped, data_idx);
        self.note_modification(clipped.area());
    }

    fn dedup_data(&mut self, v: T) -> usize {
        for i in 0..self.data.len() {
            if let Ok(existing) = self.data.get(i) {
                if *existing == v {
                    return i;
                }
            }
        }
        self.data.add(v)
    }

    /// Recursive descent shared by point- and range-set: `target` is
    /// always pre-clipped to the world.
    fn set_range_node(&mut self, node_idx: usize, node_range: Range2D, target: Range2D, data_idx: usize) {
        if target.contains(&node_range) || node_range.width() < 2 || node_range.height() < 2 {
            self.free_subtree_children(node_idx);
            self.tree.set(node_idx, QuadtreeNode::leaf(data_idx));
            return;
        }
        let node = self.tree.get(node_idx).expect("live tree index").clone();
        if let QuadtreeNode::Leaf(leaf_ref) = node {
            let mut child_refs = [0i64; 4];
            for slot in &mut child_refs {
                *slot = self.tree.add(QuadtreeNode::leaf(leaf_ref)) as i64;
            }
            self.tree.set(node_idx, QuadtreeNode::branch(child_refs));
        }
        let node = self.tree.get(node_idx).expect("live tree index").clone();
        let children = node.children().expect("just ensured branch");
        let child_ranges = node_range.split_into_quarters();
        for quadrant in 0..4 {
            let child_range = child_ranges[quadrant];
            if !child_range.overlaps(&target) {
                continue;
            }
            self.set_range_node(children[quadrant] as usize, child_range, target, data_idx);
        }
    }

    /// Frees (soft-deletes) every tree entry under `node_idx`'s current
    /// children, without touching `node_idx` itself. Orphaned data entries
    /// are reclaimed later, in bulk, by `compress`.
    fn free_subtree_children(&mut self, node_idx: usize) {
        let node = match self.tree.get(node_idx) {
            Ok(n) => n.clone(),
            Err(_) => return,
        };
        if let QuadtreeNode::Branch(refs) = node {
            for r in refs {
                self.free_subtree_children(r as usize);
                let _ = self.tree.remove(r as usize, false);
            }
        }
    }

    fn note_modification(&mut self, area: u128) {
        self.pending_area += area;
        self.pending_age += 1;
        if self.auto_compress
            && (self.pending_age >= MAX_MODIFICATION_LIFETIME || self.pending_area >= EAGER_COMPRESS_AREA)
        {
            self.compress();
        }
    }

    /// Bottom-up pass replacing any branch whose four children are leaves
    /// with identical `leafRef` by a single leaf, repeated to a fixed
    /// point. Afterward, every tree/data entry no longer reachable from
    /// the root is reclaimed (soft-deleted).
    pub fn compress(&mut self) {
        let (tree_before, data_before) = self.get_length();
        while self.compress_pass(0) {}
        self.reclaim_unreachable();
        self.pending_area = 0;
        self.pending_age = 0;
        log::trace!(
            "compressed quadtree: tree {tree_before} -> {}, data {data_before} -> {}",
            self.tree.len(),
            self.data.len()
        );
    }

    fn compress_pass(&mut self, node_idx: usize) -> bool {
        let node = match self.tree.get(node_idx) {
            Ok(n) => n.clone(),
            Err(_) => return false,
        };
        let QuadtreeNode::Branch(refs) = node else {
            return false;
        };
        let mut changed = false;
        for &r in &refs {
            if self.compress_pass(r as usize) {
                changed = true;
            }
        }
        let child_nodes: Vec<QuadtreeNode> = refs
            .iter()
            .filter_map(|&r| self.tree.get(r as usize).ok().cloned())
            .collect();
        if child_nodes.len() == 4 && child_nodes.iter().all(|c| c.is_leaf()) {
            let leaf_refs: Vec<i64> = child_nodes.iter().map(|c| c.leaf_ref().unwrap()).collect();
            if leaf_refs.windows(2).all(|w| w[0] == w[1]) {
                for &r in &refs {
                    let _ = self.tree.remove(r as usize, false);
                }
                self.tree.set(node_idx, QuadtreeNode::leaf(leaf_refs[0]));
                changed = true;
            }
        }
        changed
    }

    fn reclaim_unreachable(&mut self) {
        let mut reachable_tree = HashSet::new();
        let mut reachable_data = HashSet::new();
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if !reachable_tree.insert(idx) {
                continue;
            }
            if let Ok(node) = self.tree.get(idx) {
                match node {
                    QuadtreeNode::Leaf(d) => {
                        reachable_data.insert(*d as usize);
                    }
                    QuadtreeNode::Branch(refs) => {
                        for r in refs {
                            stack.push(*r as usize);
                        }
                    }
                }
            }
        }
        for i in 0..self.tree.len() {
            if !reachable_tree.contains(&i) {
                let _ = self.tree.remove(i, false);
            }
        }
        for i in 1..self.data.len() {
            if !reachable_data.contains(&i) {
                let _ = self.data.remove(i, false);
            }
        }
    }

    /// Resets both arrays and reinstalls a root leaf pointing at the
    /// stored default value.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.data.clear();
        let root_data = self.data.add(self.default.clone());
        debug_assert_eq!(root_data, 0);
        let root_node = self.tree.add(QuadtreeNode::leaf(0));
        debug_assert_eq!(root_node, 0);
        self.pending_area = 0;
        self.pending_age = 0;
    }

    /// Descends from the real root into whichever single child wholly
    /// contains `window`, stopping once the current sub-range's side is
    /// no larger than `2^max_depth`, the current node is a leaf, or no
    /// child wholly contains `window`. Never mutates the tree.
    pub fn get_subset(&self, window: Range2D, max_depth: u32) -> (QuadtreeNode, Range2D) {
        let mut node_idx = 0usize;
        let mut range = self.world;
        let side_limit = crate::bits::pow2(max_depth.min(64));
        loop {
            let node = self.tree.get(node_idx).expect("live tree index");
            if node.is_leaf() {
                break;
            }
            if side_limit != 0 && range.width() <= side_limit {
                break;
            }
            let child_ranges = range.split_into_quarters();
            let children = node.children().expect("checked not a leaf");
            let chosen = (0..4).find(|&q| child_ranges[q].contains(&window));
            match chosen {
                Some(q) => {
                    node_idx = children[q] as usize;
                    range = child_ranges[q];
                }
                None => break,
            }
        }
        (self.tree.get(node_idx).expect("live tree index").clone(), range)
    }

    /// Drains the tree array's modification log into `dest`; a second call
    /// before any further writes reports nothing.
    pub fn get_tree_modifications(
        &mut self,
        dest: &mut Vec<ArrayModification<QuadtreeNode>>,
    ) -> CoreResult<usize> {
        self.tree.get_modifications(dest)
    }

    /// Drains the data array's modification log into `dest`; a second call
    /// before any further writes reports nothing.
    pub fn get_data_modifications(&mut self, dest: &mut Vec<ArrayModification<T>>) -> CoreResult<usize> {
        self.data.get_modifications(dest)
    }

    pub(crate) fn tree_array(&self) -> &DynamicArray<QuadtreeNode> {
        &self.tree
    }

    pub(crate) fn data_array(&self) -> &DynamicArray<T> {
        &self.data
    }

    /// Rebuilds a quadtree from a flat decode of a saved file: every
    /// loaded entry is treated as occupied (the on-disk format doesn't
    /// preserve which slots were dead, only their stable positions).
    pub(crate) fn from_raw_parts(
        height: u32,
        default: T,
        tree_nodes: Vec<QuadtreeNode>,
        data_values: Vec<T>,
    ) -> CoreResult<Self> {
        if !(2..=64).contains(&height) {
            return Err(CoreError::InvalidHeight { height });
        }
        if tree_nodes.is_empty() || data_values.is_empty() {
            return Err(CoreError::MalformedFile(
                "quadtree file has an empty tree or data section".into(),
            ));
        }
        let tree_config = DynamicArrayConfig::new(crate::array::CHUNK_LEN, true, false);
        let data_config = DynamicArrayConfig::new(crate::array::CHUNK_LEN, true, false);
        let tree = DynamicArray::from_values(&tree_nodes, tree_config);
        let data = DynamicArray::from_values(&data_values, data_config);
        Ok(Self {
            world: detail::world_range(height),
            height,
            default,
            tree,
            data,
            auto_compress: true,
            pending_area: 0,
            pending_age: 0,
        })
    }
}
