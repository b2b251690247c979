//! Addressing helpers shared by `Quadtree<T>`'s point/range walks.
//!
//! Generalises `bound_contains`/`child_octant_for`/`hash_region` (3D octant
//! selection via Euclidean bit hashing) to 2D: the quadrant a point falls
//! into at a given tree level is read directly off the Morton Z-index of
//! its (unsigned) coordinates, rather than recomputed per level from a
//! float comparison.

use crate::bits::{interleave, unsign};
use crate::geometry::{Range2D, Vec2};

/// The world range for a quadtree of the given height: a square of side
/// `2^h` centred on the origin.
pub(crate) fn world_range(height: u32) -> Range2D {
    let half = if height == 64 {
        1i64 << 63
    } else {
        1i64 << (height - 1)
    };
    let max = if height == 64 { i64::MAX } else { half - 1 };
    Range2D {
        min_x: -half,
        min_y: -half,
        max_x: max,
        max_y: max,
    }
}

/// Interleaves `point`'s unsigned-biased coordinates into a Z-index whose
/// top `2*height` bits encode, two at a time, the quadrant selectors from
/// root downward.
pub(crate) fn morton_index(point: Vec2, height: u32) -> u128 {
    let ux = unsign(point.x, height);
    let uy = unsign(point.y, height);
    interleave(ux, uy)
}

/// The quadrant selector (one of `BL/BR/TL/TR`, i.e. `0..4`) at `level`
/// (`0` = the root's immediate children), read off `z`.
///
/// The bit pair at this level is `(x_bit, y_bit)`, and because `BL=0,
/// BR=1, TL=2, TR=3` already matches `x_bit | (y_bit << 1)`, the 2-bit
/// Morton digit *is* the quadrant index — no remapping needed.
pub(crate) fn quadrant_at(z: u128, height: u32, level: u32) -> usize {
    debug_assert!(level < height);
    let shift = 2 * (height - 1 - level);
    ((z >> shift) & 0b11) as usize
}
