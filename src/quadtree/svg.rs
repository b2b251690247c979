//! One-shot SVG export: branches draw their outer rectangle, leaves fill
//! theirs with a colour derived from their tile. Purely read-only.

use crate::geometry::Range2D;
use crate::quadtree::node::QuadtreeNode;
use crate::quadtree::tile::Tile;
use crate::quadtree::Quadtree;

/// Default fill used for leaves whose tile has no [`Tile::color`].
pub const DEFAULT_FILL: [u8; 3] = [128, 128, 128];

pub fn to_svg<T: Tile>(qt: &Quadtree<T>, scale: f64) -> String {
    let world = qt.dimensions();
    let width = world.width() as f64 * scale;
    let height = world.height() as f64 * scale;
    let mut out = String::new();
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    ));
    write_node(qt, 0, world, world, scale, &mut out);
    out.push_str("</svg>\n");
    out
}

fn write_node<T: Tile>(
    qt: &Quadtree<T>,
    node_idx: usize,
    range: Range2D,
    world: Range2D,
    scale: f64,
    out: &mut String,
) {
    let node = qt.tree_array().get_unchecked(node_idx);
    let (x, y, w, h) = screen_rect(range, world, scale);
    match node {
        QuadtreeNode::Leaf(leaf_ref) => {
            let tile = qt.data_array().get_unchecked(*leaf_ref as usize);
            let [r, g, b] = tile.color().unwrap_or(DEFAULT_FILL);
            out.push_str(&format!(
                "  <rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"rgb({r},{g},{b})\" />\n"
            ));
        }
        QuadtreeNode::Branch(refs) => {
            out.push_str(&format!(
                "  <rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"none\" stroke=\"black\" />\n"
            ));
            let child_ranges = range.split_into_quarters();
            for quadrant in 0..4 {
                write_node(qt, refs[quadrant] as usize, child_ranges[quadrant], world, scale, out);
            }
        }
    }
}

/// Maps a world-space rectangle to SVG screen space: `y` grows downward on
/// screen but upward in world space, so the vertical axis is flipped.
fn screen_rect(range: Range2D, world: Range2D, scale: f64) -> (f64, f64, f64, f64) {
    let x = (range.min_x - world.min_x) as f64 * scale;
    let y = (world.max_y - range.max_y) as f64 * scale;
    let w = range.width() as f64 * scale;
    let h = range.height() as f64 * scale;
    (x, y, w, h)
}
