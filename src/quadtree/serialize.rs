//! Binary (de)serialisation of a `Quadtree<T>` to the fixed-header,
//! fixed-width-record file format: a 16-byte header, the tree section
//! (`NODE_BYTE_LEN` bytes per entry), then the data section (`S_tile`
//! bytes per entry, running to EOF).

use crate::bits::{read_u32, read_u64, write_u32, write_u64, Endian};
use crate::error::{CoreError, CoreResult};
use crate::quadtree::node::{QuadtreeNode, NODE_BYTE_LEN};
use crate::quadtree::tile::{Tile, TileRegistry};
use crate::quadtree::Quadtree;

const HEADER_LEN: usize = 16;

pub fn serialize<T: Tile>(qt: &Quadtree<T>, endian: Endian) -> Vec<u8> {
    let (tree_length, data_length) = qt.get_length();
    let mut out = Vec::with_capacity(HEADER_LEN + tree_length * NODE_BYTE_LEN + data_length * T::SERIALIZED_LEN);
    write_u32(&mut out, endian, qt.max_height());
    write_u32(&mut out, endian, T::SERIALIZED_LEN as u32);
    write_u64(&mut out, endian, tree_length as u64);
    for i in 0..tree_length {
        out.extend_from_slice(&qt.tree_array().get_unchecked(i).encode(endian));
    }
    for i in 0..data_length {
        out.extend_from_slice(&qt.data_array().get_unchecked(i).serialize(endian));
    }
    out
}

pub fn deserialize<T: Tile>(
    bytes: &[u8],
    endian: Endian,
    registry: &TileRegistry<T>,
) -> CoreResult<Quadtree<T>> {
    if bytes.len() < HEADER_LEN {
        return Err(CoreError::MalformedFile(format!(
            "header truncated: got {} bytes, need {HEADER_LEN}",
            bytes.len()
        )));
    }
    let height = read_u32(&bytes[0..4], endian);
    let tile_len = read_u32(&bytes[4..8], endian) as usize;
    let tree_length = read_u64(&bytes[8..16], endian) as usize;

    if !(2..=64).contains(&height) {
        return Err(CoreError::InvalidHeight { height });
    }
    if tile_len != T::SERIALIZED_LEN {
        return Err(CoreError::MalformedFile(format!(
            "file's tile_serialize_len {tile_len} does not match {} bytes expected by this Tile type",
            T::SERIALIZED_LEN
        )));
    }

    let tree_start = HEADER_LEN;
    let tree_bytes_len = tree_length
        .checked_mul(NODE_BYTE_LEN)
        .ok_or_else(|| CoreError::MalformedFile("tree_length overflows".into()))?;
    let tree_end = tree_start + tree_bytes_len;
    if bytes.len() < tree_end {
        return Err(CoreError::MalformedFile(format!(
            "tree section truncated: need {tree_bytes_len} bytes, have {}",
            bytes.len() - tree_start
        )));
    }

    let mut tree_nodes = Vec::with_capacity(tree_length);
    for i in 0..tree_length {
        let off = tree_start + i * NODE_BYTE_LEN;
        tree_nodes.push(QuadtreeNode::decode(&bytes[off..off + NODE_BYTE_LEN], endian)?);
    }

    let data_bytes = &bytes[tree_end..];
    if tile_len == 0 || data_bytes.len() % tile_len != 0 {
        return Err(CoreError::MalformedFile(format!(
            "data section length {} is not a multiple of tile_serialize_len {tile_len}",
            data_bytes.len()
        )));
    }
    let data_length = data_bytes.len() / tile_len;
    let mut data_values = Vec::with_capacity(data_length);
    for i in 0..data_length {
        let off = i * tile_len;
        data_values.push(registry.decode(&data_bytes[off..off + tile_len], endian)?);
    }
    if data_values.is_empty() {
        return Err(CoreError::MalformedFile(
            "data section is empty; missing the default tile at index 0".into(),
        ));
    }

    log::debug!(
        "loaded quadtree: height={height} tree_length={tree_length} data_length={data_length}"
    );
    let default = data_values[0].clone();
    Quadtree::from_raw_parts(height, default, tree_nodes, data_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ByteSerialize;
    use crate::geometry::Vec2;

    /// The tile's single wire byte doubles as its registry id, so the
    /// default tile (`b'A'`) and the painted tile (`b'B'`) decode through
    /// distinct registry entries.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct ColorTile {
        kind: u8,
    }

    impl ByteSerialize for ColorTile {
        fn to_canonical_bytes(&self) -> Vec<u8> {
            vec![self.kind]
        }
    }

    impl Tile for ColorTile {
        const SERIALIZED_LEN: usize = 1;

        fn id() -> &'static str {
            "C"
        }

        fn serialize(&self, _endian: Endian) -> Vec<u8> {
            vec![self.kind]
        }

        fn deserialize(bytes: &[u8], _endian: Endian) -> CoreResult<Self> {
            Ok(ColorTile { kind: bytes[0] })
        }

        fn color(&self) -> Option<[u8; 3]> {
            Some([self.kind, self.kind, self.kind])
        }
    }

    fn registry() -> TileRegistry<ColorTile> {
        let mut reg = TileRegistry::new(1);
        reg.register("A", |b, e| ColorTile::deserialize(b, e));
        reg.register("B", |b, e| ColorTile::deserialize(b, e));
        reg
    }

    #[test]
    fn round_trip_preserves_observable_values_both_endians() {
        for endian in [Endian::Little, Endian::Big] {
            let mut qt: Quadtree<ColorTile> =
                Quadtree::new(8, ColorTile { kind: b'A' }, false).unwrap();
            qt.set_range(
                crate::geometry::Range2D {
                    min_x: 0,
                    min_y: 0,
                    max_x: 127,
                    max_y: 127,
                },
                ColorTile { kind: b'B' },
            );
            qt.compress();

            let bytes = serialize(&qt, endian);
            let reg = registry();
            let loaded = deserialize(&bytes, endian, &reg).unwrap();

            assert_eq!(loaded.get(Vec2::new(64, 64)).unwrap(), ColorTile { kind: b'B' });
            assert_eq!(loaded.get(Vec2::new(-1, -1)).unwrap(), ColorTile { kind: b'A' });
        }
    }

    #[test]
    fn truncated_header_is_malformed() {
        let reg: TileRegistry<ColorTile> = TileRegistry::new(1);
        assert!(matches!(
            deserialize(&[0u8; 4], Endian::Little, &reg),
            Err(CoreError::MalformedFile(_))
        ));
    }

    #[test]
    fn mismatched_tile_len_is_malformed() {
        let mut header = Vec::new();
        write_u32(&mut header, Endian::Little, 8);
        write_u32(&mut header, Endian::Little, 99);
        write_u64(&mut header, Endian::Little, 0);
        let reg: TileRegistry<ColorTile> = TileRegistry::new(1);
        assert!(matches!(
            deserialize(&header, Endian::Little, &reg),
            Err(CoreError::MalformedFile(_))
        ));
    }
}
