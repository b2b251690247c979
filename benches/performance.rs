use criterion::{criterion_group, criterion_main};

use quadworld_rs::array::ByteSerialize;
use quadworld_rs::bits::Endian;
use quadworld_rs::error::CoreResult;
use quadworld_rs::geometry::{Range2D, Vec2};
use quadworld_rs::quadtree::tile::{Tile, TileRegistry};
use quadworld_rs::quadtree::Quadtree;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct BenchTile {
    kind: u8,
}

impl ByteSerialize for BenchTile {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        vec![self.kind]
    }
}

impl Tile for BenchTile {
    const SERIALIZED_LEN: usize = 1;

    fn id() -> &'static str {
        "B"
    }

    fn serialize(&self, _endian: Endian) -> Vec<u8> {
        vec![self.kind]
    }

    fn deserialize(bytes: &[u8], _endian: Endian) -> CoreResult<Self> {
        Ok(BenchTile { kind: bytes[0] })
    }
}

fn criterion_benchmark(c: &mut criterion::Criterion) {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let world_half = 1 << 14; // height 16 world spans [-16384, 16383]

    // kind 0 is never used: its wire byte is `0x00`, which the registry's
    // id-trimming would collapse to an empty id on deserialisation.
    let mut tree: Quadtree<BenchTile> =
        Quadtree::new(16, BenchTile { kind: 1 }, false).unwrap();
    tree.set_auto_compress(false);
    for _ in 0..200_000 {
        tree.set(
            Vec2::new(
                rng.gen_range(-world_half..world_half),
                rng.gen_range(-world_half..world_half),
            ),
            BenchTile {
                kind: rng.gen_range(1..127),
            },
        )
        .expect("point set within world bounds to succeed");
    }
    tree.set_auto_compress(true);

    c.bench_function("quadtree point set", |b| {
        b.iter(|| {
            tree.set(
                Vec2::new(
                    rng.gen_range(-world_half..world_half),
                    rng.gen_range(-world_half..world_half),
                ),
                BenchTile {
                    kind: rng.gen_range(1..127),
                },
            )
            .ok()
        });
    });

    c.bench_function("quadtree range set", |b| {
        b.iter(|| {
            let cx = rng.gen_range(-world_half..world_half - 64);
            let cy = rng.gen_range(-world_half..world_half - 64);
            tree.set_range(
                Range2D {
                    min_x: cx,
                    min_y: cy,
                    max_x: cx + 63,
                    max_y: cy + 63,
                },
                BenchTile {
                    kind: rng.gen_range(1..127),
                },
            );
        });
    });

    c.bench_function("quadtree get", |b| {
        b.iter(|| {
            tree.get(Vec2::new(
                rng.gen_range(-world_half..world_half),
                rng.gen_range(-world_half..world_half),
            ))
        });
    });

    c.bench_function("quadtree compress", |b| {
        b.iter(|| {
            tree.compress();
        });
    });

    c.bench_function("quadtree get_subset", |b| {
        b.iter(|| {
            tree.get_subset(
                Range2D {
                    min_x: -256,
                    min_y: -256,
                    max_x: 255,
                    max_y: 255,
                },
                8,
            )
        });
    });

    let mut registry: TileRegistry<BenchTile> = TileRegistry::new(1);
    for kind in 1u8..127 {
        let id = (kind as char).to_string();
        registry.register(&id, |bytes, endian| BenchTile::deserialize(bytes, endian));
    }

    c.bench_function("quadtree serialize", |b| {
        b.iter(|| quadworld_rs::quadtree::serialize::serialize(&tree, Endian::Little));
    });

    let bytes = quadworld_rs::quadtree::serialize::serialize(&tree, Endian::Little);
    c.bench_function("quadtree deserialize", |b| {
        b.iter(|| quadworld_rs::quadtree::serialize::deserialize(&bytes, Endian::Little, &registry));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
