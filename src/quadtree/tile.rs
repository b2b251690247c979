//! `Tile`: the caller-provided payload type stored in a quadtree's data
//! array, plus the id-dispatched decoder registry used to deserialise one
//! from a saved file.
//!
//! Generalises a fixed in-memory voxel-colour trait (`new`/`albedo`/
//! `user_data`, implemented directly on `u32`) into an arbitrary
//! fixed-width, id-tagged wire record, and a colour-lookup method
//! (`albedo`) into the optional `color()` used by SVG export.

use crate::array::ByteSerialize;
use crate::bits::Endian;
use crate::error::{CoreError, CoreResult};

/// A value a quadtree can store at a leaf.
///
/// `SERIALIZED_LEN` is the fixed `S_tile` byte count every instance
/// serialises to, known at compile time.
pub trait Tile: Default + Clone + PartialEq + ByteSerialize {
    const SERIALIZED_LEN: usize;

    /// Short string identifying this tile's kind, matched against the
    /// registry during deserialisation.
    fn id() -> &'static str;

    fn serialize(&self, endian: Endian) -> Vec<u8>;

    fn deserialize(bytes: &[u8], endian: Endian) -> CoreResult<Self>;

    /// Optional RGB fill colour for SVG export. Tiles with no natural
    /// colour (e.g. a marker/metadata tile) can return `None` and let the
    /// renderer supply a default.
    fn color(&self) -> Option<[u8; 3]> {
        None
    }
}

type DecodeFn<T> = Box<dyn Fn(&[u8], Endian) -> CoreResult<T> + Send + Sync>;

/// Dispatches a saved tile's bytes to the right decoder by its id prefix.
///
/// Mirrors a plain decode-by-id registry: `register` installs a decoder
/// under a name, `decode` reads that name back off the bytes and calls it.
/// This lives outside the wire format itself — the format only stores
/// `S_tile` raw bytes per record, with the id embedded by convention at a
/// fixed offset the registered decoders agree on.
pub struct TileRegistry<T> {
    id_len: usize,
    decoders: std::collections::HashMap<String, DecodeFn<T>>,
}

impl<T> TileRegistry<T> {
    /// `id_len` is the number of leading bytes of a tile record that
    /// identify its kind; every registered id must fit in that many bytes.
    pub fn new(id_len: usize) -> Self {
        Self {
            id_len,
            decoders: std::collections::HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, id: &str, decode: F)
    where
        F: Fn(&[u8], Endian) -> CoreResult<T> + Send + Sync + 'static,
    {
        self.decoders.insert(id.to_string(), Box::new(decode));
    }

    pub fn decode(&self, bytes: &[u8], endian: Endian) -> CoreResult<T> {
        if bytes.len() < self.id_len {
            return Err(CoreError::MalformedFile(format!(
                "tile record shorter than id length {}",
                self.id_len
            )));
        }
        let id = String::from_utf8_lossy(&bytes[..self.id_len])
            .trim_end_matches('\0')
            .to_string();
        match self.decoders.get(&id) {
            Some(decode) => decode(bytes, endian),
            None => Err(CoreError::MalformedFile(format!(
                "no decoder registered for tile id {id:?}"
            ))),
        }
    }
}
