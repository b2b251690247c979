//! Canonical byte serialisation for content hashing. Any type
//! stored in a `DynamicArray` that wants a `hash()` must say how to turn
//! itself into the bytes that get digested; order of fields must be stable
//! across a round trip since the hash is only useful if both ends agree.

use crate::array::modlog::ArrayModification;

pub trait ByteSerialize {
    fn to_canonical_bytes(&self) -> Vec<u8>;
}

macro_rules! impl_byte_serialize_int {
    ($($t:ty),*) => {
        $(impl ByteSerialize for $t {
            fn to_canonical_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        })*
    };
}

impl_byte_serialize_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128);

impl<T: ByteSerialize> ByteSerialize for ArrayModification<T> {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut buf = self.index.to_le_bytes().to_vec();
        buf.extend(self.value.to_canonical_bytes());
        buf
    }
}
