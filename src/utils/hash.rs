//! Content hashing utilities.

use xxhash_rust::xxh3::xxh3_64;

/// Field separator used by [`hash_fields`]. Never appears in cell text.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Compute a content hash for arbitrary bytes
pub fn content_hash(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Hash a sequence of fields, separating them so that `["ab", "c"]` and
/// `["a", "bc"]` produce different hashes.
pub fn hash_fields<I, B>(fields: I) -> u64
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut buffer = Vec::new();
    for field in fields {
        buffer.extend_from_slice(field.as_ref());
        buffer.push(FIELD_SEPARATOR);
    }
    content_hash(&buffer)
}
