//! Fixed-size text chunking

use mythos_core::{Error, Result};

/// Default fragment size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split `text` into contiguous pieces of at most `size` characters.
///
/// Boundaries are purely positional: words and sentences may be cut. No
/// whitespace or encoding normalisation is applied, and a multi-byte
/// character is never split.
pub fn chunk(text: &str, size: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(Error::InvalidArgument(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == size {
            chunks.push(text[start..offset].to_string());
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    Ok(chunks)
}
