//! Snapshot chunking

use tracing::debug;

/// Default number of elements per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Split `snapshot` into contiguous chunks of at most `size` elements.
///
/// Chunk `i` holds elements `[i*size, min((i+1)*size, len))`. The chunks
/// partition the input exactly and in order; an empty snapshot yields no
/// chunks. Callers are expected to pass a positive size, a zero is treated
/// as one.
pub fn chunk<T>(snapshot: &[T], size: usize) -> Vec<&[T]> {
    let size = size.max(1);
    let chunks: Vec<&[T]> = snapshot.chunks(size).collect();

    debug!(
        "DOM chunking: {} elements -> {} chunks (max {} per chunk)",
        snapshot.len(),
        chunks.len(),
        size
    );

    chunks
}
