//! Fixed-capacity chunking for bulk `IN (...)` lookups.

/// Split `items` into ordered chunks of at most `size` elements.
///
/// Order is preserved and nothing is deduplicated; callers dedupe before
/// batching. A `size` of zero yields a single chunk with everything in it
/// rather than looping forever.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![items.to_vec()];
    }
    items.chunks(size).map(|c| c.to_vec()).collect()
}
