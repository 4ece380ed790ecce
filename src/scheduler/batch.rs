//! Batch partitioning

/// Splits items into consecutive batches of at most `pool_size`
///
/// The partition is total and order-preserving: concatenating the batches
/// gives back the input. A zero pool size yields no batches.
///
/// # Examples
///
/// ```
/// use course_harvest::scheduler::partition;
///
/// let batches = partition(&[1, 2, 3, 4, 5], 3);
/// assert_eq!(batches, vec![&[1, 2, 3][..], &[4, 5][..]]);
/// ```
pub fn partition<T>(items: &[T], pool_size: usize) -> Vec<&[T]> {
    if pool_size == 0 {
        return Vec::new();
    }
    items.chunks(pool_size).collect()
}

/// Number of batches needed for `item_count` items
pub fn batch_count(item_count: usize, pool_size: usize) -> usize {
    if pool_size == 0 {
        return 0;
    }
    item_count.div_ceil(pool_size)
}
