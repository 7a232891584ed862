//! Closed-form addressing of rings inside the flat vertex list.
//!
//! Rings are never stored as objects. A ring is the contiguous block of
//! `ring_size` vertices ending `rings_back - 1` rings before the end of the
//! vertex list, so the vertex count and the ring size are enough to find it.

/// Index of the first vertex of the ring `rings_back` rings from the end.
///
/// `rings_back == 1` is the most recently appended ring, `2` the one before
/// it. Returns `None` when the vertex list does not hold that many rings.
pub fn ring_start(vertex_count: usize, ring_size: usize, rings_back: usize) -> Option<usize> {
    if rings_back == 0 || ring_size == 0 {
        return None;
    }
    vertex_count.checked_sub(rings_back * ring_size)
}

/// Index of the last vertex of a ring that starts at `start`.
pub fn ring_end(start: usize, ring_size: usize) -> usize {
    start + ring_size - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_start_last_and_previous() {
        // Three rings of four vertices
        assert_eq!(ring_start(12, 4, 1), Some(8));
        assert_eq!(ring_start(12, 4, 2), Some(4));
        assert_eq!(ring_start(12, 4, 3), Some(0));
    }

    #[test]
    fn test_ring_start_insufficient_rings() {
        assert_eq!(ring_start(4, 4, 2), None);
        assert_eq!(ring_start(0, 4, 1), None);
        assert_eq!(ring_start(12, 4, 4), None);
    }

    #[test]
    fn test_ring_start_degenerate_arguments() {
        assert_eq!(ring_start(12, 4, 0), None);
        assert_eq!(ring_start(12, 0, 1), None);
    }

    #[test]
    fn test_ring_end() {
        assert_eq!(ring_end(8, 4), 11);
        assert_eq!(ring_end(0, 256), 255);
    }
}
