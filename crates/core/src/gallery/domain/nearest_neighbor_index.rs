/// Closest stored vector to a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Metric distance; lower is more similar.
    pub distance: f32,
    /// Row of the stored vector, which is also the position of its name.
    pub position: usize,
}

/// Read-only exact nearest-neighbor search over fixed-length vectors.
pub trait NearestNeighborIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Single nearest neighbor, or `None` for an empty index.
    ///
    /// `query.len()` must equal [`dimension`](Self::dimension).
    fn nearest(&self, query: &[f32]) -> Option<Neighbor>;
}
