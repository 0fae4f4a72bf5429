use thiserror::Error;

use crate::gallery::domain::nearest_neighbor_index::NearestNeighborIndex;
use crate::shared::error::TaggerError;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("index holds {vectors} vectors but {names} names were given")]
pub struct NameCountMismatch {
    pub vectors: usize,
    pub names: usize,
}

/// Nearest gallery entry for a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GalleryHit<'a> {
    pub name: &'a str,
    pub distance: f32,
}

/// Known identities: an index of unit-normalized embeddings and the name
/// of each row, in row order.
///
/// Immutable once built, so a run can share it freely.
pub struct Gallery {
    index: Box<dyn NearestNeighborIndex>,
    names: Vec<String>,
}

impl std::fmt::Debug for Gallery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gallery")
            .field("dimension", &self.index.dimension())
            .field("names", &self.names)
            .finish()
    }
}

impl Gallery {
    pub fn new(
        index: Box<dyn NearestNeighborIndex>,
        names: Vec<String>,
    ) -> Result<Self, NameCountMismatch> {
        if index.len() != names.len() {
            return Err(NameCountMismatch {
                vectors: index.len(),
                names: names.len(),
            });
        }
        Ok(Self { index, names })
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Closest identity to `embedding`, `None` when the gallery is empty.
    pub fn nearest(&self, embedding: &[f32]) -> Result<Option<GalleryHit<'_>>, TaggerError> {
        if embedding.len() != self.dimension() {
            return Err(TaggerError::EmbeddingDimension {
                expected: self.dimension(),
                actual: embedding.len(),
            });
        }
        Ok(self.index.nearest(embedding).map(|neighbor| GalleryHit {
            name: &self.names[neighbor.position],
            distance: neighbor.distance,
        }))
    }
}
