use std::path::Path;

use crate::gallery::domain::gallery::Gallery;
use crate::gallery::infrastructure::flat_l2_index::FlatL2Index;
use crate::shared::error::TaggerError;

/// Loads the persisted index and its JSON name list into a [`Gallery`].
///
/// Any problem with either file is a `GalleryLoad` error naming the file
/// at fault. A count mismatch is reported against the names file.
pub fn load_gallery(index_path: &Path, names_path: &Path) -> Result<Gallery, TaggerError> {
    let index =
        FlatL2Index::read(index_path).map_err(|e| TaggerError::gallery_load(index_path, e))?;
    let names = read_names(names_path)?;
    let gallery = Gallery::new(Box::new(index), names)
        .map_err(|e| TaggerError::gallery_load(names_path, e))?;

    log::info!(
        "Loaded gallery with {} identities ({}-dimensional embeddings)",
        gallery.len(),
        gallery.dimension()
    );
    if gallery.is_empty() {
        log::warn!("Gallery is empty; every face will resolve to Unknown");
    }
    Ok(gallery)
}

fn read_names(path: &Path) -> Result<Vec<String>, TaggerError> {
    let file = std::fs::File::open(path).map_err(|e| TaggerError::gallery_load(path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| TaggerError::gallery_load(path, e))
}
