//! Figure metadata: pixel dimensions for the LaTeX size arguments.
//!
//! Only the image header is read; the pixels are never decoded.

use crate::record::FigureRef;
use std::path::Path;
use tracing::{debug, warn};

/// Build a [`FigureRef`] for `path`.
///
/// An unreadable image still counts as the submission's figure (the LaTeX
/// needs the file name), with zero dimensions and a warning.
pub fn figure_ref(path: &Path) -> FigureRef {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (width_px, height_px) = match image::image_dimensions(path) {
        Ok(dims) => dims,
        Err(e) => {
            warn!("Could not read size of figure '{}': {}", path.display(), e);
            (0, 0)
        }
    };
    debug!("Figure {} is {}x{} px", file_name, width_px, height_px);

    FigureRef {
        file_name,
        width_px,
        height_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    #[test]
    fn reads_png_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Smith_Jane.png");
        ImageBuffer::from_pixel(64, 48, Rgb([255u8, 255, 255]))
            .save(&path)
            .unwrap();

        let fig = figure_ref(&path);
        assert_eq!(fig.file_name, "Smith_Jane.png");
        assert_eq!((fig.width_px, fig.height_px), (64, 48));
    }

    #[test]
    fn unreadable_image_has_zero_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let fig = figure_ref(&path);
        assert_eq!(fig.file_name, "Broken.jpg");
        assert_eq!((fig.width_px, fig.height_px), (0, 0));
    }
}
