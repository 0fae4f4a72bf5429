use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::pipeline::preview_sink::{FaceAnnotation, PreviewAction, PreviewSink};
use crate::shared::constants::PREVIEW_WINDOW_TITLE;
use crate::shared::frame::Frame;

const QUIT_KEY: i32 = 'q' as i32;

/// Debug window showing each analyzed frame with labeled face boxes.
///
/// The window is created on the first render. Pressing `q` in it cancels
/// the run.
pub struct HighguiPreview {
    title: String,
    open: bool,
}

impl HighguiPreview {
    pub fn new() -> Self {
        Self {
            title: PREVIEW_WINDOW_TITLE.to_string(),
            open: false,
        }
    }

    fn ensure_window(&mut self) -> opencv::Result<()> {
        if !self.open {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.open = true;
        }
        Ok(())
    }
}

impl Default for HighguiPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSink for HighguiPreview {
    fn render(
        &mut self,
        frame: &Frame,
        annotations: &[FaceAnnotation],
    ) -> Result<PreviewAction, Box<dyn std::error::Error>> {
        self.ensure_window()?;

        let mut canvas = bgr_mat(frame)?;
        for annotation in annotations {
            draw_annotation(&mut canvas, annotation)?;
        }

        highgui::imshow(&self.title, &canvas)?;
        let key = highgui::wait_key(1)?;
        if key & 0xFF == QUIT_KEY {
            return Ok(PreviewAction::Quit);
        }
        Ok(PreviewAction::Continue)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::debug!("Failed to destroy preview window: {e}");
        }
    }
}

impl Drop for HighguiPreview {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owned BGR copy of the frame; the original buffer is never drawn on.
fn bgr_mat(frame: &Frame) -> opencv::Result<Mat> {
    let mut bgr = frame.data().to_vec();
    for pixel in bgr.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
    let flat = Mat::from_slice(&bgr)?;
    let shaped = flat.reshape(3, frame.height() as i32)?;
    shaped.try_clone()
}

fn draw_annotation(canvas: &mut Mat, annotation: &FaceAnnotation) -> opencv::Result<()> {
    let [r, g, b] = annotation.color();
    let color = Scalar::new(b as f64, g as f64, r as f64, 0.0);
    let bbox = annotation.bounding_box;
    let rect = Rect::new(bbox.x0, bbox.y0, bbox.width(), bbox.height());
    imgproc::rectangle(canvas, rect, color, 2, imgproc::LINE_8, 0)?;
    imgproc::put_text(
        canvas,
        &annotation.label,
        Point::new(bbox.x0, (bbox.y0 - 10).max(12)),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        color,
        2,
        imgproc::LINE_8,
        false,
    )
}
