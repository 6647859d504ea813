//! Centre-crop compositing onto the output canvas

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::domain::model::{AspectRatio, QualityTier};
use crate::domain::rules::FrameGeometry;

pub struct FrameCompositor {
    aspect: AspectRatio,
    width: u32,
    height: u32,
    filter: FilterType,
}

impl FrameCompositor {
    pub fn new(aspect: AspectRatio, width: u32, height: u32) -> Self {
        Self {
            aspect,
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    /// Canvas sized by [`FrameGeometry::output_dimensions`]
    pub fn for_output(aspect: AspectRatio, quality: QualityTier) -> Self {
        let (width, height) = FrameGeometry::output_dimensions(aspect, quality);
        Self::new(aspect, width, height)
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Crop `frame` to the target aspect around its centre and scale to the canvas
    pub fn composite(&self, frame: &RgbImage) -> RgbImage {
        let (src_w, src_h) = frame.dimensions();
        let rect = FrameGeometry::center_crop(src_w, src_h, self.aspect);

        let x = (rect.x.round() as u32).min(src_w.saturating_sub(1));
        let y = (rect.y.round() as u32).min(src_h.saturating_sub(1));
        let w = (rect.width.round() as u32).clamp(1, src_w.saturating_sub(x).max(1));
        let h = (rect.height.round() as u32).clamp(1, src_h.saturating_sub(y).max(1));

        let cropped = imageops::crop_imm(frame, x, y, w, h).to_image();
        if cropped.dimensions() == (self.width, self.height) {
            return cropped;
        }
        imageops::resize(&cropped, self.width, self.height, self.filter)
    }
}
