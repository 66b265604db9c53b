use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::scaling::fit_width;
use crate::video::domain::frame_writer::FrameWriter;

/// Writes frames to image files with the `image` crate; the format follows
/// the file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_width: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let img = match max_width {
            Some(w) if w > 0 && img.width() > w => {
                let (tw, th) = fit_width(img.width(), img.height(), w);
                image::imageops::resize(&img, tw, th, image::imageops::FilterType::Triangle)
            }
            _ => img,
        };

        img.save(path)?;
        Ok(())
    }
}
