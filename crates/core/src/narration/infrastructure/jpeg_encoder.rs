use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

use crate::narration::domain::frame_encoder::{EncodeError, EncodedImage, FrameEncoder};
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::frame::Frame;
use crate::shared::scaling::fit_longest_edge;

/// Encodes RGB frames as baseline JPEG.
pub struct JpegFrameEncoder {
    quality: u8,
    max_edge: Option<u32>,
}

impl JpegFrameEncoder {
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            max_edge: None,
        }
    }

    /// JPEG quality, clamped to 1-100.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Downscales frames whose longest edge exceeds `max_edge`.
    pub fn with_max_edge(mut self, max_edge: Option<u32>) -> Self {
        self.max_edge = max_edge.filter(|&edge| edge > 0);
        self
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, EncodeError> {
        if frame.channels() != 3 {
            return Err(EncodeError::UnsupportedChannels {
                index: frame.index(),
                channels: frame.channels(),
            });
        }

        let img = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or(EncodeError::BadDimensions {
                index: frame.index(),
                width: frame.width(),
                height: frame.height(),
            })?;

        let img = match self.max_edge {
            Some(edge) => {
                let (w, h) = fit_longest_edge(img.width(), img.height(), edge);
                if (w, h) == img.dimensions() {
                    img
                } else {
                    image::imageops::resize(&img, w, h, FilterType::Triangle)
                }
            }
            None => img,
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&img)
            .map_err(|e| EncodeError::Image {
                index: frame.index(),
                source: e,
            })?;

        Ok(EncodedImage {
            mime_type: "image/jpeg",
            bytes,
        })
    }
}
