use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame {index} has {channels} channels, expected 3")]
    UnsupportedChannels { index: usize, channels: u8 },
    #[error("frame {index} pixel buffer does not match {width}x{height}")]
    BadDimensions { index: usize, width: u32, height: u32 },
    #[error("failed to encode frame {index}: {source}")]
    Image {
        index: usize,
        #[source]
        source: image::ImageError,
    },
}

/// A frame compressed into a still-image format, ready for transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>`, the form chat APIs accept inline.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Compresses frames for inclusion in an inference request.
pub trait FrameEncoder: Send {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, EncodeError>;
}
