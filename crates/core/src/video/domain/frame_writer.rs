use std::path::Path;

use crate::shared::frame::Frame;

/// Exports a sampled frame as a still image for preview.
pub trait FrameWriter: Send {
    /// Writes `frame` to `path`. With `max_width`, frames wider than the
    /// bound are scaled down to it, keeping the aspect ratio.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_width: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
