use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A seekable, decoded video stream.
///
/// Behaves like a capture handle: `seek` moves the read position to a frame
/// index and `read` decodes the frame at that position, then advances the
/// position by one. Implementations handle codec and container details while
/// sampling works with the abstract [`Frame`] type.
pub trait VideoSource: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Total number of frames in the opened stream, 0 when nothing is open.
    fn frame_count(&self) -> usize;

    /// Moves the read position to `index`.
    ///
    /// Positions past the end are accepted; the following `read` fails.
    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>>;

    /// Decodes the frame at the current position and advances by one.
    fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
