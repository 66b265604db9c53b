use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Clip length in seconds, or `None` when the frame rate is unknown.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.fps > 0.0 {
            Some(self.total_frames as f64 / self.fps)
        } else {
            None
        }
    }
}
