use std::path::{Path, PathBuf};

use crate::narration::domain::frame_encoder::FrameEncoder;
use crate::narration::domain::narrator::Narrator;
use crate::sampling::domain::frame_sampler::FrameSampler;
use crate::sampling::domain::sample_outcome::SampleOutcome;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_writer::FrameWriter;
use crate::video::domain::video_source::VideoSource;

/// Pipeline milestones reported to an optional progress callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationStage {
    Sampling,
    Sampled { decoded: usize, requested: usize },
    Narrating { frames: usize },
}

pub type ProgressFn = Box<dyn Fn(NarrationStage) + Send>;

/// Everything produced for one clip.
#[derive(Debug)]
pub struct ClipNarration {
    pub metadata: VideoMetadata,
    /// Number of positions the sampler asked for.
    pub requested: usize,
    pub frames: Vec<Frame>,
    /// Positions that could not be decoded.
    pub skipped: Vec<usize>,
    /// `None` when no narrator is configured.
    pub text: Option<String>,
}

struct FrameExport {
    writer: Box<dyn FrameWriter>,
    dir: PathBuf,
    max_width: Option<u32>,
}

/// Clip narration pipeline: open → sample → close → export → encode → narrate.
pub struct NarrateClipUseCase {
    source: Box<dyn VideoSource>,
    sampler: FrameSampler,
    encoder: Box<dyn FrameEncoder>,
    narrator: Option<Box<dyn Narrator>>,
    export: Option<FrameExport>,
    progress: Option<ProgressFn>,
}

impl NarrateClipUseCase {
    pub fn new(
        source: Box<dyn VideoSource>,
        sampler: FrameSampler,
        encoder: Box<dyn FrameEncoder>,
        narrator: Option<Box<dyn Narrator>>,
        progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            source,
            sampler,
            encoder,
            narrator,
            export: None,
            progress,
        }
    }

    /// Also writes each sampled frame to `dir/moment_<n>.jpg`, 1-based.
    pub fn with_frame_export(
        mut self,
        writer: Box<dyn FrameWriter>,
        dir: &Path,
        max_width: Option<u32>,
    ) -> Self {
        self.export = Some(FrameExport {
            writer,
            dir: dir.to_path_buf(),
            max_width,
        });
        self
    }

    pub fn execute(&mut self, input: &Path) -> Result<ClipNarration, Box<dyn std::error::Error>> {
        self.report(NarrationStage::Sampling);
        let metadata = self.source.open(input)?;
        let outcomes = self.sampler.sample_with_report(self.source.as_mut());
        self.source.close();

        let requested = outcomes.len();
        let mut frames = Vec::with_capacity(requested);
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                SampleOutcome::Decoded(frame) => frames.push(frame),
                SampleOutcome::Skipped { index, .. } => skipped.push(index),
            }
        }
        log::info!(
            "Sampled {}/{requested} frames from {}",
            frames.len(),
            input.display()
        );
        self.report(NarrationStage::Sampled {
            decoded: frames.len(),
            requested,
        });

        if let Some(export) = &self.export {
            for (i, frame) in frames.iter().enumerate() {
                let path = export.dir.join(moment_file_name(i));
                export.writer.write(&path, frame, export.max_width)?;
            }
        }

        let text = match &self.narrator {
            Some(narrator) => {
                if frames.is_empty() {
                    return Err(
                        format!("no frames could be decoded from {}", input.display()).into(),
                    );
                }
                let images = frames
                    .iter()
                    .map(|frame| self.encoder.encode(frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.report(NarrationStage::Narrating {
                    frames: images.len(),
                });
                Some(narrator.narrate(&images)?)
            }
            None => None,
        };

        Ok(ClipNarration {
            metadata,
            requested,
            frames,
            skipped,
            text,
        })
    }

    fn report(&self, stage: NarrationStage) {
        if let Some(ref cb) = self.progress {
            cb(stage);
        }
    }
}

/// `moment_<n>.jpg` for the n-th exported frame (1-based).
pub fn moment_file_name(position: usize) -> String {
    format!("moment_{}.jpg", position + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::domain::frame_encoder::{EncodeError, EncodedImage};
    use crate::narration::domain::narrator::NarrationError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubVideoSource {
        total: usize,
        failing: HashSet<usize>,
        position: usize,
        closed: Arc<AtomicBool>,
        open_fails: bool,
    }

    impl StubVideoSource {
        fn new(total: usize) -> Self {
            Self {
                total,
                failing: HashSet::new(),
                position: 0,
                closed: Arc::new(AtomicBool::new(false)),
                open_fails: false,
            }
        }
    }

    impl VideoSource for StubVideoSource {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.open_fails {
                return Err("cannot open".into());
            }
            Ok(VideoMetadata {
                width: 2,
                height: 2,
                fps: 25.0,
                total_frames: self.total,
                codec: "stub".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frame_count(&self) -> usize {
            self.total
        }

        fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
            self.position = index;
            Ok(())
        }

        fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
            let index = self.position;
            if index >= self.total || self.failing.contains(&index) {
                return Err(format!("no frame at {index}").into());
            }
            self.position += 1;
            Ok(Frame::new(vec![index as u8; 12], 2, 2, 3, index))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Encodes a frame as the single byte of its index.
    struct IndexEncoder;

    impl FrameEncoder for IndexEncoder {
        fn encode(&self, frame: &Frame) -> Result<EncodedImage, EncodeError> {
            Ok(EncodedImage {
                mime_type: "image/jpeg",
                bytes: vec![frame.index() as u8],
            })
        }
    }

    struct RecordingNarrator {
        calls: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RecordingNarrator {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Narrator for RecordingNarrator {
        fn narrate(&self, images: &[EncodedImage]) -> Result<String, NarrationError> {
            let firsts = images.iter().map(|img| img.bytes[0]).collect();
            self.calls.lock().unwrap().push(firsts);
            Ok(format!("{} moments", images.len()))
        }
    }

    struct FailingNarrator;

    impl Narrator for FailingNarrator {
        fn narrate(&self, _images: &[EncodedImage]) -> Result<String, NarrationError> {
            Err(NarrationError::Api {
                status: 500,
                body: "overloaded".to_string(),
            })
        }
    }

    struct RecordingFrameWriter {
        written: Arc<Mutex<Vec<(PathBuf, usize, Option<u32>)>>>,
    }

    impl FrameWriter for RecordingFrameWriter {
        fn write(
            &self,
            path: &Path,
            frame: &Frame,
            max_width: Option<u32>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.index(), max_width));
            Ok(())
        }
    }

    // --- Helpers ---

    fn sampler(count: usize) -> FrameSampler {
        FrameSampler::new(count).unwrap()
    }

    fn use_case(
        source: StubVideoSource,
        count: usize,
        narrator: Option<Box<dyn Narrator>>,
    ) -> NarrateClipUseCase {
        NarrateClipUseCase::new(
            Box::new(source),
            sampler(count),
            Box::new(IndexEncoder),
            narrator,
            None,
        )
    }

    // --- Tests ---

    #[test]
    fn test_narrates_sampled_frames_in_order() {
        let narrator = RecordingNarrator::new();
        let calls = narrator.calls.clone();

        let mut uc = use_case(StubVideoSource::new(100), 5, Some(Box::new(narrator)));
        let result = uc.execute(Path::new("clip.mp4")).unwrap();

        assert_eq!(result.text.as_deref(), Some("5 moments"));
        assert_eq!(result.requested, 5);
        assert!(result.skipped.is_empty());
        assert_eq!(*calls.lock().unwrap(), vec![vec![0, 20, 40, 60, 80]]);
    }

    #[test]
    fn test_source_closed_after_sampling() {
        let source = StubVideoSource::new(10);
        let closed = source.closed.clone();

        let mut uc = use_case(source, 3, None);
        uc.execute(Path::new("clip.mp4")).unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_skipped_positions_reported() {
        let mut source = StubVideoSource::new(100);
        source.failing = HashSet::from([40]);

        let mut uc = use_case(source, 5, None);
        let result = uc.execute(Path::new("clip.mp4")).unwrap();

        let indices: Vec<usize> = result.frames.iter().map(Frame::index).collect();
        assert_eq!(indices, vec![0, 20, 60, 80]);
        assert_eq!(result.skipped, vec![40]);
        assert_eq!(result.requested, 5);
    }

    #[test]
    fn test_extract_only_returns_no_text() {
        let mut uc = use_case(StubVideoSource::new(30), 3, None);
        let result = uc.execute(Path::new("clip.mp4")).unwrap();
        assert!(result.text.is_none());
        assert_eq!(result.frames.len(), 3);
        assert_eq!(result.metadata.total_frames, 30);
    }

    #[test]
    fn test_empty_clip_with_narrator_is_error() {
        let narrator = RecordingNarrator::new();
        let calls = narrator.calls.clone();

        let mut uc = use_case(StubVideoSource::new(0), 5, Some(Box::new(narrator)));
        assert!(uc.execute(Path::new("empty.mp4")).is_err());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_clip_without_narrator_succeeds() {
        let mut uc = use_case(StubVideoSource::new(0), 5, None);
        let result = uc.execute(Path::new("empty.mp4")).unwrap();
        assert!(result.frames.is_empty());
        assert_eq!(result.skipped, vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_open_failure_propagates() {
        let mut source = StubVideoSource::new(10);
        source.open_fails = true;
        let mut uc = use_case(source, 3, None);
        assert!(uc.execute(Path::new("missing.mp4")).is_err());
    }

    #[test]
    fn test_narrator_error_propagates() {
        let mut uc = use_case(StubVideoSource::new(10), 2, Some(Box::new(FailingNarrator)));
        let err = uc.execute(Path::new("clip.mp4")).unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_frame_export_writes_numbered_moments() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = RecordingFrameWriter {
            written: written.clone(),
        };

        let mut uc = use_case(StubVideoSource::new(9), 3, None).with_frame_export(
            Box::new(writer),
            Path::new("/tmp/moments"),
            Some(220),
        );
        uc.execute(Path::new("clip.mp4")).unwrap();

        let written = written.lock().unwrap();
        assert_eq!(
            *written,
            vec![
                (PathBuf::from("/tmp/moments/moment_1.jpg"), 0, Some(220)),
                (PathBuf::from("/tmp/moments/moment_2.jpg"), 3, Some(220)),
                (PathBuf::from("/tmp/moments/moment_3.jpg"), 6, Some(220)),
            ]
        );
    }

    #[test]
    fn test_progress_reports_each_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let progress: ProgressFn = Box::new(move |stage| sink.lock().unwrap().push(stage));

        let mut uc = NarrateClipUseCase::new(
            Box::new(StubVideoSource::new(100)),
            sampler(4),
            Box::new(IndexEncoder),
            Some(Box::new(RecordingNarrator::new())),
            Some(progress),
        );
        uc.execute(Path::new("clip.mp4")).unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                NarrationStage::Sampling,
                NarrationStage::Sampled {
                    decoded: 4,
                    requested: 4
                },
                NarrationStage::Narrating { frames: 4 },
            ]
        );
    }

    #[test]
    fn test_moment_file_name_is_one_based() {
        assert_eq!(moment_file_name(0), "moment_1.jpg");
        assert_eq!(moment_file_name(4), "moment_5.jpg");
    }
}
