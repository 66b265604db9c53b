use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

/// Seekable video source backed by ffmpeg-next (libavformat + libavcodec).
///
/// Seeks are deferred to the next `read`, which jumps to the nearest
/// keyframe before the target and decodes forward until it reaches the
/// requested frame. Frames are converted to RGB24.
pub struct FfmpegVideoSource {
    stream: Option<OpenStream>,
    position: usize,
    needs_seek: bool,
}

// Safety: FfmpegVideoSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoSource {}

struct OpenStream {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    /// Seconds per stream timestamp tick.
    tick_secs: f64,
    start_pts: i64,
    fps: f64,
    width: u32,
    height: u32,
    total_frames: usize,
    draining: bool,
}

impl FfmpegVideoSource {
    pub fn new() -> Self {
        Self {
            stream: None,
            position: 0,
            needs_seek: true,
        }
    }
}

impl Default for FfmpegVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for FfmpegVideoSource {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let fps = rational_to_f64(stream.avg_frame_rate())
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);
        let tick_secs = rational_to_f64(stream.time_base()).unwrap_or(0.0);
        let start_pts = match stream.start_time() {
            ts if ts == i64::MIN => 0,
            ts => ts,
        };

        let duration_secs = if stream.duration() > 0 && tick_secs > 0.0 {
            stream.duration() as f64 * tick_secs
        } else if ictx.duration() > 0 {
            ictx.duration() as f64 / 1_000_000.0
        } else {
            0.0
        };
        let total_frames = resolve_frame_count(stream.frames(), duration_secs, fps);

        let width = decoder.width();
        let height = decoder.height();
        let codec = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {}: {width}x{height} @ {fps:.2} fps, {total_frames} frames ({codec})",
            path.display()
        );

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec,
            source_path: Some(path.to_path_buf()),
        };

        self.stream = Some(OpenStream {
            ictx,
            decoder,
            scaler,
            stream_index,
            tick_secs,
            start_pts,
            fps,
            width,
            height,
            total_frames,
            draining: false,
        });
        self.position = 0;
        self.needs_seek = true;

        Ok(metadata)
    }

    fn frame_count(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.total_frames)
    }

    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
        if self.stream.is_none() {
            return Err("FfmpegVideoSource: not opened".into());
        }
        self.position = index;
        self.needs_seek = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or("FfmpegVideoSource: not opened")?;
        let index = self.position;
        if index >= stream.total_frames {
            return Err(format!(
                "frame {index} is past the end of the stream ({} frames)",
                stream.total_frames
            )
            .into());
        }

        if self.needs_seek {
            stream.seek_to(index)?;
            self.needs_seek = false;
        }

        match stream.decode_at(index) {
            Ok(frame) => {
                self.position += 1;
                Ok(frame)
            }
            Err(e) => {
                // Decoder state is unknown after a failure; resync on next read.
                self.needs_seek = true;
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.position = 0;
        self.needs_seek = true;
    }
}

impl OpenStream {
    fn seek_to(&mut self, index: usize) -> Result<(), ffmpeg_next::Error> {
        let start_secs = self.start_pts as f64 * self.tick_secs;
        let ts = frame_index_to_seek_timestamp(index, self.fps, start_secs);
        self.ictx.seek(ts, ..ts)?;
        self.decoder.flush();
        self.draining = false;
        Ok(())
    }

    /// Decodes forward until the first frame presented at or after `index`.
    fn decode_at(&mut self, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
        // Without a frame rate there is no timeline to match against.
        let (target_secs, half_frame_secs) = if self.fps > 0.0 {
            (index as f64 / self.fps, 0.5 / self.fps)
        } else {
            (f64::NEG_INFINITY, 0.0)
        };

        let mut decoded = VideoFrame::empty();
        while self.next_decoded(&mut decoded)? {
            let presented = decoded
                .timestamp()
                .or(decoded.pts())
                .map(|pts| (pts - self.start_pts) as f64 * self.tick_secs);
            if presented.is_some_and(|secs| secs + half_frame_secs < target_secs) {
                continue;
            }

            let mut rgb_frame = VideoFrame::empty();
            self.scaler.run(&decoded, &mut rgb_frame)?;
            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            return Ok(Frame::new(pixels, self.width, self.height, 3, index));
        }

        Err(format!("stream ended before frame {index}").into())
    }

    /// Pulls the next decoded frame, feeding packets and flushing at EOF.
    /// Returns `false` once the decoder is fully drained.
    fn next_decoded(&mut self, decoded: &mut VideoFrame) -> Result<bool, ffmpeg_next::Error> {
        loop {
            if self.decoder.receive_frame(decoded).is_ok() {
                return Ok(true);
            }
            if self.draining {
                return Ok(false);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if self.decoder.send_packet(&packet).is_err() {
                        continue;
                    }
                }
                None => {
                    self.decoder.send_eof()?;
                    self.draining = true;
                }
            }
        }
    }
}

fn rational_to_f64(r: ffmpeg_next::Rational) -> Option<f64> {
    if r.numerator() > 0 && r.denominator() > 0 {
        Some(r.numerator() as f64 / r.denominator() as f64)
    } else {
        None
    }
}

/// Frame count as recorded by the container, or estimated from duration
/// and frame rate when the container does not record it.
fn resolve_frame_count(recorded: i64, duration_secs: f64, fps: f64) -> usize {
    if recorded > 0 {
        return recorded as usize;
    }
    if duration_secs > 0.0 && fps > 0.0 {
        (duration_secs * fps).round() as usize
    } else {
        0
    }
}

/// Converts a frame index to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `avformat_seek_file` with stream index -1.
fn frame_index_to_seek_timestamp(index: usize, fps: f64, start_secs: f64) -> i64 {
    if fps <= 0.0 {
        return (start_secs * 1_000_000.0) as i64;
    }
    let seconds = start_secs + index as f64 / fps;
    (seconds * 1_000_000.0) as i64
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping per-row stride padding.
fn extract_rgb_pixels(rgb_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
