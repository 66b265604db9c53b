use crate::sampling::domain::sample_outcome::SampleOutcome;
use crate::shared::frame::Frame;
use crate::video::domain::video_source::VideoSource;

/// Frame positions for `count` samples spread evenly over `total` frames.
///
/// The stride is `total / count` with integer division, so when `total` is
/// smaller than `count` the stride is 0 and every position is frame 0.
pub fn sample_indices(total: usize, count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let interval = total / count;
    (0..count).map(|i| i * interval).collect()
}

/// Picks `count` frames spread evenly across a video source.
///
/// Each planned position gets one seek and one decode attempt. Positions that
/// fail are left out of the result; sampling itself never fails. The source
/// is left open and positioned after the last read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSampler {
    count: usize,
    clamp_to_length: bool,
}

impl FrameSampler {
    pub fn new(count: usize) -> Result<Self, &'static str> {
        if count < 1 {
            return Err("frame count must be >= 1");
        }
        Ok(Self {
            count,
            clamp_to_length: false,
        })
    }

    /// Limits the sample count to the clip length so short clips are not
    /// sampled with repeated reads of frame 0. Off by default.
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp_to_length = clamp;
        self
    }

    /// Positions this sampler will request from a source with `total` frames.
    pub fn plan(&self, total: usize) -> Vec<usize> {
        let count = if self.clamp_to_length && total > 0 {
            self.count.min(total)
        } else {
            self.count
        };
        sample_indices(total, count)
    }

    /// Samples the source, keeping only frames that decoded.
    pub fn sample(&self, source: &mut dyn VideoSource) -> Vec<Frame> {
        self.sample_with_report(source)
            .into_iter()
            .filter_map(SampleOutcome::into_frame)
            .collect()
    }

    /// Samples the source and reports every planned position, including
    /// the ones that could not be decoded.
    pub fn sample_with_report(&self, source: &mut dyn VideoSource) -> Vec<SampleOutcome> {
        let total = source.frame_count();
        let plan = self.plan(total);
        log::debug!("Sampling {} of {total} frames at {plan:?}", plan.len());

        plan.into_iter()
            .map(|index| {
                let result = source.seek(index).and_then(|_| source.read());
                match result {
                    Ok(frame) => SampleOutcome::Decoded(frame),
                    Err(e) => {
                        log::warn!("Skipping frame {index}: {e}");
                        SampleOutcome::Skipped {
                            index,
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .collect()
    }
}
