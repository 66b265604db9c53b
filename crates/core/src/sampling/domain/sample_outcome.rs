use crate::shared::frame::Frame;

/// Result of one requested sample position.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    Decoded(Frame),
    /// The index was requested but could not be sought or decoded.
    Skipped { index: usize, reason: String },
}

impl SampleOutcome {
    /// The frame index this outcome was requested at.
    pub fn index(&self) -> usize {
        match self {
            SampleOutcome::Decoded(frame) => frame.index(),
            SampleOutcome::Skipped { index, .. } => *index,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, SampleOutcome::Decoded(_))
    }

    pub fn into_frame(self) -> Option<Frame> {
        match self {
            SampleOutcome::Decoded(frame) => Some(frame),
            SampleOutcome::Skipped { .. } => None,
        }
    }
}
