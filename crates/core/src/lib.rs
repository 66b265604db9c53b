//! Samples representative frames from short video clips and narrates them
//! with a multimodal chat completion model.

pub mod narration;
pub mod pipeline;
pub mod sampling;
pub mod shared;
pub mod video;
