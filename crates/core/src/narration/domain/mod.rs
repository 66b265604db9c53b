pub mod frame_encoder;
pub mod narrator;
