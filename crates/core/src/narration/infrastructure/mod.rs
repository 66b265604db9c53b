pub mod chat_completion_narrator;
pub mod jpeg_encoder;
