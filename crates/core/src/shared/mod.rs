pub mod constants;
pub mod frame;
pub mod scaling;
pub mod settings;
pub mod video_metadata;
