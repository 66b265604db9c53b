pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a veteran cricket commentator giving energetic, \
passionate live commentary. Describe the action happening in these images as if you're watching \
a thrilling live match. No placeholders or mentions of 'frames' or 'base64'. Just pure, \
immersive, play-by-play commentary.";

pub const DEFAULT_TEMPERATURE: f64 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Frames sampled per clip when the caller does not ask for a count.
pub const DEFAULT_FRAME_COUNT: usize = 5;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];
