use thiserror::Error;

use crate::narration::domain::frame_encoder::EncodedImage;

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("no API key: set the {0} environment variable")]
    MissingApiKey(String),
    #[error("no frames to narrate")]
    NoImages,
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("inference endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected response from inference endpoint: {0}")]
    MalformedResponse(String),
}

/// Turns a sequence of still images into narrated text.
pub trait Narrator: Send {
    /// Describes `images`, given in temporal order.
    fn narrate(&self, images: &[EncodedImage]) -> Result<String, NarrationError>;
}
