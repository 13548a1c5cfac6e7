//! Units flowing out of a streamed generation response
//!
//! A response arrives as a sequence of [`Fragment`]s which the assembler pairs
//! into [`Slide`]s. None of these types know anything about HTTP or the UI.

/// Binary image payload decoded from an inline-data part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// File extension matching the MIME type, `png` when unknown
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// One unit emitted by the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Image(ImageData),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(text.into())
    }
}

/// A caption paired with the illustration that goes with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub caption: String,
    pub image: ImageData,
}
