use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Presentation has no slides")]
    EmptyPresentation,

    #[error("No slide entries supplied")]
    NoEntries,

    #[error("Invalid slide number {slide_index} at entry {entry} (presentation has {slide_count} slides)")]
    InvalidSlideIndex {
        entry: usize,
        slide_index: usize,
        slide_count: usize,
    },

    #[error("Failed to embed video on slide {slide_index}: {source}")]
    Embed {
        slide_index: usize,
        #[source]
        source: EmbedError,
    },

    #[error("Image error: {0}")]
    Image(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Media tool error: {0}")]
    MediaTool(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl DeckError {
    /// Slide index the error is attributed to, if any
    pub fn slide_index(&self) -> Option<usize> {
        match self {
            DeckError::InvalidSlideIndex { slide_index, .. } | DeckError::Embed { slide_index, .. } => {
                Some(*slide_index)
            }
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DeckError {
    fn from(err: zip::result::ZipError) -> Self {
        DeckError::Archive(err.to_string())
    }
}

impl From<quick_xml::Error> for DeckError {
    fn from(err: quick_xml::Error) -> Self {
        DeckError::MalformedDocument(err.to_string())
    }
}

impl From<image::ImageError> for DeckError {
    fn from(err: image::ImageError) -> Self {
        DeckError::Image(err.to_string())
    }
}

/// Failure while mutating a single slide
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("malformed document structure: {0}")]
    MalformedDocument(String),

    #[error("unsupported MIME type: {0}")]
    UnsupportedMimeType(String),

    #[error("poster image could not be encoded: {0}")]
    Image(String),
}

impl EmbedError {
    /// Attach the slide index the embed was targeting
    pub fn on_slide(self, slide_index: usize) -> DeckError {
        DeckError::Embed {
            slide_index,
            source: self,
        }
    }
}

pub type DeckResult<T> = Result<T, DeckError>;
