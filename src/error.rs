use std::fmt;

#[derive(Debug)]
pub enum PdfError {
    Structural(String),
    NotImplemented(String),
    FontLookup(String),
    Font(String),
    Image(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::Structural(message) => write!(f, "structural error: {}", message),
            PdfError::NotImplemented(message) => write!(f, "not implemented: {}", message),
            PdfError::FontLookup(message) => write!(f, "font lookup failed: {}", message),
            PdfError::Font(message) => write!(f, "font error: {}", message),
            PdfError::Image(message) => write!(f, "image error: {}", message),
            PdfError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            PdfError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PdfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PdfError {
    fn from(value: std::io::Error) -> Self {
        PdfError::Io(value)
    }
}

impl PdfError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        PdfError::Structural(message.into())
    }

    pub(crate) fn not_implemented(message: impl Into<String>) -> Self {
        PdfError::NotImplemented(message.into())
    }

    pub(crate) fn font(message: impl Into<String>) -> Self {
        PdfError::Font(message.into())
    }
}
