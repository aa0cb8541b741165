use std::convert::From;
use std::error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum ErrorKind {
    ConfigParse,
    DateParse,
    ExportUnavailable,
    AssetLoad,
    Rasterize,
    Encode,
    IOError(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, msg: &str) -> Self {
        Error {
            kind,
            message: Some(msg.to_owned()),
        }
    }

    pub fn with_msg(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, ErrorKind::ExportUnavailable)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            message: None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        Error::from(ErrorKind::IOError(io_error))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Error {
        Error::new(ErrorKind::ConfigParse, &err.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Error {
        Error::new(
            ErrorKind::DateParse,
            format!("Could not parse date: {}", err).as_str(),
        )
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Error {
        Error::new(ErrorKind::Encode, &err.to_string())
    }
}

impl From<ab_glyph::InvalidFont> for Error {
    fn from(err: ab_glyph::InvalidFont) -> Error {
        Error::new(ErrorKind::AssetLoad, &err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.kind.as_str(), msg),
            None => write!(f, "{}", self.kind.as_str()),
        }
    }
}

impl error::Error for Error {}

impl ErrorKind {
    pub fn as_str(&self) -> String {
        match self {
            ErrorKind::ConfigParse => "invalid configuration".to_owned(),
            ErrorKind::DateParse => "invalid date format".to_owned(),
            ErrorKind::ExportUnavailable => "export capability unavailable".to_owned(),
            ErrorKind::AssetLoad => "could not load asset".to_owned(),
            ErrorKind::Rasterize => "rasterization failed".to_owned(),
            ErrorKind::Encode => "image encoding failed".to_owned(),
            ErrorKind::IOError(err) => err.to_string(),
        }
    }
}
