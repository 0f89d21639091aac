use std::fmt::{Display, Formatter};
use std::io;

/// Represents an error occured while fetching, converting or uploading logs
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Http(reqwest::Error),
    Json(serde_json::Error),
    Pattern(regex::Error),
    /// A required command line value was not given
    Usage(String),
    /// A search returned nothing that could answer the query
    NoResults(String),
    /// A search hit lacks a field the query needs
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Http(err) => write!(f, "HTTP error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Pattern(err) => write!(f, "invalid pattern: {}", err),
            Error::Usage(msg) => write!(f, "{}", msg),
            Error::NoResults(what) => write!(f, "no results for {}", what),
            Error::MissingField(field) => write!(f, "search hit has no '{}'", field),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Pattern(err) => Some(err),
            Error::Usage(_) | Error::NoResults(_) | Error::MissingField(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Pattern(err)
    }
}
