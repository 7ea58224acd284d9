use std::error::Error;
use std::fmt;
use std::io::{self, ErrorKind};

use http::StatusCode;

use crate::fs::FsError;

/// The error type of the protocol engine.
///
/// Every variant maps to exactly one HTTP status. Handlers return it with `?`
/// and the dispatcher turns it into the response.
#[derive(Debug)]
pub(crate) enum DavError {
    XmlReadError,
    XmlWriterError(xml::writer::Error),
    InvalidPath(String),
    UnknownDavMethod,
    Unsatisfiable(u64),
    Message(StatusCode, String),
    Status(StatusCode),
    StatusClose(StatusCode),
    FsError(FsError),
    IoError(io::Error),
}

pub(crate) type DavResult<T> = Result<T, DavError>;

impl DavError {
    /// Shorthand for a status with a human readable message.
    pub(crate) fn new(status: StatusCode, msg: impl Into<String>) -> DavError {
        DavError::Message(status, msg.into())
    }

    pub(crate) fn statuscode(&self) -> StatusCode {
        match self {
            DavError::XmlReadError => StatusCode::BAD_REQUEST,
            DavError::XmlWriterError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DavError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            DavError::UnknownDavMethod => StatusCode::NOT_IMPLEMENTED,
            DavError::Unsatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            DavError::Message(s, _) => *s,
            DavError::Status(s) => *s,
            DavError::StatusClose(s) => *s,
            DavError::FsError(e) => fserror_to_status(*e),
            DavError::IoError(e) => ioerror_to_status(e),
        }
    }

    pub(crate) fn must_close(&self) -> bool {
        match self {
            DavError::StatusClose(_) | DavError::UnknownDavMethod => true,
            DavError::IoError(e) => e.kind() == ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::XmlWriterError(e) => Some(e),
            DavError::FsError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DavError::XmlReadError => write!(f, "malformed XML request body"),
            DavError::XmlWriterError(e) => write!(f, "XML generation failed: {e}"),
            DavError::InvalidPath(p) => write!(f, "invalid URI: {p}"),
            DavError::UnknownDavMethod => write!(f, "method not implemented"),
            DavError::Unsatisfiable(_) => write!(f, "requested range cannot be satisfied"),
            DavError::Message(_, msg) => write!(f, "{msg}"),
            DavError::Status(s) | DavError::StatusClose(s) => {
                write!(f, "{}", s.canonical_reason().unwrap_or("error"))
            }
            DavError::FsError(e) => write!(f, "{e}"),
            DavError::IoError(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<StatusCode> for DavError {
    fn from(s: StatusCode) -> DavError {
        DavError::Status(s)
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> DavError {
        DavError::FsError(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> DavError {
        DavError::IoError(e)
    }
}

impl From<xml::writer::Error> for DavError {
    fn from(e: xml::writer::Error) -> DavError {
        DavError::XmlWriterError(e)
    }
}

impl From<http::header::InvalidHeaderValue> for DavError {
    fn from(_: http::header::InvalidHeaderValue) -> DavError {
        DavError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn fserror_to_status(e: FsError) -> StatusCode {
    match e {
        FsError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        FsError::GeneralFailure => StatusCode::INTERNAL_SERVER_ERROR,
        FsError::Exists => StatusCode::METHOD_NOT_ALLOWED,
        FsError::NotFound => StatusCode::NOT_FOUND,
        FsError::Forbidden => StatusCode::FORBIDDEN,
        FsError::Conflict => StatusCode::CONFLICT,
        FsError::Locked => StatusCode::LOCKED,
        FsError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        FsError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
    }
}

fn ioerror_to_status(e: &io::Error) -> StatusCode {
    match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UnexpectedEof => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}
