//! Contains the structs and traits that define a storage backend.
//!
//! The engine never touches storage itself. Everything it needs from the
//! backend is expressed by [`DavFileSystem`]: existence and metadata lookups,
//! reading a resource as a seekable byte source, storing a request body,
//! and the collection operations. Paths handed to a backend have always
//! been through the URI resolver ([`DavPath`]) first.
//!
//! Errors must be mapped to [`FsError`] by the backend, the engine does not
//! catch anything else.
use std::error::Error;
use std::fmt::{self, Debug};
use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::Stream;

use crate::davpath::DavPath;

#[cfg(any(docsrs, feature = "memfs"))]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memfs;

/// Errors generated by a filesystem implementation.
///
/// These are more result-codes than errors, really.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Operation not implemented (501)
    NotImplemented,
    /// Something went wrong (500)
    GeneralFailure,
    /// tried to create something, but it existed (405)
    Exists,
    /// File / Directory not found (404)
    NotFound,
    /// Not allowed (403)
    Forbidden,
    /// Missing parent, or a collection where a leaf was expected (409)
    Conflict,
    /// Refused by the backend's own lock bookkeeping (423)
    Locked,
    /// Out of space (507)
    InsufficientStorage,
    /// The file being uploaded is too large (413)
    TooLarge,
}

/// The Result type.
pub type FsResult<T> = Result<T, FsError>;

/// Future returned by almost all of the backend methods.
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = FsResult<T>> + Send + 'a>>;

/// Byte stream handed to [`DavFileSystem::put`].
pub type FsStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FsError::NotImplemented => "not implemented by the storage backend",
            FsError::GeneralFailure => "storage backend failure",
            FsError::Exists => "resource already exists",
            FsError::NotFound => "resource not found",
            FsError::Forbidden => "forbidden",
            FsError::Conflict => "conflict",
            FsError::Locked => "resource is locked",
            FsError::InsufficientStorage => "insufficient storage",
            FsError::TooLarge => "resource too large",
        };
        f.write_str(s)
    }
}

impl Error for FsError {}

impl From<FsError> for io::Error {
    fn from(e: FsError) -> io::Error {
        let kind = match e {
            FsError::NotFound => io::ErrorKind::NotFound,
            FsError::Forbidden => io::ErrorKind::PermissionDenied,
            FsError::Exists => io::ErrorKind::AlreadyExists,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> FsError {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::Forbidden,
            io::ErrorKind::AlreadyExists => FsError::Exists,
            _ => FsError::GeneralFailure,
        }
    }
}

/// Snapshot of a resource's metadata, taken once per request.
///
/// `created`, `accessed` and `hidden` only need to be filled in when the
/// engine asks for extended metadata (PROPFIND).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavMetaData {
    pub modified: SystemTime,
    pub size: Option<u64>,
    pub content_type: String,
    pub is_collection: bool,
    pub created: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub hidden: bool,
}

impl DavMetaData {
    /// Size of the resource. Never trusted for collections.
    pub fn len(&self) -> Option<u64> {
        if self.is_collection {
            None
        } else {
            self.size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// A readable byte source, as returned by [`DavFileSystem::get`].
pub trait DavFile: Debug + Send {
    /// Read at most `count` bytes. An empty result means end of file.
    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes>;
    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64>;
}

/// The storage backend.
///
/// Implementations must serialize conflicting operations on the same path
/// themselves; the engine holds no locks between calls.
pub trait DavFileSystem: Send + Sync {
    /// Does `path` exist. The default asks [`metadata`](Self::metadata).
    fn exists<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, bool> {
        Box::pin(async move { Ok(self.metadata(path, false).await?.is_some()) })
    }

    /// Metadata of `path`, or `None` when it does not exist.
    ///
    /// With `extended` set, `created`, `accessed` and `hidden` are expected
    /// to be filled in.
    fn metadata<'a>(
        &'a self,
        path: &'a DavPath,
        extended: bool,
    ) -> FsFuture<'a, Option<DavMetaData>>;

    /// Open a leaf resource for reading.
    fn get<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavFile>>;

    /// Create or replace a leaf resource. Returns `true` when it was created.
    fn put<'a>(
        &'a self,
        path: &'a DavPath,
        body: FsStream<'a, FsResult<Bytes>>,
    ) -> FsFuture<'a, bool>;

    /// Delete a resource, recursively for collections.
    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    /// Copy a resource. Returns `true` when an existing destination was overwritten.
    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, bool>;

    /// Move a resource. Returns `true` when an existing destination was overwritten.
    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, bool>;

    /// Create a collection.
    fn mkcol<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    /// Names of the immediate children of a collection.
    fn list<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Vec<String>>;
}
