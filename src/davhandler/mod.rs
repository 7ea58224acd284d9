//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::buf::Buf;
use headers::HeaderMapExt;
use http::header::{HeaderValue, CONNECTION, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::davpath::{normalize_prefix, DavPath};
use crate::errors::DavError;
use crate::fs::*;
use crate::ls::memls::MemLs;
use crate::ls::*;
use crate::util::{dav_method, DavMethod, DavMethodSet};
use crate::DavResult;

pub mod handle_copymove;
pub mod handle_delete;
pub mod handle_gethead;
use handle_gethead::READ_BUF_SIZE;
pub mod handle_lock;
pub mod handle_mkcol;
pub mod handle_options;
pub mod handle_props;
pub mod handle_put;

/// Advisory timeout reported in LOCK responses.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(300);

// bodies of non-PUT requests are read into memory, up to this size.
const MAX_REQUEST_BODY: usize = 65536;

/// Configuration of the handler.
#[derive(Clone)]
pub struct DavBuilder {
    /// Prefix to be stripped off when handling request.
    prefix: String,
    /// Filesystem backend.
    fs: FileSystem,
    /// Locksystem backend. None means class 1 only.
    ls: Option<LockSystem>,
    /// Set of allowed methods (Defaults to "all methods")
    allow: DavMethodSet,
    /// Does GET on a directory return indexes.
    autoindex: bool,
    /// read buffer size in bytes
    read_buf_size: usize,
    /// timeout sent back in LOCK responses.
    lock_timeout: Duration,
}

/// File system backend.
#[derive(Clone)]
pub enum FileSystem {
    #[cfg(any(docsrs, feature = "memfs"))]
    Mem,
    Custom(Arc<dyn DavFileSystem>),
}

impl FileSystem {
    /// Use your own storage backend.
    pub fn custom(fs: Arc<dyn DavFileSystem>) -> Self {
        FileSystem::Custom(fs)
    }

    fn build(self) -> Arc<dyn DavFileSystem> {
        match self {
            #[cfg(any(docsrs, feature = "memfs"))]
            FileSystem::Mem => crate::fs::memfs::MemFs::new(),
            FileSystem::Custom(fs) => fs,
        }
    }
}

/// Lock system backend.
#[derive(Default, Clone)]
pub enum LockSystem {
    #[default]
    Mem,
    Custom(Arc<dyn DavLockSystem>),
}

impl LockSystem {
    fn build(self) -> Arc<dyn DavLockSystem> {
        match self {
            LockSystem::Mem => MemLs::new(),
            LockSystem::Custom(ls) => ls,
        }
    }
}

impl DavBuilder {
    /// Create a new configuration builder.
    pub fn new(fs: FileSystem) -> DavBuilder {
        Self {
            prefix: String::new(),
            fs,
            ls: None,
            allow: DavMethodSet::all(),
            autoindex: true,
            read_buf_size: READ_BUF_SIZE,
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    /// Use the configuration that was built to generate a DavHandler.
    pub fn build(self) -> DavHandler {
        self.into()
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a filesystem path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = prefix.into();
        this
    }

    /// Set the locksystem to use. This turns on DAV class 2.
    pub fn locksystem(self, ls: LockSystem) -> Self {
        let mut this = self;
        this.ls = Some(ls);
        this
    }

    /// Which methods to allow (default is all methods).
    pub fn methods(self, allow: DavMethodSet) -> Self {
        let mut this = self;
        this.allow = allow;
        this
    }

    /// Does a GET on a directory produce a directory index (default is true).
    pub fn autoindex(self, autoindex: bool) -> Self {
        let mut this = self;
        this.autoindex = autoindex;
        this
    }

    /// Read buffer size in bytes
    pub fn read_buf_size(self, size: usize) -> Self {
        let mut this = self;
        this.read_buf_size = size.max(1);
        this
    }

    /// Timeout reported to clients in LOCK responses. Not enforced.
    pub fn lock_timeout(self, timeout: Duration) -> Self {
        let mut this = self;
        this.lock_timeout = timeout;
        this
    }
}

/// The webdav handler struct.
///
/// The `builder` and `build` methods are used to instantiate a handler.
///
/// The `handle` and `handle_with` methods are the methods that do the actual work.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) prefix: Arc<String>,
    pub(crate) fs: Arc<dyn DavFileSystem>,
    pub(crate) ls: Option<Arc<dyn DavLockSystem>>,
    pub(crate) allow: DavMethodSet,
    pub(crate) autoindex: bool,
    pub(crate) read_buf_size: usize,
    pub(crate) lock_timeout: Duration,
}

impl From<DavBuilder> for DavHandler {
    fn from(cfg: DavBuilder) -> Self {
        Self {
            prefix: Arc::new(normalize_prefix(&cfg.prefix)),
            fs: cfg.fs.build(),
            ls: cfg.ls.map(|ls| ls.build()),
            allow: cfg.allow,
            autoindex: cfg.autoindex,
            read_buf_size: cfg.read_buf_size,
            lock_timeout: cfg.lock_timeout,
        }
    }
}

impl DavHandler {
    /// Return a configuration builder.
    pub fn builder(fs: FileSystem) -> DavBuilder {
        DavBuilder::new(fs)
    }

    /// Handle a webdav request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send,
    {
        self.handle_inner(req).await
    }

    /// Handle a webdav request, with the prefix extended by `prefix`.
    ///
    /// Used when the handler is mounted somewhere below the prefix it was
    /// configured with.
    pub async fn handle_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send,
    {
        let mut this = self.clone();
        if let Some(prefix) = prefix {
            this.prefix = Arc::new(normalize_prefix(&format!("{}/{}", this.prefix, prefix)));
        }
        this.handle_inner(req).await
    }
}

impl DavHandler {
    // helper.
    pub(crate) async fn has_parent<'a>(&'a self, path: &'a DavPath) -> bool {
        let p = path.parent();
        self.fs
            .metadata(&p, false)
            .await
            .ok()
            .flatten()
            .map(|m| m.is_collection)
            .unwrap_or(false)
    }

    // helper.
    pub(crate) fn path(&self, req: &Request<()>) -> DavResult<DavPath> {
        DavPath::from_uri_and_prefix(req.uri(), &self.prefix)
    }

    // helper: metadata, or 404.
    pub(crate) async fn existing<'a>(
        &'a self,
        path: &'a DavPath,
        extended: bool,
    ) -> DavResult<DavMetaData> {
        self.fs
            .metadata(path, extended)
            .await?
            .ok_or_else(|| DavError::new(StatusCode::NOT_FOUND, format!("{path} not found")))
    }

    // Resolve a full URL or an absolute path (Destination:, If:) the same
    // way as the request path.
    pub(crate) fn resolve_url(&self, s: &str) -> DavResult<DavPath> {
        let path = match url::Url::parse(s) {
            Ok(url) => url.path().to_string(),
            Err(url::ParseError::RelativeUrlWithoutBase) => match s.parse::<http::Uri>() {
                Ok(uri) => uri.path().to_string(),
                Err(_) => return Err(DavError::InvalidPath(s.to_string())),
            },
            Err(_) => return Err(DavError::InvalidPath(s.to_string())),
        };
        DavPath::from_str_and_prefix(&path, &self.prefix)
    }

    // drain request body and return length.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // internal dispatcher.
    async fn handle_inner<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let is_head = req.method() == http::Method::HEAD;

        // Turn any DavError results into a HTTP error response.
        match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result OK");
                resp
            }
            Err(err) => {
                debug!("== END REQUEST result {:?}", err);
                error_response(&err, is_head)
            }
        }
    }

    // internal dispatcher part 2.
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        // translate HTTP method to Webdav method.
        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            }
        };

        // see if method is allowed.
        if !self.allow.contains_method(method) || (method.is_lock() && self.ls.is_none()) {
            debug!(
                "method {} not allowed on request {}",
                req.method(),
                req.uri()
            );
            return Err(DavError::StatusClose(StatusCode::METHOD_NOT_ALLOWED));
        }

        // make sure the request path is valid. "OPTIONS *" has no path.
        let path = if method == DavMethod::Options && req.uri().path() == "*" {
            None
        } else {
            Some(self.path(&req)?)
        };

        // PUT is the only handler that reads the body itself. All the
        // other handlers either expected no body, or a pre-read Vec<u8>.
        let (body_strm, body_data) = match method {
            DavMethod::Put => (Some(body), Vec::new()),
            _ => (None, self.read_request(body, MAX_REQUEST_BODY).await?),
        };

        // Not all methods accept a body.
        match method {
            DavMethod::Put | DavMethod::PropFind | DavMethod::PropPatch | DavMethod::Lock => {}
            _ => {
                if !body_data.is_empty() {
                    return Err(DavError::new(
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        format!("{} does not take a request body", method.as_str()),
                    ));
                }
            }
        }

        debug!("== START REQUEST {:?} {:?}", method, path);

        match (method, body_strm) {
            (DavMethod::Options, _) => self.handle_options(&req).await,
            (DavMethod::PropFind, _) => self.handle_propfind(&req, &body_data).await,
            (DavMethod::PropPatch, _) => self.handle_proppatch(&req, &body_data).await,
            (DavMethod::MkCol, _) => self.handle_mkcol(&req).await,
            (DavMethod::Delete, _) => self.handle_delete(&req).await,
            (DavMethod::Lock, _) => self.handle_lock(&req, &body_data).await,
            (DavMethod::Unlock, _) => self.handle_unlock(&req).await,
            (DavMethod::Head | DavMethod::Get, _) => self.handle_get(&req).await,
            (DavMethod::Copy | DavMethod::Move, _) => self.handle_copymove(&req, method).await,
            (DavMethod::Put, Some(body)) => self.handle_put(&req, body).await,
            (DavMethod::Put, None) => Err(StatusCode::INTERNAL_SERVER_ERROR.into()),
        }
    }
}

// The response for a failed request: status, and the message as body.
fn error_response(err: &DavError, is_head: bool) -> Response<Body> {
    let msg = format!("{err}\n");
    let mut resp = Response::new(if is_head {
        Body::empty()
    } else {
        Body::from(msg.clone())
    });
    *resp.status_mut() = err.statuscode();
    let h = resp.headers_mut();
    h.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    h.typed_insert(headers::ContentLength(msg.len() as u64));
    if let DavError::Unsatisfiable(total) = err {
        h.typed_insert(headers::ContentRange::unsatisfied_bytes(*total));
    }
    if err.must_close() {
        h.insert(CONNECTION, HeaderValue::from_static("close"));
    }
    resp
}
